//! Local, optimistically updated copy of one board.
//!
//! Every application (poll result, optimistic apply, settlement, rollback)
//! is stamped with a [`Ticket`]. A poll result is accepted only when its
//! ticket is newer than the last application to the same collection and no
//! write is in flight, so a slow fetch can never overwrite a newer local
//! state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use kanban_domain::{BoardId, Card, CardId, Entity, List, ListId, Scope};
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::poller::PollResult;
use crate::sequencer::{Sequencer, Ticket};

/// Lists of a board and the cards of each list, both in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardSnapshot {
    pub lists: Vec<List>,
    pub cards: HashMap<ListId, Vec<Card>>,
}

impl BoardSnapshot {
    pub fn cards_in(&self, list_id: ListId) -> &[Card] {
        self.cards.get(&list_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.values().flatten().find(|c| c.id == id)
    }

    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.values_mut().flatten().find(|c| c.id == id)
    }
}

#[derive(Debug, Default)]
struct Inner {
    data: BoardSnapshot,
    lists_ticket: Ticket,
    cards_ticket: Ticket,
}

pub struct BoardState {
    board_id: BoardId,
    inner: RwLock<Inner>,
    in_flight: AtomicUsize,
    tx: watch::Sender<Ticket>,
}

/// Marks a write as in flight until dropped.
pub struct InFlight<'a> {
    state: &'a BoardState,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BoardState {
    pub fn new(board_id: BoardId) -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            board_id,
            inner: RwLock::new(Inner::default()),
            in_flight: AtomicUsize::new(0),
            tx,
        }
    }

    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.inner.read().data.clone()
    }

    pub fn lists(&self) -> Vec<List> {
        self.inner.read().data.lists.clone()
    }

    pub fn list(&self, id: ListId) -> Option<List> {
        self.inner.read().data.lists.iter().find(|l| l.id == id).cloned()
    }

    pub fn cards_in(&self, list_id: ListId) -> Vec<Card> {
        self.inner.read().data.cards_in(list_id).to_vec()
    }

    pub fn card(&self, id: CardId) -> Option<Card> {
        self.inner.read().data.card(id).cloned()
    }

    /// Ticket of the most recent accepted application.
    pub fn applied(&self) -> Ticket {
        let inner = self.inner.read();
        inner.lists_ticket.max(inner.cards_ticket)
    }

    /// Receives the ticket of every accepted application.
    pub fn changes(&self) -> watch::Receiver<Ticket> {
        self.tx.subscribe()
    }

    pub fn writes_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_write(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight { state: self }
    }

    /// Reconcile a poll result with local state. Returns false when the
    /// result was discarded as stale.
    pub fn apply_poll(&self, result: &PollResult) -> bool {
        let mut inner = self.inner.write();
        let last = match result.scope {
            Scope::Lists(_) => inner.lists_ticket,
            Scope::Cards(_) | Scope::BoardCards(_) => inner.cards_ticket,
        };
        let in_flight = self.writes_in_flight();
        if result.ticket <= last || in_flight > 0 {
            tracing::debug!(
                "Discarding poll of {} (ticket {}, applied {}, {} write(s) in flight)",
                result.scope,
                result.ticket,
                last,
                in_flight
            );
            return false;
        }

        match result.scope {
            Scope::Lists(board_id) if board_id == self.board_id => {
                inner.data.lists = result
                    .entities
                    .iter()
                    .filter_map(Entity::as_list)
                    .cloned()
                    .collect();
                inner.lists_ticket = result.ticket;
            }
            Scope::BoardCards(board_id) if board_id == self.board_id => {
                let mut cards: HashMap<ListId, Vec<Card>> = HashMap::new();
                for card in result.entities.iter().filter_map(Entity::as_card) {
                    cards.entry(card.list_id).or_default().push(card.clone());
                }
                inner.data.cards = cards;
                inner.cards_ticket = result.ticket;
            }
            Scope::Cards(list_id) => {
                let cards: Vec<Card> = result
                    .entities
                    .iter()
                    .filter_map(Entity::as_card)
                    .filter(|c| c.board_id == self.board_id)
                    .cloned()
                    .collect();
                inner.data.cards.insert(list_id, cards);
                inner.cards_ticket = result.ticket;
            }
            _ => {
                tracing::warn!("Poll of {} delivered to board {}", result.scope, self.board_id);
                return false;
            }
        }
        drop(inner);
        self.tx.send_replace(result.ticket);
        true
    }

    /// Apply a local change under a fresh ticket.
    pub(crate) fn apply_local<T>(&self, f: impl FnOnce(&mut BoardSnapshot) -> T) -> (T, Ticket) {
        let mut inner = self.inner.write();
        let out = f(&mut inner.data);
        let ticket = Self::stamp(&mut inner);
        drop(inner);
        self.tx.send_replace(ticket);
        (out, ticket)
    }

    /// Put back a snapshot taken before a failed write.
    pub(crate) fn restore(&self, snapshot: BoardSnapshot) -> Ticket {
        self.apply_local(|data| *data = snapshot).1
    }

    /// Mark a successful write as applied so polls issued while it was in
    /// flight are recognised as stale.
    pub(crate) fn settle(&self) -> Ticket {
        self.apply_local(|_| ()).1
    }

    fn stamp(inner: &mut Inner) -> Ticket {
        let ticket = Sequencer::global().issue();
        inner.lists_ticket = ticket;
        inner.cards_ticket = ticket;
        ticket
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::deliver;
    use super::*;
    use uuid::Uuid;

    fn board() -> (BoardState, List, Vec<Card>) {
        let board_id = Uuid::new_v4();
        let state = BoardState::new(board_id);
        let list = List::new(board_id, "Todo".into(), 0);
        let cards: Vec<Card> = (0..3)
            .map(|i| Card::new(board_id, list.id, format!("c{}", i), i))
            .collect();
        (state, list, cards)
    }

    #[test]
    fn test_fresh_poll_applied() {
        let (state, list, cards) = board();
        assert!(deliver(&state, Scope::Lists(state.board_id()), vec![Entity::List(list.clone())]));
        assert!(deliver(
            &state,
            Scope::BoardCards(state.board_id()),
            cards.iter().cloned().map(Entity::Card).collect()
        ));

        assert_eq!(state.lists(), vec![list.clone()]);
        assert_eq!(state.cards_in(list.id), cards);
    }

    #[test]
    fn test_stale_poll_discarded() {
        let (state, list, _) = board();
        let stale = Sequencer::global().issue();
        state.apply_local(|data| data.lists.push(list.clone()));

        let accepted = state.apply_poll(&PollResult {
            scope: Scope::Lists(state.board_id()),
            ticket: stale,
            entities: vec![],
        });
        assert!(!accepted);
        assert_eq!(state.lists().len(), 1);
    }

    #[test]
    fn test_poll_during_write_discarded() {
        let (state, list, _) = board();
        let guard = state.begin_write();
        assert!(!deliver(&state, Scope::Lists(state.board_id()), vec![Entity::List(list.clone())]));
        drop(guard);

        assert_eq!(state.writes_in_flight(), 0);
        assert!(deliver(&state, Scope::Lists(state.board_id()), vec![Entity::List(list)]));
    }

    #[test]
    fn test_collections_tracked_separately() {
        let (state, list, cards) = board();
        let lists_ticket = Sequencer::global().issue();
        assert!(deliver(
            &state,
            Scope::BoardCards(state.board_id()),
            cards.into_iter().map(Entity::Card).collect()
        ));

        let accepted = state.apply_poll(&PollResult {
            scope: Scope::Lists(state.board_id()),
            ticket: lists_ticket,
            entities: vec![Entity::List(list)],
        });
        assert!(accepted);
    }

    #[test]
    fn test_restore_replaces_everything() {
        let (state, list, cards) = board();
        deliver(&state, Scope::Lists(state.board_id()), vec![Entity::List(list.clone())]);
        deliver(
            &state,
            Scope::BoardCards(state.board_id()),
            cards.into_iter().map(Entity::Card).collect(),
        );
        let before = state.snapshot();

        state.apply_local(|data| {
            data.lists.clear();
            data.cards.clear();
        });
        let ticket = state.restore(before.clone());

        assert_eq!(state.snapshot(), before);
        assert_eq!(state.applied(), ticket);
    }

    #[tokio::test]
    async fn test_changes_notified() {
        let (state, list, _) = board();
        let mut rx = state.changes();
        deliver(&state, Scope::Lists(state.board_id()), vec![Entity::List(list)]);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), state.applied());
    }

    #[test]
    fn test_foreign_scope_rejected() {
        let (state, list, _) = board();
        assert!(!deliver(&state, Scope::Lists(Uuid::new_v4()), vec![Entity::List(list)]));
    }
}
