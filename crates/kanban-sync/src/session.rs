use std::sync::Arc;

use kanban_core::KanbanResult;
use kanban_domain::{
    BoardId, Card, CardId, CardUpdate, ContentEdit, Entity, FieldPatch, List, ListId, ListUpdate, Scope,
};
use uuid::Uuid;
use kanban_persistence::EntityStore;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::controller::{DragEnd, DragOutcome, MutationController, PatchOutcome};
use crate::poller::{PollResult, PollScheduler, Subscription};
use crate::sequencer::{Sequencer, Ticket};
use crate::state::BoardState;

/// A live view of one board: polled from the store, mutated optimistically.
pub struct BoardSession {
    controller: MutationController,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl BoardSession {
    /// Load the board's lists and cards, then keep them in sync through
    /// `scheduler`.
    pub async fn open(
        store: Arc<dyn EntityStore>,
        scheduler: &PollScheduler,
        board_id: BoardId,
    ) -> KanbanResult<Self> {
        let state = Arc::new(BoardState::new(board_id));
        let scopes = [Scope::Lists(board_id), Scope::BoardCards(board_id)];

        for scope in scopes {
            let ticket = Sequencer::global().issue();
            let entities = store.fetch_ordered(scope).await?;
            state.apply_poll(&PollResult {
                scope,
                ticket,
                entities,
            });
        }

        let subscriptions = scopes
            .into_iter()
            .map(|scope| {
                let state = Arc::clone(&state);
                scheduler.subscribe(scope, move |result: &PollResult| {
                    state.apply_poll(result);
                })
            })
            .collect();

        tracing::debug!(
            "Opened board {} with {} list(s)",
            board_id,
            state.lists().len()
        );
        Ok(Self {
            controller: MutationController::new(store, state),
            subscriptions: Mutex::new(subscriptions),
        })
    }

    pub fn board_id(&self) -> BoardId {
        self.state().board_id()
    }

    pub fn state(&self) -> &Arc<BoardState> {
        self.controller.state()
    }

    pub fn lists(&self) -> Vec<List> {
        self.state().lists()
    }

    pub fn cards_in(&self, list_id: ListId) -> Vec<Card> {
        self.state().cards_in(list_id)
    }

    pub fn card(&self, card_id: CardId) -> Option<Card> {
        self.state().card(card_id)
    }

    /// Ticket of every accepted change, optimistic or polled.
    pub fn changes(&self) -> watch::Receiver<Ticket> {
        self.state().changes()
    }

    pub async fn on_drag_end(&self, drag: DragEnd) -> KanbanResult<DragOutcome> {
        self.controller.on_drag_end(drag).await
    }

    pub async fn quick_update(&self, card_id: CardId, updates: CardUpdate) -> KanbanResult<PatchOutcome<Card>> {
        self.controller.quick_update(card_id, updates).await
    }

    pub async fn update_list(&self, list_id: ListId, updates: ListUpdate) -> KanbanResult<PatchOutcome<List>> {
        self.controller.update_list(list_id, updates).await
    }

    pub async fn quick_update_entity(&self, id: Uuid, patch: FieldPatch) -> KanbanResult<PatchOutcome<Entity>> {
        self.controller.quick_update_entity(id, patch).await
    }

    pub async fn edit_content(&self, card_id: CardId, edit: ContentEdit) -> KanbanResult<PatchOutcome<Card>> {
        self.controller.edit_content(card_id, edit).await
    }

    pub async fn add_list(&self, name: &str) -> KanbanResult<PatchOutcome<List>> {
        self.controller.add_list(name).await
    }

    pub async fn add_card(
        &self,
        list_id: ListId,
        name: &str,
        fields: CardUpdate,
    ) -> KanbanResult<PatchOutcome<Card>> {
        self.controller.add_card(list_id, name, fields).await
    }

    pub async fn delete_list(&self, list_id: ListId) -> KanbanResult<PatchOutcome<()>> {
        self.controller.delete_list(list_id).await
    }

    pub async fn delete_card(&self, card_id: CardId) -> KanbanResult<PatchOutcome<()>> {
        self.controller.delete_card(card_id).await
    }

    /// Stop polling. Local state stays readable.
    pub fn close(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        tracing::debug!("Closed board {}", self.board_id());
    }
}
