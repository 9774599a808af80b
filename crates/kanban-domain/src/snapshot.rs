//! Point-in-time capture of all kanban data.
//!
//! `Snapshot` is the document both store adapters persist: the in-memory
//! store keeps one behind a lock, the file store round-trips one through
//! disk on every call. All collection rules (ordering within a scope,
//! cascading deletes, reparenting) live here so the adapters agree.

use std::collections::HashMap;

use kanban_core::{KanbanError, KanbanResult, Positioned};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Board, BoardId, BoardUpdate};
use crate::card::{Card, CardId, CardUpdate};
use crate::content::ContentEdit;
use crate::entity::{Entity, EntityKind, OrderUpdate, Scope};
use crate::list::{List, ListId, ListUpdate};
use crate::sprint::{Sprint, SprintId};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub boards: Vec<Board>,

    #[serde(default)]
    pub lists: Vec<List>,

    #[serde(default)]
    pub cards: Vec<Card>,

    #[serde(default)]
    pub sprints: Vec<Sprint>,
}

/// Scopes whose fetched contents change when `entity` changes.
pub fn scopes_of(entity: &Entity) -> Vec<Scope> {
    match entity {
        Entity::List(list) => vec![Scope::Lists(list.board_id), Scope::BoardCards(list.board_id)],
        Entity::Card(card) => vec![Scope::Cards(card.list_id), Scope::BoardCards(card.board_id)],
    }
}

fn merge_scopes(mut scopes: Vec<Scope>, more: Vec<Scope>) -> Vec<Scope> {
    for scope in more {
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }
    scopes
}

fn not_found(kind: impl std::fmt::Display, id: Uuid) -> KanbanError {
    KanbanError::NotFound(format!("{} {}", kind, id))
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
            && self.lists.is_empty()
            && self.cards.is_empty()
            && self.sprints.is_empty()
    }

    /// Contents of `scope`, ascending by order. Ties keep insertion order.
    pub fn fetch_ordered(&self, scope: Scope) -> Vec<Entity> {
        match scope {
            Scope::Lists(board_id) => {
                let mut lists: Vec<&List> =
                    self.lists.iter().filter(|l| l.board_id == board_id).collect();
                lists.sort_by_key(|l| l.order);
                lists.into_iter().cloned().map(Entity::List).collect()
            }
            Scope::Cards(list_id) => {
                let mut cards: Vec<&Card> =
                    self.cards.iter().filter(|c| c.list_id == list_id).collect();
                cards.sort_by_key(|c| c.order);
                cards.into_iter().cloned().map(Entity::Card).collect()
            }
            Scope::BoardCards(board_id) => {
                let list_orders: HashMap<Uuid, i32> = self
                    .lists
                    .iter()
                    .filter(|l| l.board_id == board_id)
                    .map(|l| (l.id, l.order))
                    .collect();
                let mut cards: Vec<&Card> =
                    self.cards.iter().filter(|c| c.board_id == board_id).collect();
                cards.sort_by_key(|c| {
                    (list_orders.get(&c.list_id).copied().unwrap_or(i32::MAX), c.order)
                });
                cards.into_iter().cloned().map(Entity::Card).collect()
            }
        }
    }

    pub fn entity(&self, kind: EntityKind, id: Uuid) -> KanbanResult<Entity> {
        match kind {
            EntityKind::List => self.list(id).cloned().map(Entity::List),
            EntityKind::Card => self.card(id).cloned().map(Entity::Card),
        }
    }

    pub fn list(&self, id: Uuid) -> KanbanResult<&List> {
        self.lists
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| not_found(EntityKind::List, id))
    }

    pub fn card(&self, id: CardId) -> KanbanResult<&Card> {
        self.cards
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(EntityKind::Card, id))
    }

    /// Apply a single order write. Returns the scopes it touched.
    pub fn update_order(&mut self, update: &OrderUpdate) -> KanbanResult<Vec<Scope>> {
        match update.kind {
            EntityKind::List => {
                if update.parent.is_some() {
                    return Err(KanbanError::Validation(
                        "lists cannot move between boards".to_string(),
                    ));
                }
                let list = self
                    .lists
                    .iter_mut()
                    .find(|l| l.id == update.id)
                    .ok_or_else(|| not_found(EntityKind::List, update.id))?;
                list.update_order(update.order);
                Ok(scopes_of(&Entity::List(list.clone())))
            }
            EntityKind::Card => {
                if let Some(parent) = update.parent {
                    let board_id = self.card(update.id)?.board_id;
                    if self.list(parent)?.board_id != board_id {
                        return Err(KanbanError::Validation(format!(
                            "list {} is not on board {}",
                            parent, board_id
                        )));
                    }
                }
                let card = self
                    .cards
                    .iter_mut()
                    .find(|c| c.id == update.id)
                    .ok_or_else(|| not_found(EntityKind::Card, update.id))?;
                let before = scopes_of(&Entity::Card(card.clone()));
                match update.parent {
                    Some(list_id) => card.move_to_list(list_id, update.order),
                    None => card.set_order(update.order),
                }
                Ok(merge_scopes(before, scopes_of(&Entity::Card(card.clone()))))
            }
        }
    }

    /// Insert a new list or card under an existing parent.
    pub fn insert_entity(&mut self, entity: Entity) -> KanbanResult<Vec<Scope>> {
        if self.entity(entity.kind(), entity.id()).is_ok() {
            return Err(KanbanError::Validation(format!(
                "{} {} already exists",
                entity.kind(),
                entity.id()
            )));
        }
        let scopes = scopes_of(&entity);
        match entity {
            Entity::List(list) => {
                self.board(list.board_id)?;
                self.lists.push(list);
            }
            Entity::Card(card) => {
                let list = self.list(card.list_id)?;
                if list.board_id != card.board_id {
                    return Err(KanbanError::Validation(format!(
                        "list {} is not on board {}",
                        card.list_id, card.board_id
                    )));
                }
                self.cards.push(card);
            }
        }
        Ok(scopes)
    }

    /// Remove a list (with its cards) or a card. Siblings keep their orders.
    pub fn remove_entity(&mut self, kind: EntityKind, id: Uuid) -> KanbanResult<Vec<Scope>> {
        let entity = self.entity(kind, id)?;
        let mut scopes = scopes_of(&entity);
        match kind {
            EntityKind::List => {
                self.lists.retain(|l| l.id != id);
                let removed: Vec<CardId> = self
                    .cards
                    .iter()
                    .filter(|c| c.list_id == id)
                    .map(|c| c.id)
                    .collect();
                self.cards.retain(|c| c.list_id != id);
                self.forget_cards(&removed);
                scopes.push(Scope::Cards(id));
            }
            EntityKind::Card => {
                self.cards.retain(|c| c.id != id);
                self.forget_cards(&[id]);
            }
        }
        Ok(scopes)
    }

    fn forget_cards(&mut self, ids: &[CardId]) {
        for sprint in &mut self.sprints {
            for id in ids {
                sprint.remove_card(*id);
            }
        }
    }

    pub fn patch_card(&mut self, id: CardId, updates: &CardUpdate) -> KanbanResult<(Card, Vec<Scope>)> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(EntityKind::Card, id))?;
        card.update(updates.clone());
        let card = card.clone();
        let scopes = scopes_of(&Entity::Card(card.clone()));
        Ok((card, scopes))
    }

    pub fn patch_list(&mut self, id: ListId, updates: &ListUpdate) -> KanbanResult<(List, Vec<Scope>)> {
        let list = self
            .lists
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| not_found(EntityKind::List, id))?;
        list.update(updates.clone());
        let list = list.clone();
        let scopes = scopes_of(&Entity::List(list.clone()));
        Ok((list, scopes))
    }

    /// Apply a comment or checklist change; the stored card is untouched
    /// when the change is rejected.
    pub fn edit_card_content(&mut self, id: CardId, edit: &ContentEdit) -> KanbanResult<(Card, Vec<Scope>)> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(EntityKind::Card, id))?;
        let mut edited = card.clone();
        edited.apply_content(edit)?;
        *card = edited.clone();
        let scopes = scopes_of(&Entity::Card(edited.clone()));
        Ok((edited, scopes))
    }

    pub fn board(&self, id: BoardId) -> KanbanResult<&Board> {
        self.boards
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("board", id))
    }

    pub fn insert_board(&mut self, board: Board) -> KanbanResult<()> {
        if self.board(board.id).is_ok() {
            return Err(KanbanError::Validation(format!("board {} already exists", board.id)));
        }
        self.boards.push(board);
        Ok(())
    }

    pub fn update_board(&mut self, id: BoardId, updates: BoardUpdate) -> KanbanResult<Board> {
        let board = self
            .boards
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| not_found("board", id))?;
        board.update(updates);
        Ok(board.clone())
    }

    /// Replace a stored board wholesale, used after membership edits.
    pub fn replace_board(&mut self, board: Board) -> KanbanResult<()> {
        let slot = self
            .boards
            .iter_mut()
            .find(|b| b.id == board.id)
            .ok_or_else(|| not_found("board", board.id))?;
        *slot = board;
        Ok(())
    }

    /// Remove a board and everything on it.
    pub fn remove_board(&mut self, id: BoardId) -> KanbanResult<()> {
        self.board(id)?;
        self.boards.retain(|b| b.id != id);
        self.lists.retain(|l| l.board_id != id);
        self.cards.retain(|c| c.board_id != id);
        self.sprints.retain(|s| s.board_id != id);
        Ok(())
    }

    pub fn boards_for_member(&self, user_id: &str) -> Vec<Board> {
        self.boards
            .iter()
            .filter(|b| b.is_member(user_id))
            .cloned()
            .collect()
    }

    pub fn sprint(&self, id: SprintId) -> KanbanResult<&Sprint> {
        self.sprints
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("sprint", id))
    }

    pub fn insert_sprint(&mut self, sprint: Sprint) -> KanbanResult<()> {
        self.board(sprint.board_id)?;
        if self.sprint(sprint.id).is_ok() {
            return Err(KanbanError::Validation(format!("sprint {} already exists", sprint.id)));
        }
        self.sprints.push(sprint);
        Ok(())
    }

    pub fn replace_sprint(&mut self, sprint: Sprint) -> KanbanResult<()> {
        let slot = self
            .sprints
            .iter_mut()
            .find(|s| s.id == sprint.id)
            .ok_or_else(|| not_found("sprint", sprint.id))?;
        *slot = sprint;
        Ok(())
    }

    /// Remove a sprint and detach its cards.
    pub fn remove_sprint(&mut self, id: SprintId) -> KanbanResult<()> {
        self.sprint(id)?;
        self.sprints.retain(|s| s.id != id);
        for card in self.cards.iter_mut().filter(|c| c.sprint_id == Some(id)) {
            card.sprint_id = None;
        }
        Ok(())
    }

    /// Sprints of a board, most recent start first.
    pub fn sprints_for_board(&self, board_id: BoardId) -> Vec<Sprint> {
        let mut sprints: Vec<Sprint> = self
            .sprints
            .iter()
            .filter(|s| s.board_id == board_id)
            .cloned()
            .collect();
        sprints.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        sprints
    }

    /// Cards with the given ids; unknown ids are skipped.
    pub fn cards_by_ids(&self, ids: &[CardId]) -> Vec<Card> {
        ids.iter()
            .filter_map(|id| self.cards.iter().find(|c| c.id == *id))
            .cloned()
            .collect()
    }
}
