//! Vocabulary shared by the stores and the sync layer: which collection an
//! entity lives in, and the order writes issued against it.

use kanban_core::{OrderChange, Positioned};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::board::BoardId;
use crate::card::{Card, CardUpdate};
use crate::list::{List, ListId, ListUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    List,
    Card,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Card => write!(f, "card"),
        }
    }
}

/// A fetchable, ordered collection of siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "kebab-case")]
pub enum Scope {
    /// Lists of a board.
    Lists(BoardId),
    /// Cards of a single list.
    Cards(ListId),
    /// Every card on a board, grouped by list then ordered.
    BoardCards(BoardId),
}

impl Scope {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Lists(_) => EntityKind::List,
            Self::Cards(_) | Self::BoardCards(_) => EntityKind::Card,
        }
    }

    pub fn parent_id(&self) -> Uuid {
        match *self {
            Self::Lists(id) | Self::Cards(id) | Self::BoardCards(id) => id,
        }
    }

    /// True when `entity` belongs to this collection.
    pub fn contains(&self, entity: &Entity) -> bool {
        match (self, entity) {
            (Self::Lists(board_id), Entity::List(list)) => list.board_id == *board_id,
            (Self::Cards(list_id), Entity::Card(card)) => card.list_id == *list_id,
            (Self::BoardCards(board_id), Entity::Card(card)) => card.board_id == *board_id,
            _ => false,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lists(id) => write!(f, "lists of board {}", id),
            Self::Cards(id) => write!(f, "cards of list {}", id),
            Self::BoardCards(id) => write!(f, "cards of board {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    List(List),
    Card(Card),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::List(_) => EntityKind::List,
            Self::Card(_) => EntityKind::Card,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::List(list) => list.id,
            Self::Card(card) => card.id,
        }
    }

    pub fn order(&self) -> i32 {
        match self {
            Self::List(list) => list.order,
            Self::Card(card) => card.order,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Self::List(list) => Some(list),
            Self::Card(_) => None,
        }
    }

    pub fn as_card(&self) -> Option<&Card> {
        match self {
            Self::Card(card) => Some(card),
            Self::List(_) => None,
        }
    }

    pub fn into_list(self) -> Option<List> {
        match self {
            Self::List(list) => Some(list),
            Self::Card(_) => None,
        }
    }

    pub fn into_card(self) -> Option<Card> {
        match self {
            Self::Card(card) => Some(card),
            Self::List(_) => None,
        }
    }

    /// Apply an order write in place, reparenting when the write carries a
    /// parent.
    pub fn apply_order(&mut self, update: &OrderUpdate) {
        match self {
            Self::List(list) => list.update_order(update.order),
            Self::Card(card) => match update.parent {
                Some(list_id) => card.move_to_list(list_id, update.order),
                None => card.set_order(update.order),
            },
        }
    }
}

impl From<List> for Entity {
    fn from(list: List) -> Self {
        Self::List(list)
    }
}

impl From<Card> for Entity {
    fn from(card: Card) -> Self {
        Self::Card(card)
    }
}

/// Single order write: set `order` on entity `id`, and move it under
/// `parent` when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub kind: EntityKind,
    pub id: Uuid,
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uuid>,
}

impl OrderUpdate {
    pub fn new(kind: EntityKind, id: Uuid, order: i32) -> Self {
        Self {
            kind,
            id,
            order,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: Uuid) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn from_change(kind: EntityKind, change: &OrderChange) -> Self {
        Self {
            kind,
            id: change.id,
            order: change.order,
            parent: change.parent,
        }
    }
}

/// Field-level edit of either entity kind; never touches `order`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPatch {
    List(ListUpdate),
    Card(CardUpdate),
}

impl FieldPatch {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::List(_) => EntityKind::List,
            Self::Card(_) => EntityKind::Card,
        }
    }
}

impl From<ListUpdate> for FieldPatch {
    fn from(updates: ListUpdate) -> Self {
        Self::List(updates)
    }
}

impl From<CardUpdate> for FieldPatch {
    fn from(updates: CardUpdate) -> Self {
        Self::Card(updates)
    }
}
