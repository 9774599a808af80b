use chrono::{DateTime, Utc};
use kanban_core::Positioned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;
use crate::field_update::FieldUpdate;

pub type ListId = Uuid;

/// A column of the board. `order` is dense within the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub board_id: BoardId,
    pub name: String,
    pub order: i32,
    #[serde(default)]
    pub wip_limit: Option<u32>,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl List {
    pub fn new(board_id: BoardId, name: String, order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            board_id,
            name,
            order,
            wip_limit: None,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_order(&mut self, order: i32) {
        self.order = order;
        self.updated_at = Utc::now();
    }

    /// True when holding `card_count` cards breaks the WIP limit.
    pub fn is_over_limit(&self, card_count: usize) -> bool {
        self.wip_limit.is_some_and(|limit| card_count > limit as usize)
    }

    pub fn update(&mut self, updates: ListUpdate) {
        if let Some(name) = updates.name {
            self.name = name;
        }
        updates.wip_limit.apply_to(&mut self.wip_limit);
        if let Some(archived) = updates.archived {
            self.archived = archived;
        }
        self.updated_at = Utc::now();
    }
}

impl Positioned for List {
    fn id(&self) -> Uuid {
        self.id
    }

    fn scope_id(&self) -> Uuid {
        self.board_id
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn set_order(&mut self, order: i32) {
        self.update_order(order);
    }

    fn set_scope_id(&mut self, scope_id: Uuid) {
        self.board_id = scope_id;
        self.updated_at = Utc::now();
    }
}

/// Partial update for List. Never carries `order`, which only the reorder
/// engine rewrites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListUpdate {
    pub name: Option<String>,
    pub wip_limit: FieldUpdate<u32>,
    pub archived: Option<bool>,
}

impl ListUpdate {
    pub fn is_change(&self) -> bool {
        self.name.is_some() || self.wip_limit.is_change() || self.archived.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wip_limit() {
        let mut list = List::new(Uuid::new_v4(), "Doing".into(), 0);
        assert!(!list.is_over_limit(100));

        list.update(ListUpdate {
            wip_limit: FieldUpdate::Set(3),
            ..Default::default()
        });
        assert!(!list.is_over_limit(3));
        assert!(list.is_over_limit(4));
    }

    #[test]
    fn test_positioned_impl() {
        let board_id = Uuid::new_v4();
        let mut list = List::new(board_id, "Todo".into(), 2);
        assert_eq!(Positioned::scope_id(&list), board_id);
        list.set_order(0);
        assert_eq!(list.order, 0);
    }
}
