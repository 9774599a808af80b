use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanban_core::KanbanResult;
use kanban_domain::{
    Board, BoardId, BoardUpdate, Card, CardId, CardUpdate, ContentEdit, Entity, EntityKind, List,
    ListId, ListUpdate, OrderUpdate, Scope, Sprint, SprintId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Metadata for persistence operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceMetadata {
    /// Version of the persistence format
    pub format_version: u32,
    /// ID of the instance that performed the save
    pub instance_id: Uuid,
    /// When this data was saved
    pub saved_at: DateTime<Utc>,
}

impl PersistenceMetadata {
    pub fn new(format_version: u32, instance_id: Uuid) -> Self {
        Self {
            format_version,
            instance_id,
            saved_at: Utc::now(),
        }
    }
}

/// Emitted by stores that can push changes. Carries every scope whose
/// fetched contents may differ after the write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub scopes: Vec<Scope>,
    pub at: DateTime<Utc>,
}

impl StoreChange {
    pub fn new(scopes: Vec<Scope>) -> Self {
        Self {
            scopes,
            at: Utc::now(),
        }
    }

    pub fn touches(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }
}

/// Ordered entity collections: the only persistence seam the sync layer
/// talks to.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Contents of `scope`, ascending by order.
    async fn fetch_ordered(&self, scope: Scope) -> KanbanResult<Vec<Entity>>;

    async fn fetch_entity(&self, kind: EntityKind, id: Uuid) -> KanbanResult<Entity>;

    /// Set one entity's order, reparenting it when `update.parent` is set.
    async fn update_order(&self, update: &OrderUpdate) -> KanbanResult<()>;

    async fn create_entity(&self, entity: Entity) -> KanbanResult<Entity>;

    async fn delete_entity(&self, kind: EntityKind, id: Uuid) -> KanbanResult<()>;

    async fn patch_card(&self, id: CardId, updates: &CardUpdate) -> KanbanResult<Card>;

    async fn patch_list(&self, id: ListId, updates: &ListUpdate) -> KanbanResult<List>;

    /// Apply a comment or checklist change and return the stored card.
    async fn edit_content(&self, id: CardId, edit: &ContentEdit) -> KanbanResult<Card>;

    /// Live change feed, for stores that have one.
    fn changes(&self) -> Option<broadcast::Receiver<StoreChange>> {
        None
    }
}

#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn create_board(&self, board: Board) -> KanbanResult<Board>;

    async fn get_board(&self, id: BoardId) -> KanbanResult<Board>;

    async fn update_board(&self, id: BoardId, updates: BoardUpdate) -> KanbanResult<Board>;

    /// Store a board wholesale (membership edits).
    async fn save_board(&self, board: Board) -> KanbanResult<Board>;

    /// Delete a board with its lists, cards and sprints.
    async fn delete_board(&self, id: BoardId) -> KanbanResult<()>;

    async fn boards_for_member(&self, user_id: &str) -> KanbanResult<Vec<Board>>;
}

#[async_trait]
pub trait SprintStore: Send + Sync {
    async fn create_sprint(&self, sprint: Sprint) -> KanbanResult<Sprint>;

    async fn get_sprint(&self, id: SprintId) -> KanbanResult<Sprint>;

    async fn save_sprint(&self, sprint: Sprint) -> KanbanResult<Sprint>;

    async fn delete_sprint(&self, id: SprintId) -> KanbanResult<()>;

    /// Most recent start date first.
    async fn sprints_for_board(&self, board_id: BoardId) -> KanbanResult<Vec<Sprint>>;

    async fn cards_by_ids(&self, ids: &[CardId]) -> KanbanResult<Vec<Card>>;
}
