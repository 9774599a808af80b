//! Test doubles shared across the crate's unit tests.

use async_trait::async_trait;
use kanban_core::KanbanResult;
use kanban_domain::{
    Card, CardId, CardUpdate, ContentEdit, Entity, EntityKind, List, ListId, ListUpdate, OrderUpdate,
    Scope,
};
use kanban_persistence::EntityStore;
use mockall::mock;
use uuid::Uuid;

mock! {
    pub Store {}

    #[async_trait]
    impl EntityStore for Store {
        async fn fetch_ordered(&self, scope: Scope) -> KanbanResult<Vec<Entity>>;
        async fn fetch_entity(&self, kind: EntityKind, id: Uuid) -> KanbanResult<Entity>;
        async fn update_order(&self, update: &OrderUpdate) -> KanbanResult<()>;
        async fn create_entity(&self, entity: Entity) -> KanbanResult<Entity>;
        async fn delete_entity(&self, kind: EntityKind, id: Uuid) -> KanbanResult<()>;
        async fn patch_card(&self, id: CardId, updates: &CardUpdate) -> KanbanResult<Card>;
        async fn patch_list(&self, id: ListId, updates: &ListUpdate) -> KanbanResult<List>;
        async fn edit_content(&self, id: CardId, edit: &ContentEdit) -> KanbanResult<Card>;
    }
}
