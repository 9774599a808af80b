use crate::traits::{BoardStore, EntityStore, SprintStore, StoreChange};
use async_trait::async_trait;
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    Board, BoardId, BoardUpdate, Card, CardId, CardUpdate, ContentEdit, Entity, EntityKind, List,
    ListId, ListUpdate, OrderUpdate, Scope, Snapshot, Sprint, SprintId,
};
use parking_lot::{Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Operations that can be recorded and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Fetch,
    UpdateOrder,
    Create,
    Delete,
    PatchCard,
    PatchList,
    EditContent,
}

/// One call received by the store, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy)]
struct FailureRule {
    op: StoreOp,
    target: Option<Uuid>,
}

impl FailureRule {
    fn matches(&self, call: &StoreCall) -> bool {
        self.op == call.op && (self.target.is_none() || self.target == call.id)
    }
}

/// In-memory document collections with a live change feed.
///
/// Every successful write is announced on a broadcast channel with the
/// scopes it touched. Calls are recorded and can be made to fail or slowed
/// down, which is how the sync layer is exercised in tests.
pub struct DocumentStore {
    data: RwLock<Snapshot>,
    tx: broadcast::Sender<StoreChange>,
    failures: Mutex<Vec<FailureRule>>,
    calls: Mutex<Vec<StoreCall>>,
    latency: Mutex<Option<Duration>>,
}

impl DocumentStore {
    /// The broadcast channel has a buffer size of 64
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::new())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            data: RwLock::new(snapshot),
            tx,
            failures: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            latency: Mutex::new(None),
        }
    }

    /// Copy of the stored documents.
    pub fn snapshot(&self) -> Snapshot {
        self.data.read().clone()
    }

    /// Fail every future `op` call, or only those against `target`.
    pub fn fail_on(&self, op: StoreOp, target: Option<Uuid>) {
        self.failures.lock().push(FailureRule { op, target });
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Delay every call by `latency` before it touches the documents.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Recorded calls of one kind.
    pub fn calls_of(&self, op: StoreOp) -> Vec<StoreCall> {
        self.calls.lock().iter().filter(|c| c.op == op).copied().collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn begin(&self, op: StoreOp, id: Option<Uuid>) -> KanbanResult<()> {
        let call = StoreCall { op, id };
        self.calls.lock().push(call);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failures.lock().iter().any(|rule| rule.matches(&call)) {
            return Err(KanbanError::Persistence(format!(
                "injected failure for {:?} {:?}",
                op, id
            )));
        }
        Ok(())
    }

    fn announce(&self, scopes: Vec<Scope>) {
        tracing::debug!("Store change touching {} scope(s)", scopes.len());
        // No receivers is fine.
        let _ = self.tx.send(StoreChange::new(scopes));
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for DocumentStore {
    async fn fetch_ordered(&self, scope: Scope) -> KanbanResult<Vec<Entity>> {
        self.begin(StoreOp::Fetch, Some(scope.parent_id())).await?;
        Ok(self.data.read().fetch_ordered(scope))
    }

    async fn fetch_entity(&self, kind: EntityKind, id: Uuid) -> KanbanResult<Entity> {
        self.begin(StoreOp::Fetch, Some(id)).await?;
        self.data.read().entity(kind, id)
    }

    async fn update_order(&self, update: &OrderUpdate) -> KanbanResult<()> {
        self.begin(StoreOp::UpdateOrder, Some(update.id)).await?;
        let scopes = self.data.write().update_order(update)?;
        self.announce(scopes);
        Ok(())
    }

    async fn create_entity(&self, entity: Entity) -> KanbanResult<Entity> {
        self.begin(StoreOp::Create, Some(entity.id())).await?;
        let scopes = self.data.write().insert_entity(entity.clone())?;
        self.announce(scopes);
        Ok(entity)
    }

    async fn delete_entity(&self, kind: EntityKind, id: Uuid) -> KanbanResult<()> {
        self.begin(StoreOp::Delete, Some(id)).await?;
        let scopes = self.data.write().remove_entity(kind, id)?;
        self.announce(scopes);
        Ok(())
    }

    async fn patch_card(&self, id: CardId, updates: &CardUpdate) -> KanbanResult<Card> {
        self.begin(StoreOp::PatchCard, Some(id)).await?;
        let (card, scopes) = self.data.write().patch_card(id, updates)?;
        self.announce(scopes);
        Ok(card)
    }

    async fn patch_list(&self, id: ListId, updates: &ListUpdate) -> KanbanResult<List> {
        self.begin(StoreOp::PatchList, Some(id)).await?;
        let (list, scopes) = self.data.write().patch_list(id, updates)?;
        self.announce(scopes);
        Ok(list)
    }

    async fn edit_content(&self, id: CardId, edit: &ContentEdit) -> KanbanResult<Card> {
        self.begin(StoreOp::EditContent, Some(id)).await?;
        let (card, scopes) = self.data.write().edit_card_content(id, edit)?;
        self.announce(scopes);
        Ok(card)
    }

    fn changes(&self) -> Option<broadcast::Receiver<StoreChange>> {
        Some(self.tx.subscribe())
    }
}

#[async_trait]
impl BoardStore for DocumentStore {
    async fn create_board(&self, board: Board) -> KanbanResult<Board> {
        self.data.write().insert_board(board.clone())?;
        Ok(board)
    }

    async fn get_board(&self, id: BoardId) -> KanbanResult<Board> {
        self.data.read().board(id).cloned()
    }

    async fn update_board(&self, id: BoardId, updates: BoardUpdate) -> KanbanResult<Board> {
        self.data.write().update_board(id, updates)
    }

    async fn save_board(&self, board: Board) -> KanbanResult<Board> {
        self.data.write().replace_board(board.clone())?;
        Ok(board)
    }

    async fn delete_board(&self, id: BoardId) -> KanbanResult<()> {
        self.data.write().remove_board(id)?;
        self.announce(vec![Scope::Lists(id), Scope::BoardCards(id)]);
        Ok(())
    }

    async fn boards_for_member(&self, user_id: &str) -> KanbanResult<Vec<Board>> {
        Ok(self.data.read().boards_for_member(user_id))
    }
}

#[async_trait]
impl SprintStore for DocumentStore {
    async fn create_sprint(&self, sprint: Sprint) -> KanbanResult<Sprint> {
        self.data.write().insert_sprint(sprint.clone())?;
        Ok(sprint)
    }

    async fn get_sprint(&self, id: SprintId) -> KanbanResult<Sprint> {
        self.data.read().sprint(id).cloned()
    }

    async fn save_sprint(&self, sprint: Sprint) -> KanbanResult<Sprint> {
        self.data.write().replace_sprint(sprint.clone())?;
        Ok(sprint)
    }

    async fn delete_sprint(&self, id: SprintId) -> KanbanResult<()> {
        self.data.write().remove_sprint(id)
    }

    async fn sprints_for_board(&self, board_id: BoardId) -> KanbanResult<Vec<Sprint>> {
        Ok(self.data.read().sprints_for_board(board_id))
    }

    async fn cards_by_ids(&self, ids: &[CardId]) -> KanbanResult<Vec<Card>> {
        Ok(self.data.read().cards_by_ids(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (DocumentStore, BoardId, Uuid) {
        let store = DocumentStore::new();
        let board = store
            .create_board(Board::new("u1".into(), "Ada".into(), "Ops".into(), None))
            .await
            .unwrap();
        let list = List::new(board.id, "Todo".into(), 0);
        let list_id = list.id;
        store.create_entity(Entity::List(list)).await.unwrap();
        (store, board.id, list_id)
    }

    #[tokio::test]
    async fn test_change_feed_announces_scopes() {
        let (store, board_id, list_id) = seeded().await;
        let mut rx = store.changes().unwrap();

        let card = Card::new(board_id, list_id, "c".into(), 0);
        store.create_entity(Entity::Card(card)).await.unwrap();

        let change = rx.recv().await.unwrap();
        assert!(change.touches(&Scope::Cards(list_id)));
        assert!(change.touches(&Scope::BoardCards(board_id)));
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_data_untouched() {
        let (store, _, list_id) = seeded().await;
        store.fail_on(StoreOp::UpdateOrder, Some(list_id));

        let result = store
            .update_order(&OrderUpdate::new(EntityKind::List, list_id, 5))
            .await;
        assert!(matches!(result, Err(KanbanError::Persistence(_))));
        assert_eq!(store.snapshot().lists[0].order, 0);

        store.clear_failures();
        store
            .update_order(&OrderUpdate::new(EntityKind::List, list_id, 5))
            .await
            .unwrap();
        assert_eq!(store.snapshot().lists[0].order, 5);
    }

    #[tokio::test]
    async fn test_calls_recorded_in_order() {
        let (store, board_id, list_id) = seeded().await;
        store.clear_calls();

        store.fetch_ordered(Scope::Lists(board_id)).await.unwrap();
        store
            .update_order(&OrderUpdate::new(EntityKind::List, list_id, 0))
            .await
            .unwrap();

        let ops: Vec<StoreOp> = store.calls().iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![StoreOp::Fetch, StoreOp::UpdateOrder]);
        assert_eq!(store.calls_of(StoreOp::UpdateOrder)[0].id, Some(list_id));
    }

    #[tokio::test]
    async fn test_patch_card_returns_updated() {
        let (store, board_id, list_id) = seeded().await;
        let card = Card::new(board_id, list_id, "c".into(), 0);
        let id = card.id;
        store.create_entity(Entity::Card(card)).await.unwrap();

        let patched = store
            .patch_card(id, &CardUpdate::priority(kanban_domain::CardPriority::High))
            .await
            .unwrap();
        assert_eq!(patched.priority, kanban_domain::CardPriority::High);
    }

    #[tokio::test]
    async fn test_patch_list_and_content_are_recorded() {
        let (store, board_id, list_id) = seeded().await;
        let card = Card::new(board_id, list_id, "c".into(), 0);
        let card_id = card.id;
        store.create_entity(Entity::Card(card)).await.unwrap();
        store.clear_calls();
        let mut rx = store.changes().unwrap();

        let list = store
            .patch_list(
                list_id,
                &ListUpdate {
                    name: Some("Doing".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(list.name, "Doing");
        assert!(rx.recv().await.unwrap().touches(&Scope::Lists(board_id)));

        let checklist = ContentEdit::add_checklist("QA").unwrap();
        let card = store.edit_content(card_id, &checklist).await.unwrap();
        assert_eq!(card.checklists.len(), 1);
        assert!(rx.recv().await.unwrap().touches(&Scope::Cards(list_id)));

        let ops: Vec<StoreOp> = store.calls().iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![StoreOp::PatchList, StoreOp::EditContent]);
    }

    #[tokio::test]
    async fn test_missing_board() {
        let store = DocumentStore::new();
        let result = store.get_board(Uuid::new_v4()).await;
        assert!(matches!(result, Err(KanbanError::NotFound(_))));
    }
}
