use crate::store::atomic_writer::AtomicWriter;
use crate::traits::{BoardStore, EntityStore, PersistenceMetadata, SprintStore};
use async_trait::async_trait;
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    Board, BoardId, BoardUpdate, Card, CardId, CardUpdate, ContentEdit, Entity, EntityKind, List,
    ListId, ListUpdate, OrderUpdate, Scope, Snapshot, Sprint, SprintId,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const FORMAT_VERSION: u32 = 1;

/// Single-file JSON store.
///
/// Every call re-reads the file, so writes made by other processes show up
/// on the next fetch. Writes are read-modify-write under an in-process lock
/// and land through [`AtomicWriter`].
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    instance_id: Uuid,
    write_lock: Mutex<()>,
}

/// On-disk layout of the data file
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonEnvelope {
    pub version: u32,
    pub metadata: PersistenceMetadata,
    pub data: Snapshot,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_instance_id(path, Uuid::new_v4())
    }

    /// Create a store with a specific instance ID
    pub fn with_instance_id(path: impl AsRef<Path>, instance_id: Uuid) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            instance_id,
            write_lock: Mutex::new(()),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Current file contents; an absent file is an empty snapshot.
    pub async fn load(&self) -> KanbanResult<Snapshot> {
        let Some(bytes) = AtomicWriter::read_optional(&self.path).await? else {
            return Ok(Snapshot::new());
        };
        let envelope: JsonEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != FORMAT_VERSION {
            return Err(KanbanError::Serialization(format!(
                "Unsupported format version: {}",
                envelope.version
            )));
        }
        Ok(envelope.data)
    }

    pub async fn save(&self, data: Snapshot) -> KanbanResult<PersistenceMetadata> {
        let metadata = PersistenceMetadata::new(FORMAT_VERSION, self.instance_id);
        let envelope = JsonEnvelope {
            version: FORMAT_VERSION,
            metadata: metadata.clone(),
            data,
        };
        let json_bytes = serde_json::to_vec_pretty(&envelope)?;
        AtomicWriter::write_atomic(&self.path, &json_bytes).await?;

        tracing::info!("Saved {} bytes to {}", json_bytes.len(), self.path.display());
        Ok(metadata)
    }

    async fn read<T>(&self, f: impl FnOnce(&Snapshot) -> KanbanResult<T>) -> KanbanResult<T> {
        let data = self.load().await?;
        f(&data)
    }

    /// Load, mutate, save. Nothing is written when `f` fails.
    async fn modify<T>(
        &self,
        f: impl FnOnce(&mut Snapshot) -> KanbanResult<T> + Send,
    ) -> KanbanResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.load().await?;
        let result = f(&mut data)?;
        self.save(data).await?;
        Ok(result)
    }
}

#[async_trait]
impl EntityStore for JsonFileStore {
    async fn fetch_ordered(&self, scope: Scope) -> KanbanResult<Vec<Entity>> {
        self.read(|data| Ok(data.fetch_ordered(scope))).await
    }

    async fn fetch_entity(&self, kind: EntityKind, id: Uuid) -> KanbanResult<Entity> {
        self.read(|data| data.entity(kind, id)).await
    }

    async fn update_order(&self, update: &OrderUpdate) -> KanbanResult<()> {
        let update = *update;
        self.modify(move |data| data.update_order(&update).map(|_| ()))
            .await
    }

    async fn create_entity(&self, entity: Entity) -> KanbanResult<Entity> {
        self.modify(move |data| {
            data.insert_entity(entity.clone())?;
            Ok(entity)
        })
        .await
    }

    async fn delete_entity(&self, kind: EntityKind, id: Uuid) -> KanbanResult<()> {
        self.modify(move |data| data.remove_entity(kind, id).map(|_| ()))
            .await
    }

    async fn patch_card(&self, id: CardId, updates: &CardUpdate) -> KanbanResult<Card> {
        let updates = updates.clone();
        self.modify(move |data| data.patch_card(id, &updates).map(|(card, _)| card))
            .await
    }

    async fn patch_list(&self, id: ListId, updates: &ListUpdate) -> KanbanResult<List> {
        let updates = updates.clone();
        self.modify(move |data| data.patch_list(id, &updates).map(|(list, _)| list))
            .await
    }

    async fn edit_content(&self, id: CardId, edit: &ContentEdit) -> KanbanResult<Card> {
        let edit = edit.clone();
        self.modify(move |data| data.edit_card_content(id, &edit).map(|(card, _)| card))
            .await
    }
}

#[async_trait]
impl BoardStore for JsonFileStore {
    async fn create_board(&self, board: Board) -> KanbanResult<Board> {
        self.modify(move |data| {
            data.insert_board(board.clone())?;
            Ok(board)
        })
        .await
    }

    async fn get_board(&self, id: BoardId) -> KanbanResult<Board> {
        self.read(|data| data.board(id).cloned()).await
    }

    async fn update_board(&self, id: BoardId, updates: BoardUpdate) -> KanbanResult<Board> {
        self.modify(move |data| data.update_board(id, updates)).await
    }

    async fn save_board(&self, board: Board) -> KanbanResult<Board> {
        self.modify(move |data| {
            data.replace_board(board.clone())?;
            Ok(board)
        })
        .await
    }

    async fn delete_board(&self, id: BoardId) -> KanbanResult<()> {
        self.modify(move |data| data.remove_board(id)).await
    }

    async fn boards_for_member(&self, user_id: &str) -> KanbanResult<Vec<Board>> {
        self.read(|data| Ok(data.boards_for_member(user_id))).await
    }
}

#[async_trait]
impl SprintStore for JsonFileStore {
    async fn create_sprint(&self, sprint: Sprint) -> KanbanResult<Sprint> {
        self.modify(move |data| {
            data.insert_sprint(sprint.clone())?;
            Ok(sprint)
        })
        .await
    }

    async fn get_sprint(&self, id: SprintId) -> KanbanResult<Sprint> {
        self.read(|data| data.sprint(id).cloned()).await
    }

    async fn save_sprint(&self, sprint: Sprint) -> KanbanResult<Sprint> {
        self.modify(move |data| {
            data.replace_sprint(sprint.clone())?;
            Ok(sprint)
        })
        .await
    }

    async fn delete_sprint(&self, id: SprintId) -> KanbanResult<()> {
        self.modify(move |data| data.remove_sprint(id)).await
    }

    async fn sprints_for_board(&self, board_id: BoardId) -> KanbanResult<Vec<Sprint>> {
        self.read(|data| Ok(data.sprints_for_board(board_id))).await
    }

    async fn cards_by_ids(&self, ids: &[CardId]) -> KanbanResult<Vec<Card>> {
        self.read(|data| Ok(data.cards_by_ids(ids))).await
    }
}
