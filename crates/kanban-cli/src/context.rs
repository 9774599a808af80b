use std::path::PathBuf;
use std::sync::Arc;

use kanban_core::{AppConfig, KanbanError, KanbanResult};
use kanban_domain::{Board, BoardId, Card, CardId, EntityKind, List, ListId, UserId};
use kanban_persistence::{BoardStore, EntityStore, JsonFileStore, SprintService};
use kanban_sync::{BoardSession, PollScheduler};

/// Everything a command handler needs: the data file, the loaded config and
/// the acting user.
pub struct CliContext {
    pub store: Arc<JsonFileStore>,
    pub config: AppConfig,
    pub user: UserId,
}

impl CliContext {
    pub fn new(file: PathBuf, user: UserId, config: AppConfig) -> Self {
        tracing::debug!("Using data file {}", file.display());
        Self {
            store: Arc::new(JsonFileStore::new(file)),
            config,
            user,
        }
    }

    pub fn sprints(&self) -> SprintService<JsonFileStore> {
        SprintService::new(Arc::clone(&self.store))
    }

    /// A scheduler for this process's sessions, ticking at the configured
    /// interval.
    pub fn scheduler(&self) -> PollScheduler {
        let store: Arc<dyn EntityStore> = self.store.clone();
        PollScheduler::new(store, self.config.effective_poll_interval())
    }

    /// Open a live session on `board_id` after checking the user may edit it.
    pub async fn open_for_edit(
        &self,
        scheduler: &PollScheduler,
        board_id: BoardId,
    ) -> KanbanResult<BoardSession> {
        self.require_editor(board_id).await?;
        let store: Arc<dyn EntityStore> = self.store.clone();
        BoardSession::open(store, scheduler, board_id).await
    }

    /// Load the board, failing unless the acting user is a member.
    pub async fn require_member(&self, board_id: BoardId) -> KanbanResult<Board> {
        let board = self.store.get_board(board_id).await?;
        if !board.is_member(&self.user) {
            return Err(KanbanError::Validation(format!(
                "user '{}' is not a member of board {}",
                self.user, board_id
            )));
        }
        Ok(board)
    }

    /// Load the board, failing unless the acting user is an admin or editor.
    pub async fn require_editor(&self, board_id: BoardId) -> KanbanResult<Board> {
        let board = self.require_member(board_id).await?;
        if !board.can_edit(&self.user) {
            return Err(KanbanError::Validation(format!(
                "user '{}' cannot edit board {}",
                self.user, board_id
            )));
        }
        Ok(board)
    }

    pub async fn list(&self, list_id: ListId) -> KanbanResult<List> {
        self.store
            .fetch_entity(EntityKind::List, list_id)
            .await?
            .into_list()
            .ok_or_else(|| KanbanError::NotFound(format!("{} is not a list", list_id)))
    }

    pub async fn card(&self, card_id: CardId) -> KanbanResult<Card> {
        self.store
            .fetch_entity(EntityKind::Card, card_id)
            .await?
            .into_card()
            .ok_or_else(|| KanbanError::NotFound(format!("{} is not a card", card_id)))
    }
}
