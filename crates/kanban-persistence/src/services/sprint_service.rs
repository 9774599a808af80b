use crate::traits::{BoardStore, EntityStore, SprintStore};
use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    BoardId, BoardUpdate, CardId, CardUpdate, DailyNote, FieldUpdate, Retrospective, Sprint,
    SprintId, SprintMetrics,
};
use std::sync::Arc;

/// Sprint bookkeeping over any store that holds boards, cards and sprints.
pub struct SprintService<S> {
    store: Arc<S>,
}

impl<S> Clone for SprintService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> SprintService<S>
where
    S: EntityStore + BoardStore + SprintStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a sprint numbered after the board's existing sprints.
    pub async fn create_sprint(
        &self,
        board_id: BoardId,
        name: String,
        goal: Option<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> KanbanResult<Sprint> {
        self.store.get_board(board_id).await?;
        let existing = self.store.sprints_for_board(board_id).await?;
        let mut sprint = Sprint::new(board_id, name, start_date, end_date)?;
        sprint.goal = goal;
        sprint.number = Some(existing.len() as u32 + 1);
        let sprint = self.store.create_sprint(sprint).await?;
        tracing::info!("Created sprint {} on board {}", sprint.id, board_id);
        Ok(sprint)
    }

    /// Add a card to the sprint, tag the card with it, then refresh metrics.
    pub async fn add_card(&self, sprint_id: SprintId, card_id: CardId) -> KanbanResult<Sprint> {
        let mut sprint = self.store.get_sprint(sprint_id).await?;
        let card = self.store.cards_by_ids(&[card_id]).await?;
        let Some(card) = card.first() else {
            return Err(KanbanError::NotFound(format!("card {}", card_id)));
        };
        if card.board_id != sprint.board_id {
            return Err(KanbanError::Validation(format!(
                "card {} is not on the sprint's board",
                card_id
            )));
        }

        if sprint.add_card(card_id) {
            self.store.save_sprint(sprint).await?;
        }
        self.store
            .patch_card(
                card_id,
                &CardUpdate {
                    sprint_id: FieldUpdate::Set(sprint_id),
                    ..Default::default()
                },
            )
            .await?;
        self.refresh_metrics(sprint_id).await
    }

    pub async fn remove_card(&self, sprint_id: SprintId, card_id: CardId) -> KanbanResult<Sprint> {
        let mut sprint = self.store.get_sprint(sprint_id).await?;
        if !sprint.remove_card(card_id) {
            return Ok(sprint);
        }
        self.store.save_sprint(sprint).await?;
        self.store
            .patch_card(
                card_id,
                &CardUpdate {
                    sprint_id: FieldUpdate::Clear,
                    ..Default::default()
                },
            )
            .await?;
        self.refresh_metrics(sprint_id).await
    }

    /// Re-fetch every member card and recompute the totals wholesale.
    pub async fn refresh_metrics(&self, sprint_id: SprintId) -> KanbanResult<Sprint> {
        let mut sprint = self.store.get_sprint(sprint_id).await?;
        let cards = self.store.cards_by_ids(&sprint.card_ids).await?;
        let metrics = SprintMetrics::compute(&cards);
        tracing::debug!(
            "Sprint {} metrics: {}/{} points",
            sprint_id,
            metrics.completed_points,
            metrics.total_points
        );
        sprint.set_metrics(metrics);
        self.store.save_sprint(sprint).await
    }

    pub async fn add_daily_note(&self, sprint_id: SprintId, note: DailyNote) -> KanbanResult<Sprint> {
        let mut sprint = self.store.get_sprint(sprint_id).await?;
        sprint.add_daily_note(note);
        self.store.save_sprint(sprint).await
    }

    pub async fn set_retrospective(
        &self,
        sprint_id: SprintId,
        retrospective: Retrospective,
    ) -> KanbanResult<Sprint> {
        let mut sprint = self.store.get_sprint(sprint_id).await?;
        sprint.set_retrospective(retrospective);
        self.store.save_sprint(sprint).await
    }

    /// Start the sprint and make it the board's active sprint.
    pub async fn activate(&self, sprint_id: SprintId) -> KanbanResult<Sprint> {
        let mut sprint = self.store.get_sprint(sprint_id).await?;
        sprint.activate()?;
        let sprint = self.store.save_sprint(sprint).await?;
        self.store
            .update_board(
                sprint.board_id,
                BoardUpdate {
                    active_sprint_id: FieldUpdate::Set(sprint.id),
                    ..Default::default()
                },
            )
            .await?;
        Ok(sprint)
    }

    /// Close the sprint with final metrics.
    pub async fn complete(&self, sprint_id: SprintId) -> KanbanResult<Sprint> {
        self.refresh_metrics(sprint_id).await?;
        self.close(sprint_id, Sprint::complete).await
    }

    pub async fn cancel(&self, sprint_id: SprintId) -> KanbanResult<Sprint> {
        self.close(sprint_id, Sprint::cancel).await
    }

    async fn close(
        &self,
        sprint_id: SprintId,
        transition: fn(&mut Sprint) -> KanbanResult<()>,
    ) -> KanbanResult<Sprint> {
        let mut sprint = self.store.get_sprint(sprint_id).await?;
        transition(&mut sprint)?;
        let sprint = self.store.save_sprint(sprint).await?;

        let board = self.store.get_board(sprint.board_id).await?;
        if board.active_sprint_id == Some(sprint.id) {
            self.store
                .update_board(
                    board.id,
                    BoardUpdate {
                        active_sprint_id: FieldUpdate::Clear,
                        ..Default::default()
                    },
                )
                .await?;
        }
        Ok(sprint)
    }
}
