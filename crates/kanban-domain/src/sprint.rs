use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::board::{BoardId, UserId};
use crate::card::{Card, CardId};
use crate::field_update::FieldUpdate;

pub type SprintId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SprintStatus {
    #[default]
    Planning,
    Active,
    InReview,
    Done,
    Cancelled,
}

impl SprintStatus {
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

impl FromStr for SprintStatus {
    type Err = KanbanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "planning" => Ok(Self::Planning),
            "active" => Ok(Self::Active),
            "in-review" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(KanbanError::Validation(format!(
                "unknown sprint status '{}'",
                other
            ))),
        }
    }
}

/// Sprint totals, recomputed wholesale from the member cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SprintMetrics {
    pub total_points: u32,
    pub completed_points: u32,
    pub total_cards: u32,
    pub completed_cards: u32,
    /// Completed points; kept as its own field for charting.
    pub velocity: u32,
}

impl SprintMetrics {
    pub fn compute<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Self {
        let mut metrics = Self::default();
        for card in cards {
            let points = card.story_points.unwrap_or(0);
            metrics.total_points = metrics.total_points.saturating_add(points);
            metrics.total_cards = metrics.total_cards.saturating_add(1);
            if card.is_done() {
                metrics.completed_points = metrics.completed_points.saturating_add(points);
                metrics.completed_cards = metrics.completed_cards.saturating_add(1);
            }
        }
        metrics.velocity = metrics.completed_points;
        metrics
    }

    pub fn remaining_points(&self) -> u32 {
        self.total_points.saturating_sub(self.completed_points)
    }

    /// Completion ratio by points in `0.0..=1.0`; zero when nothing is estimated.
    pub fn completion(&self) -> f64 {
        if self.total_points == 0 {
            0.0
        } else {
            self.completed_points as f64 / self.total_points as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyNote {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub impediments: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub participants: Vec<UserId>,
}

impl DailyNote {
    pub fn new(impediments: Vec<String>, notes: Vec<String>, participants: Vec<UserId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: Utc::now(),
            impediments,
            notes,
            participants,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Retrospective {
    #[serde(default)]
    pub positives: Vec<String>,
    #[serde(default)]
    pub negatives: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub participants: Vec<UserId>,
    #[serde(default)]
    pub held_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    pub board_id: BoardId,
    pub name: String,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub goal: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub status: SprintStatus,
    #[serde(default)]
    pub card_ids: Vec<CardId>,
    #[serde(default)]
    pub metrics: Option<SprintMetrics>,
    #[serde(default)]
    pub daily_notes: Vec<DailyNote>,
    #[serde(default)]
    pub retrospective: Option<Retrospective>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sprint {
    pub fn new(
        board_id: BoardId,
        name: String,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> KanbanResult<Self> {
        if end_date < start_date {
            return Err(KanbanError::Validation(
                "sprint end date precedes its start date".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            board_id,
            name,
            number: None,
            goal: None,
            start_date,
            end_date,
            status: SprintStatus::Planning,
            card_ids: Vec::new(),
            metrics: None,
            daily_notes: Vec::new(),
            retrospective: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn contains(&self, card_id: CardId) -> bool {
        self.card_ids.contains(&card_id)
    }

    /// Returns false if the card was already a member.
    pub fn add_card(&mut self, card_id: CardId) -> bool {
        if self.contains(card_id) {
            return false;
        }
        self.card_ids.push(card_id);
        self.updated_at = Utc::now();
        true
    }

    pub fn remove_card(&mut self, card_id: CardId) -> bool {
        let before = self.card_ids.len();
        self.card_ids.retain(|id| *id != card_id);
        let removed = self.card_ids.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn add_daily_note(&mut self, note: DailyNote) {
        self.daily_notes.push(note);
        self.updated_at = Utc::now();
    }

    /// Replace the retrospective wholesale.
    pub fn set_retrospective(&mut self, mut retrospective: Retrospective) {
        retrospective.held_at = Some(Utc::now());
        self.retrospective = Some(retrospective);
        self.updated_at = Utc::now();
    }

    pub fn set_metrics(&mut self, metrics: SprintMetrics) {
        self.metrics = Some(metrics);
        self.updated_at = Utc::now();
    }

    pub fn activate(&mut self) -> KanbanResult<()> {
        self.transition(SprintStatus::Active)
    }

    pub fn start_review(&mut self) -> KanbanResult<()> {
        self.transition(SprintStatus::InReview)
    }

    pub fn complete(&mut self) -> KanbanResult<()> {
        self.transition(SprintStatus::Done)
    }

    pub fn cancel(&mut self) -> KanbanResult<()> {
        self.transition(SprintStatus::Cancelled)
    }

    fn transition(&mut self, to: SprintStatus) -> KanbanResult<()> {
        if self.status.is_closed() {
            return Err(KanbanError::Validation(format!(
                "sprint '{}' is already closed",
                self.name
            )));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        self.status == SprintStatus::Active && now > self.end_date
    }

    /// Update sprint with partial changes
    pub fn update(&mut self, updates: SprintUpdate) {
        if let Some(name) = updates.name {
            self.name = name;
        }
        updates.goal.apply_to(&mut self.goal);
        updates.number.apply_to(&mut self.number);
        if let Some(start_date) = updates.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = updates.end_date {
            self.end_date = end_date;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update struct for Sprint
#[derive(Debug, Clone, Default)]
pub struct SprintUpdate {
    pub name: Option<String>,
    pub goal: FieldUpdate<String>,
    pub number: FieldUpdate<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
