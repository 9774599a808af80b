use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult, LogEntry, Loggable, Positioned};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::board::{BoardId, UserId};
use crate::content::{checklist_mut, comment_mut, Attachment, Checklist, Comment, ContentEdit};
use crate::field_update::FieldUpdate;
use crate::list::ListId;
use crate::sprint::SprintId;

pub type CardId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardStatus {
    #[default]
    Open,
    InProgress,
    InReview,
    Blocked,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardType {
    #[default]
    Feature,
    Bug,
    Improvement,
    Docs,
    Test,
    Refactor,
}

// Case-insensitive parsers; `_` and `-` are interchangeable.
fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace('_', "-")
}

impl FromStr for CardPriority {
    type Err = KanbanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(KanbanError::Validation(format!("unknown priority '{}'", other))),
        }
    }
}

impl FromStr for CardStatus {
    type Err = KanbanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "open" => Ok(Self::Open),
            "in-progress" => Ok(Self::InProgress),
            "in-review" => Ok(Self::InReview),
            "blocked" => Ok(Self::Blocked),
            "done" => Ok(Self::Done),
            other => Err(KanbanError::Validation(format!("unknown status '{}'", other))),
        }
    }
}

impl FromStr for CardType {
    type Err = KanbanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "feature" => Ok(Self::Feature),
            "bug" => Ok(Self::Bug),
            "improvement" => Ok(Self::Improvement),
            "docs" => Ok(Self::Docs),
            "test" => Ok(Self::Test),
            "refactor" => Ok(Self::Refactor),
            other => Err(KanbanError::Validation(format!("unknown card type '{}'", other))),
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::InReview => "in-review",
            Self::Blocked => "blocked",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
    pub user_id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub list_id: ListId,
    pub board_id: BoardId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order: i32,
    #[serde(default)]
    pub priority: CardPriority,
    #[serde(default)]
    pub status: CardStatus,
    #[serde(default, rename = "type")]
    pub card_type: CardType,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub story_points: Option<u32>,
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
    #[serde(default)]
    pub checklists: Vec<Checklist>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub created_by: UserId,
    #[serde(default)]
    pub history: Vec<LogEntry>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(board_id: BoardId, list_id: ListId, name: String, order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            list_id,
            board_id,
            name,
            description: String::new(),
            order,
            priority: CardPriority::Medium,
            status: CardStatus::Open,
            card_type: CardType::Feature,
            due_date: None,
            assignee: None,
            tags: Vec::new(),
            story_points: None,
            sprint_id: None,
            checklists: Vec::new(),
            comments: Vec::new(),
            attachments: Vec::new(),
            created_by: UserId::new(),
            history: Vec::new(),
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn move_to_list(&mut self, list_id: ListId, order: i32) {
        if self.list_id != list_id {
            self.add_log(LogEntry::new(format!(
                "Moved from list {} to list {}",
                self.list_id, list_id
            )));
        }
        self.list_id = list_id;
        self.order = order;
        self.updated_at = Utc::now();
    }

    pub fn update_status(&mut self, status: CardStatus) {
        if status == self.status {
            return;
        }
        self.add_log(LogEntry::new(format!(
            "Status changed from {} to {}",
            self.status, status
        )));
        self.completed_at = (status == CardStatus::Done).then(Utc::now);
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn is_done(&self) -> bool {
        self.status == CardStatus::Done
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_done() && self.due_date.is_some_and(|due| due < now)
    }

    /// Completed and total checklist items across all checklists.
    pub fn checklist_progress(&self) -> (usize, usize) {
        self.checklists.iter().fold((0, 0), |(done, total), c| {
            (done + c.completed(), total + c.items.len())
        })
    }

    /// Comments newest first.
    pub fn comments_newest_first(&self) -> Vec<&Comment> {
        let mut comments: Vec<&Comment> = self.comments.iter().collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    /// Apply one comment or checklist change. Nothing changes on error.
    pub fn apply_content(&mut self, edit: &ContentEdit) -> KanbanResult<()> {
        match edit {
            ContentEdit::AddComment(comment) => {
                if self.comments.iter().any(|c| c.id == comment.id) {
                    return Err(KanbanError::Validation(format!(
                        "comment {} already exists",
                        comment.id
                    )));
                }
                self.comments.push(comment.clone());
            }
            ContentEdit::EditComment {
                comment_id,
                author,
                text,
            } => {
                comment_mut(&mut self.comments, *comment_id, author)?.edit(text.clone());
            }
            ContentEdit::DeleteComment { comment_id, author } => {
                comment_mut(&mut self.comments, *comment_id, author)?;
                self.comments.retain(|c| c.id != *comment_id);
            }
            ContentEdit::AddChecklist(checklist) => {
                if self.checklists.iter().any(|c| c.id == checklist.id) {
                    return Err(KanbanError::Validation(format!(
                        "checklist {} already exists",
                        checklist.id
                    )));
                }
                self.checklists.push(checklist.clone());
            }
            ContentEdit::AddChecklistItem { checklist_id, item } => {
                checklist_mut(&mut self.checklists, *checklist_id)?.add_item(item.clone());
            }
            ContentEdit::ToggleItem {
                checklist_id,
                item_id,
            } => {
                checklist_mut(&mut self.checklists, *checklist_id)?
                    .toggle(*item_id)
                    .ok_or_else(|| KanbanError::NotFound(format!("checklist item {}", item_id)))?;
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Apply a partial update. Returns true if any field was part of the patch.
    pub fn update(&mut self, updates: CardUpdate) -> bool {
        let changed = updates.is_change();
        if let Some(name) = updates.name {
            self.name = name;
        }
        if let Some(description) = updates.description {
            self.description = description;
        }
        if let Some(priority) = updates.priority {
            self.priority = priority;
        }
        if let Some(status) = updates.status {
            self.update_status(status);
        }
        if let Some(card_type) = updates.card_type {
            self.card_type = card_type;
        }
        updates.due_date.apply_to(&mut self.due_date);
        updates.assignee.apply_to(&mut self.assignee);
        updates.story_points.apply_to(&mut self.story_points);
        updates.sprint_id.apply_to(&mut self.sprint_id);
        if let Some(tags) = updates.tags {
            self.tags = tags;
        }
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }
}

impl Positioned for Card {
    fn id(&self) -> Uuid {
        self.id
    }

    fn scope_id(&self) -> Uuid {
        self.list_id
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn set_order(&mut self, order: i32) {
        self.order = order;
        self.updated_at = Utc::now();
    }

    fn set_scope_id(&mut self, scope_id: Uuid) {
        let order = self.order;
        self.move_to_list(scope_id, order);
    }
}

impl Loggable for Card {
    fn add_log(&mut self, entry: LogEntry) {
        self.history.push(entry);
    }

    fn get_logs(&self) -> &[LogEntry] {
        &self.history
    }
}

/// Partial update for Card, the payload of a quick edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<CardPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CardStatus>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub card_type: Option<CardType>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub due_date: FieldUpdate<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub assignee: FieldUpdate<Assignee>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub story_points: FieldUpdate<u32>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_no_change")]
    pub sprint_id: FieldUpdate<SprintId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl CardUpdate {
    pub fn status(status: CardStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn priority(priority: CardPriority) -> Self {
        Self {
            priority: Some(priority),
            ..Default::default()
        }
    }

    pub fn is_change(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.priority.is_some()
            || self.status.is_some()
            || self.card_type.is_some()
            || self.due_date.is_change()
            || self.assignee.is_change()
            || self.story_points.is_change()
            || self.sprint_id.is_change()
            || self.tags.is_some()
    }
}
