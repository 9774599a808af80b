//! Card content: checklists, comments and attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kanban_core::{KanbanError, KanbanResult};

use crate::board::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub text: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub assignee: Option<UserId>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub order: i32,
}

impl ChecklistItem {
    /// A pending item; its order is assigned when it joins a checklist.
    pub fn new(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            done: false,
            assignee: None,
            due_date: None,
            order: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    pub created_at: DateTime<Utc>,
}

impl Checklist {
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append `item` after the existing ones.
    pub fn add_item(&mut self, mut item: ChecklistItem) -> Uuid {
        item.order = self.items.len() as i32;
        let id = item.id;
        self.items.push(item);
        id
    }

    /// Flip an item's completion flag. Returns the new value, or `None` if
    /// the item does not exist.
    pub fn toggle(&mut self, item_id: Uuid) -> Option<bool> {
        let item = self.items.iter_mut().find(|i| i.id == item_id)?;
        item.done = !item.done;
        Some(item.done)
    }

    pub fn completed(&self) -> usize {
        self.items.iter().filter(|i| i.done).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: UserId,
    pub user_name: String,
    pub text: String,
    #[serde(default)]
    pub mentions: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(user_id: UserId, user_name: String, text: String) -> Self {
        let mentions = extract_mentions(&text);
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_name,
            text,
            mentions,
            created_at: Utc::now(),
            edited: false,
            edited_at: None,
        }
    }

    pub fn edit(&mut self, text: String) {
        self.mentions = extract_mentions(&text);
        self.text = text;
        self.edited = true;
        self.edited_at = Some(Utc::now());
    }
}

/// `@name` tokens in a comment body, without the `@`.
fn extract_mentions(text: &str) -> Vec<UserId> {
    text.split_whitespace()
        .filter_map(|word| word.strip_prefix('@'))
        .map(|name| name.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_' && c != '-'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub url: String,
    pub size: u64,
    pub uploaded_by: UserId,
    pub uploaded_at: DateTime<Utc>,
}

/// One change to a card's comments or checklists. Carries every id it
/// creates so applying it locally and in the store yields the same card.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEdit {
    AddComment(Comment),
    /// Only the comment's author may edit it.
    EditComment {
        comment_id: Uuid,
        author: UserId,
        text: String,
    },
    DeleteComment {
        comment_id: Uuid,
        author: UserId,
    },
    AddChecklist(Checklist),
    AddChecklistItem {
        checklist_id: Uuid,
        item: ChecklistItem,
    },
    ToggleItem {
        checklist_id: Uuid,
        item_id: Uuid,
    },
}

impl ContentEdit {
    pub fn add_comment(author: UserId, author_name: String, text: &str) -> KanbanResult<Self> {
        Ok(Self::AddComment(Comment::new(author, author_name, non_blank(text)?)))
    }

    pub fn edit_comment(comment_id: Uuid, author: UserId, text: &str) -> KanbanResult<Self> {
        Ok(Self::EditComment {
            comment_id,
            author,
            text: non_blank(text)?,
        })
    }

    pub fn add_checklist(title: &str) -> KanbanResult<Self> {
        Ok(Self::AddChecklist(Checklist::new(non_blank(title)?)))
    }

    pub fn add_checklist_item(checklist_id: Uuid, text: &str) -> KanbanResult<Self> {
        Ok(Self::AddChecklistItem {
            checklist_id,
            item: ChecklistItem::new(non_blank(text)?),
        })
    }

    /// Id of the comment, checklist or item this edit creates.
    pub fn created_id(&self) -> Option<Uuid> {
        match self {
            Self::AddComment(comment) => Some(comment.id),
            Self::AddChecklist(checklist) => Some(checklist.id),
            Self::AddChecklistItem { item, .. } => Some(item.id),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::AddComment(_) => "add comment",
            Self::EditComment { .. } => "edit comment",
            Self::DeleteComment { .. } => "delete comment",
            Self::AddChecklist(_) => "add checklist",
            Self::AddChecklistItem { .. } => "add checklist item",
            Self::ToggleItem { .. } => "toggle checklist item",
        }
    }
}

fn non_blank(text: &str) -> KanbanResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(KanbanError::missing("text"));
    }
    Ok(text.to_string())
}

pub(crate) fn comment_mut<'a>(
    comments: &'a mut [Comment],
    comment_id: Uuid,
    author: &str,
) -> KanbanResult<&'a mut Comment> {
    let comment = comments
        .iter_mut()
        .find(|c| c.id == comment_id)
        .ok_or_else(|| KanbanError::NotFound(format!("comment {}", comment_id)))?;
    if comment.user_id != author {
        return Err(KanbanError::Validation(format!(
            "comment {} belongs to another user",
            comment_id
        )));
    }
    Ok(comment)
}

pub(crate) fn checklist_mut(checklists: &mut [Checklist], checklist_id: Uuid) -> KanbanResult<&mut Checklist> {
    checklists
        .iter_mut()
        .find(|c| c.id == checklist_id)
        .ok_or_else(|| KanbanError::NotFound(format!("checklist {}", checklist_id)))
}
