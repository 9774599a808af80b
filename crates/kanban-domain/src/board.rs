use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::field_update::FieldUpdate;
use crate::sprint::SprintId;

pub type BoardId = Uuid;

/// Opaque user identifier, as yielded by the auth collaborator's token decoder.
pub type UserId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemberRole {
    Admin,
    Editor,
    Viewer,
}

impl MemberRole {
    pub fn can_edit(self) -> bool {
        matches!(self, Self::Admin | Self::Editor)
    }
}

impl FromStr for MemberRole {
    type Err = KanbanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            "viewer" => Ok(Self::Viewer),
            other => Err(KanbanError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    #[default]
    Private,
    Public,
    Team,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::Team => "team",
        };
        f.write_str(s)
    }
}

impl FromStr for Visibility {
    type Err = KanbanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            "team" => Ok(Self::Team),
            other => Err(KanbanError::Validation(format!(
                "unknown visibility '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub name: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(user_id: UserId, name: String, role: MemberRole) -> Self {
        Self {
            user_id,
            name,
            role,
            joined_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub active_sprint_id: Option<SprintId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// New board owned by `owner_id`, who joins as its only admin.
    pub fn new(owner_id: UserId, owner_name: String, name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            members: vec![Member::new(owner_id.clone(), owner_name, MemberRole::Admin)],
            owner_id,
            name,
            description,
            visibility: Visibility::Private,
            archived: false,
            active_sprint_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member(user_id).is_some()
    }

    pub fn can_edit(&self, user_id: &str) -> bool {
        self.member(user_id).is_some_and(|m| m.role.can_edit())
    }

    /// Add a member, or change the role of an existing one.
    pub fn upsert_member(&mut self, user_id: UserId, name: String, role: MemberRole) {
        match self.members.iter_mut().find(|m| m.user_id == user_id) {
            Some(existing) => {
                existing.name = name;
                existing.role = role;
            }
            None => self.members.push(Member::new(user_id, name, role)),
        }
        self.updated_at = Utc::now();
    }

    /// Remove a member. The last admin cannot be removed.
    pub fn remove_member(&mut self, user_id: &str) -> KanbanResult<()> {
        let member = self
            .member(user_id)
            .ok_or_else(|| KanbanError::NotFound(format!("member {}", user_id)))?;

        let admins = self
            .members
            .iter()
            .filter(|m| m.role == MemberRole::Admin)
            .count();
        if member.role == MemberRole::Admin && admins == 1 {
            return Err(KanbanError::Validation(
                "a board needs at least one admin".to_string(),
            ));
        }

        self.members.retain(|m| m.user_id != user_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn update(&mut self, updates: BoardUpdate) {
        if let Some(name) = updates.name {
            self.name = name;
        }
        updates.description.apply_to(&mut self.description);
        if let Some(visibility) = updates.visibility {
            self.visibility = visibility;
        }
        if let Some(archived) = updates.archived {
            self.archived = archived;
        }
        updates.active_sprint_id.apply_to(&mut self.active_sprint_id);
        self.updated_at = Utc::now();
    }
}

/// Partial update for Board
#[derive(Debug, Clone, Default)]
pub struct BoardUpdate {
    pub name: Option<String>,
    pub description: FieldUpdate<String>,
    pub visibility: Option<Visibility>,
    pub archived: Option<bool>,
    pub active_sprint_id: FieldUpdate<SprintId>,
}
