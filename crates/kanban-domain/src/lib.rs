pub mod board;
pub mod card;
pub mod content;
pub mod entity;
pub mod field_update;
pub mod list;
pub mod snapshot;
pub mod sprint;

pub use board::{Board, BoardId, BoardUpdate, Member, MemberRole, UserId, Visibility};
pub use card::{Assignee, Card, CardId, CardPriority, CardStatus, CardType, CardUpdate};
pub use content::{Attachment, Checklist, ChecklistItem, Comment, ContentEdit};
pub use entity::{Entity, EntityKind, FieldPatch, OrderUpdate, Scope};
pub use field_update::FieldUpdate;
pub use list::{List, ListId, ListUpdate};
pub use sprint::{DailyNote, Retrospective, Sprint, SprintId, SprintMetrics, SprintStatus, SprintUpdate};
pub use snapshot::{scopes_of, Snapshot};
