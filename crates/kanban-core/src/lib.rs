pub mod config;
pub mod error;
pub mod logging;
pub mod ordering;
pub mod reorder;
pub mod traits;

pub use config::{AppConfig, DEFAULT_POLL_INTERVAL_MS};
pub use error::{KanbanError, KanbanResult};
pub use logging::{LogEntry, Loggable};
pub use reorder::{plan_move, DragMove, OrderChange, ReorderPlan};
pub use traits::Positioned;
