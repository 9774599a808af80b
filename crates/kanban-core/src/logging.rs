use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of an entity's activity history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: String) -> Self {
        Self {
            timestamp: Utc::now(),
            message,
        }
    }
}

pub trait Loggable {
    fn add_log(&mut self, entry: LogEntry);
    fn get_logs(&self) -> &[LogEntry];

    fn last_log(&self) -> Option<&LogEntry> {
        self.get_logs().last()
    }
}
