pub mod board;
pub mod card;
pub mod list;
pub mod sprint;
pub mod watch;

use chrono::{DateTime, NaiveDate, Utc};
use kanban_sync::{DragOutcome, PatchOutcome};

/// Unwrap an optimistic change, turning a revert into a command failure.
pub(crate) fn applied<T>(outcome: PatchOutcome<T>) -> anyhow::Result<T> {
    match outcome {
        PatchOutcome::Applied(value) => Ok(value),
        PatchOutcome::Reverted { reason } => Err(anyhow::anyhow!("change reverted: {}", reason)),
    }
}

pub(crate) fn drag_result(outcome: DragOutcome) -> anyhow::Result<serde_json::Value> {
    match outcome {
        DragOutcome::Noop => Ok(serde_json::json!({ "moved": false, "writes": 0 })),
        DragOutcome::Applied { moved, writes } => Ok(serde_json::json!({
            "moved": true,
            "id": moved.to_string(),
            "writes": writes,
        })),
        DragOutcome::RolledBack { moved, reason } => {
            Err(anyhow::anyhow!("move of {} rolled back: {}", moved, reason))
        }
    }
}

pub(crate) fn parse_datetime(s: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
                .ok_or(())
        })
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid date '{}'. Supported formats: YYYY-MM-DD or RFC 3339 (e.g., 2024-01-15T10:30:00Z)",
                s
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_datetime_accepts_both_formats() {
        let day = parse_datetime("2024-01-15").unwrap();
        assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2024, 1, 15, 0));

        let instant = parse_datetime("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(instant.hour(), 8);

        assert!(parse_datetime("15/01/2024").is_err());
    }

    #[test]
    fn test_reverted_patch_is_an_error() {
        let outcome: PatchOutcome<()> = PatchOutcome::Reverted {
            reason: "disk full".into(),
        };
        let err = applied(outcome).unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }
}
