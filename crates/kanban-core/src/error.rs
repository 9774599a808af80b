use thiserror::Error;

pub type KanbanResult<T> = Result<T, KanbanError>;

#[derive(Error, Debug)]
pub enum KanbanError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KanbanError {
    /// Shorthand for the "missing or malformed field" case.
    pub fn missing(field: &str) -> Self {
        Self::Validation(format!("missing required field '{}'", field))
    }

    /// True for failures raised by the persistence collaborator, the ones
    /// that trigger a rollback of optimistic state.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::Connection(_) | Self::Io(_) | Self::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for KanbanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_is_validation() {
        let err = KanbanError::missing("list_id");
        assert!(matches!(err, KanbanError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation error: missing required field 'list_id'"
        );
        assert!(!err.is_persistence());
    }

    #[test]
    fn test_persistence_classification() {
        assert!(KanbanError::Persistence("write rejected".into()).is_persistence());
        assert!(KanbanError::Connection("refused".into()).is_persistence());
        assert!(!KanbanError::NotFound("card".into()).is_persistence());
    }
}
