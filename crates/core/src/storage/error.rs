use thiserror::Error;

/// Errors that can occur during repository operations.
///
/// The orchestration layer never inspects store-specific failures; whatever a
/// store returns is carried through untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Returns true for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_not_found_display() {
        let error = RepositoryError::NotFound {
            entity_type: "User",
            id: "42".to_string(),
        };
        assert_eq!(error.to_string(), "User not found: 42");
    }

    #[test]
    fn test_repository_error_already_exists_display() {
        let error = RepositoryError::AlreadyExists {
            entity_type: "Category",
            id: "7".to_string(),
        };
        assert_eq!(error.to_string(), "Category already exists: 7");
    }

    #[test]
    fn test_repository_error_connection_failed_display() {
        let error = RepositoryError::ConnectionFailed("secondary unavailable".to_string());
        assert_eq!(error.to_string(), "Connection failed: secondary unavailable");
    }

    #[test]
    fn test_repository_error_invalid_data_display() {
        let error = RepositoryError::InvalidData("bad id".to_string());
        assert_eq!(error.to_string(), "Invalid data: bad id");
    }

    #[test]
    fn test_not_found_helper() {
        let error = RepositoryError::not_found("Order", 9);
        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "Order not found: 9");
        assert!(!RepositoryError::QueryFailed("x".into()).is_not_found());
    }
}
