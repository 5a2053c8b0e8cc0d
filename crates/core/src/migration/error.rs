use thiserror::Error;

use crate::storage::RepositoryError;

use super::{Flag, ValidationFailure};

/// Errors raised by the migration control plane.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Migration phase must be between 1 and 5, got {0}")]
    InvalidPhase(i64),
    #[error("Flag {flag} expects a {expected} value")]
    TypeMismatch { flag: Flag, expected: &'static str },
    #[error("Unknown migration flag: {0}")]
    UnknownFlag(String),
}

/// Errors surfaced by entity adapters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MigrationError {
    /// A store failed. The store's own error is kept as is.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Both stores answered but disagreed.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MigrationError {
    pub fn as_repository(&self) -> Option<&RepositoryError> {
        match self {
            MigrationError::Repository(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationFailure> {
        match self {
            MigrationError::Validation(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
