//! Per-entity adapters over a primary and a secondary store.
//!
//! Each adapter exposes its entity's repository operations and routes every
//! call through a [`DualReader`](crate::orchestrator::DualReader) or
//! [`DualWriter`](crate::orchestrator::DualWriter), supplying the concrete
//! store calls, the transformation into the secondary's record shape and,
//! for creates, a compensating delete.

mod cart;
mod category;
mod factory;
mod order;
mod product;
mod user;

pub use cart::CartAdapter;
pub use category::CategoryAdapter;
pub use factory::{AdapterFactory, PrimaryStore, SecondaryStore};
pub use order::OrderAdapter;
pub use product::ProductAdapter;
pub use user::UserAdapter;

use dualstore_core::migration::Result;
use dualstore_core::storage::{self, RepositoryError};

/// Turns a missing update target into `NotFound`, which stops the writer
/// before it reaches the secondary.
fn require<T>(entity_type: &'static str, id: impl ToString, value: Option<T>) -> storage::Result<T> {
    value.ok_or_else(|| RepositoryError::not_found(entity_type, id))
}

/// Inverse of [`require`] for the caller-facing result.
fn absent_as_none<T>(result: storage::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use dualstore_core::migration::MigrationError;

    use super::*;

    #[test]
    fn test_require_and_absent_as_none_round_trip() {
        let missing = require::<i32>("User", 5, None);
        assert_eq!(missing, Err(RepositoryError::not_found("User", 5)));
        assert_eq!(absent_as_none(missing), Ok(None));
        assert_eq!(absent_as_none(require("User", 5, Some(1))), Ok(Some(1)));
    }

    #[test]
    fn test_absent_as_none_keeps_other_errors() {
        let err = RepositoryError::ConnectionFailed("down".to_string());
        assert_eq!(
            absent_as_none::<i32>(Err(err.clone())),
            Err(MigrationError::Repository(err))
        );
    }
}
