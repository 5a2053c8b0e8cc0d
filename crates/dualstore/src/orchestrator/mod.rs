//! The two control-flow skeletons every adapter is built from.
//!
//! [`DualWriter`] and [`DualReader`] know nothing about entities. Adapters
//! hand them closures for the concrete store calls; the orchestrators decide,
//! from the live [`MigrationConfig`](dualstore_core::migration::MigrationConfig),
//! which of those closures run.

mod read;
mod write;

pub use read::{DualReader, ReadOperation, ReadResult};
pub use write::{DualWriter, WriteOperation, WriteResult};
