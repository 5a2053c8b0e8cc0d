//! Phase-gated migration from a primary store to a secondary store.
//!
//! Entity adapters wrap a pair of repositories and decide, per call and
//! from the live [`MigrationConfig`](dualstore_core::migration::MigrationConfig),
//! which store is written, which is read, and whether the two reads are
//! compared.

pub mod adapters;
pub mod config;
pub mod orchestrator;
pub mod storage;
