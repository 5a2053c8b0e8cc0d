//! Core types for the dualstore migration layer.
//!
//! This crate has no I/O. It defines the commerce entities, the records they
//! become in the secondary store, the repository traits both stores
//! implement, and the migration flags that decide where traffic goes.

pub mod commerce;
pub mod migration;
pub mod storage;
