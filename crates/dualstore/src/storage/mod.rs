//! Storage backend implementations.
//!
//! Concrete stores implementing the repository traits defined in
//! `dualstore_core::storage`.

pub mod inmemory;

pub use inmemory::InMemoryRepository;
