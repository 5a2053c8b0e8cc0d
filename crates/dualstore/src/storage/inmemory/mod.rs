//! In-memory storage backend.
//!
//! One type plays either role in a migration: as the primary it serves the
//! repository traits, as the secondary it also accepts mirrored records.
//!
//! # Example
//!
//! ```rust,ignore
//! use dualstore::storage::inmemory::InMemoryRepository;
//!
//! let primary = InMemoryRepository::named("primary");
//! let secondary = InMemoryRepository::named("secondary");
//! secondary.set_unavailable(true);
//! ```

mod repository;

pub use repository::InMemoryRepository;
