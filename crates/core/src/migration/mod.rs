//! Migration control plane: phase flags, correlation ids and read validation.

mod config;
mod correlation;
mod error;
mod phase;
pub mod validation;

pub use config::MigrationConfig;
pub use correlation::CorrelationId;
pub use error::{ConfigError, MigrationError, Result};
pub use phase::{FeatureFlags, Flag, FlagValue, MigrationPhase};
pub use validation::ValidationFailure;
