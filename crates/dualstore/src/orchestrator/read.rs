//! Phase-gated read orchestration with optional cross-store validation.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;

use dualstore_core::migration::validation::validate_results;
use dualstore_core::migration::{CorrelationId, MigrationConfig, MigrationError, ValidationFailure};
use dualstore_core::storage::{RepositoryError, Result};

type Fetch<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Result<Option<T>>> + Send + 'a>;

/// The two store reads answering one lookup.
///
/// `lookup` names what was asked for (an id, a username, a cart key) and
/// labels both the log lines and any validation failure.
pub struct ReadOperation<'a, T> {
    lookup: String,
    primary: Fetch<'a, T>,
    secondary: Fetch<'a, T>,
}

impl<'a, T: Send + 'a> ReadOperation<'a, T> {
    pub fn new<P, PF, S, SF>(lookup: impl ToString, primary: P, secondary: S) -> Self
    where
        P: FnOnce() -> PF + Send + 'a,
        PF: Future<Output = Result<Option<T>>> + Send + 'a,
        S: FnOnce() -> SF + Send + 'a,
        SF: Future<Output = Result<Option<T>>> + Send + 'a,
    {
        Self {
            lookup: lookup.to_string(),
            primary: Box::new(move || primary().boxed()),
            secondary: Box::new(move || secondary().boxed()),
        }
    }
}

/// Outcome of a [`ReadOperation`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult<T> {
    pub entity_type: &'static str,
    pub lookup: String,
    /// Whether every store call completed. A validation mismatch still
    /// counts as a success.
    pub success: bool,
    /// The primary's answer when the primary was read, else the secondary's.
    pub data: Option<T>,
    pub primary_result: Option<T>,
    pub secondary_result: Option<T>,
    /// `None` when only one store was read.
    pub validation_passed: Option<bool>,
    pub validation_errors: Vec<String>,
    pub error: Option<RepositoryError>,
    pub correlation_id: CorrelationId,
}

impl<T> ReadResult<T> {
    /// Collapses the result, promoting a failed validation into an error.
    pub fn into_result(self) -> std::result::Result<Option<T>, MigrationError> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        if self.validation_passed == Some(false) {
            return Err(
                ValidationFailure::new(self.entity_type, self.lookup, self.validation_errors)
                    .into(),
            );
        }
        Ok(self.data)
    }
}

/// Routes reads to one or both stores depending on the live flags.
#[derive(Debug, Clone)]
pub struct DualReader {
    config: Arc<MigrationConfig>,
    entity_type: &'static str,
}

impl DualReader {
    pub fn new(config: Arc<MigrationConfig>, entity_type: &'static str) -> Self {
        Self {
            config,
            entity_type,
        }
    }

    /// Executes `op`, comparing both answers with `compare` when validation
    /// is enabled. Flags are read once, when the call starts.
    pub async fn execute<T, F>(
        &self,
        op: ReadOperation<'_, T>,
        compare: F,
        operation: &str,
    ) -> ReadResult<T>
    where
        T: Clone + Serialize + Send,
        F: Fn(&T, &T) -> Vec<String>,
    {
        let correlation_id = CorrelationId::generate();
        let flags = self.config.snapshot();
        let entity_type = self.entity_type;
        let ReadOperation {
            lookup,
            primary,
            secondary,
        } = op;

        let mut result = ReadResult {
            entity_type,
            lookup,
            success: false,
            data: None,
            primary_result: None,
            secondary_result: None,
            validation_passed: None,
            validation_errors: Vec::new(),
            error: None,
            correlation_id,
        };
        let lookup = result.lookup.as_str();
        let correlation_id = &result.correlation_id;

        tracing::trace!(
            %correlation_id,
            entity_type,
            lookup,
            operation,
            phase = %flags.migration_phase,
            "Starting read"
        );

        if !flags.dual_read_enabled {
            let (store, fetch) = if flags.read_from_secondary {
                ("secondary", secondary)
            } else {
                ("primary", primary)
            };

            return match fetch().await {
                Ok(value) => {
                    tracing::trace!(
                        %correlation_id,
                        entity_type,
                        lookup,
                        operation,
                        store,
                        found = value.is_some(),
                        "Single-store read succeeded"
                    );
                    if flags.read_from_secondary {
                        result.secondary_result = value.clone();
                    } else {
                        result.primary_result = value.clone();
                    }
                    result.data = value;
                    result.success = true;
                    result
                }
                Err(err) => {
                    tracing::error!(
                        %correlation_id,
                        entity_type,
                        lookup,
                        operation,
                        store,
                        error = %err,
                        "Read failed"
                    );
                    result.error = Some(err);
                    result
                }
            };
        }

        let primary_value = match primary().await {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(
                    %correlation_id,
                    entity_type,
                    lookup,
                    operation,
                    error = %err,
                    "Primary read failed during dual read"
                );
                result.error = Some(err);
                return result;
            }
        };

        let secondary_value = match secondary().await {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(
                    %correlation_id,
                    entity_type,
                    lookup,
                    operation,
                    error = %err,
                    "Secondary read failed during dual read"
                );
                result.primary_result = primary_value;
                result.error = Some(err);
                return result;
            }
        };

        if flags.validation_enabled {
            let errors = validate_results(primary_value.as_ref(), secondary_value.as_ref(), compare);
            if errors.is_empty() {
                tracing::debug!(%correlation_id, entity_type, lookup, operation, "Dual read validated");
            } else {
                let failure = ValidationFailure::new(entity_type, lookup, errors.clone());
                tracing::error!(
                    %correlation_id,
                    entity_type,
                    lookup,
                    operation,
                    primary = %to_json(&primary_value),
                    secondary = %to_json(&secondary_value),
                    suggested_actions = ?failure.suggested_actions(),
                    "{failure}"
                );
            }
            result.validation_passed = Some(errors.is_empty());
            result.validation_errors = errors;
        } else {
            result.validation_passed = Some(true);
        }

        result.data = primary_value.clone();
        result.primary_result = primary_value;
        result.secondary_result = secondary_value;
        result.success = true;
        result
    }
}

/// Entities skip their secrets when serialized, so this is safe to log.
fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<unserializable: {err}>"))
}
