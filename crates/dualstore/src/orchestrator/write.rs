//! Phase-gated write orchestration.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use dualstore_core::commerce::Identified;
use dualstore_core::migration::{CorrelationId, MigrationConfig};
use dualstore_core::storage::{RepositoryError, Result};

type Step<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Result<T>> + Send + 'a>;
type Followup<'a, T> = Box<dyn FnOnce(T) -> BoxFuture<'a, Result<T>> + Send + 'a>;
type Compensation<'a, T> = Box<dyn FnOnce(T) -> BoxFuture<'a, Result<()>> + Send + 'a>;

/// The store calls making up one logical write.
///
/// - `primary` writes to the store of record.
/// - `secondary` receives the primary's result and mirrors it.
/// - `secondary_only` replaces both once the primary is retired.
/// - `rollback` undoes the primary write when the mirror fails.
pub struct WriteOperation<'a, T> {
    primary: Step<'a, T>,
    secondary: Followup<'a, T>,
    secondary_only: Option<Step<'a, T>>,
    rollback: Option<Compensation<'a, T>>,
}

impl<'a, T: Send + 'a> WriteOperation<'a, T> {
    pub fn new<P, PF, S, SF>(primary: P, secondary: S) -> Self
    where
        P: FnOnce() -> PF + Send + 'a,
        PF: Future<Output = Result<T>> + Send + 'a,
        S: FnOnce(T) -> SF + Send + 'a,
        SF: Future<Output = Result<T>> + Send + 'a,
    {
        Self {
            primary: Box::new(move || primary().boxed()),
            secondary: Box::new(move |value| secondary(value).boxed()),
            secondary_only: None,
            rollback: None,
        }
    }

    pub fn with_secondary_only<F, Fut>(mut self, secondary_only: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        self.secondary_only = Some(Box::new(move || secondary_only().boxed()));
        self
    }

    /// The rollback's own output is discarded; only whether it succeeded
    /// is reported.
    pub fn with_rollback<F, Fut, U>(mut self, rollback: F) -> Self
    where
        F: FnOnce(T) -> Fut + Send + 'a,
        Fut: Future<Output = Result<U>> + Send + 'a,
    {
        self.rollback = Some(Box::new(move |value| {
            async move { rollback(value).await.map(|_| ()) }.boxed()
        }));
        self
    }
}

/// Outcome of a [`WriteOperation`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult<T> {
    pub success: bool,
    /// The primary's result whenever the primary ran, else the secondary's.
    pub data: Option<T>,
    pub primary_result: Option<T>,
    pub secondary_result: Option<T>,
    /// The failing store's error, untouched.
    pub error: Option<RepositoryError>,
    pub rollback_performed: bool,
    pub correlation_id: CorrelationId,
}

impl<T> WriteResult<T> {
    fn succeeded(
        data: T,
        primary_result: Option<T>,
        secondary_result: Option<T>,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            success: true,
            data: Some(data),
            primary_result,
            secondary_result,
            error: None,
            rollback_performed: false,
            correlation_id,
        }
    }

    fn failed(
        error: RepositoryError,
        primary_result: Option<T>,
        rollback_performed: bool,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            success: false,
            data: None,
            primary_result,
            secondary_result: None,
            error: Some(error),
            rollback_performed,
            correlation_id,
        }
    }

    /// Collapses the result into the value callers care about.
    pub fn into_result(self) -> Result<T> {
        match (self.error, self.data) {
            (Some(err), _) => Err(err),
            (None, Some(data)) => Ok(data),
            (None, None) => Err(RepositoryError::QueryFailed(format!(
                "write {} produced no result",
                self.correlation_id
            ))),
        }
    }
}

/// Runs writes against one or both stores depending on the live flags.
#[derive(Debug, Clone)]
pub struct DualWriter {
    config: Arc<MigrationConfig>,
    entity_type: &'static str,
}

impl DualWriter {
    pub fn new(config: Arc<MigrationConfig>, entity_type: &'static str) -> Self {
        Self {
            config,
            entity_type,
        }
    }

    pub fn entity_type(&self) -> &'static str {
        self.entity_type
    }

    /// Executes `op`. Flags are read once, when the call starts.
    pub async fn execute<T>(&self, op: WriteOperation<'_, T>, operation: &str) -> WriteResult<T>
    where
        T: Clone + Identified + Send,
    {
        let correlation_id = CorrelationId::generate();
        let flags = self.config.snapshot();
        let entity_type = self.entity_type;

        tracing::debug!(
            %correlation_id,
            entity_type,
            operation,
            phase = %flags.migration_phase,
            "Starting write"
        );

        let WriteOperation {
            primary,
            secondary,
            secondary_only,
            rollback,
        } = op;

        if !flags.dual_write_enabled {
            if let (true, Some(secondary_only)) = (flags.read_from_secondary, secondary_only) {
                return match secondary_only().await {
                    Ok(value) => {
                        tracing::info!(
                            %correlation_id,
                            entity_type,
                            entity_id = %value.entity_id(),
                            operation,
                            "Secondary-only write succeeded"
                        );
                        WriteResult::succeeded(value.clone(), None, Some(value), correlation_id)
                    }
                    Err(err) => {
                        tracing::error!(
                            %correlation_id,
                            entity_type,
                            operation,
                            error = %err,
                            "Secondary-only write failed"
                        );
                        WriteResult::failed(err, None, false, correlation_id)
                    }
                };
            }

            return match primary().await {
                Ok(value) => {
                    tracing::debug!(
                        %correlation_id,
                        entity_type,
                        entity_id = %value.entity_id(),
                        operation,
                        "Primary-only write succeeded"
                    );
                    WriteResult::succeeded(value.clone(), Some(value), None, correlation_id)
                }
                Err(err) => {
                    tracing::error!(
                        %correlation_id,
                        entity_type,
                        operation,
                        error = %err,
                        "Primary write failed"
                    );
                    WriteResult::failed(err, None, false, correlation_id)
                }
            };
        }

        let primary_value = match primary().await {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(
                    %correlation_id,
                    entity_type,
                    operation,
                    error = %err,
                    "Primary write failed, skipping secondary"
                );
                return WriteResult::failed(err, None, false, correlation_id);
            }
        };

        let entity_id = primary_value.entity_id();
        tracing::debug!(%correlation_id, entity_type, %entity_id, operation, "Primary write succeeded");

        match secondary(primary_value.clone()).await {
            Ok(secondary_value) => {
                tracing::info!(
                    %correlation_id,
                    entity_type,
                    %entity_id,
                    operation,
                    "Dual write succeeded"
                );
                WriteResult::succeeded(
                    primary_value.clone(),
                    Some(primary_value),
                    Some(secondary_value),
                    correlation_id,
                )
            }
            Err(err) => {
                tracing::error!(
                    %correlation_id,
                    entity_type,
                    %entity_id,
                    operation,
                    error = %err,
                    "Secondary write failed after primary succeeded"
                );

                let rollback_performed = match rollback {
                    Some(rollback) => match rollback(primary_value.clone()).await {
                        Ok(()) => {
                            tracing::warn!(
                                %correlation_id,
                                entity_type,
                                %entity_id,
                                operation,
                                "Primary write rolled back"
                            );
                            true
                        }
                        Err(rollback_err) => {
                            tracing::error!(
                                %correlation_id,
                                entity_type,
                                %entity_id,
                                operation,
                                error = %rollback_err,
                                "Rollback failed, stores have diverged"
                            );
                            false
                        }
                    },
                    None => {
                        tracing::error!(
                            %correlation_id,
                            entity_type,
                            %entity_id,
                            operation,
                            "No rollback available, stores have diverged"
                        );
                        false
                    }
                };

                WriteResult::failed(err, Some(primary_value), rollback_performed, correlation_id)
            }
        }
    }
}
