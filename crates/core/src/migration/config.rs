//! Live, operator-controlled migration flags.
//!
//! A single [`MigrationConfig`] is shared (as `Arc<MigrationConfig>`) by every
//! orchestrator and adapter. Changes are visible to the next flag read of any
//! in-flight operation; there is no isolation between a running read/write
//! and a concurrent phase change.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ConfigError, FeatureFlags, Flag, FlagValue, MigrationPhase};

#[derive(Debug, Default)]
pub struct MigrationConfig {
    flags: RwLock<FeatureFlags>,
}

impl MigrationConfig {
    /// Creates a config at the phase 1 baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config at the canonical flags of `phase`.
    pub fn with_phase(phase: MigrationPhase) -> Self {
        Self {
            flags: RwLock::new(phase.flags()),
        }
    }

    /// Readers never observe a half-applied phase change, so a poisoned lock
    /// still holds a consistent snapshot.
    fn read(&self) -> RwLockReadGuard<'_, FeatureFlags> {
        self.flags.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FeatureFlags> {
        self.flags.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of every flag.
    pub fn snapshot(&self) -> FeatureFlags {
        *self.read()
    }

    pub fn get_flag(&self, flag: Flag) -> FlagValue {
        let flags = self.read();
        match flag {
            Flag::MigrationPhase => FlagValue::Phase(flags.migration_phase),
            Flag::DualWriteEnabled => FlagValue::Bool(flags.dual_write_enabled),
            Flag::DualReadEnabled => FlagValue::Bool(flags.dual_read_enabled),
            Flag::ReadFromSecondary => FlagValue::Bool(flags.read_from_secondary),
            Flag::ValidationEnabled => FlagValue::Bool(flags.validation_enabled),
        }
    }

    pub fn migration_phase(&self) -> MigrationPhase {
        self.read().migration_phase
    }

    pub fn dual_write_enabled(&self) -> bool {
        self.read().dual_write_enabled
    }

    pub fn dual_read_enabled(&self) -> bool {
        self.read().dual_read_enabled
    }

    pub fn read_from_secondary(&self) -> bool {
        self.read().read_from_secondary
    }

    pub fn validation_enabled(&self) -> bool {
        self.read().validation_enabled
    }

    /// Overrides a single flag without touching the others.
    ///
    /// Setting `migration_phase` this way only records the number; use
    /// [`set_migration_phase`](Self::set_migration_phase) to apply the
    /// phase's canonical flags.
    pub fn set_flag(&self, flag: Flag, value: impl Into<FlagValue>) -> Result<(), ConfigError> {
        let value = value.into();
        let mismatch = |expected| ConfigError::TypeMismatch { flag, expected };

        {
            let mut flags = self.write();
            match flag {
                Flag::MigrationPhase => {
                    flags.migration_phase = value.as_phase().ok_or_else(|| mismatch("phase"))?;
                }
                Flag::DualWriteEnabled => {
                    flags.dual_write_enabled = value.as_bool().ok_or_else(|| mismatch("boolean"))?;
                }
                Flag::DualReadEnabled => {
                    flags.dual_read_enabled = value.as_bool().ok_or_else(|| mismatch("boolean"))?;
                }
                Flag::ReadFromSecondary => {
                    flags.read_from_secondary =
                        value.as_bool().ok_or_else(|| mismatch("boolean"))?;
                }
                Flag::ValidationEnabled => {
                    flags.validation_enabled = value.as_bool().ok_or_else(|| mismatch("boolean"))?;
                }
            }
        }

        tracing::info!(%flag, %value, "Migration flag set");
        Ok(())
    }

    /// Moves to `phase` and applies its canonical flag combination.
    pub fn set_migration_phase(&self, phase: u8) -> Result<(), ConfigError> {
        let phase = MigrationPhase::new(phase)?;
        let previous = {
            let mut flags = self.write();
            let previous = flags.migration_phase;
            *flags = phase.flags();
            previous
        };

        tracing::info!(from = %previous, to = %phase, "Migration phase changed");
        Ok(())
    }

    /// Restores the phase 1 baseline.
    pub fn reset(&self) {
        *self.write() = FeatureFlags::default();
        tracing::debug!("Migration flags reset");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_new_config_is_phase_one() {
        let config = MigrationConfig::new();

        assert_eq!(config.migration_phase(), MigrationPhase::PRIMARY_ONLY);
        assert!(!config.dual_write_enabled());
        assert!(!config.dual_read_enabled());
        assert!(!config.read_from_secondary());
        assert!(!config.validation_enabled());
    }

    #[test]
    fn test_set_migration_phase_applies_canonical_flags() {
        let config = MigrationConfig::new();

        config.set_migration_phase(4).unwrap();

        assert_eq!(config.snapshot(), MigrationPhase::SECONDARY_READ.flags());
        assert_eq!(
            config.get_flag(Flag::MigrationPhase),
            FlagValue::Phase(MigrationPhase::SECONDARY_READ)
        );
    }

    #[test]
    fn test_invalid_phase_leaves_flags_unchanged() {
        let config = MigrationConfig::with_phase(MigrationPhase::DUAL_READ);

        assert_eq!(
            config.set_migration_phase(0),
            Err(ConfigError::InvalidPhase(0))
        );
        assert_eq!(
            config.set_migration_phase(6),
            Err(ConfigError::InvalidPhase(6))
        );
        assert_eq!(config.snapshot(), MigrationPhase::DUAL_READ.flags());
    }

    #[test]
    fn test_set_flag_overrides_single_flag() {
        let config = MigrationConfig::new();

        config.set_flag(Flag::DualReadEnabled, true).unwrap();

        assert!(config.dual_read_enabled());
        assert!(!config.dual_write_enabled());
        assert_eq!(config.migration_phase(), MigrationPhase::PRIMARY_ONLY);
        assert_eq!(config.get_flag(Flag::DualReadEnabled), FlagValue::Bool(true));
    }

    #[test]
    fn test_set_flag_phase_does_not_apply_combination() {
        let config = MigrationConfig::new();

        config
            .set_flag(Flag::MigrationPhase, MigrationPhase::SECONDARY_ONLY)
            .unwrap();

        assert_eq!(config.migration_phase(), MigrationPhase::SECONDARY_ONLY);
        assert!(!config.read_from_secondary());
    }

    #[test]
    fn test_set_flag_rejects_wrong_type() {
        let config = MigrationConfig::new();

        let err = config
            .set_flag(Flag::ValidationEnabled, MigrationPhase::DUAL_READ)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::TypeMismatch {
                flag: Flag::ValidationEnabled,
                expected: "boolean"
            }
        );

        let err = config.set_flag(Flag::MigrationPhase, true).unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { .. }));
    }

    #[test]
    fn test_reset_restores_baseline_from_any_state() {
        let config = MigrationConfig::new();

        for phase in 1..=5 {
            config.set_migration_phase(phase).unwrap();
            config.set_flag(Flag::ValidationEnabled, true).unwrap();
            config.reset();
            assert_eq!(config.snapshot(), FeatureFlags::default());
        }

        config.reset();
        assert_eq!(config.snapshot(), MigrationPhase::PRIMARY_ONLY.flags());
    }

    #[test]
    fn test_changes_are_visible_through_shared_handle() {
        let config = Arc::new(MigrationConfig::new());
        let other = Arc::clone(&config);

        config.set_migration_phase(2).unwrap();

        assert!(other.dual_write_enabled());
    }
}
