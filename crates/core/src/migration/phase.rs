use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// How far traffic has moved from the primary store to the secondary.
///
/// | Phase | Writes | Reads |
/// |---|---|---|
/// | 1 | primary | primary |
/// | 2 | both | primary |
/// | 3 | both | both, validated |
/// | 4 | both | secondary |
/// | 5 | secondary | secondary |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MigrationPhase(u8);

impl MigrationPhase {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub const PRIMARY_ONLY: Self = Self(1);
    pub const DUAL_WRITE: Self = Self(2);
    pub const DUAL_READ: Self = Self(3);
    pub const SECONDARY_READ: Self = Self(4);
    pub const SECONDARY_ONLY: Self = Self(5);

    /// Creates a phase, rejecting values outside 1..=5.
    pub fn new(phase: u8) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&phase) {
            Ok(Self(phase))
        } else {
            Err(ConfigError::InvalidPhase(phase.into()))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The canonical flag combination for this phase.
    pub fn flags(self) -> FeatureFlags {
        let (dual_write, dual_read, read_from_secondary, validation) = match self.0 {
            1 => (false, false, false, false),
            2 => (true, false, false, false),
            3 => (true, true, false, true),
            4 => (true, false, true, false),
            _ => (false, false, true, false),
        };
        FeatureFlags {
            migration_phase: self,
            dual_write_enabled: dual_write,
            dual_read_enabled: dual_read,
            read_from_secondary,
            validation_enabled: validation,
        }
    }
}

impl Default for MigrationPhase {
    fn default() -> Self {
        Self::PRIMARY_ONLY
    }
}

impl TryFrom<u8> for MigrationPhase {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MigrationPhase> for u8 {
    fn from(phase: MigrationPhase) -> Self {
        phase.0
    }
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of every migration flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub migration_phase: MigrationPhase,
    pub dual_write_enabled: bool,
    pub dual_read_enabled: bool,
    #[serde(alias = "read_from_dynamodb")]
    pub read_from_secondary: bool,
    pub validation_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        MigrationPhase::default().flags()
    }
}

/// Name of a single flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    MigrationPhase,
    DualWriteEnabled,
    DualReadEnabled,
    ReadFromSecondary,
    ValidationEnabled,
}

impl Flag {
    pub const ALL: [Flag; 5] = [
        Flag::MigrationPhase,
        Flag::DualWriteEnabled,
        Flag::DualReadEnabled,
        Flag::ReadFromSecondary,
        Flag::ValidationEnabled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::MigrationPhase => "migration_phase",
            Flag::DualWriteEnabled => "dual_write_enabled",
            Flag::DualReadEnabled => "dual_read_enabled",
            Flag::ReadFromSecondary => "read_from_secondary",
            Flag::ValidationEnabled => "validation_enabled",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "migration_phase" => Ok(Flag::MigrationPhase),
            "dual_write_enabled" => Ok(Flag::DualWriteEnabled),
            "dual_read_enabled" => Ok(Flag::DualReadEnabled),
            "read_from_secondary" | "read_from_dynamodb" => Ok(Flag::ReadFromSecondary),
            "validation_enabled" => Ok(Flag::ValidationEnabled),
            other => Err(ConfigError::UnknownFlag(other.to_string())),
        }
    }
}

/// Value of a single flag: the phase is an integer, everything else a bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Phase(MigrationPhase),
}

impl FlagValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            FlagValue::Phase(_) => None,
        }
    }

    pub fn as_phase(&self) -> Option<MigrationPhase> {
        match self {
            FlagValue::Phase(p) => Some(*p),
            FlagValue::Bool(_) => None,
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<MigrationPhase> for FlagValue {
    fn from(value: MigrationPhase) -> Self {
        FlagValue::Phase(value)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{b}"),
            FlagValue::Phase(p) => write!(f, "{p}"),
        }
    }
}
