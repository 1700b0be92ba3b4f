//! Unified error hierarchy for LiftRS
//!
//! Planning itself never fails: degradable conditions (empty feasible pool,
//! unresolvable loads) are encoded in the plan per the result contract. The
//! types here cover the boundaries around the core: configuration files,
//! fixture IO, and validation of caller-supplied values.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all LiftRS operations
#[derive(Debug, Error)]
pub enum LiftRsError {
    /// Degradable planning conditions
    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    /// Degradable load-resolution conditions
    #[error("Progression error: {0}")]
    Progression(#[from] ProgressionError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Fixture/model (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Conditions a planning call degrades on instead of failing. They surface
/// in the plan's notes and the observability log, never as a call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    /// After hard filters, no exercise survives
    #[error("no feasible exercises")]
    EmptyFeasiblePool,

    /// A preference references an exercise id the library does not contain
    #[error("preference references unknown exercise: {exercise_id}")]
    UnknownPreference { exercise_id: String },

    /// The feasible pool cannot satisfy every structural minimum
    #[error("structural minimums not fully met by the feasible pool")]
    StructureShortfall,
}

/// Conditions load assignment degrades on; the target is emitted as
/// unspecified rather than fabricated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    /// No history, baseline, donor, or body-weight reference exists
    #[error("no history, baseline, donor, or body-weight reference for {exercise}")]
    Unavailable { exercise: String },

    /// The body-weight ratio fallback needs a body weight the profile lacks
    #[error("body weight unknown; cannot estimate a load for {exercise}")]
    MissingBodyWeight { exercise: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found at specified path
    #[error("Config file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// TOML parsing failed
    #[error("Config parse error: {reason}")]
    ParseError { reason: String },

    /// A value is outside its permitted range
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Sub-score weight overrides must stay normalizable
    #[error("Score weights invalid: {reason}")]
    InvalidWeights { reason: String },
}

/// Result type alias for LiftRS operations
pub type Result<T> = std::result::Result<T, LiftRsError>;

impl LiftRsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LiftRsError::Planning(_) | LiftRsError::Progression(_) => ErrorSeverity::Warning,
            LiftRsError::Configuration(ConfigError::FileNotFound { .. }) => ErrorSeverity::Warning,
            LiftRsError::Validation(_) => ErrorSeverity::Warning,
            LiftRsError::Configuration(_) => ErrorSeverity::Error,
            LiftRsError::Io(_) | LiftRsError::Serialization(_) => ErrorSeverity::Error,
            LiftRsError::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            LiftRsError::Planning(PlanningError::EmptyFeasiblePool) => {
                "No exercises fit your constraints. Loosen filters or add equipment.".to_string()
            }
            LiftRsError::Progression(ProgressionError::Unavailable { exercise }) => {
                format!("No load reference for {}. Log a session or set a baseline.", exercise)
            }
            LiftRsError::Configuration(ConfigError::FileNotFound { path }) => {
                format!("Could not find config file: {}", path.display())
            }
            LiftRsError::Configuration(ConfigError::InvalidWeights { reason }) => {
                format!("Score weight overrides are invalid: {}", reason)
            }
            LiftRsError::Serialization(_) => {
                "Input data could not be parsed. Check the JSON structure.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
