// Library interface for the LiftRS session-planning engine
// The CLI binary and the integration tests both build on these modules

pub mod beam;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod planner;
pub mod prescription;
pub mod progression;
pub mod rotation;
pub mod scoring;
pub mod split;
pub mod upgrade;
pub mod volume;
pub mod warmup;

// Re-export commonly used types for convenience
pub use models::*;
pub use beam::{BeamParams, BeamSelector, SelectionOutcome, SessionStructure};
pub use config::{FeatureFlags, PlannerConfig};
pub use error::{ConfigError, LiftRsError, PlanningError, ProgressionError, Result};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use planner::{PlanRequest, PlannedExercise, PlannedSet, SessionPlan, SessionPlanner};
pub use prescription::{Prescriber, Prescription, RepRange, Role};
pub use progression::{
    estimate_one_rep_max, should_deload, LoadAssigner, LoadDecision, LoadInputs, LoadSource,
};
pub use rotation::{ExposureRecord, RotationIndex, Trend};
pub use scoring::{
    CandidateBuilder, CandidateInputs, Rejection, RejectionReason, ScoreWeights,
    SelectionCandidate, SubScores,
};
pub use split::{SplitClass, SplitClassifier};
pub use upgrade::StretchUpgrade;
pub use volume::{
    FatigueState, RecoveryStatus, VolumeContext, VolumeContextBuilder, VolumeState,
    INDIRECT_MULTIPLIER,
};
pub use warmup::{build_ramp, WarmupSet};
