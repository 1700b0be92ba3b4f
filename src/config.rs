//! Planner configuration
//!
//! All knobs are optional and default to the values the planning pipeline
//! was tuned with. Configuration loads from an explicit path or from
//! `<config dir>/liftrs/config.toml`; a missing default file silently
//! yields the built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::beam::BeamParams;
use crate::error::{ConfigError, LiftRsError, Result};
use crate::scoring::ScoreWeights;
use crate::volume::INDIRECT_MULTIPLIER;

/// Feature flags gating revisable behaviors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Plateau detection watches main-lift e1RM; off falls back to
    /// total-rep stagnation
    pub use_main_lift_plateau_detection: bool,

    /// Post-selection accessory trim on effective-volume grounds, run
    /// before the time trim
    pub use_effective_volume_caps: bool,

    /// Density-biased rests for the fat-loss goal
    pub use_revised_fat_loss_policy: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags {
            use_main_lift_plateau_detection: true,
            use_effective_volume_caps: true,
            use_revised_fat_loss_policy: false,
        }
    }
}

/// Tunable planner parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Beam width for the selection search
    pub beam_width: usize,

    /// Maximum exercises considered per session
    pub max_depth: usize,

    /// Cold-start level (0 none, 1 narrow, 2 narrowest)
    pub cold_start: u8,

    /// Secondary-set credit. The accounting pipeline runs on the
    /// process-wide constant; a differing value here is reported, not
    /// applied, because it would invalidate stored baselines.
    pub indirect_multiplier: f64,

    /// Near-tie band within which favorite count breaks beam ordering
    pub tie_breaker_epsilon: f64,

    /// Sub-score weight overrides
    pub weights: ScoreWeights,

    pub flags: FeatureFlags,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            beam_width: 7,
            max_depth: 8,
            cold_start: 0,
            indirect_multiplier: INDIRECT_MULTIPLIER,
            tie_breaker_epsilon: 0.05,
            weights: ScoreWeights::default(),
            flags: FeatureFlags::default(),
        }
    }
}

impl PlannerConfig {
    /// Default on-disk location: `<config dir>/liftrs/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("liftrs").join("config.toml"))
    }

    /// Load from an explicit path, or the default location. An explicit
    /// path must exist; a missing default file falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(LiftRsError::Configuration(ConfigError::FileNotFound {
                        path: path.to_path_buf(),
                    }));
                }
                Self::from_file(path)
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PlannerConfig = toml::from_str(contents).map_err(|e| {
            LiftRsError::Configuration(ConfigError::ParseError {
                reason: e.to_string(),
            })
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Persist to a TOML file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| {
            LiftRsError::Configuration(ConfigError::ParseError {
                reason: e.to_string(),
            })
        })?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.beam_width == 0 {
            return Err(LiftRsError::Configuration(ConfigError::InvalidValue {
                field: "beam_width".to_string(),
                reason: "must be at least 1".to_string(),
            }));
        }
        if self.max_depth == 0 {
            return Err(LiftRsError::Configuration(ConfigError::InvalidValue {
                field: "max_depth".to_string(),
                reason: "must be at least 1".to_string(),
            }));
        }
        if self.cold_start > 2 {
            return Err(LiftRsError::Configuration(ConfigError::InvalidValue {
                field: "cold_start".to_string(),
                reason: "levels are 0, 1, 2".to_string(),
            }));
        }
        if !(0.0..=1.0).contains(&self.indirect_multiplier) {
            return Err(LiftRsError::Configuration(ConfigError::InvalidValue {
                field: "indirect_multiplier".to_string(),
                reason: "must be within [0, 1]".to_string(),
            }));
        }
        if self.tie_breaker_epsilon < 0.0 {
            return Err(LiftRsError::Configuration(ConfigError::InvalidValue {
                field: "tie_breaker_epsilon".to_string(),
                reason: "must be non-negative".to_string(),
            }));
        }
        if self.weights.sum() <= 0.0 {
            return Err(LiftRsError::Configuration(ConfigError::InvalidWeights {
                reason: "weights must sum to a positive value".to_string(),
            }));
        }
        if (self.indirect_multiplier - INDIRECT_MULTIPLIER).abs() > f64::EPSILON {
            warn!(
                configured = self.indirect_multiplier,
                active = INDIRECT_MULTIPLIER,
                "indirect multiplier override ignored; changing it invalidates baselines"
            );
        }
        Ok(())
    }

    /// Search parameters with cold-start narrowing applied
    pub fn beam_params(&self) -> BeamParams {
        BeamParams {
            beam_width: self.beam_width,
            max_depth: self.max_depth,
            epsilon: self.tie_breaker_epsilon,
        }
        .with_cold_start(self.cold_start)
    }

    /// Normalized weights for scoring
    pub fn effective_weights(&self) -> ScoreWeights {
        self.weights.normalized()
    }
}
