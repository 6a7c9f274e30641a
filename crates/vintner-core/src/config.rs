//! Configuration loading and typed config structures for the tick
//! orchestrator.
//!
//! The canonical configuration lives in `vintner-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use vintner_types::{EconomyPhase, GameDate, Season};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Explanation of the constraint that failed.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `vintner-config.yaml`. All fields have
/// defaults so an empty or partial file is valid.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VintnerConfig {
    /// Calendar shape and start date.
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Economy phase automaton parameters.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Tick pipeline behavior.
    #[serde(default)]
    pub ticks: TickConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VintnerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// The `VINTNER_SEED` environment variable overrides `economy.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.economy.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every range constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calendar.validate()?;
        self.economy.validate()?;
        self.ticks.validate()
    }
}

/// Calendar shape and start date.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalendarConfig {
    /// Number of weeks in one season.
    #[serde(default = "default_weeks_per_season")]
    pub weeks_per_season: u32,

    /// Week a new game starts on.
    #[serde(default = "default_start_week")]
    pub start_week: u32,

    /// Season a new game starts in.
    #[serde(default = "default_start_season")]
    pub start_season: Season,

    /// Year a new game starts in.
    #[serde(default = "default_start_year")]
    pub start_year: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            weeks_per_season: default_weeks_per_season(),
            start_week: default_start_week(),
            start_season: default_start_season(),
            start_year: default_start_year(),
        }
    }
}

impl CalendarConfig {
    /// Date a new game starts on.
    pub const fn start_date(&self) -> GameDate {
        GameDate::new(self.start_week, self.start_season, self.start_year)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.weeks_per_season == 0 {
            return Err(ConfigError::Invalid {
                field: "calendar.weeks_per_season",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.start_week == 0 || self.start_week > self.weeks_per_season {
            return Err(ConfigError::Invalid {
                field: "calendar.start_week",
                reason: format!("must be within 1..={}", self.weeks_per_season),
            });
        }
        Ok(())
    }
}

/// Economy phase automaton parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EconomyConfig {
    /// Chance per season that an edge phase (Crash or Boom) moves one step
    /// toward the middle.
    #[serde(default = "default_edge_shift_chance")]
    pub edge_shift_chance: f64,

    /// Chance per season, in each direction, that a middle phase moves one
    /// step. Must not exceed 0.5.
    #[serde(default = "default_middle_shift_chance")]
    pub middle_shift_chance: f64,

    /// Phase a new game starts in.
    #[serde(default = "default_starting_phase")]
    pub starting_phase: EconomyPhase,

    /// Random seed for reproducible phase walks. Uses OS entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            edge_shift_chance: default_edge_shift_chance(),
            middle_shift_chance: default_middle_shift_chance(),
            starting_phase: default_starting_phase(),
            seed: None,
        }
    }
}

impl EconomyConfig {
    /// Apply `VINTNER_SEED` if it is set to a valid integer.
    fn apply_env_overrides(&mut self) {
        if let Some(seed) = std::env::var("VINTNER_SEED")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
        {
            self.seed = Some(seed);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.edge_shift_chance) {
            return Err(ConfigError::Invalid {
                field: "economy.edge_shift_chance",
                reason: format!("{} is not a probability", self.edge_shift_chance),
            });
        }
        if !(0.0..=0.5).contains(&self.middle_shift_chance) {
            return Err(ConfigError::Invalid {
                field: "economy.middle_shift_chance",
                reason: format!("{} is outside 0.0..=0.5", self.middle_shift_chance),
            });
        }
        Ok(())
    }
}

/// Tick pipeline behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TickConfig {
    /// Minimum number of weeks between two achievement sweeps.
    #[serde(default = "default_achievement_interval_weeks")]
    pub achievement_interval_weeks: u64,

    /// Fold season, economy, and wage messages of a season rollover into a
    /// single notification.
    #[serde(default = "default_true")]
    pub aggregate_notifications: bool,

    /// Log a warning when a single effect runs longer than this many
    /// milliseconds (0 disables). The effect is never cancelled.
    #[serde(default = "default_slow_effect_warn_ms")]
    pub slow_effect_warn_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            achievement_interval_weeks: default_achievement_interval_weeks(),
            aggregate_notifications: true,
            slow_effect_warn_ms: default_slow_effect_warn_ms(),
        }
    }
}

impl TickConfig {
    /// The slow-effect threshold as a [`Duration`], or `None` when disabled.
    pub const fn slow_effect_warning(&self) -> Option<Duration> {
        if self.slow_effect_warn_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.slow_effect_warn_ms))
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.achievement_interval_weeks == 0 {
            return Err(ConfigError::Invalid {
                field: "ticks.achievement_interval_weeks",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_weeks_per_season() -> u32 {
    12
}

const fn default_start_week() -> u32 {
    1
}

const fn default_start_season() -> Season {
    Season::Spring
}

const fn default_start_year() -> u32 {
    2024
}

fn default_edge_shift_chance() -> f64 {
    1.0 / 3.0
}

const fn default_middle_shift_chance() -> f64 {
    0.25
}

const fn default_starting_phase() -> EconomyPhase {
    EconomyPhase::Stable
}

const fn default_achievement_interval_weeks() -> u64 {
    4
}

const fn default_slow_effect_warn_ms() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
