//! Error types for the gait analysis core.
//!
//! Only two things can fail in this crate:
//! - constructing a component with an invalid configuration ([`ConfigError`]),
//! - reading/writing frames and reports at the ingestion boundary ([`GaitError`]).
//!
//! Per-frame processing never returns an error. Missing or degraded input
//! surfaces as a no-op update or an `UNKNOWN` classification instead.

use thiserror::Error;

/// Invalid configuration detected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A value must lie within a closed/half-open range.
    #[error("{field} = {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// A window or history size must be at least `min`.
    #[error("{field} = {value} is too small (minimum {min})")]
    TooSmall {
        field: &'static str,
        value: usize,
        min: usize,
    },

    /// A count must be at most `max`.
    #[error("{field} = {value} is too large (maximum {max})")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },

    /// Two thresholds that must be ordered are not.
    #[error("{lower} must be less than {upper}")]
    Inverted {
        lower: &'static str,
        upper: &'static str,
    },

    /// At least one side must be tracked.
    #[error("no sides configured for tracking")]
    NoSides,
}

impl ConfigError {
    /// Checks that `value` is finite and strictly positive.
    pub(crate) fn positive(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value,
                expected: "> 0",
            })
        }
    }

    /// Checks that `value` is within (0, 1].
    pub(crate) fn unit_alpha(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
        if value > 0.0 && value <= 1.0 {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value,
                expected: "(0, 1]",
            })
        }
    }

    /// Checks that `value` is within [0, 1].
    pub(crate) fn unit_interval(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value,
                expected: "[0, 1]",
            })
        }
    }

    /// Checks that `value` is finite and not negative.
    pub(crate) fn non_negative(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value,
                expected: ">= 0",
            })
        }
    }

    /// Checks that `value` is within [0, 100].
    pub(crate) fn percentage(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
        if (0.0..=100.0).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                field,
                value,
                expected: "[0, 100]",
            })
        }
    }

    pub(crate) fn at_most(field: &'static str, value: usize, max: usize) -> std::result::Result<(), ConfigError> {
        if value <= max {
            Ok(())
        } else {
            Err(ConfigError::TooLarge { field, value, max })
        }
    }

    pub(crate) fn at_least(field: &'static str, value: usize, min: usize) -> std::result::Result<(), ConfigError> {
        if value >= min {
            Ok(())
        } else {
            Err(ConfigError::TooSmall { field, value, min })
        }
    }

    pub(crate) fn ordered(
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    ) -> std::result::Result<(), ConfigError> {
        if lower_value < upper_value {
            Ok(())
        } else {
            Err(ConfigError::Inverted { lower, upper })
        }
    }
}

/// Errors at the ingestion/export boundary.
#[derive(Debug, Error)]
pub enum GaitError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame on line {line}: {source}")]
    Frame {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    TomlRender(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for ingestion/export operations.
pub type Result<T> = std::result::Result<T, GaitError>;
