//! Configuration schema
//!
//! ```yaml
//! cycle:
//!   min: 4s
//!   max: 6s
//! order: fifo
//! seed: 42
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::phase::timing::parse_duration;
use crate::phase::{ControllerConfig, CycleRange, DeliveryOrder};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalConfig {
    /// Phase duration bounds.
    #[serde(default)]
    pub cycle: CycleSpec,

    /// Phase channel removal policy.
    #[serde(default)]
    pub order: DeliveryOrder,

    /// Fixed RNG seed for reproducible cycles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Human-readable cycle bounds, e.g. `"4s"` and `"6s"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleSpec {
    /// Shortest phase duration.
    #[serde(default = "default_min")]
    pub min: String,

    /// Longest phase duration.
    #[serde(default = "default_max")]
    pub max: String,
}

fn default_min() -> String {
    "4s".to_string()
}

fn default_max() -> String {
    "6s".to_string()
}

impl Default for CycleSpec {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
        }
    }
}

impl CycleSpec {
    /// Parses and validates the bounds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if either bound is not a duration
    /// or the range is empty.
    pub fn to_range(&self) -> Result<CycleRange, ConfigError> {
        let min = parse_duration("cycle.min", &self.min)?;
        let max = parse_duration("cycle.max", &self.max)?;
        CycleRange::new(min, max)
    }
}

/// Values supplied on the command line, applied over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replacement for `cycle.min`.
    pub min_cycle: Option<String>,
    /// Replacement for `cycle.max`.
    pub max_cycle: Option<String>,
    /// Replacement for `order`.
    pub order: Option<DeliveryOrder>,
    /// Replacement for `seed`.
    pub seed: Option<u64>,
}

impl SignalConfig {
    /// Returns a copy with every `Some` override applied.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(min) = overrides.min_cycle {
            self.cycle.min = min;
        }
        if let Some(max) = overrides.max_cycle {
            self.cycle.max = max;
        }
        if let Some(order) = overrides.order {
            self.order = order;
        }
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }
        self
    }

    /// Validates the configuration and builds a controller configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for malformed or inconsistent
    /// cycle bounds.
    pub fn controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        Ok(ControllerConfig {
            cycle: self.cycle.to_range()?,
            order: self.order,
            seed: self.seed,
        })
    }
}
