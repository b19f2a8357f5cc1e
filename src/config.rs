//! Learning parameters and run bounds.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Parameters of one GNG run. Fixed once the engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GngConfig {
    /// Cycles between two node insertions.
    /// Default: 100.
    pub tau: u64,

    /// Learning rate of the winner.
    /// Default: 0.2.
    pub ethag: f64,

    /// Learning rate of the winner's neighbours.
    /// Default: 0.006.
    pub ethav: f64,

    /// Edges older than this are pruned.
    /// Default: 50.
    pub amax: u64,

    /// Error decay applied to the two nodes split by an insertion.
    /// Default: 0.5.
    pub alpha: f64,

    /// Error decay applied to every node at the end of each cycle.
    /// Default: 0.995.
    pub delta: f64,

    /// Stop after this many cycles even if signals remain.
    pub max_iterations: Option<u64>,

    /// Emit a snapshot every N cycles, in addition to the final one.
    pub snapshot_interval: Option<u64>,
}

impl Default for GngConfig {
    fn default() -> Self {
        Self {
            tau: 100,
            ethag: 0.2,
            ethav: 0.006,
            amax: 50,
            alpha: 0.5,
            delta: 0.995,
            max_iterations: None,
            snapshot_interval: None,
        }
    }
}

impl GngConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.tau == 0 {
            return Err(Error::Config("tau must be > 0".to_string()));
        }
        for (name, value) in [
            ("ethag", self.ethag),
            ("ethav", self.ethav),
            ("alpha", self.alpha),
            ("delta", self.delta),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.snapshot_interval == Some(0) {
            return Err(Error::Config("snapshot interval must be > 0".to_string()));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
