//! Engine configuration: history depth and simulation timing.
//!
//! Every field has a default, so a configuration file only needs to name the
//! values it changes:
//!
//! ```json
//! { "sim": { "speedDivisor": 4 } }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::types::EngineError;

/// The interval of one simulation step at speed divisor 1.
pub const DEFAULT_BASE_INTERVAL_MS: u64 = 1000;
/// Shortest step interval the stepper accepts.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimConfig {
    pub base_interval_ms: u64,
    /// User-selected speed: the step interval is the base interval divided by this.
    pub speed_divisor: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: DEFAULT_BASE_INTERVAL_MS,
            speed_divisor: 1,
        }
    }
}

impl SimConfig {
    /// The duration of one step, never shorter than [`MIN_INTERVAL`].
    pub fn interval(&self) -> Duration {
        let interval = Duration::from_millis(self.base_interval_ms) / self.speed_divisor.max(1);
        interval.max(MIN_INTERVAL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// How many undo records are kept.
    pub history_limit: usize,
    pub sim: SimConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            sim: SimConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, EngineError> {
        serde_json::from_str(text)
            .map_err(|e| EngineError::FileError(format!("Invalid configuration: {}", e)))
    }

    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }
}
