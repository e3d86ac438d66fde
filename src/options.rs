use crate::error::{HintsError, Result};
use crate::mode::keyboard::{KeyBinding, default_key_bindings};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default hint alphabet: home row first, then the keys next to it
pub const DEFAULT_CHARS: &str = "fjdkslaurieowhgmvcn";

/// Timing knobs, all in milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timing {
    /// How long to wait for frames that never answer
    pub frame_timeout_ms: u64,
    /// Re-measurement cadence while hints are shown
    pub update_interval_ms: u64,
    /// Minimum pause between two re-measurement cycles
    pub min_update_interval_ms: u64,
    /// How long an activated hint stays highlighted before hints disappear
    pub unrender_delay_ms: u64,
    /// Budget for one frame's discovery pass before falling back to raw text
    pub discovery_deadline_ms: u64,
    /// Length of one idle slice for incremental mutation processing
    pub idle_slice_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            frame_timeout_ms: 100,
            update_interval_ms: 500,
            min_update_interval_ms: 100,
            unrender_delay_ms: 200,
            discovery_deadline_ms: 300,
            idle_slice_ms: 10,
        }
    }
}

impl Timing {
    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn min_update_interval(&self) -> Duration {
        Duration::from_millis(self.min_update_interval_ms)
    }

    pub fn unrender_delay(&self) -> Duration {
        Duration::from_millis(self.unrender_delay_ms)
    }

    pub fn discovery_deadline(&self) -> Duration {
        Duration::from_millis(self.discovery_deadline_ms)
    }

    pub fn idle_slice(&self) -> Duration {
        Duration::from_millis(self.idle_slice_ms)
    }
}

/// User options consumed by the hints engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HintsOptions {
    /// Hint alphabet; earlier characters are preferred
    pub chars: String,

    /// Activate automatically once a text filter leaves a single candidate
    pub auto_activate: bool,

    /// Per-element visibility tracking is abandoned above this many elements
    pub max_tracked_elements: usize,

    /// Elements at least this tall get their hint at the left-centre edge
    pub tall_element_threshold: f64,

    pub timing: Timing,

    pub key_bindings: Vec<KeyBinding>,
}

impl Default for HintsOptions {
    fn default() -> Self {
        Self {
            chars: DEFAULT_CHARS.to_string(),
            auto_activate: true,
            max_tracked_elements: 10_000,
            tall_element_threshold: 100.0,
            timing: Timing::default(),
            key_bindings: default_key_bindings(),
        }
    }
}

impl HintsOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the hint alphabet
    pub fn chars(mut self, chars: impl Into<String>) -> Self {
        self.chars = chars.into();
        self
    }

    /// Builder method: toggle auto-activation
    pub fn auto_activate(mut self, auto_activate: bool) -> Self {
        self.auto_activate = auto_activate;
        self
    }

    /// Builder method: set the visibility tracking ceiling
    pub fn max_tracked_elements(mut self, max: usize) -> Self {
        self.max_tracked_elements = max;
        self
    }

    /// Builder method: set timings
    pub fn timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Hint alphabet as characters
    pub fn alphabet(&self) -> Vec<char> {
        self.chars.chars().collect()
    }

    /// Check the options are usable
    pub fn validate(&self) -> Result<()> {
        let chars = self.alphabet();
        let unique: HashSet<char> = chars.iter().copied().collect();
        if unique.len() != chars.len() {
            return Err(HintsError::InvalidOptions(format!(
                "hint characters must be unique: {:?}",
                self.chars
            )));
        }
        if unique.len() < 2 {
            return Err(HintsError::InvalidOptions(
                "at least two hint characters are required".to_string(),
            ));
        }
        if chars.iter().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(HintsError::InvalidOptions(
                "hint characters cannot contain whitespace".to_string(),
            ));
        }
        let timing = &self.timing;
        if timing.frame_timeout_ms == 0 || timing.update_interval_ms == 0 || timing.idle_slice_ms == 0 {
            return Err(HintsError::InvalidOptions("timings must be positive".to_string()));
        }
        if timing.min_update_interval_ms > timing.update_interval_ms {
            return Err(HintsError::InvalidOptions(
                "min_update_interval_ms cannot exceed update_interval_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate options from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
