//! Tracker configuration, loaded from TOML.
//!
//! Every section and every field is optional; anything left out falls back to
//! the values used on the recorded table footage.

use crate::core_modules::candidate::FilterConfig;
use crate::core_modules::mask::ColorRange;
use crate::core_modules::region::RegionSpec;
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Knobs of the orchestration loop that do not affect detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pause after each frame, in milliseconds. 0 disables pacing.
    pub frame_delay_ms: u64,
    /// Stop after this many frames. 0 means no limit.
    pub max_frames: u64,
    /// Render ROI and annotated images for sinks.
    pub annotate: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frame_delay_ms: 0,
            max_frames: 0,
            annotate: false,
        }
    }
}

impl RunConfig {
    pub fn frame_delay(&self) -> Option<Duration> {
        (self.frame_delay_ms > 0).then(|| Duration::from_millis(self.frame_delay_ms))
    }

    pub fn frame_limit(&self) -> Option<u64> {
        (self.max_frames > 0).then_some(self.max_frames)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub region: RegionSpec,
    pub color: ColorRange,
    pub filter: FilterConfig,
    pub run: RunConfig,
}

impl TrackerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            VisionError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.region.validate()?;
        self.color.validate()?;
        self.filter.validate()?;
        Ok(())
    }
}
