//! Volume level handed to the audio backend
//!
//! The backend takes a linear level in `[0.0, 1.0]`. The player bar works in
//! whole percent, so both views are provided.

use serde::{Deserialize, Serialize};

/// Clamped linear volume
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct Volume(f32);

impl Volume {
    /// Create a volume, clamping to `[0.0, 1.0]`
    ///
    /// NaN is treated as silence.
    pub fn new(level: f32) -> Self {
        if level.is_nan() {
            return Self(0.0);
        }
        Self(level.clamp(0.0, 1.0))
    }

    /// Create from a percentage (0-100, clamped)
    pub fn from_percent(percent: u8) -> Self {
        Self(f32::from(percent.min(100)) / 100.0)
    }

    /// Linear level in `[0.0, 1.0]`
    pub fn level(self) -> f32 {
        self.0
    }

    /// Level rounded to whole percent
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }

    pub fn is_silent(self) -> bool {
        self.0 == 0.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(0.8)
    }
}

impl From<f32> for Volume {
    fn from(level: f32) -> Self {
        Self::new(level)
    }
}

impl From<Volume> for f32 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}
