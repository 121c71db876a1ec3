//! Player configuration.
//!
//! Every field has a default matching the stock player, so a config file only
//! needs the values it changes. Command-line flags override the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Tunable playback and display constants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Scheduler tick cadence in milliseconds.
    pub scheduler_interval_ms: u64,

    /// How far ahead of song time notes are dispatched, in wall seconds.
    pub lookahead_seconds: f64,

    /// Minimum lead between "now" and a dispatched deadline, in seconds.
    pub safety_margin_seconds: f64,

    /// Shortest note length sent to the renderer, in song seconds.
    pub min_note_seconds: f64,

    /// Visual refresh cadence in milliseconds.
    pub frame_interval_ms: u64,

    /// Playback stops this long after the last note ends, in song seconds.
    pub end_grace_seconds: f64,

    /// Initial speed multiplier.
    pub speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub speed_step: f64,

    /// Seek distance for the arrow keys, in song seconds.
    pub seek_step_seconds: f64,

    /// Master volume (0.0-2.0).
    pub volume: f64,
    pub volume_step: f64,

    /// Song seconds shown above the keyboard line in the piano roll.
    pub roll_window_seconds: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            scheduler_interval_ms: 25,
            lookahead_seconds: 0.25,
            safety_margin_seconds: 0.008,
            min_note_seconds: 0.05,
            frame_interval_ms: 16,
            end_grace_seconds: 1.0,
            speed: 1.0,
            min_speed: 0.25,
            max_speed: 3.0,
            speed_step: 0.1,
            seek_step_seconds: 5.0,
            volume: 1.0,
            volume_step: 0.1,
            roll_window_seconds: 4.0,
        }
    }
}

impl PlayerConfig {
    /// Loads a JSON config file. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler_interval_ms == 0 || self.frame_interval_ms == 0 {
            anyhow::bail!("tick intervals must be positive");
        }
        if self.lookahead_seconds < 0.0 || self.safety_margin_seconds < 0.0 {
            anyhow::bail!("lookahead and safety margin must not be negative");
        }
        if !(self.min_speed > 0.0 && self.min_speed <= self.max_speed) {
            anyhow::bail!(
                "speed range {}..{} is invalid",
                self.min_speed,
                self.max_speed
            );
        }
        if self.roll_window_seconds <= 0.0 {
            anyhow::bail!("roll window must be positive");
        }
        Ok(())
    }

    /// Clamps a requested speed into the configured range.
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        speed.clamp(self.min_speed, self.max_speed)
    }

    pub fn scheduler_interval_seconds(&self) -> f64 {
        self.scheduler_interval_ms as f64 / 1000.0
    }

    pub fn frame_interval_seconds(&self) -> f64 {
        self.frame_interval_ms as f64 / 1000.0
    }
}
