//! Editor tunables.
//!
//! Everything has a default; hosts may override any subset from JSON.

use crate::snap::{GRID_SIZE, SNAP_THRESHOLD, SnapMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Default interval between retention sweeps, in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    pub interval_secs: u64,
    pub cleanup_interval_secs: u64,
    /// Saved documents kept by a cleanup sweep (newest first).
    pub max_documents: usize,
    /// Total write attempts per save.
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            max_documents: 20,
            max_attempts: 3,
            retry_delay_ms: 250,
        }
    }
}

impl AutoSaveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_secs = interval.as_secs();
        self
    }

    pub fn with_max_documents(mut self, max_documents: usize) -> Self {
        self.max_documents = max_documents;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub snap_mode: SnapMode,
    /// Pixel distance within which snapping engages.
    pub snap_threshold: f64,
    pub grid_size: f64,
    /// Minimum gap between outbound canvas broadcasts.
    pub broadcast_throttle_ms: u64,
    /// Maximum gap between the clicks of a double-click.
    pub double_click_ms: u64,
    /// Maximum pointer travel between the clicks of a double-click.
    pub double_click_distance: f64,
    /// Hit-test slop in page pixels.
    pub hit_tolerance: f64,
    pub max_history: usize,
    pub autosave: AutoSaveConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            snap_mode: SnapMode::Shapes,
            snap_threshold: SNAP_THRESHOLD,
            grid_size: GRID_SIZE,
            broadcast_throttle_ms: 100,
            double_click_ms: 300,
            double_click_distance: 5.0,
            hit_tolerance: 4.0,
            max_history: crate::history::DEFAULT_MAX_HISTORY,
            autosave: AutoSaveConfig::default(),
        }
    }
}

impl StudioConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn broadcast_throttle(&self) -> Duration {
        Duration::from_millis(self.broadcast_throttle_ms)
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}
