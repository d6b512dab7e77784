//! Engine settings
//!
//! Timing of the interpreter and how fast the real-time driver plays it back.
//! Loaded from a JSON file natively; the browser passes the JSON string in.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Real-time playback presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlaybackSpeed {
    #[default]
    Normal,
    Fast,
    /// No sleeping between ticks at all
    Instant,
}

impl PlaybackSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackSpeed::Normal => "Normal",
            PlaybackSpeed::Fast => "Fast",
            PlaybackSpeed::Instant => "Instant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" | "1x" => Some(PlaybackSpeed::Normal),
            "fast" | "4x" => Some(PlaybackSpeed::Fast),
            "instant" => Some(PlaybackSpeed::Instant),
            _ => None,
        }
    }

    /// Wall-clock milliseconds to sleep for `ms` of simulated time
    pub fn scale_ms(&self, ms: u64) -> u64 {
        match self {
            PlaybackSpeed::Normal => ms,
            PlaybackSpeed::Fast => ms / 4,
            PlaybackSpeed::Instant => 0,
        }
    }
}

/// Interpreter timing. All durations are simulated milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Length of one tick
    pub tick_ms: u64,
    /// Pause after snapping to the start pose on a fresh run
    pub reset_pause_ms: u64,
    /// Pause after SET_SPEED
    pub speed_pause_ms: u64,
    /// Pause after SET_COLOR
    pub color_pause_ms: u64,
    /// Pause consumed by a command type the engine does not know
    pub unknown_pause_ms: u64,
    /// Delay before a new run takes over from a cancelled one
    pub restart_grace_ms: u64,
    /// Hard bound on WAIT_UNTIL
    pub wait_until_timeout_ms: u64,
    pub playback: PlaybackSpeed,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            reset_pause_ms: 500,
            speed_pause_ms: 20,
            color_pause_ms: 200,
            unknown_pause_ms: 100,
            restart_grace_ms: 50,
            wait_until_timeout_ms: 60_000,
            playback: PlaybackSpeed::Normal,
        }
    }
}

impl Settings {
    /// Settings with a playback preset applied
    pub fn from_playback(playback: PlaybackSpeed) -> Self {
        Self {
            playback,
            ..Self::default()
        }
    }

    /// Tick length, never zero
    pub fn tick_ms(&self) -> u64 {
        self.tick_ms.max(1)
    }

    /// Whole ticks covering `ms` (rounded up, at least one)
    pub fn ticks_for(&self, ms: u64) -> u32 {
        ms.div_ceil(self.tick_ms()).max(1) as u32
    }

    /// Ticks per simulated second
    pub fn tick_rate(&self) -> f32 {
        1000.0 / self.tick_ms() as f32
    }

    /// Grace ticks before a replacement run starts (at least one tick)
    pub fn restart_grace_ticks(&self) -> u32 {
        self.ticks_for(self.restart_grace_ms)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
