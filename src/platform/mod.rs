//! Platform abstraction layer
//!
//! Handles native/browser differences for:
//! - Time (real sleeping natively, virtual time in tests)
//! - The WebAssembly bridge used by the block editor page

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(not(target_arch = "wasm32"))]
use crate::settings::PlaybackSpeed;

/// Time source the tick driver sleeps on between ticks
pub trait Clock {
    /// Milliseconds since the clock was created
    fn now_ms(&self) -> u64;
    /// Suspend for one tick interval (or pretend to)
    fn sleep_ms(&mut self, ms: u64);
}

/// Instant virtual time: sleeping just advances a counter
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.now += ms;
    }
}

/// Wall-clock time, sleeps scaled by the playback preset
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: std::time::Instant,
    playback: PlaybackSpeed,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClock {
    pub fn new(playback: PlaybackSpeed) -> Self {
        Self {
            start: std::time::Instant::now(),
            playback,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u64) {
        let scaled = self.playback.scale_ms(ms);
        if scaled > 0 {
            std::thread::sleep(std::time::Duration::from_millis(scaled));
        }
    }
}
