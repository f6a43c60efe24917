//! Frame clock feeding `dt` and elapsed time to the frame driver.
//!
//! Elapsed time is the running sum of the (scaled, clamped) deltas rather
//! than wall time since start, so a clock with a fixed delta reproduces the
//! same timeline on every run.
//!
//! # Example
//!
//! ```ignore
//! use metaglob::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//!
//! // In your render loop:
//! let (elapsed, dt) = clock.update();
//! driver.tick(dt, elapsed, signals);
//! ```

use std::time::Instant;

/// Longest delta a single frame may report, in seconds.
///
/// A host that was suspended (hidden tab, debugger) would otherwise hand the
/// simulation one enormous step.
pub const DEFAULT_MAX_DELTA: f32 = 0.25;

/// Time tracking for the animation loop.
#[derive(Debug)]
pub struct FrameClock {
    /// When the last frame occurred.
    last_frame: Instant,
    /// Sum of all reported deltas, kept wide so long runs do not stall.
    elapsed_secs: f64,
    /// Delta reported by the last update.
    delta_secs: f32,
    frame_count: u64,
    paused: bool,
    /// Fixed delta for deterministic stepping.
    fixed_delta: Option<f32>,
    /// Multiplier applied to every delta.
    time_scale: f32,
    max_delta: f32,
}

impl FrameClock {
    /// Create a clock starting now.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
            max_delta: DEFAULT_MAX_DELTA,
        }
    }

    /// Clock that advances by exactly `delta` seconds per update.
    pub fn fixed(delta: f32) -> Self {
        let mut clock = Self::new();
        clock.set_fixed_delta(Some(delta));
        clock
    }

    /// Advance one frame. Returns `(elapsed, delta)`.
    pub fn update(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.paused {
            self.delta_secs = 0.0;
            return (self.elapsed_secs as f32, self.delta_secs);
        }

        let delta = self.fixed_delta.unwrap_or(raw).min(self.max_delta);
        self.delta_secs = delta * self.time_scale;
        self.elapsed_secs += f64::from(self.delta_secs);
        self.frame_count += 1;

        (self.elapsed_secs as f32, self.delta_secs)
    }

    /// Total elapsed simulation time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs as f32
    }

    /// Delta reported by the last update, in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Frames advanced so far (paused updates do not count).
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Stop advancing. Updates report a zero delta until resumed.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume after a pause without counting the paused interval.
    pub fn resume(&mut self) {
        if self.paused {
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    /// Set a fixed delta for deterministic updates. `None` restores wall time.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta.map(|d| d.max(0.0));
    }

    /// Set the time scale (clamped to >= 0).
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Set the per-frame delta cap (clamped to >= 0).
    pub fn set_max_delta(&mut self, max: f32) {
        self.max_delta = max.max(0.0);
    }

    /// Restart from zero.
    pub fn reset(&mut self) {
        self.last_frame = Instant::now();
        self.elapsed_secs = 0.0;
        self.delta_secs = 0.0;
        self.frame_count = 0;
        self.paused = false;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
