//! Engine configuration.
//!
//! One [`EngineConfig`] covers every variant of the blob: the plain
//! choreography ([`EngineConfig::choreography`], the default) and the
//! pointer-reactive one with bursts ([`EngineConfig::interactive`]). Every
//! struct deserializes with defaults for missing keys, so a JSON file only
//! needs the values it changes.
//!
//! ```ignore
//! let config = EngineConfig::interactive()
//!     .with_resolution(96)
//!     .with_seed(7);
//! config.validate()?;
//! ```

use crate::burst::BurstConfig;
use crate::controls::{PointerConfig, PointerFollower, PointerScale};
use crate::driver::ProbeCadence;
use crate::error::ConfigError;
use crate::field::check_resolution;
use crate::motion::{BallParams, MotionConfig};
use crate::phase::PhaseDurations;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Slow wobble applied to the volume so reflections drift.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Angular speed of the x and y wobble.
    pub speed: Vec2,
    /// Peak rotation about x and y in radians.
    pub amplitude: Vec2,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            speed: Vec2::new(0.05, 0.08),
            amplitude: Vec2::new(0.06, 0.1),
        }
    }
}

impl RotationConfig {
    /// Rotation at `elapsed` seconds.
    pub fn at(&self, elapsed: f32) -> Vec2 {
        Vec2::new(
            (elapsed * self.speed.x).sin() * self.amplitude.x,
            (elapsed * self.speed.y).sin() * self.amplitude.y,
        )
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Grid samples per axis.
    pub resolution: u32,
    /// Field value the surface is extracted at.
    pub iso_level: f32,
    /// World size of the unit cube at scale 1.
    pub base_scale: f32,
    /// RNG seed. `None` draws from entropy.
    pub seed: Option<u64>,
    pub phases: PhaseDurations,
    pub motion: MotionConfig,
    /// Ball shape of the central blob.
    pub central_ball: BallParams,
    /// Burst swarm. `None` disables it.
    pub burst: Option<BurstConfig>,
    pub pointer: PointerConfig,
    pub probe: ProbeCadence,
    pub rotation: RotationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolution: 110,
            iso_level: 50.0,
            base_scale: 500.0,
            seed: None,
            phases: PhaseDurations::default(),
            motion: MotionConfig::default(),
            central_ball: BallParams::new(1.15, 13.5),
            burst: None,
            pointer: PointerConfig::default(),
            probe: ProbeCadence::default(),
            rotation: RotationConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase choreography only. Same as [`Default`].
    pub fn choreography() -> Self {
        Self::default()
    }

    /// Choreography plus pointer follower, pointer scale and bursts.
    pub fn interactive() -> Self {
        Self {
            iso_level: 90.0,
            burst: Some(BurstConfig::default()),
            pointer: PointerConfig {
                follower: Some(PointerFollower::default()),
                scale: Some(PointerScale::default()),
            },
            probe: ProbeCadence::EveryFrames(120),
            ..Self::default()
        }
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_iso_level(mut self, iso_level: f32) -> Self {
        self.iso_level = iso_level;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_phases(mut self, phases: PhaseDurations) -> Self {
        self.phases = phases;
        self
    }

    pub fn with_motion(mut self, motion: MotionConfig) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_burst(mut self, burst: BurstConfig) -> Self {
        self.burst = Some(burst);
        self
    }

    pub fn with_probe(mut self, probe: ProbeCadence) -> Self {
        self.probe = probe;
        self
    }

    /// Parse from JSON, filling gaps with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every parameter the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_resolution(self.resolution)?;
        for (name, value) in [
            ("iso_level", self.iso_level),
            ("base_scale", self.base_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        self.phases.validate()?;
        self.motion.validate()?;
        if let Some(burst) = &self.burst {
            burst.validate()?;
        }
        self.pointer.validate()?;
        self.probe.validate()?;
        Ok(())
    }
}
