//! Motion sources: the child blobs that split off, roam and merge back.
//!
//! Each source keeps its own kinematic state and is advanced by the phase
//! controller once per tick. All smoothing uses [`smoothing`], so motion
//! looks the same at 30 Hz and 144 Hz.

use crate::easing::{lerp, smoothing};
use crate::error::ConfigError;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Depth the split pushes toward, relative to the center depth.
const SPLIT_DEPTH_LIFT: f32 = 0.1;
/// Fraction of the split progress applied to the depth lift.
const SPLIT_DEPTH_SHARE: f32 = 0.6;
/// Roam depth targets stay inside this band.
const DEPTH_MIN: f32 = 0.08;
const DEPTH_MAX: f32 = 0.92;

/// Lissajous curve driving roam targets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lissajous {
    /// Amplitude per axis in normalized units.
    pub amplitude: Vec2,
    /// Angular frequency per axis (radians per second).
    pub frequency: Vec2,
    /// Phase added on top of each source's ring angle.
    pub phase: f32,
}

impl Default for Lissajous {
    fn default() -> Self {
        Self {
            amplitude: Vec2::new(0.17, 0.21),
            frequency: Vec2::new(0.35, 0.27),
            phase: PI * 0.33,
        }
    }
}

/// Strength and falloff of a deposited ball.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallParams {
    pub strength: f32,
    pub falloff: f32,
}

impl BallParams {
    pub const fn new(strength: f32, falloff: f32) -> Self {
        Self { strength, falloff }
    }
}

/// Kinematic tuning for the motion source pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Number of child sources.
    pub source_count: usize,
    /// Field center in XY.
    pub center: Vec2,
    /// Resting depth.
    pub depth_center: f32,
    /// Radius of the ring children settle on after a split.
    pub ring_radius: f32,
    /// Ring rotation added on every split after the first (radians).
    pub split_ring_spin: f32,
    /// Roam targets are kept within this distance of the center.
    pub roam_radius: f32,
    /// XY approach rate while roaming (per second).
    pub lerp_rate: f32,
    /// Depth approach rate while roaming (per second).
    pub depth_lerp_rate: f32,
    /// Rate at which sources relax to the center during merge or when disabled.
    pub merge_rate: f32,
    pub lissajous: Lissajous,
    /// Magnitude of per-source target wobble.
    pub noise: f32,
    /// Amplitude of the roam depth oscillation.
    pub depth_range: f32,
    /// Angular speed of the roam depth oscillation.
    pub depth_speed: f32,
    /// Relative amplitude of the child strength pulse.
    pub breath_amplitude: f32,
    /// Angular speed of the child strength pulse.
    pub breath_speed: f32,
    /// Ball shape shared by all child sources.
    pub child_ball: BallParams,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            source_count: 6,
            center: Vec2::splat(0.5),
            depth_center: 0.5,
            ring_radius: 0.16,
            split_ring_spin: PI / 6.0,
            roam_radius: 0.26,
            lerp_rate: 0.55,
            depth_lerp_rate: 0.5,
            merge_rate: 0.9,
            lissajous: Lissajous::default(),
            noise: 0.05,
            depth_range: 0.12,
            depth_speed: 0.28,
            breath_amplitude: 0.05,
            breath_speed: 1.3,
            child_ball: BallParams::new(0.52, 17.5),
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_count == 0 {
            return Err(ConfigError::EmptyPool("motion.source_count"));
        }
        for (name, value) in [
            ("motion.lerp_rate", self.lerp_rate),
            ("motion.depth_lerp_rate", self.depth_lerp_rate),
            ("motion.merge_rate", self.merge_rate),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }

    /// Center as a 3D point at the resting depth.
    pub fn center3(&self) -> Vec3 {
        self.center.extend(self.depth_center)
    }

    /// Ring angle of source `index`.
    pub fn ring_angle(&self, index: usize) -> f32 {
        index as f32 / self.source_count as f32 * TAU
    }

    /// Point on the split ring at `angle`.
    pub fn ring_point(&self, angle: f32) -> Vec2 {
        self.center + Vec2::new(angle.cos(), angle.sin()) * self.ring_radius
    }
}

/// One mobile field source.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionSource {
    /// Current XY position in field space.
    pub position: Vec2,
    /// Current roam goal.
    pub target: Vec2,
    /// Resting point on the split ring.
    pub home: Vec2,
    pub depth: f32,
    pub depth_target: f32,
    /// Per-source phase offset for desynchronized wobble.
    pub seed: f32,
    pub strength: f32,
    pub falloff: f32,
    /// Angle on the ring plus the Lissajous phase.
    phase_offset: f32,
}

impl MotionSource {
    /// Create source `index`, collapsed at the center.
    pub fn new(index: usize, config: &MotionConfig, seed: f32) -> Self {
        let angle = config.ring_angle(index);
        let home = config.ring_point(angle);
        Self {
            position: config.center,
            target: home,
            home,
            depth: config.depth_center,
            depth_target: config.depth_center,
            seed,
            strength: config.child_ball.strength,
            falloff: config.child_ball.falloff,
            phase_offset: angle + config.lissajous.phase,
        }
    }

    /// Position including depth.
    #[inline]
    pub fn position3(&self) -> Vec3 {
        self.position.extend(self.depth)
    }

    /// Jump to the center at the resting depth.
    pub fn snap_to_center(&mut self, config: &MotionConfig) {
        self.position = config.center;
        self.depth = config.depth_center;
    }

    /// Move the ring home to `angle`.
    pub fn rehome(&mut self, angle: f32, config: &MotionConfig) {
        self.home = config.ring_point(angle);
    }

    /// Place the source along the center-to-home path at eased progress `t`.
    pub fn split(&mut self, t: f32, config: &MotionConfig) {
        self.position = config.center.lerp(self.home, t);
        self.depth = lerp(
            config.depth_center,
            config.depth_center + SPLIT_DEPTH_LIFT,
            t * SPLIT_DEPTH_SHARE,
        );
    }

    /// Follow the Lissajous roam path.
    pub fn roam(&mut self, elapsed: f32, dt: f32, config: &MotionConfig) {
        let liss = &config.lissajous;
        let p = self.phase_offset;

        let raw = config.center
            + Vec2::new(
                (elapsed * liss.frequency.x + p).sin() * liss.amplitude.x * 0.9,
                (elapsed * liss.frequency.y + p).cos() * liss.amplitude.y * 0.9,
            );
        let offset = (raw - config.center).clamp_length_max(config.roam_radius);
        self.target = config.center
            + offset
            + Vec2::new(
                ((elapsed + self.seed) * 0.6).sin() * config.noise,
                (elapsed * 0.7 + self.seed).cos() * config.noise,
            );
        self.position = self
            .position
            .lerp(self.target, smoothing(config.lerp_rate, dt));

        let desired = config.depth_center + (elapsed * config.depth_speed + p).sin() * config.depth_range;
        self.depth_target = desired.clamp(DEPTH_MIN, DEPTH_MAX);
        self.depth = lerp(
            self.depth,
            self.depth_target,
            smoothing(config.depth_lerp_rate, dt),
        );
    }

    /// Exponentially pull position and depth back to the center.
    pub fn relax(&mut self, rate: f32, dt: f32, config: &MotionConfig) {
        let k = smoothing(rate, dt);
        self.position = self.position.lerp(config.center, k);
        self.depth = lerp(self.depth, config.depth_center, k);
    }

    /// Distance from the center including depth.
    pub fn distance_from_center(&self, config: &MotionConfig) -> f32 {
        self.position3().distance(config.center3())
    }
}
