//! Burst spawner: short-lived swarms triggered by pointer proximity.
//!
//! When the pointer enters the [`ProximityZone`] (and was outside it on the
//! previous tick, and the cooldown has passed) a batch of [`BurstSource`]s is
//! spawned. Each member flies out from the center and back along an
//! out-and-back `sin(PI * u)` envelope while orbiting the view axis, then
//! expires.
//!
//! # Example
//!
//! ```ignore
//! let mut spawner = BurstSpawner::new(BurstConfig::default(), StdRng::seed_from_u64(1))?;
//! spawner.update(now, Some(Vec2::new(0.5, 0.4)));
//! for ball in spawner.deposits(now) {
//!     grid.deposit_ball(&ball);
//! }
//! ```

use crate::easing::clamp01;
use crate::error::ConfigError;
use crate::field::BallDeposit;
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::ops::Range;
use tracing::{debug, info};

/// Axis-aligned rectangle in normalized pointer space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProximityZone {
    pub center: Vec2,
    pub half_extent: Vec2,
}

impl Default for ProximityZone {
    /// A narrow vertical band through the middle of the view.
    fn default() -> Self {
        Self {
            center: Vec2::splat(0.5),
            half_extent: Vec2::new(0.03, 1.0),
        }
    }
}

impl ProximityZone {
    pub fn new(center: Vec2, half_extent: Vec2) -> Self {
        Self {
            center,
            half_extent,
        }
    }

    /// Whether `pointer` lies inside. Missing or non-finite pointers never do.
    pub fn contains(&self, pointer: Option<Vec2>) -> bool {
        match pointer {
            Some(p) if p.is_finite() => {
                let d = (p - self.center).abs();
                d.x <= self.half_extent.x && d.y <= self.half_extent.y
            }
            _ => false,
        }
    }
}

/// What happens when a trigger fires while a batch is still alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// The new batch replaces the live one.
    #[default]
    Replace,
    /// Triggers are ignored until the live batch has fully expired.
    SingleFlight,
}

/// Burst spawner tuning. Ranges are sampled independently per member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    pub zone: ProximityZone,
    /// Minimum seconds between two triggers.
    pub cooldown: f32,
    /// Members per batch.
    pub batch_size: usize,
    pub policy: OverlapPolicy,
    /// Point the swarm flies out from.
    pub origin: Vec3,
    /// Lifetime in seconds.
    pub duration: Range<f32>,
    pub strength: Range<f32>,
    /// Peak distance from the origin.
    pub radius: Range<f32>,
    /// Orbit speed around the view axis (radians per second).
    pub angular_speed: Range<f32>,
    /// Kernel falloff; larger is tighter.
    pub falloff: Range<f32>,
    /// Constant depth shift applied to every member.
    pub depth_offset: f32,
    /// Scale applied to the depth component of the flight direction.
    pub depth_damping: f32,
    /// Members are clamped this far inside each face of the unit cube.
    pub margin: f32,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            zone: ProximityZone::default(),
            cooldown: 0.5,
            batch_size: 12,
            policy: OverlapPolicy::Replace,
            origin: Vec3::splat(0.5),
            duration: 1.2..1.8,
            strength: 0.38..0.5,
            radius: 0.22..0.32,
            angular_speed: -0.8..0.8,
            falloff: 18.0..18.0,
            depth_offset: -0.06,
            depth_damping: 0.6,
            margin: 0.12,
        }
    }
}

impl BurstConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::EmptyPool("burst.batch_size"));
        }
        if !(self.cooldown.is_finite() && self.cooldown >= 0.0) {
            return Err(ConfigError::Duration {
                name: "burst.cooldown",
                value: self.cooldown,
            });
        }
        for (name, range) in [
            ("burst.duration", &self.duration),
            ("burst.strength", &self.strength),
            ("burst.radius", &self.radius),
            ("burst.angular_speed", &self.angular_speed),
            ("burst.falloff", &self.falloff),
        ] {
            let width = range.end - range.start;
            if !(range.start.is_finite() && range.end.is_finite() && width.is_finite()) {
                return Err(ConfigError::NonFiniteRange {
                    name,
                    start: range.start,
                    end: range.end,
                });
            }
            if range.start > range.end {
                return Err(ConfigError::InvertedRange {
                    name,
                    start: range.start,
                    end: range.end,
                });
            }
        }
        if !(self.duration.start.is_finite() && self.duration.start > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "burst.duration",
                value: self.duration.start,
            });
        }
        Ok(())
    }

    /// Set the trigger zone.
    pub fn zone(mut self, zone: ProximityZone) -> Self {
        self.zone = zone;
        self
    }

    /// Set the minimum time between triggers.
    pub fn cooldown(mut self, seconds: f32) -> Self {
        self.cooldown = seconds;
        self
    }

    /// Set the number of members per batch.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    /// Set the overlap policy.
    pub fn policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the member lifetime range.
    pub fn duration(mut self, range: Range<f32>) -> Self {
        self.duration = range;
        self
    }
}

fn sample(rng: &mut StdRng, range: &Range<f32>) -> f32 {
    if range.start < range.end {
        rng.gen_range(range.clone())
    } else {
        range.start
    }
}

/// One member of a burst batch.
///
/// All random parameters are fixed at spawn; only time moves it.
#[derive(Clone, Debug, PartialEq)]
pub struct BurstSource {
    pub start_time: f32,
    pub duration: f32,
    pub strength: f32,
    pub falloff: f32,
    pub radius: f32,
    pub angular_speed: f32,
    pub phase_offset: f32,
    pub depth_offset: f32,
    /// Unit flight direction before orbiting.
    pub direction: Vec3,
    /// Batch this member belongs to.
    pub batch: u64,
}

impl BurstSource {
    /// Life progress `u` in `[0, 1]`.
    pub fn progress(&self, now: f32) -> f32 {
        clamp01((now - self.start_time) / self.duration)
    }

    /// Position at `now`, clamped `margin` inside the unit cube.
    pub fn position(&self, now: f32, origin: Vec3, margin: f32) -> Vec3 {
        let u = self.progress(now);
        let envelope = (PI * u).sin();
        let angle = self.phase_offset + self.angular_speed * (now - self.start_time).max(0.0);
        let (sin, cos) = angle.sin_cos();
        let d = self.direction;
        let orbit = Vec3::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos, d.z);

        let mut p = origin + orbit * (self.radius * envelope);
        p.z += self.depth_offset;
        p.clamp(Vec3::splat(margin), Vec3::splat(1.0 - margin))
    }
}

/// Spawns and ages burst batches.
#[derive(Debug)]
pub struct BurstSpawner {
    config: BurstConfig,
    rng: StdRng,
    live: Vec<BurstSource>,
    was_close: bool,
    last_trigger: Option<f32>,
    busy: bool,
    batches: u64,
}

impl BurstSpawner {
    pub fn new(config: BurstConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rng,
            live: Vec::new(),
            was_close: false,
            last_trigger: None,
            busy: false,
            batches: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &BurstConfig {
        &self.config
    }

    /// Live members in spawn order.
    #[inline]
    pub fn live(&self) -> &[BurstSource] {
        &self.live
    }

    /// True while any member of the current batch is alive.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Total batches spawned so far.
    #[inline]
    pub fn batches_spawned(&self) -> u64 {
        self.batches
    }

    /// Expire finished members, then evaluate the trigger rule.
    ///
    /// Returns `true` when a new batch was spawned this tick.
    pub fn update(&mut self, now: f32, pointer: Option<Vec2>) -> bool {
        let before = self.live.len();
        self.live.retain(|m| m.progress(now) < 1.0);
        if before != self.live.len() {
            debug!(expired = before - self.live.len(), live = self.live.len(), "burst members expired");
        }
        if self.live.is_empty() {
            self.busy = false;
        }

        let close = self.config.zone.contains(pointer);
        let entered = close && !self.was_close;
        self.was_close = close;

        let cooled = self
            .last_trigger
            .map_or(true, |t| now - t >= self.config.cooldown);
        let blocked = self.config.policy == OverlapPolicy::SingleFlight && self.busy;

        if entered && cooled && !blocked {
            self.spawn_batch(now);
            true
        } else {
            false
        }
    }

    fn spawn_batch(&mut self, now: f32) {
        self.last_trigger = Some(now);
        self.batches += 1;
        if self.config.policy == OverlapPolicy::Replace {
            self.live.clear();
        }

        let batch = self.batches;
        for _ in 0..self.config.batch_size {
            let member = self.spawn_member(now, batch);
            self.live.push(member);
        }
        self.busy = true;
        info!(batch, members = self.config.batch_size, "burst triggered");
    }

    fn spawn_member(&mut self, now: f32, batch: u64) -> BurstSource {
        let c = &self.config;
        let raw = Vec3::new(
            self.rng.gen_range(-1.0..1.0),
            self.rng.gen_range(-1.0..1.0),
            self.rng.gen_range(-1.0..1.0) * c.depth_damping,
        );
        let direction = raw.try_normalize().unwrap_or(Vec3::X);
        BurstSource {
            start_time: now,
            duration: sample(&mut self.rng, &c.duration),
            strength: sample(&mut self.rng, &c.strength),
            falloff: sample(&mut self.rng, &c.falloff),
            radius: sample(&mut self.rng, &c.radius),
            angular_speed: sample(&mut self.rng, &c.angular_speed),
            phase_offset: self.rng.gen_range(0.0..TAU),
            depth_offset: c.depth_offset,
            direction,
            batch,
        }
    }

    /// Deposits for every live member at `now`, in spawn order.
    pub fn deposits(&self, now: f32) -> impl Iterator<Item = BallDeposit> + '_ {
        self.live.iter().map(move |m| {
            BallDeposit::new(
                m.position(now, self.config.origin, self.config.margin),
                m.strength,
                m.falloff,
            )
        })
    }

    /// Drop every live member.
    pub fn clear(&mut self) {
        self.live.clear();
        self.busy = false;
    }
}
