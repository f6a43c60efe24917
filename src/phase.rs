//! Phase controller: the single → split → roam → merge choreography.
//!
//! The controller owns the motion source pool, advances the phase timer,
//! switches phases on timeout and reports how strongly the central ball and
//! the children should be deposited.
//!
//! | Phase  | Central weight          | Child weight              |
//! |--------|-------------------------|---------------------------|
//! | single | 1                       | 0                         |
//! | split  | 1 - ease_in_out(p)      | ease_in_out(p)            |
//! | roam   | 0                       | 1                         |
//! | merge  | ease_out(p)             | 1 - ease_out(p)           |
//!
//! Child weights are further multiplied by a slow breathing pulse.

use crate::easing::{ease_in_out, ease_out};
use crate::error::ConfigError;
use crate::motion::{MotionConfig, MotionSource};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Weights below this skip the deposit entirely.
pub const WEIGHT_EPSILON: f32 = 1e-3;

/// One state of the choreography.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Everything collapsed into the central ball.
    #[default]
    Single,
    /// Children peel away toward the ring.
    Split,
    /// Children wander along Lissajous paths.
    Roam,
    /// Children drift home and the central ball returns.
    Merge,
}

impl Phase {
    /// The phase that follows this one.
    pub fn next(self) -> Self {
        match self {
            Phase::Single => Phase::Split,
            Phase::Split => Phase::Roam,
            Phase::Roam => Phase::Merge,
            Phase::Merge => Phase::Single,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Single => "single",
            Phase::Split => "split",
            Phase::Roam => "roam",
            Phase::Merge => "merge",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Seconds spent in each phase.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseDurations {
    pub single: f32,
    pub split: f32,
    pub roam: f32,
    pub merge: f32,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            single: 1.8,
            split: 1.6,
            roam: 6.5,
            merge: 2.0,
        }
    }
}

impl PhaseDurations {
    pub fn get(&self, phase: Phase) -> f32 {
        match phase {
            Phase::Single => self.single,
            Phase::Split => self.split,
            Phase::Roam => self.roam,
            Phase::Merge => self.merge,
        }
    }

    /// Length of one full cycle.
    pub fn cycle(&self) -> f32 {
        self.single + self.split + self.roam + self.merge
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("phases.single", self.single),
            ("phases.split", self.split),
            ("phases.roam", self.roam),
            ("phases.merge", self.merge),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Duration { name, value });
            }
        }
        Ok(())
    }
}

/// A phase change reported by [`PhaseController::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
}

/// Finite state machine over [`Phase`], owning the motion sources.
#[derive(Clone, Debug)]
pub struct PhaseController {
    phase: Phase,
    elapsed_in_phase: f32,
    durations: PhaseDurations,
    motion: MotionConfig,
    sources: Vec<MotionSource>,
    splits: u32,
}

impl PhaseController {
    /// Start in `single` with all sources collapsed at the center.
    ///
    /// Per-source seeds are drawn from `rng`.
    pub fn new(motion: MotionConfig, durations: PhaseDurations, rng: &mut impl Rng) -> Self {
        let sources = (0..motion.source_count)
            .map(|i| MotionSource::new(i, &motion, rng.gen_range(0.0..1000.0)))
            .collect();
        Self {
            phase: Phase::Single,
            elapsed_in_phase: 0.0,
            durations,
            motion,
            sources,
            splits: 0,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn elapsed_in_phase(&self) -> f32 {
        self.elapsed_in_phase
    }

    #[inline]
    pub fn sources(&self) -> &[MotionSource] {
        &self.sources
    }

    #[inline]
    pub fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    #[inline]
    pub fn durations(&self) -> &PhaseDurations {
        &self.durations
    }

    /// Fraction of the current phase completed, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        let duration = self.durations.get(self.phase);
        if duration <= 0.0 {
            1.0
        } else {
            (self.elapsed_in_phase / duration).clamp(0.0, 1.0)
        }
    }

    /// Advance by `dt` seconds.
    ///
    /// With `enabled == false` the phase clock is frozen and every source
    /// relaxes toward the center whatever the phase. Otherwise the timer
    /// advances, at most one transition happens, and sources move according
    /// to the (possibly new) phase.
    pub fn tick(&mut self, dt: f32, elapsed_total: f32, enabled: bool) -> Option<PhaseTransition> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if !enabled {
            for source in &mut self.sources {
                source.relax(self.motion.merge_rate, dt, &self.motion);
            }
            return None;
        }

        self.elapsed_in_phase += dt;
        let mut transition = None;
        if self.elapsed_in_phase >= self.durations.get(self.phase) {
            let from = self.phase;
            self.phase = from.next();
            self.elapsed_in_phase = 0.0;
            self.enter_phase();
            debug!(%from, to = %self.phase, "phase transition");
            transition = Some(PhaseTransition {
                from,
                to: self.phase,
            });
        }

        match self.phase {
            Phase::Single => self.snap_all(),
            Phase::Split => {
                let t = ease_in_out(self.progress());
                for source in &mut self.sources {
                    source.split(t, &self.motion);
                }
            }
            Phase::Roam => {
                for source in &mut self.sources {
                    source.roam(elapsed_total, dt, &self.motion);
                }
            }
            Phase::Merge => {
                for source in &mut self.sources {
                    source.relax(self.motion.merge_rate, dt, &self.motion);
                }
            }
        }

        transition
    }

    fn enter_phase(&mut self) {
        match self.phase {
            Phase::Single => self.snap_all(),
            Phase::Split => {
                let spin = self.motion.split_ring_spin * self.splits as f32;
                for (i, source) in self.sources.iter_mut().enumerate() {
                    source.rehome(self.motion.ring_angle(i) + spin, &self.motion);
                }
                self.splits = self.splits.wrapping_add(1);
            }
            Phase::Roam | Phase::Merge => {}
        }
    }

    fn snap_all(&mut self) {
        for source in &mut self.sources {
            source.snap_to_center(&self.motion);
        }
    }

    /// Visibility of the central ball.
    pub fn central_weight(&self) -> f32 {
        let p = self.progress();
        match self.phase {
            Phase::Single => 1.0,
            Phase::Split => 1.0 - ease_in_out(p),
            Phase::Roam => 0.0,
            Phase::Merge => ease_out(p),
        }
    }

    /// Visibility of the children, without the breathing pulse.
    pub fn child_fade(&self) -> f32 {
        let p = self.progress();
        match self.phase {
            Phase::Single => 0.0,
            Phase::Split => ease_in_out(p),
            Phase::Roam => 1.0,
            Phase::Merge => 1.0 - ease_out(p),
        }
    }

    /// Visibility of the children, including the breathing pulse.
    pub fn child_weight(&self, elapsed_total: f32) -> f32 {
        let breath = 1.0 + (elapsed_total * self.motion.breath_speed).sin() * self.motion.breath_amplitude;
        self.child_fade() * breath
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn controller() -> PhaseController {
        let mut rng = StdRng::seed_from_u64(7);
        PhaseController::new(MotionConfig::default(), PhaseDurations::default(), &mut rng)
    }

    #[test]
    fn test_phase_cycle_order() {
        let mut pc = controller();
        let mut seen = vec![pc.phase()];
        let dt = 1.0 / 60.0;
        let mut t = 0.0;
        while seen.len() < 9 {
            t += dt;
            if let Some(tr) = pc.tick(dt, t, true) {
                assert_eq!(tr.from, *seen.last().unwrap());
                assert_eq!(tr.to, tr.from.next());
                seen.push(tr.to);
            }
        }
        use Phase::*;
        assert_eq!(seen, vec![Single, Split, Roam, Merge, Single, Split, Roam, Merge, Single]);
    }

    #[test]
    fn test_transition_resets_timer() {
        let mut pc = controller();
        let tr = pc.tick(2.0, 2.0, true);
        assert_eq!(
            tr,
            Some(PhaseTransition {
                from: Phase::Single,
                to: Phase::Split
            })
        );
        assert_eq!(pc.elapsed_in_phase(), 0.0);

        // Only one transition per tick, even for a huge step.
        pc.tick(100.0, 102.0, true);
        assert_eq!(pc.phase(), Phase::Roam);
    }

    #[test]
    fn test_merge_to_single_snaps_exactly() {
        let mut pc = controller();
        let d = *pc.durations();
        let mut t = 0.0;
        for step in [d.single, d.split, d.roam * 0.5, d.roam * 0.5, 0.3] {
            t += step;
            pc.tick(step, t, true);
        }
        assert_eq!(pc.phase(), Phase::Merge);
        assert!(pc.sources().iter().any(|s| s.position != pc.motion().center));

        pc.tick(d.merge, t + d.merge, true);
        assert_eq!(pc.phase(), Phase::Single);
        for s in pc.sources() {
            assert_eq!(s.position, pc.motion().center);
            assert_eq!(s.depth, pc.motion().depth_center);
        }
    }

    #[test]
    fn test_weights_per_phase() {
        let mut pc = controller();
        assert_eq!(pc.central_weight(), 1.0);
        assert_eq!(pc.child_fade(), 0.0);

        pc.tick(1.8, 1.8, true); // -> split, progress 0
        assert_eq!(pc.central_weight(), 1.0);
        pc.tick(0.8, 2.6, true); // halfway
        assert!((pc.central_weight() - 0.5).abs() < 1e-5);
        assert!((pc.child_fade() - 0.5).abs() < 1e-5);

        pc.tick(0.8, 3.4, true); // -> roam
        assert_eq!(pc.central_weight(), 0.0);
        assert_eq!(pc.child_fade(), 1.0);

        pc.tick(6.5, 9.9, true); // -> merge
        pc.tick(1.0, 10.9, true);
        assert!((pc.central_weight() - 0.75).abs() < 1e-5);
        assert!((pc.child_fade() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_weight_envelope_never_vanishes() {
        let mut pc = controller();
        let dt = 1.0 / 60.0;
        let mut t = 0.0;
        for _ in 0..(pc.durations().cycle() * 2.0 / dt) as usize {
            t += dt;
            pc.tick(dt, t, true);
            let sum = pc.central_weight() + pc.child_fade();
            assert!((sum - 1.0).abs() < 1e-4, "sum {sum} in {}", pc.phase());
        }
    }

    #[test]
    fn test_breath_bounds() {
        let pc = controller();
        let mut roam = pc.clone();
        roam.phase = Phase::Roam;
        for i in 0..100 {
            let w = roam.child_weight(i as f32 * 0.1);
            assert!((0.95..=1.05).contains(&w));
        }
    }

    #[test]
    fn test_disabled_relaxes_and_freezes_clock() {
        let mut pc = controller();
        pc.tick(1.8, 1.8, true);
        pc.tick(1.6, 3.4, true);
        assert_eq!(pc.phase(), Phase::Roam);
        let frozen = pc.elapsed_in_phase();

        for i in 0..600 {
            pc.tick(1.0 / 30.0, 3.4 + i as f32 / 30.0, false);
        }
        assert_eq!(pc.phase(), Phase::Roam);
        assert_eq!(pc.elapsed_in_phase(), frozen);
        for s in pc.sources() {
            assert!(s.distance_from_center(pc.motion()) < 1e-3);
        }
    }

    #[test]
    fn test_second_split_uses_rotated_ring() {
        let mut pc = controller();
        let d = *pc.durations();
        let mut t = 0.0;
        pc.tick(d.single, d.single, true);
        t += d.single;
        let first_home = pc.sources()[0].home;
        for step in [d.split, d.roam, d.merge, d.single] {
            t += step;
            pc.tick(step, t, true);
        }
        assert_eq!(pc.phase(), Phase::Split);
        let second_home = pc.sources()[0].home;
        assert!(first_home.distance(second_home) > 1e-3);
        assert!(
            (second_home.distance(pc.motion().center) - pc.motion().ring_radius).abs() < 1e-5
        );
    }

    #[test]
    fn test_negative_dt_is_ignored() {
        let mut pc = controller();
        pc.tick(-5.0, 0.0, true);
        assert_eq!(pc.elapsed_in_phase(), 0.0);
        pc.tick(f32::NAN, 0.0, true);
        assert_eq!(pc.elapsed_in_phase(), 0.0);
    }
}
