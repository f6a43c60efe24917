//! External control signals and the pointer-driven extras.
//!
//! The host hands the frame driver a [`ControlSignals`] value every tick
//! (scroll-driven scale, normalized pointer position, enable flag). The driver
//! sanitizes it once and uses that snapshot for the whole tick.
//!
//! Two optional pointer features ride on the same snapshot:
//!
//! - [`PointerFollower`]: an extra ball that trails the pointer, thinning out
//!   as it moves away from the center.
//! - [`PointerScale`]: the whole volume shrinks while the pointer sits in a
//!   proximity zone.

use crate::burst::ProximityZone;
use crate::easing::{lerp, smoothing};
use crate::error::ConfigError;
use crate::field::BallDeposit;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Floor applied to the external scale signal.
pub const MIN_SCALE: f32 = 0.1;

/// Per-tick inputs from the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlSignals {
    /// Scroll or timeline driven volume scale (1 = nominal).
    pub scale: f32,
    /// Pointer in `[0, 1]²`, `None` when no pointer is tracked.
    pub pointer: Option<Vec2>,
    /// When false, motion relaxes to the center whatever the phase.
    pub enabled: bool,
}

impl Default for ControlSignals {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pointer: None,
            enabled: true,
        }
    }
}

impl ControlSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_pointer(mut self, pointer: Vec2) -> Self {
        self.pointer = Some(pointer);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Clamp everything into safe ranges.
    ///
    /// Scale is floored at [`MIN_SCALE`] (NaN and infinities included). A
    /// pointer with non-finite components is dropped; finite ones are clamped
    /// to the unit square.
    pub fn sanitized(self) -> Self {
        let scale = if self.scale.is_finite() {
            self.scale.max(MIN_SCALE)
        } else {
            MIN_SCALE
        };
        let pointer = self
            .pointer
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(Vec2::ZERO, Vec2::ONE));
        Self {
            scale,
            pointer,
            enabled: self.enabled,
        }
    }

    /// Pointer position, or `center` when absent.
    pub fn pointer_or(&self, center: Vec2) -> Vec2 {
        self.pointer.unwrap_or(center)
    }
}

/// Ball that follows the pointer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerFollower {
    /// Furthest the ball may stray from the center.
    pub max_radius: f32,
    pub depth: f32,
    /// Strength at the center and at `max_radius`.
    pub strength_near: f32,
    pub strength_far: f32,
    /// Falloff at the center and at `max_radius`.
    pub falloff_near: f32,
    pub falloff_far: f32,
}

impl Default for PointerFollower {
    fn default() -> Self {
        Self {
            max_radius: 0.3,
            depth: 0.5,
            strength_near: 0.55,
            strength_far: 0.2,
            falloff_near: 14.0,
            falloff_far: 24.0,
        }
    }
}

impl PointerFollower {
    /// Ball for the current pointer, or `None` without a pointer.
    pub fn deposit(&self, pointer: Option<Vec2>, center: Vec2) -> Option<BallDeposit> {
        let pointer = pointer?;
        let offset = (pointer - center).clamp_length_max(self.max_radius);
        let t = if self.max_radius > 0.0 {
            offset.length() / self.max_radius
        } else {
            0.0
        };
        Some(BallDeposit::new(
            (center + offset).extend(self.depth),
            lerp(self.strength_near, self.strength_far, t),
            lerp(self.falloff_near, self.falloff_far, t),
        ))
    }
}

/// Shrinks the volume while the pointer is inside `zone`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerScale {
    pub zone: ProximityZone,
    /// Scale factor while close.
    pub close_factor: f32,
    /// Approach rate toward the target factor (per second).
    pub rate: f32,
}

impl Default for PointerScale {
    fn default() -> Self {
        Self {
            zone: ProximityZone::default(),
            close_factor: 0.6,
            rate: 7.67,
        }
    }
}

/// Smoothed pointer scale factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerScaleState {
    current: f32,
}

impl Default for PointerScaleState {
    fn default() -> Self {
        Self { current: 1.0 }
    }
}

impl PointerScaleState {
    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Move toward the target factor for this tick and return it.
    pub fn update(&mut self, config: &PointerScale, pointer: Option<Vec2>, dt: f32) -> f32 {
        let target = if config.zone.contains(pointer) {
            config.close_factor
        } else {
            1.0
        };
        self.current = lerp(self.current, target, smoothing(config.rate, dt));
        self.current
    }
}

/// Pointer-driven features, both off by default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    pub follower: Option<PointerFollower>,
    pub scale: Option<PointerScale>,
}

impl PointerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(scale) = &self.scale {
            for (name, value) in [
                ("pointer.scale.close_factor", scale.close_factor),
                ("pointer.scale.rate", scale.rate),
            ] {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ConfigError::NonPositive { name, value });
                }
            }
        }
        if let Some(follower) = &self.follower {
            if !(follower.max_radius.is_finite() && follower.max_radius >= 0.0) {
                return Err(ConfigError::NonPositive {
                    name: "pointer.follower.max_radius",
                    value: follower.max_radius,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_scale_floor() {
        for bad in [f32::NAN, 0.0, -3.0, f32::INFINITY, f32::NEG_INFINITY, 0.01] {
            let s = ControlSignals::new().with_scale(bad).sanitized();
            assert_eq!(s.scale, MIN_SCALE);
        }
        assert_eq!(ControlSignals::new().with_scale(2.5).sanitized().scale, 2.5);
    }

    #[test]
    fn test_pointer_sanitized() {
        let s = ControlSignals::new()
            .with_pointer(Vec2::new(f32::NAN, 0.3))
            .sanitized();
        assert_eq!(s.pointer, None);
        assert_eq!(s.pointer_or(Vec2::splat(0.5)), Vec2::splat(0.5));

        let s = ControlSignals::new()
            .with_pointer(Vec2::new(1.5, -0.2))
            .sanitized();
        assert_eq!(s.pointer, Some(Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn test_follower_thins_with_distance() {
        let f = PointerFollower::default();
        let center = Vec2::splat(0.5);
        assert!(f.deposit(None, center).is_none());

        let near = f.deposit(Some(center), center).unwrap();
        assert_eq!(near.position, Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(near.strength, 0.55);
        assert_eq!(near.falloff, 14.0);

        let far = f.deposit(Some(Vec2::new(1.0, 0.5)), center).unwrap();
        assert!((far.position.x - 0.8).abs() < 1e-6);
        assert!((far.strength - 0.2).abs() < 1e-6);
        assert!((far.falloff - 24.0).abs() < 1e-5);
    }

    #[test]
    fn test_pointer_scale_approaches_target() {
        let config = PointerScale::default();
        let mut state = PointerScaleState::default();
        let inside = Some(Vec2::new(0.5, 0.9));
        for _ in 0..120 {
            state.update(&config, inside, 1.0 / 60.0);
        }
        assert!((state.current() - 0.6).abs() < 1e-3);
        for _ in 0..120 {
            state.update(&config, None, 1.0 / 60.0);
        }
        assert!((state.current() - 1.0).abs() < 1e-3);
    }
}
