//! Easing curves and frame-rate independent smoothing.
//!
//! Every curve clamps its progress to `[0, 1]` before shaping it, so callers
//! can pass raw `elapsed / duration` ratios that overshoot.

use std::f32::consts::PI;

/// Cosine ease-in-out: `0.5 - 0.5 * cos(PI * t)`.
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    let u = clamp01(t);
    0.5 - 0.5 * (PI * u).cos()
}

/// Quadratic ease-out: `1 - (1 - t)^2`.
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let u = clamp01(t);
    1.0 - (1.0 - u).powi(2)
}

/// Interpolation factor for exponential approach toward a target.
///
/// Returns `1 - e^(-rate * dt)`. Applying it every frame converges at the same
/// speed regardless of how the elapsed time is sliced into frames.
#[inline]
pub fn smoothing(rate: f32, dt: f32) -> f32 {
    if dt <= 0.0 || !dt.is_finite() {
        return 0.0;
    }
    1.0 - (-rate * dt).exp()
}

/// Scalar linear interpolation.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
#[inline]
pub fn clamp01(t: f32) -> f32 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}
