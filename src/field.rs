//! Field accumulator: the scalar grid that metaballs deposit into.
//!
//! The grid covers the normalized unit cube `[0, 1]³` with `resolution`
//! samples per axis. Cell `(x, y, z)` sits at `(x, y, z) / resolution`.
//!
//! # Kernel
//!
//! A ball at `b` with strength `s` and falloff `f` adds, to every cell `c`
//! within reach,
//!
//! ```text
//! |s| / (1e-6 + |c - b|²) - f        (only where positive, times sign(s))
//! ```
//!
//! Larger `f` shrinks the region where the contribution is positive, giving a
//! tighter blob. Negative strengths carve into the field. Deposits never touch
//! the outermost shell of cells, so that shell stays at zero and any surface
//! extracted with a positive iso level is closed.
//!
//! # Example
//!
//! ```ignore
//! let mut grid = FieldGrid::new(64)?;
//! grid.reset();
//! grid.deposit(Vec3::splat(0.5), 1.2, 14.0);
//! let mesh = grid.extract_surface(50.0);
//! ```

use crate::error::ConfigError;
use crate::surface::{self, Mesh};
use glam::Vec3;

/// Smallest accepted grid resolution per axis.
pub const MIN_RESOLUTION: u32 = 4;

/// Largest accepted grid resolution per axis (memory limits).
pub const MAX_RESOLUTION: u32 = 256;

/// Keeps the kernel finite at the ball center.
const KERNEL_EPSILON: f32 = 1e-6;

/// Check a resolution before allocating a grid for it.
pub fn check_resolution(resolution: u32) -> Result<(), ConfigError> {
    if (MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution) {
        Ok(())
    } else {
        Err(ConfigError::Resolution {
            got: resolution,
            min: MIN_RESOLUTION,
            max: MAX_RESOLUTION,
        })
    }
}

/// One ball to be deposited into the field this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BallDeposit {
    /// Center in normalized field space.
    pub position: Vec3,
    /// Peak scale of the contribution. Negative values subtract.
    pub strength: f32,
    /// Constant subtracted from the kernel; higher means tighter.
    pub falloff: f32,
}

impl BallDeposit {
    pub fn new(position: Vec3, strength: f32, falloff: f32) -> Self {
        Self {
            position,
            strength,
            falloff,
        }
    }
}

/// Dense 3D scalar grid over the unit cube.
#[derive(Clone, Debug)]
pub struct FieldGrid {
    resolution: u32,
    values: Vec<f32>,
}

impl FieldGrid {
    /// Allocate a zeroed grid with `resolution` samples per axis.
    pub fn new(resolution: u32) -> Result<Self, ConfigError> {
        check_resolution(resolution)?;
        Ok(Self {
            resolution,
            values: vec![0.0; Self::cell_count(resolution)],
        })
    }

    fn cell_count(resolution: u32) -> usize {
        let r = resolution as usize;
        r * r * r
    }

    /// Samples per axis.
    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Raw values, x fastest, then y, then z.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Memory used by the sample buffer in bytes.
    pub fn memory_size(&self) -> usize {
        self.values.len() * std::mem::size_of::<f32>()
    }

    /// Zero every cell.
    pub fn reset(&mut self) {
        self.values.fill(0.0);
    }

    /// Reallocate at a new resolution.
    ///
    /// On error the grid is left untouched. On success the grid is zeroed.
    pub fn resize(&mut self, resolution: u32) -> Result<(), ConfigError> {
        check_resolution(resolution)?;
        self.resolution = resolution;
        self.values = vec![0.0; Self::cell_count(resolution)];
        Ok(())
    }

    /// Flat index of cell `(x, y, z)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        let r = self.resolution as usize;
        x + y * r + z * r * r
    }

    /// Value at cell `(x, y, z)`.
    #[inline]
    pub fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.index(x, y, z)]
    }

    /// Normalized position of cell `(x, y, z)`.
    #[inline]
    pub fn cell_position(&self, x: usize, y: usize, z: usize) -> Vec3 {
        Vec3::new(x as f32, y as f32, z as f32) / self.resolution as f32
    }

    /// Largest value currently in the grid.
    pub fn peak(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Field gradient at a cell by central differences (one-sided at the edges).
    pub fn gradient(&self, x: usize, y: usize, z: usize) -> Vec3 {
        let last = self.resolution as usize - 1;
        let axis = |lo: usize, hi: usize, a: f32, b: f32| -> f32 {
            if hi > lo {
                (b - a) / (hi - lo) as f32
            } else {
                0.0
            }
        };
        let (x0, x1) = (x.saturating_sub(1), (x + 1).min(last));
        let (y0, y1) = (y.saturating_sub(1), (y + 1).min(last));
        let (z0, z1) = (z.saturating_sub(1), (z + 1).min(last));
        Vec3::new(
            axis(x0, x1, self.value(x0, y, z), self.value(x1, y, z)),
            axis(y0, y1, self.value(x, y0, z), self.value(x, y1, z)),
            axis(z0, z1, self.value(x, y, z0), self.value(x, y, z1)),
        )
    }

    /// Add one ball's contribution. Accumulates, never overwrites.
    pub fn deposit(&mut self, position: Vec3, strength: f32, falloff: f32) {
        if !position.is_finite() || !strength.is_finite() || !falloff.is_finite() {
            return;
        }
        if strength == 0.0 {
            return;
        }

        let size = self.resolution as f32;
        let sign = strength.signum();
        let magnitude = strength.abs();
        // Beyond this many cells the kernel is below zero and contributes nothing.
        let reach = if falloff > 0.0 {
            size * (magnitude / falloff).sqrt()
        } else {
            size
        };

        let upper = self.resolution as i64 - 1;
        let span = |center: f32| -> (usize, usize) {
            let lo = ((center * size - reach).floor() as i64).max(1);
            let hi = ((center * size + reach).floor() as i64).min(upper);
            (lo as usize, hi.max(lo) as usize)
        };
        let (x0, x1) = span(position.x);
        let (y0, y1) = span(position.y);
        let (z0, z1) = span(position.z);

        let r = self.resolution as usize;
        for z in z0..z1 {
            let fz = z as f32 / size - position.z;
            let fz2 = fz * fz;
            for y in y0..y1 {
                let fy = y as f32 / size - position.y;
                let fyz2 = fy * fy + fz2;
                let row = y * r + z * r * r;
                for x in x0..x1 {
                    let fx = x as f32 / size - position.x;
                    let val = magnitude / (KERNEL_EPSILON + fx * fx + fyz2) - falloff;
                    if val > 0.0 {
                        self.values[row + x] += val * sign;
                    }
                }
            }
        }
    }

    /// Deposit a prepared ball.
    #[inline]
    pub fn deposit_ball(&mut self, ball: &BallDeposit) {
        self.deposit(ball.position, ball.strength, ball.falloff);
    }

    /// Triangulate the surface where the field equals `iso_level`.
    ///
    /// Deterministic for a given field and level. Cells strictly above the
    /// level are inside.
    pub fn extract_surface(&self, iso_level: f32) -> Mesh {
        surface::extract(self, iso_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_resolution() {
        assert!(matches!(
            FieldGrid::new(0),
            Err(ConfigError::Resolution { got: 0, .. })
        ));
        assert!(FieldGrid::new(MAX_RESOLUTION + 1).is_err());
        assert!(FieldGrid::new(MIN_RESOLUTION).is_ok());
    }

    #[test]
    fn test_failed_resize_keeps_grid() {
        let mut grid = FieldGrid::new(16).unwrap();
        grid.deposit(Vec3::splat(0.5), 1.0, 10.0);
        let before = grid.values().to_vec();

        assert!(grid.resize(0).is_err());
        assert_eq!(grid.resolution(), 16);
        assert_eq!(grid.values(), &before[..]);

        grid.resize(24).unwrap();
        assert_eq!(grid.values().len(), 24 * 24 * 24);
        assert_eq!(grid.peak(), 0.0);
    }

    #[test]
    fn test_deposit_is_additive() {
        let mut once = FieldGrid::new(20).unwrap();
        once.deposit(Vec3::splat(0.5), 0.5, 10.0);

        let mut twice = FieldGrid::new(20).unwrap();
        twice.deposit(Vec3::splat(0.5), 0.5, 10.0);
        twice.deposit(Vec3::splat(0.5), 0.5, 10.0);

        for (a, b) in once.values().iter().zip(twice.values()) {
            assert!((a * 2.0 - b).abs() <= 1e-3 * b.abs().max(1.0));
        }
    }

    #[test]
    fn test_kernel_decreases_with_distance() {
        let mut grid = FieldGrid::new(32).unwrap();
        grid.deposit(Vec3::splat(0.5), 1.0, 5.0);
        let mid = 16;
        let mut previous = grid.value(mid, mid, mid);
        for x in mid + 1..mid + 6 {
            let v = grid.value(x, mid, mid);
            assert!(v <= previous, "value rose at x={x}");
            previous = v;
        }
    }

    #[test]
    fn test_higher_falloff_is_tighter() {
        let count_positive = |falloff: f32| {
            let mut grid = FieldGrid::new(32).unwrap();
            grid.deposit(Vec3::splat(0.5), 1.0, falloff);
            grid.values().iter().filter(|v| **v > 0.0).count()
        };
        assert!(count_positive(20.0) < count_positive(5.0));
    }

    #[test]
    fn test_shell_stays_zero() {
        let mut grid = FieldGrid::new(12).unwrap();
        grid.deposit(Vec3::splat(0.5), 50.0, 0.5);
        let last = 11;
        for a in 0..12 {
            for b in 0..12 {
                assert_eq!(grid.value(0, a, b), 0.0);
                assert_eq!(grid.value(last, a, b), 0.0);
                assert_eq!(grid.value(a, 0, b), 0.0);
                assert_eq!(grid.value(a, b, last), 0.0);
            }
        }
    }

    #[test]
    fn test_negative_strength_carves() {
        let mut grid = FieldGrid::new(20).unwrap();
        grid.deposit(Vec3::splat(0.5), 1.0, 10.0);
        let peak = grid.value(10, 10, 10);
        grid.deposit(Vec3::splat(0.5), -0.5, 10.0);
        assert!(grid.value(10, 10, 10) < peak);
    }

    #[test]
    fn test_non_finite_deposit_ignored() {
        let mut grid = FieldGrid::new(8).unwrap();
        grid.deposit(Vec3::new(f32::NAN, 0.5, 0.5), 1.0, 10.0);
        grid.deposit(Vec3::splat(0.5), f32::INFINITY, 10.0);
        assert_eq!(grid.peak(), 0.0);
    }
}
