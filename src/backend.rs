//! Seam to the rendering backend.
//!
//! The simulation never draws anything itself. Each tick it hands a
//! [`SurfaceFrame`] to a [`RenderBackend`], asks it to re-capture the
//! reflection probe on a cadence, and disposes it on teardown. Shading,
//! tone mapping, materials and camera projection all live behind this trait.

use crate::error::BackendError;
use crate::surface::Mesh;
use glam::Vec2;

/// Placement of the unit-cube volume in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeTransform {
    /// Uniform world scale of the cube.
    pub scale: f32,
    /// Rotation about the x and y axes in radians.
    pub rotation: Vec2,
}

impl Default for VolumeTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: Vec2::ZERO,
        }
    }
}

/// Everything the backend needs to draw one frame.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceFrame<'a> {
    pub frame: u64,
    pub mesh: &'a Mesh,
    pub transform: VolumeTransform,
}

/// A rendering backend the frame driver drives.
pub trait RenderBackend {
    /// Upload and draw the freshly extracted surface.
    fn present(&mut self, frame: SurfaceFrame<'_>);

    /// Re-capture the environment reflection probe.
    ///
    /// Failures are logged by the driver; the previous probe stays in use.
    fn refresh_reflection_probe(&mut self) -> Result<(), BackendError>;

    /// Release every backend resource. Called exactly once.
    fn dispose(&mut self);
}

/// Backend that draws nothing and keeps counters.
///
/// Used by the headless runner and handy in tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadlessBackend {
    pub frames_presented: u64,
    pub last_triangle_count: usize,
    pub peak_triangle_count: usize,
    pub last_transform: VolumeTransform,
    pub probe_refreshes: u64,
    pub disposed: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for HeadlessBackend {
    fn present(&mut self, frame: SurfaceFrame<'_>) {
        self.frames_presented += 1;
        self.last_triangle_count = frame.mesh.triangle_count();
        self.peak_triangle_count = self.peak_triangle_count.max(self.last_triangle_count);
        self.last_transform = frame.transform;
    }

    fn refresh_reflection_probe(&mut self) -> Result<(), BackendError> {
        self.probe_refreshes += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
