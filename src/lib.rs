//! # metaglob - Metaball Field Engine
//!
//! A CPU metaball simulation: a handful of soft balls are splatted into a
//! scalar grid every frame, an iso-surface is extracted from it, and the
//! resulting mesh is handed to whatever renders it.
//!
//! metaglob handles the field, the surface extraction and the choreography so
//! the host only has to feed in time and a few control signals.
//!
//! ## Quick Start
//!
//! ```ignore
//! use metaglob::prelude::*;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = EngineConfig::interactive().with_resolution(64).with_seed(7);
//!     let mut driver = FrameDriver::new(config, HeadlessBackend::new())?;
//!     let mut clock = FrameClock::fixed(1.0 / 60.0);
//!
//!     for _ in 0..600 {
//!         let signals = ControlSignals::new().with_pointer(Vec2::new(0.5, 0.9));
//!         if let Some(report) = driver.frame(&mut clock, signals) {
//!             println!("{} {} triangles", report.phase, report.triangles);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Field
//!
//! [`FieldGrid`] is an `R³` grid over the unit cube. Every ball adds
//! `strength / d² - falloff` to the cells it reaches, so overlapping balls
//! merge smoothly. The outer shell of cells is never written, which keeps
//! every extracted surface closed.
//!
//! ### Choreography
//!
//! [`PhaseController`] cycles through four phases:
//!
//! ```text
//! single ──► split ──► roam ──► merge ──┐
//!   ▲                                   │
//!   └───────────────────────────────────┘
//! ```
//!
//! A central ball fades out while [`MotionSource`] children peel away to a
//! ring, wander on Lissajous paths, then drift back as the central ball
//! returns.
//!
//! ### Bursts
//!
//! With a [`BurstConfig`], a pointer entering the proximity zone releases a
//! short-lived swarm of small balls that spiral out and fade.
//!
//! ### Backends
//!
//! Drawing happens behind [`RenderBackend`]. [`HeadlessBackend`] only keeps
//! counters and is what the `metaglob` binary runs on.

pub mod backend;
pub mod burst;
pub mod config;
pub mod controls;
pub mod driver;
pub mod easing;
pub mod error;
pub mod field;
pub mod motion;
pub mod phase;
pub mod surface;
pub mod time;

pub use backend::{HeadlessBackend, RenderBackend, SurfaceFrame, VolumeTransform};
pub use burst::{BurstConfig, BurstSource, BurstSpawner, OverlapPolicy, ProximityZone};
pub use bytemuck;
pub use config::{EngineConfig, RotationConfig};
pub use controls::{ControlSignals, PointerConfig, PointerFollower, PointerScale};
pub use driver::{FrameDriver, FrameReport, ProbeCadence};
pub use error::{BackendError, ConfigError};
pub use field::{BallDeposit, FieldGrid};
pub use glam::{Vec2, Vec3};
pub use motion::{BallParams, Lissajous, MotionConfig, MotionSource};
pub use phase::{Phase, PhaseController, PhaseDurations, PhaseTransition};
pub use surface::{Mesh, MeshVertex};
pub use time::FrameClock;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use metaglob::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backend::{HeadlessBackend, RenderBackend, SurfaceFrame, VolumeTransform};
    pub use crate::burst::{BurstConfig, OverlapPolicy, ProximityZone};
    pub use crate::config::EngineConfig;
    pub use crate::controls::ControlSignals;
    pub use crate::driver::{FrameDriver, FrameReport, ProbeCadence};
    pub use crate::error::{BackendError, ConfigError};
    pub use crate::phase::{Phase, PhaseDurations};
    pub use crate::surface::Mesh;
    pub use crate::time::FrameClock;
    pub use crate::{Vec2, Vec3};
}
