//! Frame driver: the per-tick orchestrator.
//!
//! One call to [`FrameDriver::tick`] runs a whole frame, in this order:
//!
//! 1. sanitize `dt`, elapsed time and the [`ControlSignals`] snapshot
//! 2. advance the phase controller and its motion sources
//! 3. advance the burst spawner
//! 4. reset the field and deposit: central ball, children, pointer
//!    follower, burst members (always in that order)
//! 5. extract the surface and hand it to the backend
//! 6. refresh the reflection probe when the cadence says so
//!
//! The driver owns all simulation state; nothing is shared, so nothing is
//! locked. [`FrameDriver::stop`] (or dropping the driver) disposes the backend
//! once and turns later ticks into no-ops.

use crate::backend::{RenderBackend, SurfaceFrame, VolumeTransform};
use crate::burst::BurstSpawner;
use crate::config::EngineConfig;
use crate::controls::{ControlSignals, PointerScaleState};
use crate::error::{BackendError, ConfigError};
use crate::field::{BallDeposit, FieldGrid};
use crate::phase::{Phase, PhaseController, WEIGHT_EPSILON};
use crate::surface::Mesh;
use crate::time::FrameClock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// How often the reflection probe is re-captured.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeCadence {
    /// When more than this many seconds have passed since the last capture.
    EverySeconds(f32),
    /// When more than this many frames have passed since the last capture.
    EveryFrames(u32),
    /// Only the initial and post-environment-load captures.
    Never,
}

impl Default for ProbeCadence {
    fn default() -> Self {
        ProbeCadence::EverySeconds(1.2)
    }
}

impl ProbeCadence {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            ProbeCadence::EverySeconds(value) if !(value.is_finite() && value >= 0.0) => {
                Err(ConfigError::Duration {
                    name: "probe",
                    value,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Summary of one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub phase: Phase,
    pub central_weight: f32,
    pub child_weight: f32,
    /// Balls deposited this tick.
    pub deposits: usize,
    /// Live burst members after this tick's update.
    pub burst_live: usize,
    /// A burst batch was spawned this tick.
    pub burst_triggered: bool,
    pub triangles: usize,
    pub probe_refreshed: bool,
    pub transform: VolumeTransform,
}

/// Owns the simulation and drives a [`RenderBackend`].
pub struct FrameDriver<B: RenderBackend> {
    config: EngineConfig,
    grid: FieldGrid,
    phases: PhaseController,
    bursts: Option<BurstSpawner>,
    pointer_scale: PointerScaleState,
    backend: B,
    mesh: Mesh,
    deposits: Vec<BallDeposit>,
    frame: u64,
    seconds_since_probe: f32,
    frames_since_probe: u32,
    recapture_pending: bool,
    running: bool,
}

impl<B: RenderBackend> FrameDriver<B> {
    /// Validate `config`, allocate the field and take the first probe capture.
    pub fn new(config: EngineConfig, backend: B) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let grid = FieldGrid::new(config.resolution)?;
        let phases = PhaseController::new(config.motion.clone(), config.phases, &mut rng);
        let bursts = match &config.burst {
            Some(burst) => Some(BurstSpawner::new(
                burst.clone(),
                StdRng::seed_from_u64(rng.gen()),
            )?),
            None => None,
        };

        info!(
            resolution = config.resolution,
            sources = config.motion.source_count,
            bursts = bursts.is_some(),
            "metaball engine started"
        );

        let mut driver = Self {
            config,
            grid,
            phases,
            bursts,
            pointer_scale: PointerScaleState::default(),
            backend,
            mesh: Mesh::default(),
            deposits: Vec::new(),
            frame: 0,
            seconds_since_probe: 0.0,
            frames_since_probe: 0,
            recapture_pending: false,
            running: true,
        };
        driver.refresh_probe();
        Ok(driver)
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn grid(&self) -> &FieldGrid {
        &self.grid
    }

    /// Mesh extracted by the last tick.
    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[inline]
    pub fn phases(&self) -> &PhaseController {
        &self.phases
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phases.phase()
    }

    #[inline]
    pub fn bursts(&self) -> Option<&BurstSpawner> {
        self.bursts.as_ref()
    }

    /// Balls deposited by the last tick, in deposit order.
    #[inline]
    pub fn deposits(&self) -> &[BallDeposit] {
        &self.deposits
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks completed.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Run one tick from a frame clock.
    pub fn frame(&mut self, clock: &mut FrameClock, signals: ControlSignals) -> Option<FrameReport> {
        let (elapsed, dt) = clock.update();
        self.tick(dt, elapsed, signals)
    }

    /// Run one tick. Returns `None` once the driver has been stopped.
    pub fn tick(&mut self, dt: f32, elapsed: f32, signals: ControlSignals) -> Option<FrameReport> {
        if !self.running {
            return None;
        }

        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let elapsed = if elapsed.is_finite() { elapsed } else { 0.0 };
        let signals = signals.sanitized();

        self.phases.tick(dt, elapsed, signals.enabled);

        let burst_triggered = match self.bursts.as_mut() {
            Some(spawner) => spawner.update(elapsed, signals.pointer),
            None => false,
        };

        let pointer_factor = match &self.config.pointer.scale {
            Some(scale) => self.pointer_scale.update(scale, signals.pointer, dt),
            None => 1.0,
        };
        let transform = VolumeTransform {
            scale: self.config.base_scale * signals.scale * pointer_factor,
            rotation: self.config.rotation.at(elapsed),
        };

        let (central_weight, child_weight) = self.collect_deposits(elapsed, &signals);

        self.grid.reset();
        for ball in &self.deposits {
            self.grid.deposit_ball(ball);
        }
        self.mesh = self.grid.extract_surface(self.config.iso_level);

        self.frame += 1;
        self.backend.present(SurfaceFrame {
            frame: self.frame,
            mesh: &self.mesh,
            transform,
        });

        let probe_refreshed = self.advance_probe(dt);

        let report = FrameReport {
            frame: self.frame,
            phase: self.phases.phase(),
            central_weight,
            child_weight,
            deposits: self.deposits.len(),
            burst_live: self.bursts.as_ref().map_or(0, |b| b.live().len()),
            burst_triggered,
            triangles: self.mesh.triangle_count(),
            probe_refreshed,
            transform,
        };
        trace!(?report, "frame");
        Some(report)
    }

    /// Fill `self.deposits` for this tick. Returns the central and child weights.
    fn collect_deposits(&mut self, elapsed: f32, signals: &ControlSignals) -> (f32, f32) {
        self.deposits.clear();
        let motion = self.phases.motion();

        let central_weight = self.phases.central_weight();
        let central = self.config.central_ball;
        let central_strength = central.strength * central_weight;
        if central_strength > WEIGHT_EPSILON {
            self.deposits.push(BallDeposit::new(
                motion.center3(),
                central_strength,
                central.falloff,
            ));
        }

        let child_weight = self.phases.child_weight(elapsed);
        if child_weight > WEIGHT_EPSILON {
            for source in self.phases.sources() {
                let strength = source.strength * child_weight;
                if strength > WEIGHT_EPSILON {
                    self.deposits.push(BallDeposit::new(
                        source.position3(),
                        strength,
                        source.falloff,
                    ));
                }
            }
        }

        if let Some(follower) = &self.config.pointer.follower {
            if let Some(ball) = follower.deposit(signals.pointer, motion.center) {
                self.deposits.push(ball);
            }
        }

        if let Some(spawner) = &self.bursts {
            self.deposits.extend(spawner.deposits(elapsed));
        }

        (central_weight, child_weight)
    }

    fn advance_probe(&mut self, dt: f32) -> bool {
        self.seconds_since_probe += dt;
        self.frames_since_probe = self.frames_since_probe.saturating_add(1);

        let due = match self.config.probe {
            ProbeCadence::EverySeconds(period) => self.seconds_since_probe > period,
            ProbeCadence::EveryFrames(period) => self.frames_since_probe > period,
            ProbeCadence::Never => false,
        };
        if due || self.recapture_pending {
            self.recapture_pending = false;
            self.refresh_probe();
            true
        } else {
            false
        }
    }

    /// Ask the backend for a new probe capture and restart the cadence.
    ///
    /// A failed capture is logged and the previous probe keeps being used.
    pub fn refresh_probe(&mut self) {
        self.seconds_since_probe = 0.0;
        self.frames_since_probe = 0;
        if let Err(err) = self.backend.refresh_reflection_probe() {
            warn!(error = %err, "keeping previous reflection probe");
        }
    }

    /// Report the outcome of an asynchronous environment load.
    ///
    /// Success schedules a probe re-capture on the next tick. Failure is
    /// logged and the simulation carries on with its current reflections.
    pub fn environment_loaded(&mut self, result: Result<(), BackendError>) {
        match result {
            Ok(()) => {
                debug!("environment ready, re-capturing probe next tick");
                self.recapture_pending = true;
            }
            Err(err) => warn!(error = %err, "environment unavailable"),
        }
    }

    /// Change the grid resolution.
    ///
    /// Invalid values are rejected and the current grid is kept.
    pub fn set_resolution(&mut self, resolution: u32) -> Result<(), ConfigError> {
        self.grid.resize(resolution)?;
        self.config.resolution = resolution;
        self.mesh.clear();
        info!(resolution, "field resized");
        Ok(())
    }

    /// Stop ticking and dispose the backend. Later calls do nothing.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.backend.dispose();
        self.mesh.clear();
        self.deposits.clear();
        if let Some(spawner) = self.bursts.as_mut() {
            spawner.clear();
        }
        info!(frames = self.frame, "metaball engine stopped");
    }
}

impl<B: RenderBackend> Drop for FrameDriver<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
