//! Integration tests for the frame driver.
//!
//! These run the whole engine against a recording backend and check the
//! behaviour a host relies on: phase order, relaxation, burst gating, probe
//! cadence and teardown.

use metaglob::prelude::*;
use metaglob::FieldGrid;
use std::cell::RefCell;
use std::rc::Rc;

// ============================================================================
// Recording backend
// ============================================================================

#[derive(Debug, Default)]
struct Log {
    presented: Vec<(u64, usize, f32)>,
    probes: u32,
    disposals: u32,
}

struct RecordingBackend {
    log: Rc<RefCell<Log>>,
    fail_probe: bool,
}

impl RecordingBackend {
    fn new() -> (Self, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        (
            Self {
                log: Rc::clone(&log),
                fail_probe: false,
            },
            log,
        )
    }

    fn failing() -> (Self, Rc<RefCell<Log>>) {
        let (mut backend, log) = Self::new();
        backend.fail_probe = true;
        (backend, log)
    }
}

impl RenderBackend for RecordingBackend {
    fn present(&mut self, frame: SurfaceFrame<'_>) {
        self.log.borrow_mut().presented.push((
            frame.frame,
            frame.mesh.triangle_count(),
            frame.transform.scale,
        ));
    }

    fn refresh_reflection_probe(&mut self) -> Result<(), BackendError> {
        self.log.borrow_mut().probes += 1;
        if self.fail_probe {
            Err(BackendError::ProbeRefresh("no environment".into()))
        } else {
            Ok(())
        }
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposals += 1;
    }
}

fn small(config: EngineConfig) -> EngineConfig {
    config.with_resolution(20).with_seed(11)
}

const DT: f32 = 1.0 / 60.0;

// ============================================================================
// Choreography
// ============================================================================

#[test]
fn test_phase_sequence_over_two_cycles() {
    let (backend, _) = RecordingBackend::new();
    let mut driver = FrameDriver::new(small(EngineConfig::choreography()), backend).unwrap();

    let mut seen = vec![driver.phase()];
    let cycle = driver.config().phases.cycle();
    let ticks = (cycle * 2.0 / DT) as usize + 60;
    for i in 1..=ticks {
        let report = driver.tick(DT, i as f32 * DT, ControlSignals::new()).unwrap();
        if report.phase != *seen.last().unwrap() {
            seen.push(report.phase);
        }
        // Central and child weights hand over without a gap.
        assert!(
            report.central_weight + report.child_weight > 0.9,
            "weights vanished in {} at tick {i}",
            report.phase
        );
    }

    use Phase::*;
    assert_eq!(seen, vec![Single, Split, Roam, Merge, Single, Split, Roam, Merge, Single]);
}

#[test]
fn test_disabled_converges_to_center() {
    let (backend, _) = RecordingBackend::new();
    let mut driver = FrameDriver::new(small(EngineConfig::choreography()), backend).unwrap();

    driver.tick(1.8, 1.8, ControlSignals::new());
    driver.tick(1.6, 3.4, ControlSignals::new());
    driver.tick(1.0, 4.4, ControlSignals::new());
    assert_eq!(driver.phase(), Phase::Roam);

    let motion = driver.phases().motion().clone();
    let mut previous: Vec<f32> = driver
        .phases()
        .sources()
        .iter()
        .map(|s| s.distance_from_center(&motion))
        .collect();
    assert!(previous.iter().any(|&d| d > 0.01));

    let disabled = ControlSignals::new().with_enabled(false);
    for i in 0..600 {
        driver.tick(1.0 / 30.0, 4.4 + i as f32 / 30.0, disabled);
        let current: Vec<f32> = driver
            .phases()
            .sources()
            .iter()
            .map(|s| s.distance_from_center(&motion))
            .collect();
        for (now, before) in current.iter().zip(&previous) {
            assert!(now <= &(before + 1e-6), "source moved away: {before} -> {now}");
        }
        previous = current;
    }
    assert!(previous.iter().all(|&d| d < 1e-3));
    assert_eq!(driver.phase(), Phase::Roam);
}

#[test]
fn test_merge_to_single_snaps_sources() {
    let (backend, _) = RecordingBackend::new();
    let mut driver = FrameDriver::new(small(EngineConfig::choreography()), backend).unwrap();
    let d = driver.config().phases;

    let mut t = 0.0;
    for step in [d.single, d.split, d.roam, 0.5] {
        t += step;
        driver.tick(step, t, ControlSignals::new());
    }
    assert_eq!(driver.phase(), Phase::Merge);

    t += d.merge;
    let report = driver.tick(d.merge, t, ControlSignals::new()).unwrap();
    assert_eq!(report.phase, Phase::Single);
    let motion = driver.phases().motion();
    for source in driver.phases().sources() {
        assert_eq!(source.position, motion.center);
        assert_eq!(source.depth, motion.depth_center);
    }
    // Single phase deposits the central ball only.
    assert_eq!(driver.deposits().len(), 1);
    assert_eq!(driver.deposits()[0].position, motion.center3());
}

#[test]
fn test_same_seed_same_surface() {
    let run = || {
        let (backend, _) = RecordingBackend::new();
        let mut driver = FrameDriver::new(small(EngineConfig::interactive()), backend).unwrap();
        for i in 1..=400 {
            let x = 0.5 + 0.4 * (i as f32 * 0.05).sin();
            driver.tick(DT, i as f32 * DT, ControlSignals::new().with_pointer(Vec2::new(x, 0.5)));
        }
        driver.mesh().vertex_bytes().to_vec()
    };
    assert_eq!(run(), run());
}

// ============================================================================
// Field and surface
// ============================================================================

#[test]
fn test_reset_then_extract_is_empty() {
    let mut grid = FieldGrid::new(24).unwrap();
    grid.deposit(Vec3::splat(0.5), 1.0, 12.0);
    grid.reset();
    for iso in [1e-3, 1.0, 50.0, 1e6] {
        assert!(grid.extract_surface(iso).is_empty());
    }
}

#[test]
fn test_threshold_monotonicity() {
    let mut grid = FieldGrid::new(28).unwrap();
    grid.deposit(Vec3::splat(0.5), 1.2, 14.0);
    let peak = grid.peak();

    let below = grid.extract_surface(50.0);
    assert!(50.0 < peak);
    assert!(!below.is_empty());
    assert!(below.is_closed());

    assert!(grid.extract_surface(peak * 1.01).is_empty());

    // Higher levels never grow the surface.
    let tighter = grid.extract_surface(200.0);
    let (lo, hi) = below.bounds().unwrap();
    let (tlo, thi) = tighter.bounds().unwrap();
    assert!(tlo.cmpge(lo).all() && thi.cmple(hi).all());
}

// ============================================================================
// Bursts
// ============================================================================

const INSIDE: Vec2 = Vec2::new(0.5, 0.5);
const OUTSIDE: Vec2 = Vec2::new(0.9, 0.5);

#[test]
fn test_burst_entry_and_cooldown() {
    let (backend, _) = RecordingBackend::new();
    let mut driver = FrameDriver::new(small(EngineConfig::interactive()), backend).unwrap();
    let at = |p: Vec2| ControlSignals::new().with_pointer(p);

    let steps = [
        (0.0, INSIDE, true),
        (0.1, INSIDE, false), // still inside, no re-entry
        (0.2, OUTSIDE, false),
        (0.3, INSIDE, false), // re-entry inside the cooldown window
        (0.4, OUTSIDE, false),
        (0.8, INSIDE, true), // cooldown elapsed
    ];
    for (t, pointer, expected) in steps {
        let report = driver.tick(0.1, t, at(pointer)).unwrap();
        assert_eq!(report.burst_triggered, expected, "at t={t}");
    }
    assert_eq!(driver.bursts().unwrap().batches_spawned(), 2);
}

#[test]
fn test_missing_pointer_never_triggers() {
    let (backend, _) = RecordingBackend::new();
    let mut driver = FrameDriver::new(small(EngineConfig::interactive()), backend).unwrap();
    for i in 0..30 {
        let report = driver
            .tick(0.1, i as f32 * 0.1, ControlSignals::new())
            .unwrap();
        assert!(!report.burst_triggered);
    }
    let nan = ControlSignals::new().with_pointer(Vec2::new(f32::NAN, 0.5));
    assert!(!driver.tick(0.1, 3.0, nan).unwrap().burst_triggered);
}

#[test]
fn test_single_flight_busy_clears_with_last_member() {
    let burst = BurstConfig::default()
        .policy(OverlapPolicy::SingleFlight)
        .duration(1.2..1.8);
    let config = small(EngineConfig::interactive()).with_burst(burst);
    let (backend, _) = RecordingBackend::new();
    let mut driver = FrameDriver::new(config, backend).unwrap();

    let report = driver
        .tick(0.1, 0.0, ControlSignals::new().with_pointer(INSIDE))
        .unwrap();
    assert!(report.burst_triggered);
    let batch = report.burst_live;
    assert!(batch > 0);

    let mut blocked_reentry = false;
    let mut cleared_at = None;
    for i in 1..=25 {
        let t = i as f32 * 0.1;
        // Wiggle in and out of the zone while the whole batch is alive.
        let pointer = if i % 2 == 0 && t < 1.15 { INSIDE } else { OUTSIDE };
        let report = driver
            .tick(0.1, t, ControlSignals::new().with_pointer(pointer))
            .unwrap();
        let spawner = driver.bursts().unwrap();

        if cleared_at.is_none() {
            if report.burst_live > 0 {
                assert!(spawner.is_busy());
                assert!(report.burst_live <= batch);
                assert!(!report.burst_triggered);
                blocked_reentry |= pointer == INSIDE && t >= 0.5;
            } else {
                assert!(!spawner.is_busy());
                cleared_at = Some(t);
            }
        }
    }

    assert!(blocked_reentry);
    let cleared_at = cleared_at.unwrap();
    assert!((1.2..=1.9).contains(&cleared_at), "cleared at {cleared_at}");
}

// ============================================================================
// Backend interaction
// ============================================================================

#[test]
fn test_probe_failure_does_not_stop_ticks() {
    let (backend, log) = RecordingBackend::failing();
    let config = small(EngineConfig::choreography()).with_probe(ProbeCadence::EveryFrames(5));
    let mut driver = FrameDriver::new(config, backend).unwrap();

    for i in 1..=30 {
        let report = driver.tick(DT, i as f32 * DT, ControlSignals::new()).unwrap();
        assert!(report.triangles > 0);
    }
    let log = log.borrow();
    assert_eq!(log.presented.len(), 30);
    assert_eq!(log.probes, 1 + 5);
}

#[test]
fn test_environment_load_failure_is_tolerated() {
    let (backend, log) = RecordingBackend::new();
    let config = small(EngineConfig::choreography()).with_probe(ProbeCadence::Never);
    let mut driver = FrameDriver::new(config, backend).unwrap();

    driver.environment_loaded(Err(BackendError::EnvironmentLoad("404".into())));
    driver.tick(DT, DT, ControlSignals::new()).unwrap();
    assert_eq!(log.borrow().probes, 1);

    driver.environment_loaded(Ok(()));
    driver.tick(DT, 2.0 * DT, ControlSignals::new()).unwrap();
    assert_eq!(log.borrow().probes, 2);
}

#[test]
fn test_bad_resolution_keeps_previous_grid() {
    let (backend, _) = RecordingBackend::new();
    let mut driver = FrameDriver::new(small(EngineConfig::choreography()), backend).unwrap();
    driver.tick(DT, DT, ControlSignals::new());
    let triangles = driver.mesh().triangle_count();

    for bad in [0, 1, 3, 257] {
        assert!(matches!(
            driver.set_resolution(bad),
            Err(ConfigError::Resolution { .. })
        ));
        assert_eq!(driver.grid().resolution(), 20);
    }
    let report = driver.tick(DT, 2.0 * DT, ControlSignals::new()).unwrap();
    assert_eq!(report.triangles, triangles);
}

#[test]
fn test_degenerate_scale_is_floored() {
    let (backend, log) = RecordingBackend::new();
    let mut driver = FrameDriver::new(small(EngineConfig::choreography()), backend).unwrap();
    let base = driver.config().base_scale;

    for (i, scale) in [f32::NAN, -1.0, 0.0, f32::INFINITY].into_iter().enumerate() {
        let report = driver
            .tick(DT, (i + 1) as f32 * DT, ControlSignals::new().with_scale(scale))
            .unwrap();
        assert!(report.transform.scale.is_finite());
        assert!(report.transform.scale >= base * 0.1 * 0.999);
    }
    assert!(log.borrow().presented.iter().all(|&(_, _, s)| s > 0.0));
}

#[test]
fn test_stop_then_drop_disposes_once() {
    let (backend, log) = RecordingBackend::new();
    let mut driver = FrameDriver::new(small(EngineConfig::interactive()), backend).unwrap();
    driver.tick(DT, DT, ControlSignals::new());

    driver.stop();
    assert!(driver.tick(DT, 2.0 * DT, ControlSignals::new()).is_none());
    driver.stop();
    drop(driver);

    let log = log.borrow();
    assert_eq!(log.disposals, 1);
    assert_eq!(log.presented.len(), 1);
}

#[test]
fn test_drop_disposes() {
    let (backend, log) = RecordingBackend::new();
    {
        let _driver = FrameDriver::new(small(EngineConfig::choreography()), backend).unwrap();
    }
    assert_eq!(log.borrow().disposals, 1);
}
