//! # Path runner
//!
//! Drives a path through the full control loop on simulated equipment. Each cycle runs, in order:
//!
//! 1. Drivetrain processing (heading update, odometry, telemetry)
//! 2. Path execution
//! 3. Scheduled actions
//! 4. Simulation step
//!
//! The runner does not own a clock or pace itself, the executables decide how time passes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use log::{info, warn};
use serde::Serialize;

use util::{
    archive::{ArchiveError, Archived},
    module::State,
    session::Session,
    time::Clock,
};

use crate::{
    auto::{
        actions::register_builtin, ActionCtx, ActionRegistry, ActionScheduler, AutoCtx,
        AutoError, PathExec, PathExecParams, PathSampler,
    },
    drive_ctrl::{DriveCtrlError, Drivetrain, InputData, Params},
    heading::TrackingMode,
    sim::SimRig,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Runs a path against a simulated drivetrain.
pub struct PathRunner {
    rig: SimRig,
    drive: Drivetrain,
    scheduler: ActionScheduler,
    registry: ActionRegistry,
    exec: PathExec,

    archive_enabled: bool,

    start_time_s: f64,
    num_cycles: u64,
}

/// Outcome of a path run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub completed: bool,
    pub num_cycles: u64,

    /// Units: seconds
    pub duration_s: f64,

    /// Units: seconds
    pub stop_and_run_duration_s: f64,

    pub num_stop_and_run: usize,
    pub num_scheduled: usize,

    /// Units: meters
    pub field_x_m: f64,

    /// Units: meters
    pub field_y_m: f64,

    /// Units: radians
    pub field_heading_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Drive control error: {0}")]
    DriveCtrlError(#[from] DriveCtrlError),

    #[error("Autonomy error: {0}")]
    AutoError(#[from] AutoError),

    #[error("Could not write the drivetrain archive: {0}")]
    ArchiveError(#[from] ArchiveError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathRunner {
    /// Build a runner for the given path, with the built-in actions available.
    pub fn new(
        drive_params: Params,
        exec_params: PathExecParams,
        sampler: Box<dyn PathSampler>,
    ) -> Self {
        let (rig, drive) = SimRig::build(drive_params);

        let mut registry = ActionRegistry::new();
        register_builtin(&mut registry);
        info!("Available actions: {:?}", registry.names());

        Self {
            rig,
            drive,
            scheduler: ActionScheduler::new(),
            registry,
            exec: PathExec::new(sampler, exec_params),
            archive_enabled: false,
            start_time_s: 0.0,
            num_cycles: 0,
        }
    }

    /// Archive the drivetrain telemetry every cycle.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), RunnerError> {
        self.drive.init_archive(session)?;
        self.archive_enabled = true;
        Ok(())
    }

    /// Start following the path.
    pub fn start(&mut self, clock: &dyn Clock) -> Result<(), RunnerError> {
        self.start_time_s = clock.now_s();
        self.num_cycles = 0;

        // First reading from the sensor so the heading is available immediately
        self.rig.imu.tick();
        self.drive.proc(&InputData {
            tracking_mode: TrackingMode::FollowCurrent,
            now_s: self.start_time_s,
        })?;

        let mut ctx = AutoCtx {
            clock,
            drive: &mut self.drive,
            scheduler: &mut self.scheduler,
            factory: &self.registry,
        };
        self.exec.initialize(&mut ctx)?;

        Ok(())
    }

    /// Run one cycle of `period_s` seconds, returning true once the path is complete.
    ///
    /// Action and archive failures are logged and the cycle carries on, only drivetrain
    /// processing errors are returned.
    pub fn cycle(&mut self, clock: &dyn Clock, period_s: f64) -> Result<bool, RunnerError> {
        let now_s = clock.now_s();

        // ---- DRIVETRAIN PROCESSING ----

        self.drive.proc(&InputData {
            tracking_mode: TrackingMode::Hold,
            now_s,
        })?;

        if self.archive_enabled {
            if let Err(e) = self.drive.write() {
                warn!("Could not archive drivetrain telemetry: {}", e);
            }
        }

        // ---- PATH EXECUTION ----

        let done = {
            let mut ctx = AutoCtx {
                clock,
                drive: &mut self.drive,
                scheduler: &mut self.scheduler,
                factory: &self.registry,
            };
            self.exec.step(&mut ctx)
        };

        // ---- SCHEDULED ACTIONS ----

        let mut actx = ActionCtx {
            now_s,
            drive: &mut self.drive,
        };
        self.scheduler.run(&mut actx);

        // ---- SIMULATION ----

        self.rig.advance(period_s, &self.drive);

        self.num_cycles += 1;

        Ok(done)
    }

    /// Stop the run, leaving the drivetrain stopped.
    ///
    /// Scheduled actions still running are cancelled.
    pub fn finish(&mut self, interrupted: bool, clock: &dyn Clock) {
        let mut ctx = AutoCtx {
            clock,
            drive: &mut self.drive,
            scheduler: &mut self.scheduler,
            factory: &self.registry,
        };
        self.exec.end(interrupted, &mut ctx);

        if !self.scheduler.is_empty() {
            warn!("{} scheduled actions still running at the end of the path", self.scheduler.len());
        }
        let mut actx = ActionCtx {
            now_s: clock.now_s(),
            drive: &mut self.drive,
        };
        self.scheduler.cancel_all(&mut actx);
    }

    pub fn is_finished(&self) -> bool {
        self.exec.is_finished()
    }

    /// Actions available to the path, for registering actions beyond the built-in ones.
    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    pub fn drive(&self) -> &Drivetrain {
        &self.drive
    }

    pub fn rig(&self) -> &SimRig {
        &self.rig
    }

    pub fn summary(&self, clock: &dyn Clock) -> RunSummary {
        let pos = self.drive.field_position();
        RunSummary {
            completed: self.exec.is_finished(),
            num_cycles: self.num_cycles,
            duration_s: clock.now_s() - self.start_time_s,
            stop_and_run_duration_s: self.exec.stop_and_run_duration_s(),
            num_stop_and_run: self.exec.num_stop_and_run(),
            num_scheduled: self.exec.num_scheduled(),
            field_x_m: pos.x,
            field_y_m: pos.y,
            field_heading_rad: self.drive.field_heading(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Path {} after {} cycles",
            if self.completed { "completed" } else { "NOT completed" },
            self.num_cycles
        )?;
        writeln!(f, "    Duration:             {:.3} s", self.duration_s)?;
        writeln!(
            f,
            "    Stop-and-run time:    {:.3} s ({} actions)",
            self.stop_and_run_duration_s, self.num_stop_and_run
        )?;
        writeln!(f, "    Scheduled actions:    {}", self.num_scheduled)?;
        write!(
            f,
            "    Final field pose:     ({:.3}, {:.3}) m, {:.2} deg",
            self.field_x_m,
            self.field_y_m,
            self.field_heading_rad.to_degrees()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto::{keyframe::KeyframePath, Action};
    use crate::sim::{ActuatorCmd, ManualClock};

    const PERIOD_S: f64 = 0.02;

    /// Forward at 1 m/s for 2 s with a wait and a marker on the way.
    const PATH: &str = r#"{
        "keyframes": [
            { "time_s": 0.0, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
              "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0 },
            { "time_s": 1.0, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
              "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0,
              "action": { "name": "Wait", "action_type": "stop_and_run" } },
            { "time_s": 1.5, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
              "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0,
              "action": { "name": "Marker", "action_type": "schedule" } },
            { "time_s": 2.0, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
              "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0 }
        ]
    }"#;

    fn runner() -> PathRunner {
        PathRunner::new(
            Params {
                prepare_settle_time_s: 0.0,
                ..Params::default()
            },
            PathExecParams::default(),
            Box::new(KeyframePath::from_json_str(PATH).unwrap()),
        )
    }

    #[test]
    fn test_run_to_completion() {
        let clock = ManualClock::new(10.0);
        let mut runner = runner();

        runner.start(&clock).unwrap();
        let mut cycles = 0;
        loop {
            let done = runner.cycle(&clock, PERIOD_S).unwrap();
            clock.advance(PERIOD_S);
            if done {
                break;
            }
            cycles += 1;
            assert!(cycles < 500, "path did not finish");
        }
        runner.finish(false, &clock);

        let summary = runner.summary(&clock);
        assert!(summary.completed);
        assert_eq!(summary.num_stop_and_run, 1);
        assert_eq!(summary.num_scheduled, 1);

        // The wait lasts 50 cycles
        assert!(
            (summary.stop_and_run_duration_s - 1.0).abs() < 0.05,
            "stop-and-run {}",
            summary.stop_and_run_duration_s
        );
        assert!((summary.duration_s - 3.0).abs() < 0.1, "duration {}", summary.duration_s);

        // About 2 m forward, the heading held straight
        assert!((summary.field_y_m - 2.0).abs() < 0.1, "y {}", summary.field_y_m);
        assert!(summary.field_x_m.abs() < 1e-6);
        assert!(summary.field_heading_rad.abs() < 1e-6);

        assert_eq!(runner.drive().chassis_command(), Default::default());
    }

    #[test]
    fn test_finish_interrupted() {
        let clock = ManualClock::new(0.0);
        let mut runner = runner();

        runner.start(&clock).unwrap();
        for _ in 0..10 {
            runner.cycle(&clock, PERIOD_S).unwrap();
            clock.advance(PERIOD_S);
        }
        assert!(runner.drive().chassis_command().forward > 0.0);

        runner.finish(true, &clock);
        let summary = runner.summary(&clock);
        assert!(!summary.completed);
        assert_eq!(summary.num_cycles, 10);
        assert_eq!(runner.drive().chassis_command(), Default::default());
        assert!(summary.to_string().contains("NOT completed"));
    }

    /// Requests a non-finite drive on initialisation or on every tick.
    struct BadRequest {
        in_tick: bool,
    }

    impl Action for BadRequest {
        fn name(&self) -> &str {
            "BadRequest"
        }

        fn initialize(&mut self, ctx: &mut ActionCtx) -> Result<(), AutoError> {
            if !self.in_tick {
                ctx.drive.drive_components(f64::NAN, 0.0, 0.0)?;
            }
            Ok(())
        }

        fn tick(&mut self, ctx: &mut ActionCtx) -> Result<(), AutoError> {
            ctx.drive.drive_components(0.0, f64::INFINITY, 0.0)?;
            Ok(())
        }

        fn is_finished(&self, _ctx: &ActionCtx) -> bool {
            false
        }

        fn end(&mut self, _interrupted: bool, _ctx: &mut ActionCtx) {}
    }

    #[test]
    fn test_failing_actions_do_not_stop_the_run() {
        const FAILING_PATH: &str = r#"{
            "keyframes": [
                { "time_s": 0.0, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
                  "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0 },
                { "time_s": 0.2, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
                  "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0,
                  "action": { "name": "BadInit", "action_type": "schedule" } },
                { "time_s": 0.4, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
                  "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0,
                  "action": { "name": "BadTick", "action_type": "schedule" } },
                { "time_s": 0.6, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
                  "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0,
                  "action": { "name": "BadTick", "action_type": "stop_and_run" } },
                { "time_s": 1.0, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
                  "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0 }
            ]
        }"#;

        let clock = ManualClock::new(0.0);
        let mut runner = PathRunner::new(
            Params {
                prepare_settle_time_s: 0.0,
                ..Params::default()
            },
            PathExecParams::default(),
            Box::new(KeyframePath::from_json_str(FAILING_PATH).unwrap()),
        );
        runner
            .registry_mut()
            .register("BadInit", || Box::new(BadRequest { in_tick: false }));
        runner
            .registry_mut()
            .register("BadTick", || Box::new(BadRequest { in_tick: true }));

        runner.start(&clock).unwrap();
        let mut cycles = 0;
        loop {
            let done = runner.cycle(&clock, PERIOD_S).unwrap();
            clock.advance(PERIOD_S);
            if done {
                break;
            }
            cycles += 1;
            assert!(cycles < 200, "path did not finish");

            // Failed requests never reach the modules
            assert!(runner.drive().chassis_command().is_finite());
        }
        runner.finish(false, &clock);

        let summary = runner.summary(&clock);
        assert!(summary.completed);
        assert_eq!(summary.num_scheduled, 2);
        assert_eq!(summary.num_stop_and_run, 1);
        assert!(summary.field_y_m > 0.9, "y {}", summary.field_y_m);

        // Left stopped
        assert_eq!(runner.drive().chassis_command(), Default::default());
        for drive in runner.rig().drive.iter() {
            assert_eq!(drive.last_command(), Some(ActuatorCmd::Velocity(0.0)));
        }
    }
}
