//! # Path execution
//!
//! [`PathExec`] follows a path one cycle at a time. It alternates between two states:
//!
//! - Following: the path is sampled at the current path time and the sample's velocities, plus a
//!   heading correction, are sent to the drivetrain.
//! - Running a stop-and-run action: the robot is stopped and the action is ticked until it
//!   finishes. The time spent here is accumulated and excluded from the path time.
//!
//! Following ends when the path sampler reports the end of the path.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use util::time::Clock;

use super::{
    Action, ActionCtx, ActionFactory, ActionType, AutoError, PathExecParams, PathPoint,
    PathSampler, TaskScheduler,
};
use crate::drive_ctrl::Drivetrain;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Collaborators needed by the path executor on each call.
pub struct AutoCtx<'a> {
    pub clock: &'a dyn Clock,
    pub drive: &'a mut Drivetrain,
    pub scheduler: &'a mut dyn TaskScheduler,
    pub factory: &'a dyn ActionFactory,
}

/// Path execution engine.
pub struct PathExec {
    params: PathExecParams,

    sampler: Box<dyn PathSampler>,

    /// Time following started.
    ///
    /// Units: seconds
    start_time_s: f64,

    /// Time the active stop-and-run action started.
    ///
    /// Units: seconds
    stop_and_run_start_s: f64,

    /// Total time spent in completed stop-and-run actions.
    ///
    /// Units: seconds
    stop_and_run_duration_s: f64,

    stop_and_run: Option<Box<dyn Action>>,

    /// The last point sampled from the path
    last_point: Option<PathPoint>,

    finished: bool,

    num_stop_and_run: usize,
    num_scheduled: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathExec {
    pub fn new(sampler: Box<dyn PathSampler>, params: PathExecParams) -> Self {
        Self {
            params,
            sampler,
            start_time_s: 0.0,
            stop_and_run_start_s: 0.0,
            stop_and_run_duration_s: 0.0,
            stop_and_run: None,
            last_point: None,
            finished: false,
            num_stop_and_run: 0,
            num_scheduled: 0,
        }
    }

    /// Prepare the robot to follow the path from its start.
    ///
    /// The heading tracker is anchored to the path's initial field heading and the modules are
    /// steered for the initial velocity. If the initial point carries a stop-and-run action it is
    /// started straight away. A scheduled action on the initial point is not run.
    pub fn initialize(&mut self, ctx: &mut AutoCtx) -> Result<(), AutoError> {
        self.sampler.reset();
        self.finished = false;
        self.stop_and_run = None;
        self.stop_and_run_duration_s = 0.0;
        self.num_stop_and_run = 0;
        self.num_scheduled = 0;

        self.last_point = self.sampler.sample_at(0.0);

        let point = match &self.last_point {
            Some(p) => p.clone(),
            None => {
                warn!("Path is empty, nothing to follow");
                self.start_time_s = ctx.clock.now_s();
                return Ok(());
            }
        };

        ctx.drive.reanchor_heading(point.field_heading_rad);
        self.prepare_for(&point, ctx)?;

        self.start_time_s = ctx.clock.now_s();

        info!(
            "Path following started at {:.3} s (path duration {:?} s)",
            self.start_time_s,
            self.sampler.duration_s()
        );

        if let Some(action) = &point.action {
            match action.action_type {
                ActionType::StopAndRun => {
                    self.start_stop_and_run(&action.name, ctx);
                }
                ActionType::Schedule => warn!(
                    "Scheduled action \"{}\" on the first path point is skipped",
                    action.name
                ),
            }
        }

        Ok(())
    }

    /// Run one cycle of path execution, returning true once the path is complete.
    ///
    /// Failures of actions and of the drivetrain are logged and path execution carries on, a
    /// failed stop-and-run action is treated as finished.
    pub fn step(&mut self, ctx: &mut AutoCtx) -> bool {
        if self.finished {
            return true;
        }

        if self.stop_and_run.is_some() {
            self.step_stop_and_run(ctx);
            return self.finished;
        }

        let now_s = ctx.clock.now_s();
        let path_time_s = now_s - self.start_time_s - self.stop_and_run_duration_s;

        let point = match self.sampler.sample_at(path_time_s) {
            Some(p) => p,
            None => {
                ctx.drive.stop();
                self.finished = true;
                info!(
                    "Path complete at {:.3} s ({:.3} s in stop-and-run actions)",
                    now_s, self.stop_and_run_duration_s
                );
                return true;
            }
        };
        self.last_point = Some(point.clone());

        if let Some(action) = &point.action {
            match action.action_type {
                ActionType::Schedule => match ctx.factory.instantiate(&action.name) {
                    Ok(a) => {
                        info!(
                            "Scheduling action \"{}\" at path time {:.3} s",
                            action.name, path_time_s
                        );
                        ctx.scheduler.submit(a);
                        self.num_scheduled += 1;
                    }
                    Err(e) => warn!("{}, continuing with path", e),
                },
                ActionType::StopAndRun => {
                    if self.start_stop_and_run(&action.name, ctx) {
                        return false;
                    }
                }
            }
        }

        if let Err(e) = self.follow(&point, ctx) {
            warn!("Cannot follow path point at {:.3} s, stopping: {}", path_time_s, e);
            ctx.drive.stop();
        }

        false
    }

    /// Whether the path is complete.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Stop path execution.
    ///
    /// If `interrupted` an active stop-and-run action is ended as interrupted. The chassis is
    /// always commanded to stop.
    pub fn end(&mut self, interrupted: bool, ctx: &mut AutoCtx) {
        if interrupted {
            if let Some(mut action) = self.stop_and_run.take() {
                let mut actx = ActionCtx {
                    now_s: ctx.clock.now_s(),
                    drive: &mut *ctx.drive,
                };
                action.end(true, &mut actx);
                info!("Stop-and-run action \"{}\" interrupted", action.name());
            }
            info!("Path execution interrupted");
        }

        ctx.drive.stop();
    }

    /// Total time spent in completed stop-and-run actions.
    ///
    /// Units: seconds
    pub fn stop_and_run_duration_s(&self) -> f64 {
        self.stop_and_run_duration_s
    }

    /// Whether a stop-and-run action is currently running.
    pub fn is_running_action(&self) -> bool {
        self.stop_and_run.is_some()
    }

    /// Number of stop-and-run actions started.
    pub fn num_stop_and_run(&self) -> usize {
        self.num_stop_and_run
    }

    /// Number of actions handed to the scheduler.
    pub fn num_scheduled(&self) -> usize {
        self.num_scheduled
    }

    /// Tick the active stop-and-run action, resuming the path once it finishes or fails.
    fn step_stop_and_run(&mut self, ctx: &mut AutoCtx) {
        let now_s = ctx.clock.now_s();

        let done = match self.stop_and_run.as_mut() {
            Some(action) => {
                let mut actx = ActionCtx {
                    now_s,
                    drive: &mut *ctx.drive,
                };

                match action.tick(&mut actx) {
                    Ok(()) if action.is_finished(&actx) => {
                        action.end(false, &mut actx);
                        true
                    }
                    Ok(()) => false,
                    Err(e) => {
                        warn!(
                            "Stop-and-run action \"{}\" failed, resuming path: {}",
                            action.name(),
                            e
                        );
                        action.end(true, &mut actx);
                        true
                    }
                }
            }
            None => false,
        };

        if done {
            let name = self
                .stop_and_run
                .take()
                .map(|a| a.name().to_string())
                .unwrap_or_default();

            if let Some(point) = self.last_point.clone() {
                if let Err(e) = self.prepare_for(&point, ctx) {
                    warn!("Cannot prepare to resume the path: {}", e);
                    ctx.drive.stop();
                }
            }

            // Measured after the prepare so the settle time is not taken from the path
            let duration_s = ctx.clock.now_s() - self.stop_and_run_start_s;
            self.stop_and_run_duration_s += duration_s;

            info!(
                "Stop-and-run action \"{}\" ended after {:.3} s, resuming path",
                name, duration_s
            );
        }
    }

    /// Instantiate and start a stop-and-run action.
    ///
    /// Returns false if the action could not be created or failed to initialise, in which case
    /// path following carries on.
    fn start_stop_and_run(&mut self, name: &str, ctx: &mut AutoCtx) -> bool {
        let mut action = match ctx.factory.instantiate(name) {
            Ok(a) => a,
            Err(e) => {
                warn!("{}, continuing with path", e);
                return false;
            }
        };

        ctx.drive.stop();

        let start_s = ctx.clock.now_s();
        let mut actx = ActionCtx {
            now_s: start_s,
            drive: &mut *ctx.drive,
        };
        if let Err(e) = action.initialize(&mut actx) {
            warn!(
                "Stop-and-run action \"{}\" failed to initialise, continuing with path: {}",
                name, e
            );
            action.end(true, &mut actx);
            return false;
        }

        info!("Stop-and-run action \"{}\" started at {:.3} s", name, start_s);

        self.stop_and_run_start_s = start_s;
        self.stop_and_run = Some(action);
        self.num_stop_and_run += 1;

        true
    }

    /// Send a path point's velocities to the drivetrain with a heading correction.
    fn follow(&mut self, point: &PathPoint, ctx: &mut AutoCtx) -> Result<(), AutoError> {
        let correction = match ctx.drive.heading().heading() {
            Some(heading_rad) => (point.field_heading_rad - heading_rad) * self.params.orientation_k_p,
            None => 0.0,
        };

        let (forward, strafe, rotation) = self.normalised_velocity(point, ctx.drive);

        ctx.drive.drive_components(forward, strafe, rotation + correction)?;
        ctx.drive.heading_mut().set_expected_to_current();

        debug!(
            "Following: forward {:.3}, strafe {:.3}, rotation {:.3} (correction {:.3})",
            forward, strafe, rotation, correction
        );

        Ok(())
    }

    /// Steer the modules for a path point's velocity without driving.
    fn prepare_for(&self, point: &PathPoint, ctx: &mut AutoCtx) -> Result<(), AutoError> {
        let (forward, strafe, rotation) = self.normalised_velocity(point, ctx.drive);
        ctx.drive
            .prepare_for_drive_components(forward, strafe, rotation)?;
        Ok(())
    }

    /// Convert a path point's velocities into normalised chassis components.
    fn normalised_velocity(&self, point: &PathPoint, drive: &Drivetrain) -> (f64, f64, f64) {
        let params = drive.params();
        (
            point.speed_forward_ms / params.max_speed_ms,
            point.speed_strafe_ms / params.max_speed_ms,
            point.speed_rotation_rads / params.max_rotation_rate_rads(),
        )
    }
}
