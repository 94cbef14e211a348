//! # Autonomy module
//!
//! Drives the robot along a pre-recorded path. The path is sampled once per cycle by
//! [`PathExec`], which turns each sample into a chassis command. Samples may carry an action,
//! either scheduled to run alongside path following or run to completion while the robot is
//! stopped on the path (a "stop-and-run" action). Time spent in stop-and-run actions does not
//! count as path time, so following resumes where it left off.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod action;
pub mod actions;
pub mod keyframe;
mod params;
mod path;
mod path_exec;
mod scheduler;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use action::{Action, ActionCtx, ActionFactory, ActionRegistry, TaskScheduler};
pub use params::PathExecParams;
pub use path::{ActionType, PathAction, PathPoint, PathSampler};
pub use path_exec::{AutoCtx, PathExec};
pub use scheduler::ActionScheduler;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the autonomy module.
#[derive(Debug, thiserror::Error)]
pub enum AutoError {
    #[error("No action named \"{0}\" is registered")]
    UnknownAction(String),

    #[error("Drive control error: {0}")]
    DriveCtrlError(#[from] crate::drive_ctrl::DriveCtrlError),
}
