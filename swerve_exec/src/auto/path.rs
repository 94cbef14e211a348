//! Path samples and the path sampler interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The desired state of the robot at one instant of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    /// Units: radians, unbounded
    pub field_heading_rad: f64,

    /// Units: meters/second
    pub speed_forward_ms: f64,

    /// Units: meters/second
    pub speed_strafe_ms: f64,

    /// Units: radians/second
    pub speed_rotation_rads: f64,

    /// Action to perform at this point, if any.
    #[serde(default)]
    pub action: Option<PathAction>,
}

/// An action embedded in a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathAction {
    /// Name the action is registered under.
    pub name: String,

    pub action_type: ActionType,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How an embedded action is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Handed to the task scheduler, path following continues.
    Schedule,

    /// The robot stops and the action runs to completion before path following resumes.
    StopAndRun,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of path samples.
pub trait PathSampler {
    /// Sample the path at `time_s` seconds from its start, `None` once past the end.
    fn sample_at(&mut self, time_s: f64) -> Option<PathPoint>;

    /// Prepare to follow the path again from the start.
    fn reset(&mut self) {}

    /// Duration of the path in seconds, if known.
    fn duration_s(&self) -> Option<f64> {
        None
    }
}
