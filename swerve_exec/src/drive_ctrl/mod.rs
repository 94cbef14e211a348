//! Drive control module
//!
//! Converts chassis motion requests (forward, strafe and rotation, each roughly in [-1, 1]) into
//! commands for the four swerve modules, and keeps track of where the robot is on the field.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_chassis;
mod calc_heading;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use calc_chassis::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of swerve modules on the robot.
pub const NUM_MODULES: usize = 4;

/// Module speeds at or below this are treated as stopped, the module keeps its last direction.
pub const STOPPED_SPEED_THRESHOLD: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The chassis motion last sent to the modules, after any normalisation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChassisCommand {
    pub forward: f64,
    pub strafe: f64,
    pub rotation: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identifies a module by its corner of the chassis.
///
/// The discriminant is the index of the module in all per-module arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModuleId {
    RightFront = 0,
    LeftFront = 1,
    LeftRear = 2,
    RightRear = 3,
}

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error(
        "Chassis request must be finite, found forward = {forward}, strafe = {strafe}, \
        rotation = {rotation}"
    )]
    NonFiniteRequest {
        forward: f64,
        strafe: f64,
        rotation: f64,
    },

    #[error("Heading target must be finite, found {0}")]
    NonFiniteHeading(f64),

    #[error("Processing time must be finite, found {0}")]
    NonFiniteTime(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleId {
    /// All modules in index order.
    pub const ALL: [ModuleId; NUM_MODULES] = [
        ModuleId::RightFront,
        ModuleId::LeftFront,
        ModuleId::LeftRear,
        ModuleId::RightRear,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            ModuleId::RightFront => "RF",
            ModuleId::LeftFront => "LF",
            ModuleId::LeftRear => "LR",
            ModuleId::RightRear => "RR",
        }
    }
}

impl ChassisCommand {
    pub fn is_finite(&self) -> bool {
        self.forward.is_finite() && self.strafe.is_finite() && self.rotation.is_finite()
    }
}
