//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use serde::Deserialize;

use super::{ModuleId, NUM_MODULES};
use crate::swerve_module::ModuleParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- GEOMETRY ----

    /// Distance between the front and rear module axes.
    ///
    /// Units: meters
    pub length_m: f64,

    /// Distance between the left and right module axes.
    ///
    /// Units: meters
    pub width_m: f64,

    // ---- CAPABILITIES ----

    /// Ground speed of a module driven at a normalised speed of 1.0.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Drive actuator rate for a normalised speed of 1.0.
    ///
    /// Units: motor RPM
    pub max_drive_rate_rpm: f64,

    // ---- ACTUATORS ----

    /// Units: steering encoder tics/radian
    pub steer_tics_per_rad: f64,

    /// Drive encoder tics per radian of robot rotation when turning in place.
    ///
    /// Units: drive encoder tics/radian
    pub drive_pos_tics_per_rad: f64,

    /// Absolute calibration sensor reading of each module when pointing forward, in `ModuleId`
    /// order (RF, LF, LR, RR).
    ///
    /// Units: radians
    pub calibration_offsets_rad: [f64; NUM_MODULES],

    // ---- CONTROL ----

    /// Proportional gain of the heading hold correction.
    pub heading_hold_k_p: f64,

    /// Time to wait for the modules to steer when preparing for a motion.
    ///
    /// Units: seconds
    pub prepare_settle_time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Distance between diagonally opposite modules.
    ///
    /// Units: meters
    pub fn diagonal_m(&self) -> f64 {
        self.length_m.hypot(self.width_m)
    }

    /// Rotation rate of the chassis for a rotation request of 1.0.
    ///
    /// Units: radians/second
    pub fn max_rotation_rate_rads(&self) -> f64 {
        (377.0 / 360.0) * (self.max_speed_ms * 2.0 * PI) / (PI * self.diagonal_m())
    }

    /// Build the parameters for a single module.
    pub fn module_params(&self, id: ModuleId) -> ModuleParams {
        ModuleParams {
            calibration_offset_rad: self.calibration_offsets_rad[id.index()],
            steer_tics_per_rad: self.steer_tics_per_rad,
            max_drive_rate_rpm: self.max_drive_rate_rpm,
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            length_m: 0.5969,
            width_m: 0.5969,
            max_speed_ms: 3.2,
            max_drive_rate_rpm: 5000.0,
            steer_tics_per_rad: 12.7999 / (2.0 * PI),
            drive_pos_tics_per_rad: 10.0,
            calibration_offsets_rad: [0.785, 0.563, 2.519, 0.357],
            heading_hold_k_p: 0.3,
            prepare_settle_time_s: 0.1,
        }
    }
}
