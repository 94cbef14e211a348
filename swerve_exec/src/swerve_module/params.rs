//! Parameters structure for a single swerve module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for one swerve module.
///
/// These are not loaded directly from a file, `drive_ctrl::Params` holds the values shared by all
/// modules plus the per-module calibration offsets and builds one of these for each module.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ModuleParams {
    /// Reading of the absolute calibration sensor when the wheel points straight forward.
    ///
    /// Units: radians
    pub calibration_offset_rad: f64,

    /// Conversion from steering angle to steering actuator encoder position.
    ///
    /// Units: tics/radian
    pub steer_tics_per_rad: f64,

    /// Drive actuator rate which corresponds to a normalised speed of 1.0.
    ///
    /// Units: motor RPM
    pub max_drive_rate_rpm: f64,
}

impl Default for ModuleParams {
    fn default() -> Self {
        Self {
            calibration_offset_rad: 0.0,
            steer_tics_per_rad: 12.7999 / std::f64::consts::TAU,
            max_drive_rate_rpm: 5000.0,
        }
    }
}
