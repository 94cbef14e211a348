//! # Swerve drive library.
//!
//! This library allows the executables in this crate (and the benches) to access the control
//! modules of the swerve drive.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomy - path execution, path-embedded actions and the cooperative action scheduler
pub mod auto;

/// Drive control module - converts chassis motion requests into module commands and tracks the
/// robot on the field
pub mod drive_ctrl;

/// Equipment interfaces - the actuators and sensors the control modules command and read
pub mod eqpt;

/// Heading tracking - continuous robot heading from the wrap-around inertial sensor
pub mod heading;

/// Parameters for the executables
pub mod params;

/// Runs a path through the control loop on simulated equipment
pub mod runner;

/// Simulated equipment used by the executables and tests
pub mod sim;

/// Swerve module - steering optimisation and drive commands for a single wheel
pub mod swerve_module;
