//! # Swerve module
//!
//! A swerve module is one independently steered and driven wheel. The module never rotates its
//! wheel by more than 90 degrees for a new command: if the requested direction is more than 90
//! degrees away from where the front of the wheel currently points, the back of the wheel is
//! steered to the target instead and the drive runs in reverse.
//!
//! The steering actuator position is accumulated without wrapping, so the steering actuator is
//! free to turn through any number of revolutions.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use log::{debug, trace, warn};
use serde::Serialize;

use util::angle::Angle;

use crate::eqpt::{AbsolutePositionSensor, Actuator};

pub use params::ModuleParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single swerve module.
pub struct SwerveModule {
    params: ModuleParams,

    state: ModuleState,

    drive: Box<dyn Actuator>,
    steer: Box<dyn Actuator>,
    calibration: Box<dyn AbsolutePositionSensor>,
}

/// The commanded state of a module.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModuleState {
    /// The last requested direction, before any reversal.
    pub last_direction: Angle,

    /// The steering actuator position last commanded.
    ///
    /// Units: encoder tics, unbounded
    pub last_steer_position: f64,

    /// The last requested normalised speed, before any reversal.
    pub last_normalised_speed: f64,

    /// `1.0` if the wheel is driving forwards, `-1.0` if the back of the wheel is pointing in the
    /// requested direction.
    pub speed_multiplier: f64,

    /// How the drive actuator is currently being commanded.
    pub drive_mode: DriveMode,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Control mode of the drive actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriveMode {
    /// The drive is commanded with a rate.
    Speed,

    /// The drive is commanded to an encoder position.
    Position,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ModuleState {
    fn default() -> Self {
        Self {
            last_direction: Angle::ZERO,
            last_steer_position: 0.0,
            last_normalised_speed: 0.0,
            speed_multiplier: 1.0,
            drive_mode: DriveMode::Speed,
        }
    }
}

impl SwerveModule {
    /// Create a new module and calibrate its steering.
    ///
    /// Calibration blocks until the absolute sensor provides a valid reading.
    pub fn new(
        drive: Box<dyn Actuator>,
        steer: Box<dyn Actuator>,
        calibration: Box<dyn AbsolutePositionSensor>,
        params: ModuleParams,
    ) -> Self {
        let mut module = Self {
            params,
            state: ModuleState::default(),
            drive,
            steer,
            calibration,
        };

        module.calibrate();

        module
    }

    /// Command the module to point in `target` and drive at `normalised_speed`.
    ///
    /// `normalised_speed` is in the range [0, 1] where 1 is the maximum drive rate.
    pub fn set_direction_and_speed(&mut self, target: Angle, normalised_speed: f64) {
        self.set_direction(target);

        self.state.last_normalised_speed = normalised_speed;

        if self.state.drive_mode != DriveMode::Speed {
            trace!("Drive returning to speed mode");
            self.state.drive_mode = DriveMode::Speed;
        }

        self.drive.set_velocity(
            normalised_speed * self.state.speed_multiplier * self.params.max_drive_rate_rpm,
        );
    }

    /// Command the module to point in `target` and move the drive by `delta_tics` from its
    /// current position.
    pub fn set_direction_and_distance(&mut self, target: Angle, delta_tics: f64) {
        self.set_direction(target);

        let target_tics = self.drive.position() + delta_tics * self.state.speed_multiplier;

        if self.state.drive_mode != DriveMode::Position {
            // Stop the speed loop before handing over to the position loop
            self.drive.set_velocity(0.0);
            self.state.drive_mode = DriveMode::Position;
        }

        self.drive.set_position(target_tics);
    }

    /// The last requested direction, before any reversal.
    pub fn last_direction(&self) -> Angle {
        self.state.last_direction
    }

    /// The last requested normalised speed, before any reversal.
    pub fn last_normalised_speed(&self) -> f64 {
        self.state.last_normalised_speed
    }

    /// The last requested speed in motor RPM, before any reversal.
    pub fn last_speed(&self) -> f64 {
        self.state.last_normalised_speed * self.params.max_drive_rate_rpm
    }

    pub fn drive_position(&self) -> f64 {
        self.drive.position()
    }

    pub fn drive_velocity(&self) -> f64 {
        self.drive.velocity()
    }

    /// Current steering actuator position in encoder tics.
    pub fn steer_position(&self) -> f64 {
        self.steer.position()
    }

    /// The last commanded steering actuator position in encoder tics.
    pub fn last_steer_position(&self) -> f64 {
        self.state.last_steer_position
    }

    /// Current reading of the absolute calibration sensor.
    pub fn calibration_position(&self) -> f64 {
        self.calibration.position()
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.state.speed_multiplier
    }

    pub fn drive_mode(&self) -> DriveMode {
        self.state.drive_mode
    }

    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    /// Zero the steering encoder so that a position of zero points the wheel straight forward.
    fn calibrate(&mut self) {
        let mut num_failed_reads: u64 = 0;

        let abs_pos_rad = loop {
            let reading = self.calibration.position();

            if (0.0..TAU).contains(&reading) {
                break reading;
            }

            if num_failed_reads == 0 {
                warn!(
                    "Invalid calibration sensor reading ({}), retrying until valid",
                    reading
                );
            } else {
                trace!("Invalid calibration sensor reading ({})", reading);
            }
            num_failed_reads += 1;
        };

        self.steer.reset_position(
            (abs_pos_rad - self.params.calibration_offset_rad) * self.params.steer_tics_per_rad,
        );
        self.steer.set_position(0.0);

        self.state.last_direction = Angle::ZERO;
        self.state.last_steer_position = 0.0;

        debug!(
            "Module calibrated at {:.4} rad after {} failed reads",
            abs_pos_rad, num_failed_reads
        );
    }

    /// Steer the module by the smallest rotation which puts either the front or the back of the
    /// wheel in the `target` direction, updating the speed multiplier to match.
    fn set_direction(&mut self, target: Angle) {
        let last = self.state.last_direction;

        // Where the front of the wheel really points
        let true_front = if self.state.speed_multiplier > 0.0 {
            last
        } else if last < Angle::ZERO {
            last + Angle::PI
        } else {
            last - Angle::PI
        };

        // Wrapped into (-pi, pi]
        let mut delta_rad = (target - true_front).radians();

        self.state.speed_multiplier = 1.0;
        if delta_rad > FRAC_PI_2 {
            delta_rad -= PI;
            self.state.speed_multiplier = -1.0;
        } else if delta_rad < -FRAC_PI_2 {
            delta_rad += PI;
            self.state.speed_multiplier = -1.0;
        }

        self.state.last_direction = target;
        self.state.last_steer_position += delta_rad * self.params.steer_tics_per_rad;
        self.steer.set_position(self.state.last_steer_position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ActuatorCmd, SimAbsEncoder, SimActuator};

    struct Rig {
        module: SwerveModule,
        drive: SimActuator,
        steer: SimActuator,
        params: ModuleParams,
    }

    fn rig() -> Rig {
        let params = ModuleParams::default();
        let drive = SimActuator::new();
        let steer = SimActuator::new();
        let module = SwerveModule::new(
            Box::new(drive.clone()),
            Box::new(steer.clone()),
            Box::new(SimAbsEncoder::new(params.calibration_offset_rad)),
            params,
        );

        Rig {
            module,
            drive,
            steer,
            params,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Commanded steering position converted back into degrees.
    fn steer_deg(rig: &Rig) -> f64 {
        (rig.module.last_steer_position() / rig.params.steer_tics_per_rad).to_degrees()
    }

    #[test]
    fn test_calibration() {
        let params = ModuleParams {
            calibration_offset_rad: 0.5,
            ..ModuleParams::default()
        };
        let steer = SimActuator::new();
        let encoder = SimAbsEncoder::with_invalid_reads(1.5, 3);

        let module = SwerveModule::new(
            Box::new(SimActuator::new()),
            Box::new(steer.clone()),
            Box::new(encoder.clone()),
            params,
        );

        // Invalid reads are retried until a valid one arrives
        assert_eq!(encoder.num_reads(), 4);

        let cmds = steer.commands();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], ActuatorCmd::ResetPosition(1.0 * params.steer_tics_per_rad));
        assert_eq!(cmds[1], ActuatorCmd::Position(0.0));

        assert_eq!(module.last_direction(), Angle::ZERO);
        assert_eq!(module.last_steer_position(), 0.0);
        assert_eq!(module.calibration_position(), 1.5);
    }

    #[test]
    fn test_forward_backward() {
        let mut rig = rig();

        // Within 90 degrees drives forward
        rig.module.set_direction_and_speed(Angle::from_degrees(45.0), 0.5);
        assert!(close(steer_deg(&rig), 45.0));
        assert_eq!(rig.module.speed_multiplier(), 1.0);
        assert!(close(rig.drive.snapshot().velocity, 0.5 * rig.params.max_drive_rate_rpm));

        // Back to zero, then past 90 degrees reverses the drive
        rig.module.set_direction_and_speed(Angle::ZERO, 0.5);
        rig.module.set_direction_and_speed(Angle::from_degrees(100.0), 0.5);
        assert!(close(steer_deg(&rig), -80.0));
        assert_eq!(rig.module.speed_multiplier(), -1.0);
        assert!(close(rig.drive.snapshot().velocity, -0.5 * rig.params.max_drive_rate_rpm));

        // The requested direction and speed are reported, not the flipped ones
        assert!(close(rig.module.last_direction().degrees(), 100.0));
        assert_eq!(rig.module.last_normalised_speed(), 0.5);
        assert!(close(rig.module.last_speed(), 0.5 * rig.params.max_drive_rate_rpm));
    }

    #[test]
    fn test_no_reversal_through_wrap() {
        let mut rig = rig();

        rig.module.set_direction_and_speed(Angle::from_degrees(85.0), 1.0);
        assert!(close(steer_deg(&rig), 85.0));
        rig.module.set_direction_and_speed(Angle::from_degrees(170.0), 1.0);
        assert!(close(steer_deg(&rig), 170.0));
        rig.module.set_direction_and_speed(Angle::from_degrees(-170.0), 1.0);
        assert!(close(steer_deg(&rig), 190.0));
        assert_eq!(rig.module.speed_multiplier(), 1.0);

        // And mirrored
        let mut rig = self::rig();

        rig.module.set_direction_and_speed(Angle::from_degrees(-85.0), 1.0);
        rig.module.set_direction_and_speed(Angle::from_degrees(-170.0), 1.0);
        rig.module.set_direction_and_speed(Angle::from_degrees(170.0), 1.0);
        assert!(close(steer_deg(&rig), -190.0));
        assert_eq!(rig.module.speed_multiplier(), 1.0);
        assert!(close(rig.steer.snapshot().position, rig.module.last_steer_position()));
    }

    #[test]
    fn test_repeated_reversed_commands() {
        let mut rig = rig();
        let mut flips = 0;
        let mut last_mult = rig.module.speed_multiplier();

        for (i, deg) in [0.0, 0.0, 180.0, 180.0].iter().enumerate() {
            let before = rig.module.last_steer_position();
            rig.module.set_direction_and_speed(Angle::from_degrees(*deg), 1.0);

            // Pointing the back of the wheel needs no steering at all
            assert!(close(rig.module.last_steer_position(), before), "call {}", i);

            if rig.module.speed_multiplier() != last_mult {
                flips += 1;
                last_mult = rig.module.speed_multiplier();
            }
        }

        assert_eq!(flips, 1);
        assert_eq!(rig.module.speed_multiplier(), -1.0);
        assert!(close(rig.drive.snapshot().velocity, -rig.params.max_drive_rate_rpm));
    }

    #[test]
    fn test_delta_bounded() {
        let mut rig = rig();

        for i in 0..200 {
            let target = Angle::from_degrees((i as f64) * 37.3 - 500.0);
            let before = rig.module.last_steer_position();
            rig.module.set_direction_and_speed(target, 0.3);
            let delta_rad = (rig.module.last_steer_position() - before) / rig.params.steer_tics_per_rad;

            assert!(delta_rad.abs() <= FRAC_PI_2 + 1e-9);
            assert_eq!(rig.module.last_direction(), target);
        }
    }

    #[test]
    fn test_distance_mode() {
        let mut rig = rig();

        rig.module.set_direction_and_speed(Angle::ZERO, 0.5);
        rig.drive.clear_commands();

        // Switching to distance mode stops the speed loop first
        rig.module.set_direction_and_distance(Angle::from_degrees(135.0), 10.0);
        assert_eq!(rig.module.drive_mode(), DriveMode::Position);
        assert_eq!(rig.module.speed_multiplier(), -1.0);
        assert_eq!(
            rig.drive.commands(),
            vec![ActuatorCmd::Velocity(0.0), ActuatorCmd::Position(-10.0)]
        );

        // Staying in distance mode moves relative to the current position
        rig.drive.clear_commands();
        rig.module.set_direction_and_distance(Angle::from_degrees(135.0), 5.0);
        assert_eq!(rig.drive.commands(), vec![ActuatorCmd::Position(-15.0)]);

        rig.module.set_direction_and_speed(Angle::from_degrees(135.0), 0.2);
        assert_eq!(rig.module.drive_mode(), DriveMode::Speed);
    }
}
