//! Heading-relative drive operations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use nalgebra::Vector2;

// Internal
use super::{ChassisCommand, DriveCtrlError, Drivetrain, ModuleId};
use util::angle::Angle;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Drivetrain {
    /// Drive the chassis in a direction relative to the field.
    ///
    /// If the heading is unavailable the direction is used as robot-relative instead.
    pub fn drive_field_relative(
        &mut self,
        field_direction: Angle,
        speed: f64,
        rotation: f64,
    ) -> Result<(), DriveCtrlError> {
        let chassis_direction = match self.heading.heading() {
            Some(heading_rad) => field_direction - Angle::from_radians(heading_rad),
            None => {
                warn!("Heading unavailable, driving robot-relative");
                field_direction
            }
        };

        self.drive(chassis_direction, speed, rotation)
    }

    /// Drive the chassis in a robot-relative direction, holding the heading when no rotation is
    /// requested.
    ///
    /// With `rotation` zero the tracker's hold correction, using `heading_hold_k_p`, is applied
    /// instead. Any other `rotation` is passed through and the expected heading follows the robot.
    pub fn drive_with_heading_hold(
        &mut self,
        chassis_direction: Angle,
        speed: f64,
        rotation: f64,
    ) -> Result<(), DriveCtrlError> {
        let rotation = if rotation == 0.0 {
            self.heading.hold_rotation(speed, self.params.heading_hold_k_p)
        } else {
            self.heading.set_expected_to_current();
            rotation
        };

        self.drive(chassis_direction, speed, rotation)
    }

    /// Rotate the robot in place to `target_heading_rad` using the drive position loops.
    ///
    /// The modules are pointed tangent to the circle through the chassis corners, and each drive
    /// moves by the heading error converted to drive encoder tics. If the heading is unavailable
    /// the modules are pointed but not driven.
    pub fn set_heading(&mut self, target_heading_rad: f64) -> Result<(), DriveCtrlError> {
        if !target_heading_rad.is_finite() {
            return Err(DriveCtrlError::NonFiniteHeading(target_heading_rad));
        }

        let l = self.params.length_m;
        let w = self.params.width_m;
        let directions = [
            (ModuleId::RightFront, Angle::atan2(l, -w)),
            (ModuleId::LeftFront, Angle::atan2(l, w)),
            (ModuleId::LeftRear, Angle::atan2(-l, w)),
            (ModuleId::RightRear, Angle::atan2(-l, -w)),
        ];

        let delta_tics = match self.heading.heading() {
            Some(heading_rad) => {
                (target_heading_rad - heading_rad) * self.params.drive_pos_tics_per_rad
            }
            None => {
                warn!("Heading unavailable, modules will be pointed but not driven");
                0.0
            }
        };

        for (id, direction) in directions.iter() {
            self.modules[id.index()].set_direction_and_distance(*direction, delta_tics);
        }

        self.chassis_cmd = ChassisCommand::default();

        Ok(())
    }

    /// Set the robot's position on the field, anchoring the heading tracker to `heading_rad`.
    pub fn set_field_position(&mut self, x_m: f64, y_m: f64, heading_rad: f64) {
        self.reanchor_heading(heading_rad);

        self.odometry.field_pos_m = Vector2::new(x_m, y_m);
        self.odometry.last_cmd = self.chassis_cmd;
        self.odometry.last_time_s = None;

        info!(
            "Field position set to ({:.3}, {:.3}) m, heading {:.4} rad",
            x_m, y_m, heading_rad
        );
    }

    /// Anchor the heading tracker to `heading_rad`, keeping the odometry heading in step.
    pub fn reanchor_heading(&mut self, heading_rad: f64) {
        self.heading.reanchor(heading_rad);

        self.odometry.field_heading_rad = heading_rad;
        self.odometry.last_heading_rad = heading_rad;
    }
}
