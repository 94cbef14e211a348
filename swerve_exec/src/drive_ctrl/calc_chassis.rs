//! Chassis inverse kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use super::{
    ChassisCommand, DriveCtrlError, Drivetrain, ModuleId, Params, NUM_MODULES,
    STOPPED_SPEED_THRESHOLD,
};
use util::{angle::Angle, maths};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Direction and normalised speed for one module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleTarget {
    pub direction: Angle,
    pub speed: f64,
}

/// Module targets for a chassis request.
#[derive(Debug, Clone, Copy)]
pub struct ChassisTargets {
    /// Targets in `ModuleId` order.
    pub modules: [ModuleTarget; NUM_MODULES],

    /// The chassis motion the targets achieve, after normalisation.
    pub chassis: ChassisCommand,

    /// True if the request exceeded the module speed limit and was scaled down.
    pub normalised: bool,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the module directions and speeds which produce the requested chassis motion.
///
/// If any module would need to exceed a normalised speed of 1.0 all speeds are scaled down by
/// the same factor. Modules which end up (almost) stopped keep their entry in `last_directions`.
pub fn compute_module_targets(
    forward: f64,
    strafe: f64,
    rotation: f64,
    params: &Params,
    last_directions: &[Angle; NUM_MODULES],
) -> ChassisTargets {
    let diagonal_m = params.diagonal_m();
    let length_over_diag = params.length_m / diagonal_m;
    let width_over_diag = params.width_m / diagonal_m;

    let a = strafe - rotation * length_over_diag;
    let b = strafe + rotation * length_over_diag;
    let c = forward - rotation * width_over_diag;
    let d = forward + rotation * width_over_diag;

    // (strafe term, forward term) for each module in ModuleId order
    let components = [(b, c), (b, d), (a, d), (a, c)];

    let mut speeds = [0f64; NUM_MODULES];
    for (speed, (s, f)) in speeds.iter_mut().zip(components.iter()) {
        *speed = maths::length(*s, *f);
    }

    let mut chassis = ChassisCommand {
        forward,
        strafe,
        rotation,
    };
    let mut normalised = false;

    if let Some(max) = maths::max_of(&speeds) {
        if max > 1.0 {
            for speed in speeds.iter_mut() {
                *speed /= max;
            }
            chassis.forward /= max;
            chassis.strafe /= max;
            chassis.rotation /= max;
            normalised = true;
        }
    }

    let mut modules = [ModuleTarget {
        direction: Angle::ZERO,
        speed: 0.0,
    }; NUM_MODULES];

    for id in ModuleId::ALL.iter() {
        let i = id.index();
        let (s, f) = components[i];

        modules[i] = ModuleTarget {
            direction: if speeds[i] > STOPPED_SPEED_THRESHOLD {
                Angle::atan2(s, f)
            } else {
                last_directions[i]
            },
            speed: speeds[i],
        };
    }

    ChassisTargets {
        modules,
        chassis,
        normalised,
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Drivetrain {
    /// Drive the chassis with robot-relative components.
    ///
    /// `forward`, `strafe` and `rotation` are nominally in [-1, 1], requests which would exceed
    /// the module speed limit are scaled down.
    pub fn drive_components(
        &mut self,
        forward: f64,
        strafe: f64,
        rotation: f64,
    ) -> Result<(), DriveCtrlError> {
        check_finite(forward, strafe, rotation)?;
        self.set_modules_for_chassis_motion(forward, strafe, rotation, true);
        Ok(())
    }

    /// Steer the modules for the given chassis motion without driving, then wait for the
    /// steering to settle.
    ///
    /// Used before starting a motion from rest so the robot does not drift while the modules
    /// turn.
    pub fn prepare_for_drive_components(
        &mut self,
        forward: f64,
        strafe: f64,
        rotation: f64,
    ) -> Result<(), DriveCtrlError> {
        check_finite(forward, strafe, rotation)?;
        self.set_modules_for_chassis_motion(forward, strafe, rotation, false);

        if self.params.prepare_settle_time_s > 0.0 {
            std::thread::sleep(std::time::Duration::from_secs_f64(
                self.params.prepare_settle_time_s,
            ));
        }

        Ok(())
    }

    /// Drive the chassis in a robot-relative direction.
    pub fn drive(
        &mut self,
        chassis_direction: Angle,
        speed: f64,
        rotation: f64,
    ) -> Result<(), DriveCtrlError> {
        self.drive_components(
            chassis_direction.cos() * speed,
            chassis_direction.sin() * speed,
            rotation,
        )
    }

    /// Command zero chassis motion, keeping the current module directions.
    pub fn stop(&mut self) {
        self.set_modules_for_chassis_motion(0.0, 0.0, 0.0, true);
    }

    /// Send the targets for a chassis motion to the modules.
    ///
    /// If `set_speeds` is false the modules are only steered and the drives are stopped.
    pub(crate) fn set_modules_for_chassis_motion(
        &mut self,
        forward: f64,
        strafe: f64,
        rotation: f64,
        set_speeds: bool,
    ) {
        let mut last_directions = [Angle::ZERO; NUM_MODULES];
        for (dir, module) in last_directions.iter_mut().zip(self.modules.iter()) {
            *dir = module.last_direction();
        }

        let targets =
            compute_module_targets(forward, strafe, rotation, &self.params, &last_directions);

        for (module, target) in self.modules.iter_mut().zip(targets.modules.iter()) {
            let speed = if set_speeds { target.speed } else { 0.0 };
            module.set_direction_and_speed(target.direction, speed);
        }

        self.chassis_cmd = if set_speeds {
            targets.chassis
        } else {
            ChassisCommand::default()
        };
        self.report.speed_normalised = targets.normalised;

        trace!(
            "Chassis request ({:.3}, {:.3}, {:.3}) -> {:?}",
            forward,
            strafe,
            rotation,
            targets.modules
        );
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_finite(forward: f64, strafe: f64, rotation: f64) -> Result<(), DriveCtrlError> {
    let cmd = ChassisCommand {
        forward,
        strafe,
        rotation,
    };

    if cmd.is_finite() {
        Ok(())
    } else {
        Err(DriveCtrlError::NonFiniteRequest {
            forward,
            strafe,
            rotation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    fn square() -> Params {
        Params {
            prepare_settle_time_s: 0.0,
            ..Params::default()
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_forward_only() {
        let t = compute_module_targets(1.0, 0.0, 0.0, &square(), &[Angle::ZERO; NUM_MODULES]);

        for m in t.modules.iter() {
            assert!(close(m.speed, 1.0));
            assert!(close(m.direction.radians(), 0.0));
        }
        assert!(!t.normalised);
        assert_eq!(t.chassis.forward, 1.0);
    }

    #[test]
    fn test_rotation_in_place() {
        let t = compute_module_targets(0.0, 0.0, 1.0, &square(), &[Angle::ZERO; NUM_MODULES]);

        // Every module is tangent to the circle through the corners
        for m in t.modules.iter() {
            assert!(close(m.speed, 1.0));
        }
        let rf = t.modules[ModuleId::RightFront.index()].direction.radians();
        let lf = t.modules[ModuleId::LeftFront.index()].direction.radians();
        let lr = t.modules[ModuleId::LeftRear.index()].direction.radians();
        let rr = t.modules[ModuleId::RightRear.index()].direction.radians();
        assert!(close(rf, 3.0 * FRAC_PI_4));
        assert!(close(lf, FRAC_PI_4));
        assert!(close(lr, -FRAC_PI_4));
        assert!(close(rr, -3.0 * FRAC_PI_4));
    }

    #[test]
    fn test_normalisation() {
        let t = compute_module_targets(1.0, 0.0, 1.0, &square(), &[Angle::ZERO; NUM_MODULES]);

        let max = maths::max_of(&[
            t.modules[0].speed,
            t.modules[1].speed,
            t.modules[2].speed,
            t.modules[3].speed,
        ])
        .unwrap();
        assert!(close(max, 1.0));
        assert!(t.normalised);

        // Forward and strafe are scaled by the same factor
        let raw_max = (0.5f64.sqrt()).hypot(1.0 + 0.5f64.sqrt());
        assert!(close(t.chassis.forward, 1.0 / raw_max));
        assert!(close(t.chassis.strafe, 0.0));
    }

    #[test]
    fn test_stopped_modules_keep_direction() {
        let last = [
            Angle::from_degrees(10.0),
            Angle::from_degrees(20.0),
            Angle::from_degrees(-30.0),
            Angle::from_degrees(170.0),
        ];
        let t = compute_module_targets(0.0, 0.0, 0.0, &square(), &last);

        for (m, l) in t.modules.iter().zip(last.iter()) {
            assert_eq!(m.speed, 0.0);
            assert_eq!(m.direction, *l);
        }

        // A tiny request is still treated as stopped
        let t = compute_module_targets(1e-7, 0.0, 0.0, &square(), &last);
        assert_eq!(t.modules[0].direction, last[0]);
    }

    #[test]
    fn test_strafe_direction() {
        let t = compute_module_targets(0.0, 0.5, 0.0, &square(), &[Angle::ZERO; NUM_MODULES]);

        for m in t.modules.iter() {
            assert!(close(m.speed, 0.5));
            assert!(close(m.direction.degrees(), 90.0));
        }
    }
}
