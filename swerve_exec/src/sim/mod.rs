//! # Simulated equipment
//!
//! Ideal implementations of the equipment traits. Every simulated item is a cheap handle onto
//! shared state, so a clone can be kept by a test or by the [`SimRig`] to inspect what the control
//! modules commanded and to advance the simulation.
//!
//! The simulation is single threaded, handles must not be sent between threads.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use log::debug;

use util::{maths, time::Clock};

use crate::drive_ctrl::{Drivetrain, ModuleId, Params, NUM_MODULES};
use crate::eqpt::{AbsolutePositionSensor, Actuator, InertialSensor};
use crate::swerve_module::SwerveModule;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of commands a simulated actuator remembers, older ones are discarded.
pub const MAX_RECORDED_COMMANDS: usize = 256;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An ideal actuator.
///
/// Position commands are reached immediately, velocity commands are integrated into the position
/// by [`SimActuator::advance`].
#[derive(Debug, Clone, Default)]
pub struct SimActuator {
    state: Rc<RefCell<SimActuatorState>>,
}

/// State of a simulated actuator.
#[derive(Debug, Clone, Default)]
pub struct SimActuatorState {
    /// Units: encoder tics (one tic per motor revolution)
    pub position: f64,

    /// Units: motor RPM
    pub velocity: f64,

    /// The latest commands received, oldest first, at most `MAX_RECORDED_COMMANDS`.
    pub commands: VecDeque<ActuatorCmd>,
}

/// An absolute position sensor which can be made to fail a number of reads.
#[derive(Debug, Clone)]
pub struct SimAbsEncoder {
    position_rad: f64,
    invalid_reads: Rc<Cell<u32>>,
    num_reads: Rc<Cell<u32>>,
}

/// A simulated inertial sensor.
///
/// Every change of attitude made through the handle counts as a new sensor update.
#[derive(Debug, Clone, Default)]
pub struct SimImu {
    state: Rc<RefCell<SimImuState>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimImuState {
    yaw_deg: f64,
    pitch_deg: f64,
    roll_deg: f64,
    update_count: u64,
}

/// A clock which only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_s: Rc<Cell<f64>>,
}

/// Handles onto all the simulated equipment of a drivetrain.
pub struct SimRig {
    pub drive: [SimActuator; NUM_MODULES],
    pub steer: [SimActuator; NUM_MODULES],
    pub imu: SimImu,

    max_rotation_rate_rads: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command received by a simulated actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCmd {
    Velocity(f64),
    Position(f64),
    ResetPosition(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SimActuatorState {
        self.state.borrow().clone()
    }

    pub fn commands(&self) -> Vec<ActuatorCmd> {
        self.state.borrow().commands.iter().copied().collect()
    }

    pub fn last_command(&self) -> Option<ActuatorCmd> {
        self.state.borrow().commands.back().copied()
    }

    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    /// Integrate the commanded velocity over `dt_s` seconds.
    pub fn advance(&self, dt_s: f64) {
        let mut state = self.state.borrow_mut();
        state.position += state.velocity / 60.0 * dt_s;
    }
}

impl SimActuatorState {
    fn record(&mut self, cmd: ActuatorCmd) {
        if self.commands.len() >= MAX_RECORDED_COMMANDS {
            self.commands.pop_front();
        }
        self.commands.push_back(cmd);
    }
}

impl Actuator for SimActuator {
    fn set_velocity(&mut self, rate: f64) {
        let mut state = self.state.borrow_mut();
        state.velocity = rate;
        state.record(ActuatorCmd::Velocity(rate));
    }

    fn set_position(&mut self, tics: f64) {
        let mut state = self.state.borrow_mut();
        state.velocity = 0.0;
        state.position = tics;
        state.record(ActuatorCmd::Position(tics));
    }

    fn position(&self) -> f64 {
        self.state.borrow().position
    }

    fn velocity(&self) -> f64 {
        self.state.borrow().velocity
    }

    fn reset_position(&mut self, tics: f64) {
        let mut state = self.state.borrow_mut();
        state.position = tics;
        state.record(ActuatorCmd::ResetPosition(tics));
    }
}

impl SimAbsEncoder {
    pub fn new(position_rad: f64) -> Self {
        Self::with_invalid_reads(position_rad, 0)
    }

    /// An encoder which returns an out of range value for the first `invalid_reads` reads.
    pub fn with_invalid_reads(position_rad: f64, invalid_reads: u32) -> Self {
        Self {
            position_rad,
            invalid_reads: Rc::new(Cell::new(invalid_reads)),
            num_reads: Rc::new(Cell::new(0)),
        }
    }

    /// Total number of reads made so far.
    pub fn num_reads(&self) -> u32 {
        self.num_reads.get()
    }
}

impl AbsolutePositionSensor for SimAbsEncoder {
    fn position(&self) -> f64 {
        self.num_reads.set(self.num_reads.get() + 1);

        let invalid = self.invalid_reads.get();
        if invalid > 0 {
            self.invalid_reads.set(invalid - 1);
            -1.0
        } else {
            self.position_rad
        }
    }
}

impl SimImu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the yaw, wrapping into [-180, 180].
    pub fn set_yaw(&self, yaw_deg: f64) {
        let mut state = self.state.borrow_mut();
        state.yaw_deg = maths::wrap_pi(yaw_deg.to_radians()).to_degrees();
        state.update_count += 1;
    }

    /// Rotate the yaw by `delta_deg`.
    pub fn rotate(&self, delta_deg: f64) {
        let yaw_deg = self.state.borrow().yaw_deg;
        self.set_yaw(yaw_deg + delta_deg);
    }

    pub fn set_pitch_roll(&self, pitch_deg: f64, roll_deg: f64) {
        let mut state = self.state.borrow_mut();
        state.pitch_deg = pitch_deg;
        state.roll_deg = roll_deg;
        state.update_count += 1;
    }

    /// Produce a new sensor update without changing the attitude.
    pub fn tick(&self) {
        self.state.borrow_mut().update_count += 1;
    }
}

impl InertialSensor for SimImu {
    fn yaw(&self) -> f64 {
        self.state.borrow().yaw_deg
    }

    fn pitch(&self) -> f64 {
        self.state.borrow().pitch_deg
    }

    fn roll(&self) -> f64 {
        self.state.borrow().roll_deg
    }

    fn update_count(&self) -> u64 {
        self.state.borrow().update_count
    }
}

impl ManualClock {
    pub fn new(now_s: f64) -> Self {
        Self {
            now_s: Rc::new(Cell::new(now_s)),
        }
    }

    pub fn advance(&self, dt_s: f64) {
        self.now_s.set(self.now_s.get() + dt_s);
    }

    pub fn set(&self, now_s: f64) {
        self.now_s.set(now_s);
    }
}

impl Clock for ManualClock {
    fn now_s(&self) -> f64 {
        self.now_s.get()
    }
}

impl SimRig {
    /// Build a drivetrain on top of simulated equipment, returning handles to the equipment.
    ///
    /// The calibration sensors report each module's calibration offset so every module starts
    /// pointing straight forward.
    pub fn build(params: Params) -> (Self, Drivetrain) {
        let drive = [
            SimActuator::new(),
            SimActuator::new(),
            SimActuator::new(),
            SimActuator::new(),
        ];
        let steer = [
            SimActuator::new(),
            SimActuator::new(),
            SimActuator::new(),
            SimActuator::new(),
        ];
        let imu = SimImu::new();

        let make_module = |id: ModuleId| {
            let module_params = params.module_params(id);
            SwerveModule::new(
                Box::new(drive[id.index()].clone()),
                Box::new(steer[id.index()].clone()),
                Box::new(SimAbsEncoder::new(module_params.calibration_offset_rad)),
                module_params,
            )
        };

        let modules = [
            make_module(ModuleId::RightFront),
            make_module(ModuleId::LeftFront),
            make_module(ModuleId::LeftRear),
            make_module(ModuleId::RightRear),
        ];

        let rig = Self {
            drive,
            steer,
            imu: imu.clone(),
            max_rotation_rate_rads: params.max_rotation_rate_rads(),
        };

        debug!("Simulated drivetrain built");

        (rig, Drivetrain::new(params, modules, Box::new(imu)))
    }

    /// Advance the simulation by `dt_s` seconds using the drivetrain's current chassis command.
    ///
    /// The drive actuators integrate their commanded rates and the robot yaws at the commanded
    /// fraction of the maximum rotation rate.
    pub fn advance(&self, dt_s: f64, drive: &Drivetrain) {
        for actuator in self.drive.iter() {
            actuator.advance(dt_s);
        }

        let rotation = drive.chassis_command().rotation;
        self.imu
            .rotate((rotation * self.max_rotation_rate_rads * dt_s).to_degrees());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_log_is_bounded() {
        let actuator = SimActuator::new();
        let mut handle: Box<dyn Actuator> = Box::new(actuator.clone());

        for i in 0..(2 * MAX_RECORDED_COMMANDS) {
            handle.set_velocity(i as f64);
        }

        let cmds = actuator.commands();
        assert_eq!(cmds.len(), MAX_RECORDED_COMMANDS);
        assert_eq!(cmds[0], ActuatorCmd::Velocity(MAX_RECORDED_COMMANDS as f64));
        assert_eq!(
            actuator.last_command(),
            Some(ActuatorCmd::Velocity((2 * MAX_RECORDED_COMMANDS - 1) as f64))
        );
        assert_eq!(actuator.snapshot().velocity, (2 * MAX_RECORDED_COMMANDS - 1) as f64);
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new(1.0);
        let other = clock.clone();
        other.advance(0.5);
        assert_eq!(clock.now_s(), 1.5);
        clock.set(3.0);
        assert_eq!(other.now_s(), 3.0);
    }
}
