//! # Equipment interfaces
//!
//! The control modules never talk to hardware directly, instead they command and read the
//! traits in this module. Implementations exist for the simulation in [`crate::sim`].
//!
//! All methods are infallible from the point of view of the control modules. Equipment which
//! cannot be read reports its last known value, staleness of the inertial sensor is detected from
//! its update counter.

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A motor with an integrated relative encoder and closed loop controller.
pub trait Actuator {
    /// Command the actuator to run at the given rate.
    ///
    /// Units: motor RPM
    fn set_velocity(&mut self, rate: f64);

    /// Command the actuator to hold the given encoder position.
    ///
    /// Units: encoder tics
    fn set_position(&mut self, tics: f64);

    /// Current encoder position.
    ///
    /// Units: encoder tics
    fn position(&self) -> f64;

    /// Current encoder velocity.
    ///
    /// Units: motor RPM
    fn velocity(&self) -> f64;

    /// Overwrite the encoder's position without moving the actuator.
    ///
    /// Units: encoder tics
    fn reset_position(&mut self, tics: f64);
}

/// An absolute position sensor used to calibrate a steering actuator.
pub trait AbsolutePositionSensor {
    /// Absolute position of the sensor. Valid readings are in [0, 2pi), anything else is a
    /// read failure.
    ///
    /// Units: radians
    fn position(&self) -> f64;
}

/// An inertial measurement unit reporting the attitude of the robot.
pub trait InertialSensor {
    /// Yaw in the range [-180, 180].
    ///
    /// Units: degrees
    fn yaw(&self) -> f64;

    /// Units: degrees
    fn pitch(&self) -> f64;

    /// Units: degrees
    fn roll(&self) -> f64;

    /// Monotonic counter incremented every time the sensor produces new data.
    fn update_count(&self) -> u64;
}
