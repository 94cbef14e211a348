//! # Heading tracking
//!
//! The inertial sensor reports yaw in [-180, 180] degrees, jumping by a full revolution whenever
//! the robot turns through the back. [`HeadingTracker`] counts those jumps to produce a continuous
//! heading which can grow without bound, relative to a field heading given when the tracker is
//! anchored.
//!
//! An expected heading is kept alongside the measured one. Drivers which are not commanding a
//! rotation use the difference between the two to hold the robot's orientation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, TAU};

use log::{debug, trace};
use serde::Serialize;

use util::{angle::Angle, maths};

use crate::eqpt::InertialSensor;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Limit on the magnitude of the heading hold correction, before scaling by speed.
pub const HOLD_CORRECTION_LIMIT: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tracks the continuous heading of the robot from an inertial sensor.
pub struct HeadingTracker {
    imu: Box<dyn InertialSensor>,

    state: HeadingState,

    /// Sensor update counter at the last update
    last_update_count: u64,

    /// Whether the sensor produced new data at the last update
    fresh: bool,

    mode: TrackingMode,
}

/// Internal state of the heading tracker.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HeadingState {
    pub raw_last_yaw: Angle,
    pub revolutions: i64,

    /// Units: radians, unbounded
    pub heading_rad: f64,

    /// Units: radians, unbounded
    pub expected_heading_rad: f64,

    pub ref_yaw: Angle,
    pub ref_pitch: Angle,
    pub ref_roll: Angle,

    /// Field heading at the time the tracker was anchored.
    ///
    /// Units: radians, unbounded
    pub ref_heading_rad: f64,
}

/// Heading and expected heading at the last update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadingInfo {
    pub heading_rad: f64,
    pub expected_heading_rad: f64,

    /// True if the expected heading is following the measured heading.
    pub expected_tracking_current: bool,
}

/// Attitude of the robot relative to the anchored reference, plus the raw sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NavInfo {
    pub pitch: Angle,
    pub yaw: Angle,
    pub roll: Angle,
    pub raw_pitch: Angle,
    pub raw_yaw: Angle,
    pub raw_roll: Angle,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the expected heading behaves on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackingMode {
    /// The expected heading is left alone, so the robot can be held at it.
    Hold,

    /// The expected heading follows the measured heading.
    FollowCurrent,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for HeadingState {
    fn default() -> Self {
        Self {
            raw_last_yaw: Angle::ZERO,
            revolutions: 0,
            heading_rad: 0.0,
            expected_heading_rad: 0.0,
            ref_yaw: Angle::ZERO,
            ref_pitch: Angle::ZERO,
            ref_roll: Angle::ZERO,
            ref_heading_rad: 0.0,
        }
    }
}

impl HeadingTracker {
    /// Create a new tracker anchored to a field heading of zero.
    ///
    /// Queries return `None` until the sensor produces its first new reading.
    pub fn new(imu: Box<dyn InertialSensor>) -> Self {
        let last_update_count = imu.update_count();

        let mut tracker = Self {
            imu,
            state: HeadingState::default(),
            last_update_count,
            fresh: false,
            mode: TrackingMode::Hold,
        };
        tracker.reanchor(0.0);

        tracker
    }

    /// Recompute the heading from the latest sensor reading.
    ///
    /// Should be called once per cycle.
    pub fn update(&mut self, mode: TrackingMode) {
        self.mode = mode;

        let count = self.imu.update_count();
        self.fresh = count > self.last_update_count;
        self.last_update_count = count;

        let raw = Angle::from_degrees(self.imu.yaw());
        let raw_last = self.state.raw_last_yaw;

        // Detect passing through the +/-180 discontinuity. Checking that the last reading was
        // near it keeps slow motion through zero from counting.
        if raw_last < Angle::NEG_PI_OVER_2 && raw > Angle::ZERO {
            self.state.revolutions -= 1;
            trace!("Heading revolutions decremented to {}", self.state.revolutions);
        } else if raw_last > Angle::PI_OVER_2 && raw < Angle::ZERO {
            self.state.revolutions += 1;
            trace!("Heading revolutions incremented to {}", self.state.revolutions);
        }

        self.state.raw_last_yaw = raw;
        self.state.heading_rad = self.state.revolutions as f64 * TAU + raw.radians()
            - self.state.ref_yaw.radians()
            + self.state.ref_heading_rad;

        if mode == TrackingMode::FollowCurrent {
            self.state.expected_heading_rad = self.state.heading_rad;
        }
    }

    /// Anchor the tracker so that the robot's current attitude corresponds to `field_heading_rad`.
    pub fn reanchor(&mut self, field_heading_rad: f64) {
        self.state = HeadingState {
            raw_last_yaw: Angle::ZERO,
            revolutions: 0,
            heading_rad: field_heading_rad,
            expected_heading_rad: field_heading_rad,
            ref_yaw: Angle::from_degrees(self.imu.yaw()),
            ref_pitch: Angle::from_degrees(self.imu.pitch()),
            ref_roll: Angle::from_degrees(self.imu.roll()),
            ref_heading_rad: field_heading_rad,
        };

        debug!(
            "Heading anchored to {:.4} rad (reference yaw {})",
            field_heading_rad, self.state.ref_yaw
        );
    }

    /// Continuous heading of the robot, or `None` if the sensor data is stale.
    ///
    /// Units: radians
    pub fn heading(&self) -> Option<f64> {
        self.when_fresh(self.state.heading_rad)
    }

    /// Units: radians
    pub fn expected_heading(&self) -> Option<f64> {
        self.when_fresh(self.state.expected_heading_rad)
    }

    pub fn heading_info(&self) -> Option<HeadingInfo> {
        self.when_fresh(HeadingInfo {
            heading_rad: self.state.heading_rad,
            expected_heading_rad: self.state.expected_heading_rad,
            expected_tracking_current: self.mode == TrackingMode::FollowCurrent,
        })
    }

    /// Current attitude relative to the anchored reference, or `None` if the sensor data is
    /// stale.
    pub fn nav_info(&self) -> Option<NavInfo> {
        if !self.fresh {
            return None;
        }

        let raw_pitch = Angle::from_degrees(self.imu.pitch());
        let raw_yaw = Angle::from_degrees(self.imu.yaw());
        let raw_roll = Angle::from_degrees(self.imu.roll());

        Some(NavInfo {
            pitch: raw_pitch - self.state.ref_pitch,
            yaw: raw_yaw - self.state.ref_yaw,
            roll: raw_roll - self.state.ref_roll,
            raw_pitch,
            raw_yaw,
            raw_roll,
        })
    }

    /// Rotation request which turns the robot back towards the expected heading.
    ///
    /// The correction is `(expected - heading) * gain`, limited to +/-0.5 and scaled by the
    /// driver's `speed`. Zero if the heading is unavailable.
    pub fn hold_rotation(&self, speed: f64, gain: f64) -> f64 {
        match self.heading_info() {
            Some(info) => {
                let correction = (info.expected_heading_rad - info.heading_rad) * gain;
                maths::clamp(
                    &correction,
                    &-HOLD_CORRECTION_LIMIT,
                    &HOLD_CORRECTION_LIMIT,
                ) * speed
            }
            None => 0.0,
        }
    }

    /// Units: radians
    pub fn increment_expected_heading(&mut self, delta_rad: f64) {
        self.state.expected_heading_rad += delta_rad;
    }

    pub fn set_expected_to_current(&mut self) {
        self.state.expected_heading_rad = self.state.heading_rad;
    }

    pub fn revolutions(&self) -> i64 {
        self.state.revolutions
    }

    pub fn is_available(&self) -> bool {
        self.fresh
    }

    pub fn state(&self) -> &HeadingState {
        &self.state
    }

    fn when_fresh<T>(&self, value: T) -> Option<T> {
        if self.fresh {
            Some(value)
        } else {
            None
        }
    }
}
