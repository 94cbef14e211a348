//! Implementations for the Drivetrain state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{ChassisCommand, DriveCtrlError, ModuleId, Params, NUM_MODULES};
use crate::{
    eqpt::InertialSensor,
    heading::{HeadingTracker, TrackingMode},
    swerve_module::SwerveModule,
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The drivetrain: four swerve modules, the heading tracker and the field odometry.
///
/// There is exactly one drivetrain, it is passed by reference to whatever needs to drive.
pub struct Drivetrain {
    pub(crate) params: Params,

    /// Modules in `ModuleId` order
    pub(crate) modules: [SwerveModule; NUM_MODULES],

    pub(crate) heading: HeadingTracker,

    pub(crate) odometry: Odometry,

    /// The chassis motion currently commanded
    pub(crate) chassis_cmd: ChassisCommand,

    pub(crate) report: StatusReport,

    tm: DriveTm,
    arch_tm: Archiver,
}

/// Dead-reckoning estimate of the robot's position on the field.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Odometry {
    /// Units: meters
    pub(crate) field_pos_m: Vector2<f64>,

    /// Units: radians
    pub(crate) field_heading_rad: f64,

    /// Heading at the previous update.
    pub(crate) last_heading_rad: f64,

    /// Chassis command at the previous update.
    pub(crate) last_cmd: ChassisCommand,

    /// Time of the previous update, `None` if no update since the position was set.
    pub(crate) last_time_s: Option<f64>,
}

/// Input data to the drivetrain's cyclic processing.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// How the expected heading behaves this cycle.
    pub tracking_mode: TrackingMode,

    /// Current time.
    ///
    /// Units: seconds
    pub now_s: f64,
}

/// Status report for drivetrain processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// The inertial sensor produced new data this cycle.
    pub heading_available: bool,

    /// The last chassis request exceeded the module speed limit and was scaled down.
    pub speed_normalised: bool,
}

/// Drivetrain telemetry, one record per cycle.
///
/// Flat so it can be written as a CSV row.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DriveTm {
    pub time_s: f64,

    pub heading_rad: Option<f64>,
    pub expected_heading_rad: Option<f64>,
    pub revolutions: i64,

    pub field_x_m: f64,
    pub field_y_m: f64,
    pub field_heading_rad: f64,

    pub forward: f64,
    pub strafe: f64,
    pub rotation: f64,

    pub rf_direction_rad: f64,
    pub rf_speed: f64,
    pub rf_steer_tics: f64,
    pub lf_direction_rad: f64,
    pub lf_speed: f64,
    pub lf_steer_tics: f64,
    pub lr_direction_rad: f64,
    pub lr_speed: f64,
    pub lr_steer_tics: f64,
    pub rr_direction_rad: f64,
    pub rr_speed: f64,
    pub rr_steer_tics: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Odometry {
    fn default() -> Self {
        Self {
            field_pos_m: Vector2::zeros(),
            field_heading_rad: 0.0,
            last_heading_rad: 0.0,
            last_cmd: ChassisCommand::default(),
            last_time_s: None,
        }
    }
}

impl Drivetrain {
    /// Create a new drivetrain from calibrated modules (in `ModuleId` order) and the inertial
    /// sensor.
    pub fn new(
        params: Params,
        modules: [SwerveModule; NUM_MODULES],
        imu: Box<dyn InertialSensor>,
    ) -> Self {
        debug!(
            "Drivetrain created: {:.4} m x {:.4} m, max speed {:.2} m/s, max rotation rate {:.3} rad/s",
            params.length_m,
            params.width_m,
            params.max_speed_ms,
            params.max_rotation_rate_rads()
        );

        Self {
            params,
            modules,
            heading: HeadingTracker::new(imu),
            odometry: Odometry::default(),
            chassis_cmd: ChassisCommand::default(),
            report: StatusReport::default(),
            tm: DriveTm::default(),
            arch_tm: Archiver::default(),
        }
    }

    /// Start archiving telemetry into the session's archive directory.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), ArchiveError> {
        let mut arch_path = session.arch_root.clone();
        arch_path.push("drive_ctrl");
        std::fs::create_dir_all(arch_path).map_err(ArchiveError::FileError)?;

        self.arch_tm = Archiver::from_path(session, "drive_ctrl/drive_tm.csv")?;

        Ok(())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn module(&self, id: ModuleId) -> &SwerveModule {
        &self.modules[id.index()]
    }

    pub fn heading(&self) -> &HeadingTracker {
        &self.heading
    }

    pub fn heading_mut(&mut self) -> &mut HeadingTracker {
        &mut self.heading
    }

    /// The chassis motion currently commanded, after normalisation.
    pub fn chassis_command(&self) -> ChassisCommand {
        self.chassis_cmd
    }

    /// Estimated position on the field.
    ///
    /// Units: meters
    pub fn field_position(&self) -> Vector2<f64> {
        self.odometry.field_pos_m
    }

    /// Heading at the last odometry update.
    ///
    /// Units: radians
    pub fn field_heading(&self) -> f64 {
        self.odometry.field_heading_rad
    }

    /// Latest telemetry record.
    pub fn tm(&self) -> &DriveTm {
        &self.tm
    }

    /// Advance the dead-reckoning estimate to `now_s`.
    ///
    /// The robot is assumed to have moved at the average of the last and current chassis
    /// commands, along the average of the last and current headings.
    fn update_odometry(&mut self, now_s: f64) {
        let odo = &mut self.odometry;

        let current_heading_rad = self.heading.heading().unwrap_or(odo.last_heading_rad);
        let ave_heading_rad = 0.5 * (current_heading_rad + odo.last_heading_rad);
        let ave_forward = 0.5 * (odo.last_cmd.forward + self.chassis_cmd.forward);
        let ave_strafe = 0.5 * (odo.last_cmd.strafe + self.chassis_cmd.strafe);

        let dt_s = match odo.last_time_s {
            Some(t) => (now_s - t).max(0.0),
            None => 0.0,
        };
        let max_dist_m = self.params.max_speed_ms * dt_s;

        let (sin, cos) = ave_heading_rad.sin_cos();
        odo.field_pos_m += Vector2::new(
            ave_forward * sin + ave_strafe * cos,
            ave_forward * cos - ave_strafe * sin,
        ) * max_dist_m;

        odo.last_heading_rad = current_heading_rad;
        odo.field_heading_rad = current_heading_rad;
        odo.last_cmd = self.chassis_cmd;
        odo.last_time_s = Some(now_s);
    }

    /// Build the telemetry record for the current state.
    fn build_tm(&self, now_s: f64) -> DriveTm {
        let m = |id: ModuleId| {
            let module = &self.modules[id.index()];
            (
                module.last_direction().radians(),
                module.last_normalised_speed(),
                module.last_steer_position(),
            )
        };
        let (rf_direction_rad, rf_speed, rf_steer_tics) = m(ModuleId::RightFront);
        let (lf_direction_rad, lf_speed, lf_steer_tics) = m(ModuleId::LeftFront);
        let (lr_direction_rad, lr_speed, lr_steer_tics) = m(ModuleId::LeftRear);
        let (rr_direction_rad, rr_speed, rr_steer_tics) = m(ModuleId::RightRear);

        DriveTm {
            time_s: now_s,
            heading_rad: self.heading.heading(),
            expected_heading_rad: self.heading.expected_heading(),
            revolutions: self.heading.revolutions(),
            field_x_m: self.odometry.field_pos_m.x,
            field_y_m: self.odometry.field_pos_m.y,
            field_heading_rad: self.odometry.field_heading_rad,
            forward: self.chassis_cmd.forward,
            strafe: self.chassis_cmd.strafe,
            rotation: self.chassis_cmd.rotation,
            rf_direction_rad,
            rf_speed,
            rf_steer_tics,
            lf_direction_rad,
            lf_speed,
            lf_steer_tics,
            lr_direction_rad,
            lr_speed,
            lr_steer_tics,
            rr_direction_rad,
            rr_speed,
            rr_steer_tics,
        }
    }
}

impl State for Drivetrain {
    type InputData = InputData;
    type OutputData = DriveTm;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Perform the periodic processing of the drivetrain.
    ///
    /// Updates the heading from the inertial sensor, then the field odometry.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        if !input_data.now_s.is_finite() {
            return Err(DriveCtrlError::NonFiniteTime(input_data.now_s));
        }

        self.heading.update(input_data.tracking_mode);
        self.report.heading_available = self.heading.is_available();

        self.update_odometry(input_data.now_s);

        self.tm = self.build_tm(input_data.now_s);

        trace!(
            "Drivetrain: heading {:?}, field position ({:.3}, {:.3})",
            self.tm.heading_rad,
            self.tm.field_x_m,
            self.tm.field_y_m
        );

        Ok((self.tm, self.report))
    }
}

impl Archived for Drivetrain {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_tm.serialise(self.tm)
    }
}
