//! Main swerve executable entry point.
//!
//! # Architecture
//!
//! Follows a keyframe path with the swerve drive running on simulated equipment, in real time:
//!
//!     - Initialise the session, logging and parameters
//!     - Load the path given as the only argument
//!     - Main loop:
//!         - Drivetrain processing (heading, odometry, telemetry archive)
//!         - Path execution
//!         - Scheduled actions
//!         - Simulation step
//!         - Sleep until the end of the cycle
//!
//! The loop ends when the path completes or the maximum number of cycles is reached.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use swerve_lib::{
    auto::{keyframe::KeyframePath, PathExecParams},
    drive_ctrl::Params,
    params::ExecParams,
    runner::PathRunner,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::{self, Session},
    time::SessionClock,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("swerve_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Swerve Drive Executable\n");
    info!(
        "Session started at {}",
        session::get_epoch().wrap_err("Failed to get the session epoch")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams =
        util::params::load("swerve_exec.toml").wrap_err("Could not load exec params")?;
    let drive_params: Params =
        util::params::load("drive_ctrl.toml").wrap_err("Could not load drive control params")?;
    let path_exec_params: PathExecParams =
        util::params::load("path_exec.toml").wrap_err("Could not load path execution params")?;

    info!("Exec parameters loaded");

    // ---- LOAD PATH ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    if args.len() != 2 {
        return Err(eyre!(
            "Expected the path file as the only argument, found {} arguments",
            args.len() - 1
        ));
    }

    info!("Loading path from \"{}\"", &args[1]);

    let path = KeyframePath::load(&args[1]).wrap_err("Failed to load path")?;

    info!(
        "Loaded path lasts {:.02} s and contains {} actions\n",
        path.keyframes().last().map(|k| k.time_s).unwrap_or(0.0),
        path.num_actions()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut runner = PathRunner::new(drive_params, path_exec_params, Box::new(path));
    runner
        .init_archive(&session)
        .wrap_err("Failed to initialise the drivetrain archive")?;

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    let clock = SessionClock;
    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let mut interrupted = false;
    let mut num_cycles: u64 = 0;

    if let Err(e) = runner.start(&clock) {
        runner.finish(true, &clock);
        return Err(Report::new(e).wrap_err("Failed to start the path"));
    }

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        let done = match runner.cycle(&clock, exec_params.cycle_period_s) {
            Ok(d) => d,
            Err(e) => {
                // Leave the drivetrain stopped before bailing out
                runner.finish(true, &clock);
                return Err(Report::new(e).wrap_err("Error during cycle processing"));
            }
        };

        if done {
            break;
        }

        num_cycles += 1;
        if num_cycles >= exec_params.max_num_cycles {
            warn!(
                "Maximum number of cycles ({}) reached before the end of the path",
                exec_params.max_num_cycles
            );
            interrupted = true;
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }
    }

    runner.finish(interrupted, &clock);

    info!("{}", runner.summary(&clock));

    info!("End of execution");

    Ok(())
}
