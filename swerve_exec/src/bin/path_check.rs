//! # Path Check
//!
//! This binary runs a keyframe path through the swerve control loop on a manual clock, as fast as
//! possible, and prints a summary of the run. It allows paths to be checked without waiting for
//! the real-time executable.
//!
//! Usage: `path_check <path.json> [--json]`
//!
//! Parameters are loaded from `$SWERVE_SW_ROOT/params` if it is set, otherwise the defaults are
//! used.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::env;

use color_eyre::{
    eyre::{eyre, WrapErr},
    Report, Result,
};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use swerve_lib::{
    auto::{keyframe::KeyframePath, PathExecParams},
    drive_ctrl::Params,
    params::ExecParams,
    runner::PathRunner,
    sim::ManualClock,
};
use util::{
    host,
    logger::{logger_init_stdout, LevelFilter},
    session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    session::init_epoch().wrap_err("Failed to initialise the session epoch")?;
    logger_init_stdout(LevelFilter::Info).wrap_err("Failed to initialise logging")?;

    info!("Path Check\n");

    // ---- ARGUMENTS ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let (path_file, as_json) = match args.as_slice() {
        [_, path] => (path, false),
        [_, path, flag] if flag == "--json" => (path, true),
        _ => return Err(eyre!("Usage: path_check <path.json> [--json]")),
    };

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams = load_or_default("swerve_exec.toml")?;
    let drive_params: Params = load_or_default("drive_ctrl.toml")?;
    let path_exec_params: PathExecParams = load_or_default("path_exec.toml")?;

    // ---- LOAD PATH ----

    let path = KeyframePath::load(path_file).wrap_err("Failed to load path")?;
    info!(
        "Loaded path with {} keyframes and {} actions",
        path.keyframes().len(),
        path.num_actions()
    );

    // ---- RUN ----

    let clock = ManualClock::new(0.0);
    let mut runner = PathRunner::new(drive_params, path_exec_params, Box::new(path));

    if let Err(e) = runner.start(&clock) {
        runner.finish(true, &clock);
        return Err(Report::new(e).wrap_err("Failed to start the path"));
    }

    let mut interrupted = true;
    for _ in 0..exec_params.max_num_cycles {
        let done = match runner.cycle(&clock, exec_params.cycle_period_s) {
            Ok(d) => d,
            Err(e) => {
                runner.finish(true, &clock);
                return Err(Report::new(e).wrap_err("Error during cycle processing"));
            }
        };
        clock.advance(exec_params.cycle_period_s);

        if done {
            interrupted = false;
            break;
        }
    }

    if interrupted {
        warn!(
            "Maximum number of cycles ({}) reached before the end of the path",
            exec_params.max_num_cycles
        );
    }

    runner.finish(interrupted, &clock);

    // ---- SUMMARY ----

    let summary = runner.summary(&clock);

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).wrap_err("Failed to serialise the summary")?
        );
    } else {
        println!("{}", summary);
    }

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load a parameter file, or use the defaults if the software root is not set.
fn load_or_default<P>(file: &str) -> Result<P>
where
    P: DeserializeOwned + Default,
{
    if host::get_sw_root().is_err() {
        debug!("Software root not set, using default parameters for {}", file);
        return Ok(P::default());
    }

    util::params::load(file).wrap_err_with(|| format!("Could not load {}", file))
}
