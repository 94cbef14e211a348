//! # Swerve Executable Parameters
//!
//! This module provide parameters for the swerve executables.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecParams {
    /// Target period of one cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of cycles after which the run is aborted if the path has not completed.
    pub max_num_cycles: u64,
}

impl Default for ExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.02,
            max_num_cycles: 15_000,
        }
    }
}
