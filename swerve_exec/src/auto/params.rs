//! # Path execution parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for path execution
#[derive(Debug, Deserialize, Clone)]
pub struct PathExecParams {
    /// Gain applied to the difference between the path's field heading and the measured heading
    /// to give the rotation correction.
    pub orientation_k_p: f64,
}

impl Default for PathExecParams {
    fn default() -> Self {
        Self {
            orientation_k_p: 0.3,
        }
    }
}
