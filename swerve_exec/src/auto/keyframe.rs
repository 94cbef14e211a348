//! # Keyframe paths
//!
//! A simple [`PathSampler`] reading a list of timed keyframes from JSON and interpolating
//! linearly between them:
//!
//! ```json
//! {
//!     "keyframes": [
//!         { "time_s": 0.0, "field_heading_rad": 0.0, "speed_forward_ms": 0.0,
//!           "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0,
//!           "action": { "name": "Wait", "action_type": "stop_and_run" } },
//!         { "time_s": 2.0, "field_heading_rad": 0.0, "speed_forward_ms": 1.0,
//!           "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0 }
//!     ]
//! }
//! ```
//!
//! Each keyframe's action is emitted once, on the first sample at or after the keyframe's time.
//! Actions are never skipped: a sample past the end of the path still emits any action not yet
//! emitted, and only returns `None` once they all have been.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{PathAction, PathPoint, PathSampler};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A path made of timed keyframes.
#[derive(Debug, Clone)]
pub struct KeyframePath {
    keyframes: Vec<Keyframe>,

    /// Whether each keyframe's action has been emitted
    emitted: Vec<bool>,
}

/// One keyframe of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Units: seconds from the start of the path
    pub time_s: f64,

    /// Units: radians, unbounded
    pub field_heading_rad: f64,

    /// Units: meters/second
    pub speed_forward_ms: f64,

    /// Units: meters/second
    pub speed_strafe_ms: f64,

    /// Units: radians/second
    pub speed_rotation_rads: f64,

    #[serde(default)]
    pub action: Option<PathAction>,
}

#[derive(Debug, Deserialize)]
struct KeyframeFile {
    keyframes: Vec<Keyframe>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur when loading a keyframe path.
#[derive(Debug, thiserror::Error)]
pub enum KeyframeError {
    #[error("Cannot read the path file: {0}")]
    FileError(std::io::Error),

    #[error("Cannot parse the path file: {0}")]
    ParseError(serde_json::Error),

    #[error("The path contains no keyframes")]
    Empty,

    #[error("Keyframe {0} contains a non-finite value")]
    NonFinite(usize),

    #[error("Keyframe {0} is not later than the keyframe before it")]
    NonIncreasingTime(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl KeyframePath {
    /// Build a path from keyframes, which must be finite and strictly increasing in time.
    pub fn new(keyframes: Vec<Keyframe>) -> Result<Self, KeyframeError> {
        if keyframes.is_empty() {
            return Err(KeyframeError::Empty);
        }

        for (i, k) in keyframes.iter().enumerate() {
            let values = [
                k.time_s,
                k.field_heading_rad,
                k.speed_forward_ms,
                k.speed_strafe_ms,
                k.speed_rotation_rads,
            ];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(KeyframeError::NonFinite(i));
            }

            if i > 0 && k.time_s <= keyframes[i - 1].time_s {
                return Err(KeyframeError::NonIncreasingTime(i));
            }
        }

        let emitted = vec![false; keyframes.len()];

        Ok(Self { keyframes, emitted })
    }

    /// Parse a path from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, KeyframeError> {
        let file: KeyframeFile = serde_json::from_str(s).map_err(KeyframeError::ParseError)?;
        Self::new(file.keyframes)
    }

    /// Load a path from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KeyframeError> {
        let s = std::fs::read_to_string(path).map_err(KeyframeError::FileError)?;
        Self::from_json_str(&s)
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Number of keyframes carrying an action.
    pub fn num_actions(&self) -> usize {
        self.keyframes.iter().filter(|k| k.action.is_some()).count()
    }

    /// Interpolate the keyframes at `time_s`, clamped to the path's time span.
    fn interpolate(&self, time_s: f64) -> PathPoint {
        let last = self.keyframes.len() - 1;

        // Index of the first keyframe after time_s
        let next = self.keyframes.iter().position(|k| k.time_s > time_s);

        let (k0, k1, frac) = match next {
            Some(0) => (&self.keyframes[0], &self.keyframes[0], 0.0),
            Some(i) => {
                let k0 = &self.keyframes[i - 1];
                let k1 = &self.keyframes[i];
                (k0, k1, (time_s - k0.time_s) / (k1.time_s - k0.time_s))
            }
            None => (&self.keyframes[last], &self.keyframes[last], 0.0),
        };

        let lerp = |a: f64, b: f64| a + (b - a) * frac;

        PathPoint {
            field_heading_rad: lerp(k0.field_heading_rad, k1.field_heading_rad),
            speed_forward_ms: lerp(k0.speed_forward_ms, k1.speed_forward_ms),
            speed_strafe_ms: lerp(k0.speed_strafe_ms, k1.speed_strafe_ms),
            speed_rotation_rads: lerp(k0.speed_rotation_rads, k1.speed_rotation_rads),
            action: None,
        }
    }
}

impl PathSampler for KeyframePath {
    fn sample_at(&mut self, time_s: f64) -> Option<PathPoint> {
        let end_s = self.keyframes[self.keyframes.len() - 1].time_s;

        // Earliest due action which has not been emitted yet
        let due = self
            .keyframes
            .iter()
            .zip(self.emitted.iter())
            .position(|(k, emitted)| !emitted && k.action.is_some() && k.time_s <= time_s);

        match due {
            Some(i) => {
                self.emitted[i] = true;
                let mut point = self.interpolate(time_s);
                point.action = self.keyframes[i].action.clone();
                debug!(
                    "Keyframe {} action {:?} emitted at {:.3} s",
                    i, point.action, time_s
                );
                Some(point)
            }
            None if time_s > end_s => None,
            None => Some(self.interpolate(time_s)),
        }
    }

    fn reset(&mut self) {
        for e in self.emitted.iter_mut() {
            *e = false;
        }
    }

    fn duration_s(&self) -> Option<f64> {
        Some(self.keyframes[self.keyframes.len() - 1].time_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto::ActionType;

    const PATH: &str = r#"{
        "keyframes": [
            { "time_s": 0.0, "field_heading_rad": 0.0, "speed_forward_ms": 0.0,
              "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0,
              "action": { "name": "Wait", "action_type": "stop_and_run" } },
            { "time_s": 1.0, "field_heading_rad": 1.0, "speed_forward_ms": 2.0,
              "speed_strafe_ms": -1.0, "speed_rotation_rads": 0.5,
              "action": { "name": "Marker", "action_type": "schedule" } },
            { "time_s": 2.0, "field_heading_rad": 1.0, "speed_forward_ms": 0.0,
              "speed_strafe_ms": 0.0, "speed_rotation_rads": 0.0,
              "action": { "name": "Wait", "action_type": "stop_and_run" } }
        ]
    }"#;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_interpolation() {
        let mut path = KeyframePath::from_json_str(PATH).unwrap();
        assert_eq!(path.num_actions(), 3);
        assert_eq!(path.duration_s(), Some(2.0));

        // First sample emits the first action
        let p = path.sample_at(0.0).unwrap();
        assert_eq!(p.action.map(|a| a.action_type), Some(ActionType::StopAndRun));

        let p = path.sample_at(0.5).unwrap();
        assert!(p.action.is_none());
        assert!(close(p.field_heading_rad, 0.5));
        assert!(close(p.speed_forward_ms, 1.0));
        assert!(close(p.speed_strafe_ms, -0.5));
        assert!(close(p.speed_rotation_rads, 0.25));

        let p = path.sample_at(1.5).unwrap();
        assert_eq!(p.action.as_ref().map(|a| a.name.as_str()), Some("Marker"));
        assert!(close(p.speed_forward_ms, 1.0));

        // Emitted only once
        assert!(path.sample_at(1.6).unwrap().action.is_none());
    }

    #[test]
    fn test_actions_past_end() {
        let mut path = KeyframePath::from_json_str(PATH).unwrap();

        // Jumping past the end still emits every action, in order, before ending
        let names: Vec<String> = std::iter::from_fn(|| path.sample_at(5.0))
            .map(|p| p.action.map(|a| a.name).unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["Wait", "Marker", "Wait"]);
        assert!(path.sample_at(5.0).is_none());

        // At the end time exactly the path has not ended
        assert!(path.sample_at(2.0).is_some());

        path.reset();
        assert!(path.sample_at(0.0).unwrap().action.is_some());
    }

    #[test]
    fn test_invalid_paths() {
        assert!(matches!(
            KeyframePath::from_json_str(r#"{ "keyframes": [] }"#),
            Err(KeyframeError::Empty)
        ));
        assert!(matches!(
            KeyframePath::from_json_str("not json"),
            Err(KeyframeError::ParseError(_))
        ));

        let k = Keyframe {
            time_s: 1.0,
            field_heading_rad: 0.0,
            speed_forward_ms: 0.0,
            speed_strafe_ms: 0.0,
            speed_rotation_rads: 0.0,
            action: None,
        };
        assert!(matches!(
            KeyframePath::new(vec![k.clone(), k.clone()]),
            Err(KeyframeError::NonIncreasingTime(1))
        ));
        assert!(matches!(
            KeyframePath::new(vec![Keyframe {
                speed_forward_ms: f64::NAN,
                ..k
            }]),
            Err(KeyframeError::NonFinite(0))
        ));
    }
}
