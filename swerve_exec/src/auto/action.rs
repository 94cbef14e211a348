//! Actions and the interfaces used to create and schedule them

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use log::debug;

use super::AutoError;
use crate::drive_ctrl::Drivetrain;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Context passed to every action method.
pub struct ActionCtx<'a> {
    /// Current time.
    ///
    /// Units: seconds
    pub now_s: f64,

    pub drive: &'a mut Drivetrain,
}

/// Creates actions from the names given in paths.
///
/// Each name maps to a constructor closure registered at startup.
#[derive(Default)]
pub struct ActionRegistry {
    constructors: HashMap<String, Box<dyn Fn() -> Box<dyn Action>>>,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A unit of work run cooperatively, one tick per cycle.
///
/// The lifecycle is `initialize`, then `tick` once per cycle until `is_finished` returns true,
/// then `end(false)`. If the action is cancelled `end(true)` is called instead and no further
/// methods are called.
pub trait Action {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn initialize(&mut self, ctx: &mut ActionCtx) -> Result<(), AutoError>;

    fn tick(&mut self, ctx: &mut ActionCtx) -> Result<(), AutoError>;

    fn is_finished(&self, ctx: &ActionCtx) -> bool;

    fn end(&mut self, interrupted: bool, ctx: &mut ActionCtx);
}

/// Instantiates actions by name.
pub trait ActionFactory {
    fn instantiate(&self, name: &str) -> Result<Box<dyn Action>, AutoError>;
}

/// Runs actions alongside path following.
pub trait TaskScheduler {
    fn submit(&mut self, action: Box<dyn Action>);
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for actions named `name`, replacing any existing one.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn() -> Box<dyn Action> + 'static,
    {
        if self
            .constructors
            .insert(name.to_string(), Box::new(constructor))
            .is_some()
        {
            debug!("Replaced the constructor for action \"{}\"", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl ActionFactory for ActionRegistry {
    fn instantiate(&self, name: &str) -> Result<Box<dyn Action>, AutoError> {
        match self.constructors.get(name) {
            Some(constructor) => Ok(constructor()),
            None => Err(AutoError::UnknownAction(name.to_string())),
        }
    }
}
