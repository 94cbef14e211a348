//! Built-in actions which can be named in paths

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;

use super::{Action, ActionCtx, ActionRegistry, AutoError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of cycles a `Wait` action lasts when created from a path.
pub const DEFAULT_WAIT_CYCLES: u32 = 50;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Holds the robot still for a fixed number of cycles.
#[derive(Debug)]
pub struct Wait {
    cycles: u32,
    elapsed: u32,
}

/// Logs that the path reached it, then finishes.
#[derive(Debug, Default)]
pub struct Marker {
    logged: bool,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Register the built-in actions under their names.
pub fn register_builtin(registry: &mut ActionRegistry) {
    registry.register("Wait", || Box::new(Wait::new(DEFAULT_WAIT_CYCLES)));
    registry.register("Marker", || Box::new(Marker::new()));
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Wait {
    pub fn new(cycles: u32) -> Self {
        Self { cycles, elapsed: 0 }
    }
}

impl Action for Wait {
    fn name(&self) -> &str {
        "Wait"
    }

    fn initialize(&mut self, ctx: &mut ActionCtx) -> Result<(), AutoError> {
        self.elapsed = 0;
        ctx.drive.stop();
        Ok(())
    }

    fn tick(&mut self, _ctx: &mut ActionCtx) -> Result<(), AutoError> {
        self.elapsed += 1;
        Ok(())
    }

    fn is_finished(&self, _ctx: &ActionCtx) -> bool {
        self.elapsed >= self.cycles
    }

    fn end(&mut self, _interrupted: bool, _ctx: &mut ActionCtx) {}
}

impl Marker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Action for Marker {
    fn name(&self) -> &str {
        "Marker"
    }

    fn initialize(&mut self, _ctx: &mut ActionCtx) -> Result<(), AutoError> {
        self.logged = false;
        Ok(())
    }

    fn tick(&mut self, ctx: &mut ActionCtx) -> Result<(), AutoError> {
        if !self.logged {
            let pos = ctx.drive.field_position();
            info!(
                "Marker reached at {:.2} s, field position ({:.3}, {:.3}) m",
                ctx.now_s, pos.x, pos.y
            );
            self.logged = true;
        }
        Ok(())
    }

    fn is_finished(&self, _ctx: &ActionCtx) -> bool {
        self.logged
    }

    fn end(&mut self, _interrupted: bool, _ctx: &mut ActionCtx) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto::ActionFactory;
    use crate::drive_ctrl::Params;
    use crate::sim::SimRig;

    #[test]
    fn test_registry() {
        let mut registry = ActionRegistry::new();
        register_builtin(&mut registry);

        assert_eq!(registry.names(), vec!["Marker", "Wait"]);
        assert_eq!(registry.instantiate("Wait").unwrap().name(), "Wait");
        match registry.instantiate("Shoot") {
            Err(AutoError::UnknownAction(name)) => assert_eq!(name, "Shoot"),
            _ => panic!("Expected an unknown action error"),
        }
    }

    #[test]
    fn test_wait_cycles() {
        let (_rig, mut drive) = SimRig::build(Params::default());
        let mut ctx = ActionCtx {
            now_s: 0.0,
            drive: &mut drive,
        };

        let mut wait = Wait::new(3);
        wait.initialize(&mut ctx).unwrap();
        for _ in 0..2 {
            wait.tick(&mut ctx).unwrap();
            assert!(!wait.is_finished(&ctx));
        }
        wait.tick(&mut ctx).unwrap();
        assert!(wait.is_finished(&ctx));
    }
}
