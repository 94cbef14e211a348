//! Cooperative scheduler for actions which run alongside path following

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};

use super::{Action, ActionCtx, TaskScheduler};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Runs submitted actions, one tick per cycle, until they finish.
#[derive(Default)]
pub struct ActionScheduler {
    /// Submitted but not yet initialised
    pending: Vec<Box<dyn Action>>,

    running: Vec<Box<dyn Action>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one cycle of the scheduler.
    ///
    /// Newly submitted actions are initialised, then every running action is ticked. Actions
    /// which report finished are ended and dropped. An action which returns an error is ended as
    /// interrupted and dropped, the others carry on.
    pub fn run(&mut self, ctx: &mut ActionCtx) {
        for mut action in self.pending.drain(..) {
            debug!("Initialising scheduled action \"{}\"", action.name());
            match action.initialize(ctx) {
                Ok(()) => self.running.push(action),
                Err(e) => {
                    warn!(
                        "Scheduled action \"{}\" failed to initialise, dropping it: {}",
                        action.name(),
                        e
                    );
                    action.end(true, ctx);
                }
            }
        }

        let mut i = 0;
        while i < self.running.len() {
            let action = &mut self.running[i];

            let (done, failed) = match action.tick(ctx) {
                Ok(()) => (action.is_finished(ctx), false),
                Err(e) => {
                    warn!("Scheduled action \"{}\" failed, dropping it: {}", action.name(), e);
                    (true, true)
                }
            };

            if done {
                let mut action = self.running.remove(i);
                action.end(failed, ctx);
                debug!("Scheduled action \"{}\" finished", action.name());
            } else {
                i += 1;
            }
        }
    }

    /// End every running action as interrupted and drop any which were never started.
    pub fn cancel_all(&mut self, ctx: &mut ActionCtx) {
        if self.is_empty() {
            return;
        }

        info!(
            "Cancelling {} running and {} pending scheduled actions",
            self.running.len(),
            self.pending.len()
        );

        for mut action in self.running.drain(..) {
            action.end(true, ctx);
        }
        self.pending.clear();
    }

    /// Number of submitted actions which have not finished.
    pub fn len(&self) -> usize {
        self.pending.len() + self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TaskScheduler for ActionScheduler {
    fn submit(&mut self, action: Box<dyn Action>) {
        debug!("Action \"{}\" scheduled", action.name());
        self.pending.push(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto::actions::{Marker, Wait};
    use crate::auto::AutoError;
    use crate::drive_ctrl::Params;
    use crate::sim::SimRig;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records the lifecycle calls it receives.
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        ticks_to_finish: u32,
        ticks: u32,
    }

    impl Action for Recorder {
        fn name(&self) -> &str {
            "Recorder"
        }

        fn initialize(&mut self, _ctx: &mut ActionCtx) -> Result<(), AutoError> {
            self.log.borrow_mut().push("init".into());
            Ok(())
        }

        fn tick(&mut self, _ctx: &mut ActionCtx) -> Result<(), AutoError> {
            self.ticks += 1;
            self.log.borrow_mut().push(format!("tick {}", self.ticks));
            Ok(())
        }

        fn is_finished(&self, _ctx: &ActionCtx) -> bool {
            self.ticks >= self.ticks_to_finish
        }

        fn end(&mut self, interrupted: bool, _ctx: &mut ActionCtx) {
            self.log.borrow_mut().push(format!("end {}", interrupted));
        }
    }

    /// Sends the drivetrain a request it rejects, in `initialize` or in `tick`.
    struct BadRequest {
        log: Rc<RefCell<Vec<String>>>,
        in_tick: bool,
    }

    impl Action for BadRequest {
        fn name(&self) -> &str {
            "BadRequest"
        }

        fn initialize(&mut self, ctx: &mut ActionCtx) -> Result<(), AutoError> {
            self.log.borrow_mut().push("bad init".into());
            if !self.in_tick {
                ctx.drive.drive_components(f64::NAN, 0.0, 0.0)?;
            }
            Ok(())
        }

        fn tick(&mut self, ctx: &mut ActionCtx) -> Result<(), AutoError> {
            self.log.borrow_mut().push("bad tick".into());
            ctx.drive.drive_components(f64::NAN, 0.0, 0.0)?;
            Ok(())
        }

        fn is_finished(&self, _ctx: &ActionCtx) -> bool {
            false
        }

        fn end(&mut self, interrupted: bool, _ctx: &mut ActionCtx) {
            self.log.borrow_mut().push(format!("bad end {}", interrupted));
        }
    }

    #[test]
    fn test_lifecycle() {
        let (_rig, mut drive) = SimRig::build(Params::default());
        let mut ctx = ActionCtx {
            now_s: 0.0,
            drive: &mut drive,
        };

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sched = ActionScheduler::new();
        sched.submit(Box::new(Recorder {
            log: log.clone(),
            ticks_to_finish: 2,
            ticks: 0,
        }));
        sched.submit(Box::new(Marker::new()));
        assert_eq!(sched.len(), 2);

        sched.run(&mut ctx);
        // The marker finishes after its first tick
        assert_eq!(sched.len(), 1);

        sched.run(&mut ctx);
        assert!(sched.is_empty());

        assert_eq!(
            *log.borrow(),
            vec!["init", "tick 1", "tick 2", "end false"]
        );
    }

    #[test]
    fn test_cancel_all() {
        let (_rig, mut drive) = SimRig::build(Params::default());
        let mut ctx = ActionCtx {
            now_s: 0.0,
            drive: &mut drive,
        };

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sched = ActionScheduler::new();
        sched.submit(Box::new(Recorder {
            log: log.clone(),
            ticks_to_finish: 100,
            ticks: 0,
        }));
        sched.run(&mut ctx);
        sched.submit(Box::new(Wait::new(10)));

        sched.cancel_all(&mut ctx);
        assert!(sched.is_empty());
        assert_eq!(*log.borrow(), vec!["init", "tick 1", "end true"]);
    }

    #[test]
    fn test_failing_actions_do_not_affect_others() {
        let (_rig, mut drive) = SimRig::build(Params::default());
        let mut ctx = ActionCtx {
            now_s: 0.0,
            drive: &mut drive,
        };

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sched = ActionScheduler::new();
        sched.submit(Box::new(BadRequest {
            log: log.clone(),
            in_tick: false,
        }));
        sched.submit(Box::new(BadRequest {
            log: log.clone(),
            in_tick: true,
        }));
        sched.submit(Box::new(Wait::new(10)));
        sched.submit(Box::new(Recorder {
            log: log.clone(),
            ticks_to_finish: 2,
            ticks: 0,
        }));

        sched.run(&mut ctx);

        // Both failing actions ended as interrupted, the wait and the recorder carry on
        assert_eq!(sched.len(), 2);
        assert_eq!(
            *log.borrow(),
            vec!["bad init", "bad end true", "bad init", "init", "bad tick", "bad end true", "tick 1"]
        );

        sched.run(&mut ctx);
        assert_eq!(sched.len(), 1);
        assert_eq!(log.borrow().last().map(|s| s.as_str()), Some("end false"));
    }
}
