//! Task trait and the per-tick context tasks are stepped with

use tracing::{debug, error};

use crate::error::PatternError;

/// Outcome of one state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Transition again within the same tick
    Continue,
    /// Yield until the next tick
    Suspend,
    /// Finished; drop the task
    Done,
}

/// An explicit state machine advanced by the scheduler
pub trait Task {
    /// Perform one state transition
    fn step(&mut self, cx: &mut TickCx<'_>) -> Step;

    /// Short label for logs
    fn name(&self) -> &str {
        "task"
    }
}

/// Step `task` until it suspends or finishes; `true` while it is still alive
pub(crate) fn drive(task: &mut dyn Task, cx: &mut TickCx<'_>) -> bool {
    loop {
        match task.step(cx) {
            Step::Continue => continue,
            Step::Suspend => return true,
            Step::Done => {
                debug!(task = task.name(), frame = cx.frame(), "drive: task finished");
                return false;
            }
        }
    }
}

/// Handle given to a task while it is being stepped
pub struct TickCx<'a> {
    frame: u64,
    spawned: Vec<Box<dyn Task>>,
    errors: &'a mut Vec<PatternError>,
}

impl<'a> TickCx<'a> {
    pub(crate) fn new(frame: u64, errors: &'a mut Vec<PatternError>) -> Self {
        Self {
            frame,
            spawned: Vec::new(),
            errors,
        }
    }

    /// Frame number of the tick being executed
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Start a task now.
    ///
    /// The task is stepped immediately, in this tick. If it is still alive it
    /// runs before its spawner on every following tick, so a spawner polling
    /// a child's completion observes it in the tick the child finishes.
    pub fn spawn(&mut self, mut task: Box<dyn Task>) {
        debug!(task = task.name(), frame = self.frame, "TickCx::spawn: called");
        if drive(task.as_mut(), self) {
            self.spawned.push(task);
        }
    }

    /// Report an error from a task that is about to finish abnormally
    pub fn fail(&mut self, err: PatternError) {
        error!(frame = self.frame, error = %err, "TickCx::fail: task failed");
        self.errors.push(err);
    }

    pub(crate) fn into_spawned(self) -> Vec<Box<dyn Task>> {
        self.spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Countdown {
        left: u32,
        log: Rc<Cell<u32>>,
    }

    impl Task for Countdown {
        fn step(&mut self, _cx: &mut TickCx<'_>) -> Step {
            self.log.set(self.log.get() + 1);
            if self.left == 0 {
                return Step::Done;
            }
            self.left -= 1;
            Step::Suspend
        }
    }

    #[test]
    fn test_spawn_steps_immediately() {
        let mut errors = Vec::new();
        let mut cx = TickCx::new(0, &mut errors);
        let log = Rc::new(Cell::new(0));
        cx.spawn(Box::new(Countdown {
            left: 0,
            log: log.clone(),
        }));
        assert_eq!(log.get(), 1);
        assert!(cx.into_spawned().is_empty());
    }

    #[test]
    fn test_spawn_keeps_suspended_task() {
        let mut errors = Vec::new();
        let mut cx = TickCx::new(0, &mut errors);
        let log = Rc::new(Cell::new(0));
        cx.spawn(Box::new(Countdown { left: 2, log }));
        assert_eq!(cx.into_spawned().len(), 1);
    }

    #[test]
    fn test_fail_records_error() {
        let mut errors = Vec::new();
        let mut cx = TickCx::new(3, &mut errors);
        cx.fail(PatternError::UnpauseWithoutWhile);
        drop(cx);
        assert_eq!(errors.len(), 1);
    }
}
