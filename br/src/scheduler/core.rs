//! Scheduler implementation

use tracing::{debug, info};

use super::task::{Task, TickCx, drive};
use crate::context::{AsyncHandoff, CommonHandoff, Completion};
use crate::error::PatternError;
use crate::pattern::AsyncPattern;
use crate::world::World;

/// What happened during one tick
#[derive(Debug, Default)]
pub struct TickSummary {
    /// Frame number of the tick
    pub frame: u64,
    /// Tasks still alive after the tick
    pub active: usize,
    /// Errors reported by tasks that failed during the tick
    pub errors: Vec<PatternError>,
}

/// Aggregate result of [`Scheduler::run_until_idle`]
#[derive(Debug, Default)]
pub struct RunReport {
    pub ticks: u64,
    /// Whether every task finished before the tick limit
    pub idle: bool,
    pub errors: Vec<PatternError>,
}

/// Owns the active task list and steps it once per tick.
///
/// Tasks run in list order. A task spawned during a tick is placed before
/// its spawner, and a root started with [`run`](Scheduler::run) is appended
/// to the end of the list and first stepped on the next tick.
pub struct Scheduler {
    world: World,
    tasks: Vec<Box<dyn Task>>,
    ticks: u64,
}

impl Scheduler {
    pub fn new(world: World) -> Self {
        debug!("Scheduler::new: called");
        world.rng.set_enabled(false);
        Self {
            world,
            tasks: Vec::new(),
            ticks: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Number of ticks executed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn active(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Start a durative pattern as a new root; the returned completion fires when it ends
    pub fn run(&mut self, pattern: &AsyncPattern, ch: CommonHandoff) -> Completion {
        info!(index = ch.gcx.index, emitter = %ch.creator.emitter().id(), "Scheduler::run: starting root pattern");
        let completion = Completion::new();
        let task = pattern.start(AsyncHandoff::new(ch, completion.clone()));
        self.tasks.push(task);
        completion
    }

    /// Advance the simulation by one tick.
    ///
    /// The random source is enabled only while tasks are being stepped.
    pub fn tick(&mut self) -> TickSummary {
        let frame = self.world.clock.now();
        debug!(frame, tasks = self.tasks.len(), "Scheduler::tick: called");
        let mut errors = Vec::new();
        let mut next: Vec<Box<dyn Task>> = Vec::with_capacity(self.tasks.len());

        self.world.rng.set_enabled(true);
        for mut task in std::mem::take(&mut self.tasks) {
            let mut cx = TickCx::new(frame, &mut errors);
            let alive = drive(task.as_mut(), &mut cx);
            next.extend(cx.into_spawned());
            if alive {
                next.push(task);
            }
        }
        self.world.rng.set_enabled(false);

        self.tasks = next;
        self.world.clock.advance();
        self.ticks += 1;

        TickSummary {
            frame,
            active: self.tasks.len(),
            errors,
        }
    }

    /// Tick until no tasks remain or `max_ticks` ticks have run
    pub fn run_until_idle(&mut self, max_ticks: u64) -> RunReport {
        info!(max_ticks, "Scheduler::run_until_idle: called");
        let mut report = RunReport::default();
        while !self.is_idle() && report.ticks < max_ticks {
            let summary = self.tick();
            report.ticks += 1;
            report.errors.extend(summary.errors);
        }
        report.idle = self.is_idle();
        info!(
            ticks = report.ticks,
            idle = report.idle,
            errors = report.errors.len(),
            "Scheduler::run_until_idle: finished"
        );
        report
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.tasks.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{EmissionLog, PointEmitter, Velocity};
    use crate::math::Vec2;
    use crate::pattern;
    use crate::props::Property;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (Scheduler, CommonHandoff, Rc<RefCell<EmissionLog>>) {
        let world = World::default();
        let log = Rc::new(RefCell::new(EmissionLog::new()));
        let ch = CommonHandoff::root(Rc::new(PointEmitter::new("boss", Vec2::ZERO)), log.clone(), world.clone());
        (Scheduler::new(world), ch, log)
    }

    #[test]
    fn test_run_is_deferred_to_next_tick() {
        let (mut sched, ch, log) = setup();
        let done = sched.run(&pattern::once(pattern::emit(Velocity::Still)), ch);
        assert!(!done.is_done());
        assert_eq!(log.borrow().len(), 0);

        let summary = sched.tick();
        assert_eq!(summary.frame, 0);
        assert_eq!(summary.active, 0);
        assert_eq!(done.outcome(), Some(true));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_rng_enabled_only_during_tick() {
        let (mut sched, ch, _log) = setup();
        let drawn = Rc::new(RefCell::new(Vec::new()));
        let sink = drawn.clone();
        let p = pattern::exec_async(move |gcx| sink.borrow_mut().push(gcx.rand(0.0, 1.0).is_ok()));
        sched.run(&p, ch);
        assert!(!sched.world().rng.is_enabled());
        sched.tick();
        assert!(!sched.world().rng.is_enabled());
        assert_eq!(*drawn.borrow(), vec![true]);
    }

    #[test]
    fn test_run_until_idle_stops_at_limit() {
        let (mut sched, ch, _log) = setup();
        sched.run(&pattern::hold(100.0).unwrap(), ch);
        let report = sched.run_until_idle(10);
        assert_eq!(report.ticks, 10);
        assert!(!report.idle);
        assert_eq!(sched.ticks(), 10);
        assert_eq!(sched.world().clock.now(), 10);
    }

    #[test]
    fn test_errors_are_collected() {
        let (mut sched, ch, _log) = setup();
        let set = crate::props::PropertySet::durative([Property::on_laser(|_| 0.0)]).unwrap();
        let p = pattern::gc_repeat(set, vec![pattern::noop()]).unwrap();
        let done = sched.run(&p, ch);
        let report = sched.run_until_idle(5);
        assert!(report.idle);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], PatternError::NotLaser { .. }));
        assert_eq!(done.outcome(), Some(false));
    }
}
