//! Pattern values and leaf actions
//!
//! A [`SyncPattern`] runs to completion inside the caller's tick. An
//! [`AsyncPattern`] is a factory for a [`Task`] the scheduler steps across
//! ticks. Both are cheap to clone and are shared between every place in a
//! pattern tree that invokes them.

mod durative;
mod sync;

use std::fmt;
use std::rc::Rc;

use tracing::debug;

pub use durative::{gc_repeat, gi_repeat};
pub use sync::gs_repeat;

use crate::context::{AsyncHandoff, GenCtx, SyncHandoff};
use crate::emit::Velocity;
use crate::error::PatternError;
use crate::props::{Property, PropertySet};
use crate::scheduler::{Step, Task, TickCx};

type SyncFn = dyn Fn(&mut SyncHandoff) -> Result<(), PatternError>;
type AsyncFn = dyn Fn(AsyncHandoff) -> Box<dyn Task>;

/// Instantaneous pattern: never suspends
#[derive(Clone)]
pub struct SyncPattern(Rc<SyncFn>);

impl SyncPattern {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut SyncHandoff) -> Result<(), PatternError> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn run(&self, sbh: &mut SyncHandoff) -> Result<(), PatternError> {
        (self.0)(sbh)
    }
}

impl fmt::Debug for SyncPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SyncPattern")
    }
}

/// Durative pattern: starting it yields a task that must signal its handoff's completion
#[derive(Clone)]
pub struct AsyncPattern(Rc<AsyncFn>);

impl AsyncPattern {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(AsyncHandoff) -> Box<dyn Task> + 'static,
    {
        Self(Rc::new(f))
    }

    /// Create the task for one invocation; nothing runs until it is stepped
    pub fn start(&self, abh: AsyncHandoff) -> Box<dyn Task> {
        (self.0)(abh)
    }
}

impl fmt::Debug for AsyncPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncPattern")
    }
}

/// Emit one object at the current offset
pub fn emit(velocity: Velocity) -> SyncPattern {
    SyncPattern::new(move |sbh| {
        sbh.emit(velocity);
        Ok(())
    })
}

/// Do nothing
pub fn noop() -> SyncPattern {
    SyncPattern::new(|_| Ok(()))
}

/// Request a sound cue
pub fn sfx(cue: &str) -> SyncPattern {
    let cue = cue.to_string();
    SyncPattern::new(move |sbh| {
        sbh.ch.gcx.world().sfx.borrow_mut().request(&cue);
        Ok(())
    })
}

/// Run arbitrary code against the context
pub fn exec<F>(f: F) -> SyncPattern
where
    F: Fn(&mut GenCtx) + 'static,
{
    SyncPattern::new(move |sbh| {
        f(&mut sbh.ch.gcx);
        Ok(())
    })
}

/// Run a sync pattern once, then complete
struct OnceTask {
    abh: AsyncHandoff,
    target: SyncPattern,
}

impl Task for OnceTask {
    fn step(&mut self, cx: &mut TickCx<'_>) -> Step {
        if self.abh.ch.is_cancelled() {
            self.abh.done(false);
            return Step::Done;
        }
        let mut sbh = SyncHandoff::new(self.abh.ch.clone(), 0.0);
        match self.target.run(&mut sbh) {
            Ok(()) => self.abh.done(true),
            Err(e) => {
                cx.fail(e);
                self.abh.done(false);
            }
        }
        Step::Done
    }

    fn name(&self) -> &str {
        "once"
    }
}

/// Durative wrapper that runs `target` once in the tick it starts
pub fn once(target: SyncPattern) -> AsyncPattern {
    AsyncPattern::new(move |abh| {
        Box::new(OnceTask {
            abh,
            target: target.clone(),
        })
    })
}

/// Durative pattern that completes as soon as it starts
pub fn noop_async() -> AsyncPattern {
    once(noop())
}

/// Durative wrapper around [`exec`]
pub fn exec_async<F>(f: F) -> AsyncPattern
where
    F: Fn(&mut GenCtx) + 'static,
{
    once(exec(f))
}

/// Run `target` once after `frames` frames
pub fn delay(frames: f64, target: SyncPattern) -> Result<AsyncPattern, PatternError> {
    debug!(frames, "delay: called");
    gc_repeat(PropertySet::durative([Property::delay_frames(frames)])?, vec![target])
}

/// Complete after `frames` frames without doing anything
pub fn hold(frames: f64) -> Result<AsyncPattern, PatternError> {
    delay(frames, noop())
}

/// Run the child at `indexer(gcx) mod children.len()`
pub fn alternate<F>(indexer: F, children: Vec<AsyncPattern>) -> AsyncPattern
where
    F: Fn(&GenCtx) -> f64 + 'static,
{
    AsyncPattern::new(move |abh| {
        if children.is_empty() {
            return noop_async().start(abh);
        }
        let idx = crate::math::modulo_index(children.len() as i64, indexer(&abh.ch.gcx) as i64);
        children[idx as usize].start(abh)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CommonHandoff, Completion};
    use crate::emit::{EmissionLog, PointEmitter};
    use crate::math::Vec2;
    use crate::world::{SfxLog, World};
    use std::cell::RefCell;

    fn handoff() -> (CommonHandoff, Rc<RefCell<EmissionLog>>, Rc<RefCell<SfxLog>>) {
        let sfx = Rc::new(RefCell::new(SfxLog::default()));
        let world = World::default().with_sfx(sfx.clone());
        let log = Rc::new(RefCell::new(EmissionLog::new()));
        let ch = CommonHandoff::root(Rc::new(PointEmitter::new("e", Vec2::ZERO)), log.clone(), world);
        (ch, log, sfx)
    }

    fn step_once(task: &mut dyn Task) -> Step {
        let mut errors = Vec::new();
        let mut cx = TickCx::new(0, &mut errors);
        task.step(&mut cx)
    }

    #[test]
    fn test_sync_leaves() {
        let (ch, log, sounds) = handoff();
        let mut sbh = SyncHandoff::new(ch, 0.0);
        emit(Velocity::Still).run(&mut sbh).unwrap();
        sfx("ping").run(&mut sbh).unwrap();
        exec(|g| g.set_var("x", 2.0)).run(&mut sbh).unwrap();
        noop().run(&mut sbh).unwrap();
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(sounds.borrow().cues, vec!["ping"]);
        assert_eq!(sbh.ch.gcx.var("x"), Some(2.0));
    }

    #[test]
    fn test_once_completes_in_first_step() {
        let (ch, log, _) = handoff();
        let completion = Completion::new();
        let mut task = once(emit(Velocity::Still)).start(AsyncHandoff::new(ch, completion.clone()));
        assert_eq!(step_once(task.as_mut()), Step::Done);
        assert_eq!(completion.outcome(), Some(true));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_once_respects_cancellation() {
        let (ch, log, _) = handoff();
        ch.cancel.cancel();
        let completion = Completion::new();
        let mut task = once(emit(Velocity::Still)).start(AsyncHandoff::new(ch, completion.clone()));
        step_once(task.as_mut());
        assert_eq!(completion.outcome(), Some(false));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_alternate_picks_one_child() {
        let (mut ch, _, sounds) = handoff();
        ch.gcx.index = 4;
        let p = alternate(|g| g.index as f64, vec![
            once(sfx("a")),
            once(sfx("b")),
            once(sfx("c")),
        ]);
        let completion = Completion::new();
        let mut task = p.start(AsyncHandoff::new(ch, completion.clone()));
        step_once(task.as_mut());
        assert_eq!(sounds.borrow().cues, vec!["b"]);
        assert!(completion.is_done());
    }
}
