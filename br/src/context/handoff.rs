//! Handoffs passed across branch boundaries, and completion signals

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use super::{CancelToken, GenCtx};
use crate::emit::{Creator, EmissionSink, Emitter, Velocity};
use crate::world::World;

/// Cancellation token, emission factory and generation context for one branch.
///
/// `clone()` is the branch copy: the token and the factory's emitter and sink
/// are shared, the context is deep-copied.
#[derive(Clone, Debug)]
pub struct CommonHandoff {
    pub cancel: CancelToken,
    pub creator: Creator,
    pub gcx: GenCtx,
}

impl CommonHandoff {
    pub fn new(cancel: CancelToken, creator: Creator, gcx: GenCtx) -> Self {
        Self { cancel, creator, gcx }
    }

    /// Handoff for a pattern tree rooted at `emitter`
    pub fn root(emitter: Rc<dyn Emitter>, sink: Rc<RefCell<dyn EmissionSink>>, world: World) -> Self {
        debug!(emitter = %emitter.id(), "CommonHandoff::root: called");
        let creator = Creator::new(emitter.clone(), sink);
        let gcx = GenCtx::new(emitter, world);
        Self::new(CancelToken::new(), creator, gcx)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Handoff for an instantaneous child, carrying the sub-frame time already elapsed
#[derive(Clone, Debug)]
pub struct SyncHandoff {
    pub ch: CommonHandoff,
    /// Seconds by which the invocation lags the start of the tick
    pub time_offset: f64,
}

impl SyncHandoff {
    pub fn new(ch: CommonHandoff, time_offset: f64) -> Self {
        Self { ch, time_offset }
    }

    /// Emit one object at the current offset and firing index
    pub fn emit(&mut self, velocity: Velocity) -> u64 {
        let id = self.ch.gcx.next_id();
        let frame = self.ch.gcx.frame();
        self.ch
            .creator
            .emit(self.ch.gcx.rv2, velocity, self.ch.gcx.index, id, frame, self.time_offset)
    }
}

/// Shared one-shot completion flag between a durative pattern and its launcher
#[derive(Clone, Default)]
pub struct Completion {
    outcome: Rc<Cell<Option<bool>>>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome; later calls are ignored
    pub fn finish(&self, normal: bool) {
        if self.outcome.get().is_none() {
            self.outcome.set(Some(normal));
        }
    }

    pub fn is_done(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// `Some(true)` on normal completion, `Some(false)` on cancel or clip
    pub fn outcome(&self) -> Option<bool> {
        self.outcome.get()
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion").field("outcome", &self.outcome.get()).finish()
    }
}

/// Completions of every child started in one iteration
#[derive(Clone, Debug, Default)]
pub struct CompletionGroup {
    members: Vec<Completion>,
}

impl CompletionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member and return it for the child to signal
    pub fn join(&mut self) -> Completion {
        let c = Completion::new();
        self.members.push(c.clone());
        c
    }

    pub fn all_done(&self) -> bool {
        self.members.iter().all(Completion::is_done)
    }
}

/// Handoff for a durative child: a branch plus the completion it must signal
#[derive(Clone, Debug)]
pub struct AsyncHandoff {
    pub ch: CommonHandoff,
    completion: Completion,
}

impl AsyncHandoff {
    pub fn new(ch: CommonHandoff, completion: Completion) -> Self {
        Self { ch, completion }
    }

    pub fn completion(&self) -> &Completion {
        &self.completion
    }

    /// Signal completion to whoever launched this branch
    pub fn done(&self, normal: bool) {
        debug!(normal, index = self.ch.gcx.index, "AsyncHandoff::done: called");
        self.completion.finish(normal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{EmissionLog, PointEmitter};
    use crate::math::{Offset, Vec2};

    fn root() -> (CommonHandoff, Rc<RefCell<EmissionLog>>) {
        let log = Rc::new(RefCell::new(EmissionLog::new()));
        let emitter = Rc::new(PointEmitter::new("e", Vec2::new(1.0, 1.0)));
        (CommonHandoff::root(emitter, log.clone(), World::default()), log)
    }

    #[test]
    fn test_copy_shares_token_but_not_context() {
        let (ch, _) = root();
        let mut copy = ch.clone();
        copy.gcx.rv2 = Offset::nrot(3.0, 0.0);
        copy.creator.style = "red".to_string();
        ch.cancel.cancel();

        assert!(copy.is_cancelled());
        assert_eq!(ch.gcx.rv2, Offset::ZERO);
        assert_eq!(ch.creator.style, "");
    }

    #[test]
    fn test_sync_emit_uses_context() {
        let (mut ch, log) = root();
        ch.gcx.rv2 = Offset::nrot(2.0, 0.0);
        ch.gcx.index = 4;
        let mut sbh = SyncHandoff::new(ch, 0.25);
        sbh.emit(Velocity::Still);
        sbh.emit(Velocity::Still);

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log.emissions[0].index, 4);
        assert_eq!(log.emissions[0].position, Vec2::new(3.0, 1.0));
        assert_eq!(log.emissions[0].time_offset, 0.25);
        assert_ne!(log.emissions[0].id, log.emissions[1].id);
    }

    #[test]
    fn test_completion_first_outcome_sticks() {
        let c = Completion::new();
        assert!(!c.is_done());
        c.finish(false);
        c.finish(true);
        assert_eq!(c.outcome(), Some(false));
    }

    #[test]
    fn test_completion_group() {
        let mut group = CompletionGroup::new();
        assert!(group.all_done());
        let a = group.join();
        let b = group.join();
        a.finish(true);
        assert!(!group.all_done());
        b.finish(true);
        assert!(group.all_done());
    }
}
