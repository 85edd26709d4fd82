//! Durative repeaters
//!
//! Both executors walk the same state machine:
//!
//! ```text
//! Start -> InitialDelay -> (Invoke -> Wait -> Finish)* -> Last -> Done
//! ```
//!
//! A wait first subtracts the wait length from the tracker's elapsed-frame
//! counter, then suspends once per tick until the counter is non-negative,
//! the loop is unpaused, and (with `wait-child`) the children of the
//! iteration have all signalled done. Leftover frames carry over into the
//! next wait and into the time offset of leaf emissions.

use std::rc::Rc;

use tracing::debug;

use super::{AsyncPattern, SyncPattern};
use crate::context::{AsyncHandoff, CommonHandoff, Completion, CompletionGroup, SyncHandoff};
use crate::error::PatternError;
use crate::looper::LoopControl;
use crate::props::{PatternKind, PropertySet};
use crate::scheduler::{Step, Task, TickCx};

/// What a finished wait leads into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum After {
    InitialDelay,
    Iteration,
}

#[derive(Debug)]
enum State {
    Start,
    WaitCheck(After),
    WaitTick(After),
    Next,
    Finish,
    Last,
    AwaitLast(CompletionGroup),
    Done,
}

/// Wait bookkeeping shared by both repeaters
struct Tracker {
    looper: LoopControl,
    elapsed: f64,
    was_paused: bool,
    /// Children of the current iteration, when the loop waits for them
    pending: Option<CompletionGroup>,
}

impl Tracker {
    fn new(looper: LoopControl) -> Self {
        Self {
            looper,
            elapsed: 0.0,
            was_paused: false,
            pending: None,
        }
    }

    fn start_initial_delay(&mut self) {
        let delay = (self.looper.props().delay)(self.looper.gcx());
        self.elapsed -= delay;
    }

    fn start_wait(&mut self) {
        let wait = (self.looper.props().wait)(self.looper.gcx());
        self.elapsed -= wait;
    }

    fn children_done(&self) -> bool {
        self.pending.as_ref().is_none_or(CompletionGroup::all_done)
    }

    fn is_waiting(&self) -> bool {
        !self.looper.is_unpaused() || !self.children_done() || self.elapsed < 0.0
    }

    /// Account for one suspended tick
    fn wait_step(&mut self, cx: &mut TickCx<'_>) {
        self.looper.wait_step();
        if !self.looper.is_unpaused() {
            self.was_paused = true;
            return;
        }
        if self.was_paused {
            if let Some(unpause) = self.looper.props().unpause.clone() {
                debug!(i = self.looper.gcx().i, "Tracker::wait_step: unpaused, running unpause pattern");
                let ch = self.looper.handoff().clone();
                cx.spawn(unpause.start(AsyncHandoff::new(ch, Completion::new())));
            }
        }
        self.was_paused = false;
        if self.children_done() {
            self.elapsed += 1.0;
        }
    }

    /// Indices of the children to invoke this iteration
    fn targets(&self, count: usize) -> Vec<usize> {
        if count == 0 {
            return Vec::new();
        }
        match self.looper.selected_child(count) {
            Some(k) => vec![k],
            None => (0..count).collect(),
        }
    }
}

/// Handle the transitions the two repeaters have in common.
///
/// Returns `None` for states the caller must handle itself.
fn common_step(
    state: &mut State,
    tracker: &mut Tracker,
    abh: &AsyncHandoff,
    cx: &mut TickCx<'_>,
) -> Option<Step> {
    match *state {
        State::WaitCheck(after) => {
            if tracker.is_waiting() {
                *state = State::WaitTick(after);
                return Some(Step::Suspend);
            }
            *state = match after {
                After::InitialDelay => State::Next,
                After::Iteration => State::Finish,
            };
            Some(Step::Continue)
        }
        State::WaitTick(after) => {
            if abh.ch.is_cancelled() {
                debug!(i = tracker.looper.gcx().i, "common_step: cancelled while waiting");
                tracker.looper.done(false);
                abh.done(false);
                *state = State::Done;
                return Some(Step::Done);
            }
            tracker.wait_step(cx);
            *state = State::WaitCheck(after);
            Some(Step::Continue)
        }
        State::Finish => {
            tracker.looper.finish_iteration();
            *state = State::Next;
            Some(Step::Continue)
        }
        State::Done => Some(Step::Done),
        _ => None,
    }
}

/// Build the tracker for a freshly started repeater, or finish the handoff
fn begin(props: &Rc<PropertySet>, abh: &AsyncHandoff, cx: &mut TickCx<'_>) -> Option<Tracker> {
    let mut looper = match LoopControl::new(props.clone(), &abh.ch) {
        Ok(looper) => looper,
        Err(e) => {
            cx.fail(e);
            abh.done(false);
            return None;
        }
    };
    if looper.is_clipped() {
        debug!("begin: clipped");
        looper.done(false);
        abh.done(false);
        return None;
    }
    if abh.ch.is_cancelled() {
        debug!("begin: already cancelled");
        looper.done(false);
        abh.done(false);
        return None;
    }
    let mut tracker = Tracker::new(looper);
    tracker.start_initial_delay();
    Some(tracker)
}

/// Repeater over instantaneous children
struct LeafRepeat {
    props: Rc<PropertySet>,
    children: Rc<[SyncPattern]>,
    abh: AsyncHandoff,
    tracker: Option<Tracker>,
    state: State,
}

impl LeafRepeat {
    /// Run the children of one iteration, lagging by the frames the wait overshot
    fn invoke(tracker: &Tracker, children: &[SyncPattern]) -> Result<(), PatternError> {
        let frame_time = tracker.looper.gcx().frame_time();
        let mut sbh = SyncHandoff::new(tracker.looper.handoff().clone(), tracker.elapsed * frame_time);
        for k in tracker.targets(children.len()) {
            children[k].run(&mut sbh)?;
        }
        Ok(())
    }
}

impl Task for LeafRepeat {
    fn step(&mut self, cx: &mut TickCx<'_>) -> Step {
        if let State::Start = self.state {
            return match begin(&self.props, &self.abh, cx) {
                Some(tracker) => {
                    self.tracker = Some(tracker);
                    self.state = State::WaitCheck(After::InitialDelay);
                    Step::Continue
                }
                None => {
                    self.state = State::Done;
                    Step::Done
                }
            };
        }
        let Some(tracker) = self.tracker.as_mut() else {
            return Step::Done;
        };
        if let Some(step) = common_step(&mut self.state, tracker, &self.abh, cx) {
            return step;
        }
        match self.state {
            State::Next => {
                if tracker.looper.remains_except_last() && tracker.looper.prepare_iteration() {
                    if let Err(e) = Self::invoke(tracker, &self.children) {
                        abort(tracker, &self.abh, e, cx);
                        self.state = State::Done;
                        return Step::Done;
                    }
                    tracker.start_wait();
                    self.state = State::WaitCheck(After::Iteration);
                } else {
                    self.state = State::Last;
                }
                Step::Continue
            }
            State::Last => {
                if tracker.looper.prepare_last_iteration() {
                    if let Err(e) = Self::invoke(tracker, &self.children) {
                        abort(tracker, &self.abh, e, cx);
                        self.state = State::Done;
                        return Step::Done;
                    }
                    tracker.looper.finish_iteration();
                }
                tracker.looper.done(true);
                self.abh.done(true);
                self.state = State::Done;
                Step::Done
            }
            _ => Step::Done,
        }
    }

    fn name(&self) -> &str {
        "gcr"
    }
}

/// Report a child error and end the loop abnormally
fn abort(tracker: &mut Tracker, abh: &AsyncHandoff, err: PatternError, cx: &mut TickCx<'_>) {
    cx.fail(err);
    tracker.looper.done(false);
    abh.done(false);
}

/// Repeat instantaneous `children` over multiple ticks
pub fn gc_repeat(props: PropertySet, children: Vec<SyncPattern>) -> Result<AsyncPattern, PatternError> {
    props.expect_kind(PatternKind::Async)?;
    debug!(children = children.len(), ?props, "gc_repeat: called");
    let props = Rc::new(props);
    let children: Rc<[SyncPattern]> = children.into();
    Ok(AsyncPattern::new(move |abh| {
        Box::new(LeafRepeat {
            props: props.clone(),
            children: children.clone(),
            abh,
            tracker: None,
            state: State::Start,
        })
    }))
}

/// Runs a list of durative patterns one after another
struct Sequence {
    children: Rc<[AsyncPattern]>,
    targets: Vec<usize>,
    next: usize,
    ch: CommonHandoff,
    current: Option<Completion>,
    completion: Completion,
}

impl Task for Sequence {
    fn step(&mut self, cx: &mut TickCx<'_>) -> Step {
        if self.current.as_ref().is_some_and(|c| !c.is_done()) {
            return Step::Suspend;
        }
        if self.next >= self.targets.len() || self.ch.is_cancelled() {
            debug!(started = self.next, "Sequence::step: finished");
            self.completion.finish(true);
            return Step::Done;
        }
        let child = &self.children[self.targets[self.next]];
        let done = Completion::new();
        self.next += 1;
        self.current = Some(done.clone());
        cx.spawn(child.start(AsyncHandoff::new(self.ch.clone(), done)));
        Step::Continue
    }

    fn name(&self) -> &str {
        "sequence"
    }
}

/// Repeater over durative children
struct PatternRepeat {
    props: Rc<PropertySet>,
    children: Rc<[AsyncPattern]>,
    abh: AsyncHandoff,
    tracker: Option<Tracker>,
    state: State,
}

impl PatternRepeat {
    /// Start the children of one iteration; the group completes once all of them have
    fn invoke(tracker: &Tracker, props: &PropertySet, children: &Rc<[AsyncPattern]>, cx: &mut TickCx<'_>) -> CompletionGroup {
        let mut group = CompletionGroup::new();
        let ch = tracker.looper.handoff().clone();
        let targets = tracker.targets(children.len());
        if props.is_sequential() {
            let completion = group.join();
            cx.spawn(Box::new(Sequence {
                children: children.clone(),
                targets,
                next: 0,
                ch,
                current: None,
                completion,
            }));
        } else {
            for k in targets {
                let completion = group.join();
                cx.spawn(children[k].start(AsyncHandoff::new(ch.clone(), completion)));
            }
        }
        group
    }
}

impl Task for PatternRepeat {
    fn step(&mut self, cx: &mut TickCx<'_>) -> Step {
        if let State::Start = self.state {
            return match begin(&self.props, &self.abh, cx) {
                Some(tracker) => {
                    self.tracker = Some(tracker);
                    self.state = State::WaitCheck(After::InitialDelay);
                    Step::Continue
                }
                None => {
                    self.state = State::Done;
                    Step::Done
                }
            };
        }
        let Some(tracker) = self.tracker.as_mut() else {
            return Step::Done;
        };
        if let Some(step) = common_step(&mut self.state, tracker, &self.abh, cx) {
            return step;
        }
        match std::mem::replace(&mut self.state, State::Done) {
            State::Next => {
                if tracker.looper.remains_except_last() && tracker.looper.prepare_iteration() {
                    let group = Self::invoke(tracker, &self.props, &self.children, cx);
                    if self.props.waits_for_children() {
                        tracker.pending = Some(group);
                        // The tick a child finishes on is counted by the wait step
                        tracker.elapsed -= 1.0;
                    } else {
                        tracker.pending = None;
                    }
                    tracker.start_wait();
                    self.state = State::WaitCheck(After::Iteration);
                } else {
                    self.state = State::Last;
                }
                Step::Continue
            }
            State::Last => {
                if tracker.looper.prepare_last_iteration() {
                    let group = Self::invoke(tracker, &self.props, &self.children, cx);
                    self.state = State::AwaitLast(group);
                    Step::Continue
                } else {
                    tracker.looper.done(true);
                    self.abh.done(true);
                    Step::Done
                }
            }
            State::AwaitLast(group) => {
                if !group.all_done() {
                    self.state = State::AwaitLast(group);
                    return Step::Suspend;
                }
                let normal = !self.abh.ch.is_cancelled();
                if normal {
                    tracker.looper.finish_iteration();
                }
                tracker.looper.done(normal);
                self.abh.done(normal);
                Step::Done
            }
            _ => Step::Done,
        }
    }

    fn name(&self) -> &str {
        "gir"
    }
}

/// Repeat durative `children` over multiple ticks
pub fn gi_repeat(props: PropertySet, children: Vec<AsyncPattern>) -> Result<AsyncPattern, PatternError> {
    props.expect_kind(PatternKind::Async)?;
    debug!(children = children.len(), ?props, "gi_repeat: called");
    let props = Rc::new(props);
    let children: Rc<[AsyncPattern]> = children.into();
    Ok(AsyncPattern::new(move |abh| {
        Box::new(PatternRepeat {
            props: props.clone(),
            children: children.clone(),
            abh,
            tracker: None,
            state: State::Start,
        })
    }))
}
