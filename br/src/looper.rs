//! Loop controller shared by the instantaneous and durative executors
//!
//! A [`LoopControl`] takes its own copy of a handoff, applies the
//! one-time setup described by a [`PropertySet`], and then exposes the
//! iteration lifecycle: [`prepare_iteration`](LoopControl::prepare_iteration),
//! [`finish_iteration`](LoopControl::finish_iteration) and
//! [`done`](LoopControl::done). Executors decide when each step runs.

use std::rc::Rc;

use tracing::debug;

use crate::context::{CommonHandoff, GenCtx};
use crate::emit::Facing;
use crate::error::PatternError;
use crate::math::{Offset, h_mod, hn_mod, modulo_index, pm1_mod};
use crate::props::PropertySet;
use crate::style::{NO_STYLE, merge_styles};

/// Iteration lifecycle of one loop over a [`PropertySet`]
pub struct LoopControl {
    props: Rc<PropertySet>,
    ch: CommonHandoff,
    parent_index: i64,
    parent_style: String,
    times: i64,
    elapsed_frames: i64,
    allowed_frames: i64,
    cancelled: bool,
    clipped: bool,
    unmutated: Offset,
}

impl LoopControl {
    /// Copy `base` and run the one-time loop setup.
    ///
    /// Fails when laser-time indexing is requested on an emitter that is not
    /// a laser. An out-of-range laser index or a true clip predicate yields a
    /// clipped loop instead; check [`is_clipped`](Self::is_clipped).
    pub fn new(props: Rc<PropertySet>, base: &CommonHandoff) -> Result<Self, PatternError> {
        let mut ch = base.clone();
        debug!(index = ch.gcx.index, rv2 = %ch.gcx.rv2, "LoopControl::new: called");
        let mut clipped = false;

        let parent_index = match &props.index_mutator {
            Some(m) => m(&ch.gcx) as i64,
            None => ch.gcx.index,
        };
        if props.reset_color {
            ch.creator.style = NO_STYLE.to_string();
        }
        if let Some((to_zero, banker)) = &props.bank {
            let angle = if *to_zero { Some(0.0) } else { None };
            ch.gcx.rv2 = ch.gcx.rv2.bank(angle) + banker(&ch.gcx);
        }
        if let Some((root, adjust)) = &props.root {
            let new_root = root(&ch.gcx);
            if *adjust {
                let shift = ch.creator.parent_offset() - new_root;
                ch.gcx.rv2 = ch.gcx.rv2 + shift;
            }
            debug!(x = new_root.x, y = new_root.y, adjust, "LoopControl::new: root override");
            ch.creator.root = Some(new_root);
        } else if let Some(indexer) = &props.laser_index {
            let emitter = ch.creator.emitter().clone();
            let laser = emitter.laser().ok_or_else(|| PatternError::NotLaser {
                emitter: emitter.id().to_string(),
            })?;
            ch.creator.facing = Facing::Derot;
            let t = indexer(&ch.gcx);
            match laser.index(t) {
                Some(offset) => ch.gcx.rv2 += offset,
                None => {
                    debug!(t, "LoopControl::new: laser index out of range, clipping");
                    clipped = true;
                }
            }
        }
        if let Some(targeting) = &props.targeting {
            let src = if targeting.from_summon {
                ch.creator.to_raw_position(ch.gcx.rv2)
            } else {
                ch.creator.parent_offset()
            };
            ch.gcx.rv2 = targeting.apply(ch.gcx.rv2, src, &ch.gcx);
        }
        let parent_style = ch.creator.style.clone();
        if let Some(facing) = props.facing {
            ch.creator.facing = facing;
        }
        ch.gcx.base_rv2 = ch.gcx.rv2;
        let times = ((props.times)(&ch.gcx) as i64).max(0);
        ch.gcx.set_var("times", times as f64);
        ch.gcx.apply_rules(&props.start);
        if props.centered {
            let incr = props.resolve_increment(&ch.gcx, times);
            ch.gcx.rv2 -= incr * ((times - 1) as f64 / 2.0);
        }
        clipped = clipped || props.clip_if.as_ref().is_some_and(|f| f(&ch.gcx));
        let allowed_frames = props.for_time.as_ref().map_or(i64::MAX, |f| f(&ch.gcx) as i64);
        ch.gcx.pi = ch.gcx.i;
        ch.gcx.i = 0;
        let unmutated = ch.gcx.rv2;

        debug!(times, clipped, allowed_frames, parent_index, "LoopControl::new: initialized");
        Ok(Self {
            props,
            ch,
            parent_index,
            parent_style,
            times,
            elapsed_frames: 0,
            allowed_frames,
            cancelled: false,
            clipped,
            unmutated,
        })
    }

    pub fn props(&self) -> &PropertySet {
        &self.props
    }

    pub fn handoff(&self) -> &CommonHandoff {
        &self.ch
    }

    pub fn gcx(&self) -> &GenCtx {
        &self.ch.gcx
    }

    pub fn gcx_mut(&mut self) -> &mut GenCtx {
        &mut self.ch.gcx
    }

    /// Resolved iteration count `N`
    pub fn times(&self) -> i64 {
        self.times
    }

    pub fn is_clipped(&self) -> bool {
        self.clipped
    }

    /// Whether the branch's cancellation token has fired
    pub fn is_token_cancelled(&self) -> bool {
        self.ch.cancel.is_cancelled()
    }

    /// Whether the loop has permanently stopped iterating
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn elapsed_frames(&self) -> i64 {
        self.elapsed_frames
    }

    pub fn remains(&self) -> bool {
        self.ch.gcx.i < self.times
    }

    pub fn remains_except_last(&self) -> bool {
        self.ch.gcx.i < self.times - 1
    }

    /// Evaluate the pause predicate; loops without one are never paused
    pub fn is_unpaused(&self) -> bool {
        self.props.run_while.as_ref().is_none_or(|f| f(&self.ch.gcx))
    }

    /// Account for one waited tick
    pub fn wait_step(&mut self) {
        self.ch.gcx.summon_time += self.ch.gcx.frame_time();
        self.elapsed_frames += 1;
    }

    /// Index of the single child to invoke this iteration, if child selection is configured
    pub fn selected_child(&self, children: usize) -> Option<usize> {
        let select = self.props.child_select.as_ref()?;
        let idx = select(&self.ch.gcx) as i64;
        Some(modulo_index(children as i64, idx) as usize)
    }

    fn check_cancelled(&mut self) -> bool {
        self.cancelled = self.cancelled
            || self.props.cancel_if.as_ref().is_some_and(|f| f(&self.ch.gcx))
            || self.elapsed_frames >= self.allowed_frames;
        self.cancelled
    }

    fn apply_bindings(&mut self) {
        let bindings = &self.props.bindings;
        let gcx = &mut self.ch.gcx;
        let i = gcx.i as f64;
        let n = self.times as f64;
        if bindings.arrow {
            gcx.set_var("axd", h_mod(n, i));
            gcx.set_var("ayd", hn_mod(n, i));
            gcx.set_var("aixd", h_mod(n, n - 1.0 - i));
            gcx.set_var("aiyd", hn_mod(n, n - 1.0 - i));
        }
        if bindings.lr {
            let lr = pm1_mod(i);
            gcx.set_var("lr", lr);
            gcx.set_var("rl", -lr);
        }
        if bindings.ud {
            let ud = pm1_mod(i);
            gcx.set_var("ud", ud);
            gcx.set_var("du", -ud);
        }
        if bindings.angle {
            let angle = gcx.rv2.angle;
            gcx.set_var("angle", angle);
        }
        if let Some(name) = &bindings.itr {
            gcx.set_var(name, i);
        }
    }

    /// Set up the next iteration; `false` means the loop must stop
    pub fn prepare_iteration(&mut self) -> bool {
        let props = self.props.clone();
        if props.reset_time {
            self.ch.gcx.summon_time = 0.0;
        }
        if let Some(timer) = &props.timer {
            timer.restart();
        }
        self.ch.gcx.index = props.indexer.index(self.parent_index, self.ch.gcx.i);
        self.apply_bindings();
        self.ch.gcx.apply_rules(&props.pre_loop);
        if self.check_cancelled() {
            debug!(i = self.ch.gcx.i, "LoopControl::prepare_iteration: cancelled");
            return false;
        }

        if let Some(color) = props.color.as_ref().filter(|c| !c.colors.is_empty()) {
            let idx = color.indexer.as_ref().map_or(self.ch.gcx.i, |f| f(&self.ch.gcx) as i64);
            let fragment = &color.colors[modulo_index(color.colors.len() as i64, idx) as usize];
            self.ch.creator.style = if color.reverse {
                merge_styles(fragment, &self.parent_style)
            } else {
                merge_styles(&self.parent_style, fragment)
            };
        }

        if let Some(sah) = &props.summon_along {
            let gcx = &mut self.ch.gcx;
            let loc = sah.locate(gcx);
            gcx.rv2 = gcx.base_rv2 + Offset::rot(loc.x, loc.y);
            let mut lookahead = gcx.clone();
            lookahead.finish_iteration(&props.post_loop, Offset::ZERO);
            lookahead.apply_rules(&props.pre_loop);
            let next_loc = sah.locate(&lookahead);
            let next = gcx.base_rv2 + Offset::rot(next_loc.x, next_loc.y);
            gcx.rv2 = sah.angle(gcx, gcx.rv2, next);
        } else if let Some(f) = &props.offset_fn {
            let gcx = &mut self.ch.gcx;
            gcx.rv2 = gcx.base_rv2 + f(gcx);
        }

        let gcx = &self.ch.gcx;
        for save in &props.save_f {
            let idx = (save.indexer)(gcx) as i64;
            gcx.world().hoist.save_float(&save.name, idx, (save.value)(gcx));
        }
        for save in &props.save_v2 {
            let idx = (save.indexer)(gcx) as i64;
            gcx.world().hoist.save_vector(&save.name, idx, (save.value)(gcx));
        }

        let sfx = props
            .sfx
            .as_ref()
            .filter(|s| !s.cues.is_empty() && s.guard.as_ref().is_none_or(|g| g(gcx)));
        if let Some(sfx) = sfx {
            let idx = sfx.indexer.as_ref().map_or(gcx.i, |f| f(gcx) as i64);
            let cue = &sfx.cues[modulo_index(sfx.cues.len() as i64, idx) as usize];
            gcx.world().sfx.borrow_mut().request(cue);
        }

        self.unmutated = self.ch.gcx.rv2;
        if let Some(m) = &props.angle_mutator {
            let angle = m(&self.ch.gcx);
            self.ch.gcx.rv2 = self.ch.gcx.rv2.with_angle(angle);
        }
        debug!(
            i = self.ch.gcx.i,
            index = self.ch.gcx.index,
            rv2 = %self.ch.gcx.rv2,
            "LoopControl::prepare_iteration: ready"
        );
        true
    }

    /// [`prepare_iteration`](Self::prepare_iteration), but only when exactly one iteration remains
    pub fn prepare_last_iteration(&mut self) -> bool {
        if self.ch.gcx.i == self.times - 1 {
            self.prepare_iteration()
        } else {
            false
        }
    }

    /// Undo the angle mutation, run post-loop rules, add the increment and advance `i`
    pub fn finish_iteration(&mut self) {
        self.ch.gcx.rv2 = self.unmutated;
        let incr = self.props.resolve_increment(&self.ch.gcx, self.times);
        self.ch.gcx.finish_iteration(&self.props.post_loop, incr);
    }

    /// Finish the loop, running end rules on a normal end
    pub fn done(&mut self, normal: bool) {
        debug!(normal, i = self.ch.gcx.i, times = self.times, "LoopControl::done: called");
        if normal {
            let props = self.props.clone();
            self.ch.gcx.apply_rules(&props.end);
        }
    }
}

impl std::fmt::Debug for LoopControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopControl")
            .field("i", &self.ch.gcx.i)
            .field("times", &self.times)
            .field("elapsed_frames", &self.elapsed_frames)
            .field("cancelled", &self.cancelled)
            .field("clipped", &self.clipped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{EmissionLog, PointEmitter, PolylineLaser};
    use crate::math::Vec2;
    use crate::parametrization::{FiringIndexer, Parametrization};
    use crate::props::{Property, Rule, RuleOp, SaveBinding, TargetMethod};
    use crate::world::{SfxLog, World};
    use proptest::prelude::*;
    use std::cell::RefCell;

    fn handoff_with(emitter: PointEmitter) -> CommonHandoff {
        let log = Rc::new(RefCell::new(EmissionLog::new()));
        CommonHandoff::root(Rc::new(emitter), log, World::default())
    }

    fn handoff() -> CommonHandoff {
        handoff_with(PointEmitter::new("e", Vec2::ZERO))
    }

    fn looper(props: Vec<Property>) -> LoopControl {
        let set = Rc::new(PropertySet::sync(props).unwrap());
        LoopControl::new(set, &handoff()).unwrap()
    }

    #[test]
    fn test_lifecycle_counts_iterations() {
        let mut lc = looper(vec![Property::times_const(3)]);
        let mut count = 0;
        while lc.remains() && lc.prepare_iteration() {
            count += 1;
            lc.finish_iteration();
        }
        assert_eq!(count, 3);
        assert_eq!(lc.gcx().i, 3);
    }

    #[test]
    fn test_copy_leaves_base_untouched() {
        let base = handoff();
        let set = Rc::new(PropertySet::sync([Property::sync(3, Offset::nrot(1.0, 0.0))]).unwrap());
        let mut lc = LoopControl::new(set, &base).unwrap();
        lc.prepare_iteration();
        lc.finish_iteration();
        assert_eq!(lc.gcx().rv2.nx, 1.0);
        assert_eq!(base.gcx.rv2, Offset::ZERO);
    }

    #[test]
    fn test_mutation_is_undone() {
        let mut lc = looper(vec![
            Property::times_const(4),
            Property::rv2_incr_const(Offset::new(1.0, 0.0, 0.0, 0.0, 15.0)),
            Property::mutate_angle(|g| g.i as f64 * 100.0 + 7.0),
        ]);
        let mut before = lc.gcx().rv2;
        while lc.remains() && lc.prepare_iteration() {
            assert_eq!(lc.gcx().rv2.angle, lc.gcx().i as f64 * 100.0 + 7.0);
            lc.finish_iteration();
            assert_eq!(lc.gcx().rv2, before + Offset::new(1.0, 0.0, 0.0, 0.0, 15.0));
            before = lc.gcx().rv2;
        }
    }

    proptest! {
        #[test]
        fn test_mutation_never_leaks(
            times in 1u32..12,
            step in -50i32..50,
            turn in -360i32..360,
            scale in -20i32..20,
        ) {
            let incr = Offset::new(f64::from(step), 0.0, 0.0, 0.0, f64::from(turn));
            let mut lc = looper(vec![
                Property::times_const(times),
                Property::rv2_incr_const(incr),
                Property::mutate_angle(move |g| g.i as f64 * f64::from(scale)),
            ]);
            let start = lc.gcx().rv2;
            let mut n = 0.0;
            while lc.remains() && lc.prepare_iteration() {
                lc.finish_iteration();
                n += 1.0;
            }
            prop_assert_eq!(lc.gcx().rv2, start + incr * n);
        }

        #[test]
        fn test_centered_mean_is_base(times in 1u32..20, dx in -30i32..30, dy in -30i32..30) {
            let mut lc = looper(vec![
                Property::times_const(times),
                Property::rv2_incr_const(Offset::nrot(f64::from(dx), f64::from(dy))),
                Property::Center,
            ]);
            let mut sum = Vec2::ZERO;
            while lc.remains() && lc.prepare_iteration() {
                sum += lc.gcx().rv2.true_location();
                lc.finish_iteration();
            }
            let mean = sum / f64::from(times);
            prop_assert!(mean.x.abs() < 1e-9);
            prop_assert!(mean.y.abs() < 1e-9);
        }
    }

    #[test]
    fn test_cancel_is_sticky() {
        let mut lc = looper(vec![Property::times_const(10), Property::cancel(|g| g.i == 2)]);
        let mut prepared = Vec::new();
        for _ in 0..10 {
            if lc.prepare_iteration() {
                prepared.push(lc.gcx().i);
            }
            // Advance regardless so the predicate would flip back to false
            lc.finish_iteration();
        }
        assert_eq!(prepared, vec![0, 1]);
        assert!(lc.is_cancelled());
    }

    #[test]
    fn test_clip_predicate() {
        let lc = looper(vec![Property::clip(|_| true)]);
        assert!(lc.is_clipped());
        let lc = looper(vec![Property::clip(|_| false)]);
        assert!(!lc.is_clipped());
    }

    #[test]
    fn test_for_time_cutoff() {
        let set = Rc::new(PropertySet::durative([Property::times_const(100), Property::for_frames(2.0)]).unwrap());
        let mut lc = LoopControl::new(set, &handoff()).unwrap();
        assert!(lc.prepare_iteration());
        lc.wait_step();
        assert!(lc.prepare_iteration());
        lc.wait_step();
        assert!(!lc.prepare_iteration());
    }

    #[test]
    fn test_firing_index_mod() {
        let set = Rc::new(
            PropertySet::sync([
                Property::times_const(4),
                Property::MaxTimes(2),
                Property::parametrize(Parametrization::Mod),
            ])
            .unwrap(),
        );
        assert_eq!(set.indexer(), FiringIndexer::Mod(2));
        let mut base = handoff();
        base.gcx.index = 3;
        let mut lc = LoopControl::new(set, &base).unwrap();
        let mut idx = Vec::new();
        while lc.remains() && lc.prepare_iteration() {
            idx.push(lc.gcx().index);
            lc.finish_iteration();
        }
        assert_eq!(idx, vec![6, 7, 6, 7]);
    }

    #[test]
    fn test_parent_index_mutator() {
        let mut lc = looper(vec![Property::set_parent_index(|_| 9.0)]);
        lc.prepare_iteration();
        assert_eq!(lc.gcx().index, 9);
    }

    #[test]
    fn test_color_merge_directions() {
        let mut base = handoff();
        base.creator.style = "circle-*".to_string();
        let set = Rc::new(PropertySet::sync([Property::times_const(3), Property::color(["red", "blue"])]).unwrap());
        let mut lc = LoopControl::new(set, &base).unwrap();
        let mut styles = Vec::new();
        while lc.remains() && lc.prepare_iteration() {
            styles.push(lc.handoff().creator.style.clone());
            lc.finish_iteration();
        }
        assert_eq!(styles, vec!["circle-red", "circle-blue", "circle-red"]);

        let set = Rc::new(PropertySet::sync([Property::color_reverse(["*-glow"])]).unwrap());
        let mut lc = LoopControl::new(set, &base).unwrap();
        lc.prepare_iteration();
        assert_eq!(lc.handoff().creator.style, "circle-*-glow");
    }

    #[test]
    fn test_reset_color() {
        let mut base = handoff();
        base.creator.style = "circle-*".to_string();
        let set = Rc::new(PropertySet::sync([Property::ResetColor, Property::color(["red"])]).unwrap());
        let mut lc = LoopControl::new(set, &base).unwrap();
        lc.prepare_iteration();
        assert_eq!(lc.handoff().creator.style, "red");
    }

    #[test]
    fn test_bindings() {
        let mut lc = looper(vec![
            Property::times_const(4),
            Property::BindArrow,
            Property::BindLr,
            Property::BindUd,
            Property::BindAngle,
            Property::BindItr("k".into()),
        ]);
        lc.prepare_iteration();
        lc.finish_iteration();
        lc.prepare_iteration();
        let g = lc.gcx();
        assert_eq!(g.var("k"), Some(1.0));
        assert_eq!(g.var("lr"), Some(-1.0));
        assert_eq!(g.var("rl"), Some(1.0));
        assert_eq!(g.var("ud"), Some(-1.0));
        assert_eq!(g.var("du"), Some(1.0));
        assert_eq!(g.var("axd"), Some(h_mod(4.0, 1.0)));
        assert_eq!(g.var("aiyd"), Some(hn_mod(4.0, 2.0)));
        assert_eq!(g.var("angle"), Some(0.0));
        assert_eq!(g.var("times"), Some(4.0));
    }

    #[test]
    fn test_start_and_end_rules() {
        let set = Rc::new(
            PropertySet::sync([
                Property::start(vec![Rule::var("s", RuleOp::Assign, |g| g.var_or_zero("times"))]),
                Property::end(vec![Rule::var("e", RuleOp::Assign, |_| 1.0)]),
                Property::times_const(2),
            ])
            .unwrap(),
        );
        let mut lc = LoopControl::new(set, &handoff()).unwrap();
        assert_eq!(lc.gcx().var("s"), Some(2.0));
        lc.done(true);
        assert_eq!(lc.gcx().var("e"), Some(1.0));
    }

    #[test]
    fn test_centered_pre_subtracts() {
        let lc = looper(vec![Property::times_const(5), Property::rv2_incr_const(Offset::nrot(2.0, 0.0)), Property::Center]);
        assert_eq!(lc.gcx().rv2.nx, -4.0);
    }

    #[test]
    fn test_root_adjust_preserves_position() {
        let mut base = handoff_with(PointEmitter::new("e", Vec2::new(10.0, 0.0)));
        base.gcx.rv2 = Offset::nrot(1.0, 0.0);
        let before = base.creator.to_raw_position(base.gcx.rv2);
        let set = Rc::new(PropertySet::sync([Property::root(Vec2::new(0.0, 0.0), true)]).unwrap());
        let lc = LoopControl::new(set, &base).unwrap();
        let after = lc.handoff().creator.to_raw_position(lc.gcx().rv2);
        assert_eq!(before, after);
        assert_eq!(lc.handoff().creator.root, Some(Vec2::ZERO));
    }

    #[test]
    fn test_bank_to_zero() {
        let mut base = handoff();
        base.gcx.rv2 = Offset::new(0.0, 0.0, 1.0, 0.0, 90.0);
        let set = Rc::new(PropertySet::sync([Property::bank(true, Offset::rot(2.0, 0.0))]).unwrap());
        let lc = LoopControl::new(set, &base).unwrap();
        let rv2 = lc.gcx().rv2;
        assert!(rv2.nx.abs() < 1e-9);
        assert!((rv2.ny - 1.0).abs() < 1e-9);
        assert_eq!(rv2.rx, 2.0);
        assert_eq!(rv2.angle, 0.0);
    }

    #[test]
    fn test_target_angle() {
        let set = Rc::new(PropertySet::sync([Property::target(TargetMethod::Angle, Vec2::new(0.0, 5.0))]).unwrap());
        let lc = LoopControl::new(set, &handoff()).unwrap();
        assert!((lc.gcx().rv2.angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_laser_index_requires_laser() {
        let set = Rc::new(PropertySet::sync([Property::on_laser(|_| 0.5)]).unwrap());
        let err = LoopControl::new(set, &handoff()).unwrap_err();
        assert!(matches!(err, PatternError::NotLaser { .. }));
    }

    #[test]
    fn test_laser_index_out_of_range_clips() {
        let laser = PolylineLaser {
            centers: vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)],
            stagger: 1.0,
        };
        let base = handoff_with(PointEmitter::new("l", Vec2::ZERO).with_laser(laser));

        let set = Rc::new(PropertySet::sync([Property::on_laser(|_| 0.5)]).unwrap());
        let lc = LoopControl::new(set, &base).unwrap();
        assert!(!lc.is_clipped());
        assert_eq!(lc.gcx().rv2.nx, 0.5);
        assert_eq!(lc.handoff().creator.facing, Facing::Derot);

        let set = Rc::new(PropertySet::sync([Property::on_laser(|_| 5.0)]).unwrap());
        let lc = LoopControl::new(set, &base).unwrap();
        assert!(lc.is_clipped());
    }

    #[test]
    fn test_save_bindings_and_sfx() {
        let sfx = Rc::new(RefCell::new(SfxLog::default()));
        let world = World::default().with_sfx(sfx.clone());
        let log = Rc::new(RefCell::new(EmissionLog::new()));
        let base = CommonHandoff::root(Rc::new(PointEmitter::new("e", Vec2::ZERO)), log, world.clone());
        let set = Rc::new(
            PropertySet::sync([
                Property::times_const(3),
                Property::SaveF(vec![SaveBinding::new("sq", |g| g.i as f64, |g| (g.i * g.i) as f64)]),
                Property::sfx(["a", "b"]),
            ])
            .unwrap(),
        );
        let mut lc = LoopControl::new(set, &base).unwrap();
        while lc.remains() && lc.prepare_iteration() {
            lc.finish_iteration();
        }
        assert_eq!(world.hoist.get_float("sq", 2), Some(4.0));
        assert_eq!(sfx.borrow().cues, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_alternate_selects_child() {
        let lc = looper(vec![Property::alternate(|g| g.i as f64 + 5.0)]);
        assert_eq!(lc.selected_child(3), Some(2));
        let lc = looper(vec![]);
        assert_eq!(lc.selected_child(3), None);
    }

    #[test]
    fn test_prepare_last_iteration() {
        let mut lc = looper(vec![Property::times_const(2)]);
        assert!(!lc.prepare_last_iteration());
        lc.finish_iteration();
        assert!(lc.prepare_last_iteration());
    }
}
