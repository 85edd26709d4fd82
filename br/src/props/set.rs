//! Immutable, validated property set for one loop

use tracing::debug;

use super::property::{
    ColorSpec, Increment, PatternKind, Property, SaveBinding, SfxSpec, SummonAlong, Targeting,
};
use super::rule::{Gcxf, Rule, constant};
use crate::context::GenCtx;
use crate::emit::Facing;
use crate::error::PatternError;
use crate::math::{Offset, Vec2};
use crate::parametrization::{FiringIndexer, Parametrization};
use crate::pattern::AsyncPattern;
use crate::world::Timer;

/// Automatic bindings written into the named-variable map every iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    /// `axd`, `ayd`, `aixd`, `aiyd`
    pub arrow: bool,
    /// `lr`, `rl`
    pub lr: bool,
    /// `ud`, `du`
    pub ud: bool,
    /// `angle`
    pub angle: bool,
    /// Loop counter under a chosen name
    pub itr: Option<String>,
}

/// Declaratively configured knobs for one loop.
///
/// Built once from a list of [`Property`] values and never mutated. Later
/// declarations of scalar properties replace earlier ones; rule lists and
/// save-bindings accumulate in declaration order.
#[derive(Clone)]
pub struct PropertySet {
    pub(crate) kind: PatternKind,
    pub(crate) times: Gcxf<f64>,
    pub(crate) max_times: Option<u32>,
    pub(crate) wait: Gcxf<f64>,
    pub(crate) delay: Gcxf<f64>,
    pub(crate) for_time: Option<Gcxf<f64>>,
    pub(crate) wait_child: bool,
    pub(crate) sequential: bool,
    pub(crate) child_select: Option<Gcxf<f64>>,
    pub(crate) root: Option<(Gcxf<Vec2>, bool)>,
    pub(crate) bank: Option<(bool, Gcxf<Offset>)>,
    pub(crate) targeting: Option<Targeting>,
    pub(crate) indexer: FiringIndexer,
    pub(crate) index_mutator: Option<Gcxf<f64>>,
    pub(crate) start: Vec<Rule>,
    pub(crate) pre_loop: Vec<Rule>,
    pub(crate) post_loop: Vec<Rule>,
    pub(crate) end: Vec<Rule>,
    pub(crate) increment: Option<Increment>,
    pub(crate) angle_mutator: Option<Gcxf<f64>>,
    pub(crate) offset_fn: Option<Gcxf<Offset>>,
    pub(crate) facing: Option<Facing>,
    pub(crate) sfx: Option<SfxSpec>,
    pub(crate) reset_color: bool,
    pub(crate) color: Option<ColorSpec>,
    pub(crate) summon_along: Option<SummonAlong>,
    pub(crate) run_while: Option<Gcxf<bool>>,
    pub(crate) unpause: Option<AsyncPattern>,
    pub(crate) save_f: Vec<SaveBinding<f64>>,
    pub(crate) save_v2: Vec<SaveBinding<Vec2>>,
    pub(crate) clip_if: Option<Gcxf<bool>>,
    pub(crate) cancel_if: Option<Gcxf<bool>>,
    pub(crate) reset_time: bool,
    pub(crate) timer: Option<Timer>,
    pub(crate) laser_index: Option<Gcxf<f64>>,
    pub(crate) centered: bool,
    pub(crate) bindings: Bindings,
}

/// Accumulator used while unrolling the property list
struct Builder {
    set: PropertySet,
    parametrization: Parametrization,
}

impl PropertySet {
    /// Property set for an instantaneous pattern
    pub fn sync(props: impl IntoIterator<Item = Property>) -> Result<Self, PatternError> {
        Self::new(PatternKind::Sync, props)
    }

    /// Property set for a durative pattern
    pub fn durative(props: impl IntoIterator<Item = Property>) -> Result<Self, PatternError> {
        Self::new(PatternKind::Async, props)
    }

    /// Build and validate a property set
    pub fn new(kind: PatternKind, props: impl IntoIterator<Item = Property>) -> Result<Self, PatternError> {
        debug!(%kind, "PropertySet::new: called");
        let mut builder = Builder {
            set: Self::empty(kind),
            parametrization: Parametrization::Defer,
        };
        for prop in props {
            builder.add(prop)?;
        }
        let Builder { mut set, parametrization } = builder;

        if set.summon_along.is_some() && set.offset_fn.is_some() {
            debug!("PropertySet::new: summon-along combined with offset-fn");
            return Err(PatternError::TrackingWithOffsetFunction);
        }
        if set.unpause.is_some() && set.run_while.is_none() {
            debug!("PropertySet::new: unpause without while");
            return Err(PatternError::UnpauseWithoutWhile);
        }
        set.indexer = FiringIndexer::new(parametrization, set.max_times)?;
        if set.summon_along.is_some() || set.offset_fn.is_some() {
            debug!("PropertySet::new: position is computed per iteration, dropping increment");
            set.increment = None;
        }
        Ok(set)
    }

    fn empty(kind: PatternKind) -> Self {
        Self {
            kind,
            times: constant(1.0),
            max_times: None,
            wait: constant(0.0),
            delay: constant(0.0),
            for_time: None,
            wait_child: false,
            sequential: false,
            child_select: None,
            root: None,
            bank: None,
            targeting: None,
            indexer: FiringIndexer::Defer,
            index_mutator: None,
            start: Vec::new(),
            pre_loop: Vec::new(),
            post_loop: Vec::new(),
            end: Vec::new(),
            increment: None,
            angle_mutator: None,
            offset_fn: None,
            facing: None,
            sfx: None,
            reset_color: false,
            color: None,
            summon_along: None,
            run_while: None,
            unpause: None,
            save_f: Vec::new(),
            save_v2: Vec::new(),
            clip_if: None,
            cancel_if: None,
            reset_time: false,
            timer: None,
            laser_index: None,
            centered: false,
            bindings: Bindings::default(),
        }
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn max_times(&self) -> Option<u32> {
        self.max_times
    }

    pub fn waits_for_children(&self) -> bool {
        self.wait_child
    }

    pub fn is_sequential(&self) -> bool {
        self.sequential
    }

    pub fn is_centered(&self) -> bool {
        self.centered
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn indexer(&self) -> FiringIndexer {
        self.indexer
    }

    /// The active increment, if any
    pub fn increment(&self) -> Option<&Increment> {
        self.increment.as_ref()
    }

    /// Resolved per-iteration increment for a loop of `times` iterations
    pub fn resolve_increment(&self, gcx: &GenCtx, times: i64) -> Offset {
        self.increment
            .as_ref()
            .map_or(Offset::ZERO, |incr| incr.resolve(gcx, times))
    }

    /// Fail unless this set was built for `kind`
    pub fn expect_kind(&self, kind: PatternKind) -> Result<(), PatternError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(PatternError::KindMismatch {
                expected: kind.to_string(),
                found: self.kind.to_string(),
            })
        }
    }
}

impl Builder {
    fn add(&mut self, prop: Property) -> Result<(), PatternError> {
        let set = &mut self.set;
        if set.kind == PatternKind::Sync && prop.requires_async() {
            debug!(property = prop.name(), "Builder::add: rejected for sync pattern");
            return Err(PatternError::PropertyNotAllowed {
                property: prop.name().to_string(),
                kind: set.kind.to_string(),
            });
        }
        match prop {
            Property::Times(f) => set.times = f,
            Property::MaxTimes(n) => set.max_times = Some(n),
            Property::Wait(f) => set.wait = f,
            Property::For(f) => set.for_time = Some(f),
            Property::Delay(f) => set.delay = f,
            Property::WaitChild => set.wait_child = true,
            Property::Sequential => set.sequential = true,
            Property::Alternate(f) => set.child_select = Some(f),
            Property::Root { root, adjust } => set.root = Some((root, adjust)),
            Property::Bank { to_zero, offset } => set.bank = Some((to_zero, offset)),
            Property::Start(rules) => set.start.extend(rules),
            Property::PreLoop(rules) => set.pre_loop.extend(rules),
            Property::PostLoop(rules) => set.post_loop.extend(rules),
            Property::End(rules) => set.end.extend(rules),
            Property::Increment(incr) => {
                let replace = set
                    .increment
                    .as_ref()
                    .is_none_or(|cur| incr.priority() >= cur.priority());
                if replace {
                    set.increment = Some(incr);
                }
            }
            Property::MutateAngle(f) => set.angle_mutator = Some(f),
            Property::OffsetFn(f) => set.offset_fn = Some(f),
            Property::Face(facing) => set.facing = Some(facing),
            Property::Sfx(spec) => set.sfx = Some(spec),
            Property::Parametrize { strategy, mutator } => {
                self.parametrization = strategy;
                set.index_mutator = mutator;
            }
            Property::ResetColor => set.reset_color = true,
            Property::Color(spec) => set.color = Some(spec),
            Property::SummonAlong(sah) => set.summon_along = Some(sah),
            Property::Target(t) => set.targeting = Some(t),
            Property::While(f) => set.run_while = Some(f),
            Property::Unpause(p) => set.unpause = Some(p),
            Property::SaveF(bindings) => set.save_f.extend(bindings),
            Property::SaveV2(bindings) => set.save_v2.extend(bindings),
            Property::Clip(f) => set.clip_if = Some(f),
            Property::Cancel(f) => set.cancel_if = Some(f),
            Property::TimeReset => set.reset_time = true,
            Property::Timer(t) => set.timer = Some(t),
            Property::OnLaser(f) => set.laser_index = Some(f),
            Property::Center => set.centered = true,
            Property::BindArrow => set.bindings.arrow = true,
            Property::BindLr => set.bindings.lr = true,
            Property::BindUd => set.bindings.ud = true,
            Property::BindAngle => set.bindings.angle = true,
            Property::BindItr(name) => set.bindings.itr = Some(name),
            Property::Composite(props) => {
                for p in props {
                    self.add(p)?;
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for PropertySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySet")
            .field("kind", &self.kind)
            .field("max_times", &self.max_times)
            .field("indexer", &self.indexer)
            .field("increment", &self.increment)
            .field("wait_child", &self.wait_child)
            .field("sequential", &self.sequential)
            .field("centered", &self.centered)
            .field("bindings", &self.bindings)
            .finish()
    }
}
