//! YAML pattern scripts
//!
//! A script describes an emitter and a tree of pattern nodes. Every node
//! names its executor (`gsr`, `gcr`, `gir`) or leaf action (`emit`, `hold`,
//! `sfx`, `noop`) and carries a property table whose keys mirror
//! [`Property`]. Numeric values may be constants, named variables, random
//! draws, or linear functions of the loop counter.
//!
//! ```yaml
//! emitter:
//!   id: boss
//!   position: [0, 100]
//! pattern:
//!   node: gcr
//!   props:
//!     wait: 10
//!     times: 3
//!     rv2-incr: { angle: 15 }
//!   children:
//!     - node: emit
//!       velocity: { kind: linear, speed: 2 }
//! ```

use serde::Deserialize;
use tracing::{debug, warn};

use crate::context::GenCtx;
use crate::emit::{Facing, PointEmitter, PolylineLaser, Velocity};
use crate::error::PatternError;
use crate::math::{Offset, Vec2};
use crate::parametrization::Parametrization;
use crate::pattern::{self, AsyncPattern, SyncPattern, gc_repeat, gi_repeat, gs_repeat};
use crate::props::{
    ColorSpec, Gcxf, Increment, PatternKind, Property, PropertySet, Rule, RuleOp, RuleTarget, SaveBinding,
    SfxSpec, SummonAlong, SummonAngle, TargetMethod, Targeting, gcxf,
};
use crate::world::World;

/// A parsed pattern script
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub emitter: EmitterSpec,
    pub pattern: NodeSpec,
}

impl Script {
    /// Parse a script from YAML text
    pub fn from_yaml(text: &str) -> Result<Self, PatternError> {
        debug!(len = text.len(), "Script::from_yaml: called");
        serde_yaml::from_str(text).map_err(|e| PatternError::Script(e.to_string()))
    }

    /// Emitter the root pattern runs on
    pub fn emitter(&self) -> PointEmitter {
        self.emitter.build()
    }

    /// Build the pattern tree. A sync root is wrapped to run once.
    pub fn build(&self, world: &World) -> Result<AsyncPattern, PatternError> {
        debug!(root = %self.pattern.node, "Script::build: called");
        build_async(&self.pattern, world)
    }

    /// Number of nodes in the tree, property-embedded patterns included
    pub fn node_count(&self) -> usize {
        self.pattern.count()
    }
}

/// Emitter description
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EmitterSpec {
    pub id: String,
    pub position: [f64; 2],
    pub original_angle: f64,
    pub velocity_angle: Option<f64>,
    pub laser: Option<LaserSpec>,
}

impl Default for EmitterSpec {
    fn default() -> Self {
        Self {
            id: "emitter".to_string(),
            position: [0.0, 0.0],
            original_angle: 0.0,
            velocity_angle: None,
            laser: None,
        }
    }
}

impl EmitterSpec {
    fn build(&self) -> PointEmitter {
        let mut emitter = PointEmitter::new(&self.id, point(self.position)).with_original_angle(self.original_angle);
        emitter.velocity_angle = self.velocity_angle;
        if let Some(laser) = &self.laser {
            emitter = emitter.with_laser(PolylineLaser {
                centers: laser.centers.iter().copied().map(point).collect(),
                stagger: laser.stagger,
            });
        }
        emitter
    }
}

/// Laser path sampled every `stagger` seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LaserSpec {
    pub centers: Vec<[f64; 2]>,
    pub stagger: f64,
}

/// Node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Instantaneous repeater
    Gsr,
    /// Durative repeater over sync children
    Gcr,
    /// Durative repeater over async children
    Gir,
    Emit,
    Hold,
    Sfx,
    Noop,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gsr => write!(f, "gsr"),
            Self::Gcr => write!(f, "gcr"),
            Self::Gir => write!(f, "gir"),
            Self::Emit => write!(f, "emit"),
            Self::Hold => write!(f, "hold"),
            Self::Sfx => write!(f, "sfx"),
            Self::Noop => write!(f, "noop"),
        }
    }
}

/// One node of the pattern tree
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NodeSpec {
    pub node: NodeKind,
    #[serde(default)]
    pub props: PropsSpec,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
    /// `emit` only
    pub velocity: Option<Velocity>,
    /// `hold` only
    pub frames: Option<f64>,
    /// `sfx` only
    pub cue: Option<String>,
}

impl NodeSpec {
    fn count(&self) -> usize {
        let unpause = self.props.unpause.as_ref().map_or(0, |n| n.count());
        1 + unpause + self.children.iter().map(NodeSpec::count).sum::<usize>()
    }

    fn leaf_only(&self) -> Result<(), PatternError> {
        if !self.children.is_empty() {
            return Err(PatternError::Script(format!("{} nodes cannot have children", self.node)));
        }
        Ok(())
    }
}

fn build_sync(node: &NodeSpec, world: &World) -> Result<SyncPattern, PatternError> {
    match node.node {
        NodeKind::Gsr => {
            let props = PropertySet::sync(node.props.properties(world)?)?;
            let children = node
                .children
                .iter()
                .map(|c| build_sync(c, world))
                .collect::<Result<Vec<_>, _>>()?;
            gs_repeat(props, children)
        }
        NodeKind::Emit => {
            node.leaf_only()?;
            Ok(pattern::emit(node.velocity.unwrap_or_default()))
        }
        NodeKind::Sfx => {
            node.leaf_only()?;
            let cue = node
                .cue
                .as_deref()
                .ok_or_else(|| PatternError::Script("sfx nodes require a cue".to_string()))?;
            Ok(pattern::sfx(cue))
        }
        NodeKind::Noop => {
            node.leaf_only()?;
            Ok(pattern::noop())
        }
        kind => Err(PatternError::Script(format!(
            "{} is durative and cannot run under a sync parent",
            kind
        ))),
    }
}

fn build_async(node: &NodeSpec, world: &World) -> Result<AsyncPattern, PatternError> {
    match node.node {
        NodeKind::Gcr => {
            let props = PropertySet::new(PatternKind::Async, node.props.properties(world)?)?;
            let children = node
                .children
                .iter()
                .map(|c| build_sync(c, world))
                .collect::<Result<Vec<_>, _>>()?;
            gc_repeat(props, children)
        }
        NodeKind::Gir => {
            let props = PropertySet::new(PatternKind::Async, node.props.properties(world)?)?;
            let children = node
                .children
                .iter()
                .map(|c| build_async(c, world))
                .collect::<Result<Vec<_>, _>>()?;
            gi_repeat(props, children)
        }
        NodeKind::Hold => {
            node.leaf_only()?;
            let frames = node
                .frames
                .ok_or_else(|| PatternError::Script("hold nodes require frames".to_string()))?;
            pattern::hold(frames)
        }
        _ => Ok(pattern::once(build_sync(node, world)?)),
    }
}

fn point(p: [f64; 2]) -> Vec2 {
    Vec2::new(p[0], p[1])
}

/// Numeric value evaluated against the generation context
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Const(f64),
    /// Named variable; `i`, `pi`, `index` and `t` read the context itself
    Var { var: String },
    /// Uniform draw from `[lo, hi)`
    Rand { rand: [f64; 2] },
    /// `base + step * i`
    Linear {
        #[serde(default)]
        base: f64,
        step: f64,
    },
}

impl Default for Scalar {
    fn default() -> Self {
        Self::Const(0.0)
    }
}

impl Scalar {
    /// Evaluate once against `gcx`
    pub fn eval(&self, gcx: &GenCtx) -> f64 {
        match self {
            Self::Const(v) => *v,
            Self::Var { var } => match var.as_str() {
                "i" => gcx.i as f64,
                "pi" => gcx.pi as f64,
                "index" => gcx.index as f64,
                "t" => gcx.summon_time,
                name => gcx.var_or_zero(name),
            },
            Self::Rand { rand: [lo, hi] } => gcx.rand(*lo, *hi).unwrap_or_else(|e| {
                warn!(error = %e, "Scalar::eval: random draw failed, using lower bound");
                *lo
            }),
            Self::Linear { base, step } => base + step * gcx.i as f64,
        }
    }

    fn gcxf(&self) -> Gcxf<f64> {
        let s = self.clone();
        gcxf(move |gcx| s.eval(gcx))
    }
}

/// Offset whose components are scalars
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct OffsetSpec {
    pub nx: Scalar,
    pub ny: Scalar,
    pub rx: Scalar,
    pub ry: Scalar,
    #[serde(alias = "a")]
    pub angle: Scalar,
}

impl OffsetSpec {
    fn gcxf(&self) -> Gcxf<Offset> {
        let s = self.clone();
        gcxf(move |gcx| {
            Offset::new(
                s.nx.eval(gcx),
                s.ny.eval(gcx),
                s.rx.eval(gcx),
                s.ry.eval(gcx),
                s.angle.eval(gcx),
            )
        })
    }
}

/// Comparison operator of a [`Condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Cmp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

/// `left cmp right`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Condition {
    pub left: Scalar,
    pub cmp: Cmp,
    pub right: Scalar,
}

impl Condition {
    fn gcxf(&self) -> Gcxf<bool> {
        let c = self.clone();
        gcxf(move |gcx| {
            let (l, r) = (c.left.eval(gcx), c.right.eval(gcx));
            match c.cmp {
                Cmp::Lt => l < r,
                Cmp::Le => l <= r,
                Cmp::Gt => l > r,
                Cmp::Ge => l >= r,
                Cmp::Eq => l == r,
                Cmp::Ne => l != r,
            }
        })
    }
}

/// Structured rule: `target op value`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuleSpec {
    pub target: String,
    #[serde(default = "default_op")]
    pub op: RuleOp,
    pub value: Scalar,
}

fn default_op() -> RuleOp {
    RuleOp::Assign
}

impl RuleSpec {
    fn build(&self) -> Result<Rule, PatternError> {
        let target: RuleTarget = self.target.parse().map_err(PatternError::Script)?;
        let value = self.value.clone();
        Ok(Rule::scalar(target, self.op, move |gcx| value.eval(gcx)))
    }
}

fn rules(specs: &[RuleSpec]) -> Result<Vec<Rule>, PatternError> {
    specs.iter().map(RuleSpec::build).collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BankSpec {
    #[serde(default)]
    pub to_zero: bool,
    #[serde(default)]
    pub offset: OffsetSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TargetSpec {
    pub method: TargetMethod,
    pub at: [f64; 2],
    #[serde(default)]
    pub from_summon: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SummonAlongSpec {
    #[serde(default)]
    pub mode: SummonAngle,
    #[serde(default)]
    pub angle_offset: Scalar,
    pub x: Scalar,
    pub y: Scalar,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SaveSpec {
    pub name: String,
    #[serde(default)]
    pub index: Scalar,
    pub value: Scalar,
}

/// Property table of a node; every key maps onto one [`Property`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PropsSpec {
    pub times: Option<Scalar>,
    pub max_times: Option<u32>,
    pub wait: Option<Scalar>,
    #[serde(rename = "for")]
    pub for_time: Option<Scalar>,
    pub delay: Option<Scalar>,
    pub wait_child: bool,
    pub sequential: bool,
    pub alternate: Option<Scalar>,
    pub root: Option<[f64; 2]>,
    pub root_adjust: bool,
    pub bank: Option<BankSpec>,
    pub start: Vec<RuleSpec>,
    pub pre_loop: Vec<RuleSpec>,
    pub post_loop: Vec<RuleSpec>,
    pub end: Vec<RuleSpec>,
    pub rv2_incr: Option<OffsetSpec>,
    pub circle: bool,
    pub spread: Option<OffsetSpec>,
    pub mutate_angle: Option<Scalar>,
    pub offset: Option<OffsetSpec>,
    pub face: Option<Facing>,
    pub sfx: Vec<String>,
    pub parametrize: Option<Parametrization>,
    pub parent_index: Option<Scalar>,
    pub reset_color: bool,
    pub color: Vec<String>,
    pub color_reverse: bool,
    pub summon_along: Option<SummonAlongSpec>,
    pub target: Option<TargetSpec>,
    #[serde(rename = "while")]
    pub run_while: Option<Condition>,
    pub unpause: Option<Box<NodeSpec>>,
    pub save: Vec<SaveSpec>,
    pub clip: Option<Condition>,
    pub cancel: Option<Condition>,
    pub time_reset: bool,
    pub timer: Option<String>,
    pub on_laser: Option<Scalar>,
    pub center: bool,
    pub bind_arrow: bool,
    pub bind_lr: bool,
    pub bind_ud: bool,
    pub bind_angle: bool,
    pub bind_itr: Option<String>,
}

impl PropsSpec {
    /// Translate into properties in a fixed order
    pub fn properties(&self, world: &World) -> Result<Vec<Property>, PatternError> {
        let mut out = Vec::new();
        if let Some(times) = &self.times {
            out.push(Property::Times(times.gcxf()));
        }
        if let Some(n) = self.max_times {
            out.push(Property::MaxTimes(n));
        }
        if let Some(wait) = &self.wait {
            out.push(Property::Wait(wait.gcxf()));
        }
        if let Some(f) = &self.for_time {
            out.push(Property::For(f.gcxf()));
        }
        if let Some(delay) = &self.delay {
            out.push(Property::Delay(delay.gcxf()));
        }
        if self.wait_child {
            out.push(Property::WaitChild);
        }
        if self.sequential {
            out.push(Property::Sequential);
        }
        if let Some(alt) = &self.alternate {
            out.push(Property::Alternate(alt.gcxf()));
        }
        if let Some(root) = self.root {
            out.push(Property::root(point(root), self.root_adjust));
        }
        if let Some(bank) = &self.bank {
            out.push(Property::Bank {
                to_zero: bank.to_zero,
                offset: bank.offset.gcxf(),
            });
        }
        push_rules(&mut out, &self.start, Property::Start)?;
        push_rules(&mut out, &self.pre_loop, Property::PreLoop)?;
        push_rules(&mut out, &self.post_loop, Property::PostLoop)?;
        push_rules(&mut out, &self.end, Property::End)?;
        if let Some(incr) = &self.rv2_incr {
            out.push(Property::Increment(Increment::Function(incr.gcxf())));
        }
        if self.circle {
            out.push(Property::circle());
        }
        if let Some(total) = &self.spread {
            out.push(Property::Increment(Increment::Spread(total.gcxf())));
        }
        if let Some(angle) = &self.mutate_angle {
            out.push(Property::MutateAngle(angle.gcxf()));
        }
        if let Some(offset) = &self.offset {
            out.push(Property::OffsetFn(offset.gcxf()));
        }
        if let Some(facing) = self.face {
            out.push(Property::Face(facing));
        }
        if !self.sfx.is_empty() {
            out.push(Property::Sfx(SfxSpec {
                cues: self.sfx.clone(),
                indexer: None,
                guard: None,
            }));
        }
        if self.parametrize.is_some() || self.parent_index.is_some() {
            out.push(Property::Parametrize {
                strategy: self.parametrize.unwrap_or_default(),
                mutator: self.parent_index.as_ref().map(Scalar::gcxf),
            });
        }
        if self.reset_color {
            out.push(Property::ResetColor);
        }
        if !self.color.is_empty() {
            out.push(Property::Color(ColorSpec {
                colors: self.color.clone(),
                indexer: None,
                reverse: self.color_reverse,
            }));
        }
        if let Some(along) = &self.summon_along {
            let (x, y) = (along.x.clone(), along.y.clone());
            out.push(Property::SummonAlong(SummonAlong {
                mode: along.mode,
                angle_offset: along.angle_offset.gcxf(),
                locate: gcxf(move |gcx| Vec2::new(x.eval(gcx), y.eval(gcx))),
            }));
        }
        if let Some(target) = &self.target {
            let at = point(target.at);
            out.push(Property::Target(Targeting {
                method: target.method,
                target: gcxf(move |_| at),
                from_summon: target.from_summon,
            }));
        }
        if let Some(cond) = &self.run_while {
            out.push(Property::While(cond.gcxf()));
        }
        if let Some(node) = &self.unpause {
            out.push(Property::Unpause(build_async(node, world)?));
        }
        if !self.save.is_empty() {
            let bindings = self
                .save
                .iter()
                .map(|s| {
                    let (index, value) = (s.index.clone(), s.value.clone());
                    SaveBinding::new(&s.name, move |gcx| index.eval(gcx), move |gcx| value.eval(gcx))
                })
                .collect();
            out.push(Property::SaveF(bindings));
        }
        if let Some(cond) = &self.clip {
            out.push(Property::Clip(cond.gcxf()));
        }
        if let Some(cond) = &self.cancel {
            out.push(Property::Cancel(cond.gcxf()));
        }
        if self.time_reset {
            out.push(Property::TimeReset);
        }
        if let Some(name) = &self.timer {
            out.push(Property::Timer(world.timer(name)));
        }
        if let Some(t) = &self.on_laser {
            out.push(Property::OnLaser(t.gcxf()));
        }
        if self.center {
            out.push(Property::Center);
        }
        if self.bind_arrow {
            out.push(Property::BindArrow);
        }
        if self.bind_lr {
            out.push(Property::BindLr);
        }
        if self.bind_ud {
            out.push(Property::BindUd);
        }
        if self.bind_angle {
            out.push(Property::BindAngle);
        }
        if let Some(name) = &self.bind_itr {
            out.push(Property::BindItr(name.clone()));
        }
        debug!(count = out.len(), "PropsSpec::properties: translated");
        Ok(out)
    }
}

fn push_rules(out: &mut Vec<Property>, specs: &[RuleSpec], wrap: fn(Vec<Rule>) -> Property) -> Result<(), PatternError> {
    if !specs.is_empty() {
        out.push(wrap(rules(specs)?));
    }
    Ok(())
}
