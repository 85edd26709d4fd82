//! Typed property values from which a [`PropertySet`](super::PropertySet) is built

use std::fmt;

use serde::{Deserialize, Serialize};

use super::rule::{Gcxf, Rule, constant, gcxf};
use crate::context::GenCtx;
use crate::emit::Facing;
use crate::math::{Offset, Vec2, atan2d};
use crate::parametrization::Parametrization;
use crate::pattern::AsyncPattern;
use crate::world::Timer;

/// Which executor family a property set is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Instantaneous: all iterations run within one tick
    Sync,
    /// Durative: iterations are spread over ticks
    Async,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Async => write!(f, "async"),
        }
    }
}

/// Per-iteration offset increment. When several are declared the highest
/// priority wins: `Spread` over `Circle` over `Function`.
#[derive(Clone)]
pub enum Increment {
    /// Arbitrary function of the context
    Function(Gcxf<Offset>),
    /// `360 / N` degrees of angle per iteration
    Circle,
    /// Total width divided evenly across `N - 1` gaps
    Spread(Gcxf<Offset>),
}

impl Increment {
    pub fn priority(&self) -> u8 {
        match self {
            Self::Function(_) => 1,
            Self::Circle => 2,
            Self::Spread(_) => 3,
        }
    }

    /// Resolve the increment for a loop of `times` iterations
    pub fn resolve(&self, gcx: &GenCtx, times: i64) -> Offset {
        match self {
            Self::Function(f) => f(gcx),
            Self::Circle if times > 0 => Offset::angle(360.0 / times as f64),
            Self::Circle => Offset::ZERO,
            Self::Spread(_) if times <= 1 => Offset::ZERO,
            Self::Spread(total) => total(gcx) / (times - 1) as f64,
        }
    }
}

impl fmt::Debug for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => write!(f, "Function"),
            Self::Circle => write!(f, "Circle"),
            Self::Spread(_) => write!(f, "Spread"),
        }
    }
}

/// How targeting adjusts the offset toward an aim point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMethod {
    /// Rotate the whole offset to face the target
    Angle,
    /// Add the angle toward the target to the offset angle
    RelAngle,
    /// Add the x distance to the nonrotational part
    Nx,
    /// Add the y distance to the nonrotational part
    Ny,
    /// Add the x distance to the rotational part
    Rx,
    /// Add the y distance to the rotational part
    Ry,
}

impl fmt::Display for TargetMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Angle => write!(f, "angle"),
            Self::RelAngle => write!(f, "relangle"),
            Self::Nx => write!(f, "nx"),
            Self::Ny => write!(f, "ny"),
            Self::Rx => write!(f, "rx"),
            Self::Ry => write!(f, "ry"),
        }
    }
}

impl std::str::FromStr for TargetMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "angle" | "ang" => Ok(Self::Angle),
            "relangle" | "rang" => Ok(Self::RelAngle),
            "nx" => Ok(Self::Nx),
            "ny" => Ok(Self::Ny),
            "rx" => Ok(Self::Rx),
            "ry" => Ok(Self::Ry),
            _ => Err(format!("Unknown target method: {}", s)),
        }
    }
}

/// Aim the loop at a point when it starts
#[derive(Clone)]
pub struct Targeting {
    pub method: TargetMethod,
    pub target: Gcxf<Vec2>,
    /// Measure from the summon location instead of the parent origin
    pub from_summon: bool,
}

impl Targeting {
    /// Apply to `rv2`, measuring from `src`
    pub fn apply(&self, rv2: Offset, src: Vec2, gcx: &GenCtx) -> Offset {
        let aim = (self.target)(gcx);
        match self.method {
            TargetMethod::Angle => rv2.rotate_all(crate::math::angle_from_to(src, aim)),
            TargetMethod::RelAngle => rv2.turned(crate::math::angle_from_to(src, aim)),
            TargetMethod::Nx => rv2 + Offset::nrot(aim.x - src.x, 0.0),
            TargetMethod::Ny => rv2 + Offset::nrot(0.0, aim.y - src.y),
            TargetMethod::Rx => rv2 + Offset::rot(aim.x - src.x, 0.0),
            TargetMethod::Ry => rv2 + Offset::rot(0.0, aim.y - src.y),
        }
    }
}

/// Angle mode of a summon-along handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummonAngle {
    /// Keep the offset angle, plus the angle offset
    #[default]
    Original,
    /// Bank, keeping the offset angle
    OriginalBank,
    /// Bank, facing away from the origin
    RelOriginBank,
    /// Bank, facing toward the next location
    TangentBank,
}

impl std::str::FromStr for SummonAngle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "original-bank" => Ok(Self::OriginalBank),
            "rel-origin-bank" => Ok(Self::RelOriginBank),
            "tangent-bank" => Ok(Self::TangentBank),
            _ => Err(format!("Unknown summon-along angle: {}", s)),
        }
    }
}

/// Position-tracking handler: places each iteration along a located path
#[derive(Clone)]
pub struct SummonAlong {
    pub mode: SummonAngle,
    pub angle_offset: Gcxf<f64>,
    pub locate: Gcxf<Vec2>,
}

impl SummonAlong {
    pub fn locate(&self, gcx: &GenCtx) -> Vec2 {
        (self.locate)(gcx)
    }

    /// Derive this iteration's offset from the current and next located offsets
    pub fn angle(&self, gcx: &GenCtx, current: Offset, next: Offset) -> Offset {
        let off = (self.angle_offset)(gcx);
        match self.mode {
            SummonAngle::Original => current.turned(off),
            SummonAngle::OriginalBank => current.bank(None).turned(off),
            SummonAngle::RelOriginBank => {
                let tl = current.bank(None);
                current.bank(Some(atan2d(tl.ny, tl.nx) + off))
            }
            SummonAngle::TangentBank => {
                let tl = current.bank(None);
                let ntl = next.bank(None);
                current.bank(Some(atan2d(ntl.ny - tl.ny, ntl.nx - tl.nx) + off))
            }
        }
    }
}

/// Color-cycling configuration
#[derive(Clone)]
pub struct ColorSpec {
    pub colors: Vec<String>,
    /// Explicit index; the loop counter when absent
    pub indexer: Option<Gcxf<f64>>,
    /// Merge the parent style into the color instead of the color into the parent style
    pub reverse: bool,
}

/// Sound cue configuration
#[derive(Clone)]
pub struct SfxSpec {
    pub cues: Vec<String>,
    pub indexer: Option<Gcxf<f64>>,
    pub guard: Option<Gcxf<bool>>,
}

/// Write a value into hoisted storage every iteration
#[derive(Clone)]
pub struct SaveBinding<T> {
    pub name: String,
    pub indexer: Gcxf<f64>,
    pub value: Gcxf<T>,
}

impl<T> SaveBinding<T> {
    pub fn new<I, V>(name: &str, indexer: I, value: V) -> Self
    where
        I: Fn(&GenCtx) -> f64 + 'static,
        V: Fn(&GenCtx) -> T + 'static,
    {
        Self {
            name: name.to_string(),
            indexer: gcxf(indexer),
            value: gcxf(value),
        }
    }
}

/// One declarative knob of a loop
#[derive(Clone)]
pub enum Property {
    /// Iteration count
    Times(Gcxf<f64>),
    /// Maximum iteration count, used as the repeat count for `Mod` indexing
    MaxTimes(u32),
    /// Frames between iterations
    Wait(Gcxf<f64>),
    /// Maximum duration in frames
    For(Gcxf<f64>),
    /// Frames before the first iteration
    Delay(Gcxf<f64>),
    /// Wait for children before counting inter-iteration frames
    WaitChild,
    /// Start children one after another
    Sequential,
    /// Invoke only the child at `index mod children`
    Alternate(Gcxf<f64>),
    /// Move the origin; `adjust` keeps the visual position
    Root { root: Gcxf<Vec2>, adjust: bool },
    /// Collapse the offset, optionally zeroing the angle, then add an offset
    Bank { to_zero: bool, offset: Gcxf<Offset> },
    Start(Vec<Rule>),
    PreLoop(Vec<Rule>),
    PostLoop(Vec<Rule>),
    End(Vec<Rule>),
    Increment(Increment),
    /// Override the angle of each invocation without affecting the next one
    MutateAngle(Gcxf<f64>),
    /// Per-iteration offset relative to the base offset
    OffsetFn(Gcxf<Offset>),
    Face(Facing),
    Sfx(SfxSpec),
    Parametrize {
        strategy: Parametrization,
        mutator: Option<Gcxf<f64>>,
    },
    /// Clear the inherited style token
    ResetColor,
    Color(ColorSpec),
    SummonAlong(SummonAlong),
    Target(Targeting),
    /// Pause predicate: frames only count while it holds
    While(Gcxf<bool>),
    /// Pattern run once each time a pause ends
    Unpause(AsyncPattern),
    SaveF(Vec<SaveBinding<f64>>),
    SaveV2(Vec<SaveBinding<Vec2>>),
    /// Skip the whole loop
    Clip(Gcxf<bool>),
    /// Stop iterating once true
    Cancel(Gcxf<bool>),
    /// Zero the context clock every iteration
    TimeReset,
    /// Restart a timer every iteration
    Timer(Timer),
    /// Start from a point along the emitting laser
    OnLaser(Gcxf<f64>),
    /// Center the iterations around the starting offset
    Center,
    BindArrow,
    BindLr,
    BindUd,
    BindAngle,
    BindItr(String),
    /// Several properties declared as one
    Composite(Vec<Property>),
}

impl Property {
    pub fn times<F: Fn(&GenCtx) -> f64 + 'static>(f: F) -> Self {
        Self::Times(gcxf(f))
    }

    pub fn times_const(n: u32) -> Self {
        Self::Times(constant(f64::from(n)))
    }

    pub fn wait<F: Fn(&GenCtx) -> f64 + 'static>(f: F) -> Self {
        Self::Wait(gcxf(f))
    }

    pub fn wait_frames(frames: f64) -> Self {
        Self::Wait(constant(frames))
    }

    pub fn for_frames(frames: f64) -> Self {
        Self::For(constant(frames))
    }

    pub fn delay_frames(frames: f64) -> Self {
        Self::Delay(constant(frames))
    }

    pub fn alternate<F: Fn(&GenCtx) -> f64 + 'static>(f: F) -> Self {
        Self::Alternate(gcxf(f))
    }

    pub fn root(root: Vec2, adjust: bool) -> Self {
        Self::Root {
            root: constant(root),
            adjust,
        }
    }

    pub fn bank(to_zero: bool, offset: Offset) -> Self {
        Self::Bank {
            to_zero,
            offset: constant(offset),
        }
    }

    pub fn rv2_incr<F: Fn(&GenCtx) -> Offset + 'static>(f: F) -> Self {
        Self::Increment(Increment::Function(gcxf(f)))
    }

    pub fn rv2_incr_const(incr: Offset) -> Self {
        Self::Increment(Increment::Function(constant(incr)))
    }

    pub fn circle() -> Self {
        Self::Increment(Increment::Circle)
    }

    pub fn spread(total: Offset) -> Self {
        Self::Increment(Increment::Spread(constant(total)))
    }

    pub fn mutate_angle<F: Fn(&GenCtx) -> f64 + 'static>(f: F) -> Self {
        Self::MutateAngle(gcxf(f))
    }

    pub fn offset_fn<F: Fn(&GenCtx) -> Offset + 'static>(f: F) -> Self {
        Self::OffsetFn(gcxf(f))
    }

    pub fn parametrize(strategy: Parametrization) -> Self {
        Self::Parametrize { strategy, mutator: None }
    }

    /// Defer to the parent index, after passing it through `mutator`
    pub fn set_parent_index<F: Fn(&GenCtx) -> f64 + 'static>(f: F) -> Self {
        Self::Parametrize {
            strategy: Parametrization::Defer,
            mutator: Some(gcxf(f)),
        }
    }

    pub fn color<S: Into<String>>(colors: impl IntoIterator<Item = S>) -> Self {
        Self::Color(ColorSpec {
            colors: colors.into_iter().map(Into::into).collect(),
            indexer: None,
            reverse: false,
        })
    }

    pub fn color_reverse<S: Into<String>>(colors: impl IntoIterator<Item = S>) -> Self {
        Self::Color(ColorSpec {
            colors: colors.into_iter().map(Into::into).collect(),
            indexer: None,
            reverse: true,
        })
    }

    pub fn color_indexed<S, F>(indexer: F, colors: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
        F: Fn(&GenCtx) -> f64 + 'static,
    {
        Self::Color(ColorSpec {
            colors: colors.into_iter().map(Into::into).collect(),
            indexer: Some(gcxf(indexer)),
            reverse: false,
        })
    }

    pub fn sfx<S: Into<String>>(cues: impl IntoIterator<Item = S>) -> Self {
        Self::Sfx(SfxSpec {
            cues: cues.into_iter().map(Into::into).collect(),
            indexer: None,
            guard: None,
        })
    }

    pub fn summon_along<A, L>(mode: SummonAngle, angle_offset: A, locate: L) -> Self
    where
        A: Fn(&GenCtx) -> f64 + 'static,
        L: Fn(&GenCtx) -> Vec2 + 'static,
    {
        Self::SummonAlong(SummonAlong {
            mode,
            angle_offset: gcxf(angle_offset),
            locate: gcxf(locate),
        })
    }

    pub fn target(method: TargetMethod, point: Vec2) -> Self {
        Self::Target(Targeting {
            method,
            target: constant(point),
            from_summon: false,
        })
    }

    pub fn target_from_summon(method: TargetMethod, point: Vec2) -> Self {
        Self::Target(Targeting {
            method,
            target: constant(point),
            from_summon: true,
        })
    }

    pub fn run_while<F: Fn(&GenCtx) -> bool + 'static>(f: F) -> Self {
        Self::While(gcxf(f))
    }

    pub fn clip<F: Fn(&GenCtx) -> bool + 'static>(f: F) -> Self {
        Self::Clip(gcxf(f))
    }

    pub fn cancel<F: Fn(&GenCtx) -> bool + 'static>(f: F) -> Self {
        Self::Cancel(gcxf(f))
    }

    pub fn on_laser<F: Fn(&GenCtx) -> f64 + 'static>(f: F) -> Self {
        Self::OnLaser(gcxf(f))
    }

    pub fn start(rules: Vec<Rule>) -> Self {
        Self::Start(rules)
    }

    pub fn pre_loop(rules: Vec<Rule>) -> Self {
        Self::PreLoop(rules)
    }

    pub fn post_loop(rules: Vec<Rule>) -> Self {
        Self::PostLoop(rules)
    }

    pub fn end(rules: Vec<Rule>) -> Self {
        Self::End(rules)
    }

    /// `times` iterations with a constant increment
    pub fn sync(times: u32, incr: Offset) -> Self {
        Self::Composite(vec![Self::times_const(times), Self::rv2_incr_const(incr)])
    }

    /// `times` iterations `wait` frames apart with a constant increment
    pub fn async_(wait: f64, times: u32, incr: Offset) -> Self {
        Self::Composite(vec![
            Self::wait_frames(wait),
            Self::times_const(times),
            Self::rv2_incr_const(incr),
        ])
    }

    /// Unbounded iterations `wait` frames apart, for at most `for_frames` frames
    pub fn async_for(wait: f64, for_frames: f64, incr: Offset) -> Self {
        Self::Composite(vec![
            Self::wait_frames(wait),
            Self::Times(constant(f64::from(i32::MAX))),
            Self::for_frames(for_frames),
            Self::rv2_incr_const(incr),
        ])
    }

    /// Property name used in error messages and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Times(_) => "times",
            Self::MaxTimes(_) => "max-times",
            Self::Wait(_) => "wait",
            Self::For(_) => "for",
            Self::Delay(_) => "delay",
            Self::WaitChild => "wait-child",
            Self::Sequential => "sequential",
            Self::Alternate(_) => "alternate",
            Self::Root { .. } => "root",
            Self::Bank { .. } => "bank",
            Self::Start(_) => "start",
            Self::PreLoop(_) => "pre-loop",
            Self::PostLoop(_) => "post-loop",
            Self::End(_) => "end",
            Self::Increment(Increment::Function(_)) => "rv2-incr",
            Self::Increment(Increment::Circle) => "circle",
            Self::Increment(Increment::Spread(_)) => "spread",
            Self::MutateAngle(_) => "mutate-angle",
            Self::OffsetFn(_) => "offset-fn",
            Self::Face(_) => "face",
            Self::Sfx(_) => "sfx",
            Self::Parametrize { .. } => "parametrize",
            Self::ResetColor => "reset-color",
            Self::Color(_) => "color",
            Self::SummonAlong(_) => "summon-along",
            Self::Target(_) => "target",
            Self::While(_) => "while",
            Self::Unpause(_) => "unpause",
            Self::SaveF(_) => "save-f",
            Self::SaveV2(_) => "save-v2",
            Self::Clip(_) => "clip",
            Self::Cancel(_) => "cancel",
            Self::TimeReset => "time-reset",
            Self::Timer(_) => "timer",
            Self::OnLaser(_) => "on-laser",
            Self::Center => "center",
            Self::BindArrow => "bind-arrow",
            Self::BindLr => "bind-lr",
            Self::BindUd => "bind-ud",
            Self::BindAngle => "bind-angle",
            Self::BindItr(_) => "bind-itr",
            Self::Composite(_) => "composite",
        }
    }

    /// Whether this property only makes sense for durative patterns
    pub fn requires_async(&self) -> bool {
        matches!(
            self,
            Self::Wait(_)
                | Self::For(_)
                | Self::Delay(_)
                | Self::WaitChild
                | Self::Sequential
                | Self::While(_)
                | Self::Unpause(_)
        )
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Composite(props) => f.debug_list().entries(props).finish(),
            other => f.write_str(other.name()),
        }
    }
}
