//! Declarative loop configuration
//!
//! A loop is configured by a list of [`Property`] values which are unrolled
//! and validated into an immutable [`PropertySet`]. Rules are ordered
//! closures over the generation context.

mod property;
mod rule;
mod set;

pub use property::{
    ColorSpec, Increment, PatternKind, Property, SaveBinding, SfxSpec, SummonAlong, SummonAngle, TargetMethod,
    Targeting,
};
pub use rule::{Component, Gcxf, Rule, RuleOp, RuleTarget, constant, gcxf};
pub use set::{Bindings, PropertySet};
