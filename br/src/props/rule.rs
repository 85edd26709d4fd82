//! Rules: ordered closures that mutate a generation context

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::context::GenCtx;
use crate::math::Offset;

/// Function of the generation context, evaluated once per use
pub type Gcxf<T> = Rc<dyn Fn(&GenCtx) -> T>;

/// Wrap a closure as a [`Gcxf`]
pub fn gcxf<T, F>(f: F) -> Gcxf<T>
where
    F: Fn(&GenCtx) -> T + 'static,
{
    Rc::new(f)
}

/// [`Gcxf`] returning a constant
pub fn constant<T: Clone + 'static>(value: T) -> Gcxf<T> {
    Rc::new(move |_| value.clone())
}

/// Assignment operator of a structured rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOp {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "//=")]
    FloorDivAssign,
}

impl RuleOp {
    pub fn apply(self, current: f64, value: f64) -> f64 {
        match self {
            Self::Assign => value,
            Self::AddAssign => current + value,
            Self::SubAssign => current - value,
            Self::MulAssign => current * value,
            Self::DivAssign => current / value,
            Self::FloorDivAssign => (current / value).floor(),
        }
    }

    /// Component-wise application to an offset
    pub fn apply_offset(self, current: Offset, value: Offset) -> Offset {
        Offset::new(
            self.apply(current.nx, value.nx),
            self.apply(current.ny, value.ny),
            self.apply(current.rx, value.rx),
            self.apply(current.ry, value.ry),
            self.apply(current.angle, value.angle),
        )
    }
}

impl fmt::Display for RuleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::FloorDivAssign => "//=",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RuleOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Self::Assign),
            "+=" => Ok(Self::AddAssign),
            "-=" => Ok(Self::SubAssign),
            "*=" => Ok(Self::MulAssign),
            "/=" => Ok(Self::DivAssign),
            "//=" => Ok(Self::FloorDivAssign),
            _ => Err(format!("Unknown rule operator: {}", s)),
        }
    }
}

/// One scalar component of an [`Offset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Nx,
    Ny,
    Rx,
    Ry,
    Angle,
}

impl Component {
    pub fn get(self, o: &Offset) -> f64 {
        match self {
            Self::Nx => o.nx,
            Self::Ny => o.ny,
            Self::Rx => o.rx,
            Self::Ry => o.ry,
            Self::Angle => o.angle,
        }
    }

    pub fn set(self, o: &mut Offset, v: f64) {
        match self {
            Self::Nx => o.nx = v,
            Self::Ny => o.ny = v,
            Self::Rx => o.rx = v,
            Self::Ry => o.ry = v,
            Self::Angle => o.angle = v,
        }
    }
}

/// What a structured rule writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    /// `_`: evaluate and drop the result
    Discard,
    /// The whole current offset
    Rv2,
    /// One component of the current offset, e.g. `rv2.angle`
    Rv2Component(Component),
    /// A named variable
    Var(String),
}

impl std::str::FromStr for RuleTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "" => Err("Empty rule target".to_string()),
            "_" => Ok(Self::Discard),
            "rv2" => Ok(Self::Rv2),
            "rv2.nx" => Ok(Self::Rv2Component(Component::Nx)),
            "rv2.ny" => Ok(Self::Rv2Component(Component::Ny)),
            "rv2.rx" => Ok(Self::Rv2Component(Component::Rx)),
            "rv2.ry" => Ok(Self::Rv2Component(Component::Ry)),
            "rv2.a" | "rv2.angle" => Ok(Self::Rv2Component(Component::Angle)),
            other if other.starts_with("rv2.") => Err(format!("Unknown offset component: {}", other)),
            other => Ok(Self::Var(other.to_string())),
        }
    }
}

/// Ordered mutation of a generation context.
///
/// Rule lists are applied in declaration order. Rules may only touch the
/// context they are given.
#[derive(Clone)]
pub struct Rule {
    f: Rc<dyn Fn(&mut GenCtx)>,
}

impl Rule {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut GenCtx) + 'static,
    {
        Self { f: Rc::new(f) }
    }

    pub fn apply(&self, gcx: &mut GenCtx) {
        (self.f)(gcx)
    }

    /// `name op value` on a named variable; unset variables read as zero
    pub fn var<F>(name: &str, op: RuleOp, value: F) -> Self
    where
        F: Fn(&GenCtx) -> f64 + 'static,
    {
        let name = name.to_string();
        Self::new(move |gcx| {
            let v = value(gcx);
            let cur = gcx.var_or_zero(&name);
            gcx.set_var(&name, op.apply(cur, v));
        })
    }

    /// `rv2 op value` on the whole offset
    pub fn rv2<F>(op: RuleOp, value: F) -> Self
    where
        F: Fn(&GenCtx) -> Offset + 'static,
    {
        Self::new(move |gcx| {
            let v = value(gcx);
            gcx.rv2 = op.apply_offset(gcx.rv2, v);
        })
    }

    /// `rv2.<component> op value`
    pub fn component<F>(component: Component, op: RuleOp, value: F) -> Self
    where
        F: Fn(&GenCtx) -> f64 + 'static,
    {
        Self::new(move |gcx| {
            let v = value(gcx);
            let cur = component.get(&gcx.rv2);
            component.set(&mut gcx.rv2, op.apply(cur, v));
        })
    }

    /// Scalar rule against any target
    pub fn scalar<F>(target: RuleTarget, op: RuleOp, value: F) -> Self
    where
        F: Fn(&GenCtx) -> f64 + 'static,
    {
        match target {
            RuleTarget::Discard => Self::new(move |gcx| {
                let _ = value(gcx);
            }),
            RuleTarget::Var(name) => Self::var(&name, op, value),
            RuleTarget::Rv2Component(c) => Self::component(c, op, value),
            RuleTarget::Rv2 => Self::new(move |gcx| {
                let v = value(gcx);
                gcx.rv2 = op.apply_offset(gcx.rv2, Offset::new(v, v, v, v, v));
            }),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rule")
    }
}
