//! Firing-index resolution
//!
//! Every invocation carries a firing index that leaf actions use to vary
//! color, angle or random seeds deterministically. A loop derives the index
//! of each iteration from the index it inherited and its own loop counter.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PatternError;
use crate::math::modulo_index;

/// Multiplier applied to the parent index by [`Parametrization::Additive`]
pub const ADDITIVE_SHIFT: i64 = 1 << 10;

/// How a loop derives the firing index of its iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parametrization {
    /// The loop counter
    This,
    /// The inherited index, unchanged
    #[default]
    Defer,
    /// Parent and loop counter packed into one integer
    Additive,
    /// `parent * r + (i mod r)`; requires a repeat count
    Mod,
    /// `parent * r + (r - 1 - (i mod r))`; requires a repeat count
    InvMod,
}

impl std::fmt::Display for Parametrization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::This => write!(f, "this"),
            Self::Defer => write!(f, "defer"),
            Self::Additive => write!(f, "additive"),
            Self::Mod => write!(f, "mod"),
            Self::InvMod => write!(f, "invmod"),
        }
    }
}

impl std::str::FromStr for Parametrization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "this" => Ok(Self::This),
            "defer" => Ok(Self::Defer),
            "additive" | "add" => Ok(Self::Additive),
            "mod" => Ok(Self::Mod),
            "invmod" => Ok(Self::InvMod),
            _ => Err(format!("Unknown parametrization: {}", s)),
        }
    }
}

/// Compute a child's firing index.
///
/// Fails when `Mod` or `InvMod` is requested without a repeat count.
pub fn resolve(
    strategy: Parametrization,
    parent_index: i64,
    this_index: i64,
    repeat: Option<u32>,
) -> Result<i64, PatternError> {
    Ok(FiringIndexer::new(strategy, repeat)?.index(parent_index, this_index))
}

/// A [`Parametrization`] with its repeat count already validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringIndexer {
    This,
    Defer,
    Additive,
    Mod(i64),
    InvMod(i64),
}

impl FiringIndexer {
    pub fn new(strategy: Parametrization, repeat: Option<u32>) -> Result<Self, PatternError> {
        debug!(%strategy, ?repeat, "FiringIndexer::new: called");
        let require = || {
            repeat
                .filter(|r| *r > 0)
                .map(i64::from)
                .ok_or_else(|| PatternError::RepeatCountRequired {
                    strategy: strategy.to_string(),
                })
        };
        Ok(match strategy {
            Parametrization::This => Self::This,
            Parametrization::Defer => Self::Defer,
            Parametrization::Additive => Self::Additive,
            Parametrization::Mod => Self::Mod(require()?),
            Parametrization::InvMod => Self::InvMod(require()?),
        })
    }

    pub fn index(&self, parent_index: i64, this_index: i64) -> i64 {
        match *self {
            Self::This => this_index,
            Self::Defer => parent_index,
            Self::Additive => parent_index.wrapping_mul(ADDITIVE_SHIFT).wrapping_add(this_index),
            Self::Mod(r) => parent_index * r + modulo_index(r, this_index),
            Self::InvMod(r) => parent_index * r + (r - 1 - modulo_index(r, this_index)),
        }
    }
}
