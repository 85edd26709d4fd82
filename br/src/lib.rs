//! Barrage - hierarchical frame-stepped pattern scheduler
//!
//! Barrage drives bullet-hell firing patterns: trees of repeaters whose
//! leaves emit objects. Every tick the scheduler steps each live pattern
//! once, so a pattern tree runs deterministically for a given seed and
//! frame rate.
//!
//! # Core Concepts
//!
//! - **Copy on branch**: every loop and child gets its own generation context
//! - **Three repeaters**: instantaneous (`gsr`), durative over sync children
//!   (`gcr`), durative over durative children (`gir`)
//! - **Sticky cancellation**: a cancelled branch stays cancelled, and its
//!   completion reports a non-normal end
//! - **Seeded randomness**: draws are only allowed while a tick is running
//!
//! # Modules
//!
//! - [`math`] - offsets and angle arithmetic
//! - [`context`] - generation context, handoffs, cancellation, RNG
//! - [`props`] - loop properties, rules, and validated property sets
//! - [`looper`] - per-invocation loop bookkeeping
//! - [`pattern`] - sync and async patterns, repeaters, and leaf actions
//! - [`scheduler`] - tick-driven task scheduler
//! - [`script`] - YAML pattern scripts
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod context;
pub mod emit;
pub mod error;
pub mod looper;
pub mod math;
pub mod parametrization;
pub mod pattern;
pub mod props;
pub mod scheduler;
pub mod script;
pub mod style;
pub mod world;

// Re-export commonly used types
pub use config::BarrageConfig;
pub use context::{AsyncHandoff, CancelToken, CommonHandoff, Completion, GenCtx, SyncHandoff};
pub use emit::{Emission, EmissionLog, EmissionSink, Emitter, PointEmitter, Velocity};
pub use error::PatternError;
pub use math::{Offset, Vec2};
pub use parametrization::Parametrization;
pub use pattern::{AsyncPattern, SyncPattern, gc_repeat, gi_repeat, gs_repeat};
pub use props::{Property, PropertySet, Rule, RuleOp, RuleTarget};
pub use scheduler::{RunReport, Scheduler, Step, Task, TickCx, TickSummary};
pub use script::Script;
pub use world::World;
