//! Single-threaded, tick-driven task scheduler
//!
//! Durative patterns run as [`Task`] state machines. Each tick the
//! [`Scheduler`] steps every live task in order; a task transitions with
//! [`Step::Continue`] until it yields ([`Step::Suspend`]) or finishes
//! ([`Step::Done`]).

mod core;
mod task;

pub use self::core::{RunReport, Scheduler, TickSummary};
pub use task::{Step, Task, TickCx};
