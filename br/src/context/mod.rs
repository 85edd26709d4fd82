//! Per-branch execution context
//!
//! - [`GenCtx`] - mutable generation state copied at every branch point
//! - [`CommonHandoff`] - cancellation token + emission factory + context
//! - [`SyncHandoff`] / [`AsyncHandoff`] - handoffs for instantaneous and durative children
//! - [`CancelToken`] - sticky cooperative cancellation
//! - [`RngHandle`] - seeded random source with a per-tick capability flag

mod cancel;
mod gen_ctx;
mod handoff;
mod rng;

pub use cancel::CancelToken;
pub use gen_ctx::GenCtx;
pub use handoff::{AsyncHandoff, CommonHandoff, Completion, CompletionGroup, SyncHandoff};
pub use rng::RngHandle;
