//! Seeded random source gated by a per-tick capability flag

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::PatternError;

struct RngState {
    rng: StdRng,
    enabled: bool,
}

/// Shared handle to the simulation's random source.
///
/// Draws are refused unless the scheduler has enabled the handle for the
/// current tick, so replays see the same sequence of draws in the same order.
#[derive(Clone)]
pub struct RngHandle {
    state: Rc<RefCell<RngState>>,
}

impl RngHandle {
    /// Create a disabled handle seeded with `seed`
    pub fn new(seed: u64) -> Self {
        debug!(seed, "RngHandle::new: called");
        Self {
            state: Rc::new(RefCell::new(RngState {
                rng: StdRng::seed_from_u64(seed),
                enabled: false,
            })),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.borrow_mut().enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    /// Restart the sequence from `seed`
    pub fn reseed(&self, seed: u64) {
        debug!(seed, "RngHandle::reseed: called");
        self.state.borrow_mut().rng = StdRng::seed_from_u64(seed);
    }

    /// Uniform float in `[lo, hi)`, or `lo` when the range is empty or its width is not finite
    pub fn range(&self, lo: f64, hi: f64) -> Result<f64, PatternError> {
        let mut state = self.state.borrow_mut();
        if !state.enabled {
            warn!(lo, hi, "RngHandle::range: draw refused outside of tick");
            return Err(PatternError::RngUnavailable);
        }
        if !(lo < hi) || !(hi - lo).is_finite() {
            return Ok(lo);
        }
        Ok(state.rng.random_range(lo..hi))
    }

    /// Uniform integer in `[lo, hi)`, or `lo` when the range is empty
    pub fn range_int(&self, lo: i64, hi: i64) -> Result<i64, PatternError> {
        let mut state = self.state.borrow_mut();
        if !state.enabled {
            warn!(lo, hi, "RngHandle::range_int: draw refused outside of tick");
            return Err(PatternError::RngUnavailable);
        }
        if lo >= hi {
            return Ok(lo);
        }
        Ok(state.rng.random_range(lo..hi))
    }
}

impl Default for RngHandle {
    fn default() -> Self {
        Self::new(0)
    }
}

impl std::fmt::Debug for RngHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RngHandle").field("enabled", &self.is_enabled()).finish()
    }
}
