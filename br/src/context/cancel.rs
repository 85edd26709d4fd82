//! Cooperative cancellation tokens

use std::cell::Cell;
use std::rc::Rc;

/// Sticky cancellation flag shared by reference between a branch and its ancestors.
///
/// Every handoff copied from a root holds the same flag, so cancelling it
/// stops the whole tree. Tokens are checked at suspension points, never
/// force-unwound.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken").field("cancelled", &self.is_cancelled()).finish()
    }
}
