//! Per-branch mutable generation state

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use crate::emit::Emitter;
use crate::error::PatternError;
use crate::math::Offset;
use crate::props::Rule;
use crate::world::World;

/// Generation context: the state a branch of a pattern tree mutates.
///
/// Every branch point (a new loop, a new child) takes an exclusive copy via
/// `clone()`. Owned fields are deep-copied; the emitter and the [`World`]
/// are shared by reference.
#[derive(Clone)]
pub struct GenCtx {
    /// Firing index of the current invocation
    pub index: i64,
    /// Loop iteration counter of the innermost loop
    pub i: i64,
    /// Loop iteration counter of the enclosing loop
    pub pi: i64,
    /// Current offset
    pub rv2: Offset,
    /// Offset snapshot taken when the innermost loop started
    pub base_rv2: Offset,
    /// Clock in seconds since the branch was summoned
    pub summon_time: f64,
    vars: BTreeMap<String, f64>,
    emitter: Rc<dyn Emitter>,
    world: World,
}

impl GenCtx {
    pub fn new(emitter: Rc<dyn Emitter>, world: World) -> Self {
        debug!(emitter = %emitter.id(), "GenCtx::new: called");
        Self {
            index: 0,
            i: 0,
            pi: 0,
            rv2: Offset::ZERO,
            base_rv2: Offset::ZERO,
            summon_time: 0.0,
            vars: BTreeMap::new(),
            emitter,
            world,
        }
    }

    pub fn emitter(&self) -> &Rc<dyn Emitter> {
        &self.emitter
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn frame_time(&self) -> f64 {
        self.world.frame_time
    }

    /// Current tick of the world clock
    pub fn frame(&self) -> u64 {
        self.world.clock.now()
    }

    /// Named variable, if it has been set
    pub fn var(&self, name: &str) -> Option<f64> {
        self.vars.get(name).copied()
    }

    /// Named variable, or zero if unset
    pub fn var_or_zero(&self, name: &str) -> f64 {
        self.var(name).unwrap_or(0.0)
    }

    pub fn set_var(&mut self, name: &str, value: f64) {
        match self.vars.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.vars.insert(name.to_string(), value);
            }
        }
    }

    pub fn vars(&self) -> &BTreeMap<String, f64> {
        &self.vars
    }

    /// Next id from the emitter-wide allocator
    pub fn next_id(&mut self) -> u64 {
        self.world.ids.next_id()
    }

    /// Uniform float in `[lo, hi)`; refused outside a simulation tick
    pub fn rand(&self, lo: f64, hi: f64) -> Result<f64, PatternError> {
        self.world.rng.range(lo, hi)
    }

    /// Uniform integer in `[lo, hi)`; refused outside a simulation tick
    pub fn rand_int(&self, lo: i64, hi: i64) -> Result<i64, PatternError> {
        self.world.rng.range_int(lo, hi)
    }

    /// Apply `rules` in order
    pub fn apply_rules(&mut self, rules: &[Rule]) {
        for rule in rules {
            rule.apply(self);
        }
    }

    /// Run post-loop rules, add the increment, and advance the iteration counter
    pub fn finish_iteration(&mut self, post_loop: &[Rule], increment: Offset) {
        self.apply_rules(post_loop);
        self.rv2 += increment;
        self.i += 1;
    }
}

impl std::fmt::Debug for GenCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenCtx")
            .field("index", &self.index)
            .field("i", &self.i)
            .field("pi", &self.pi)
            .field("rv2", &self.rv2)
            .field("summon_time", &self.summon_time)
            .field("vars", &self.vars)
            .field("emitter", &self.emitter.id())
            .finish()
    }
}
