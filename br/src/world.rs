//! Emitter-wide shared resources
//!
//! Everything here is shared by reference between all branches running on
//! behalf of one emitter. Writers run on one thread in tick order, so
//! last-writer-wins is deterministic.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use crate::context::RngHandle;
use crate::math::Vec2;

/// Value written by a save-binding
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HoistValue {
    Float(f64),
    Vector(Vec2),
}

/// Externally addressable store written by save-bindings: name -> index -> value
#[derive(Clone, Default)]
pub struct HoistStore {
    slots: Rc<RefCell<HashMap<String, BTreeMap<i64, HoistValue>>>>,
}

impl HoistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_float(&self, name: &str, index: i64, value: f64) {
        debug!(%name, index, value, "HoistStore::save_float: called");
        self.save(name, index, HoistValue::Float(value));
    }

    pub fn save_vector(&self, name: &str, index: i64, value: Vec2) {
        debug!(%name, index, x = value.x, y = value.y, "HoistStore::save_vector: called");
        self.save(name, index, HoistValue::Vector(value));
    }

    fn save(&self, name: &str, index: i64, value: HoistValue) {
        self.slots
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .insert(index, value);
    }

    pub fn get(&self, name: &str, index: i64) -> Option<HoistValue> {
        self.slots.borrow().get(name).and_then(|m| m.get(&index).copied())
    }

    pub fn get_float(&self, name: &str, index: i64) -> Option<f64> {
        match self.get(name, index)? {
            HoistValue::Float(f) => Some(f),
            HoistValue::Vector(_) => None,
        }
    }

    pub fn get_vector(&self, name: &str, index: i64) -> Option<Vec2> {
        match self.get(name, index)? {
            HoistValue::Vector(v) => Some(v),
            HoistValue::Float(_) => None,
        }
    }

    /// Number of indices saved under `name`
    pub fn len(&self, name: &str) -> usize {
        self.slots.borrow().get(name).map_or(0, |m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().values().all(|m| m.is_empty())
    }

    /// Snapshot of every saved value, ordered by name then index
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<i64, HoistValue>> {
        self.slots
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Tick counter advanced by the scheduler
#[derive(Clone, Default)]
pub struct FrameClock {
    frame: Rc<Cell<u64>>,
}

impl FrameClock {
    pub fn now(&self) -> u64 {
        self.frame.get()
    }

    pub fn advance(&self) -> u64 {
        let next = self.frame.get() + 1;
        self.frame.set(next);
        next
    }
}

/// Restartable stopwatch measured in ticks of a [`FrameClock`]
#[derive(Clone)]
pub struct Timer {
    name: Rc<str>,
    clock: FrameClock,
    started: Rc<Cell<u64>>,
}

impl Timer {
    pub fn new(name: &str, clock: &FrameClock) -> Self {
        Self {
            name: Rc::from(name),
            clock: clock.clone(),
            started: Rc::new(Cell::new(clock.now())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn restart(&self) {
        debug!(name = %self.name, frame = self.clock.now(), "Timer::restart: called");
        self.started.set(self.clock.now());
    }

    pub fn elapsed_frames(&self) -> u64 {
        self.clock.now().saturating_sub(self.started.get())
    }
}

/// Emitter-wide source of unique ids, handed out in tick order
#[derive(Clone, Default)]
pub struct IdAllocator {
    next: Rc<Cell<u64>>,
}

impl IdAllocator {
    pub fn next_id(&self) -> u64 {
        let id = self.next.get();
        self.next.set(id + 1);
        id
    }
}

/// Receiver for sound cue requests
pub trait SfxSink {
    fn request(&mut self, cue: &str);
}

/// [`SfxSink`] that records every cue in order
#[derive(Debug, Default)]
pub struct SfxLog {
    pub cues: Vec<String>,
}

impl SfxSink for SfxLog {
    fn request(&mut self, cue: &str) {
        self.cues.push(cue.to_string());
    }
}

/// Bundle of emitter-wide resources shared by every branch
#[derive(Clone)]
pub struct World {
    pub rng: RngHandle,
    pub clock: FrameClock,
    pub hoist: HoistStore,
    pub ids: IdAllocator,
    pub sfx: Rc<RefCell<dyn SfxSink>>,
    /// Seconds per tick
    pub frame_time: f64,
}

impl World {
    pub fn new(seed: u64, frame_rate: u32) -> Self {
        debug!(seed, frame_rate, "World::new: called");
        Self {
            rng: RngHandle::new(seed),
            clock: FrameClock::default(),
            hoist: HoistStore::new(),
            ids: IdAllocator::default(),
            sfx: Rc::new(RefCell::new(SfxLog::default())),
            frame_time: 1.0 / f64::from(frame_rate.max(1)),
        }
    }

    /// Replace the sound sink
    pub fn with_sfx(mut self, sfx: Rc<RefCell<dyn SfxSink>>) -> Self {
        self.sfx = sfx;
        self
    }

    pub fn timer(&self, name: &str) -> Timer {
        Timer::new(name, &self.clock)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(0, 120)
    }
}
