//! Emitters, the emission factory, and emission sinks

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::{Offset, Vec2, atan2d};

/// Path along which laser-time indexing samples positions
pub trait LaserPath {
    /// Offset at draw time `t`, or `None` when `t` is outside the drawn path
    fn index(&self, t: f64) -> Option<Offset>;
}

/// The entity on whose behalf a pattern executes
pub trait Emitter {
    fn id(&self) -> &str;

    /// World position of the emitter
    fn position(&self) -> Vec2;

    /// Angle the emitter was summoned with
    fn original_angle(&self) -> f64 {
        0.0
    }

    /// Direction of the emitter's velocity
    fn velocity_angle(&self) -> f64 {
        self.original_angle()
    }

    /// Direction of the rotational part of the emitter's velocity
    fn rotational_velocity_angle(&self) -> f64 {
        self.velocity_angle()
    }

    /// Laser path when this emitter is a laser
    fn laser(&self) -> Option<&dyn LaserPath> {
        None
    }
}

/// Polyline of sampled centers, one every `stagger` seconds of draw time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineLaser {
    pub centers: Vec<Vec2>,
    pub stagger: f64,
}

impl LaserPath for PolylineLaser {
    fn index(&self, t: f64) -> Option<Offset> {
        if self.centers.is_empty() || self.stagger <= 0.0 {
            return None;
        }
        let idx = t / self.stagger;
        let last = (self.centers.len() - 1) as f64;
        if idx < 0.0 || idx > last {
            return None;
        }
        let lo = idx.floor() as usize;
        let hi = (lo + 1).min(self.centers.len() - 1);
        let a = self.centers[lo];
        let b = self.centers[hi];
        let loc = a.lerp(b, idx - lo as f64);
        let angle = if hi == lo && lo > 0 {
            let prev = self.centers[lo - 1];
            atan2d(b.y - prev.y, b.x - prev.x)
        } else {
            atan2d(b.y - a.y, b.x - a.x)
        };
        Some(Offset::new(loc.x, loc.y, 0.0, 0.0, angle))
    }
}

/// Stock emitter: a fixed point, optionally carrying a laser path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointEmitter {
    pub id: String,
    pub position: Vec2,
    pub original_angle: f64,
    pub velocity_angle: Option<f64>,
    pub laser: Option<PolylineLaser>,
}

impl PointEmitter {
    pub fn new(id: &str, position: Vec2) -> Self {
        Self {
            id: id.to_string(),
            position,
            ..Self::default()
        }
    }

    pub fn with_original_angle(mut self, angle: f64) -> Self {
        self.original_angle = angle;
        self
    }

    pub fn with_laser(mut self, laser: PolylineLaser) -> Self {
        self.laser = Some(laser);
        self
    }
}

impl Emitter for PointEmitter {
    fn id(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn original_angle(&self) -> f64 {
        self.original_angle
    }

    fn velocity_angle(&self) -> f64 {
        self.velocity_angle.unwrap_or(self.original_angle)
    }

    fn laser(&self) -> Option<&dyn LaserPath> {
        self.laser.as_ref().map(|l| l as &dyn LaserPath)
    }
}

/// Base angle applied to every offset before it becomes a world position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// The emitter's original angle
    #[default]
    Original,
    /// No rotation
    Derot,
    /// The emitter's velocity direction
    Velocity,
    /// The emitter's rotational velocity direction
    RotVelocity,
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Derot => write!(f, "derot"),
            Self::Velocity => write!(f, "velocity"),
            Self::RotVelocity => write!(f, "rotvelocity"),
        }
    }
}

impl std::str::FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "derot" => Ok(Self::Derot),
            "velocity" => Ok(Self::Velocity),
            "rotvelocity" => Ok(Self::RotVelocity),
            _ => Err(format!("Unknown facing: {}", s)),
        }
    }
}

/// Opaque movement descriptor handed to the emission sink
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Velocity {
    #[default]
    Still,
    /// Straight line along the emission angle
    Linear { speed: f64 },
    /// Line plus constant turning rate in degrees per second
    Polar { speed: f64, angular: f64 },
}

/// One emission request as seen by a sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emission {
    /// Unique id of the emitted object
    pub id: u64,
    /// Tick on which the emission happened
    pub frame: u64,
    /// Sub-frame time already elapsed when the object appears, in seconds
    pub time_offset: f64,
    /// Firing index of the emitting invocation
    pub index: i64,
    pub style: String,
    /// Offset after facing has been applied
    pub offset: Offset,
    /// World position: parent offset plus the faced true location
    pub position: Vec2,
    pub velocity: Velocity,
}

/// Receiver for emissions produced by leaf actions
pub trait EmissionSink {
    /// Accept an emission and return a handle for it
    fn emit(&mut self, emission: Emission) -> u64;
}

/// [`EmissionSink`] that records every emission in order
#[derive(Debug, Default)]
pub struct EmissionLog {
    pub emissions: Vec<Emission>,
}

impl EmissionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.emissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty()
    }

    /// Emissions made on `frame`
    pub fn on_frame(&self, frame: u64) -> impl Iterator<Item = &Emission> {
        self.emissions.iter().filter(move |e| e.frame == frame)
    }
}

impl EmissionSink for EmissionLog {
    fn emit(&mut self, emission: Emission) -> u64 {
        let id = emission.id;
        self.emissions.push(emission);
        id
    }
}

/// Emission factory carried in every handoff.
///
/// Cloning is shallow for the emitter and sink and copies the style, facing
/// and root override, so a branch can restyle without affecting its siblings.
#[derive(Clone)]
pub struct Creator {
    emitter: Rc<dyn Emitter>,
    sink: Rc<RefCell<dyn EmissionSink>>,
    /// Style token merged by color-cycling loops
    pub style: String,
    pub facing: Facing,
    /// Overrides the emitter position as the origin of offsets
    pub root: Option<Vec2>,
}

impl Creator {
    pub fn new(emitter: Rc<dyn Emitter>, sink: Rc<RefCell<dyn EmissionSink>>) -> Self {
        Self {
            emitter,
            sink,
            style: String::new(),
            facing: Facing::default(),
            root: None,
        }
    }

    pub fn emitter(&self) -> &Rc<dyn Emitter> {
        &self.emitter
    }

    /// Origin that offsets are measured from
    pub fn parent_offset(&self) -> Vec2 {
        self.root.unwrap_or_else(|| self.emitter.position())
    }

    pub fn facing_angle(&self) -> f64 {
        match self.facing {
            Facing::Original => self.emitter.original_angle(),
            Facing::Derot => 0.0,
            Facing::Velocity => self.emitter.velocity_angle(),
            Facing::RotVelocity => self.emitter.rotational_velocity_angle(),
        }
    }

    /// Offset with the facing rotation applied
    pub fn faced(&self, offset: Offset) -> Offset {
        offset.rotate_all(self.facing_angle())
    }

    /// World position of `offset`
    pub fn to_raw_position(&self, offset: Offset) -> Vec2 {
        self.parent_offset() + self.faced(offset).true_location()
    }

    /// Send one emission to the sink
    pub fn emit(&self, offset: Offset, velocity: Velocity, index: i64, id: u64, frame: u64, time_offset: f64) -> u64 {
        let faced = self.faced(offset);
        let position = self.parent_offset() + faced.true_location();
        debug!(id, index, style = %self.style, offset = %faced, "Creator::emit: called");
        self.sink.borrow_mut().emit(Emission {
            id,
            frame,
            time_offset,
            index,
            style: self.style.clone(),
            offset: faced,
            position,
            velocity,
        })
    }
}

impl std::fmt::Debug for Creator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Creator")
            .field("emitter", &self.emitter.id())
            .field("style", &self.style)
            .field("facing", &self.facing)
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creator_at(x: f64, y: f64, angle: f64) -> (Creator, Rc<RefCell<EmissionLog>>) {
        let log = Rc::new(RefCell::new(EmissionLog::new()));
        let emitter = Rc::new(PointEmitter::new("e", Vec2::new(x, y)).with_original_angle(angle));
        (Creator::new(emitter, log.clone()), log)
    }

    #[test]
    fn test_raw_position_uses_facing() {
        let (mut creator, _) = creator_at(10.0, 0.0, 90.0);
        let pos = creator.to_raw_position(Offset::nrot(1.0, 0.0));
        assert!((pos.x - 10.0).abs() < 1e-9);
        assert!((pos.y - 1.0).abs() < 1e-9);

        creator.facing = Facing::Derot;
        let pos = creator.to_raw_position(Offset::nrot(1.0, 0.0));
        assert!((pos.x - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_root_overrides_emitter_position() {
        let (mut creator, _) = creator_at(10.0, 10.0, 0.0);
        creator.root = Some(Vec2::new(0.0, 0.0));
        assert_eq!(creator.parent_offset(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_emit_records_in_order() {
        let (mut creator, log) = creator_at(0.0, 0.0, 0.0);
        creator.style = "red".to_string();
        creator.emit(Offset::nrot(1.0, 0.0), Velocity::Linear { speed: 2.0 }, 0, 7, 3, 0.0);
        creator.emit(Offset::nrot(2.0, 0.0), Velocity::Still, 1, 8, 3, 0.0);

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log.emissions[0].id, 7);
        assert_eq!(log.emissions[0].style, "red");
        assert_eq!(log.emissions[1].position, Vec2::new(2.0, 0.0));
        assert_eq!(log.on_frame(3).count(), 2);
    }

    #[test]
    fn test_clone_isolates_style() {
        let (creator, _) = creator_at(0.0, 0.0, 0.0);
        let mut branch = creator.clone();
        branch.style = "blue".to_string();
        assert_eq!(creator.style, "");
    }

    #[test]
    fn test_polyline_laser_index() {
        let laser = PolylineLaser {
            centers: vec![Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0)],
            stagger: 1.0,
        };
        let mid = laser.index(0.5).unwrap();
        assert!((mid.nx - 1.0).abs() < 1e-9);
        assert!(mid.angle.abs() < 1e-9);
        let up = laser.index(1.5).unwrap();
        assert!((up.angle - 90.0).abs() < 1e-9);
        assert!(laser.index(-0.1).is_none());
        assert!(laser.index(2.5).is_none());
    }

    #[test]
    fn test_facing_from_str() {
        assert_eq!("derot".parse::<Facing>().unwrap(), Facing::Derot);
        assert_eq!(Facing::RotVelocity.to_string(), "rotvelocity");
        assert!("sideways".parse::<Facing>().is_err());
    }
}
