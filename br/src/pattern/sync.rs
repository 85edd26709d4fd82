//! Instantaneous repeater

use std::rc::Rc;

use tracing::debug;

use super::SyncPattern;
use crate::context::SyncHandoff;
use crate::error::PatternError;
use crate::looper::LoopControl;
use crate::props::{PatternKind, PropertySet};

/// Repeat `children` within a single tick.
///
/// Each iteration hands every child (or the one picked by `alternate`) a
/// fresh copy of the loop's handoff, carrying the caller's time offset.
pub fn gs_repeat(props: PropertySet, children: Vec<SyncPattern>) -> Result<SyncPattern, PatternError> {
    props.expect_kind(PatternKind::Sync)?;
    debug!(children = children.len(), ?props, "gs_repeat: called");
    let props = Rc::new(props);
    Ok(SyncPattern::new(move |sbh| run(&props, &children, sbh)))
}

fn run(props: &Rc<PropertySet>, children: &[SyncPattern], sbh: &mut SyncHandoff) -> Result<(), PatternError> {
    if sbh.ch.is_cancelled() {
        debug!("gs_repeat: branch cancelled, skipping");
        return Ok(());
    }
    let mut looper = LoopControl::new(props.clone(), &sbh.ch)?;
    if looper.is_clipped() {
        debug!("gs_repeat: clipped");
        looper.done(false);
        return Ok(());
    }
    while looper.remains() && looper.prepare_iteration() {
        let mut itr = SyncHandoff::new(looper.handoff().clone(), sbh.time_offset);
        match looper.selected_child(children.len()) {
            Some(k) if !children.is_empty() => children[k].run(&mut itr)?,
            Some(_) => {}
            None => {
                for child in children {
                    child.run(&mut itr)?;
                }
            }
        }
        looper.finish_iteration();
    }
    looper.done(true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CommonHandoff;
    use crate::emit::{EmissionLog, PointEmitter, Velocity};
    use crate::math::{Offset, Vec2};
    use crate::pattern::{emit, exec};
    use crate::props::Property;
    use crate::world::World;
    use proptest::prelude::*;
    use std::cell::RefCell;

    fn sbh() -> (SyncHandoff, Rc<RefCell<EmissionLog>>) {
        let log = Rc::new(RefCell::new(EmissionLog::new()));
        let ch = CommonHandoff::root(Rc::new(PointEmitter::new("e", Vec2::ZERO)), log.clone(), World::default());
        (SyncHandoff::new(ch, 0.25), log)
    }

    #[test]
    fn test_linear_increment() {
        let (mut h, log) = sbh();
        let p = gs_repeat(
            PropertySet::sync([Property::sync(3, Offset::nrot(10.0, 0.0))]).unwrap(),
            vec![emit(Velocity::Still)],
        )
        .unwrap();
        p.run(&mut h).unwrap();
        let xs: Vec<f64> = log.borrow().emissions.iter().map(|e| e.offset.nx).collect();
        assert_eq!(xs, vec![0.0, 10.0, 20.0]);
        assert!(log.borrow().emissions.iter().all(|e| e.time_offset == 0.25));
        // The caller's handoff is untouched
        assert_eq!(h.ch.gcx.rv2, Offset::ZERO);
    }

    #[test]
    fn test_circle_increment() {
        let (mut h, log) = sbh();
        let p = gs_repeat(
            PropertySet::sync([Property::times_const(4), Property::circle()]).unwrap(),
            vec![emit(Velocity::Still)],
        )
        .unwrap();
        p.run(&mut h).unwrap();
        let angles: Vec<f64> = log.borrow().emissions.iter().map(|e| e.offset.angle).collect();
        assert_eq!(angles, vec![0.0, 90.0, 180.0, 270.0]);
    }

    #[test]
    fn test_nested_indices() {
        let (mut h, _log) = sbh();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let inner = gs_repeat(
            PropertySet::sync([Property::times_const(2), Property::parametrize(crate::parametrization::Parametrization::Additive)])
                .unwrap(),
            vec![exec(move |g| sink.borrow_mut().push(g.index))],
        )
        .unwrap();
        let outer = gs_repeat(
            PropertySet::sync([Property::times_const(2), Property::parametrize(crate::parametrization::Parametrization::This)])
                .unwrap(),
            vec![inner],
        )
        .unwrap();
        outer.run(&mut h).unwrap();
        assert_eq!(*seen.borrow(), vec![0, 1, 1024, 1025]);
    }

    #[test]
    fn test_clipped_runs_nothing() {
        let (mut h, log) = sbh();
        let p = gs_repeat(
            PropertySet::sync([Property::times_const(5), Property::clip(|_| true)]).unwrap(),
            vec![emit(Velocity::Still)],
        )
        .unwrap();
        p.run(&mut h).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_rejects_durative_set() {
        let err = gs_repeat(PropertySet::durative([]).unwrap(), vec![]).unwrap_err();
        assert!(matches!(err, PatternError::KindMismatch { .. }));
    }

    #[test]
    fn test_laser_error_propagates() {
        let (mut h, _log) = sbh();
        let p = gs_repeat(PropertySet::sync([Property::on_laser(|_| 0.0)]).unwrap(), vec![]).unwrap();
        assert!(matches!(p.run(&mut h), Err(PatternError::NotLaser { .. })));
    }

    proptest! {
        #[test]
        fn test_invokes_exactly_n_times(n in 0u32..64, clipped in any::<bool>()) {
            let (mut h, log) = sbh();
            let p = gs_repeat(
                PropertySet::sync([Property::times_const(n), Property::clip(move |_| clipped)]).unwrap(),
                vec![emit(Velocity::Still)],
            )
            .unwrap();
            p.run(&mut h).unwrap();
            let expected = if clipped { 0 } else { n as usize };
            prop_assert_eq!(log.borrow().len(), expected);
        }
    }
}
