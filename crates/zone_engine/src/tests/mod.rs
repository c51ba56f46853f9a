//! Controller-level scenarios
//!
//! Each file drives a [`ZoneController`](crate::ZoneController) through
//! scene notifications and steps, checking the published edges.


use std::cell::RefCell;
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::events::{Occupant, ZoneEvent, ZoneEventKind};
use crate::foundation::collections::{EntityId, ZoneId};
use crate::foundation::logging;
use crate::foundation::math::{Frame, Vec3};
use crate::geometry::Volume;
use crate::scene::Part;
use crate::ZoneController;

fn controller() -> ZoneController {
    controller_with(EngineConfig::default())
}

fn controller_with(config: EngineConfig) -> ZoneController {
    logging::init();
    ZoneController::new(config).unwrap()
}

/// 10x10x10 box centred on the origin
fn ten_box(zones: &mut ZoneController) -> ZoneId {
    zones
        .create_zone("box", vec![Volume::cuboid(Frame::identity(), Vec3::new(10.0, 10.0, 10.0))])
        .unwrap()
}

fn unit_part(zones: &mut ZoneController, x: f32, y: f32, z: f32) -> EntityId {
    zones.spawn_part(Part::block("crate", Frame::at(x, y, z), Vec3::new(1.0, 1.0, 1.0)))
}

fn count(events: &[ZoneEvent], kind: ZoneEventKind, occupant: Occupant) -> usize {
    events.iter().filter(|e| e.kind == kind && e.occupant == occupant).count()
}

/// Subscribe to `kind` on `zone`, collecting every delivered event
fn record(zones: &mut ZoneController, zone: ZoneId, kind: ZoneEventKind) -> Rc<RefCell<Vec<ZoneEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    zones
        .zone_mut(zone)
        .unwrap()
        .events_mut()
        .register_handler(kind, move |e: &ZoneEvent| sink.borrow_mut().push(e.clone()));
    log
}
