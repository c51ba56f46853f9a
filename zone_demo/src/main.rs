//! Zone walkthrough demo
//!
//! Builds two bordering zones in an exclusive group, then wanders a crate
//! and a player character around them and logs every membership edge.
//! Pass a `.toml` or `.ron` engine config path to override the defaults.
//!
//! Logs at `info` unless `RUST_LOG` says otherwise.

use std::env;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zone_engine::prelude::*;

const STEPS: u32 = 240;
const STEP_TIME: f64 = 1.0 / 30.0;
const WANDER_RADIUS: f32 = 30.0;
const WANDER_SPEED: f32 = 12.0;

struct Walker {
    entity: EntityId,
    position: Vec3,
    velocity: Vec3,
}

impl Walker {
    fn advance(&mut self, rng: &mut StdRng, dt: f32) {
        if rng.gen_bool(0.05) {
            self.velocity =
                Vec3::new(rng.gen_range(-1.0..1.0), 0.0, rng.gen_range(-1.0..1.0)) * WANDER_SPEED;
        }
        self.position += self.velocity * dt;
        // Turn back at the edge of the play area
        if self.position.norm() > WANDER_RADIUS {
            self.velocity = -self.position.normalize() * WANDER_SPEED;
        }
    }
}

fn load_config() -> EngineConfig {
    let Some(path) = env::args().nth(1) else {
        return EngineConfig::default();
    };
    match EngineConfig::load_from_file(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path);
            config
        }
        Err(e) => {
            warn!("Falling back to default config: {}", e);
            EngineConfig::default()
        }
    }
}

fn log_events(zones: &mut ZoneController, zone: ZoneId, name: &'static str) -> ZoneResult<()> {
    let events = zones.zone_mut(zone)?.events_mut();
    for kind in [
        ZoneEventKind::ItemEntered,
        ZoneEventKind::ItemExited,
        ZoneEventKind::PlayerEntered,
        ZoneEventKind::PlayerExited,
        ZoneEventKind::LocalPlayerEntered,
    ] {
        events.register_handler(kind, move |e: &ZoneEvent| {
            info!("[{:>6.2}] {}: {:?} {:?} volumes {:?}", e.timestamp, name, e.kind, e.occupant, e.volumes);
        });
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = load_config();
    let mut zones = ZoneController::new(config)?;
    let mut rng = StdRng::seed_from_u64(2024);

    let plaza = zones.create_zone_from_region("plaza", Frame::at(-8.0, 0.0, 0.0), Vec3::new(20.0, 10.0, 20.0))?;
    let market = zones.create_zone(
        "market",
        vec![
            Volume::cuboid(Frame::at(8.0, 0.0, 0.0), Vec3::new(20.0, 10.0, 20.0)),
            Volume::ball(Vec3::new(20.0, 0.0, 0.0), 6.0),
        ],
    )?;
    zones.set_group("town", GroupSettings::default());
    zones.bind_to_group(plaza, "town")?;
    zones.bind_to_group(market, "town")?;
    log_events(&mut zones, plaza, "plaza")?;
    log_events(&mut zones, market, "market")?;

    let crate_id = zones.spawn_part(Part::block("crate", Frame::at(25.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0)));
    zones.track_item(plaza, crate_id)?;
    zones.track_item(market, crate_id)?;
    zones.on_item_enter(plaza, crate_id, || info!("crate reached the plaza for the first time"))?;

    let player = PlayerId(1);
    let hero = zones.spawn_character(Character::humanoid("hero", Frame::at(-25.0, 0.0, 0.0)));
    zones.add_player(player);
    zones.set_player_character(player, Some(hero))?;
    zones.set_local_player(Some(player));

    let mut walkers = [
        Walker { entity: crate_id, position: Vec3::new(25.0, 0.0, 0.0), velocity: Vec3::zeros() },
        Walker { entity: hero, position: Vec3::new(-25.0, 0.0, 0.0), velocity: Vec3::zeros() },
    ];

    let mut published = 0;
    for step in 0..STEPS {
        let now = f64::from(step) * STEP_TIME;
        for walker in &mut walkers {
            walker.advance(&mut rng, STEP_TIME as f32);
            zones.move_entity(walker.entity, Frame::from_position(walker.position))?;
        }
        let report = zones.step(now);
        published += report.events.len();
        for failure in &report.errors {
            warn!("evaluation failed: {:?}", failure);
        }
    }

    for zone in zones.zones() {
        info!(
            "{}: {} volumes, volume {:.0}, items {:?}, players {:?}",
            zone.name(),
            zone.zone_parts().len(),
            zone.volume(),
            zone.items(),
            zone.players()
        );
    }
    match zones.random_point_with(market, &mut rng)? {
        Some((point, volumes)) => info!("random market point {:?} in volumes {:?}", point, volumes),
        None => info!("no random market point found"),
    }
    info!("{} events published over {} steps", published, STEPS);
    Ok(())
}
