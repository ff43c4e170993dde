//! Headless turret demo
//!
//! A turret tracks drifting targets and fires pooled projectiles at them.
//! Pool usage, exhaustion and hits are reported through the log.
//!
//! Usage: `turret_demo [config.toml|config.ron]`

use std::cell::Cell;
use std::rc::Rc;

use ammo_pool::prelude::*;
use rand::Rng;

// Demo configuration
const SIMULATED_SECONDS: f32 = 12.0;
const FRAME_TIME: f32 = 1.0 / 30.0;
const TARGET_COUNT: u32 = 3;
const ARENA_RADIUS: f32 = 400.0;
const TARGET_RADIUS: f32 = 12.0;
const TARGET_HEALTH: f32 = 5.0;

struct Target {
    id: TargetId,
    position: Vec2,
    velocity: Vec2,
    health: f32,
    hits: u32,
}

impl Target {
    fn spawn(id: TargetId, rng: &mut impl Rng) -> Self {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance: f32 = rng.gen_range(150.0..300.0);
        let speed: f32 = rng.gen_range(20.0..60.0);
        let heading = rng.gen_range(0.0..std::f32::consts::TAU);
        Self {
            id,
            position: Vec2::new(angle.cos(), angle.sin()) * distance,
            velocity: Vec2::new(heading.cos(), heading.sin()) * speed,
            health: TARGET_HEALTH,
            hits: 0,
        }
    }

    fn bounds(&self) -> BoundingCircle {
        BoundingCircle::new(self.position, TARGET_RADIUS)
    }
}

impl HitTarget for Target {
    fn collision_layer(&self) -> CollisionLayers {
        CollisionLayers::ENEMY
    }

    fn on_hit(&mut self, damage: f32) {
        self.health -= damage;
        self.hits += 1;
    }
}

/// Every live target, by id
struct TargetField {
    targets: Vec<Target>,
}

impl TargetField {
    fn new(rng: &mut impl Rng) -> Self {
        Self {
            targets: (0..TARGET_COUNT).map(|i| Target::spawn(TargetId(i), rng)).collect(),
        }
    }

    fn update(&mut self, delta_time: f32, rng: &mut impl Rng) {
        for target in &mut self.targets {
            target.position += target.velocity * delta_time;
            if target.health <= 0.0 || target.position.norm() > ARENA_RADIUS {
                log::info!("Target {:?} respawned after {} hits", target.id, target.hits);
                *target = Target::spawn(target.id, rng);
            }
        }
    }

    fn nearest(&self, point: Vec2) -> Option<&Target> {
        self.targets.iter().min_by(|a, b| {
            (a.position - point)
                .norm_squared()
                .total_cmp(&(b.position - point).norm_squared())
        })
    }
}

impl TargetTracker for TargetField {
    fn position_of(&self, target: TargetId) -> Option<Vec2> {
        self.targets
            .iter()
            .find(|t| t.id == target && t.health > 0.0)
            .map(|t| t.position)
    }
}

fn load_config() -> Result<SimulationConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load_from_file(&path),
        None => {
            let config = SimulationConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let mut rng = rand::thread_rng();

    let mut world = SimulationWorld::new(config.physics.clone());
    let mut registry: PoolRegistry<Projectile> = PoolRegistry::new(Rc::new(LogTelemetry));
    for pool in &config.pools {
        registry.create_pool(pool, Projectile::factory(config.projectile, config.settlement), &mut world)?;
    }

    let exhausted = Rc::new(Cell::new(0_u32));
    let counter = Rc::clone(&exhausted);
    registry.events_mut().register_handler(
        EventType::PoolExhausted,
        Box::new(move |_: &Event| {
            counter.set(counter.get() + 1);
            false
        }),
    );

    let mut emitters: Vec<Emitter> = config.emitters.iter().map(Emitter::new).collect();
    let mut field = TargetField::new(&mut rng);
    let mut clock = FixedTimestep::new(config.physics.fixed_timestep);
    let mut report_timer = IntervalTimer::new(1.0);

    log::info!(
        "Simulating {:.1}s with {} pool(s) and {} emitter(s)",
        SIMULATED_SECONDS,
        registry.len(),
        emitters.len()
    );

    let mut elapsed = 0.0;
    while elapsed < SIMULATED_SECONDS {
        elapsed += FRAME_TIME;

        for _ in 0..clock.advance(FRAME_TIME) {
            let dt = clock.step();
            field.update(dt, &mut rng);

            for emitter in &mut emitters {
                if let Some(target) = field.nearest(emitter.origin().position) {
                    emitter.aim_at(target.position);
                    emitter.set_tracked_target(Some(target.id));
                }
                emitter.update(dt, &mut registry, &mut world)?;
            }

            world.step(dt);

            registry.for_each_active(|_, projectile| {
                let Some(bounds) = projectile.bounds(&world) else {
                    return;
                };
                for target in &mut field.targets {
                    if bounds.intersects(&target.bounds()) && projectile.on_collision(target) {
                        break;
                    }
                }
            });

            registry.step(dt, &mut world, &field);
        }

        if report_timer.tick(FRAME_TIME) > 0 {
            for stats in registry.all_stats() {
                log::info!(
                    "[{:>5.1}s] '{}' {}/{} active ({:.0}%), peak {}, launched {}, returned {}",
                    clock.total_time(),
                    stats.name,
                    stats.active,
                    stats.total,
                    stats.usage_percent * 100.0,
                    stats.peak_active,
                    stats.total_acquired,
                    stats.total_released
                );
            }
        }
    }

    for (index, emitter) in emitters.iter().enumerate() {
        let stats = emitter.stats();
        log::info!(
            "Emitter {} on '{}': {} triggers, {} launched, {} skipped",
            index,
            emitter.pool(),
            stats.triggers,
            stats.launched,
            stats.skipped
        );
    }
    let hits: u32 = field.targets.iter().map(|t| t.hits).sum();
    log::info!("Exhaustion events: {}, hits on current targets: {}", exhausted.get(), hits);

    registry.teardown(&mut world);
    log::info!("Bodies left in world: {}", world.body_count());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting turret demo");

    match run() {
        Ok(()) => {
            log::info!("Turret demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Turret demo failed: {}", e);
            Err(e)
        }
    }
}
