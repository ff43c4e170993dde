//! Fixed-rate and triggered emitters
//!
//! An emitter owns no entities. It acquires from a named pool, launches what
//! it gets, and counts what it could not launch.

use crate::config::EmitterConfig;
use crate::entity::{Aim, Launchable, TargetId};
use crate::foundation::math::{angle_of, direction_from_angle, try_normalize, Transform2D, Vec2};
use crate::foundation::time::IntervalTimer;
use crate::physics::PhysicsBackend;
use crate::pool::{PoolError, PoolRegistry};

use super::burst_directions;

/// Outcome of one trigger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstReport {
    /// Launches attempted
    pub requested: u32,
    /// Launches that found an entity
    pub launched: u32,
    /// Launches skipped because the pool was exhausted
    pub skipped: u32,
}

impl BurstReport {
    /// Some but not all launches happened
    pub fn is_partial(&self) -> bool {
        self.launched > 0 && self.skipped > 0
    }

    fn absorb(&mut self, other: Self) {
        self.requested += other.requested;
        self.launched += other.launched;
        self.skipped += other.skipped;
    }
}

/// Lifetime counters of an emitter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    /// Triggers handled (timer intervals, `fire` and `burst` calls)
    pub triggers: u64,
    /// Entities launched
    pub launched: u64,
    /// Launches skipped on exhaustion
    pub skipped: u64,
}

/// Fixed-rate or triggered launcher drawing from one named pool
#[derive(Debug, Clone)]
pub struct Emitter {
    pool: String,
    timer: IntervalTimer,
    speed: f32,
    burst_count: u32,
    spread_degrees: f32,
    base_direction_degrees: f32,
    origin: Transform2D,
    target: Option<TargetId>,
    stats: EmitterStats,
}

impl Emitter {
    /// Emitter at the world origin
    pub fn new(config: &EmitterConfig) -> Self {
        Self {
            pool: config.pool.clone(),
            timer: IntervalTimer::from_rate(config.fire_rate),
            speed: config.speed,
            burst_count: config.burst_count.max(1),
            spread_degrees: config.spread_degrees,
            base_direction_degrees: config.base_direction_degrees,
            origin: Transform2D::identity(),
            target: None,
            stats: EmitterStats::default(),
        }
    }

    /// Place the muzzle
    pub fn with_origin(mut self, origin: Transform2D) -> Self {
        self.origin = origin;
        self
    }

    /// Pool the emitter draws from
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Muzzle transform
    pub fn origin(&self) -> Transform2D {
        self.origin
    }

    /// Move the muzzle
    pub fn set_origin(&mut self, origin: Transform2D) {
        self.origin = origin;
    }

    /// Base direction in degrees
    pub fn base_direction_degrees(&self) -> f32 {
        self.base_direction_degrees
    }

    /// Set the base direction in degrees
    pub fn set_base_direction_degrees(&mut self, degrees: f32) {
        self.base_direction_degrees = degrees;
    }

    /// Turn the base direction toward a point; a point on the muzzle keeps the current direction
    pub fn aim_at(&mut self, point: Vec2) {
        if let Some(direction) = try_normalize(&(point - self.origin.position)) {
            self.base_direction_degrees = angle_of(&direction).to_degrees();
        }
    }

    /// Target handed to launched entities for homing
    pub fn set_tracked_target(&mut self, target: Option<TargetId>) {
        self.target = target;
    }

    /// Lifetime counters
    pub fn stats(&self) -> EmitterStats {
        self.stats
    }

    /// Advance the fire timer and trigger a burst per elapsed interval
    pub fn update<T: Launchable>(
        &mut self,
        delta_time: f32,
        registry: &mut PoolRegistry<T>,
        physics: &mut dyn PhysicsBackend,
    ) -> Result<BurstReport, PoolError> {
        let mut report = BurstReport::default();
        for _ in 0..self.timer.tick(delta_time) {
            report.absorb(self.burst(registry, physics)?);
        }
        Ok(report)
    }

    /// Launch one entity along the base direction
    ///
    /// Returns whether something was launched.
    pub fn fire<T: Launchable>(
        &mut self,
        registry: &mut PoolRegistry<T>,
        physics: &mut dyn PhysicsBackend,
    ) -> Result<bool, PoolError> {
        self.stats.triggers += 1;
        let launched = self.launch_one(self.base_direction_degrees, registry, physics)?;
        Ok(launched)
    }

    /// Launch `burst_count` entities fanned across the spread
    ///
    /// Each launch acquires on its own; an exhausted pool skips the rest of
    /// the launches individually instead of failing the burst.
    pub fn burst<T: Launchable>(
        &mut self,
        registry: &mut PoolRegistry<T>,
        physics: &mut dyn PhysicsBackend,
    ) -> Result<BurstReport, PoolError> {
        self.stats.triggers += 1;
        let mut report = BurstReport::default();
        for degrees in burst_directions(self.burst_count, self.spread_degrees, self.base_direction_degrees) {
            report.requested += 1;
            if self.launch_one(degrees, registry, physics)? {
                report.launched += 1;
            } else {
                report.skipped += 1;
            }
        }

        if report.skipped > 0 {
            log::debug!(
                "Burst from '{}' launched {} of {}",
                self.pool,
                report.launched,
                report.requested
            );
        }
        Ok(report)
    }

    fn launch_one<T: Launchable>(
        &mut self,
        degrees: f32,
        registry: &mut PoolRegistry<T>,
        physics: &mut dyn PhysicsBackend,
    ) -> Result<bool, PoolError> {
        let Some(handle) = registry.acquire(&self.pool, physics)? else {
            self.stats.skipped += 1;
            return Ok(false);
        };
        let launched = match registry.get_mut(handle) {
            Some(entity) => {
                entity.track(self.target);
                let direction = direction_from_angle(degrees.to_radians());
                entity.launch(physics, self.origin, Aim::Direction(direction), self.speed)
            }
            None => false,
        };

        if launched {
            self.stats.launched += 1;
        } else {
            // A refused launch must not hold pool capacity
            registry.release(handle, physics);
            self.stats.skipped += 1;
            log::debug!("Launch of {} from '{}' refused, entity returned", handle, self.pool);
        }
        Ok(launched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PoolConfig, ProjectileConfig, SettlementConfig};
    use crate::entity::{DeactivationReason, PhysicallySimulated, Poolable, Presence, Projectile};
    use crate::foundation::logging::NoopTelemetry;
    use crate::physics::SimulationWorld;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    fn setup(capacity: usize) -> (SimulationWorld, PoolRegistry<Projectile>) {
        let mut world = SimulationWorld::immediate();
        let mut registry = PoolRegistry::new(Rc::new(NoopTelemetry));
        registry
            .create_pool(
                &PoolConfig::new("bullets", capacity),
                Projectile::factory(ProjectileConfig::default(), SettlementConfig::default()),
                &mut world,
            )
            .unwrap();
        (world, registry)
    }

    fn burst_config() -> EmitterConfig {
        EmitterConfig {
            pool: "bullets".to_string(),
            fire_rate: 2.0,
            speed: 100.0,
            burst_count: 3,
            spread_degrees: 30.0,
            base_direction_degrees: 0.0,
        }
    }

    #[test]
    fn test_burst_fans_out() {
        let (mut world, mut registry) = setup(8);
        let mut emitter = Emitter::new(&burst_config());

        let report = emitter.burst(&mut registry, &mut world).unwrap();
        assert_eq!(report, BurstReport { requested: 3, launched: 3, skipped: 0 });

        let pool = registry.pool("bullets").unwrap();
        let angles: Vec<f32> = pool
            .active_handles()
            .map(|handle| {
                let body = pool.get(handle).unwrap().body();
                angle_of(&world.body_state(body).unwrap().linear_velocity).to_degrees()
            })
            .collect();
        assert_relative_eq!(angles[0], -15.0, epsilon = 1e-3);
        assert_relative_eq!(angles[1], 0.0, epsilon = 1e-3);
        assert_relative_eq!(angles[2], 15.0, epsilon = 1e-3);
    }

    #[test]
    fn test_burst_partial_success() {
        let (mut world, mut registry) = setup(1);
        let mut emitter = Emitter::new(&burst_config());

        let report = emitter.burst(&mut registry, &mut world).unwrap();
        assert_eq!(report, BurstReport { requested: 3, launched: 1, skipped: 2 });
        assert!(report.is_partial());
        assert_eq!(registry.stats("bullets").unwrap().exhaustions, 2);
        assert_eq!(emitter.stats().skipped, 2);
    }

    #[test]
    fn test_unknown_pool_is_an_error() {
        let (mut world, mut registry) = setup(1);
        let mut emitter = Emitter::new(&EmitterConfig {
            pool: "rockets".to_string(),
            ..burst_config()
        });
        assert!(emitter.fire(&mut registry, &mut world).is_err());
    }

    /// Entity that never accepts a launch
    #[derive(Default)]
    struct Jammed {
        presence: Presence,
    }

    impl Poolable for Jammed {
        fn presence(&self) -> &Presence {
            &self.presence
        }

        fn presence_mut(&mut self) -> &mut Presence {
            &mut self.presence
        }

        fn on_activate(&mut self, _physics: &mut dyn PhysicsBackend) {}

        fn on_deactivate(&mut self, _physics: &mut dyn PhysicsBackend) {}

        fn take_deactivation_request(&mut self) -> Option<DeactivationReason> {
            None
        }
    }

    impl Launchable for Jammed {
        fn launch(&mut self, _physics: &mut dyn PhysicsBackend, _origin: Transform2D, _aim: Aim, _speed: f32) -> bool {
            false
        }
    }

    #[test]
    fn test_refused_launch_returns_entity_to_pool() {
        let mut world = SimulationWorld::immediate();
        let mut registry: PoolRegistry<Jammed> = PoolRegistry::new(Rc::new(NoopTelemetry));
        registry
            .create_pool(
                &PoolConfig::new("bullets", 2),
                |_: &mut dyn PhysicsBackend| Some(Jammed::default()),
                &mut world,
            )
            .unwrap();
        let mut emitter = Emitter::new(&burst_config());

        for _ in 0..3 {
            assert!(!emitter.fire(&mut registry, &mut world).unwrap());
        }

        let stats = registry.stats("bullets").unwrap();
        assert_eq!((stats.active, stats.available), (0, 2));
        assert_eq!(stats.exhaustions, 0);
        assert_eq!(emitter.stats().launched, 0);
        assert_eq!(emitter.stats().skipped, 3);
    }

    #[test]
    fn test_update_fires_at_rate() {
        let (mut world, mut registry) = setup(16);
        let mut emitter = Emitter::new(&EmitterConfig {
            burst_count: 1,
            ..burst_config()
        });

        let mut launched = 0;
        for _ in 0..8 {
            launched += emitter.update(0.125, &mut registry, &mut world).unwrap().launched;
        }
        assert_eq!(launched, 2);
        assert_eq!(emitter.stats().triggers, 2);
    }

    #[test]
    fn test_aim_at_sets_base_direction() {
        let mut emitter = Emitter::new(&burst_config())
            .with_origin(Transform2D::from_position(Vec2::new(10.0, 10.0)));
        emitter.aim_at(Vec2::new(10.0, 50.0));
        assert_relative_eq!(emitter.base_direction_degrees(), 90.0, epsilon = 1e-4);

        emitter.aim_at(Vec2::new(10.0, 10.0));
        assert_relative_eq!(emitter.base_direction_degrees(), 90.0, epsilon = 1e-4);
    }
}
