//! Named pool registry
//!
//! Owns every pool, the event system they publish to and the telemetry they
//! share. Acquires are routed by name, releases by the pool id carried in the
//! handle. Pools are only ever torn down together.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::PoolConfig;
use crate::entity::{Poolable, TargetTracker};
use crate::events::EventSystem;
use crate::foundation::logging::{Diagnostic, LogTelemetry, Telemetry};
use crate::physics::PhysicsBackend;

use super::{EntityHandle, IgnoredRelease, Pool, PoolError, PoolId, PoolName, PoolStats, ReleaseOutcome};

/// Registry of named pools
pub struct PoolRegistry<T> {
    pools: Vec<Pool<T>>,
    names: HashMap<PoolName, PoolId>,
    events: EventSystem,
    telemetry: Rc<dyn Telemetry>,
    clock: f64,
}

impl<T: Poolable> PoolRegistry<T> {
    /// Create an empty registry reporting diagnostics to `telemetry`
    pub fn new(telemetry: Rc<dyn Telemetry>) -> Self {
        Self {
            pools: Vec::new(),
            names: HashMap::new(),
            events: EventSystem::new(),
            telemetry,
            clock: 0.0,
        }
    }

    /// Create a pool from its configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Pool name, capacity and parked transform
    /// * `factory` - Builds one entity per slot
    /// * `physics` - Backend the entities register their bodies with
    ///
    /// # Returns
    ///
    /// * `Ok(PoolId)` - Pool created and all entities parked
    /// * `Err(PoolError::DuplicatePool)` - A pool with this name already exists
    /// * `Err(PoolError::Configuration)` - The pool itself could not be built
    pub fn create_pool<F>(
        &mut self,
        config: &PoolConfig,
        factory: F,
        physics: &mut dyn PhysicsBackend,
    ) -> Result<PoolId, PoolError>
    where
        F: FnMut(&mut dyn PhysicsBackend) -> Option<T>,
    {
        if self.names.contains_key(config.name.as_str()) {
            return Err(PoolError::DuplicatePool {
                name: config.name.clone(),
            });
        }

        let id = u32::try_from(self.pools.len())
            .map(PoolId)
            .map_err(|_| PoolError::configuration(&config.name, "too many pools"))?;
        let pool = Pool::new(id, config, factory, physics, Rc::clone(&self.telemetry))?;

        // Room for one activation and one deactivation per entity between dispatches
        self.events.reserve(2 * pool.capacity());
        self.names.insert(Arc::clone(pool.name()), id);
        self.pools.push(pool);
        Ok(id)
    }

    /// Acquire from a named pool
    ///
    /// `Ok(None)` means the pool is exhausted.
    pub fn acquire(
        &mut self,
        name: &str,
        physics: &mut dyn PhysicsBackend,
    ) -> Result<Option<EntityHandle>, PoolError> {
        let id = self.require_id(name)?;
        Ok(self.pools[id.0 as usize].acquire(physics, &mut self.events))
    }

    /// Release an entity to the pool it came from
    pub fn release(&mut self, handle: EntityHandle, physics: &mut dyn PhysicsBackend) -> ReleaseOutcome {
        match self.pools.get_mut(handle.pool().0 as usize) {
            Some(pool) => pool.release(handle, physics, &mut self.events),
            None => {
                self.telemetry.record(Diagnostic::IgnoredRelease {
                    pool: None,
                    slot: handle.slot(),
                    reason: IgnoredRelease::UnknownPool.as_str(),
                });
                ReleaseOutcome::Ignored(IgnoredRelease::UnknownPool)
            }
        }
    }

    /// Occupancy of a named pool
    pub fn stats(&self, name: &str) -> Result<PoolStats, PoolError> {
        self.pool(name).map(Pool::stats)
    }

    /// Occupancy of every pool, in creation order
    pub fn all_stats(&self) -> impl Iterator<Item = PoolStats> + '_ {
        self.pools.iter().map(Pool::stats)
    }

    /// Release everything a named pool has handed out
    pub fn force_release_all(&mut self, name: &str, physics: &mut dyn PhysicsBackend) -> Result<usize, PoolError> {
        let id = self.require_id(name)?;
        Ok(self.pools[id.0 as usize].force_release_all(physics, &mut self.events))
    }

    /// Advance every pool by one step, then dispatch queued events
    ///
    /// Call after the physics backend has stepped, so that entities observe
    /// the state at the step boundary.
    pub fn step(&mut self, delta_time: f32, physics: &mut dyn PhysicsBackend, targets: &dyn TargetTracker) {
        self.clock += f64::from(delta_time);
        self.events.update_time(self.clock);
        for pool in &mut self.pools {
            pool.step(delta_time, physics, targets, &mut self.events);
        }
        self.events.dispatch();
    }

    /// Dispatch queued events without stepping
    pub fn dispatch_events(&mut self) {
        self.events.dispatch();
    }

    /// Pool by name
    pub fn pool(&self, name: &str) -> Result<&Pool<T>, PoolError> {
        self.names
            .get(name)
            .map(|id| &self.pools[id.0 as usize])
            .ok_or_else(|| PoolError::UnknownPool { name: name.to_string() })
    }

    /// Pool id for a name
    pub fn pool_id(&self, name: &str) -> Option<PoolId> {
        self.names.get(name).copied()
    }

    /// Name of the pool a handle belongs to
    pub fn pool_name(&self, handle: EntityHandle) -> Option<&str> {
        self.pools.get(handle.pool().0 as usize).map(|pool| &**pool.name())
    }

    /// Entity behind a handle
    pub fn get(&self, handle: EntityHandle) -> Option<&T> {
        self.pools.get(handle.pool().0 as usize)?.get(handle)
    }

    /// Mutable entity behind a handle
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut T> {
        self.pools.get_mut(handle.pool().0 as usize)?.get_mut(handle)
    }

    /// Whether a handle refers to an active entity
    pub fn is_active(&self, handle: EntityHandle) -> bool {
        self.pools
            .get(handle.pool().0 as usize)
            .is_some_and(|pool| pool.is_active(handle))
    }

    /// Visit every active entity of every pool
    pub fn for_each_active<F>(&mut self, mut visit: F)
    where
        F: FnMut(EntityHandle, &mut T),
    {
        for pool in &mut self.pools {
            pool.for_each_active(&mut visit);
        }
    }

    /// Event system the pools publish to
    pub fn events(&self) -> &EventSystem {
        &self.events
    }

    /// Mutable event system, for handler registration
    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    /// Simulated time accumulated by `step`
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Number of pools
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether no pool was created
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Remove every pool and every body it owns
    pub fn teardown(self, physics: &mut dyn PhysicsBackend) {
        let count = self.pools.len();
        for pool in self.pools {
            pool.teardown(physics);
        }
        log::info!("Pool registry torn down ({} pools)", count);
    }

    fn require_id(&self, name: &str) -> Result<PoolId, PoolError> {
        self.pool_id(name)
            .ok_or_else(|| PoolError::UnknownPool { name: name.to_string() })
    }
}

impl<T: Poolable> Default for PoolRegistry<T> {
    fn default() -> Self {
        Self::new(Rc::new(LogTelemetry))
    }
}

impl<T> std::fmt::Debug for PoolRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.pools)
            .field("events", &self.events)
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectileConfig, SettlementConfig};
    use crate::entity::Projectile;
    use crate::foundation::logging::RecordingTelemetry;
    use crate::physics::SimulationWorld;

    fn registry_with(world: &mut SimulationWorld, capacity: usize) -> PoolRegistry<Projectile> {
        let mut registry = PoolRegistry::new(Rc::new(RecordingTelemetry::new()));
        registry
            .create_pool(
                &PoolConfig::new("bullets", capacity),
                Projectile::factory(ProjectileConfig::default(), SettlementConfig::default()),
                world,
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_pool_rejected() {
        let mut world = SimulationWorld::immediate();
        let mut registry = registry_with(&mut world, 2);
        let result = registry.create_pool(
            &PoolConfig::new("bullets", 4),
            Projectile::factory(ProjectileConfig::default(), SettlementConfig::default()),
            &mut world,
        );
        assert_eq!(result, Err(PoolError::DuplicatePool { name: "bullets".to_string() }));
        assert_eq!(registry.len(), 1);
        assert_eq!(world.body_count(), 2);
    }

    #[test]
    fn test_unknown_pool() {
        let mut world = SimulationWorld::immediate();
        let mut registry = registry_with(&mut world, 2);
        assert!(matches!(
            registry.acquire("rockets", &mut world),
            Err(PoolError::UnknownPool { .. })
        ));
        assert!(registry.stats("rockets").is_err());
        assert!(registry.force_release_all("rockets", &mut world).is_err());
    }

    #[test]
    fn test_release_routes_by_handle() {
        let mut world = SimulationWorld::immediate();
        let mut registry = registry_with(&mut world, 2);
        registry
            .create_pool(
                &PoolConfig::new("shells", 2),
                Projectile::factory(ProjectileConfig::default(), SettlementConfig::default()),
                &mut world,
            )
            .unwrap();

        let shell = registry.acquire("shells", &mut world).unwrap().unwrap();
        assert_eq!(registry.pool_name(shell), Some("shells"));
        assert_eq!(registry.stats("shells").unwrap().active, 1);

        assert!(registry.release(shell, &mut world).is_released());
        assert_eq!(registry.stats("shells").unwrap().active, 0);
        assert_eq!(registry.stats("bullets").unwrap().total_released, 0);
    }

    #[test]
    fn test_release_with_unknown_pool_is_ignored() {
        let mut world = SimulationWorld::immediate();
        let mut registry = registry_with(&mut world, 1);
        let outcome = registry.release(EntityHandle::new(PoolId(42), 0), &mut world);
        assert_eq!(outcome, ReleaseOutcome::Ignored(IgnoredRelease::UnknownPool));
    }

    #[test]
    fn test_all_stats_in_creation_order() {
        let mut world = SimulationWorld::immediate();
        let mut registry = registry_with(&mut world, 2);
        registry
            .create_pool(
                &PoolConfig::new("shells", 3),
                Projectile::factory(ProjectileConfig::default(), SettlementConfig::default()),
                &mut world,
            )
            .unwrap();

        let names: Vec<_> = registry.all_stats().map(|stats| stats.name.to_string()).collect();
        assert_eq!(names, vec!["bullets", "shells"]);
    }

    #[test]
    fn test_teardown_removes_all_bodies() {
        let mut world = SimulationWorld::immediate();
        let mut registry = registry_with(&mut world, 3);
        registry.acquire("bullets", &mut world).unwrap();
        registry.teardown(&mut world);
        assert_eq!(world.body_count(), 0);
    }
}
