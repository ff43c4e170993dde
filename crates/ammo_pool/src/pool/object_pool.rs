//! Fixed-capacity pool of simulated entities
//!
//! Every entity is built when the pool is created. Membership moves between a
//! LIFO stack of available slots and a dense active set, both O(1). Handing an
//! entity out and taking it back run the activation and deactivation hooks,
//! which hide the entity and park its body away from the play area.

use std::rc::Rc;
use std::sync::Arc;

use crate::config::PoolConfig;
use crate::entity::{DeactivationReason, PhysicallySimulated, Poolable, StepContext, TargetTracker};
use crate::events::{Event, EventSystem, EventType};
use crate::foundation::logging::{Diagnostic, Telemetry};
use crate::foundation::math::Transform2D;
use crate::physics::{PhysicsBackend, WritePolicy};

use super::{EntityHandle, IgnoredRelease, PoolError, PoolId, PoolName, PoolStats, ReleaseOutcome};

/// One pooled entity and its membership
#[derive(Debug)]
pub struct PoolEntry<T> {
    handle: EntityHandle,
    pool_name: PoolName,
    active: bool,
    /// Position in the pool's active set, meaningful only while active
    active_index: usize,
    entity: T,
}

impl<T> PoolEntry<T> {
    /// Stable handle
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// Name of the owning pool
    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    /// Held by a caller
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The entity
    pub fn entity(&self) -> &T {
        &self.entity
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    peak_active: usize,
    total_acquired: u64,
    total_released: u64,
    exhaustions: u64,
}

/// Fixed-capacity pool of entities
pub struct Pool<T> {
    id: PoolId,
    name: PoolName,
    parked: Transform2D,
    entries: Vec<PoolEntry<T>>,
    /// LIFO stack of available slots
    available: Vec<u32>,
    /// Dense set of active slots
    active: Vec<u32>,
    /// Deactivation requests gathered during a step
    requests: Vec<(u32, DeactivationReason)>,
    counters: Counters,
    telemetry: Rc<dyn Telemetry>,
}

impl<T: Poolable> Pool<T> {
    /// Build every entity up front and park it
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier stamped into every handle this pool issues
    /// * `config` - Name, capacity and parked transform
    /// * `factory` - Builds one entity, registering its body with `physics`
    /// * `physics` - Backend that owns the bodies
    /// * `telemetry` - Sink for ignored releases, exhaustion and park diagnostics
    ///
    /// # Returns
    ///
    /// * `Ok(Pool)` - Every entity built and parked
    /// * `Err(PoolError::Configuration)` - Empty name, zero capacity, or the
    ///   factory yielded nothing. Bodies already built are removed again.
    pub fn new<F>(
        id: PoolId,
        config: &PoolConfig,
        mut factory: F,
        physics: &mut dyn PhysicsBackend,
        telemetry: Rc<dyn Telemetry>,
    ) -> Result<Self, PoolError>
    where
        F: FnMut(&mut dyn PhysicsBackend) -> Option<T>,
    {
        if config.name.trim().is_empty() {
            return Err(PoolError::configuration(&config.name, "pool name must not be empty"));
        }
        if config.capacity == 0 {
            return Err(PoolError::configuration(&config.name, "capacity must be positive"));
        }
        if u32::try_from(config.capacity).is_err() {
            return Err(PoolError::configuration(&config.name, "capacity exceeds u32::MAX"));
        }

        let name: PoolName = Arc::from(config.name.as_str());
        let mut entries = Vec::with_capacity(config.capacity);

        for slot in 0..config.capacity {
            let Some(entity) = factory(&mut *physics) else {
                Self::discard(entries, physics);
                return Err(PoolError::configuration(
                    &config.name,
                    format!("factory produced no entity for slot {}", slot),
                ));
            };

            #[allow(clippy::cast_possible_truncation)]
            let slot = slot as u32;
            entries.push(PoolEntry {
                handle: EntityHandle::new(id, slot),
                pool_name: Arc::clone(&name),
                active: false,
                active_index: 0,
                entity,
            });
        }

        for entry in &mut entries {
            if !Self::deactivate(&mut entry.entity, &config.parked, physics) {
                telemetry.record(Diagnostic::ParkNotApplied {
                    pool: Arc::clone(&name),
                    slot: entry.handle.slot(),
                });
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let available: Vec<u32> = (0..config.capacity as u32).rev().collect();

        log::info!("Created pool '{}' with {} entities", name, config.capacity);

        Ok(Self {
            id,
            name,
            parked: config.parked,
            entries,
            available,
            active: Vec::with_capacity(config.capacity),
            requests: Vec::with_capacity(config.capacity),
            counters: Counters::default(),
            telemetry,
        })
    }

    /// Pool id
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Pool name
    pub fn name(&self) -> &PoolName {
        &self.name
    }

    /// Fixed number of entities
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Where released entities are parked
    pub fn parked(&self) -> Transform2D {
        self.parked
    }

    /// Hand out an entity
    ///
    /// # Returns
    ///
    /// * `Some(handle)` - The most recently released slot, activated and hidden
    /// * `None` - Everything is in use; a `PoolExhausted` event is queued
    pub fn acquire(&mut self, physics: &mut dyn PhysicsBackend, events: &mut EventSystem) -> Option<EntityHandle> {
        let Some(slot) = self.available.pop() else {
            self.counters.exhaustions += 1;
            self.telemetry.record(Diagnostic::Exhausted {
                pool: Arc::clone(&self.name),
                capacity: self.capacity(),
            });
            events.send(Event::new(EventType::PoolExhausted, events.current_time(), Arc::clone(&self.name)));
            return None;
        };

        let entry = &mut self.entries[slot as usize];
        entry.active = true;
        entry.active_index = self.active.len();
        self.active.push(slot);
        Self::activate(&mut entry.entity, physics);

        let handle = entry.handle;
        self.counters.total_acquired += 1;
        self.counters.peak_active = self.counters.peak_active.max(self.active.len());

        log::trace!("Activated {} in pool '{}'", handle, self.name);
        events.send(
            Event::new(EventType::ObjectActivated, events.current_time(), Arc::clone(&self.name))
                .with_handle(handle),
        );
        Some(handle)
    }

    /// Return an entity to the available set
    ///
    /// Double releases and foreign handles are ignored and reported through
    /// telemetry.
    pub fn release(
        &mut self,
        handle: EntityHandle,
        physics: &mut dyn PhysicsBackend,
        events: &mut EventSystem,
    ) -> ReleaseOutcome {
        self.release_with(handle, DeactivationReason::Released, physics, events)
    }

    pub(crate) fn release_with(
        &mut self,
        handle: EntityHandle,
        reason: DeactivationReason,
        physics: &mut dyn PhysicsBackend,
        events: &mut EventSystem,
    ) -> ReleaseOutcome {
        if let Err(ignored) = self.check_active(handle) {
            self.telemetry.record(Diagnostic::IgnoredRelease {
                pool: Some(Arc::clone(&self.name)),
                slot: handle.slot(),
                reason: ignored.as_str(),
            });
            return ReleaseOutcome::Ignored(ignored);
        }

        let slot = handle.slot();
        let index = {
            let entry = &mut self.entries[slot as usize];
            entry.active = false;
            entry.active_index
        };
        self.active.swap_remove(index);
        if let Some(&moved) = self.active.get(index) {
            self.entries[moved as usize].active_index = index;
        }
        self.available.push(slot);

        if !Self::deactivate(&mut self.entries[slot as usize].entity, &self.parked, physics) {
            self.telemetry.record(Diagnostic::ParkNotApplied {
                pool: Arc::clone(&self.name),
                slot,
            });
        }
        self.counters.total_released += 1;

        log::trace!("Deactivated {} in pool '{}' ({:?})", handle, self.name, reason);
        events.send(
            Event::new(EventType::ObjectDeactivated, events.current_time(), Arc::clone(&self.name))
                .with_handle(handle)
                .with_reason(reason),
        );
        ReleaseOutcome::Released
    }

    /// Release every active entity, returning how many were released
    pub fn force_release_all(&mut self, physics: &mut dyn PhysicsBackend, events: &mut EventSystem) -> usize {
        let mut released = 0;
        while let Some(&slot) = self.active.last() {
            let handle = EntityHandle::new(self.id, slot);
            if self
                .release_with(handle, DeactivationReason::ForceReleased, physics, events)
                .is_released()
            {
                released += 1;
            }
        }
        if released > 0 {
            log::debug!("Force-released {} entities from pool '{}'", released, self.name);
        }
        released
    }

    /// Run per-step updates and release entities that asked to leave
    pub fn step(
        &mut self,
        delta_time: f32,
        physics: &mut dyn PhysicsBackend,
        targets: &dyn TargetTracker,
        events: &mut EventSystem,
    ) {
        let telemetry: &dyn Telemetry = &*self.telemetry;
        for &slot in &self.active {
            let entity = &mut self.entries[slot as usize].entity;
            if entity.presence().processing {
                let mut ctx = StepContext {
                    delta_time,
                    physics: &mut *physics,
                    targets,
                    telemetry,
                };
                entity.physics_process(&mut ctx);
            }
            if let Some(reason) = entity.take_deactivation_request() {
                self.requests.push((slot, reason));
            }
        }

        for index in 0..self.requests.len() {
            let (slot, reason) = self.requests[index];
            self.release_with(EntityHandle::new(self.id, slot), reason, physics, events);
        }
        self.requests.clear();
    }

    /// Occupancy snapshot
    pub fn stats(&self) -> PoolStats {
        let total = self.capacity();
        let active = self.active.len();
        #[allow(clippy::cast_precision_loss)]
        let usage_percent = active as f32 / total as f32;
        PoolStats {
            name: Arc::clone(&self.name),
            total,
            available: self.available.len(),
            active,
            usage_percent,
            peak_active: self.counters.peak_active,
            total_acquired: self.counters.total_acquired,
            total_released: self.counters.total_released,
            exhaustions: self.counters.exhaustions,
        }
    }

    /// Whether `handle` is an active member of this pool
    pub fn is_active(&self, handle: EntityHandle) -> bool {
        self.check_active(handle).is_ok()
    }

    /// Entity behind a handle of this pool, active or not
    pub fn get(&self, handle: EntityHandle) -> Option<&T> {
        self.entry(handle).map(|entry| &entry.entity)
    }

    /// Mutable entity behind a handle of this pool, active or not
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut T> {
        if handle.pool() != self.id {
            return None;
        }
        self.entries.get_mut(handle.slot() as usize).map(|entry| &mut entry.entity)
    }

    /// Entry behind a handle of this pool
    pub fn entry(&self, handle: EntityHandle) -> Option<&PoolEntry<T>> {
        if handle.pool() != self.id {
            return None;
        }
        self.entries.get(handle.slot() as usize)
    }

    /// Handles of the active entities, in no particular order
    pub fn active_handles(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.active.iter().map(move |&slot| EntityHandle::new(self.id, slot))
    }

    /// Visit every active entity
    pub fn for_each_active<F>(&mut self, mut visit: F)
    where
        F: FnMut(EntityHandle, &mut T),
    {
        for &slot in &self.active {
            let entry = &mut self.entries[slot as usize];
            visit(entry.handle, &mut entry.entity);
        }
    }

    /// Release nothing, remove every body
    pub fn teardown(self, physics: &mut dyn PhysicsBackend) {
        let capacity = self.capacity();
        let name = Arc::clone(&self.name);
        Self::discard(self.entries, physics);
        log::info!("Tore down pool '{}' ({} entities)", name, capacity);
    }

    fn check_active(&self, handle: EntityHandle) -> Result<(), IgnoredRelease> {
        if handle.pool() != self.id {
            return Err(IgnoredRelease::ForeignPool);
        }
        match self.entries.get(handle.slot() as usize) {
            None => Err(IgnoredRelease::SlotOutOfRange),
            Some(entry) if !entry.active => Err(IgnoredRelease::NotActive),
            Some(_) => Ok(()),
        }
    }

    fn activate(entity: &mut T, physics: &mut dyn PhysicsBackend) {
        let presence = entity.presence_mut();
        presence.hide();
        presence.processing = true;

        if let Some(body) = entity.simulated().map(PhysicallySimulated::body) {
            physics.set_frozen(body, false);
            physics.wake(body);
            physics.reset_interpolation(body);
        }

        entity.on_activate(physics);
    }

    /// Returns false when an immediate-write backend did not report the parked transform
    fn deactivate(entity: &mut T, parked: &Transform2D, physics: &mut dyn PhysicsBackend) -> bool {
        let presence = entity.presence_mut();
        presence.hide();
        presence.processing = false;

        entity.on_deactivate(physics);

        let Some(body) = entity.simulated().map(PhysicallySimulated::body) else {
            return true;
        };
        physics.set_frozen(body, true);
        physics.halt(body);
        physics.teleport(body, *parked);

        match physics.write_policy() {
            WritePolicy::Immediate => physics.transform(body) == Some(*parked),
            // Lands at the next step boundary; velocity is already zero
            WritePolicy::DeferredToStep => true,
        }
    }

    fn discard<I>(entries: I, physics: &mut dyn PhysicsBackend)
    where
        I: IntoIterator<Item = PoolEntry<T>>,
    {
        for entry in entries {
            if let Some(body) = entry.entity.simulated().map(PhysicallySimulated::body) {
                physics.remove_body(body);
            }
        }
    }
}

impl<T> std::fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("capacity", &self.entries.len())
            .field("available", &self.available.len())
            .field("active", &self.active.len())
            .finish()
    }
}
