//! # Ammo Pool
//!
//! Fixed-capacity pools for short-lived simulated entities such as
//! projectiles, with physics-safe activation, parking and launch settlement.
//!
//! ## Features
//!
//! - **No steady-state allocation**: every entity is built when its pool is created
//! - **O(1) membership**: LIFO available stack plus a dense active set
//! - **Physics-safe resets**: velocity zeroed immediately, bodies parked far away
//! - **Launch settlement**: entities stay hidden until the backend confirms the launch
//! - **Backend contract**: immediate or deferred transform writes, declared up front
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ammo_pool::prelude::*;
//! use std::rc::Rc;
//!
//! fn main() -> Result<(), PoolError> {
//!     let mut world = SimulationWorld::immediate();
//!     let mut registry = PoolRegistry::new(Rc::new(LogTelemetry));
//!     registry.create_pool(
//!         &PoolConfig::new("bullets", 32),
//!         Projectile::factory(ProjectileConfig::default(), SettlementConfig::default()),
//!         &mut world,
//!     )?;
//!
//!     if let Some(handle) = registry.acquire("bullets", &mut world)? {
//!         if let Some(bullet) = registry.get_mut(handle) {
//!             bullet.launch(&mut world, Transform2D::identity(), Aim::Direction(Vec2::x()), 300.0);
//!         }
//!     }
//!
//!     for _ in 0..120 {
//!         world.step(1.0 / 60.0);
//!         registry.step(1.0 / 60.0, &mut world, &NoTargets);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod emission;
pub mod entity;
pub mod events;
pub mod foundation;
pub mod physics;
pub mod pool;


/// Common imports for pool users
pub mod prelude {
    pub use crate::{
        config::{
            Config, ConfigError, EmitterConfig, PhysicsConfig, PoolConfig, ProjectileConfig,
            SettlementConfig, SimulationConfig,
        },
        emission::{burst_directions, BurstReport, Emitter},
        entity::{
            Aim, DeactivationReason, HitTarget, Launchable, NoTargets, PhysicallySimulated,
            Poolable, Presence, Projectile, StepContext, TargetId, TargetTracker,
        },
        events::{Event, EventHandler, EventSystem, EventType},
        foundation::{
            logging::{Diagnostic, LogTelemetry, NoopTelemetry, Telemetry},
            math::{Transform2D, Vec2},
            time::{FixedTimestep, IntervalTimer},
        },
        physics::{BodyId, BoundingCircle, CollisionLayers, PhysicsBackend, SimulationWorld, WritePolicy},
        pool::{
            EntityHandle, IgnoredRelease, Pool, PoolError, PoolId, PoolRegistry, PoolStats,
            ReleaseOutcome,
        },
    };
}
