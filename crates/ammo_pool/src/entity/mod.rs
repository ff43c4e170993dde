//! Poolable entities
//!
//! A pooled entity never owns its authoritative transform. It holds a body in
//! a [`PhysicsBackend`] and writes through it. The pool drives the shared part
//! of the lifecycle (membership, presence flags, freezing and parking the body)
//! and calls back into the entity for everything type specific.

pub mod projectile;

use std::collections::HashMap;

use crate::foundation::logging::Telemetry;
use crate::foundation::math::{try_normalize, Transform2D, Vec2};
use crate::physics::{BodyId, CollisionLayers, PhysicsBackend};

pub use projectile::{fade_opacity, Projectile, Settlement};

/// Why an entity left the active set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeactivationReason {
    /// Released from outside the pool
    Released,
    /// Released by `force_release_all` or teardown
    ForceReleased,
    /// Lifetime ran out
    Timeout,
    /// Hit something
    Collision,
}

/// Visibility, collidability and per-step processing of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Presence {
    /// Drawn by the host
    pub visible: bool,
    /// Takes part in hit tests
    pub collidable: bool,
    /// Receives per-step updates
    pub processing: bool,
}

impl Presence {
    /// Make the entity invisible and non-collidable
    pub fn hide(&mut self) {
        self.visible = false;
        self.collidable = false;
    }

    /// Make the entity visible and collidable
    pub fn reveal(&mut self) {
        self.visible = true;
        self.collidable = true;
    }

    /// Neither visible nor collidable
    pub fn is_hidden(&self) -> bool {
        !self.visible && !self.collidable
    }
}

/// Capability of entities backed by a physics body
pub trait PhysicallySimulated {
    /// Body in the physics backend
    fn body(&self) -> BodyId;
}

/// Identifier of something an entity can track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

/// Resolves tracked targets to positions
pub trait TargetTracker {
    /// Current position of a target, `None` once it no longer exists
    fn position_of(&self, target: TargetId) -> Option<Vec2>;
}

/// Tracker that knows no targets
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTargets;

impl TargetTracker for NoTargets {
    fn position_of(&self, _target: TargetId) -> Option<Vec2> {
        None
    }
}

impl<S: std::hash::BuildHasher> TargetTracker for HashMap<TargetId, Vec2, S> {
    fn position_of(&self, target: TargetId) -> Option<Vec2> {
        self.get(&target).copied()
    }
}

/// Something a projectile can hit
pub trait HitTarget {
    /// Layer the target lives on
    fn collision_layer(&self) -> CollisionLayers;

    /// Damage/effect hook
    fn on_hit(&mut self, damage: f32);
}

/// Collaborators handed to an entity's per-step update
pub struct StepContext<'a> {
    /// Step length in seconds
    pub delta_time: f32,
    /// Authoritative physics state
    pub physics: &'a mut dyn PhysicsBackend,
    /// Target positions for homing
    pub targets: &'a dyn TargetTracker,
    /// Diagnostics sink
    pub telemetry: &'a dyn Telemetry,
}

/// Unit of recycling
pub trait Poolable {
    /// Current presence flags
    fn presence(&self) -> &Presence;

    /// Mutable presence flags, driven by the owning pool
    fn presence_mut(&mut self) -> &mut Presence;

    /// Physics capability, if the entity has a body
    fn simulated(&self) -> Option<&dyn PhysicallySimulated> {
        None
    }

    /// Entity-specific reset before the entity is handed out
    fn on_activate(&mut self, physics: &mut dyn PhysicsBackend);

    /// Entity-specific reset when the entity returns to the pool
    fn on_deactivate(&mut self, physics: &mut dyn PhysicsBackend);

    /// Per-step update, called only while active and processing
    fn physics_process(&mut self, _ctx: &mut StepContext<'_>) {}

    /// Take the pending self-reported deactivation, at most once per request
    fn take_deactivation_request(&mut self) -> Option<DeactivationReason>;
}

impl<P: Poolable + ?Sized> Poolable for Box<P> {
    fn presence(&self) -> &Presence {
        (**self).presence()
    }

    fn presence_mut(&mut self) -> &mut Presence {
        (**self).presence_mut()
    }

    fn simulated(&self) -> Option<&dyn PhysicallySimulated> {
        (**self).simulated()
    }

    fn on_activate(&mut self, physics: &mut dyn PhysicsBackend) {
        (**self).on_activate(physics);
    }

    fn on_deactivate(&mut self, physics: &mut dyn PhysicsBackend) {
        (**self).on_deactivate(physics);
    }

    fn physics_process(&mut self, ctx: &mut StepContext<'_>) {
        (**self).physics_process(ctx);
    }

    fn take_deactivation_request(&mut self) -> Option<DeactivationReason> {
        (**self).take_deactivation_request()
    }
}

/// Where a launch is aimed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aim {
    /// Fly along a direction (need not be normalized)
    Direction(Vec2),
    /// Fly toward a point
    Target(Vec2),
}

impl Aim {
    /// Unit flight direction from `origin`
    ///
    /// Falls back to the origin's facing for a zero direction or a target on
    /// top of the origin.
    pub fn direction_from(&self, origin: &Transform2D) -> Vec2 {
        let raw = match self {
            Self::Direction(direction) => *direction,
            Self::Target(point) => point - origin.position,
        };
        try_normalize(&raw).unwrap_or_else(|| origin.forward())
    }
}

/// Entities that can be fired
pub trait Launchable: Poolable {
    /// Teleport to `origin`, set velocity and start settling
    ///
    /// Returns false if the entity is not active.
    fn launch(&mut self, physics: &mut dyn PhysicsBackend, origin: Transform2D, aim: Aim, speed: f32) -> bool;

    /// Track a target for homing
    fn track(&mut self, _target: Option<TargetId>) {}
}

impl<L: Launchable + ?Sized> Launchable for Box<L> {
    fn launch(&mut self, physics: &mut dyn PhysicsBackend, origin: Transform2D, aim: Aim, speed: f32) -> bool {
        (**self).launch(physics, origin, aim, speed)
    }

    fn track(&mut self, target: Option<TargetId>) {
        (**self).track(target);
    }
}
