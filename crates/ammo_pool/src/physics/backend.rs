//! Physics backend contract
//!
//! The pool and its entities never cache an authoritative transform. Every
//! reposition goes through [`PhysicsBackend::teleport`], and every kinematic
//! reset goes through the velocity and force setters below. A backend declares
//! through [`WritePolicy`] whether teleports land immediately or at its next
//! step boundary, and callers are written against that declaration.
//!
//! Velocity, force and freeze writes are always immediate, whatever the policy.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Transform2D, Vec2};

slotmap::new_key_type! {
    /// Handle to a rigid body owned by a physics backend
    pub struct BodyId;
}

/// When transform writes become visible in the backend's reported state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WritePolicy {
    /// Teleports are applied before the call returns
    #[default]
    Immediate,
    /// Teleports are queued and applied at a later step boundary
    DeferredToStep,
}

/// Parameters for creating a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    /// Initial transform
    pub transform: Transform2D,
    /// Mass in kilograms (non-positive values are treated as 1.0)
    pub mass: f32,
}

impl BodyDesc {
    /// Body at `transform` with unit mass
    pub fn at(transform: Transform2D) -> Self {
        Self { transform, mass: 1.0 }
    }

    /// Set the mass
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }
}

/// Snapshot of a body's reported state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// Reported (authoritative) transform
    pub transform: Transform2D,
    /// Linear velocity in units per second
    pub linear_velocity: Vec2,
    /// Angular velocity in radians per second
    pub angular_velocity: f32,
    /// Accumulated force
    pub force: Vec2,
    /// Accumulated torque
    pub torque: f32,
    /// Whether the body is frozen (excluded from integration)
    pub frozen: bool,
    /// Whether the body is asleep
    pub sleeping: bool,
    /// Whether a deferred teleport is still waiting for a step boundary
    pub teleport_pending: bool,
}

impl BodyState {
    /// True when velocity, angular velocity, force and torque are all exactly zero
    pub fn is_at_rest(&self) -> bool {
        self.linear_velocity == Vec2::zeros()
            && self.angular_velocity == 0.0
            && self.force == Vec2::zeros()
            && self.torque == 0.0
    }
}

/// Authoritative transform/velocity store used by the pool and its entities
pub trait PhysicsBackend {
    /// Declared visibility of transform writes
    fn write_policy(&self) -> WritePolicy;

    /// Register a new body
    fn create_body(&mut self, desc: BodyDesc) -> BodyId;

    /// Remove a body, returning whether it existed
    fn remove_body(&mut self, body: BodyId) -> bool;

    /// Reported state of a body
    fn body_state(&self, body: BodyId) -> Option<BodyState>;

    /// Discontinuous transform write
    ///
    /// Resets interpolation memory after the transform is written, as one
    /// operation relative to the step boundary. Under
    /// [`WritePolicy::DeferredToStep`] both happen when the write lands.
    fn teleport(&mut self, body: BodyId, transform: Transform2D);

    /// Set linear velocity (immediate)
    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vec2);

    /// Set angular velocity (immediate)
    fn set_angular_velocity(&mut self, body: BodyId, velocity: f32);

    /// Add to the accumulated force
    fn apply_force(&mut self, body: BodyId, force: Vec2);

    /// Add to the accumulated torque
    fn apply_torque(&mut self, body: BodyId, torque: f32);

    /// Zero accumulated force and torque (immediate)
    fn clear_forces(&mut self, body: BodyId);

    /// Freeze or unfreeze a body (immediate)
    fn set_frozen(&mut self, body: BodyId, frozen: bool);

    /// Wake a sleeping body
    fn wake(&mut self, body: BodyId);

    /// Make the interpolation memory equal the current reported transform
    fn reset_interpolation(&mut self, body: BodyId);

    /// Transform interpolated between the previous and current step
    fn interpolated_transform(&self, body: BodyId, alpha: f32) -> Option<Transform2D>;

    /// Advance the simulation by one step
    fn step(&mut self, delta_time: f32);

    /// Reported transform of a body
    fn transform(&self, body: BodyId) -> Option<Transform2D> {
        self.body_state(body).map(|state| state.transform)
    }

    /// Stop all motion immediately: velocity, angular velocity, force and torque
    fn halt(&mut self, body: BodyId) {
        self.set_linear_velocity(body, Vec2::zeros());
        self.set_angular_velocity(body, 0.0);
        self.clear_forces(body);
    }
}
