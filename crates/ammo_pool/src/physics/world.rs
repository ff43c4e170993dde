//! Deterministic 2D rigid-body world
//!
//! A small semi-implicit Euler integrator implementing [`PhysicsBackend`].
//! It is the backend used by the demo and by the tests, and it can emulate a
//! slow engine: with [`WritePolicy::DeferredToStep`] every teleport is held back
//! for a configurable number of step boundaries before it lands.
//!
//! Step order: integrate every awake, unfrozen body, then update sleep state,
//! then land pending teleports whose latency has elapsed.

use slotmap::SlotMap;

use crate::config::PhysicsConfig;
use crate::foundation::math::{Transform2D, Vec2};
use crate::physics::backend::{BodyDesc, BodyId, BodyState, PhysicsBackend, WritePolicy};

#[derive(Debug, Clone, Copy)]
struct PendingTeleport {
    transform: Transform2D,
    steps_remaining: u32,
}

#[derive(Debug, Clone)]
struct Body {
    transform: Transform2D,
    /// Interpolation memory: transform at the start of the last step
    previous: Transform2D,
    linear_velocity: Vec2,
    angular_velocity: f32,
    force: Vec2,
    torque: f32,
    inverse_mass: f32,
    frozen: bool,
    sleeping: bool,
    idle_time: f32,
    pending: Option<PendingTeleport>,
}

impl Body {
    fn new(desc: BodyDesc) -> Self {
        let mass = if desc.mass > 0.0 && desc.mass.is_finite() { desc.mass } else { 1.0 };
        Self {
            transform: desc.transform,
            previous: desc.transform,
            linear_velocity: Vec2::zeros(),
            angular_velocity: 0.0,
            force: Vec2::zeros(),
            torque: 0.0,
            inverse_mass: 1.0 / mass,
            frozen: false,
            sleeping: false,
            idle_time: 0.0,
            pending: None,
        }
    }

    fn write_transform(&mut self, transform: Transform2D) {
        self.transform = transform;
        // Interpolation reset strictly after the write
        self.previous = transform;
    }

    fn integrate(&mut self, delta_time: f32) {
        self.previous = self.transform;
        if self.frozen || self.sleeping {
            return;
        }

        self.linear_velocity += self.force * self.inverse_mass * delta_time;
        self.angular_velocity += self.torque * self.inverse_mass * delta_time;
        self.transform.position += self.linear_velocity * delta_time;
        self.transform.rotation += self.angular_velocity * delta_time;
    }

    fn update_sleep(&mut self, delta_time: f32, threshold: f32, delay: f32) {
        if self.frozen || self.sleeping || threshold <= 0.0 {
            return;
        }

        let resting = self.linear_velocity.norm() < threshold
            && self.angular_velocity.abs() < threshold
            && self.force == Vec2::zeros()
            && self.torque == 0.0;

        if resting {
            self.idle_time += delta_time;
            if self.idle_time >= delay {
                self.sleeping = true;
                self.linear_velocity = Vec2::zeros();
                self.angular_velocity = 0.0;
            }
        } else {
            self.idle_time = 0.0;
        }
    }

    fn land_pending(&mut self) {
        if let Some(mut pending) = self.pending.take() {
            pending.steps_remaining = pending.steps_remaining.saturating_sub(1);
            if pending.steps_remaining == 0 {
                self.write_transform(pending.transform);
            } else {
                self.pending = Some(pending);
            }
        }
    }

    fn wake(&mut self) {
        self.sleeping = false;
        self.idle_time = 0.0;
    }
}

/// Deterministic 2D physics world
#[derive(Debug, Clone)]
pub struct SimulationWorld {
    bodies: SlotMap<BodyId, Body>,
    config: PhysicsConfig,
    step_count: u64,
}

impl SimulationWorld {
    /// Create a world from configuration
    pub fn new(config: PhysicsConfig) -> Self {
        log::debug!(
            "Creating SimulationWorld ({:?}, teleport latency {} steps)",
            config.write_policy,
            config.teleport_latency_steps
        );
        Self {
            bodies: SlotMap::with_key(),
            config,
            step_count: 0,
        }
    }

    /// World whose teleports land immediately
    pub fn immediate() -> Self {
        Self::new(PhysicsConfig::default())
    }

    /// World whose teleports land after `latency_steps` step boundaries
    pub fn deferred(latency_steps: u32) -> Self {
        Self::new(PhysicsConfig {
            write_policy: WritePolicy::DeferredToStep,
            teleport_latency_steps: latency_steps.max(1),
            ..PhysicsConfig::default()
        })
    }

    /// Reserve room for additional bodies
    pub fn reserve(&mut self, additional: usize) {
        self.bodies.reserve(additional);
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of steps simulated so far
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Active configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }
}

impl Default for SimulationWorld {
    fn default() -> Self {
        Self::immediate()
    }
}

impl PhysicsBackend for SimulationWorld {
    fn write_policy(&self) -> WritePolicy {
        self.config.write_policy
    }

    fn create_body(&mut self, desc: BodyDesc) -> BodyId {
        self.bodies.insert(Body::new(desc))
    }

    fn remove_body(&mut self, body: BodyId) -> bool {
        self.bodies.remove(body).is_some()
    }

    fn body_state(&self, body: BodyId) -> Option<BodyState> {
        self.bodies.get(body).map(|b| BodyState {
            transform: b.transform,
            linear_velocity: b.linear_velocity,
            angular_velocity: b.angular_velocity,
            force: b.force,
            torque: b.torque,
            frozen: b.frozen,
            sleeping: b.sleeping,
            teleport_pending: b.pending.is_some(),
        })
    }

    fn teleport(&mut self, body: BodyId, transform: Transform2D) {
        let latency = self.config.teleport_latency_steps.max(1);
        let policy = self.config.write_policy;
        if let Some(b) = self.bodies.get_mut(body) {
            match policy {
                WritePolicy::Immediate => {
                    b.pending = None;
                    b.write_transform(transform);
                }
                WritePolicy::DeferredToStep => {
                    // A newer write supersedes any write still in flight
                    b.pending = Some(PendingTeleport {
                        transform,
                        steps_remaining: latency,
                    });
                }
            }
        } else {
            log::trace!("teleport on unknown body {:?}", body);
        }
    }

    fn set_linear_velocity(&mut self, body: BodyId, velocity: Vec2) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.linear_velocity = velocity;
            if velocity != Vec2::zeros() {
                b.wake();
            }
        }
    }

    fn set_angular_velocity(&mut self, body: BodyId, velocity: f32) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.angular_velocity = velocity;
            if velocity != 0.0 {
                b.wake();
            }
        }
    }

    fn apply_force(&mut self, body: BodyId, force: Vec2) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.force += force;
            b.wake();
        }
    }

    fn apply_torque(&mut self, body: BodyId, torque: f32) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.torque += torque;
            b.wake();
        }
    }

    fn clear_forces(&mut self, body: BodyId) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.force = Vec2::zeros();
            b.torque = 0.0;
        }
    }

    fn set_frozen(&mut self, body: BodyId, frozen: bool) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.frozen = frozen;
        }
    }

    fn wake(&mut self, body: BodyId) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.wake();
        }
    }

    fn reset_interpolation(&mut self, body: BodyId) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.previous = b.transform;
        }
    }

    fn interpolated_transform(&self, body: BodyId, alpha: f32) -> Option<Transform2D> {
        self.bodies
            .get(body)
            .map(|b| b.previous.lerp(&b.transform, alpha.clamp(0.0, 1.0)))
    }

    fn step(&mut self, delta_time: f32) {
        let threshold = self.config.sleep_speed_threshold;
        let delay = self.config.sleep_delay;
        for body in self.bodies.values_mut() {
            body.integrate(delta_time);
            body.update_sleep(delta_time, threshold, delay);
            body.land_pending();
        }
        self.step_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn body_at(world: &mut SimulationWorld, x: f32, y: f32) -> BodyId {
        world.create_body(BodyDesc::at(Transform2D::from_position(Vec2::new(x, y))))
    }

    #[test]
    fn test_integration_moves_body() {
        let mut world = SimulationWorld::immediate();
        let body = body_at(&mut world, 0.0, 0.0);
        world.set_linear_velocity(body, Vec2::new(10.0, 0.0));
        world.step(0.5);

        let state = world.body_state(body).unwrap();
        assert_relative_eq!(state.transform.position, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_frozen_body_does_not_move() {
        let mut world = SimulationWorld::immediate();
        let body = body_at(&mut world, 1.0, 1.0);
        world.set_linear_velocity(body, Vec2::new(10.0, 0.0));
        world.set_frozen(body, true);
        world.step(1.0);

        assert_relative_eq!(world.transform(body).unwrap().position, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_immediate_teleport_resets_interpolation() {
        let mut world = SimulationWorld::immediate();
        let body = body_at(&mut world, 0.0, 0.0);
        world.set_linear_velocity(body, Vec2::new(10.0, 0.0));
        world.step(1.0);

        world.teleport(body, Transform2D::from_position(Vec2::new(100.0, 100.0)));
        let halfway = world.interpolated_transform(body, 0.5).unwrap();
        assert_relative_eq!(halfway.position, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_deferred_teleport_lands_after_latency() {
        let mut world = SimulationWorld::deferred(2);
        let body = body_at(&mut world, 0.0, 0.0);
        let target = Transform2D::from_position(Vec2::new(50.0, 0.0));
        world.teleport(body, target);

        assert!(world.body_state(body).unwrap().teleport_pending);
        assert_relative_eq!(world.transform(body).unwrap().position, Vec2::zeros());

        world.step(0.1);
        assert_relative_eq!(world.transform(body).unwrap().position, Vec2::zeros());

        world.step(0.1);
        let state = world.body_state(body).unwrap();
        assert!(!state.teleport_pending);
        assert_relative_eq!(state.transform.position, target.position);
        assert_relative_eq!(
            world.interpolated_transform(body, 0.3).unwrap().position,
            target.position
        );
    }

    #[test]
    fn test_force_accumulates_until_cleared() {
        let mut world = SimulationWorld::immediate();
        let body = body_at(&mut world, 0.0, 0.0);
        world.apply_force(body, Vec2::new(2.0, 0.0));
        world.apply_torque(body, 1.0);
        world.step(1.0);

        let state = world.body_state(body).unwrap();
        assert_relative_eq!(state.linear_velocity, Vec2::new(2.0, 0.0));
        assert_relative_eq!(state.force, Vec2::new(2.0, 0.0));

        world.halt(body);
        assert!(world.body_state(body).unwrap().is_at_rest());
    }

    #[test]
    fn test_idle_body_falls_asleep_and_wakes() {
        let mut world = SimulationWorld::immediate();
        let body = body_at(&mut world, 0.0, 0.0);
        for _ in 0..10 {
            world.step(0.1);
        }
        assert!(world.body_state(body).unwrap().sleeping);

        world.wake(body);
        assert!(!world.body_state(body).unwrap().sleeping);
    }

    #[test]
    fn test_remove_body() {
        let mut world = SimulationWorld::immediate();
        let body = body_at(&mut world, 0.0, 0.0);
        assert!(world.remove_body(body));
        assert!(!world.remove_body(body));
        assert!(world.body_state(body).is_none());
        assert_eq!(world.body_count(), 0);
    }
}
