//! Projectile entity
//!
//! A launch writes the origin through the backend and then hides the
//! projectile until a step boundary confirms the backend reports that origin.
//! The wait is a small state machine advanced by [`Poolable::physics_process`]:
//!
//! ```text
//! Idle --launch--> Settling --confirmed or budget spent--> Settled
//!   ^                  |                                      |
//!   +---- deactivation +--------------------------------------+
//! ```
//!
//! While the body is flying, the reported position at a boundary is the
//! origin plus the distance covered since launch, so the comparison allows
//! `tolerance + speed * flight_time`.

use crate::config::{ProjectileConfig, SettlementConfig};
use crate::foundation::logging::Diagnostic;
use crate::foundation::math::{angle_of, try_normalize, Transform2D, Vec2};
use crate::physics::{BodyDesc, BodyId, BoundingCircle, CollisionLayers, PhysicsBackend};

use super::{
    Aim, DeactivationReason, HitTarget, Launchable, PhysicallySimulated, Poolable, Presence,
    StepContext, TargetId,
};

/// Launch settlement state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Settlement {
    /// Not launched since activation
    Idle,
    /// Waiting for the backend to report the launch origin
    Settling {
        /// Written origin
        origin: Vec2,
        /// Simulated time since launch
        flight_time: f32,
        /// Step boundaries observed so far
        boundaries: u32,
    },
    /// Revealed
    Settled,
}

/// Opacity for a lifetime fraction: 1 until `start`, linear down to 0 at `end`
pub fn fade_opacity(fraction: f32, start: f32, end: f32) -> f32 {
    if fraction <= start {
        1.0
    } else if fraction >= end {
        0.0
    } else {
        1.0 - (fraction - start) / (end - start)
    }
}

/// Pooled projectile
#[derive(Debug, Clone)]
pub struct Projectile {
    body: BodyId,
    presence: Presence,
    config: ProjectileConfig,
    settlement_config: SettlementConfig,
    layer: CollisionLayers,
    settlement: Settlement,
    elapsed: f32,
    opacity: f32,
    speed: f32,
    target: Option<TargetId>,
    pending: Option<DeactivationReason>,
}

impl Projectile {
    /// Create a projectile and register its body
    pub fn new(
        physics: &mut dyn PhysicsBackend,
        config: ProjectileConfig,
        settlement_config: SettlementConfig,
    ) -> Self {
        let body = physics.create_body(BodyDesc::at(Transform2D::identity()).with_mass(config.mass));
        Self {
            body,
            presence: Presence::default(),
            config,
            settlement_config,
            layer: CollisionLayers::PROJECTILE,
            settlement: Settlement::Idle,
            elapsed: 0.0,
            opacity: 1.0,
            speed: 0.0,
            target: None,
            pending: None,
        }
    }

    /// Factory suitable for pool creation
    pub fn factory(
        config: ProjectileConfig,
        settlement_config: SettlementConfig,
    ) -> impl FnMut(&mut dyn PhysicsBackend) -> Option<Self> {
        move |physics: &mut dyn PhysicsBackend| Some(Self::new(physics, config, settlement_config))
    }

    /// Behaviour settings
    pub fn config(&self) -> &ProjectileConfig {
        &self.config
    }

    /// Layer this projectile lives on
    pub fn layer(&self) -> CollisionLayers {
        self.layer
    }

    /// Settlement state
    pub fn settlement(&self) -> Settlement {
        self.settlement
    }

    /// Whether the launch has been confirmed (or given up on)
    pub fn is_settled(&self) -> bool {
        self.settlement == Settlement::Settled
    }

    /// Seconds since activation
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Visual opacity
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Tracked homing target
    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    /// Hit-test volume at the reported position
    pub fn bounds(&self, physics: &dyn PhysicsBackend) -> Option<BoundingCircle> {
        physics
            .transform(self.body)
            .map(|transform| BoundingCircle::new(transform.position, self.config.collision_radius))
    }

    /// Contact with `target`, reported by the host
    ///
    /// Returns whether the contact counted as a hit.
    pub fn on_collision(&mut self, target: &mut dyn HitTarget) -> bool {
        if !self.presence.collidable || self.pending.is_some() {
            return false;
        }
        if !self.config.collision_mask.accepts(target.collision_layer()) {
            return false;
        }

        target.on_hit(self.config.damage);
        self.request_deactivation(DeactivationReason::Collision);
        true
    }

    fn request_deactivation(&mut self, reason: DeactivationReason) {
        // First request wins until the pool takes it
        if self.pending.is_none() {
            self.pending = Some(reason);
        }
    }

    fn advance_settlement(&mut self, ctx: &mut StepContext<'_>) {
        let Settlement::Settling { origin, flight_time, boundaries } = &mut self.settlement else {
            return;
        };
        *flight_time += ctx.delta_time;
        *boundaries += 1;

        let error = ctx
            .physics
            .transform(self.body)
            .map_or(f32::INFINITY, |reported| (reported.position - *origin).norm());
        let allowance = self.settlement_config.tolerance + self.speed * *flight_time;

        if error <= allowance {
            log::trace!("Projectile {:?} settled after {} step(s)", self.body, boundaries);
        } else if *boundaries >= self.settlement_config.max_steps {
            ctx.telemetry.record(Diagnostic::UnsettledReveal { error_distance: error - allowance });
        } else {
            return;
        }

        self.settlement = Settlement::Settled;
        // A released projectile stops processing and must stay hidden
        if self.presence.processing {
            self.presence.reveal();
        }
    }

    fn steer(&mut self, ctx: &mut StepContext<'_>) {
        let Some(target) = self.target else {
            return;
        };
        if self.config.homing_strength <= 0.0 {
            return;
        }
        let Some(goal) = ctx.targets.position_of(target) else {
            log::trace!("Homing target {:?} vanished", target);
            self.target = None;
            return;
        };
        let Some(state) = ctx.physics.body_state(self.body) else {
            return;
        };

        if let Some(toward) = try_normalize(&(goal - state.transform.position)) {
            let blended = state.linear_velocity.lerp(&(toward * self.speed), self.config.homing_strength);
            ctx.physics.set_linear_velocity(self.body, blended);
        }
    }
}

impl PhysicallySimulated for Projectile {
    fn body(&self) -> BodyId {
        self.body
    }
}

impl Poolable for Projectile {
    fn presence(&self) -> &Presence {
        &self.presence
    }

    fn presence_mut(&mut self) -> &mut Presence {
        &mut self.presence
    }

    fn simulated(&self) -> Option<&dyn PhysicallySimulated> {
        Some(self)
    }

    fn on_activate(&mut self, physics: &mut dyn PhysicsBackend) {
        self.elapsed = 0.0;
        self.opacity = 1.0;
        self.speed = 0.0;
        self.target = None;
        self.pending = None;
        self.settlement = Settlement::Idle;
        physics.halt(self.body);
    }

    fn on_deactivate(&mut self, physics: &mut dyn PhysicsBackend) {
        physics.halt(self.body);
        self.target = None;
        self.opacity = 1.0;
        self.settlement = Settlement::Idle;
        self.pending = None;
    }

    fn physics_process(&mut self, ctx: &mut StepContext<'_>) {
        if !self.presence.processing || self.pending.is_some() {
            return;
        }

        self.advance_settlement(ctx);

        self.elapsed += ctx.delta_time;
        if self.elapsed >= self.config.lifetime {
            self.opacity = 0.0;
            self.request_deactivation(DeactivationReason::Timeout);
            self.presence.processing = false;
            return;
        }

        if self.is_settled() {
            self.steer(ctx);
        }

        self.opacity = fade_opacity(
            self.elapsed / self.config.lifetime,
            self.config.fade_start,
            self.config.fade_end,
        );
    }

    fn take_deactivation_request(&mut self) -> Option<DeactivationReason> {
        self.pending.take()
    }
}

impl Launchable for Projectile {
    fn launch(&mut self, physics: &mut dyn PhysicsBackend, origin: Transform2D, aim: Aim, speed: f32) -> bool {
        if !self.presence.processing {
            log::debug!("Ignoring launch of inactive projectile {:?}", self.body);
            return false;
        }

        let direction = aim.direction_from(&origin);
        let origin = Transform2D::new(origin.position, angle_of(&direction));

        physics.teleport(self.body, origin);
        physics.set_linear_velocity(self.body, direction * speed);
        physics.wake(self.body);

        self.speed = speed.abs();
        self.presence.hide();
        self.settlement = Settlement::Settling {
            origin: origin.position,
            flight_time: 0.0,
            boundaries: 0,
        };
        true
    }

    fn track(&mut self, target: Option<TargetId>) {
        self.target = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{NoTargets, TargetTracker};
    use crate::foundation::logging::{NoopTelemetry, RecordingTelemetry, Telemetry};
    use crate::physics::SimulationWorld;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    const DT: f32 = 0.1;

    struct Dummy {
        layer: CollisionLayers,
        damage_taken: f32,
    }

    impl HitTarget for Dummy {
        fn collision_layer(&self) -> CollisionLayers {
            self.layer
        }

        fn on_hit(&mut self, damage: f32) {
            self.damage_taken += damage;
        }
    }

    fn active_projectile(world: &mut SimulationWorld, config: ProjectileConfig) -> Projectile {
        let mut projectile = Projectile::new(world, config, SettlementConfig::default());
        projectile.presence_mut().processing = true;
        projectile.on_activate(world);
        projectile
    }

    fn step(
        projectile: &mut Projectile,
        world: &mut SimulationWorld,
        targets: &dyn TargetTracker,
        telemetry: &dyn Telemetry,
    ) {
        world.step(DT);
        let mut ctx = StepContext {
            delta_time: DT,
            physics: world,
            targets,
            telemetry,
        };
        projectile.physics_process(&mut ctx);
    }

    #[test]
    fn test_fade_curve() {
        assert_relative_eq!(fade_opacity(0.5, 0.6, 0.9), 1.0);
        assert_relative_eq!(fade_opacity(0.75, 0.6, 0.9), 0.5, epsilon = 1e-6);
        assert_relative_eq!(fade_opacity(0.9, 0.6, 0.9), 0.0);
        assert_relative_eq!(fade_opacity(1.2, 0.6, 0.9), 0.0);
    }

    #[test]
    fn test_launch_hides_until_boundary() {
        let mut world = SimulationWorld::immediate();
        let mut projectile = active_projectile(&mut world, ProjectileConfig::default());
        projectile.presence_mut().reveal();

        let origin = Transform2D::from_position(Vec2::new(10.0, 10.0));
        assert!(projectile.launch(&mut world, origin, Aim::Direction(Vec2::new(1.0, 0.0)), 100.0));
        assert!(projectile.presence().is_hidden());
        assert!(matches!(projectile.settlement(), Settlement::Settling { .. }));

        step(&mut projectile, &mut world, &NoTargets, &NoopTelemetry);
        assert!(projectile.is_settled());
        assert!(projectile.presence().visible);
        assert!(projectile.presence().collidable);
    }

    #[test]
    fn test_unsettled_backend_reveals_after_budget() {
        let mut world = SimulationWorld::deferred(5);
        let telemetry = RecordingTelemetry::new();
        let mut projectile = active_projectile(&mut world, ProjectileConfig::default());

        let origin = Transform2D::from_position(Vec2::new(500.0, 500.0));
        projectile.launch(&mut world, origin, Aim::Direction(Vec2::new(1.0, 0.0)), 10.0);

        step(&mut projectile, &mut world, &NoTargets, &telemetry);
        assert!(projectile.presence().is_hidden());

        step(&mut projectile, &mut world, &NoTargets, &telemetry);
        assert!(projectile.presence().visible);
        assert!(matches!(telemetry.records()[0], Diagnostic::UnsettledReveal { .. }));
    }

    #[test]
    fn test_inactive_projectile_ignores_launch() {
        let mut world = SimulationWorld::immediate();
        let mut projectile = Projectile::new(&mut world, ProjectileConfig::default(), SettlementConfig::default());
        let launched = projectile.launch(&mut world, Transform2D::identity(), Aim::Direction(Vec2::x()), 5.0);
        assert!(!launched);
        assert_eq!(projectile.settlement(), Settlement::Idle);
    }

    #[test]
    fn test_timeout_requested_once() {
        let mut world = SimulationWorld::immediate();
        let config = ProjectileConfig { lifetime: 0.3, ..ProjectileConfig::default() };
        let mut projectile = active_projectile(&mut world, config);

        for _ in 0..2 {
            step(&mut projectile, &mut world, &NoTargets, &NoopTelemetry);
        }
        assert_eq!(projectile.take_deactivation_request(), None);

        for _ in 0..3 {
            step(&mut projectile, &mut world, &NoTargets, &NoopTelemetry);
        }
        assert_eq!(projectile.take_deactivation_request(), Some(DeactivationReason::Timeout));
        assert_eq!(projectile.take_deactivation_request(), None);
        assert!(!projectile.presence().processing);
    }

    #[test]
    fn test_collision_respects_mask_and_first_request() {
        let mut world = SimulationWorld::immediate();
        let mut projectile = active_projectile(&mut world, ProjectileConfig::default());
        projectile.presence_mut().reveal();

        let mut pickup = Dummy { layer: CollisionLayers::PICKUP, damage_taken: 0.0 };
        assert!(!projectile.on_collision(&mut pickup));

        let mut enemy = Dummy { layer: CollisionLayers::ENEMY, damage_taken: 0.0 };
        let mut second = Dummy { layer: CollisionLayers::ENEMY, damage_taken: 0.0 };
        assert!(projectile.on_collision(&mut enemy));
        assert!(!projectile.on_collision(&mut second));

        assert_relative_eq!(enemy.damage_taken, 1.0);
        assert_relative_eq!(second.damage_taken, 0.0);
        assert_eq!(projectile.take_deactivation_request(), Some(DeactivationReason::Collision));
    }

    #[test]
    fn test_hidden_projectile_does_not_collide() {
        let mut world = SimulationWorld::immediate();
        let mut projectile = active_projectile(&mut world, ProjectileConfig::default());
        let mut enemy = Dummy { layer: CollisionLayers::ENEMY, damage_taken: 0.0 };
        assert!(!projectile.on_collision(&mut enemy));
        assert_eq!(projectile.take_deactivation_request(), None);
    }

    #[test]
    fn test_homing_turns_velocity_toward_target() {
        let mut world = SimulationWorld::immediate();
        let config = ProjectileConfig { homing_strength: 0.5, lifetime: 10.0, ..ProjectileConfig::default() };
        let mut projectile = active_projectile(&mut world, config);

        let mut targets = HashMap::new();
        targets.insert(TargetId(1), Vec2::new(0.0, 1000.0));
        projectile.track(Some(TargetId(1)));
        projectile.launch(&mut world, Transform2D::identity(), Aim::Direction(Vec2::x()), 10.0);

        step(&mut projectile, &mut world, &targets, &NoopTelemetry);
        let velocity = world.body_state(projectile.body()).unwrap().linear_velocity;
        assert!(velocity.y > 0.0);
        assert!(velocity.x < 10.0);

        targets.clear();
        step(&mut projectile, &mut world, &targets, &NoopTelemetry);
        assert_eq!(projectile.target(), None);
    }

    #[test]
    fn test_deactivate_clears_motion_and_state() {
        let mut world = SimulationWorld::immediate();
        let mut projectile = active_projectile(&mut world, ProjectileConfig::default());
        projectile.track(Some(TargetId(3)));
        projectile.launch(&mut world, Transform2D::identity(), Aim::Direction(Vec2::x()), 50.0);

        projectile.on_deactivate(&mut world);
        assert!(world.body_state(projectile.body()).unwrap().is_at_rest());
        assert_eq!(projectile.target(), None);
        assert_eq!(projectile.settlement(), Settlement::Idle);
        assert_relative_eq!(projectile.opacity(), 1.0);
    }
}
