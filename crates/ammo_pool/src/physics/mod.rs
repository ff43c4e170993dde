//! Physics module: backend contract, reference world and collision helpers
//!
//! The pool core only talks to [`PhysicsBackend`]. [`SimulationWorld`] is the
//! deterministic implementation shipped with the crate.

pub mod backend;
pub mod collision;
pub mod collision_layers;
pub mod world;

pub use backend::{BodyDesc, BodyId, BodyState, PhysicsBackend, WritePolicy};
pub use collision::BoundingCircle;
pub use collision_layers::CollisionLayers;
pub use world::SimulationWorld;
