//! Emission driver
//!
//! Clients of the pool core that turn a fire rate or a trigger into acquires
//! and launches. Exhaustion is an expected condition here: a launch that finds
//! the pool empty is skipped and counted, never retried.

mod emitter;

pub use emitter::{BurstReport, Emitter, EmitterStats};

/// Launch angles in degrees for a burst of `count`
///
/// One launch goes along `base_degrees`. More launches are spaced evenly from
/// `base - spread/2` to `base + spread/2`, both ends included.
#[allow(clippy::cast_precision_loss)]
pub fn burst_directions(count: u32, spread_degrees: f32, base_degrees: f32) -> impl Iterator<Item = f32> {
    let (start, step) = if count > 1 {
        (base_degrees - spread_degrees / 2.0, spread_degrees / (count - 1) as f32)
    } else {
        (base_degrees, 0.0)
    };
    (0..count).map(move |i| start + step * i as f32)
}
