//! Time management utilities
//!
//! Everything here is driven by accumulated `delta_time` values handed in by
//! the caller, never by the wall clock, so simulations replay identically
//! under variable step rates.

/// Fixed-rate interval timer
///
/// Accumulates elapsed time and reports how many whole intervals have
/// passed. Used by the emission driver for its fire cadence.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: f32,
    accumulated: f32,
    max_catch_up: u32,
}

impl IntervalTimer {
    /// Create a timer firing every `interval` seconds
    ///
    /// Non-positive or non-finite intervals produce a timer that never fires.
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            accumulated: 0.0,
            max_catch_up: 4,
        }
    }

    /// Create a timer from a rate in events per second
    pub fn from_rate(per_second: f32) -> Self {
        if per_second > 0.0 && per_second.is_finite() {
            Self::new(1.0 / per_second)
        } else {
            Self::new(0.0)
        }
    }

    /// Limit how many intervals a single `tick` may report
    ///
    /// Extra accumulated time beyond the limit is dropped so a long stall
    /// does not turn into a flood.
    pub fn with_max_catch_up(mut self, max_catch_up: u32) -> Self {
        self.max_catch_up = max_catch_up.max(1);
        self
    }

    /// Whether the timer can ever fire
    pub fn is_enabled(&self) -> bool {
        self.interval > 0.0 && self.interval.is_finite()
    }

    /// Interval length in seconds
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Advance the timer and return the number of intervals that elapsed
    pub fn tick(&mut self, delta_time: f32) -> u32 {
        if !self.is_enabled() || delta_time <= 0.0 {
            return 0;
        }

        self.accumulated += delta_time;
        let mut fired = 0;
        while self.accumulated >= self.interval && fired < self.max_catch_up {
            self.accumulated -= self.interval;
            fired += 1;
        }
        if fired == self.max_catch_up && self.accumulated >= self.interval {
            self.accumulated %= self.interval;
        }
        fired
    }

    /// Time until the next interval elapses
    pub fn remaining(&self) -> f32 {
        if self.is_enabled() {
            (self.interval - self.accumulated).max(0.0)
        } else {
            f32::INFINITY
        }
    }
}

/// Fixed simulation timestep accumulator
///
/// Converts variable frame times into a whole number of fixed physics
/// steps plus an interpolation factor for rendering between them.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    accumulated: f32,
    max_steps_per_frame: u32,
    total_time: f64,
    step_count: u64,
}

impl FixedTimestep {
    /// Create an accumulator with the given step length in seconds
    pub fn new(step: f32) -> Self {
        Self {
            step: step.max(f32::EPSILON),
            accumulated: 0.0,
            max_steps_per_frame: 8,
            total_time: 0.0,
            step_count: 0,
        }
    }

    /// Fixed step length in seconds
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Feed a frame's elapsed time, returning how many fixed steps to run
    pub fn advance(&mut self, frame_time: f32) -> u32 {
        self.accumulated += frame_time.max(0.0);
        let mut steps = 0;
        while self.accumulated >= self.step && steps < self.max_steps_per_frame {
            self.accumulated -= self.step;
            steps += 1;
        }
        if steps == self.max_steps_per_frame {
            // Spiral-of-death guard
            self.accumulated = self.accumulated.min(self.step);
        }
        self.step_count += u64::from(steps);
        self.total_time += f64::from(self.step) * f64::from(steps);
        steps
    }

    /// Interpolation factor between the last two physics states
    pub fn alpha(&self) -> f32 {
        (self.accumulated / self.step).clamp(0.0, 1.0)
    }

    /// Simulated time in seconds
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Number of fixed steps run so far
    pub fn step_count(&self) -> u64 {
        self.step_count
    }
}
