//! Logging utilities and the injected telemetry collaborator
//!
//! Structural messages (pool creation, teardown) go straight through the `log`
//! facade. Per-object diagnostics that a shipping build usually wants silent,
//! such as ignored double releases, go through a [`Telemetry`] implementation
//! chosen by whoever builds the registry.

use std::cell::RefCell;

use crate::pool::PoolName;

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
pub fn init() {
    env_logger::init();
}

/// Diagnostic raised by the pool core
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Release of an entity that is not active in the pool it names
    IgnoredRelease {
        /// Pool the release was routed to, if the handle named a known pool
        pool: Option<PoolName>,
        /// Slot index from the handle
        slot: u32,
        /// Why the release was ignored
        reason: &'static str,
    },
    /// Acquire on a pool with nothing available
    Exhausted {
        /// Pool name
        pool: PoolName,
        /// Pool capacity
        capacity: usize,
    },
    /// Backend declared immediate writes but did not report the parked transform
    ParkNotApplied {
        /// Pool name
        pool: PoolName,
        /// Slot of the parked entity
        slot: u32,
    },
    /// Settlement budget ran out before the backend reported the launch transform
    UnsettledReveal {
        /// Remaining distance between reported and expected position
        error_distance: f32,
    },
}

/// Telemetry sink for pool diagnostics
pub trait Telemetry {
    /// Record a diagnostic
    fn record(&self, diagnostic: Diagnostic);
}

/// Telemetry that forwards diagnostics to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn record(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::IgnoredRelease { pool, slot, reason } => {
                let pool = pool.as_deref().unwrap_or("<unknown>");
                log::debug!("Ignored release of slot {} in pool '{}': {}", slot, pool, reason);
            }
            Diagnostic::Exhausted { pool, capacity } => {
                log::debug!("Pool '{}' exhausted ({} of {} active)", pool, capacity, capacity);
            }
            Diagnostic::ParkNotApplied { pool, slot } => {
                log::warn!("Backend left slot {} of pool '{}' off its parked transform", slot, pool);
            }
            Diagnostic::UnsettledReveal { error_distance } => {
                log::debug!("Revealing unsettled projectile ({:.3} units off)", error_distance);
            }
        }
    }
}

/// Telemetry that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _diagnostic: Diagnostic) {}
}

/// Telemetry that keeps every diagnostic in memory
///
/// Intended for tests and debugging overlays.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    records: RefCell<Vec<Diagnostic>>,
}

impl RecordingTelemetry {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded diagnostics
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.borrow().clone()
    }

    /// Number of recorded diagnostics
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, diagnostic: Diagnostic) {
        self.records.borrow_mut().push(diagnostic);
    }
}
