//! Fixed-capacity pools
//!
//! Every entity a pool will ever hand out is built when the pool is created.
//! Membership moves between an `available` stack and a dense `active` set in
//! O(1) and the total never changes.

mod object_pool;
pub mod registry;

use std::fmt;
use std::sync::Arc;

pub use object_pool::{Pool, PoolEntry};
pub use registry::PoolRegistry;

/// Shared pool name
pub type PoolName = Arc<str>;

/// Index of a pool inside its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub u32);

/// Stable identity of one pooled entity
///
/// A handle stays the same across every reuse of its entity. The owning pool
/// is part of the handle, so a release never needs the caller to remember
/// where the entity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    pool: PoolId,
    slot: u32,
}

impl EntityHandle {
    /// Create a handle
    pub const fn new(pool: PoolId, slot: u32) -> Self {
        Self { pool, slot }
    }

    /// Owning pool
    pub const fn pool(&self) -> PoolId {
        self.pool
    }

    /// Slot inside the owning pool
    pub const fn slot(&self) -> u32 {
        self.slot
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pool.0, self.slot)
    }
}

/// Pool occupancy snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct PoolStats {
    /// Pool name
    pub name: PoolName,
    /// Entities created at construction
    pub total: usize,
    /// Entities ready to hand out
    pub available: usize,
    /// Entities held by callers
    pub active: usize,
    /// `active / total`, from 0.0 (idle) to 1.0 (exhausted)
    pub usage_percent: f32,
    /// Highest `active` observed
    pub peak_active: usize,
    /// Successful acquires
    pub total_acquired: u64,
    /// Successful releases
    pub total_released: u64,
    /// Acquires that found nothing available
    pub exhaustions: u64,
}

/// Why a release was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredRelease {
    /// The handle names a pool the registry does not know
    UnknownPool,
    /// The handle belongs to another pool
    ForeignPool,
    /// The slot is outside the pool
    SlotOutOfRange,
    /// The entity is already available (double release)
    NotActive,
}

impl IgnoredRelease {
    /// Short description for diagnostics
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownPool => "unknown pool",
            Self::ForeignPool => "handle belongs to another pool",
            Self::SlotOutOfRange => "slot out of range",
            Self::NotActive => "entity is not active",
        }
    }
}

/// Result of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The entity moved back to the available set
    Released,
    /// Nothing changed
    Ignored(IgnoredRelease),
}

impl ReleaseOutcome {
    /// Whether the release changed pool state
    pub const fn is_released(&self) -> bool {
        matches!(self, Self::Released)
    }
}

/// Pool creation and registry errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Invalid pool setup
    #[error("Invalid configuration for pool '{pool}': {reason}")]
    Configuration {
        /// Pool name
        pool: String,
        /// What was wrong
        reason: String,
    },

    /// No pool with this name
    #[error("Unknown pool '{name}'")]
    UnknownPool {
        /// Requested name
        name: String,
    },

    /// A pool with this name already exists
    #[error("Pool '{name}' already exists")]
    DuplicatePool {
        /// Requested name
        name: String,
    },
}

impl PoolError {
    pub(crate) fn configuration(pool: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            pool: pool.to_string(),
            reason: reason.into(),
        }
    }
}
