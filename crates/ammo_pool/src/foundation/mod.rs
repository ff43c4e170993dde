//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - 2D math types and operations
//! - Deterministic time accumulation
//! - Logging re-exports and the telemetry collaborator

pub mod math;
pub mod time;
pub mod logging;
