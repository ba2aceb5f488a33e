//! Prelude module for common re-exports.
//!
//! ```rust
//! use rawq_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, QueueConfig, RawqConfig, SharedConfig};

// ─── Shared Memory Layout ───────────────────────────────────────────
pub use crate::consts::{DEFAULT_CAPACITY, SHM_MAX_SIZE};
