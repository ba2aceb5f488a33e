//! rawq Common Library
//!
//! This crate provides shared constants and configuration loading utilities
//! for all rawq workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Shared memory limits and region naming constants
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rawq_common::consts::*;
//! use rawq_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
