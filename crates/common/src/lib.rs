//! GazeClick Common Utilities
//!
//! Shared infrastructure for all GazeClick crates:
//! - Error types and result aliases
//! - Clock and timing utilities for frame timestamps and replay pacing
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
