//! GazeClick Tracking Core
//!
//! Turns per-frame eye landmarks into cursor commands:
//! - **Mapping:** Normalized iris position to absolute, clamped screen pixels
//! - **Smoothing:** Exponential moving average against the previous cursor
//! - **Blink Detection:** Eyelid-gap threshold with a non-blocking cooldown
//!
//! This crate is pure computation. No I/O, no platform dependencies, and no
//! clock: timestamps are passed in by the caller.

pub mod blink;
pub mod cursor_smooth;
pub mod mapping;

pub use blink::{BlinkDecision, BlinkDetector};
pub use cursor_smooth::CursorTracker;
pub use mapping::ScreenMapper;
