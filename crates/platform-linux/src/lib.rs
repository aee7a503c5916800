//! GazeClick Linux Platform Integration
//!
//! Platform-specific implementations for Linux:
//! - **Display Detection:** Monitor enumeration through `xrandr`
//! - **Cursor Driver:** Pointer moves and clicks through `xdotool`
//! - **Permissions:** Capability detection and user guidance

pub mod display;
pub mod permissions;
pub mod xdotool;

pub use display::*;
pub use xdotool::Xdotool;
