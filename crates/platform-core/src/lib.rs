//! GazeClick platform core contracts.
//!
//! Cross-platform screen geometry and cursor coordinate types used by the
//! tracking and platform crates without coupling to a concrete OS backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Information about a connected monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorInfo {
    /// Monitor name/identifier.
    pub name: String,
    /// Resolution in physical pixels.
    pub width: u32,
    pub height: u32,
    /// Position in the virtual desktop (pixels).
    pub x: i32,
    pub y: i32,
    /// Scale factor (for example 1.0, 1.25, 2.0).
    pub scale_factor: f64,
    /// Refresh rate in Hz.
    pub refresh_rate_hz: u32,
    /// Whether this monitor is primary.
    pub primary: bool,
}

impl MonitorInfo {
    pub fn size(&self) -> ScreenSize {
        ScreenSize::new(self.width, self.height)
    }
}

/// Display server / platform family the cursor is driven through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayServer {
    Wayland,
    X11,
    #[default]
    Unknown,
}

/// Screen dimensions in pixels, the target space of cursor mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamp a coordinate into `[0, width] x [0, height]`.
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x.clamp(0.0, self.width as f64),
            y.clamp(0.0, self.height as f64),
        )
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ScreenSize {
    type Err = ParseScreenSizeError;

    /// Parse `WIDTHxHEIGHT`, for example `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| ParseScreenSizeError(s.to_string()))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| ParseScreenSizeError(s.to_string()))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| ParseScreenSizeError(s.to_string()))?;
        Ok(Self { width, height })
    }
}

/// Invalid `WIDTHxHEIGHT` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected WIDTHxHEIGHT, got '{0}'")]
pub struct ParseScreenSizeError(pub String);

/// Absolute cursor position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: i32,
    pub y: i32,
}

impl CursorPosition {
    pub const ORIGIN: CursorPosition = CursorPosition { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CursorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The monitor the cursor should be mapped onto: the primary one, or the
/// first listed.
pub fn primary_monitor(monitors: &[MonitorInfo]) -> Option<&MonitorInfo> {
    monitors
        .iter()
        .find(|m| m.primary)
        .or_else(|| monitors.first())
}
