//! Cursor motion smoothing.
//!
//! The tracker owns the one piece of state that survives between frames:
//! the last position actually sent to the cursor. Every new raw position is
//! blended with it using an exponential moving average.

use gazeclick_platform_core::CursorPosition;

/// Exponential-moving-average cursor tracker.
#[derive(Debug, Clone)]
pub struct CursorTracker {
    /// Weight of the newest raw position, in (0, 1].
    smooth_factor: f64,
    previous: CursorPosition,
}

impl CursorTracker {
    /// Create a tracker starting at the screen origin.
    ///
    /// `smooth_factor` is clamped into `(0, 1]`; `1.0` disables smoothing.
    pub fn new(smooth_factor: f64) -> Self {
        Self::with_previous(smooth_factor, CursorPosition::ORIGIN)
    }

    /// Create a tracker resuming from a known cursor position.
    pub fn with_previous(smooth_factor: f64, previous: CursorPosition) -> Self {
        let smooth_factor = if smooth_factor.is_finite() {
            smooth_factor.clamp(f64::EPSILON, 1.0)
        } else {
            1.0
        };
        Self {
            smooth_factor,
            previous,
        }
    }

    pub fn smooth_factor(&self) -> f64 {
        self.smooth_factor
    }

    /// Last position handed out by [`update`](Self::update).
    pub fn previous(&self) -> CursorPosition {
        self.previous
    }

    /// Blend `raw` with the previous position without storing the result.
    ///
    /// `smoothed = prev * (1 - s) + raw * s`, truncated to whole pixels.
    /// Evaluated as `prev + (raw - prev) * s` so the result never rounds
    /// outside `[prev, raw]`.
    pub fn smooth(&self, raw: CursorPosition) -> CursorPosition {
        let s = self.smooth_factor;
        let blend = |prev: i32, new: i32| {
            let (prev, new) = (prev as f64, new as f64);
            (prev + (new - prev) * s) as i32
        };
        CursorPosition::new(
            blend(self.previous.x, raw.x),
            blend(self.previous.y, raw.y),
        )
    }

    /// Smooth `raw`, store the result as the new previous position, and
    /// return it. Call only when the result is actually sent to the cursor.
    pub fn update(&mut self, raw: CursorPosition) -> CursorPosition {
        let smoothed = self.smooth(raw);
        self.previous = smoothed;
        smoothed
    }
}
