//! Frame-to-screen coordinate mapping.
//!
//! The iris landmark is first snapped to a frame pixel, then scaled by the
//! screen/frame ratio and the speed factor:
//!
//! ```text
//! px       = trunc(x_norm * frame_w)
//! screen_x = (screen_w / frame_w) * px * speed_factor
//! ```
//!
//! The scale applies to the absolute pixel position, not an offset from the
//! frame center, so with `speed_factor > 1` the raw result can leave the
//! screen. [`ScreenMapper::map`] clamps it back into
//! `[0, screen_w] x [0, screen_h]`.

use gazeclick_common::error::{GazeError, GazeResult};
use gazeclick_gaze_model::landmark::NormalizedPoint;
use gazeclick_platform_core::{CursorPosition, ScreenSize};

/// Maps normalized landmark positions onto the screen.
#[derive(Debug, Clone, Copy)]
pub struct ScreenMapper {
    screen: ScreenSize,
    speed_factor: f64,
}

impl ScreenMapper {
    /// Fails with `InvalidGeometry` for a zero-sized screen.
    pub fn new(screen: ScreenSize, speed_factor: f64) -> GazeResult<Self> {
        if screen.is_empty() {
            return Err(GazeError::invalid_geometry(
                "screen",
                screen.width,
                screen.height,
            ));
        }
        if !speed_factor.is_finite() || speed_factor <= 0.0 {
            return Err(GazeError::config(format!(
                "speed_factor must be a positive number, got {speed_factor}"
            )));
        }
        Ok(Self {
            screen,
            speed_factor,
        })
    }

    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    pub fn speed_factor(&self) -> f64 {
        self.speed_factor
    }

    /// Unclamped screen position for a landmark in a `frame_w x frame_h` frame.
    pub fn raw(&self, point: NormalizedPoint, frame_w: u32, frame_h: u32) -> GazeResult<(f64, f64)> {
        if frame_w == 0 || frame_h == 0 {
            return Err(GazeError::invalid_geometry("frame", frame_w, frame_h));
        }
        let (px, py) = point.to_pixel(frame_w, frame_h);
        let sx = self.screen.width as f64 / frame_w as f64 * px as f64 * self.speed_factor;
        let sy = self.screen.height as f64 / frame_h as f64 * py as f64 * self.speed_factor;
        Ok((sx, sy))
    }

    /// Clamped integer screen position for a landmark.
    pub fn map(
        &self,
        point: NormalizedPoint,
        frame_w: u32,
        frame_h: u32,
    ) -> GazeResult<CursorPosition> {
        let (sx, sy) = self.raw(point, frame_w, frame_h)?;
        let (cx, cy) = self.screen.clamp(sx, sy);
        Ok(CursorPosition::new(cx as i32, cy as i32))
    }
}
