//! Camera frames and overlay markers.

use serde::{Deserialize, Serialize};

/// Bytes per pixel of the RGB8 buffer.
pub const CHANNELS: usize = 3;

/// One camera image, alive for a single loop iteration.
///
/// The pixel buffer is RGB8, row-major. It may be empty for frames that
/// only carry geometry (for example frames replayed from a landmark trace);
/// pixel operations are no-ops on such frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Monotonically increasing frame number.
    pub sequence: u64,
    /// Capture time, monotonic nanoseconds since the loop started.
    pub timestamp_ns: u64,
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Create a frame from an RGB8 buffer.
    pub fn new(
        sequence: u64,
        timestamp_ns: u64,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            sequence,
            timestamp_ns,
            width,
            height,
            pixels,
        })
    }

    /// A frame with geometry but no pixel data.
    pub fn geometry_only(sequence: u64, timestamp_ns: u64, width: u32, height: u32) -> Self {
        Self {
            sequence,
            timestamp_ns,
            width,
            height,
            pixels: Vec::new(),
        }
    }

    pub fn has_pixels(&self) -> bool {
        !self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Whether either dimension is zero.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Flip the image left-to-right in place.
    pub fn mirror_horizontal(&mut self) {
        if !self.has_pixels() {
            return;
        }
        let row_len = self.width as usize * CHANNELS;
        for row in self.pixels.chunks_exact_mut(row_len) {
            let (mut left, mut right) = (0, self.width as usize - 1);
            while left < right {
                for c in 0..CHANNELS {
                    row.swap(left * CHANNELS + c, right * CHANNELS + c);
                }
                left += 1;
                right -= 1;
            }
        }
    }

    /// RGB value at a pixel, if the frame has pixels and the point is inside.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if !self.has_pixels() || x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }

    /// Paint a filled disc, clipped to the frame.
    pub fn fill_circle(&mut self, cx: i64, cy: i64, radius: i64, color: [u8; 3]) {
        if !self.has_pixels() {
            return;
        }
        let (w, h) = (self.width as i64, self.height as i64);
        for y in (cy - radius).max(0)..=(cy + radius).min(h - 1) {
            for x in (cx - radius).max(0)..=(cx + radius).min(w - 1) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= radius * radius {
                    let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
                    self.pixels[i..i + CHANNELS].copy_from_slice(&color);
                }
            }
        }
    }

    /// Draw every marker of an overlay onto the frame.
    pub fn draw_overlay(&mut self, overlay: &Overlay) {
        for marker in &overlay.markers {
            self.fill_circle(marker.x, marker.y, Marker::RADIUS, marker.kind.color());
        }
    }
}

/// What a marker highlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Right-iris slice landmark.
    Iris,
    /// Blink-eye eyelid landmark.
    Eyelid,
}

impl MarkerKind {
    /// RGB color used when drawing.
    pub fn color(self) -> [u8; 3] {
        match self {
            MarkerKind::Iris => [0, 255, 0],
            MarkerKind::Eyelid => [255, 255, 0],
        }
    }
}

/// A feedback marker in frame-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub x: i64,
    pub y: i64,
    pub kind: MarkerKind,
}

impl Marker {
    pub const RADIUS: i64 = 3;
}

/// Markers to render on top of a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub markers: Vec<Marker>,
}

impl Overlay {
    pub fn push(&mut self, x: i64, y: i64, kind: MarkerKind) {
        self.markers.push(Marker { x, y, kind });
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Errors building a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}
