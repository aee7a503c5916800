//! Collaborator implementations for the gaze loop.
//!
//! - [`Xdotool`] drives the real pointer.
//! - [`RecordingCursor`] records commands instead (dry runs, tests).
//! - [`HeadlessDisplay`] renders nothing and stops on an external flag.
//! - [`StubFrameSource`] and [`StubDetector`] replay scripted data.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use gazeclick_common::config::{CursorBackendKind, CursorConfig};
use gazeclick_common::error::{GazeError, GazeResult};
use gazeclick_gaze_model::frame::{Frame, Overlay};
use gazeclick_gaze_model::landmark::FaceLandmarks;
use gazeclick_platform_core::CursorPosition;
use gazeclick_platform_linux::Xdotool;

use crate::{CursorSink, FrameDisplay, FrameSource, LandmarkDetector};

impl CursorSink for Xdotool {
    fn move_to(&mut self, position: CursorPosition) -> GazeResult<()> {
        self.mouse_move(position.x, position.y)
    }

    fn click(&mut self) -> GazeResult<()> {
        self.click_left()
    }

    fn name(&self) -> &str {
        "xdotool"
    }
}

/// A command received by a [`RecordingCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorCommand {
    Move(CursorPosition),
    Click,
}

/// Shared view of the commands a [`RecordingCursor`] received.
#[derive(Debug, Clone, Default)]
pub struct CursorLog(Arc<Mutex<Vec<CursorCommand>>>);

impl CursorLog {
    pub fn commands(&self) -> Vec<CursorCommand> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn moves(&self) -> Vec<CursorPosition> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                CursorCommand::Move(p) => Some(p),
                CursorCommand::Click => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| **c == CursorCommand::Click)
            .count()
    }

    fn push(&self, command: CursorCommand) {
        if let Ok(mut commands) = self.0.lock() {
            commands.push(command);
        }
    }
}

/// Cursor sink that records commands without touching the OS pointer.
#[derive(Debug, Default)]
pub struct RecordingCursor {
    log: CursorLog,
    fail: bool,
}

impl RecordingCursor {
    /// A sink whose every call fails after being recorded.
    pub fn failing() -> Self {
        Self {
            log: CursorLog::default(),
            fail: true,
        }
    }

    pub fn log(&self) -> CursorLog {
        self.log.clone()
    }

    fn result(&self) -> GazeResult<()> {
        if self.fail {
            Err(GazeError::cursor("recording cursor configured to fail"))
        } else {
            Ok(())
        }
    }
}

impl CursorSink for RecordingCursor {
    fn move_to(&mut self, position: CursorPosition) -> GazeResult<()> {
        self.log.push(CursorCommand::Move(position));
        self.result()
    }

    fn click(&mut self) -> GazeResult<()> {
        self.log.push(CursorCommand::Click);
        self.result()
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Choose the cursor backend from configuration.
///
/// Falls back to recording when `xdotool` is configured but missing, so a
/// dry run can still proceed on machines without it.
pub fn build_cursor(config: &CursorConfig, dry_run: bool) -> Box<dyn CursorSink> {
    if dry_run || config.backend == CursorBackendKind::DryRun {
        return Box::new(RecordingCursor::default());
    }
    if !Xdotool::is_installed() {
        tracing::warn!("xdotool not found; cursor commands will only be recorded");
        return Box::new(RecordingCursor::default());
    }
    Box::new(Xdotool::new(config.display.clone()))
}

/// Display that draws nothing. Stops when its flag is raised, or after a
/// fixed number of frames.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    stop: Arc<AtomicBool>,
    rendered: Arc<AtomicU64>,
    stop_after: Option<u64>,
}

impl HeadlessDisplay {
    /// Use an existing stop flag, for example one set from a Ctrl+C handler.
    pub fn with_stop_flag(stop: Arc<AtomicBool>) -> Self {
        Self {
            stop,
            ..Self::default()
        }
    }

    /// Request stop once `frames` frames were rendered.
    pub fn stop_after(mut self, frames: u64) -> Self {
        self.stop_after = Some(frames);
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Counter of rendered frames, readable after the display moved into a loop.
    pub fn rendered_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.rendered)
    }
}

impl FrameDisplay for HeadlessDisplay {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> GazeResult<bool> {
        let rendered = self.rendered.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(seq = frame.sequence, markers = overlay.markers.len(), "Frame rendered");
        let limit_hit = self.stop_after.is_some_and(|max| rendered >= max);
        Ok(limit_hit || self.stop.load(Ordering::SeqCst))
    }
}

/// Frame source replaying a fixed list of frames.
pub struct StubFrameSource {
    frames: VecDeque<Frame>,
    fail_when_empty: Option<String>,
    released: Arc<AtomicBool>,
}

impl StubFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            fail_when_empty: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// `n` frames of `width`x`height`, 33 ms apart.
    pub fn uniform(n: u64, width: u32, height: u32) -> Self {
        Self::new(
            (0..n)
                .map(|i| Frame::geometry_only(i, i * 33_000_000, width, height))
                .collect(),
        )
    }

    /// Fail with an acquisition error once the frames run out.
    pub fn failing_after(mut self, message: impl Into<String>) -> Self {
        self.fail_when_empty = Some(message.into());
        self
    }

    /// Flag set when the loop released the source.
    pub fn released_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl FrameSource for StubFrameSource {
    fn acquire(&mut self) -> GazeResult<Option<Frame>> {
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => match &self.fail_when_empty {
                Some(message) => Err(GazeError::acquisition(message.clone())),
                None => Ok(None),
            },
        }
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Detector returning scripted results, one entry per call. Returns no
/// faces once the script runs out.
#[derive(Debug, Default)]
pub struct StubDetector {
    results: VecDeque<GazeResult<Vec<FaceLandmarks>>>,
}

impl StubDetector {
    pub fn new(detections: Vec<Vec<FaceLandmarks>>) -> Self {
        Self {
            results: detections.into_iter().map(Ok).collect(),
        }
    }

    /// Script that includes detector failures.
    pub fn scripted(results: Vec<GazeResult<Vec<FaceLandmarks>>>) -> Self {
        Self {
            results: results.into(),
        }
    }
}

impl LandmarkDetector for StubDetector {
    fn detect(&mut self, _frame: &Frame) -> GazeResult<Vec<FaceLandmarks>> {
        self.results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
