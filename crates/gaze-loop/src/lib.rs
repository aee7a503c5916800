//! GazeClick Gaze Loop
//!
//! The frame-by-frame control loop between a landmark detector and the OS
//! cursor. Each iteration acquires a frame, mirrors it, detects landmarks,
//! maps the right-iris anchor to a smoothed screen position, evaluates the
//! eyelid gap for a blink-click, renders feedback, and polls for stop.
//!
//! The loop is single-threaded and blocking. Collaborators plug in through
//! traits:
//!
//! - [`FrameSource`]: camera or replayed landmark trace
//! - [`LandmarkDetector`]: face-mesh model or trace playback
//! - [`CursorSink`]: `xdotool`, or a recorder for dry runs
//! - [`FrameDisplay`]: feedback window and stop signal
//!
//! There is no timeout on acquisition or detection. A source that never
//! returns stalls the loop until it does.

pub mod backends;
pub mod replay;
pub mod writer;

use gazeclick_common::clock::RateController;
use gazeclick_common::config::GazeConfig;
use gazeclick_common::error::{GazeError, GazeResult};
use gazeclick_gaze_model::frame::{Frame, MarkerKind, Overlay};
use gazeclick_gaze_model::landmark::{
    EyeLandmarks, EyelidPair, FaceLandmarks, IrisLandmarks, LandmarkMap,
};
use gazeclick_gaze_model::CursorAction;
use gazeclick_platform_core::{CursorPosition, ScreenSize};
use gazeclick_tracking_core::{BlinkDecision, BlinkDetector, CursorTracker, ScreenMapper};

use crate::writer::ActionWriter;

/// Source of camera frames.
pub trait FrameSource: Send {
    /// Next frame. `Ok(None)` means the source ended normally; an error
    /// means acquisition failed and the loop must stop.
    fn acquire(&mut self) -> GazeResult<Option<Frame>>;

    /// Release the underlying device. Called once when the loop exits.
    fn release(&mut self) {}

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Face landmark detector.
pub trait LandmarkDetector: Send {
    /// Landmarks of every face in the frame, in detector order. An empty
    /// vec means no face was found.
    fn detect(&mut self, frame: &Frame) -> GazeResult<Vec<FaceLandmarks>>;

    /// Detector name for logging.
    fn name(&self) -> &str;
}

/// OS cursor interface. Calls are fire-and-forget: the loop logs failures
/// and carries on.
pub trait CursorSink: Send {
    /// Move the pointer to an absolute screen position.
    fn move_to(&mut self, position: CursorPosition) -> GazeResult<()>;

    /// Left click at the current pointer position.
    fn click(&mut self) -> GazeResult<()>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Feedback output with a non-blocking stop check.
pub trait FrameDisplay: Send {
    /// Show a frame with its overlay. Returns `true` when the user asked
    /// to stop.
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> GazeResult<bool>;

    /// Close the output. Called once when the loop exits.
    fn close(&mut self) {}
}

/// Loop parameters, resolved from configuration and the detected screen.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub screen: ScreenSize,
    pub speed_factor: f64,
    pub smooth_factor: f64,
    pub click_threshold: f64,
    pub click_cooldown_ns: u64,
    pub rearm_on_open: bool,
    pub mirror: bool,
    pub landmarks: LandmarkMap,
}

impl LoopSettings {
    pub fn from_config(config: &GazeConfig, screen: ScreenSize) -> Self {
        let t = &config.tracking;
        Self {
            screen,
            speed_factor: t.speed_factor,
            smooth_factor: t.smooth_factor,
            click_threshold: t.click_threshold,
            click_cooldown_ns: t.click_cooldown_ns(),
            rearm_on_open: t.rearm_on_open,
            mirror: t.mirror,
            landmarks: config.landmarks.clone(),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&GazeConfig::default(), ScreenSize::new(1920, 1080))
    }
}

/// Why a frame produced no cursor or blink processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The detector found no face.
    NoFace,
    /// The first face has neither the iris nor the eyelid landmarks.
    IncompleteFace,
    /// Zero-width or zero-height frame.
    DegenerateFrame,
    /// The detector returned an error.
    DetectorError,
}

/// What the loop did with one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// Cursor position sent this frame, when the iris landmarks resolved.
    pub moved_to: Option<CursorPosition>,
    /// Blink evaluation, when the eyelid landmarks resolved.
    pub blink: Option<BlinkDecision>,
    /// Set when processing stopped early.
    pub skipped: Option<SkipReason>,
    /// Feedback markers in frame-pixel coordinates.
    pub overlay: Overlay,
}

impl FrameOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    pub fn clicked(&self) -> bool {
        self.blink == Some(BlinkDecision::Click)
    }
}

/// Counters collected while the loop runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub frames_with_face: u64,
    /// Frames without a usable face.
    pub idle_frames: u64,
    /// Zero-sized frames.
    pub rejected_frames: u64,
    pub moves: u64,
    pub clicks: u64,
    /// Blinks ignored because of the cooldown.
    pub suppressed_blinks: u64,
    pub cursor_errors: u64,
    pub detector_errors: u64,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The display reported a stop request.
    StopSignal,
    /// The frame source ended.
    SourceEnded,
    /// The configured frame limit was reached.
    FrameLimit,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct LoopSummary {
    pub reason: StopReason,
    pub stats: LoopStats,
    pub final_position: CursorPosition,
}

const PROGRESS_INTERVAL_NS: u64 = 5_000_000_000;

/// The gaze tracking loop.
pub struct GazeLoop {
    source: Box<dyn FrameSource>,
    detector: Box<dyn LandmarkDetector>,
    cursor: Box<dyn CursorSink>,
    display: Box<dyn FrameDisplay>,
    actions: Option<ActionWriter>,
    landmarks: LandmarkMap,
    mirror: bool,
    mapper: ScreenMapper,
    tracker: CursorTracker,
    blink: BlinkDetector,
    stats: LoopStats,
    progress: RateController,
    max_frames: Option<u64>,
}

impl GazeLoop {
    /// Build a loop. Fails for a zero-sized screen or an inconsistent
    /// landmark table.
    pub fn new(
        settings: LoopSettings,
        source: Box<dyn FrameSource>,
        detector: Box<dyn LandmarkDetector>,
        cursor: Box<dyn CursorSink>,
        display: Box<dyn FrameDisplay>,
    ) -> GazeResult<Self> {
        settings
            .landmarks
            .validate()
            .map_err(|e| GazeError::config(e.to_string()))?;
        let mapper = ScreenMapper::new(settings.screen, settings.speed_factor)?;

        Ok(Self {
            source,
            detector,
            cursor,
            display,
            actions: None,
            landmarks: settings.landmarks,
            mirror: settings.mirror,
            mapper,
            tracker: CursorTracker::new(settings.smooth_factor),
            blink: BlinkDetector::new(
                settings.click_threshold,
                settings.click_cooldown_ns,
                settings.rearm_on_open,
            ),
            stats: LoopStats::default(),
            progress: RateController::with_interval_ns(PROGRESS_INTERVAL_NS),
            max_frames: None,
        })
    }

    /// Record every move and click to an action log.
    pub fn with_action_log(mut self, writer: ActionWriter) -> Self {
        self.actions = Some(writer);
        self
    }

    /// Stop after `max_frames` frames.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Last position sent to the cursor (origin before the first move).
    pub fn cursor_position(&self) -> CursorPosition {
        self.tracker.previous()
    }

    /// Run until stop signal, source end, frame limit, or acquisition
    /// failure. The source and display are released on every exit path.
    pub fn run(&mut self) -> GazeResult<LoopSummary> {
        tracing::info!(
            source = %self.source.name(),
            detector = %self.detector.name(),
            cursor = %self.cursor.name(),
            screen = %self.mapper.screen(),
            "Gaze loop started"
        );

        let result = loop {
            match self.step() {
                Ok(None) => continue,
                Ok(Some(reason)) => break Ok(reason),
                Err(e) => break Err(e),
            }
        };

        self.source.release();
        self.display.close();
        if let Some(writer) = self.actions.as_mut() {
            if let Err(e) = writer.flush() {
                tracing::warn!(error = %e, "Failed to flush action log");
            }
        }

        match result {
            Ok(reason) => {
                tracing::info!(
                    ?reason,
                    frames = self.stats.frames,
                    moves = self.stats.moves,
                    clicks = self.stats.clicks,
                    idle_frames = self.stats.idle_frames,
                    "Gaze loop stopped"
                );
                Ok(LoopSummary {
                    reason,
                    stats: self.stats.clone(),
                    final_position: self.tracker.previous(),
                })
            }
            Err(e) => {
                tracing::error!(error = %e, frames = self.stats.frames, "Gaze loop aborted");
                Err(e)
            }
        }
    }

    /// One iteration: acquire, process, render, poll stop.
    ///
    /// Returns `Some(reason)` when the loop should stop.
    pub fn step(&mut self) -> GazeResult<Option<StopReason>> {
        if self.max_frames.is_some_and(|max| self.stats.frames >= max) {
            return Ok(Some(StopReason::FrameLimit));
        }

        let Some(mut frame) = self.source.acquire()? else {
            return Ok(Some(StopReason::SourceEnded));
        };

        let outcome = self.process_frame(&mut frame);
        frame.draw_overlay(&outcome.overlay);

        let stop = match self.display.render(&frame, &outcome.overlay) {
            Ok(stop) => stop,
            Err(e) => {
                tracing::warn!(error = %e, "Display render failed");
                false
            }
        };

        if self.progress.should_tick(frame.timestamp_ns) && self.stats.frames > 1 {
            tracing::info!(
                frames = self.stats.frames,
                with_face = self.stats.frames_with_face,
                moves = self.stats.moves,
                clicks = self.stats.clicks,
                cursor = %self.tracker.previous(),
                "Tracking progress"
            );
        }

        Ok(stop.then_some(StopReason::StopSignal))
    }

    /// Mirror, detect, move, and evaluate blink for one frame.
    pub fn process_frame(&mut self, frame: &mut Frame) -> FrameOutcome {
        self.stats.frames += 1;

        if frame.is_degenerate() {
            self.stats.rejected_frames += 1;
            tracing::warn!(
                seq = frame.sequence,
                width = frame.width,
                height = frame.height,
                "Rejected zero-sized frame"
            );
            return FrameOutcome::skipped(SkipReason::DegenerateFrame);
        }

        if self.mirror {
            frame.mirror_horizontal();
        }

        let faces = match self.detector.detect(frame) {
            Ok(faces) => faces,
            Err(e) => {
                self.stats.detector_errors += 1;
                self.stats.idle_frames += 1;
                tracing::warn!(seq = frame.sequence, error = %e, "Landmark detection failed");
                return FrameOutcome::skipped(SkipReason::DetectorError);
            }
        };

        // Only the first face drives the cursor.
        let Some(face) = faces.first() else {
            self.stats.idle_frames += 1;
            tracing::trace!(seq = frame.sequence, "No face detected");
            return FrameOutcome::skipped(SkipReason::NoFace);
        };

        let eyes = self.landmarks.extract(face);
        if eyes.is_empty() {
            self.stats.idle_frames += 1;
            tracing::debug!(
                seq = frame.sequence,
                landmarks = face.len(),
                required = self.landmarks.required_len(),
                "Face has too few landmarks"
            );
            return FrameOutcome::skipped(SkipReason::IncompleteFace);
        }
        if !eyes.is_complete() {
            tracing::trace!(
                seq = frame.sequence,
                iris = eyes.iris.is_some(),
                eyelids = eyes.eyelids.is_some(),
                "Face resolves only part of the role table"
            );
        }

        self.stats.frames_with_face += 1;
        let mut outcome = FrameOutcome {
            overlay: overlay_for(&eyes, frame.width, frame.height),
            ..FrameOutcome::default()
        };

        // Cursor and blink run independently of each other.
        if let Some(iris) = &eyes.iris {
            outcome.moved_to = self.move_cursor(iris, frame);
        }
        if let Some(eyelids) = &eyes.eyelids {
            outcome.blink = Some(self.evaluate_blink(eyelids, frame.timestamp_ns));
        }
        outcome
    }

    fn move_cursor(&mut self, iris: &IrisLandmarks, frame: &Frame) -> Option<CursorPosition> {
        let raw = match self
            .mapper
            .map(iris.anchor.point, frame.width, frame.height)
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(seq = frame.sequence, error = %e, "Cursor mapping failed");
                return None;
            }
        };

        let smoothed = self.tracker.update(raw);
        if let Err(e) = self.cursor.move_to(smoothed) {
            self.stats.cursor_errors += 1;
            tracing::warn!(position = %smoothed, error = %e, "Cursor move failed");
        }
        self.stats.moves += 1;
        self.log_action(CursorAction::moved(
            frame.timestamp_ns,
            smoothed.x,
            smoothed.y,
        ));
        tracing::trace!(seq = frame.sequence, raw = %raw, smoothed = %smoothed, "Cursor moved");
        Some(smoothed)
    }

    fn evaluate_blink(&mut self, eyelids: &EyelidPair, now_ns: u64) -> BlinkDecision {
        let gap = eyelids.gap();
        let decision = self.blink.evaluate(gap, now_ns);
        match decision {
            BlinkDecision::Click => {
                let at = self.tracker.previous();
                if let Err(e) = self.cursor.click() {
                    self.stats.cursor_errors += 1;
                    tracing::warn!(error = %e, "Cursor click failed");
                }
                self.stats.clicks += 1;
                self.log_action(CursorAction::click(now_ns, at.x, at.y));
                tracing::debug!(gap, position = %at, "Blink click");
            }
            BlinkDecision::CoolingDown => {
                self.stats.suppressed_blinks += 1;
                tracing::debug!(gap, "Blink ignored during cooldown");
            }
            BlinkDecision::Open | BlinkDecision::Held => {}
        }
        decision
    }

    fn log_action(&mut self, action: CursorAction) {
        let Some(writer) = self.actions.as_mut() else {
            return;
        };
        if let Err(e) = writer.write_action(&action) {
            tracing::warn!(error = %e, "Failed to write action log; disabling it");
            self.actions = None;
        }
    }
}

/// Feedback markers for the iris slice and the eyelid pair.
fn overlay_for(eyes: &EyeLandmarks, width: u32, height: u32) -> Overlay {
    let mut overlay = Overlay::default();
    for landmark in eyes.iris.iter().flat_map(|iris| &iris.slice) {
        let (x, y) = landmark.point.to_pixel(width, height);
        overlay.push(x, y, MarkerKind::Iris);
    }
    for pair in &eyes.eyelids {
        for landmark in [pair.lower, pair.upper] {
            let (x, y) = landmark.point.to_pixel(width, height);
            overlay.push(x, y, MarkerKind::Eyelid);
        }
    }
    overlay
}
