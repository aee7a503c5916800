//! Landmark trace replay.
//!
//! A trace produced by an external face-mesh detector stands in for both
//! the camera and the detector. [`TraceReplay`] splits one trace into a
//! [`TraceFrameSource`] that yields geometry-only frames and a
//! [`TraceDetector`] that hands back the landmarks recorded for each frame.
//! The two halves are joined by a channel, keyed by frame sequence.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc;

use gazeclick_common::clock::{LoopClock, PacingLag, RateController};
use gazeclick_common::error::{GazeError, GazeResult};
use gazeclick_gaze_model::frame::Frame;
use gazeclick_gaze_model::landmark::FaceLandmarks;
use gazeclick_gaze_model::trace::{TraceHeader, TraceReader};

use crate::{FrameSource, LandmarkDetector};

/// Trace schema major version this reader understands.
const TRACE_MAJOR_VERSION: &str = "1";

/// Replay lag above which a warning is logged.
const LAG_WARN_MS: f64 = 50.0;

type BoxedRead = Box<dyn BufRead + Send>;

/// Landmarks recorded for one replayed frame.
#[derive(Debug)]
struct Detection {
    sequence: u64,
    faces: Vec<FaceLandmarks>,
}

/// Options for [`TraceReplay`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Sleep until each record's timestamp instead of replaying at full speed.
    pub realtime: bool,
    /// Whether the loop mirrors frames before detection.
    pub loop_mirrors: bool,
}

/// Entry point for replaying a landmark trace.
pub struct TraceReplay;

impl TraceReplay {
    /// Open a trace file, or stdin when `path` is `-`.
    pub fn open(
        path: &Path,
        options: ReplayOptions,
    ) -> GazeResult<(TraceFrameSource, TraceDetector)> {
        let reader: BoxedRead = if path.as_os_str() == "-" {
            Box::new(BufReader::new(std::io::stdin()))
        } else {
            if !path.exists() {
                return Err(GazeError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            Box::new(BufReader::new(File::open(path)?))
        };
        let label = path.display().to_string();
        Self::from_reader(reader, label, options)
    }

    /// Replay from any buffered reader.
    pub fn from_reader(
        reader: impl BufRead + Send + 'static,
        label: impl Into<String>,
        options: ReplayOptions,
    ) -> GazeResult<(TraceFrameSource, TraceDetector)> {
        let reader: BoxedRead = Box::new(reader);
        let trace = TraceReader::new(reader)?;
        let header = trace.header().clone();
        let label = label.into();

        let major = header.schema_version.split('.').next().unwrap_or_default();
        if major != TRACE_MAJOR_VERSION {
            return Err(GazeError::unsupported(format!(
                "trace schema version {} (expected {TRACE_MAJOR_VERSION}.x)",
                header.schema_version
            )));
        }

        // Landmarks computed on unmirrored frames must be flipped to match
        // a mirrored frame, and vice versa. Only `x` is flipped; indices keep
        // their anatomical side, so the cursor anchor lands on the other eye
        // than a detector run on the mirrored image would report.
        let flip_x = header.mirrored != options.loop_mirrors;
        tracing::info!(
            trace = %label,
            schema = %header.schema_version,
            frame_width = header.frame_width,
            frame_height = header.frame_height,
            trace_mirrored = header.mirrored,
            flip_x,
            realtime = options.realtime,
            "Opened landmark trace"
        );

        let (tx, rx) = mpsc::channel();
        let source = TraceFrameSource {
            trace,
            header,
            label,
            tx: Some(tx),
            clock: LoopClock::start(),
            realtime: options.realtime,
            next_sequence: 0,
            lag_log: RateController::new(1),
        };
        let detector = TraceDetector { rx, flip_x };
        Ok((source, detector))
    }
}

/// Frame source half of a trace replay.
pub struct TraceFrameSource {
    trace: TraceReader<BoxedRead>,
    header: TraceHeader,
    label: String,
    tx: Option<mpsc::Sender<Detection>>,
    clock: LoopClock,
    realtime: bool,
    next_sequence: u64,
    lag_log: RateController,
}

impl TraceFrameSource {
    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    fn pace(&mut self, target_ns: u64) {
        if let Some(wait) = self.clock.until(target_ns) {
            std::thread::sleep(wait);
            return;
        }
        let lag = PacingLag {
            scheduled_ns: target_ns,
            delivered_ns: self.clock.elapsed_ns(),
        };
        if lag.is_late(LAG_WARN_MS) && self.lag_log.should_tick(lag.delivered_ns) {
            tracing::warn!(
                lag_ms = lag.lag_ms(),
                "Replay is running behind the trace timeline"
            );
        }
    }
}

impl FrameSource for TraceFrameSource {
    fn acquire(&mut self) -> GazeResult<Option<Frame>> {
        let record = match self.trace.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let timestamp_ns = match record.timestamp_ns {
            Some(t) => {
                if self.realtime {
                    self.pace(t);
                }
                t
            }
            None => self.clock.elapsed_ns(),
        };
        let (width, height) = record.geometry(&self.header);

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        // The loop never runs detection on a zero-sized frame, so its
        // landmarks would sit in the channel forever.
        let degenerate = width == 0 || height == 0;
        if let Some(tx) = self.tx.as_ref().filter(|_| !degenerate) {
            let detection = Detection {
                sequence,
                faces: record.faces,
            };
            if tx.send(detection).is_err() {
                tracing::debug!("Trace detector dropped; landmarks discarded");
                self.tx = None;
            }
        }

        Ok(Some(Frame::geometry_only(
            sequence,
            timestamp_ns,
            width,
            height,
        )))
    }

    fn release(&mut self) {
        self.tx = None;
        tracing::debug!(trace = %self.label, records = self.next_sequence, "Trace replay released");
    }

    fn name(&self) -> &str {
        "trace-replay"
    }
}

/// Detector half of a trace replay.
pub struct TraceDetector {
    rx: mpsc::Receiver<Detection>,
    flip_x: bool,
}

impl LandmarkDetector for TraceDetector {
    fn detect(&mut self, frame: &Frame) -> GazeResult<Vec<FaceLandmarks>> {
        // Landmarks for frames that were never detected are stale.
        while let Ok(detection) = self.rx.try_recv() {
            if detection.sequence < frame.sequence {
                continue;
            }
            if detection.sequence > frame.sequence {
                break;
            }
            let faces = if self.flip_x {
                detection.faces.iter().map(FaceLandmarks::mirrored).collect()
            } else {
                detection.faces
            };
            return Ok(faces);
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "trace-replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = r#"# {"schema_version":"1.0","frame_width":640,"frame_height":480,"mirrored":false}
{"seq":0,"t":0,"faces":[[[0.25,0.5],[0.75,0.5]]]}

{"seq":1,"t":33000000,"faces":[]}
# comment
{"seq":2,"t":66000000,"w":320,"h":240,"faces":[]}
"#;

    fn replay(trace: &'static str, loop_mirrors: bool) -> (TraceFrameSource, TraceDetector) {
        TraceReplay::from_reader(
            trace.as_bytes(),
            "inline",
            ReplayOptions {
                realtime: false,
                loop_mirrors,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_frames_follow_records() {
        let (mut source, mut detector) = replay(TRACE, false);
        let frames: Vec<Frame> = std::iter::from_fn(|| source.acquire().unwrap()).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].timestamp_ns, 33_000_000);
        assert_eq!((frames[0].width, frames[0].height), (640, 480));
        assert_eq!((frames[2].width, frames[2].height), (320, 240));

        // Detector lags behind: stale landmarks are skipped.
        assert!(detector.detect(&frames[2]).unwrap().is_empty());
    }

    #[test]
    fn test_unmirrored_trace_is_flipped_for_mirroring_loop() {
        let (mut source, mut detector) = replay(TRACE, true);
        let frame = source.acquire().unwrap().unwrap();
        let faces = detector.detect(&frame).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].points()[0].x, 0.75);
        assert_eq!(faces[0].points()[1].x, 0.25);
    }

    #[test]
    fn test_matching_mirroring_passes_through() {
        let (mut source, mut detector) = replay(TRACE, false);
        let frame = source.acquire().unwrap().unwrap();
        let faces = detector.detect(&frame).unwrap();
        assert_eq!(faces[0].points()[0].x, 0.25);
    }

    #[test]
    fn test_malformed_record_reports_line() {
        let trace = "# {\"schema_version\":\"1.0\",\"frame_width\":640,\"frame_height\":480}\n{\"seq\":0,\"faces\":[]}\nnot json\n";
        let (mut source, _detector) = replay(trace, true);
        assert!(source.acquire().unwrap().is_some());
        let err = source.acquire().unwrap_err();
        assert!(matches!(err, GazeError::Trace { line: 3, .. }));
    }

    #[test]
    fn test_zero_sized_records_queue_no_landmarks() {
        let trace = "# {\"schema_version\":\"1.0\",\"frame_width\":0,\"frame_height\":480}\n\
            {\"seq\":0,\"faces\":[[[0.5,0.5]]]}\n\
            {\"seq\":1,\"faces\":[[[0.5,0.5]]]}\n\
            {\"seq\":2,\"w\":640,\"faces\":[[[0.25,0.5]]]}\n";
        let (mut source, mut detector) = replay(trace, true);

        let first = source.acquire().unwrap().unwrap();
        assert!(first.is_degenerate());
        source.acquire().unwrap().unwrap();
        assert!(detector.rx.try_recv().is_err());

        let valid = source.acquire().unwrap().unwrap();
        let faces = detector.detect(&valid).unwrap();
        assert_eq!(faces[0].points()[0].x, 0.25);
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let result = TraceReplay::from_reader(
            "{\"seq\":0,\"faces\":[]}\n".as_bytes(),
            "inline",
            ReplayOptions::default(),
        );
        assert!(matches!(result, Err(GazeError::Trace { .. })));
    }

    #[test]
    fn test_future_schema_is_unsupported() {
        let result = TraceReplay::from_reader(
            "# {\"schema_version\":\"2.0\",\"frame_width\":640,\"frame_height\":480}\n".as_bytes(),
            "inline",
            ReplayOptions::default(),
        );
        assert!(matches!(result, Err(GazeError::Unsupported { .. })));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = TraceReplay::open(
            Path::new("/nonexistent/gazeclick/trace.jsonl"),
            ReplayOptions::default(),
        );
        assert!(matches!(result, Err(GazeError::FileNotFound { .. })));
    }
}
