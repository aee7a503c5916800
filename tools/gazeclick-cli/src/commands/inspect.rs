//! Summarize a landmark trace.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use gazeclick_common::clock::LoopClock;
use gazeclick_common::config::GazeConfig;
use gazeclick_common::error::GazeError;
use gazeclick_gaze_model::landmark::LandmarkMap;
use gazeclick_gaze_model::trace::{TraceHeader, TraceReader};

/// Aggregate statistics of one trace.
#[derive(Debug, Default, PartialEq)]
pub struct TraceSummary {
    pub frames: u64,
    /// Frames whose first face resolves the iris or the eyelids.
    pub frames_with_face: u64,
    pub multi_face_frames: u64,
    /// First faces missing some of the roles.
    pub incomplete_faces: u64,
    /// Contiguous runs of sub-threshold eyelid gaps.
    pub blink_spans: u64,
    pub geometries: BTreeSet<(u32, u32)>,
    pub first_timestamp_ns: Option<u64>,
    pub last_timestamp_ns: Option<u64>,
}

impl TraceSummary {
    pub fn detection_rate(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.frames_with_face as f64 / self.frames as f64
        }
    }

    pub fn duration_ns(&self) -> Option<u64> {
        Some(self.last_timestamp_ns?.saturating_sub(self.first_timestamp_ns?))
    }
}

/// Walk every record of a trace.
pub fn summarize<R: BufRead>(
    trace: &mut TraceReader<R>,
    landmarks: &LandmarkMap,
    threshold: f64,
) -> Result<TraceSummary, GazeError> {
    let header = trace.header().clone();
    let mut summary = TraceSummary::default();
    let mut closed = false;

    while let Some(record) = trace.next_record()? {
        summary.frames += 1;
        summary.geometries.insert(record.geometry(&header));
        if let Some(t) = record.timestamp_ns {
            summary.first_timestamp_ns.get_or_insert(t);
            summary.last_timestamp_ns = Some(t);
        }
        if record.faces.len() > 1 {
            summary.multi_face_frames += 1;
        }

        let Some(face) = record.faces.first() else {
            continue;
        };
        let eyes = landmarks.extract(face);
        if !eyes.is_complete() {
            summary.incomplete_faces += 1;
        }
        if eyes.is_empty() {
            continue;
        }
        summary.frames_with_face += 1;

        // A face without eyelids neither opens nor closes a span.
        let Some(gap) = eyes.eyelid_gap() else {
            continue;
        };
        let now_closed = gap < threshold;
        if now_closed && !closed {
            summary.blink_spans += 1;
        }
        closed = now_closed;
    }

    Ok(summary)
}

pub fn run(path: &Path, config: &GazeConfig, threshold: f64) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("Trace not found: {}", path.display());
    }

    let mut trace = TraceReader::new(BufReader::new(File::open(path)?)).map_err(GazeError::from)?;
    let header: TraceHeader = trace.header().clone();
    let summary = summarize(&mut trace, &config.landmarks, threshold)?;

    println!("Trace: {}", path.display());
    println!("{}", "=".repeat(50));
    println!("Schema version: {}", header.schema_version);
    if let Some(source) = &header.source {
        println!("Source: {source}");
    }
    println!(
        "Frame geometry: {}x{} ({})",
        header.frame_width,
        header.frame_height,
        if header.mirrored { "mirrored" } else { "not mirrored" }
    );
    if summary.geometries.len() > 1 {
        let sizes: Vec<String> = summary
            .geometries
            .iter()
            .map(|(w, h)| format!("{w}x{h}"))
            .collect();
        println!("Per-frame geometries: {}", sizes.join(", "));
    }
    println!();
    println!("Frames: {}", summary.frames);
    if let Some(duration) = summary.duration_ns() {
        let secs = LoopClock::ns_to_secs(duration);
        println!("Duration: {secs:.2}s");
        if secs > 0.0 {
            println!("Frame rate: {:.1} fps", summary.frames as f64 / secs);
        }
    }
    println!(
        "Face detected: {} ({:.1}%)",
        summary.frames_with_face,
        summary.detection_rate() * 100.0
    );
    if summary.multi_face_frames > 0 {
        println!("Frames with several faces: {}", summary.multi_face_frames);
    }
    if summary.incomplete_faces > 0 {
        println!(
            "Faces missing landmarks: {} (full table needs {})",
            summary.incomplete_faces,
            config.landmarks.required_len()
        );
    }
    println!(
        "Blink spans below {threshold}: {}",
        summary.blink_spans
    );

    Ok(())
}
