//! Landmark trace format.
//!
//! An external face-mesh detector hands its output to GazeClick as a JSONL
//! stream. The first line is a `#`-prefixed header; every other non-empty,
//! non-comment line is one frame record:
//!
//! ```text
//! # {"schema_version":"1.0","frame_width":640,"frame_height":480,"mirrored":true}
//! {"seq":0,"t":0,"faces":[[[0.51,0.48],[0.52,0.47]]]}
//! {"seq":1,"t":33000000,"faces":[]}
//! ```

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::landmark::FaceLandmarks;

/// Current trace schema version.
pub const TRACE_SCHEMA_VERSION: &str = "1.0";

/// Trace metadata, written as the first line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Geometry of the frames the landmarks were detected in.
    pub frame_width: u32,
    pub frame_height: u32,

    /// Whether landmarks were computed on horizontally mirrored frames.
    #[serde(default = "default_mirrored")]
    pub mirrored: bool,

    /// Free-form label of the producing detector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn default_mirrored() -> bool {
    true
}

impl TraceHeader {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            schema_version: TRACE_SCHEMA_VERSION.to_string(),
            frame_width,
            frame_height,
            mirrored: true,
            source: None,
        }
    }
}

/// Detector output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Frame sequence number.
    pub seq: u64,

    /// Capture time in nanoseconds since the trace started.
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ns: Option<u64>,

    /// Per-frame geometry override; the header geometry applies when absent.
    #[serde(rename = "w", default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Zero or more faces, in detector order.
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

impl TraceRecord {
    pub fn new(seq: u64, timestamp_ns: Option<u64>, faces: Vec<FaceLandmarks>) -> Self {
        Self {
            seq,
            timestamp_ns,
            width: None,
            height: None,
            faces,
        }
    }

    /// Frame geometry, falling back to the header.
    pub fn geometry(&self, header: &TraceHeader) -> (u32, u32) {
        (
            self.width.unwrap_or(header.frame_width),
            self.height.unwrap_or(header.frame_height),
        )
    }
}

/// Incremental trace reader over any buffered source (file or stdin).
pub struct TraceReader<R> {
    reader: R,
    header: TraceHeader,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> TraceReader<R> {
    /// Read the header line and position the reader at the first record.
    pub fn new(mut reader: R) -> Result<Self, TraceError> {
        let mut line_no = 0;
        let mut buf = String::new();
        loop {
            buf.clear();
            line_no += 1;
            let read = reader
                .read_line(&mut buf)
                .map_err(|source| TraceError::Io {
                    line: line_no,
                    source,
                })?;
            if read == 0 {
                return Err(TraceError::MissingHeader);
            }
            let trimmed = buf.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some(json) = trimmed.strip_prefix('#') else {
                return Err(TraceError::MissingHeader);
            };
            let header = serde_json::from_str(json.trim()).map_err(|source| TraceError::Parse {
                line: line_no,
                source,
            })?;
            return Ok(Self {
                reader,
                header,
                line_no,
                buf,
            });
        }
    }

    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    /// Line number of the last line read.
    pub fn line(&self) -> usize {
        self.line_no
    }

    /// Next frame record, or `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<TraceRecord>, TraceError> {
        loop {
            self.buf.clear();
            self.line_no += 1;
            let read = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|source| TraceError::Io {
                    line: self.line_no,
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            let trimmed = self.buf.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|source| TraceError::Parse {
                    line: self.line_no,
                    source,
                });
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Parse a complete trace held in memory.
pub fn parse_trace(jsonl: &str) -> Result<(TraceHeader, Vec<TraceRecord>), TraceError> {
    let mut reader = TraceReader::new(jsonl.as_bytes())?;
    let records = reader.by_ref().collect::<Result<Vec<_>, _>>()?;
    Ok((reader.header, records))
}

/// Serialize a trace to JSONL, header first.
pub fn serialize_trace(
    header: &TraceHeader,
    records: &[TraceRecord],
) -> Result<String, serde_json::Error> {
    let mut output = format!("# {}\n", serde_json::to_string(header)?);
    for record in records {
        output.push_str(&serde_json::to_string(record)?);
        output.push('\n');
    }
    Ok(output)
}

/// Errors reading a landmark trace.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("trace does not start with a '# {{header}}' line")]
    MissingHeader,

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

impl TraceError {
    /// Line the error refers to (0 for a missing header).
    pub fn line(&self) -> usize {
        match self {
            TraceError::MissingHeader => 0,
            TraceError::Parse { line, .. } | TraceError::Io { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::NormalizedPoint;

    const SAMPLE: &str = "# {\"schema_version\":\"1.0\",\"frame_width\":640,\"frame_height\":480}\n\
        {\"seq\":0,\"t\":0,\"faces\":[[[0.5,0.5],[0.25,0.75]]]}\n\
        \n\
        # detector warmed up\n\
        {\"seq\":1,\"faces\":[]}\n";

    #[test]
    fn test_parse_sample() {
        let (header, records) = parse_trace(SAMPLE).unwrap();
        assert_eq!(header.frame_width, 640);
        assert_eq!(header.frame_height, 480);
        assert!(header.mirrored);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp_ns, Some(0));
        assert_eq!(
            records[0].faces[0].get(1).unwrap().point,
            NormalizedPoint::new(0.25, 0.75)
        );
        assert_eq!(records[1].timestamp_ns, None);
        assert!(records[1].faces.is_empty());
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let err = parse_trace("{\"seq\":0,\"faces\":[]}\n").unwrap_err();
        assert!(matches!(err, TraceError::MissingHeader));
        assert!(matches!(parse_trace(""), Err(TraceError::MissingHeader)));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let raw = "# {\"schema_version\":\"1.0\",\"frame_width\":640,\"frame_height\":480}\n\
            {\"seq\":0,\"faces\":[]}\n\
            {\"seq\":1,\"faces\":[[[0.5]]]}\n";
        let err = parse_trace(raw).unwrap_err();
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_record_geometry_override() {
        let header = TraceHeader::new(640, 480);
        let mut record = TraceRecord::new(0, None, vec![]);
        assert_eq!(record.geometry(&header), (640, 480));
        record.width = Some(0);
        assert_eq!(record.geometry(&header), (0, 480));
    }

    #[test]
    fn test_serialized_trace_reads_back() {
        let mut header = TraceHeader::new(320, 240);
        header.mirrored = false;
        header.source = Some("mediapipe".to_string());
        let face = FaceLandmarks::new(vec![NormalizedPoint::new(0.1, 0.9)]);
        let records = vec![
            TraceRecord::new(0, Some(0), vec![face]),
            TraceRecord::new(1, Some(33_000_000), vec![]),
        ];

        let jsonl = serialize_trace(&header, &records).unwrap();
        assert!(jsonl.starts_with("# "));
        let (parsed_header, parsed) = parse_trace(&jsonl).unwrap();
        assert_eq!(parsed_header, header);
        assert_eq!(parsed, records);
    }
}
