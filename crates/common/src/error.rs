//! Error types shared across GazeClick crates.

use std::path::PathBuf;

use gazeclick_gaze_model::trace::TraceError;

/// Top-level error type for GazeClick operations.
#[derive(Debug, thiserror::Error)]
pub enum GazeError {
    /// The frame source could not deliver a frame. Fatal for the loop.
    #[error("Frame acquisition error: {message}")]
    Acquisition { message: String },

    #[error("Landmark detection error: {message}")]
    Detection { message: String },

    #[error("Invalid {what} geometry: {width}x{height}")]
    InvalidGeometry {
        what: &'static str,
        width: u32,
        height: u32,
    },

    #[error("Cursor error: {message}")]
    Cursor { message: String },

    #[error("Trace error at line {line}: {message}")]
    Trace { line: usize, message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GazeError.
pub type GazeResult<T> = Result<T, GazeError>;

impl GazeError {
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition {
            message: msg.into(),
        }
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection {
            message: msg.into(),
        }
    }

    pub fn cursor(msg: impl Into<String>) -> Self {
        Self::Cursor {
            message: msg.into(),
        }
    }

    pub fn trace(line: usize, msg: impl Into<String>) -> Self {
        Self::Trace {
            line,
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Reject a zero-sized frame or screen.
    pub fn invalid_geometry(what: &'static str, width: u32, height: u32) -> Self {
        Self::InvalidGeometry {
            what,
            width,
            height,
        }
    }
}

impl From<TraceError> for GazeError {
    fn from(e: TraceError) -> Self {
        let line = e.line();
        let message = match e {
            TraceError::MissingHeader => "missing '# {header}' line".to_string(),
            TraceError::Parse { source, .. } => source.to_string(),
            TraceError::Io { source, .. } => source.to_string(),
        };
        Self::Trace { line, message }
    }
}
