//! Cursor action log types.
//!
//! Every cursor move and click the loop issues can be recorded in an
//! append-only JSONL file for later inspection or regression comparison.

use serde::{Deserialize, Serialize};

/// A cursor command issued by the tracking loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorAction {
    /// Timestamp of the frame that produced the action (ns).
    #[serde(rename = "t")]
    pub timestamp_ns: u64,

    #[serde(flatten)]
    pub kind: ActionKind,
}

/// Discriminated union of cursor commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Absolute move in screen pixels.
    Move { x: i32, y: i32 },

    /// Left click at the current cursor position.
    Click { x: i32, y: i32 },
}

/// Metadata written as the first line of an action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogHeader {
    pub schema_version: String,

    /// Screen geometry the actions were mapped onto.
    pub screen_width: u32,
    pub screen_height: u32,

    /// Wall-clock time at loop start (RFC 3339).
    pub epoch_wall: String,

    /// Whether actions were only recorded, not sent to the OS.
    #[serde(default)]
    pub dry_run: bool,
}

impl CursorAction {
    pub fn moved(timestamp_ns: u64, x: i32, y: i32) -> Self {
        Self {
            timestamp_ns,
            kind: ActionKind::Move { x, y },
        }
    }

    pub fn click(timestamp_ns: u64, x: i32, y: i32) -> Self {
        Self {
            timestamp_ns,
            kind: ActionKind::Click { x, y },
        }
    }

    pub fn is_click(&self) -> bool {
        matches!(self.kind, ActionKind::Click { .. })
    }

    /// Screen position the action refers to.
    pub fn position(&self) -> (i32, i32) {
        match self.kind {
            ActionKind::Move { x, y } | ActionKind::Click { x, y } => (x, y),
        }
    }
}

/// Parse actions from JSONL content, skipping the header and comments.
pub fn parse_actions(jsonl: &str) -> Result<Vec<CursorAction>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}
