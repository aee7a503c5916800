//! Append-only action writer for the cursor action log.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gazeclick_common::error::{GazeError, GazeResult};
use gazeclick_gaze_model::action::{ActionLogHeader, CursorAction};

/// Writes cursor actions to a JSONL file, header first.
pub struct ActionWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    actions_written: u64,
}

impl ActionWriter {
    /// Create the log, truncating any existing file.
    pub fn new(path: impl AsRef<Path>, header: &ActionLogHeader) -> GazeResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        let mut writer = BufWriter::new(file);
        let header_json = serde_json::to_string(header)?;
        writeln!(writer, "# {header_json}")
            .map_err(|e| GazeError::platform(format!("Failed to write action log header: {e}")))?;

        Ok(Self {
            writer,
            path,
            actions_written: 0,
        })
    }

    pub fn write_action(&mut self, action: &CursorAction) -> GazeResult<()> {
        let json = serde_json::to_string(action)?;
        writeln!(self.writer, "{json}")
            .map_err(|e| GazeError::platform(format!("Failed to write action: {e}")))?;
        self.actions_written += 1;

        // Clicks are rare and worth having on disk immediately.
        if action.is_click() || self.actions_written % 500 == 0 {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> GazeResult<()> {
        self.writer
            .flush()
            .map_err(|e| GazeError::platform(format!("Failed to flush action log: {e}")))
    }

    pub fn actions_written(&self) -> u64 {
        self.actions_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ActionWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazeclick_gaze_model::action::parse_actions;

    #[test]
    fn test_action_log_has_header_and_actions() {
        let dir = std::env::temp_dir().join(format!("gazeclick_writer_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("actions.jsonl");

        let header = ActionLogHeader {
            schema_version: "1.0".to_string(),
            screen_width: 1920,
            screen_height: 1080,
            epoch_wall: "2026-01-01T00:00:00Z".to_string(),
            dry_run: true,
        };

        {
            let mut writer = ActionWriter::new(&path, &header).unwrap();
            writer.write_action(&CursorAction::moved(0, 720, 405)).unwrap();
            writer.write_action(&CursorAction::click(0, 720, 405)).unwrap();
            assert_eq!(writer.actions_written(), 2);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let first = content.lines().next().unwrap();
        assert!(first.starts_with("# "));
        let parsed: ActionLogHeader = serde_json::from_str(&first[2..]).unwrap();
        assert_eq!(parsed, header);

        let actions = parse_actions(&content).unwrap();
        assert_eq!(
            actions,
            vec![
                CursorAction::moved(0, 720, 405),
                CursorAction::click(0, 720, 405)
            ]
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}
