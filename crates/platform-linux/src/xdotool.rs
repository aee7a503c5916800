//! Pointer control through the `xdotool` command-line tool.
//!
//! Each call spawns one short-lived `xdotool` process. Works on X11 and on
//! XWayland surfaces; native Wayland compositors ignore synthetic X input.

use std::process::{Command, Output};

use gazeclick_common::error::{GazeError, GazeResult};

/// Handle to the `xdotool` binary, optionally pinned to an X display.
#[derive(Debug, Clone, Default)]
pub struct Xdotool {
    display: Option<String>,
}

impl Xdotool {
    /// Target `display` (for example ":0"), or inherit `DISPLAY` when `None`.
    pub fn new(display: Option<String>) -> Self {
        Self { display }
    }

    /// Whether `xdotool` can be executed.
    pub fn is_installed() -> bool {
        Command::new("xdotool")
            .arg("version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Move the pointer to an absolute screen position.
    pub fn mouse_move(&self, x: i32, y: i32) -> GazeResult<()> {
        self.run(&["mousemove", "--sync", &x.to_string(), &y.to_string()])
            .map(|_| ())
    }

    /// Press and release the left button.
    pub fn click_left(&self) -> GazeResult<()> {
        self.run(&["click", "1"]).map(|_| ())
    }

    /// Current pointer position.
    pub fn mouse_location(&self) -> GazeResult<(i32, i32)> {
        let output = self.run(&["getmouselocation", "--shell"])?;
        parse_mouse_location(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            GazeError::cursor("xdotool getmouselocation returned no X/Y values")
        })
    }

    fn run(&self, args: &[&str]) -> GazeResult<Output> {
        let mut cmd = Command::new("xdotool");
        cmd.args(args);
        if let Some(display) = &self.display {
            cmd.env("DISPLAY", display);
        }

        let output = cmd.output().map_err(|e| {
            GazeError::cursor(format!(
                "Failed to execute xdotool ({e}). Install with: sudo apt install xdotool"
            ))
        })?;

        if !output.status.success() {
            return Err(GazeError::cursor(format!(
                "xdotool {} exited with {}: {}",
                args.first().copied().unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output)
    }
}

/// Parse `xdotool getmouselocation --shell` output.
pub fn parse_mouse_location(stdout: &str) -> Option<(i32, i32)> {
    let mut x = None;
    let mut y = None;

    for line in stdout.lines() {
        if let Some(val) = line.strip_prefix("X=") {
            x = val.trim().parse::<i32>().ok();
        } else if let Some(val) = line.strip_prefix("Y=") {
            y = val.trim().parse::<i32>().ok();
        }
    }

    Some((x?, y?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mouse_location() {
        let out = "X=1440\nY=810\nSCREEN=0\nWINDOW=41943047\n";
        assert_eq!(parse_mouse_location(out), Some((1440, 810)));
        assert_eq!(parse_mouse_location("SCREEN=0\n"), None);
        assert_eq!(parse_mouse_location("X=10\n"), None);
    }
}
