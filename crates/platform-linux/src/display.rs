//! Display/monitor detection.

use std::process::Command;

use gazeclick_common::error::{GazeError, GazeResult};
use gazeclick_platform_core::{primary_monitor, DisplayServer, MonitorInfo, ScreenSize};

/// Screen size assumed when detection is impossible.
pub const FALLBACK_SCREEN: ScreenSize = ScreenSize::new(1920, 1080);

/// Detect connected monitors by querying `xrandr`.
pub fn detect_monitors() -> GazeResult<Vec<MonitorInfo>> {
    tracing::debug!("Detecting monitors");

    let output = Command::new("xrandr")
        .arg("--query")
        .output()
        .map_err(|e| GazeError::platform(format!("Failed to run xrandr: {e}")))?;

    if !output.status.success() {
        return Err(GazeError::platform(format!(
            "xrandr exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let monitors = parse_xrandr(&String::from_utf8_lossy(&output.stdout));
    if monitors.is_empty() {
        return Err(GazeError::platform("xrandr reported no active monitors"));
    }
    Ok(monitors)
}

/// Size of the screen the cursor is mapped onto (the primary monitor).
///
/// Falls back to [`FALLBACK_SCREEN`] with a warning when detection fails.
pub fn detect_screen_size() -> ScreenSize {
    match detect_monitors() {
        Ok(monitors) => match primary_monitor(&monitors) {
            Some(m) => m.size(),
            None => FALLBACK_SCREEN,
        },
        Err(e) => {
            tracing::warn!(error = %e, fallback = %FALLBACK_SCREEN, "Screen size detection failed");
            FALLBACK_SCREEN
        }
    }
}

/// Parse `xrandr --query` output into active monitors.
///
/// Only outputs that are connected and have a current mode
/// (`WxH+X+Y` geometry) are returned.
pub fn parse_xrandr(output: &str) -> Vec<MonitorInfo> {
    let mut monitors: Vec<MonitorInfo> = Vec::new();
    let mut in_active_output = false;

    for line in output.lines() {
        if !line.starts_with(char::is_whitespace) {
            in_active_output = false;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 3 || tokens[1] != "connected" {
                continue;
            }
            let primary = tokens[2] == "primary";
            let geometry = if primary { tokens.get(3) } else { tokens.get(2) };
            if let Some((width, height, x, y)) = geometry.and_then(|g| parse_geometry(g)) {
                monitors.push(MonitorInfo {
                    name: tokens[0].to_string(),
                    width,
                    height,
                    x,
                    y,
                    scale_factor: 1.0,
                    refresh_rate_hz: 60,
                    primary,
                });
                in_active_output = true;
            }
        } else if in_active_output {
            // Mode lines mark the current rate with '*'.
            if let Some(rate) = line
                .split_whitespace()
                .skip(1)
                .find(|t| t.contains('*'))
                .and_then(|t| t.trim_end_matches(['*', '+']).parse::<f64>().ok())
            {
                if let Some(m) = monitors.last_mut() {
                    m.refresh_rate_hz = rate.round() as u32;
                }
            }
        }
    }

    monitors
}

/// Parse `1920x1080+0+0` into `(width, height, x, y)`.
fn parse_geometry(token: &str) -> Option<(u32, u32, i32, i32)> {
    let (size, offsets) = token.split_once(['+', '-'])?;
    let (w, h) = size.split_once('x')?;
    let sign_x = if token[size.len()..].starts_with('-') { -1 } else { 1 };

    // Remaining offsets look like "0+0", "1920-10", "0+1080".
    let split_at = offsets.find(['+', '-'])?;
    let x: i32 = offsets[..split_at].parse().ok()?;
    let y_part = &offsets[split_at..];
    let y: i32 = y_part.trim_start_matches('+').parse().ok()?;

    Some((w.parse().ok()?, h.parse().ok()?, sign_x * x, y))
}

/// Detect the current display server.
pub fn detect_display_server() -> DisplayServer {
    if std::env::var("WAYLAND_DISPLAY").is_ok() {
        DisplayServer::Wayland
    } else if std::env::var("DISPLAY").is_ok() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}
