//! Capability detection and guidance for Linux.
//!
//! Eye-driven cursor control needs a graphical session that accepts
//! synthetic input, the `xdotool` binary, and a way to learn the screen size.

use std::process::Command;

use crate::xdotool::Xdotool;

/// A system capability that GazeClick may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities() -> Vec<Capability> {
    vec![
        check_graphical_session(),
        check_synthetic_input(),
        check_xdotool(),
        check_xrandr(),
        check_webcam_access(),
    ]
}

/// Whether every required capability is present.
pub fn all_required_available(capabilities: &[Capability]) -> bool {
    capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available)
}

fn check_graphical_session() -> Capability {
    let available = std::env::var("WAYLAND_DISPLAY").is_ok() || std::env::var("DISPLAY").is_ok();

    Capability {
        name: "Graphical Session".to_string(),
        description: "A desktop session whose pointer can be driven".to_string(),
        available,
        required: true,
        fix_instructions: (!available).then(|| {
            "Run inside a graphical desktop session, or export DISPLAY=:0".to_string()
        }),
    }
}

/// Native Wayland sessions reject synthetic X11 input outside XWayland.
fn check_synthetic_input() -> Capability {
    let has_x = std::env::var("DISPLAY").is_ok();

    Capability {
        name: "Synthetic Input".to_string(),
        description: "X11 (or XWayland) display that accepts injected pointer events".to_string(),
        available: has_x,
        required: true,
        fix_instructions: (!has_x).then(|| {
            "Log into an X11 session or enable XWayland so DISPLAY is set".to_string()
        }),
    }
}

fn check_xdotool() -> Capability {
    let available = Xdotool::is_installed();

    Capability {
        name: "xdotool".to_string(),
        description: "Command-line pointer driver used for moves and clicks".to_string(),
        available,
        required: true,
        fix_instructions: (!available)
            .then(|| "Install xdotool: sudo apt install xdotool".to_string()),
    }
}

fn check_xrandr() -> Capability {
    let available = Command::new("xrandr")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    Capability {
        name: "xrandr".to_string(),
        description: "Monitor enumeration for screen size detection".to_string(),
        available,
        required: false, // --screen or config override works without it
        fix_instructions: (!available).then(|| {
            "Install x11-xserver-utils, or pass --screen WIDTHxHEIGHT".to_string()
        }),
    }
}

/// Check if a webcam device is available.
fn check_webcam_access() -> Capability {
    let has_webcam = (0..16)
        .map(|idx| format!("/dev/video{idx}"))
        .any(|path| std::path::Path::new(&path).exists());

    Capability {
        name: "Webcam Device".to_string(),
        description: "Video4Linux camera for the external landmark detector".to_string(),
        available: has_webcam,
        required: false,
        fix_instructions: if has_webcam {
            None
        } else {
            Some(
                "Connect a webcam and verify /dev/video* exists (v4l2-ctl --list-devices)"
                    .to_string(),
            )
        },
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("GazeClick System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(available: bool, required: bool) -> Capability {
        Capability {
            name: "x".to_string(),
            description: "x".to_string(),
            available,
            required,
            fix_instructions: None,
        }
    }

    #[test]
    fn optional_gaps_do_not_block() {
        assert!(all_required_available(&[cap(true, true), cap(false, false)]));
        assert!(!all_required_available(&[cap(false, true), cap(true, false)]));
    }
}
