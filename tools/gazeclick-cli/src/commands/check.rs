//! Check system capabilities.

use gazeclick_platform_core::DisplayServer;
use gazeclick_platform_linux::permissions::{
    all_required_available, check_capabilities, print_capability_report,
};
use gazeclick_platform_linux::{
    detect_display_server, detect_monitors, Xdotool, FALLBACK_SCREEN,
};

pub fn run() -> anyhow::Result<()> {
    println!("GazeClick System Check");
    println!("{}", "=".repeat(50));

    match detect_display_server() {
        DisplayServer::X11 => println!("[OK] Display server: X11"),
        DisplayServer::Wayland => {
            println!("[WARN] Display server: Wayland (pointer control needs XWayland)")
        }
        _ => println!("[WARN] Display server: Unknown"),
    }

    match detect_monitors() {
        Ok(monitors) if !monitors.is_empty() => {
            println!("[OK] Monitors detected: {}", monitors.len());
            for m in &monitors {
                println!(
                    "     {} {}x{}+{}+{} {}",
                    m.name,
                    m.width,
                    m.height,
                    m.x,
                    m.y,
                    if m.primary { "(primary)" } else { "" }
                );
            }
        }
        Ok(_) => println!("[WARN] No monitors reported; falling back to {FALLBACK_SCREEN}"),
        Err(e) => println!("[WARN] Monitor detection failed ({e}); falling back to {FALLBACK_SCREEN}"),
    }

    if Xdotool::is_installed() {
        match Xdotool::default().mouse_location() {
            Ok((x, y)) => println!("[OK] Pointer readable at ({x}, {y})"),
            Err(e) => println!("[WARN] Pointer not readable: {e}"),
        }
    }

    let capabilities = check_capabilities();
    println!();
    print_capability_report(&capabilities);

    println!();
    if all_required_available(&capabilities) {
        println!("All required capabilities are available. GazeClick is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
        println!("Dry runs (`gazeclick run --dry-run`) work without them.");
    }

    Ok(())
}
