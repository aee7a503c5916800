//! Drive the cursor from a landmark trace.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use gazeclick_common::clock::LoopClock;
use gazeclick_common::config::GazeConfig;
use gazeclick_gaze_loop::backends::{build_cursor, HeadlessDisplay};
use gazeclick_gaze_loop::replay::{ReplayOptions, TraceReplay};
use gazeclick_gaze_loop::writer::ActionWriter;
use gazeclick_gaze_loop::{GazeLoop, LoopSettings, StopReason};
use gazeclick_gaze_model::action::ActionLogHeader;

pub struct RunOptions {
    pub trace: PathBuf,
    pub realtime: bool,
    pub dry_run: bool,
    pub actions: Option<PathBuf>,
    pub max_frames: Option<u64>,
}

pub async fn run(config: GazeConfig, options: RunOptions) -> anyhow::Result<()> {
    config.validate()?;

    let screen = match config.screen {
        Some(screen) => screen,
        None => gazeclick_platform_linux::detect_screen_size(),
    };
    let settings = LoopSettings::from_config(&config, screen);

    let (source, detector) = TraceReplay::open(
        &options.trace,
        ReplayOptions {
            realtime: options.realtime,
            loop_mirrors: settings.mirror,
        },
    )?;

    let cursor = build_cursor(&config.cursor, options.dry_run);
    let display = HeadlessDisplay::default();
    let stop = display.stop_flag();

    println!("Tracking gaze from: {}", options.trace.display());
    println!("  Screen: {screen}");
    println!("  Cursor: {}", cursor.name());
    println!(
        "  Speed: {}  Smooth: {}  Threshold: {}  Cooldown: {}ms",
        settings.speed_factor,
        settings.smooth_factor,
        settings.click_threshold,
        config.tracking.click_cooldown_ms
    );
    println!();

    let mut gaze = GazeLoop::new(
        settings,
        Box::new(source),
        Box::new(detector),
        cursor,
        Box::new(display),
    )?;

    if let Some(max) = options.max_frames {
        gaze = gaze.with_max_frames(max);
    }
    if let Some(path) = &options.actions {
        let clock = LoopClock::start();
        let header = ActionLogHeader {
            schema_version: "1.0".to_string(),
            screen_width: screen.width,
            screen_height: screen.height,
            epoch_wall: clock.epoch_wall().to_string(),
            dry_run: options.dry_run,
        };
        gaze = gaze.with_action_log(ActionWriter::new(path, &header)?);
    }

    println!("Press Ctrl+C to stop...");
    println!();

    let signal_stop = Arc::clone(&stop);
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stop requested");
            signal_stop.store(true, Ordering::SeqCst);
        }
    });

    let result = tokio::task::spawn_blocking(move || gaze.run()).await?;
    signal.abort();
    let summary = result?;

    let stats = &summary.stats;
    println!();
    println!(
        "Stopped: {}",
        match summary.reason {
            StopReason::StopSignal => "stop requested",
            StopReason::SourceEnded => "end of trace",
            StopReason::FrameLimit => "frame limit reached",
        }
    );
    println!(
        "  Frames: {} ({} with a face, {} idle, {} rejected)",
        stats.frames, stats.frames_with_face, stats.idle_frames, stats.rejected_frames
    );
    println!(
        "  {}Moves: {}  Clicks: {}  Suppressed blinks: {}",
        if options.dry_run { "Recorded " } else { "" },
        stats.moves,
        stats.clicks,
        stats.suppressed_blinks
    );
    if stats.cursor_errors > 0 || stats.detector_errors > 0 {
        println!(
            "  Cursor errors: {}  Detector errors: {}",
            stats.cursor_errors, stats.detector_errors
        );
    }
    println!("  Final cursor position: {}", summary.final_position);
    if let Some(path) = &options.actions {
        println!("  Action log: {}", path.display());
    }

    Ok(())
}
