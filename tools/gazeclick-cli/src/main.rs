//! GazeClick CLI: eye-controlled cursor driven by face landmarks.
//!
//! Usage:
//!   gazeclick run --trace <PATH|->   Drive the cursor from a landmark trace
//!   gazeclick inspect <TRACE>        Summarize a landmark trace
//!   gazeclick check                  Check system capabilities
//!   gazeclick config show|init       Show or create the config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gazeclick_common::config::{config_file_path, GazeConfig};
use gazeclick_platform_core::ScreenSize;

mod commands;

#[derive(Parser)]
#[command(
    name = "gazeclick",
    about = "Move the mouse with your eyes and click by blinking",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gaze loop on a landmark trace
    Run {
        /// Landmark trace (JSONL), or `-` for stdin
        #[arg(long)]
        trace: PathBuf,

        /// Pace replay by the trace timestamps
        #[arg(long)]
        realtime: bool,

        /// Record cursor commands instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// Write every move and click to this JSONL file
        #[arg(long)]
        actions: Option<PathBuf>,

        /// Cursor speed multiplier
        #[arg(long)]
        speed: Option<f64>,

        /// Weight of the newest position in (0, 1]
        #[arg(long)]
        smooth: Option<f64>,

        /// Eyelid gap below which a blink is detected
        #[arg(long)]
        threshold: Option<f64>,

        /// Minimum time between clicks (milliseconds)
        #[arg(long)]
        cooldown_ms: Option<u64>,

        /// Screen size override, e.g. 1920x1080
        #[arg(long)]
        screen: Option<ScreenSize>,

        /// Do not mirror frames before detection
        #[arg(long)]
        no_mirror: bool,

        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<u64>,
    },

    /// Summarize a landmark trace
    Inspect {
        /// Landmark trace (JSONL)
        trace: PathBuf,

        /// Blink threshold used to count closed-eye spans
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Check system capabilities
    Check,

    /// Show or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `config init` may target a file that does not exist yet.
    let creating = matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Init { .. }
        }
    );
    let config = match &cli.config {
        Some(path) if creating && !path.exists() => GazeConfig::default(),
        Some(path) => GazeConfig::load_from(path)?,
        None => GazeConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    gazeclick_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Run {
            trace,
            realtime,
            dry_run,
            actions,
            speed,
            smooth,
            threshold,
            cooldown_ms,
            screen,
            no_mirror,
            max_frames,
        } => {
            let mut config = config;
            let t = &mut config.tracking;
            if let Some(speed) = speed {
                t.speed_factor = speed;
            }
            if let Some(smooth) = smooth {
                t.smooth_factor = smooth;
            }
            if let Some(threshold) = threshold {
                t.click_threshold = threshold;
            }
            if let Some(ms) = cooldown_ms {
                t.click_cooldown_ms = ms;
            }
            if no_mirror {
                t.mirror = false;
            }
            if screen.is_some() {
                config.screen = screen;
            }

            commands::run::run(
                config,
                commands::run::RunOptions {
                    trace,
                    realtime,
                    dry_run,
                    actions,
                    max_frames,
                },
            )
            .await
        }
        Commands::Inspect { trace, threshold } => {
            let threshold = threshold.unwrap_or(config.tracking.click_threshold);
            commands::inspect::run(&trace, &config, threshold)
        }
        Commands::Check => commands::check::run(),
        Commands::Config { action } => {
            let path = cli.config.unwrap_or_else(config_file_path);
            match action {
                ConfigAction::Show => commands::config::show(&config, &path),
                ConfigAction::Init { force } => commands::config::init(&path, force),
            }
        }
    }
}
