// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qr_scanner::app::{AppModel, ResultPresenter, ScannerController};
use qr_scanner::backends::camera::{DecodeEngine, PipeWireEngine, demo_engine};
use qr_scanner::config::Config;
use qr_scanner::platform::Platform;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "qr-scanner")]
#[command(about = "Scan QR codes with your camera")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Configuration file (default: <config dir>/qr-scanner/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the built-in demo camera instead of real hardware
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Decode QR codes in an image file
    Decode {
        /// Image to decode
        image: PathBuf,
    },

    /// Scan without the UI, printing each new result
    Watch {
        /// Camera index to use (from 'qr-scanner list')
        #[arg(short, long, default_value = "0")]
        camera: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.command.is_none());

    let config = Config::load(cli.config.as_deref())?;
    let runtime = tokio::runtime::Runtime::new()?;
    let engine: Box<dyn DecodeEngine> = if cli.demo {
        demo_engine()
    } else {
        Box::new(PipeWireEngine::new(runtime.handle().clone()))
    };

    match cli.command {
        Some(Commands::List) => cli::list_cameras(engine.as_ref()),
        Some(Commands::Decode { image }) => cli::decode_image(&image),
        Some(Commands::Watch { camera }) => cli::watch(engine, &config, camera),
        None => run_terminal(engine, &config),
    }
}

/// Set RUST_LOG to control the level, e.g. RUST_LOG=qr_scanner=debug.
/// The terminal UI owns the screen, so it only logs when RUST_LOG is set.
fn init_logging(terminal_ui: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    if terminal_ui && std::env::var_os("RUST_LOG").is_none() {
        builder.with_writer(std::io::sink).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
}

fn run_terminal(engine: Box<dyn DecodeEngine>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let scanner = ScannerController::new(engine, config.scan.clone(), config.session_timing());
    let presenter = ResultPresenter::new(config.copy_window());
    let platform = Platform::system(config.share_command.clone(), config.beep);

    qr_scanner::terminal::run(AppModel::new(scanner, presenter, platform))
}
