//! TimeMark CLI
//!
//! Burns a running date/time clock into videos and crops them using an
//! external ffmpeg binary.
//!
//! # Usage
//!
//! ```bash
//! timemark watermark --input clip.mp4 --start "2024-01-01 08:00:00"
//! timemark crop --input clip.mp4 --width 640 --height 480 --x 100 --y 50
//! timemark crop-watermark --input clip.mp4 --width 640 --height 480 --start "2024-01-01 08:00:00"
//! timemark probe --input clip.mp4 --json
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use timemark_cli::cli::{commands, Cli, Commands};
use timemark_cli::config_initialization::{resolve_config, ConfigOverrides};
use timemark_cli::error::TimemarkError;
use timemark_cli::utils::logging::init_logging;

/// Main entry point for the TimeMark CLI application
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            error!(exit_code = code, "{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = ConfigOverrides::from_cli(&cli);
    let config = resolve_config(cli.config.as_deref(), &overrides)?;
    init_logging(&config.logging);

    info!("Starting TimeMark");

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match cli.command {
        Commands::Watermark(args) => commands::watermark(args, &config, cancel).await?,
        Commands::Crop(args) => commands::crop(args, &config, cancel).await?,
        Commands::CropWatermark(args) => commands::crop_watermark(args, &config, cancel).await?,
        Commands::Probe(args) => commands::probe(args, &config).await?,
    }

    info!("TimeMark completed successfully");
    Ok(())
}

/// Ctrl-C cancels the running operation instead of killing the process outright
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<TimemarkError>()
        .map(TimemarkError::exit_code)
        .unwrap_or(1)
}
