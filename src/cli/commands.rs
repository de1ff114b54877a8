//! Command implementations

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::AppConfig;
use crate::app::{progress_channel, AppContainer, DefaultAppContainer};
use crate::cli::args::{ClockArgs, CropArgs, CropRectArgs, CropWatermarkArgs, ProbeArgs, WatermarkArgs};
use crate::domain::model::*;
use crate::error::TimemarkError;
use crate::utils::time::{format_clock, parse_anchor};

/// Execute the watermark command
pub async fn watermark(args: WatermarkArgs, config: &AppConfig, cancel: CancellationToken) -> Result<()> {
    ensure_input(&args.input)?;
    let params = watermark_params(&args.clock, config)?;

    let mut request = OperationRequest::watermark(args.input, params);
    if let Some(dir) = args.output_dir {
        request = request.with_output_dir(dir);
    }
    transcode(request, config, cancel).await
}

/// Execute the crop command
pub async fn crop(args: CropArgs, config: &AppConfig, cancel: CancellationToken) -> Result<()> {
    ensure_input(&args.input)?;

    let mut request = OperationRequest::crop(args.input, crop_params(&args.rect));
    if let Some(dir) = args.output_dir {
        request = request.with_output_dir(dir);
    }
    transcode(request, config, cancel).await
}

/// Execute the crop-watermark command
pub async fn crop_watermark(
    args: CropWatermarkArgs,
    config: &AppConfig,
    cancel: CancellationToken,
) -> Result<()> {
    ensure_input(&args.input)?;
    let watermark = watermark_params(&args.clock, config)?;

    let mut request =
        OperationRequest::crop_and_watermark(args.input, crop_params(&args.rect), watermark);
    if let Some(dir) = args.output_dir {
        request = request.with_output_dir(dir);
    }
    transcode(request, config, cancel).await
}

/// Execute the probe command
pub async fn probe(args: ProbeArgs, config: &AppConfig) -> Result<()> {
    ensure_input(&args.input)?;

    let container = DefaultAppContainer::new(config)?;
    let media = container
        .transcode_interactor()
        .describe(&args.input)
        .await
        .context("Failed to probe input file")?;

    if args.json {
        let report = serde_json::json!({
            "path": args.input.display().to_string(),
            "duration_seconds": media.duration.as_secs_f64(),
            "width": media.geometry.map(|g| g.width),
            "height": media.geometry.map(|g| g.height),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("File:       {}", args.input.display());
        println!("Duration:   {}", format_clock(media.duration));
        match media.geometry {
            Some(geometry) => println!("Resolution: {}", geometry),
            None => println!("Resolution: no video stream"),
        }
    }
    Ok(())
}

/// The input is checked before any tool lookup so a typo is reported as such
fn ensure_input(input: &Path) -> Result<()> {
    if !input.is_file() {
        return Err(TimemarkError::probe(input, "input file does not exist").into());
    }
    Ok(())
}

fn watermark_params(clock: &ClockArgs, config: &AppConfig) -> Result<WatermarkParams> {
    let anchor = parse_anchor(&clock.start)?;
    Ok(WatermarkParams {
        anchor,
        font_size: clock.font_size.unwrap_or(config.watermark.font_size),
        x: clock.text_x.unwrap_or(config.watermark.x),
        y: clock.text_y.unwrap_or(config.watermark.y),
    })
}

fn crop_params(rect: &CropRectArgs) -> CropParams {
    CropParams {
        width: rect.width,
        height: rect.height,
        x: rect.x,
        y: rect.y,
    }
}

async fn transcode(request: OperationRequest, config: &AppConfig, cancel: CancellationToken) -> Result<()> {
    let container = DefaultAppContainer::new(config)?;
    let interactor = container.transcode_interactor();

    info!(kind = %request.kind(), input = %request.input.display(), "Executing operation");

    let (progress_tx, progress_rx) = progress_channel(config.progress.channel_capacity);
    let renderer = tokio::spawn(render_progress(progress_rx));

    let outcome = interactor.operation(request).run(progress_tx, cancel).await;
    if let Err(e) = renderer.await {
        tracing::debug!(error = %e, "Progress renderer stopped early");
    }

    let report = outcome.into_result()?;
    println!("{}", report.output_path.display());
    Ok(())
}

/// Draw progress on a single stderr line until the channel closes
async fn render_progress(mut events: mpsc::Receiver<ProgressEvent>) {
    let mut stderr = std::io::stderr();
    let mut open_line = false;

    while let Some(event) = events.recv().await {
        let _ = write!(stderr, "\r{:>5.1}% {:<40}", event.percent, event.message);
        let _ = stderr.flush();
        open_line = true;
    }

    if open_line {
        let _ = writeln!(stderr);
    }
}
