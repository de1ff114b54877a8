use std::sync::Arc;

use crate::adapters::{AppConfig, FfprobeAdapter, ProcessSupervisor};
use crate::app::transcode_interactor::TranscodeInteractor;
use crate::engine::CommandBuilder;
use crate::error::TimemarkResult;
use crate::ports::{ExecutePort, ProbePort};
use crate::utils::path::locate_executable;

pub trait AppContainer: Send + Sync {
    fn transcode_interactor(&self) -> Arc<TranscodeInteractor>;
}

pub struct DefaultAppContainer {
    transcode_interactor: Arc<TranscodeInteractor>,
}

impl DefaultAppContainer {
    /// Wire the real adapters from configuration
    ///
    /// Fails with a resource error when the transcoder cannot be found. A
    /// missing probe tool only selects the banner fallback.
    pub fn new(config: &AppConfig) -> TimemarkResult<Self> {
        let ffmpeg = locate_executable(&config.tools.ffmpeg)?;
        let ffprobe = match locate_executable(&config.tools.ffprobe) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "ffprobe unavailable, probing via ffmpeg banner");
                None
            }
        };
        tracing::debug!(ffmpeg = %ffmpeg.display(), ?ffprobe, "Resolved tools");

        let probe_port = Arc::new(
            FfprobeAdapter::new(ffmpeg.clone(), ffprobe)
                .with_timeout(config.tools.probe_timeout()),
        );
        let execute_port = Arc::new(
            ProcessSupervisor::new(ffmpeg)
                .with_leading_args(["-hide_banner"])
                .with_diagnostic_tail_lines(config.progress.diagnostic_tail_lines),
        );
        let builder = CommandBuilder::new(
            config.watermark.font_file.clone(),
            config.watermark.font_color.clone(),
        );

        Ok(Self::with_ports(probe_port, execute_port, builder))
    }

    /// Wire arbitrary port implementations
    pub fn with_ports(
        probe_port: Arc<dyn ProbePort>,
        execute_port: Arc<dyn ExecutePort>,
        builder: CommandBuilder,
    ) -> Self {
        let transcode_interactor = Arc::new(TranscodeInteractor::new(
            probe_port,
            execute_port,
            builder,
        ));
        Self {
            transcode_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn transcode_interactor(&self) -> Arc<TranscodeInteractor> {
        Arc::clone(&self.transcode_interactor)
    }
}
