// Ports - Interface definitions (contracts)

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::model::*;
use crate::error::TimemarkResult;

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Total playback duration of the file
    ///
    /// A missing or zero duration is a probe error.
    async fn duration(&self, path: &Path) -> TimemarkResult<Duration>;

    /// Dimensions of the first video stream, `None` when there is none
    async fn geometry(&self, path: &Path) -> TimemarkResult<Option<FrameGeometry>>;

    /// Gather everything an operation needs in one call
    async fn describe(&self, path: &Path, with_geometry: bool) -> TimemarkResult<MediaDescriptor> {
        let duration = self.duration(path).await?;
        let geometry = if with_geometry {
            self.geometry(path).await?
        } else {
            None
        };
        Ok(MediaDescriptor::new(duration, geometry))
    }
}

/// Port for running the external transcoder
#[async_trait]
pub trait ExecutePort: Send + Sync {
    /// Run the transcoder with `args` until it exits or `cancel` fires
    ///
    /// Progress is reported against `total`. On success exactly one
    /// completion event is sent; a non-zero exit yields
    /// `CommandFailed` and cancellation yields `Cancelled`.
    async fn run(
        &self,
        args: &[String],
        total: Duration,
        progress: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> TimemarkResult<ProcessResult>;
}
