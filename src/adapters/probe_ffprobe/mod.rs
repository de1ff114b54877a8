//! FFprobe adapter for media file probing
//!
//! Duration and geometry come from `ffprobe`. When no `ffprobe` binary is
//! available the adapter falls back to the banner `ffmpeg -i` prints. Either
//! tool's output may be a bare value or a labeled banner line; both are read.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::domain::model::*;
use crate::engine::progress::clock_centiseconds;
use crate::error::{TimemarkError, TimemarkResult};
use crate::ports::*;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

static BANNER_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration:\s*(\d{2,}):(\d{2}):(\d{2})\.(\d{2})")
        .expect("banner duration pattern is valid")
});

static BANNER_VIDEO_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Stream #\d+:\d+.*Video:.*?\b(\d{2,5})x(\d{2,5})\b")
        .expect("banner video size pattern is valid")
});

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    ffmpeg: PathBuf,
    ffprobe: Option<PathBuf>,
    timeout: Duration,
}

impl FfprobeAdapter {
    /// Create a new adapter; `ffprobe` of `None` selects the banner fallback
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: Option<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn ensure_exists(path: &Path) -> TimemarkResult<()> {
        if path.is_file() {
            Ok(())
        } else {
            Err(TimemarkError::probe(path, "file does not exist"))
        }
    }

    /// Run a probe tool to completion, bounded by the configured timeout
    async fn capture(&self, program: &Path, args: Vec<OsString>, target: &Path) -> TimemarkResult<Output> {
        tracing::debug!(program = %program.display(), ?args, "Running probe");

        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(TimemarkError::probe(
                target,
                format!("failed to run {}: {}", program.display(), e),
            )),
            Err(_) => Err(TimemarkError::probe(
                target,
                format!("{} timed out after {:?}", program.display(), self.timeout),
            )),
        }
    }

    async fn ffprobe_query(&self, ffprobe: &Path, path: &Path, query: &[&str]) -> TimemarkResult<String> {
        let mut args: Vec<OsString> = query.iter().map(OsString::from).collect();
        args.push(path.as_os_str().to_os_string());

        let output = self.capture(ffprobe, args, path).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TimemarkError::probe(
                path,
                format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Stderr of `ffmpeg -hide_banner -i <path>`
    ///
    /// ffmpeg exits non-zero here because no output is named; only the
    /// printed stream summary matters.
    async fn banner(&self, path: &Path) -> TimemarkResult<String> {
        let args = vec![
            OsString::from("-hide_banner"),
            OsString::from("-i"),
            path.as_os_str().to_os_string(),
        ];
        let output = self.capture(&self.ffmpeg, args, path).await?;
        Ok(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn duration(&self, path: &Path) -> TimemarkResult<Duration> {
        Self::ensure_exists(path)?;

        let duration = match &self.ffprobe {
            Some(ffprobe) => {
                let stdout = self
                    .ffprobe_query(
                        ffprobe,
                        path,
                        &[
                            "-v",
                            "error",
                            "-show_entries",
                            "format=duration",
                            "-of",
                            "default=noprint_wrappers=1:nokey=1",
                        ],
                    )
                    .await?;
                match parse_duration_output(&stdout).or_else(|| parse_banner_duration(&stdout)) {
                    Some(duration) => Some(duration),
                    None => {
                        tracing::debug!(path = %path.display(), "ffprobe gave no duration, reading banner");
                        parse_banner_duration(&self.banner(path).await?)
                    }
                }
            }
            None => parse_banner_duration(&self.banner(path).await?),
        };

        match duration {
            Some(duration) if !duration.is_zero() => {
                tracing::debug!(path = %path.display(), seconds = duration.as_secs_f64(), "Probed duration");
                Ok(duration)
            }
            Some(_) => Err(TimemarkError::probe(path, "reported duration is zero")),
            None => Err(TimemarkError::probe(path, "no duration reported")),
        }
    }

    async fn geometry(&self, path: &Path) -> TimemarkResult<Option<FrameGeometry>> {
        Self::ensure_exists(path)?;

        let geometry = match &self.ffprobe {
            Some(ffprobe) => {
                let stdout = self
                    .ffprobe_query(
                        ffprobe,
                        path,
                        &[
                            "-v",
                            "error",
                            "-select_streams",
                            "v:0",
                            "-show_entries",
                            "stream=width,height",
                            "-of",
                            "csv=s=x:p=0",
                        ],
                    )
                    .await?;
                parse_geometry_output(&stdout).or_else(|| parse_banner_geometry(&stdout))
            }
            None => parse_banner_geometry(&self.banner(path).await?),
        };

        match geometry {
            Some(geometry) => tracing::debug!(path = %path.display(), %geometry, "Probed geometry"),
            None => tracing::debug!(path = %path.display(), "No video stream found"),
        }
        Ok(geometry)
    }
}

/// Parse ffprobe's bare `format=duration` value
pub fn parse_duration_output(output: &str) -> Option<Duration> {
    let seconds: f64 = output.lines().map(str::trim).find(|l| !l.is_empty())?.parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Parse ffprobe's `WxH` csv line for the first video stream
pub fn parse_geometry_output(output: &str) -> Option<FrameGeometry> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let mut parts = line.split('x').map(str::trim);
    let width: u32 = parts.next()?.parse().ok()?;
    let height: u32 = parts.next()?.parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(FrameGeometry::new(width, height))
}

/// Parse the `Duration: HH:MM:SS.CC` line of an ffmpeg banner
pub fn parse_banner_duration(banner: &str) -> Option<Duration> {
    let caps = BANNER_DURATION.captures(banner)?;
    let centis = clock_centiseconds(&caps[1], &caps[2], &caps[3], &caps[4])?;
    Some(Duration::from_millis(centis.checked_mul(10)?))
}

/// Parse the frame size of the first video stream in an ffmpeg banner
pub fn parse_banner_geometry(banner: &str) -> Option<FrameGeometry> {
    let caps = BANNER_VIDEO_SIZE.captures(banner)?;
    let width: u32 = caps[1].parse().ok()?;
    let height: u32 = caps[2].parse().ok()?;
    Some(FrameGeometry::new(width, height))
}
