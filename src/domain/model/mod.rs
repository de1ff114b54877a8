// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Pixel dimensions of the first video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Source media attributes gathered once per operation
///
/// Owned by the operation that probed it; never shared between operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaDescriptor {
    pub duration: Duration,
    pub geometry: Option<FrameGeometry>,
}

impl MediaDescriptor {
    pub fn new(duration: Duration, geometry: Option<FrameGeometry>) -> Self {
        Self { duration, geometry }
    }
}

/// Clock overlay parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkParams {
    /// Calendar date and time the displayed clock starts from
    pub anchor: NaiveDateTime,
    pub font_size: u32,
    pub x: u32,
    pub y: u32,
}

/// Rectangular crop parameters, in source pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropParams {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl CropParams {
    /// Whether the rectangle lies entirely inside a frame of the given size
    pub fn fits_within(&self, geometry: &FrameGeometry) -> bool {
        let right = u64::from(self.x) + u64::from(self.width);
        let bottom = u64::from(self.y) + u64::from(self.height);
        right <= u64::from(geometry.width) && bottom <= u64::from(geometry.height)
    }
}

/// Operation kind, used for output naming and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Watermark,
    Crop,
    CropAndWatermark,
}

impl OperationKind {
    /// Segment inserted between the base name and the timestamp
    pub fn suffix(&self) -> &'static str {
        match self {
            OperationKind::Watermark => "",
            OperationKind::Crop => "crop",
            OperationKind::CropAndWatermark => "crop_watermark",
        }
    }

    pub fn needs_geometry(&self) -> bool {
        !matches!(self, OperationKind::Watermark)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Watermark => "watermark",
            OperationKind::Crop => "crop",
            OperationKind::CropAndWatermark => "crop+watermark",
        };
        f.write_str(name)
    }
}

/// What to do to the video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Watermark(WatermarkParams),
    Crop(CropParams),
    CropAndWatermark {
        crop: CropParams,
        watermark: WatermarkParams,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Watermark(_) => OperationKind::Watermark,
            Operation::Crop(_) => OperationKind::Crop,
            Operation::CropAndWatermark { .. } => OperationKind::CropAndWatermark,
        }
    }

    pub fn crop(&self) -> Option<&CropParams> {
        match self {
            Operation::Crop(crop) | Operation::CropAndWatermark { crop, .. } => Some(crop),
            Operation::Watermark(_) => None,
        }
    }

    pub fn watermark(&self) -> Option<&WatermarkParams> {
        match self {
            Operation::Watermark(watermark) | Operation::CropAndWatermark { watermark, .. } => {
                Some(watermark)
            }
            Operation::Crop(_) => None,
        }
    }
}

/// A single transcode request submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub input: PathBuf,
    /// Where the output goes; defaults to the input's directory
    pub output_dir: Option<PathBuf>,
    pub operation: Operation,
}

impl OperationRequest {
    pub fn new(input: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            input: input.into(),
            output_dir: None,
            operation,
        }
    }

    pub fn watermark(input: impl Into<PathBuf>, params: WatermarkParams) -> Self {
        Self::new(input, Operation::Watermark(params))
    }

    pub fn crop(input: impl Into<PathBuf>, params: CropParams) -> Self {
        Self::new(input, Operation::Crop(params))
    }

    pub fn crop_and_watermark(
        input: impl Into<PathBuf>,
        crop: CropParams,
        watermark: WatermarkParams,
    ) -> Self {
        Self::new(input, Operation::CropAndWatermark { crop, watermark })
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// Directory the output file is written to
    pub fn resolved_output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }
}

/// Transcoder argument list plus the file it will produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub args: Vec<String>,
    pub output_path: PathBuf,
}

impl BuiltCommand {
    /// Replace the output path, keeping it as the last argument
    pub fn with_output_path(mut self, output_path: PathBuf) -> Self {
        if let Some(last) = self.args.last_mut() {
            *last = output_path.to_string_lossy().into_owned();
        }
        self.output_path = output_path;
        self
    }
}

/// Observational progress notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Completion percentage in [0, 100]
    pub percent: f64,
    pub message: String,
}

impl ProgressEvent {
    pub const COMPLETED: &'static str = "completed";
    pub const CANCELLED: &'static str = "cancelled";

    pub fn new(percent: f64, message: impl Into<String>) -> Self {
        let percent = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        Self {
            percent,
            message: message.into(),
        }
    }

    pub fn completed() -> Self {
        Self::new(100.0, Self::COMPLETED)
    }

    pub fn cancelled() -> Self {
        Self::new(0.0, Self::CANCELLED)
    }

    pub fn failed(reason: impl fmt::Display) -> Self {
        Self::new(0.0, format!("failed: {}", reason))
    }

    pub fn is_completion(&self) -> bool {
        self.message == Self::COMPLETED
    }
}

/// Terminal value of a supervised transcoder run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessResult {
    /// 0 means success
    pub exit_code: i32,
    /// Tail of the diagnostic stream, populated on failure
    pub diagnostics: String,
}

impl ProcessResult {
    pub fn success() -> Self {
        Self {
            exit_code: 0,
            diagnostics: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Lifecycle of a single transcode operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationState {
    Idle,
    Probing,
    BuildingCommand,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Completed | OperationState::Failed | OperationState::Cancelled
        )
    }

    /// Legal edges of the operation state machine
    pub fn can_transition_to(&self, next: OperationState) -> bool {
        use OperationState::*;
        match (self, next) {
            (Idle, Probing) => true,
            (Probing, BuildingCommand) => true,
            (BuildingCommand, Running) => true,
            (Running, Completed) => true,
            // Any active state may fail or be cancelled
            (Idle | Probing | BuildingCommand | Running, Failed | Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Success payload of a transcode operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationReport {
    pub output_path: PathBuf,
    pub media: MediaDescriptor,
    pub process: ProcessResult,
    pub elapsed: Duration,
}
