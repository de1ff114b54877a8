//! TimeMark Library
//!
//! Burns a running date/time clock into videos and crops them by driving an
//! external ffmpeg process: probe the source, build the argument list,
//! supervise the child and stream its progress.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{progress_channel, OperationOutcome, TranscodeInteractor, TranscodeOperation};
pub use domain::model::{
    BuiltCommand, CropParams, FrameGeometry, MediaDescriptor, Operation, OperationKind,
    OperationReport, OperationRequest, OperationState, ProcessResult, ProgressEvent,
    WatermarkParams,
};
pub use engine::{parse_progress, CommandBuilder};
pub use error::{TimemarkError, TimemarkResult};
