//! Transcoder argument construction
//!
//! Every builder here is pure: the same request and timestamp always produce
//! the same argument list and output path.

use std::path::Path;

use chrono::{FixedOffset, Local, NaiveDateTime};

use crate::domain::model::*;
use crate::utils::path::derive_output_path;

pub const DEFAULT_FONT_FILE: &str = "arial.ttf";
pub const DEFAULT_FONT_COLOR: &str = "red";

/// Builds ffmpeg argument lists for the supported operations
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    font_file: String,
    font_color: String,
    /// Offset the anchor's wall-clock time is interpreted in
    utc_offset: FixedOffset,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_FILE, DEFAULT_FONT_COLOR)
    }
}

impl CommandBuilder {
    /// Create a builder using the machine's current UTC offset
    pub fn new(font_file: impl Into<String>, font_color: impl Into<String>) -> Self {
        Self {
            font_file: font_file.into(),
            font_color: font_color.into(),
            utc_offset: *Local::now().offset(),
        }
    }

    pub fn with_utc_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    /// Build the command for any request
    ///
    /// `now` names the output of operations without an anchor.
    pub fn build(&self, request: &OperationRequest, now: NaiveDateTime) -> BuiltCommand {
        let output_dir = request.resolved_output_dir();
        match &request.operation {
            Operation::Watermark(watermark) => {
                self.watermark(&request.input, &output_dir, watermark)
            }
            Operation::Crop(crop) => self.crop(&request.input, &output_dir, crop, now),
            Operation::CropAndWatermark { crop, watermark } => {
                self.crop_and_watermark(&request.input, &output_dir, crop, watermark)
            }
        }
    }

    /// Burn a running clock seeded at the anchor
    pub fn watermark(
        &self,
        input: &Path,
        output_dir: &Path,
        params: &WatermarkParams,
    ) -> BuiltCommand {
        let output = derive_output_path(
            input,
            output_dir,
            OperationKind::Watermark.suffix(),
            params.anchor,
        );
        Self::assemble(input, self.drawtext_filter(params), &output)
    }

    /// Cut a rectangle out of every frame
    pub fn crop(
        &self,
        input: &Path,
        output_dir: &Path,
        params: &CropParams,
        now: NaiveDateTime,
    ) -> BuiltCommand {
        let output = derive_output_path(input, output_dir, OperationKind::Crop.suffix(), now);
        Self::assemble(input, Self::crop_filter(params), &output)
    }

    /// Crop, then overlay the clock on the cropped frame
    pub fn crop_and_watermark(
        &self,
        input: &Path,
        output_dir: &Path,
        crop: &CropParams,
        watermark: &WatermarkParams,
    ) -> BuiltCommand {
        let output = derive_output_path(
            input,
            output_dir,
            OperationKind::CropAndWatermark.suffix(),
            watermark.anchor,
        );
        let graph = format!(
            "{},{}",
            Self::crop_filter(crop),
            self.drawtext_filter(watermark)
        );
        Self::assemble(input, graph, &output)
    }

    pub fn crop_filter(params: &CropParams) -> String {
        format!(
            "crop={}:{}:{}:{}",
            params.width, params.height, params.x, params.y
        )
    }

    pub fn drawtext_filter(&self, params: &WatermarkParams) -> String {
        format!(
            "drawtext=fontfile={}:fontsize={}:fontcolor={}:text='%{{pts\\:localtime\\:{}}}':x={}:y={}",
            escape_filter_value(&self.font_file),
            params.font_size,
            self.font_color,
            self.anchor_epoch(params.anchor),
            params.x,
            params.y
        )
    }

    /// Unix-epoch seconds of the anchor in the builder's offset
    pub fn anchor_epoch(&self, anchor: NaiveDateTime) -> i64 {
        anchor.and_utc().timestamp() - i64::from(self.utc_offset.local_minus_utc())
    }

    fn assemble(input: &Path, graph: String, output: &Path) -> BuiltCommand {
        let args = vec![
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-vf".to_string(),
            graph,
            "-c:a".to_string(),
            "copy".to_string(),
            output.to_string_lossy().into_owned(),
        ];
        BuiltCommand {
            args,
            output_path: output.to_path_buf(),
        }
    }
}

/// Escape a value for use inside a filter option
///
/// Backslashes become forward slashes (ffmpeg accepts both on Windows) so
/// only `:` and `'` need escaping.
fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "/")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}
