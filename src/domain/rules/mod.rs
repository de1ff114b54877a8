// Domain rules - Request validation policies

use crate::domain::model::*;
use crate::error::{TimemarkError, TimemarkResult};

/// Validation rules applied to incoming requests
pub struct RequestValidator;

impl RequestValidator {
    /// Check parameter constraints that do not depend on the media itself
    pub fn validate(request: &OperationRequest) -> TimemarkResult<()> {
        if request.input.as_os_str().is_empty() {
            return Err(TimemarkError::invalid_request("input path is empty"));
        }

        if let Some(crop) = request.operation.crop() {
            Self::validate_crop(crop)?;
        }
        if let Some(watermark) = request.operation.watermark() {
            Self::validate_watermark(watermark)?;
        }

        Ok(())
    }

    fn validate_crop(crop: &CropParams) -> TimemarkResult<()> {
        if crop.width == 0 || crop.height == 0 {
            return Err(TimemarkError::invalid_request(format!(
                "crop size must be positive, got {}x{}",
                crop.width, crop.height
            )));
        }
        Ok(())
    }

    fn validate_watermark(watermark: &WatermarkParams) -> TimemarkResult<()> {
        if watermark.font_size == 0 {
            return Err(TimemarkError::invalid_request(
                "font size must be positive",
            ));
        }
        Ok(())
    }

    /// Check the crop rectangle against the probed frame size
    pub fn validate_against_media(
        request: &OperationRequest,
        media: &MediaDescriptor,
    ) -> TimemarkResult<()> {
        let Some(crop) = request.operation.crop() else {
            return Ok(());
        };

        let geometry = media.geometry.ok_or_else(|| {
            TimemarkError::probe(&request.input, "no video stream geometry found")
        })?;

        if !crop.fits_within(&geometry) {
            return Err(TimemarkError::invalid_request(format!(
                "crop {}x{}+{}+{} exceeds frame {}",
                crop.width, crop.height, crop.x, crop.y, geometry
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
