// Unit tests for request validation rules

use std::time::Duration;

use chrono::NaiveDate;

use super::*;

fn watermark(font_size: u32) -> WatermarkParams {
    WatermarkParams {
        anchor: NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap(),
        font_size,
        x: 20,
        y: 20,
    }
}

fn crop(width: u32, height: u32, x: u32, y: u32) -> CropParams {
    CropParams {
        width,
        height,
        x,
        y,
    }
}

fn media(geometry: Option<FrameGeometry>) -> MediaDescriptor {
    MediaDescriptor::new(Duration::from_secs(10), geometry)
}

#[test]
fn test_valid_watermark_request_passes() {
    let request = OperationRequest::watermark("clip.mp4", watermark(45));
    assert!(RequestValidator::validate(&request).is_ok());
}

#[test]
fn test_zero_font_size_is_rejected() {
    let request = OperationRequest::watermark("clip.mp4", watermark(0));
    let err = RequestValidator::validate(&request).unwrap_err();
    assert!(matches!(err, TimemarkError::InvalidRequest { .. }));
}

#[test]
fn test_zero_crop_dimension_is_rejected() {
    let request = OperationRequest::crop("clip.mp4", crop(0, 480, 0, 0));
    assert!(RequestValidator::validate(&request).is_err());

    let request = OperationRequest::crop_and_watermark("clip.mp4", crop(640, 0, 0, 0), watermark(45));
    assert!(RequestValidator::validate(&request).is_err());
}

#[test]
fn test_empty_input_is_rejected() {
    let request = OperationRequest::crop("", crop(640, 480, 0, 0));
    assert!(RequestValidator::validate(&request).is_err());
}

#[test]
fn test_missing_geometry_is_a_probe_failure_for_crop() {
    let request = OperationRequest::crop("clip.mp4", crop(640, 480, 0, 0));
    let err = RequestValidator::validate_against_media(&request, &media(None)).unwrap_err();
    assert!(matches!(err, TimemarkError::Probe { .. }));
}

#[test]
fn test_watermark_ignores_missing_geometry() {
    let request = OperationRequest::watermark("clip.mp4", watermark(45));
    assert!(RequestValidator::validate_against_media(&request, &media(None)).is_ok());
}

#[test]
fn test_crop_outside_frame_is_rejected() {
    let request = OperationRequest::crop("clip.mp4", crop(640, 480, 700, 0));
    let err = RequestValidator::validate_against_media(
        &request,
        &media(Some(FrameGeometry::new(1280, 720))),
    )
    .unwrap_err();
    assert!(err.to_string().contains("1280x720"));
}

#[test]
fn test_crop_inside_frame_passes() {
    let request = OperationRequest::crop("clip.mp4", crop(640, 480, 640, 240));
    assert!(RequestValidator::validate_against_media(
        &request,
        &media(Some(FrameGeometry::new(1280, 720)))
    )
    .is_ok());
}
