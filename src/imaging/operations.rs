//! High-level image operations.
//!
//! These functions combine the dimension calculations with pixel work from
//! the `image` crate. They never touch the filesystem.
//!
//! ## Letterbox composite
//!
//! Every derived image is exactly the frame size. The source is scaled to
//! fit inside the frame and centered over a background made from the same
//! source: covered, center-cropped to the frame and Gaussian-blurred. Nothing
//! is ever transparent or left empty, whatever the source aspect ratio.
//!
//! All resampling uses Lanczos3, so the same source decodes to the same
//! pixel grid on every run.

use super::calculations::{calculate_cover_crop, calculate_fit_dimensions, center_offset};
use super::params::Frame;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

/// Resampling filter for every resize in the pipeline.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Cover the frame with the source: crop the centered region with the
/// frame's aspect ratio, then resample it to exactly the frame size.
pub fn cover(img: &DynamicImage, frame: Frame) -> DynamicImage {
    let crop = calculate_cover_crop((img.width(), img.height()), frame.as_tuple());
    img.crop_imm(crop.x, crop.y, crop.width, crop.height)
        .resize_exact(frame.width, frame.height, RESAMPLE_FILTER)
}

/// Scale the source to fit entirely inside the frame.
pub fn fit(img: &DynamicImage, frame: Frame) -> DynamicImage {
    let (w, h) = calculate_fit_dimensions((img.width(), img.height()), frame.as_tuple());
    img.resize_exact(w, h, RESAMPLE_FILTER)
}

/// Produce the frame-sized letterbox composite of `img`.
///
/// `blur_sigma` of zero (or less) keeps the background sharp.
pub fn letterbox(img: &DynamicImage, frame: Frame, blur_sigma: f32) -> RgbImage {
    let covered = cover(img, frame);
    let background = if blur_sigma > 0.0 {
        covered.blur(blur_sigma)
    } else {
        covered
    };
    let mut canvas = background.to_rgb8();

    let foreground = fit(img, frame).to_rgb8();
    let (x, y) = center_offset(foreground.dimensions(), frame.as_tuple());
    imageops::replace(&mut canvas, &foreground, i64::from(x), i64::from(y));

    canvas
}
