//! Grayscale conversion of an arbitrary image onto a template raster's pixel grid.

use crate::config::GrayscaleConfig;
use crate::io::{ensure_exists, read_grid, read_image, write_gray};
use crate::types::{BathyError, BathyResult};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, RgbImage};

// ITU-R 601-2 luma weights in 16-bit fixed point; they sum to 1 << 16
const RW: u32 = 19_595;
const GW: u32 = 38_470;
const BW: u32 = 7_471;

/// Y = 0.299 R + 0.587 G + 0.114 B, rounded to the nearest level
pub fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * RW + g as u32 * GW + b as u32 * BW + 0x8000) >> 16) as u8
}

/// Grayscale conversion of an 8-bit RGB image with [`luma_601`]
pub fn gray_from_rgb(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma_601(r, g, b)])
    })
}

/// Luminance conversion followed by an exact Lanczos resize to `cols` x `rows`.
/// The aspect ratio is not preserved: the output matches the template pixel for pixel.
/// Alpha is dropped before the conversion.
pub fn to_template_grayscale(
    img: &DynamicImage,
    rows: usize,
    cols: usize,
) -> BathyResult<GrayImage> {
    if rows == 0 || cols == 0 {
        return Err(BathyError::InvalidConfig(format!(
            "template has an empty pixel grid ({} x {})",
            rows, cols
        )));
    }

    let gray = gray_from_rgb(&img.to_rgb8());
    Ok(imageops::resize(&gray, cols as u32, rows as u32, FilterType::Lanczos3))
}

pub fn run_grayscale(config: &GrayscaleConfig) -> BathyResult<GrayImage> {
    ensure_exists(&config.image)?;
    ensure_exists(&config.template)?;

    let (rows, cols) = read_grid(&config.template)?.shape();
    log::info!("Target shape (rows, cols): ({}, {})", rows, cols);

    let img = read_image(&config.image)?;
    log::info!(
        "Source image size (width, height): ({}, {})",
        img.width(),
        img.height()
    );

    let aligned = to_template_grayscale(&img, rows, cols)?;
    log::info!("Resized to (width, height): {:?}", aligned.dimensions());

    write_gray(&aligned, &config.output)?;
    Ok(aligned)
}
