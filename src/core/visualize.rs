//! Contrast stretch of multi-band scientific rasters into 8-bit images.
//!
//! Samples are clipped to a fixed sensor range before the linear stretch,
//! so that a handful of extreme pixels (clouds, glint) cannot compress the
//! visible range of the rest of the scene.

use crate::config::{ClipRange, VisualizeConfig};
use crate::io::{read_raster, write_rgb};
use crate::types::{BandStack, BathyError, BathyResult};
use ndarray::{Array3, Axis};

/// Clip to `range`, rescale linearly onto 0..=255 and truncate. NaN maps to 0.
pub fn stretch_value(value: f32, range: &ClipRange) -> u8 {
    if value.is_nan() {
        return 0;
    }
    let (min, max) = (range.min as f64, range.max as f64);
    let clipped = (value as f64).clamp(min, max);
    ((clipped - min) / (max - min) * 255.0) as u8
}

/// Selects `band_order` (1-based) from a (band, row, col) stack, stretches each
/// sample, and returns a (row, col, channel) array ready for image encoding.
pub fn stretch_to_rgb(
    bands: &BandStack,
    band_order: &[usize],
    range: &ClipRange,
) -> BathyResult<Array3<u8>> {
    range.validate()?;
    if band_order.is_empty() {
        return Err(BathyError::InvalidConfig("no output bands selected".to_string()));
    }

    let available = bands.len_of(Axis(0));
    if let Some(&requested) = band_order.iter().find(|&&b| b == 0 || b > available) {
        return Err(BathyError::BandCount { requested, available });
    }

    let (_, height, width) = bands.dim();
    let stretched = Array3::from_shape_fn((height, width, band_order.len()), |(i, j, k)| {
        stretch_value(bands[[band_order[k] - 1, i, j]], range)
    });
    Ok(stretched)
}

/// Reads the raster, stretches the configured bands and writes the image
pub fn run_visualize(config: &VisualizeConfig) -> BathyResult<Array3<u8>> {
    let raster = read_raster(&config.input)?;
    log::info!("Raster read: {} band(s) of {:?}", raster.band_count(), raster.shape());

    log::info!(
        "Stretching values from [{}, {}] onto [0, 255]",
        config.range.min,
        config.range.max
    );
    let rgb = stretch_to_rgb(&raster.bands, &config.bands, &config.range)?;
    log::debug!("Pixel-major array shape: {:?}", rgb.dim());

    write_rgb(&rgb, &config.output)?;
    Ok(rgb)
}
