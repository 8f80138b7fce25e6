use crate::io::ensure_exists;
use crate::types::{BathyError, BathyResult};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use ndarray::Array3;
use std::path::Path;

/// Opens any image format the `image` crate can decode
pub fn read_image<P: AsRef<Path>>(path: P) -> BathyResult<DynamicImage> {
    let path = path.as_ref();
    ensure_exists(path)?;

    let img = image::open(path)?;
    log::debug!(
        "{}: {}x{} (width x height), {:?}",
        path.display(),
        img.width(),
        img.height(),
        img.color()
    );
    Ok(img)
}

/// Writes an 8-bit (height, width, channel) array. One, three or four channels.
pub fn write_rgb<P: AsRef<Path>>(pixels: &Array3<u8>, path: P) -> BathyResult<()> {
    let path = path.as_ref();
    let (height, width, channels) = pixels.dim();
    let raw: Vec<u8> = pixels.iter().copied().collect();
    let (width, height) = (width as u32, height as u32);

    let reshape_error = || {
        BathyError::Processing(format!(
            "Pixel buffer does not fit {}x{}x{}",
            width, height, channels
        ))
    };
    let img = match channels {
        1 => GrayImage::from_raw(width, height, raw)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(reshape_error)?,
        3 => RgbImage::from_raw(width, height, raw)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(reshape_error)?,
        4 => RgbaImage::from_raw(width, height, raw)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(reshape_error)?,
        n => {
            return Err(BathyError::Processing(format!(
                "Cannot encode an image with {} channels",
                n
            )))
        }
    };

    img.save(path)?;
    log::info!("Image saved to: {}", path.display());
    Ok(())
}

pub fn write_gray<P: AsRef<Path>>(img: &GrayImage, path: P) -> BathyResult<()> {
    img.save(path.as_ref())?;
    log::info!("Grayscale image saved to: {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rgb_round_trip_keeps_pixel_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rgb.png");

        let mut pixels = Array3::<u8>::zeros((2, 3, 3));
        pixels[[1, 2, 0]] = 200;
        pixels[[0, 1, 2]] = 50;
        write_rgb(&pixels, &path).unwrap();

        let img = read_image(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1)[0], 200);
        assert_eq!(img.get_pixel(1, 0)[2], 50);
    }

    #[test]
    fn test_two_channel_arrays_are_rejected() {
        let dir = tempdir().unwrap();
        let pixels = Array3::<u8>::zeros((2, 2, 2));
        assert!(write_rgb(&pixels, dir.path().join("bad.png")).is_err());
    }

    #[test]
    fn test_missing_image() {
        let result = read_image("/nonexistent/input.png");
        assert!(matches!(result, Err(BathyError::MissingInput(_))));
    }
}
