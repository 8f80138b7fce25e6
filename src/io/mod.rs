//! I/O modules for reading and writing rasters and plain images

pub mod image_file;
pub mod raster;

pub use image_file::{read_image, write_gray, write_rgb};
pub use raster::{read_band, read_grid, read_raster, write_raster};

use crate::types::{BathyError, BathyResult};
use std::path::Path;

/// Fails with [`BathyError::MissingInput`] when `path` does not exist
pub fn ensure_exists<P: AsRef<Path>>(path: P) -> BathyResult<()> {
    let path = path.as_ref();
    if path.exists() {
        Ok(())
    } else {
        Err(BathyError::MissingInput(path.to_path_buf()))
    }
}
