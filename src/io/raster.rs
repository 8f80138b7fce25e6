use crate::io::ensure_exists;
use crate::types::{BandStack, BathyError, BathyResult, Crs, GeoTransform, GridSpec, Raster};
use gdal::raster::{Buffer, RasterCreationOption};
use gdal::{Dataset, DriverManager};
use ndarray::{Array2, Axis};
use std::path::Path;

/// GDAL reports this transform for files without georeferencing (plain PNGs)
const IDENTITY_TRANSFORM: [f64; 6] = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

fn open_dataset(path: &Path) -> BathyResult<Dataset> {
    ensure_exists(path)?;
    Ok(Dataset::open(path)?)
}

fn grid_of(dataset: &Dataset, path: &Path) -> GridSpec {
    let (width, height) = dataset.raster_size();
    let transform = dataset.geo_transform().unwrap_or_else(|_| {
        log::debug!("{} has no geotransform, using pixel coordinates", path.display());
        IDENTITY_TRANSFORM
    });

    GridSpec::new(
        Crs::from_wkt(dataset.projection()),
        GeoTransform::from_gdal(transform),
        width,
        height,
    )
}

fn read_band_data(
    dataset: &Dataset,
    band: usize,
    (width, height): (usize, usize),
) -> BathyResult<(Array2<f32>, Option<f64>)> {
    let rasterband = dataset.rasterband(band as isize)?;
    let nodata = rasterband.no_data_value();
    let band_data = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

    let array = Array2::from_shape_vec((height, width), band_data.data)
        .map_err(|e| BathyError::Processing(format!("Failed to reshape band {}: {}", band, e)))?;

    Ok((array, nodata))
}

/// Reads the grid definition (CRS, transform, size) without touching pixel data
pub fn read_grid<P: AsRef<Path>>(path: P) -> BathyResult<GridSpec> {
    let path = path.as_ref();
    let dataset = open_dataset(path)?;
    let grid = grid_of(&dataset, path);
    log::debug!(
        "{}: {}x{} pixels, transform {}",
        path.display(),
        grid.width,
        grid.height,
        grid.transform
    );
    Ok(grid)
}

/// Reads every band as `f32`. The no-data value is taken from band 1.
pub fn read_raster<P: AsRef<Path>>(path: P) -> BathyResult<Raster> {
    let path = path.as_ref();
    log::info!("Reading raster: {}", path.display());

    let dataset = open_dataset(path)?;
    let grid = grid_of(&dataset, path);
    let band_count = dataset.raster_count() as usize;

    let mut bands = BandStack::zeros((band_count, grid.height, grid.width));
    let mut nodata = None;
    for index in 1..=band_count {
        let (array, band_nodata) = read_band_data(&dataset, index, (grid.width, grid.height))?;
        if index == 1 {
            nodata = band_nodata;
        }
        bands.index_axis_mut(Axis(0), index - 1).assign(&array);
    }

    log::debug!("Read {} band(s), nodata {:?}", band_count, nodata);
    Raster::new(grid, bands, nodata)
}

/// Reads a single 1-based band
pub fn read_band<P: AsRef<Path>>(path: P, band: usize) -> BathyResult<Raster> {
    let path = path.as_ref();
    log::info!("Reading band {} of {}", band, path.display());

    let dataset = open_dataset(path)?;
    let available = dataset.raster_count() as usize;
    if band == 0 || band > available {
        return Err(BathyError::BandCount {
            requested: band,
            available,
        });
    }

    let grid = grid_of(&dataset, path);
    let (array, nodata) = read_band_data(&dataset, band, (grid.width, grid.height))?;
    Raster::single_band(grid, array, nodata)
}

/// Writes a `f32` GeoTIFF. `raster.nodata` is declared on every band so that
/// readers mask the sentinel instead of treating it as data.
pub fn write_raster<P: AsRef<Path>>(
    raster: &Raster,
    output_path: P,
    compression: Option<&str>,
) -> BathyResult<()> {
    let output_path = output_path.as_ref();
    log::info!("Saving GeoTIFF: {}", output_path.display());

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (height, width) = raster.shape();
    let band_count = raster.band_count();

    let options: Vec<RasterCreationOption> = compression
        .map(|value| vec![RasterCreationOption { key: "COMPRESS", value }])
        .unwrap_or_default();

    let mut dataset = driver.create_with_band_type_with_options::<f32, _>(
        output_path,
        width as isize,
        height as isize,
        band_count as isize,
        &options,
    )?;

    dataset.set_geo_transform(&raster.grid.transform.to_gdal())?;
    if raster.grid.crs.is_defined() {
        dataset.set_projection(raster.grid.crs.wkt())?;
    } else {
        log::warn!("{} is written without a CRS", output_path.display());
    }

    for (index, band) in raster.bands.axis_iter(Axis(0)).enumerate() {
        let mut rasterband = dataset.rasterband(index as isize + 1)?;
        let flat_data: Vec<f32> = band.iter().cloned().collect();
        let buffer = Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;
        rasterband.set_no_data_value(raster.nodata)?;
    }

    log::info!("GeoTIFF saved successfully");
    Ok(())
}
