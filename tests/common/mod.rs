#![allow(dead_code)]

use bathyfit::io::write_raster;
use bathyfit::types::{BandStack, Crs, GeoTransform, GridSpec, Raster};
use gdal::spatial_ref::SpatialRef;
use std::path::Path;

pub const NODATA: f64 = -9999.0;

/// UTM zone 17N, the zone covering Tampa Bay
pub fn utm17n() -> Crs {
    epsg(32617)
}

pub fn wgs84() -> Crs {
    epsg(4326)
}

pub fn epsg(code: u32) -> Crs {
    let srs = SpatialRef::from_epsg(code).expect("EPSG code should be known to PROJ");
    Crs::from_wkt(srs.to_wkt().expect("WKT export"))
}

pub fn north_up_grid(
    crs: Crs,
    origin: (f64, f64),
    pixel: f64,
    width: usize,
    height: usize,
) -> GridSpec {
    let transform = GeoTransform::north_up(origin.0, origin.1, pixel, -pixel);
    GridSpec::new(crs, transform, width, height)
}

/// Writes `bands` (band, row, col) as an uncompressed float GeoTIFF
pub fn write_geotiff(path: &Path, grid: GridSpec, bands: BandStack, nodata: Option<f64>) {
    let raster = Raster::new(grid, bands, nodata).expect("band stack matches grid");
    write_raster(&raster, path, None).expect("GeoTIFF written");
}
