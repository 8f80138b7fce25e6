//! Reprojection and bilinear resampling of a band onto a reference grid.
//!
//! Backward mapping: every output pixel centre is taken to world
//! coordinates on the reference grid, moved into the source CRS, and
//! located in source pixel space. Locations outside the source footprint
//! receive the no-data sentinel, which is also declared in the output
//! raster's metadata.

use crate::config::ReprojectConfig;
use crate::core::stats::is_nodata;
use crate::io::{read_band, read_grid, write_raster};
use crate::types::{Band, BathyError, BathyResult, Crs, GridSpec, Raster};
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use ndarray::ArrayView2;

/// Moves world coordinates from the output CRS into the source CRS
pub trait PointTransform {
    /// Transforms in place. Points that cannot be transformed are set to NaN.
    fn transform(&self, xs: &mut [f64], ys: &mut [f64]) -> BathyResult<()>;
}

/// Both grids share a CRS
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl PointTransform for IdentityTransform {
    fn transform(&self, _xs: &mut [f64], _ys: &mut [f64]) -> BathyResult<()> {
        Ok(())
    }
}

/// CRS-to-CRS transform backed by GDAL/PROJ, in x=easting/longitude order
pub struct GdalCoordTransform {
    inner: CoordTransform,
}

impl GdalCoordTransform {
    pub fn new(from: &Crs, to: &Crs) -> BathyResult<Self> {
        let from = traditional_order(SpatialRef::from_definition(from.wkt())?);
        let to = traditional_order(SpatialRef::from_definition(to.wkt())?);
        Ok(Self {
            inner: CoordTransform::new(&from, &to)?,
        })
    }
}

fn traditional_order(srs: SpatialRef) -> SpatialRef {
    srs.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
    srs
}

impl PointTransform for GdalCoordTransform {
    fn transform(&self, xs: &mut [f64], ys: &mut [f64]) -> BathyResult<()> {
        let mut zs = vec![0.0; xs.len()];
        let (orig_xs, orig_ys) = (xs.to_vec(), ys.to_vec());
        if self.inner.transform_coords(xs, ys, &mut zs).is_ok() {
            return Ok(());
        }

        // Batch failed: retry point by point and blank the ones PROJ rejects
        for i in 0..xs.len() {
            let (mut x, mut y, mut z) = ([orig_xs[i]], [orig_ys[i]], [0.0]);
            match self.inner.transform_coords(&mut x, &mut y, &mut z) {
                Ok(()) => {
                    xs[i] = x[0];
                    ys[i] = y[0];
                }
                Err(_) => {
                    xs[i] = f64::NAN;
                    ys[i] = f64::NAN;
                }
            }
        }
        Ok(())
    }
}

/// Picks the transform that takes `target` world coordinates into `source`'s CRS
pub fn point_transform_for(target: &Crs, source: &Crs) -> BathyResult<Box<dyn PointTransform>> {
    if target.is_equivalent(source) {
        return Ok(Box::new(IdentityTransform));
    }
    if !target.is_defined() || !source.is_defined() {
        log::warn!("One of the grids declares no CRS; assuming both share the same CRS");
        return Ok(Box::new(IdentityTransform));
    }
    log::debug!("Transforming coordinates between differing CRSs");
    Ok(Box::new(GdalCoordTransform::new(target, source)?))
}

/// Output coverage of one reprojection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReprojectStats {
    pub valid_pixels: usize,
    pub total_pixels: usize,
}

impl ReprojectStats {
    pub fn coverage_percent(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        self.valid_pixels as f64 / self.total_pixels as f64 * 100.0
    }
}

/// Bilinear sample at a fractional pixel-edge location.
/// `None` outside the footprint or when every contributing sample is no-data.
fn sample_bilinear(
    source: &ArrayView2<f32>,
    col: f64,
    row: f64,
    nodata: Option<f64>,
) -> Option<f32> {
    let (height, width) = source.dim();
    // Written so that NaN coordinates fall outside
    if !(col >= 0.0 && row >= 0.0 && col < width as f64 && row < height as f64) {
        return None;
    }

    // Sample values sit at pixel centres
    let fx = (col - 0.5).clamp(0.0, (width - 1) as f64);
    let fy = (row - 0.5).clamp(0.0, (height - 1) as f64);
    let x1 = fx.floor() as usize;
    let y1 = fy.floor() as usize;
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);
    let dx = fx - x1 as f64;
    let dy = fy - y1 as f64;

    let taps = [
        (y1, x1, (1.0 - dx) * (1.0 - dy)),
        (y1, x2, dx * (1.0 - dy)),
        (y2, x1, (1.0 - dx) * dy),
        (y2, x2, dx * dy),
    ];

    let mut sum = 0.0;
    let mut weight = 0.0;
    for (r, c, w) in taps {
        if w <= 0.0 {
            continue;
        }
        let value = source[[r, c]];
        if is_nodata(value, nodata) {
            continue;
        }
        sum += value as f64 * w;
        weight += w;
    }

    if weight > 0.0 {
        Some((sum / weight) as f32)
    } else {
        None
    }
}

/// Resamples `source` onto `target`. Unmapped pixels get `nodata`,
/// and the returned raster declares `nodata` as its sentinel.
pub fn reproject_band(
    source: ArrayView2<f32>,
    source_grid: &GridSpec,
    source_nodata: Option<f64>,
    target: &GridSpec,
    nodata: f32,
    transform: &dyn PointTransform,
) -> BathyResult<(Raster, ReprojectStats)> {
    if source.dim() != source_grid.shape() {
        return Err(BathyError::ShapeMismatch {
            expected: source_grid.shape(),
            found: source.dim(),
        });
    }
    if source_grid
        .transform
        .world_to_pixel(source_grid.transform.top_left_x, source_grid.transform.top_left_y)
        .is_none()
    {
        return Err(BathyError::Processing(format!(
            "Source geotransform {} is not invertible",
            source_grid.transform
        )));
    }

    log::debug!("Source shape: {:?}, target shape: {:?}", source_grid.shape(), target.shape());

    let (height, width) = target.shape();
    let mut output = Band::from_elem((height, width), nodata);
    let mut valid_pixels = 0;
    let mut xs = vec![0.0; width];
    let mut ys = vec![0.0; width];

    if source_grid.pixel_count() > 0 {
        for i in 0..height {
            for j in 0..width {
                let (x, y) = target.transform.pixel_to_world(j as f64 + 0.5, i as f64 + 0.5);
                xs[j] = x;
                ys[j] = y;
            }
            transform.transform(&mut xs, &mut ys)?;

            for j in 0..width {
                let Some((col, row)) = source_grid.transform.world_to_pixel(xs[j], ys[j]) else {
                    continue;
                };
                if let Some(value) = sample_bilinear(&source, col, row, source_nodata) {
                    output[[i, j]] = value;
                    valid_pixels += 1;
                }
            }
        }
    }

    let stats = ReprojectStats {
        valid_pixels,
        total_pixels: height * width,
    };
    let raster = Raster::single_band(target.clone(), output, Some(nodata as f64))?;
    Ok((raster, stats))
}

/// Reads the reference grid and the source band, resamples, and writes the aligned GeoTIFF
pub fn run_reproject(config: &ReprojectConfig) -> BathyResult<ReprojectStats> {
    config.validate()?;
    log::info!("Starting reprojection onto the reference grid");

    let reference = read_grid(&config.reference)?;
    let source = read_band(&config.source, config.source_band)?;
    let transform = point_transform_for(&reference.crs, &source.grid.crs)?;

    let (aligned, stats) = reproject_band(
        source.band(1)?,
        &source.grid,
        source.nodata,
        &reference,
        config.nodata,
        transform.as_ref(),
    )?;

    log::info!(
        "Resampled {} of {} pixels ({:.1}% coverage)",
        stats.valid_pixels,
        stats.total_pixels,
        stats.coverage_percent()
    );
    if stats.coverage_percent() < 50.0 {
        log::warn!("Low coverage: the source covers less than half of the reference grid");
    }

    write_raster(&aligned, &config.output, config.compression.as_deref())?;
    log::info!(
        "Aligned raster with nodata {} written to: {}",
        config.nodata,
        config.output.display()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoTransform;
    use approx::assert_abs_diff_eq;

    const NODATA: f32 = -9999.0;

    fn grid(origin_x: f64, origin_y: f64, pixel: f64, width: usize, height: usize) -> GridSpec {
        GridSpec::new(
            Crs::from_wkt("EPSG:32617"),
            GeoTransform::north_up(origin_x, origin_y, pixel, -pixel),
            width,
            height,
        )
    }

    fn ramp(height: usize, width: usize) -> Band {
        Band::from_shape_fn((height, width), |(i, j)| (i * 10 + j) as f32 * 0.5 + 1.0)
    }

    #[test]
    fn test_own_grid_is_identity() {
        let source_grid = grid(100.0, 200.0, 2.0, 7, 5);
        let source = ramp(5, 7);

        let (out, stats) = reproject_band(
            source.view(),
            &source_grid,
            None,
            &source_grid,
            NODATA,
            &IdentityTransform,
        )
        .unwrap();

        assert_eq!(stats.valid_pixels, 35);
        assert_eq!(out.nodata, Some(NODATA as f64));
        let band = out.band(1).unwrap();
        for ((i, j), value) in band.indexed_iter() {
            assert_ne!(*value, NODATA);
            assert_abs_diff_eq!(*value, source[[i, j]], epsilon = 1e-4);
        }
    }

    #[test]
    fn test_larger_extent_marks_outside_pixels() {
        // Source covers world x in [0, 10), y in (0, 10]
        let source_grid = grid(0.0, 10.0, 1.0, 10, 10);
        let source = Band::from_elem((10, 10), 3.0);
        // Target covers x in [-5, 15), y in (-5, 15]
        let target = grid(-5.0, 15.0, 1.0, 20, 20);

        let (out, stats) = reproject_band(
            source.view(),
            &source_grid,
            None,
            &target,
            NODATA,
            &IdentityTransform,
        )
        .unwrap();
        let band = out.band(1).unwrap();

        for ((i, j), value) in band.indexed_iter() {
            let inside = (5..15).contains(&i) && (5..15).contains(&j);
            if inside {
                assert_abs_diff_eq!(*value, 3.0, epsilon = 1e-6);
            } else {
                assert_eq!(*value, NODATA, "pixel ({}, {}) should be nodata", i, j);
            }
        }
        assert_eq!(stats.valid_pixels, 100);
        assert_eq!(stats.total_pixels, 400);
    }

    #[test]
    fn test_bilinear_midpoint() {
        // Two columns, values 0 and 10: halfway between the centres gives 5
        let source = Band::from_shape_vec((1, 2), vec![0.0, 10.0]).unwrap();
        let value = sample_bilinear(&source.view(), 1.0, 0.5, None).unwrap();
        assert_abs_diff_eq!(value, 5.0, epsilon = 1e-6);

        let quarter = sample_bilinear(&source.view(), 0.75, 0.5, None).unwrap();
        assert_abs_diff_eq!(quarter, 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_downsampling_averages_neighbours() {
        let source_grid = grid(0.0, 4.0, 1.0, 4, 4);
        let source = Band::from_shape_fn((4, 4), |(_, j)| j as f32);
        // One 2x2 output pixel per 2x2 block: centres fall between source columns
        let target = grid(0.0, 4.0, 2.0, 2, 2);

        let (out, _) = reproject_band(
            source.view(),
            &source_grid,
            None,
            &target,
            NODATA,
            &IdentityTransform,
        )
        .unwrap();
        let band = out.band(1).unwrap();
        assert_abs_diff_eq!(band[[0, 0]], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(band[[1, 1]], 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_source_nodata_is_excluded() {
        let source = Band::from_shape_vec((1, 2), vec![-32768.0, 10.0]).unwrap();
        let value = sample_bilinear(&source.view(), 1.0, 0.5, Some(-32768.0)).unwrap();
        assert_abs_diff_eq!(value, 10.0, epsilon = 1e-6);

        let all_missing = Band::from_elem((2, 2), -32768.0);
        assert!(sample_bilinear(&all_missing.view(), 1.0, 1.0, Some(-32768.0)).is_none());
    }

    #[test]
    fn test_nan_coordinates_are_outside() {
        let source = Band::from_elem((3, 3), 1.0);
        assert!(sample_bilinear(&source.view(), f64::NAN, 1.0, None).is_none());
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let source_grid = grid(0.0, 4.0, 1.0, 4, 4);
        let source = Band::zeros((3, 4));
        let result = reproject_band(
            source.view(),
            &source_grid,
            None,
            &source_grid,
            NODATA,
            &IdentityTransform,
        );
        assert!(matches!(result, Err(BathyError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_identical_crs_uses_identity() {
        let crs = Crs::from_wkt("EPSG:32617");
        let transform = point_transform_for(&crs, &crs).unwrap();
        let mut xs = [1.0, 2.0];
        let mut ys = [3.0, 4.0];
        transform.transform(&mut xs, &mut ys).unwrap();
        assert_eq!(xs, [1.0, 2.0]);
        assert_eq!(ys, [3.0, 4.0]);
    }
}
