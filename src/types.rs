use gdal::spatial_ref::SpatialRef;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Single raster band (rows x cols)
pub type Band = Array2<f32>;

/// Multi-band raster data (band x rows x cols)
pub type BandStack = Array3<f32>;

/// Boolean grid, true where a pixel holds a real measurement
pub type ValidMask = Array2<bool>;

/// Affine transform from pixel (col, row) to world (x, y), in GDAL coefficient order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Relative tolerance used by [`GeoTransform::approx_eq`]
    pub const RTOL: f64 = 1e-5;
    /// Absolute tolerance used by [`GeoTransform::approx_eq`]
    pub const ATOL: f64 = 1e-8;

    /// North-up transform without rotation. `pixel_height` is normally negative.
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            top_left_x,
            pixel_width,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height,
        }
    }

    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// World coordinate of a fractional pixel-edge location.
    /// `(0.0, 0.0)` is the outer corner of the first pixel, `(0.5, 0.5)` its centre.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.top_left_x + col * self.pixel_width + row * self.rotation_x;
        let y = self.top_left_y + col * self.rotation_y + row * self.pixel_height;
        (x, y)
    }

    /// Inverse of [`GeoTransform::pixel_to_world`]. `None` for a singular transform.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y;
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let dx = x - self.top_left_x;
        let dy = y - self.top_left_y;
        let col = (self.pixel_height * dx - self.rotation_x * dy) / det;
        let row = (self.pixel_width * dy - self.rotation_y * dx) / det;
        Some((col, row))
    }

    /// Element-wise closeness: `|a - b| <= ATOL + RTOL * |b|` for every coefficient
    pub fn approx_eq(&self, other: &GeoTransform) -> bool {
        self.to_gdal()
            .iter()
            .zip(other.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= Self::ATOL + Self::RTOL * b.abs())
    }
}

impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}, {}, {}]",
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height
        )
    }
}

/// Coordinate reference system, held as its WKT definition.
/// An empty definition means the raster declares no CRS.
///
/// `==` compares the text; use [`Crs::is_equivalent`] to compare the systems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    wkt: String,
}

impl Crs {
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: wkt.into().trim().to_string(),
        }
    }

    pub fn undefined() -> Self {
        Self::default()
    }

    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    pub fn is_defined(&self) -> bool {
        !self.wkt.is_empty()
    }

    /// True when both definitions describe the same system according to
    /// GDAL/PROJ, whatever their WKT flavour. An undefined CRS only matches
    /// another undefined one, and an unparsable definition only matches itself.
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        if self.wkt == other.wkt {
            return true;
        }
        if !self.is_defined() || !other.is_defined() {
            return false;
        }
        match (
            SpatialRef::from_definition(&self.wkt),
            SpatialRef::from_definition(&other.wkt),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_defined() {
            write!(f, "{}", self.wkt)
        } else {
            write!(f, "<undefined>")
        }
    }
}

/// Pixel grid a raster lives on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub crs: Crs,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
}

impl GridSpec {
    pub fn new(crs: Crs, transform: GeoTransform, width: usize, height: usize) -> Self {
        Self {
            crs,
            transform,
            width,
            height,
        }
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Georeferenced raster held in memory
#[derive(Debug, Clone)]
pub struct Raster {
    pub grid: GridSpec,
    pub bands: BandStack,
    /// Declared no-data sentinel, if any
    pub nodata: Option<f64>,
}

impl Raster {
    pub fn new(grid: GridSpec, bands: BandStack, nodata: Option<f64>) -> BathyResult<Self> {
        let (_, rows, cols) = bands.dim();
        if (rows, cols) != grid.shape() {
            return Err(BathyError::ShapeMismatch {
                expected: grid.shape(),
                found: (rows, cols),
            });
        }

        Ok(Self { grid, bands, nodata })
    }

    pub fn single_band(grid: GridSpec, band: Band, nodata: Option<f64>) -> BathyResult<Self> {
        Self::new(grid, band.insert_axis(Axis(0)), nodata)
    }

    pub fn band_count(&self) -> usize {
        self.bands.len_of(Axis(0))
    }

    /// 1-based band access, as GDAL numbers bands
    pub fn band(&self, index: usize) -> BathyResult<ArrayView2<'_, f32>> {
        if index == 0 || index > self.band_count() {
            return Err(BathyError::BandCount {
                requested: index,
                available: self.band_count(),
            });
        }
        Ok(self.bands.index_axis(Axis(0), index - 1))
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }
}

/// Linear calibration from predicted values to true depth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub slope: f64,
    pub intercept: f64,
}

impl Calibration {
    pub fn apply(&self, predicted: f64) -> f64 {
        self.slope * predicted + self.intercept
    }

    pub fn equation(&self) -> String {
        format!(
            "True Depth (meters) = {:.4} * Predicted Value (0-255) + ({:.4})",
            self.slope, self.intercept
        )
    }
}

/// Scalar results of one accuracy analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub pearson_r: f64,
    pub p_value: f64,
    pub calibration: Calibration,
    pub rmse: f64,
    pub mae: f64,
    pub valid_pixels: usize,
}

/// Error types for bathymetry processing
#[derive(Debug, thiserror::Error)]
pub enum BathyError {
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Shape mismatch: expected {expected:?} (rows, cols), found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Band {requested} requested but the raster has {available} band(s)")]
    BandCount { requested: usize, available: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Degenerate statistics: {0}")]
    Degenerate(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Plot rendering error: {0}")]
    Plot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for bathymetry operations
pub type BathyResult<T> = Result<T, BathyError>;
