//! Run configuration for each processing step.
//!
//! Every step takes its own configuration struct. Defaults reproduce the
//! file layout of the Tampa Bay workflow; any of them can be loaded from JSON.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::types::{BathyError, BathyResult};

/// Loads any configuration struct from a JSON file
pub fn from_json_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> BathyResult<T> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)?;
    Ok(config)
}

/// Grids compared by the alignment check
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Satellite image whose grid is the reference
    pub reference: PathBuf,
    /// Bathymetry raster checked against the reference
    pub candidate: PathBuf,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            reference: PathBuf::from("tampa_bay_s2_final_subset.tif"),
            candidate: PathBuf::from("exportImage.tiff"),
        }
    }
}

/// Reprojection of a source band onto a reference grid
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReprojectConfig {
    pub reference: PathBuf,
    pub source: PathBuf,
    pub output: PathBuf,
    /// Written into unmapped pixels and declared as the output's no-data value
    pub nodata: f32,
    /// 1-based band of the source raster to resample
    pub source_band: usize,
    /// GTiff COMPRESS creation option
    pub compression: Option<String>,
}

impl Default for ReprojectConfig {
    fn default() -> Self {
        Self {
            reference: PathBuf::from("tampa_bay_s2_final_subset.tif"),
            source: PathBuf::from("exportImage.tiff"),
            output: PathBuf::from("bathymetry_aligned.tif"),
            nodata: -9999.0,
            source_band: 1,
            compression: Some("LZW".to_string()),
        }
    }
}

impl ReprojectConfig {
    pub fn validate(&self) -> BathyResult<()> {
        if !self.nodata.is_finite() {
            return Err(BathyError::InvalidConfig(
                "nodata sentinel must be a finite value".to_string(),
            ));
        }
        if self.source_band == 0 {
            return Err(BathyError::InvalidConfig(
                "source_band is 1-based".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expected data range of a sensor, mapped onto 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ClipRange {
    pub min: f32,
    pub max: f32,
}

impl Default for ClipRange {
    /// Sentinel-2 surface reflectance stretch used for the Tampa Bay scene
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1500.0,
        }
    }
}

impl ClipRange {
    pub fn new(min: f32, max: f32) -> BathyResult<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> BathyResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(BathyError::InvalidConfig(
                "clip range bounds must be finite".to_string(),
            ));
        }
        if self.max <= self.min {
            return Err(BathyError::InvalidConfig(format!(
                "clip range max ({}) must be greater than min ({})",
                self.max, self.min
            )));
        }
        Ok(())
    }
}

/// Export of a multi-band raster as an 8-bit image
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisualizeConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub range: ClipRange,
    /// 1-based bands written as the image channels, in order
    pub bands: Vec<usize>,
}

impl Default for VisualizeConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("tampa_bay_s2_final_subset.tif"),
            output: PathBuf::from("output_rgb_image_for_model.png"),
            range: ClipRange::default(),
            bands: vec![1, 2, 3],
        }
    }
}

/// Conversion of an arbitrary image to a grayscale image on a template's pixel grid
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrayscaleConfig {
    pub image: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
}

impl Default for GrayscaleConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::from("gpt-image.png"),
            template: PathBuf::from("bathymetry_aligned.tif"),
            output: PathBuf::from("gpt-output.png"),
        }
    }
}

/// Accuracy analysis of a predicted depth raster against ground truth
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub predicted: PathBuf,
    pub truth: PathBuf,
    pub output_dir: PathBuf,
    /// Bins per axis of the density scatter plot
    pub hexbin_gridsize: usize,
    pub histogram_bins: usize,
    /// Percentile of |residual| that bounds the error map colour scale
    pub error_percentile: f64,
    /// TrueType font for plot titles; common system fonts are tried when unset
    pub font: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            predicted: PathBuf::from("output_rgb_image_for_model_depth_gray.png"),
            truth: PathBuf::from("bathymetry_aligned.tif"),
            output_dir: PathBuf::from("analysis_results"),
            hexbin_gridsize: 50,
            histogram_bins: 50,
            error_percentile: 98.0,
            font: None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> BathyResult<()> {
        if self.hexbin_gridsize == 0 || self.histogram_bins == 0 {
            return Err(BathyError::InvalidConfig(
                "bin counts must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.error_percentile) {
            return Err(BathyError::InvalidConfig(format!(
                "error_percentile must be within [0, 100], got {}",
                self.error_percentile
            )));
        }
        Ok(())
    }
}

/// One file driving several steps. Absent sections are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub alignment: Option<AlignmentConfig>,
    pub reproject: Option<ReprojectConfig>,
    pub visualize: Option<VisualizeConfig>,
    pub grayscale: Option<GrayscaleConfig>,
    pub analysis: Option<AnalysisConfig>,
}
