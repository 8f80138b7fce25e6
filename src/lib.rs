//! bathyfit: geospatial preprocessing and accuracy analysis for satellite-derived bathymetry
//!
//! The crate takes a multispectral satellite scene and a ground-truth bathymetry
//! survey through the steps needed to evaluate a depth prediction model:
//! grid alignment checks, reprojection of the survey onto the scene grid,
//! contrast-stretched RGB rendering, grayscale resizing of the model output,
//! and a calibrated accuracy analysis with a text report and diagnostic plots.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AnalysisReport, Band, BandStack, BathyError, BathyResult, Calibration, Crs, GeoTransform,
    GridSpec, Raster, ValidMask,
};

pub use config::{
    from_json_file, AlignmentConfig, AnalysisConfig, ClipRange, GrayscaleConfig, PipelineConfig,
    ReprojectConfig, VisualizeConfig,
};

pub use crate::core::{
    run_alignment_check, run_analysis, run_grayscale, run_reproject, run_visualize,
};
