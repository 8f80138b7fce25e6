//! Core bathymetry processing modules

pub mod alignment;
pub mod reproject;
pub mod visualize;
pub mod grayscale;
pub mod stats;
pub mod accuracy;
pub mod report;
pub mod plots;
pub mod colormap;

// Re-export main types
pub use alignment::{check_alignment, run_alignment_check, AlignmentReport, Check};
pub use reproject::{
    point_transform_for, reproject_band, run_reproject, GdalCoordTransform, IdentityTransform,
    PointTransform, ReprojectStats,
};
pub use visualize::{run_visualize, stretch_to_rgb, stretch_value};
pub use grayscale::{run_grayscale, to_template_grayscale};
pub use accuracy::{analyze, run_analysis, Analysis};
pub use report::{render_report, save_report, REPORT_FILE};
pub use colormap::ColorRamp;
