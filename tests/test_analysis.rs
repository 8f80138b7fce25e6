mod common;

use approx::assert_relative_eq;
use bathyfit::config::AnalysisConfig;
use bathyfit::core::plots::{COMPARISON_FILE, DENSITY_FILE, ERROR_MAP_FILE, HISTOGRAM_FILE};
use bathyfit::core::{run_analysis, REPORT_FILE};
use bathyfit::types::BandStack;
use bathyfit::BathyError;
use common::{north_up_grid, utm17n, write_geotiff, NODATA};
use image::{GrayImage, Luma};
use tempfile::tempdir;

const ROWS: usize = 40;
const COLS: usize = 50;

fn gray_level(row: usize, col: usize) -> u8 {
    ((row * 5 + col * 3) % 256) as u8
}

#[test]
fn test_full_analysis_writes_report_and_plots() {
    let dir = tempdir().unwrap();
    let predicted = dir.path().join("model_depth_gray.png");
    let truth = dir.path().join("bathymetry_aligned.tif");
    let output_dir = dir.path().join("analysis_results");

    GrayImage::from_fn(COLS as u32, ROWS as u32, |x, y| {
        Luma([gray_level(y as usize, x as usize)])
    })
    .save(&predicted)
    .unwrap();

    // Depth is 0.04 m per gray level plus a small periodic disturbance; the
    // first five rows lie outside the survey
    let depths = BandStack::from_shape_fn((1, ROWS, COLS), |(_, i, j)| {
        if i < 5 {
            NODATA as f32
        } else {
            0.04 * gray_level(i, j) as f32 + ((i + 2 * j) % 5) as f32 * 0.02
        }
    });
    write_geotiff(
        &truth,
        north_up_grid(utm17n(), (350_000.0, 3_100_000.0), 10.0, COLS, ROWS),
        depths,
        Some(NODATA),
    );

    let config = AnalysisConfig {
        predicted,
        truth,
        output_dir: output_dir.clone(),
        ..AnalysisConfig::default()
    };
    let report = run_analysis(&config).unwrap();

    assert_eq!(report.valid_pixels, (ROWS - 5) * COLS);
    assert_relative_eq!(report.calibration.slope, 0.04, max_relative = 0.05);
    assert!(report.pearson_r > 0.99);
    assert!(report.p_value < 1e-3);
    assert!(report.rmse < 0.1);
    assert!(report.mae <= report.rmse);

    let text = std::fs::read_to_string(output_dir.join(REPORT_FILE)).unwrap();
    assert!(text.starts_with(&"=".repeat(30)));
    assert!(text.contains("Analysis Report for Depth Prediction Model"));
    assert!(text.contains("Root Mean Square Error (RMSE)"));

    for name in [COMPARISON_FILE, DENSITY_FILE, ERROR_MAP_FILE, HISTOGRAM_FILE] {
        let path = output_dir.join(name);
        assert!(path.exists(), "{} missing", name);
        assert!(image::open(&path).is_ok());
    }
}

#[test]
fn test_shape_mismatch_writes_nothing() {
    let dir = tempdir().unwrap();
    let predicted = dir.path().join("pred.tif");
    let truth = dir.path().join("truth.tif");
    let output_dir = dir.path().join("results");

    write_geotiff(
        &predicted,
        north_up_grid(utm17n(), (0.0, 0.0), 1.0, 10, 10),
        BandStack::ones((1, 10, 10)),
        None,
    );
    write_geotiff(
        &truth,
        north_up_grid(utm17n(), (0.0, 0.0), 1.0, 10, 12),
        BandStack::ones((1, 12, 10)),
        Some(NODATA),
    );

    let config = AnalysisConfig {
        predicted,
        truth,
        output_dir: output_dir.clone(),
        ..AnalysisConfig::default()
    };
    assert!(matches!(
        run_analysis(&config),
        Err(BathyError::ShapeMismatch {
            expected: (12, 10),
            found: (10, 10)
        })
    ));
    assert!(!output_dir.exists());
}
