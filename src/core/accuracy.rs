//! Accuracy analysis of a predicted depth raster against ground truth.
//!
//! The predicted raster is in relative units (0-255 gray levels); a linear
//! calibration fitted by least squares maps it to metres before the error
//! statistics are computed.

use crate::config::AnalysisConfig;
use crate::core::plots;
use crate::core::report::save_report;
use crate::core::stats::{self, MaskedPairs};
use crate::io::{ensure_exists, read_band};
use crate::types::{AnalysisReport, BathyError, BathyResult, ValidMask};
use ndarray::{Array2, ArrayView2};

/// Everything derived from one analysis run
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: AnalysisReport,
    pub pairs: MaskedPairs,
    /// Calibrated predictions, aligned with `pairs`
    pub calibrated: Vec<f64>,
    /// `truth - calibrated`, aligned with `pairs`
    pub residuals: Vec<f64>,
    pub mask: ValidMask,
}

impl Analysis {
    /// Residuals scattered back onto the raster grid. NaN where the mask is false.
    pub fn residual_map(&self) -> Array2<f64> {
        let mut map = Array2::from_elem(self.mask.dim(), f64::NAN);
        let cells = self
            .mask
            .indexed_iter()
            .filter_map(|(idx, &valid)| valid.then_some(idx));
        for (idx, &residual) in cells.zip(&self.residuals) {
            map[idx] = residual;
        }
        map
    }

    pub fn residual_mean(&self) -> f64 {
        stats::mean(&self.residuals)
    }

    pub fn residual_std(&self) -> f64 {
        stats::std_dev(&self.residuals)
    }
}

/// Masks no-data pixels of `truth`, fits the calibration and computes the error statistics
pub fn analyze(
    predicted: ArrayView2<f32>,
    truth: ArrayView2<f32>,
    nodata: Option<f64>,
) -> BathyResult<Analysis> {
    let mask = stats::valid_mask(truth, nodata);
    let pairs = MaskedPairs::extract(predicted, truth, &mask)?;
    log::info!("Found {} valid pixels for analysis", pairs.len());

    let (pearson_r, p_value) = stats::pearson(&pairs.predicted, &pairs.truth)?;
    let calibration = stats::linear_fit(&pairs.predicted, &pairs.truth)?;

    let calibrated: Vec<f64> = pairs
        .predicted
        .iter()
        .map(|&p| calibration.apply(p))
        .collect();
    let residuals: Vec<f64> = pairs
        .truth
        .iter()
        .zip(&calibrated)
        .map(|(t, c)| t - c)
        .collect();

    let report = AnalysisReport {
        pearson_r,
        p_value,
        calibration,
        rmse: stats::rmse(&pairs.truth, &calibrated),
        mae: stats::mae(&pairs.truth, &calibrated),
        valid_pixels: pairs.len(),
    };

    Ok(Analysis {
        report,
        pairs,
        calibrated,
        residuals,
        mask,
    })
}

/// Loads both rasters, analyses them, and writes the report and the four plots
pub fn run_analysis(config: &AnalysisConfig) -> BathyResult<AnalysisReport> {
    config.validate()?;

    log::info!("Loading and preparing data");
    ensure_exists(&config.predicted)?;
    ensure_exists(&config.truth)?;

    let predicted = read_band(&config.predicted, 1)?;
    let truth = read_band(&config.truth, 1)?;
    if predicted.shape() != truth.shape() {
        return Err(BathyError::ShapeMismatch {
            expected: truth.shape(),
            found: predicted.shape(),
        });
    }
    if truth.nodata.is_none() {
        log::warn!("Ground truth declares no nodata value; every finite pixel is analysed");
    }

    log::info!("Performing quantitative analysis");
    let predicted_band = predicted.band(1)?;
    let truth_band = truth.band(1)?;
    let analysis = analyze(predicted_band, truth_band, truth.nodata)?;

    let report = &analysis.report;
    log::info!("Pearson R: {:.4} (p = {:.4e})", report.pearson_r, report.p_value);
    log::info!("{}", report.calibration.equation());
    log::info!("RMSE: {:.4} m, MAE: {:.4} m", report.rmse, report.mae);

    save_report(report, &config.output_dir)?;
    plots::render_all(&analysis, predicted_band, truth_band, config)?;

    log::info!(
        "Analysis completed; results are in {}",
        config.output_dir.display()
    );
    Ok(analysis.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;

    #[test]
    fn test_three_pixel_scenario() {
        let predicted = array![[0.0f32, 128.0], [255.0, 77.0]];
        let truth = array![[0.0f32, 5.0], [10.0, -9999.0]];

        let analysis = analyze(predicted.view(), truth.view(), Some(-9999.0)).unwrap();
        let report = &analysis.report;

        assert_eq!(report.valid_pixels, 3);
        assert_relative_eq!(report.calibration.slope, 10.0 / 255.0, max_relative = 1e-3);
        assert_abs_diff_eq!(report.calibration.intercept, 0.0, epsilon = 0.01);
        assert!(report.rmse < 0.02);
        assert!(report.mae < 0.02);
        assert_abs_diff_eq!(report.pearson_r, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_exact_calibration_has_zero_error() {
        let predicted = Array2::from_shape_fn((6, 5), |(i, j)| (i * 5 + j) as f32 * 8.0);
        let truth = predicted.mapv(|p| 0.04 * p - 1.5);

        let analysis = analyze(predicted.view(), truth.view(), None).unwrap();
        let report = &analysis.report;

        assert_abs_diff_eq!(report.rmse, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(report.mae, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(report.pearson_r, 1.0, epsilon = 1e-9);
        assert_relative_eq!(report.calibration.slope, 0.04, max_relative = 1e-5);
        assert_relative_eq!(report.calibration.intercept, -1.5, max_relative = 1e-5);
    }

    #[test]
    fn test_negative_relation() {
        let predicted = Array2::from_shape_fn((4, 4), |(i, j)| (i * 4 + j) as f32);
        let truth = predicted.mapv(|p| 20.0 - 2.0 * p);

        let report = analyze(predicted.view(), truth.view(), None).unwrap().report;
        assert_abs_diff_eq!(report.pearson_r, -1.0, epsilon = 1e-9);
        assert_relative_eq!(report.calibration.slope, -2.0, max_relative = 1e-9);
        assert_relative_eq!(report.calibration.intercept, 20.0, max_relative = 1e-9);
    }

    #[test]
    fn test_residual_map_follows_mask() {
        let predicted = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let truth = array![[1.0f32, -9999.0, 2.0], [5.0, 4.0, -9999.0]];

        let analysis = analyze(predicted.view(), truth.view(), Some(-9999.0)).unwrap();
        let map = analysis.residual_map();

        assert_eq!(map.dim(), (2, 3));
        assert!(map[[0, 1]].is_nan());
        assert!(map[[1, 2]].is_nan());
        assert_abs_diff_eq!(map[[0, 0]], analysis.residuals[0], epsilon = 1e-12);
        assert_abs_diff_eq!(map[[1, 1]], analysis.residuals[3], epsilon = 1e-12);
        // OLS residuals sum to zero
        assert_abs_diff_eq!(analysis.residual_mean(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_shape_mismatch() {
        let predicted = Array2::<f32>::zeros((3, 3));
        let truth = Array2::<f32>::zeros((3, 4));
        assert!(matches!(
            analyze(predicted.view(), truth.view(), None),
            Err(BathyError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_everything_masked() {
        let predicted = Array2::<f32>::ones((2, 2));
        let truth = Array2::<f32>::from_elem((2, 2), -9999.0);
        assert!(matches!(
            analyze(predicted.view(), truth.view(), Some(-9999.0)),
            Err(BathyError::Degenerate(_))
        ));
    }
}
