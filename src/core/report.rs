use crate::types::{AnalysisReport, BathyResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "analysis_report.txt";

const BANNER_WIDTH: usize = 30;

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// `printf`-style `%.<digits>g`: fixed notation when the decimal exponent is
/// in `-4..digits`, scientific otherwise, trailing zeros removed.
pub fn format_general(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{}", value);
    }
    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// Fixed-layout text report: banner, correlation, p-value, calibration, RMSE, MAE
pub fn render_report(report: &AnalysisReport) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let mut text = String::new();

    text.push_str(&format!("{}\n", banner));
    text.push_str("  Analysis Report for Depth Prediction Model\n");
    text.push_str(&format!("{}\n\n", banner));
    text.push_str(&format!(
        "Pearson Correlation Coefficient (R): {:.4}\n",
        report.pearson_r
    ));
    text.push_str(&format!(
        "P-value: {} (p < 0.001 indicates high statistical significance)\n\n",
        format_general(report.p_value, 4)
    ));
    text.push_str("Linear Regression Calibration Equation:\n");
    text.push_str(&format!("  {}\n\n", report.calibration.equation()));
    text.push_str(&format!(
        "Root Mean Square Error (RMSE): {:.4} meters\n",
        report.rmse
    ));
    text.push_str(&format!("Mean Absolute Error (MAE): {:.4} meters\n", report.mae));
    text
}

/// Writes the report into `output_dir`, creating the directory if needed
pub fn save_report<P: AsRef<Path>>(
    report: &AnalysisReport,
    output_dir: P,
) -> BathyResult<PathBuf> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let report_path = output_dir.join(REPORT_FILE);
    fs::write(&report_path, render_report(report))?;
    log::info!("Analysis report saved to: {}", report_path.display());
    Ok(report_path)
}
