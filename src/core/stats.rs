//! Masked statistics shared by the accuracy analysis.
//!
//! Masking happens once, in [`MaskedPairs::extract`]; every statistic below
//! works on the flattened, equal-length sequences it produces.

use crate::types::{BathyError, BathyResult, Calibration, ValidMask};
use ndarray::ArrayView2;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// True for NaN samples and for samples equal to the declared sentinel
pub fn is_nodata(value: f32, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(sentinel) => value as f64 == sentinel || value == sentinel as f32,
        None => false,
    }
}

/// Valid where the pixel is not no-data. Without a declared sentinel only NaN is masked.
pub fn valid_mask(band: ArrayView2<f32>, nodata: Option<f64>) -> ValidMask {
    band.mapv(|value| !is_nodata(value, nodata))
}

/// Predicted and true values at the valid pixels, in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedPairs {
    pub predicted: Vec<f64>,
    pub truth: Vec<f64>,
}

impl MaskedPairs {
    pub fn extract(
        predicted: ArrayView2<f32>,
        truth: ArrayView2<f32>,
        mask: &ValidMask,
    ) -> BathyResult<Self> {
        if predicted.dim() != truth.dim() {
            return Err(BathyError::ShapeMismatch {
                expected: truth.dim(),
                found: predicted.dim(),
            });
        }
        if mask.dim() != truth.dim() {
            return Err(BathyError::ShapeMismatch {
                expected: truth.dim(),
                found: mask.dim(),
            });
        }

        let capacity = mask.iter().filter(|&&valid| valid).count();
        let mut pairs = Self {
            predicted: Vec::with_capacity(capacity),
            truth: Vec::with_capacity(capacity),
        };
        for (idx, &valid) in mask.indexed_iter() {
            if valid {
                pairs.predicted.push(predicted[idx] as f64);
                pairs.truth.push(truth[idx] as f64);
            }
        }
        Ok(pairs)
    }

    pub fn len(&self) -> usize {
        self.truth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.truth.is_empty()
    }
}

/// Arithmetic mean; NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n)
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

struct Moments {
    mean_x: f64,
    mean_y: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

fn moments(x: &[f64], y: &[f64]) -> BathyResult<Moments> {
    if x.len() != y.len() {
        return Err(BathyError::Processing(format!(
            "Sequences differ in length: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(BathyError::Degenerate(format!(
            "at least 2 valid pixels are required, found {}",
            x.len()
        )));
    }

    let mean_x = mean(x);
    let mean_y = mean(y);
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        let (dx, dy) = (a - mean_x, b - mean_y);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    Ok(Moments {
        mean_x,
        mean_y,
        sxx,
        syy,
        sxy,
    })
}

/// Pearson correlation coefficient and its two-sided p-value
/// (Student's t with n - 2 degrees of freedom).
pub fn pearson(x: &[f64], y: &[f64]) -> BathyResult<(f64, f64)> {
    let m = moments(x, y)?;
    if m.sxx == 0.0 || m.syy == 0.0 {
        return Err(BathyError::Degenerate(
            "correlation is undefined for a constant sequence".to_string(),
        ));
    }

    let r = (m.sxy / (m.sxx * m.syy).sqrt()).clamp(-1.0, 1.0);
    let n = x.len();
    let p = if n == 2 {
        1.0
    } else if r.abs() == 1.0 {
        0.0
    } else {
        let df = (n - 2) as f64;
        let t = r * (df / (1.0 - r * r)).sqrt();
        let students_t = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| BathyError::Degenerate(format!("Student's t distribution: {}", e)))?;
        (2.0 * students_t.sf(t.abs())).min(1.0)
    };

    Ok((r, p))
}

/// Ordinary least squares fit of `y` as a function of `x`
pub fn linear_fit(x: &[f64], y: &[f64]) -> BathyResult<Calibration> {
    let m = moments(x, y)?;
    if m.sxx == 0.0 {
        return Err(BathyError::Degenerate(
            "regression is undefined when every predicted value is equal".to_string(),
        ));
    }

    let slope = m.sxy / m.sxx;
    Ok(Calibration {
        slope,
        intercept: m.mean_y - slope * m.mean_x,
    })
}

/// Root mean square of `truth - estimate`
pub fn rmse(truth: &[f64], estimate: &[f64]) -> f64 {
    let squared: Vec<f64> = truth.iter().zip(estimate).map(|(t, e)| (t - e).powi(2)).collect();
    mean(&squared).sqrt()
}

/// Mean absolute value of `truth - estimate`
pub fn mae(truth: &[f64], estimate: &[f64]) -> f64 {
    let absolute: Vec<f64> = truth.iter().zip(estimate).map(|(t, e)| (t - e).abs()).collect();
    mean(&absolute)
}

/// `q`-th percentile (0..=100) of the finite values, linearly interpolated
/// between closest ranks. `None` when there are no finite values.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}
