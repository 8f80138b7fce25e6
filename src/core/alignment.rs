//! Grid alignment check between two rasters.
//!
//! Two rasters are pixel-aligned when their CRS, geotransform and pixel
//! dimensions all match. Any mismatch means the candidate must be
//! reprojected onto the reference grid before pixel-wise comparison.

use crate::config::AlignmentConfig;
use crate::io::read_grid;
use crate::types::{BathyResult, Crs, GeoTransform, GridSpec};
use std::fmt;

/// Outcome of comparing one grid property
#[derive(Debug, Clone, PartialEq)]
pub struct Check<T> {
    pub matches: bool,
    pub reference: T,
    pub candidate: T,
}

impl<T: Clone> Check<T> {
    fn new(matches: bool, reference: &T, candidate: &T) -> Self {
        Self {
            matches,
            reference: reference.clone(),
            candidate: candidate.clone(),
        }
    }
}

/// Result of an alignment check
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentReport {
    pub crs: Check<Crs>,
    pub transform: Check<GeoTransform>,
    /// (rows, cols)
    pub shape: Check<(usize, usize)>,
}

impl AlignmentReport {
    pub fn is_aligned(&self) -> bool {
        self.crs.matches && self.transform.matches && self.shape.matches
    }

    /// One line per failed check, naming both differing values
    pub fn mismatches(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.crs.matches {
            lines.push(format!(
                "CRS differs: reference {} / candidate {}",
                self.crs.reference, self.crs.candidate
            ));
        }
        if !self.transform.matches {
            lines.push(format!(
                "Transform differs: reference {} / candidate {}",
                self.transform.reference, self.transform.candidate
            ));
        }
        if !self.shape.matches {
            lines.push(format!(
                "Shape differs: reference {:?} / candidate {:?}",
                self.shape.reference, self.shape.candidate
            ));
        }
        lines
    }
}

impl fmt::Display for AlignmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CRS match: {}", self.crs.matches)?;
        writeln!(f, "Transform match: {}", self.transform.matches)?;
        write!(f, "Shape match: {}", self.shape.matches)
    }
}

/// Compares CRS (by definition, see [`Crs::is_equivalent`]), transform
/// (within [`GeoTransform::approx_eq`]) and shape (exact)
pub fn check_alignment(reference: &GridSpec, candidate: &GridSpec) -> AlignmentReport {
    AlignmentReport {
        crs: Check::new(
            reference.crs.is_equivalent(&candidate.crs),
            &reference.crs,
            &candidate.crs,
        ),
        transform: Check::new(
            reference.transform.approx_eq(&candidate.transform),
            &reference.transform,
            &candidate.transform,
        ),
        shape: Check::new(
            reference.shape() == candidate.shape(),
            &reference.shape(),
            &candidate.shape(),
        ),
    }
}

/// Reads both grids and logs the verdict
pub fn run_alignment_check(config: &AlignmentConfig) -> BathyResult<AlignmentReport> {
    log::info!("Verifying data alignment");
    let reference = read_grid(&config.reference)?;
    let candidate = read_grid(&config.candidate)?;

    let report = check_alignment(&reference, &candidate);
    log::info!("CRS match: {}", report.crs.matches);
    log::info!("Transform match: {}", report.transform.matches);
    log::info!("Shape match: {}", report.shape.matches);
    for line in report.mismatches() {
        log::info!("  - {}", line);
    }

    if report.is_aligned() {
        log::info!("Datasets are aligned and can be compared pixel by pixel");
    } else {
        log::warn!("Datasets are not aligned; reproject the candidate onto the reference grid");
    }

    Ok(report)
}
