//! Diagnostic figures of an accuracy analysis.
//!
//! Titles and axis labels need a TrueType font. The configured font is tried
//! first, then a few common system locations; without one the figures are
//! drawn without text and the numbers are only in the report and the log.

use crate::config::AnalysisConfig;
use crate::core::accuracy::Analysis;
use crate::core::colormap::ColorRamp;
use crate::core::stats::{self, MaskedPairs};
use crate::types::{BathyError, BathyResult, Calibration, ValidMask};
use ndarray::{Array2, ArrayView2};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const COMPARISON_FILE: &str = "comparison_side_by_side.png";
pub const DENSITY_FILE: &str = "density_scatter_plot.png";
pub const ERROR_MAP_FILE: &str = "error_map.png";
pub const HISTOGRAM_FILE: &str = "error_histogram.png";

// Longer side of a raster panel
const PANEL_SIZE: u32 = 600;
const COLORBAR_WIDTH: u32 = 24;
const GAP: u32 = 16;
const CHART_SIZE: (u32, u32) = (800, 700);
const CHART_MARGIN: u32 = 20;
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);
const SPREAD_COLOR: RGBColor = RGBColor(128, 128, 128);

const FONT_FAMILY: &str = "sans-serif";
const TITLE_SIZE: i32 = 22;
const LABEL_SIZE: i32 = 14;
// Extra image height per title line above a raster panel
const TITLE_BAND: u32 = 40;
const X_LABEL_AREA: u32 = 40;
const Y_LABEL_AREA: u32 = 60;

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_READY: OnceLock<bool> = OnceLock::new();

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn plot_err<E: std::fmt::Display>(err: E) -> BathyError {
    BathyError::Plot(err.to_string())
}

/// First existing font file: `configured`, then `candidates` in order
pub fn find_font(configured: Option<&Path>, candidates: &[&str]) -> Option<PathBuf> {
    configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(candidates.iter().map(PathBuf::from))
        .find(|path| path.is_file())
}

fn register_plot_font(path: &Path) -> BathyResult<()> {
    // plotters keeps registered font data for the life of the process
    let bytes: &'static [u8] = Box::leak(fs::read(path)?.into_boxed_slice());
    register_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| BathyError::Plot(format!("{} is not a usable font", path.display())))
}

/// Registers the plot font once per process. The first call decides; false
/// means figures are drawn without text.
pub fn text_available(configured: Option<&Path>) -> bool {
    *FONT_READY.get_or_init(|| {
        let Some(path) = find_font(configured, SYSTEM_FONTS) else {
            log::warn!("No TrueType font found; plots are drawn without titles or labels");
            return false;
        };
        match register_plot_font(&path) {
            Ok(()) => {
                log::debug!("Plot font: {}", path.display());
                true
            }
            Err(e) => {
                log::warn!("{}; plots are drawn without titles or labels", e);
                false
            }
        }
    })
}

pub fn histogram_title(mean: f64, std: f64) -> String {
    format!(
        "Error Distribution Histogram (Mean: {:.2}, Std: {:.2})",
        mean, std
    )
}

/// Title and axis descriptions of a chart
struct ChartText<'t> {
    title: String,
    x_desc: &'t str,
    y_desc: &'t str,
}

fn build_chart<'a, 'b>(
    root: &'a Area<'b>,
    text: Option<&ChartText>,
    x: Range<f64>,
    y: Range<f64>,
) -> BathyResult<Chart<'a, 'b>> {
    let mut builder = ChartBuilder::on(root);
    builder.margin(CHART_MARGIN);
    if let Some(text) = text {
        builder
            .caption(&text.title, (FONT_FAMILY, TITLE_SIZE))
            .x_label_area_size(X_LABEL_AREA)
            .y_label_area_size(Y_LABEL_AREA);
    }
    let mut chart = builder.build_cartesian_2d(x, y).map_err(plot_err)?;
    if let Some(text) = text {
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(text.x_desc)
            .y_desc(text.y_desc)
            .label_style((FONT_FAMILY, LABEL_SIZE))
            .draw()
            .map_err(plot_err)?;
    }
    Ok(chart)
}

/// The part of `area` below `title`, or all of it when there is no title
fn below_title<'b>(area: &Area<'b>, title: Option<&str>) -> BathyResult<Area<'b>> {
    match title {
        Some(title) => area
            .titled(title, (FONT_FAMILY, TITLE_SIZE))
            .map_err(plot_err),
        None => Ok(area.margin(0, 0, 0, 0)),
    }
}

/// Counts of (x, y) samples on a regular `gridsize` x `gridsize` grid.
/// `counts` is indexed `[y_bin, x_bin]`.
#[derive(Debug, Clone)]
pub struct DensityGrid {
    pub counts: Array2<usize>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl DensityGrid {
    pub fn bin_size(&self) -> (f64, f64) {
        let (ny, nx) = self.counts.dim();
        (
            (self.x_range.1 - self.x_range.0) / nx as f64,
            (self.y_range.1 - self.y_range.0) / ny as f64,
        )
    }
}

/// Probability-density histogram with `edges.len() == density.len() + 1`
#[derive(Debug, Clone)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub density: Vec<f64>,
}

/// Min and max of the finite values; a zero-width range is widened by 0.5 either side
fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return None;
    }
    if lo == hi {
        return Some((lo - 0.5, hi + 0.5));
    }
    Some((lo, hi))
}

fn bin_index(value: f64, (lo, hi): (f64, f64), bins: usize) -> usize {
    let idx = ((value - lo) / (hi - lo) * bins as f64).floor();
    (idx.max(0.0) as usize).min(bins - 1)
}

pub fn density_grid(x: &[f64], y: &[f64], gridsize: usize) -> Option<DensityGrid> {
    if gridsize == 0 {
        return None;
    }
    let finite: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .map(|(&a, &b)| (a, b))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();

    let x_range = padded_range(finite.iter().map(|p| p.0))?;
    let y_range = padded_range(finite.iter().map(|p| p.1))?;

    let mut counts = Array2::zeros((gridsize, gridsize));
    for &(a, b) in &finite {
        counts[[bin_index(b, y_range, gridsize), bin_index(a, x_range, gridsize)]] += 1;
    }
    Some(DensityGrid {
        counts,
        x_range,
        y_range,
    })
}

pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    if bins == 0 {
        return None;
    }
    let range = padded_range(values.iter().copied())?;
    let width = (range.1 - range.0) / bins as f64;

    let mut counts = vec![0usize; bins];
    let mut total = 0usize;
    for &v in values.iter().filter(|v| v.is_finite()) {
        counts[bin_index(v, range, bins)] += 1;
        total += 1;
    }

    let edges = (0..=bins).map(|i| range.0 + i as f64 * width).collect();
    let density = counts
        .iter()
        .map(|&c| c as f64 / (total as f64 * width))
        .collect();
    Some(Histogram { edges, density })
}

/// Panel size in pixels keeping the raster's aspect ratio
fn panel_size(rows: usize, cols: usize) -> (u32, u32) {
    let scale = PANEL_SIZE as f64 / rows.max(cols).max(1) as f64;
    (
        ((cols as f64 * scale).round() as u32).max(1),
        ((rows as f64 * scale).round() as u32).max(1),
    )
}

/// Nearest-neighbour fill of `area` from a `rows` x `cols` field
fn draw_field(
    area: &Area,
    rows: usize,
    cols: usize,
    color_at: impl Fn(usize, usize) -> RGBColor,
) -> BathyResult<()> {
    let (width, height) = area.dim_in_pixel();
    for py in 0..height {
        let row = (py as usize * rows / height as usize).min(rows - 1);
        for px in 0..width {
            let col = (px as usize * cols / width as usize).min(cols - 1);
            area.draw_pixel((px as i32, py as i32), &color_at(row, col))
                .map_err(plot_err)?;
        }
    }
    Ok(())
}

fn draw_colorbar(area: &Area, ramp: ColorRamp) -> BathyResult<()> {
    let (width, height) = area.dim_in_pixel();
    let span = height.saturating_sub(1).max(1) as f64;
    for py in 0..height {
        let color = ramp.sample(1.0 - py as f64 / span);
        for px in 0..width {
            area.draw_pixel((px as i32, py as i32), &color).map_err(plot_err)?;
        }
    }
    area.draw(&Rectangle::new(
        [(0, 0), (width as i32 - 1, height as i32 - 1)],
        BLACK.stroke_width(1),
    ))
    .map_err(plot_err)?;
    Ok(())
}

/// Raster panel of `panel_width` pixels followed by its colour bar. `None` and
/// non-finite values are drawn white.
fn draw_panel_with_bar(
    area: &Area,
    panel_width: u32,
    ramp: ColorRamp,
    (vmin, vmax): (f64, f64),
    (rows, cols): (usize, usize),
    value_at: impl Fn(usize, usize) -> Option<f64>,
) -> BathyResult<()> {
    let (panel, rest) = area.split_horizontally(panel_width);
    draw_field(&panel, rows, cols, |r, c| match value_at(r, c) {
        Some(v) if v.is_finite() => ramp.sample_range(v, vmin, vmax),
        _ => WHITE,
    })?;
    draw_colorbar(&rest.margin(0, 0, GAP, GAP), ramp)
}

fn ensure_not_empty(rows: usize, cols: usize) -> BathyResult<()> {
    if rows == 0 || cols == 0 {
        return Err(BathyError::Plot("cannot plot an empty raster".to_string()));
    }
    Ok(())
}

/// Masked ground truth (viridis, masked pixels white) next to the raw prediction (gray)
pub fn render_comparison(
    truth: ArrayView2<f32>,
    mask: &ValidMask,
    predicted: ArrayView2<f32>,
    annotate: bool,
    path: &Path,
) -> BathyResult<()> {
    let (rows, cols) = truth.dim();
    ensure_not_empty(rows, cols)?;
    if predicted.dim() != truth.dim() || mask.dim() != truth.dim() {
        return Err(BathyError::ShapeMismatch {
            expected: truth.dim(),
            found: predicted.dim(),
        });
    }

    let truth_range = padded_range(
        truth
            .iter()
            .zip(mask.iter())
            .filter(|(_, &valid)| valid)
            .map(|(&v, _)| v as f64),
    )
    .unwrap_or((0.0, 1.0));
    let predicted_range = padded_range(predicted.iter().map(|&v| v as f64)).unwrap_or((0.0, 1.0));

    let (panel_width, panel_height) = panel_size(rows, cols);
    let half = panel_width + 2 * GAP + COLORBAR_WIDTH;
    let band = if annotate { 2 * TITLE_BAND } else { 0 };
    let root = BitMapBackend::new(path, (2 * half, panel_height + band)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let titles = annotate.then_some((
        "Ground Truth vs. Model Prediction",
        "Ground Truth (NOAA Bathymetry)",
        "Model Prediction",
    ));
    let body = below_title(&root, titles.map(|t| t.0))?;
    let (left, right) = body.split_horizontally(half);
    let left = below_title(&left, titles.map(|t| t.1))?;
    let right = below_title(&right, titles.map(|t| t.2))?;
    draw_panel_with_bar(
        &left,
        panel_width,
        ColorRamp::Viridis,
        truth_range,
        (rows, cols),
        |r, c| mask[[r, c]].then(|| truth[[r, c]] as f64),
    )?;
    draw_panel_with_bar(
        &right,
        panel_width,
        ColorRamp::Gray,
        predicted_range,
        (rows, cols),
        |r, c| Some(predicted[[r, c]] as f64),
    )?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Binned density of truth against raw prediction with the fitted calibration line in red
pub fn render_density_scatter(
    pairs: &MaskedPairs,
    calibration: &Calibration,
    gridsize: usize,
    annotate: bool,
    path: &Path,
) -> BathyResult<()> {
    let grid = density_grid(&pairs.predicted, &pairs.truth, gridsize)
        .ok_or_else(|| BathyError::Plot("no finite samples for the density plot".to_string()))?;

    let (x0, x1) = grid.x_range;
    let fit = [(x0, calibration.apply(x0)), (x1, calibration.apply(x1))];
    let y0 = grid.y_range.0.min(fit[0].1).min(fit[1].1);
    let y1 = grid.y_range.1.max(fit[0].1).max(fit[1].1);

    let text = annotate.then(|| ChartText {
        title: "2D Density Scatter Plot: Predicted vs. True Depth".to_string(),
        x_desc: "Predicted Value (0-255)",
        y_desc: "True Depth (meters)",
    });
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = build_chart(&root, text.as_ref(), x0..x1, y0..y1)?;

    let max_count = grid.counts.iter().copied().max().unwrap_or(1).max(1) as f64;
    let (bin_w, bin_h) = grid.bin_size();
    chart
        .draw_series(
            grid.counts
                .indexed_iter()
                .filter(|(_, &count)| count > 0)
                .map(|((iy, ix), &count)| {
                    let bx = grid.x_range.0 + ix as f64 * bin_w;
                    let by = grid.y_range.0 + iy as f64 * bin_h;
                    let color = ColorRamp::Viridis.sample(count as f64 / max_count);
                    Rectangle::new([(bx, by), (bx + bin_w, by + bin_h)], color.filled())
                }),
        )
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(fit, RED.stroke_width(2)))
        .map_err(plot_err)?;
    chart
        .plotting_area()
        .draw(&Rectangle::new([(x0, y0), (x1, y1)], BLACK.stroke_width(1)))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Spatial residual map on a diverging ramp symmetric about zero. The bound is
/// the `q`-th percentile of |residual|; it is returned for logging.
pub fn render_error_map(
    residuals: &Array2<f64>,
    q: f64,
    annotate: bool,
    path: &Path,
) -> BathyResult<f64> {
    let (rows, cols) = residuals.dim();
    ensure_not_empty(rows, cols)?;

    let magnitudes: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    let vmax = stats::percentile(&magnitudes, q).unwrap_or(0.0);

    let (panel_width, panel_height) = panel_size(rows, cols);
    let band = if annotate { TITLE_BAND } else { 0 };
    let size = (panel_width + 2 * GAP + COLORBAR_WIDTH, panel_height + band);
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let body = below_title(&root, annotate.then_some("Error Map (True - Predicted)"))?;
    draw_panel_with_bar(
        &body,
        panel_width,
        ColorRamp::CoolWarm,
        (-vmax, vmax),
        (rows, cols),
        |r, c| Some(residuals[[r, c]]),
    )?;

    root.present().map_err(plot_err)?;
    Ok(vmax)
}

fn vertical_line(
    x: f64,
    height: f64,
    style: ShapeStyle,
    dashed: bool,
) -> Vec<PathElement<(f64, f64)>> {
    if !dashed {
        return vec![PathElement::new(vec![(x, 0.0), (x, height)], style)];
    }
    const SEGMENTS: usize = 40;
    let step = height / SEGMENTS as f64;
    (0..SEGMENTS)
        .step_by(2)
        .map(|k| PathElement::new(vec![(x, k as f64 * step), (x, (k + 1) as f64 * step)], style))
        .collect()
}

/// Density histogram of residuals with a dashed zero line, the mean, and mean +/- one std
pub fn render_error_histogram(
    residuals: &[f64],
    bins: usize,
    annotate: bool,
    path: &Path,
) -> BathyResult<()> {
    let hist = histogram(residuals, bins)
        .ok_or_else(|| BathyError::Plot("no finite residuals for the histogram".to_string()))?;
    let mean = stats::mean(residuals);
    let std = stats::std_dev(residuals);
    log::info!("Residual mean: {:.4} m, std: {:.4} m", mean, std);

    let x0 = hist.edges[0];
    let x1 = hist.edges[hist.edges.len() - 1];
    let peak = hist.density.iter().copied().fold(0.0, f64::max);
    let y1 = if peak > 0.0 { peak * 1.05 } else { 1.0 };

    let text = annotate.then(|| ChartText {
        title: histogram_title(mean, std),
        x_desc: "Error (meters)",
        y_desc: "Density",
    });
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = build_chart(&root, text.as_ref(), x0..x1, 0.0..y1)?;

    let boxes = hist
        .density
        .iter()
        .zip(hist.edges.windows(2))
        .map(|(&d, edge)| [(edge[0], 0.0), (edge[1], d)]);
    chart
        .draw_series(boxes.clone().map(|b| Rectangle::new(b, BAR_COLOR.mix(0.75).filled())))
        .map_err(plot_err)?;
    chart
        .draw_series(boxes.map(|b| Rectangle::new(b, BLACK.stroke_width(1))))
        .map_err(plot_err)?;

    let markers = [
        (0.0, RED.stroke_width(2), true),
        (mean, BLACK.stroke_width(2), false),
        (mean - std, SPREAD_COLOR.stroke_width(1), true),
        (mean + std, SPREAD_COLOR.stroke_width(1), true),
    ];
    for (x, style, dashed) in markers {
        if x.is_finite() && (x0..=x1).contains(&x) {
            chart
                .draw_series(vertical_line(x, y1, style, dashed))
                .map_err(plot_err)?;
        }
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Writes the four figures into `config.output_dir` and returns their paths
pub fn render_all(
    analysis: &Analysis,
    predicted: ArrayView2<f32>,
    truth: ArrayView2<f32>,
    config: &AnalysisConfig,
) -> BathyResult<Vec<PathBuf>> {
    let dir = &config.output_dir;
    fs::create_dir_all(dir)?;
    let annotate = text_available(config.font.as_deref());

    let comparison = dir.join(COMPARISON_FILE);
    render_comparison(truth, &analysis.mask, predicted, annotate, &comparison)?;
    log::info!("Comparison plot saved to: {}", comparison.display());

    let density = dir.join(DENSITY_FILE);
    render_density_scatter(
        &analysis.pairs,
        &analysis.report.calibration,
        config.hexbin_gridsize,
        annotate,
        &density,
    )?;
    log::info!("Density scatter plot saved to: {}", density.display());

    let error_map = dir.join(ERROR_MAP_FILE);
    let vmax = render_error_map(
        &analysis.residual_map(),
        config.error_percentile,
        annotate,
        &error_map,
    )?;
    log::info!(
        "Error map saved to: {} (colour scale +/-{:.4} m)",
        error_map.display(),
        vmax
    );

    let error_histogram = dir.join(HISTOGRAM_FILE);
    render_error_histogram(
        &analysis.residuals,
        config.histogram_bins,
        annotate,
        &error_histogram,
    )?;
    log::info!("Error histogram saved to: {}", error_histogram.display());

    Ok(vec![comparison, density, error_map, error_histogram])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::accuracy::analyze;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    #[test]
    fn test_density_grid_counts_every_sample() {
        let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v * 0.5 + 3.0).collect();

        let grid = density_grid(&x, &y, 10).unwrap();
        assert_eq!(grid.counts.dim(), (10, 10));
        assert_eq!(grid.counts.sum(), 100);
        // perfectly linear data fills only the diagonal
        for i in 0..10 {
            assert_eq!(grid.counts[[i, i]], 10);
        }
        assert_eq!(grid.x_range, (0.0, 99.0));
    }

    #[test]
    fn test_density_grid_skips_non_finite() {
        let x = [1.0, f64::NAN, 2.0];
        let y = [1.0, 5.0, f64::INFINITY];
        let grid = density_grid(&x, &y, 4).unwrap();
        assert_eq!(grid.counts.sum(), 1);
        assert!(density_grid(&[f64::NAN], &[1.0], 4).is_none());
    }

    #[test]
    fn test_histogram_integrates_to_one() {
        let values: Vec<f64> = (0..1000).map(|i| ((i * 37) % 101) as f64 - 50.0).collect();
        let hist = histogram(&values, 25).unwrap();

        assert_eq!(hist.edges.len(), 26);
        let area: f64 = hist
            .density
            .iter()
            .zip(hist.edges.windows(2))
            .map(|(d, e)| d * (e[1] - e[0]))
            .sum();
        assert_abs_diff_eq!(area, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_histogram_constant_values() {
        let hist = histogram(&[2.0, 2.0, 2.0], 4).unwrap();
        assert_abs_diff_eq!(hist.edges[0], 1.5);
        assert_abs_diff_eq!(hist.edges[4], 2.5);
    }

    #[test]
    fn test_panel_size_keeps_aspect() {
        assert_eq!(panel_size(100, 200), (600, 300));
        assert_eq!(panel_size(891, 800).1, 600);
        assert_eq!(panel_size(1, 1), (600, 600));
    }

    #[test]
    fn test_histogram_title_two_decimals() {
        assert_eq!(
            histogram_title(0.1234, 3.456),
            "Error Distribution Histogram (Mean: 0.12, Std: 3.46)"
        );
        assert_eq!(
            histogram_title(-0.004, 1.0),
            "Error Distribution Histogram (Mean: -0.00, Std: 1.00)"
        );
    }

    #[test]
    fn test_find_font_prefers_configured_path() {
        let dir = tempdir().unwrap();
        let configured = dir.path().join("custom.ttf");
        let fallback = dir.path().join("fallback.ttf");
        std::fs::write(&configured, b"font").unwrap();
        std::fs::write(&fallback, b"font").unwrap();
        let fallback_str = fallback.to_str().unwrap();

        assert_eq!(
            find_font(Some(configured.as_path()), &[fallback_str]),
            Some(configured.clone())
        );
        assert_eq!(
            find_font(Some(dir.path().join("missing.ttf").as_path()), &[fallback_str]),
            Some(fallback.clone())
        );
        assert_eq!(find_font(None, &["/nonexistent/font.ttf"]), None);
    }

    #[test]
    fn test_annotated_histogram_renders() {
        let dir = tempdir().unwrap();
        let residuals: Vec<f64> = (0..200).map(|i| ((i * 13) % 41) as f64 / 10.0 - 2.0).collect();
        let path = dir.path().join("hist.png");

        let annotate = text_available(None);
        render_error_histogram(&residuals, 20, annotate, &path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), CHART_SIZE);
    }

    #[test]
    fn test_error_map_grows_by_title_band() {
        let dir = tempdir().unwrap();
        let residuals = Array2::from_shape_fn((10, 10), |(i, j)| i as f64 - j as f64);
        let plain = dir.path().join("plain.png");
        render_error_map(&residuals, 98.0, false, &plain).unwrap();
        assert_eq!(image::open(&plain).unwrap().height(), PANEL_SIZE);

        if text_available(None) {
            let titled = dir.path().join("titled.png");
            render_error_map(&residuals, 98.0, true, &titled).unwrap();
            assert_eq!(image::open(&titled).unwrap().height(), PANEL_SIZE + TITLE_BAND);
        }
    }

    #[test]
    fn test_render_all_writes_four_images() {
        let dir = tempdir().unwrap();
        let predicted = Array2::from_shape_fn((20, 30), |(i, j)| ((i * 7 + j * 3) % 256) as f32);
        let truth = Array2::from_shape_fn((20, 30), |(i, j)| {
            if i < 2 {
                -9999.0
            } else {
                0.04 * predicted[[i, j]] + ((i + j) % 3) as f32 * 0.1
            }
        });

        let analysis = analyze(predicted.view(), truth.view(), Some(-9999.0)).unwrap();
        let config = AnalysisConfig {
            output_dir: dir.path().join("plots"),
            hexbin_gridsize: 12,
            histogram_bins: 15,
            ..AnalysisConfig::default()
        };

        let paths = render_all(&analysis, predicted.view(), truth.view(), &config).unwrap();
        assert_eq!(paths.len(), 4);
        for path in &paths {
            let img = image::open(path).unwrap();
            assert!(img.width() > 0 && img.height() > 0);
        }

        let comparison = image::open(&paths[0]).unwrap().to_rgb8();
        // masked rows render white in the truth panel
        assert_eq!(comparison.get_pixel(5, 5).0, [255, 255, 255]);
    }
}
