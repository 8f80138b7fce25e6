//! Colour ramps used by the diagnostic plots.

use plotters::style::RGBColor;

/// A colour stop: position in [0, 1] mapped to an RGB colour
#[derive(Debug, Clone, Copy)]
struct Stop {
    t: f64,
    rgb: (u8, u8, u8),
}

const fn stop(t: f64, r: u8, g: u8, b: u8) -> Stop {
    Stop { t, rgb: (r, g, b) }
}

const VIRIDIS_STOPS: &[Stop] = &[
    stop(0.00, 68, 1, 84),
    stop(0.25, 59, 82, 139),
    stop(0.50, 33, 145, 140),
    stop(0.75, 94, 201, 98),
    stop(1.00, 253, 231, 37),
];

const GRAY_STOPS: &[Stop] = &[stop(0.0, 0, 0, 0), stop(1.0, 255, 255, 255)];

// Blue (negative) through light gray to red (positive)
const COOLWARM_STOPS: &[Stop] = &[
    stop(0.00, 59, 76, 192),
    stop(0.25, 141, 176, 254),
    stop(0.50, 221, 221, 221),
    stop(0.75, 244, 154, 123),
    stop(1.00, 180, 4, 38),
];

/// Colour ramps available to the plots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRamp {
    Viridis,
    Gray,
    CoolWarm,
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

fn multi_stop(stops: &[Stop], t: f64) -> RGBColor {
    let first = stops[0].rgb;
    let last = stops[stops.len() - 1].rgb;
    if t.is_nan() || t <= 0.0 {
        return RGBColor(first.0, first.1, first.2);
    }
    if t >= 1.0 {
        return RGBColor(last.0, last.1, last.2);
    }

    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if t <= hi.t {
            let ratio = (t - lo.t) / (hi.t - lo.t);
            return RGBColor(
                lerp(lo.rgb.0, hi.rgb.0, ratio),
                lerp(lo.rgb.1, hi.rgb.1, ratio),
                lerp(lo.rgb.2, hi.rgb.2, ratio),
            );
        }
    }
    RGBColor(last.0, last.1, last.2)
}

impl ColorRamp {
    /// Colour at normalised position `t`, clamped to [0, 1]. NaN maps to the low end.
    pub fn sample(&self, t: f64) -> RGBColor {
        match self {
            ColorRamp::Viridis => multi_stop(VIRIDIS_STOPS, t),
            ColorRamp::Gray => multi_stop(GRAY_STOPS, t),
            ColorRamp::CoolWarm => multi_stop(COOLWARM_STOPS, t),
        }
    }

    /// Colour of `value` on a linear scale from `vmin` to `vmax`
    pub fn sample_range(&self, value: f64, vmin: f64, vmax: f64) -> RGBColor {
        let span = vmax - vmin;
        if span <= 0.0 || !span.is_finite() {
            return self.sample(0.5);
        }
        self.sample((value - vmin) / span)
    }
}
