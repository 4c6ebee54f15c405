// Depth-driven node shading
//
// Colors live in HSV space; Graphviz accepts "h,s,v" triples directly.

use std::fmt;

/// A color in hue/saturation/value space, each channel in 0..=1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Hsv {
    pub const fn new(h: f64, s: f64, v: f64) -> Self {
        Self { h, s, v }
    }
}

impl From<(f64, f64, f64)> for Hsv {
    fn from((h, s, v): (f64, f64, f64)) -> Self {
        Self { h, s, v }
    }
}

impl fmt::Display for Hsv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", format_g(self.h), format_g(self.s), format_g(self.v))
    }
}

/// Regular nodes fade from white to dark grey
pub const NODE_START: Hsv = Hsv::new(0.0, 0.0, 1.0);
pub const NODE_END: Hsv = Hsv::new(0.0, 0.0, 0.3);

/// "Too many" summary nodes fade from bright to dark red
pub const TOO_MANY_START: Hsv = Hsv::new(0.0, 1.0, 1.0);
pub const TOO_MANY_END: Hsv = Hsv::new(0.0, 1.0, 0.3);

const MODULE_HUE: f64 = 0.3;
const HIGHLIGHT_HUE: f64 = 0.6;
const HIGHLIGHT_SATURATION: f64 = 0.6;

/// Interpolate between two colors by `depth / max_depth`
pub fn gradient(start: Hsv, end: Hsv, depth: usize, max_depth: usize) -> Hsv {
    if max_depth == 0 {
        return start;
    }
    let f = depth as f64 / max_depth as f64;
    Hsv {
        h: start.h * (1.0 - f) + end.h * f,
        s: start.s * (1.0 - f) + end.s * f,
        v: start.v * (1.0 - f) + end.v * f,
    }
}

/// Fill color of an object node
pub fn node_color(depth: usize, max_depth: usize, is_module: bool, highlighted: bool) -> Hsv {
    let mut color = gradient(NODE_START, NODE_END, depth, max_depth);
    if is_module {
        color.h = MODULE_HUE;
        color.s = 1.0;
    }
    if highlighted {
        color.h = HIGHLIGHT_HUE;
        color.s = HIGHLIGHT_SATURATION;
        color.v = 0.5 + color.v * 0.5;
    }
    color
}

/// Whether a fill is dark enough to need a white label
pub fn needs_light_text(color: Hsv) -> bool {
    color.v < 0.5
}

/// Format a number the way C's `%g` does: six significant digits, no
/// trailing zeros
pub fn format_g(x: f64) -> String {
    const PRECISION: i32 = 6;

    if x == 0.0 {
        return "0".to_string();
    }
    if !x.is_finite() {
        return x.to_string();
    }

    // Round to the target precision first; rounding can bump the exponent.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, x);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION {
        let mantissa = trim_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, x))
    }
}

fn trim_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}
