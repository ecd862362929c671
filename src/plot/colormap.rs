//! Colour palettes mapping a normalised value to RGB.

use super::ColorPalette;

impl ColorPalette {
    /// Map a normalized value (0.0 to 1.0) to an RGB triple.
    pub fn rgb(self, t: f64) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Viridis => three_stop(t, [68.0, 1.0, 84.0], [33.0, 104.0, 109.0], [253.0, 231.0, 37.0]),
            Self::Plasma => three_stop(t, [13.0, 8.0, 135.0], [180.0, 54.0, 121.0], [240.0, 175.0, 12.0]),
            Self::Rainbow => rainbow(t),
            Self::BlueRed => three_stop(t, [0.0, 0.0, 255.0], [255.0, 255.0, 255.0], [255.0, 0.0, 0.0]),
        }
    }
}

/// Piecewise linear ramp through three colours at 0, 0.5 and 1.
fn three_stop(t: f64, low: [f64; 3], mid: [f64; 3], high: [f64; 3]) -> [u8; 3] {
    let (from, to, f) = if t < 0.5 { (low, mid, t * 2.0) } else { (mid, high, (t - 0.5) * 2.0) };
    let mut out = [0u8; 3];
    for c in 0..3 {
        out[c] = (from[c] + f * (to[c] - from[c])).round() as u8;
    }
    out
}

/// Hue sweep from blue (240°) down to red (0°) at full saturation.
fn rainbow(t: f64) -> [u8; 3] {
    let h = (1.0 - t) * 240.0;
    let x = 1.0 - ((h / 60.0) % 2.0 - 1.0).abs();
    let (r, g, b) = match h {
        h if h < 60.0 => (1.0, x, 0.0),
        h if h < 120.0 => (x, 1.0, 0.0),
        h if h < 180.0 => (0.0, 1.0, x),
        _ => (0.0, x, 1.0),
    };
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}
