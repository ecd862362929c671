//! Rendering fields as images and terminal plots
//!
//! - [`render_heatmap`] and [`render_side_by_side`] draw 2-D fields into an
//!   [`RgbImage`], which saves as binary PPM.
//! - [`ascii`] draws heat maps and line plots as text.
//!
//! Size-1 axes are dropped first. Latitude-like axes are drawn with their
//! largest value at the top.

pub mod ascii;
pub mod colormap;

pub use ascii::{ascii_heatmap, ascii_line_plot};

use crate::errors::{CfKitError, Result};
use crate::model::{AxisKind, Field};
use ndarray::{Array2, Axis, Ix1, Ix2};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Colour used for missing values
pub const MISSING_COLOR: [u8; 3] = [128, 128, 128];

const BACKGROUND: [u8; 3] = [255, 255, 255];
const COLORBAR_HEIGHT: usize = 12;
const GAP: usize = 8;

/// Available colour palettes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPalette {
    /// Perceptually uniform, colourblind-friendly
    #[default]
    Viridis,
    Plasma,
    Rainbow,
    /// Diverging blue-white-red
    BlueRed,
}

impl ColorPalette {
    pub fn name(self) -> &'static str {
        match self {
            Self::Viridis => "viridis",
            Self::Plasma => "plasma",
            Self::Rainbow => "rainbow",
            Self::BlueRed => "bluered",
        }
    }
}

impl FromStr for ColorPalette {
    type Err = CfKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "viridis" => Ok(Self::Viridis),
            "plasma" => Ok(Self::Plasma),
            "rainbow" | "spectral" => Ok(Self::Rainbow),
            "bluered" | "bwr" => Ok(Self::BlueRed),
            other => Err(CfKitError::Plot(format!("unknown palette '{}'", other))),
        }
    }
}

impl fmt::Display for ColorPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rendering options
#[derive(Debug, Clone, Copy)]
pub struct PlotOptions {
    pub palette: ColorPalette,
    /// Pixels per grid cell; 0 picks a scale giving roughly 400 pixels across
    pub scale: usize,
    /// Fixed colour range; the data range when `None`
    pub range: Option<(f64, f64)>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            palette: ColorPalette::default(),
            scale: 0,
            range: None,
        }
    }
}

/// An 8-bit RGB raster
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize, fill: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            pixels.extend_from_slice(&fill);
        }
        Self { width, height, pixels }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 3;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 3;
            self.pixels[i..i + 3].copy_from_slice(&rgb);
        }
    }

    fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize, rgb: [u8; 3]) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                self.set_pixel(x, y, rgb);
            }
        }
    }

    fn blit(&mut self, other: &RgbImage, x0: usize, y0: usize) {
        for y in 0..other.height {
            for x in 0..other.width {
                if let Some(rgb) = other.pixel(x, y) {
                    self.set_pixel(x0 + x, y0 + y, rgb);
                }
            }
        }
    }

    /// Binary PPM (P6) encoding
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.pixels);
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_ppm())?;
        info!(path = %path.display(), width = self.width, height = self.height, "saved image");
        Ok(())
    }
}

/// The 2-D data of a field as (rows = Y, columns = X), top row first.
///
/// Size-1 axes are squeezed. The Y axis is flipped so that increasing
/// coordinates run upwards, and axes are swapped if X comes first.
pub fn field_grid(field: &Field) -> Result<Array2<f64>> {
    let squeezed = field.squeeze();
    if squeezed.rank() != 2 {
        return Err(CfKitError::Plot(format!(
            "'{}' has {} non-degenerate axes; a heat map needs 2",
            field.identity(),
            squeezed.rank()
        )));
    }
    if squeezed.data.is_empty() {
        return Err(CfKitError::Plot(format!("'{}' has no data to draw", field.identity())));
    }
    let mut grid = squeezed.data.clone().into_dimensionality::<Ix2>()?;
    let swap = squeezed.domain.axis_kind(0) == Some(AxisKind::X)
        || squeezed.domain.axis_kind(1) == Some(AxisKind::Y);
    let row_axis = if swap { 1 } else { 0 };
    if swap {
        grid = grid.reversed_axes();
    }
    let increasing = squeezed
        .domain
        .dimension_coordinate(&squeezed.domain.axes[row_axis].key)
        .map(|c| c.is_increasing())
        .unwrap_or(true);
    if increasing {
        grid.invert_axis(Axis(0));
    }
    Ok(grid.as_standard_layout().to_owned())
}

/// The 1-D data of a field after squeezing.
pub(crate) fn field_line(field: &Field) -> Result<Vec<f64>> {
    let squeezed = field.squeeze();
    if squeezed.rank() != 1 {
        return Err(CfKitError::Plot(format!(
            "'{}' has {} non-degenerate axes; a line plot needs 1",
            field.identity(),
            squeezed.rank()
        )));
    }
    if squeezed.data.is_empty() {
        return Err(CfKitError::Plot(format!("'{}' has no data to draw", field.identity())));
    }
    Ok(squeezed.data.into_dimensionality::<Ix1>()?.to_vec())
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn normalise(v: f64, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        (v - lo) / (hi - lo)
    } else {
        0.5
    }
}

fn auto_scale(columns: usize, requested: usize) -> usize {
    if requested > 0 {
        requested
    } else {
        (400 / columns.max(1)).clamp(1, 32)
    }
}

fn draw_grid(grid: &Array2<f64>, scale: usize, range: (f64, f64), palette: ColorPalette) -> RgbImage {
    let (rows, cols) = grid.dim();
    let width = cols * scale;
    let map_height = rows * scale;
    let mut image = RgbImage::new(width, map_height + GAP + COLORBAR_HEIGHT, BACKGROUND);
    for ((r, c), &v) in grid.indexed_iter() {
        let rgb = if v.is_finite() {
            palette.rgb(normalise(v, range))
        } else {
            MISSING_COLOR
        };
        image.fill_rect(c * scale, r * scale, scale, scale, rgb);
    }
    for x in 0..width {
        let t = if width > 1 { x as f64 / (width - 1) as f64 } else { 0.5 };
        image.fill_rect(x, map_height + GAP, 1, COLORBAR_HEIGHT, palette.rgb(t));
    }
    image
}

/// Draw a heat map of a 2-D field with a colour bar underneath.
pub fn render_heatmap(field: &Field, options: &PlotOptions) -> Result<RgbImage> {
    let grid = field_grid(field)?;
    let range = options
        .range
        .or_else(|| finite_range(grid.iter().copied()))
        .unwrap_or((0.0, 1.0));
    let scale = auto_scale(grid.ncols(), options.scale);
    Ok(draw_grid(&grid, scale, range, options.palette))
}

/// Draw two fields next to each other on a shared colour scale, e.g. before
/// and after regridding.
pub fn render_side_by_side(left: &Field, right: &Field, options: &PlotOptions) -> Result<RgbImage> {
    let a = field_grid(left)?;
    let b = field_grid(right)?;
    let range = options
        .range
        .or_else(|| finite_range(a.iter().chain(b.iter()).copied()))
        .unwrap_or((0.0, 1.0));

    let left_img = draw_grid(&a, auto_scale(a.ncols(), options.scale), range, options.palette);
    let right_img = draw_grid(&b, auto_scale(b.ncols(), options.scale), range, options.palette);

    let mut image = RgbImage::new(
        left_img.width + GAP * 2 + right_img.width,
        left_img.height.max(right_img.height),
        BACKGROUND,
    );
    image.blit(&left_img, 0, 0);
    image.blit(&right_img, left_img.width + GAP * 2, 0);
    Ok(image)
}
