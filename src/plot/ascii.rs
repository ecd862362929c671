//! Terminal renderings: character heat maps and line plots.

use super::{field_grid, field_line, finite_range, normalise};
use crate::errors::Result;
use crate::model::Field;
use std::fmt::Write as _;

const RAMP: &[u8] = b".:-=+*#%@";

/// Draw a 2-D field as characters, densest for the largest values.
/// Missing values are blank. Wide grids are sampled down to `width` columns.
pub fn ascii_heatmap(field: &Field, width: usize) -> Result<String> {
    let grid = field_grid(field)?;
    let (rows, cols) = grid.dim();
    let range = finite_range(grid.iter().copied()).unwrap_or((0.0, 1.0));
    let out_cols = cols.min(width.max(1));
    // terminal cells are about twice as tall as they are wide
    let out_rows = ((rows * out_cols) / (cols.max(1) * 2)).clamp(1, rows.max(1));

    let mut out = String::new();
    let _ = writeln!(out, "{} [{:.4} .. {:.4}]", field.identity(), range.0, range.1);
    for r in 0..out_rows {
        let src_r = r * rows / out_rows;
        for c in 0..out_cols {
            let v = grid[[src_r, c * cols / out_cols]];
            let ch = if v.is_finite() {
                let level = (normalise(v, range) * (RAMP.len() - 1) as f64).round() as usize;
                RAMP[level.min(RAMP.len() - 1)] as char
            } else {
                ' '
            };
            out.push(ch);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Draw a 1-D field as a scatter of `*` on a `height`-row canvas.
pub fn ascii_line_plot(field: &Field, width: usize, height: usize) -> Result<String> {
    let values = field_line(field)?;
    let range = finite_range(values.iter().copied()).unwrap_or((0.0, 1.0));
    let height = height.max(2);
    let cols = values.len().min(width.max(1));

    let mut canvas = vec![vec![' '; cols]; height];
    for (c, column) in (0..cols).map(|c| (c, c * values.len() / cols.max(1))) {
        let v = values[column];
        if !v.is_finite() {
            continue;
        }
        let row = ((1.0 - normalise(v, range)) * (height - 1) as f64).round() as usize;
        canvas[row.min(height - 1)][c] = '*';
    }

    let label_width = 12;
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", field.identity(), field.units().unwrap_or(""));
    for (r, line) in canvas.iter().enumerate() {
        let label = if r == 0 {
            format!("{:>w$.4}", range.1, w = label_width)
        } else if r == height - 1 {
            format!("{:>w$.4}", range.0, w = label_width)
        } else {
            " ".repeat(label_width)
        };
        let _ = writeln!(out, "{} |{}", label, line.iter().collect::<String>());
    }
    let _ = writeln!(out, "{} +{}", " ".repeat(label_width), "-".repeat(cols));
    Ok(out)
}
