//! Interpolation weights between rectilinear grids.
//!
//! Weights are sparse rows: for every destination cell (row-major over Y, X)
//! a list of `(source flat index, weight)` pairs.

use super::RegridMethod;

/// One horizontal axis of a rectilinear grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxis {
    pub centers: Vec<f64>,
    /// Cell bounds, normalised so that `lo <= hi`
    pub bounds: Vec<(f64, f64)>,
    /// Longitudes wrap around the full circle
    pub cyclic: bool,
    /// Latitudes measured with `sin(φ)` on the sphere
    pub latitude: bool,
}

impl GridAxis {
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Extent of one cell in the measure used for areas.
    fn extent(&self, cell: usize, spherical: bool) -> f64 {
        let (lo, hi) = self.bounds[cell];
        measure(lo, hi, spherical && self.latitude)
    }
}

pub type SparseWeights = Vec<Vec<(usize, f64)>>;

fn measure(lo: f64, hi: f64, latitude: bool) -> f64 {
    if latitude {
        (hi.to_radians().sin() - lo.to_radians().sin()).abs()
    } else {
        (hi - lo).abs()
    }
}

fn overlap(a: (f64, f64), b: (f64, f64)) -> Option<(f64, f64)> {
    let lo = a.0.max(b.0);
    let hi = a.1.min(b.1);
    (hi > lo).then_some((lo, hi))
}

/// Overlap measure of two cells along one axis, with longitudes compared
/// modulo 360 on the sphere.
fn overlap_measure(a: (f64, f64), b: (f64, f64), spherical: bool, latitude: bool, wrap: bool) -> f64 {
    let shifts: &[f64] = if spherical && wrap { &[-360.0, 0.0, 360.0] } else { &[0.0] };
    shifts
        .iter()
        .filter_map(|s| overlap(a, (b.0 + s, b.1 + s)))
        .map(|(lo, hi)| measure(lo, hi, spherical && latitude))
        .sum()
}

/// Locate `v` between two neighbouring centers: `(lower index, upper index, fraction)`.
fn bracket(centers: &[f64], v: f64) -> Option<(usize, usize, f64)> {
    let n = centers.len();
    if n == 1 {
        return ((centers[0] - v).abs() < 1e-9).then_some((0, 0, 0.0));
    }
    for k in 0..n - 1 {
        let (a, b) = (centers[k], centers[k + 1]);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if v >= lo - 1e-9 && v <= hi + 1e-9 {
            let t = if b == a { 0.0 } else { ((v - a) / (b - a)).clamp(0.0, 1.0) };
            return Some((k, k + 1, t));
        }
    }
    None
}

/// As [`bracket`], wrapping across the seam of a cyclic longitude axis.
fn bracket_axis(axis: &GridAxis, v: f64, spherical: bool) -> Option<(usize, usize, f64)> {
    if !(spherical && axis.cyclic) || axis.len() < 2 {
        return bracket(&axis.centers, v);
    }
    let n = axis.len();
    let first = axis.centers[0];
    let increasing = axis.centers[n - 1] >= first;
    let (v, seam) = if increasing {
        (first + (v - first).rem_euclid(360.0), first + 360.0)
    } else {
        (first - (first - v).rem_euclid(360.0), first - 360.0)
    };
    let mut extended = axis.centers.clone();
    extended.push(seam);
    bracket(&extended, v).map(|(i0, i1, t)| (i0, if i1 == n { 0 } else { i1 }, t))
}

fn nearest(axis: &GridAxis, v: f64, spherical: bool) -> Option<usize> {
    let wrap = spherical && axis.cyclic;
    axis.centers
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let mut d = (c - v).abs();
            if wrap {
                d = d.rem_euclid(360.0);
                d = d.min(360.0 - d);
            }
            (i, d)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Compute sparse weights mapping a source grid onto a destination grid.
pub fn compute_weights(
    method: RegridMethod,
    src_y: &GridAxis,
    src_x: &GridAxis,
    dst_y: &GridAxis,
    dst_x: &GridAxis,
    spherical: bool,
) -> SparseWeights {
    let nsx = src_x.len();
    match method {
        RegridMethod::Bilinear => {
            let ys: Vec<_> = dst_y.centers.iter().map(|&v| bracket_axis(src_y, v, false)).collect();
            let xs: Vec<_> = dst_x.centers.iter().map(|&v| bracket_axis(src_x, v, spherical)).collect();
            let mut weights = Vec::with_capacity(ys.len() * xs.len());
            for y in &ys {
                for x in &xs {
                    let row = match (y, x) {
                        (Some((y0, y1, ty)), Some((x0, x1, tx))) => {
                            let mut row: Vec<(usize, f64)> = Vec::with_capacity(4);
                            for (yi, wy) in [(*y0, 1.0 - ty), (*y1, *ty)] {
                                for (xi, wx) in [(*x0, 1.0 - tx), (*x1, *tx)] {
                                    let w = wy * wx;
                                    if w > 0.0 {
                                        row.push((yi * nsx + xi, w));
                                    }
                                }
                            }
                            merge_duplicates(row)
                        }
                        _ => Vec::new(),
                    };
                    weights.push(row);
                }
            }
            weights
        }
        RegridMethod::Conservative => {
            let wy = axis_overlaps(src_y, dst_y, spherical, false);
            let wx = axis_overlaps(src_x, dst_x, spherical, true);
            let mut weights = Vec::with_capacity(wy.len() * wx.len());
            for y in &wy {
                for x in &wx {
                    let row = y
                        .iter()
                        .flat_map(|&(sy, fy)| x.iter().map(move |&(sx, fx)| (sy * nsx + sx, fy * fx)))
                        .collect();
                    weights.push(row);
                }
            }
            weights
        }
        RegridMethod::Nearest => {
            let ys: Vec<_> = dst_y.centers.iter().map(|&v| nearest(src_y, v, false)).collect();
            let xs: Vec<_> = dst_x.centers.iter().map(|&v| nearest(src_x, v, spherical)).collect();
            let mut weights = Vec::with_capacity(ys.len() * xs.len());
            for y in &ys {
                for x in &xs {
                    weights.push(match (y, x) {
                        (Some(sy), Some(sx)) => vec![(sy * nsx + sx, 1.0)],
                        _ => Vec::new(),
                    });
                }
            }
            weights
        }
    }
}

/// For each destination cell, the source cells it overlaps and the fraction
/// of the destination extent each overlap covers.
fn axis_overlaps(src: &GridAxis, dst: &GridAxis, spherical: bool, wrap: bool) -> Vec<Vec<(usize, f64)>> {
    (0..dst.len())
        .map(|d| {
            let extent = dst.extent(d, spherical);
            if extent <= 0.0 {
                return Vec::new();
            }
            (0..src.len())
                .filter_map(|s| {
                    let ov = overlap_measure(dst.bounds[d], src.bounds[s], spherical, src.latitude, wrap);
                    (ov > 0.0).then_some((s, ov / extent))
                })
                .collect()
        })
        .collect()
}

fn merge_duplicates(mut row: Vec<(usize, f64)>) -> Vec<(usize, f64)> {
    row.sort_by_key(|(i, _)| *i);
    let mut merged: Vec<(usize, f64)> = Vec::with_capacity(row.len());
    for (i, w) in row {
        match merged.last_mut() {
            Some((j, acc)) if *j == i => *acc += w,
            _ => merged.push((i, w)),
        }
    }
    merged
}
