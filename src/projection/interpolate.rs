//! Linear interpolators over regular and scattered support.
//!
//! The scattered interpolator triangulates its support once (Delaunay) and
//! evaluates the piecewise-linear interpolant over that mesh, so values are
//! continuous across shared edges and faces. An R-tree over simplex bounding boxes locates the enclosing simplex;
//! barycentric weights come from a small dense solve. Queries outside the
//! convex hull yield `NaN`. Weights depend only on geometry, so they are
//! prepared once and reused for every report step.

use faer::{Mat, linalg::solvers::Solve};
use rstar::{AABB, RTree, RTreeObject};

use super::delaunay::Triangulation;

/// Tolerance on barycentric coordinates.
const BARY_EPS: f64 = 1e-9;

/// Looser tolerance for points on the hull next to a dropped flat simplex.
const HULL_EPS: f64 = 1e-6;

/// Padding of simplex boxes in unit-box coordinates.
const BOX_PAD: f64 = 1e-7;

// =============================================================================
// Regular grid
// =============================================================================

/// Bilinear interpolation on a tensor grid, extrapolating linearly outside.
#[derive(Clone, Debug)]
pub struct RegularGrid2D {
    u: Vec<f64>,
    v: Vec<f64>,
    /// `values[iv * u.len() + iu]`
    values: Vec<f64>,
}

impl RegularGrid2D {
    /// Create from axis coordinates and row-major values (`u` fastest).
    ///
    /// Axes may be ascending or descending; they are reordered internally.
    /// Returns `None` on length mismatch, empty or non-monotonic axes.
    pub fn new(u: Vec<f64>, v: Vec<f64>, values: Vec<f64>) -> Option<Self> {
        if u.is_empty() || v.is_empty() || values.len() != u.len() * v.len() {
            return None;
        }
        let (u, u_rev) = monotonic(u)?;
        let (v, v_rev) = monotonic(v)?;
        let (nu, nv) = (u.len(), v.len());
        let mut sorted = vec![0.0; values.len()];
        for iv in 0..nv {
            for iu in 0..nu {
                let su = if u_rev { nu - 1 - iu } else { iu };
                let sv = if v_rev { nv - 1 - iv } else { iv };
                sorted[iv * nu + iu] = values[sv * nu + su];
            }
        }
        Some(Self {
            u,
            v,
            values: sorted,
        })
    }

    /// Evaluate at `(u, v)`.
    pub fn eval(&self, u: f64, v: f64) -> f64 {
        let (iu, tu) = bracket(&self.u, u);
        let (iv, tv) = bracket(&self.v, v);
        let nu = self.u.len();
        let at = |a: usize, b: usize| self.values[b * nu + a];
        let iu1 = (iu + 1).min(nu - 1);
        let iv1 = (iv + 1).min(self.v.len() - 1);
        let lower = at(iu, iv) * (1.0 - tu) + at(iu1, iv) * tu;
        let upper = at(iu, iv1) * (1.0 - tu) + at(iu1, iv1) * tu;
        lower * (1.0 - tv) + upper * tv
    }
}

fn monotonic(axis: Vec<f64>) -> Option<(Vec<f64>, bool)> {
    if axis.windows(2).all(|w| w[1] > w[0]) {
        Some((axis, false))
    } else if axis.windows(2).all(|w| w[1] < w[0]) {
        Some((axis.into_iter().rev().collect(), true))
    } else {
        None
    }
}

/// Interval index and (unclamped) local coordinate for linear extrapolation.
fn bracket(axis: &[f64], x: f64) -> (usize, f64) {
    let n = axis.len();
    if n == 1 {
        return (0, 0.0);
    }
    let i = axis.partition_point(|a| *a <= x).saturating_sub(1).min(n - 2);
    let t = (x - axis[i]) / (axis[i + 1] - axis[i]);
    (i, t)
}

// =============================================================================
// Scattered support
// =============================================================================

/// Barycentric weights of one query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimplexWeights {
    nodes: [usize; 4],
    weights: [f64; 4],
    len: usize,
}

impl SimplexWeights {
    /// Weighted sum of `values` (indexed like the support points).
    pub fn apply(&self, values: &[f64]) -> f64 {
        (0..self.len)
            .map(|n| self.weights[n] * values[self.nodes[n]])
            .sum()
    }

    /// Support nodes and weights.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..self.len).map(|n| (self.nodes[n], self.weights[n]))
    }
}

/// Bounding box of one simplex, for point location.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SimplexBox {
    envelope: AABB<[f64; 3]>,
    simplex: usize,
}

impl RTreeObject for SimplexBox {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Scattered linear interpolator in two (x, y) or three (x, y, z) dimensions.
#[derive(Clone, Debug)]
pub struct ScatteredInterpolator {
    dim: usize,
    mesh: Triangulation,
    boxes: RTree<SimplexBox>,
}

impl ScatteredInterpolator {
    /// Interpolate over `(x, y)`; z coordinates are ignored.
    pub fn planar(points: Vec<[f64; 3]>) -> Self {
        Self::new(points, 2)
    }

    /// Interpolate over `(x, y, z)`.
    pub fn spatial(points: Vec<[f64; 3]>) -> Self {
        Self::new(points, 3)
    }

    fn new(points: Vec<[f64; 3]>, dim: usize) -> Self {
        let mesh = Triangulation::new(&points, dim);
        let boxes: Vec<SimplexBox> = (0..mesh.simplices().len())
            .map(|s| {
                let mut lo = [f64::INFINITY; 3];
                let mut hi = [f64::NEG_INFINITY; 3];
                for &n in mesh.vertices(s) {
                    let p = mesh.point(n);
                    for d in 0..3 {
                        lo[d] = lo[d].min(p[d] - BOX_PAD);
                        hi[d] = hi[d].max(p[d] + BOX_PAD);
                    }
                }
                SimplexBox {
                    envelope: AABB::from_corners(lo, hi),
                    simplex: s,
                }
            })
            .collect();
        tracing::trace!(
            points = points.len(),
            simplices = boxes.len(),
            dim,
            "triangulated scattered support"
        );
        Self {
            dim,
            mesh,
            boxes: RTree::bulk_load(boxes),
        }
    }

    /// Number of support points.
    pub fn len(&self) -> usize {
        self.mesh.len()
    }

    /// True without support points.
    pub fn is_empty(&self) -> bool {
        self.mesh.len() == 0
    }

    /// Dimension (2 or 3).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of triangles (2D) or tetrahedra (3D).
    pub fn n_simplices(&self) -> usize {
        self.mesh.simplices().len()
    }

    /// Weights for one query, `None` outside the convex hull of the support.
    pub fn weights(&self, q: [f64; 3]) -> Option<SimplexWeights> {
        let p = self.mesh.to_unit(q);
        let mut candidates: Vec<usize> = self
            .boxes
            .locate_in_envelope_intersecting(&AABB::from_point(p))
            .map(|b| b.simplex)
            .collect();
        candidates.sort_unstable();

        // Points on the hull may fall in slivers dropped as flat; the closest
        // neighbouring simplex covers them.
        let mut nearest: Option<(f64, SimplexWeights)> = None;
        for s in candidates {
            let Some((w, lowest)) = self.barycentric(s, p) else {
                continue;
            };
            if lowest >= -BARY_EPS {
                return Some(w);
            }
            if lowest >= -HULL_EPS && nearest.is_none_or(|(best, _)| lowest > best) {
                nearest = Some((lowest, w));
            }
        }
        nearest.map(|(_, w)| w)
    }

    /// Barycentric weights of `p` (unit-box coordinates) in simplex `s`, with
    /// the smallest weight.
    fn barycentric(&self, s: usize, p: [f64; 3]) -> Option<(SimplexWeights, f64)> {
        let d = self.dim;
        let nodes = self.mesh.vertices(s);
        let p0 = self.mesh.point(nodes[0]);
        let mut t = Mat::<f64>::zeros(d, d);
        let mut rhs = Mat::<f64>::zeros(d, 1);
        for c in 0..d {
            let pc = self.mesh.point(nodes[c + 1]);
            for r in 0..d {
                t[(r, c)] = pc[r] - p0[r];
            }
        }
        for r in 0..d {
            rhs[(r, 0)] = p[r] - p0[r];
        }
        let lu = t.as_ref().full_piv_lu();
        let lambda = lu.solve(&rhs);

        let mut w = SimplexWeights {
            nodes: [0; 4],
            weights: [0.0; 4],
            len: d + 1,
        };
        let mut sum = 0.0;
        for c in 0..d {
            let l = lambda[(c, 0)];
            if !l.is_finite() {
                return None;
            }
            w.nodes[c + 1] = nodes[c + 1];
            w.weights[c + 1] = l;
            sum += l;
        }
        w.nodes[0] = nodes[0];
        w.weights[0] = 1.0 - sum;
        let lowest = w.weights[..=d].iter().copied().fold(f64::INFINITY, f64::min);
        Some((w, lowest))
    }

    /// Prepare weights for many queries.
    pub fn prepare(&self, queries: &[[f64; 3]]) -> Vec<Option<SimplexWeights>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            queries.par_iter().map(|q| self.weights(*q)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            queries.iter().map(|q| self.weights(*q)).collect()
        }
    }

    /// Evaluate at many queries; `NaN` outside.
    pub fn eval_many(&self, values: &[f64], queries: &[[f64; 3]]) -> Vec<f64> {
        self.prepare(queries)
            .iter()
            .map(|w| w.map_or(f64::NAN, |w| w.apply(values)))
            .collect()
    }
}
