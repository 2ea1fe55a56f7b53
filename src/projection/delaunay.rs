//! Delaunay triangulation of scattered support by Bowyer-Watson insertion.
//!
//! Points are mapped to the unit box and shifted by a tiny deterministic
//! offset before insertion, so lattice input (cospherical by construction)
//! still yields a single consistent triangulation. Simplices that are flat in
//! the unshifted coordinates are discarded afterwards.

use std::collections::HashMap;

/// Magnitude of the insertion offset in unit-box coordinates.
const JOGGLE: f64 = 1e-9;

/// Circumradius of the enclosing super simplex in unit-box coordinates.
const SUPER_SCALE: f64 = 100.0;

/// Simplices with `|det| <= FLAT_EPS * product of edge lengths` are flat.
const FLAT_EPS: f64 = 1e-9;

/// Vertex indices of a triangle (first three entries) or tetrahedron.
pub(crate) type Simplex = [usize; 4];

const UNUSED: usize = usize::MAX;

/// A triangulation over the convex hull of the support points.
#[derive(Clone, Debug)]
pub(crate) struct Triangulation {
    dim: usize,
    origin: [f64; 3],
    scale: [f64; 3],
    points: Vec<[f64; 3]>,
    simplices: Vec<Simplex>,
}

impl Triangulation {
    /// Triangulate over the first `dim` coordinates (2 or 3).
    ///
    /// Fewer than `dim + 1` points, or points that are all collinear
    /// (coplanar in 3D), give an empty triangulation.
    pub(crate) fn new(points: &[[f64; 3]], dim: usize) -> Self {
        let (origin, scale) = unit_box(points, dim);
        let unit: Vec<[f64; 3]> = points
            .iter()
            .map(|p| to_unit(*p, origin, scale, dim))
            .collect();
        let simplices = if unit.len() > dim {
            bowyer_watson(&unit, dim)
        } else {
            Vec::new()
        };
        Self {
            dim,
            origin,
            scale,
            points: unit,
            simplices,
        }
    }

    /// Number of support points.
    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }

    /// Map a query into the unit box of the support.
    pub(crate) fn to_unit(&self, q: [f64; 3]) -> [f64; 3] {
        to_unit(q, self.origin, self.scale, self.dim)
    }

    /// Support point `n` in unit-box coordinates.
    pub(crate) fn point(&self, n: usize) -> [f64; 3] {
        self.points[n]
    }

    pub(crate) fn simplices(&self) -> &[Simplex] {
        &self.simplices
    }

    /// Vertices of simplex `s`.
    pub(crate) fn vertices(&self, s: usize) -> &[usize] {
        &self.simplices[s][..=self.dim]
    }
}

fn unit_box(points: &[[f64; 3]], dim: usize) -> ([f64; 3], [f64; 3]) {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for p in points {
        for d in 0..dim {
            lo[d] = lo[d].min(p[d]);
            hi[d] = hi[d].max(p[d]);
        }
    }
    let mut origin = [0.0; 3];
    let mut scale = [1.0; 3];
    for d in 0..dim {
        let span = hi[d] - lo[d];
        if lo[d].is_finite() {
            origin[d] = lo[d];
        }
        if span.is_finite() && span > 0.0 {
            scale[d] = span;
        }
    }
    (origin, scale)
}

fn to_unit(p: [f64; 3], origin: [f64; 3], scale: [f64; 3], dim: usize) -> [f64; 3] {
    let mut u = [0.0; 3];
    for d in 0..dim {
        u[d] = (p[d] - origin[d]) / scale[d];
    }
    u
}

/// Deterministic offset of point `n` along each axis, in `[-JOGGLE/2, JOGGLE/2)`.
fn joggle(p: [f64; 3], n: usize, dim: usize) -> [f64; 3] {
    let mut out = p;
    for (d, x) in out.iter_mut().enumerate().take(dim) {
        let bits = splitmix64(((n as u64) << 2) | d as u64);
        let unit = (bits >> 11) as f64 / (1u64 << 53) as f64;
        *x += JOGGLE * (unit - 0.5);
    }
    out
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn super_simplex(dim: usize) -> Vec<[f64; 3]> {
    let c = 0.5;
    let r = SUPER_SCALE;
    if dim == 2 {
        let h = r * 3f64.sqrt() / 2.0;
        vec![[c, c + r, 0.0], [c - h, c - r / 2.0, 0.0], [c + h, c - r / 2.0, 0.0]]
    } else {
        vec![
            [c + r, c, c - 0.707 * r],
            [c - r, c, c - 0.707 * r],
            [c, c + r, c + 0.707 * r],
            [c, c - r, c + 0.707 * r],
        ]
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn norm(a: [f64; 3]) -> f64 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

fn det2(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

fn det3(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0])
}

/// Signed volume measure of the simplex `v` (twice the area, six times the volume).
fn orientation(v: &Simplex, coords: &[[f64; 3]], dim: usize) -> f64 {
    if dim == 2 {
        let c = coords[v[2]];
        let a = sub(coords[v[0]], c);
        let b = sub(coords[v[1]], c);
        det2([a[0], a[1]], [b[0], b[1]])
    } else {
        let d = coords[v[3]];
        det3(
            sub(coords[v[0]], d),
            sub(coords[v[1]], d),
            sub(coords[v[2]], d),
        )
    }
}

/// Circumsphere determinant; its sign times the orientation is positive
/// when `p` lies strictly inside.
fn in_sphere(v: &Simplex, coords: &[[f64; 3]], p: [f64; 3], dim: usize) -> f64 {
    let lift = |n: usize| {
        let r = sub(coords[v[n]], p);
        (r, r[0] * r[0] + r[1] * r[1] + r[2] * r[2])
    };
    if dim == 2 {
        let (a, wa) = lift(0);
        let (b, wb) = lift(1);
        let (c, wc) = lift(2);
        let xy = |r: [f64; 3]| [r[0], r[1]];
        wa * det2(xy(b), xy(c)) - wb * det2(xy(a), xy(c)) + wc * det2(xy(a), xy(b))
    } else {
        let (a, wa) = lift(0);
        let (b, wb) = lift(1);
        let (c, wc) = lift(2);
        let (d, wd) = lift(3);
        -wa * det3(b, c, d) + wb * det3(a, c, d) - wc * det3(a, b, d) + wd * det3(a, b, c)
    }
}

/// Simplex under construction, with its orientation sign.
struct Cell {
    v: Simplex,
    sign: f64,
}

impl Cell {
    fn new(v: Simplex, coords: &[[f64; 3]], dim: usize) -> Option<Self> {
        let o = orientation(&v, coords, dim);
        (o != 0.0 && o.is_finite()).then(|| Self { v, sign: o.signum() })
    }

    fn encloses(&self, p: [f64; 3], coords: &[[f64; 3]], dim: usize) -> bool {
        in_sphere(&self.v, coords, p, dim) * self.sign > 0.0
    }

    /// Facets as sorted vertex triples (`UNUSED` last in 2D).
    fn facets(&self, dim: usize) -> Vec<[usize; 3]> {
        let v = self.v;
        let mut out = if dim == 2 {
            vec![
                [v[0], v[1], UNUSED],
                [v[0], v[2], UNUSED],
                [v[1], v[2], UNUSED],
            ]
        } else {
            vec![
                [v[0], v[1], v[2]],
                [v[0], v[1], v[3]],
                [v[0], v[2], v[3]],
                [v[1], v[2], v[3]],
            ]
        };
        for f in &mut out {
            f.sort_unstable();
        }
        out
    }
}

/// Simplices over `unit`, as sorted vertex indices in sorted order.
fn bowyer_watson(unit: &[[f64; 3]], dim: usize) -> Vec<Simplex> {
    let n = unit.len();
    let mut coords: Vec<[f64; 3]> = unit
        .iter()
        .enumerate()
        .map(|(i, p)| joggle(*p, i, dim))
        .collect();
    coords.extend(super_simplex(dim));

    let mut first = [UNUSED; 4];
    for (d, slot) in first.iter_mut().enumerate().take(dim + 1) {
        *slot = n + d;
    }
    let mut cells: Vec<Cell> = Cell::new(first, &coords, dim).into_iter().collect();

    for i in 0..n {
        let p = coords[i];
        let (bad, good): (Vec<Cell>, Vec<Cell>) = cells
            .into_iter()
            .partition(|c| c.encloses(p, &coords, dim));
        cells = good;

        let mut count: HashMap<[usize; 3], usize> = HashMap::new();
        for cell in &bad {
            for facet in cell.facets(dim) {
                *count.entry(facet).or_insert(0) += 1;
            }
        }
        let mut boundary: Vec<[usize; 3]> = count
            .into_iter()
            .filter(|(_, c)| *c == 1)
            .map(|(f, _)| f)
            .collect();
        boundary.sort_unstable();

        for facet in boundary {
            let mut v = [UNUSED; 4];
            v[..dim].copy_from_slice(&facet[..dim]);
            v[dim] = i;
            if let Some(cell) = Cell::new(v, &coords, dim) {
                cells.push(cell);
            }
        }
    }

    let mut simplices: Vec<Simplex> = cells
        .into_iter()
        .map(|c| c.v)
        .filter(|v| v[..=dim].iter().all(|&x| x < n))
        .filter(|v| !is_flat(v, unit, dim))
        .map(|mut v| {
            v[..=dim].sort_unstable();
            v
        })
        .collect();
    simplices.sort_unstable();
    simplices
}

fn is_flat(v: &Simplex, unit: &[[f64; 3]], dim: usize) -> bool {
    let edges: f64 = (1..=dim)
        .map(|k| norm(sub(unit[v[k]], unit[v[0]])))
        .product();
    orientation(v, unit, dim).abs() <= FLAT_EPS * edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure(t: &Triangulation) -> f64 {
        let factor = if t.dim == 2 { 2.0 } else { 6.0 };
        t.simplices()
            .iter()
            .map(|v| orientation(v, &t.points, t.dim).abs() / factor)
            .sum()
    }

    #[test]
    fn test_unit_square_has_two_triangles() {
        let t = Triangulation::new(
            &[[0.0, 0.0, 5.0], [1.0, 0.0, 5.0], [0.0, 1.0, 5.0], [1.0, 1.0, 5.0]],
            2,
        );
        assert_eq!(t.simplices().len(), 2);
        assert!((measure(&t) - 1.0).abs() < 1e-12);
        for s in 0..2 {
            assert_eq!(t.vertices(s).len(), 3);
        }
    }

    #[test]
    fn test_single_tetrahedron() {
        let t = Triangulation::new(
            &[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]],
            3,
        );
        assert_eq!(t.simplices(), &[[0, 1, 2, 3]]);
    }

    #[test]
    fn test_lattice_covers_its_box() {
        let mut planar = Vec::new();
        for j in 0..6 {
            for i in 0..7 {
                planar.push([i as f64 * 3.0, j as f64 * 0.5, 0.0]);
            }
        }
        let t = Triangulation::new(&planar, 2);
        assert_eq!(t.simplices().len(), 2 * 6 * 5);
        assert!((measure(&t) - 1.0).abs() < 1e-9);

        let mut spatial = Vec::new();
        for k in 0..4 {
            for j in 0..3 {
                for i in 0..3 {
                    spatial.push([i as f64 * 50.0, j as f64 * 50.0, k as f64]);
                }
            }
        }
        let t = Triangulation::new(&spatial, 3);
        assert!((measure(&t) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_support_is_empty() {
        let collinear = [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 2.0, 0.0], [3.0, 3.0, 0.0]];
        assert!(Triangulation::new(&collinear, 2).simplices().is_empty());
        let coplanar = [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0]];
        assert!(Triangulation::new(&coplanar, 3).simplices().is_empty());
        assert!(Triangulation::new(&coplanar[..2], 2).simplices().is_empty());
    }
}
