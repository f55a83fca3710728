//! B-spline and NURBS surfaces.

use pgeom_core::{Continuity, GeomError, Result, Tolerance, Validate};
use pgeom_math::{DVec3, Space, Transform};
use serde::{Deserialize, Serialize};

use super::ParametricSurface;
use crate::bspline::eval::{eval_grid, eval_local, rational_partials, Direction};
use crate::bspline::knots::{
    check_knot_table, find_span_in, flat_knots, knots_and_mults, knots_continuity, MAX_DEGREE,
};
use crate::bspline::{SplineRows, Unrolled};
use crate::curve::BSplineCurve;
use crate::param::in_period;

/// Parametric direction of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Dir {
    U,
    V,
}

/// Knot table of one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(super) struct KnotTable {
    pub(super) degree: usize,
    pub(super) periodic: bool,
    pub(super) knots: Vec<f64>,
    pub(super) mults: Vec<usize>,
    pub(super) flat: Vec<f64>,
    pub(super) continuity: Continuity,
}

impl KnotTable {
    fn new(degree: usize, knots: Vec<f64>, mults: Vec<usize>, periodic: bool, nb_poles: usize) -> Result<Self> {
        check_knot_table(degree, &knots, &mults, periodic, nb_poles)?;
        let mut t = Self {
            degree,
            periodic,
            knots,
            mults,
            flat: Vec::new(),
            continuity: Continuity::CN,
        };
        t.rebuild();
        Ok(t)
    }

    pub(super) fn rebuild(&mut self) {
        self.flat = flat_knots(self.degree, &self.knots, &self.mults, self.periodic);
        self.continuity = knots_continuity(self.degree, &self.mults, self.periodic);
    }

    pub(super) fn first(&self) -> f64 {
        self.flat[self.degree]
    }

    pub(super) fn last(&self, n: usize) -> f64 {
        if self.periodic {
            self.flat[n + self.degree]
        } else {
            self.flat[n]
        }
    }

    pub(super) fn last_span(&self, n: usize) -> usize {
        if self.periodic {
            n + self.degree - 1
        } else {
            n - 1
        }
    }

    pub(super) fn normalize(&self, u: f64, n: usize) -> f64 {
        if self.periodic {
            let first = self.first();
            in_period(u, first, self.last(n) - first)
        } else {
            u
        }
    }

    fn is_cn(&self, k: usize) -> bool {
        let last = self.mults.len() - 1;
        let interior = self
            .mults
            .iter()
            .enumerate()
            .filter(|&(i, _)| (i > 0 && i < last) || (self.periodic && i == 0))
            .map(|(_, &m)| m)
            .max();
        match interior {
            None => true,
            Some(m) => m <= self.degree && k <= self.degree - m,
        }
    }

    pub(super) fn first_knot_index(&self) -> usize {
        if self.periodic {
            return 0;
        }
        let first = self.flat[self.degree];
        self.knots.iter().position(|&k| k == first).unwrap_or(0)
    }

    pub(super) fn last_knot_index(&self, n: usize) -> usize {
        let last_index = self.knots.len() - 1;
        if self.periodic {
            return last_index;
        }
        let last = self.flat[n];
        self.knots.iter().position(|&k| k == last).unwrap_or(last_index)
    }

    /// Reverse the table; returns where each of the `n` poles goes.
    fn reverse(&mut self, n: usize) -> Vec<usize> {
        let total = self.knots[0] + self.knots[self.knots.len() - 1];
        self.knots = self.knots.iter().rev().map(|k| total - k).collect();
        self.mults.reverse();
        self.rebuild();
        if self.periodic {
            let base = self.degree as isize - self.mults[0] as isize;
            (0..n)
                .map(|b| (base - b as isize).rem_euclid(n as isize) as usize)
                .collect()
        } else {
            (0..n).map(|b| n - 1 - b).collect()
        }
    }

    /// Take the tables of a non-periodic spline.
    pub(super) fn apply_spline(&mut self, s: &SplineRows) {
        let (knots, mults) = knots_and_mults(&s.flat, 0.0);
        self.degree = s.degree;
        self.knots = knots;
        self.mults = mults;
        self.periodic = false;
        self.rebuild();
    }

    pub(super) fn apply_periodic(&mut self, degree: usize, knots: Vec<f64>, mults: Vec<usize>) {
        self.degree = degree;
        self.knots = knots;
        self.mults = mults;
        self.periodic = true;
        self.rebuild();
    }
}

/// A tensor-product B-spline surface, optionally rational and/or periodic
/// in each direction.
///
/// `poles[i][j]` is the pole of row `i` along u and column `j` along v.
/// Each direction follows the knot table rules of [`BSplineCurve`]. Weights
/// are stored only when they are not all equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSplineSurface {
    u: KnotTable,
    v: KnotTable,
    poles: Vec<Vec<DVec3>>,
    weights: Option<Vec<Vec<f64>>>,
}

fn normalize_weights(weights: Option<Vec<Vec<f64>>>) -> Option<Vec<Vec<f64>>> {
    let w = weights?;
    let w0 = *w.first()?.first()?;
    let uniform = w
        .iter()
        .flatten()
        .all(|&x| (x - w0).abs() <= f64::EPSILON * w0.abs());
    if uniform {
        None
    } else {
        Some(w)
    }
}

impl BSplineSurface {
    /// Build a surface from its tables.
    ///
    /// Fails with a construction error when the pole grid is not
    /// rectangular, a knot table does not match its pole count and degree,
    /// or a weight is not positive.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        poles: Vec<Vec<DVec3>>,
        weights: Option<Vec<Vec<f64>>>,
        u_knots: Vec<f64>,
        v_knots: Vec<f64>,
        u_mults: Vec<usize>,
        v_mults: Vec<usize>,
        u_degree: usize,
        v_degree: usize,
        u_periodic: bool,
        v_periodic: bool,
    ) -> Result<Self> {
        let nu = poles.len();
        let nv = poles.first().map_or(0, Vec::len);
        if poles.iter().any(|row| row.len() != nv) {
            return Err(GeomError::construction("BSpline surface: pole rows differ in length"));
        }
        let u = KnotTable::new(u_degree, u_knots, u_mults, u_periodic, nu)?;
        let v = KnotTable::new(v_degree, v_knots, v_mults, v_periodic, nv)?;
        if let Some(w) = &weights {
            if w.len() != nu || w.iter().any(|row| row.len() != nv) {
                return Err(GeomError::construction("BSpline surface: Weights and Poles array size mismatch"));
            }
            if w.iter().flatten().any(|&x| x <= Tolerance::RESOLUTION || !x.is_finite()) {
                return Err(GeomError::construction("BSpline surface: Weights values too small"));
            }
        }
        Ok(Self {
            u,
            v,
            poles,
            weights: normalize_weights(weights),
        })
    }

    /// Bezier patch over `[0, 1] x [0, 1]`, degrees from the grid size.
    pub fn bezier(poles: Vec<Vec<DVec3>>, weights: Option<Vec<Vec<f64>>>) -> Result<Self> {
        let nu = poles.len();
        let nv = poles.first().map_or(0, Vec::len);
        if nu < 2 || nv < 2 || nu > MAX_DEGREE + 1 || nv > MAX_DEGREE + 1 {
            return Err(GeomError::construction("Bezier surface: invalid number of poles"));
        }
        Self::new(
            poles,
            weights,
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![nu, nu],
            vec![nv, nv],
            nu - 1,
            nv - 1,
            false,
            false,
        )
    }

    pub fn u_degree(&self) -> usize {
        self.u.degree
    }

    pub fn v_degree(&self) -> usize {
        self.v.degree
    }

    pub fn nb_u_poles(&self) -> usize {
        self.poles.len()
    }

    pub fn nb_v_poles(&self) -> usize {
        self.poles[0].len()
    }

    pub fn pole(&self, i: usize, j: usize) -> Result<DVec3> {
        self.poles
            .get(i)
            .and_then(|row| row.get(j))
            .copied()
            .ok_or_else(|| GeomError::out_of_range(format!("pole index ({i}, {j})")))
    }

    pub fn poles(&self) -> &[Vec<DVec3>] {
        &self.poles
    }

    /// Weight of pole `(i, j)`, 1 for non-rational surfaces.
    pub fn weight(&self, i: usize, j: usize) -> Result<f64> {
        self.pole(i, j)?;
        Ok(self.weights.as_ref().map_or(1.0, |w| w[i][j]))
    }

    pub fn weights(&self) -> Option<&[Vec<f64>]> {
        self.weights.as_deref()
    }

    pub fn is_rational(&self) -> bool {
        self.weights.is_some()
    }

    /// Whether the weights vary along u.
    pub fn is_u_rational(&self) -> bool {
        self.weights
            .as_ref()
            .is_some_and(|w| w.iter().any(|row| row != &w[0]))
    }

    /// Whether the weights vary along v.
    pub fn is_v_rational(&self) -> bool {
        self.weights
            .as_ref()
            .is_some_and(|w| w.iter().any(|row| row.iter().any(|&x| x != row[0])))
    }

    pub fn u_knots(&self) -> &[f64] {
        &self.u.knots
    }

    pub fn v_knots(&self) -> &[f64] {
        &self.v.knots
    }

    pub fn u_multiplicities(&self) -> &[usize] {
        &self.u.mults
    }

    pub fn v_multiplicities(&self) -> &[usize] {
        &self.v.mults
    }

    pub fn u_knot(&self, index: usize) -> Result<f64> {
        self.u
            .knots
            .get(index)
            .copied()
            .ok_or_else(|| GeomError::out_of_range(format!("u knot index {index}")))
    }

    pub fn v_knot(&self, index: usize) -> Result<f64> {
        self.v
            .knots
            .get(index)
            .copied()
            .ok_or_else(|| GeomError::out_of_range(format!("v knot index {index}")))
    }

    pub fn u_knot_sequence(&self) -> &[f64] {
        &self.u.flat
    }

    pub fn v_knot_sequence(&self) -> &[f64] {
        &self.v.flat
    }

    pub fn first_u_knot_index(&self) -> usize {
        self.u.first_knot_index()
    }

    pub fn last_u_knot_index(&self) -> usize {
        self.u.last_knot_index(self.nb_u_poles())
    }

    pub fn first_v_knot_index(&self) -> usize {
        self.v.first_knot_index()
    }

    pub fn last_v_knot_index(&self) -> usize {
        self.v.last_knot_index(self.nb_v_poles())
    }

    pub fn set_pole(&mut self, i: usize, j: usize, pole: DVec3) -> Result<()> {
        self.pole(i, j)?;
        self.poles[i][j] = pole;
        Ok(())
    }

    pub fn set_pole_with_weight(&mut self, i: usize, j: usize, pole: DVec3, weight: f64) -> Result<()> {
        self.set_weight(i, j, weight)?;
        self.poles[i][j] = pole;
        Ok(())
    }

    pub fn set_weight(&mut self, i: usize, j: usize, weight: f64) -> Result<()> {
        self.pole(i, j)?;
        if weight <= Tolerance::RESOLUTION || !weight.is_finite() {
            return Err(GeomError::construction("BSpline surface: weight too small"));
        }
        let (nu, nv) = (self.nb_u_poles(), self.nb_v_poles());
        let mut w = self.weights.take().unwrap_or_else(|| vec![vec![1.0; nv]; nu]);
        w[i][j] = weight;
        self.weights = normalize_weights(Some(w));
        Ok(())
    }

    /// Swap the u and v directions.
    pub fn exchange_uv(&mut self) {
        std::mem::swap(&mut self.u, &mut self.v);
        self.poles = transpose(&self.poles);
        if let Some(w) = &self.weights {
            self.weights = Some(transpose(w));
        }
    }

    /// Isoparametric curve at `u`, running along v.
    pub fn u_iso(&self, u: f64) -> Result<BSplineCurve<DVec3>> {
        self.iso(Dir::U, u)
    }

    /// Isoparametric curve at `v`, running along u.
    pub fn v_iso(&self, v: f64) -> Result<BSplineCurve<DVec3>> {
        self.iso(Dir::V, v)
    }

    fn iso(&self, dir: Dir, t: f64) -> Result<BSplineCurve<DVec3>> {
        let rows = self.rows(dir);
        let n = rows.len();
        let (table, other) = match dir {
            Dir::U => (&self.u, &self.v),
            Dir::V => (&self.v, &self.u),
        };
        let p = table.degree;
        let t = table.normalize(t, n);
        let span = find_span_in(&table.flat, p, table.last_span(n), t);
        let local: Vec<Vec<f64>> = (0..=p).map(|a| rows[(span - p + a) % n].clone()).collect();
        let line = eval_local(p, &table.flat, span, t, &local, 0).swap_remove(0);
        let stride = self.stride();
        let chunks: Vec<&[f64]> = line.chunks(stride).collect();
        let poles = chunks.iter().map(|c| to_point(c, self.is_rational())).collect();
        let weights = self.is_rational().then(|| chunks.iter().map(|c| c[3]).collect());
        BSplineCurve::new(
            poles,
            weights,
            other.knots.clone(),
            other.mults.clone(),
            other.degree,
            other.periodic,
        )
    }

    // -- homogeneous rows ---------------------------------------------------

    pub(super) fn stride(&self) -> usize {
        3 + usize::from(self.is_rational())
    }

    fn hom(&self, i: usize, j: usize) -> [f64; 4] {
        let p = self.poles[i][j];
        let w = self.weights.as_ref().map_or(1.0, |w| w[i][j]);
        [p.x * w, p.y * w, p.z * w, w]
    }

    /// Pole lines along `dir`: one row per pole index in `dir`, holding the
    /// whole line of poles across the other direction.
    pub(super) fn rows(&self, dir: Dir) -> Vec<Vec<f64>> {
        let stride = self.stride();
        let (nu, nv) = (self.nb_u_poles(), self.nb_v_poles());
        let line = |count: usize, at: &dyn Fn(usize) -> [f64; 4]| -> Vec<f64> {
            (0..count).flat_map(|k| at(k)[..stride].to_vec()).collect()
        };
        match dir {
            Dir::U => (0..nu).map(|i| line(nv, &|j| self.hom(i, j))).collect(),
            Dir::V => (0..nv).map(|j| line(nu, &|i| self.hom(i, j))).collect(),
        }
    }

    /// Replace poles and weights from pole lines along `dir`.
    pub(super) fn set_rows(&mut self, dir: Dir, rows: &[Vec<f64>], rational: bool) {
        let stride = 3 + usize::from(rational);
        let grid: Vec<Vec<&[f64]>> = rows.iter().map(|r| r.chunks(stride).collect()).collect();
        let grid = match dir {
            Dir::U => grid,
            Dir::V => transpose(&grid),
        };
        self.poles = grid
            .iter()
            .map(|row| row.iter().map(|c| to_point(c, rational)).collect())
            .collect();
        self.weights = if rational {
            normalize_weights(Some(grid.iter().map(|row| row.iter().map(|c| c[3]).collect()).collect()))
        } else {
            None
        };
    }

    pub(super) fn table(&self, dir: Dir) -> &KnotTable {
        match dir {
            Dir::U => &self.u,
            Dir::V => &self.v,
        }
    }

    pub(super) fn table_mut(&mut self, dir: Dir) -> &mut KnotTable {
        match dir {
            Dir::U => &mut self.u,
            Dir::V => &mut self.v,
        }
    }

    pub(super) fn nb_poles(&self, dir: Dir) -> usize {
        match dir {
            Dir::U => self.nb_u_poles(),
            Dir::V => self.nb_v_poles(),
        }
    }

    pub(super) fn spline_rows(&self, dir: Dir) -> SplineRows {
        let t = self.table(dir);
        SplineRows::new(t.degree, t.flat.clone(), self.rows(dir))
    }

    pub(super) fn unrolled(&self, dir: Dir) -> Unrolled {
        let t = self.table(dir);
        Unrolled::new(t.degree, &t.knots, &t.mults, &self.rows(dir))
    }

    pub(super) fn apply_spline(&mut self, dir: Dir, s: &SplineRows) {
        let rational = self.is_rational();
        self.table_mut(dir).apply_spline(s);
        self.set_rows(dir, &s.rows, rational);
    }

    pub(super) fn apply_unrolled(&mut self, dir: Dir, u: &Unrolled) {
        let rational = self.is_rational();
        let (knots, mults, rows) = u.fold();
        self.table_mut(dir).apply_periodic(u.spline.degree, knots, mults);
        self.set_rows(dir, &rows, rational);
    }

    /// Whether the first and last pole lines along `dir` coincide.
    pub(super) fn end_lines_match(&self, dir: Dir) -> bool {
        let rows = self.rows(dir);
        let stride = self.stride();
        let (first, last) = (&rows[0], &rows[rows.len() - 1]);
        first.chunks(stride).zip(last.chunks(stride)).all(|(a, b)| {
            let pa = to_point(a, stride == 4);
            let pb = to_point(b, stride == 4);
            let same_weight = stride == 3 || (a[3] - b[3]).abs() <= Tolerance::PCONFUSION;
            pa.distance(pb) <= Tolerance::CONFUSION && same_weight
        })
    }

    fn reverse_dir(&mut self, dir: Dir) {
        let n = self.nb_poles(dir);
        let targets = self.table_mut(dir).reverse(n);
        let rows = self.rows(dir);
        let mut out = rows.clone();
        for (b, &to) in targets.iter().enumerate() {
            out[to] = rows[b].clone();
        }
        let rational = self.is_rational();
        self.set_rows(dir, &out, rational);
    }
}

fn to_point(c: &[f64], rational: bool) -> DVec3 {
    let p = DVec3::new(c[0], c[1], c[2]);
    if rational {
        p / c[3]
    } else {
        p
    }
}

fn transpose<T: Clone>(grid: &[Vec<T>]) -> Vec<Vec<T>> {
    let cols = grid.first().map_or(0, Vec::len);
    (0..cols)
        .map(|j| grid.iter().map(|row| row[j].clone()).collect())
        .collect()
}

impl ParametricSurface for BSplineSurface {
    /// Tensor-product de Boor evaluation of any mixed partial.
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        let (npu, npv) = (self.nb_u_poles(), self.nb_v_poles());
        let u = self.u.normalize(u, npu);
        let v = self.v.normalize(v, npv);
        let (p, q) = (self.u.degree, self.v.degree);
        let su = find_span_in(&self.u.flat, p, self.u.last_span(npu), u);
        let sv = find_span_in(&self.v.flat, q, self.v.last_span(npv), v);
        let stride = self.stride();

        let patch: Vec<Vec<f64>> = (0..=p)
            .map(|a| {
                let i = (su - p + a) % npu;
                (0..=q)
                    .flat_map(|b| self.hom(i, (sv - q + b) % npv)[..stride].to_vec())
                    .collect()
            })
            .collect();
        let du = Direction {
            degree: p,
            flat: &self.u.flat,
            span: su,
            param: u,
            order: nu,
        };
        let dv = Direction {
            degree: q,
            flat: &self.v.flat,
            span: sv,
            param: v,
            order: nv,
        };
        let hom = eval_grid(&patch, stride, du, dv);
        let coords = if self.is_rational() {
            rational_partials(&hom, 3)
        } else {
            hom
        };
        Ok(Some(
            coords
                .iter()
                .map(|col| col.iter().map(|c| DVec3::from_coords(c)).collect())
                .collect(),
        ))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.u.first(),
            self.u.last(self.nb_u_poles()),
            self.v.first(),
            self.v.last(self.nb_v_poles()),
        )
    }

    fn is_u_closed(&self) -> bool {
        self.u.periodic || self.end_lines_match(Dir::U)
    }

    fn is_v_closed(&self) -> bool {
        self.v.periodic || self.end_lines_match(Dir::V)
    }

    fn is_u_periodic(&self) -> bool {
        self.u.periodic
    }

    fn is_v_periodic(&self) -> bool {
        self.v.periodic
    }

    fn continuity(&self) -> Continuity {
        self.u.continuity.min(self.v.continuity)
    }

    fn is_cn_u(&self, n: usize) -> bool {
        self.u.is_cn(n)
    }

    fn is_cn_v(&self, n: usize) -> bool {
        self.v.is_cn(n)
    }

    fn u_reverse(&mut self) {
        self.reverse_dir(Dir::U);
    }

    fn v_reverse(&mut self) {
        self.reverse_dir(Dir::V);
    }

    fn u_reversed_parameter(&self, u: f64) -> f64 {
        let (u1, u2, _, _) = self.bounds();
        u1 + u2 - u
    }

    fn v_reversed_parameter(&self, v: f64) -> f64 {
        let (_, _, v1, v2) = self.bounds();
        v1 + v2 - v
    }

    fn transform(&mut self, t: &Transform) {
        for p in self.poles.iter_mut().flatten() {
            *p = t.transform_point(*p);
        }
    }
}

impl Validate for BSplineSurface {
    fn validate(&self) -> Result<()> {
        let (nu, nv) = (self.nb_u_poles(), self.nb_v_poles());
        check_knot_table(self.u.degree, &self.u.knots, &self.u.mults, self.u.periodic, nu)?;
        check_knot_table(self.v.degree, &self.v.knots, &self.v.mults, self.v.periodic, nv)?;
        if self.poles.iter().any(|row| row.len() != nv) {
            return Err(GeomError::construction("BSpline surface: pole rows differ in length"));
        }
        if let Some(w) = &self.weights {
            let shape_ok = w.len() == nu && w.iter().all(|row| row.len() == nv);
            if !shape_ok || w.iter().flatten().any(|&x| x <= Tolerance::RESOLUTION) {
                return Err(GeomError::construction("BSpline surface: invalid weights"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_1_SQRT_2;

    /// Biquadratic patch with an interior u knot.
    pub(in crate::surface) fn patch() -> BSplineSurface {
        let poles: Vec<Vec<DVec3>> = (0..4)
            .map(|i| {
                (0..3)
                    .map(|j| DVec3::new(i as f64, j as f64, ((i * j) % 3) as f64 * 0.5 - 0.2 * i as f64))
                    .collect()
            })
            .collect();
        BSplineSurface::new(
            poles,
            None,
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0],
            vec![3, 1, 3],
            vec![3, 3],
            2,
            2,
            false,
            false,
        )
        .unwrap()
    }

    /// Quarter of a unit cylinder: a rational arc in u extruded along v.
    pub(in crate::surface) fn rational_quarter() -> BSplineSurface {
        let arc = [DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y];
        let poles: Vec<Vec<DVec3>> = arc
            .iter()
            .map(|&p| vec![p, p + DVec3::Z * 2.0])
            .collect();
        let weights = vec![vec![1.0, 1.0], vec![FRAC_1_SQRT_2, FRAC_1_SQRT_2], vec![1.0, 1.0]];
        BSplineSurface::new(
            poles,
            Some(weights),
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![3, 3],
            vec![2, 2],
            2,
            1,
            false,
            false,
        )
        .unwrap()
    }

    /// Central-difference check of the first partials.
    pub(in crate::surface) fn assert_partials_match(s: &BSplineSurface, u: f64, v: f64) {
        let h = 1e-6;
        let (_, du, dv) = s.d1(u, v).unwrap();
        let fu = (s.value(u + h, v).unwrap() - s.value(u - h, v).unwrap()) / (2.0 * h);
        let fv = (s.value(u, v + h).unwrap() - s.value(u, v - h).unwrap()) / (2.0 * h);
        assert!((du - fu).length() < 1e-6, "du {du} vs {fu}");
        assert!((dv - fv).length() < 1e-6, "dv {dv} vs {fv}");
    }

    #[test]
    fn test_table_checks() {
        let poles = vec![vec![DVec3::ZERO, DVec3::X], vec![DVec3::Y, DVec3::ONE]];
        assert!(BSplineSurface::bezier(poles.clone(), None).is_ok());
        let ragged = vec![vec![DVec3::ZERO, DVec3::X], vec![DVec3::Y]];
        assert!(matches!(BSplineSurface::bezier(ragged, None), Err(GeomError::Construction(_))));
        assert!(matches!(
            BSplineSurface::new(poles, None, vec![0.0, 1.0], vec![0.0, 1.0], vec![2, 2], vec![1, 1], 1, 1, false, false),
            Err(GeomError::Construction(_))
        ));
    }

    #[test]
    fn test_bilinear_patch() {
        let poles = vec![
            vec![DVec3::ZERO, DVec3::new(0.0, 1.0, 0.0)],
            vec![DVec3::new(1.0, 0.0, 0.0), DVec3::new(1.0, 1.0, 1.0)],
        ];
        let s = BSplineSurface::bezier(poles, None).unwrap();
        let p = s.value(0.5, 0.5).unwrap();
        assert_relative_eq!(p, DVec3::new(0.5, 0.5, 0.25), epsilon = 1e-15);
        let d = s.d2(0.5, 0.5).unwrap();
        assert_relative_eq!(d.d2uv, DVec3::new(0.0, 0.0, 1.0), epsilon = 1e-15);
        assert_eq!(d.d2u, DVec3::ZERO);
        assert!(s.is_cn_u(5) && s.is_cn_v(5));
    }

    #[test]
    fn test_rational_cylinder_patch() {
        let s = rational_quarter();
        assert!(s.is_u_rational());
        assert!(!s.is_v_rational());
        for (u, v) in [(0.0, 0.0), (0.3, 0.5), (0.8, 1.0)] {
            let p = s.value(u, v).unwrap();
            assert_relative_eq!(DVec3::new(p.x, p.y, 0.0).length(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(p.z, 2.0 * v, epsilon = 1e-12);
            assert_partials_match(&s, u.clamp(1e-3, 0.999), v.clamp(1e-3, 0.999));
        }
    }

    #[test]
    fn test_partials_match_differences() {
        let s = patch();
        for (u, v) in [(0.3, 0.2), (1.5, 0.7), (0.999, 0.5)] {
            assert_partials_match(&s, u, v);
        }
        assert!(s.is_cn_u(1) && !s.is_cn_u(2));
    }

    #[test]
    fn test_reversals() {
        let s = patch();
        let ur = s.u_reversed();
        let vr = s.v_reversed();
        for (u, v) in [(0.2, 0.1), (1.7, 0.9)] {
            let p = s.value(u, v).unwrap();
            assert!((ur.value(s.u_reversed_parameter(u), v).unwrap() - p).length() < 1e-12);
            assert!((vr.value(u, s.v_reversed_parameter(v)).unwrap() - p).length() < 1e-12);
        }
    }

    #[test]
    fn test_iso_curves() {
        use crate::curve::ParametricCurve;
        let s = rational_quarter();
        let c = s.v_iso(0.5).unwrap();
        for u in [0.0, 0.25, 0.9] {
            assert!((c.value(u).unwrap() - s.value(u, 0.5).unwrap()).length() < 1e-12);
        }
        let c = patch().u_iso(1.3).unwrap();
        assert!((c.value(0.4).unwrap() - patch().value(1.3, 0.4).unwrap()).length() < 1e-12);
    }

    #[test]
    fn test_exchange_uv() {
        let s = patch();
        let mut t = s.clone();
        t.exchange_uv();
        assert_eq!(t.u_degree(), 2);
        assert_eq!(t.nb_u_poles(), 3);
        assert!((t.value(0.4, 1.2).unwrap() - s.value(1.2, 0.4).unwrap()).length() < 1e-12);
    }

    #[test]
    fn test_weights_and_transform() {
        let mut s = patch();
        s.set_weight(1, 1, 2.0).unwrap();
        assert!(s.is_rational());
        assert!(s.set_weight(1, 1, 0.0).is_err());
        s.set_weight(1, 1, 1.0).unwrap();
        assert!(!s.is_rational());
        assert!(matches!(s.pole(9, 0), Err(GeomError::OutOfRange(_))));

        let t = Transform::from_translation(DVec3::new(0.0, 0.0, 5.0));
        let before = s.value(0.7, 0.7).unwrap();
        s.transform(&t);
        assert!((s.value(0.7, 0.7).unwrap() - before - DVec3::Z * 5.0).length() < 1e-12);
        assert!(s.validate().is_ok());
    }
}
