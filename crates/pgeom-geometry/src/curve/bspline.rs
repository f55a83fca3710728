//! B-spline and NURBS curves.

use pgeom_core::{Continuity, GeomError, Result, Tolerance, Validate};
use pgeom_math::Space;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ParametricCurve;
use crate::bspline::eval::{eval_local, rational_derivatives};
use crate::bspline::knots::{
    check_knot_table, find_span_in, flat_knots, knots_and_mults, knots_continuity, locate, nb_poles,
    KnotLocation, MAX_DEGREE,
};
use crate::bspline::{SplineRows, Unrolled};
use crate::param::in_period;

/// A B-spline curve, optionally rational and/or periodic.
///
/// Knots are distinct and strictly increasing; `mults[i]` is the
/// multiplicity of `knots[i]`. All indices are 0-based.
///
/// - non-periodic: `sum(mults) == nb_poles + degree + 1`, end
///   multiplicities up to `degree + 1`.
/// - periodic: `sum(mults) - mults[last] == nb_poles`, the last knot is the
///   first one shifted by the period and `mults[0] == mults[last]`.
///
/// Interior multiplicities are in `1..=degree`. Weights are stored only for
/// rational curves; a curve whose weights are all equal is non-rational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct BSplineCurve<P: Space> {
    degree: usize,
    periodic: bool,
    poles: Vec<P>,
    weights: Option<Vec<f64>>,
    knots: Vec<f64>,
    mults: Vec<usize>,
    flat: Vec<f64>,
    continuity: Continuity,
}

/// Drop weights that are all equal.
pub(super) fn normalize_weights(weights: Option<Vec<f64>>) -> Option<Vec<f64>> {
    let w = weights?;
    let w0 = *w.first()?;
    if w.iter().all(|&x| (x - w0).abs() <= f64::EPSILON * w0.abs()) {
        None
    } else {
        Some(w)
    }
}

impl<P: Space> BSplineCurve<P> {
    /// Build a curve from its tables.
    ///
    /// Fails with a construction error when the knot table does not match
    /// the pole count and degree, or a weight is not positive.
    pub fn new(
        poles: Vec<P>,
        weights: Option<Vec<f64>>,
        knots: Vec<f64>,
        mults: Vec<usize>,
        degree: usize,
        periodic: bool,
    ) -> Result<Self> {
        check_knot_table(degree, &knots, &mults, periodic, poles.len())?;
        if let Some(w) = &weights {
            if w.len() != poles.len() {
                return Err(GeomError::construction("BSpline curve: Weights and Poles array size mismatch"));
            }
            if w.iter().any(|&x| x <= Tolerance::RESOLUTION || !x.is_finite()) {
                return Err(GeomError::construction("BSpline curve: Weights values too small"));
            }
        }
        let mut c = Self {
            degree,
            periodic,
            poles,
            weights: normalize_weights(weights),
            knots,
            mults,
            flat: Vec::new(),
            continuity: Continuity::CN,
        };
        c.update_knots();
        Ok(c)
    }

    /// Bezier curve: a single span over `[0, 1]` with degree `poles - 1`.
    pub fn bezier(poles: Vec<P>, weights: Option<Vec<f64>>) -> Result<Self> {
        let n = poles.len();
        if n < 2 || n > MAX_DEGREE + 1 {
            return Err(GeomError::construction("Bezier curve: invalid number of poles"));
        }
        Self::new(poles, weights, vec![0.0, 1.0], vec![n, n], n - 1, false)
    }

    pub(super) fn update_knots(&mut self) {
        self.flat = flat_knots(self.degree, &self.knots, &self.mults, self.periodic);
        self.continuity = knots_continuity(self.degree, &self.mults, self.periodic);
    }

    pub fn max_degree() -> usize {
        MAX_DEGREE
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn nb_poles(&self) -> usize {
        self.poles.len()
    }

    pub fn nb_knots(&self) -> usize {
        self.knots.len()
    }

    pub fn pole(&self, index: usize) -> Result<P> {
        self.poles
            .get(index)
            .copied()
            .ok_or_else(|| GeomError::out_of_range(format!("pole index {index}")))
    }

    pub fn poles(&self) -> &[P] {
        &self.poles
    }

    pub fn knot(&self, index: usize) -> Result<f64> {
        self.knots
            .get(index)
            .copied()
            .ok_or_else(|| GeomError::out_of_range(format!("knot index {index}")))
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn multiplicity(&self, index: usize) -> Result<usize> {
        self.mults
            .get(index)
            .copied()
            .ok_or_else(|| GeomError::out_of_range(format!("knot index {index}")))
    }

    pub fn multiplicities(&self) -> &[usize] {
        &self.mults
    }

    /// Weight of a pole, 1 for non-rational curves.
    pub fn weight(&self, index: usize) -> Result<f64> {
        if index >= self.poles.len() {
            return Err(GeomError::out_of_range(format!("pole index {index}")));
        }
        Ok(self.weights.as_ref().map_or(1.0, |w| w[index]))
    }

    /// Stored weights; `None` means every weight is 1.
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn is_rational(&self) -> bool {
        self.weights.is_some()
    }

    /// Knots repeated by multiplicity (periodically extended for periodic
    /// curves).
    pub fn knot_sequence(&self) -> &[f64] {
        &self.flat
    }

    /// Index of the knot where the domain starts.
    pub fn first_u_knot_index(&self) -> usize {
        if self.periodic {
            return 0;
        }
        let first = self.flat[self.degree];
        self.knots.iter().position(|&k| k == first).unwrap_or(0)
    }

    /// Index of the knot where the domain ends.
    pub fn last_u_knot_index(&self) -> usize {
        let last_index = self.knots.len() - 1;
        if self.periodic {
            return last_index;
        }
        let last = self.flat[self.poles.len()];
        self.knots.iter().position(|&k| k == last).unwrap_or(last_index)
    }

    pub fn start_point(&self) -> P {
        self.eval_point(self.first_parameter())
    }

    pub fn end_point(&self) -> P {
        self.eval_point(self.last_parameter())
    }

    /// `u` brought into `[first, last)` on periodic curves, unchanged
    /// otherwise.
    pub fn periodic_normalization(&self, u: f64) -> f64 {
        if self.periodic {
            let first = self.first_parameter();
            in_period(u, first, self.last_parameter() - first)
        } else {
            u
        }
    }

    /// Position of `u` in the knot table, snapping within `tol`.
    pub fn locate_u(&self, u: f64, tol: f64) -> KnotLocation {
        locate(&self.knots, self.periodic_normalization(u), tol)
    }

    /// Parametric tolerance matching the spatial tolerance `tol3d`, from a
    /// bound on the first derivative.
    pub fn resolution(&self, tol3d: f64) -> f64 {
        let p = self.degree;
        let n = self.poles.len();
        let count = if self.periodic { n } else { n - 1 };
        let mut bound: f64 = 0.0;
        for i in 1..=count {
            let gap = self.flat[i + p] - self.flat[i];
            if gap > 0.0 {
                let d = self.poles[i % n].distance(self.poles[i - 1]);
                bound = bound.max(p as f64 * d / gap);
            }
        }
        if let Some(w) = &self.weights {
            let max = w.iter().copied().fold(f64::MIN, f64::max);
            let min = w.iter().copied().fold(f64::MAX, f64::min);
            bound *= (max / min).powi(2);
        }
        if bound > 0.0 {
            tol3d / bound
        } else {
            tol3d
        }
    }

    /// Same tables within `tol` (poles) and parametric confusion (knots and
    /// weights).
    pub fn is_equal(&self, other: &Self, tol: f64) -> bool {
        self.degree == other.degree
            && self.periodic == other.periodic
            && self.mults == other.mults
            && self.poles.len() == other.poles.len()
            && self.knots.len() == other.knots.len()
            && self
                .knots
                .iter()
                .zip(&other.knots)
                .all(|(a, b)| (a - b).abs() <= Tolerance::PCONFUSION)
            && self
                .poles
                .iter()
                .zip(&other.poles)
                .all(|(a, b)| a.distance(*b) <= tol)
            && (0..self.poles.len()).all(|i| {
                let wa = self.weights.as_ref().map_or(1.0, |w| w[i]);
                let wb = other.weights.as_ref().map_or(1.0, |w| w[i]);
                (wa - wb).abs() <= Tolerance::PCONFUSION
            })
    }

    // -- homogeneous rows ---------------------------------------------------

    pub(super) fn stride(&self) -> usize {
        P::DIM + usize::from(self.is_rational())
    }

    fn hom_row(&self, i: usize) -> Vec<f64> {
        let p = self.poles[i];
        match &self.weights {
            Some(w) => {
                let wi = w[i];
                let mut row: Vec<f64> = (0..P::DIM).map(|d| p.coord(d) * wi).collect();
                row.push(wi);
                row
            }
            None => (0..P::DIM).map(|d| p.coord(d)).collect(),
        }
    }

    pub(super) fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.poles.len()).map(|i| self.hom_row(i)).collect()
    }

    /// Replace poles and weights from homogeneous rows.
    pub(super) fn set_rows(&mut self, rows: &[Vec<f64>], rational: bool) {
        if rational {
            let weights: Vec<f64> = rows.iter().map(|r| r[P::DIM]).collect();
            self.poles = rows
                .iter()
                .map(|r| {
                    let w = r[P::DIM];
                    let coords: Vec<f64> = r[..P::DIM].iter().map(|x| x / w).collect();
                    P::from_coords(&coords)
                })
                .collect();
            self.weights = normalize_weights(Some(weights));
        } else {
            self.poles = rows.iter().map(|r| P::from_coords(r)).collect();
            self.weights = None;
        }
    }

    /// Non-periodic curve as a [`SplineRows`].
    pub(super) fn spline_rows(&self) -> SplineRows {
        SplineRows::new(self.degree, self.flat.clone(), self.rows())
    }

    pub(super) fn unrolled(&self) -> Unrolled {
        Unrolled::new(self.degree, &self.knots, &self.mults, &self.rows())
    }

    /// Take the tables of a non-periodic spline.
    pub(super) fn apply_spline(&mut self, s: &SplineRows) {
        let rational = self.is_rational();
        let (knots, mults) = knots_and_mults(&s.flat, 0.0);
        self.degree = s.degree;
        self.knots = knots;
        self.mults = mults;
        self.periodic = false;
        self.set_rows(&s.rows, rational);
        self.update_knots();
    }

    /// Take the middle period of an unrolled copy.
    pub(super) fn apply_unrolled(&mut self, u: &Unrolled) {
        let rational = self.is_rational();
        let (knots, mults, rows) = u.fold();
        self.degree = u.spline.degree;
        self.knots = knots;
        self.mults = mults;
        self.periodic = true;
        self.set_rows(&rows, rational);
        self.update_knots();
    }

    // -- evaluation ---------------------------------------------------------

    pub(super) fn last_span(&self) -> usize {
        let n = self.poles.len();
        if self.periodic {
            n + self.degree - 1
        } else {
            n - 1
        }
    }

    fn eval_span(&self, u: f64, span: usize, order: usize) -> Vec<P> {
        let p = self.degree;
        let n = self.poles.len();
        let local: Vec<Vec<f64>> = (0..=p).map(|j| self.hom_row((span - p + j) % n)).collect();
        let hom = eval_local(p, &self.flat, span, u, &local, order);
        let coords = if self.is_rational() {
            rational_derivatives(&hom, P::DIM)
        } else {
            hom
        };
        coords.iter().map(|c| P::from_coords(c)).collect()
    }

    fn eval_point(&self, u: f64) -> P {
        let u = self.periodic_normalization(u);
        let span = find_span_in(&self.flat, self.degree, self.last_span(), u);
        self.eval_span(u, span, 0)[0]
    }

    /// Derivatives `0..=order` of the polynomial piece between knots
    /// `from_k1` and `to_k2`, whatever the global continuity.
    pub fn local_derivatives(&self, u: f64, from_k1: usize, to_k2: usize, order: usize) -> Result<Vec<P>> {
        if from_k1 == to_k2 {
            return Err(GeomError::out_of_range("local evaluation: FromK1 == ToK2"));
        }
        let m = self.knots.len();
        if from_k1 >= m || to_k2 >= m {
            return Err(GeomError::out_of_range("local evaluation: knot index out of range"));
        }
        let (k1, k2) = (from_k1.min(to_k2), from_k1.max(to_k2));
        let p = self.degree;
        let max_span = self.last_span();
        let lo = self
            .flat
            .partition_point(|&x| x <= self.knots[k1])
            .saturating_sub(1)
            .clamp(p, max_span);
        let hi = self
            .flat
            .partition_point(|&x| x < self.knots[k2])
            .saturating_sub(1)
            .clamp(lo, max_span);
        let span = find_span_in(&self.flat, lo, hi, u);
        Ok(self.eval_span(u, span, order))
    }

    pub fn local_d0(&self, u: f64, from_k1: usize, to_k2: usize) -> Result<P> {
        Ok(self.local_derivatives(u, from_k1, to_k2, 0)?[0])
    }

    pub fn local_d1(&self, u: f64, from_k1: usize, to_k2: usize) -> Result<(P, P)> {
        let d = self.local_derivatives(u, from_k1, to_k2, 1)?;
        Ok((d[0], d[1]))
    }

    pub fn local_d2(&self, u: f64, from_k1: usize, to_k2: usize) -> Result<(P, P, P)> {
        let d = self.local_derivatives(u, from_k1, to_k2, 2)?;
        Ok((d[0], d[1], d[2]))
    }

    pub fn local_d3(&self, u: f64, from_k1: usize, to_k2: usize) -> Result<(P, P, P, P)> {
        let d = self.local_derivatives(u, from_k1, to_k2, 3)?;
        Ok((d[0], d[1], d[2], d[3]))
    }

    pub fn local_dn(&self, u: f64, from_k1: usize, to_k2: usize, n: usize) -> Result<P> {
        if n < 1 {
            return Err(GeomError::out_of_range("derivative order must be at least 1"));
        }
        Ok(self.local_derivatives(u, from_k1, to_k2, n)?[n])
    }

    // -- table setters ------------------------------------------------------

    pub fn set_pole(&mut self, index: usize, pole: P) -> Result<()> {
        let slot = self
            .poles
            .get_mut(index)
            .ok_or_else(|| GeomError::out_of_range(format!("pole index {index}")))?;
        *slot = pole;
        Ok(())
    }

    pub fn set_pole_with_weight(&mut self, index: usize, pole: P, weight: f64) -> Result<()> {
        self.set_pole(index, pole)?;
        self.set_weight(index, weight)
    }

    /// Fails on a non-positive weight. Setting all weights equal makes the
    /// curve non-rational.
    pub fn set_weight(&mut self, index: usize, weight: f64) -> Result<()> {
        if index >= self.poles.len() {
            return Err(GeomError::out_of_range(format!("pole index {index}")));
        }
        if weight <= Tolerance::RESOLUTION || !weight.is_finite() {
            return Err(GeomError::construction("BSpline curve: weight too small"));
        }
        let mut w = self
            .weights
            .take()
            .unwrap_or_else(|| vec![1.0; self.poles.len()]);
        w[index] = weight;
        self.weights = normalize_weights(Some(w));
        Ok(())
    }

    /// Move one knot strictly between its neighbours.
    pub fn set_knot(&mut self, index: usize, knot: f64) -> Result<()> {
        let m = self.knots.len();
        if index >= m {
            return Err(GeomError::out_of_range(format!("knot index {index}")));
        }
        let eps = Tolerance::KNOT_EPSILON;
        if (index > 0 && knot <= self.knots[index - 1] + eps)
            || (index + 1 < m && knot >= self.knots[index + 1] - eps)
        {
            return Err(GeomError::construction("BSpline curve: knot out of order"));
        }
        self.knots[index] = knot;
        self.update_knots();
        Ok(())
    }

    /// Move a knot and raise its multiplicity to `mult`.
    pub fn set_knot_with_multiplicity(&mut self, index: usize, knot: f64, mult: usize) -> Result<()> {
        self.set_knot(index, knot)?;
        self.increase_multiplicity(index, mult)
    }

    /// Replace all knot values, keeping the multiplicities.
    pub fn set_knots(&mut self, knots: &[f64]) -> Result<()> {
        if knots.len() != self.knots.len() {
            return Err(GeomError::construction("BSpline curve: knot count mismatch"));
        }
        if knots.windows(2).any(|w| w[1] - w[0] <= Tolerance::KNOT_EPSILON) {
            return Err(GeomError::construction("BSpline curve: knots not increasing"));
        }
        self.knots = knots.to_vec();
        self.update_knots();
        Ok(())
    }

    // -- periodicity --------------------------------------------------------

    /// Turn a closed curve into a periodic one.
    ///
    /// The end knots keep `min(degree, max(first mult, last mult))` and the
    /// poles past the periodic count are dropped.
    pub fn set_periodic(&mut self) -> Result<()> {
        if self.periodic {
            return Ok(());
        }
        if self.start_point().distance(self.end_point()) > Tolerance::CONFUSION {
            return Err(GeomError::construction("BSpline curve: SetPeriodic on an open curve"));
        }
        let first = self.first_u_knot_index();
        let last = self.last_u_knot_index();
        let knots = self.knots[first..=last].to_vec();
        let mut mults = self.mults[first..=last].to_vec();
        let end = mults.len() - 1;
        let m = self.degree.min(mults[0].max(mults[end]));
        mults[0] = m;
        mults[end] = m;
        let n = nb_poles(self.degree, &mults, true);
        if n < 2 || n > self.poles.len() {
            return Err(GeomError::construction("BSpline curve: too few poles to be periodic"));
        }
        self.knots = knots;
        self.mults = mults;
        self.poles.truncate(n);
        if let Some(w) = &mut self.weights {
            w.truncate(n);
        }
        self.weights = normalize_weights(self.weights.take());
        self.periodic = true;
        self.update_knots();
        debug!(poles = n, "curve made periodic");
        Ok(())
    }

    /// Clamp a periodic curve over one period.
    pub fn set_not_periodic(&mut self) {
        if !self.periodic {
            return;
        }
        let u = Unrolled::with_periods(self.degree, &self.knots, &self.mults, &self.rows(), 1, 0);
        self.apply_spline(&u.spline);
        debug!(poles = self.poles.len(), "curve clamped");
    }

    /// Make knot `index` the start of a periodic curve.
    pub fn set_origin(&mut self, index: usize) -> Result<()> {
        if !self.periodic {
            return Err(GeomError::no_such_object("SetOrigin on a non periodic curve"));
        }
        let m = self.knots.len();
        if index >= m {
            return Err(GeomError::out_of_range(format!("knot index {index}")));
        }
        if index == 0 || index == m - 1 {
            return Ok(());
        }
        let period = self.knots[m - 1] - self.knots[0];
        let mut knots: Vec<f64> = self.knots[index..m - 1].to_vec();
        knots.extend(self.knots[..=index].iter().map(|k| k + period));
        let mut mults: Vec<usize> = self.mults[index..m - 1].to_vec();
        mults.extend_from_slice(&self.mults[..index]);
        mults.push(self.mults[index]);

        let n = self.poles.len();
        let shift: usize = self.mults[1..=index].iter().sum();
        self.poles = (0..n).map(|b| self.poles[(b + shift) % n]).collect();
        if let Some(w) = &self.weights {
            self.weights = Some((0..n).map(|b| w[(b + shift) % n]).collect());
        }
        self.knots = knots;
        self.mults = mults;
        self.update_knots();
        Ok(())
    }

    /// Make parameter `u` the start of a periodic curve, inserting a knot
    /// there unless one lies within `tol`.
    pub fn set_origin_at(&mut self, u: f64, tol: f64) -> Result<()> {
        if !self.periodic {
            return Err(GeomError::no_such_object("SetOrigin on a non periodic curve"));
        }
        let u = self.periodic_normalization(u);
        let index = match locate(&self.knots, u, tol) {
            KnotLocation::On(i) => i,
            _ => {
                self.insert_knot(u, 1, tol, false)?;
                match locate(&self.knots, u, tol) {
                    KnotLocation::On(i) => i,
                    _ => return Err(GeomError::construction("SetOrigin: knot insertion failed")),
                }
            }
        };
        self.set_origin(index)
    }
}

impl<P: Space> ParametricCurve<P> for BSplineCurve<P> {
    /// De Boor evaluation. Parameters outside a non-periodic domain
    /// extrapolate the end spans.
    fn derivatives(&self, u: f64, order: usize) -> Result<Option<Vec<P>>> {
        let u = self.periodic_normalization(u);
        let span = find_span_in(&self.flat, self.degree, self.last_span(), u);
        Ok(Some(self.eval_span(u, span, order)))
    }

    fn first_parameter(&self) -> f64 {
        self.flat[self.degree]
    }

    fn last_parameter(&self) -> f64 {
        if self.periodic {
            self.flat[self.poles.len() + self.degree]
        } else {
            self.flat[self.poles.len()]
        }
    }

    fn is_closed(&self) -> bool {
        self.periodic || self.start_point().distance(self.end_point()) <= Tolerance::RESOLUTION
    }

    fn is_periodic(&self) -> bool {
        self.periodic
    }

    fn continuity(&self) -> Continuity {
        self.continuity
    }

    /// `degree - m >= n` for every interior multiplicity `m`.
    fn is_cn(&self, n: usize) -> bool {
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
            Some(m) => m <= self.degree && n <= self.degree - m,
        }
    }

    fn reverse(&mut self) {
        let total = self.knots[0] + self.knots[self.knots.len() - 1];
        self.knots = self.knots.iter().rev().map(|k| total - k).collect();
        self.mults.reverse();
        if self.periodic {
            let n = self.poles.len() as isize;
            let base = self.degree as isize - self.mults[0] as isize;
            let mut poles = self.poles.clone();
            let mut weights = self.weights.clone();
            for b in 0..self.poles.len() {
                let to = (base - b as isize).rem_euclid(n) as usize;
                poles[to] = self.poles[b];
                if let (Some(dst), Some(src)) = (&mut weights, &self.weights) {
                    dst[to] = src[b];
                }
            }
            self.poles = poles;
            self.weights = weights;
        } else {
            self.poles.reverse();
            if let Some(w) = &mut self.weights {
                w.reverse();
            }
        }
        self.update_knots();
    }

    fn reversed_parameter(&self, u: f64) -> f64 {
        self.first_parameter() + self.last_parameter() - u
    }

    fn transform(&mut self, t: &P::Transform) {
        for p in &mut self.poles {
            *p = P::transform_point(t, *p);
        }
    }
}

impl<P: Space> Validate for BSplineCurve<P> {
    fn validate(&self) -> Result<()> {
        check_knot_table(self.degree, &self.knots, &self.mults, self.periodic, self.poles.len())?;
        if let Some(w) = &self.weights {
            if w.len() != self.poles.len() || w.iter().any(|&x| x <= Tolerance::RESOLUTION) {
                return Err(GeomError::construction("BSpline curve: invalid weights"));
            }
        }
        Ok(())
    }
}
