//! Structural and shape edits of [`BSplineCurve`].
//!
//! Non-periodic edits run on a [`SplineRows`] copy of the curve, periodic
//! ones on an unrolled copy folded back afterwards. A failed edit leaves the
//! curve untouched.

use nalgebra::Matrix2;
use pgeom_core::{GeomError, Result, Tolerance};
use pgeom_math::Space;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BSplineCurve, ParametricCurve};
use crate::bspline::knots::{basis_function_derivatives, find_span_in, locate, KnotLocation, MAX_DEGREE};

/// Outcome of [`BSplineCurve::move_point_and_tangent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveStatus {
    /// The curve now passes through the point with the tangent.
    Done,
    /// Fewer than two free poles influence the curve at the parameter.
    NotEnoughPoles,
    /// The point and tangent constraints are not independent there.
    Singular,
}

/// Basis weight of a pole at a parameter, with its first derivative.
struct PoleCoefficient {
    index: usize,
    value: f64,
    derivative: f64,
}

impl<P: Space> BSplineCurve<P> {
    /// Snap `u` to a knot of the table within `tol`.
    fn snap_to_knot(&self, u: f64, tol: f64) -> (f64, usize) {
        match locate(self.knots(), u, tol) {
            KnotLocation::On(i) => (self.knots()[i], self.multiplicities()[i]),
            _ => (u, 0),
        }
    }

    /// Insert `u` so that its multiplicity becomes `mult` (or grows by
    /// `mult` when `add` is set). A knot within `tol` of an existing one is
    /// merged with it.
    pub fn insert_knot(&mut self, u: f64, mult: usize, tol: f64, add: bool) -> Result<()> {
        self.insert_knots(&[u], &[mult], tol, add)
    }

    /// Insert several knots; see [`insert_knot`](Self::insert_knot).
    pub fn insert_knots(&mut self, knots: &[f64], mults: &[usize], tol: f64, add: bool) -> Result<()> {
        if knots.len() != mults.len() {
            return Err(GeomError::construction("InsertKnots: knots and multiplicities differ in size"));
        }
        let degree = self.degree();
        let (first, last) = (self.first_parameter(), self.last_parameter());

        let mut plan: Vec<(f64, usize)> = Vec::with_capacity(knots.len());
        for (&u, &m) in knots.iter().zip(mults) {
            let u = if self.is_periodic() {
                self.periodic_normalization(u)
            } else {
                if u < first - tol || u > last + tol {
                    return Err(GeomError::construction("InsertKnots: knot outside the curve domain"));
                }
                u
            };
            let (u, current) = self.snap_to_knot(u, tol);
            // end knots of an open curve keep their multiplicity
            if !self.is_periodic() && (u <= first || u >= last) {
                continue;
            }
            // repeated values in one call accumulate
            let pending: usize = plan.iter().filter(|(v, _)| *v == u).map(|(_, t)| t).sum();
            let current = current + pending;
            let target = if add { current + m } else { m.max(current) };
            if target > degree {
                return Err(GeomError::construction(format!(
                    "InsertKnots: multiplicity {target} above degree {degree}"
                )));
            }
            if target > current {
                plan.push((u, target - current));
            }
        }
        if plan.is_empty() {
            return Ok(());
        }

        if self.is_periodic() {
            let mut unrolled = self.unrolled();
            for &(u, times) in &plan {
                for v in unrolled.copies(u) {
                    unrolled.spline.insert(v, times);
                }
            }
            self.apply_unrolled(&unrolled);
        } else {
            let mut s = self.spline_rows();
            for &(u, times) in &plan {
                s.insert(u, times);
            }
            self.apply_spline(&s);
        }
        debug!(count = plan.len(), poles = self.nb_poles(), "knots inserted");
        Ok(())
    }

    /// Raise the multiplicity of knot `index` to `mult`.
    pub fn increase_multiplicity(&mut self, index: usize, mult: usize) -> Result<()> {
        let u = self.knot(index)?;
        self.insert_knot(u, mult, 0.0, false)
    }

    /// Raise the multiplicities of knots `i1..=i2` to `mult`.
    pub fn increase_multiplicity_range(&mut self, i1: usize, i2: usize, mult: usize) -> Result<()> {
        let values = self.knot_range(i1, i2)?;
        let mults = vec![mult; values.len()];
        self.insert_knots(&values, &mults, 0.0, false)
    }

    /// Add `step` to the multiplicities of knots `i1..=i2`.
    pub fn increment_multiplicity(&mut self, i1: usize, i2: usize, step: usize) -> Result<()> {
        let values = self.knot_range(i1, i2)?;
        let mults = vec![step; values.len()];
        self.insert_knots(&values, &mults, 0.0, true)
    }

    fn knot_range(&self, i1: usize, i2: usize) -> Result<Vec<f64>> {
        if i1 > i2 || i2 >= self.nb_knots() {
            return Err(GeomError::out_of_range(format!("knot range {i1}..={i2}")));
        }
        Ok(self.knots()[i1..=i2].to_vec())
    }

    /// Lower the multiplicity of knot `index` to `mult` (0 removes the
    /// knot) if the shape moves by at most `tol`.
    ///
    /// Returns `Ok(false)`, leaving the curve unchanged, when the knot is not
    /// removable at this tolerance.
    pub fn remove_knot(&mut self, index: usize, mult: usize, tol: f64) -> Result<bool> {
        let last = self.nb_knots() - 1;
        if index > last {
            return Err(GeomError::out_of_range(format!("knot index {index}")));
        }
        if !self.is_periodic() && (index <= self.first_u_knot_index() || index >= self.last_u_knot_index()) {
            return Err(GeomError::out_of_range("RemoveKnot: end knots are not removable"));
        }
        let current = self.multiplicities()[index];
        if mult >= current {
            return Ok(true);
        }
        let u = self.knots()[index];
        let times = current - mult;
        let stride = self.stride();

        if self.is_periodic() {
            if mult == 0 && (index == 0 || index == last) {
                return Ok(false);
            }
            let mut unrolled = self.unrolled();
            for _ in 0..times {
                for v in unrolled.copies(u) {
                    if !unrolled.spline.remove_once(v, tol, stride) {
                        debug!(u, tol, "periodic knot removal rejected");
                        return Ok(false);
                    }
                }
            }
            self.apply_unrolled(&unrolled);
        } else {
            let mut s = self.spline_rows();
            for _ in 0..times {
                if !s.remove_once(u, tol, stride) {
                    debug!(u, tol, "knot removal rejected");
                    return Ok(false);
                }
            }
            self.apply_spline(&s);
        }
        debug!(u, mult, "knot multiplicity lowered");
        Ok(true)
    }

    /// Elevate the degree to `degree` without changing the shape.
    pub fn increase_degree(&mut self, degree: usize) -> Result<()> {
        let current = self.degree();
        if degree == current {
            return Ok(());
        }
        if degree < current {
            return Err(GeomError::construction("IncreaseDegree: degree below the current one"));
        }
        if degree > MAX_DEGREE {
            return Err(GeomError::construction(format!(
                "IncreaseDegree: degree {degree} above {MAX_DEGREE}"
            )));
        }
        let t = degree - current;
        let stride = self.stride();
        if self.is_periodic() {
            let mut unrolled = self.unrolled();
            unrolled.spline = unrolled.spline.elevate(t, stride);
            self.apply_unrolled(&unrolled);
        } else {
            let s = self.spline_rows();
            let clamped = s.trim(s.first(), s.last());
            self.apply_spline(&clamped.elevate(t, stride));
        }
        debug!(from = current, to = degree, "curve degree elevated");
        Ok(())
    }

    /// Restrict the curve to `[u1, u2]`.
    ///
    /// Bounds within `tol` of a knot are snapped to it. A periodic curve may
    /// be cut across its seam; the result is always non-periodic and, for a
    /// periodic curve, parameterized over `[u1, u2]`. Bounds outside a
    /// non-periodic domain are clamped to it.
    pub fn segment(&mut self, u1: f64, u2: f64, tol: f64) -> Result<()> {
        if u2 <= u1 + Tolerance::PCONFUSION {
            return Err(GeomError::domain("Segment: U2 must be greater than U1"));
        }
        if self.is_periodic() {
            let period = self.period()?;
            if u2 - u1 > period + Tolerance::PCONFUSION {
                return Err(GeomError::domain("Segment: more than one period"));
            }
            let a = self.periodic_normalization(u1);
            let b = (a + (u2 - u1)).min(a + period);
            let unrolled = crate::bspline::Unrolled::with_periods(
                self.degree(),
                self.knots(),
                self.multiplicities(),
                &self.rows(),
                2,
                0,
            );
            let s = &unrolled.spline;
            let (sa, sb) = (s.snap(a, tol), s.snap(b, tol));
            let mut piece = s.trim(sa, sb);
            let shift = u1 - a;
            for k in &mut piece.flat {
                *k += shift;
            }
            self.apply_spline(&piece);
        } else {
            let s = self.spline_rows();
            let a = s.snap(u1.max(s.first()), tol);
            let b = s.snap(u2.min(s.last()), tol);
            if b <= a {
                return Err(GeomError::domain("Segment: empty range inside the curve domain"));
            }
            self.apply_spline(&s.trim(a, b));
        }
        debug!(u1, u2, poles = self.nb_poles(), "curve segmented");
        Ok(())
    }

    fn check_bezier_form(&self) -> Result<()> {
        let clamped = self.multiplicities().iter().all(|&m| m == self.degree() + 1);
        if self.is_periodic() || self.nb_knots() != 2 || !clamped {
            return Err(GeomError::construction("pole insertion or removal needs a Bezier curve"));
        }
        Ok(())
    }

    fn all_weights(&self) -> Vec<f64> {
        self.weights()
            .map_or_else(|| vec![1.0; self.nb_poles()], <[f64]>::to_vec)
    }

    /// Insert a pole after pole `index` of a Bezier curve, raising its
    /// degree by one.
    pub fn insert_pole_after(&mut self, index: usize, pole: P, weight: f64) -> Result<()> {
        if index >= self.nb_poles() {
            return Err(GeomError::out_of_range(format!("pole index {index}")));
        }
        self.insert_pole_at(index + 1, pole, weight)
    }

    /// Insert a pole before pole `index` of a Bezier curve.
    pub fn insert_pole_before(&mut self, index: usize, pole: P, weight: f64) -> Result<()> {
        if index >= self.nb_poles() {
            return Err(GeomError::out_of_range(format!("pole index {index}")));
        }
        self.insert_pole_at(index, pole, weight)
    }

    fn insert_pole_at(&mut self, at: usize, pole: P, weight: f64) -> Result<()> {
        self.check_bezier_form()?;
        if self.degree() + 1 > MAX_DEGREE {
            return Err(GeomError::construction("InsertPole: degree would exceed the maximum"));
        }
        if weight <= Tolerance::RESOLUTION || !weight.is_finite() {
            return Err(GeomError::construction("InsertPole: weight too small"));
        }
        let (first, last) = (self.first_parameter(), self.last_parameter());
        let mut poles = self.poles().to_vec();
        let mut weights = self.all_weights();
        poles.insert(at, pole);
        weights.insert(at, weight);
        let n = poles.len();
        *self = Self::new(poles, Some(weights), vec![first, last], vec![n, n], n - 1, false)?;
        Ok(())
    }

    /// Remove pole `index` of a Bezier curve, lowering its degree by one.
    pub fn remove_pole(&mut self, index: usize) -> Result<()> {
        if index >= self.nb_poles() {
            return Err(GeomError::out_of_range(format!("pole index {index}")));
        }
        self.check_bezier_form()?;
        if self.nb_poles() <= 2 {
            return Err(GeomError::construction("RemovePole: a curve keeps at least 2 poles"));
        }
        let (first, last) = (self.first_parameter(), self.last_parameter());
        let mut poles = self.poles().to_vec();
        let mut weights = self.all_weights();
        poles.remove(index);
        weights.remove(index);
        let n = poles.len();
        *self = Self::new(poles, Some(weights), vec![first, last], vec![n, n], n - 1, false)?;
        Ok(())
    }

    /// Rational basis values and derivatives of the poles acting at `u`,
    /// summed per pole for periodic curves that wrap.
    fn pole_coefficients(&self, u: f64) -> Vec<PoleCoefficient> {
        let p = self.degree();
        let n = self.nb_poles();
        let u = self.periodic_normalization(u);
        let flat = self.knot_sequence();
        let span = find_span_in(flat, p, self.last_span(), u);
        let ders = basis_function_derivatives(p, flat, span, u, 1);
        let index = |j: usize| (span - p + j) % n;
        let weight = |j: usize| self.weights().map_or(1.0, |w| w[index(j)]);

        let sum: f64 = (0..=p).map(|j| ders[0][j] * weight(j)).sum();
        let dsum: f64 = (0..=p).map(|j| ders[1][j] * weight(j)).sum();
        let mut out: Vec<PoleCoefficient> = Vec::with_capacity(p + 1);
        for j in 0..=p {
            let w = weight(j);
            let value = ders[0][j] * w / sum;
            let derivative = (ders[1][j] * w * sum - ders[0][j] * w * dsum) / (sum * sum);
            match out.iter_mut().find(|c| c.index == index(j)) {
                Some(c) => {
                    c.value += value;
                    c.derivative += derivative;
                }
                None => out.push(PoleCoefficient {
                    index: index(j),
                    value,
                    derivative,
                }),
            }
        }
        out
    }

    /// Move poles `index1..=index2` so that the curve passes through `point`
    /// at `u`, with the smallest displacement.
    ///
    /// Returns the range of poles actually moved, `None` when no pole of the
    /// range acts at `u`.
    pub fn move_point(&mut self, u: f64, point: P, index1: usize, index2: usize) -> Result<Option<(usize, usize)>> {
        if index1 > index2 || index2 >= self.nb_poles() {
            return Err(GeomError::out_of_range(format!("pole range {index1}..={index2}")));
        }
        let coeffs: Vec<PoleCoefficient> = self
            .pole_coefficients(u)
            .into_iter()
            .filter(|c| c.index >= index1 && c.index <= index2 && c.value != 0.0)
            .collect();
        let norm: f64 = coeffs.iter().map(|c| c.value * c.value).sum();
        if coeffs.is_empty() || norm <= 0.0 {
            return Ok(None);
        }
        let displacement = point - self.value(u)?;
        for c in &coeffs {
            let moved = self.pole(c.index)? + displacement * (c.value / norm);
            self.set_pole(c.index, moved)?;
        }
        let first = coeffs.iter().map(|c| c.index).min().unwrap_or(index1);
        let last = coeffs.iter().map(|c| c.index).max().unwrap_or(index2);
        Ok(Some((first, last)))
    }

    /// Move poles so that the curve passes through `point` with first
    /// derivative `tangent` at `u`.
    ///
    /// `fixed_start` and `fixed_end` poles stay in place at each end of a
    /// non-periodic curve: 1 keeps the end point, 2 also keeps the end
    /// tangent. Nothing moves when the curve is already within `tol`.
    pub fn move_point_and_tangent(
        &mut self,
        u: f64,
        point: P,
        tangent: P,
        tol: f64,
        fixed_start: usize,
        fixed_end: usize,
    ) -> Result<MoveStatus> {
        let n = self.nb_poles();
        let (lo, hi) = if self.is_periodic() {
            (0, n - 1)
        } else {
            if fixed_start + fixed_end >= n {
                return Ok(MoveStatus::NotEnoughPoles);
            }
            (fixed_start, n - 1 - fixed_end)
        };
        let coeffs: Vec<PoleCoefficient> = self
            .pole_coefficients(u)
            .into_iter()
            .filter(|c| c.index >= lo && c.index <= hi && (c.value != 0.0 || c.derivative != 0.0))
            .collect();
        if coeffs.len() < 2 {
            return Ok(MoveStatus::NotEnoughPoles);
        }

        let (at, d1) = self.d1(u)?;
        let dp = point - at;
        let dt = tangent - d1;
        if dp.length() <= tol && dt.length() <= tol {
            return Ok(MoveStatus::Done);
        }

        let (mut g00, mut g01, mut g11) = (0.0, 0.0, 0.0);
        for c in &coeffs {
            g00 += c.value * c.value;
            g01 += c.value * c.derivative;
            g11 += c.derivative * c.derivative;
        }
        let gram = Matrix2::new(g00, g01, g01, g11);
        let det = gram.determinant();
        let Some(inv) = gram.try_inverse().filter(|_| det.abs() > f64::EPSILON * g00 * g11) else {
            return Ok(MoveStatus::Singular);
        };
        let x = dp * inv[(0, 0)] + dt * inv[(0, 1)];
        let y = dp * inv[(1, 0)] + dt * inv[(1, 1)];
        for c in &coeffs {
            let moved = self.pole(c.index)? + x * c.value + y * c.derivative;
            self.set_pole(c.index, moved)?;
        }
        debug!(u, poles = coeffs.len(), "point and tangent moved");
        Ok(MoveStatus::Done)
    }
}
