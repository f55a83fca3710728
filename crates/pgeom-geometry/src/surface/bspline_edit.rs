//! Structural edits of [`BSplineSurface`], one direction at a time.
//!
//! Each edit treats the surface as a spline along the edited direction
//! whose poles are whole lines of surface poles, so the curve kernel
//! applies unchanged.

use pgeom_core::{GeomError, Result, Tolerance};
use tracing::debug;

use super::bspline::{BSplineSurface, Dir};
use crate::bspline::knots::{locate, nb_poles, KnotLocation, MAX_DEGREE};
use crate::bspline::Unrolled;

impl BSplineSurface {
    /// Insert `u` knots; see [`BSplineCurve::insert_knots`](crate::curve::BSplineCurve::insert_knots).
    pub fn insert_u_knots(&mut self, knots: &[f64], mults: &[usize], tol: f64, add: bool) -> Result<()> {
        self.insert_knots(Dir::U, knots, mults, tol, add)
    }

    pub fn insert_v_knots(&mut self, knots: &[f64], mults: &[usize], tol: f64, add: bool) -> Result<()> {
        self.insert_knots(Dir::V, knots, mults, tol, add)
    }

    pub fn insert_u_knot(&mut self, u: f64, mult: usize, tol: f64, add: bool) -> Result<()> {
        self.insert_knots(Dir::U, &[u], &[mult], tol, add)
    }

    pub fn insert_v_knot(&mut self, v: f64, mult: usize, tol: f64, add: bool) -> Result<()> {
        self.insert_knots(Dir::V, &[v], &[mult], tol, add)
    }

    pub fn increase_u_multiplicity(&mut self, index: usize, mult: usize) -> Result<()> {
        let u = self.u_knot(index)?;
        self.insert_knots(Dir::U, &[u], &[mult], 0.0, false)
    }

    pub fn increase_v_multiplicity(&mut self, index: usize, mult: usize) -> Result<()> {
        let v = self.v_knot(index)?;
        self.insert_knots(Dir::V, &[v], &[mult], 0.0, false)
    }

    fn insert_knots(&mut self, dir: Dir, knots: &[f64], mults: &[usize], tol: f64, add: bool) -> Result<()> {
        if knots.len() != mults.len() {
            return Err(GeomError::construction("InsertKnots: knots and multiplicities differ in size"));
        }
        let n = self.nb_poles(dir);
        let table = self.table(dir);
        let (degree, periodic) = (table.degree, table.periodic);
        let (first, last) = (table.first(), table.last(n));

        let mut plan: Vec<(f64, usize)> = Vec::with_capacity(knots.len());
        for (&u, &m) in knots.iter().zip(mults) {
            if !periodic && (u < first - tol || u > last + tol) {
                return Err(GeomError::construction("InsertKnots: knot outside the surface domain"));
            }
            let u = table.normalize(u, n);
            let (u, current) = match locate(&table.knots, u, tol) {
                KnotLocation::On(i) => (table.knots[i], table.mults[i]),
                _ => (u, 0),
            };
            if !periodic && (u <= first || u >= last) {
                continue;
            }
            let pending: usize = plan.iter().filter(|(x, _)| *x == u).map(|(_, t)| t).sum();
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

        if periodic {
            let mut unrolled = self.unrolled(dir);
            for &(u, times) in &plan {
                for x in unrolled.copies(u) {
                    unrolled.spline.insert(x, times);
                }
            }
            self.apply_unrolled(dir, &unrolled);
        } else {
            let mut s = self.spline_rows(dir);
            for &(u, times) in &plan {
                s.insert(u, times);
            }
            self.apply_spline(dir, &s);
        }
        debug!(?dir, count = plan.len(), "surface knots inserted");
        Ok(())
    }

    /// Lower the multiplicity of u knot `index` to `mult` if no pole moves
    /// by more than `tol`. `Ok(false)` leaves the surface unchanged.
    pub fn remove_u_knot(&mut self, index: usize, mult: usize, tol: f64) -> Result<bool> {
        self.remove_knot(Dir::U, index, mult, tol)
    }

    pub fn remove_v_knot(&mut self, index: usize, mult: usize, tol: f64) -> Result<bool> {
        self.remove_knot(Dir::V, index, mult, tol)
    }

    fn remove_knot(&mut self, dir: Dir, index: usize, mult: usize, tol: f64) -> Result<bool> {
        let n = self.nb_poles(dir);
        let table = self.table(dir);
        let last = table.knots.len() - 1;
        if index > last {
            return Err(GeomError::out_of_range(format!("knot index {index}")));
        }
        if !table.periodic && (index <= table.first_knot_index() || index >= table.last_knot_index(n)) {
            return Err(GeomError::out_of_range("RemoveKnot: end knots are not removable"));
        }
        let current = table.mults[index];
        if mult >= current {
            return Ok(true);
        }
        let u = table.knots[index];
        let times = current - mult;
        let stride = self.stride();

        if table.periodic {
            if mult == 0 && (index == 0 || index == last) {
                return Ok(false);
            }
            let mut unrolled = self.unrolled(dir);
            for _ in 0..times {
                for x in unrolled.copies(u) {
                    if !unrolled.spline.remove_once(x, tol, stride) {
                        return Ok(false);
                    }
                }
            }
            self.apply_unrolled(dir, &unrolled);
        } else {
            let mut s = self.spline_rows(dir);
            for _ in 0..times {
                if !s.remove_once(u, tol, stride) {
                    debug!(?dir, u, tol, "surface knot removal rejected");
                    return Ok(false);
                }
            }
            self.apply_spline(dir, &s);
        }
        Ok(true)
    }

    /// Elevate the degrees to `u_degree` and `v_degree` without changing
    /// the shape.
    pub fn increase_degree(&mut self, u_degree: usize, v_degree: usize) -> Result<()> {
        for (dir, target) in [(Dir::U, u_degree), (Dir::V, v_degree)] {
            let current = self.table(dir).degree;
            if target < current {
                return Err(GeomError::construction("IncreaseDegree: degree below the current one"));
            }
            if target > MAX_DEGREE {
                return Err(GeomError::construction(format!(
                    "IncreaseDegree: degree {target} above {MAX_DEGREE}"
                )));
            }
        }
        for (dir, target) in [(Dir::U, u_degree), (Dir::V, v_degree)] {
            let t = target - self.table(dir).degree;
            if t == 0 {
                continue;
            }
            let stride = self.stride();
            if self.table(dir).periodic {
                let mut unrolled = self.unrolled(dir);
                unrolled.spline = unrolled.spline.elevate(t, stride);
                self.apply_unrolled(dir, &unrolled);
            } else {
                let s = self.spline_rows(dir);
                let clamped = s.trim(s.first(), s.last());
                self.apply_spline(dir, &clamped.elevate(t, stride));
            }
        }
        debug!(u_degree, v_degree, "surface degree elevated");
        Ok(())
    }

    /// Restrict the surface to `[u1, u2] x [v1, v2]`.
    ///
    /// Each direction follows the curve rules: bounds within `tol` of a knot
    /// snap to it, periodic directions may be cut across the seam and become
    /// non-periodic, and bounds past a non-periodic domain are clamped.
    pub fn segment(&mut self, u1: f64, u2: f64, v1: f64, v2: f64, tol: f64) -> Result<()> {
        let mut copy = self.clone();
        copy.segment_dir(Dir::U, u1, u2, tol)?;
        copy.segment_dir(Dir::V, v1, v2, tol)?;
        *self = copy;
        debug!(u1, u2, v1, v2, "surface segmented");
        Ok(())
    }

    /// Restrict one direction, leaving the other untouched.
    pub fn check_and_segment_u(&mut self, u1: f64, u2: f64, tol: f64) -> Result<()> {
        self.segment_dir(Dir::U, u1, u2, tol)
    }

    pub fn check_and_segment_v(&mut self, v1: f64, v2: f64, tol: f64) -> Result<()> {
        self.segment_dir(Dir::V, v1, v2, tol)
    }

    fn segment_dir(&mut self, dir: Dir, t1: f64, t2: f64, tol: f64) -> Result<()> {
        if t2 <= t1 + Tolerance::PCONFUSION {
            return Err(GeomError::domain("Segment: second bound must be greater than the first"));
        }
        let n = self.nb_poles(dir);
        let table = self.table(dir);
        if table.periodic {
            let period = table.last(n) - table.first();
            if t2 - t1 > period + Tolerance::PCONFUSION {
                return Err(GeomError::domain("Segment: more than one period"));
            }
            let a = table.normalize(t1, n);
            let b = (a + (t2 - t1)).min(a + period);
            let unrolled = Unrolled::with_periods(table.degree, &table.knots, &table.mults, &self.rows(dir), 2, 0);
            let s = &unrolled.spline;
            let mut piece = s.trim(s.snap(a, tol), s.snap(b, tol));
            let shift = t1 - a;
            for k in &mut piece.flat {
                *k += shift;
            }
            self.apply_spline(dir, &piece);
        } else {
            let s = self.spline_rows(dir);
            let a = s.snap(t1.max(s.first()), tol);
            let b = s.snap(t2.min(s.last()), tol);
            if b <= a {
                return Err(GeomError::domain("Segment: empty range inside the surface domain"));
            }
            self.apply_spline(dir, &s.trim(a, b));
        }
        Ok(())
    }

    /// Make the u direction periodic; the first and last pole rows must
    /// coincide.
    pub fn set_u_periodic(&mut self) -> Result<()> {
        self.set_periodic(Dir::U)
    }

    pub fn set_v_periodic(&mut self) -> Result<()> {
        self.set_periodic(Dir::V)
    }

    fn set_periodic(&mut self, dir: Dir) -> Result<()> {
        if self.table(dir).periodic {
            return Ok(());
        }
        if !self.end_lines_match(dir) {
            return Err(GeomError::construction("BSpline surface: SetPeriodic on an open direction"));
        }
        let n_open = self.nb_poles(dir);
        let table = self.table(dir);
        let (first, last) = (table.first_knot_index(), table.last_knot_index(n_open));
        let knots = table.knots[first..=last].to_vec();
        let mut mults = table.mults[first..=last].to_vec();
        let end = mults.len() - 1;
        let m = table.degree.min(mults[0].max(mults[end]));
        mults[0] = m;
        mults[end] = m;
        let degree = table.degree;
        let n = nb_poles(degree, &mults, true);
        if n < 2 || n > n_open {
            return Err(GeomError::construction("BSpline surface: too few poles to be periodic"));
        }
        let rational = self.is_rational();
        let mut rows = self.rows(dir);
        rows.truncate(n);
        self.table_mut(dir).apply_periodic(degree, knots, mults);
        self.set_rows(dir, &rows, rational);
        debug!(?dir, poles = n, "surface direction made periodic");
        Ok(())
    }

    /// Clamp a periodic u direction over one period.
    pub fn set_u_not_periodic(&mut self) {
        self.set_not_periodic(Dir::U);
    }

    pub fn set_v_not_periodic(&mut self) {
        self.set_not_periodic(Dir::V);
    }

    fn set_not_periodic(&mut self, dir: Dir) {
        let table = self.table(dir);
        if !table.periodic {
            return;
        }
        let u = Unrolled::with_periods(table.degree, &table.knots, &table.mults, &self.rows(dir), 1, 0);
        self.apply_spline(dir, &u.spline);
    }
}
