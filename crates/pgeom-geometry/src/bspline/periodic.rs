//! Periodic knot tables edited through a clamped multi-period copy.
//!
//! A periodic edit unrolls the table over a few periods, clamps the copy,
//! applies the edit to every period and reads one period back from the
//! middle, far enough from the clamped ends to be unaffected by them.

use tracing::trace;

use super::edit::SplineRows;
use super::knots::{knots_and_mults, nb_poles, periodic_flat_knots};

/// A periodic table unrolled into a clamped [`SplineRows`].
#[derive(Debug, Clone)]
pub struct Unrolled {
    pub spline: SplineRows,
    pub origin: f64,
    pub period: f64,
    /// Number of periods in the copy.
    pub periods: usize,
    /// Index of the period read back by [`Unrolled::fold`].
    pub middle: usize,
}

impl Unrolled {
    /// Unroll `rows` (one per periodic pole) over enough periods for
    /// edits of the middle period to stay clear of the clamped ends.
    pub fn new(degree: usize, knots: &[f64], mults: &[usize], rows: &[Vec<f64>]) -> Self {
        let n = nb_poles(degree, mults, true);
        let middle = 1 + degree / n.max(1);
        Self::with_periods(degree, knots, mults, rows, 2 * middle + 1, middle)
    }

    /// Unroll over exactly `periods` periods, clamped at both ends.
    pub fn with_periods(
        degree: usize,
        knots: &[f64],
        mults: &[usize],
        rows: &[Vec<f64>],
        periods: usize,
        middle: usize,
    ) -> Self {
        let n = rows.len();
        let flat = periodic_flat_knots(degree, knots, mults, periods);
        let ext: Vec<Vec<f64>> = (0..periods * n + degree)
            .map(|b| rows[b % n].clone())
            .collect();
        let raw = SplineRows::new(degree, flat, ext);
        let spline = raw.trim(raw.first(), raw.last());
        let origin = knots[0];
        let period = knots[knots.len() - 1] - knots[0];
        trace!(periods, poles = n, "periodic table unrolled");
        Self {
            spline,
            origin,
            period,
            periods,
            middle,
        }
    }

    /// Copies of `u` (taken modulo the period) strictly inside the unrolled
    /// domain, in increasing order.
    pub fn copies(&self, u: f64) -> Vec<f64> {
        let base = u - ((u - self.origin) / self.period).floor() * self.period;
        let (first, last) = (self.spline.first(), self.spline.last());
        (0..=self.periods)
            .map(|j| base + j as f64 * self.period)
            .filter(|&v| v > first && v < last)
            .collect()
    }

    /// Read one period back from the middle copy.
    ///
    /// Returns the periodic knots (starting at `origin`), multiplicities and
    /// pole rows.
    pub fn fold(&self) -> (Vec<f64>, Vec<usize>, Vec<Vec<f64>>) {
        let s = &self.spline;
        let p = s.degree;
        let eps = self.period.abs() * 1e-12 + f64::MIN_POSITIVE;
        let start = self.origin + self.middle as f64 * self.period;
        let end = start + self.period;

        let mut window = Vec::new();
        let mut seam_last = None;
        for (i, &k) in s.flat.iter().enumerate() {
            if k < start - eps || k > end + eps {
                continue;
            }
            if (k - start).abs() <= eps {
                seam_last = Some(i);
            }
            window.push(k);
        }
        // repeats merge in the unrolled frame
        let (mut knots, mults) = knots_and_mults(&window, eps);
        let shift = self.middle as f64 * self.period;
        for k in &mut knots {
            *k -= shift;
        }
        // exact seam values
        if let Some(first) = knots.first_mut() {
            *first = self.origin;
        }
        if let Some(last) = knots.last_mut() {
            *last = self.origin + self.period;
        }

        let n = nb_poles(p, &mults, true);
        let from = seam_last.unwrap_or(p).saturating_sub(p);
        let rows = s.rows[from..from + n].to_vec();
        (knots, mults, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bspline::eval::eval_local;
    use crate::bspline::knots::{find_span_in, flat_knots};

    fn periodic_point(degree: usize, knots: &[f64], mults: &[usize], rows: &[Vec<f64>], u: f64) -> Vec<f64> {
        let flat = flat_knots(degree, knots, mults, true);
        let n = rows.len();
        let span = find_span_in(&flat, degree, n + degree - 1, u);
        let local: Vec<Vec<f64>> = (0..=degree)
            .map(|j| rows[(span - degree + j) % n].clone())
            .collect();
        eval_local(degree, &flat, span, u, &local, 0).swap_remove(0)
    }

    fn square() -> (Vec<f64>, Vec<usize>, Vec<Vec<f64>>) {
        (
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![1, 1, 1, 1, 1],
            vec![
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![-1.0, 0.0],
                vec![0.0, -1.0],
            ],
        )
    }

    #[test]
    fn test_unroll_then_fold_is_identity() {
        let (knots, mults, rows) = square();
        let u = Unrolled::new(2, &knots, &mults, &rows);
        let (k2, m2, r2) = u.fold();
        assert_eq!(k2, knots);
        assert_eq!(m2, mults);
        for (a, b) in r2.iter().zip(&rows) {
            assert!((a[0] - b[0]).abs() < 1e-12 && (a[1] - b[1]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_insert_in_every_period() {
        let (knots, mults, rows) = square();
        let mut u = Unrolled::new(2, &knots, &mults, &rows);
        for v in u.copies(2.5) {
            u.spline.insert(v, 1);
        }
        let (k2, m2, r2) = u.fold();
        assert_eq!(k2, vec![0.0, 1.0, 2.0, 2.5, 3.0, 4.0]);
        assert_eq!(m2, vec![1, 1, 1, 1, 1, 1]);
        assert_eq!(r2.len(), 5);
        for i in 0..=16 {
            let t = 4.0 * i as f64 / 16.0;
            let a = periodic_point(2, &knots, &mults, &rows, t);
            let b = periodic_point(2, &k2, &m2, &r2, t);
            assert!((a[0] - b[0]).abs() < 1e-12 && (a[1] - b[1]).abs() < 1e-12, "t={}", t);
        }
    }

    #[test]
    fn test_fold_merges_repeated_knots() {
        let knots = vec![0.0, 1.0, 2.5, 4.0];
        let mults = vec![2, 1, 2, 2];
        let rows = vec![
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![-1.0, 1.5],
            vec![-1.0, -1.0],
            vec![0.5, -1.0],
        ];
        let u = Unrolled::new(2, &knots, &mults, &rows);
        assert!(u.middle > 0);
        let (k2, m2, _) = u.fold();
        assert_eq!(k2, knots);
        assert_eq!(m2, mults);

        let mut e = Unrolled::new(2, &knots, &mults, &rows);
        for v in e.copies(3.0) {
            e.spline.insert(v, 1);
        }
        let (k3, m3, r3) = e.fold();
        assert_eq!(k3, vec![0.0, 1.0, 2.5, 3.0, 4.0]);
        assert_eq!(m3, vec![2, 1, 2, 1, 2]);
        assert_eq!(r3.len(), 6);
        for i in 0..=16 {
            let t = 4.0 * i as f64 / 16.0;
            let a = periodic_point(2, &knots, &mults, &rows, t);
            let b = periodic_point(2, &k3, &m3, &r3, t);
            assert!((a[0] - b[0]).abs() < 1e-12 && (a[1] - b[1]).abs() < 1e-12, "t={}", t);
        }
    }

    #[test]
    fn test_copies_skip_clamped_ends() {
        let (knots, mults, rows) = square();
        let u = Unrolled::with_periods(2, &knots, &mults, &rows, 3, 1);
        assert_eq!(u.copies(0.0), vec![4.0, 8.0]);
        assert_eq!(u.copies(5.0), vec![1.0, 5.0, 9.0]);
    }
}
