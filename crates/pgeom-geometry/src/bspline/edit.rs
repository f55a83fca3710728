//! Structural edits on a non-periodic B-spline over pole rows.
//!
//! [`SplineRows`] pairs a flat knot sequence with one row of homogeneous
//! coordinates per pole. Curves use one row per pole; surfaces edit one
//! direction at a time with every row holding a whole line of poles.

use tracing::trace;

use crate::derivative::binomial;

/// A non-periodic B-spline: degree, flat knots and pole rows, with
/// `flat.len() == rows.len() + degree + 1`. The ends need not be clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineRows {
    pub degree: usize,
    pub flat: Vec<f64>,
    pub rows: Vec<Vec<f64>>,
}

fn lerp(a: &[f64], b: &[f64], t: f64) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| (1.0 - t) * x + t * y).collect()
}

/// Largest euclidean distance between matching `stride`-wide chunks.
fn chunk_distance(a: &[f64], b: &[f64], stride: usize) -> f64 {
    a.chunks(stride)
        .zip(b.chunks(stride))
        .map(|(x, y)| {
            x.iter()
                .zip(y)
                .map(|(p, q)| (p - q) * (p - q))
                .sum::<f64>()
                .sqrt()
        })
        .fold(0.0, f64::max)
}

impl SplineRows {
    pub fn new(degree: usize, flat: Vec<f64>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(flat.len(), rows.len() + degree + 1);
        Self { degree, flat, rows }
    }

    /// Start of the parametric domain.
    pub fn first(&self) -> f64 {
        self.flat[self.degree]
    }

    /// End of the parametric domain.
    pub fn last(&self) -> f64 {
        self.flat[self.rows.len()]
    }

    /// Number of flat entries exactly equal to `u`.
    pub fn multiplicity(&self, u: f64) -> usize {
        self.flat.iter().filter(|&&k| k == u).count()
    }

    /// `u`, or the closest flat knot when one lies within `tol`.
    pub fn snap(&self, u: f64, tol: f64) -> f64 {
        self.flat
            .iter()
            .copied()
            .filter(|k| (k - u).abs() <= tol)
            .min_by(|a, b| (a - u).abs().total_cmp(&(b - u).abs()))
            .unwrap_or(u)
    }

    /// Boehm insertion of `u` repeated `times` times.
    ///
    /// `u` must lie in the domain; knots equal to an existing one must be
    /// passed as that exact value.
    pub fn insert(&mut self, u: f64, times: usize) {
        for _ in 0..times {
            self.insert_once(u);
        }
    }

    fn insert_once(&mut self, u: f64) {
        let p = self.degree;
        let n = self.rows.len();
        let k = self
            .flat
            .partition_point(|&x| x <= u)
            .saturating_sub(1)
            .clamp(p, n + p - 1);
        let s = self.flat[..=k].iter().rev().take_while(|&&x| x == u).count();

        let mut rows = Vec::with_capacity(n + 1);
        for i in 0..=n {
            if i + p <= k {
                rows.push(self.rows[i].clone());
            } else if i + s <= k {
                let alpha = (u - self.flat[i]) / (self.flat[i + p] - self.flat[i]);
                rows.push(lerp(&self.rows[i - 1], &self.rows[i], alpha));
            } else {
                rows.push(self.rows[i - 1].clone());
            }
        }
        self.rows = rows;
        self.flat.insert(k + 1, u);
    }

    /// Remove one occurrence of the interior knot `u`.
    ///
    /// The new poles are solved twice, sweeping in from the left and in from
    /// the right. The removal is accepted only when both solutions agree
    /// within `tol` (per `stride`-wide point); otherwise nothing changes and
    /// `false` is returned.
    pub fn remove_once(&mut self, u: f64, tol: f64, stride: usize) -> bool {
        let p = self.degree;
        let Some(r) = self.flat.iter().rposition(|&k| k == u) else {
            return false;
        };
        let s = self.flat[..=r].iter().rev().take_while(|&&k| k == u).count();
        let n = self.rows.len();
        if r <= p || r - s + 1 >= n {
            // end knots are not removable
            return false;
        }

        if s > p {
            // discontinuity: the two coincident poles must agree
            let (a, b) = (r - s, r - s + 1);
            if chunk_distance(&self.rows[a], &self.rows[b], stride) > tol {
                return false;
            }
            self.rows.remove(b);
            self.flat.remove(r);
            trace!(u, "knot removed at discontinuity");
            return true;
        }

        let first = r - p;
        let last = r - s;
        let alpha = |i: usize| (u - self.flat[i]) / (self.flat[i + p + 1] - self.flat[i]);

        let accepted = if first == last {
            let a = alpha(first);
            let blended = lerp(&self.rows[first - 1], &self.rows[last + 1], a);
            chunk_distance(&self.rows[first], &blended, stride) <= tol
        } else {
            true
        };
        if !accepted {
            return false;
        }

        let count = last - first;
        let mut left: Vec<Vec<f64>> = Vec::with_capacity(count);
        let mut prev = self.rows[first - 1].clone();
        for i in first..last {
            let a = alpha(i);
            let q: Vec<f64> = self.rows[i]
                .iter()
                .zip(&prev)
                .map(|(pi, qm)| (pi - (1.0 - a) * qm) / a)
                .collect();
            left.push(q.clone());
            prev = q;
        }

        let mut right: Vec<Vec<f64>> = vec![Vec::new(); count];
        let mut next = self.rows[last + 1].clone();
        for i in (first + 1..=last).rev() {
            let a = alpha(i);
            let q: Vec<f64> = self.rows[i]
                .iter()
                .zip(&next)
                .map(|(pi, qn)| (pi - a * qn) / (1.0 - a))
                .collect();
            right[i - 1 - first] = q.clone();
            next = q;
        }

        if count > 0 {
            let deviation = left
                .iter()
                .zip(&right)
                .map(|(l, r)| chunk_distance(l, r, stride))
                .fold(0.0, f64::max);
            if deviation > tol {
                trace!(u, deviation, tol, "knot removal rejected");
                return false;
            }
        }

        let half = (count + 1) / 2;
        let blended: Vec<Vec<f64>> = (0..count)
            .map(|k| if k < half { left[k].clone() } else { right[k].clone() })
            .collect();

        let mut rows = Vec::with_capacity(n - 1);
        rows.extend_from_slice(&self.rows[..first]);
        rows.extend(blended);
        rows.extend_from_slice(&self.rows[last + 1..]);
        self.rows = rows;
        self.flat.remove(r);
        trace!(u, "knot removed");
        true
    }

    /// Restriction to `[a, b]`, clamped at both ends.
    ///
    /// `a` and `b` must lie in the domain with `a < b`; values meant to hit an
    /// existing knot must be snapped beforehand.
    pub fn trim(&self, a: f64, b: f64) -> SplineRows {
        let p = self.degree;
        let mut out = self.clone();
        let sa = out.multiplicity(a);
        if sa < p {
            out.insert(a, p - sa);
        }
        let sb = out.multiplicity(b);
        if sb < p {
            out.insert(b, p - sb);
        }

        let ra = out.flat.iter().rposition(|&k| k == a).unwrap_or(p);
        let jb = out
            .flat
            .iter()
            .position(|&k| k == b)
            .unwrap_or(out.rows.len());
        let first_pole = ra.saturating_sub(p);
        let last_pole = jb.saturating_sub(1).max(first_pole);

        let mut flat = vec![a; p + 1];
        flat.extend_from_slice(&out.flat[ra + 1..jb]);
        flat.extend(std::iter::repeat(b).take(p + 1));
        SplineRows {
            degree: p,
            flat,
            rows: out.rows[first_pole..=last_pole].to_vec(),
        }
    }

    /// Reverse the parametrization: `u` becomes `first + last - u`.
    pub fn reverse(&mut self) {
        let total = self.flat[0] + self.flat[self.flat.len() - 1];
        self.flat = self.flat.iter().rev().map(|k| total - k).collect();
        self.rows.reverse();
    }

    /// Degree elevation by `t` of a clamped spline.
    ///
    /// Splits into Bezier segments, elevates each one and merges them back
    /// by removing the inserted knots exactly.
    pub fn elevate(&self, t: usize, stride: usize) -> SplineRows {
        if t == 0 {
            return self.clone();
        }
        let p = self.degree;
        let (knots, mults) = super::knots::knots_and_mults(&self.flat, 0.0);
        let last = knots.len() - 1;

        let mut split = self.clone();
        for i in 1..last {
            if mults[i] < p {
                split.insert(knots[i], p - mults[i]);
            }
        }

        let ph = p + t;
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(last * ph + 1);
        for seg in 0..last {
            let poles = &split.rows[seg * p..=seg * p + p];
            let elevated = elevate_bezier(poles, t);
            let skip = usize::from(seg > 0);
            rows.extend(elevated.into_iter().skip(skip));
        }

        let mut flat = vec![knots[0]; ph + 1];
        for &k in &knots[1..last] {
            flat.extend(std::iter::repeat(k).take(ph));
        }
        flat.extend(std::iter::repeat(knots[last]).take(ph + 1));

        let mut out = SplineRows {
            degree: ph,
            flat,
            rows,
        };
        for i in 1..last {
            for _ in 0..p.saturating_sub(mults[i]) {
                out.remove_once(knots[i], f64::INFINITY, stride);
            }
        }
        trace!(from = p, to = ph, "degree elevated");
        out
    }
}

/// Poles of a Bezier segment after elevating its degree by `t`.
pub fn elevate_bezier(poles: &[Vec<f64>], t: usize) -> Vec<Vec<f64>> {
    let p = poles.len() - 1;
    let dim = poles[0].len();
    (0..=p + t)
        .map(|i| {
            let mut q = vec![0.0; dim];
            let lo = i.saturating_sub(t);
            let hi = p.min(i);
            for (j, pole) in poles.iter().enumerate().take(hi + 1).skip(lo) {
                let c = binomial(p, j) * binomial(t, i - j) / binomial(p + t, i);
                for d in 0..dim {
                    q[d] += c * pole[d];
                }
            }
            q
        })
        .collect()
}
