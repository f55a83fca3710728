//! Knot table utilities: flat sequences, span search, basis functions.

use pgeom_core::{Continuity, GeomError, Result};

/// Highest degree a B-spline may have.
pub const MAX_DEGREE: usize = 25;

/// Where a parameter falls relative to a table of distinct knots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnotLocation {
    /// Before the first knot.
    Before,
    /// On knot `i` (within the tolerance).
    On(usize),
    /// Strictly between knots `i` and `i + 1`.
    Between(usize, usize),
    /// After the last knot.
    After,
}

/// Number of poles implied by a knot table.
///
/// Non-periodic: `sum(mults) - degree - 1`. Periodic: `sum(mults)` minus the
/// last multiplicity, the last knot being the first one shifted by a period.
pub fn nb_poles(degree: usize, mults: &[usize], periodic: bool) -> usize {
    let sum: usize = mults.iter().sum();
    if periodic {
        sum - mults.last().copied().unwrap_or(0)
    } else {
        sum.saturating_sub(degree + 1)
    }
}

/// Check a knot table: degree range, sizes, strictly increasing knots and
/// multiplicity bounds.
pub fn check_knot_table(
    degree: usize,
    knots: &[f64],
    mults: &[usize],
    periodic: bool,
    nb_poles_given: usize,
) -> Result<()> {
    if degree < 1 || degree > MAX_DEGREE {
        return Err(GeomError::construction("BSpline curve: invalid degree"));
    }
    if nb_poles_given < 2 {
        return Err(GeomError::construction("BSpline curve: at least 2 poles required"));
    }
    if knots.len() != mults.len() {
        return Err(GeomError::construction("BSpline curve: Knot and Mult array size mismatch"));
    }
    if knots.len() < 2 {
        return Err(GeomError::construction("BSpline curve: at least 2 knots required"));
    }
    for pair in knots.windows(2) {
        if pair[1] - pair[0] <= pgeom_core::Tolerance::KNOT_EPSILON {
            return Err(GeomError::construction("BSpline curve: Knots interval values too close"));
        }
    }
    let last = mults.len() - 1;
    for (i, &m) in mults.iter().enumerate() {
        let end = i == 0 || i == last;
        let max = if end && !periodic { degree + 1 } else { degree };
        if m < 1 || m > max {
            return Err(GeomError::construction(format!(
                "BSpline curve: multiplicity {m} of knot {i} out of [1, {max}]"
            )));
        }
    }
    if periodic && mults[0] != mults[last] {
        return Err(GeomError::construction(
            "BSpline curve: periodic end multiplicities differ",
        ));
    }
    if nb_poles(degree, mults, periodic) != nb_poles_given {
        return Err(GeomError::construction("BSpline curve: # Poles and degree mismatch"));
    }
    Ok(())
}

/// Flat knot sequence of a knot table.
///
/// Non-periodic: each knot repeated by its multiplicity. Periodic: see
/// [`periodic_flat_knots`] over one period.
pub fn flat_knots(degree: usize, knots: &[f64], mults: &[usize], periodic: bool) -> Vec<f64> {
    if periodic {
        periodic_flat_knots(degree, knots, mults, 1)
    } else {
        knots
            .iter()
            .zip(mults)
            .flat_map(|(&k, &m)| std::iter::repeat(k).take(m))
            .collect()
    }
}

/// Flat knots of a periodic table unrolled over `periods` periods.
///
/// With `n` poles the result has `periods * n + 2 * degree + 1` entries and
/// `flat[degree]` is the last repeat of the first knot. Pole `b` of the
/// unrolled sequence is pole `b mod n` of the periodic curve.
pub fn periodic_flat_knots(degree: usize, knots: &[f64], mults: &[usize], periods: usize) -> Vec<f64> {
    let n = nb_poles(degree, mults, true) as isize;
    let last = knots.len() - 1;
    let period = knots[last] - knots[0];
    let base: Vec<f64> = knots[..last]
        .iter()
        .zip(&mults[..last])
        .flat_map(|(&k, &m)| std::iter::repeat(k).take(m))
        .collect();
    let shift = mults[0] as isize - 1 - degree as isize;
    let len = periods * n as usize + 2 * degree + 1;
    (0..len)
        .map(|i| {
            let j = i as isize + shift;
            base[j.rem_euclid(n) as usize] + j.div_euclid(n) as f64 * period
        })
        .collect()
}

/// Split a flat sequence back into distinct knots and multiplicities.
/// Values closer than `eps` are merged.
pub fn knots_and_mults(flat: &[f64], eps: f64) -> (Vec<f64>, Vec<usize>) {
    let mut knots: Vec<f64> = Vec::new();
    let mut mults: Vec<usize> = Vec::new();
    for &k in flat {
        match knots.last() {
            Some(&last) if (k - last).abs() <= eps => {
                if let Some(m) = mults.last_mut() {
                    *m += 1;
                }
            }
            _ => {
                knots.push(k);
                mults.push(1);
            }
        }
    }
    (knots, mults)
}

/// Global continuity implied by the multiplicities.
pub fn knots_continuity(degree: usize, mults: &[usize], periodic: bool) -> Continuity {
    let last = mults.len().saturating_sub(1);
    let max_mult = mults
        .iter()
        .enumerate()
        .filter(|&(i, _)| (i > 0 && i < last) || (periodic && i == 0))
        .map(|(_, &m)| m)
        .max();
    match max_mult {
        None => Continuity::CN,
        Some(m) if m >= degree => Continuity::C0,
        Some(m) => Continuity::from_order(degree - m),
    }
}

/// Locate `u` in a table of distinct knots, snapping within `tol`.
pub fn locate(knots: &[f64], u: f64, tol: f64) -> KnotLocation {
    let last = knots.len() - 1;
    if u < knots[0] - tol {
        return KnotLocation::Before;
    }
    if u > knots[last] + tol {
        return KnotLocation::After;
    }
    let i = knots.partition_point(|&k| k <= u).saturating_sub(1);
    if (u - knots[i]).abs() <= tol {
        return KnotLocation::On(i);
    }
    if i < last && (knots[i + 1] - u).abs() <= tol {
        return KnotLocation::On(i + 1);
    }
    if i >= last {
        KnotLocation::On(last)
    } else {
        KnotLocation::Between(i, i + 1)
    }
}

/// Find the knot span index for parameter `t` in the knot vector.
///
/// Returns the index `i` such that `knots[i] <= t < knots[i+1]`,
/// with special handling for the upper boundary. The returned span never
/// has zero length.
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `n` - Number of control points minus 1
/// * `t` - Parameter value
pub fn find_span(degree: usize, knots: &[f64], n: usize, t: f64) -> usize {
    find_span_in(knots, degree, n, t)
}

/// Span search restricted to spans `lo..=hi`.
///
/// Parameters outside the range extrapolate the end spans.
pub fn find_span_in(knots: &[f64], lo: usize, hi: usize, t: f64) -> usize {
    if t >= knots[hi + 1] || t >= knots[hi] {
        let mut s = hi;
        while s > lo && knots[s] >= knots[s + 1] {
            s -= 1;
        }
        return s;
    }
    if t <= knots[lo] || t < knots[lo + 1] {
        let mut s = lo;
        while s < hi && knots[s] >= knots[s + 1] {
            s += 1;
        }
        return s;
    }

    // Binary search
    let mut low = lo;
    let mut high = hi + 1;
    let mut mid = (low + high) / 2;

    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }

    mid
}

/// Compute the non-vanishing basis functions at parameter `t`.
///
/// Returns a vector of `degree + 1` basis function values N_{span-degree,degree}(t)
/// through N_{span,degree}(t).
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `span` - The knot span index (from `find_span`)
/// * `t` - Parameter value
pub fn basis_functions(degree: usize, knots: &[f64], span: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];

    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }

        n[j] = saved;
    }

    n
}

/// Compute the basis functions and their derivatives up to order `order`.
///
/// Returns `ders` with `ders[k][j]` the k-th derivative of
/// N_{span-degree+j,degree} at `t`. Orders above the degree are zero.
#[allow(clippy::needless_range_loop)]
pub fn basis_function_derivatives(
    degree: usize,
    knots: &[f64],
    span: usize,
    t: f64,
    order: usize,
) -> Vec<Vec<f64>> {
    let p = degree;
    let mut ders = vec![vec![0.0; p + 1]; order + 1];

    // Triangular table of basis functions and knot differences
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            // Lower triangle
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];

            // Upper triangle
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let nd = order.min(p);
    let mut a = vec![vec![0.0; p + 1]; 2];

    for r in 0..=p {
        let mut s1 = 0usize;
        let mut s2 = 1usize;
        a[0][0] = 1.0;

        for k in 1..=nd {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;

            if rk >= 0 {
                a[s2][0] = a[s1][0] / ndu[pk + 1][rk as usize];
                d = a[s2][0] * ndu[rk as usize][pk];
            }

            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };

            for j in j1..=j2 {
                let idx = (rk + j as isize) as usize;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][idx];
                d += a[s2][j] * ndu[idx][pk];
            }

            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                d += a[s2][k] * ndu[r][pk];
            }

            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    // Multiply through by the correct factors
    let mut factor = p as f64;
    for k in 1..=nd {
        for val in &mut ders[k] {
            *val *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_span_uniform() {
        // Degree 2, 5 control points, uniform knot vector
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let n = 4; // 5 control points - 1
        let degree = 2;

        assert_eq!(find_span(degree, &knots, n, 0.0), 2);
        assert_eq!(find_span(degree, &knots, n, 0.5), 2);
        assert_eq!(find_span(degree, &knots, n, 1.0), 3);
        assert_eq!(find_span(degree, &knots, n, 1.5), 3);
        assert_eq!(find_span(degree, &knots, n, 2.5), 4);
        assert_eq!(find_span(degree, &knots, n, 3.0), 4);
    }

    #[test]
    fn test_find_span_skips_empty_end_span() {
        // Unclamped sequence whose domain end is a double knot
        let knots = vec![-1.0, 0.0, 1.0, 2.0, 2.0, 3.0];
        // degree 1, 4 poles, domain [knots[1], knots[4]] = [0, 2]
        assert_eq!(find_span(1, &knots, 3, 2.0), 2);
        assert_eq!(find_span(1, &knots, 3, 0.0), 1);
    }

    #[test]
    fn test_basis_functions_partition_of_unity() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let degree = 2;
        let n = 4;

        // Basis functions should sum to 1 (partition of unity)
        for &t in &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0] {
            let span = find_span(degree, &knots, n, t);
            let basis = basis_functions(degree, &knots, span, t);
            let sum: f64 = basis.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-12,
                "Partition of unity failed at t={}: sum={}",
                t,
                sum
            );
        }
    }

    #[test]
    fn test_derivatives_of_partition_vanish() {
        let knots = vec![0.0, 0.0, 0.0, 0.0, 0.4, 1.0, 1.0, 1.0, 1.0];
        let degree = 3;
        for &t in &[0.1, 0.4, 0.77] {
            let span = find_span(degree, &knots, 4, t);
            let ders = basis_function_derivatives(degree, &knots, span, t, 4);
            for k in 1..=4 {
                let sum: f64 = ders[k].iter().sum();
                assert!(sum.abs() < 1e-9, "order {} sums to {} at t={}", k, sum, t);
            }
            let values = basis_functions(degree, &knots, span, t);
            for j in 0..=degree {
                assert!((values[j] - ders[0][j]).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn test_bernstein_derivatives() {
        // Cubic Bernstein basis on [0, 1]: B0 = (1-t)^3, B0' = -3(1-t)^2
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let t = 0.25;
        let span = find_span(3, &knots, 3, t);
        let ders = basis_function_derivatives(3, &knots, span, t, 2);
        assert!((ders[1][0] + 3.0 * 0.75 * 0.75).abs() < 1e-12);
        assert!((ders[2][0] - 6.0 * 0.75).abs() < 1e-12);
        assert!((ders[1][3] - 3.0 * t * t).abs() < 1e-12);
    }

    #[test]
    fn test_periodic_flat_knots() {
        // Degree 1, knots 0..3 simple: poles 3, flat starts one knot early
        let flat = periodic_flat_knots(1, &[0.0, 1.0, 2.0, 3.0], &[1, 1, 1, 1], 1);
        assert_eq!(flat, vec![-1.0, 0.0, 1.0, 2.0, 3.0, 4.0]);

        // Degree 2 with seam multiplicity 2
        let flat = periodic_flat_knots(2, &[0.0, 1.0, 2.0], &[2, 1, 2], 1);
        // 3 poles, 3 + 4 + 1 = 8 entries, flat[2] is the last repeat of 0
        assert_eq!(flat.len(), 8);
        assert_eq!(flat[1], 0.0);
        assert_eq!(flat[2], 0.0);
        assert_eq!(flat[3], 1.0);
        assert_eq!(flat[5], 2.0);
        assert_eq!(flat[0], -1.0);
    }

    #[test]
    fn test_knot_table_checks() {
        assert!(check_knot_table(3, &[0.0, 1.0], &[4, 4], false, 4).is_ok());
        assert!(check_knot_table(3, &[0.0, 1.0], &[3, 3], false, 4).is_err());
        assert!(check_knot_table(3, &[0.0, 0.0], &[4, 4], false, 4).is_err());
        assert!(check_knot_table(0, &[0.0, 1.0], &[1, 1], false, 1).is_err());
        assert!(check_knot_table(2, &[0.0, 1.0, 2.0], &[2, 1, 2], true, 3).is_ok());
        assert!(check_knot_table(2, &[0.0, 1.0, 2.0], &[2, 1, 1], true, 3).is_err());
    }

    #[test]
    fn test_continuity_from_mults() {
        assert_eq!(knots_continuity(3, &[4, 4], false), Continuity::CN);
        assert_eq!(knots_continuity(3, &[4, 1, 4], false), Continuity::C2);
        assert_eq!(knots_continuity(3, &[4, 2, 1, 4], false), Continuity::C1);
        assert_eq!(knots_continuity(2, &[3, 2, 3], false), Continuity::C0);
        assert_eq!(knots_continuity(2, &[2, 1, 2], true), Continuity::C0);
        assert_eq!(knots_continuity(3, &[1, 1, 1], true), Continuity::C2);
    }

    #[test]
    fn test_locate() {
        let knots = [0.0, 1.0, 2.5];
        assert_eq!(locate(&knots, -1.0, 1e-9), KnotLocation::Before);
        assert_eq!(locate(&knots, 1.0 + 1e-12, 1e-9), KnotLocation::On(1));
        assert_eq!(locate(&knots, 1.7, 1e-9), KnotLocation::Between(1, 2));
        assert_eq!(locate(&knots, 2.5, 1e-9), KnotLocation::On(2));
        assert_eq!(locate(&knots, 3.0, 1e-9), KnotLocation::After);
    }

    #[test]
    fn test_knots_and_mults() {
        let (k, m) = knots_and_mults(&[0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0], 1e-12);
        assert_eq!(k, vec![0.0, 0.5, 1.0]);
        assert_eq!(m, vec![3, 1, 3]);
    }
}
