//! Reduction of C0 knots of a B-spline curve.

use pgeom_core::{Result, Tolerance};
use pgeom_geometry::{BSplineCurve, ParametricCurve};
use pgeom_math::Space;
use tracing::{debug, instrument};

use crate::concat::{concat_c1, join};
use crate::split::split_bspline_curve_by_knots;

/// Lower every interior knot of multiplicity `degree` to `degree - 1`
/// where the shape moves by at most `tol`. Returns the remaining C0 knot
/// indices.
fn lower_c0_knots<P: Space>(c: &mut BSplineCurve<P>, tol: f64) -> Result<Vec<usize>> {
    let degree = c.degree();
    let (first, last) = (c.first_u_knot_index(), c.last_u_knot_index());
    // descending, so a removed knot does not shift the ones still to visit
    for index in (first + 1..last).rev() {
        if c.multiplicities()[index] >= degree {
            let lowered = c.remove_knot(index, degree - 1, tol)?;
            debug!(index, lowered, "C0 knot");
        }
    }
    let (first, last) = (c.first_u_knot_index(), c.last_u_knot_index());
    Ok((first + 1..last).filter(|&i| c.multiplicities()[i] >= degree).collect())
}

/// Split `curve` into C1 pieces.
///
/// C0 knots are first lowered within `tol.linear`. The curve is cut at the
/// knots that stay C0, and pieces meeting with parallel tangents (within
/// `tol.angular`) are joined again by [`concat_c1`]. A periodic curve is
/// opened at its first knot.
#[instrument(level = "debug", skip(curve))]
pub fn c0_to_array_of_c1<P: Space>(curve: &BSplineCurve<P>, tol: Tolerance) -> Result<Vec<BSplineCurve<P>>> {
    let mut c = curve.clone();
    c.set_not_periodic();
    let breaks = lower_c0_knots(&mut c, tol.linear)?;
    if breaks.is_empty() {
        return Ok(vec![c]);
    }
    let mut cuts = Vec::with_capacity(breaks.len() + 2);
    cuts.push(c.first_u_knot_index());
    cuts.extend(breaks);
    cuts.push(c.last_u_knot_index());
    let pieces = cuts
        .windows(2)
        .map(|w| split_bspline_curve_by_knots(&c, w[0], w[1], true))
        .collect::<Result<Vec<_>>>()?;
    let tolerances = vec![tol.linear; pieces.len() - 1];
    let joined = concat_c1(&pieces, &tolerances, false, tol.linear, tol.angular);
    debug!(pieces = pieces.len(), c1 = joined.curves.len(), "curve split into C1 pieces");
    Ok(joined.curves)
}

/// One curve with as few C0 knots as `tolerance` allows.
///
/// Knots where the curve really has a corner stay C0.
pub fn c0_to_c1<P: Space>(curve: &BSplineCurve<P>, tolerance: f64) -> Result<BSplineCurve<P>> {
    let tol = Tolerance::default().with_linear(tolerance);
    let mut pieces = c0_to_array_of_c1(curve, tol)?.into_iter();
    let Some(mut out) = pieces.next() else {
        return Ok(curve.clone());
    };
    for piece in pieces {
        out = join(&out, &piece)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgeom_math::DVec2;

    fn smooth_with_c0_knot() -> BSplineCurve<DVec2> {
        let poles = vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 2.0), DVec2::new(2.0, 0.0)];
        let mut c = BSplineCurve::bezier(poles, None).unwrap();
        c.insert_knot(0.5, 2, 0.0, false).unwrap();
        c
    }

    #[test]
    fn test_removable_c0_knot() {
        let c = smooth_with_c0_knot();
        assert!(!c.is_cn(1));
        let out = c0_to_c1(&c, 1e-7).unwrap();
        assert!(out.is_cn(1));
        for i in 0..=10 {
            let u = i as f64 / 10.0;
            assert!((out.value(u).unwrap() - c.value(u).unwrap()).length() < 1e-9);
        }
        let array = c0_to_array_of_c1(&c, Tolerance::default()).unwrap();
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn test_corner_stays() {
        let poles = vec![DVec2::ZERO, DVec2::X, DVec2::new(1.0, 1.0)];
        let c = BSplineCurve::new(poles, None, vec![0.0, 1.0, 2.0], vec![2, 1, 2], 1, false).unwrap();
        let array = c0_to_array_of_c1(&c, Tolerance::new(1e-7, 1e-9, 1e-9)).unwrap();
        assert_eq!(array.len(), 2);
        assert!((array[0].end_point() - DVec2::X).length() < 1e-12);
        assert!((array[1].start_point() - DVec2::X).length() < 1e-12);

        let one = c0_to_c1(&c, 1e-7).unwrap();
        assert!(!one.is_cn(1));
        assert!((one.start_point() - DVec2::ZERO).length() < 1e-12);
        assert!((one.end_point() - DVec2::new(1.0, 1.0)).length() < 1e-12);
    }

    #[test]
    fn test_speed_change_on_a_straight_path() {
        // collinear, but the parametric speed jumps at the knot
        let poles = vec![DVec2::ZERO, DVec2::X, DVec2::new(3.0, 0.0)];
        let c = BSplineCurve::new(poles, None, vec![0.0, 1.0, 2.0], vec![2, 1, 2], 1, false).unwrap();
        let array = c0_to_array_of_c1(&c, Tolerance::default()).unwrap();
        assert_eq!(array.len(), 1);
        assert!(array[0].is_cn(1));
        assert!((array[0].end_point() - DVec2::new(3.0, 0.0)).length() < 1e-12);
    }
}
