//! Conversion of any bounded curve to a B-spline curve.

use pgeom_core::{GeomError, Result, Tolerance};
use pgeom_geometry::curve::{OffsetCurve, TrimmedCurve};
use pgeom_geometry::param::adjust_periodic;
use pgeom_geometry::{BSplineCurve, Curve, ParametricCurve};
use pgeom_math::Space;
use tracing::{debug, instrument};

use crate::conic::{circle_arc_to_bspline, circle_to_bspline, ellipse_arc_to_bspline, ellipse_to_bspline};
use crate::fit::approximate;
use crate::options::{ApproxOptions, ParameterisationType};

/// B-spline with the same shape as `curve`.
///
/// Lines, conics and B-splines convert exactly; circles and ellipses use the
/// knot layout `policy`. Offsets convert exactly when they are lines or
/// circles and are otherwise fitted with the default [`ApproxOptions`].
///
/// Unbounded curves are a domain error.
#[instrument(level = "debug", skip(curve))]
pub fn curve_to_bspline<P: Space>(curve: &Curve<P>, policy: ParameterisationType) -> Result<BSplineCurve<P>> {
    curve_to_bspline_with(curve, policy, &ApproxOptions::default())
}

/// [`curve_to_bspline`] with explicit settings for the offset fit.
pub fn curve_to_bspline_with<P: Space>(
    curve: &Curve<P>,
    policy: ParameterisationType,
    options: &ApproxOptions,
) -> Result<BSplineCurve<P>> {
    match curve {
        Curve::Line(_) => Err(GeomError::domain("cannot convert an unbounded line")),
        Curve::Circle(c) => circle_to_bspline(c, policy),
        Curve::Ellipse(e) => ellipse_to_bspline(e, policy),
        Curve::BSpline(b) => Ok(b.clone()),
        Curve::Trimmed(t) => trimmed_to_bspline(t, policy, options),
        Curve::Offset(o) => offset_to_bspline(o, o.first_parameter(), o.last_parameter(), policy, options),
    }
}

fn trimmed_to_bspline<P: Space>(
    t: &TrimmedCurve<P>,
    policy: ParameterisationType,
    options: &ApproxOptions,
) -> Result<BSplineCurve<P>> {
    let basis = t.basis();
    let (mut u1, mut u2) = (t.first_parameter(), t.last_parameter());
    if !basis.is_periodic() {
        u1 = u1.max(basis.first_parameter());
        u2 = u2.min(basis.last_parameter());
    }
    debug!(u1, u2, "converting trimmed curve");
    match basis {
        Curve::Line(_) => BSplineCurve::new(
            vec![t.value(u1)?, t.value(u2)?],
            None,
            vec![u1, u2],
            vec![2, 2],
            1,
            false,
        ),
        Curve::Circle(c) => circle_arc_to_bspline(c, u1, u2, policy),
        Curve::Ellipse(e) => ellipse_arc_to_bspline(e, u1, u2, policy),
        Curve::BSpline(b) => {
            let mut b = b.clone();
            if b.is_periodic() {
                let (first, last) = (b.first_parameter(), b.last_parameter());
                let (a, z) = adjust_periodic(first, last, Tolerance::CONFUSION, u1, u2);
                if (a - first).abs() <= Tolerance::CONFUSION && (z - last).abs() <= Tolerance::CONFUSION {
                    b.set_not_periodic();
                }
            }
            b.segment(u1, u2, Tolerance::PCONFUSION)?;
            Ok(b)
        }
        Curve::Offset(o) => offset_to_bspline(o, u1, u2, policy, options),
        Curve::Trimmed(inner) => {
            let mut b = trimmed_to_bspline(inner, policy, options)?;
            b.segment(u1, u2, Tolerance::PCONFUSION)?;
            Ok(b)
        }
    }
}

fn offset_to_bspline<P: Space>(
    o: &OffsetCurve<P>,
    u1: f64,
    u2: f64,
    policy: ParameterisationType,
    options: &ApproxOptions,
) -> Result<BSplineCurve<P>> {
    if !(u1.is_finite() && u2.is_finite()) {
        return Err(GeomError::domain("cannot convert an unbounded offset curve"));
    }
    if let Some(exact) = o.equivalent_curve() {
        let whole = u1 <= o.first_parameter() && u2 >= o.last_parameter();
        return if whole {
            curve_to_bspline_with(&exact, policy, options)
        } else {
            let trimmed = TrimmedCurve::new(exact, u1, u2, true, false)?;
            trimmed_to_bspline(&trimmed, policy, options)
        };
    }
    approximate(o, u1, u2, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgeom_geometry::curve::{Circle, Ellipse, Line};
    use pgeom_math::{DVec2, DVec3};
    use std::f64::consts::{PI, TAU};

    fn same_points<P: Space>(a: &impl ParametricCurve<P>, b: &impl ParametricCurve<P>, u1: f64, u2: f64) {
        for i in 0..=20 {
            let u = u1 + (u2 - u1) * i as f64 / 20.0;
            let d = a.value(u).unwrap().distance(b.value(u).unwrap());
            assert!(d < 1e-10, "curves differ by {d} at {u}");
        }
    }

    #[test]
    fn test_unbounded_line_is_rejected() {
        let l: Curve<DVec3> = Line::new(DVec3::ZERO, DVec3::X).unwrap().into();
        assert!(matches!(
            curve_to_bspline(&l, ParameterisationType::TgtThetaOver2),
            Err(GeomError::Domain(_))
        ));
    }

    #[test]
    fn test_trimmed_line() {
        let l: Curve<DVec2> = Line::new(DVec2::new(1.0, 1.0), DVec2::Y).unwrap().into();
        let t = TrimmedCurve::trim(l, -2.0, 3.0).unwrap();
        let tc: Curve<DVec2> = t.clone().into();
        let b = curve_to_bspline(&tc, ParameterisationType::TgtThetaOver2).unwrap();
        assert_eq!(b.degree(), 1);
        assert_eq!(b.knots(), &[-2.0, 3.0]);
        same_points(&t, &b, -2.0, 3.0);
    }

    #[test]
    fn test_trimmed_conics() {
        let c: Curve<DVec3> = Circle::new(DVec3::ZERO, DVec3::Y, DVec3::Z, 2.0).unwrap().into();
        let t: Curve<DVec3> = TrimmedCurve::trim(c, 5.0, 7.0).unwrap().into();
        let b = curve_to_bspline(&t, ParameterisationType::QuasiAngular).unwrap();
        assert!((b.start_point() - t.value(t.first_parameter()).unwrap()).length() < 1e-12);
        assert!((b.end_point() - t.value(t.last_parameter()).unwrap()).length() < 1e-12);

        let e: Curve<DVec2> = Ellipse::new(DVec2::ZERO, DVec2::X, DVec2::Y, 2.0, 1.0).unwrap().into();
        let full = curve_to_bspline(&e, ParameterisationType::TgtThetaOver2).unwrap();
        assert!(full.is_periodic());
        assert!(matches!(
            curve_to_bspline(&e, ParameterisationType::TgtThetaOver2_2),
            Err(GeomError::Domain(_))
        ));
    }

    #[test]
    fn test_trimmed_periodic_bspline() {
        let c: Curve<DVec2> = Circle::new(DVec2::ZERO, DVec2::X, DVec2::Y, 1.0).unwrap().into();
        let periodic: Curve<DVec2> = curve_to_bspline(&c, ParameterisationType::QuasiAngular).unwrap().into();

        let whole: Curve<DVec2> = TrimmedCurve::trim(periodic.clone(), 0.0, TAU).unwrap().into();
        let b = curve_to_bspline(&whole, ParameterisationType::TgtThetaOver2).unwrap();
        assert!(!b.is_periodic());
        assert!(b.start_point().distance(b.end_point()) < 1e-12);
        same_points(&periodic, &b, 0.0, TAU);

        let arc: Curve<DVec2> = TrimmedCurve::trim(periodic.clone(), 1.0, 2.5).unwrap().into();
        let b = curve_to_bspline(&arc, ParameterisationType::TgtThetaOver2).unwrap();
        assert!((b.first_parameter() - 1.0).abs() < 1e-12);
        same_points(&periodic, &b, 1.0, 2.5);
    }

    #[test]
    fn test_offsets() {
        let c: Curve<DVec2> = Circle::new(DVec2::ZERO, DVec2::X, DVec2::Y, 1.0).unwrap().into();
        let o: Curve<DVec2> = OffsetCurve::new(c, 0.5, (), false).unwrap().into();
        let b = curve_to_bspline(&o, ParameterisationType::TgtThetaOver2).unwrap();
        assert!(b.is_rational());
        for i in 0..=20 {
            let p = b.value(TAU * i as f64 / 20.0).unwrap();
            assert!((p.length() - 1.5).abs() < 1e-12);
        }

        let part: Curve<DVec2> = TrimmedCurve::trim(o, 0.0, PI).unwrap().into();
        let b = curve_to_bspline(&part, ParameterisationType::TgtThetaOver2).unwrap();
        assert!((b.last_parameter() - PI).abs() < 1e-12);

        let l: Curve<DVec2> = Line::new(DVec2::ZERO, DVec2::X).unwrap().into();
        let ol: Curve<DVec2> = OffsetCurve::new(l, 1.0, (), false).unwrap().into();
        assert!(matches!(
            curve_to_bspline(&ol, ParameterisationType::TgtThetaOver2),
            Err(GeomError::Domain(_))
        ));
    }

    #[test]
    fn test_offset_of_free_form_is_fitted() {
        let poles = vec![DVec3::ZERO, DVec3::new(1.0, 1.0, 0.0), DVec3::new(2.0, 0.0, 0.0)];
        let base: Curve<DVec3> = BSplineCurve::bezier(poles, None).unwrap().into();
        let o: Curve<DVec3> = OffsetCurve::new(base, 0.1, DVec3::Z, false).unwrap().into();
        let b = curve_to_bspline(&o, ParameterisationType::TgtThetaOver2).unwrap();
        assert!(!b.is_rational());
        for i in 0..=20 {
            let u = i as f64 / 20.0;
            assert!((b.value(u).unwrap() - o.value(u).unwrap()).length() < 2e-4);
        }
    }
}
