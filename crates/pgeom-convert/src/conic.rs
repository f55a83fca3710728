//! Exact rational B-spline forms of circles, ellipses and their arcs.
//!
//! Arcs are built once on the unit circle and then mapped affinely onto the
//! conic; rational B-splines are invariant under affine maps of their poles.

use std::f64::consts::{PI, TAU};

use pgeom_core::{GeomError, Result, Tolerance};
use pgeom_geometry::curve::{Circle, Ellipse};
use pgeom_geometry::BSplineCurve;
use pgeom_math::{DVec2, Space};
use tracing::trace;

use crate::options::ParameterisationType;

/// Degree of every conic conversion.
pub const DEGREE: usize = 2;

/// Sweeps from which [`ParameterisationType::RationalC1`] converts in two
/// halves.
const C1_SPLIT_SWEEP: f64 = 6.0;

/// A rational quadratic arc of the unit circle.
///
/// A pole `(x, y)` stands for `x * X + y * Y` in the frame of the target
/// conic. Knots are angles.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitArc {
    pub poles: Vec<DVec2>,
    pub weights: Vec<f64>,
    pub knots: Vec<f64>,
    pub mults: Vec<usize>,
    pub periodic: bool,
}

fn on_circle(t: f64) -> DVec2 {
    let (s, c) = t.sin_cos();
    DVec2::new(c, s)
}

impl UnitArc {
    /// One clamped quadratic span from `t0` to `t1` (less than π).
    fn span(t0: f64, t1: f64) -> Self {
        let c = ((t1 - t0) * 0.5).cos();
        Self {
            poles: vec![on_circle(t0), on_circle((t0 + t1) * 0.5) / c, on_circle(t1)],
            weights: vec![1.0, c, 1.0],
            knots: vec![t0, t1],
            mults: vec![DEGREE + 1, DEGREE + 1],
            periodic: false,
        }
    }

    /// Two spans from `t0` to `t1` sharing a simple knot.
    ///
    /// The weights are chosen so the homogeneous poles at the middle knot
    /// are collinear, which lets the middle knot have multiplicity one.
    fn c1_piece(t0: f64, t1: f64) -> Self {
        let half = (t1 - t0) * 0.5;
        let c = (half * 0.5).cos();
        let c2 = c * c;
        Self {
            poles: vec![
                on_circle(t0),
                on_circle(t0 + half * 0.5) / c,
                on_circle(t0 + half * 1.5) / c,
                on_circle(t1),
            ],
            weights: vec![1.0, c2, c2, 1.0],
            knots: vec![t0, t0 + half, t1],
            mults: vec![DEGREE + 1, 1, DEGREE + 1],
            periodic: false,
        }
    }

    /// Chain clamped pieces whose ends coincide; junctions get
    /// multiplicity `DEGREE`.
    fn join(pieces: Vec<UnitArc>) -> Self {
        let mut iter = pieces.into_iter();
        let Some(mut out) = iter.next() else {
            return Self {
                poles: Vec::new(),
                weights: Vec::new(),
                knots: Vec::new(),
                mults: Vec::new(),
                periodic: false,
            };
        };
        for p in iter {
            if let Some(m) = out.mults.last_mut() {
                *m = DEGREE;
            }
            out.poles.extend_from_slice(&p.poles[1..]);
            out.weights.extend_from_slice(&p.weights[1..]);
            out.knots.extend_from_slice(&p.knots[1..]);
            out.mults.extend_from_slice(&p.mults[1..]);
        }
        out
    }

    /// Arc of the unit circle from angle `u1` to `u2`.
    pub fn arc(u1: f64, u2: f64, policy: ParameterisationType) -> Result<Self> {
        let sweep = u2 - u1;
        if sweep <= Tolerance::PCONFUSION {
            return Err(GeomError::domain("conic arc: empty or reversed angular range"));
        }
        if sweep > TAU + Tolerance::PCONFUSION {
            return Err(GeomError::domain("conic arc: more than a full turn"));
        }
        if policy == ParameterisationType::RationalC1 {
            if sweep < C1_SPLIT_SWEEP {
                return Ok(Self::c1_piece(u1, u2));
            }
            let mid = (u1 + u2) * 0.5;
            return Ok(Self::join(vec![Self::c1_piece(u1, mid), Self::c1_piece(mid, u2)]));
        }
        let n = span_count(policy, sweep)?;
        let at = |i: usize| if i == n { u2 } else { u1 + sweep * i as f64 / n as f64 };
        let arc = Self::join((0..n).map(|i| Self::span(at(i), at(i + 1))).collect());
        trace!(?policy, spans = n, "unit arc built");
        Ok(arc)
    }

    /// The whole unit circle as a periodic spline over `[0, 2π]`.
    pub fn full(policy: ParameterisationType) -> Result<Self> {
        if matches!(
            policy,
            ParameterisationType::TgtThetaOver2_1 | ParameterisationType::TgtThetaOver2_2
        ) {
            return Err(GeomError::domain(format!("{policy:?} cannot describe a complete circle")));
        }
        let mut arc = Self::arc(0.0, TAU, policy)?;
        arc.poles.pop();
        arc.weights.pop();
        let last = arc.mults.len() - 1;
        arc.mults[0] = DEGREE;
        arc.mults[last] = DEGREE;
        arc.periodic = true;
        Ok(arc)
    }

    /// Map onto the ellipse `center + a cos(t) x + b sin(t) y`.
    pub fn place<P: Space>(&self, center: P, x: P, y: P, a: f64, b: f64) -> Result<BSplineCurve<P>> {
        let poles = self
            .poles
            .iter()
            .map(|p| center + x * (a * p.x) + y * (b * p.y))
            .collect();
        BSplineCurve::new(
            poles,
            Some(self.weights.clone()),
            self.knots.clone(),
            self.mults.clone(),
            DEGREE,
            self.periodic,
        )
    }
}

fn span_count(policy: ParameterisationType, sweep: f64) -> Result<usize> {
    let by_size = |max: f64| ((sweep / max) - 1e-9).ceil().max(1.0) as usize;
    let n = match policy {
        ParameterisationType::TgtThetaOver2 => by_size(TAU / 3.0),
        ParameterisationType::QuasiAngular => by_size(PI / 2.0),
        ParameterisationType::TgtThetaOver2_1 => {
            if sweep > 0.9999 * PI {
                return Err(GeomError::domain("TgtThetaOver2_1: arc of π or more"));
            }
            1
        }
        ParameterisationType::TgtThetaOver2_2 => {
            if sweep > 1.9999 * PI {
                return Err(GeomError::domain("TgtThetaOver2_2: arc of 2π or more"));
            }
            2
        }
        ParameterisationType::TgtThetaOver2_3 => 3,
        ParameterisationType::TgtThetaOver2_4 => 4,
        ParameterisationType::RationalC1 => 2,
    };
    Ok(n)
}

/// Complete circle as a periodic rational B-spline.
pub fn circle_to_bspline<P: Space>(c: &Circle<P>, policy: ParameterisationType) -> Result<BSplineCurve<P>> {
    UnitArc::full(policy)?.place(c.center(), c.x_dir(), c.y_dir(), c.radius(), c.radius())
}

/// Arc of a circle between parameters `u1 < u2`.
pub fn circle_arc_to_bspline<P: Space>(
    c: &Circle<P>,
    u1: f64,
    u2: f64,
    policy: ParameterisationType,
) -> Result<BSplineCurve<P>> {
    UnitArc::arc(u1, u2, policy)?.place(c.center(), c.x_dir(), c.y_dir(), c.radius(), c.radius())
}

pub fn ellipse_to_bspline<P: Space>(e: &Ellipse<P>, policy: ParameterisationType) -> Result<BSplineCurve<P>> {
    UnitArc::full(policy)?.place(e.center(), e.x_dir(), e.y_dir(), e.major_radius(), e.minor_radius())
}

pub fn ellipse_arc_to_bspline<P: Space>(
    e: &Ellipse<P>,
    u1: f64,
    u2: f64,
    policy: ParameterisationType,
) -> Result<BSplineCurve<P>> {
    UnitArc::arc(u1, u2, policy)?.place(e.center(), e.x_dir(), e.y_dir(), e.major_radius(), e.minor_radius())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgeom_geometry::ParametricCurve;
    use pgeom_math::DVec3;

    const ALL: [ParameterisationType; 7] = [
        ParameterisationType::TgtThetaOver2,
        ParameterisationType::TgtThetaOver2_1,
        ParameterisationType::TgtThetaOver2_2,
        ParameterisationType::TgtThetaOver2_3,
        ParameterisationType::TgtThetaOver2_4,
        ParameterisationType::QuasiAngular,
        ParameterisationType::RationalC1,
    ];

    fn circle() -> Circle<DVec3> {
        Circle::new(DVec3::new(1.0, 2.0, 3.0), DVec3::X, DVec3::Z, 2.5).unwrap()
    }

    fn assert_on_circle(b: &BSplineCurve<DVec3>, c: &Circle<DVec3>) {
        let (a, z) = (b.first_parameter(), b.last_parameter());
        for i in 0..=40 {
            let u = a + (z - a) * i as f64 / 40.0;
            let p = b.value(u).unwrap() - c.center();
            assert!((p.length() - c.radius()).abs() < 1e-12, "off the circle at {u}");
            assert!(p.dot(c.axis()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_full_circle_layouts() {
        let c = circle();
        for policy in ALL {
            let r = circle_to_bspline(&c, policy);
            match policy {
                ParameterisationType::TgtThetaOver2_1 | ParameterisationType::TgtThetaOver2_2 => {
                    assert!(matches!(r, Err(GeomError::Domain(_))), "{policy:?}");
                }
                _ => {
                    let b = r.unwrap();
                    assert!(b.is_periodic());
                    assert_eq!(b.degree(), DEGREE);
                    assert!((b.last_parameter() - TAU).abs() < 1e-15);
                    assert_on_circle(&b, &c);
                    // knots are angles
                    for &k in b.knots() {
                        assert!((b.value(k).unwrap() - c.value(k).unwrap()).length() < 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn test_span_counts() {
        let spans = |p| UnitArc::full(p).unwrap().knots.len() - 1;
        assert_eq!(spans(ParameterisationType::TgtThetaOver2), 3);
        assert_eq!(spans(ParameterisationType::TgtThetaOver2_4), 4);
        assert_eq!(spans(ParameterisationType::QuasiAngular), 4);
        assert_eq!(spans(ParameterisationType::RationalC1), 4);
        let quarter = UnitArc::arc(0.0, PI / 2.0, ParameterisationType::QuasiAngular).unwrap();
        assert_eq!(quarter.knots, vec![0.0, PI / 2.0]);
    }

    #[test]
    fn test_arc_limits() {
        let c = circle();
        assert!(circle_arc_to_bspline(&c, 0.0, 3.0, ParameterisationType::TgtThetaOver2_1).is_ok());
        assert!(matches!(
            circle_arc_to_bspline(&c, 0.0, PI, ParameterisationType::TgtThetaOver2_1),
            Err(GeomError::Domain(_))
        ));
        assert!(circle_arc_to_bspline(&c, 0.0, 6.0, ParameterisationType::TgtThetaOver2_2).is_ok());
        assert!(matches!(
            circle_arc_to_bspline(&c, 0.0, TAU, ParameterisationType::TgtThetaOver2_2),
            Err(GeomError::Domain(_))
        ));
        assert!(matches!(
            circle_arc_to_bspline(&c, 1.0, 1.0, ParameterisationType::TgtThetaOver2),
            Err(GeomError::Domain(_))
        ));
    }

    #[test]
    fn test_arc_end_points() {
        let c = circle();
        for policy in ALL {
            let b = circle_arc_to_bspline(&c, 0.5, 2.0, policy).unwrap();
            assert!((b.first_parameter() - 0.5).abs() < 1e-15);
            assert!((b.last_parameter() - 2.0).abs() < 1e-15);
            assert!((b.start_point() - c.value(0.5).unwrap()).length() < 1e-12);
            assert!((b.end_point() - c.value(2.0).unwrap()).length() < 1e-12);
            assert_on_circle(&b, &c);
        }
    }

    #[test]
    fn test_rational_c1_is_smooth() {
        let c = circle();
        let b = circle_arc_to_bspline(&c, 0.0, 4.0, ParameterisationType::RationalC1).unwrap();
        assert_eq!(b.multiplicities(), &[3, 1, 3]);
        assert!(b.is_cn(1));
        assert!((b.value(2.0).unwrap() - c.value(2.0).unwrap()).length() < 1e-12);

        let long = circle_arc_to_bspline(&c, 0.0, 6.2, ParameterisationType::RationalC1).unwrap();
        assert_eq!(long.multiplicities(), &[3, 1, 2, 1, 3]);
        assert_on_circle(&long, &c);
    }

    #[test]
    fn test_ellipse() {
        let e = Ellipse::new(DVec2::new(1.0, -1.0), DVec2::X, DVec2::Y, 3.0, 1.0).unwrap();
        let b = ellipse_to_bspline(&e, ParameterisationType::QuasiAngular).unwrap();
        for i in 0..=24 {
            let p = b.value(i as f64 * TAU / 24.0).unwrap() - e.center();
            assert!(((p.x / 3.0).powi(2) + p.y * p.y - 1.0).abs() < 1e-12);
        }
        let arc = ellipse_arc_to_bspline(&e, 1.0, 2.5, ParameterisationType::TgtThetaOver2).unwrap();
        assert!((arc.end_point() - e.value(2.5).unwrap()).length() < 1e-12);
    }
}
