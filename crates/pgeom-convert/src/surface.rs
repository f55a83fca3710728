//! Conversion of bounded surfaces to B-spline surfaces.
//!
//! Elementary and swept surfaces are tensor products of two one-direction
//! B-splines (a unit-circle arc, a straight segment or a converted curve),
//! combined pole by pole.

use std::f64::consts::FRAC_PI_2;

use pgeom_core::{GeomError, Result, Tolerance};
use pgeom_geometry::curve::{Curve3, TrimmedCurve};
use pgeom_geometry::surface::{SurfaceOfLinearExtrusion, SurfaceOfRevolution};
use pgeom_geometry::{BSplineCurve, BSplineSurface, ParametricCurve, ParametricSurface, Surface};
use pgeom_math::{DVec2, DVec3, Frame};
use tracing::{debug, instrument};

use crate::conic::{self, UnitArc};
use crate::curve::curve_to_bspline;
use crate::options::ParameterisationType;

const POLICY: ParameterisationType = ParameterisationType::TgtThetaOver2;

/// One direction of a tensor product.
struct Rail<T> {
    items: Vec<T>,
    weights: Vec<f64>,
    knots: Vec<f64>,
    mults: Vec<usize>,
    degree: usize,
    periodic: bool,
}

impl Rail<DVec2> {
    fn from_arc(arc: UnitArc) -> Self {
        Self {
            items: arc.poles,
            weights: arc.weights,
            knots: arc.knots,
            mults: arc.mults,
            degree: conic::DEGREE,
            periodic: arc.periodic,
        }
    }

    fn arc(t1: f64, t2: f64) -> Result<Self> {
        UnitArc::arc(t1, t2, POLICY).map(Self::from_arc)
    }

    fn full_turn() -> Result<Self> {
        UnitArc::full(POLICY).map(Self::from_arc)
    }
}

impl Rail<f64> {
    fn linear(a: f64, b: f64) -> Self {
        Self {
            items: vec![a, b],
            weights: vec![1.0, 1.0],
            knots: vec![a, b],
            mults: vec![2, 2],
            degree: 1,
            periodic: false,
        }
    }
}

impl Rail<DVec3> {
    fn from_curve(c: BSplineCurve<DVec3>) -> Self {
        let n = c.nb_poles();
        Self {
            items: c.poles().to_vec(),
            weights: c.weights().map_or_else(|| vec![1.0; n], <[f64]>::to_vec),
            knots: c.knots().to_vec(),
            mults: c.multiplicities().to_vec(),
            degree: c.degree(),
            periodic: c.is_periodic(),
        }
    }
}

fn tensor<A, B>(u: &Rail<A>, v: &Rail<B>, pole: impl Fn(&A, &B) -> DVec3) -> Result<BSplineSurface> {
    let poles = u
        .items
        .iter()
        .map(|a| v.items.iter().map(|b| pole(a, b)).collect())
        .collect();
    let rational = u.weights.iter().chain(&v.weights).any(|&w| w != 1.0);
    let weights = rational.then(|| {
        u.weights
            .iter()
            .map(|wu| v.weights.iter().map(|wv| wu * wv).collect())
            .collect()
    });
    BSplineSurface::new(
        poles,
        weights,
        u.knots.clone(),
        v.knots.clone(),
        u.mults.clone(),
        v.mults.clone(),
        u.degree,
        v.degree,
        u.periodic,
        v.periodic,
    )
}

/// `cos * X + sin * Y` for a unit-circle pole.
fn in_plane(f: &Frame, a: &DVec2) -> DVec3 {
    f.x_dir * a.x + f.y_dir * a.y
}

/// Image of the meridian pole `q` under the rotation encoded by the
/// unit-circle pole `a`.
fn revolve(r: &SurfaceOfRevolution, a: &DVec2, q: &DVec3) -> DVec3 {
    let d = r.direction();
    let rel = *q - r.location();
    let along = d * rel.dot(d);
    let radial = rel - along;
    r.location() + along + radial * a.x + d.cross(radial) * a.y
}

/// B-spline form of `c` over `[a, b]`.
fn curve_piece(c: &Curve3, a: f64, b: f64) -> Result<BSplineCurve<DVec3>> {
    let whole = a <= c.first_parameter() + Tolerance::PCONFUSION && b >= c.last_parameter() - Tolerance::PCONFUSION;
    if whole {
        curve_to_bspline(c, POLICY)
    } else {
        let piece: Curve3 = TrimmedCurve::new(c.clone(), a, b, true, false)?.into();
        curve_to_bspline(&piece, POLICY)
    }
}

/// B-spline surface with the same shape as `surface`.
///
/// Trimmed elementary and swept surfaces convert exactly with rational
/// quadratic arcs in the angular directions. Untrimmed spheres, tori and
/// surfaces of revolution with a bounded meridian convert to periodic
/// splines. Offsets convert through their elementary equivalent.
///
/// Unbounded surfaces and offsets without an elementary equivalent are a
/// domain error.
#[instrument(level = "debug", skip(surface))]
pub fn surface_to_bspline(surface: &Surface) -> Result<BSplineSurface> {
    let converted = match surface {
        Surface::Trimmed(t) => {
            let (u1, u2, v1, v2) = t.bounds();
            patch(t.basis(), u1, u2, v1, v2)
        }
        Surface::Sphere(s) => {
            let f = s.frame();
            let r = s.radius();
            let u = Rail::full_turn()?;
            let v = Rail::arc(-FRAC_PI_2, FRAC_PI_2)?;
            tensor(&u, &v, |a, b| f.origin + in_plane(f, a) * (r * b.x) + f.z_dir * (r * b.y))
        }
        Surface::Torus(t) => {
            let f = t.frame();
            let (big, small) = (t.major_radius(), t.minor_radius());
            let rail = Rail::full_turn()?;
            tensor(&rail, &rail, |a, b| {
                f.origin + in_plane(f, a) * (big + small * b.x) + f.z_dir * (small * b.y)
            })
        }
        Surface::Revolution(r) => {
            let meridian = curve_to_bspline(r.basis_curve(), POLICY)?;
            tensor(&Rail::full_turn()?, &Rail::from_curve(meridian), |a, q| revolve(r, a, q))
        }
        Surface::BSpline(b) => Ok(b.clone()),
        Surface::Offset(o) => match o.equivalent_surface() {
            Some(e) => surface_to_bspline(&e),
            None => Err(GeomError::domain("offset surface has no elementary equivalent")),
        },
        Surface::Plane(_) | Surface::Cylinder(_) | Surface::Cone(_) | Surface::Extrusion(_) => {
            Err(GeomError::domain("cannot convert an unbounded surface"))
        }
    }?;
    debug!(
        u_poles = converted.nb_u_poles(),
        v_poles = converted.nb_v_poles(),
        "surface converted"
    );
    Ok(converted)
}

/// `basis` restricted to `[u1, u2] x [v1, v2]`.
fn patch(basis: &Surface, u1: f64, u2: f64, v1: f64, v2: f64) -> Result<BSplineSurface> {
    if ![u1, u2, v1, v2].iter().all(|b| b.is_finite()) {
        return Err(GeomError::domain("cannot convert a surface trimmed to an unbounded range"));
    }
    match basis {
        Surface::Plane(p) => {
            let f = p.frame();
            let at = |u: &f64, v: &f64| f.origin + f.x_dir * *u + f.y_dir * *v;
            tensor(&Rail::linear(u1, u2), &Rail::linear(v1, v2), at)
        }
        Surface::Cylinder(c) => {
            let (f, r) = (c.frame(), c.radius());
            tensor(&Rail::arc(u1, u2)?, &Rail::linear(v1, v2), |a, v| {
                f.origin + in_plane(f, a) * r + f.z_dir * *v
            })
        }
        Surface::Cone(c) => {
            let f = c.frame();
            let (sa, ca) = c.semi_angle().sin_cos();
            let r = c.ref_radius();
            tensor(&Rail::arc(u1, u2)?, &Rail::linear(v1, v2), |a, v| {
                f.origin + in_plane(f, a) * (r + *v * sa) + f.z_dir * (*v * ca)
            })
        }
        Surface::Sphere(s) => {
            let (f, r) = (s.frame(), s.radius());
            tensor(&Rail::arc(u1, u2)?, &Rail::arc(v1, v2)?, |a, b| {
                f.origin + in_plane(f, a) * (r * b.x) + f.z_dir * (r * b.y)
            })
        }
        Surface::Torus(t) => {
            let f = t.frame();
            let (big, small) = (t.major_radius(), t.minor_radius());
            tensor(&Rail::arc(u1, u2)?, &Rail::arc(v1, v2)?, |a, b| {
                f.origin + in_plane(f, a) * (big + small * b.x) + f.z_dir * (small * b.y)
            })
        }
        Surface::Revolution(r) => revolution_patch(r, u1, u2, v1, v2),
        Surface::Extrusion(e) => extrusion_patch(e, u1, u2, v1, v2),
        Surface::BSpline(b) => {
            let mut b = b.clone();
            b.segment(u1, u2, v1, v2, Tolerance::PCONFUSION)?;
            Ok(b)
        }
        Surface::Trimmed(t) => patch(t.basis(), u1, u2, v1, v2),
        Surface::Offset(o) => match o.equivalent_surface() {
            Some(e) => patch(&e, u1, u2, v1, v2),
            None => Err(GeomError::domain("offset surface has no elementary equivalent")),
        },
    }
}

fn revolution_patch(r: &SurfaceOfRevolution, u1: f64, u2: f64, v1: f64, v2: f64) -> Result<BSplineSurface> {
    let meridian = curve_piece(r.basis_curve(), v1, v2)?;
    tensor(&Rail::arc(u1, u2)?, &Rail::from_curve(meridian), |a, q| revolve(r, a, q))
}

fn extrusion_patch(e: &SurfaceOfLinearExtrusion, u1: f64, u2: f64, v1: f64, v2: f64) -> Result<BSplineSurface> {
    let profile = curve_piece(e.basis_curve(), u1, u2)?;
    let d = e.direction();
    tensor(&Rail::from_curve(profile), &Rail::linear(v1, v2), |q, v| *q + d * *v)
}
