//! Parametric surfaces in space.
//!
//! The closed set of kinds is the [`Surface`] enum; the shared evaluation
//! contract is [`ParametricSurface`], built on the mixed partials primitive.

mod bspline;
mod bspline_edit;
mod conical;
mod cylindrical;
mod extrusion;
mod offset;
mod planar;
mod revolution;
mod spherical;
mod toroidal;
mod trimmed;

use std::sync::Arc;

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::{DVec3, Transform};
use serde::{Deserialize, Serialize};

pub use bspline::BSplineSurface;
pub use conical::ConicalSurface;
pub use cylindrical::CylindricalSurface;
pub use extrusion::SurfaceOfLinearExtrusion;
pub use offset::OffsetSurface;
pub use planar::Plane;
pub use revolution::SurfaceOfRevolution;
pub use spherical::SphericalSurface;
pub use toroidal::ToroidalSurface;
pub use trimmed::RectangularTrimmedSurface;

/// Point and derivatives up to order 2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceD2 {
    pub point: DVec3,
    pub d1u: DVec3,
    pub d1v: DVec3,
    pub d2u: DVec3,
    pub d2v: DVec3,
    pub d2uv: DVec3,
}

/// Point and derivatives up to order 3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceD3 {
    pub d2: SurfaceD2,
    pub d3u: DVec3,
    pub d3v: DVec3,
    pub d3uuv: DVec3,
    pub d3uvv: DVec3,
}

/// Evaluation and query contract shared by all surfaces.
///
/// [`partials`](ParametricSurface::partials) returns `d[i][j]`, the
/// derivative of order `i` in u and `j` in v, for `i <= nu` and `j <= nv`.
/// Outcomes follow the curve contract: `Ok(None)` for a geometric
/// degeneracy, `Err` for an invalid request.
pub trait ParametricSurface {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>>;

    /// `(u1, u2, v1, v2)`, possibly infinite.
    fn bounds(&self) -> (f64, f64, f64, f64);

    fn is_u_closed(&self) -> bool;

    fn is_v_closed(&self) -> bool;

    fn is_u_periodic(&self) -> bool;

    fn is_v_periodic(&self) -> bool;

    fn u_period(&self) -> Result<f64> {
        if self.is_u_periodic() {
            let (u1, u2, _, _) = self.bounds();
            Ok(u2 - u1)
        } else {
            Err(GeomError::no_such_object("surface is not periodic in U"))
        }
    }

    fn v_period(&self) -> Result<f64> {
        if self.is_v_periodic() {
            let (_, _, v1, v2) = self.bounds();
            Ok(v2 - v1)
        } else {
            Err(GeomError::no_such_object("surface is not periodic in V"))
        }
    }

    fn continuity(&self) -> Continuity;

    fn is_cn_u(&self, n: usize) -> bool {
        self.continuity().is_cn(n)
    }

    fn is_cn_v(&self, n: usize) -> bool {
        self.continuity().is_cn(n)
    }

    fn u_reverse(&mut self);

    fn v_reverse(&mut self);

    fn u_reversed_parameter(&self, u: f64) -> f64;

    fn v_reversed_parameter(&self, v: f64) -> f64;

    fn transform(&mut self, t: &Transform);

    /// Parameters on the transformed surface of the point at `(u, v)`.
    fn transform_parameters(&self, u: f64, v: f64, _t: &Transform) -> (f64, f64) {
        (u, v)
    }

    fn u_reversed(&self) -> Self
    where
        Self: Sized + Clone,
    {
        let mut s = self.clone();
        s.u_reverse();
        s
    }

    fn v_reversed(&self) -> Self
    where
        Self: Sized + Clone,
    {
        let mut s = self.clone();
        s.v_reverse();
        s
    }

    fn eval_d0(&self, u: f64, v: f64) -> Result<Option<DVec3>> {
        Ok(self.partials(u, v, 0, 0)?.map(|d| d[0][0]))
    }

    fn eval_d1(&self, u: f64, v: f64) -> Result<Option<(DVec3, DVec3, DVec3)>> {
        Ok(self.partials(u, v, 1, 1)?.map(|d| (d[0][0], d[1][0], d[0][1])))
    }

    fn eval_d2(&self, u: f64, v: f64) -> Result<Option<SurfaceD2>> {
        Ok(self.partials(u, v, 2, 2)?.map(|d| SurfaceD2 {
            point: d[0][0],
            d1u: d[1][0],
            d1v: d[0][1],
            d2u: d[2][0],
            d2v: d[0][2],
            d2uv: d[1][1],
        }))
    }

    fn eval_d3(&self, u: f64, v: f64) -> Result<Option<SurfaceD3>> {
        Ok(self.partials(u, v, 3, 3)?.map(|d| SurfaceD3 {
            d2: SurfaceD2 {
                point: d[0][0],
                d1u: d[1][0],
                d1v: d[0][1],
                d2u: d[2][0],
                d2v: d[0][2],
                d2uv: d[1][1],
            },
            d3u: d[3][0],
            d3v: d[0][3],
            d3uuv: d[2][1],
            d3uvv: d[1][2],
        }))
    }

    /// Derivative of order `nu` in u and `nv` in v, `nu + nv >= 1`.
    fn eval_dn(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<DVec3>> {
        if nu + nv < 1 {
            return Err(GeomError::out_of_range("derivative order must be at least 1"));
        }
        Ok(self.partials(u, v, nu, nv)?.map(|d| d[nu][nv]))
    }

    /// Unit normal `d1u x d1v`, `None` where the cross product vanishes
    /// relative to the derivative lengths.
    fn eval_normal(&self, u: f64, v: f64) -> Result<Option<DVec3>> {
        Ok(self.eval_d1(u, v)?.and_then(|(_, du, dv)| {
            let n = du.cross(dv);
            let len = n.length();
            (len > normal_resolution(du, dv) && len.is_finite()).then(|| n / len)
        }))
    }

    fn value(&self, u: f64, v: f64) -> Result<DVec3> {
        self.eval_d0(u, v)?.ok_or_else(|| undefined(u, v))
    }

    fn d1(&self, u: f64, v: f64) -> Result<(DVec3, DVec3, DVec3)> {
        self.eval_d1(u, v)?.ok_or_else(|| undefined(u, v))
    }

    fn d2(&self, u: f64, v: f64) -> Result<SurfaceD2> {
        self.eval_d2(u, v)?.ok_or_else(|| undefined(u, v))
    }

    fn d3(&self, u: f64, v: f64) -> Result<SurfaceD3> {
        self.eval_d3(u, v)?.ok_or_else(|| undefined(u, v))
    }

    fn dn(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<DVec3> {
        self.eval_dn(u, v, nu, nv)?.ok_or_else(|| undefined(u, v))
    }
}

fn undefined(u: f64, v: f64) -> GeomError {
    GeomError::UndefinedValue(format!("surface is degenerate at parameters ({u}, {v})"))
}

/// Length under which `du x dv` gives no normal.
///
/// Relative to the longer first derivative: catches a collapsed iso (a
/// sphere pole) as well as parallel derivatives.
pub(crate) fn normal_resolution(du: DVec3, dv: DVec3) -> f64 {
    let scale = du.length().max(dv.length());
    (Tolerance::CONFUSION * scale * scale).max(Tolerance::RESOLUTION)
}

/// Partials grid of a closed-form surface.
pub(crate) fn grid(nu: usize, nv: usize, f: impl Fn(usize, usize) -> DVec3) -> Vec<Vec<DVec3>> {
    (0..=nu).map(|i| (0..=nv).map(|j| f(i, j)).collect()).collect()
}

/// Transformed frame axis, kept when the image is null.
pub(crate) fn unit_image(t: &Transform, v: DVec3) -> DVec3 {
    t.transform_vector(v)
        .try_normalize()
        .filter(|_| v.length() > Tolerance::RESOLUTION)
        .unwrap_or(v)
}

/// Any surface of the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Surface {
    Plane(Plane),
    Cylinder(CylindricalSurface),
    Cone(ConicalSurface),
    Sphere(SphericalSurface),
    Torus(ToroidalSurface),
    Revolution(SurfaceOfRevolution),
    Extrusion(SurfaceOfLinearExtrusion),
    Trimmed(RectangularTrimmedSurface),
    Offset(OffsetSurface),
    BSpline(BSplineSurface),
}

/// Shared handle to a surface; mutate through [`Arc::make_mut`].
pub type SurfaceHandle = Arc<Surface>;

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Surface::Plane($s) => $body,
            Surface::Cylinder($s) => $body,
            Surface::Cone($s) => $body,
            Surface::Sphere($s) => $body,
            Surface::Torus($s) => $body,
            Surface::Revolution($s) => $body,
            Surface::Extrusion($s) => $body,
            Surface::Trimmed($s) => $body,
            Surface::Offset($s) => $body,
            Surface::BSpline($s) => $body,
        }
    };
}

impl ParametricSurface for Surface {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        dispatch!(self, s => s.partials(u, v, nu, nv))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        dispatch!(self, s => s.bounds())
    }

    fn is_u_closed(&self) -> bool {
        dispatch!(self, s => s.is_u_closed())
    }

    fn is_v_closed(&self) -> bool {
        dispatch!(self, s => s.is_v_closed())
    }

    fn is_u_periodic(&self) -> bool {
        dispatch!(self, s => s.is_u_periodic())
    }

    fn is_v_periodic(&self) -> bool {
        dispatch!(self, s => s.is_v_periodic())
    }

    fn u_period(&self) -> Result<f64> {
        dispatch!(self, s => s.u_period())
    }

    fn v_period(&self) -> Result<f64> {
        dispatch!(self, s => s.v_period())
    }

    fn continuity(&self) -> Continuity {
        dispatch!(self, s => s.continuity())
    }

    fn is_cn_u(&self, n: usize) -> bool {
        dispatch!(self, s => s.is_cn_u(n))
    }

    fn is_cn_v(&self, n: usize) -> bool {
        dispatch!(self, s => s.is_cn_v(n))
    }

    fn u_reverse(&mut self) {
        dispatch!(self, s => s.u_reverse())
    }

    fn v_reverse(&mut self) {
        dispatch!(self, s => s.v_reverse())
    }

    fn u_reversed_parameter(&self, u: f64) -> f64 {
        dispatch!(self, s => s.u_reversed_parameter(u))
    }

    fn v_reversed_parameter(&self, v: f64) -> f64 {
        dispatch!(self, s => s.v_reversed_parameter(v))
    }

    fn transform(&mut self, t: &Transform) {
        dispatch!(self, s => s.transform(t))
    }

    fn transform_parameters(&self, u: f64, v: f64, t: &Transform) -> (f64, f64) {
        dispatch!(self, s => s.transform_parameters(u, v, t))
    }
}

impl Surface {
    /// Whether all four parameter bounds are finite.
    pub fn is_bounded(&self) -> bool {
        let (u1, u2, v1, v2) = self.bounds();
        [u1, u2, v1, v2].iter().all(|b| b.is_finite())
    }

    pub fn as_bspline(&self) -> Option<&BSplineSurface> {
        match self {
            Surface::BSpline(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($variant:ident => $ty:ident),*) => {
        $(
            impl From<$ty> for Surface {
                fn from(s: $ty) -> Self {
                    Surface::$variant(s)
                }
            }
        )*
    };
}

impl_from!(
    Plane => Plane,
    Cylinder => CylindricalSurface,
    Cone => ConicalSurface,
    Sphere => SphericalSurface,
    Torus => ToroidalSurface,
    Revolution => SurfaceOfRevolution,
    Extrusion => SurfaceOfLinearExtrusion,
    Trimmed => RectangularTrimmedSurface,
    Offset => OffsetSurface,
    BSpline => BSplineSurface
);

#[cfg(test)]
mod tests {
    use super::*;
    use pgeom_math::Frame;

    #[test]
    fn test_period_queries() {
        let s: Surface = CylindricalSurface::new(Frame::world(), 1.0).unwrap().into();
        assert!((s.u_period().unwrap() - std::f64::consts::TAU).abs() < 1e-15);
        assert!(matches!(s.v_period(), Err(GeomError::NoSuchObject(_))));
        assert!(!s.is_bounded());
    }

    #[test]
    fn test_dn_rejects_order_zero() {
        let s: Surface = Plane::from_frame(Frame::world()).into();
        assert!(matches!(s.eval_dn(0.0, 0.0, 0, 0), Err(GeomError::OutOfRange(_))));
        assert_eq!(s.dn(1.0, 2.0, 1, 0).unwrap(), DVec3::X);
        assert_eq!(s.dn(1.0, 2.0, 1, 1).unwrap(), DVec3::ZERO);
    }

    #[test]
    fn test_pole_normal_at_any_scale() {
        let half_pi = std::f64::consts::FRAC_PI_2;
        for r in [1e-6, 1.0, 1e6] {
            let s: Surface = SphericalSurface::new(Frame::world(), r).unwrap().into();
            assert!(s.eval_normal(0.3, half_pi).unwrap().is_none(), "r={r}");
            let n = s.eval_normal(0.3, 0.2).unwrap().unwrap();
            assert!((n - s.value(0.3, 0.2).unwrap() / r).length() < 1e-9, "r={r}");
        }
    }

    #[test]
    fn test_handle_mutation_is_isolated() {
        let shared: SurfaceHandle = Arc::new(SphericalSurface::new(Frame::world(), 1.0).unwrap().into());
        let mut mine = Arc::clone(&shared);
        Arc::make_mut(&mut mine).transform(&Transform::from_translation(DVec3::Z));
        assert!((shared.value(0.0, 0.0).unwrap() - DVec3::X).length() < 1e-12);
        assert!((mine.value(0.0, 0.0).unwrap() - DVec3::new(1.0, 0.0, 1.0)).length() < 1e-12);
    }
}
