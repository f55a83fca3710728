//! Offset surface: a basis surface displaced along its unit normal.

use pgeom_core::{Continuity, GeomError, Result};
use pgeom_math::{DVec3, Transform};
use serde::{Deserialize, Serialize};

use super::{
    normal_resolution, CylindricalSurface, ParametricSurface, Plane, RectangularTrimmedSurface, SphericalSurface,
    Surface, ToroidalSurface,
};
use crate::derivative::{binomial, normalized_partials};

/// `S(u, v) = B(u, v) + offset * N(u, v)` with `N = Bu x Bv / |Bu x Bv|`.
///
/// Where the basis normal is undefined (a pole of a sphere, an apex) the
/// offset is degenerate and evaluation returns `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetSurface {
    basis: Box<Surface>,
    offset: f64,
    basis_continuity: Continuity,
}

fn check_basis(basis: &Surface, skip_c0_check: bool) -> Result<()> {
    if basis.continuity() == Continuity::C0 && !skip_c0_check {
        return Err(GeomError::construction("OffsetSurface: basis surface is only C0"));
    }
    Ok(())
}

fn flatten(basis: Surface, offset: f64) -> (Box<Surface>, f64, Continuity) {
    match basis {
        Surface::Offset(inner) => (inner.basis, offset + inner.offset, inner.basis_continuity),
        other => {
            let continuity = other.continuity();
            (Box::new(other), offset, continuity)
        }
    }
}

impl OffsetSurface {
    /// Offset `basis` by `offset`. Nested offsets collapse onto the inner
    /// basis with summed distances.
    pub fn new(basis: Surface, offset: f64, skip_c0_check: bool) -> Result<Self> {
        check_basis(&basis, skip_c0_check)?;
        let (basis, offset, basis_continuity) = flatten(basis, offset);
        Ok(Self {
            basis,
            offset,
            basis_continuity,
        })
    }

    pub fn basis(&self) -> &Surface {
        &self.basis
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_offset_value(&mut self, offset: f64) {
        self.offset = offset;
    }

    pub fn set_basis_surface(&mut self, basis: Surface, skip_c0_check: bool) -> Result<()> {
        check_basis(&basis, skip_c0_check)?;
        let (basis, extra, continuity) = flatten(basis, 0.0);
        self.basis = basis;
        self.offset += extra;
        self.basis_continuity = continuity;
        Ok(())
    }

    /// Elementary surface with the same points and parametrization, for
    /// offsets of planes, spheres, cylinders and tori.
    pub fn equivalent_surface(&self) -> Option<Surface> {
        equivalent(&self.basis, self.offset)
    }
}

fn direct_sign(direct: bool) -> f64 {
    if direct {
        1.0
    } else {
        -1.0
    }
}

fn equivalent(basis: &Surface, d: f64) -> Option<Surface> {
    match basis {
        Surface::Plane(p) => {
            let mut frame = *p.frame();
            frame.origin += frame.x_dir.cross(frame.y_dir) * d;
            Some(Plane::from_frame(frame).into())
        }
        Surface::Sphere(s) => {
            let r = s.radius() + direct_sign(s.frame().is_direct()) * d;
            let mut sphere = SphericalSurface::new(*s.frame(), r.abs()).ok()?;
            if r < 0.0 {
                let f = sphere.frame_mut();
                f.reverse_x();
                f.reverse_y();
                f.reverse_z();
            }
            Some(sphere.into())
        }
        Surface::Cylinder(c) => {
            let r = c.radius() + direct_sign(c.frame().is_direct()) * d;
            let mut cylinder = CylindricalSurface::new(*c.frame(), r.abs()).ok()?;
            if r < 0.0 {
                let f = cylinder.frame_mut();
                f.reverse_x();
                f.reverse_y();
            }
            Some(cylinder.into())
        }
        Surface::Torus(t) => {
            let r = t.minor_radius() + direct_sign(t.frame().is_direct()) * d;
            if r < 0.0 {
                return None;
            }
            Some(ToroidalSurface::new(*t.frame(), t.major_radius(), r).ok()?.into())
        }
        Surface::Trimmed(t) => {
            let inner = equivalent(t.basis(), d)?;
            let (u1, u2, v1, v2) = t.bounds();
            let trimmed = match (t.is_u_trimmed(), t.is_v_trimmed()) {
                (true, true) => RectangularTrimmedSurface::new(inner, u1, u2, v1, v2, true, true),
                (true, false) => RectangularTrimmedSurface::new_single(inner, u1, u2, true, true),
                (false, true) => RectangularTrimmedSurface::new_single(inner, v1, v2, false, true),
                (false, false) => return Some(inner),
            };
            Some(trimmed.ok()?.into())
        }
        _ => None,
    }
}

impl ParametricSurface for OffsetSurface {
    /// Mixed partial `(i, j)` needs basis partials up to `(i + 1, j + 1)`.
    /// Asking for `nu`, `nv` needs a basis at least `C(max(nu, nv) + 1)`.
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        let order = nu.max(nv);
        if order >= 1 && !self.basis_continuity.is_cn(order + 1) {
            return Err(GeomError::UndefinedDerivative(format!(
                "OffsetSurface: basis is {:?}, derivative of order {order} requested",
                self.basis_continuity
            )));
        }
        let Some(s) = self.basis.partials(u, v, nu + 1, nv + 1)? else {
            return Ok(None);
        };
        // partials of the unnormalized normal Bu x Bv
        let f: Vec<Vec<DVec3>> = (0..=nu)
            .map(|i| {
                (0..=nv)
                    .map(|j| {
                        let mut acc = DVec3::ZERO;
                        for a in 0..=i {
                            for b in 0..=j {
                                let c = binomial(i, a) * binomial(j, b);
                                acc += s[a + 1][b].cross(s[i - a][j - b + 1]) * c;
                            }
                        }
                        acc
                    })
                    .collect()
            })
            .collect();
        let Some(n) = normalized_partials(&f, normal_resolution(s[1][0], s[0][1])) else {
            return Ok(None);
        };
        Ok(Some(
            (0..=nu)
                .map(|i| (0..=nv).map(|j| s[i][j] + n[i][j] * self.offset).collect())
                .collect(),
        ))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        self.basis.bounds()
    }

    fn is_u_closed(&self) -> bool {
        self.basis.is_u_closed()
    }

    fn is_v_closed(&self) -> bool {
        self.basis.is_v_closed()
    }

    fn is_u_periodic(&self) -> bool {
        self.basis.is_u_periodic()
    }

    fn is_v_periodic(&self) -> bool {
        self.basis.is_v_periodic()
    }

    fn u_period(&self) -> Result<f64> {
        self.basis.u_period()
    }

    fn v_period(&self) -> Result<f64> {
        self.basis.v_period()
    }

    fn continuity(&self) -> Continuity {
        self.basis_continuity.offset_lowered()
    }

    fn is_cn_u(&self, n: usize) -> bool {
        self.basis.is_cn_u(n + 1)
    }

    fn is_cn_v(&self, n: usize) -> bool {
        self.basis.is_cn_v(n + 1)
    }

    fn u_reverse(&mut self) {
        self.basis.u_reverse();
        self.offset = -self.offset;
    }

    fn v_reverse(&mut self) {
        self.basis.v_reverse();
        self.offset = -self.offset;
    }

    fn u_reversed_parameter(&self, u: f64) -> f64 {
        self.basis.u_reversed_parameter(u)
    }

    fn v_reversed_parameter(&self, v: f64) -> f64 {
        self.basis.v_reversed_parameter(v)
    }

    fn transform(&mut self, t: &Transform) {
        self.basis.transform(t);
        self.offset *= t.scale_factor();
    }

    fn transform_parameters(&self, u: f64, v: f64, t: &Transform) -> (f64, f64) {
        self.basis.transform_parameters(u, v, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::BSplineCurve;
    use crate::surface::SurfaceOfLinearExtrusion;
    use pgeom_math::Frame;
    use std::f64::consts::FRAC_PI_2;

    fn sphere(r: f64) -> Surface {
        SphericalSurface::new(Frame::world(), r).unwrap().into()
    }

    #[test]
    fn test_offset_sphere_matches_larger_sphere() {
        let off = OffsetSurface::new(sphere(1.0), 0.5, false).unwrap();
        let big = sphere(1.5);
        for (u, v) in [(0.3, 0.2), (2.0, -0.7)] {
            let a = off.d2(u, v).unwrap();
            let b = big.d2(u, v).unwrap();
            assert!((a.point - b.point).length() < 1e-12);
            assert!((a.d1u - b.d1u).length() < 1e-12);
            assert!((a.d1v - b.d1v).length() < 1e-12);
            assert!((a.d2u - b.d2u).length() < 1e-10);
            assert!((a.d2uv - b.d2uv).length() < 1e-10);
            assert!((a.d2v - b.d2v).length() < 1e-10);
        }
    }

    #[test]
    fn test_degenerate_at_pole() {
        let off = OffsetSurface::new(sphere(1.0), 0.5, false).unwrap();
        assert!(off.eval_d0(0.0, FRAC_PI_2).unwrap().is_none());
        assert!(matches!(off.value(0.0, FRAC_PI_2), Err(GeomError::UndefinedValue(_))));
        // the u derivative only vanishes to round-off here
        assert!(off.eval_d0(0.3, FRAC_PI_2).unwrap().is_none());
        assert!(off.eval_d0(0.3, -FRAC_PI_2).unwrap().is_none());
        assert!(off.eval_d0(0.3, FRAC_PI_2 - 1e-3).unwrap().is_some());
    }

    #[test]
    fn test_c0_basis_rejected_unless_skipped() {
        let polyline = BSplineCurve::new(
            vec![DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0)],
            None,
            vec![0.0, 1.0, 2.0],
            vec![2, 1, 2],
            1,
            false,
        )
        .unwrap();
        let prism: Surface = SurfaceOfLinearExtrusion::new(polyline.into(), DVec3::Z).unwrap().into();
        assert!(matches!(
            OffsetSurface::new(prism.clone(), 1.0, false),
            Err(GeomError::Construction(_))
        ));
        let off = OffsetSurface::new(prism, 1.0, true).unwrap();
        assert!(off.eval_d0(0.5, 0.0).unwrap().is_some());
        assert!(matches!(off.eval_d1(0.5, 0.0), Err(GeomError::UndefinedDerivative(_))));
    }

    #[test]
    fn test_derivative_needs_one_more_basis_order() {
        let profile = BSplineCurve::new(
            vec![DVec3::ZERO, DVec3::new(1.0, 1.0, 0.0), DVec3::new(2.0, 0.0, 0.0), DVec3::new(3.0, 1.0, 0.0)],
            None,
            vec![0.0, 1.0, 2.0],
            vec![3, 1, 3],
            2,
            false,
        )
        .unwrap();
        let sweep: Surface = SurfaceOfLinearExtrusion::new(profile.into(), DVec3::Z).unwrap().into();
        let off = OffsetSurface::new(sweep, 0.5, false).unwrap();
        assert_eq!(off.continuity(), Continuity::C0);
        assert!(off.eval_d0(1.0, 0.0).unwrap().is_some());
        assert!(matches!(off.eval_d1(1.0, 0.0), Err(GeomError::UndefinedDerivative(_))));
    }

    #[test]
    fn test_nested_offsets_sum() {
        let inner: Surface = OffsetSurface::new(Plane::xy().into(), 1.0, false).unwrap().into();
        let outer = OffsetSurface::new(inner, 2.0, false).unwrap();
        assert!(matches!(outer.basis(), Surface::Plane(_)));
        assert_eq!(outer.offset(), 3.0);
        assert!((outer.value(1.0, 1.0).unwrap() - DVec3::new(1.0, 1.0, 3.0)).length() < 1e-12);
    }

    #[test]
    fn test_reverse_keeps_points() {
        let off = OffsetSurface::new(sphere(2.0), 0.5, false).unwrap();
        let r = off.u_reversed();
        assert_eq!(r.offset(), -0.5);
        let p = off.value(1.0, 0.3).unwrap();
        assert!((r.value(off.u_reversed_parameter(1.0), 0.3).unwrap() - p).length() < 1e-12);
    }

    #[test]
    fn test_mirror_negates_offset() {
        let mut off = OffsetSurface::new(Plane::xy().into(), 1.0, false).unwrap();
        off.transform(&Transform::from_mirror_plane(DVec3::ZERO, DVec3::Z));
        assert!((off.value(0.0, 0.0).unwrap() - DVec3::new(0.0, 0.0, -1.0)).length() < 1e-12);
    }

    #[test]
    fn test_equivalent_surfaces() {
        let off = OffsetSurface::new(sphere(1.0), -3.0, false).unwrap();
        let eq = off.equivalent_surface().unwrap();
        for (u, v) in [(0.4, 0.1), (3.0, -1.0)] {
            assert!((eq.value(u, v).unwrap() - off.value(u, v).unwrap()).length() < 1e-12);
        }

        let cyl: Surface = CylindricalSurface::new(Frame::world(), 1.0).unwrap().into();
        let eq = OffsetSurface::new(cyl, 0.5, false).unwrap().equivalent_surface().unwrap();
        match eq {
            Surface::Cylinder(c) => assert_eq!(c.radius(), 1.5),
            other => panic!("expected a cylinder, got {other:?}"),
        }

        let torus: Surface = ToroidalSurface::new(Frame::world(), 3.0, 1.0).unwrap().into();
        assert!(OffsetSurface::new(torus, -2.0, false).unwrap().equivalent_surface().is_none());
    }
}
