//! Surface swept by rotating a meridian curve around an axis.

use std::f64::consts::TAU;

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::{DVec3, Point3, Transform, Vector3};
use serde::{Deserialize, Serialize};

use super::{unit_image, ParametricSurface};
use crate::curve::{Curve3, ParametricCurve};
use crate::derivative::trig_derivative;

/// Rotation of `meridian` around the axis `(location, direction)`.
///
/// `u` is the rotation angle in `[0, 2*PI)`, `v` the meridian parameter:
///
/// `S(u, v) = A + (Q.D) * D + cos(u) * (Q - (Q.D) * D) + sin(u) * (D x Q)`
/// with `Q = C(v) - A`.
///
/// The meridian is not checked to be planar or coplanar with the axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOfRevolution {
    meridian: Box<Curve3>,
    location: Point3,
    direction: Vector3,
}

fn unit_axis(direction: Vector3) -> Result<Vector3> {
    direction
        .try_normalize()
        .filter(|_| direction.length() > Tolerance::RESOLUTION)
        .ok_or_else(|| GeomError::construction("SurfaceOfRevolution: null axis direction"))
}

impl SurfaceOfRevolution {
    pub fn new(meridian: Curve3, location: Point3, direction: Vector3) -> Result<Self> {
        Ok(Self {
            meridian: Box::new(meridian),
            location,
            direction: unit_axis(direction)?,
        })
    }

    pub fn basis_curve(&self) -> &Curve3 {
        &self.meridian
    }

    pub fn set_basis_curve(&mut self, meridian: Curve3) {
        self.meridian = Box::new(meridian);
    }

    pub fn location(&self) -> Point3 {
        self.location
    }

    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    pub fn set_axis(&mut self, location: Point3, direction: Vector3) -> Result<()> {
        self.direction = unit_axis(direction)?;
        self.location = location;
        Ok(())
    }

    fn rotate(&self, q: DVec3, i: usize, u: f64) -> DVec3 {
        let d = self.direction;
        let along = d * q.dot(d);
        let (c, s) = trig_derivative(u, i);
        let mut r = (q - along) * c + d.cross(q) * s;
        if i == 0 {
            r += along;
        }
        r
    }
}

impl ParametricSurface for SurfaceOfRevolution {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        let Some(c) = self.meridian.derivatives(v, nv)? else {
            return Ok(None);
        };
        let out = (0..=nu)
            .map(|i| {
                (0..=nv)
                    .map(|j| {
                        if j == 0 {
                            let r = self.rotate(c[0] - self.location, i, u);
                            if i == 0 {
                                self.location + r
                            } else {
                                r
                            }
                        } else {
                            self.rotate(c[j], i, u)
                        }
                    })
                    .collect()
            })
            .collect();
        Ok(Some(out))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            0.0,
            TAU,
            self.meridian.first_parameter(),
            self.meridian.last_parameter(),
        )
    }

    fn is_u_closed(&self) -> bool {
        true
    }

    fn is_v_closed(&self) -> bool {
        self.meridian.is_closed()
    }

    fn is_u_periodic(&self) -> bool {
        true
    }

    fn is_v_periodic(&self) -> bool {
        self.meridian.is_periodic()
    }

    fn v_period(&self) -> Result<f64> {
        self.meridian.period()
    }

    fn continuity(&self) -> Continuity {
        self.meridian.continuity()
    }

    fn is_cn_u(&self, _n: usize) -> bool {
        true
    }

    fn is_cn_v(&self, n: usize) -> bool {
        self.meridian.is_cn(n)
    }

    fn u_reverse(&mut self) {
        self.direction = -self.direction;
    }

    fn v_reverse(&mut self) {
        self.meridian.reverse();
    }

    fn u_reversed_parameter(&self, u: f64) -> f64 {
        TAU - u
    }

    fn v_reversed_parameter(&self, v: f64) -> f64 {
        self.meridian.reversed_parameter(v)
    }

    /// An orientation-reversing transform also flips the axis so the
    /// rotation sense in u is kept.
    fn transform(&mut self, t: &Transform) {
        self.location = t.transform_point(self.location);
        let d = unit_image(t, self.direction);
        self.direction = if t.scale_factor() < 0.0 { -d } else { d };
        self.meridian.transform(t);
    }

    fn transform_parameters(&self, u: f64, v: f64, t: &Transform) -> (f64, f64) {
        (u, self.meridian.transformed_parameter(v, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Line;
    use std::f64::consts::FRAC_PI_2;

    // a vertical line at distance 2 from the z axis: a cylinder
    fn tube() -> SurfaceOfRevolution {
        let line = Line::new(DVec3::new(2.0, 0.0, 0.0), DVec3::Z).unwrap();
        SurfaceOfRevolution::new(line.into(), DVec3::ZERO, DVec3::Z).unwrap()
    }

    #[test]
    fn test_rotated_points() {
        let s = tube();
        assert!((s.value(0.0, 1.0).unwrap() - DVec3::new(2.0, 0.0, 1.0)).length() < 1e-12);
        assert!((s.value(FRAC_PI_2, 3.0).unwrap() - DVec3::new(0.0, 2.0, 3.0)).length() < 1e-12);
        assert!(SurfaceOfRevolution::new(tube().basis_curve().clone(), DVec3::ZERO, DVec3::ZERO).is_err());
    }

    #[test]
    fn test_derivatives_match_cylinder() {
        let s = tube();
        let d = s.d2(0.5, 1.0).unwrap();
        let expected_du = DVec3::new(-0.5f64.sin(), 0.5f64.cos(), 0.0) * 2.0;
        assert!((d.d1u - expected_du).length() < 1e-12);
        assert!((d.d1v - DVec3::Z).length() < 1e-12);
        assert!((d.d2u + DVec3::new(0.5f64.cos(), 0.5f64.sin(), 0.0) * 2.0).length() < 1e-12);
        assert!(d.d2uv.length() < 1e-12);
        let n = s.eval_normal(0.0, 0.0).unwrap().unwrap();
        assert!((n - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_reversals() {
        let s = tube();
        let ur = s.u_reversed();
        let vr = s.v_reversed();
        let p = s.value(1.0, 2.0).unwrap();
        assert!((ur.value(s.u_reversed_parameter(1.0), 2.0).unwrap() - p).length() < 1e-12);
        assert!((vr.value(1.0, s.v_reversed_parameter(2.0)).unwrap() - p).length() < 1e-12);
    }

    #[test]
    fn test_mirror_keeps_parameters() {
        let s = tube();
        let t = Transform::from_mirror_plane(DVec3::ZERO, DVec3::Y);
        let mut m = s.clone();
        m.transform(&t);
        for (u, v) in [(0.3, 0.0), (2.0, 1.5)] {
            let (tu, tv) = s.transform_parameters(u, v, &t);
            let expected = t.transform_point(s.value(u, v).unwrap());
            assert!((m.value(tu, tv).unwrap() - expected).length() < 1e-12);
        }
    }
}
