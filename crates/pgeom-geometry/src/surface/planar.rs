//! Planar surface.

use pgeom_core::{Continuity, Result};
use pgeom_math::{DVec3, Frame, Point3, Transform, Vector3};
use serde::{Deserialize, Serialize};

use super::{grid, ParametricSurface};

/// An infinite plane parameterized by `origin + u * x_dir + v * y_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    frame: Frame,
}

impl Plane {
    /// Plane through `origin` with normal `normal`.
    pub fn new(origin: Point3, normal: Vector3) -> Result<Self> {
        Ok(Self::from_frame(Frame::from_axis(origin, normal)?))
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self { frame }
    }

    /// XY plane at the world origin.
    pub fn xy() -> Self {
        Self::from_frame(Frame::world())
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn location(&self) -> Point3 {
        self.frame.origin
    }

    pub fn axis(&self) -> Vector3 {
        self.frame.z_dir
    }

    /// `[a, b, c, d]` with `a*x + b*y + c*z + d = 0` and `(a, b, c)` the unit axis.
    pub fn coefficients(&self) -> [f64; 4] {
        let n = self.frame.z_dir;
        [n.x, n.y, n.z, -n.dot(self.frame.origin)]
    }
}

impl ParametricSurface for Plane {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        let f = &self.frame;
        Ok(Some(grid(nu, nv, |i, j| match (i, j) {
            (0, 0) => f.origin + f.x_dir * u + f.y_dir * v,
            (1, 0) => f.x_dir,
            (0, 1) => f.y_dir,
            _ => DVec3::ZERO,
        })))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY)
    }

    fn is_u_closed(&self) -> bool {
        false
    }

    fn is_v_closed(&self) -> bool {
        false
    }

    fn is_u_periodic(&self) -> bool {
        false
    }

    fn is_v_periodic(&self) -> bool {
        false
    }

    fn continuity(&self) -> Continuity {
        Continuity::CN
    }

    fn u_reverse(&mut self) {
        self.frame.reverse_x();
    }

    fn v_reverse(&mut self) {
        self.frame.reverse_y();
    }

    fn u_reversed_parameter(&self, u: f64) -> f64 {
        -u
    }

    fn v_reversed_parameter(&self, v: f64) -> f64 {
        -v
    }

    fn transform(&mut self, t: &Transform) {
        self.frame.transform(t);
    }

    fn transform_parameters(&self, u: f64, v: f64, t: &Transform) -> (f64, f64) {
        let s = t.scale_factor().abs();
        (u * s, v * s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_and_normal() {
        let plane = Plane::xy();
        let p = plane.value(1.0, 2.0).unwrap();
        assert!((p - DVec3::new(1.0, 2.0, 0.0)).length() < 1e-15);
        let n = plane.eval_normal(3.0, -4.0).unwrap().unwrap();
        assert!((n - DVec3::Z).length() < 1e-15);
    }

    #[test]
    fn test_coefficients() {
        let plane = Plane::new(DVec3::new(0.0, 0.0, 2.0), DVec3::new(0.0, 0.0, 3.0)).unwrap();
        assert_eq!(plane.coefficients(), [0.0, 0.0, 1.0, -2.0]);
        assert!(Plane::new(DVec3::ZERO, DVec3::ZERO).is_err());
    }

    #[test]
    fn test_reverse_u_flips_normal() {
        let plane = Plane::xy();
        let r = plane.u_reversed();
        let a = plane.value(1.5, 0.5).unwrap();
        let b = r.value(plane.u_reversed_parameter(1.5), 0.5).unwrap();
        assert!((a - b).length() < 1e-15);
        assert!((r.eval_normal(0.0, 0.0).unwrap().unwrap() + DVec3::Z).length() < 1e-15);
    }

    #[test]
    fn test_scaled_parameters() {
        let plane = Plane::xy();
        let t = Transform::from_scale(DVec3::ZERO, 2.0);
        let (u, v) = plane.transform_parameters(1.0, -3.0, &t);
        let mut m = plane.clone();
        m.transform(&t);
        let expected = t.transform_point(plane.value(1.0, -3.0).unwrap());
        assert!((m.value(u, v).unwrap() - expected).length() < 1e-12);
    }
}
