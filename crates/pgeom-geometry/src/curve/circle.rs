//! Circle curve.

use std::f64::consts::TAU;

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::{Frame, Space, DVec3};
use serde::{Deserialize, Serialize};

use super::ParametricCurve;
use crate::derivative::trig_derivative;

/// A circle parameterized over `[0, 2*PI)`:
///
/// `P(u) = center + radius * (cos(u) * x_dir + sin(u) * y_dir)`
///
/// The frame may be left-handed in space; in the plane a reversed circle
/// runs clockwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Circle<P: Space> {
    center: P,
    x_dir: P,
    y_dir: P,
    radius: f64,
}

/// Normalize two axis directions, rejecting null or non-orthogonal pairs.
pub(crate) fn orthonormal_axes<P: Space>(x_dir: P, y_dir: P) -> Result<(P, P)> {
    let x = x_dir
        .try_unit(Tolerance::RESOLUTION)
        .ok_or_else(|| GeomError::construction("null X direction"))?;
    let y = y_dir
        .try_unit(Tolerance::RESOLUTION)
        .ok_or_else(|| GeomError::construction("null Y direction"))?;
    if x.dot(y).abs() > Tolerance::ANGULAR.sqrt() {
        return Err(GeomError::construction("X and Y directions are not orthogonal"));
    }
    Ok((x, y))
}

impl<P: Space> Circle<P> {
    pub fn new(center: P, x_dir: P, y_dir: P, radius: f64) -> Result<Self> {
        if radius < 0.0 {
            return Err(GeomError::construction("Circle: negative radius"));
        }
        let (x_dir, y_dir) = orthonormal_axes(x_dir, y_dir)?;
        Ok(Self {
            center,
            x_dir,
            y_dir,
            radius,
        })
    }

    pub fn center(&self) -> P {
        self.center
    }

    pub fn x_dir(&self) -> P {
        self.x_dir
    }

    pub fn y_dir(&self) -> P {
        self.y_dir
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<()> {
        if radius < 0.0 {
            return Err(GeomError::construction("Circle: negative radius"));
        }
        self.radius = radius;
        Ok(())
    }

    pub fn set_center(&mut self, center: P) {
        self.center = center;
    }
}

impl Circle<DVec3> {
    /// Circle in the XY plane of `frame`.
    pub fn from_frame(frame: &Frame, radius: f64) -> Result<Self> {
        Self::new(frame.origin, frame.x_dir, frame.y_dir, radius)
    }

    /// Normal of the circle plane, `x_dir` cross `y_dir`.
    pub fn axis(&self) -> DVec3 {
        self.x_dir.cross(self.y_dir)
    }
}

impl<P: Space> ParametricCurve<P> for Circle<P> {
    fn derivatives(&self, u: f64, order: usize) -> Result<Option<Vec<P>>> {
        let out = (0..=order)
            .map(|k| {
                let (c, s) = trig_derivative(u, k);
                let v = (self.x_dir * c + self.y_dir * s) * self.radius;
                if k == 0 {
                    self.center + v
                } else {
                    v
                }
            })
            .collect();
        Ok(Some(out))
    }

    fn first_parameter(&self) -> f64 {
        0.0
    }

    fn last_parameter(&self) -> f64 {
        TAU
    }

    fn is_closed(&self) -> bool {
        true
    }

    fn is_periodic(&self) -> bool {
        true
    }

    fn continuity(&self) -> Continuity {
        Continuity::CN
    }

    fn reverse(&mut self) {
        self.y_dir = -self.y_dir;
    }

    fn reversed_parameter(&self, u: f64) -> f64 {
        TAU - u
    }

    fn transform(&mut self, t: &P::Transform) {
        self.center = P::transform_point(t, self.center);
        if let Some(x) = P::transform_vector(t, self.x_dir).try_unit(Tolerance::RESOLUTION) {
            self.x_dir = x;
        }
        if let Some(y) = P::transform_vector(t, self.y_dir).try_unit(Tolerance::RESOLUTION) {
            self.y_dir = y;
        }
        self.radius *= P::scale_factor(t).abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pgeom_math::{DVec2, Transform};
    use std::f64::consts::{FRAC_PI_2, PI};

    fn circle5() -> Circle<DVec3> {
        Circle::new(DVec3::ZERO, DVec3::X, DVec3::Y, 5.0).unwrap()
    }

    #[test]
    fn test_cardinal_points() {
        let c = circle5();
        let p0 = c.value(0.0).unwrap();
        assert!((p0 - DVec3::new(5.0, 0.0, 0.0)).length() < 1e-9);
        let p1 = c.value(FRAC_PI_2).unwrap();
        assert!((p1 - DVec3::new(0.0, 5.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_periodicity() {
        let c = circle5();
        assert!(c.is_periodic() && c.is_closed());
        assert_relative_eq!(c.period().unwrap(), TAU);
        for i in 0..12 {
            let u = -3.0 + i as f64 * 0.7;
            let a = c.value(u).unwrap();
            let b = c.value(u + TAU).unwrap();
            assert!((a - b).length() < 1e-9);
        }
    }

    #[test]
    fn test_derivatives_are_tangent() {
        let c = circle5();
        let (p, d1, d2) = c.d2(0.9).unwrap();
        assert_relative_eq!(p.dot(d1), 0.0, epsilon = 1e-12);
        // centripetal acceleration
        assert!((d2 + p).length() < 1e-12);
    }

    #[test]
    fn test_negative_radius_rejected() {
        assert!(Circle::new(DVec2::ZERO, DVec2::X, DVec2::Y, -1.0).is_err());
        let mut c = Circle::new(DVec2::ZERO, DVec2::X, DVec2::Y, 1.0).unwrap();
        assert!(matches!(c.set_radius(-0.5), Err(GeomError::Construction(_))));
        assert_eq!(c.radius(), 1.0);
    }

    #[test]
    fn test_reversal_round_trip() {
        let c = Circle::new(DVec2::new(1.0, -1.0), DVec2::X, DVec2::Y, 2.0).unwrap();
        let r = c.reversed();
        for i in 0..8 {
            let u = i as f64 * PI / 4.0;
            let a = c.value(u).unwrap();
            let b = r.value(c.reversed_parameter(u)).unwrap();
            assert!((a - b).length() < 1e-12);
        }
    }

    #[test]
    fn test_mirror_keeps_points() {
        let c = circle5();
        let t = Transform::from_mirror_plane(DVec3::ZERO, DVec3::X);
        let mut m = c.clone();
        m.transform(&t);
        for i in 0..6 {
            let u = i as f64;
            let expected = t.transform_point(c.value(u).unwrap());
            assert!((m.value(u).unwrap() - expected).length() < 1e-12);
        }
        assert!(m.axis().dot(DVec3::Z) < 0.0);
    }
}
