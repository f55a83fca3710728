//! Surface swept by translating a curve along a direction.

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::{DVec3, Transform, Vector3};
use serde::{Deserialize, Serialize};

use super::{unit_image, ParametricSurface};
use crate::curve::{Curve3, ParametricCurve};

/// `S(u, v) = C(u) + v * D` with `D` a unit direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOfLinearExtrusion {
    curve: Box<Curve3>,
    direction: Vector3,
}

impl SurfaceOfLinearExtrusion {
    pub fn new(curve: Curve3, direction: Vector3) -> Result<Self> {
        let mut s = Self {
            curve: Box::new(curve),
            direction: Vector3::Z,
        };
        s.set_direction(direction)?;
        Ok(s)
    }

    pub fn basis_curve(&self) -> &Curve3 {
        &self.curve
    }

    pub fn set_basis_curve(&mut self, curve: Curve3) {
        self.curve = Box::new(curve);
    }

    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vector3) -> Result<()> {
        if direction.length() <= Tolerance::RESOLUTION {
            return Err(GeomError::construction("SurfaceOfLinearExtrusion: null direction"));
        }
        self.direction = direction.normalize();
        Ok(())
    }
}

impl ParametricSurface for SurfaceOfLinearExtrusion {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        let Some(c) = self.curve.derivatives(u, nu)? else {
            return Ok(None);
        };
        let out = (0..=nu)
            .map(|i| {
                (0..=nv)
                    .map(|j| match (i, j) {
                        (0, 0) => c[0] + self.direction * v,
                        (_, 0) => c[i],
                        (0, 1) => self.direction,
                        _ => DVec3::ZERO,
                    })
                    .collect()
            })
            .collect();
        Ok(Some(out))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.curve.first_parameter(),
            self.curve.last_parameter(),
            f64::NEG_INFINITY,
            f64::INFINITY,
        )
    }

    fn is_u_closed(&self) -> bool {
        self.curve.is_closed()
    }

    fn is_v_closed(&self) -> bool {
        false
    }

    fn is_u_periodic(&self) -> bool {
        self.curve.is_periodic()
    }

    fn is_v_periodic(&self) -> bool {
        false
    }

    fn u_period(&self) -> Result<f64> {
        self.curve.period()
    }

    fn continuity(&self) -> Continuity {
        self.curve.continuity()
    }

    fn is_cn_u(&self, n: usize) -> bool {
        self.curve.is_cn(n)
    }

    fn is_cn_v(&self, _n: usize) -> bool {
        true
    }

    fn u_reverse(&mut self) {
        self.curve.reverse();
    }

    fn v_reverse(&mut self) {
        self.direction = -self.direction;
    }

    fn u_reversed_parameter(&self, u: f64) -> f64 {
        self.curve.reversed_parameter(u)
    }

    fn v_reversed_parameter(&self, v: f64) -> f64 {
        -v
    }

    fn transform(&mut self, t: &Transform) {
        self.curve.transform(t);
        self.direction = unit_image(t, self.direction);
    }

    fn transform_parameters(&self, u: f64, v: f64, t: &Transform) -> (f64, f64) {
        (
            self.curve.transformed_parameter(u, t),
            v * t.scale_factor().abs(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Circle;
    use pgeom_math::Frame;

    fn tube() -> SurfaceOfLinearExtrusion {
        let c = Circle::from_frame(&Frame::world(), 1.0).unwrap();
        SurfaceOfLinearExtrusion::new(c.into(), DVec3::new(0.0, 0.0, 2.0)).unwrap()
    }

    #[test]
    fn test_points_and_periodicity() {
        let s = tube();
        assert!((s.value(0.0, 3.0).unwrap() - DVec3::new(1.0, 0.0, 3.0)).length() < 1e-12);
        assert!(s.is_u_periodic());
        assert!((s.u_period().unwrap() - std::f64::consts::TAU).abs() < 1e-15);
        assert!(matches!(s.v_period(), Err(GeomError::NoSuchObject(_))));
    }

    #[test]
    fn test_null_direction() {
        let c = Circle::from_frame(&Frame::world(), 1.0).unwrap();
        assert!(matches!(
            SurfaceOfLinearExtrusion::new(c.into(), DVec3::ZERO),
            Err(GeomError::Construction(_))
        ));
    }

    #[test]
    fn test_partials() {
        let d = tube().d2(0.0, 1.0).unwrap();
        assert!((d.d1u - DVec3::Y).length() < 1e-12);
        assert_eq!(d.d1v, DVec3::Z);
        assert_eq!(d.d2v, DVec3::ZERO);
        assert!((d.d2u + DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_reverse_and_scale() {
        let s = tube();
        let vr = s.v_reversed();
        let p = s.value(1.0, 2.0).unwrap();
        assert!((vr.value(1.0, s.v_reversed_parameter(2.0)).unwrap() - p).length() < 1e-12);

        let t = Transform::from_scale(DVec3::ZERO, 2.0);
        let (u, v) = s.transform_parameters(1.0, 2.0, &t);
        let mut m = s.clone();
        m.transform(&t);
        assert!((m.value(u, v).unwrap() - t.transform_point(p)).length() < 1e-12);
    }
}
