//! Infinite straight line.

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::Space;
use serde::{Deserialize, Serialize};

use super::ParametricCurve;

/// A line through `location` along the unit vector `direction`,
/// parameterized by arc length over the whole real axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Line<P: Space> {
    location: P,
    direction: P,
}

impl<P: Space> Line<P> {
    /// Fails when `direction` is a null vector.
    pub fn new(location: P, direction: P) -> Result<Self> {
        let direction = direction
            .try_unit(Tolerance::RESOLUTION)
            .ok_or_else(|| GeomError::construction("Line: null direction"))?;
        Ok(Self {
            location,
            direction,
        })
    }

    /// Line through two distinct points, `a` at parameter 0.
    pub fn through(a: P, b: P) -> Result<Self> {
        Self::new(a, b - a)
    }

    pub fn location(&self) -> P {
        self.location
    }

    pub fn direction(&self) -> P {
        self.direction
    }

    pub fn set_location(&mut self, location: P) {
        self.location = location;
    }

    pub fn set_direction(&mut self, direction: P) -> Result<()> {
        self.direction = direction
            .try_unit(Tolerance::RESOLUTION)
            .ok_or_else(|| GeomError::construction("Line: null direction"))?;
        Ok(())
    }

    /// Parameter of the orthogonal projection of `p`.
    pub fn parameter_of(&self, p: P) -> f64 {
        (p - self.location).dot(self.direction)
    }
}

impl<P: Space> ParametricCurve<P> for Line<P> {
    fn derivatives(&self, u: f64, order: usize) -> Result<Option<Vec<P>>> {
        let mut out = vec![P::ZERO; order + 1];
        out[0] = self.location + self.direction * u;
        if order >= 1 {
            out[1] = self.direction;
        }
        Ok(Some(out))
    }

    fn first_parameter(&self) -> f64 {
        f64::NEG_INFINITY
    }

    fn last_parameter(&self) -> f64 {
        f64::INFINITY
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn is_periodic(&self) -> bool {
        false
    }

    fn continuity(&self) -> Continuity {
        Continuity::CN
    }

    fn reverse(&mut self) {
        self.direction = -self.direction;
    }

    fn reversed_parameter(&self, u: f64) -> f64 {
        -u
    }

    fn transform(&mut self, t: &P::Transform) {
        self.location = P::transform_point(t, self.location);
        let d = P::transform_vector(t, self.direction);
        if let Some(d) = d.try_unit(Tolerance::RESOLUTION) {
            self.direction = d;
        }
    }

    /// Arc length scales with the transform.
    fn transformed_parameter(&self, u: f64, t: &P::Transform) -> f64 {
        u * P::scale_factor(t).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pgeom_math::{DVec2, DVec3, Transform};

    #[test]
    fn test_value_and_derivatives() {
        let l = Line::new(DVec3::new(1.0, 2.0, 3.0), DVec3::new(0.0, 0.0, 2.0)).unwrap();
        assert_eq!(l.direction(), DVec3::Z);
        let (p, d1, d2) = l.d2(4.0).unwrap();
        assert_eq!(p, DVec3::new(1.0, 2.0, 7.0));
        assert_eq!(d1, DVec3::Z);
        assert_eq!(d2, DVec3::ZERO);
        assert_eq!(l.dn(0.0, 5).unwrap(), DVec3::ZERO);
    }

    #[test]
    fn test_null_direction_rejected() {
        assert!(matches!(
            Line::new(DVec2::ZERO, DVec2::ZERO),
            Err(GeomError::Construction(_))
        ));
    }

    #[test]
    fn test_reversal_round_trip() {
        let l = Line::new(DVec2::new(1.0, 1.0), DVec2::new(1.0, 2.0)).unwrap();
        let r = l.reversed();
        for u in [-3.0, 0.0, 0.5, 10.0] {
            let a = l.value(u).unwrap();
            let b = r.value(l.reversed_parameter(u)).unwrap();
            assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_scaling_rescales_parameters() {
        let l = Line::new(DVec3::ZERO, DVec3::X).unwrap();
        let t = Transform::from_scale(DVec3::ZERO, -2.0);
        let mut m = l.clone();
        m.transform(&t);
        let u = 1.5;
        let expected = t.transform_point(l.value(u).unwrap());
        let got = m.value(l.transformed_parameter(u, &t)).unwrap();
        assert!((expected - got).length() < 1e-12);
    }
}
