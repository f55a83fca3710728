//! Surface restricted to a rectangle of its parameter space.

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::{DVec3, Transform};
use serde::{Deserialize, Serialize};

use super::{ParametricSurface, Surface};
use crate::param::adjust_periodic;

/// A basis surface restricted to `[u1, u2] x [v1, v2]`.
///
/// A direction may be left untrimmed, in which case its bounds follow the
/// basis. Trimming a trimmed surface trims its basis directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangularTrimmedSurface {
    basis: Box<Surface>,
    u1: f64,
    u2: f64,
    v1: f64,
    v2: f64,
    u_trimmed: bool,
    v_trimmed: bool,
}

/// Bounds of one direction: sorted and checked against `[first, last]`,
/// or, on a periodic direction, oriented by `sense` and shifted into the
/// principal period.
fn trim_bounds(first: f64, last: f64, periodic: bool, p1: f64, p2: f64, sense: bool) -> Result<(f64, f64)> {
    if p1 == p2 {
        return Err(GeomError::construction("RectangularTrimmedSurface: equal trim bounds"));
    }
    if periodic {
        let (a, b) = if sense { (p1, p2) } else { (p2, p1) };
        let preci = ((b - a).abs() / 2.0).min(Tolerance::PCONFUSION);
        return Ok(adjust_periodic(first, last, preci, a, b));
    }
    let (a, b) = if p1 < p2 { (p1, p2) } else { (p2, p1) };
    if a < first - Tolerance::PCONFUSION || b > last + Tolerance::PCONFUSION {
        return Err(GeomError::construction("RectangularTrimmedSurface: parameters out of range"));
    }
    Ok((a, b))
}

impl RectangularTrimmedSurface {
    /// Trim in both directions.
    pub fn new(basis: Surface, u1: f64, u2: f64, v1: f64, v2: f64, u_sense: bool, v_sense: bool) -> Result<Self> {
        let mut s = Self::untrimmed(basis);
        s.set_trim(u1, u2, v1, v2, u_sense, v_sense)?;
        Ok(s)
    }

    /// Trim in one direction, `u_trim` selecting U or V. The other
    /// direction keeps any trim the basis already carried.
    pub fn new_single(basis: Surface, p1: f64, p2: f64, u_trim: bool, sense: bool) -> Result<Self> {
        let mut s = Self::untrimmed(basis);
        if u_trim {
            s.set_u_trim(p1, p2, sense)?;
        } else {
            s.set_v_trim(p1, p2, sense)?;
        }
        Ok(s)
    }

    fn untrimmed(basis: Surface) -> Self {
        let (basis, inner) = match basis {
            Surface::Trimmed(t) => {
                let inner = (t.u1, t.u2, t.v1, t.v2, t.u_trimmed, t.v_trimmed);
                (t.basis, Some(inner))
            }
            other => (Box::new(other), None),
        };
        let (bu1, bu2, bv1, bv2) = basis.bounds();
        let (u1, u2, v1, v2, u_trimmed, v_trimmed) = inner.unwrap_or((bu1, bu2, bv1, bv2, false, false));
        Self {
            basis,
            u1,
            u2,
            v1,
            v2,
            u_trimmed,
            v_trimmed,
        }
    }

    pub fn basis(&self) -> &Surface {
        &self.basis
    }

    pub fn set_trim(&mut self, u1: f64, u2: f64, v1: f64, v2: f64, u_sense: bool, v_sense: bool) -> Result<()> {
        let (bu1, bu2, bv1, bv2) = self.basis.bounds();
        let u = trim_bounds(bu1, bu2, self.basis.is_u_periodic(), u1, u2, u_sense)?;
        let v = trim_bounds(bv1, bv2, self.basis.is_v_periodic(), v1, v2, v_sense)?;
        (self.u1, self.u2) = u;
        (self.v1, self.v2) = v;
        self.u_trimmed = true;
        self.v_trimmed = true;
        Ok(())
    }

    pub fn set_u_trim(&mut self, u1: f64, u2: f64, sense: bool) -> Result<()> {
        let (bu1, bu2, _, _) = self.basis.bounds();
        (self.u1, self.u2) = trim_bounds(bu1, bu2, self.basis.is_u_periodic(), u1, u2, sense)?;
        self.u_trimmed = true;
        Ok(())
    }

    pub fn set_v_trim(&mut self, v1: f64, v2: f64, sense: bool) -> Result<()> {
        let (_, _, bv1, bv2) = self.basis.bounds();
        (self.v1, self.v2) = trim_bounds(bv1, bv2, self.basis.is_v_periodic(), v1, v2, sense)?;
        self.v_trimmed = true;
        Ok(())
    }

    pub fn is_u_trimmed(&self) -> bool {
        self.u_trimmed
    }

    pub fn is_v_trimmed(&self) -> bool {
        self.v_trimmed
    }

    fn refresh_untrimmed(&mut self) {
        let (bu1, bu2, bv1, bv2) = self.basis.bounds();
        if !self.u_trimmed {
            (self.u1, self.u2) = (bu1, bu2);
        }
        if !self.v_trimmed {
            (self.v1, self.v2) = (bv1, bv2);
        }
    }
}

/// A trimmed periodic direction is closed when it spans one period.
fn spans_period(a: f64, b: f64, period: Result<f64>) -> bool {
    period.map_or(false, |p| ((b - a) - p).abs() <= Tolerance::PCONFUSION)
}

impl ParametricSurface for RectangularTrimmedSurface {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        self.basis.partials(u, v, nu, nv)
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.u1, self.u2, self.v1, self.v2)
    }

    fn is_u_closed(&self) -> bool {
        if self.u_trimmed {
            spans_period(self.u1, self.u2, self.basis.u_period())
        } else {
            self.basis.is_u_closed()
        }
    }

    fn is_v_closed(&self) -> bool {
        if self.v_trimmed {
            spans_period(self.v1, self.v2, self.basis.v_period())
        } else {
            self.basis.is_v_closed()
        }
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
        self.basis.continuity()
    }

    fn is_cn_u(&self, n: usize) -> bool {
        self.basis.is_cn_u(n)
    }

    fn is_cn_v(&self, n: usize) -> bool {
        self.basis.is_cn_v(n)
    }

    fn u_reverse(&mut self) {
        let a = self.basis.u_reversed_parameter(self.u2);
        let b = self.basis.u_reversed_parameter(self.u1);
        self.basis.u_reverse();
        (self.u1, self.u2) = (a, b);
        self.refresh_untrimmed();
    }

    fn v_reverse(&mut self) {
        let a = self.basis.v_reversed_parameter(self.v2);
        let b = self.basis.v_reversed_parameter(self.v1);
        self.basis.v_reverse();
        (self.v1, self.v2) = (a, b);
        self.refresh_untrimmed();
    }

    fn u_reversed_parameter(&self, u: f64) -> f64 {
        self.basis.u_reversed_parameter(u)
    }

    fn v_reversed_parameter(&self, v: f64) -> f64 {
        self.basis.v_reversed_parameter(v)
    }

    fn transform(&mut self, t: &Transform) {
        let (a1, b1) = self.basis.transform_parameters(self.u1, self.v1, t);
        let (a2, b2) = self.basis.transform_parameters(self.u2, self.v2, t);
        self.basis.transform(t);
        (self.u1, self.u2) = (a1.min(a2), a1.max(a2));
        (self.v1, self.v2) = (b1.min(b2), b1.max(b2));
        self.refresh_untrimmed();
    }

    fn transform_parameters(&self, u: f64, v: f64, t: &Transform) -> (f64, f64) {
        self.basis.transform_parameters(u, v, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{CylindricalSurface, Plane, SphericalSurface};
    use pgeom_math::Frame;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    fn cylinder() -> Surface {
        CylindricalSurface::new(Frame::world(), 1.0).unwrap().into()
    }

    #[test]
    fn test_bounds_and_errors() {
        let t = RectangularTrimmedSurface::new(cylinder(), 0.0, PI, 0.0, 2.0, true, true).unwrap();
        assert_eq!(t.bounds(), (0.0, PI, 0.0, 2.0));
        assert!(!t.is_u_closed());
        assert!(RectangularTrimmedSurface::new(cylinder(), 1.0, 1.0, 0.0, 2.0, true, true).is_err());

        let sphere: Surface = SphericalSurface::new(Frame::world(), 1.0).unwrap().into();
        assert!(matches!(
            RectangularTrimmedSurface::new(sphere, 0.0, 1.0, 0.0, 2.0, true, true),
            Err(GeomError::Construction(_))
        ));
    }

    #[test]
    fn test_periodic_direction_is_adjusted() {
        let t = RectangularTrimmedSurface::new(cylinder(), 7.0, 8.0, 0.0, 1.0, true, true).unwrap();
        let (u1, u2, _, _) = t.bounds();
        assert!((u1 - (7.0 - TAU)).abs() < 1e-12);
        assert!((u2 - (8.0 - TAU)).abs() < 1e-12);

        let full = RectangularTrimmedSurface::new(cylinder(), 0.0, TAU, 0.0, 1.0, true, true).unwrap();
        assert!(full.is_u_closed());
    }

    #[test]
    fn test_single_direction_keeps_inner_trim() {
        let inner = RectangularTrimmedSurface::new(cylinder(), 0.0, 1.0, 0.0, 2.0, true, true).unwrap();
        let outer = RectangularTrimmedSurface::new_single(inner.into(), 0.5, 1.5, false, true).unwrap();
        assert!(matches!(outer.basis(), Surface::Cylinder(_)));
        assert_eq!(outer.bounds(), (0.0, 1.0, 0.5, 1.5));

        let plane = RectangularTrimmedSurface::new_single(Plane::xy().into(), -1.0, 1.0, true, true).unwrap();
        assert!(plane.is_u_trimmed() && !plane.is_v_trimmed());
        assert_eq!(plane.bounds().3, f64::INFINITY);
    }

    #[test]
    fn test_reversal_round_trip() {
        let t = RectangularTrimmedSurface::new(cylinder(), 0.5, 2.0, -1.0, 1.0, true, true).unwrap();
        let r = t.u_reversed().v_reversed();
        let (u1, u2, v1, v2) = r.bounds();
        assert!((u1 - (TAU - 2.0)).abs() < 1e-12 && (u2 - (TAU - 0.5)).abs() < 1e-12);
        assert_eq!((v1, v2), (-1.0, 1.0));
        let p = t.value(1.0, 0.25).unwrap();
        let q = r.value(t.u_reversed_parameter(1.0), t.v_reversed_parameter(0.25)).unwrap();
        assert!((p - q).length() < 1e-12);
    }

    #[test]
    fn test_transform_scales_plane_bounds() {
        let mut t = RectangularTrimmedSurface::new(Plane::xy().into(), 0.0, 1.0, 0.0, 2.0, true, true).unwrap();
        t.transform(&Transform::from_scale(DVec3::ZERO, 2.0));
        assert_eq!(t.bounds(), (0.0, 2.0, 0.0, 4.0));
        assert!((t.value(2.0, 4.0).unwrap() - DVec3::new(2.0, 4.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_sphere_cap() {
        let sphere: Surface = SphericalSurface::new(Frame::world(), 1.0).unwrap().into();
        let cap = RectangularTrimmedSurface::new(sphere, 0.0, TAU, 0.0, FRAC_PI_2, true, true).unwrap();
        assert!(cap.is_u_closed());
        assert!(!cap.is_v_closed());
    }
}
