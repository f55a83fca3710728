//! Curve restricted to a parameter interval of a basis curve.

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::Space;
use serde::{Deserialize, Serialize};

use super::{Curve, ParametricCurve};
use crate::param::adjust_periodic;

/// A basis curve restricted to `[u_first, u_last]`.
///
/// The basis is owned; trimming a trimmed curve trims its basis directly.
/// On a periodic basis the bounds may leave the basis domain by whole
/// periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TrimmedCurve<P: Space> {
    basis: Box<Curve<P>>,
    u_first: f64,
    u_last: f64,
}

impl<P: Space> TrimmedCurve<P> {
    /// Trim `basis` to the bounds `u1`, `u2`.
    ///
    /// On a periodic basis, `sense == false` swaps the bounds so the arc runs
    /// from `u2` to `u1`, and `adjust_periodic` moves them into the principal
    /// period. On other bases the bounds are sorted and must lie in the
    /// basis domain.
    pub fn new(basis: Curve<P>, u1: f64, u2: f64, sense: bool, adjust_periodic: bool) -> Result<Self> {
        let basis = match basis {
            Curve::Trimmed(t) => t.basis,
            other => Box::new(other),
        };
        let mut c = Self {
            basis,
            u_first: 0.0,
            u_last: 0.0,
        };
        c.set_trim(u1, u2, sense, adjust_periodic)?;
        Ok(c)
    }

    /// Trim with the default sense and period adjustment.
    pub fn trim(basis: Curve<P>, u1: f64, u2: f64) -> Result<Self> {
        Self::new(basis, u1, u2, true, true)
    }

    pub fn basis(&self) -> &Curve<P> {
        &self.basis
    }

    pub fn set_trim(&mut self, u1: f64, u2: f64, sense: bool, adjust: bool) -> Result<()> {
        if u1 == u2 {
            return Err(GeomError::construction("TrimmedCurve: U1 == U2"));
        }
        let first = self.basis.first_parameter();
        let last = self.basis.last_parameter();

        let (a, b) = if self.basis.is_periodic() {
            let (mut a, mut b) = if sense { (u1, u2) } else { (u2, u1) };
            if adjust {
                let preci = ((b - a).abs() / 2.0).min(Tolerance::PCONFUSION);
                (a, b) = adjust_periodic(first, last, preci, a, b);
            } else if b < a {
                let period = last - first;
                b += ((a - b) / period).ceil() * period;
            }
            (a, b)
        } else {
            let (a, b) = if u1 < u2 { (u1, u2) } else { (u2, u1) };
            if a < first - Tolerance::PCONFUSION || b > last + Tolerance::PCONFUSION {
                return Err(GeomError::construction("TrimmedCurve: parameters out of range"));
            }
            (a, b)
        };
        self.u_first = a;
        self.u_last = b;
        Ok(())
    }

    /// Point at the first bound, `None` where the basis is degenerate.
    pub fn start_point(&self) -> Option<P> {
        self.eval_d0(self.u_first).ok().flatten()
    }

    pub fn end_point(&self) -> Option<P> {
        self.eval_d0(self.u_last).ok().flatten()
    }
}

impl<P: Space> ParametricCurve<P> for TrimmedCurve<P> {
    fn derivatives(&self, u: f64, order: usize) -> Result<Option<Vec<P>>> {
        self.basis.derivatives(u, order)
    }

    fn first_parameter(&self) -> f64 {
        self.u_first
    }

    fn last_parameter(&self) -> f64 {
        self.u_last
    }

    /// Start and end coincide within the fixed resolution.
    fn is_closed(&self) -> bool {
        match (self.start_point(), self.end_point()) {
            (Some(a), Some(b)) => a.distance(b) <= Tolerance::RESOLUTION,
            _ => false,
        }
    }

    fn is_periodic(&self) -> bool {
        self.basis.is_periodic()
    }

    fn period(&self) -> Result<f64> {
        self.basis.period()
    }

    fn continuity(&self) -> Continuity {
        self.basis.continuity()
    }

    fn is_cn(&self, n: usize) -> bool {
        self.basis.is_cn(n)
    }

    fn reverse(&mut self) {
        let a = self.basis.reversed_parameter(self.u_last);
        let b = self.basis.reversed_parameter(self.u_first);
        self.basis.reverse();
        self.u_first = a;
        self.u_last = b;
    }

    fn reversed_parameter(&self, u: f64) -> f64 {
        self.basis.reversed_parameter(u)
    }

    fn transform(&mut self, t: &P::Transform) {
        let a = self.basis.transformed_parameter(self.u_first, t);
        let b = self.basis.transformed_parameter(self.u_last, t);
        self.basis.transform(t);
        self.u_first = a.min(b);
        self.u_last = a.max(b);
    }

    fn transformed_parameter(&self, u: f64, t: &P::Transform) -> f64 {
        self.basis.transformed_parameter(u, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Circle, Line};
    use pgeom_math::{DVec2, DVec3, Transform};
    use std::f64::consts::{PI, TAU};

    fn line() -> Curve<DVec3> {
        Line::new(DVec3::ZERO, DVec3::X).unwrap().into()
    }

    fn circle() -> Curve<DVec2> {
        Circle::new(DVec2::ZERO, DVec2::X, DVec2::Y, 1.0).unwrap().into()
    }

    #[test]
    fn test_line_bounds() {
        let t = TrimmedCurve::trim(line(), 0.0, 10.0).unwrap();
        assert_eq!(t.first_parameter(), 0.0);
        assert_eq!(t.last_parameter(), 10.0);
        assert!(!t.is_closed());
        assert!(matches!(
            TrimmedCurve::trim(line(), 5.0, 5.0),
            Err(GeomError::Construction(_))
        ));
    }

    #[test]
    fn test_bounds_sorted_on_non_periodic_basis() {
        let t = TrimmedCurve::trim(line(), 4.0, -1.0).unwrap();
        assert_eq!((t.first_parameter(), t.last_parameter()), (-1.0, 4.0));
    }

    #[test]
    fn test_nested_trim_flattens() {
        let inner: Curve<DVec3> = TrimmedCurve::trim(line(), 0.0, 10.0).unwrap().into();
        let outer = TrimmedCurve::trim(inner, 2.0, 3.0).unwrap();
        assert!(matches!(outer.basis(), Curve::Line(_)));
    }

    #[test]
    fn test_periodic_sense_and_adjust() {
        // from 3pi/2 around to pi/2
        let t = TrimmedCurve::new(circle(), 3.0 * PI / 2.0, PI / 2.0, true, true).unwrap();
        assert!((t.first_parameter() - 3.0 * PI / 2.0).abs() < 1e-12);
        assert!((t.last_parameter() - (PI / 2.0 + TAU)).abs() < 1e-12);

        let r = TrimmedCurve::new(circle(), 3.0 * PI / 2.0, PI / 2.0, false, true).unwrap();
        assert!((r.first_parameter() - PI / 2.0).abs() < 1e-12);
        assert!((r.last_parameter() - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_reversal_round_trip() {
        let t = TrimmedCurve::trim(circle(), 0.5, 2.5).unwrap();
        let r = t.reversed();
        assert!((r.first_parameter() - (TAU - 2.5)).abs() < 1e-12);
        assert!((r.last_parameter() - (TAU - 0.5)).abs() < 1e-12);
        for i in 0..=10 {
            let u = 0.5 + 0.2 * i as f64;
            let a = t.value(u).unwrap();
            let b = r.value(t.reversed_parameter(u)).unwrap();
            assert!((a - b).length() < 1e-12);
        }
        assert!((r.start_point().unwrap() - t.end_point().unwrap()).length() < 1e-12);
    }

    #[test]
    fn test_transform_keeps_end_points() {
        let t = TrimmedCurve::trim(line(), 1.0, 2.0).unwrap();
        let tr = Transform::from_scale(DVec3::new(0.0, 1.0, 0.0), 3.0);
        let mut m = t.clone();
        m.transform(&tr);
        let expected = tr.transform_point(t.end_point().unwrap());
        assert!((m.end_point().unwrap() - expected).length() < 1e-12);
        assert_eq!(m.last_parameter(), 6.0);
    }
}
