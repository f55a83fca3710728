//! Offset curve: a basis curve displaced along its normal.

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::Space;
use serde::{Deserialize, Serialize};

use super::{Circle, Curve, Line, ParametricCurve, TrimmedCurve};
use crate::derivative::normalized_partials;

/// `P(u) = C(u) + offset * N(u)` where `N` is the unit normal built from the
/// basis tangent.
///
/// In the plane `N` is the tangent turned clockwise, so positive offsets lie
/// on the right. In space `N = T x direction` for the stored reference
/// `direction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct OffsetCurve<P: Space> {
    basis: Box<Curve<P>>,
    offset: f64,
    direction: P::OffsetRef,
    basis_continuity: Continuity,
}

impl<P: Space> OffsetCurve<P> {
    /// Offset `basis` by `offset`.
    ///
    /// Fails when the basis is only C0, unless `skip_c0_check` is set. An
    /// offset basis with the same reference direction is replaced by its own
    /// basis and the offsets are summed.
    pub fn new(basis: Curve<P>, offset: f64, direction: P::OffsetRef, skip_c0_check: bool) -> Result<Self> {
        check_basis(&basis, skip_c0_check)?;
        let (basis, offset, basis_continuity) = flatten(basis, offset, &direction);
        Ok(Self {
            basis,
            offset,
            direction,
            basis_continuity,
        })
    }

    pub fn basis(&self) -> &Curve<P> {
        &self.basis
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn direction(&self) -> &P::OffsetRef {
        &self.direction
    }

    pub fn set_offset_value(&mut self, offset: f64) {
        self.offset = offset;
    }

    pub fn set_direction(&mut self, direction: P::OffsetRef) {
        self.direction = direction;
    }

    pub fn set_basis_curve(&mut self, basis: Curve<P>, skip_c0_check: bool) -> Result<()> {
        check_basis(&basis, skip_c0_check)?;
        let (basis, extra, continuity) = flatten(basis, 0.0, &self.direction);
        self.basis = basis;
        self.offset += extra;
        self.basis_continuity = continuity;
        Ok(())
    }

    /// Lines and circles have offsets of the same kind, with the same
    /// parametrization.
    pub fn equivalent_curve(&self) -> Option<Curve<P>> {
        equivalent(&self.basis, self.offset, &self.direction)
    }
}

fn check_basis<P: Space>(basis: &Curve<P>, skip_c0_check: bool) -> Result<()> {
    if basis.continuity() == Continuity::C0 && !skip_c0_check {
        return Err(GeomError::construction("OffsetCurve: basis curve is only C0"));
    }
    Ok(())
}

/// Unwrap an offset basis sharing `direction`, adding its offset.
fn flatten<P: Space>(basis: Curve<P>, offset: f64, direction: &P::OffsetRef) -> (Box<Curve<P>>, f64, Continuity) {
    match basis {
        Curve::Offset(inner) if inner.direction == *direction => {
            (inner.basis, offset + inner.offset, inner.basis_continuity)
        }
        other => {
            let continuity = other.continuity();
            (Box::new(other), offset, continuity)
        }
    }
}

fn equivalent<P: Space>(basis: &Curve<P>, offset: f64, direction: &P::OffsetRef) -> Option<Curve<P>> {
    match basis {
        Curve::Line(line) => {
            let normal = P::offset_normal(line.direction(), direction).try_unit(Tolerance::RESOLUTION)?;
            let shifted = Line::new(line.location() + normal * offset, line.direction()).ok()?;
            Some(shifted.into())
        }
        Curve::Circle(circle) => {
            let n0 = P::offset_normal(circle.y_dir(), direction).try_unit(Tolerance::RESOLUTION)?;
            let n1 = P::offset_normal(-circle.x_dir(), direction).try_unit(Tolerance::RESOLUTION)?;
            let tol = Tolerance::ANGULAR.sqrt();
            let outward = n0.distance(circle.x_dir()) < tol && n1.distance(circle.y_dir()) < tol;
            let inward = n0.distance(-circle.x_dir()) < tol && n1.distance(-circle.y_dir()) < tol;
            let radius = if outward {
                circle.radius() + offset
            } else if inward {
                circle.radius() - offset
            } else {
                return None;
            };
            let c = if radius > 0.0 {
                Circle::new(circle.center(), circle.x_dir(), circle.y_dir(), radius).ok()?
            } else if radius < 0.0 {
                // the offset went through the center: same points, opposite axes
                Circle::new(circle.center(), -circle.x_dir(), -circle.y_dir(), -radius).ok()?
            } else {
                return None;
            };
            Some(c.into())
        }
        Curve::Trimmed(t) => {
            let inner = equivalent(t.basis(), offset, direction)?;
            let trimmed = TrimmedCurve::new(inner, t.first_parameter(), t.last_parameter(), true, false).ok()?;
            Some(trimmed.into())
        }
        _ => None,
    }
}

impl<P: Space> ParametricCurve<P> for OffsetCurve<P> {
    /// Derivative `k` of the offset needs basis derivatives up to `k + 1` and
    /// a basis that is at least `C(k + 1)`.
    fn derivatives(&self, u: f64, order: usize) -> Result<Option<Vec<P>>> {
        if order >= 1 && !self.basis_continuity.is_cn(order + 1) {
            return Err(GeomError::UndefinedDerivative(format!(
                "OffsetCurve: basis is {:?}, derivative {order} requested",
                self.basis_continuity
            )));
        }
        let Some(ders) = self.basis.derivatives(u, order + 1)? else {
            return Ok(None);
        };
        let normals: Vec<Vec<P>> = ders[1..]
            .iter()
            .map(|&d| vec![P::offset_normal(d, &self.direction)])
            .collect();
        let scale = ders[1].length() * P::offset_ref_length(&self.direction);
        let resolution = (Tolerance::CONFUSION * scale).max(Tolerance::RESOLUTION);
        let Some(n) = normalized_partials(&normals, resolution) else {
            return Ok(None);
        };
        Ok(Some(
            (0..=order)
                .map(|k| ders[k] + n[k][0] * self.offset)
                .collect(),
        ))
    }

    fn first_parameter(&self) -> f64 {
        self.basis.first_parameter()
    }

    fn last_parameter(&self) -> f64 {
        self.basis.last_parameter()
    }

    fn is_closed(&self) -> bool {
        self.basis.is_closed()
    }

    fn is_periodic(&self) -> bool {
        self.basis.is_periodic()
    }

    fn period(&self) -> Result<f64> {
        self.basis.period()
    }

    fn continuity(&self) -> Continuity {
        self.basis_continuity.offset_lowered()
    }

    fn is_cn(&self, n: usize) -> bool {
        self.basis.is_cn(n + 1)
    }

    fn reverse(&mut self) {
        self.basis.reverse();
        self.offset = -self.offset;
    }

    fn reversed_parameter(&self, u: f64) -> f64 {
        self.basis.reversed_parameter(u)
    }

    fn transform(&mut self, t: &P::Transform) {
        self.basis.transform(t);
        self.direction = P::transform_offset_ref(t, self.direction);
        self.offset *= P::scale_factor(t);
    }

    fn transformed_parameter(&self, u: f64, t: &P::Transform) -> f64 {
        self.basis.transformed_parameter(u, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::BSplineCurve;
    use pgeom_math::{DVec2, DVec3, Transform, Transform2};

    fn unit_circle2() -> Curve<DVec2> {
        Circle::new(DVec2::ZERO, DVec2::X, DVec2::Y, 1.0).unwrap().into()
    }

    #[test]
    fn test_offset_line_everywhere_defined() {
        let base: Curve<DVec2> = Line::new(DVec2::ZERO, DVec2::X).unwrap().into();
        let o = OffsetCurve::new(base, 2.0, (), false).unwrap();
        for u in [-5.0, 0.0, 3.5] {
            let p = o.value(u).unwrap();
            // right of the +X direction is -Y
            assert!((p - DVec2::new(u, -2.0)).length() < 1e-12);
        }
        assert_eq!(o.continuity(), Continuity::CN);
    }

    #[test]
    fn test_counter_clockwise_circle_grows() {
        // right of a counter-clockwise circle is outside
        let o = OffsetCurve::new(unit_circle2(), 0.25, (), false).unwrap();
        let (p, d1) = o.d1(0.3).unwrap();
        assert!((p.length() - 1.25).abs() < 1e-12);
        assert!(p.dot(d1).abs() < 1e-12);
        match o.equivalent_curve() {
            Some(Curve::Circle(c)) => assert!((c.radius() - 1.25).abs() < 1e-12),
            other => panic!("expected a circle, got {:?}", other),
        }
    }

    #[test]
    fn test_offset_through_center_flips_axes() {
        let o = OffsetCurve::new(unit_circle2(), -3.0, (), false).unwrap();
        let eq = o.equivalent_curve().unwrap();
        for i in 0..6 {
            let u = i as f64;
            assert!((o.value(u).unwrap() - eq.value(u).unwrap()).length() < 1e-12);
        }
    }

    #[test]
    fn test_space_offset_uses_reference_direction() {
        let base: Curve<DVec3> = Circle::new(DVec3::ZERO, DVec3::X, DVec3::Y, 2.0).unwrap().into();
        // T x Z points outward on a counter-clockwise circle
        let o = OffsetCurve::new(base, 1.0, DVec3::Z, false).unwrap();
        let p = o.value(1.0).unwrap();
        assert!((p.length() - 3.0).abs() < 1e-12);
        let d = o.dn(1.0, 3).unwrap();
        let c = o.equivalent_curve().unwrap();
        assert!((c.dn(1.0, 3).unwrap() - d).length() < 1e-10);
    }

    #[test]
    fn test_degenerate_tangent_is_empty_result() {
        // cubic Bezier with a vanishing tangent at the start
        let poles = vec![DVec2::ZERO, DVec2::ZERO, DVec2::new(1.0, 1.0), DVec2::new(2.0, 0.0)];
        let base: Curve<DVec2> = BSplineCurve::bezier(poles, None).unwrap().into();
        let o = OffsetCurve::new(base, 1.0, (), false).unwrap();
        assert_eq!(o.eval_d0(0.0).unwrap(), None);
        assert!(matches!(o.value(0.0), Err(GeomError::UndefinedValue(_))));
        assert!(o.eval_d0(0.5).unwrap().is_some());
    }

    #[test]
    fn test_tangent_along_reference_is_empty_result() {
        let along: Curve<DVec3> = Line::new(DVec3::ZERO, DVec3::new(1e-10, 0.0, 1.0)).unwrap().into();
        let o = OffsetCurve::new(along, 1.0, DVec3::Z * 5.0, false).unwrap();
        assert_eq!(o.eval_d0(2.0).unwrap(), None);

        let tilted: Curve<DVec3> = Line::new(DVec3::ZERO, DVec3::new(1e-3, 0.0, 1.0)).unwrap().into();
        let o = OffsetCurve::new(tilted, 1.0, DVec3::Z * 5.0, false).unwrap();
        assert!(o.eval_d0(2.0).unwrap().is_some());
    }

    #[test]
    fn test_c0_basis_rejected_unless_bypassed() {
        let poles = vec![DVec2::ZERO, DVec2::new(1.0, 0.0), DVec2::new(1.0, 1.0)];
        let base: Curve<DVec2> =
            BSplineCurve::new(poles, None, vec![0.0, 1.0, 2.0], vec![2, 1, 2], 1, false).unwrap().into();
        assert!(matches!(
            OffsetCurve::new(base.clone(), 1.0, (), false),
            Err(GeomError::Construction(_))
        ));
        let o = OffsetCurve::new(base, 1.0, (), true).unwrap();
        assert!(o.eval_d0(0.5).unwrap().is_some());
        assert!(matches!(o.eval_d1(0.5), Err(GeomError::UndefinedDerivative(_))));
    }

    #[test]
    fn test_derivative_needs_one_more_basis_order() {
        // quadratic with a simple interior knot: C1 basis, C0 offset
        let poles = vec![DVec2::ZERO, DVec2::new(1.0, 1.0), DVec2::new(2.0, 0.0), DVec2::new(3.0, 1.0)];
        let base: Curve<DVec2> =
            BSplineCurve::new(poles, None, vec![0.0, 1.0, 2.0], vec![3, 1, 3], 2, false).unwrap().into();
        let o = OffsetCurve::new(base, 0.5, (), false).unwrap();
        assert_eq!(o.continuity(), Continuity::C0);
        assert!(o.eval_d0(1.0).unwrap().is_some());
        assert!(matches!(o.eval_d1(1.0), Err(GeomError::UndefinedDerivative(_))));

        // cubic with a simple interior knot: C2 basis, C1 offset
        let poles = vec![
            DVec2::ZERO,
            DVec2::new(1.0, 1.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(3.0, 1.0),
            DVec2::new(4.0, 0.0),
        ];
        let base: Curve<DVec2> =
            BSplineCurve::new(poles, None, vec![0.0, 1.0, 2.0], vec![4, 1, 4], 3, false).unwrap().into();
        let o = OffsetCurve::new(base, 0.5, (), false).unwrap();
        assert_eq!(o.continuity(), Continuity::C1);
        assert!(o.eval_d1(1.0).unwrap().is_some());
        assert!(matches!(o.eval_d2(1.0), Err(GeomError::UndefinedDerivative(_))));
    }

    #[test]
    fn test_nested_offsets_are_summed() {
        let inner: Curve<DVec2> = OffsetCurve::new(unit_circle2(), 0.1, (), false).unwrap().into();
        let o = OffsetCurve::new(inner, 0.2, (), false).unwrap();
        assert!((o.offset() - 0.3).abs() < 1e-15);
        assert!(matches!(o.basis(), Curve::Circle(_)));
    }

    #[test]
    fn test_reversal_and_mirror() {
        let o = OffsetCurve::new(unit_circle2(), 0.5, (), false).unwrap();
        let r = o.reversed();
        assert_eq!(r.offset(), -0.5);
        for i in 0..6 {
            let u = i as f64;
            let a = o.value(u).unwrap();
            let b = r.value(o.reversed_parameter(u)).unwrap();
            assert!((a - b).length() < 1e-12);
        }

        let t = Transform2::from_mirror_axis(DVec2::ZERO, DVec2::X);
        let mut m = o.clone();
        m.transform(&t);
        for i in 0..6 {
            let u = i as f64;
            let expected = t.transform_point(o.value(u).unwrap());
            assert!((m.value(u).unwrap() - expected).length() < 1e-12);
        }
    }

    #[test]
    fn test_space_mirror_keeps_points() {
        let base: Curve<DVec3> = Circle::new(DVec3::ZERO, DVec3::X, DVec3::Y, 2.0).unwrap().into();
        let o = OffsetCurve::new(base, 0.5, DVec3::Z, false).unwrap();
        let t = Transform::from_mirror_plane(DVec3::new(0.0, 0.0, 1.0), DVec3::Z);
        let mut m = o.clone();
        m.transform(&t);
        for i in 0..6 {
            let u = i as f64;
            let expected = t.transform_point(o.value(u).unwrap());
            assert!((m.value(u).unwrap() - expected).length() < 1e-12);
        }
    }
}
