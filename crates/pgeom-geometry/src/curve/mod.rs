//! Parametric curves in the plane and in space.
//!
//! Every curve is written once against [`Space`] and used as `Curve2`
//! (planar) or `Curve3` (spatial). The closed set of kinds is the
//! [`Curve`] enum; the shared evaluation contract is [`ParametricCurve`].

mod bspline;
mod bspline_edit;
mod circle;
mod ellipse;
mod line;
mod offset;
mod trimmed;

use std::sync::Arc;

use pgeom_core::{Continuity, GeomError, Result};
use pgeom_math::{DVec2, DVec3, Space};
use serde::{Deserialize, Serialize};

pub use bspline::BSplineCurve;
pub use bspline_edit::MoveStatus;
pub use circle::Circle;
pub use ellipse::Ellipse;
pub use line::Line;
pub use offset::OffsetCurve;
pub use trimmed::TrimmedCurve;

/// Evaluation and query contract shared by all curves.
///
/// [`derivatives`](ParametricCurve::derivatives) is the primitive every
/// kind implements. Its outcomes:
///
/// - `Ok(Some(ders))`: the point and derivatives `1..=order`.
/// - `Ok(None)`: the curve is geometrically degenerate at `u` (an offset
///   whose basis tangent vanishes there).
/// - `Err(..)`: the request itself is invalid, e.g. a derivative order the
///   curve's continuity cannot provide.
///
/// The `value`/`d1`.. wrappers turn the degenerate outcome into
/// [`GeomError::UndefinedValue`] for callers that prefer one error path.
pub trait ParametricCurve<P: Space> {
    fn derivatives(&self, u: f64, order: usize) -> Result<Option<Vec<P>>>;

    fn first_parameter(&self) -> f64;

    fn last_parameter(&self) -> f64;

    fn is_closed(&self) -> bool;

    fn is_periodic(&self) -> bool;

    fn continuity(&self) -> Continuity;

    /// Whether derivatives up to order `n` are continuous everywhere.
    fn is_cn(&self, n: usize) -> bool {
        self.continuity().is_cn(n)
    }

    /// Reverse the parametrization in place.
    fn reverse(&mut self);

    /// Parameter on the reversed curve of the point at `u`.
    fn reversed_parameter(&self, u: f64) -> f64;

    fn transform(&mut self, t: &P::Transform);

    /// Parameter on the transformed curve of the point at `u`.
    fn transformed_parameter(&self, u: f64, _t: &P::Transform) -> f64 {
        u
    }

    fn period(&self) -> Result<f64> {
        if self.is_periodic() {
            Ok(self.last_parameter() - self.first_parameter())
        } else {
            Err(GeomError::no_such_object("curve is not periodic"))
        }
    }

    fn reversed(&self) -> Self
    where
        Self: Sized + Clone,
    {
        let mut c = self.clone();
        c.reverse();
        c
    }

    fn eval_d0(&self, u: f64) -> Result<Option<P>> {
        Ok(self.derivatives(u, 0)?.map(|d| d[0]))
    }

    fn eval_d1(&self, u: f64) -> Result<Option<(P, P)>> {
        Ok(self.derivatives(u, 1)?.map(|d| (d[0], d[1])))
    }

    fn eval_d2(&self, u: f64) -> Result<Option<(P, P, P)>> {
        Ok(self.derivatives(u, 2)?.map(|d| (d[0], d[1], d[2])))
    }

    fn eval_d3(&self, u: f64) -> Result<Option<(P, P, P, P)>> {
        Ok(self.derivatives(u, 3)?.map(|d| (d[0], d[1], d[2], d[3])))
    }

    /// The `n`-th derivative, `n >= 1`.
    fn eval_dn(&self, u: f64, n: usize) -> Result<Option<P>> {
        if n < 1 {
            return Err(GeomError::out_of_range("derivative order must be at least 1"));
        }
        Ok(self.derivatives(u, n)?.map(|mut d| d.swap_remove(n)))
    }

    fn value(&self, u: f64) -> Result<P> {
        self.eval_d0(u)?.ok_or_else(|| undefined(u))
    }

    fn d1(&self, u: f64) -> Result<(P, P)> {
        self.eval_d1(u)?.ok_or_else(|| undefined(u))
    }

    fn d2(&self, u: f64) -> Result<(P, P, P)> {
        self.eval_d2(u)?.ok_or_else(|| undefined(u))
    }

    fn d3(&self, u: f64) -> Result<(P, P, P, P)> {
        self.eval_d3(u)?.ok_or_else(|| undefined(u))
    }

    fn dn(&self, u: f64, n: usize) -> Result<P> {
        self.eval_dn(u, n)?.ok_or_else(|| undefined(u))
    }
}

fn undefined(u: f64) -> GeomError {
    GeomError::UndefinedValue(format!("curve is degenerate at parameter {u}"))
}

/// Any curve of the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum Curve<P: Space> {
    Line(Line<P>),
    Circle(Circle<P>),
    Ellipse(Ellipse<P>),
    BSpline(BSplineCurve<P>),
    Trimmed(TrimmedCurve<P>),
    Offset(OffsetCurve<P>),
}

/// Planar curve.
pub type Curve2 = Curve<DVec2>;
/// Spatial curve.
pub type Curve3 = Curve<DVec3>;

/// Shared handle to a curve.
///
/// Holders share one curve; mutate through [`Arc::make_mut`], which copies
/// the curve first when other holders exist.
pub type CurveHandle<P> = Arc<Curve<P>>;

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            Curve::Line($c) => $body,
            Curve::Circle($c) => $body,
            Curve::Ellipse($c) => $body,
            Curve::BSpline($c) => $body,
            Curve::Trimmed($c) => $body,
            Curve::Offset($c) => $body,
        }
    };
}

impl<P: Space> ParametricCurve<P> for Curve<P> {
    fn derivatives(&self, u: f64, order: usize) -> Result<Option<Vec<P>>> {
        dispatch!(self, c => c.derivatives(u, order))
    }

    fn first_parameter(&self) -> f64 {
        dispatch!(self, c => c.first_parameter())
    }

    fn last_parameter(&self) -> f64 {
        dispatch!(self, c => c.last_parameter())
    }

    fn is_closed(&self) -> bool {
        dispatch!(self, c => c.is_closed())
    }

    fn is_periodic(&self) -> bool {
        dispatch!(self, c => c.is_periodic())
    }

    fn continuity(&self) -> Continuity {
        dispatch!(self, c => c.continuity())
    }

    fn is_cn(&self, n: usize) -> bool {
        dispatch!(self, c => c.is_cn(n))
    }

    fn reverse(&mut self) {
        dispatch!(self, c => c.reverse())
    }

    fn reversed_parameter(&self, u: f64) -> f64 {
        dispatch!(self, c => c.reversed_parameter(u))
    }

    fn transform(&mut self, t: &P::Transform) {
        dispatch!(self, c => c.transform(t))
    }

    fn transformed_parameter(&self, u: f64, t: &P::Transform) -> f64 {
        dispatch!(self, c => c.transformed_parameter(u, t))
    }

    fn period(&self) -> Result<f64> {
        dispatch!(self, c => c.period())
    }
}

impl<P: Space> Curve<P> {
    /// Whether both parameter bounds are finite.
    pub fn is_bounded(&self) -> bool {
        self.first_parameter().is_finite() && self.last_parameter().is_finite()
    }

    pub fn as_bspline(&self) -> Option<&BSplineCurve<P>> {
        match self {
            Curve::BSpline(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($variant:ident => $ty:ident),*) => {
        $(
            impl<P: Space> From<$ty<P>> for Curve<P> {
                fn from(c: $ty<P>) -> Self {
                    Curve::$variant(c)
                }
            }
        )*
    };
}

impl_from!(
    Line => Line,
    Circle => Circle,
    Ellipse => Ellipse,
    BSpline => BSplineCurve,
    Trimmed => TrimmedCurve,
    Offset => OffsetCurve
);

#[cfg(test)]
mod tests {
    use super::*;
    use pgeom_math::Transform2;

    #[test]
    fn test_period_of_non_periodic_curve() {
        let c: Curve2 = Line::new(DVec2::ZERO, DVec2::X).unwrap().into();
        assert!(matches!(c.period(), Err(GeomError::NoSuchObject(_))));
        assert!(!c.is_bounded());
    }

    #[test]
    fn test_dn_rejects_order_zero() {
        let c: Curve2 = Circle::new(DVec2::ZERO, DVec2::X, DVec2::Y, 1.0).unwrap().into();
        assert!(matches!(c.eval_dn(0.0, 0), Err(GeomError::OutOfRange(_))));
        let d = c.dn(0.0, 4).unwrap();
        assert!((d - DVec2::X).length() < 1e-12);
    }

    #[test]
    fn test_handle_mutation_is_isolated() {
        let shared: CurveHandle<DVec2> =
            Arc::new(Circle::new(DVec2::ZERO, DVec2::X, DVec2::Y, 2.0).unwrap().into());
        let mut mine = Arc::clone(&shared);
        Arc::make_mut(&mut mine).transform(&Transform2::from_translation(DVec2::new(1.0, 0.0)));
        assert!((shared.value(0.0).unwrap() - DVec2::new(2.0, 0.0)).length() < 1e-12);
        assert!((mine.value(0.0).unwrap() - DVec2::new(3.0, 0.0)).length() < 1e-12);
    }
}
