//! Least-squares B-spline fit of curves that have no exact B-spline form.

use nalgebra::DMatrix;
use pgeom_core::{GeomError, Result};
use pgeom_geometry::bspline::knots::{basis_functions, find_span, flat_knots};
use pgeom_geometry::{BSplineCurve, ParametricCurve};
use pgeom_math::Space;
use tracing::{debug, instrument};

use crate::options::ApproxOptions;

const SAMPLES_PER_SPAN: usize = 8;

/// Fit a polynomial B-spline to `curve` over `[u1, u2]`, keeping its
/// parametrization.
///
/// The span count doubles from one up to `max_segments` until the fit is
/// within `tolerance` at the samples and between them. The end points are
/// interpolated.
#[instrument(level = "debug", skip(curve))]
pub fn approximate<P: Space, C: ParametricCurve<P>>(
    curve: &C,
    u1: f64,
    u2: f64,
    options: &ApproxOptions,
) -> Result<BSplineCurve<P>> {
    if !(u1.is_finite() && u2.is_finite()) || u2 <= u1 {
        return Err(GeomError::domain("approximation needs a finite, non-empty range"));
    }
    let degree = options.max_degree.min(3);
    if degree == 0 {
        return Err(GeomError::construction("approximation: max_degree must be at least 1"));
    }
    // polynomial pieces give at most C(degree - 1) at simple knots
    let smooth = options.continuity.order().unwrap_or(degree).min(degree - 1);
    let interior_mult = degree - smooth;

    let mut spans = 1;
    loop {
        let fit = fit_once(curve, u1, u2, degree, spans, interior_mult)?;
        let error = max_deviation(curve, &fit, u1, u2, spans)?;
        debug!(spans, error, "approximation pass");
        if error <= options.tolerance {
            return Ok(fit);
        }
        if spans >= options.max_segments {
            return Err(GeomError::construction(format!(
                "approximation: deviation {error:e} above tolerance with {spans} spans"
            )));
        }
        spans = (spans * 2).min(options.max_segments);
    }
}

fn fit_once<P: Space, C: ParametricCurve<P>>(
    curve: &C,
    u1: f64,
    u2: f64,
    degree: usize,
    spans: usize,
    interior_mult: usize,
) -> Result<BSplineCurve<P>> {
    let knots: Vec<f64> = (0..=spans)
        .map(|i| if i == spans { u2 } else { u1 + (u2 - u1) * i as f64 / spans as f64 })
        .collect();
    let mut mults = vec![interior_mult; spans + 1];
    mults[0] = degree + 1;
    mults[spans] = degree + 1;
    let flat = flat_knots(degree, &knots, &mults, false);
    let n = flat.len() - degree - 1;

    let m = spans * SAMPLES_PER_SPAN;
    let params: Vec<f64> = (0..=m).map(|i| u1 + (u2 - u1) * i as f64 / m as f64).collect();
    let points = params
        .iter()
        .map(|&u| curve.value(u))
        .collect::<Result<Vec<P>>>()?;
    let (start, end) = (points[0], points[m]);

    let mut poles = vec![P::ZERO; n];
    poles[0] = start;
    poles[n - 1] = end;
    if n > 2 {
        // unknowns are the inner poles; the end poles are fixed
        let inner = n - 2;
        let mut a = DMatrix::<f64>::zeros(m - 1, inner);
        let mut rhs = DMatrix::<f64>::zeros(m - 1, P::DIM);
        for (row, &u) in params[1..m].iter().enumerate() {
            let span = find_span(degree, &flat, n - 1, u);
            let basis = basis_functions(degree, &flat, span, u);
            let mut r = points[row + 1];
            for (k, &b) in basis.iter().enumerate() {
                let idx = span - degree + k;
                if idx == 0 {
                    r -= start * b;
                } else if idx == n - 1 {
                    r -= end * b;
                } else {
                    a[(row, idx - 1)] = b;
                }
            }
            for d in 0..P::DIM {
                rhs[(row, d)] = r.coord(d);
            }
        }
        let normal = a.transpose() * &a;
        let chol = normal
            .cholesky()
            .ok_or_else(|| GeomError::construction("approximation: singular least-squares system"))?;
        let solved = chol.solve(&(a.transpose() * rhs));
        for i in 0..inner {
            let coords: Vec<f64> = (0..P::DIM).map(|d| solved[(i, d)]).collect();
            poles[i + 1] = P::from_coords(&coords);
        }
    }
    BSplineCurve::new(poles, None, knots, mults, degree, false)
}

/// Largest distance between the fit and the curve at and between the fit
/// samples.
fn max_deviation<P: Space, C: ParametricCurve<P>>(
    curve: &C,
    fit: &BSplineCurve<P>,
    u1: f64,
    u2: f64,
    spans: usize,
) -> Result<f64> {
    let m = 2 * spans * SAMPLES_PER_SPAN;
    (0..=m).try_fold(0.0f64, |acc, i| {
        let u = u1 + (u2 - u1) * i as f64 / m as f64;
        Ok(acc.max(curve.value(u)?.distance(fit.value(u)?)))
    })
}
