//! Concatenation of chains of B-spline curves.
//!
//! A chain is cut into groups at every junction that is not tangent
//! continuous; each group is merged into one curve. Merging never fails the
//! whole call: a junction that cannot be merged just starts a new output
//! curve.

use pgeom_core::{Result, Tolerance};
use pgeom_geometry::{BSplineCurve, ParametricCurve};
use pgeom_math::Space;
use tracing::{debug, instrument, trace};

/// Outcome of [`concat_g1`] and [`concat_c1`].
#[derive(Debug, Clone)]
pub struct ConcatResult<P: Space> {
    pub curves: Vec<BSplineCurve<P>>,
    /// For every input curve, the index of the output curve that holds it.
    pub indices: Vec<usize>,
    /// Whether the chain could be closed within the closure tolerance.
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Smoothing {
    G1,
    C1,
}

/// Merge every tangent-continuous junction of `curves`.
///
/// `tolerances[i]` is the distance allowed between the end of curve `i` and
/// the start of curve `i + 1`; missing entries use [`Tolerance::CONFUSION`].
/// Tangents must be parallel within [`Tolerance::ANGULAR`]. Merged pieces
/// keep their own speed, so the result is G1 but may be only C0 at the
/// former junctions.
///
/// With `closed`, the junction from the last curve back to the first is
/// checked against `closed_tolerance`; when it fails, `closed` is reported
/// as false.
#[instrument(level = "debug", skip(curves, tolerances), fields(count = curves.len()))]
pub fn concat_g1<P: Space>(
    curves: &[BSplineCurve<P>],
    tolerances: &[f64],
    closed: bool,
    closed_tolerance: f64,
) -> ConcatResult<P> {
    concat(curves, tolerances, closed, closed_tolerance, Tolerance::ANGULAR, Smoothing::G1)
}

/// Like [`concat_g1`], but merged pieces are reparameterized so the first
/// derivative is continuous at every merged junction, and the junction knot
/// is then lowered to C1 when the shape allows it within the junction
/// tolerance.
#[instrument(level = "debug", skip(curves, tolerances), fields(count = curves.len()))]
pub fn concat_c1<P: Space>(
    curves: &[BSplineCurve<P>],
    tolerances: &[f64],
    closed: bool,
    closed_tolerance: f64,
    angular_tolerance: f64,
) -> ConcatResult<P> {
    concat(curves, tolerances, closed, closed_tolerance, angular_tolerance, Smoothing::C1)
}

fn concat<P: Space>(
    curves: &[BSplineCurve<P>],
    tolerances: &[f64],
    closed: bool,
    closed_tolerance: f64,
    angular: f64,
    smoothing: Smoothing,
) -> ConcatResult<P> {
    let n = curves.len();
    if n == 0 {
        return ConcatResult {
            curves: Vec::new(),
            indices: Vec::new(),
            closed: false,
        };
    }
    let tol = |i: usize| tolerances.get(i).copied().unwrap_or(Tolerance::CONFUSION);

    let mut groups: Vec<Vec<usize>> = vec![vec![0]];
    for i in 1..n {
        if is_tangent_junction(&curves[i - 1], &curves[i], tol(i - 1), angular) {
            if let Some(g) = groups.last_mut() {
                g.push(i);
            }
        } else {
            groups.push(vec![i]);
        }
    }
    let closing = closed && is_tangent_junction(&curves[n - 1], &curves[0], closed_tolerance, angular);
    let closes_at_position =
        closed && curves[n - 1].end_point().distance(curves[0].start_point()) <= closed_tolerance;
    if closing && groups.len() > 1 {
        // the first run continues the last one across the seam
        let first = groups.remove(0);
        if let Some(g) = groups.last_mut() {
            g.extend(first);
        }
    }
    trace!(groups = groups.len(), closing, "chain grouped");

    let mut out: Vec<BSplineCurve<P>> = Vec::with_capacity(groups.len());
    let mut indices = vec![0; n];
    for group in &groups {
        let mut acc = clamped(&curves[group[0]]);
        indices[group[0]] = out.len();
        for pair in group.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let junction_tol = if next == 0 { closed_tolerance } else { tol(prev) };
            match merge(&acc, &curves[next], junction_tol, smoothing) {
                Ok(merged) => acc = merged,
                Err(err) => {
                    debug!(prev, next, %err, "junction kept");
                    out.push(acc);
                    acc = clamped(&curves[next]);
                }
            }
            indices[next] = out.len();
        }
        out.push(acc);
    }

    if closing && out.len() == 1 {
        if let Some(c) = out.first_mut() {
            close(c, closed_tolerance, smoothing);
        }
    }
    debug!(inputs = n, outputs = out.len(), "chain concatenated");
    ConcatResult {
        curves: out,
        indices,
        closed: closes_at_position,
    }
}

fn is_tangent_junction<P: Space>(a: &BSplineCurve<P>, b: &BSplineCurve<P>, tol: f64, angular: f64) -> bool {
    if a.end_point().distance(b.start_point()) > tol {
        return false;
    }
    let ta = a.eval_d1(a.last_parameter()).ok().flatten().map(|(_, t)| t);
    let tb = b.eval_d1(b.first_parameter()).ok().flatten().map(|(_, t)| t);
    match (ta, tb) {
        (Some(ta), Some(tb)) => ta.dot(tb) > 0.0 && ta.is_parallel(tb, angular),
        _ => false,
    }
}

/// Non-periodic copy with end knots of full multiplicity.
fn clamped<P: Space>(c: &BSplineCurve<P>) -> BSplineCurve<P> {
    let mut c = c.clone();
    c.set_not_periodic();
    let mults = c.multiplicities();
    let full = c.degree() + 1;
    let clamped_ends = mults.first() == Some(&full) && mults.last() == Some(&full);
    if !clamped_ends {
        let (first, last) = (c.first_parameter(), c.last_parameter());
        if let Err(err) = c.segment(first, last, 0.0) {
            debug!(%err, "could not clamp curve ends");
        }
    }
    c
}

/// `a` followed by `b`, joined at a knot of multiplicity `degree`.
fn merge<P: Space>(
    a: &BSplineCurve<P>,
    b: &BSplineCurve<P>,
    tol: f64,
    smoothing: Smoothing,
) -> Result<BSplineCurve<P>> {
    let mut a = a.clone();
    let mut b = clamped(b);
    let degree = a.degree().max(b.degree());
    a.increase_degree(degree)?;
    b.increase_degree(degree)?;

    let a_end = a.last_parameter();
    let b_start = b.first_parameter();
    let mut scale = 1.0;
    if smoothing == Smoothing::C1 {
        let (_, da) = a.d1(a_end)?;
        let (_, db) = b.d1(b_start)?;
        let (la, lb) = (da.length(), db.length());
        if la > Tolerance::RESOLUTION && lb > Tolerance::RESOLUTION {
            scale = lb / la;
        }
    }

    let na = a.nb_poles();
    let mut poles: Vec<P> = a.poles()[..na - 1].to_vec();
    poles.push((a.end_point() + b.start_point()) * 0.5);
    poles.extend_from_slice(&b.poles()[1..]);

    let weights = if a.is_rational() || b.is_rational() {
        let ratio = a.weight(na - 1)? / b.weight(0)?;
        let mut w: Vec<f64> = (0..na).map(|i| a.weight(i)).collect::<Result<_>>()?;
        for j in 1..b.nb_poles() {
            w.push(b.weight(j)? * ratio);
        }
        Some(w)
    } else {
        None
    };

    let ka = a.knots();
    let ma = a.multiplicities();
    let mut knots = ka.to_vec();
    let mut mults = ma[..ma.len() - 1].to_vec();
    mults.push(degree);
    knots.extend(b.knots()[1..].iter().map(|k| a_end + (k - b_start) * scale));
    mults.extend_from_slice(&b.multiplicities()[1..]);

    let junction = ka.len() - 1;
    let mut merged = BSplineCurve::new(poles, weights, knots, mults, degree, false)?;
    if smoothing == Smoothing::C1 {
        let lowered = merged.remove_knot(junction, degree - 1, tol)?;
        trace!(junction, lowered, "junction knot lowered");
    }
    debug!(degree, poles = merged.nb_poles(), "curves merged");
    Ok(merged)
}

/// `a` followed by `b` with a C0 junction, whatever their tangents.
pub(crate) fn join<P: Space>(a: &BSplineCurve<P>, b: &BSplineCurve<P>) -> Result<BSplineCurve<P>> {
    merge(&clamped(a), b, 0.0, Smoothing::G1)
}

/// Make a single merged chain periodic, snapping its end onto its start.
fn close<P: Space>(c: &mut BSplineCurve<P>, tol: f64, smoothing: Smoothing) {
    let last = c.nb_poles() - 1;
    let start = c.start_point();
    if c.set_pole(last, start).and_then(|_| c.set_periodic()).is_err() {
        debug!("closed chain kept non periodic");
        return;
    }
    if smoothing == Smoothing::C1 {
        let lowered = c.remove_knot(0, c.degree() - 1, tol).unwrap_or(false);
        trace!(lowered, "seam knot lowered");
    }
}
