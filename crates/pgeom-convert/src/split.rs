//! Extraction of the piece of a B-spline between two knots or parameters.
//!
//! The piece keeps the parametrization of the source. Its orientation
//! follows the order of the bounds on non periodic sources; on periodic
//! sources it follows `same_orientation`.

use pgeom_core::{GeomError, Result};
use pgeom_geometry::{BSplineCurve, BSplineSurface, ParametricCurve, ParametricSurface};
use pgeom_math::Space;
use tracing::debug;

/// Parametric direction of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsoDirection {
    U,
    V,
}

fn ordered_knots(from: usize, to: usize, first: usize, last: usize) -> Result<(usize, usize)> {
    if from == to {
        return Err(GeomError::construction("split: both knot indices are equal"));
    }
    let (a, b) = (from.min(to), from.max(to));
    if a < first || b > last {
        return Err(GeomError::construction(format!(
            "split: knot indices {a}..{b} outside {first}..{last}"
        )));
    }
    Ok((a, b))
}

fn ordered_params(from: f64, to: f64, tol: f64, bounds: Option<(f64, f64)>) -> Result<(f64, f64)> {
    if (from - to).abs() <= tol {
        return Err(GeomError::construction("split: both parameters are equal"));
    }
    let (a, b) = (from.min(to), from.max(to));
    if let Some((first, last)) = bounds {
        if a < first - tol || b > last + tol {
            return Err(GeomError::construction(format!(
                "split: [{a}, {b}] outside the domain [{first}, {last}]"
            )));
        }
    }
    Ok((a, b))
}

fn reverse_wanted(periodic: bool, reversed_bounds: bool, same_orientation: bool) -> bool {
    if periodic {
        !same_orientation
    } else {
        reversed_bounds
    }
}

/// Piece of `c` between knots `from_k1` and `to_k2`.
pub fn split_bspline_curve_by_knots<P: Space>(
    c: &BSplineCurve<P>,
    from_k1: usize,
    to_k2: usize,
    same_orientation: bool,
) -> Result<BSplineCurve<P>> {
    let (a, b) = ordered_knots(from_k1, to_k2, c.first_u_knot_index(), c.last_u_knot_index())?;
    let mut piece = c.clone();
    piece.segment(c.knot(a)?, c.knot(b)?, 0.0)?;
    if reverse_wanted(c.is_periodic(), from_k1 > to_k2, same_orientation) {
        piece.reverse();
    }
    debug!(from_k1, to_k2, "curve split at knots");
    Ok(piece)
}

/// Piece of `c` between parameters `from_u1` and `to_u2`; bounds within
/// `tol` of a knot snap to it.
pub fn split_bspline_curve<P: Space>(
    c: &BSplineCurve<P>,
    from_u1: f64,
    to_u2: f64,
    tol: f64,
    same_orientation: bool,
) -> Result<BSplineCurve<P>> {
    let bounds = (!c.is_periodic()).then(|| (c.first_parameter(), c.last_parameter()));
    let (a, b) = ordered_params(from_u1, to_u2, tol, bounds)?;
    let mut piece = c.clone();
    piece.segment(a, b, tol)?;
    if reverse_wanted(c.is_periodic(), from_u1 > to_u2, same_orientation) {
        piece.reverse();
    }
    Ok(piece)
}

/// Piece of `s` between knots `from_k1` and `to_k2` of one direction.
pub fn split_bspline_surface_by_knots_in(
    s: &BSplineSurface,
    dir: IsoDirection,
    from_k1: usize,
    to_k2: usize,
    same_orientation: bool,
) -> Result<BSplineSurface> {
    let mut piece = s.clone();
    split_surface_knots(&mut piece, s, dir, from_k1, to_k2, same_orientation)?;
    Ok(piece)
}

/// Piece of `s` between knots `fu1..lu2` in u and `fv1..lv2` in v.
#[allow(clippy::too_many_arguments)]
pub fn split_bspline_surface_by_knots(
    s: &BSplineSurface,
    from_u1: usize,
    to_u2: usize,
    from_v1: usize,
    to_v2: usize,
    same_u_orientation: bool,
    same_v_orientation: bool,
) -> Result<BSplineSurface> {
    let mut piece = s.clone();
    split_surface_knots(&mut piece, s, IsoDirection::U, from_u1, to_u2, same_u_orientation)?;
    split_surface_knots(&mut piece, s, IsoDirection::V, from_v1, to_v2, same_v_orientation)?;
    debug!(from_u1, to_u2, from_v1, to_v2, "surface split at knots");
    Ok(piece)
}

fn split_surface_knots(
    piece: &mut BSplineSurface,
    source: &BSplineSurface,
    dir: IsoDirection,
    from: usize,
    to: usize,
    same_orientation: bool,
) -> Result<()> {
    match dir {
        IsoDirection::U => {
            let (a, b) = ordered_knots(from, to, source.first_u_knot_index(), source.last_u_knot_index())?;
            piece.check_and_segment_u(source.u_knot(a)?, source.u_knot(b)?, 0.0)?;
            if reverse_wanted(source.is_u_periodic(), from > to, same_orientation) {
                piece.u_reverse();
            }
        }
        IsoDirection::V => {
            let (a, b) = ordered_knots(from, to, source.first_v_knot_index(), source.last_v_knot_index())?;
            piece.check_and_segment_v(source.v_knot(a)?, source.v_knot(b)?, 0.0)?;
            if reverse_wanted(source.is_v_periodic(), from > to, same_orientation) {
                piece.v_reverse();
            }
        }
    }
    Ok(())
}

/// Piece of `s` between parameters `from` and `to` of one direction.
pub fn split_bspline_surface_in(
    s: &BSplineSurface,
    dir: IsoDirection,
    from: f64,
    to: f64,
    tol: f64,
    same_orientation: bool,
) -> Result<BSplineSurface> {
    let mut piece = s.clone();
    split_surface_params(&mut piece, s, dir, from, to, tol, same_orientation)?;
    Ok(piece)
}

/// Piece of `s` over `[from_u1, to_u2] x [from_v1, to_v2]`.
#[allow(clippy::too_many_arguments)]
pub fn split_bspline_surface(
    s: &BSplineSurface,
    from_u1: f64,
    to_u2: f64,
    from_v1: f64,
    to_v2: f64,
    tol: f64,
    same_u_orientation: bool,
    same_v_orientation: bool,
) -> Result<BSplineSurface> {
    let mut piece = s.clone();
    split_surface_params(&mut piece, s, IsoDirection::U, from_u1, to_u2, tol, same_u_orientation)?;
    split_surface_params(&mut piece, s, IsoDirection::V, from_v1, to_v2, tol, same_v_orientation)?;
    Ok(piece)
}

fn split_surface_params(
    piece: &mut BSplineSurface,
    source: &BSplineSurface,
    dir: IsoDirection,
    from: f64,
    to: f64,
    tol: f64,
    same_orientation: bool,
) -> Result<()> {
    let (u1, u2, v1, v2) = source.bounds();
    let (periodic, domain) = match dir {
        IsoDirection::U => (source.is_u_periodic(), (u1, u2)),
        IsoDirection::V => (source.is_v_periodic(), (v1, v2)),
    };
    let (a, b) = ordered_params(from, to, tol, (!periodic).then_some(domain))?;
    let reverse = reverse_wanted(periodic, from > to, same_orientation);
    match dir {
        IsoDirection::U => {
            piece.check_and_segment_u(a, b, tol)?;
            if reverse {
                piece.u_reverse();
            }
        }
        IsoDirection::V => {
            piece.check_and_segment_v(a, b, tol)?;
            if reverse {
                piece.v_reverse();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgeom_math::{DVec2, DVec3};

    fn cubic() -> BSplineCurve<DVec2> {
        let poles = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 2.0),
            DVec2::new(2.0, 2.0),
            DVec2::new(3.0, -1.0),
            DVec2::new(4.0, 0.0),
            DVec2::new(5.0, 1.0),
        ];
        BSplineCurve::new(poles, None, vec![0.0, 1.0, 2.0, 3.0], vec![4, 1, 1, 4], 3, false).unwrap()
    }

    fn periodic() -> BSplineCurve<DVec2> {
        let poles = vec![
            DVec2::new(1.0, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(-1.0, 0.0),
            DVec2::new(0.0, -1.0),
        ];
        BSplineCurve::new(poles, None, vec![0.0, 1.0, 2.0, 3.0, 4.0], vec![1; 5], 2, true).unwrap()
    }

    #[test]
    fn test_split_by_knots_keeps_points() {
        let c = cubic();
        let piece = split_bspline_curve_by_knots(&c, 1, 2, true).unwrap();
        assert_eq!(piece.first_parameter(), 1.0);
        assert_eq!(piece.last_parameter(), 2.0);
        for i in 0..=10 {
            let u = 1.0 + i as f64 / 10.0;
            assert!((piece.value(u).unwrap() - c.value(u).unwrap()).length() < 1e-12);
        }
        let back = split_bspline_curve_by_knots(&c, 2, 1, true).unwrap();
        assert!((back.start_point() - c.value(2.0).unwrap()).length() < 1e-12);
    }

    #[test]
    fn test_split_errors() {
        let c = cubic();
        assert!(matches!(split_bspline_curve_by_knots(&c, 2, 2, true), Err(GeomError::Construction(_))));
        assert!(matches!(split_bspline_curve_by_knots(&c, 0, 7, true), Err(GeomError::Construction(_))));
        assert!(matches!(split_bspline_curve(&c, 1.0, 1.0, 1e-9, true), Err(GeomError::Construction(_))));
        assert!(matches!(split_bspline_curve(&c, -1.0, 1.0, 1e-9, true), Err(GeomError::Construction(_))));
    }

    #[test]
    fn test_split_periodic_orientation() {
        let c = periodic();
        let same = split_bspline_curve(&c, 3.5, 4.5, 1e-9, true).unwrap();
        assert!(!same.is_periodic());
        assert!((same.start_point() - c.value(3.5).unwrap()).length() < 1e-12);
        let flipped = split_bspline_curve(&c, 3.5, 4.5, 1e-9, false).unwrap();
        assert!((flipped.start_point() - c.value(4.5).unwrap()).length() < 1e-12);
        // bound order does not matter on periodic curves
        let swapped = split_bspline_curve(&c, 4.5, 3.5, 1e-9, true).unwrap();
        assert!((swapped.start_point() - c.value(3.5).unwrap()).length() < 1e-12);
    }

    fn sheet() -> BSplineSurface {
        let poles = (0..4)
            .map(|i| {
                (0..3)
                    .map(|j| DVec3::new(i as f64, j as f64, ((i * j) % 3) as f64))
                    .collect()
            })
            .collect();
        BSplineSurface::new(
            poles,
            None,
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0],
            vec![3, 1, 3],
            vec![3, 3],
            2,
            2,
            false,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_split_surface() {
        let s = sheet();
        let piece = split_bspline_surface_by_knots(&s, 1, 2, 0, 1, true, true).unwrap();
        assert_eq!(piece.bounds(), (1.0, 2.0, 0.0, 1.0));
        for (u, v) in [(1.0, 0.0), (1.5, 0.5), (2.0, 1.0)] {
            assert!((piece.value(u, v).unwrap() - s.value(u, v).unwrap()).length() < 1e-12);
        }
        let v_piece = split_bspline_surface_in(&s, IsoDirection::V, 0.8, 0.2, 1e-9, true).unwrap();
        let (_, _, v1, v2) = v_piece.bounds();
        assert!((v1 - 0.2).abs() < 1e-12 && (v2 - 0.8).abs() < 1e-12);
        // reversed bounds reverse the piece
        let p = v_piece.value(0.5, v_piece.v_reversed_parameter(0.3)).unwrap();
        assert!((p - s.value(0.5, 0.3).unwrap()).length() < 1e-12);
        assert!(split_bspline_surface_by_knots_in(&s, IsoDirection::U, 1, 1, true).is_err());
        assert!(split_bspline_surface(&s, 0.5, 1.5, 0.0, 2.0, 1e-9, true, true).is_err());
    }
}
