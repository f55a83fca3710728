//! De Boor evaluation of pole rows with derivatives.
//!
//! Poles are stored as rows of homogeneous coordinates (`x*w, y*w, [z*w], w`
//! for rational curves). A surface stores one row per u index holding all of
//! its v poles back to back, so the same code serves both.

use super::knots::basis_function_derivatives;
use crate::derivative::binomial;

/// Derivatives `0..=order` at `u` in span `span`.
///
/// `local[j]` is the row of the pole attached to basis function
/// `span - degree + j`, so callers gather the `degree + 1` contributing
/// poles (wrapping periodic indices) before the call.
#[allow(clippy::needless_range_loop)]
pub fn eval_local(
    degree: usize,
    flat: &[f64],
    span: usize,
    u: f64,
    local: &[Vec<f64>],
    order: usize,
) -> Vec<Vec<f64>> {
    let dim = local[0].len();
    let ders = basis_function_derivatives(degree, flat, span, u, order);

    let mut out = vec![vec![0.0; dim]; order + 1];
    for k in 0..=order {
        for j in 0..=degree {
            let coef = ders[k][j];
            if coef == 0.0 {
                continue;
            }
            let row = &local[j];
            for d in 0..dim {
                out[k][d] += coef * row[d];
            }
        }
    }
    out
}

/// One parametric direction of a tensor-product evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Direction<'a> {
    pub degree: usize,
    pub flat: &'a [f64],
    pub span: usize,
    pub param: f64,
    pub order: usize,
}

/// Mixed partial derivatives `[k][l]` (k in u up to `du.order`, l in v up
/// to `dv.order`) of a local pole patch.
///
/// `patch[i]` holds the `dv.degree + 1` contributing v poles of the u-row
/// attached to basis `du.span - du.degree + i`, each `stride` wide.
#[allow(clippy::needless_range_loop)]
pub fn eval_grid(
    patch: &[Vec<f64>],
    stride: usize,
    du: Direction<'_>,
    dv: Direction<'_>,
) -> Vec<Vec<Vec<f64>>> {
    let bu = basis_function_derivatives(du.degree, du.flat, du.span, du.param, du.order);
    let bv = basis_function_derivatives(dv.degree, dv.flat, dv.span, dv.param, dv.order);

    // v derivatives of each contributing u-row
    let mut temp = vec![vec![vec![0.0; stride]; dv.order + 1]; du.degree + 1];
    for i in 0..=du.degree {
        let row = &patch[i];
        for l in 0..=dv.order {
            for j in 0..=dv.degree {
                let coef = bv[l][j];
                if coef == 0.0 {
                    continue;
                }
                for d in 0..stride {
                    temp[i][l][d] += coef * row[j * stride + d];
                }
            }
        }
    }

    let mut out = vec![vec![vec![0.0; stride]; dv.order + 1]; du.order + 1];
    for k in 0..=du.order {
        for l in 0..=dv.order {
            for i in 0..=du.degree {
                let coef = bu[k][i];
                if coef == 0.0 {
                    continue;
                }
                for d in 0..stride {
                    out[k][l][d] += coef * temp[i][l][d];
                }
            }
        }
    }
    out
}

/// Cartesian derivatives from homogeneous ones.
///
/// `hom[k]` holds the k-th derivative of `(x*w, .., w)`; the result holds the
/// k-th derivative of the projected point, `dim` coordinates wide.
pub fn rational_derivatives(hom: &[Vec<f64>], dim: usize) -> Vec<Vec<f64>> {
    let grid: Vec<Vec<Vec<f64>>> = hom.iter().map(|h| vec![h.clone()]).collect();
    rational_partials(&grid, dim)
        .into_iter()
        .map(|mut col| col.swap_remove(0))
        .collect()
}

/// Cartesian mixed partials from homogeneous ones.
///
/// S(k,l) = (A(k,l) - sum over (i,j) != (0,0) of C(k,i) C(l,j) w(i,j) S(k-i,l-j)) / w(0,0)
#[allow(clippy::needless_range_loop)]
pub fn rational_partials(hom: &[Vec<Vec<f64>>], dim: usize) -> Vec<Vec<Vec<f64>>> {
    let nk = hom.len();
    let nl = hom[0].len();
    let w0 = hom[0][0][dim];
    let mut out = vec![vec![vec![0.0; dim]; nl]; nk];

    for k in 0..nk {
        for l in 0..nl {
            let mut v: Vec<f64> = hom[k][l][..dim].to_vec();
            for i in 0..=k {
                for j in 0..=l {
                    if i == 0 && j == 0 {
                        continue;
                    }
                    let c = binomial(k, i) * binomial(l, j) * hom[i][j][dim];
                    if c == 0.0 {
                        continue;
                    }
                    for d in 0..dim {
                        v[d] -= c * out[k - i][l - j][d];
                    }
                }
            }
            for d in 0..dim {
                out[k][l][d] = v[d] / w0;
            }
        }
    }
    out
}
