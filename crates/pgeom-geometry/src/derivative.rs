//! Derivative helpers shared by the analytic and offset evaluators.

use std::f64::consts::FRAC_PI_2;

use pgeom_math::Space;

/// Binomial coefficient `C(n, k)` as a float.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// `(cos, sin)` differentiated `k` times at `u`.
pub fn trig_derivative(u: f64, k: usize) -> (f64, f64) {
    let shifted = u + (k % 4) as f64 * FRAC_PI_2;
    // exact values for the undifferentiated case
    if k % 4 == 0 {
        (u.cos(), u.sin())
    } else {
        (shifted.cos(), shifted.sin())
    }
}

/// Mixed partials of `f / |f|` from the mixed partials of `f`.
///
/// `f[i][j]` is the derivative of order `i` in the first and `j` in the
/// second parameter; curves pass one-column grids. Returns `None` when
/// `|f|` is at or below `resolution`, where the direction is undefined.
///
/// With `s = |f|` and `n = f / s`, Leibniz on `s * s = f . f` and on
/// `f = s * n` gives each `s(k, l)` and then each `n(k, l)` from lower
/// orders.
#[allow(clippy::needless_range_loop)]
pub fn normalized_partials<P: Space>(f: &[Vec<P>], resolution: f64) -> Option<Vec<Vec<P>>> {
    let nk = f.len();
    let nl = f.first()?.len();
    let s00 = f[0][0].length();
    if s00 <= resolution || !s00.is_finite() {
        return None;
    }

    let mut s = vec![vec![0.0; nl]; nk];
    let mut n = vec![vec![P::ZERO; nl]; nk];
    for k in 0..nk {
        for l in 0..nl {
            if k == 0 && l == 0 {
                s[0][0] = s00;
            } else {
                let mut g = 0.0;
                let mut rest = 0.0;
                for i in 0..=k {
                    for j in 0..=l {
                        let c = binomial(k, i) * binomial(l, j);
                        g += c * f[i][j].dot(f[k - i][l - j]);
                        let ends = (i == 0 && j == 0) || (i == k && j == l);
                        if !ends {
                            rest += c * s[i][j] * s[k - i][l - j];
                        }
                    }
                }
                s[k][l] = (g - rest) / (2.0 * s00);
            }

            let mut v = f[k][l];
            for i in 0..=k {
                for j in 0..=l {
                    if i == k && j == l {
                        continue;
                    }
                    v -= n[i][j] * (binomial(k, i) * binomial(l, j) * s[k - i][l - j]);
                }
            }
            n[k][l] = v / s00;
        }
    }
    Some(n)
}
