//! Parameter arithmetic on periodic domains.

/// Bring `u` into `[first, first + period)`.
pub fn in_period(u: f64, first: f64, period: f64) -> f64 {
    if period <= 0.0 || !u.is_finite() {
        return u;
    }
    let v = u - ((u - first) / period).floor() * period;
    // floor can round to the upper end
    if v >= first + period {
        v - period
    } else {
        v
    }
}

/// Shift trim bounds of a periodic domain `[first, last]`.
///
/// `u1` lands in `[first, last)` (moved down a period when within `preci` of
/// `last`) and `u2` in `(u1, u1 + period]`, moved up a period when within
/// `preci` of `u1`.
pub fn adjust_periodic(first: f64, last: f64, preci: f64, u1: f64, u2: f64) -> (f64, f64) {
    let period = last - first;
    let mut a = in_period(u1, first, period);
    if last - a < preci {
        a -= period;
    }
    let mut b = u2 - ((u2 - a) / period).floor() * period;
    if b - a < preci {
        b += period;
    }
    (a, b)
}
