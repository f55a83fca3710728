/// Tolerances used by geometric comparisons and editing operations.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Linear tolerance for distance comparisons (in model units)
    pub linear: f64,
    /// Angular tolerance (in radians)
    pub angular: f64,
    /// Parametric tolerance for knot and trim comparisons
    pub parametric: f64,
}

impl Tolerance {
    /// Distance under which two points are considered coincident.
    pub const CONFUSION: f64 = 1e-7;
    /// Angle under which two directions are considered parallel.
    pub const ANGULAR: f64 = 1e-12;
    /// Parametric confusion, `CONFUSION * 0.01`.
    pub const PCONFUSION: f64 = 1e-9;
    /// The fixed geometric resolution: the smallest positive length.
    pub const RESOLUTION: f64 = f64::MIN_POSITIVE;
    /// Minimal spacing between two distinct knots.
    pub const KNOT_EPSILON: f64 = 1e-12;

    pub fn new(linear: f64, angular: f64, parametric: f64) -> Self {
        Self {
            linear,
            angular,
            parametric,
        }
    }

    /// The library constants.
    pub fn default_precision() -> Self {
        Self::new(Self::CONFUSION, Self::ANGULAR, Self::PCONFUSION)
    }

    /// Same tolerances with another linear one.
    pub fn with_linear(self, linear: f64) -> Self {
        Self { linear, ..self }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::default_precision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_confusion() {
        let tol = Tolerance::default();
        assert_eq!(tol.linear, Tolerance::CONFUSION);
        assert_eq!(tol.with_linear(1e-3).angular, Tolerance::ANGULAR);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let tol: Tolerance = serde_json::from_str(r#"{ "linear": 0.001 }"#).unwrap();
        assert_eq!(tol.linear, 0.001);
        assert_eq!(tol.angular, Tolerance::ANGULAR);
        assert_eq!(tol.parametric, Tolerance::PCONFUSION);
    }
}
