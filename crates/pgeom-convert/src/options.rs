//! Conversion settings.

use pgeom_core::Continuity;
use serde::{Deserialize, Serialize};

/// Knot layout used when a circle or ellipse becomes a rational B-spline.
///
/// Every layout is exact; they differ in span count and in how closely the
/// spline parameter follows the angle between knots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParameterisationType {
    /// Rational quadratic spans of at most 2π/3.
    #[default]
    TgtThetaOver2,
    /// One span; arcs must stay below π.
    TgtThetaOver2_1,
    /// Two spans; arcs must stay below 2π.
    TgtThetaOver2_2,
    TgtThetaOver2_3,
    TgtThetaOver2_4,
    /// Spans of at most π/2, keeping the parameter close to the angle.
    QuasiAngular,
    /// Two-span pieces that are C1 inside; sweeps of 6 rad or more are
    /// converted in two halves and joined.
    RationalC1,
}

/// Settings of the least-squares fit used for curves without an exact
/// B-spline form (offsets of free-form curves).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproxOptions {
    /// Largest allowed distance between the fit and the curve.
    pub tolerance: f64,
    /// Continuity of the fit at its interior knots.
    pub continuity: Continuity,
    pub max_segments: usize,
    pub max_degree: usize,
}

impl Default for ApproxOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            continuity: Continuity::C2,
            max_segments: 16,
            max_degree: 14,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(ParameterisationType::default(), ParameterisationType::TgtThetaOver2);
        let o = ApproxOptions::default();
        assert_eq!(o.tolerance, 1e-4);
        assert_eq!(o.continuity, Continuity::C2);
        assert_eq!((o.max_segments, o.max_degree), (16, 14));
    }

    #[test]
    fn test_partial_options_from_json() {
        let o: ApproxOptions = serde_json::from_str(r#"{"tolerance": 0.01, "max_segments": 4}"#).unwrap();
        assert_eq!(o.tolerance, 0.01);
        assert_eq!(o.max_segments, 4);
        assert_eq!(o.max_degree, 14);
        let p: ParameterisationType = serde_json::from_str(r#""QuasiAngular""#).unwrap();
        assert_eq!(p, ParameterisationType::QuasiAngular);
    }
}
