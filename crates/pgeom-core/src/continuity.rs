//! Global smoothness orders of curves and surfaces.

use serde::{Deserialize, Serialize};

/// Claimed smoothness of a curve or surface, weakest first.
///
/// `G1`/`G2` are geometric continuities: they sit between the parametric
/// orders in the ordering but give no guarantee on derivative magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Continuity {
    C0,
    G1,
    C1,
    G2,
    C2,
    C3,
    CN,
}

impl Continuity {
    /// Highest derivative order guaranteed continuous, `None` for `CN`.
    pub fn order(self) -> Option<usize> {
        match self {
            Continuity::C0 | Continuity::G1 => Some(0),
            Continuity::C1 | Continuity::G2 => Some(1),
            Continuity::C2 => Some(2),
            Continuity::C3 => Some(3),
            Continuity::CN => None,
        }
    }

    /// Parametric continuity from a derivative order. Orders above 3 are `CN`.
    pub fn from_order(order: usize) -> Self {
        match order {
            0 => Continuity::C0,
            1 => Continuity::C1,
            2 => Continuity::C2,
            3 => Continuity::C3,
            _ => Continuity::CN,
        }
    }

    /// Whether derivatives up to order `n` are continuous.
    pub fn is_cn(self, n: usize) -> bool {
        self.order().map_or(true, |order| order >= n)
    }

    /// Continuity of an offset built on a basis of this continuity.
    pub fn offset_lowered(self) -> Self {
        match self {
            Continuity::C2 => Continuity::C1,
            Continuity::C3 => Continuity::C2,
            Continuity::CN => Continuity::CN,
            _ => Continuity::C0,
        }
    }
}
