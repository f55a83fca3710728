//! B-spline kernel shared by curves and surfaces.
//!
//! Everything here works on flat knot sequences and rows of homogeneous
//! pole coordinates, so one implementation serves 2D curves, 3D curves and
//! both directions of a surface.

pub mod edit;
pub mod eval;
pub mod knots;
pub mod periodic;

pub use edit::SplineRows;
pub use knots::{KnotLocation, MAX_DEGREE};
pub use periodic::Unrolled;
