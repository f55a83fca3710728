//! pgeom conversions between curve and surface representations.
//!
//! Every function here is pure: inputs are borrowed, results are new
//! objects. Planar and spatial curves share one generic implementation.
//!
//! - [`curve_to_bspline`] and [`surface_to_bspline`]: exact B-spline forms
//!   of bounded analytic geometry.
//! - [`split_bspline_curve`] and friends: the piece between two knots or
//!   parameters.
//! - [`concat_g1`] / [`concat_c1`]: merge chains of B-splines.
//! - [`c0_to_c1`] / [`c0_to_array_of_c1`]: remove removable C0 knots.

pub mod c1;
pub mod concat;
pub mod conic;
pub mod curve;
pub mod fit;
pub mod options;
pub mod split;
pub mod surface;

pub use c1::{c0_to_array_of_c1, c0_to_c1};
pub use concat::{concat_c1, concat_g1, ConcatResult};
pub use conic::{circle_arc_to_bspline, circle_to_bspline, ellipse_arc_to_bspline, ellipse_to_bspline};
pub use curve::{curve_to_bspline, curve_to_bspline_with};
pub use fit::approximate;
pub use options::{ApproxOptions, ParameterisationType};
pub use split::{
    split_bspline_curve, split_bspline_curve_by_knots, split_bspline_surface, split_bspline_surface_by_knots,
    split_bspline_surface_by_knots_in, split_bspline_surface_in, IsoDirection,
};
pub use surface::surface_to_bspline;
