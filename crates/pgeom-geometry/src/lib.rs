//! pgeom geometry: the B-spline kernel, planar and spatial curves, and
//! surfaces.
//!
//! Geometry values are plain data. Sharing goes through
//! [`CurveHandle`](curve::CurveHandle) and [`SurfaceHandle`]; editing a
//! shared value copies it first.

pub mod bspline;
pub mod curve;
pub mod derivative;
pub mod param;
pub mod surface;

pub use curve::{BSplineCurve, Curve, Curve2, Curve3, CurveHandle, ParametricCurve};
pub use surface::{BSplineSurface, ParametricSurface, Surface, SurfaceHandle};
