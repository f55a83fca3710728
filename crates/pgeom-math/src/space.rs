//! Abstraction over the 2D and 3D vector spaces geometry lives in.
//!
//! Curves are written once against [`Space`] and instantiated for
//! [`DVec2`] (planar geometry) and [`DVec3`] (spatial geometry).

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use glam::{DVec2, DVec3};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::transform::{Transform, Transform2};

/// A Euclidean vector space usable as point and vector type of a curve.
pub trait Space:
    Copy
    + Debug
    + PartialEq
    + Default
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign<f64>
    + Serialize
    + DeserializeOwned
{
    /// Number of coordinates.
    const DIM: usize;
    const ZERO: Self;

    /// Similarity transform acting on this space.
    type Transform: Copy + Debug + Send + Sync;

    /// Extra data an offset curve needs to turn a tangent into a normal:
    /// nothing in the plane, a reference direction in space.
    type OffsetRef: Copy + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned;

    fn dot(self, other: Self) -> f64;

    fn coord(self, i: usize) -> f64;

    /// Build a value from the first `DIM` entries of `coords`.
    fn from_coords(coords: &[f64]) -> Self;

    /// Linear map taking a curve tangent to its (unnormalized) offset normal.
    fn offset_normal(tangent: Self, reference: &Self::OffsetRef) -> Self;

    /// Largest stretch `offset_normal` applies to a tangent.
    fn offset_ref_length(reference: &Self::OffsetRef) -> f64;

    fn transform_point(t: &Self::Transform, p: Self) -> Self;

    fn transform_vector(t: &Self::Transform, v: Self) -> Self;

    fn transform_offset_ref(t: &Self::Transform, reference: Self::OffsetRef) -> Self::OffsetRef;

    /// Signed scale factor: negative when the transform reverses orientation.
    fn scale_factor(t: &Self::Transform) -> f64;

    fn length_squared(self) -> f64 {
        self.dot(self)
    }

    fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Unit vector, or `None` when the length is at or below `resolution`.
    fn try_unit(self, resolution: f64) -> Option<Self> {
        let len = self.length();
        if len <= resolution || !len.is_finite() {
            None
        } else {
            Some(self / len)
        }
    }

    /// Whether two non-null vectors are parallel (or opposite) within
    /// `angular` radians.
    fn is_parallel(self, other: Self, angular: f64) -> bool {
        let la = self.length_squared();
        let lb = other.length_squared();
        if la == 0.0 || lb == 0.0 {
            return false;
        }
        // chord between the unit vectors: no cancellation at small angles
        let (ua, ub) = (self / la.sqrt(), other / lb.sqrt());
        let chord = (ua - ub).length().min((ua + ub).length());
        let angle = 2.0 * (0.5 * chord).min(1.0).asin();
        angle <= angular
    }
}

impl Space for DVec2 {
    const DIM: usize = 2;
    const ZERO: Self = DVec2::ZERO;

    type Transform = Transform2;
    type OffsetRef = ();

    fn dot(self, other: Self) -> f64 {
        DVec2::dot(self, other)
    }

    fn coord(self, i: usize) -> f64 {
        self[i]
    }

    fn from_coords(coords: &[f64]) -> Self {
        DVec2::new(coords[0], coords[1])
    }

    /// Tangent turned a quarter turn clockwise: positive offsets lie on the
    /// right of the direction of travel.
    fn offset_normal(tangent: Self, _reference: &()) -> Self {
        DVec2::new(tangent.y, -tangent.x)
    }

    fn offset_ref_length(_reference: &()) -> f64 {
        1.0
    }

    fn transform_point(t: &Transform2, p: Self) -> Self {
        t.transform_point(p)
    }

    fn transform_vector(t: &Transform2, v: Self) -> Self {
        t.transform_vector(v)
    }

    fn transform_offset_ref(_t: &Transform2, reference: ()) {
        reference
    }

    fn scale_factor(t: &Transform2) -> f64 {
        t.scale_factor()
    }
}

impl Space for DVec3 {
    const DIM: usize = 3;
    const ZERO: Self = DVec3::ZERO;

    type Transform = Transform;
    type OffsetRef = DVec3;

    fn dot(self, other: Self) -> f64 {
        DVec3::dot(self, other)
    }

    fn coord(self, i: usize) -> f64 {
        self[i]
    }

    fn from_coords(coords: &[f64]) -> Self {
        DVec3::new(coords[0], coords[1], coords[2])
    }

    fn offset_normal(tangent: Self, reference: &DVec3) -> Self {
        tangent.cross(*reference)
    }

    fn offset_ref_length(reference: &DVec3) -> f64 {
        reference.length()
    }

    fn transform_point(t: &Transform, p: Self) -> Self {
        t.transform_point(p)
    }

    fn transform_vector(t: &Transform, v: Self) -> Self {
        t.transform_vector(v)
    }

    fn transform_offset_ref(t: &Transform, reference: DVec3) -> DVec3 {
        t.transform_vector(reference).normalize_or_zero()
    }

    fn scale_factor(t: &Transform) -> f64 {
        t.scale_factor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{dvec2, dvec3};

    #[test]
    fn test_coords_roundtrip_through_slices() {
        let p = dvec3(1.0, -2.0, 3.5);
        let coords: Vec<f64> = (0..DVec3::DIM).map(|i| p.coord(i)).collect();
        assert_eq!(DVec3::from_coords(&coords), p);
    }

    #[test]
    fn test_planar_offset_normal_points_right() {
        let n = DVec2::offset_normal(dvec2(1.0, 0.0), &());
        assert!((n - dvec2(0.0, -1.0)).length() < 1e-15);
    }

    #[test]
    fn test_spatial_offset_normal_is_cross_product() {
        let n = DVec3::offset_normal(DVec3::Y, &DVec3::Z);
        assert!((n - DVec3::X).length() < 1e-15);
    }

    #[test]
    fn test_parallel() {
        assert!(dvec3(1.0, 0.0, 0.0).is_parallel(dvec3(-3.0, 0.0, 0.0), 1e-12));
        assert!(!dvec3(1.0, 0.0, 0.0).is_parallel(dvec3(1.0, 1e-3, 0.0), 1e-6));
        assert!(!DVec3::ZERO.is_parallel(DVec3::X, 1e-6));
    }

    #[test]
    fn test_try_unit_rejects_null_vector() {
        assert!(DVec2::ZERO.try_unit(0.0).is_none());
        let u = dvec2(3.0, 4.0).try_unit(1e-12).unwrap();
        assert!((u.length() - 1.0).abs() < 1e-15);
    }
}
