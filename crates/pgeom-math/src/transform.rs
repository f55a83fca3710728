use crate::{DMat3, DMat4, Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Similarity transform in space (rotation, reflection, uniform scale,
/// translation).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform {
    pub matrix: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        Self::from_mat4(DMat4::IDENTITY)
    }

    pub fn from_translation(t: Vector3) -> Self {
        Self::from_mat4(DMat4::from_translation(t))
    }

    /// Rotation by `angle` radians around the axis through `origin` along `axis`.
    pub fn from_rotation(origin: Point3, axis: Vector3, angle: f64) -> Self {
        let m = DMat4::from_translation(origin)
            * DMat4::from_axis_angle(axis.normalize(), angle)
            * DMat4::from_translation(-origin);
        Self::from_mat4(m)
    }

    /// Uniform scaling by `factor` about `center`. A negative factor is a
    /// point reflection combined with scaling.
    pub fn from_scale(center: Point3, factor: f64) -> Self {
        let m = DMat4::from_translation(center)
            * DMat4::from_scale(Vector3::splat(factor))
            * DMat4::from_translation(-center);
        Self::from_mat4(m)
    }

    /// Reflection through the plane containing `origin` with normal `normal`.
    pub fn from_mirror_plane(origin: Point3, normal: Vector3) -> Self {
        let n = normal.normalize();
        let r = DMat3::IDENTITY - DMat3::from_cols(n * n.x, n * n.y, n * n.z) * 2.0;
        let m = DMat4::from_translation(origin) * DMat4::from_mat3(r) * DMat4::from_translation(-origin);
        Self::from_mat4(m)
    }

    pub fn from_mat4(m: DMat4) -> Self {
        Self {
            matrix: m.to_cols_array(),
        }
    }

    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_cols_array(&self.matrix)
    }

    pub fn transform_point(&self, p: Point3) -> Point3 {
        self.to_mat4().transform_point3(p)
    }

    pub fn transform_vector(&self, v: Vector3) -> Vector3 {
        self.to_mat4().transform_vector3(v)
    }

    /// Signed uniform scale: the real cube root of the linear part's
    /// determinant, negative for orientation-reversing transforms.
    pub fn scale_factor(&self) -> f64 {
        DMat3::from_mat4(self.to_mat4()).determinant().cbrt()
    }

    pub fn then(&self, other: &Transform) -> Transform {
        Self::from_mat4(other.to_mat4() * self.to_mat4())
    }

    pub fn inverse(&self) -> Option<Transform> {
        let m = self.to_mat4();
        if m.determinant().abs() < 1e-15 {
            None
        } else {
            Some(Self::from_mat4(m.inverse()))
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Similarity transform in the plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transform2 {
    pub matrix: [f64; 9],
}

impl Transform2 {
    pub fn identity() -> Self {
        Self::from_mat3(DMat3::IDENTITY)
    }

    pub fn from_translation(t: Vector2) -> Self {
        Self::from_mat3(DMat3::from_translation(t))
    }

    /// Rotation by `angle` radians about `center`.
    pub fn from_rotation(center: Point2, angle: f64) -> Self {
        let m = DMat3::from_translation(center)
            * DMat3::from_angle(angle)
            * DMat3::from_translation(-center);
        Self::from_mat3(m)
    }

    pub fn from_scale(center: Point2, factor: f64) -> Self {
        let m = DMat3::from_translation(center)
            * DMat3::from_scale(Vector2::splat(factor))
            * DMat3::from_translation(-center);
        Self::from_mat3(m)
    }

    /// Reflection across the line through `origin` along `direction`.
    pub fn from_mirror_axis(origin: Point2, direction: Vector2) -> Self {
        let d = direction.normalize();
        // Householder reflection across the line's normal
        let n = Vector2::new(-d.y, d.x);
        let linear = glam::DMat2::IDENTITY - glam::DMat2::from_cols(n * n.x, n * n.y) * 2.0;
        let m = DMat3::from_translation(origin)
            * DMat3::from_mat2(linear)
            * DMat3::from_translation(-origin);
        Self::from_mat3(m)
    }

    pub fn from_mat3(m: DMat3) -> Self {
        Self {
            matrix: m.to_cols_array(),
        }
    }

    pub fn to_mat3(&self) -> DMat3 {
        DMat3::from_cols_array(&self.matrix)
    }

    pub fn transform_point(&self, p: Point2) -> Point2 {
        self.to_mat3().transform_point2(p)
    }

    pub fn transform_vector(&self, v: Vector2) -> Vector2 {
        self.to_mat3().transform_vector2(v)
    }

    /// Signed uniform scale, negative for reflections.
    pub fn scale_factor(&self) -> f64 {
        let m = self.to_mat3();
        let det = m.x_axis.x * m.y_axis.y - m.y_axis.x * m.x_axis.y;
        det.signum() * det.abs().sqrt()
    }

    pub fn then(&self, other: &Transform2) -> Transform2 {
        Self::from_mat3(other.to_mat3() * self.to_mat3())
    }
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::identity()
    }
}
