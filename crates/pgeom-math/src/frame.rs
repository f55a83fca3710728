use crate::{Point3, Transform, Vector3};
use pgeom_core::{GeomError, Result, Tolerance};
use serde::{Deserialize, Serialize};

/// A local coordinate system in space: origin plus three unit axes.
///
/// `z_dir` is the main direction. The system is direct when
/// `x_dir × y_dir == z_dir` and indirect when the product is `-z_dir`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub origin: Point3,
    pub x_dir: Vector3,
    pub y_dir: Vector3,
    pub z_dir: Vector3,
}

impl Frame {
    /// Direct frame with main direction `z_dir` and x axis as close as
    /// possible to `x_hint`.
    pub fn new(origin: Point3, z_dir: Vector3, x_hint: Vector3) -> Result<Self> {
        let z = z_dir
            .try_normalize()
            .ok_or_else(|| GeomError::construction("frame main direction is null"))?;
        let x = (x_hint - z * x_hint.dot(z))
            .try_normalize()
            .ok_or_else(|| GeomError::construction("frame x direction is parallel to main direction"))?;
        Ok(Self {
            origin,
            x_dir: x,
            y_dir: z.cross(x),
            z_dir: z,
        })
    }

    /// Direct frame from a main direction only, choosing an x axis.
    pub fn from_axis(origin: Point3, z_dir: Vector3) -> Result<Self> {
        let z = z_dir
            .try_normalize()
            .ok_or_else(|| GeomError::construction("frame main direction is null"))?;
        let hint = if z.x.abs() < 0.9 { Vector3::X } else { Vector3::Y };
        Self::new(origin, z, hint)
    }

    /// The standard frame at the world origin.
    pub fn world() -> Self {
        Self {
            origin: Point3::ZERO,
            x_dir: Vector3::X,
            y_dir: Vector3::Y,
            z_dir: Vector3::Z,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.x_dir.cross(self.y_dir).dot(self.z_dir) > 0.0
    }

    pub fn reverse_x(&mut self) {
        self.x_dir = -self.x_dir;
    }

    pub fn reverse_y(&mut self) {
        self.y_dir = -self.y_dir;
    }

    pub fn reverse_z(&mut self) {
        self.z_dir = -self.z_dir;
    }

    pub fn transform(&mut self, t: &Transform) {
        self.origin = t.transform_point(self.origin);
        self.x_dir = t.transform_vector(self.x_dir).normalize();
        self.y_dir = t.transform_vector(self.y_dir).normalize();
        self.z_dir = t.transform_vector(self.z_dir).normalize();
    }

    /// Whether the three axes are unit length and mutually orthogonal.
    pub fn is_orthonormal(&self) -> bool {
        let eps = Tolerance::ANGULAR.max(1e-9);
        (self.x_dir.length() - 1.0).abs() <= eps
            && (self.y_dir.length() - 1.0).abs() <= eps
            && (self.z_dir.length() - 1.0).abs() <= eps
            && self.x_dir.dot(self.y_dir).abs() <= eps
            && self.x_dir.dot(self.z_dir).abs() <= eps
            && self.y_dir.dot(self.z_dir).abs() <= eps
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::world()
    }
}
