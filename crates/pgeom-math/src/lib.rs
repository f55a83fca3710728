//! pgeom math primitives: vectors, similarity transforms, local frames and
//! the 2D/3D space abstraction.

pub mod frame;
pub mod space;
pub mod transform;

pub use glam::{DMat3, DMat4, DVec2, DVec3, DVec4};
pub use frame::Frame;
pub use space::Space;
pub use transform::{Transform, Transform2};

pub type Point2 = DVec2;
pub type Point3 = DVec3;
pub type Vector2 = DVec2;
pub type Vector3 = DVec3;
