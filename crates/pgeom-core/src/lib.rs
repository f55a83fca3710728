//! pgeom core: error type, tolerances and continuity orders shared by
//! every geometry crate of the workspace.

pub mod continuity;
pub mod error;
pub mod tolerance;
pub mod traits;

pub use continuity::Continuity;
pub use error::{GeomError, Result};
pub use tolerance::Tolerance;
pub use traits::Validate;
