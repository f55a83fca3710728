use thiserror::Error;

/// Hard failures of geometric operations.
///
/// Degenerate evaluations are not errors: the `eval_*` primitives report
/// them as `Ok(None)`. Best-effort edits report through `bool` or a status
/// enum instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeomError {
    #[error("Construction error: {0}")]
    Construction(String),

    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("No such object: {0}")]
    NoSuchObject(String),

    #[error("Undefined derivative: {0}")]
    UndefinedDerivative(String),

    #[error("Undefined value: {0}")]
    UndefinedValue(String),
}

impl GeomError {
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    pub fn no_such_object(msg: impl Into<String>) -> Self {
        Self::NoSuchObject(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, GeomError>;
