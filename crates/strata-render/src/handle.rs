//! Opaque references to geometry owned by the graphics backend.

use std::fmt;

/// Backend-issued identifier for uploaded geometry (vertex + index buffers).
///
/// The core never inspects the value; it only stores it and hands it back for
/// drawing or release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeometryHandle(pub u64);

impl fmt::Display for GeometryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "geometry#{}", self.0)
    }
}

/// A backend failed to turn height data into drawable geometry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("geometry upload failed: {reason}")]
pub struct UploadError {
    pub reason: String,
}

impl UploadError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
