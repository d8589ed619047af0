//! Error types for photo-grid
//!
//! Component errors live next to their components; this is the error the
//! top-level grid operation reports to its host. Configuration problems are
//! caught once at startup and never reach a grid request.

use crate::flickr::RemoteServiceError;

/// Main error type for grid rendering
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// The photo service could not produce a page and nothing was cached
    #[error("Grid unavailable: {0}")]
    Unavailable(#[from] RemoteServiceError),
}

/// Result type alias for grid operations
pub type Result<T> = std::result::Result<T, GridError>;
