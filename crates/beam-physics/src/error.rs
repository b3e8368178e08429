//! Error types for beam-physics.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeamError {
    /// Physically invalid input to the transform or to beam construction.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Writing or reading a persisted beam failed.
    #[error("failed to persist beam at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BeamError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, BeamError>;
