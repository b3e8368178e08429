//! Error types for beam-generator.

use std::path::PathBuf;

use beam_physics::BeamError;
use thiserror::Error;

use crate::version::{GeneratorVersion, InstallStrategy};

#[derive(Debug, Error)]
pub enum BuildError {
    /// Malformed or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A configuration document could not be read.
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration document is not valid YAML or does not fit the schema.
    #[error("failed to parse {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The generator revision does not accept the transform chain where the
    /// negotiated strategy put it.
    #[error("generator {version} cannot take its transform chain {strategy}: {reason}")]
    GeneratorVersionMismatch {
        version: GeneratorVersion,
        strategy: InstallStrategy,
        reason: String,
    },

    /// Invalid physics input or a persistence failure, unchanged.
    #[error(transparent)]
    Beam(#[from] BeamError),
}

impl BuildError {
    /// Whether the error stems from configuration input (documents, schema).
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            BuildError::Config(_) | BuildError::Io { .. } | BuildError::Yaml { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
