//! # Beam Physics
//!
//! Lab-frame particle clouds, the canonical (Bmad-style) phase-space
//! transform, and the [`Beam`] value handed to a tracking engine.

pub mod beam;
pub mod constants;
pub mod coordinates;
pub mod error;
pub mod particle;
pub mod persist;
pub mod precision;
pub mod tensor;

pub use beam::Beam;
pub use constants::*;
pub use coordinates::{CoordinateTransform, LongitudinalConvention};
pub use error::{BeamError, Result};
pub use particle::{LabParticle, ParticleCloud, Species};
pub use persist::{load_beam, save_beam};
pub use precision::{Precision, PrecisionKind};
pub use tensor::{CanonicalRow, CoordinateTensor, PHASE_SPACE_DIM};
