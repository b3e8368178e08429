//! # Beam Generator
//!
//! Samples lab-frame particle clouds from declarative YAML documents and
//! turns them into canonical [`Beam`](beam_physics::Beam)s ready for tracking.

pub mod builder;
pub mod config;
pub mod error;
pub mod generator;
pub mod params;
pub mod version;

pub use builder::{create_beam_from_paths, BeamBuilder, BuildOutcome};
pub use config::ConfigDocument;
pub use error::{BuildError, Result};
pub use generator::{DistGenerator, ParticleCloudGenerator};
pub use params::{Dist, DistributionParams, TransformChain, TransformSpec, Variable};
pub use version::{GeneratorVersion, InstallStrategy};
