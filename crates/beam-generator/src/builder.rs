//! Beam construction from configuration documents
//!
//! `build` runs generate → drift to z = 0 → canonical transform → [`Beam`].
//! Persisting is a separate stage, see [`BeamBuilder::build_and_persist`].

use std::path::{Path, PathBuf};

use beam_physics::{
    save_beam, Beam, BeamError, CoordinateTransform, ParticleCloud, Precision,
};

use crate::config::ConfigDocument;
use crate::error::Result;
use crate::generator::{DistGenerator, ParticleCloudGenerator};
use crate::version::InstallStrategy;

/// Longitudinal position every generated cloud is drifted to (m)
pub const START_Z: f64 = 0.0;

/// Composes a [`ParticleCloudGenerator`] with the canonical transform.
#[derive(Debug, Clone)]
pub struct BeamBuilder<G> {
    generator: G,
    transform: CoordinateTransform,
}

impl<G: ParticleCloudGenerator> BeamBuilder<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            transform: CoordinateTransform::default(),
        }
    }

    pub fn with_transform(mut self, transform: CoordinateTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Install `transforms` into `base`, generate, and drift to [`START_Z`].
    pub fn generate_cloud(
        &self,
        mut base: ConfigDocument,
        transforms: &ConfigDocument,
    ) -> Result<ParticleCloud> {
        let version = self.generator.version();
        let strategy = InstallStrategy::negotiate(version);
        log::debug!("Generator {version}: transform chain goes {strategy}");
        strategy.install(version, &mut base, transforms.transform_chain())?;

        let cloud = self.generator.generate(&base)?;
        log::info!("Generated {} {} particles", cloud.len(), cloud.species());
        Ok(cloud.drift_to_z(START_Z, self.transform.constants())?)
    }

    /// Build a beam at `s = 0` referenced to `p0c` (eV/c).
    ///
    /// Nothing is returned unless every stage succeeds.
    pub fn build<P: Precision>(
        &self,
        base: ConfigDocument,
        transforms: &ConfigDocument,
        p0c: f64,
    ) -> Result<Beam<P>> {
        if !(p0c.is_finite() && p0c > 0.0) {
            return Err(BeamError::InvalidInput(format!(
                "reference momentum must be positive and finite, got p0c = {p0c}"
            ))
            .into());
        }

        let cloud = self.generate_cloud(base, transforms)?;
        let coordinates = self.transform.transform::<P>(&cloud, p0c)?;
        let mc2 = cloud.species().rest_energy(self.transform.constants());

        let beam = Beam::with_particle_count(
            coordinates,
            cloud.len(),
            P::narrow(START_Z),
            P::narrow(p0c),
            P::narrow(mc2),
        )?;
        log::info!(
            "Built {} beam: {} particles, p0c = {} eV/c, mc2 = {} eV",
            P::KIND,
            beam.particle_count(),
            beam.p0c(),
            beam.mc2()
        );
        Ok(beam)
    }

    /// [`build`](Self::build), then persist to `destination` if one is given.
    ///
    /// A failed write does not discard the beam; it is reported in
    /// [`BuildOutcome::persisted`].
    pub fn build_and_persist<P: Precision>(
        &self,
        base: ConfigDocument,
        transforms: &ConfigDocument,
        p0c: f64,
        destination: Option<&Path>,
    ) -> Result<BuildOutcome<P>> {
        let beam = self.build(base, transforms, p0c)?;
        let persisted = destination.map(|path| save_beam(&beam, path));
        if let Some(Err(error)) = &persisted {
            log::warn!("{error}");
        }
        Ok(BuildOutcome { beam, persisted })
    }
}

/// A built beam plus the result of persisting it, if that was requested
#[derive(Debug)]
pub struct BuildOutcome<P: Precision> {
    pub beam: Beam<P>,
    pub persisted: Option<std::result::Result<PathBuf, BeamError>>,
}

impl<P: Precision> BuildOutcome<P> {
    pub fn persistence_error(&self) -> Option<&BeamError> {
        self.persisted.as_ref().and_then(|result| result.as_ref().err())
    }

    pub fn saved_to(&self) -> Option<&Path> {
        self.persisted
            .as_ref()
            .and_then(|result| result.as_ref().ok())
            .map(PathBuf::as_path)
    }

    pub fn into_beam(self) -> Beam<P> {
        self.beam
    }
}

/// Load both documents, build with the default [`DistGenerator`], and save to
/// `destination` when given.
pub fn create_beam_from_paths<P: Precision>(
    base_path: impl AsRef<Path>,
    transforms_path: impl AsRef<Path>,
    p0c: f64,
    destination: Option<&Path>,
) -> Result<BuildOutcome<P>> {
    let base = ConfigDocument::from_path(base_path)?;
    let transforms = ConfigDocument::from_path(transforms_path)?;
    BeamBuilder::new(DistGenerator::new()).build_and_persist(base, &transforms, p0c, destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::version::GeneratorVersion;
    use beam_physics::{LabParticle, Species};
    use glam::DVec3;

    /// Hands back the same cloud whatever the document says
    struct FixedCloud(ParticleCloud);

    impl ParticleCloudGenerator for FixedCloud {
        fn version(&self) -> GeneratorVersion {
            GeneratorVersion::new(1, 2, 0)
        }

        fn generate(&self, _config: &ConfigDocument) -> Result<ParticleCloud> {
            Ok(self.0.clone())
        }
    }

    struct Unreachable;

    impl ParticleCloudGenerator for Unreachable {
        fn version(&self) -> GeneratorVersion {
            GeneratorVersion::new(1, 0, 0)
        }

        fn generate(&self, _config: &ConfigDocument) -> Result<ParticleCloud> {
            panic!("generator must not run");
        }
    }

    fn electrons() -> ParticleCloud {
        let particles = [1.0e7, 1.01e7, 0.99e7]
            .into_iter()
            .map(|pz| LabParticle::new(DVec3::new(1.0e-3, 0.0, -2.0e-3), DVec3::new(0.0, 0.0, pz), 0.0))
            .collect();
        ParticleCloud::new(Species::Electron, particles)
    }

    #[test]
    fn test_rejects_bad_reference_momentum_before_generating() {
        let builder = BeamBuilder::new(Unreachable);
        for p0c in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = builder.build::<f64>(ConfigDocument::default(), &ConfigDocument::default(), p0c);
            assert!(matches!(result, Err(BuildError::Beam(BeamError::InvalidInput(_)))));
        }
    }

    #[test]
    fn test_generated_cloud_is_drifted_to_start() {
        let builder = BeamBuilder::new(FixedCloud(electrons()));
        let cloud = builder
            .generate_cloud(ConfigDocument::default(), &ConfigDocument::default())
            .unwrap();
        assert!(cloud.iter().all(|p| p.position[2] == START_Z));
        assert!(cloud.iter().all(|p| p.t > 0.0));
    }

    #[test]
    fn test_build_fills_reference_values() {
        let builder = BeamBuilder::new(FixedCloud(electrons()));
        let beam = builder
            .build::<f64>(ConfigDocument::default(), &ConfigDocument::default(), 1.0e7)
            .unwrap();

        assert_eq!(beam.particle_count(), 3);
        assert_eq!(beam.s(), 0.0);
        assert_eq!(beam.p0c(), 1.0e7);
        assert_eq!(beam.mc2(), beam_physics::M_ELECTRON);
        assert_eq!(beam.coordinates().row(0).map(|row| row[5]), Some(0.0));
    }

    #[test]
    fn test_outcome_without_destination() {
        let builder = BeamBuilder::new(FixedCloud(electrons()));
        let outcome = builder
            .build_and_persist::<f32>(ConfigDocument::default(), &ConfigDocument::default(), 1.0e7, None)
            .unwrap();

        assert!(outcome.persisted.is_none());
        assert!(outcome.persistence_error().is_none());
        assert!(outcome.saved_to().is_none());
        assert_eq!(outcome.into_beam().particle_count(), 3);
    }
}
