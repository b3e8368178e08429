//! Lab-frame ⇄ canonical coordinate transform
//!
//! Canonical rows are `(x, px/p0c, y, py/p0c, z, (|p| - p0c)/p0c)` with
//! `z = ±(z_lab - β c t)`, the sign chosen by [`LongitudinalConvention`].

use glam::DVec3;

use crate::constants::PhysicalConstants;
use crate::error::{BeamError, Result};
use crate::particle::{LabParticle, ParticleCloud, Species};
use crate::precision::Precision;
use crate::tensor::{CanonicalRow, CoordinateTensor, PX, PY, PZ, X, Y, Z};

/// Sign of the longitudinal offset `z`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongitudinalConvention {
    /// `z = -β c t`: a particle arriving before the reference has `z > 0` (Bmad)
    #[default]
    AheadPositive,
    /// `z = β c t`
    AheadNegative,
}

impl LongitudinalConvention {
    fn sign(self) -> f64 {
        match self {
            LongitudinalConvention::AheadPositive => 1.0,
            LongitudinalConvention::AheadNegative => -1.0,
        }
    }
}

/// Maps a lab-frame [`ParticleCloud`] onto canonical coordinates referenced to
/// a design momentum `p0c`, and back.
///
/// Holds no state besides its configuration, so repeated calls with the same
/// input produce bit-identical output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    constants: PhysicalConstants,
    convention: LongitudinalConvention,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::new(PhysicalConstants::get())
    }
}

impl CoordinateTransform {
    pub fn new(constants: &PhysicalConstants) -> Self {
        Self {
            constants: *constants,
            convention: LongitudinalConvention::default(),
        }
    }

    pub fn with_convention(mut self, convention: LongitudinalConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn convention(&self) -> LongitudinalConvention {
        self.convention
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// Transform `cloud` into canonical rows normalized by `p0c` (eV/c).
    ///
    /// Row `i` of the result is particle `i` of the cloud.
    pub fn transform<P: Precision>(
        &self,
        cloud: &ParticleCloud,
        p0c: f64,
    ) -> Result<CoordinateTensor<P>> {
        check_reference_momentum(p0c)?;
        if cloud.is_empty() {
            return Err(BeamError::invalid("particle cloud is empty"));
        }

        let mc2 = cloud.species().rest_energy(&self.constants);
        let rows = cloud
            .iter()
            .enumerate()
            .map(|(index, particle)| self.canonical_row(index, particle, p0c, mc2))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Transformed {} {} particles to canonical coordinates (p0c = {p0c} eV/c, {})",
            rows.len(),
            cloud.species(),
            P::KIND
        );
        Ok(CoordinateTensor::from_rows(rows))
    }

    fn canonical_row<P: Precision>(
        &self,
        index: usize,
        particle: &LabParticle,
        p0c: f64,
        mc2: f64,
    ) -> Result<CanonicalRow<P>> {
        if !particle.is_finite() {
            return Err(BeamError::invalid(format!(
                "particle {index} has non-finite phase-space coordinates"
            )));
        }
        let [x, y, z_lab] = particle.position;
        let [px, py, pz] = particle.momentum;
        if pz <= 0.0 {
            return Err(BeamError::invalid(format!(
                "particle {index} is not moving forward: pz = {pz} eV/c"
            )));
        }

        let p = particle.total_momentum();
        let beta = p / p.hypot(mc2);
        let z = self.convention.sign() * (z_lab - beta * self.constants.c_light * particle.t);

        let mut row = [P::zero(); 6];
        row[X] = P::narrow(x);
        row[PX] = P::narrow(px / p0c);
        row[Y] = P::narrow(y);
        row[PY] = P::narrow(py / p0c);
        row[Z] = P::narrow(z);
        row[PZ] = P::narrow(momentum_deviation(px, py, pz, p, p0c));
        Ok(row)
    }

    /// Rebuild lab-frame particles from canonical rows.
    ///
    /// Particles are placed on the `z = 0` plane with the time that reproduces
    /// their longitudinal offset. Weights are zero.
    pub fn to_lab<P: Precision>(
        &self,
        tensor: &CoordinateTensor<P>,
        p0c: f64,
        species: Species,
    ) -> Result<ParticleCloud> {
        check_reference_momentum(p0c)?;
        if tensor.is_empty() {
            return Err(BeamError::invalid("coordinate tensor is empty"));
        }

        let mc2 = species.rest_energy(&self.constants);
        let particles = tensor
            .iter()
            .enumerate()
            .map(|(index, row)| self.lab_particle(index, row, p0c, mc2))
            .collect::<Result<Vec<_>>>()?;
        Ok(ParticleCloud::new(species, particles))
    }

    fn lab_particle<P: Precision>(
        &self,
        index: usize,
        row: &CanonicalRow<P>,
        p0c: f64,
        mc2: f64,
    ) -> Result<LabParticle> {
        let [x, px_norm, y, py_norm, z, delta] = row.map(|value| value.widen());

        let p = p0c * (1.0 + delta);
        let px = px_norm * p0c;
        let py = py_norm * p0c;
        let pz_squared = p * p - px * px - py * py;
        if pz_squared.is_nan() || pz_squared <= 0.0 {
            return Err(BeamError::invalid(format!(
                "row {index}: transverse momentum exceeds total momentum"
            )));
        }

        let beta = p / p.hypot(mc2);
        let t = -self.convention.sign() * z / (beta * self.constants.c_light);
        Ok(LabParticle::new(
            DVec3::new(x, y, 0.0),
            DVec3::new(px, py, pz_squared.sqrt()),
            t,
        ))
    }
}

/// `(|p| - p0c) / p0c`, rewritten as `(|p|² - p0c²) / (p0c (|p| + p0c))`
/// with `|p|² - p0c² = px² + py² + (pz - p0c)(pz + p0c)` so particles close
/// to the reference momentum keep their significant digits.
fn momentum_deviation(px: f64, py: f64, pz: f64, p: f64, p0c: f64) -> f64 {
    (px * px + py * py + (pz - p0c) * (pz + p0c)) / (p0c * (p + p0c))
}

fn check_reference_momentum(p0c: f64) -> Result<()> {
    if p0c.is_finite() && p0c > 0.0 {
        Ok(())
    } else {
        Err(BeamError::invalid(format!(
            "reference momentum must be positive and finite, got p0c = {p0c}"
        )))
    }
}
