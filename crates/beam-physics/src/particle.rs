//! Lab-frame particle records and clouds

use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::PhysicalConstants;
use crate::error::{BeamError, Result};

/// Particle species making up a beam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Electron,
    Positron,
    Proton,
}

impl Species {
    /// Rest energy mc² (eV)
    pub fn rest_energy(self, constants: &PhysicalConstants) -> f64 {
        match self {
            Species::Electron | Species::Positron => constants.m_electron,
            Species::Proton => constants.m_proton,
        }
    }

    /// Charge in units of the elementary charge
    pub fn charge_number(self) -> i32 {
        match self {
            Species::Electron => -1,
            Species::Positron | Species::Proton => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Electron => "electron",
            Species::Positron => "positron",
            Species::Proton => "proton",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lab-frame phase-space record of one macro-particle
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LabParticle {
    /// Position (m)
    pub position: [f64; 3],
    /// Kinetic momentum (eV/c)
    pub momentum: [f64; 3],
    /// Time (s)
    pub t: f64,
    /// Macro-particle charge (C)
    pub weight: f64,
}

impl LabParticle {
    pub fn new(position: DVec3, momentum: DVec3, t: f64) -> Self {
        Self {
            position: position.to_array(),
            momentum: momentum.to_array(),
            t,
            weight: 0.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn position(&self) -> DVec3 {
        DVec3::from_array(self.position)
    }

    pub fn momentum(&self) -> DVec3 {
        DVec3::from_array(self.momentum)
    }

    /// |p| (eV/c)
    pub fn total_momentum(&self) -> f64 {
        self.momentum().length()
    }

    /// Total energy sqrt(p² + (mc²)²) (eV)
    pub fn energy(&self, mc2: f64) -> f64 {
        self.total_momentum().hypot(mc2)
    }

    /// v/c
    pub fn beta(&self, mc2: f64) -> f64 {
        self.total_momentum() / self.energy(mc2)
    }

    pub fn is_finite(&self) -> bool {
        self.position().is_finite() && self.momentum().is_finite() && self.t.is_finite()
    }
}

/// Ordered ensemble of lab-frame particles of one species
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleCloud {
    species: Species,
    particles: Vec<LabParticle>,
}

impl ParticleCloud {
    pub fn new(species: Species, particles: Vec<LabParticle>) -> Self {
        Self { species, particles }
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[LabParticle] {
        &self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabParticle> {
        self.particles.iter()
    }

    pub fn into_particles(self) -> Vec<LabParticle> {
        self.particles
    }

    /// Sum of macro-particle weights (C)
    pub fn total_charge(&self) -> f64 {
        self.particles.iter().map(|p| p.weight).sum()
    }

    /// Unweighted mean momentum (eV/c), `None` for an empty cloud
    pub fn mean_momentum(&self) -> Option<DVec3> {
        if self.particles.is_empty() {
            return None;
        }
        let sum: DVec3 = self.particles.iter().map(LabParticle::momentum).sum();
        Some(sum / self.particles.len() as f64)
    }

    /// Drift every particle ballistically to the plane `z`.
    ///
    /// Transverse positions follow the particle slope `p⊥ / pz` and the time
    /// advances by `Δz / vz`. Particles already on the plane are untouched.
    /// Fails if a particle off the plane does not move forward (`pz <= 0`).
    pub fn drift_to_z(mut self, z: f64, constants: &PhysicalConstants) -> Result<Self> {
        if !z.is_finite() {
            return Err(BeamError::invalid(format!("drift target z = {z} is not finite")));
        }
        let mc2 = self.species.rest_energy(constants);

        for (index, particle) in self.particles.iter_mut().enumerate() {
            let dz = z - particle.position[2];
            if dz == 0.0 {
                continue;
            }
            let [px, py, pz] = particle.momentum;
            if pz.is_nan() || pz <= 0.0 {
                return Err(BeamError::invalid(format!(
                    "particle {index} cannot drift to z = {z}: pz = {pz} eV/c"
                )));
            }
            let energy = particle.energy(mc2);
            particle.position[0] += px / pz * dz;
            particle.position[1] += py / pz * dz;
            particle.position[2] = z;
            // vz = c pz / E
            particle.t += dz * energy / (constants.c_light * pz);
        }

        log::debug!("Drifted {} particles to z = {z} m", self.particles.len());
        Ok(self)
    }
}

impl<'a> IntoIterator for &'a ParticleCloud {
    type Item = &'a LabParticle;
    type IntoIter = std::slice::Iter<'a, LabParticle>;

    fn into_iter(self) -> Self::IntoIter {
        self.particles.iter()
    }
}
