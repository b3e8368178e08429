//! Beam: canonical coordinates plus their reference frame
//!
//! A [`Beam`] is built once from an owned [`CoordinateTensor`] and three
//! scalars, all in the same [`Precision`]. It exposes no mutators; stages that
//! propagate a beam build a new one with [`Beam::with_coordinates`] or
//! [`Beam::at_position`].

use crate::coordinates::CoordinateTransform;
use crate::error::{BeamError, Result};
use crate::particle::{ParticleCloud, Species};
use crate::precision::Precision;
use crate::tensor::CoordinateTensor;

#[derive(Debug, Clone, PartialEq)]
pub struct Beam<P: Precision = f32> {
    coordinates: CoordinateTensor<P>,
    /// Longitudinal reference position (m)
    s: P,
    /// Reference momentum (eV/c)
    p0c: P,
    /// Rest energy of the species (eV)
    mc2: P,
}

impl<P: Precision> Beam<P> {
    /// Validate and assemble a beam. The tensor is moved in.
    pub fn new(coordinates: CoordinateTensor<P>, s: P, p0c: P, mc2: P) -> Result<Self> {
        if !(p0c.is_finite() && p0c > P::zero()) {
            return Err(BeamError::invalid(format!(
                "reference momentum must be positive and finite, got p0c = {p0c}"
            )));
        }
        if !(mc2.is_finite() && mc2 > P::zero()) {
            return Err(BeamError::invalid(format!(
                "rest energy must be positive and finite, got mc2 = {mc2}"
            )));
        }
        if !s.is_finite() {
            return Err(BeamError::invalid(format!("beam position s = {s} is not finite")));
        }
        if coordinates.is_empty() {
            return Err(BeamError::invalid("beam has no particles"));
        }
        if !coordinates.all_finite() {
            return Err(BeamError::invalid("beam coordinates contain non-finite values"));
        }

        Ok(Self {
            coordinates,
            s,
            p0c,
            mc2,
        })
    }

    /// Like [`Beam::new`], also requiring exactly `particle_count` rows.
    pub fn with_particle_count(
        coordinates: CoordinateTensor<P>,
        particle_count: usize,
        s: P,
        p0c: P,
        mc2: P,
    ) -> Result<Self> {
        if coordinates.rows() != particle_count {
            return Err(BeamError::invalid(format!(
                "coordinate tensor has {} rows but the ensemble has {particle_count} particles",
                coordinates.rows()
            )));
        }
        Self::new(coordinates, s, p0c, mc2)
    }

    pub fn coordinates(&self) -> &CoordinateTensor<P> {
        &self.coordinates
    }

    pub fn s(&self) -> P {
        self.s
    }

    pub fn p0c(&self) -> P {
        self.p0c
    }

    pub fn mc2(&self) -> P {
        self.mc2
    }

    pub fn particle_count(&self) -> usize {
        self.coordinates.rows()
    }

    /// `(coordinates, s, p0c, mc2)`
    pub fn into_parts(self) -> (CoordinateTensor<P>, P, P, P) {
        (self.coordinates, self.s, self.p0c, self.mc2)
    }

    /// New beam in the same reference frame carrying `coordinates`.
    pub fn with_coordinates(&self, coordinates: CoordinateTensor<P>) -> Result<Self> {
        Self::new(coordinates, self.s, self.p0c, self.mc2)
    }

    /// New beam with the same coordinates, located at `s`.
    pub fn at_position(&self, s: P) -> Result<Self> {
        Self::new(self.coordinates.clone(), s, self.p0c, self.mc2)
    }

    /// Lab-frame view of this beam on the `z = 0` plane.
    ///
    /// `species` must carry the beam's rest energy.
    pub fn to_lab(&self, transform: &CoordinateTransform, species: Species) -> Result<ParticleCloud> {
        let expected = species.rest_energy(transform.constants());
        let mc2 = self.mc2.widen();
        if ((mc2 - expected) / expected).abs() > P::epsilon().widen() {
            return Err(BeamError::invalid(format!(
                "beam rest energy {mc2} eV does not match {species} rest energy {expected} eV"
            )));
        }
        transform.to_lab(&self.coordinates, self.p0c.widen(), species)
    }
}
