//! Distribution parameters and the transform chain

use beam_physics::{LabParticle, Species};
use glam::DVec3;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::config::describe;
use crate::error::{BuildError, Result};

/// Key of the optional explicit ordering inside a transform chain
pub const ORDER_KEY: &str = "order";

/// Phase-space variable of a lab-frame particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variable {
    X,
    Y,
    Z,
    Px,
    Py,
    Pz,
    T,
}

impl Variable {
    pub fn get(self, particle: &LabParticle) -> f64 {
        match self {
            Variable::X => particle.position[0],
            Variable::Y => particle.position[1],
            Variable::Z => particle.position[2],
            Variable::Px => particle.momentum[0],
            Variable::Py => particle.momentum[1],
            Variable::Pz => particle.momentum[2],
            Variable::T => particle.t,
        }
    }

    pub fn set(self, particle: &mut LabParticle, value: f64) {
        match self {
            Variable::X => particle.position[0] = value,
            Variable::Y => particle.position[1] = value,
            Variable::Z => particle.position[2] = value,
            Variable::Px => particle.momentum[0] = value,
            Variable::Py => particle.momentum[1] = value,
            Variable::Pz => particle.momentum[2] = value,
            Variable::T => particle.t = value,
        }
    }
}

/// One-dimensional base distribution
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dist {
    Constant {
        #[serde(default)]
        value: f64,
    },
    Gaussian {
        #[serde(default)]
        avg: f64,
        sigma: f64,
    },
    Uniform {
        min: f64,
        max: f64,
    },
}

impl Default for Dist {
    fn default() -> Self {
        Dist::Constant { value: 0.0 }
    }
}

impl Dist {
    fn sampler(&self, name: &str) -> Result<Sampler> {
        let invalid = |detail: String| BuildError::Config(format!("{name}: {detail}"));
        match *self {
            Dist::Constant { value } if value.is_finite() => Ok(Sampler::Constant(value)),
            Dist::Constant { value } => Err(invalid(format!("constant {value} is not finite"))),
            Dist::Gaussian { avg, sigma } => {
                if !avg.is_finite() {
                    return Err(invalid(format!("gaussian average {avg} is not finite")));
                }
                if !(sigma.is_finite() && sigma >= 0.0) {
                    return Err(invalid(format!("gaussian sigma {sigma} must be finite and non-negative")));
                }
                Normal::new(avg, sigma)
                    .map(Sampler::Normal)
                    .map_err(|error| invalid(format!("gaussian sigma {sigma}: {error}")))
            }
            Dist::Uniform { min, max } if min == max && min.is_finite() => Ok(Sampler::Constant(min)),
            Dist::Uniform { min, max } => Uniform::new(min, max)
                .map(Sampler::Uniform)
                .map_err(|error| invalid(format!("uniform range [{min}, {max}]: {error}"))),
        }
    }
}

enum Sampler {
    Constant(f64),
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
}

impl Sampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampler::Constant(value) => *value,
            Sampler::Normal(normal) => normal.sample(rng),
            Sampler::Uniform(uniform) => uniform.sample(rng),
        }
    }
}

fn default_species() -> Species {
    Species::Electron
}

/// Base distribution of a generated cloud
///
/// Positions in m, momenta in eV/c, time in s, charge in C. Unknown keys
/// (including `transforms`) are ignored here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DistributionParams {
    pub n_particle: usize,
    #[serde(default = "default_species")]
    pub species: Species,
    #[serde(default)]
    pub random_seed: u64,
    #[serde(default)]
    pub total_charge: f64,
    #[serde(default)]
    pub x_dist: Dist,
    #[serde(default)]
    pub y_dist: Dist,
    #[serde(default)]
    pub z_dist: Dist,
    #[serde(default)]
    pub px_dist: Dist,
    #[serde(default)]
    pub py_dist: Dist,
    #[serde(default)]
    pub pz_dist: Dist,
    #[serde(default)]
    pub t_dist: Dist,
}

impl DistributionParams {
    /// Draw `n_particle` particles, each variable independently.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<LabParticle>> {
        if self.n_particle == 0 {
            return Err(BuildError::Config("n_particle must be positive".to_string()));
        }
        if !self.total_charge.is_finite() {
            return Err(BuildError::Config(format!(
                "total_charge {} is not finite",
                self.total_charge
            )));
        }
        if self.total_charge * f64::from(self.species.charge_number()) < 0.0 {
            log::warn!(
                "total_charge {} C has the opposite sign of a {} bunch",
                self.total_charge,
                self.species
            );
        }

        let samplers = [
            (Variable::X, self.x_dist.sampler("x_dist")?),
            (Variable::Y, self.y_dist.sampler("y_dist")?),
            (Variable::Z, self.z_dist.sampler("z_dist")?),
            (Variable::Px, self.px_dist.sampler("px_dist")?),
            (Variable::Py, self.py_dist.sampler("py_dist")?),
            (Variable::Pz, self.pz_dist.sampler("pz_dist")?),
            (Variable::T, self.t_dist.sampler("t_dist")?),
        ];
        let weight = self.total_charge / self.n_particle as f64;

        let mut particles = Vec::new();
        particles.try_reserve_exact(self.n_particle).map_err(|error| {
            BuildError::Config(format!("n_particle {} is too large: {error}", self.n_particle))
        })?;
        particles.extend((0..self.n_particle).map(|_| {
            let mut particle = LabParticle::new(DVec3::ZERO, DVec3::ZERO, 0.0).with_weight(weight);
            for (variable, sampler) in &samplers {
                variable.set(&mut particle, sampler.sample(rng));
            }
            particle
        }));
        Ok(particles)
    }
}

/// One step of the transform chain
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformSpec {
    /// `v += offset`
    Translate { variable: Variable, offset: f64 },
    /// `v *= factor`
    Scale { variable: Variable, factor: f64 },
    /// `v += slope * source`, e.g. an energy chirp `pz += k t`
    Linear {
        variable: Variable,
        source: Variable,
        slope: f64,
    },
    /// Shift and stretch `v` to the given mean and standard deviation
    SetAvgStd { variable: Variable, avg: f64, std: f64 },
}

impl TransformSpec {
    /// Reject parameters no particle set could be transformed with.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let (label, value) = match *self {
            TransformSpec::Translate { offset, .. } => ("offset", offset),
            TransformSpec::Scale { factor, .. } => ("factor", factor),
            TransformSpec::Linear { slope, .. } => ("slope", slope),
            TransformSpec::SetAvgStd { avg, std, .. } => {
                if !(std.is_finite() && std >= 0.0) {
                    return Err(format!("std {std} must be finite and non-negative"));
                }
                ("avg", avg)
            }
        };
        if value.is_finite() {
            Ok(())
        } else {
            Err(format!("{label} {value} is not finite"))
        }
    }

    pub fn apply(&self, particles: &mut [LabParticle]) -> Result<()> {
        match *self {
            TransformSpec::Translate { variable, offset } => {
                for particle in particles.iter_mut() {
                    let value = variable.get(particle) + offset;
                    variable.set(particle, value);
                }
            }
            TransformSpec::Scale { variable, factor } => {
                for particle in particles.iter_mut() {
                    let value = variable.get(particle) * factor;
                    variable.set(particle, value);
                }
            }
            TransformSpec::Linear {
                variable,
                source,
                slope,
            } => {
                for particle in particles.iter_mut() {
                    let value = variable.get(particle) + slope * source.get(particle);
                    variable.set(particle, value);
                }
            }
            TransformSpec::SetAvgStd { variable, avg, std } => {
                self.validate()
                    .map_err(|detail| BuildError::Config(format!("set_avg_std: {detail}")))?;
                if particles.is_empty() {
                    return Ok(());
                }
                let n = particles.len() as f64;
                let mean = particles.iter().map(|p| variable.get(p)).sum::<f64>() / n;
                let variance = particles
                    .iter()
                    .map(|p| (variable.get(p) - mean).powi(2))
                    .sum::<f64>()
                    / n;
                let current = variance.sqrt();
                let stretch = if current > 0.0 {
                    std / current
                } else {
                    if std > 0.0 {
                        log::warn!("set_avg_std: {variable:?} has zero spread, only its mean is set");
                    }
                    1.0
                };
                for particle in particles.iter_mut() {
                    let value = avg + (variable.get(particle) - mean) * stretch;
                    variable.set(particle, value);
                }
            }
        }
        Ok(())
    }
}

/// Named transforms, applied in document order unless an `order` list is given
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformChain {
    steps: Vec<(String, TransformSpec)>,
}

impl TransformChain {
    pub fn from_value(value: &Value) -> Result<Self> {
        let mapping = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(BuildError::Config(format!(
                    "transform chain must be a mapping, found {}",
                    describe(other)
                )))
            }
        };

        let mut steps = Vec::with_capacity(mapping.len());
        for (key, spec) in mapping {
            let name = key.as_str().ok_or_else(|| {
                BuildError::Config(format!("transform names must be strings, found {}", describe(key)))
            })?;
            if name == ORDER_KEY {
                continue;
            }
            let spec: TransformSpec =
                serde_yaml::from_value(spec.clone()).map_err(|source| BuildError::Yaml {
                    origin: format!("transform '{name}'"),
                    source,
                })?;
            spec.validate()
                .map_err(|detail| BuildError::Config(format!("transform '{name}': {detail}")))?;
            steps.push((name.to_string(), spec));
        }

        match mapping.get(ORDER_KEY) {
            Some(order) => Self::reorder(steps, order, mapping),
            None => Ok(Self { steps }),
        }
    }

    fn reorder(steps: Vec<(String, TransformSpec)>, order: &Value, mapping: &Mapping) -> Result<Self> {
        let names = order
            .as_sequence()
            .ok_or_else(|| BuildError::Config(format!("`{ORDER_KEY}` must be a sequence of transform names")))?;

        let mut ordered: Vec<(String, TransformSpec)> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_str().unwrap_or_default();
            if ordered.iter().any(|(seen, _)| seen == name) {
                return Err(BuildError::Config(format!("`{ORDER_KEY}` lists transform '{name}' twice")));
            }
            let step = steps
                .iter()
                .find(|(candidate, _)| candidate == name)
                .ok_or_else(|| BuildError::Config(format!("`{ORDER_KEY}` names unknown transform '{name}'")))?;
            ordered.push(step.clone());
        }
        if ordered.len() + 1 < mapping.len() {
            log::warn!(
                "Transform chain lists {} of {} transforms in `{ORDER_KEY}`; the rest are skipped",
                ordered.len(),
                mapping.len() - 1
            );
        }
        Ok(Self { steps: ordered })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|(name, _)| name.as_str())
    }

    pub fn apply(&self, particles: &mut [LabParticle]) -> Result<()> {
        for (name, spec) in &self.steps {
            log::debug!("Applying transform '{name}': {spec:?}");
            spec.apply(particles)?;
        }
        Ok(())
    }
}
