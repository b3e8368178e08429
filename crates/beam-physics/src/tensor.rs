//! N×6 canonical coordinate storage

use crate::error::{BeamError, Result};
use crate::precision::Precision;

/// Phase-space dimension of a canonical row
pub const PHASE_SPACE_DIM: usize = 6;

/// One particle in canonical form: `(x, px, y, py, z, pz)`
pub type CanonicalRow<P> = [P; PHASE_SPACE_DIM];

/// Column of the transverse horizontal offset (m)
pub const X: usize = 0;
/// Column of px / p0c
pub const PX: usize = 1;
/// Column of the transverse vertical offset (m)
pub const Y: usize = 2;
/// Column of py / p0c
pub const PY: usize = 3;
/// Column of the longitudinal offset from the reference particle (m)
pub const Z: usize = 4;
/// Column of (p - p0c) / p0c
pub const PZ: usize = 5;

/// Row-major canonical coordinates, one row per particle.
///
/// Row order is particle order and is never rearranged.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateTensor<P: Precision> {
    rows: Vec<CanonicalRow<P>>,
}

impl<P: Precision> CoordinateTensor<P> {
    pub fn from_rows(rows: Vec<CanonicalRow<P>>) -> Self {
        Self { rows }
    }

    /// Build from a flat row-major buffer.
    pub fn from_flat(values: Vec<P>) -> Result<Self> {
        if values.len() % PHASE_SPACE_DIM != 0 {
            return Err(BeamError::invalid(format!(
                "flat coordinate buffer of length {} is not a multiple of {PHASE_SPACE_DIM}",
                values.len()
            )));
        }
        let rows = values
            .chunks_exact(PHASE_SPACE_DIM)
            .map(|chunk| {
                let mut row = [P::zero(); PHASE_SPACE_DIM];
                row.copy_from_slice(chunk);
                row
            })
            .collect();
        Ok(Self { rows })
    }

    /// Number of particles (rows)
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(rows, 6)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), PHASE_SPACE_DIM)
    }

    pub fn row(&self, index: usize) -> Option<&CanonicalRow<P>> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalRow<P>> {
        self.rows.iter()
    }

    /// Values of one column, in particle order
    pub fn column(&self, column: usize) -> impl Iterator<Item = P> + '_ {
        self.rows.iter().map(move |row| row[column])
    }

    pub fn as_flat(&self) -> &[P] {
        bytemuck::cast_slice(&self.rows)
    }

    /// Raw bytes in host byte order
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.rows)
    }

    pub fn into_rows(self) -> Vec<CanonicalRow<P>> {
        self.rows
    }

    pub fn all_finite(&self) -> bool {
        self.as_flat().iter().all(|value| value.is_finite())
    }
}

impl<'a, P: Precision> IntoIterator for &'a CoordinateTensor<P> {
    type Item = &'a CanonicalRow<P>;
    type IntoIter = std::slice::Iter<'a, CanonicalRow<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
