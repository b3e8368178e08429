//! Physical constants for beam generation
//!
//! Energies are in eV, momenta in eV/c, lengths in m and times in s. Values
//! are CODATA 2018.

use std::sync::LazyLock;

/// Speed of light in vacuum (m/s)
pub const C_LIGHT: f64 = 299_792_458.0;

/// Electron rest energy (eV)
pub const M_ELECTRON: f64 = 0.510_998_950_00e6;

/// Proton rest energy (eV)
pub const M_PROTON: f64 = 938.272_088_16e6;

static CONSTANTS: LazyLock<PhysicalConstants> = LazyLock::new(|| PhysicalConstants {
    c_light: C_LIGHT,
    m_electron: M_ELECTRON,
    m_proton: M_PROTON,
});

/// Read-only table of the constants used by unit conversions.
///
/// There is a single process-wide instance, see [`PhysicalConstants::get`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    /// Speed of light (m/s)
    pub c_light: f64,
    /// Electron rest energy (eV)
    pub m_electron: f64,
    /// Proton rest energy (eV)
    pub m_proton: f64,
}

impl PhysicalConstants {
    /// The process-wide table, initialized on first use.
    pub fn get() -> &'static PhysicalConstants {
        &CONSTANTS
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        *Self::get()
    }
}
