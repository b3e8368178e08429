//! Numeric precision of a beam
//!
//! Every scalar and every coordinate of a [`Beam`](crate::Beam) shares one
//! precision type. Transforms compute in `f64` and narrow once, at the end.

use std::fmt;

use bytemuck::Pod;
use num_traits::Float;

/// Floating-point type a beam is stored in.
pub trait Precision: Float + Pod + fmt::Debug + fmt::Display + Send + Sync + 'static {
    const KIND: PrecisionKind;

    /// Convert from the `f64` working precision (rounds for `f32`).
    fn narrow(value: f64) -> Self;

    fn widen(self) -> f64;
}

impl Precision for f32 {
    const KIND: PrecisionKind = PrecisionKind::F32;

    fn narrow(value: f64) -> Self {
        value as f32
    }

    fn widen(self) -> f64 {
        f64::from(self)
    }
}

impl Precision for f64 {
    const KIND: PrecisionKind = PrecisionKind::F64;

    fn narrow(value: f64) -> Self {
        value
    }

    fn widen(self) -> f64 {
        self
    }
}

/// Runtime tag for a [`Precision`] type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionKind {
    #[default]
    F32,
    F64,
}

impl PrecisionKind {
    /// Width of one scalar in bytes
    pub fn width(self) -> usize {
        match self {
            PrecisionKind::F32 => 4,
            PrecisionKind::F64 => 8,
        }
    }

    pub fn from_width(width: usize) -> Option<Self> {
        match width {
            4 => Some(PrecisionKind::F32),
            8 => Some(PrecisionKind::F64),
            _ => None,
        }
    }
}

impl fmt::Display for PrecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrecisionKind::F32 => f.write_str("f32"),
            PrecisionKind::F64 => f.write_str("f64"),
        }
    }
}
