//! Tolerance-based similarity between two equal-shaped raster buffers.
//!
//! `tolerance = round(255 / sensitivity)`; a sample pair matches when
//! `|a - b| <= tolerance`, and the score is the rounded percentage of matching
//! positions. Both roundings are half-to-even.
//!
//! ## Naming caveat
//!
//! The tolerance is *inversely* proportional to the sensitivity: a larger
//! sensitivity number shrinks the tolerance and makes the comparison stricter,
//! a smaller one makes it more forgiving. The mapping is kept as is because
//! recorded scores depend on it.

use crate::raster::{RasterBuffer, RasterError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimilarityError {
    #[error(transparent)]
    InvalidInput(#[from] RasterError),
    #[error("Shape mismatch: {}x{} vs {}x{}", left.0, left.1, right.0, right.1)]
    ShapeMismatch { left: (u32, u32), right: (u32, u32) },
    #[error("Sensitivity must be positive, got {0}")]
    InvalidSensitivity(u32),
}

/// Sensitivity values offered by the comparison view. Any positive value is
/// accepted; these are just the conventional choices.
pub const CONVENTIONAL_SENSITIVITIES: [u32; 8] = [1, 2, 4, 16, 32, 64, 128, 255];

/// Caller-supplied comparison strictness. Only positivity is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Sensitivity(NonZeroU32);

impl Sensitivity {
    pub fn new(value: u32) -> Result<Self, SimilarityError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(SimilarityError::InvalidSensitivity(value))
    }

    pub fn value(self) -> u32 {
        self.0.get()
    }

    /// Maximum per-sample difference still counted as a match.
    pub fn tolerance(self) -> u32 {
        (255.0 / f64::from(self.value())).round_ties_even() as u32
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self(NonZeroU32::new(16).unwrap_or(NonZeroU32::MIN))
    }
}

impl TryFrom<u32> for Sensitivity {
    type Error = SimilarityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Sensitivity> for u32 {
    fn from(sensitivity: Sensitivity) -> Self {
        sensitivity.value()
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Percentage (0-100) of sample positions whose values differ by at most the
/// sensitivity's tolerance.
///
/// Symmetric in its two buffers. Buffers need not be square, only equal in
/// shape.
pub fn similarity_score(
    original: &RasterBuffer,
    candidate: &RasterBuffer,
    sensitivity: Sensitivity,
) -> Result<u8, SimilarityError> {
    original.validate()?;
    candidate.validate()?;
    if original.dimensions() != candidate.dimensions() {
        return Err(SimilarityError::ShapeMismatch {
            left: original.dimensions(),
            right: candidate.dimensions(),
        });
    }

    let tolerance = sensitivity.tolerance();
    let matching = original
        .samples
        .iter()
        .zip(&candidate.samples)
        .filter(|&(&a, &b)| u32::from(a.abs_diff(b)) <= tolerance)
        .count();

    let percent = (matching as f64 * 100.0 / original.len() as f64).round_ties_even();
    Ok(percent as u8)
}
