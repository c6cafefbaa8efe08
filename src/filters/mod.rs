//! The filter engine: five pure transforms from one raster buffer to another.
//!
//! | Filter | Kind | Definition |
//! |---|---|---|
//! | **average** | convolution | 5x5 box blur, weights 1/25 |
//! | **sharpen** | convolution | `[[0,-1,0],[-1,5,-1],[0,-1,0]]` |
//! | **negative** | point | `255 - x` |
//! | **laplacian** | convolution | `[[0,1,0],[1,-4,1],[0,1,0]]` |
//! | **logarithm** | point | `ln(1 + x)` truncated to 8 bits, then `> 1 → 255` |
//!
//! Every filter validates its input (non-empty, sample count equals
//! `width * height`), never mutates it, and returns a buffer of identical
//! shape. Convolutions use reflect-101 borders and round half to even before
//! clamping into `0..=255`.
//!
//! The module is split into:
//! - **Kernel**: [`Kernel`] weights and the [`convolve`] driver
//! - **Point**: per-sample transforms ([`negative`], [`logarithm`])
//! - **FilterKind**: name parsing and dispatch

mod kernel;
mod point;

pub use kernel::{Kernel, convolve};
pub use point::{LOG_THRESHOLD, logarithm, negative};

use crate::raster::{RasterBuffer, RasterError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unknown filter: {0} (expected one of average, sharpen, negative, laplacian, logarithm)")]
    UnknownFilter(String),
    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// One of the five supported transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Average,
    Sharpen,
    Negative,
    Laplacian,
    Logarithm,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] = [
        FilterKind::Average,
        FilterKind::Sharpen,
        FilterKind::Negative,
        FilterKind::Laplacian,
        FilterKind::Logarithm,
    ];

    /// Lowercase name, used on the command line and in output file names.
    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Average => "average",
            FilterKind::Sharpen => "sharpen",
            FilterKind::Negative => "negative",
            FilterKind::Laplacian => "laplacian",
            FilterKind::Logarithm => "logarithm",
        }
    }

    /// Run the transform, producing a new buffer of the same shape.
    pub fn apply(self, input: &RasterBuffer) -> Result<RasterBuffer, RasterError> {
        match self {
            FilterKind::Average => convolve(input, &Kernel::box_blur()),
            FilterKind::Sharpen => convolve(input, &Kernel::sharpen()),
            FilterKind::Negative => negative(input),
            FilterKind::Laplacian => convolve(input, &Kernel::laplacian()),
            FilterKind::Logarithm => logarithm(input),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = FilterError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FilterError::UnknownFilter(s.to_string()))
    }
}

/// Parse `name` and apply that filter. Unknown names are rejected before any
/// pixel work happens.
pub fn apply_named(name: &str, input: &RasterBuffer) -> Result<RasterBuffer, FilterError> {
    let kind: FilterKind = name.parse()?;
    Ok(kind.apply(input)?)
}
