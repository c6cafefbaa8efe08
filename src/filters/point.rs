//! Per-sample transforms (no neighbourhood, no border handling).

use crate::raster::{RasterBuffer, RasterError};

/// Levels strictly above this (after truncating `ln(1 + x)` to 8 bits)
/// become white in the logarithm filter.
pub const LOG_THRESHOLD: u8 = 1;

/// `255 - x` for every sample.
pub fn negative(input: &RasterBuffer) -> Result<RasterBuffer, RasterError> {
    input.validate()?;
    Ok(input.with_samples(input.samples.iter().map(|&s| 255 - s).collect()))
}

/// Truncated natural log followed by a fixed binary threshold.
///
/// `ln(1 + x)` on the raw 0-255 domain tops out near 5.5, so after the
/// truncation to 8 bits only levels 0..=5 exist and the threshold at 1 splits
/// inputs into `x < 7` (black) and `x >= 7` (white). The output is always a
/// binary image. This is inherited behaviour, kept bit-exact on purpose; it is
/// not a tone-mapping log transform.
pub fn logarithm(input: &RasterBuffer) -> Result<RasterBuffer, RasterError> {
    input.validate()?;
    let table: [u8; 256] = std::array::from_fn(|value| {
        let level = (value as f64).ln_1p() as u8;
        if level > LOG_THRESHOLD { 255 } else { 0 }
    });
    Ok(input.with_samples(input.samples.iter().map(|&s| table[s as usize]).collect()))
}
