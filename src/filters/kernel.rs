//! Convolution kernels and the reflect-101 convolution driver.
//!
//! Windows that extend past an edge take their samples from the mirror image
//! of the buffer across that edge, without repeating the edge sample itself
//! (`dcb|abcd|cba`). Zero padding or wrapping would change output values
//! near the borders.
//!
//! Rows are computed in parallel with rayon; every output row reads only from
//! the (immutable) input buffer, so the result does not depend on scheduling.

use crate::raster::{RasterBuffer, RasterError};
use rayon::prelude::*;

/// Square weight matrix with its anchor at `(size / 2, size / 2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// Build a kernel from row-major rows.
    pub fn from_rows<const N: usize>(rows: [[f64; N]; N]) -> Self {
        Self {
            size: N,
            weights: rows.iter().flatten().copied().collect(),
        }
    }

    /// `N x N` kernel of uniform weight `1 / N²` (box blur).
    pub fn uniform<const N: usize>() -> Self {
        let weight = 1.0 / (N * N) as f64;
        Self::from_rows([[weight; N]; N])
    }

    /// 5x5 box blur used by the average filter.
    pub fn box_blur() -> Self {
        Self::uniform::<5>()
    }

    /// Center-weighted high-pass plus original.
    pub fn sharpen() -> Self {
        Self::from_rows([[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]])
    }

    /// Discrete 4-neighbour Laplacian.
    pub fn laplacian() -> Self {
        Self::from_rows([[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]])
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn anchor(&self) -> usize {
        self.size / 2
    }

    #[inline]
    pub fn weight(&self, kx: usize, ky: usize) -> f64 {
        self.weights[ky * self.size + kx]
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Map a possibly out-of-range coordinate back into `0..len` by mirroring
/// across the edges without duplicating the edge sample.
#[inline]
pub(crate) fn reflect_101(pos: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let wrapped = pos.rem_euclid(period);
    if wrapped >= len as isize {
        (period - wrapped) as usize
    } else {
        wrapped as usize
    }
}

/// Round half to even, then saturate into the 8-bit range.
#[inline]
pub(crate) fn saturate(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Correlate `input` with `kernel` under reflect-101 borders.
///
/// The kernels used here are symmetric, so correlation and convolution
/// coincide. Output shape always equals input shape.
pub fn convolve(input: &RasterBuffer, kernel: &Kernel) -> Result<RasterBuffer, RasterError> {
    input.validate()?;
    let width = input.width as usize;
    let height = input.height as usize;
    let size = kernel.size();
    let anchor = kernel.anchor() as isize;

    // Column lookups are identical for every row; compute them once.
    let columns: Vec<usize> = (0..width)
        .flat_map(|x| (0..size).map(move |kx| reflect_101(x as isize + kx as isize - anchor, width)))
        .collect();

    let mut output = vec![0u8; width * height];
    output
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, dst) in row.iter_mut().enumerate() {
                let mut acc = 0.0f64;
                for ky in 0..size {
                    let sy = reflect_101(y as isize + ky as isize - anchor, height);
                    let src = &input.samples[sy * width..(sy + 1) * width];
                    for kx in 0..size {
                        let sx = columns[x * size + kx];
                        acc += kernel.weight(kx, ky) * f64::from(src[sx]);
                    }
                }
                *dst = saturate(acc);
            }
        });

    Ok(input.with_samples(output))
}
