//! Shared test utilities for the pixelcraft test suite.
//!
//! Provides synthetic raster fixtures (uniform, gradient, edge square,
//! deterministic noise) and helpers that write them to disk as real image
//! files for codec and batch tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = write_png(tmp.path(), "noise.png", &noisy(64, 64, 7));
//! let loaded = RustCodec::without_resize().load(&path).unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::raster::RasterBuffer;

// =========================================================================
// Synthetic buffers
// =========================================================================

/// Every sample set to `value`.
pub fn uniform(width: u32, height: u32, value: u8) -> RasterBuffer {
    RasterBuffer::filled(width, height, value)
}

/// Horizontal ramp from 0 at the left edge to 255 at the right edge.
pub fn gradient(width: u32, height: u32) -> RasterBuffer {
    RasterBuffer::from_fn(width, height, |x, _| {
        if width == 1 {
            0
        } else {
            (x * 255 / (width - 1)) as u8
        }
    })
}

/// Black background with a white square covering `[40%, 60%)` of each axis.
///
/// At 100x100 this is the square `[40, 60) x [40, 60)`.
pub fn edge_square(width: u32, height: u32) -> RasterBuffer {
    let (x0, x1) = (width * 2 / 5, width * 3 / 5);
    let (y0, y1) = (height * 2 / 5, height * 3 / 5);
    RasterBuffer::from_fn(width, height, |x, y| {
        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
            255
        } else {
            0
        }
    })
}

/// Mid-gray with deterministic pseudo-random noise (roughly ±60 around 128).
pub fn noisy(width: u32, height: u32, seed: u64) -> RasterBuffer {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        // xorshift64*
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        (state.wrapping_mul(2685821657736338717) >> 56) as i32
    };
    RasterBuffer::from_fn(width, height, |_, _| {
        // Sum of two uniform bytes centred on zero: triangular noise in [-255, 255] / 4.
        let noise = (next() + next() - 255) / 4;
        (128 + noise).clamp(0, 255) as u8
    })
}

// =========================================================================
// Disk fixtures
// =========================================================================

/// Encode `buffer` as PNG at `dir/name` and return the path.
pub fn write_png(dir: &Path, name: &str, buffer: &RasterBuffer) -> PathBuf {
    let path = dir.join(name);
    buffer.to_gray_image().unwrap().save(&path).unwrap();
    path
}

/// Write a file with an image extension but garbage content.
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"definitely not an image").unwrap();
    path
}
