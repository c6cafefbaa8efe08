//! # pixelcraft
//!
//! Grayscale image filtering, tolerance-based similarity scoring, and a
//! cancellable batch runner that applies one filter across many images.
//!
//! # Architecture
//!
//! The pure core never touches the filesystem. Image I/O sits behind the
//! [`codec::ImageCodec`] trait, which the batch coordinator drives:
//!
//! ```text
//! source file ──codec.load──▶ RasterBuffer ──filter──▶ RasterBuffer ──codec.save──▶ output file
//!                                   │                        │
//!                                   └──── similarity_score ──┘   (optional readout)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`raster`] | `RasterBuffer`: row-major 8-bit grayscale samples with shape validation |
//! | [`filters`] | The five transforms: average, sharpen, negative, laplacian, logarithm |
//! | [`similarity`] | Percentage of samples within `round(255 / sensitivity)` of each other |
//! | [`codec`] | `ImageCodec` trait and the `image`-crate implementation (grayscale, canonical resize) |
//! | [`batch`] | Sequential worker with progress events, per-item failures and soft cancellation |
//! | [`config`] | `pixelcraft.toml` loading: stock defaults merged with a sparse user file |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Reflect-101 Borders
//!
//! Convolution windows that cross an edge read mirrored neighbours without
//! repeating the edge sample (`dcb|abcd|cba`). Zero padding or wrapping would
//! visibly darken or smear border rows.
//!
//! ## Half-to-Even Rounding
//!
//! Convolution results, the similarity tolerance and the similarity percentage
//! all round ties to even, so repeated runs and different platforms agree.
//!
//! ## Inherited Quirks
//!
//! The logarithm filter truncates `ln(1 + x)` to an 8-bit integer before
//! thresholding at 1, so its output is binary (every input of 7 or more
//! becomes white). The similarity "sensitivity" is inversely related to the
//! tolerance: higher values are stricter. Both are kept for compatibility with
//! existing scores and outputs.

pub mod batch;
pub mod codec;
pub mod config;
pub mod filters;
pub mod output;
pub mod raster;
pub mod similarity;

#[cfg(test)]
pub(crate) mod test_helpers;
