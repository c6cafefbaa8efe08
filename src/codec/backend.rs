//! Image I/O trait and shared error type.
//!
//! The [`ImageCodec`] trait is the seam between the pure core (filters,
//! similarity, batch sequencing) and anything that touches encoded bytes.
//! Production code uses [`RustCodec`](super::rust_codec::RustCodec); tests
//! use the in-memory `MockCodec` below so batch behaviour can be checked
//! without real files.

use crate::raster::RasterBuffer;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Codec failures. Every variant carries the path it concerns and is `Clone`
/// so it can be stored on a batch item and sent across the event channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Image file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
    #[error("Failed to write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
    #[error("Unsupported output format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Load and save grayscale raster buffers.
///
/// `load` returns an image already converted to grayscale and, for codecs
/// that enforce one, resized to the canonical size. `save` creates missing
/// parent directories and picks the encoding from the path's extension.
pub trait ImageCodec: Send + Sync {
    fn load(&self, path: &Path) -> Result<RasterBuffer, CodecError>;

    fn save(&self, buffer: &RasterBuffer, path: &Path) -> Result<(), CodecError>;
}

impl<C: ImageCodec + ?Sized> ImageCodec for std::sync::Arc<C> {
    fn load(&self, path: &Path) -> Result<RasterBuffer, CodecError> {
        (**self).load(path)
    }

    fn save(&self, buffer: &RasterBuffer, path: &Path) -> Result<(), CodecError> {
        (**self).save(buffer, path)
    }
}
