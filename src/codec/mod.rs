//! Image I/O collaborator: decode to a grayscale [`RasterBuffer`](crate::raster::RasterBuffer)
//! and encode one back to disk.
//!
//! | Operation | Behaviour |
//! |---|---|
//! | **load** | missing path → `NotFound`; undecodable → `Decode`; grayscale, resized to the canonical size (450x450 by default) |
//! | **save** | parent directories created; format from extension; failures → `Write` / `UnsupportedFormat` |
//!
//! The module is split into:
//! - **Backend**: [`ImageCodec`] trait + [`CodecError`]
//! - **RustCodec**: the `image`-crate implementation and supported extensions

pub mod backend;
pub mod rust_codec;

pub use backend::{CodecError, ImageCodec};
pub use rust_codec::{
    DEFAULT_CANONICAL_SIZE, RustCodec, is_supported_image, supported_input_extensions,
};
