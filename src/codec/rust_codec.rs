//! Pure Rust codec built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, BMP, TIFF) | `image::ImageReader` with format sniffing |
//! | Grayscale conversion | `DynamicImage::to_luma8` |
//! | Canonical resize | `image::imageops::resize` with `Triangle` (bilinear) |
//! | Encode | `ImageBuffer::save`, format chosen from the extension |

use super::backend::{CodecError, ImageCodec};
use crate::raster::RasterBuffer;
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader};
use std::path::Path;
use std::sync::LazyLock;

/// Width and height every loaded image is resized to unless configured
/// otherwise.
pub const DEFAULT_CANONICAL_SIZE: (u32, u32) = (450, 450);

const RASTER_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("bmp", ImageFormat::Bmp),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    RASTER_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the raster file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` carries one of the [supported extensions](supported_input_extensions)
/// (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Grayscale codec with an optional canonical resize on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RustCodec {
    canonical_size: Option<(u32, u32)>,
}

impl RustCodec {
    pub fn new() -> Self {
        Self::with_canonical_size(DEFAULT_CANONICAL_SIZE.0, DEFAULT_CANONICAL_SIZE.1)
    }

    pub fn with_canonical_size(width: u32, height: u32) -> Self {
        Self {
            canonical_size: Some((width, height)),
        }
    }

    /// Load images at their native size.
    pub fn without_resize() -> Self {
        Self {
            canonical_size: None,
        }
    }

    pub fn canonical_size(&self) -> Option<(u32, u32)> {
        self.canonical_size
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec for RustCodec {
    fn load(&self, path: &Path) -> Result<RasterBuffer, CodecError> {
        if !path.is_file() {
            return Err(CodecError::NotFound(path.to_path_buf()));
        }
        let decode_error = |message: String| CodecError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let image = ImageReader::open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CodecError::NotFound(path.to_path_buf()),
                _ => decode_error(e.to_string()),
            })?
            .with_guessed_format()
            .map_err(|e| decode_error(e.to_string()))?
            .decode()
            .map_err(|e| decode_error(e.to_string()))?;

        let mut gray = image.to_luma8();
        if let Some((width, height)) = self.canonical_size
            && gray.dimensions() != (width, height)
        {
            gray = image::imageops::resize(&gray, width, height, FilterType::Triangle);
        }
        Ok(RasterBuffer::from(gray))
    }

    fn save(&self, buffer: &RasterBuffer, path: &Path) -> Result<(), CodecError> {
        let writable = ImageFormat::from_path(path)
            .ok()
            .is_some_and(|fmt| fmt.writing_enabled());
        if !writable {
            return Err(CodecError::UnsupportedFormat(path.to_path_buf()));
        }
        let write_error = |message: String| CodecError::Write {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }
        let gray = buffer
            .to_gray_image()
            .map_err(|e| write_error(e.to_string()))?;
        gray.save(path).map_err(|e| write_error(e.to_string()))
    }
}
