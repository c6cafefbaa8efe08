//! The grayscale raster buffer every other module operates on.
//!
//! A [`RasterBuffer`] is a plain row-major grid of 8-bit intensity samples.
//! Fields are public so callers (and tests) can build buffers directly; any
//! consumer that depends on the `samples.len() == width * height` invariant
//! calls [`RasterBuffer::validate`] first instead of trusting construction.
//!
//! Conversion to and from [`image::GrayImage`] is provided for the codec
//! layer. Nothing in this module mutates a buffer in place: filters always
//! produce a fresh buffer via [`RasterBuffer::with_samples`].

use image::GrayImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("Invalid raster buffer: {reason}")]
    InvalidInput { reason: String },
}

/// Row-major grayscale image, one `u8` sample per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<u8>,
}

impl RasterBuffer {
    /// Build a buffer, rejecting empty or malformed shapes.
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, RasterError> {
        let buffer = Self {
            width,
            height,
            samples,
        };
        buffer.validate()?;
        Ok(buffer)
    }

    /// A buffer with every sample set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            samples: vec![value; width as usize * height as usize],
        }
    }

    /// Build a buffer by evaluating `f(x, y)` for every position.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            samples,
        }
    }

    /// Check the shape invariants: non-zero dimensions and exactly
    /// `width * height` samples.
    pub fn validate(&self) -> Result<(), RasterError> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::InvalidInput {
                reason: format!("empty buffer ({}x{})", self.width, self.height),
            });
        }
        let expected = self.width as usize * self.height as usize;
        if self.samples.len() != expected {
            return Err(RasterError::InvalidInput {
                reason: format!(
                    "{}x{} buffer holds {} samples, expected {}",
                    self.width,
                    self.height,
                    self.samples.len(),
                    expected
                ),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sample at `(x, y)`. Callers must stay in bounds.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.samples[y as usize * self.width as usize + x as usize]
    }

    /// A new buffer with the same shape and the given samples.
    pub(crate) fn with_samples(&self, samples: Vec<u8>) -> Self {
        debug_assert_eq!(samples.len(), self.samples.len());
        Self {
            width: self.width,
            height: self.height,
            samples,
        }
    }

    /// Arithmetic mean of all samples. Zero for an empty buffer.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.samples.iter().map(|&s| u64::from(s)).sum();
        sum as f64 / self.samples.len() as f64
    }

    /// Population variance of all samples. Zero for an empty buffer.
    pub fn variance(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let total: f64 = self
            .samples
            .iter()
            .map(|&s| {
                let d = f64::from(s) - mean;
                d * d
            })
            .sum();
        total / self.samples.len() as f64
    }

    /// Convert into an `image` crate buffer for encoding.
    pub fn to_gray_image(&self) -> Result<GrayImage, RasterError> {
        self.validate()?;
        GrayImage::from_raw(self.width, self.height, self.samples.clone()).ok_or_else(|| {
            RasterError::InvalidInput {
                reason: "sample count does not match dimensions".into(),
            }
        })
    }
}

impl From<GrayImage> for RasterBuffer {
    fn from(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            samples: image.into_raw(),
        }
    }
}
