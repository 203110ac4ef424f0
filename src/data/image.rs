// ============================================================
// Layer 4 - Image Normalizer
// ============================================================
// Turns an image file into the fixed-size tensor the CRNN expects:
//
//   file ──decode──▶ grayscale ──resize (W, H)──▶ u8 [0,255]
//                                                   │
//                                       ÷ 255       ▼
//                             ImageTensor  H × W × 1, f32 in [0,1]
//
// Deterministic: the same bytes always give the same tensor.
// Resizing uses a triangle (bilinear) filter and ignores the
// source aspect ratio, exactly like the training data was made.
//
// Failures (missing file, undecodable bytes) come back as an
// ImageLoadError value so callers can skip the sample instead of
// aborting a whole epoch.
//
// The decoder is chosen by sniffing the file header, never by the
// extension, so a PNG named scan.jpg still loads.
//
// Reference: image crate documentation (imageops::resize)

use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage, GrayImage, ImageReader};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("image not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot decode image '{path}': {source}")]
    Unreadable {
        path:   PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot decode uploaded image: {0}")]
    InvalidBytes(#[source] image::ImageError),
}

/// Target size the normalizer cannot produce
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid target image size {height}x{width}")]
pub struct ImageSizeError {
    pub height: usize,
    pub width:  usize,
}

/// A single-channel image as a flat row-major f32 buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub height: usize,
    pub width:  usize,
    /// height * width values in [0, 1]
    pub data:   Vec<f32>,
}

impl ImageTensor {
    /// Rescale u8 intensities linearly into [0, 1]
    pub fn from_gray(img: &GrayImage) -> Self {
        let data = img.as_raw().iter().map(|&p| p as f32 / 255.0).collect();
        Self {
            height: img.height() as usize,
            width:  img.width() as usize,
            data,
        }
    }

    /// Shape as [H, W, C]
    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageNormalizer {
    height: u32,
    width:  u32,
}

impl ImageNormalizer {
    pub fn new(height: usize, width: usize) -> Result<Self, ImageSizeError> {
        let invalid = || ImageSizeError { height, width };
        let h = u32::try_from(height).map_err(|_| invalid())?;
        let w = u32::try_from(width).map_err(|_| invalid())?;
        if h == 0 || w == 0 {
            return Err(invalid());
        }
        Ok(Self { height: h, width: w })
    }

    /// Decode, convert to grayscale and resize. Returns the u8
    /// representation the augmentation stage works on.
    pub fn load(&self, path: &Path) -> Result<GrayImage, ImageLoadError> {
        if !path.is_file() {
            return Err(ImageLoadError::NotFound(path.to_path_buf()));
        }

        let unreadable = |source| ImageLoadError::Unreadable { path: path.to_path_buf(), source };

        let img = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| unreadable(image::ImageError::IoError(e)))?
            .decode()
            .map_err(unreadable)?;

        Ok(self.resize(&img))
    }

    /// Full normalization of an image file
    pub fn normalize(&self, path: &Path) -> Result<ImageTensor, ImageLoadError> {
        self.load(path).map(|gray| ImageTensor::from_gray(&gray))
    }

    /// Full normalization of an in-memory encoded image (uploads)
    pub fn normalize_bytes(&self, bytes: &[u8]) -> Result<ImageTensor, ImageLoadError> {
        let img = image::load_from_memory(bytes).map_err(ImageLoadError::InvalidBytes)?;
        Ok(self.normalize_image(&img))
    }

    pub fn normalize_image(&self, img: &DynamicImage) -> ImageTensor {
        ImageTensor::from_gray(&self.resize(img))
    }

    fn resize(&self, img: &DynamicImage) -> GrayImage {
        let gray = img.to_luma8();
        if gray.dimensions() == (self.width, self.height) {
            return gray;
        }
        image::imageops::resize(&gray, self.width, self.height, FilterType::Triangle)
    }
}
