//! Image preprocessing for backbone inference.
//!
//! Each backbone family expects a square RGB input in NCHW layout but
//! differs in normalization:
//! - ImageNet-trained backbones (ConvNeXt, ViT, Swin): per-channel
//!   ImageNet mean/std
//! - CLIP visual encoders: CLIP's own per-channel statistics
//! - Unit-range models: pixels scaled to [-1, 1]

use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Per-channel normalization applied after scaling pixels to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormPreset {
    ImageNet,
    Clip,
    Unit,
}

impl NormPreset {
    /// Parse preset from the config string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "imagenet" => Some(Self::ImageNet),
            "clip" => Some(Self::Clip),
            "unit" => Some(Self::Unit),
            _ => None,
        }
    }

    fn mean_std(&self) -> ([f32; 3], [f32; 3]) {
        match self {
            Self::ImageNet => (IMAGENET_MEAN, IMAGENET_STD),
            Self::Clip => (CLIP_MEAN, CLIP_STD),
            Self::Unit => ([0.5; 3], [0.5; 3]),
        }
    }
}

/// Preprocess an image for backbone inference.
///
/// Resizes to `image_size × image_size`, converts to RGB, applies the
/// preset's per-channel normalization, and returns an NCHW tensor
/// suitable for ONNX Runtime.
pub fn preprocess(image: &DynamicImage, image_size: u32, preset: NormPreset) -> Array4<f32> {
    let resized = image.resize_exact(
        image_size,
        image_size,
        image::imageops::FilterType::Lanczos3,
    );
    let rgb = resized.to_rgb8();
    let (mean, std) = preset.mean_std();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));

    // Access raw RGB bytes and tensor slice directly to avoid per-pixel
    // bounds-checking overhead from get_pixel() and 4D ndarray indexing.
    let raw = rgb.as_raw();
    let tensor_data = tensor.as_slice_mut().unwrap();
    for (i, pixel) in raw.chunks_exact(3).enumerate() {
        let y = i / size;
        let x = i % size;
        for (c, &val) in pixel.iter().enumerate() {
            // NCHW layout: offset = c * size * size + y * size + x
            let idx = c * size * size + y * size + x;
            tensor_data[idx] = (val as f32 / 255.0 - mean[c]) / std[c];
        }
    }

    tensor
}
