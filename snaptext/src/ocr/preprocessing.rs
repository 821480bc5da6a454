use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

use crate::config::OcrConfig;
use crate::error::{Result, SnaptextError};

/// Basic facts about an upload that decoded successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Decode the bytes as a complete, non-empty image.
pub fn load_image(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo)> {
    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| SnaptextError::InvalidImage(format!("Failed to read image: {e}")))?;

    let format = reader.format().ok_or_else(|| {
        SnaptextError::InvalidImage("Unrecognized image format".to_string())
    })?;

    let img = reader
        .decode()
        .map_err(|e| SnaptextError::InvalidImage(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(SnaptextError::InvalidImage(format!(
            "Image has no pixels: {width}x{height}"
        )));
    }

    Ok((
        img,
        ImageInfo {
            width,
            height,
            format,
        },
    ))
}

/// Check that the bytes are a complete, decodable image.
pub fn verify_image(bytes: &[u8]) -> Result<ImageInfo> {
    load_image(bytes).map(|(_, info)| info)
}

/// Prepare encoded image bytes for recognition. See [`prepare_for_ocr`].
pub fn preprocess_image(bytes: &[u8], config: &OcrConfig) -> Result<Vec<u8>> {
    let (img, _) = load_image(bytes)?;
    prepare_for_ocr(img, config)
}

/// Downscale anything larger than `max_image_dimension`, convert to
/// grayscale and binarize at the Otsu level. Output is PNG.
pub fn prepare_for_ocr(img: DynamicImage, config: &OcrConfig) -> Result<Vec<u8>> {
    let img = resize_if_needed(img, config.max_image_dimension);
    let gray = img.to_luma8();
    let binary = threshold(&gray, otsu_level(&gray), ThresholdType::Binary);

    let mut output = Vec::new();
    DynamicImage::ImageLuma8(binary)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| SnaptextError::Processing(format!("Failed to encode image: {e}")))?;

    Ok(output)
}

/// Resize image if it exceeds maximum dimension while maintaining aspect ratio
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}
