/*
Functions used throughout the code that have more of a general purpose, like
loading images from disk, converting raw screen bitmaps to black-white and
moving between u8 and f32 grayscale buffers.
*/

use std::path::Path;

use image::{GrayImage, ImageBuffer, ImageReader, Luma};

use crate::errors::CatalogError;

/// Grayscale image with floating point intensities, used by the feature extractor
pub type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Loads image from the provided path and converts to black-white format.
/// Color information is discarded so templates and screenshots share one descriptor space
pub fn load_image_bw(location: &Path) -> Result<GrayImage, CatalogError> {
    let reader = ImageReader::open(location).map_err(|source| CatalogError::Unreadable {
        path: location.to_path_buf(),
        source,
    })?;
    let img = reader.decode().map_err(|source| CatalogError::Decode {
        path: location.to_path_buf(),
        source,
    })?;
    Ok(img.to_luma8())
}

/// Converts a 4 bytes per pixel bitmap in B, G, R, X order into a grayscale image.
/// Returns None when the buffer does not hold width * height pixels
pub fn bgra_to_grayscale(width: u32, height: u32, bitmap: &[u8]) -> Option<GrayImage> {
    let mut grayscale_data: Vec<u8> = Vec::with_capacity((width * height) as usize);
    for chunk in bitmap.chunks_exact(4) {
        let b = chunk[0] as u32;
        let g = chunk[1] as u32;
        let r = chunk[2] as u32;
        // luminance formula
        let gray_value = ((r * 30 + g * 59 + b * 11) / 100) as u8;
        grayscale_data.push(gray_value);
    }
    GrayImage::from_raw(width, height, grayscale_data)
}

/// Widens an 8 bit grayscale image to f32 intensities in 0.0..=255.0
pub fn to_f32(image: &GrayImage) -> GrayF32 {
    let (width, height) = image.dimensions();
    let data: Vec<f32> = image.as_raw().iter().map(|&v| v as f32).collect();
    // buffer length always matches the source dimensions
    GrayF32::from_raw(width, height, data).unwrap_or_else(|| GrayF32::new(width, height))
}

/// Keeps every second pixel in both directions
pub fn downsample_half(image: &GrayF32) -> GrayF32 {
    let width = (image.width() / 2).max(1);
    let height = (image.height() / 2).max(1);
    ImageBuffer::from_fn(width, height, |x, y| {
        let sx = (x * 2).min(image.width() - 1);
        let sy = (y * 2).min(image.height() - 1);
        *image.get_pixel(sx, sy)
    })
}

/// Bilinear upsampling by a factor of two, sampling the source at (x/2, y/2)
pub fn upsample_double(image: &GrayF32) -> GrayF32 {
    let (src_w, src_h) = image.dimensions();
    ImageBuffer::from_fn(src_w * 2, src_h * 2, |x, y| {
        let fx = x as f32 * 0.5;
        let fy = y as f32 * 0.5;
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(src_w - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let dx = fx - x0 as f32;
        let dy = fy - y0 as f32;
        let p00 = image.get_pixel(x0, y0)[0];
        let p10 = image.get_pixel(x1, y0)[0];
        let p01 = image.get_pixel(x0, y1)[0];
        let p11 = image.get_pixel(x1, y1)[0];
        let top = p00 + (p10 - p00) * dx;
        let bottom = p01 + (p11 - p01) * dx;
        Luma([top + (bottom - top) * dy])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgra_conversion_uses_luminance_weights() {
        // pure red, pure green, pure blue, white
        let bitmap = vec![0, 0, 255, 0, 0, 255, 0, 0, 255, 0, 0, 0, 255, 255, 255, 0];
        let gray = bgra_to_grayscale(2, 2, &bitmap).unwrap();
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(0, 1)[0], 28);
        assert_eq!(gray.get_pixel(1, 1)[0], 255);
    }

    #[test]
    fn bgra_conversion_rejects_short_buffer() {
        assert!(bgra_to_grayscale(4, 4, &[0u8; 12]).is_none());
    }

    #[test]
    fn upsample_keeps_source_samples() {
        let src = GrayF32::from_fn(3, 2, |x, y| Luma([(x + 10 * y) as f32]));
        let up = upsample_double(&src);
        assert_eq!(up.dimensions(), (6, 4));
        assert_eq!(up.get_pixel(2, 2)[0], 11.0);
        assert_eq!(up.get_pixel(1, 0)[0], 0.5);
    }

    #[test]
    fn downsample_takes_even_pixels() {
        let src = GrayF32::from_fn(4, 4, |x, y| Luma([(x + 4 * y) as f32]));
        let down = downsample_half(&src);
        assert_eq!(down.dimensions(), (2, 2));
        assert_eq!(down.get_pixel(1, 1)[0], 10.0);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = load_image_bw(Path::new("definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, CatalogError::Unreadable { .. }));
    }
}
