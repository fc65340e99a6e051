use image::{imageops, imageops::FilterType, GrayImage, RgbImage, Rgba, RgbaImage};

use crate::errors::{BackgroundRemovalError, Result};

/// Stretch a mask to `(width, height)` with bilinear interpolation.
pub fn resize_mask(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    if mask.dimensions() == (width, height) {
        return mask.clone();
    }
    imageops::resize(mask, width, height, FilterType::Triangle)
}

/// Write `mask` into the alpha channel of `image`.
///
/// Mask values become alpha values as is. Dimensions must match exactly.
pub fn apply_alpha(image: &RgbImage, mask: &GrayImage) -> Result<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        let (iw, ih) = image.dimensions();
        let (mw, mh) = mask.dimensions();
        return Err(BackgroundRemovalError::invalid_image(format!(
            "image is {iw}x{ih} but mask is {mw}x{mh}"
        )));
    }

    Ok(RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let [red, green, blue] = image.get_pixel(x, y).0;
        let [alpha] = mask.get_pixel(x, y).0;
        Rgba([red, green, blue, alpha])
    }))
}

/// Resize `mask` to the image and use it as the image's alpha channel.
pub fn composite(image: &RgbImage, mask: &GrayImage) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    let mask = resize_mask(mask, width, height);
    apply_alpha(image, &mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb};

    #[test]
    fn test_apply_alpha_copies_mask_values() -> Result<()> {
        let image = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let mask = GrayImage::from_fn(3, 2, |x, y| Luma([(x * 100 + y) as u8]));

        let result = apply_alpha(&image, &mask)?;
        assert_eq!(result.dimensions(), (3, 2));
        assert_eq!(result.get_pixel(0, 0), &Rgba([10, 20, 30, 0]));
        assert_eq!(result.get_pixel(2, 1), &Rgba([10, 20, 30, 201]));
        Ok(())
    }

    #[test]
    fn test_apply_alpha_keeps_color_under_zero_alpha() -> Result<()> {
        let image = RgbImage::from_fn(2, 1, |x, _| Rgb([x as u8 * 200, 7, 9]));
        let mask = GrayImage::from_raw(2, 1, vec![0, 255])
            .ok_or_else(|| BackgroundRemovalError::invalid_image("mask"))?;

        let result = apply_alpha(&image, &mask)?;
        assert_eq!(result.get_pixel(0, 0), &Rgba([0, 7, 9, 0]));
        assert_eq!(result.get_pixel(1, 0), &Rgba([200, 7, 9, 255]));
        Ok(())
    }

    #[test]
    fn test_apply_alpha_rejects_mismatched_mask() {
        let image = RgbImage::new(4, 4);
        let mask = GrayImage::new(3, 4);
        assert!(matches!(
            apply_alpha(&image, &mask),
            Err(BackgroundRemovalError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_resize_mask_to_original_size() {
        let mask = GrayImage::from_pixel(320, 320, Luma([200]));
        let resized = resize_mask(&mask, 640, 10);
        assert_eq!(resized.dimensions(), (640, 10));
        assert!(resized.pixels().all(|p| p[0] == 200));

        let single = resize_mask(&mask, 1, 1);
        assert_eq!(single.dimensions(), (1, 1));
    }

    #[test]
    fn test_composite_replaces_existing_alpha() -> Result<()> {
        let image = DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(5, 7, LumaA([90, 255])));
        let mask = GrayImage::from_pixel(320, 320, Luma([0]));

        let result = composite(&image.to_rgb8(), &mask)?;
        assert_eq!(result.dimensions(), (5, 7));
        assert!(result.pixels().all(|p| *p == Rgba([90, 90, 90, 0])));
        Ok(())
    }
}
