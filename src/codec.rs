//! Conversion between images and the tensors the segmentation model speaks.

use image::{imageops, imageops::FilterType, GrayImage, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;

use crate::errors::{BackgroundRemovalError, Result};

/// Spatial size of the model input, `(width, height)`.
pub const INPUT_SIZE: (u32, u32) = (320, 320);

pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Guards the min-max rescale against a flat prediction.
pub const EPSILON: f32 = 1e-8;

/// Turn an RGB image into a `[1, 3, 320, 320]` normalized tensor.
///
/// The image is stretched to the input size (aspect ratio is not kept),
/// scaled to `[0, 1]`, normalized per channel with `(v - mean) / std`
/// and laid out channel-first.
pub fn encode(image: &RgbImage) -> Result<Array4<f32>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(BackgroundRemovalError::invalid_image(format!(
            "cannot encode a {width}x{height} image"
        )));
    }

    let (target_width, target_height) = INPUT_SIZE;
    let resized = imageops::resize(image, target_width, target_height, FilterType::Triangle);

    // nshare views the interleaved buffer as (channel, height, width).
    let mut tensor = resized.as_ndarray3().mapv(|v| f32::from(v) / 255.0);
    for (mut channel, (mean, std)) in tensor
        .axis_iter_mut(Axis(0))
        .zip(MEAN.iter().zip(STD.iter()))
    {
        channel.mapv_inplace(|v| (v - mean) / std);
    }

    Ok(tensor.insert_axis(Axis(0)))
}

/// Turn the model's first output, shaped `[1, 1, H, W]`, into an 8-bit mask.
///
/// Values are min-max rescaled per image, so the brightest pixel becomes 255
/// and the darkest 0. A perfectly flat plane decodes to all zeros. An output
/// of any other shape is a model fault and reported as an inference error.
pub fn decode(output: ArrayViewD<'_, f32>) -> Result<GrayImage> {
    let shape = output.shape().to_vec();
    let plane = match shape.as_slice() {
        [batch, channels, height, width]
            if *batch > 0 && *channels > 0 && *height > 0 && *width > 0 =>
        {
            output.into_dimensionality::<Ix4>()?.slice_move(s![0, 0, .., ..])
        }
        _ => {
            return Err(BackgroundRemovalError::inference(
                "mask decoding",
                format!("expected a [1, 1, H, W] mask tensor, got {shape:?}"),
            ))
        }
    };

    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    let range = max - min + EPSILON;

    let (height, width) = plane.dim();
    let pixels = plane
        .iter()
        .map(|&v| quantize((v - min) / range))
        .collect::<Vec<u8>>();

    GrayImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        BackgroundRemovalError::inference(
            "mask decoding",
            "mask buffer does not match its dimensions",
        )
    })
}

fn quantize(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_encode_shape_and_normalization() -> Result<()> {
        let image = RgbImage::from_pixel(17, 5, Rgb([255, 0, 128]));
        let tensor = encode(&image)?;

        assert_eq!(tensor.shape(), &[1, 3, 320, 320]);
        assert_close(tensor[[0, 0, 0, 0]], (1.0 - MEAN[0]) / STD[0]);
        assert_close(tensor[[0, 1, 160, 160]], (0.0 - MEAN[1]) / STD[1]);
        assert_close(tensor[[0, 2, 319, 319]], (128.0 / 255.0 - MEAN[2]) / STD[2]);
        Ok(())
    }

    #[test]
    fn test_encode_is_channel_first() -> Result<()> {
        // Left half red, right half blue: the red plane must be bright on the left only.
        let image = RgbImage::from_fn(320, 320, |x, _| {
            if x < 160 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let tensor = encode(&image)?;

        assert_close(tensor[[0, 0, 10, 0]], (1.0 - MEAN[0]) / STD[0]);
        assert_close(tensor[[0, 0, 10, 319]], -MEAN[0] / STD[0]);
        assert_close(tensor[[0, 2, 10, 0]], -MEAN[2] / STD[2]);
        assert_close(tensor[[0, 2, 10, 319]], (1.0 - MEAN[2]) / STD[2]);
        Ok(())
    }

    #[test]
    fn test_encode_single_pixel() -> Result<()> {
        let image = RgbImage::from_pixel(1, 1, Rgb([10, 20, 30]));
        let tensor = encode(&image)?;
        assert_eq!(tensor.shape(), &[1, 3, 320, 320]);
        Ok(())
    }

    #[test]
    fn test_encode_rejects_empty_image() {
        let image = RgbImage::new(0, 12);
        assert!(matches!(
            encode(&image),
            Err(BackgroundRemovalError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_decode_spans_full_range() -> Result<()> {
        let output = Array4::from_shape_fn((1, 1, 4, 6), |(_, _, y, x)| {
            0.2 + 0.001 * (y * 6 + x) as f32
        });
        let mask = decode(output.view().into_dyn())?;

        assert_eq!(mask.dimensions(), (6, 4));
        let min = mask.pixels().map(|p| p[0]).min();
        let max = mask.pixels().map(|p| p[0]).max();
        assert_eq!(min, Some(0));
        assert_eq!(max, Some(255));
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(5, 3)[0], 255);
        Ok(())
    }

    #[test]
    fn test_decode_flat_prediction_is_all_zero() -> Result<()> {
        let output = Array4::<f32>::from_elem((1, 1, 320, 320), 0.73);
        let mask = decode(output.view().into_dyn())?;

        assert_eq!(mask.dimensions(), (320, 320));
        assert!(mask.pixels().all(|p| p[0] == 0));
        Ok(())
    }

    #[test]
    fn test_decode_tiny_range_stays_below_full_scale() -> Result<()> {
        // With a range of 1e-7 the epsilon is a tenth of the denominator.
        let output = Array4::from_shape_vec((1, 1, 1, 2), vec![0.0, 1e-7])?;
        let mask = decode(output.view().into_dyn())?;

        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(1, 0)[0], 232);
        Ok(())
    }

    #[test]
    fn test_decode_uses_first_plane_only() -> Result<()> {
        let mut output = Array4::<f32>::zeros((1, 2, 2, 2));
        output[[0, 0, 1, 1]] = 1.0;
        output[[0, 1, 0, 0]] = 50.0;
        let mask = decode(output.view().into_dyn())?;

        assert_eq!(mask.get_pixel(1, 1)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_wrong_rank() {
        let output = Array3::<f32>::zeros((1, 320, 320));
        assert!(matches!(
            decode(output.view().into_dyn()),
            Err(BackgroundRemovalError::Inference { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_empty_plane() {
        let output = Array4::<f32>::zeros((1, 1, 0, 320));
        assert!(matches!(
            decode(output.view().into_dyn()),
            Err(BackgroundRemovalError::Inference { .. })
        ));
    }
}
