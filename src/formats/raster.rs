//! PNG, JPEG and BMP output through the `image` crate
//!
//! These formats cannot hold 32-bit samples. PNG gets 16-bit gray, JPEG and
//! BMP get 8-bit gray; values outside the target range are clamped, NaN becomes 0.

use crate::container::Frame;
use crate::errors::{ConvertError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma};
use std::fs::File;

fn dimensions(frame: &Frame<'_>) -> Result<(u32, u32)> {
    let (height, width) = frame.dim();
    Ok((
        u32::try_from(width).map_err(|_| "frame too wide")?,
        u32::try_from(height).map_err(|_| "frame too tall")?,
    ))
}

/// Rounds and clamps to `0..=max`; NaN maps to 0
fn clamped(frame: &Frame<'_>, max: f64) -> impl Iterator<Item = f64> {
    frame
        .values_f64()
        .into_iter()
        .map(move |v| if v.is_nan() { 0.0 } else { v.round().clamp(0.0, max) })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn gray16(frame: &Frame<'_>) -> Result<DynamicImage> {
    let (width, height) = dimensions(frame)?;
    let samples: Vec<u16> = clamped(frame, f64::from(u16::MAX)).map(|v| v as u16).collect();
    let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, samples)
        .ok_or("pixel buffer does not match frame dimensions")?;
    Ok(DynamicImage::ImageLuma16(buffer))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn gray8(frame: &Frame<'_>) -> Result<DynamicImage> {
    let (width, height) = dimensions(frame)?;
    let samples: Vec<u8> = clamped(frame, f64::from(u8::MAX)).map(|v| v as u8).collect();
    let buffer = GrayImage::from_raw(width, height, samples)
        .ok_or("pixel buffer does not match frame dimensions")?;
    Ok(DynamicImage::ImageLuma8(buffer))
}

fn write_image(image: &DynamicImage, out: &mut File, format: ImageFormat) -> Result<()> {
    image
        .write_to(out, format)
        .map_err(|e| ConvertError::Generic(format!("{:?} encoding failed: {}", format, e)))
}

pub fn encode_png(frame: &Frame<'_>, out: &mut File) -> Result<()> {
    write_image(&gray16(frame)?, out, ImageFormat::Png)
}

pub fn encode_jpeg(frame: &Frame<'_>, out: &mut File) -> Result<()> {
    write_image(&gray8(frame)?, out, ImageFormat::Jpeg)
}

pub fn encode_bmp(frame: &Frame<'_>, out: &mut File) -> Result<()> {
    write_image(&gray8(frame)?, out, ImageFormat::Bmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::io::{BufReader, Seek, SeekFrom};

    #[test]
    fn test_png_clamps_to_sixteen_bits() {
        let array = Array2::from_shape_vec((1, 4), vec![-3, 0, 1000, 90_000]).unwrap();
        let mut file = tempfile::tempfile().unwrap();
        encode_png(&Frame::Integer(array.view()), &mut file).unwrap();

        file.seek(SeekFrom::Start(0)).unwrap();
        let decoded = image::load(BufReader::new(file), ImageFormat::Png).unwrap().into_luma16();
        assert_eq!(decoded.dimensions(), (4, 1));
        let pixels: Vec<u16> = decoded.pixels().map(|p| p.0[0]).collect();
        assert_eq!(pixels, vec![0, 0, 1000, 65535]);
    }

    #[test]
    fn test_bmp_dimensions() {
        let values = vec![0.0f32, 10.5, 255.0, 300.0, f32::NAN, 1.0];
        let array = Array2::from_shape_vec((3, 2), values).unwrap();
        let mut file = tempfile::tempfile().unwrap();
        encode_bmp(&Frame::Float(array.view()), &mut file).unwrap();

        file.seek(SeekFrom::Start(0)).unwrap();
        let decoded = image::load(BufReader::new(file), ImageFormat::Bmp).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 3));
    }

    #[test]
    fn test_jpeg_writes_file() {
        let array = Array2::<i32>::zeros((8, 8));
        let mut file = tempfile::tempfile().unwrap();
        encode_jpeg(&Frame::Integer(array.view()), &mut file).unwrap();
        assert!(file.metadata().unwrap().len() > 0);
    }
}
