//! Uncompressed grayscale TIFF
//!
//! Samples keep the width they were read at: 32-bit signed or unsigned
//! integers, 32-bit or 64-bit IEEE floats. Detector counts survive without
//! scaling.

use crate::container::Frame;
use crate::errors::{ConvertError, Result};
use ::tiff::encoder::{colortype, TiffEncoder};
use std::fs::File;

fn tiff_error(e: ::tiff::TiffError) -> ConvertError {
    ConvertError::Generic(format!("TIFF encoding failed: {}", e))
}

fn dimension(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| ConvertError::Generic(format!("dimension {} too large for TIFF", len)))
}

pub fn encode_tiff(frame: &Frame<'_>, out: &mut File) -> Result<()> {
    let (height, width) = frame.dim();
    let (height, width) = (dimension(height)?, dimension(width)?);

    let mut encoder = TiffEncoder::new(out).map_err(tiff_error)?;
    match frame {
        Frame::Integer(view) => {
            let samples: Vec<i32> = view.iter().copied().collect();
            encoder.write_image::<colortype::GrayI32>(width, height, &samples)
        }
        Frame::Unsigned(view) => {
            let samples: Vec<u32> = view.iter().copied().collect();
            encoder.write_image::<colortype::Gray32>(width, height, &samples)
        }
        Frame::Float(view) => {
            let samples: Vec<f32> = view.iter().copied().collect();
            encoder.write_image::<colortype::Gray32Float>(width, height, &samples)
        }
        Frame::Double(view) => {
            let samples: Vec<f64> = view.iter().copied().collect();
            encoder.write_image::<colortype::Gray64Float>(width, height, &samples)
        }
    }
    .map_err(tiff_error)
}
