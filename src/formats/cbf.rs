//! Crystallographic Binary File (CBF) writer
//!
//! Writes a single `_array_data.data` block holding signed 32-bit elements
//! packed with the `x-CBF_BYTE_OFFSET` scheme: each element is stored as the
//! difference to its predecessor in the smallest of 1, 2, 4 or 8 bytes, with
//! the reserved minimum of each width acting as an escape to the next one.

use crate::container::Frame;
use crate::errors::Result;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};

/// Marks the start of the binary section
const BINARY_START: [u8; 4] = [0x0c, 0x1a, 0x04, 0xd5];
const BINARY_PADDING: usize = 4095;

/// Packs `values` with byte-offset compression
pub fn byte_offset_compress(values: &[i32]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(values.len());
    let mut previous = 0i64;

    for &value in values {
        let current = i64::from(value);
        let delta = current - previous;

        if (-127..=127).contains(&delta) {
            packed.push(delta as i8 as u8);
        } else {
            packed.push(0x80);
            if (-32767..=32767).contains(&delta) {
                packed.extend_from_slice(&(delta as i16).to_le_bytes());
            } else {
                packed.extend_from_slice(&i16::MIN.to_le_bytes());
                if (-2_147_483_647..=2_147_483_647).contains(&delta) {
                    packed.extend_from_slice(&(delta as i32).to_le_bytes());
                } else {
                    packed.extend_from_slice(&i32::MIN.to_le_bytes());
                    packed.extend_from_slice(&delta.to_le_bytes());
                }
            }
        }

        previous = current;
    }

    packed
}

fn take<'a>(packed: &'a [u8], pos: &mut usize, n: usize) -> Option<&'a [u8]> {
    let bytes = packed.get(*pos..*pos + n)?;
    *pos += n;
    Some(bytes)
}

/// Inverse of [`byte_offset_compress`]; `None` if the stream is truncated
pub fn byte_offset_decompress(packed: &[u8], count: usize) -> Option<Vec<i32>> {
    let mut values = Vec::with_capacity(count);
    let mut previous = 0i64;
    let mut pos = 0usize;

    while values.len() < count {
        let mut delta = i64::from(take(packed, &mut pos, 1)?[0] as i8);
        if delta == -128 {
            delta = i64::from(LittleEndian::read_i16(take(packed, &mut pos, 2)?));
            if delta == i64::from(i16::MIN) {
                delta = i64::from(LittleEndian::read_i32(take(packed, &mut pos, 4)?));
                if delta == i64::from(i32::MIN) {
                    delta = LittleEndian::read_i64(take(packed, &mut pos, 8)?);
                }
            }
        }
        previous += delta;
        values.push(i32::try_from(previous).ok()?);
    }

    Some(values)
}

pub fn encode_cbf(frame: &Frame<'_>, out: &mut File) -> Result<()> {
    let (height, width) = frame.dim();
    let values = frame.values_i32();
    let binary = byte_offset_compress(&values);

    let mut writer = BufWriter::new(out);
    write!(
        writer,
        "###CBF: VERSION 1.5, h5convert {}\r\n\r\n",
        env!("CARGO_PKG_VERSION")
    )?;
    write!(writer, "data_image_1\r\n\r\n")?;
    write!(writer, "_array_data.data\r\n;\r\n")?;
    write!(writer, "--CIF-BINARY-FORMAT-SECTION--\r\n")?;
    write!(writer, "Content-Type: application/octet-stream;\r\n")?;
    write!(writer, "     conversions=\"x-CBF_BYTE_OFFSET\"\r\n")?;
    write!(writer, "Content-Transfer-Encoding: BINARY\r\n")?;
    write!(writer, "X-Binary-Size: {}\r\n", binary.len())?;
    write!(writer, "X-Binary-ID: 1\r\n")?;
    write!(writer, "X-Binary-Element-Type: \"signed 32-bit integer\"\r\n")?;
    write!(writer, "X-Binary-Element-Byte-Order: LITTLE_ENDIAN\r\n")?;
    write!(writer, "X-Binary-Number-of-Elements: {}\r\n", values.len())?;
    write!(writer, "X-Binary-Size-Fastest-Dimension: {}\r\n", width)?;
    write!(writer, "X-Binary-Size-Second-Dimension: {}\r\n", height)?;
    write!(writer, "X-Binary-Size-Padding: {}\r\n\r\n", BINARY_PADDING)?;

    writer.write_all(&BINARY_START)?;
    writer.write_all(&binary)?;
    for _ in 0..BINARY_PADDING {
        writer.write_u8(0)?;
    }

    write!(writer, "\r\n--CIF-BINARY-FORMAT-SECTION----\r\n;\r\n\r\n")?;
    writer.flush()?;
    Ok(())
}
