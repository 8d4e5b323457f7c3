//! Binary codec helpers shared by every record schema in [`crate::records`].
//!
//! Garmin's `Dxxx` records are fixed, little-endian, packed binary layouts:
//! this module supplies the primitives (fixed-width and null-terminated
//! Latin-1 strings) that every concrete schema's hand-written `encode`/
//! `decode` builds on, the same way the teacher's `fit.rs` supplied
//! `write_string_field`/`truncate_to_char_boundary` for its own binary
//! format.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("I/O error decoding/encoding a record")]
    Io(#[from] std::io::Error),
    #[error("string {value:?} exceeds fixed field width {width}")]
    StringTooLong { value: String, width: usize },
    #[error("unterminated string field (missing NUL within {0} bytes)")]
    UnterminatedString(usize),
    #[error("unknown record tag {0:?} for this category")]
    UnknownTag(&'static str),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// A fixed-layout record that can be packed to and unpacked from the wire.
pub trait Record: Sized {
    /// The `Dxxx` tag this schema implements, e.g. `"D103"`.
    const TAG: &'static str;

    fn decode(buf: &[u8]) -> Result<Self>;
    fn encode(&self) -> Result<Vec<u8>>;
}

/// Read a null-terminated Latin-1 string, consuming through the terminator.
pub fn read_cstr<R: Read>(r: &mut R) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        let b = r.read_u8()?;
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    Ok(bytes.into_iter().map(|b| b as char).collect())
}

/// Write a string followed by a NUL terminator.
pub fn write_cstr<W: Write>(w: &mut W, value: &str) -> Result<()> {
    for ch in value.chars() {
        w.write_u8(ch as u8)?;
    }
    w.write_u8(0)?;
    Ok(())
}

/// Read a fixed-width field of `width` bytes, treating the first NUL (if
/// any) as the end of the string, ignoring any padding after it.
pub fn read_fixed_str<R: Read>(r: &mut R, width: usize) -> Result<String> {
    let mut buf = vec![0u8; width];
    r.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(width);
    Ok(buf[..end].iter().map(|&b| b as char).collect())
}

/// Write a string into a fixed-width field, NUL-padding the remainder.
/// Errors if `value` (plus its terminator) doesn't fit in `width`.
pub fn write_fixed_str<W: Write>(w: &mut W, value: &str, width: usize) -> Result<()> {
    if value.len() >= width {
        return Err(CodecError::StringTooLong {
            value: value.to_string(),
            width,
        });
    }
    for ch in value.chars() {
        w.write_u8(ch as u8)?;
    }
    for _ in value.len()..width {
        w.write_u8(0)?;
    }
    Ok(())
}

pub use byteorder::LittleEndian as LE;

/// Convenience re-exports so `records/*.rs` schemas don't each need their own
/// `use byteorder::...` boilerplate beyond this module.
pub trait ReadLe: ReadBytesExt {
    fn read_i16_le(&mut self) -> std::io::Result<i16> {
        ReadBytesExt::read_i16::<LittleEndian>(self)
    }
    fn read_u16_le(&mut self) -> std::io::Result<u16> {
        ReadBytesExt::read_u16::<LittleEndian>(self)
    }
    fn read_i32_le(&mut self) -> std::io::Result<i32> {
        ReadBytesExt::read_i32::<LittleEndian>(self)
    }
    fn read_u32_le(&mut self) -> std::io::Result<u32> {
        ReadBytesExt::read_u32::<LittleEndian>(self)
    }
    fn read_f32_le(&mut self) -> std::io::Result<f32> {
        ReadBytesExt::read_f32::<LittleEndian>(self)
    }
    fn read_f64_le(&mut self) -> std::io::Result<f64> {
        ReadBytesExt::read_f64::<LittleEndian>(self)
    }
}
impl<R: ReadBytesExt + ?Sized> ReadLe for R {}

pub trait WriteLe: WriteBytesExt {
    fn write_i16_le(&mut self, v: i16) -> std::io::Result<()> {
        WriteBytesExt::write_i16::<LittleEndian>(self, v)
    }
    fn write_u16_le(&mut self, v: u16) -> std::io::Result<()> {
        WriteBytesExt::write_u16::<LittleEndian>(self, v)
    }
    fn write_i32_le(&mut self, v: i32) -> std::io::Result<()> {
        WriteBytesExt::write_i32::<LittleEndian>(self, v)
    }
    fn write_u32_le(&mut self, v: u32) -> std::io::Result<()> {
        WriteBytesExt::write_u32::<LittleEndian>(self, v)
    }
    fn write_f32_le(&mut self, v: f32) -> std::io::Result<()> {
        WriteBytesExt::write_f32::<LittleEndian>(self, v)
    }
    fn write_f64_le(&mut self, v: f64) -> std::io::Result<()> {
        WriteBytesExt::write_f64::<LittleEndian>(self, v)
    }
}
impl<W: WriteBytesExt + ?Sized> WriteLe for W {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cstr_round_trip() {
        let mut buf = Vec::new();
        write_cstr(&mut buf, "eTrex").unwrap();
        assert_eq!(buf, b"eTrex\0");
        let mut cursor = buf.as_slice();
        assert_eq!(read_cstr(&mut cursor).unwrap(), "eTrex");
    }

    #[test]
    fn fixed_str_pads_and_truncates_at_nul() {
        let mut buf = Vec::new();
        write_fixed_str(&mut buf, "WPT1", 8).unwrap();
        assert_eq!(buf.len(), 8);
        let mut cursor = buf.as_slice();
        assert_eq!(read_fixed_str(&mut cursor, 8).unwrap(), "WPT1");
    }

    #[test]
    fn fixed_str_too_long_is_rejected() {
        let mut buf = Vec::new();
        let err = write_fixed_str(&mut buf, "TOOLONGNAME", 8).unwrap_err();
        assert!(matches!(err, CodecError::StringTooLong { .. }));
    }
}
