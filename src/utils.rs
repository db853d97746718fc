//! Low-level decoding primitives shared by all parsers.
//!
//! Decoders read a bounded window out of a [`crate::resource::Resource`] and
//! walk it with these helpers through a [`std::io::Cursor`]. Each function
//! reads exactly the bytes it promises or returns an error - there is no
//! partial-read ambiguity.

use std::io::{self, Read};

use crate::{Error, Result};

#[inline]
fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
        _ => Error::Io(e),
    })
}

/// Read one byte.
#[inline]
pub(crate) fn u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    fill(r, &mut b)?;
    Ok(b[0])
}

/// Read a little-endian `u16`.
#[inline]
pub(crate) fn le_u16<R: Read>(r: &mut R) -> Result<u16> {
    Ok(u16::from_le_bytes(bytesa(r)?))
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(bytesa(r)?))
}

/// Read a little-endian `u64`.
#[inline]
pub(crate) fn le_u64<R: Read>(r: &mut R) -> Result<u64> {
    Ok(u64::from_le_bytes(bytesa(r)?))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    fill(r, &mut b)?;
    Ok(b)
}

/// Verify that the next `N` bytes in the stream match `expected`.
///
/// Returns [`Error::MalformedContainer`] naming `format` on mismatch.
#[inline]
pub(crate) fn magic<R: Read, const N: usize>(
    r: &mut R,
    format: &'static str,
    expected: &[u8; N],
) -> Result<()> {
    let got = bytesa::<N>(r)?;
    if &got != expected {
        return Err(Error::malformed(format, format!("bad magic {got:02X?}")));
    }
    Ok(())
}

/// Extract a null-terminated UTF-8 string from a byte slice at `offset`.
///
/// Returns [`Error::InvalidRange`] if `offset` is out of bounds, or
/// [`Error::UnterminatedName`] if no null byte is found.
#[inline]
pub(crate) fn null_string(buf: &[u8], offset: usize) -> Result<String> {
    let slice = buf.get(offset..).ok_or(Error::InvalidRange)?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::UnterminatedName)?;
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}

/// Fixed-width field, cut at the first NUL, decoded as strict UTF-8.
pub(crate) fn null_padded_utf8(buf: &[u8]) -> Result<String> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end])
        .map(|s| s.trim().to_owned())
        .map_err(|_| Error::Text("invalid UTF-8"))
}

/// Latin-1 (ISO 8859-1) text; every byte maps to the code point of the same value.
pub(crate) fn latin1(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    buf[..end].iter().map(|&b| b as char).collect::<String>().trim().to_owned()
}

/// Shift-JIS text cut at the first NUL.
pub(crate) fn shift_jis(buf: &[u8]) -> Result<String> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(&buf[..end]);
    if had_errors {
        return Err(Error::Text("invalid Shift-JIS"));
    }
    Ok(text.trim().to_owned())
}

/// Big-endian UTF-16 text cut at the first NUL code unit.
pub(crate) fn utf16_be(buf: &[u8]) -> Result<String> {
    let units = buf
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0);
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map(|s| s.trim().to_owned())
        .map_err(|_| Error::Text("invalid UTF-16"))
}

/// Read a little-endian `u32` from a slice at `offset` without a cursor.
#[inline]
pub(crate) fn le_u32_at(buf: &[u8], offset: usize) -> Result<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(Error::UnexpectedEof)
}

/// Read a big-endian `u32` from a slice at `offset` without a cursor.
#[inline]
pub(crate) fn be_u32_at(buf: &[u8], offset: usize) -> Result<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(Error::UnexpectedEof)
}

/// Borrow `len` bytes of `buf` starting at `offset`.
#[inline]
pub(crate) fn slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    buf.get(offset..offset + len).ok_or(Error::UnexpectedEof)
}

/// Lowercase hex of a byte slice.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
