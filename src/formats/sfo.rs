//! PARAM.SFO - the PSP key/value parameter table.
//!
//! ## Header (0x14 bytes)
//! ```text
//! [0x00] Magic "\0PSF"             (4 bytes)
//! [0x04] Version                    (u32 LE)
//! [0x08] Key table offset           (u32 LE)
//! [0x0C] Data table offset          (u32 LE)
//! [0x10] Entry count                (u32 LE)
//! ```
//!
//! ## Index entry (0x10 bytes each, from 0x14)
//! ```text
//! [0x00] Key offset                 (u16 LE, into key table)
//! [0x02] Format                     (u16 LE: 0x0004 utf8-s, 0x0204 utf8, 0x0404 int32)
//! [0x04] Used length                (u32 LE)
//! [0x08] Max length                 (u32 LE)
//! [0x0C] Data offset                (u32 LE, into data table)
//! ```

use std::io::Cursor;

use indexmap::IndexMap;
use tracing::trace;

use crate::utils::{le_u16, le_u32, le_u32_at, magic, null_string, slice};
use crate::{Error, Result};

/// Upper bound on a sane PARAM.SFO; larger files are not read.
pub const MAX_SIZE: u32 = 0x10000;
const HEADER_SIZE: usize = 0x14;
const ENTRY_SIZE: usize = 0x10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SfoValue {
    Text(String),
    Integer(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sfo {
    pub entries: IndexMap<String, SfoValue>,
}

impl Sfo {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(slice(buf, 0, HEADER_SIZE)?);
        magic(&mut r, "SFO", b"\0PSF")?;
        let _version = le_u32(&mut r)?;
        let key_table = le_u32(&mut r)? as usize;
        let data_table = le_u32(&mut r)? as usize;
        let count = le_u32(&mut r)? as usize;

        let index = count
            .checked_mul(ENTRY_SIZE)
            .and_then(|len| slice(buf, HEADER_SIZE, len).ok())
            .ok_or_else(|| Error::malformed("SFO", format!("{count} entries do not fit")))?;

        let mut entries = IndexMap::with_capacity(count);
        for chunk in index.chunks_exact(ENTRY_SIZE) {
            let mut r = Cursor::new(chunk);
            let key_offset = usize::from(le_u16(&mut r)?);
            let format = le_u16(&mut r)?;
            let used = le_u32(&mut r)? as usize;
            let _max = le_u32(&mut r)?;
            let data_offset = le_u32(&mut r)? as usize;

            let key = null_string(buf, key_table + key_offset)?;
            let at = data_table + data_offset;
            let value = match format {
                0x0404 => SfoValue::Integer(le_u32_at(buf, at)?),
                0x0004 | 0x0204 => {
                    let bytes = slice(buf, at, used)?;
                    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                    SfoValue::Text(String::from_utf8_lossy(&bytes[..end]).into_owned())
                }
                other => {
                    trace!(key, format = other, "skipping SFO entry");
                    continue;
                }
            };
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            SfoValue::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<u32> {
        match self.entries.get(key)? {
            SfoValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

/// Serialize `entries` as a PARAM.SFO image.
#[cfg(test)]
pub(crate) fn build(entries: &[(&str, SfoValue)]) -> Vec<u8> {
    let key_table = HEADER_SIZE + entries.len() * ENTRY_SIZE;
    let mut keys = Vec::new();
    let mut data = Vec::new();
    let mut index = Vec::new();
    for (key, value) in entries {
        let (format, bytes) = match value {
            SfoValue::Integer(v) => (0x0404u16, v.to_le_bytes().to_vec()),
            SfoValue::Text(s) => {
                let mut b = s.as_bytes().to_vec();
                b.push(0);
                (0x0204u16, b)
            }
        };
        index.extend_from_slice(&(keys.len() as u16).to_le_bytes());
        index.extend_from_slice(&format.to_le_bytes());
        index.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        index.extend_from_slice(&(bytes.len().next_multiple_of(4) as u32).to_le_bytes());
        index.extend_from_slice(&(data.len() as u32).to_le_bytes());
        keys.extend_from_slice(key.as_bytes());
        keys.push(0);
        data.extend_from_slice(&bytes);
        data.resize(data.len().next_multiple_of(4), 0);
    }
    keys.resize(keys.len().next_multiple_of(4), 0);

    let mut out = b"\0PSF".to_vec();
    out.extend_from_slice(&0x0101u32.to_le_bytes());
    out.extend_from_slice(&(key_table as u32).to_le_bytes());
    out.extend_from_slice(&((key_table + keys.len()) as u32).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    out.extend(index);
    out.extend(keys);
    out.extend(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_text_and_integers() {
        let buf = build(&[
            ("CATEGORY", SfoValue::Text("UG".into())),
            ("DISC_ID", SfoValue::Text("ULUS10041".into())),
            ("PARENTAL_LEVEL", SfoValue::Integer(5)),
            ("TITLE", SfoValue::Text("Some Game".into())),
        ]);
        let sfo = Sfo::parse(&buf).unwrap();
        assert_eq!(sfo.text("DISC_ID"), Some("ULUS10041"));
        assert_eq!(sfo.text("TITLE"), Some("Some Game"));
        assert_eq!(sfo.integer("PARENTAL_LEVEL"), Some(5));
        assert_eq!(sfo.text("PARENTAL_LEVEL"), None);
        assert_eq!(sfo.entries.get_index(0).map(|(k, _)| k.as_str()), Some("CATEGORY"));
    }

    #[test]
    fn oversized_count_is_malformed() {
        let mut buf = build(&[("TITLE", SfoValue::Text("x".into()))]);
        buf[0x10..0x14].copy_from_slice(&1000u32.to_le_bytes());
        assert!(matches!(Sfo::parse(&buf), Err(Error::MalformedContainer { format: "SFO", .. })));
    }

    #[test]
    fn bad_magic() {
        assert!(Sfo::parse(&[0u8; 0x40]).is_err());
    }
}
