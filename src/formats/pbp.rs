//! PBP - PSP executable package (`EBOOT.PBP`).
//!
//! ```text
//! [0x00] Magic "\0PBP"          (4 bytes)
//! [0x04] Version                (u32 LE)
//! [0x08] Section offsets[8]     (u32 LE each)
//! ```
//! Sections in order: PARAM.SFO, ICON0.PNG, ICON1.PMF, PIC0.PNG, PIC1.PNG,
//! SND0.AT3, DATA.PSP, DATA.PSAR. Each runs to the next offset (the last to
//! end of file).

use std::io::Cursor;

use crate::resource::Resource;
use crate::utils::{le_u32, magic};
use crate::{Error, Result};

pub const SECTION_NAMES: [&str; 8] = [
    "PARAM.SFO",
    "ICON0.PNG",
    "ICON1.PMF",
    "PIC0.PNG",
    "PIC1.PNG",
    "SND0.AT3",
    "DATA.PSP",
    "DATA.PSAR",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbp {
    pub version: u32,
    /// `(offset, size)` per entry of [`SECTION_NAMES`].
    pub sections: [(u64, u64); 8],
}

impl Pbp {
    pub fn parse(resource: &mut dyn Resource) -> Result<Self> {
        let header = resource.read_exact(0, 0x28)?;
        let mut r = Cursor::new(&header[..]);
        magic(&mut r, "PBP", b"\0PBP")?;
        let version = le_u32(&mut r)?;
        let mut offsets = [0u64; 8];
        for o in &mut offsets {
            *o = u64::from(le_u32(&mut r)?);
        }

        let end = resource.size();
        let mut sections = [(0u64, 0u64); 8];
        for i in 0..8 {
            let start = offsets[i];
            let next = offsets.get(i + 1).copied().unwrap_or(end);
            if start > next || next > end {
                return Err(Error::malformed("PBP", format!("{} out of order", SECTION_NAMES[i])));
            }
            sections[i] = (start, next - start);
        }
        Ok(Self { version, sections })
    }

    /// Read a section, refusing anything larger than `max`.
    pub fn read_section(&self, resource: &mut dyn Resource, index: usize, max: u64) -> Result<Vec<u8>> {
        let (offset, size) = self.sections.get(index).copied().ok_or(Error::InvalidRange)?;
        if size > max {
            return Err(Error::malformed("PBP", format!("{} is {size} bytes", SECTION_NAMES[index])));
        }
        resource.read_exact(offset, size as usize)
    }
}

#[cfg(test)]
pub(crate) fn build(sfo: &[u8], icon: &[u8]) -> Vec<u8> {
    let mut out = b"\0PBP".to_vec();
    out.extend_from_slice(&0x0001_0000u32.to_le_bytes());
    let sfo_at = 0x28u32;
    let icon_at = sfo_at + sfo.len() as u32;
    let rest = icon_at + icon.len() as u32;
    out.extend_from_slice(&sfo_at.to_le_bytes());
    out.extend_from_slice(&icon_at.to_le_bytes());
    for _ in 2..8 {
        out.extend_from_slice(&rest.to_le_bytes());
    }
    out.extend_from_slice(sfo);
    out.extend_from_slice(icon);
    out
}
