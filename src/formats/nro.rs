//! NRO - homebrew executable, with its optional asset section.
//!
//! ## Header
//! ```text
//! [0x00] Reserved / MOD0 offset         (0x10 bytes)
//! [0x10] Magic "NRO0"                   (4 bytes)
//! [0x14] Version                        (u32 LE)
//! [0x18] Size of the NRO image          (u32 LE)
//! ```
//!
//! ## Asset section (at `Size`)
//! ```text
//! [+0x00] Magic "ASET"                  (4 bytes)
//! [+0x04] Version                       (u32 LE)
//! [+0x08] Icon   { offset u64, size u64 }  (JPEG)
//! [+0x18] NACP   { offset u64, size u64 }  (plaintext control property)
//! [+0x28] RomFS  { offset u64, size u64 }
//! ```
//! Section offsets are relative to the start of the asset header.

use std::io::Cursor;

use crate::resource::Resource;
use crate::utils::{le_u32, le_u64, magic};
use crate::{Error, Result};

const ASSET_HEADER_SIZE: usize = 0x38;

/// `(absolute offset, size)` of one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Asset {
    pub offset: u64,
    pub size: u64,
}

impl Asset {
    pub fn is_present(&self) -> bool {
        self.size > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assets {
    pub icon: Asset,
    pub nacp: Asset,
    pub romfs: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nro {
    pub version: u32,
    pub size: u32,
    /// `None` if the file ends at the NRO image or the trailer is not `ASET`.
    pub assets: Option<Assets>,
}

impl Nro {
    pub fn parse(resource: &mut dyn Resource) -> Result<Self> {
        let header = resource.read_exact(0x10, 0x0C)?;
        let mut r = Cursor::new(&header[..]);
        magic(&mut r, "NRO", b"NRO0")?;
        let version = le_u32(&mut r)?;
        let size = le_u32(&mut r)?;

        let base = u64::from(size);
        let assets = match resource.read(base, ASSET_HEADER_SIZE)? {
            trailer if trailer.len() == ASSET_HEADER_SIZE && trailer.starts_with(b"ASET") => {
                let mut r = Cursor::new(&trailer[8..]);
                let mut asset = || -> Result<Asset> {
                    let offset = le_u64(&mut r)?;
                    let size = le_u64(&mut r)?;
                    let offset = base
                        .checked_add(offset)
                        .filter(|o| o.checked_add(size).is_some())
                        .ok_or(Error::InvalidRange)?;
                    Ok(Asset { offset, size })
                };
                Some(Assets {
                    icon: asset()?,
                    nacp: asset()?,
                    romfs: asset()?,
                })
            }
            _ => None,
        };

        if let Some(a) = &assets {
            let end = resource.size();
            for asset in [a.icon, a.nacp, a.romfs] {
                if asset.offset.saturating_add(asset.size) > end {
                    return Err(Error::malformed("NRO", "asset extends past end of file"));
                }
            }
        }

        Ok(Self {
            version,
            size,
            assets,
        })
    }

    /// Read one asset fully. Absent assets yield an empty buffer.
    pub fn read_asset(resource: &mut dyn Resource, asset: Asset) -> Result<Vec<u8>> {
        if !asset.is_present() {
            return Ok(Vec::new());
        }
        resource.read_exact(asset.offset, asset.size as usize)
    }
}

#[cfg(test)]
pub(crate) fn build(nacp: &[u8], icon: &[u8]) -> Vec<u8> {
    let image_size = 0x100u32;
    let mut out = vec![0u8; image_size as usize];
    out[0x10..0x14].copy_from_slice(b"NRO0");
    out[0x18..0x1C].copy_from_slice(&image_size.to_le_bytes());

    let icon_offset = ASSET_HEADER_SIZE as u64;
    let nacp_offset = icon_offset + icon.len() as u64;
    out.extend_from_slice(b"ASET");
    out.extend_from_slice(&0u32.to_le_bytes());
    for (offset, size) in [(icon_offset, icon.len()), (nacp_offset, nacp.len()), (0, 0)] {
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&(size as u64).to_le_bytes());
    }
    out.extend_from_slice(icon);
    out.extend_from_slice(nacp);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MemoryResource;

    #[test]
    fn reads_assets() {
        let mut r = MemoryResource::new("hb.nro", build(b"NACPDATA", b"\xFF\xD8JPEG"));
        let nro = Nro::parse(&mut r).unwrap();
        let assets = nro.assets.unwrap();
        assert!(!assets.romfs.is_present());
        assert_eq!(Nro::read_asset(&mut r, assets.icon).unwrap(), b"\xFF\xD8JPEG");
        assert_eq!(Nro::read_asset(&mut r, assets.nacp).unwrap(), b"NACPDATA");
    }

    #[test]
    fn bare_nro_has_no_assets() {
        let mut image = build(b"", b"");
        image.truncate(0x100);
        let mut r = MemoryResource::new("hb.nro", image);
        assert_eq!(Nro::parse(&mut r).unwrap().assets, None);
    }

    #[test]
    fn asset_past_end_is_malformed() {
        let mut image = build(b"NACPDATA", b"ICON");
        image.truncate(image.len() - 2);
        let mut r = MemoryResource::new("hb.nro", image);
        assert!(matches!(Nro::parse(&mut r), Err(Error::MalformedContainer { .. })));
    }
}
