//! XCI (NX Card Image) - physical game card dump.
//!
//! Dumps come in two shapes: with the 0x1000-byte CardKeyArea in front, or
//! trimmed so the card header starts at 0. Both are accepted; `HEAD` is
//! probed at 0x100 and then at 0x1100.
//!
//! ## CardHeader (0x200 bytes, offsets relative to its start)
//! ```text
//! [+0x000] RSA-2048 signature                            (0x100 bytes)
//! [+0x100] Magic "HEAD"                                  (4 bytes)
//! [+0x104] RomAreaStartPageAddress                       (u32 LE)
//! [+0x108] BackupAreaStartPageAddress                    (u32 LE)
//! [+0x10C] TitleKeyDecIndex | KekIndex                   (1 byte)
//! [+0x10D] RomSize                                       (1 byte)
//! [+0x10E] Version                                       (1 byte)
//! [+0x10F] Flags                                         (1 byte)
//! [+0x110] PackageId                                     (u64 LE)
//! [+0x118] ValidDataEndAddress (page units)              (u32 LE)
//! [+0x11C] Reserved                                      (4 bytes)
//! [+0x120] IV                                            (16 bytes)
//! [+0x130] PartitionFsHeaderAddress                      (u64 LE)
//! [+0x138] PartitionFsHeaderSize                         (u64 LE)
//! ```
//!
//! The root HFS0 names the sub-partitions; each is decoded independently so
//! one corrupt partition does not hide the others.

use std::io::Cursor;

use tracing::warn;

use super::hfs0;
use super::partition_fs::PartitionFs;
use crate::resource::Resource;
use crate::utils::{bytesa, le_u32, le_u64, u8};
use crate::{Error, Result};

const CARD_KEY_AREA: u64 = 0x1000;
const PAGE: u64 = 0x200;

/// Card flags, decoded bit by bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CardFlags(pub u8);

impl CardFlags {
    pub fn auto_boot(self) -> bool {
        self.0 & 0x01 != 0
    }

    pub fn history_erase(self) -> bool {
        self.0 & 0x02 != 0
    }

    pub fn repair_tool(self) -> bool {
        self.0 & 0x04 != 0
    }
}

/// Parsed XCI card header and root partition table.
#[derive(Debug)]
pub struct Xci {
    /// Offset of the card header (0 for trimmed dumps, 0x1000 with key area).
    pub header_offset: u64,
    /// RomSize byte (see [`Xci::rom_capacity`]).
    pub rom_size: u8,
    pub version: u8,
    pub flags: CardFlags,
    /// PackageId used for challenge-response authentication.
    pub package_id: u64,
    /// Valid data end, in bytes.
    pub valid_data_end: u64,
    /// Root HFS0 listing the sub-partitions.
    pub root: PartitionFs,
}

impl Xci {
    /// Parse the card header and root HFS0.
    pub fn parse(resource: &mut dyn Resource) -> Result<Self> {
        let header_offset = [0, CARD_KEY_AREA]
            .into_iter()
            .find(|&base| {
                resource
                    .read(base + 0x100, 4)
                    .is_ok_and(|m| m == b"HEAD")
            })
            .ok_or_else(|| Error::malformed("XCI", "no HEAD magic at 0x100 or 0x1100"))?;

        let header = resource.read_exact(header_offset + 0x104, 0x3C)?;
        let mut r = Cursor::new(&header[..]);
        let _rom_area_start = le_u32(&mut r)?;
        let _backup_area_start = le_u32(&mut r)?;
        let _key_indices = u8(&mut r)?;
        let rom_size = u8(&mut r)?;
        let version = u8(&mut r)?;
        let flags = CardFlags(u8(&mut r)?);
        let package_id = le_u64(&mut r)?;
        let valid_data_end = (u64::from(le_u32(&mut r)?) + 1) * PAGE;
        let _reserved = le_u32(&mut r)?;
        let _iv = bytesa::<0x10>(&mut r)?;
        let root_offset = le_u64(&mut r)?
            .checked_add(header_offset)
            .ok_or_else(|| Error::malformed("XCI", "root partition offset overflows"))?;
        let _root_header_size = le_u64(&mut r)?;

        let bound = resource.size().saturating_sub(root_offset);
        let root = hfs0::parse(resource, root_offset, Some(bound))?;

        Ok(Self {
            header_offset,
            rom_size,
            version,
            flags,
            package_id,
            valid_data_end,
            root,
        })
    }

    /// Decode every root sub-partition independently.
    ///
    /// A malformed partition yields an `Err` in its slot; its siblings are
    /// still decoded.
    pub fn partitions(&self, resource: &mut dyn Resource) -> Vec<(String, Result<PartitionFs>)> {
        self.root
            .entries
            .values()
            .map(|entry| {
                let base = self.root.absolute_offset(entry);
                let parsed = hfs0::parse(resource, base, Some(entry.size));
                if let Err(e) = &parsed {
                    warn!(partition = %entry.name, error = %e, "skipping partition");
                }
                (entry.name.clone(), parsed)
            })
            .collect()
    }

    /// Return the ROM capacity as a human-readable string.
    pub fn rom_capacity(&self) -> Option<&'static str> {
        Some(match self.rom_size {
            0xFA => "1 GB",
            0xF8 => "2 GB",
            0xF0 => "4 GB",
            0xE0 => "8 GB",
            0xE1 => "16 GB",
            0xE2 => "32 GB",
            _ => return None,
        })
    }
}

/// Build a trimmed XCI image in memory around the given root partitions.
#[cfg(test)]
pub(crate) fn build(partitions: &[(&str, Vec<u8>)]) -> Vec<u8> {
    use super::partition_fs::{Kind, build as build_fs};

    let parts: Vec<(&str, &[u8])> = partitions.iter().map(|(n, d)| (*n, d.as_slice())).collect();
    let root = build_fs(Kind::Hfs0, &parts, 0);
    let root_offset = 0x200u64;

    let mut image = vec![0u8; root_offset as usize];
    image[0x100..0x104].copy_from_slice(b"HEAD");
    image[0x10D] = 0xF8;
    image[0x110..0x118].copy_from_slice(&0x1122_3344_5566_7788u64.to_le_bytes());
    image[0x130..0x138].copy_from_slice(&root_offset.to_le_bytes());
    image.extend(root);
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::partition_fs::{Kind, build as build_fs};
    use crate::resource::MemoryResource;

    #[test]
    fn parses_trimmed_card() {
        let normal: [(&str, &[u8]); 1] = [("a.cnmt.nca", b"META")];
        let secure: [(&str, &[u8]); 2] = [("b.nca", b"PROGRAM"), ("a.cnmt.nca", b"META")];
        let image = build(&[
            ("normal", build_fs(Kind::Hfs0, &normal, 0)),
            ("secure", build_fs(Kind::Hfs0, &secure, 0)),
        ]);
        let mut r = MemoryResource::new("game.xci", image);
        let xci = Xci::parse(&mut r).unwrap();
        assert_eq!(xci.header_offset, 0);
        assert_eq!(xci.rom_capacity(), Some("2 GB"));
        assert_eq!(xci.package_id, 0x1122_3344_5566_7788);

        let parts = xci.partitions(&mut r);
        assert_eq!(parts.len(), 2);
        let secure = parts[1].1.as_ref().unwrap();
        assert_eq!(secure.len(), 2);
        let b = secure.get("b.nca").unwrap().clone();
        assert_eq!(secure.read_entry(&mut r, &b).unwrap(), b"PROGRAM");
    }

    #[test]
    fn corrupt_partition_isolated() {
        let normal: [(&str, &[u8]); 1] = [("x.nca", b"DATA")];
        let mut broken = build_fs(Kind::Hfs0, &normal, 0);
        // Claim a file far larger than the partition.
        broken[0x18..0x20].copy_from_slice(&0xFFFF_FFu64.to_le_bytes());
        let image = build(&[("update", broken), ("normal", build_fs(Kind::Hfs0, &normal, 0))]);
        let mut r = MemoryResource::new("game.xci", image);
        let xci = Xci::parse(&mut r).unwrap();
        let parts = xci.partitions(&mut r);
        assert!(matches!(parts[0].1, Err(Error::MalformedContainer { .. })));
        assert_eq!(parts[1].1.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn root_offset_overflow_is_malformed() {
        let mut image = vec![0u8; 0x1000];
        image.extend(build(&[]));
        image[0x1130..0x1138].copy_from_slice(&u64::MAX.to_le_bytes());
        let mut r = MemoryResource::new("game.xci", image);
        assert!(matches!(
            Xci::parse(&mut r),
            Err(Error::MalformedContainer { format: "XCI", .. })
        ));
    }

    #[test]
    fn missing_head_is_malformed() {
        let mut r = MemoryResource::new("junk.xci", vec![0; 0x2000]);
        assert!(matches!(
            Xci::parse(&mut r),
            Err(Error::MalformedContainer { format: "XCI", .. })
        ));
    }
}
