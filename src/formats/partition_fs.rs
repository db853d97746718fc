//! Shared decoder for the flat "table of (name, offset, size)" containers.
//!
//! [`super::pfs0`] and [`super::hfs0`] differ only in magic, entry size and
//! whether each entry carries a hashed-region length; everything else -
//! header, string table, bound checking - lives here.

use std::io::Cursor;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::resource::{Resource, Window};
use crate::utils::{bytesa, le_u32, le_u64, magic, null_string};
use crate::{Error, Result};

/// Size of the fixed header: magic, file count, string table size, reserved.
pub const HEADER_SIZE: u64 = 0x10;

/// Which member of the family is being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Pfs0,
    Hfs0,
}

impl Kind {
    fn magic(self) -> &'static [u8; 4] {
        match self {
            Kind::Pfs0 => b"PFS0",
            Kind::Hfs0 => b"HFS0",
        }
    }

    fn format(self) -> &'static str {
        match self {
            Kind::Pfs0 => "PFS0",
            Kind::Hfs0 => "HFS0",
        }
    }

    fn entry_size(self) -> u64 {
        match self {
            Kind::Pfs0 => 0x18,
            Kind::Hfs0 => 0x40,
        }
    }
}

/// One file inside a flat container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// File name decoded from the string table.
    pub name: String,
    /// Offset of the file data relative to the container's base offset.
    pub offset: u64,
    /// File size in bytes.
    pub size: u64,
}

/// Decoded container: entries in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PartitionFs {
    /// Absolute offset of the container header within its resource.
    pub base: u64,
    /// Entries keyed by name.
    pub entries: IndexMap<String, ContainerEntry>,
}

impl PartitionFs {
    /// Decode a container whose header sits at `base` in `resource`.
    ///
    /// `max_size`, when known, is the declared size of the container. The
    /// running total of header + tables + every file's size must never
    /// exceed it, and every entry must end inside it; either violation is
    /// [`Error::MalformedContainer`].
    pub fn parse(
        resource: &mut dyn Resource,
        base: u64,
        max_size: Option<u64>,
        kind: Kind,
    ) -> Result<Self> {
        let format = kind.format();
        let header = resource.read_exact(base, HEADER_SIZE as usize)?;
        let mut r = Cursor::new(&header[..]);
        magic(&mut r, format, kind.magic())?;
        let file_count = le_u32(&mut r)?;
        let string_table_size = le_u32(&mut r)?;

        let table_size = u64::from(file_count) * kind.entry_size();
        let header_len = HEADER_SIZE + table_size + u64::from(string_table_size);
        let mut total = header_len;
        if let Some(max) = max_size
            && total > max
        {
            return Err(Error::malformed(
                format,
                format!("{file_count} entries and {string_table_size:#x}-byte string table exceed bound {max:#x}"),
            ));
        }

        let table_offset = base
            .checked_add(HEADER_SIZE)
            .ok_or_else(|| Error::malformed(format, format!("base {base:#x} overflows")))?;
        let strings_offset = table_offset
            .checked_add(table_size)
            .ok_or_else(|| Error::malformed(format, format!("base {base:#x} overflows")))?;
        let entry_table = resource.read_exact(table_offset, table_size as usize)?;
        let string_table = resource.read_exact(strings_offset, string_table_size as usize)?;

        let mut r = Cursor::new(&entry_table[..]);
        let mut entries = IndexMap::with_capacity(file_count as usize);
        for _ in 0..file_count {
            let offset = le_u64(&mut r)?;
            let size = le_u64(&mut r)?;
            let name_offset = le_u32(&mut r)?;
            let shift = match kind {
                Kind::Pfs0 => {
                    let _reserved = le_u32(&mut r)?;
                    0
                }
                Kind::Hfs0 => {
                    let hashed_region_size = le_u32(&mut r)?;
                    let _reserved = bytesa::<8>(&mut r)?;
                    let _sha256 = bytesa::<0x20>(&mut r)?;
                    u64::from(hashed_region_size)
                }
            };
            let name = null_string(&string_table, name_offset as usize)?;

            total = total
                .checked_add(size)
                .ok_or_else(|| Error::malformed(format, format!("size of {name} overflows")))?;
            let relative = header_len
                .checked_add(offset)
                .and_then(|o| o.checked_add(shift))
                .ok_or_else(|| Error::malformed(format, format!("offset of {name} overflows")))?;
            if base.checked_add(relative).and_then(|o| o.checked_add(size)).is_none() {
                return Err(Error::malformed(format, format!("{name} ends past the addressable range")));
            }

            if let Some(max) = max_size {
                if total > max {
                    return Err(Error::malformed(
                        format,
                        format!("cumulative size {total:#x} at {name} exceeds bound {max:#x}"),
                    ));
                }
                if relative.saturating_add(size) > max {
                    return Err(Error::malformed(
                        format,
                        format!("{name} at {relative:#x}+{size:#x} ends past bound {max:#x}"),
                    ));
                }
            }

            trace!(container = format, %name, offset = relative, size, "entry");
            entries.insert(
                name.clone(),
                ContainerEntry {
                    name,
                    offset: relative,
                    size,
                },
            );
        }

        debug!(container = format, base, count = entries.len(), "decoded");
        Ok(Self { base, entries })
    }

    /// Look up an entry by exact name.
    pub fn get(&self, name: &str) -> Option<&ContainerEntry> {
        self.entries.get(name)
    }

    /// Iterate over entries whose name ends with `suffix`, in declaration order.
    pub fn with_suffix<'a>(&'a self, suffix: &'a str) -> impl Iterator<Item = &'a ContainerEntry> {
        self.entries.values().filter(move |e| e.name.ends_with(suffix))
    }

    /// Absolute offset of `entry` within the resource the container was read from.
    pub fn absolute_offset(&self, entry: &ContainerEntry) -> u64 {
        self.base + entry.offset
    }

    /// `name -> (absolute_offset, size)`.
    pub fn to_map(&self) -> IndexMap<String, (u64, u64)> {
        self.entries
            .values()
            .map(|e| (e.name.clone(), (self.absolute_offset(e), e.size)))
            .collect()
    }

    /// Bounded view of `entry` inside `resource`.
    pub fn window<'a>(&self, resource: &'a mut dyn Resource, entry: &ContainerEntry) -> Window<'a> {
        Window::new(resource, entry.name.clone(), self.absolute_offset(entry), entry.size)
    }

    /// Read the whole of a (small) entry into memory.
    pub fn read_entry(&self, resource: &mut dyn Resource, entry: &ContainerEntry) -> Result<Vec<u8>> {
        resource.read_exact(self.absolute_offset(entry), entry.size as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build a container image in memory. Used by tests across the crate.
#[cfg(test)]
pub(crate) fn build(kind: Kind, files: &[(&str, &[u8])], hashed_region: u32) -> Vec<u8> {
    let mut strings = Vec::new();
    let mut table = Vec::new();
    let mut data = Vec::new();
    for (name, body) in files {
        let name_offset = strings.len() as u32;
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);
        table.extend_from_slice(&(data.len() as u64).to_le_bytes());
        table.extend_from_slice(&(body.len() as u64).to_le_bytes());
        table.extend_from_slice(&name_offset.to_le_bytes());
        match kind {
            Kind::Pfs0 => table.extend_from_slice(&0u32.to_le_bytes()),
            Kind::Hfs0 => {
                table.extend_from_slice(&hashed_region.to_le_bytes());
                table.extend_from_slice(&[0u8; 8]);
                table.extend_from_slice(&[0u8; 0x20]);
            }
        }
        data.extend(std::iter::repeat_n(0u8, hashed_region as usize));
        data.extend_from_slice(body);
    }
    while strings.len() % 0x10 != 0 {
        strings.push(0);
    }

    let mut out = Vec::new();
    out.extend_from_slice(kind.magic());
    out.extend_from_slice(&(files.len() as u32).to_le_bytes());
    out.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&table);
    out.extend_from_slice(&strings);
    out.extend_from_slice(&data);
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::resource::MemoryResource;

    #[test]
    fn decodes_every_entry_within_bounds() {
        let files: [(&str, &[u8]); 3] = [
            ("a.nca", b"first"),
            ("b.cnmt.xml", b"<ContentMeta/>"),
            ("c.tik", &[7u8; 64]),
        ];
        let image = build(Kind::Pfs0, &files, 0);
        let declared = image.len() as u64;
        let mut r = MemoryResource::new("nsp", image);
        let fs = PartitionFs::parse(&mut r, 0, Some(declared), Kind::Pfs0).unwrap();

        assert_eq!(fs.len(), 3);
        for e in fs.entries.values() {
            assert!(e.offset + e.size <= declared);
        }
        let names: Vec<_> = fs.entries.keys().cloned().collect();
        assert_eq!(names, ["a.nca", "b.cnmt.xml", "c.tik"]);
        let xml = fs.get("b.cnmt.xml").unwrap().clone();
        assert_eq!(fs.read_entry(&mut r, &xml).unwrap(), b"<ContentMeta/>");
    }

    #[test]
    fn hashed_region_shifts_data_offset() {
        let files: [(&str, &[u8]); 2] = [("secure", b"SECURE"), ("normal", b"NORMAL")];
        let image = build(Kind::Hfs0, &files, 0x20);
        let declared = image.len() as u64;
        let mut r = MemoryResource::new("xci", image);
        let fs = PartitionFs::parse(&mut r, 0, Some(declared), Kind::Hfs0).unwrap();
        let normal = fs.get("normal").unwrap().clone();
        assert_eq!(fs.read_entry(&mut r, &normal).unwrap(), b"NORMAL");
    }

    #[test]
    fn nonzero_base_yields_absolute_offsets() {
        let files: [(&str, &[u8]); 1] = [("x", b"XYZ")];
        let mut image = vec![0xAA; 0x100];
        image.extend(build(Kind::Pfs0, &files, 0));
        let mut r = MemoryResource::new("outer", image);
        let fs = PartitionFs::parse(&mut r, 0x100, None, Kind::Pfs0).unwrap();
        let (abs, size) = fs.to_map()["x"];
        assert_eq!(r.read(abs, size as usize).unwrap(), b"XYZ");
    }

    #[test]
    fn bad_magic_is_malformed() {
        let files: [(&str, &[u8]); 1] = [("x", b"1")];
        let mut image = build(Kind::Pfs0, &files, 0);
        image[0] = b'Q';
        let mut r = MemoryResource::new("nsp", image);
        let err = PartitionFs::parse(&mut r, 0, None, Kind::Pfs0).unwrap_err();
        assert!(matches!(err, Error::MalformedContainer { format: "PFS0", .. }));
    }

    #[test]
    fn cumulative_size_past_bound_is_malformed() {
        let files: [(&str, &[u8]); 2] = [("big", &[1u8; 32]), ("bigger", &[2u8; 32])];
        let image = build(Kind::Pfs0, &files, 0);
        let declared = image.len() as u64 - 16;
        let mut r = MemoryResource::new("nsp", image);
        let err = PartitionFs::parse(&mut r, 0, Some(declared), Kind::Pfs0).unwrap_err();
        assert!(matches!(err, Error::MalformedContainer { .. }));
    }

    #[test]
    fn huge_file_count_rejected_before_reading_table() {
        let files: [(&str, &[u8]); 1] = [("x", b"1")];
        let mut image = build(Kind::Hfs0, &files, 0);
        image[4..8].copy_from_slice(&0x0100_0000u32.to_le_bytes());
        let declared = image.len() as u64;
        let mut r = MemoryResource::new("xci", image);
        let err = PartitionFs::parse(&mut r, 0, Some(declared), Kind::Hfs0).unwrap_err();
        assert!(matches!(err, Error::MalformedContainer { format: "HFS0", .. }));
    }
}
