//! ISO 9660 - the data filesystem of PlayStation, PSP and most CD images.
//!
//! Reads operate on a *cooked* [`Resource`]: 2048-byte logical sectors.
//! Raw images are wrapped in [`crate::resource::sector::CookedView`] first.
//!
//! ## Primary Volume Descriptor (sector 16)
//! ```text
//! [0x000] Type (1)                        (u8)
//! [0x001] "CD001"                         (5 bytes)
//! [0x008] System identifier               (32 bytes, a-chars)
//! [0x028] Volume identifier               (32 bytes, d-chars)
//! [0x050] Volume space size               (u32 LE + u32 BE)
//! [0x09C] Root directory record           (34 bytes)
//! [0x13E] Publisher identifier            (128 bytes)
//! [0x23E] Application identifier          (128 bytes)
//! [0x32D] Volume creation date            (17 bytes, "YYYYMMDDHHMMSScc" + tz)
//! ```
//!
//! ## Directory record
//! ```text
//! [0x00] Record length                    (u8)
//! [0x02] Extent LBA                       (u32 LE + u32 BE)
//! [0x0A] Data length                      (u32 LE + u32 BE)
//! [0x19] Flags (bit 1 = directory)        (u8)
//! [0x20] Identifier length                (u8)
//! [0x21] Identifier                       (n bytes, ";1" version suffix)
//! ```
//! Records never straddle a sector; a zero length byte means "skip to the
//! next sector".

use tracing::trace;

use crate::metadata::Date;
use crate::resource::Resource;
use crate::utils::le_u32_at;
use crate::{Error, Result};

pub const SECTOR_SIZE: u64 = 2048;
const PVD_SECTOR: u64 = 16;
/// Directories larger than this are treated as corrupt.
const MAX_DIRECTORY_SIZE: u32 = 1 << 20;

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    pub name: String,
    pub lba: u32,
    pub size: u32,
    pub is_dir: bool,
}

impl DirRecord {
    fn parse(data: &[u8]) -> Option<Self> {
        let len = usize::from(*data.first()?);
        if len < 34 || len > data.len() {
            return None;
        }
        let id_len = usize::from(data[32]);
        let id = data.get(33..33 + id_len)?;
        let name = match id {
            [0] => ".".to_owned(),
            [1] => "..".to_owned(),
            _ => {
                let text = String::from_utf8_lossy(id);
                text.split(';').next().unwrap_or_default().to_owned()
            }
        };
        Some(Self {
            name,
            lba: le_u32_at(data, 2).ok()?,
            size: le_u32_at(data, 10).ok()?,
            is_dir: data[25] & 0x02 != 0,
        })
    }
}

/// Decoded primary volume descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeDescriptor {
    pub system_id: String,
    pub volume_id: String,
    pub volume_sectors: u32,
    pub publisher_id: String,
    pub application_id: String,
    pub created: Option<Date>,
    pub root: DirRecord,
}

fn a_chars(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).trim_end_matches([' ', '\0']).to_owned()
}

impl VolumeDescriptor {
    pub fn read(resource: &mut dyn Resource) -> Result<Self> {
        let pvd = resource.read_exact(PVD_SECTOR * SECTOR_SIZE, SECTOR_SIZE as usize)?;
        if pvd[0] != 1 || &pvd[1..6] != b"CD001" {
            return Err(Error::malformed("ISO9660", "no primary volume descriptor at sector 16"));
        }
        let root = DirRecord::parse(&pvd[0x9C..0x9C + 34])
            .ok_or_else(|| Error::malformed("ISO9660", "bad root directory record"))?;
        let created = std::str::from_utf8(&pvd[0x32D..0x335])
            .ok()
            .and_then(Date::from_yyyymmdd)
            .filter(|d| d.year != Some(0));
        Ok(Self {
            system_id: a_chars(&pvd[0x08..0x28]),
            volume_id: a_chars(&pvd[0x28..0x48]),
            volume_sectors: le_u32_at(&pvd, 0x50)?,
            publisher_id: a_chars(&pvd[0x13E..0x1BE]),
            application_id: a_chars(&pvd[0x23E..0x2BE]),
            created,
            root,
        })
    }

    /// List a directory's entries, excluding `.` and `..`.
    pub fn list(&self, resource: &mut dyn Resource, dir: &DirRecord) -> Result<Vec<DirRecord>> {
        if dir.size > MAX_DIRECTORY_SIZE {
            return Err(Error::malformed("ISO9660", format!("directory of {} bytes", dir.size)));
        }
        let data = resource.read(u64::from(dir.lba) * SECTOR_SIZE, dir.size as usize)?;
        let mut entries = Vec::new();
        let mut pos = 0usize;
        while pos < data.len() {
            let len = usize::from(data[pos]);
            if len == 0 {
                pos = (pos / SECTOR_SIZE as usize + 1) * SECTOR_SIZE as usize;
                continue;
            }
            if let Some(record) = DirRecord::parse(&data[pos..])
                && record.name != "."
                && record.name != ".."
            {
                trace!(name = %record.name, lba = record.lba, size = record.size, "directory entry");
                entries.push(record);
            }
            pos += len;
        }
        Ok(entries)
    }

    /// Resolve a `/`-separated path from the root, case-insensitively.
    pub fn find(&self, resource: &mut dyn Resource, path: &str) -> Result<Option<DirRecord>> {
        let mut current = self.root.clone();
        for component in path.split(['/', '\\']).filter(|c| !c.is_empty()) {
            if !current.is_dir {
                return Ok(None);
            }
            let next = self
                .list(resource, &current)?
                .into_iter()
                .find(|e| e.name.eq_ignore_ascii_case(component));
            match next {
                Some(e) => current = e,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Read a file's contents, refusing anything larger than `max`.
    pub fn read_file(&self, resource: &mut dyn Resource, file: &DirRecord, max: u32) -> Result<Vec<u8>> {
        if file.size > max {
            return Err(Error::malformed("ISO9660", format!("{} is {} bytes", file.name, file.size)));
        }
        resource.read_exact(u64::from(file.lba) * SECTOR_SIZE, file.size as usize)
    }
}

/// Build a minimal cooked ISO image for tests: `files` go in the root
/// directory, or one level down when the name contains `/`.
#[cfg(test)]
pub(crate) fn build(volume_id: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    fn record(name: &[u8], lba: u32, size: u32, dir: bool) -> Vec<u8> {
        let mut r = vec![0u8; 33];
        r[2..6].copy_from_slice(&lba.to_le_bytes());
        r[6..10].copy_from_slice(&lba.to_be_bytes());
        r[10..14].copy_from_slice(&size.to_le_bytes());
        r[14..18].copy_from_slice(&size.to_be_bytes());
        r[25] = if dir { 2 } else { 0 };
        r[32] = name.len() as u8;
        r.extend_from_slice(name);
        if r.len() % 2 == 1 {
            r.push(0);
        }
        r[0] = r.len() as u8;
        r
    }

    let sector = SECTOR_SIZE as usize;
    let root_lba = 18u32;
    let sub_lba = 19u32;
    let mut next_lba = 20u32;
    let mut image = vec![0u8; next_lba as usize * sector];
    let mut root_dir = record(&[0], root_lba, sector as u32, true);
    root_dir.extend(record(&[1], root_lba, sector as u32, true));
    let mut sub_dir = record(&[0], sub_lba, sector as u32, true);
    sub_dir.extend(record(&[1], root_lba, sector as u32, true));
    let mut sub_name = None;

    for (name, data) in files {
        let lba = next_lba;
        image.extend_from_slice(data);
        image.resize(image.len().div_ceil(sector) * sector, 0);
        next_lba = (image.len() / sector) as u32;
        match name.split_once('/') {
            Some((dir, file)) => {
                sub_name = Some(dir.to_owned());
                sub_dir.extend(record(format!("{file};1").as_bytes(), lba, data.len() as u32, false));
            }
            None => root_dir.extend(record(format!("{name};1").as_bytes(), lba, data.len() as u32, false)),
        }
    }
    if let Some(dir) = sub_name {
        root_dir.extend(record(dir.as_bytes(), sub_lba, sector as u32, true));
    }

    let pvd = &mut image[16 * sector..17 * sector];
    pvd[0] = 1;
    pvd[1..6].copy_from_slice(b"CD001");
    pvd[0x08..0x28].fill(b' ');
    pvd[0x08..0x08 + 11].copy_from_slice(b"PLAYSTATION");
    pvd[0x28..0x48].fill(b' ');
    pvd[0x28..0x28 + volume_id.len()].copy_from_slice(volume_id.as_bytes());
    pvd[0x50..0x54].copy_from_slice(&next_lba.to_le_bytes());
    let root = record(&[0], root_lba, sector as u32, true);
    pvd[0x9C..0x9C + root.len()].copy_from_slice(&root);
    pvd[0x32D..0x33D].copy_from_slice(b"1999120112000000");

    image[root_lba as usize * sector..][..root_dir.len()].copy_from_slice(&root_dir);
    image[sub_lba as usize * sector..][..sub_dir.len()].copy_from_slice(&sub_dir);
    image
}
