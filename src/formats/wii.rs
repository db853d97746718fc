//! Wii disc structures outside the GameCube-compatible boot header.
//!
//! ## Partition table (0x40000, big-endian)
//! ```text
//! [0x00] 4 x { count u32, table offset u32 (<< 2) }
//! table: count x { partition offset u32 (<< 2), type u32 (0 game, 1 update, 2 channel) }
//! ```
//!
//! ## Region settings (0x4E000)
//! ```text
//! [0x00] Region                   (u32: 0 JPN, 1 USA, 2 EUR, 4 KOR, 5 CHN)
//! [0x10] Age ratings[16]          (u8; bit 7 = unrated, low 5 bits = age)
//! ```
//!
//! ## Partition header (at partition offset)
//! ```text
//! [0x000] Ticket                  (0x2A4 bytes)
//!         [0x1BF] encrypted title key (16)
//!         [0x1DC] title ID            (8)
//! [0x2B8] Data offset             (u32, << 2, relative to partition)
//! [0x2BC] Data size               (u32, << 2)
//! ```
//!
//! ## IMET banner (`opening.bnr` inside the game partition)
//! ```text
//! [0x40] Magic "IMET"
//! [0x5C] Names[10]                (0x54 bytes each, UTF-16BE)
//! ```

use tracing::{debug, trace};

use crate::crypto::wii::{self, CLUSTER_SIZE, DATA_SIZE};
use crate::metadata::{Language, Region};
use crate::resource::{Resource, clamp};
use crate::utils::{be_u32_at, slice, utf16_be};
use crate::{Error, Result};

pub const PARTITION_TABLE: u64 = 0x40000;
pub const REGION_SETTINGS: u64 = 0x4E000;
/// Partition groups hold at most this many entries before we call it corrupt.
const MAX_PARTITIONS: u32 = 64;

/// Rating boards in region-settings order; unused slots are `None`.
pub const RATING_BOARDS: [Option<&str>; 16] = [
    Some("CERO"),
    Some("ESRB"),
    None,
    Some("USK"),
    Some("PEGI"),
    Some("PEGI Finland"),
    Some("PEGI Portugal"),
    Some("BBFC"),
    Some("ACB"),
    Some("GRB"),
    None,
    None,
    None,
    None,
    None,
    None,
];

/// IMET name languages in storage order.
pub const IMET_LANGUAGES: [Language; 10] = [
    Language::Japanese,
    Language::English,
    Language::German,
    Language::French,
    Language::Spanish,
    Language::Italian,
    Language::Dutch,
    Language::ChineseSimplified,
    Language::ChineseTraditional,
    Language::Korean,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Game,
    Update,
    Channel,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionInfo {
    pub offset: u64,
    pub kind: PartitionKind,
}

/// All partitions listed in the four partition groups.
pub fn partitions(resource: &mut dyn Resource) -> Result<Vec<PartitionInfo>> {
    let groups = resource.read_exact(PARTITION_TABLE, 0x20)?;
    let mut out = Vec::new();
    for g in 0..4 {
        let count = be_u32_at(&groups, g * 8)?;
        let table = u64::from(be_u32_at(&groups, g * 8 + 4)?) << 2;
        if count == 0 {
            continue;
        }
        if count > MAX_PARTITIONS {
            return Err(Error::malformed("WII", format!("{count} partitions in group {g}")));
        }
        let entries = resource.read_exact(table, count as usize * 8)?;
        for e in entries.chunks_exact(8) {
            let offset = u64::from(be_u32_at(e, 0)?) << 2;
            let kind = match be_u32_at(e, 4)? {
                0 => PartitionKind::Game,
                1 => PartitionKind::Update,
                2 => PartitionKind::Channel,
                other => PartitionKind::Other(other),
            };
            trace!(group = g, offset, ?kind, "partition");
            out.push(PartitionInfo { offset, kind });
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSettings {
    pub region: Option<Region>,
    pub raw_region: u32,
    /// `(board, minimum age)` for every rated board.
    pub ratings: Vec<(&'static str, u8)>,
}

impl RegionSettings {
    pub fn read(resource: &mut dyn Resource) -> Result<Self> {
        let buf = resource.read_exact(REGION_SETTINGS, 0x20)?;
        let raw_region = be_u32_at(&buf, 0)?;
        let region = match raw_region {
            0 => Some(Region::Japan),
            1 => Some(Region::Usa),
            2 => Some(Region::Europe),
            4 => Some(Region::Korea),
            5 => Some(Region::China),
            _ => None,
        };
        let ratings = RATING_BOARDS
            .iter()
            .zip(&buf[0x10..0x20])
            .filter_map(|(board, &age)| Some(((*board)?, age)))
            .filter(|&(_, age)| age & 0x80 == 0)
            .map(|(board, age)| (board, age & 0x1F))
            .collect();
        Ok(Self {
            region,
            raw_region,
            ratings,
        })
    }
}

/// Decrypted view of one partition's data area.
///
/// Logical offsets count only user data (0x7C00 bytes per cluster); the
/// most recently decrypted cluster is cached.
pub struct PartitionReader<'a> {
    parent: &'a mut dyn Resource,
    name: String,
    data_start: u64,
    clusters: u64,
    title_key: [u8; 16],
    cached: Option<(u64, Vec<u8>)>,
}

impl<'a> PartitionReader<'a> {
    /// Open the partition at `offset`, unwrapping its title key with
    /// `common_key`.
    pub fn open(parent: &'a mut dyn Resource, offset: u64, common_key: &[u8; 16]) -> Result<Self> {
        let header = parent.read_exact(offset, 0x2C0)?;
        let mut encrypted = [0u8; 16];
        encrypted.copy_from_slice(slice(&header, 0x1BF, 16)?);
        let mut title_id = [0u8; 8];
        title_id.copy_from_slice(slice(&header, 0x1DC, 8)?);
        let data_start = offset + (u64::from(be_u32_at(&header, 0x2B8)?) << 2);
        let data_size = u64::from(be_u32_at(&header, 0x2BC)?) << 2;

        let available = parent.size().saturating_sub(data_start);
        let clusters = data_size.min(available) / CLUSTER_SIZE;
        debug!(offset, data_start, clusters, "opened Wii partition");
        let name = format!("{}#partition@{offset:#x}", parent.name());
        Ok(Self {
            parent,
            name,
            data_start,
            clusters,
            title_key: wii::decrypt_title_key(common_key, &encrypted, &title_id),
            cached: None,
        })
    }

    fn cluster(&mut self, index: u64) -> Result<&[u8]> {
        if self.cached.as_ref().is_none_or(|(i, _)| *i != index) {
            let raw = self
                .parent
                .read_exact(self.data_start + index * CLUSTER_SIZE, CLUSTER_SIZE as usize)?;
            self.cached = Some((index, wii::decrypt_cluster(&self.title_key, &raw)?));
        }
        match &self.cached {
            Some((_, data)) => Ok(data),
            None => Err(Error::InvalidRange),
        }
    }
}

impl Resource for PartitionReader<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.clusters * DATA_SIZE
    }

    fn read(&mut self, seek_to: u64, amount: usize) -> Result<Vec<u8>> {
        let amount = clamp(self.size(), seek_to, amount);
        let mut out = Vec::with_capacity(amount);
        let mut pos = seek_to;
        while out.len() < amount {
            let index = pos / DATA_SIZE;
            let within = (pos % DATA_SIZE) as usize;
            let take = (amount - out.len()).min(DATA_SIZE as usize - within);
            let data = self.cluster(index)?;
            out.extend_from_slice(&data[within..within + take]);
            pos += take as u64;
        }
        Ok(out)
    }
}

/// Localized channel names from an IMET banner.
pub fn imet_names(buf: &[u8]) -> Result<Vec<(Language, String)>> {
    if buf.get(0x40..0x44) != Some(&b"IMET"[..]) {
        return Err(Error::malformed("IMET", "bad magic"));
    }
    let mut names = Vec::new();
    for (i, language) in IMET_LANGUAGES.iter().enumerate() {
        let name = utf16_be(slice(buf, 0x5C + i * 0x54, 0x54)?)?;
        if !name.is_empty() {
            names.push((*language, name));
        }
    }
    Ok(names)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::crypto::wii::{CLUSTER_SIZE, DATA_SIZE, cbc_encrypt, encrypt_cluster};

    pub const PARTITION_OFFSET: u64 = 0x50000;
    const DATA_OFFSET: u64 = 0x20000;

    /// A disc with one game partition whose decrypted data is `data`.
    pub fn disc(header: &[u8], common_key: &[u8; 16], title_key: &[u8; 16], data: &[u8]) -> Vec<u8> {
        let clusters = data.len().div_ceil(DATA_SIZE as usize).max(1);
        let total = PARTITION_OFFSET + DATA_OFFSET + clusters as u64 * CLUSTER_SIZE;
        let mut image = vec![0u8; total as usize];
        image[..header.len()].copy_from_slice(header);

        // one group, one game partition
        let table = 0x40020u32;
        image[0x40000..0x40004].copy_from_slice(&1u32.to_be_bytes());
        image[0x40004..0x40008].copy_from_slice(&(table >> 2).to_be_bytes());
        let t = table as usize;
        image[t..t + 4].copy_from_slice(&((PARTITION_OFFSET >> 2) as u32).to_be_bytes());

        image[0x4E000..0x4E004].copy_from_slice(&1u32.to_be_bytes());
        image[0x4E010..0x4E020].fill(0x80);
        image[0x4E011] = 13;

        let p = PARTITION_OFFSET as usize;
        let title_id = *b"\x00\x01\x00\x00RMGE";
        let mut iv = [0u8; 16];
        iv[..8].copy_from_slice(&title_id);
        let mut wrapped = *title_key;
        cbc_encrypt(common_key, &iv, &mut wrapped);
        image[p + 0x1BF..p + 0x1CF].copy_from_slice(&wrapped);
        image[p + 0x1DC..p + 0x1E4].copy_from_slice(&title_id);
        image[p + 0x2B8..p + 0x2BC].copy_from_slice(&((DATA_OFFSET >> 2) as u32).to_be_bytes());
        let size = clusters as u64 * CLUSTER_SIZE;
        image[p + 0x2BC..p + 0x2C0].copy_from_slice(&((size >> 2) as u32).to_be_bytes());

        for (i, chunk) in data.chunks(DATA_SIZE as usize).enumerate() {
            let at = (PARTITION_OFFSET + DATA_OFFSET) as usize + i * CLUSTER_SIZE as usize;
            let cluster = encrypt_cluster(title_key, chunk, [i as u8 + 1; 16]);
            image[at..at + CLUSTER_SIZE as usize].copy_from_slice(&cluster);
        }
        image
    }

    /// IMET banner naming the channel in English and Japanese.
    pub fn imet(english: &str, japanese: &str) -> Vec<u8> {
        let mut b = vec![0u8; 0x600];
        b[0x40..0x44].copy_from_slice(b"IMET");
        for (slot, text) in [(0usize, japanese), (1, english)] {
            let at = 0x5C + slot * 0x54;
            for (i, unit) in text.encode_utf16().enumerate() {
                b[at + i * 2..at + i * 2 + 2].copy_from_slice(&unit.to_be_bytes());
            }
        }
        b
    }
}
