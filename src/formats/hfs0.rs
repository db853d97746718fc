//! HFS0 - SHA-256 hashed flat container found on game cards.
//!
//! The card's root HFS0 lists the `normal`, `logo`, `update` and `secure`
//! partitions, each of which is itself an HFS0 of NCAs.
//!
//! ```text
//! header        "HFS0" | FileCount u32 | StringTableSize u32 | reserved u32
//! entry × N     DataOffset u64 | DataSize u64 | NameOffset u32 |
//!               HashedRegionSize u32 | reserved 8 | SHA-256 0x20     (0x40 bytes)
//! string table  NUL-terminated names
//! file data     DataOffset is relative to here
//! ```
//!
//! The effective data offset of an entry is `DataOffset + HashedRegionSize`.

use super::partition_fs::{Kind, PartitionFs};
use crate::Result;
use crate::resource::Resource;

/// Decode an HFS0 whose header sits at `base` in `resource`.
pub fn parse(resource: &mut dyn Resource, base: u64, max_size: Option<u64>) -> Result<PartitionFs> {
    PartitionFs::parse(resource, base, max_size, Kind::Hfs0)
}
