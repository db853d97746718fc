//! PFS0 - flat container used as the outer layer of NSP packages.
//!
//! ```text
//! header        "PFS0" | FileCount u32 | StringTableSize u32 | reserved u32
//! entry × N     DataOffset u64 | DataSize u64 | NameOffset u32 | reserved u32   (0x18 bytes)
//! string table  NUL-terminated names
//! file data     DataOffset is relative to here
//! ```
//!
//! An NSP typically holds `<content id>.nca` files, one `<content id>.cnmt.nca`,
//! optionally its `.cnmt.xml` rendering, plus ticket and certificate files.

use super::partition_fs::{Kind, PartitionFs};
use crate::Result;
use crate::resource::Resource;

/// Decode a PFS0 whose header sits at `base` in `resource`.
///
/// `max_size` is the declared size of the container when known - the file
/// size for a top-level NSP.
pub fn parse(resource: &mut dyn Resource, base: u64, max_size: Option<u64>) -> Result<PartitionFs> {
    PartitionFs::parse(resource, base, max_size, Kind::Pfs0)
}
