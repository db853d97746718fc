//! Decoders for the binary containers and headers romkit understands.
//!
//! All decoders follow the same conventions:
//!
//! * **Bounded reads** - every read is an explicit `(offset, length)` window
//!   over a [`crate::resource::Resource`], and every length or count taken
//!   from the data is checked against its parent's size before use.
//! * **Metadata only** - `parse` methods read tables and headers; file
//!   contents are fetched on request, capped by a caller-supplied maximum.
//! * **No crypto** - decoders receive plaintext. Wii partitions are
//!   decrypted by [`crate::crypto::wii`]; Switch content archives go through
//!   [`crate::decrypt`].
//!
//! ## Format overview
//!
//! | Module | Format | Description |
//! |--------|--------|-------------|
//! | [`partition_fs`] | PFS0 / HFS0 | Shared flat-container table parser |
//! | [`pfs0`]       | PFS0 / NSP  | Outer container of Switch packages |
//! | [`hfs0`]       | HFS0        | SHA-256-hashed partitions inside XCI game cards |
//! | [`xci`]        | XCI         | Game card dump; root HFS0 of named partitions |
//! | [`cnmt`]       | CNMT        | Content manifest, binary or `.cnmt.xml` sidecar |
//! | [`nacp`]       | NACP        | Switch application control property |
//! | [`nro`]        | NRO         | Homebrew executable with an ASET asset section |
//! | [`gamecube`]   | GCM / BNR   | GameCube disc header, FST and `opening.bnr` |
//! | [`wii`]        | Wii disc    | Partition table, region settings and IMET banner |
//! | [`iso9660`]    | ISO 9660    | CD/UMD file system |
//! | [`disc_sheet`] | CUE/CCD/GDI | Track sheets and raw sector geometry |
//! | [`sfo`]        | PARAM.SFO   | PSP key/value parameter table |
//! | [`pbp`]        | PBP         | PSP `EBOOT.PBP` package |

pub mod cnmt;
pub mod disc_sheet;
pub mod gamecube;
pub mod hfs0;
pub mod iso9660;
pub mod nacp;
pub mod nro;
pub mod partition_fs;
pub mod pbp;
pub mod pfs0;
pub mod sfo;
pub mod wii;
pub mod xci;
