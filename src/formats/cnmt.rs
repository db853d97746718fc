//! CNMT - Content Meta, the package manifest inside a Meta NCA.
//!
//! ## Header (0x20 bytes)
//! ```text
//! [0x00] TitleId                      (u64 LE)
//! [0x08] Version                      (u32 LE)
//! [0x0C] ContentMetaType              (u8)
//! [0x0D] Reserved                     (u8)
//! [0x0E] ExtendedHeaderSize           (u16 LE)
//! [0x10] ContentCount                 (u16 LE)
//! [0x12] ContentMetaCount             (u16 LE)
//! [0x14] ContentMetaAttributes        (u8)
//! [0x15] Reserved                     (11 bytes)
//! ```
//! Followed by `ExtendedHeaderSize` bytes of type-specific header, then
//! `ContentCount` content records.
//!
//! ## Content record (0x38 bytes)
//! ```text
//! [0x00] SHA-256 hash                 (32 bytes)
//! [0x20] ContentId                    (16 bytes)
//! [0x30] Size                         (48-bit LE)
//! [0x36] ContentType                  (u8)
//! [0x37] IdOffset                     (u8)
//! ```
//!
//! Packages whose Meta NCA cannot be decrypted usually carry the same
//! information as a `*.cnmt.xml` sidecar; [`ContentMeta::from_xml`] reads it.

use std::fmt;
use std::io::Cursor;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::utils::{bytesa, hex, le_u16, le_u32, u8};
use crate::{Error, Result};

pub const HEADER_SIZE: usize = 0x20;
pub const RECORD_SIZE: usize = 0x38;

/// A 64-bit title id.
///
/// Stored little-endian on disk and conventionally written as 16 uppercase
/// hex digits in big-endian order, e.g. `0100000000010000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TitleId(pub u64);

impl TitleId {
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Parse the textual form, with or without a `0x` prefix.
    pub fn parse_hex(text: &str) -> Result<Self> {
        let text = text.trim();
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| Error::Parse("title id is not hex"))
    }

    /// The base application this title belongs to (patches and add-ons
    /// share the upper bits).
    pub fn base_application(self) -> Self {
        Self(self.0 & !0xFFF)
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

macro_rules! code_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $($variant,)*
            Unknown(u8),
        }

        impl From<u8> for $name {
            fn from(v: u8) -> Self {
                match v {
                    $($code => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }
        }

        impl $name {
            /// Resolve the name used in `.cnmt.xml` sidecars.
            pub fn from_name(name: &str) -> Self {
                let name = name.trim();
                $(
                    if name == stringify!($variant) {
                        return Self::$variant;
                    }
                )*
                Self::Unknown(0xFF)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)*
                    Self::Unknown(v) => write!(f, "Unknown({v:#04x})"),
                }
            }
        }
    };
}

code_enum! {
    /// What a content record holds.
    ContentType {
        Meta = 0,
        Program = 1,
        Data = 2,
        Control = 3,
        HtmlDocument = 4,
        LegalInformation = 5,
        DeltaFragment = 6,
    }
}

code_enum! {
    /// What kind of title a content meta describes.
    MetaType {
        SystemProgram = 0x01,
        SystemData = 0x02,
        SystemUpdate = 0x03,
        BootImagePackage = 0x04,
        BootImagePackageSafe = 0x05,
        Application = 0x80,
        Patch = 0x81,
        AddOnContent = 0x82,
        Delta = 0x83,
        DataPatch = 0x84,
    }
}

/// One content (NCA) referenced by a content meta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRecord {
    /// 32 lowercase hex digits; the NCA's file name without extension.
    pub content_id: String,
    pub size: u64,
    pub content_type: ContentType,
}

/// A decoded content meta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentMeta {
    pub title_id: TitleId,
    pub version: u32,
    pub meta_type: MetaType,
    /// Keyed by content id, in record order.
    pub contents: IndexMap<String, ContentRecord>,
}

impl ContentMeta {
    /// Decode a binary `.cnmt`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof);
        }
        let mut r = Cursor::new(buf);
        let title_id = TitleId::from_bytes(bytesa(&mut r)?);
        let version = le_u32(&mut r)?;
        let meta_type = MetaType::from(u8(&mut r)?);
        let _reserved = u8(&mut r)?;
        let extended_header_size = le_u16(&mut r)?;
        let content_count = le_u16(&mut r)?;

        let records_start = HEADER_SIZE + usize::from(extended_header_size);
        let records_len = usize::from(content_count) * RECORD_SIZE;
        let records = buf
            .get(records_start..records_start + records_len)
            .ok_or_else(|| {
                Error::malformed(
                    "CNMT",
                    format!("{content_count} records at {records_start:#x} exceed {:#x} bytes", buf.len()),
                )
            })?;

        let mut contents = IndexMap::with_capacity(usize::from(content_count));
        for record in records.chunks_exact(RECORD_SIZE) {
            let mut r = Cursor::new(&record[0x20..]);
            let content_id = hex(&bytesa::<0x10>(&mut r)?);
            let size_bytes = bytesa::<6>(&mut r)?;
            let mut size = [0u8; 8];
            size[..6].copy_from_slice(&size_bytes);
            let content_type = ContentType::from(u8(&mut r)?);
            trace!(%content_id, %content_type, "content record");
            contents.insert(
                content_id.clone(),
                ContentRecord {
                    content_id,
                    size: u64::from_le_bytes(size),
                    content_type,
                },
            );
        }

        Ok(Self {
            title_id,
            version,
            meta_type,
            contents,
        })
    }

    /// Decode a `.cnmt.xml` sidecar.
    pub fn from_xml(text: &str) -> Result<Self> {
        let doc: XmlContentMeta = quick_xml::de::from_str(text)?;
        let contents = doc
            .contents
            .into_iter()
            .map(|c| {
                let record = ContentRecord {
                    content_id: c.id.trim().to_ascii_lowercase(),
                    size: c.size,
                    content_type: ContentType::from_name(&c.content_type),
                };
                (record.content_id.clone(), record)
            })
            .collect();
        Ok(Self {
            title_id: TitleId::parse_hex(&doc.id)?,
            version: doc.version,
            meta_type: MetaType::from_name(&doc.meta_type),
            contents,
        })
    }

    /// First content record of the given type.
    pub fn first_of(&self, content_type: ContentType) -> Option<&ContentRecord> {
        self.contents.values().find(|c| c.content_type == content_type)
    }
}

#[derive(Debug, Deserialize)]
struct XmlContentMeta {
    #[serde(rename = "Type")]
    meta_type: String,
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Version", default)]
    version: u32,
    #[serde(rename = "Content", default)]
    contents: Vec<XmlContent>,
}

#[derive(Debug, Deserialize)]
struct XmlContent {
    #[serde(rename = "Type")]
    content_type: String,
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Size", default)]
    size: u64,
}

/// Pick the authoritative content meta from a package.
///
/// One candidate is returned as-is. With several, the single `Application`
/// wins; if there is no unique one, the first candidate is returned. This
/// is a heuristic: a package could in principle bundle two applications.
pub fn choose_main(candidates: &[ContentMeta]) -> Option<&ContentMeta> {
    if candidates.len() == 1 {
        return candidates.first();
    }
    let mut applications = candidates
        .iter()
        .filter(|c| c.meta_type == MetaType::Application);
    match (applications.next(), applications.next()) {
        (Some(only), None) => Some(only),
        _ => candidates.first(),
    }
}

/// Build a binary `.cnmt` for tests.
#[cfg(test)]
pub(crate) fn build(title_id: u64, version: u32, meta_type: u8, contents: &[([u8; 16], u64, u8)]) -> Vec<u8> {
    let ext_header = [0u8; 0x10];
    let mut out = Vec::new();
    out.extend_from_slice(&title_id.to_le_bytes());
    out.extend_from_slice(&version.to_le_bytes());
    out.push(meta_type);
    out.push(0);
    out.extend_from_slice(&(ext_header.len() as u16).to_le_bytes());
    out.extend_from_slice(&(contents.len() as u16).to_le_bytes());
    out.resize(HEADER_SIZE, 0);
    out.extend_from_slice(&ext_header);
    for (id, size, ty) in contents {
        out.extend_from_slice(&[0u8; 0x20]);
        out.extend_from_slice(id);
        out.extend_from_slice(&size.to_le_bytes()[..6]);
        out.push(*ty);
        out.push(0);
    }
    out
}
