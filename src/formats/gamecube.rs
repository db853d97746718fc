//! GameCube / Wii optical disc: boot header, file system table and the
//! `opening.bnr` banner.
//!
//! ## Disc header (big-endian)
//! ```text
//! [0x000] Game ID                 (6 bytes: system, game x2, region, maker x2)
//! [0x006] Disc number             (u8)
//! [0x007] Revision                (u8)
//! [0x018] Wii magic 0x5D1C9EA3    (u32)
//! [0x01C] GameCube magic 0xC2339F3D (u32)
//! [0x020] Internal title          (0x3E0 bytes)
//! [0x424] FST offset              (u32, << 2 on Wii)
//! [0x428] FST size                (u32, << 2 on Wii)
//! ```
//!
//! ## FST entry (12 bytes)
//! ```text
//! [0x0] Flags (1 = directory)     (u8)
//! [0x1] Name offset               (u24, into the string table)
//! [0x4] File: data offset  / Dir: parent index
//! [0x8] File: data size    / Dir: index one past the last child
//! ```
//! Entry 0 is the root; its `[0x8]` is the total entry count. The string
//! table follows the last entry.
//!
//! ## Banner (`opening.bnr`)
//! ```text
//! [0x0000] Magic "BNR1" (one text block) or "BNR2" (six)
//! [0x0020] Image                  (96x32 RGB5A3, 0x1800 bytes)
//! [0x1820] Text blocks            (0x140 each)
//!          [+0x00] Short title 0x20, [+0x20] short maker 0x20,
//!          [+0x40] long title 0x40,  [+0x80] long maker 0x40,
//!          [+0xC0] description 0x80
//! ```
//! BNR2 blocks are English, German, French, Spanish, Italian, Dutch.

use tracing::{debug, trace};

use crate::metadata::{Language, Region};
use crate::resource::Resource;
use crate::utils::{be_u32_at, latin1, shift_jis, slice};
use crate::{Error, Result};

pub const HEADER_SIZE: usize = 0x440;
pub const GAMECUBE_MAGIC: u32 = 0xC233_9F3D;
pub const WII_MAGIC: u32 = 0x5D1C_9EA3;
/// File system tables larger than this are treated as corrupt.
const MAX_FST_SIZE: u64 = 16 << 20;
const BANNER_TEXT: usize = 0x1820;
const BANNER_BLOCK: usize = 0x140;

/// Languages of the six BNR2 text blocks.
pub const BNR2_LANGUAGES: [Language; 6] = [
    Language::English,
    Language::German,
    Language::French,
    Language::Spanish,
    Language::Italian,
    Language::Dutch,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscHeader {
    pub game_id: String,
    pub disc_number: u8,
    pub revision: u8,
    pub title: String,
    pub is_wii: bool,
    /// Raw FST offset and size as stored; see [`DiscHeader::fst_location`].
    pub fst_offset: u32,
    pub fst_size: u32,
}

impl DiscHeader {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let buf = slice(buf, 0, HEADER_SIZE)?;
        let is_wii = be_u32_at(buf, 0x18)? == WII_MAGIC;
        if !is_wii && be_u32_at(buf, 0x1C)? != GAMECUBE_MAGIC {
            return Err(Error::malformed("GCM", "no GameCube or Wii disc magic"));
        }
        let game_id = &buf[..6];
        if !game_id.iter().all(u8::is_ascii_alphanumeric) {
            return Err(Error::malformed("GCM", "game ID is not alphanumeric"));
        }
        Ok(Self {
            game_id: String::from_utf8_lossy(game_id).into_owned(),
            disc_number: buf[6],
            revision: buf[7],
            title: latin1(&buf[0x20..0x400]),
            is_wii,
            fst_offset: be_u32_at(buf, 0x424)?,
            fst_size: be_u32_at(buf, 0x428)?,
        })
    }

    /// The four-character product code (`GALE`).
    pub fn product_code(&self) -> &str {
        &self.game_id[..4]
    }

    /// Two-character maker code (`01`).
    pub fn maker_code(&self) -> &str {
        &self.game_id[4..6]
    }

    pub fn region_char(&self) -> char {
        char::from(self.game_id.as_bytes()[3])
    }

    /// Byte offset and size of the FST in the (decrypted) data area.
    pub fn fst_location(&self) -> (u64, u64) {
        let shift = if self.is_wii { 2 } else { 0 };
        (u64::from(self.fst_offset) << shift, u64::from(self.fst_size) << shift)
    }
}

/// Region implied by the fourth game ID character.
pub fn region(code: char) -> Option<Region> {
    Some(match code {
        'J' => Region::Japan,
        'E' | 'N' => Region::Usa,
        'P' | 'X' | 'Y' | 'Z' => Region::Europe,
        'K' | 'Q' | 'T' => Region::Korea,
        'W' => Region::Taiwan,
        'C' => Region::China,
        'D' => Region::Germany,
        'F' => Region::France,
        'S' => Region::Spain,
        'I' => Region::Italy,
        'H' => Region::Netherlands,
        'U' => Region::Australia,
        'R' => Region::Russia,
        'A' => Region::World,
        _ => return None,
    })
}

/// One file in the FST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstFile {
    /// Slash-separated path from the root.
    pub path: String,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fst {
    pub files: Vec<FstFile>,
}

impl Fst {
    /// Decode a file system table. File offsets are shifted left by
    /// `shift` (2 on Wii).
    pub fn parse(buf: &[u8], shift: u32) -> Result<Self> {
        let count = be_u32_at(buf, 8)? as usize;
        let strings = count
            .checked_mul(12)
            .filter(|&end| count > 0 && end <= buf.len())
            .ok_or_else(|| Error::malformed("FST", format!("{count} entries do not fit")))?;

        let mut files = Vec::new();
        let mut dirs: Vec<(String, usize)> = Vec::new();
        for i in 1..count {
            let e = &buf[i * 12..i * 12 + 12];
            let name_offset = (be_u32_at(e, 0)? & 0x00FF_FFFF) as usize;
            let name = buf
                .get(strings + name_offset..)
                .map(|s| {
                    let end = s.iter().position(|&b| b == 0).unwrap_or(s.len());
                    latin1(&s[..end])
                })
                .unwrap_or_default();
            let a = be_u32_at(e, 4)?;
            let b = be_u32_at(e, 8)?;

            while dirs.last().is_some_and(|&(_, end)| i >= end) {
                dirs.pop();
            }
            if e[0] & 1 != 0 {
                dirs.push((name, b as usize));
                continue;
            }
            let mut path = String::new();
            for (dir, _) in &dirs {
                path.push_str(dir);
                path.push('/');
            }
            path.push_str(&name);
            trace!(path, offset = a, size = b, "FST file");
            files.push(FstFile {
                path,
                offset: u64::from(a) << shift,
                size: u64::from(b),
            });
        }
        Ok(Self { files })
    }

    /// Read and decode the FST a header points at.
    pub fn read(resource: &mut dyn Resource, header: &DiscHeader) -> Result<Self> {
        let (offset, size) = header.fst_location();
        if size == 0 || size > MAX_FST_SIZE {
            return Err(Error::malformed("FST", format!("size {size:#x}")));
        }
        let buf = resource.read_exact(offset, size as usize)?;
        let fst = Self::parse(&buf, if header.is_wii { 2 } else { 0 })?;
        debug!(files = fst.files.len(), "read FST");
        Ok(fst)
    }

    /// Case-insensitive lookup by path.
    pub fn find(&self, path: &str) -> Option<&FstFile> {
        let path = path.trim_start_matches('/');
        self.files.iter().find(|f| f.path.eq_ignore_ascii_case(path))
    }
}

/// One localized banner text block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerText {
    pub short_title: String,
    pub short_maker: String,
    pub long_title: String,
    pub long_maker: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub is_bnr2: bool,
    pub texts: Vec<BannerText>,
}

impl Banner {
    /// Smallest valid banner (BNR1).
    pub const MIN_SIZE: usize = BANNER_TEXT + BANNER_BLOCK;
    /// Largest banner worth reading (BNR2).
    pub const MAX_SIZE: usize = BANNER_TEXT + 6 * BANNER_BLOCK;

    /// Decode a banner. `japanese` selects Shift-JIS over Latin-1.
    pub fn parse(buf: &[u8], japanese: bool) -> Result<Self> {
        let is_bnr2 = match buf.get(..4) {
            Some(b"BNR1") => false,
            Some(b"BNR2") => true,
            _ => return Err(Error::malformed("BNR", "bad magic")),
        };
        let blocks = if is_bnr2 { 6 } else { 1 };
        let decode = |b: &[u8]| if japanese { shift_jis(b) } else { Ok(latin1(b)) };

        let mut texts = Vec::with_capacity(blocks);
        for i in 0..blocks {
            let block = slice(buf, BANNER_TEXT + i * BANNER_BLOCK, BANNER_BLOCK)?;
            texts.push(BannerText {
                short_title: decode(&block[0x00..0x20])?,
                short_maker: decode(&block[0x20..0x40])?,
                long_title: decode(&block[0x40..0x80])?,
                long_maker: decode(&block[0x80..0xC0])?,
                description: decode(&block[0xC0..0x140])?,
            });
        }
        Ok(Self { is_bnr2, texts })
    }

    /// Text blocks paired with their language (BNR1's single block is the
    /// disc's own language and reported as `None`).
    pub fn localized(&self) -> impl Iterator<Item = (Option<Language>, &BannerText)> {
        self.texts.iter().enumerate().map(|(i, t)| {
            let language = if self.is_bnr2 { BNR2_LANGUAGES.get(i).copied() } else { None };
            (language, t)
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Builder for GameCube disc images with a root-level FST.
    pub struct DiscBuilder {
        pub image: Vec<u8>,
        files: Vec<(String, Vec<u8>)>,
    }

    impl DiscBuilder {
        pub fn new(game_id: &str, title: &str) -> Self {
            let mut image = vec![0u8; 0x2440];
            image[..6].copy_from_slice(game_id.as_bytes());
            image[7] = 1;
            image[0x1C..0x20].copy_from_slice(&super::GAMECUBE_MAGIC.to_be_bytes());
            image[0x20..0x20 + title.len()].copy_from_slice(title.as_bytes());
            Self {
                image,
                files: Vec::new(),
            }
        }

        pub fn file(mut self, name: &str, data: Vec<u8>) -> Self {
            self.files.push((name.to_owned(), data));
            self
        }

        pub fn build(mut self) -> Vec<u8> {
            let count = self.files.len() + 1;
            let mut strings = Vec::new();
            let mut entries = vec![0u8; count * 12];
            entries[0] = 1;
            entries[8..12].copy_from_slice(&(count as u32).to_be_bytes());

            let fst_offset = self.image.len();
            let fst_size = count * 12 + self.files.iter().map(|(n, _)| n.len() + 1).sum::<usize>();
            let mut data_at = (fst_offset + fst_size).next_multiple_of(0x20);
            let mut payload = Vec::new();
            for (i, (name, data)) in self.files.iter().enumerate() {
                let e = &mut entries[(i + 1) * 12..(i + 2) * 12];
                e[0..4].copy_from_slice(&(strings.len() as u32).to_be_bytes());
                e[4..8].copy_from_slice(&(data_at as u32).to_be_bytes());
                e[8..12].copy_from_slice(&(data.len() as u32).to_be_bytes());
                strings.extend_from_slice(name.as_bytes());
                strings.push(0);
                payload.push((data_at, data.clone()));
                data_at = (data_at + data.len()).next_multiple_of(0x20);
            }

            self.image[0x424..0x428].copy_from_slice(&(fst_offset as u32).to_be_bytes());
            self.image[0x428..0x42C].copy_from_slice(&(fst_size as u32).to_be_bytes());
            self.image.extend(entries);
            self.image.extend(strings);
            for (at, data) in payload {
                self.image.resize(at, 0);
                self.image.extend(data);
            }
            self.image
        }
    }

    /// A BNR1 banner with one text block.
    pub fn banner(short_title: &[u8], maker: &[u8], long_title: &[u8], description: &[u8]) -> Vec<u8> {
        let mut b = vec![0u8; super::Banner::MIN_SIZE];
        b[..4].copy_from_slice(b"BNR1");
        let t = super::BANNER_TEXT;
        b[t..t + short_title.len()].copy_from_slice(short_title);
        b[t + 0x20..t + 0x20 + maker.len()].copy_from_slice(maker);
        b[t + 0x40..t + 0x40 + long_title.len()].copy_from_slice(long_title);
        b[t + 0x80..t + 0x80 + maker.len()].copy_from_slice(maker);
        b[t + 0xC0..t + 0xC0 + description.len()].copy_from_slice(description);
        b
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::fixtures::{DiscBuilder, banner};
    use super::*;
    use crate::resource::MemoryResource;

    #[test]
    fn header_and_fst() {
        let image = DiscBuilder::new("GALE01", "Super Smash Bros. Melee")
            .file("boot.bin", vec![1; 4])
            .file("opening.bnr", banner(b"Melee", b"Nintendo", b"Super Smash Bros. Melee", b"Fight"))
            .build();
        let header = DiscHeader::parse(&image).unwrap();
        assert_eq!(header.product_code(), "GALE");
        assert_eq!(header.maker_code(), "01");
        assert_eq!(region(header.region_char()), Some(Region::Usa));
        assert_eq!(header.revision, 1);
        assert!(!header.is_wii);

        let mut r = MemoryResource::new("melee.iso", image);
        let fst = Fst::read(&mut r, &header).unwrap();
        let bnr = fst.find("OPENING.BNR").unwrap();
        let data = r.read_exact(bnr.offset, bnr.size as usize).unwrap();
        let banner = Banner::parse(&data, false).unwrap();
        assert_eq!(banner.texts[0].long_title, "Super Smash Bros. Melee");
        assert_eq!(banner.texts[0].short_maker, "Nintendo");
        assert_eq!(banner.localized().next().unwrap().0, None);
    }

    #[test]
    fn nested_directories_build_paths() {
        let mut fst = vec![0u8; 4 * 12];
        fst[8..12].copy_from_slice(&4u32.to_be_bytes());
        // dir "a" covering entries 1..3, file "a/b", file "c"
        fst[12] = 1;
        fst[12 + 8..12 + 12].copy_from_slice(&3u32.to_be_bytes());
        fst[24..28].copy_from_slice(&2u32.to_be_bytes());
        fst[28..32].copy_from_slice(&0x10u32.to_be_bytes());
        fst[36..40].copy_from_slice(&4u32.to_be_bytes());
        fst[40..44].copy_from_slice(&0x20u32.to_be_bytes());
        fst.extend_from_slice(b"a\0b\0c\0");
        let parsed = Fst::parse(&fst, 2).unwrap();
        let paths: Vec<_> = parsed.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["a/b", "c"]);
        assert_eq!(parsed.files[0].offset, 0x40);
    }

    #[test]
    fn shift_jis_banner() {
        let (title, _, _) = encoding_rs::SHIFT_JIS.encode("ゼルダ");
        let data = banner(&title, b"Nintendo", &title, b"");
        let banner = Banner::parse(&data, true).unwrap();
        assert_eq!(banner.texts[0].short_title, "ゼルダ");
    }

    #[test]
    fn invalid_banner_magic() {
        let mut data = banner(b"x", b"y", b"z", b"");
        data[..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            Banner::parse(&data, false),
            Err(Error::MalformedContainer { format: "BNR", .. })
        ));
    }

    #[test]
    fn rejects_non_disc() {
        assert!(DiscHeader::parse(&[0u8; HEADER_SIZE]).is_err());
    }
}
