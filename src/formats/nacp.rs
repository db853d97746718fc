//! NACP - Application Control Property (`control.nacp`).
//!
//! Found in the RomFS of a Control NCA and, in plain text, in the asset
//! section of homebrew NROs. Only the fields romkit reports are decoded.
//!
//! ## Layout (0x4000 bytes)
//! ```text
//! [0x0000] ApplicationTitle[16]         (0x300 each: name 0x200, publisher 0x100)
//! [0x3000] Isbn                         (0x25 bytes)
//! [0x3025] StartupUserAccount           (u8)
//! [0x3028] AttributeFlag                (u32 LE)
//! [0x302C] SupportedLanguageFlag        (u32 LE)
//! [0x3030] ParentalControlFlag          (u32 LE)
//! [0x3034] Screenshot                   (u8)
//! [0x3035] VideoCapture                 (u8)
//! [0x3040] RatingAge[32]                (u8 each, 0xFF = unrated)
//! [0x3060] DisplayVersion               (0x10 bytes)
//! [0x3080] UserAccountSaveDataSize      (i64 LE)
//! [0x3090] DeviceSaveDataSize           (i64 LE)
//! [0x3148] UserAccountSaveDataSizeMax   (i64 LE)
//! [0x3158] DeviceSaveDataSizeMax        (i64 LE)
//! [0x3168] TemporaryStorageSize         (i64 LE)
//! [0x3170] CacheStorageSize             (i64 LE)
//! ```

use crate::metadata::Language;
use crate::utils::{le_u32_at, null_padded_utf8, slice};
use crate::{Error, Result};

/// Bytes that must be present for [`Nacp::parse`].
pub const MIN_SIZE: usize = 0x3178;
const TITLE_SIZE: usize = 0x300;

/// Title languages, in `ApplicationTitle` order. Bit `n` of
/// `SupportedLanguageFlag` refers to entry `n`.
pub const LANGUAGES: [&str; 16] = [
    "AmericanEnglish",
    "BritishEnglish",
    "Japanese",
    "French",
    "German",
    "LatinAmericanSpanish",
    "Spanish",
    "Italian",
    "Dutch",
    "CanadianFrench",
    "Portuguese",
    "Russian",
    "Korean",
    "TraditionalChinese",
    "SimplifiedChinese",
    "BrazilianPortuguese",
];

/// Rating organisations, in `RatingAge` order.
pub const RATING_ORGANISATIONS: [&str; 13] = [
    "CERO",
    "GRACGCRB",
    "GSRMR",
    "ESRB",
    "ClassInd",
    "USK",
    "PEGI",
    "PEGIPortugal",
    "PEGIBBFC",
    "Russian",
    "ACB",
    "OFLC",
    "IARCGeneric",
];

/// Metadata language for a NACP language name.
pub fn language(name: &str) -> Option<Language> {
    Some(match name {
        "AmericanEnglish" | "BritishEnglish" => Language::English,
        "Japanese" => Language::Japanese,
        "French" | "CanadianFrench" => Language::French,
        "German" => Language::German,
        "LatinAmericanSpanish" | "Spanish" => Language::Spanish,
        "Italian" => Language::Italian,
        "Dutch" => Language::Dutch,
        "Portuguese" | "BrazilianPortuguese" => Language::Portuguese,
        "Russian" => Language::Russian,
        "Korean" => Language::Korean,
        "TraditionalChinese" => Language::ChineseTraditional,
        "SimplifiedChinese" => Language::ChineseSimplified,
        _ => return None,
    })
}

/// A localized name/publisher pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub language: &'static str,
    pub name: String,
    pub publisher: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupUserAccount {
    None,
    Required,
    RequiredWithNetworkServiceAccountAvailable,
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCapture {
    Disabled,
    Manual,
    Enabled,
    Unknown(u8),
}

/// Save-related sizes, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSizes {
    pub user_account: i64,
    pub device: i64,
    pub user_account_max: i64,
    pub device_max: i64,
    pub temporary: i64,
    pub cache: i64,
}

impl SaveSizes {
    /// Whether the title stores any persistent save data.
    pub fn any(&self) -> bool {
        [self.user_account, self.device, self.user_account_max, self.device_max]
            .iter()
            .any(|&s| s > 0)
    }
}

/// Decoded control property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nacp {
    /// Non-empty titles in language order.
    pub titles: Vec<Title>,
    pub isbn: Option<String>,
    pub startup_user_account: StartupUserAccount,
    pub is_demo: bool,
    /// Names from [`LANGUAGES`] whose supported bit is set.
    pub supported_languages: Vec<&'static str>,
    pub parental_control: bool,
    pub screenshots_allowed: bool,
    pub video_capture: VideoCapture,
    /// `(organisation, minimum age)` for every rated organisation.
    pub rating_ages: Vec<(&'static str, u8)>,
    pub display_version: Option<String>,
    pub save: SaveSizes,
}

fn i64_at(buf: &[u8], offset: usize) -> Result<i64> {
    let b = slice(buf, offset, 8)?;
    let mut a = [0u8; 8];
    a.copy_from_slice(b);
    Ok(i64::from_le_bytes(a))
}

fn text_at(buf: &[u8], offset: usize, len: usize) -> Option<String> {
    slice(buf, offset, len)
        .ok()
        .and_then(|b| null_padded_utf8(b).ok())
        .filter(|s| !s.is_empty())
}

impl Nacp {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < MIN_SIZE {
            return Err(Error::UnexpectedEof);
        }

        let titles = LANGUAGES
            .iter()
            .enumerate()
            .filter_map(|(i, &language)| {
                let base = i * TITLE_SIZE;
                let name = text_at(buf, base, 0x200)?;
                let publisher = text_at(buf, base + 0x200, 0x100).unwrap_or_default();
                Some(Title {
                    language,
                    name,
                    publisher,
                })
            })
            .collect();

        let attributes = le_u32_at(buf, 0x3028)?;
        let language_flags = le_u32_at(buf, 0x302C)?;
        let supported_languages = LANGUAGES
            .iter()
            .enumerate()
            .filter(|(i, _)| language_flags & (1 << i) != 0)
            .map(|(_, &name)| name)
            .collect();

        let rating_ages = RATING_ORGANISATIONS
            .iter()
            .enumerate()
            .filter_map(|(i, &org)| {
                let age = buf[0x3040 + i];
                (age != 0xFF).then_some((org, age))
            })
            .collect();

        Ok(Self {
            titles,
            isbn: text_at(buf, 0x3000, 0x25),
            startup_user_account: match buf[0x3025] {
                0 => StartupUserAccount::None,
                1 => StartupUserAccount::Required,
                2 => StartupUserAccount::RequiredWithNetworkServiceAccountAvailable,
                other => StartupUserAccount::Unknown(other),
            },
            is_demo: attributes & 1 != 0,
            supported_languages,
            parental_control: le_u32_at(buf, 0x3030)? & 1 != 0,
            screenshots_allowed: buf[0x3034] == 0,
            video_capture: match buf[0x3035] {
                0 => VideoCapture::Disabled,
                1 => VideoCapture::Manual,
                2 => VideoCapture::Enabled,
                other => VideoCapture::Unknown(other),
            },
            rating_ages,
            display_version: text_at(buf, 0x3060, 0x10),
            save: SaveSizes {
                user_account: i64_at(buf, 0x3080)?,
                device: i64_at(buf, 0x3090)?,
                user_account_max: i64_at(buf, 0x3148)?,
                device_max: i64_at(buf, 0x3158)?,
                temporary: i64_at(buf, 0x3168)?,
                cache: i64_at(buf, 0x3170)?,
            },
        })
    }

    /// The title shown by default: the first non-empty one in language order.
    pub fn primary_title(&self) -> Option<&Title> {
        self.titles.first()
    }
}

/// Builder for test images.
#[cfg(test)]
pub(crate) struct NacpBuilder {
    buf: Vec<u8>,
}

#[cfg(test)]
impl NacpBuilder {
    pub fn new() -> Self {
        let mut buf = vec![0u8; 0x4000];
        buf[0x3040..0x3060].fill(0xFF);
        Self { buf }
    }

    pub fn title(mut self, language: usize, name: &str, publisher: &str) -> Self {
        let base = language * TITLE_SIZE;
        self.buf[base..base + name.len()].copy_from_slice(name.as_bytes());
        self.buf[base + 0x200..base + 0x200 + publisher.len()].copy_from_slice(publisher.as_bytes());
        let mask = le_u32_at(&self.buf, 0x302C).unwrap_or(0) | (1 << language);
        self.buf[0x302C..0x3030].copy_from_slice(&mask.to_le_bytes());
        self
    }

    pub fn version(mut self, v: &str) -> Self {
        self.buf[0x3060..0x3060 + v.len()].copy_from_slice(v.as_bytes());
        self
    }

    pub fn rating(mut self, org: usize, age: u8) -> Self {
        self.buf[0x3040 + org] = age;
        self
    }

    pub fn user_save(mut self, size: i64) -> Self {
        self.buf[0x3080..0x3088].copy_from_slice(&size.to_le_bytes());
        self
    }

    pub fn screenshots_denied(mut self) -> Self {
        self.buf[0x3034] = 1;
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decodes_titles_and_flags() {
        let buf = NacpBuilder::new()
            .title(0, "Super Game", "Good Publisher")
            .title(2, "スーパーゲーム", "良い出版社")
            .version("1.2.0")
            .rating(3, 10)
            .rating(6, 7)
            .user_save(0x10_0000)
            .screenshots_denied()
            .build();
        let nacp = Nacp::parse(&buf).unwrap();

        assert_eq!(nacp.titles.len(), 2);
        assert_eq!(nacp.primary_title().unwrap().publisher, "Good Publisher");
        assert_eq!(nacp.titles[1].language, "Japanese");
        assert_eq!(nacp.supported_languages, ["AmericanEnglish", "Japanese"]);
        assert_eq!(nacp.display_version.as_deref(), Some("1.2.0"));
        assert_eq!(nacp.rating_ages, [("ESRB", 10), ("PEGI", 7)]);
        assert!(nacp.save.any());
        assert!(!nacp.screenshots_allowed);
        assert_eq!(nacp.video_capture, VideoCapture::Disabled);
        assert_eq!(nacp.startup_user_account, StartupUserAccount::None);
    }

    #[test]
    fn truncated_nacp_rejected() {
        assert!(matches!(Nacp::parse(&[0u8; 0x100]), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn language_mapping() {
        assert_eq!(language("BritishEnglish"), Some(Language::English));
        assert_eq!(language("Klingon"), None);
    }
}
