//! Regions and languages.

use std::fmt;

use serde::Serialize;

/// A release region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Region {
    Japan,
    Usa,
    Europe,
    Korea,
    Taiwan,
    China,
    Asia,
    Australia,
    Brazil,
    Canada,
    France,
    Germany,
    Spain,
    Italy,
    Netherlands,
    Sweden,
    UnitedKingdom,
    Russia,
    HongKong,
    World,
}

impl Region {
    /// Resolve a bracketed file name tag such as `USA` or `Europe`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag.trim().to_ascii_lowercase().as_str() {
            "japan" | "jp" | "jpn" | "j" => Self::Japan,
            "usa" | "us" | "u" | "america" => Self::Usa,
            "europe" | "eu" | "eur" | "e" | "pal" => Self::Europe,
            "korea" | "kr" | "k" => Self::Korea,
            "taiwan" | "tw" => Self::Taiwan,
            "china" | "cn" => Self::China,
            "asia" => Self::Asia,
            "australia" | "au" => Self::Australia,
            "brazil" | "br" => Self::Brazil,
            "canada" | "ca" => Self::Canada,
            "france" | "fr" => Self::France,
            "germany" | "de" => Self::Germany,
            "spain" | "es" => Self::Spain,
            "italy" | "it" => Self::Italy,
            "netherlands" | "nl" => Self::Netherlands,
            "sweden" | "se" => Self::Sweden,
            "uk" | "united kingdom" => Self::UnitedKingdom,
            "russia" | "ru" => Self::Russia,
            "hong kong" | "hk" => Self::HongKong,
            "world" | "w" => Self::World,
            _ => return None,
        })
    }

    /// The language a release for this region is almost always in, if there is one.
    pub fn primary_language(self) -> Option<Language> {
        Some(match self {
            Self::Japan => Language::Japanese,
            Self::Usa | Self::Australia | Self::UnitedKingdom => Language::English,
            Self::Korea => Language::Korean,
            Self::Taiwan | Self::HongKong => Language::ChineseTraditional,
            Self::China => Language::ChineseSimplified,
            Self::Brazil => Language::Portuguese,
            Self::France => Language::French,
            Self::Germany => Language::German,
            Self::Spain => Language::Spanish,
            Self::Italy => Language::Italian,
            Self::Netherlands => Language::Dutch,
            Self::Sweden => Language::Swedish,
            Self::Russia => Language::Russian,
            Self::Europe | Self::Asia | Self::Canada | Self::World => return None,
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Japan => "Japan",
            Self::Usa => "USA",
            Self::Europe => "Europe",
            Self::Korea => "Korea",
            Self::Taiwan => "Taiwan",
            Self::China => "China",
            Self::Asia => "Asia",
            Self::Australia => "Australia",
            Self::Brazil => "Brazil",
            Self::Canada => "Canada",
            Self::France => "France",
            Self::Germany => "Germany",
            Self::Spain => "Spain",
            Self::Italy => "Italy",
            Self::Netherlands => "Netherlands",
            Self::Sweden => "Sweden",
            Self::UnitedKingdom => "United Kingdom",
            Self::Russia => "Russia",
            Self::HongKong => "Hong Kong",
            Self::World => "World",
        })
    }
}

/// A supported language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Language {
    Japanese,
    English,
    French,
    German,
    Spanish,
    Italian,
    Dutch,
    Portuguese,
    Russian,
    Korean,
    ChineseTraditional,
    ChineseSimplified,
    Swedish,
    Danish,
    Norwegian,
    Finnish,
    Polish,
}

impl Language {
    /// Resolve a two-letter tag as used in `(En,Fr,De)` file name groups.
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code.trim().to_ascii_lowercase().as_str() {
            "ja" => Self::Japanese,
            "en" => Self::English,
            "fr" => Self::French,
            "de" => Self::German,
            "es" => Self::Spanish,
            "it" => Self::Italian,
            "nl" => Self::Dutch,
            "pt" => Self::Portuguese,
            "ru" => Self::Russian,
            "ko" => Self::Korean,
            "zh" | "zh-hant" => Self::ChineseTraditional,
            "zh-hans" => Self::ChineseSimplified,
            "sv" => Self::Swedish,
            "da" => Self::Danish,
            "no" => Self::Norwegian,
            "fi" => Self::Finnish,
            "pl" => Self::Polish,
            _ => return None,
        })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Japanese => "Japanese",
            Self::English => "English",
            Self::French => "French",
            Self::German => "German",
            Self::Spanish => "Spanish",
            Self::Italian => "Italian",
            Self::Dutch => "Dutch",
            Self::Portuguese => "Portuguese",
            Self::Russian => "Russian",
            Self::Korean => "Korean",
            Self::ChineseTraditional => "Chinese (Traditional)",
            Self::ChineseSimplified => "Chinese (Simplified)",
            Self::Swedish => "Swedish",
            Self::Danish => "Danish",
            Self::Norwegian => "Norwegian",
            Self::Finnish => "Finnish",
            Self::Polish => "Polish",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_and_codes() {
        assert_eq!(Region::from_tag("USA"), Some(Region::Usa));
        assert_eq!(Region::from_tag(" Europe "), Some(Region::Europe));
        assert_eq!(Region::from_tag("Rev 1"), None);
        assert_eq!(Language::from_code("Fr"), Some(Language::French));
        assert_eq!(Region::Japan.primary_language(), Some(Language::Japanese));
        assert_eq!(Region::Europe.primary_language(), None);
    }
}
