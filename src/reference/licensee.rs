//! Compiled-in publisher code tables.
//!
//! | Table | Keyed by | Used for |
//! |-------|----------|----------|
//! | [`nintendo`]       | two-character maker code (`"01"`, `"8P"`) | Game Boy (new licensee), GBA, N64, GameCube, Wii |
//! | [`nintendo_old`]   | one header byte                           | Game Boy (old licensee at 0x14B) |
//! | [`sega`]           | `T-xx` third-party code                   | Mega Drive, Saturn, Dreamcast |
//!
//! Each table is turned into a `HashMap` the first time it is queried and
//! then shared read-only for the rest of the process.

use std::collections::HashMap;
use std::sync::OnceLock;

const NINTENDO: &[(&str, &str)] = &[
    ("01", "Nintendo"),
    ("08", "Capcom"),
    ("13", "Electronic Arts"),
    ("18", "Hudson Soft"),
    ("19", "B-AI"),
    ("20", "KSS"),
    ("22", "Planning Office WADA"),
    ("24", "PCM Complete"),
    ("25", "San-X"),
    ("28", "Kemco"),
    ("29", "SETA"),
    ("30", "Viacom"),
    ("31", "Nintendo"),
    ("32", "Bandai"),
    ("33", "Ocean/Acclaim"),
    ("34", "Konami"),
    ("35", "HectorSoft"),
    ("37", "Taito"),
    ("38", "Hudson Soft"),
    ("39", "Banpresto"),
    ("41", "Ubisoft"),
    ("42", "Atlus"),
    ("44", "Malibu"),
    ("46", "Angel"),
    ("47", "Bullet-Proof Software"),
    ("49", "Irem"),
    ("4F", "Eidos"),
    ("50", "Absolute"),
    ("51", "Acclaim"),
    ("52", "Activision"),
    ("53", "Sammy USA"),
    ("54", "Konami"),
    ("55", "Hi Tech Expressions"),
    ("56", "LJN"),
    ("57", "Matchbox"),
    ("58", "Mattel"),
    ("59", "Milton Bradley"),
    ("5D", "Midway"),
    ("5G", "Majesco"),
    ("60", "Titus"),
    ("61", "Virgin"),
    ("64", "LucasArts"),
    ("67", "Ocean"),
    ("69", "Electronic Arts"),
    ("6S", "TDK Mediactive"),
    ("70", "Infogrames"),
    ("71", "Interplay"),
    ("72", "Broderbund"),
    ("73", "Sculptured Software"),
    ("75", "SCI"),
    ("78", "THQ"),
    ("79", "Accolade"),
    ("7D", "Vivendi"),
    ("80", "Misawa"),
    ("83", "Lozc"),
    ("86", "Tokuma Shoten"),
    ("87", "Tsukuda Original"),
    ("8P", "Sega"),
    ("91", "Chunsoft"),
    ("92", "Video System"),
    ("93", "Ocean/Acclaim"),
    ("95", "Varie"),
    ("96", "Yonezawa/S'Pal"),
    ("97", "Kaneko"),
    ("99", "Pack-In-Video"),
    ("9H", "Bottom Up"),
    ("A4", "Konami"),
    ("AF", "Namco"),
    ("B2", "Bandai"),
    ("BL", "MTO"),
    ("DK", "Kodansha"),
    ("E9", "Natsume"),
    ("EB", "Atlus"),
    ("GD", "Square Enix"),
];

const NINTENDO_OLD: &[(u8, &str)] = &[
    (0x01, "Nintendo"),
    (0x08, "Capcom"),
    (0x09, "Hot-B"),
    (0x0A, "Jaleco"),
    (0x0B, "Coconuts Japan"),
    (0x0C, "Elite Systems"),
    (0x13, "Electronic Arts"),
    (0x18, "Hudson Soft"),
    (0x19, "ITC Entertainment"),
    (0x1A, "Yanoman"),
    (0x1D, "Japan Clary"),
    (0x1F, "Virgin Games"),
    (0x24, "PCM Complete"),
    (0x25, "San-X"),
    (0x28, "Kemco"),
    (0x29, "SETA"),
    (0x30, "Infogrames"),
    (0x31, "Nintendo"),
    (0x32, "Bandai"),
    (0x34, "Konami"),
    (0x35, "HectorSoft"),
    (0x38, "Capcom"),
    (0x39, "Banpresto"),
    (0x3C, "Entertainment Interactive"),
    (0x3E, "Gremlin"),
    (0x41, "Ubisoft"),
    (0x42, "Atlus"),
    (0x44, "Malibu"),
    (0x46, "Angel"),
    (0x47, "Spectrum HoloByte"),
    (0x49, "Irem"),
    (0x4A, "Virgin Games"),
    (0x4D, "Malibu"),
    (0x4F, "U.S. Gold"),
    (0x50, "Absolute"),
    (0x51, "Acclaim"),
    (0x52, "Activision"),
    (0x53, "Sammy USA"),
    (0x54, "GameTek"),
    (0x55, "Park Place"),
    (0x56, "LJN"),
    (0x57, "Matchbox"),
    (0x59, "Milton Bradley"),
    (0x5A, "Mindscape"),
    (0x5B, "Romstar"),
    (0x5C, "Naxat Soft"),
    (0x5D, "Tradewest"),
    (0x60, "Titus"),
    (0x61, "Virgin Games"),
    (0x67, "Ocean"),
    (0x69, "Electronic Arts"),
    (0x6E, "Elite Systems"),
    (0x6F, "Electro Brain"),
    (0x70, "Infogrames"),
    (0x71, "Interplay"),
    (0x72, "Broderbund"),
    (0x73, "Sculptured Software"),
    (0x75, "The Sales Curve"),
    (0x78, "THQ"),
    (0x79, "Accolade"),
    (0x7A, "Triffix Entertainment"),
    (0x7C, "Microprose"),
    (0x7F, "Kemco"),
    (0x80, "Misawa"),
    (0x83, "Lozc"),
    (0x86, "Tokuma Shoten"),
    (0x8B, "Bullet-Proof Software"),
    (0x8C, "Vic Tokai"),
    (0x8E, "Ape"),
    (0x8F, "I'Max"),
    (0x91, "Chunsoft"),
    (0x92, "Video System"),
    (0x93, "Tsubaraya Productions"),
    (0x95, "Varie"),
    (0x96, "Yonezawa/S'Pal"),
    (0x97, "Kaneko"),
    (0x99, "Arc"),
    (0x9A, "Nihon Bussan"),
    (0x9B, "Tecmo"),
    (0x9C, "Imagineer"),
    (0x9D, "Banpresto"),
    (0x9F, "Nova"),
    (0xA1, "Hori Electric"),
    (0xA2, "Bandai"),
    (0xA4, "Konami"),
    (0xA6, "Kawada"),
    (0xA7, "Takara"),
    (0xA9, "Technos Japan"),
    (0xAA, "Broderbund"),
    (0xAC, "Toei Animation"),
    (0xAD, "Toho"),
    (0xAF, "Namco"),
    (0xB0, "Acclaim"),
    (0xB1, "ASCII/Nexsoft"),
    (0xB2, "Bandai"),
    (0xB4, "Square Enix"),
    (0xB6, "HAL Laboratory"),
    (0xB7, "SNK"),
    (0xB9, "Pony Canyon"),
    (0xBA, "Culture Brain"),
    (0xBB, "Sunsoft"),
    (0xBD, "Sony Imagesoft"),
    (0xBF, "Sammy"),
    (0xC0, "Taito"),
    (0xC2, "Kemco"),
    (0xC3, "Square"),
    (0xC4, "Tokuma Shoten"),
    (0xC5, "Data East"),
    (0xC6, "Tonkin House"),
    (0xC8, "Koei"),
    (0xC9, "UFL"),
    (0xCA, "Ultra"),
    (0xCB, "Vap"),
    (0xCC, "Use Corporation"),
    (0xCD, "Meldac"),
    (0xCE, "Pony Canyon"),
    (0xCF, "Angel"),
    (0xD0, "Taito"),
    (0xD1, "Sofel"),
    (0xD2, "Quest"),
    (0xD3, "Sigma Enterprises"),
    (0xD4, "ASK Kodansha"),
    (0xD6, "Naxat Soft"),
    (0xD7, "Copya System"),
    (0xD9, "Banpresto"),
    (0xDA, "Tomy"),
    (0xDB, "LJN"),
    (0xDD, "NCS"),
    (0xDE, "Human"),
    (0xDF, "Altron"),
    (0xE0, "Jaleco"),
    (0xE1, "Towa Chiki"),
    (0xE2, "Yutaka"),
    (0xE3, "Varie"),
    (0xE5, "Epoch"),
    (0xE7, "Athena"),
    (0xE8, "Asmik"),
    (0xE9, "Natsume"),
    (0xEA, "King Records"),
    (0xEB, "Atlus"),
    (0xEC, "Epic/Sony Records"),
    (0xEE, "IGS"),
    (0xF0, "A Wave"),
    (0xF3, "Extreme Entertainment"),
    (0xFF, "LJN"),
];

const SEGA: &[(&str, &str)] = &[
    ("SEGA", "Sega"),
    ("T-11", "Taito"),
    ("T-12", "Capcom"),
    ("T-13", "Data East"),
    ("T-14", "Namco"),
    ("T-15", "Sunsoft"),
    ("T-20", "Asmik"),
    ("T-23", "Vic Tokai"),
    ("T-24", "Sammy"),
    ("T-25", "NCS"),
    ("T-48", "Tecmo"),
    ("T-50", "Electronic Arts"),
    ("T-76", "Koei"),
];

/// Publisher for a two-character Nintendo maker code.
pub fn nintendo(code: &str) -> Option<&'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE
        .get_or_init(|| NINTENDO.iter().copied().collect())
        .get(code)
        .copied()
}

/// Publisher for a Game Boy old-licensee byte. `0x33` means "see the new
/// licensee field" and is never in this table.
pub fn nintendo_old(code: u8) -> Option<&'static str> {
    static TABLE: OnceLock<HashMap<u8, &'static str>> = OnceLock::new();
    TABLE
        .get_or_init(|| NINTENDO_OLD.iter().copied().collect())
        .get(&code)
        .copied()
}

/// Publisher for a Sega licensee code such as `T-12` or `SEGA`.
pub fn sega(code: &str) -> Option<&'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE
        .get_or_init(|| SEGA.iter().copied().collect())
        .get(code)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        assert_eq!(nintendo("01"), Some("Nintendo"));
        assert_eq!(nintendo("8P"), Some("Sega"));
        assert_eq!(nintendo("ZZ"), None);
        assert_eq!(nintendo_old(0x33), None);
        assert_eq!(nintendo_old(0xA4), Some("Konami"));
        assert_eq!(sega("T-12"), Some("Capcom"));
    }
}
