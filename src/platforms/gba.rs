//! Game Boy Advance cartridges.
//!
//! ```text
//! [0x0A0] Title        (12)
//! [0x0AC] Game code    (4)   "AXVE": type, short title, region
//! [0x0B0] Maker code   (2)
//! [0x0B2] Fixed value  0x96
//! [0x0BC] Version
//! ```
//!
//! The header does not say how the game saves. Games built with the
//! official SDK link a save library that leaves an ID string such as
//! `FLASH1M_V103` in the ROM, so the save chip is found by scanning for it.

use tracing::debug;

use super::{Context, Extractor, Platform};
use crate::formats::gamecube::region;
use crate::metadata::{SaveType, Source};
use crate::resource::Resource;
use crate::utils::{latin1, slice};
use crate::{Error, Result};

const HEADER_SIZE: usize = 0xC0;
const FIXED_VALUE: u8 = 0x96;

/// Largest cartridge the bus can address.
const MAX_SCAN: u64 = 32 << 20;
const SCAN_CHUNK: usize = 1 << 20;

/// Longest first, so `FLASH1M_V` is not reported as `FLASH_V`.
const SAVE_LIBRARIES: [(&[u8], &str); 6] = [
    (b"FLASH1M_V", "Flash 128 KiB"),
    (b"FLASH512_V", "Flash 64 KiB"),
    (b"SRAM_F_V", "FRAM 32 KiB"),
    (b"EEPROM_V", "EEPROM"),
    (b"FLASH_V", "Flash 64 KiB"),
    (b"SRAM_V", "SRAM 32 KiB"),
];

pub struct GbaExtractor;

impl Extractor for GbaExtractor {
    fn platform(&self) -> Platform {
        Platform::GameBoyAdvance
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gba", "agb"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let r = ctx.resource()?;
        let header = r.read_exact(0, HEADER_SIZE)?;
        let chip = find_save_library(r);

        if header[0xB2] != FIXED_VALUE {
            ctx.warn(Error::malformed("GBA", "fixed header byte is not 0x96"));
        }
        let title = latin1(slice(&header, 0xA0, 12)?);
        if !title.is_empty() {
            ctx.meta.add_name("Internal Title", title);
        }

        let code = latin1(slice(&header, 0xAC, 4)?);
        if code.len() == 4 {
            if let Some(region) = code.chars().nth(3).and_then(region) {
                ctx.meta.add_region(region);
            }
            ctx.meta.product_code.offer(code, Source::Header);
        }

        let maker = latin1(slice(&header, 0xB0, 2)?);
        let references = ctx.references;
        match references.nintendo_licensee(&maker) {
            Some(publisher) => {
                ctx.meta.publisher.offer(publisher.to_owned(), Source::Header);
            }
            None if !maker.is_empty() => ctx.meta.set_specific("Maker Code", maker),
            None => {}
        }
        ctx.meta.set_specific("Version", header[0xBC]);

        match ctx.attempt(chip)?.flatten() {
            Some(chip) => {
                ctx.meta.save_type.offer(SaveType::Cart, Source::Header);
                ctx.meta.set_specific("Save Chip", chip);
            }
            None => {
                ctx.meta.save_type.offer(SaveType::Nothing, Source::Header);
            }
        }
        Ok(())
    }
}

/// Scan the ROM in bounded chunks for a save library ID. Chunks overlap by
/// the longest ID so a match straddling a boundary is still found.
fn find_save_library(r: &mut dyn Resource) -> Result<Option<&'static str>> {
    let longest = SAVE_LIBRARIES.iter().map(|(id, _)| id.len()).max().unwrap_or(0);
    let end = r.size().min(MAX_SCAN);
    let mut offset = 0;
    while offset < end {
        let chunk = r.read(offset, SCAN_CHUNK)?;
        if chunk.is_empty() {
            break;
        }
        for (id, chip) in SAVE_LIBRARIES {
            if chunk.windows(id.len()).any(|w| w == id) {
                debug!(offset, chip, "save library found");
                return Ok(Some(chip));
            }
        }
        if chunk.len() < SCAN_CHUNK {
            break;
        }
        offset += (SCAN_CHUNK - longest) as u64;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::metadata::{Region, Value};
    use crate::platforms::testing::Harness;
    use crate::resource::MemoryResource;

    fn rom(size: usize) -> Vec<u8> {
        let mut rom = vec![0xFFu8; size];
        rom[0xA0..0xAC].copy_from_slice(b"POKEMON EMER");
        rom[0xAC..0xB0].copy_from_slice(b"BPEE");
        rom[0xB0..0xB2].copy_from_slice(b"01");
        rom[0xB2] = FIXED_VALUE;
        rom[0xBC] = 0;
        rom
    }

    #[test]
    fn header_and_flash_save() {
        let mut image = rom(0x10000);
        image[0x8000..0x800C].copy_from_slice(b"FLASH1M_V103");
        let mut h = Harness::new(Platform::GameBoyAdvance);
        let (result, warnings) = h.run(&GbaExtractor, "emerald.gba", image);
        result.unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");

        assert_eq!(h.meta.names.get("Internal Title").map(String::as_str), Some("POKEMON EMER"));
        assert_eq!(h.meta.product_code.get().map(String::as_str), Some("BPEE"));
        assert_eq!(h.meta.regions.iter().copied().collect::<Vec<_>>(), [Region::Usa]);
        assert_eq!(h.meta.publisher.get().map(String::as_str), Some("Nintendo"));
        assert_eq!(h.meta.save_type.get(), Some(&SaveType::Cart));
        assert_eq!(h.meta.specific.get("Save Chip"), Some(&Value::Text("Flash 128 KiB".into())));
    }

    #[test]
    fn no_save_library() {
        let mut h = Harness::new(Platform::GameBoyAdvance);
        h.run(&GbaExtractor, "x.gba", rom(0x1000)).0.unwrap();
        assert_eq!(h.meta.save_type.get(), Some(&SaveType::Nothing));
        assert!(!h.meta.specific.contains_key("Save Chip"));
    }

    #[test]
    fn id_straddling_chunk_boundary() {
        let mut image = rom(SCAN_CHUNK + 0x100);
        let at = SCAN_CHUNK - 4;
        image[at..at + 8].copy_from_slice(b"EEPROM_V");
        let mut r = MemoryResource::new("x.gba", image);
        assert_eq!(find_save_library(&mut r).unwrap(), Some("EEPROM"));
    }

    #[test]
    fn bad_fixed_byte_is_a_warning() {
        let mut image = rom(0x1000);
        image[0xB2] = 0;
        let mut h = Harness::new(Platform::GameBoyAdvance);
        let (result, warnings) = h.run(&GbaExtractor, "x.gba", image);
        result.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(h.meta.product_code.is_set());
    }
}
