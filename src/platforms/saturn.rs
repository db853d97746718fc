//! Sega Saturn: the system ID at the start of the first data sector.
//!
//! ```text
//! [0x00] Hardware ID   "SEGA SEGASATURN "   (16)
//! [0x10] Maker ID      "SEGA TP T-12    "   (16)
//! [0x20] Product number                     (10)
//! [0x2A] Version       "V1.000"             (6)
//! [0x30] Release date  YYYYMMDD             (8)
//! [0x38] Device info   "CD-1/1  "           (8)
//! [0x40] Area symbols  "JTUE"               (16)
//! [0x50] Peripherals   "JAM"                (16)
//! [0x60] Title                              (112)
//! ```

use tracing::debug;

use super::{Context, Extractor, Platform};
use crate::metadata::{Date, Device, Region, Source};
use crate::utils::{latin1, slice};
use crate::{Error, Result};

const HARDWARE_ID: &[u8] = b"SEGA SEGASATURN ";
const HEADER_SIZE: usize = 0x100;

pub struct SaturnExtractor;

impl Extractor for SaturnExtractor {
    fn platform(&self) -> Platform {
        Platform::Saturn
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cue", "iso", "bin", "ccd"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let header = ctx.disc()?.read_exact(0, HEADER_SIZE)?;
        if !header.starts_with(HARDWARE_ID) {
            return Err(Error::malformed("SATURN", "no SEGA SEGASATURN system ID"));
        }
        let field = |offset, len| slice(&header, offset, len).map(latin1);

        let maker = field(0x10, 0x10)?;
        apply_maker(ctx, &maker);

        let product = field(0x20, 0x0A)?;
        if !product.is_empty() {
            ctx.meta.product_code.offer(product, Source::Header);
        }
        let version = field(0x2A, 0x06)?;
        if !version.is_empty() {
            ctx.meta.set_specific("Version", version);
        }
        let date = field(0x30, 0x08)?;
        match Date::from_yyyymmdd(&date) {
            Some(date) => {
                ctx.meta.release_date.offer(date, Source::Header);
            }
            None if !date.is_empty() => ctx.meta.set_specific("Release Date", date),
            None => {}
        }
        if let Some(disc) = disc_number(&field(0x38, 0x08)?) {
            ctx.meta.set_specific("Disc", disc);
        }

        let unknown_areas = apply_areas(ctx, &field(0x40, 0x10)?, area);
        if !unknown_areas.is_empty() {
            ctx.meta.set_specific("Unknown Area Symbols", unknown_areas);
        }
        let unknown_peripherals: String = field(0x50, 0x10)?
            .chars()
            .filter(|c| !c.is_whitespace())
            .filter(|&c| match peripheral(c) {
                Some(device) => {
                    ctx.meta.input.add(device);
                    false
                }
                None => true,
            })
            .collect();
        ctx.meta.input.known = true;
        if !unknown_peripherals.is_empty() {
            ctx.meta.set_specific("Unknown Peripherals", unknown_peripherals);
        }

        let title = collapse_spaces(&field(0x60, 0x70)?);
        if !title.is_empty() {
            ctx.meta.add_name("Internal Title", title);
        }
        Ok(())
    }
}

/// Licensee code from a Sega maker field: `SEGA ENTERPRISES` is Sega
/// itself, `SEGA TP T-12` and `SEGA LC-T-12` name third party `T-12`.
pub(crate) fn sega_maker_code(maker: &str) -> Option<String> {
    let maker = maker.trim();
    if maker.starts_with("SEGA ENTERPRISES") || maker == "SEGA" {
        return Some("SEGA".to_owned());
    }
    let at = maker.find("T-")?;
    let digits: String = maker[at + 2..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (!digits.is_empty()).then(|| format!("T-{digits}"))
}

/// Resolve a Sega maker field to a publisher, or keep it verbatim.
pub(crate) fn apply_maker(ctx: &mut Context<'_>, maker: &str) {
    if maker.is_empty() {
        return;
    }
    let references = ctx.references;
    let publisher = sega_maker_code(maker).and_then(|code| references.sega_licensee(&code));
    match publisher {
        Some(publisher) => {
            ctx.meta.publisher.offer(publisher.to_owned(), Source::Header);
        }
        None => {
            debug!(maker, "unknown Sega maker");
            ctx.meta.set_specific("Maker", maker);
        }
    }
}

/// Record each region symbol; returns the ones `lookup` does not know.
pub(crate) fn apply_areas(ctx: &mut Context<'_>, symbols: &str, lookup: fn(char) -> Option<Region>) -> String {
    symbols
        .chars()
        .filter(|c| !c.is_whitespace())
        .filter(|&c| match lookup(c) {
            Some(region) => {
                ctx.meta.add_region(region);
                false
            }
            None => true,
        })
        .collect()
}

/// `CD-1/2` or `GD-ROM1/2` to `1/2`.
pub(crate) fn disc_number(info: &str) -> Option<String> {
    let (n, m) = info.trim().split_once('/')?;
    let n: String = n.chars().rev().take_while(char::is_ascii_digit).collect();
    let m: String = m.chars().take_while(char::is_ascii_digit).collect();
    if n.is_empty() || m.is_empty() {
        return None;
    }
    Some(format!("{}/{m}", n.chars().rev().collect::<String>()))
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn area(c: char) -> Option<Region> {
    Some(match c {
        'J' => Region::Japan,
        'T' => Region::Taiwan,
        'U' => Region::Usa,
        'B' => Region::Brazil,
        'K' => Region::Korea,
        'A' => Region::Asia,
        'E' => Region::Europe,
        'L' => Region::Brazil,
        _ => return None,
    })
}

fn peripheral(c: char) -> Option<Device> {
    Some(match c {
        'J' => Device::Gamepad,
        'A' | 'E' => Device::AnalogStick,
        'M' => Device::Mouse,
        'K' => Device::Keyboard,
        'S' => Device::SteeringWheel,
        'T' => Device::Multitap,
        'G' => Device::LightGun,
        'W' => Device::Other("RAM Cartridge".to_owned()),
        'F' => Device::Other("Floppy Drive".to_owned()),
        'P' => Device::Other("Video CD Card".to_owned()),
        'R' => Device::Other("Modem".to_owned()),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::metadata::Value;
    use crate::platforms::testing::Harness;

    fn header(maker: &str, date: &str, areas: &str, peripherals: &str) -> Vec<u8> {
        let mut h = vec![b' '; 2048 * 20];
        let mut put = |at: usize, s: &str| h[at..at + s.len()].copy_from_slice(s.as_bytes());
        put(0x00, "SEGA SEGASATURN ");
        put(0x10, maker);
        put(0x20, "T-9507G");
        put(0x2A, "V1.001");
        put(0x30, date);
        put(0x38, "CD-1/2");
        put(0x40, areas);
        put(0x50, peripherals);
        put(0x60, "NIGHTS   into   dreams");
        h
    }

    #[test]
    fn full_header() {
        let image = header("SEGA TP T-12    ", "19960705", "JTUE", "JAX");
        let mut h = Harness::new(Platform::Saturn);
        let (result, warnings) = h.run(&SaturnExtractor, "nights.iso", image);
        result.unwrap();
        assert!(warnings.is_empty());

        assert_eq!(h.meta.publisher.get().map(String::as_str), Some("Capcom"));
        assert_eq!(h.meta.product_code.get().map(String::as_str), Some("T-9507G"));
        assert_eq!(h.meta.release_date.get(), Some(&Date::new(Some(1996), Some(7), Some(5))));
        assert_eq!(
            h.meta.regions.iter().copied().collect::<Vec<_>>(),
            [Region::Japan, Region::Taiwan, Region::Usa, Region::Europe]
        );
        assert_eq!(
            h.meta.input.devices.iter().cloned().collect::<Vec<_>>(),
            [Device::Gamepad, Device::AnalogStick]
        );
        assert_eq!(h.meta.specific.get("Unknown Peripherals"), Some(&Value::Text("X".into())));
        assert_eq!(h.meta.specific.get("Disc"), Some(&Value::Text("1/2".into())));
        assert_eq!(h.meta.names.get("Internal Title").map(String::as_str), Some("NIGHTS into dreams"));
    }

    #[test]
    fn partial_date_and_first_party() {
        let image = header("SEGA ENTERPRISES", "1995????", "J", "J");
        let mut h = Harness::new(Platform::Saturn);
        h.run(&SaturnExtractor, "game.bin", image).0.unwrap();
        assert_eq!(h.meta.publisher.get().map(String::as_str), Some("Sega"));
        assert_eq!(h.meta.release_date.get(), Some(&Date::year(1995)));
    }

    #[test]
    fn unknown_maker_kept_verbatim() {
        let image = header("SEGA TP KAISHA  ", "19970101", "J", "J");
        let mut h = Harness::new(Platform::Saturn);
        h.run(&SaturnExtractor, "game.iso", image).0.unwrap();
        assert!(!h.meta.publisher.is_set());
        assert_eq!(h.meta.specific.get("Maker"), Some(&Value::Text("SEGA TP KAISHA".into())));
    }

    #[test]
    fn maker_codes() {
        assert_eq!(sega_maker_code("SEGA LC-T-50").as_deref(), Some("T-50"));
        assert_eq!(sega_maker_code("SEGA TP T-081  ").as_deref(), Some("T-081"));
        assert_eq!(disc_number("GD-ROM2/2").as_deref(), Some("2/2"));
        assert_eq!(disc_number("CD-"), None);
    }

    #[test]
    fn not_a_saturn_disc() {
        let mut h = Harness::new(Platform::Saturn);
        let (result, _) = h.run(&SaturnExtractor, "x.iso", vec![0; 4096]);
        assert!(matches!(result, Err(Error::MalformedContainer { format: "SATURN", .. })));
    }
}
