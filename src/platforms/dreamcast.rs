//! Dreamcast: `IP.BIN` at the start of the high-density data track.
//!
//! ```text
//! [0x00] Hardware ID    "SEGA SEGAKATANA "     (16)
//! [0x10] Maker ID       "SEGA ENTERPRISES"     (16)
//! [0x20] Device info    "0000 GD-ROM1/1  "     (16)
//! [0x30] Area symbols   "JUE     "             (8)
//! [0x38] Peripherals    7 hex digits           (8)
//! [0x40] Product number                        (10)
//! [0x4A] Version        "V1.000"               (6)
//! [0x50] Release date   YYYYMMDD               (16)
//! [0x60] Boot file name "1ST_READ.BIN"         (16)
//! [0x70] Software maker                        (16)
//! [0x80] Title                                 (128)
//! ```

use super::saturn::{apply_areas, apply_maker, disc_number};
use super::{Context, Extractor, Platform};
use crate::metadata::{Date, Device, Region, SaveType, Source};
use crate::utils::{latin1, slice};
use crate::{Error, Result};

const HARDWARE_ID: &[u8] = b"SEGA SEGAKATANA";
const HEADER_SIZE: usize = 0x100;

/// What one peripheral bit means.
enum Peripheral {
    Device(Device),
    Flag(&'static str),
}

/// Peripheral bits in ascending order. Controller buttons are folded into
/// the gamepad entry; the remaining bits are features.
const PERIPHERALS: [(u32, fn() -> Peripheral); 14] = [
    (0, || Peripheral::Flag("Windows CE")),
    (4, || Peripheral::Flag("VGA Box")),
    (8, || Peripheral::Flag("Other Expansion")),
    (9, || Peripheral::Flag("Vibration Pack")),
    (10, || Peripheral::Device(Device::Microphone)),
    (11, || Peripheral::Flag("Memory Card")),
    (12, || Peripheral::Device(Device::Gamepad)),
    (19, || Peripheral::Flag("Analog Triggers")),
    (21, || Peripheral::Device(Device::AnalogStick)),
    (23, || Peripheral::Flag("Second Analog Stick")),
    (24, || Peripheral::Flag("Second Analog Stick")),
    (25, || Peripheral::Device(Device::LightGun)),
    (26, || Peripheral::Device(Device::Keyboard)),
    (27, || Peripheral::Device(Device::Mouse)),
];

pub struct DreamcastExtractor;

impl Extractor for DreamcastExtractor {
    fn platform(&self) -> Platform {
        Platform::Dreamcast
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gdi", "cue"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let header = ctx.disc()?.read_exact(0, HEADER_SIZE)?;
        if !header.starts_with(HARDWARE_ID) {
            return Err(Error::malformed("IP.BIN", "no SEGA SEGAKATANA hardware ID"));
        }
        let field = |offset, len| slice(&header, offset, len).map(latin1);

        apply_maker(ctx, &field(0x10, 0x10)?);

        let device_info = field(0x20, 0x10)?;
        if let Some(disc) = device_info.split_whitespace().last().and_then(disc_number) {
            ctx.meta.set_specific("Disc", disc);
        }

        let unknown_areas = apply_areas(ctx, &field(0x30, 0x08)?, area);
        if !unknown_areas.is_empty() {
            ctx.meta.set_specific("Unknown Area Symbols", unknown_areas);
        }

        let peripherals = field(0x38, 0x08)?;
        match u32::from_str_radix(peripherals.trim(), 16) {
            Ok(bits) => apply_peripherals(ctx, bits),
            Err(_) => {
                ctx.warn(Error::Parse("peripheral field is not hexadecimal"));
                ctx.meta.set_specific("Peripherals", peripherals);
            }
        }

        let product = field(0x40, 0x0A)?;
        if !product.is_empty() {
            ctx.meta.product_code.offer(product, Source::Header);
        }
        let version = field(0x4A, 0x06)?;
        if !version.is_empty() {
            ctx.meta.set_specific("Version", version);
        }
        if let Some(date) = Date::from_yyyymmdd(&field(0x50, 0x08)?) {
            ctx.meta.release_date.offer(date, Source::Header);
        }
        let boot = field(0x60, 0x10)?;
        if !boot.is_empty() {
            ctx.meta.set_specific("Boot File", boot);
        }
        let developer = field(0x70, 0x10)?;
        if !developer.is_empty() {
            ctx.meta.developer.offer(developer, Source::Header);
        }
        let title = field(0x80, 0x80)?;
        if !title.is_empty() {
            ctx.meta.add_name("Internal Title", title);
        }
        Ok(())
    }
}

fn apply_peripherals(ctx: &mut Context<'_>, bits: u32) {
    let meta = &mut *ctx.meta;
    meta.input.known = true;
    let mut flags: Vec<String> = Vec::new();
    for (bit, decode) in PERIPHERALS {
        if bits & (1 << bit) == 0 {
            continue;
        }
        match decode() {
            Peripheral::Device(device) => meta.input.add(device),
            Peripheral::Flag(name) if !flags.iter().any(|f| f == name) => flags.push(name.to_owned()),
            Peripheral::Flag(_) => {}
        }
    }
    let save = if flags.iter().any(|f| f == "Memory Card") {
        SaveType::MemoryCard
    } else {
        SaveType::Nothing
    };
    meta.save_type.offer(save, Source::Header);
    for flag in ["VGA Box", "Vibration Pack", "Memory Card"] {
        meta.set_specific(format!("Supports {flag}"), flags.iter().any(|f| f == flag));
    }
    if !flags.is_empty() {
        meta.set_specific("Peripheral Features", flags);
    }
}

fn area(c: char) -> Option<Region> {
    Some(match c {
        'J' => Region::Japan,
        'U' => Region::Usa,
        'E' => Region::Europe,
        _ => return None,
    })
}
