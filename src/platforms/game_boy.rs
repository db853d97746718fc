//! Game Boy and Game Boy Color cartridges.
//!
//! The cartridge header sits at 0x100..0x150:
//!
//! ```text
//! [0x104] Nintendo logo       (48)
//! [0x134] Title               (16, or 11 + 4-byte manufacturer code on CGB)
//! [0x143] CGB flag            0x80 = enhanced, 0xC0 = CGB only
//! [0x144] New licensee code   (2 ASCII, only when 0x14B == 0x33)
//! [0x146] SGB flag            0x03 = SGB functions
//! [0x147] Cartridge type
//! [0x148] ROM size            32 KiB << n
//! [0x149] RAM size
//! [0x14A] Destination         0 = Japan
//! [0x14B] Old licensee code
//! [0x14C] Mask ROM version
//! ```

use super::{Context, Extractor, Platform};
use crate::metadata::{Region, SaveType, Source};
use crate::reference::licensee;
use crate::utils::{latin1, slice};
use crate::{Error, Result};

const HEADER_END: usize = 0x150;

const NINTENDO_LOGO: [u8; 48] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D,
    0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD, 0xD9, 0x99,
    0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB, 0xB9, 0x33, 0x3E,
];

/// Both extractors read the same header; they differ only in which
/// platform they report and which extension they claim.
#[derive(Debug, Clone, Copy)]
pub enum GameBoyExtractor {
    Mono,
    Color,
}

impl Extractor for GameBoyExtractor {
    fn platform(&self) -> Platform {
        match self {
            Self::Mono => Platform::GameBoy,
            Self::Color => Platform::GameBoyColor,
        }
    }

    fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Mono => &["gb"],
            Self::Color => &["gbc"],
        }
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let rom = ctx.resource()?.read_exact(0, HEADER_END)?;
        apply_header(ctx, &rom)
    }
}

fn apply_header(ctx: &mut Context<'_>, rom: &[u8]) -> Result<()> {
    let logo_valid = slice(rom, 0x104, 48)? == NINTENDO_LOGO;
    ctx.meta.set_specific("Nintendo Logo Valid", logo_valid);

    let cgb = rom[0x143];
    let title_len = if cgb & 0x80 != 0 { 11 } else { 16 };
    let title = latin1(slice(rom, 0x134, title_len)?);
    if !title.is_empty() {
        ctx.meta.add_name("Internal Title", title);
    }
    if title_len == 11 {
        let code = latin1(slice(rom, 0x13F, 4)?);
        if code.len() == 4 && code.chars().all(|c| c.is_ascii_alphanumeric()) {
            ctx.meta.product_code.offer(code, Source::Header);
        }
    }
    ctx.meta.set_specific(
        "Game Boy Color",
        match cgb {
            0xC0 => "Required",
            0x80 => "Enhanced",
            _ => "No",
        },
    );
    ctx.meta.set_specific("Super Game Boy", rom[0x146] == 0x03);

    let old = rom[0x14B];
    let publisher = if old == 0x33 {
        let code = latin1(slice(rom, 0x144, 2)?);
        ctx.references.nintendo_licensee(&code).map(str::to_owned)
    } else {
        licensee::nintendo_old(old).map(str::to_owned)
    };
    match publisher {
        Some(p) => {
            ctx.meta.publisher.offer(p, Source::Header);
        }
        None => ctx.meta.set_specific("Licensee Code", format!("{old:02X}")),
    }

    match cart_type(rom[0x147]) {
        Some(cart) => {
            ctx.meta.set_specific("Mapper", cart.mapper);
            let save = if cart.battery { SaveType::Cart } else { SaveType::Nothing };
            ctx.meta.save_type.offer(save, Source::Header);
            let features: Vec<String> = [
                (cart.ram, "RAM"),
                (cart.battery, "Battery"),
                (cart.timer, "Timer"),
                (cart.rumble, "Rumble"),
                (cart.sensor, "Accelerometer"),
            ]
            .into_iter()
            .filter(|(on, _)| *on)
            .map(|(_, name)| name.to_owned())
            .collect();
            if !features.is_empty() {
                ctx.meta.set_specific("Cartridge Features", features);
            }
        }
        None => {
            ctx.meta.set_specific("Cartridge Type", format!("0x{:02X}", rom[0x147]));
            ctx.warn(Error::Parse("unknown Game Boy cartridge type"));
        }
    }

    if let Some(kib) = 32u32.checked_shl(u32::from(rom[0x148])).filter(|_| rom[0x148] <= 8) {
        ctx.meta.set_specific("ROM Size", format!("{kib} KiB"));
    }
    let ram = match rom[0x149] {
        0x01 => Some("2 KiB"),
        0x02 => Some("8 KiB"),
        0x03 => Some("32 KiB"),
        0x04 => Some("128 KiB"),
        0x05 => Some("64 KiB"),
        _ => None,
    };
    if let Some(ram) = ram {
        ctx.meta.set_specific("Save Size", ram);
    }

    // Only Japan is distinguishable; "overseas" covers everything else.
    if rom[0x14A] == 0 {
        ctx.meta.add_region(Region::Japan);
    }
    ctx.meta.set_specific("Version", rom[0x14C]);
    Ok(())
}

struct CartType {
    mapper: &'static str,
    ram: bool,
    battery: bool,
    timer: bool,
    rumble: bool,
    sensor: bool,
}

fn cart_type(code: u8) -> Option<CartType> {
    let (mapper, ram, battery, timer, rumble, sensor) = match code {
        0x00 => ("ROM only", false, false, false, false, false),
        0x01 => ("MBC1", false, false, false, false, false),
        0x02 => ("MBC1", true, false, false, false, false),
        0x03 => ("MBC1", true, true, false, false, false),
        0x05 => ("MBC2", false, false, false, false, false),
        0x06 => ("MBC2", false, true, false, false, false),
        0x08 => ("ROM only", true, false, false, false, false),
        0x09 => ("ROM only", true, true, false, false, false),
        0x0B => ("MMM01", false, false, false, false, false),
        0x0C => ("MMM01", true, false, false, false, false),
        0x0D => ("MMM01", true, true, false, false, false),
        0x0F => ("MBC3", false, true, true, false, false),
        0x10 => ("MBC3", true, true, true, false, false),
        0x11 => ("MBC3", false, false, false, false, false),
        0x12 => ("MBC3", true, false, false, false, false),
        0x13 => ("MBC3", true, true, false, false, false),
        0x19 => ("MBC5", false, false, false, false, false),
        0x1A => ("MBC5", true, false, false, false, false),
        0x1B => ("MBC5", true, true, false, false, false),
        0x1C => ("MBC5", false, false, false, true, false),
        0x1D => ("MBC5", true, false, false, true, false),
        0x1E => ("MBC5", true, true, false, true, false),
        0x20 => ("MBC6", true, true, false, false, false),
        0x22 => ("MBC7", true, true, false, true, true),
        0xFC => ("Pocket Camera", true, true, false, false, false),
        0xFD => ("TAMA5", true, true, true, false, false),
        0xFE => ("HuC3", true, true, true, false, false),
        0xFF => ("HuC1", true, true, false, false, false),
        _ => return None,
    };
    Some(CartType {
        mapper,
        ram,
        battery,
        timer,
        rumble,
        sensor,
    })
}
