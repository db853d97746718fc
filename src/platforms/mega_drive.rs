//! Mega Drive / Genesis cartridges and Mega CD discs.
//!
//! Both carry the same 0x100-byte header: at 0x100 of the ROM, or at 0x100
//! of the first data sector after the `SEGADISCSYSTEM` volume header.
//!
//! ```text
//! [0x100] System type       "SEGA MEGA DRIVE "      (16)
//! [0x110] Copyright         "(C)SEGA 1991.JAN"      (16)
//! [0x120] Domestic title                            (48)
//! [0x150] Overseas title                            (48)
//! [0x180] Serial            "GM 00001009-00"        (14)
//! [0x18E] Checksum                                  (u16 BE)
//! [0x190] Devices           "J6"                    (16)
//! [0x1A0] ROM range, RAM range                      (16)
//! [0x1B0] SRAM              "RA" type 0x20 start end (12)
//! [0x1BC] Modem                                     (12)
//! [0x1C8] Memo                                      (40)
//! [0x1F0] Region            "JUE" or one hex digit  (3)
//! ```

use tracing::debug;

use super::saturn::apply_maker;
use super::{Context, Extractor, Platform, extension};
use crate::metadata::{Date, Device, Region, SaveType, Source};
use crate::utils::{latin1, shift_jis, slice};
use crate::{Error, Result};

const DISC_ID: &[u8] = b"SEGADISCSYSTEM";
const SMD_HEADER: usize = 0x200;
const SMD_BLOCK: usize = 0x4000;
const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

pub struct MegaDriveExtractor;

impl Extractor for MegaDriveExtractor {
    fn platform(&self) -> Platform {
        Platform::MegaDrive
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["md", "gen", "smd", "bin"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let interleaved = extension(ctx.path) == "smd";
        let r = ctx.resource()?;
        let rom = if interleaved {
            deinterleave(&r.read_exact(0, SMD_HEADER + SMD_BLOCK)?[SMD_HEADER..])
        } else {
            r.read_exact(0, 0x200)?
        };
        let header = slice(&rom, 0x100, 0x100)?;
        if !header.starts_with(b"SEGA") && !header[1..].starts_with(b"SEGA") {
            return Err(Error::malformed("MD", "no SEGA system type at 0x100"));
        }
        apply_header(ctx, header)
    }
}

pub struct MegaCdExtractor;

impl Extractor for MegaCdExtractor {
    fn platform(&self) -> Platform {
        Platform::MegaCd
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cue", "iso", "bin"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let sector = ctx.disc()?.read_exact(0, 0x200)?;
        if !sector.starts_with(DISC_ID) {
            return Err(Error::malformed("MEGACD", "no SEGADISCSYSTEM volume header"));
        }
        let volume = latin1(&sector[0x10..0x1C]);
        if !volume.is_empty() {
            ctx.meta.set_specific("Volume Name", volume);
        }
        apply_header(ctx, &sector[0x100..0x200])
    }
}

/// Undo the SMD interleave of one 16 KiB block: odd bytes first, then even.
fn deinterleave(block: &[u8]) -> Vec<u8> {
    let half = block.len() / 2;
    let mut out = vec![0u8; half * 2];
    for i in 0..half {
        out[i * 2] = block[half + i];
        out[i * 2 + 1] = block[i];
    }
    out
}

/// Decode the shared 0x100-byte header.
fn apply_header(ctx: &mut Context<'_>, header: &[u8]) -> Result<()> {
    let field = |offset: usize, len: usize| slice(header, offset, len).map(latin1);

    ctx.meta.set_specific("System Type", field(0x00, 0x10)?);

    let copyright = field(0x10, 0x10)?;
    match parse_copyright(&copyright) {
        Some((maker, date)) => {
            apply_maker(ctx, &maker);
            if let Some(date) = date {
                ctx.meta.release_date.offer(date, Source::Header);
            }
        }
        None => {
            debug!(copyright, "unrecognized copyright field");
            if !copyright.is_empty() {
                ctx.meta.set_specific("Copyright", copyright);
            }
        }
    }

    let domestic = slice(header, 0x20, 0x30)?;
    let domestic = shift_jis(domestic).unwrap_or_else(|_| latin1(domestic));
    for (key, title) in [("Domestic Title", domestic), ("Overseas Title", field(0x50, 0x30)?)] {
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        if !title.is_empty() {
            ctx.meta.add_name(key, title);
        }
    }

    let serial = field(0x80, 0x0E)?;
    let (kind, code) = match serial.split_once(' ') {
        Some((kind, code)) if !code.trim().is_empty() => (Some(kind), code.trim()),
        _ => (None, serial.as_str()),
    };
    if !code.is_empty() {
        ctx.meta.product_code.offer(code.to_owned(), Source::Header);
    }
    if let Some(kind) = kind {
        ctx.meta.set_specific("Software Type", software_type(kind));
    }

    let mut unknown = String::new();
    for c in field(0x90, 0x10)?.chars().filter(|c| !c.is_whitespace()) {
        match device(c) {
            Some(Some(d)) => ctx.meta.input.add(d),
            Some(None) => {}
            None => unknown.push(c),
        }
    }
    ctx.meta.input.known = true;
    if !unknown.is_empty() {
        ctx.meta.set_specific("Unknown Devices", unknown);
    }

    let save = if header.get(0xB0..0xB2) == Some(&b"RA"[..]) {
        SaveType::Cart
    } else {
        SaveType::Nothing
    };
    ctx.meta.save_type.offer(save, Source::Header);

    let regions = field(0xF0, 0x03)?;
    let decoded = decode_regions(&regions);
    if decoded.is_empty() && !regions.is_empty() {
        ctx.meta.set_specific("Region Code", regions);
    }
    for region in decoded {
        ctx.meta.add_region(region);
    }
    Ok(())
}

/// `(C)SEGA 1991.JAN`, `(C)T-12 1992.MAR`, `(C)T-081992.AUG`.
fn parse_copyright(text: &str) -> Option<(String, Option<Date>)> {
    let rest = text.strip_prefix("(C)")?.trim_end();
    let tail_at = rest.len().checked_sub(8)?;
    let (maker, tail) = (rest.get(..tail_at)?, rest.get(tail_at..)?);
    let date = tail.split_once('.').and_then(|(year, month)| {
        let year = year.parse::<u16>().ok().filter(|y| (1980..2100).contains(y))?;
        let month = MONTHS
            .iter()
            .position(|m| m.eq_ignore_ascii_case(month))
            .map(|i| i as u8 + 1);
        Some(Date::new(Some(year), month, None))
    });
    match date {
        Some(date) => Some((maker.trim().to_owned(), Some(date))),
        None => Some((rest.split_whitespace().next()?.to_owned(), None)),
    }
}

fn software_type(kind: &str) -> String {
    match kind {
        "GM" => "Game".to_owned(),
        "AI" => "Educational".to_owned(),
        "OS" => "Boot ROM".to_owned(),
        "BR" => "Boot ROM (Mega CD)".to_owned(),
        other => other.to_owned(),
    }
}

/// `Some(None)` for symbols that are known but not an input device.
fn device(c: char) -> Option<Option<Device>> {
    Some(Some(match c {
        'J' | '6' | '0' => Device::Gamepad,
        'A' => Device::AnalogStick,
        '4' => Device::Multitap,
        'G' => Device::LightGun,
        'L' => Device::MotionSensor,
        'M' => Device::Mouse,
        'B' => Device::Other("Trackball".to_owned()),
        'T' => Device::Other("Tablet".to_owned()),
        'V' => Device::Paddle,
        'K' => Device::Keyboard,
        'R' => Device::Other("Serial (RS-232C)".to_owned()),
        'P' => Device::Other("Printer".to_owned()),
        'C' | 'F' | 'D' => return Some(None),
        _ => return None,
    }))
}

/// Old-style letters (`JUE`) or a new-style hex bitfield (`F`).
fn decode_regions(code: &str) -> Vec<Region> {
    let letters: Option<Vec<Region>> = code
        .chars()
        .map(|c| match c {
            'J' => Some(Region::Japan),
            'U' => Some(Region::Usa),
            'E' => Some(Region::Europe),
            _ => None,
        })
        .collect();
    if let Some(letters) = letters {
        return letters;
    }
    let Some(bits) = code.chars().next().and_then(|c| c.to_digit(16)).filter(|_| code.len() == 1) else {
        return Vec::new();
    };
    [(1, Region::Japan), (2, Region::Asia), (4, Region::Usa), (8, Region::Europe)]
        .into_iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, region)| region)
        .collect()
}
