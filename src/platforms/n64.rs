//! Nintendo 64 cartridges in any of the three common dump byte orders.

use super::{Context, Extractor, Platform};
use crate::formats::gamecube;
use crate::metadata::{Region, Source};
use crate::utils::{be_u32_at, latin1, slice};
use crate::{Error, Result};

const HEADER_SIZE: usize = 0x40;

/// How the dump's bytes relate to the cartridge's big-endian bus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    /// `.z64`: native.
    Big,
    /// `.v64`: each 16-bit pair swapped.
    ByteSwapped,
    /// `.n64`: each 32-bit word reversed.
    Little,
}

impl ByteOrder {
    fn detect(magic: &[u8]) -> Option<Self> {
        match magic {
            [0x80, 0x37, 0x12, 0x40, ..] => Some(Self::Big),
            [0x37, 0x80, 0x40, 0x12, ..] => Some(Self::ByteSwapped),
            [0x40, 0x12, 0x37, 0x80, ..] => Some(Self::Little),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Big => "z64",
            Self::ByteSwapped => "v64",
            Self::Little => "n64",
        }
    }

    /// Rewrite `data` in place into big-endian order.
    fn normalize(self, data: &mut [u8]) {
        match self {
            Self::Big => {}
            Self::ByteSwapped => data.chunks_exact_mut(2).for_each(|pair| pair.swap(0, 1)),
            Self::Little => data.chunks_exact_mut(4).for_each(<[u8]>::reverse),
        }
    }
}

pub struct N64Extractor;

impl Extractor for N64Extractor {
    fn platform(&self) -> Platform {
        Platform::Nintendo64
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["z64", "v64", "n64"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let mut header = ctx.resource()?.read_exact(0, HEADER_SIZE)?;
        let order = ByteOrder::detect(&header).ok_or_else(|| Error::malformed("N64", "unknown header magic"))?;
        order.normalize(&mut header);
        ctx.meta.set_specific("Byte Order", order.name());

        ctx.meta.set_specific("CRC1", format!("{:08X}", be_u32_at(&header, 0x10)?));
        ctx.meta.set_specific("CRC2", format!("{:08X}", be_u32_at(&header, 0x14)?));

        let name = latin1(slice(&header, 0x20, 0x14)?);
        if !name.is_empty() {
            ctx.meta.add_name("Internal Title", name);
        }

        let code = slice(&header, 0x3B, 4)?;
        if code[..3].iter().all(u8::is_ascii_alphanumeric) {
            let region_char = char::from(code[3]);
            let product = format!("{}{}", latin1(&code[..3]), region_char);
            match region(region_char) {
                Some(region) => {
                    ctx.meta.add_region(region);
                }
                None => ctx.meta.set_specific("Region Code", region_char.to_string()),
            }
            ctx.meta.set_specific(
                "Media",
                match code[0] {
                    b'N' => "Cartridge",
                    b'D' => "64DD Disk",
                    b'C' => "Cartridge with 64DD Expansion",
                    b'E' => "64DD Expansion",
                    b'Z' => "Aleck64",
                    _ => "Unknown",
                },
            );
            ctx.meta.product_code.offer(product, Source::Header);
        } else {
            ctx.warn(Error::Parse("product code is not alphanumeric"));
        }
        ctx.meta.set_specific("Version", header[0x3F]);
        Ok(())
    }
}

/// N64 region letters follow the disc-era Nintendo ones, except that `A`
/// marks NTSC Asia and `B` Brazil.
fn region(code: char) -> Option<Region> {
    match code {
        'A' => Some(Region::Asia),
        'B' => Some(Region::Brazil),
        'G' => Some(Region::Usa),
        'L' => Some(Region::Europe),
        other => gamecube::region(other),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::metadata::Value;
    use crate::platforms::testing::Harness;

    fn z64() -> Vec<u8> {
        let mut rom = vec![0u8; 0x1000];
        rom[..4].copy_from_slice(&[0x80, 0x37, 0x12, 0x40]);
        rom[0x10..0x14].copy_from_slice(&[0x63, 0x5A, 0x2B, 0xFF]);
        rom[0x20..0x34].copy_from_slice(b"SUPER MARIO 64      ");
        rom[0x3B..0x3F].copy_from_slice(b"NSME");
        rom[0x3F] = 0;
        rom
    }

    fn check(h: &Harness, order: &str) {
        assert_eq!(h.meta.names.get("Internal Title").map(String::as_str), Some("SUPER MARIO 64"));
        assert_eq!(h.meta.product_code.get().map(String::as_str), Some("NSME"));
        assert_eq!(h.meta.regions.iter().copied().collect::<Vec<_>>(), [Region::Usa]);
        assert_eq!(h.meta.specific.get("Byte Order"), Some(&Value::Text(order.into())));
        assert_eq!(h.meta.specific.get("CRC1"), Some(&Value::Text("635A2BFF".into())));
        assert_eq!(h.meta.specific.get("Media"), Some(&Value::Text("Cartridge".into())));
    }

    #[test]
    fn all_byte_orders_agree() {
        let big = z64();
        let swapped: Vec<u8> = big.chunks(2).flat_map(|p| [p[1], p[0]]).collect();
        let little: Vec<u8> = big.chunks(4).flat_map(|w| [w[3], w[2], w[1], w[0]]).collect();

        for (name, data, order) in [("a.z64", big, "z64"), ("a.v64", swapped, "v64"), ("a.n64", little, "n64")] {
            let mut h = Harness::new(Platform::Nintendo64);
            let (result, warnings) = h.run(&N64Extractor, name, data);
            result.unwrap();
            assert!(warnings.is_empty(), "{warnings:?}");
            check(&h, order);
        }
    }

    #[test]
    fn unknown_magic() {
        let mut h = Harness::new(Platform::Nintendo64);
        let (result, _) = h.run(&N64Extractor, "x.z64", vec![0; 0x1000]);
        assert!(matches!(result, Err(Error::MalformedContainer { format: "N64", .. })));
        assert!(h.meta.names.is_empty());
    }
}
