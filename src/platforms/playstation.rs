//! PlayStation discs: `SYSTEM.CNF` on the ISO 9660 data track.

use tracing::debug;

use super::{Context, Extractor, Platform};
use crate::formats::iso9660::VolumeDescriptor;
use crate::metadata::{Region, Source};
use crate::{Error, Result};

/// `SYSTEM.CNF` is a handful of lines; anything bigger is not one.
const MAX_SYSTEM_CNF: u32 = 0x1000;

pub struct PlayStationExtractor;

impl Extractor for PlayStationExtractor {
    fn platform(&self) -> Platform {
        Platform::PlayStation
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cue", "bin", "iso", "img", "ccd"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let r = ctx.disc()?;
        let volume = VolumeDescriptor::read(r)?;
        let cnf = volume
            .find(r, "SYSTEM.CNF")
            .and_then(|file| file.map(|f| volume.read_file(r, &f, MAX_SYSTEM_CNF)).transpose());

        if !volume.volume_id.is_empty() {
            ctx.meta.set_specific("Volume ID", volume.volume_id.as_str());
        }
        if let Some(created) = volume.created {
            ctx.meta.set_specific("Volume Creation Date", created.to_string());
        }

        let Some(cnf) = ctx.attempt(cnf)?.flatten() else {
            debug!(path = %ctx.path.display(), "no SYSTEM.CNF");
            return Ok(());
        };
        let cnf = SystemCnf::parse(&String::from_utf8_lossy(&cnf));

        match cnf.boot.as_deref().map(|b| (b, extract_serial(b))) {
            Some((_, Some(serial))) => {
                if let Some(region) = serial_region(&serial) {
                    ctx.meta.add_region(region);
                }
                ctx.meta.product_code.offer(serial, Source::Header);
            }
            Some((boot, None)) => {
                ctx.meta.set_specific("Boot File", boot);
                ctx.warn(Error::Parse("boot file name is not a product serial"));
            }
            None => ctx.warn(Error::malformed("SYSTEM.CNF", "no BOOT line")),
        }
        if let Some(mode) = cnf.video_mode {
            ctx.meta.set_specific("Video Mode", mode);
        }
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct SystemCnf {
    boot: Option<String>,
    video_mode: Option<String>,
}

impl SystemCnf {
    fn parse(text: &str) -> Self {
        let mut cnf = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_owned();
            match key.trim().to_ascii_uppercase().as_str() {
                "BOOT" | "BOOT2" if cnf.boot.is_none() => cnf.boot = Some(value),
                "VMODE" => cnf.video_mode = Some(value),
                _ => {}
            }
        }
        cnf
    }
}

/// `cdrom:\SLUS_012.34;1` to `SLUS-01234`.
fn extract_serial(boot: &str) -> Option<String> {
    let file = boot.rsplit(['\\', '/', ':']).next()?;
    let file = file.split(';').next()?.trim();
    let (prefix, rest) = file.split_once(['_', '-'])?;
    let digits: String = rest.chars().filter(|c| *c != '.').collect();
    if prefix.len() != 4 || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if digits.len() < 5 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{digits}", prefix.to_ascii_uppercase()))
}

fn serial_region(serial: &str) -> Option<Region> {
    Some(match serial.get(..4)? {
        "SLUS" | "SCUS" => Region::Usa,
        "SLPS" | "SCPS" | "SLPM" | "SIPS" | "PAPX" | "PCPX" | "SCPM" => Region::Japan,
        "SLES" | "SCES" | "SCED" => Region::Europe,
        "SLKA" | "SCKA" => Region::Korea,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::formats::iso9660::build;
    use crate::metadata::Value;
    use crate::platforms::testing::Harness;

    const CNF: &[u8] = b"BOOT = cdrom:\\SLUS_012.34;1\r\nTCB = 4\r\nEVENT = 10\r\nSTACK = 801FFFF0\r\n";

    /// Expand a cooked image into MODE2/2352 sectors.
    fn raw_mode2(cooked: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for sector in cooked.chunks(2048) {
            let mut raw = vec![0u8; 2352];
            raw[0] = 0;
            raw[1..11].fill(0xFF);
            raw[15] = 2;
            raw[24..24 + sector.len()].copy_from_slice(sector);
            out.extend(raw);
        }
        out
    }

    #[test]
    fn serials() {
        assert_eq!(extract_serial("cdrom:\\SLUS_012.34;1").as_deref(), Some("SLUS-01234"));
        assert_eq!(extract_serial("cdrom0:\\SCES_500.51;1").as_deref(), Some("SCES-50051"));
        assert_eq!(extract_serial("cdrom:PSX.EXE;1"), None);
        assert_eq!(serial_region("SLPM-86023"), Some(Region::Japan));
        assert_eq!(serial_region("ABCD-12345"), None);
    }

    #[test]
    fn system_cnf_boot2_and_vmode() {
        let cnf = SystemCnf::parse("BOOT2 = cdrom0:\\SLES_123.45;1\nVER = 1.00\nVMODE = PAL\n");
        assert_eq!(cnf.boot.as_deref(), Some("cdrom0:\\SLES_123.45;1"));
        assert_eq!(cnf.video_mode.as_deref(), Some("PAL"));
    }

    #[test]
    fn raw_bin_image() {
        let image = raw_mode2(&build("SLUS_01234", &[("SYSTEM.CNF", CNF)]));
        let mut h = Harness::new(Platform::PlayStation);
        let (result, warnings) = h.run(&PlayStationExtractor, "game.bin", image);
        result.unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(h.meta.product_code.get().map(String::as_str), Some("SLUS-01234"));
        assert_eq!(h.meta.regions.iter().copied().collect::<Vec<_>>(), [Region::Usa]);
        assert_eq!(h.meta.specific.get("Volume ID"), Some(&Value::Text("SLUS_01234".into())));
    }

    #[test]
    fn missing_cnf_keeps_volume_fields() {
        let image = build("DEMO", &[("PSX.EXE", &b"PS-X EXE"[..])]);
        let mut h = Harness::new(Platform::PlayStation);
        let (result, warnings) = h.run(&PlayStationExtractor, "demo.iso", image);
        result.unwrap();
        assert!(warnings.is_empty());
        assert!(!h.meta.product_code.is_set());
        assert_eq!(h.meta.specific.get("Volume ID"), Some(&Value::Text("DEMO".into())));
    }

    #[test]
    fn not_an_iso() {
        let mut h = Harness::new(Platform::PlayStation);
        let (result, _) = h.run(&PlayStationExtractor, "junk.iso", vec![0; 40 * 2048]);
        assert!(matches!(result, Err(Error::MalformedContainer { format: "ISO9660", .. })));
    }
}
