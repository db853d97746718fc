//! PlayStation Portable: UMD images and `EBOOT.PBP` packages.

use tracing::debug;

use super::{Context, Extractor, Platform, extension};
use crate::formats::iso9660::VolumeDescriptor;
use crate::formats::pbp::Pbp;
use crate::formats::sfo::{self, Sfo};
use crate::metadata::{Region, Source};
use crate::resource::Resource;
use crate::{Error, Result};

/// Icons bigger than this are skipped.
const MAX_ICON_SIZE: u32 = 1 << 20;

pub struct PspExtractor;

impl Extractor for PspExtractor {
    fn platform(&self) -> Platform {
        Platform::Psp
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["iso", "pbp"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let (param, icon) = if extension(ctx.path) == "pbp" {
            let r = ctx.resource()?;
            let pbp = Pbp::parse(r)?;
            ctx.meta.set_specific("PBP Version", pbp.version);
            let r = ctx.resource()?;
            let param = pbp.read_section(r, 0, u64::from(sfo::MAX_SIZE))?;
            let icon = pbp.read_section(r, 1, u64::from(MAX_ICON_SIZE));
            (param, icon)
        } else {
            let r = ctx.disc()?;
            let volume = VolumeDescriptor::read(r)?;
            let param = read_iso_file(r, &volume, "PSP_GAME/PARAM.SFO", sfo::MAX_SIZE)?
                .ok_or_else(|| Error::malformed("PSP", "no PSP_GAME/PARAM.SFO"))?;
            let icon = read_iso_file(r, &volume, "PSP_GAME/ICON0.PNG", MAX_ICON_SIZE).map(Option::unwrap_or_default);
            (param, icon)
        };

        let sfo = Sfo::parse(&param)?;
        apply_sfo(ctx, &sfo);

        if let Some(icon) = ctx.attempt(icon)?
            && !icon.is_empty()
        {
            ctx.meta.add_image("Icon", icon);
        }
        Ok(())
    }
}

fn read_iso_file(r: &mut dyn Resource, volume: &VolumeDescriptor, path: &str, max: u32) -> Result<Option<Vec<u8>>> {
    match volume.find(r, path)? {
        Some(file) => volume.read_file(r, &file, max).map(Some),
        None => {
            debug!(path, "not on disc");
            Ok(None)
        }
    }
}

fn apply_sfo(ctx: &mut Context<'_>, sfo: &Sfo) {
    let meta = &mut *ctx.meta;
    if let Some(title) = sfo.text("TITLE") {
        meta.add_name("Title", title);
    }
    if let Some(id) = sfo.text("DISC_ID") {
        if let Some(region) = id.chars().nth(2).and_then(region) {
            meta.add_region(region);
        }
        meta.product_code.offer(id.to_owned(), Source::Header);
    }
    for (key, label) in [
        ("DISC_VERSION", "Disc Version"),
        ("APP_VER", "App Version"),
        ("PSP_SYSTEM_VER", "Required Firmware"),
    ] {
        if let Some(value) = sfo.text(key) {
            meta.set_specific(label, value);
        }
    }
    if let Some(level) = sfo.integer("PARENTAL_LEVEL") {
        meta.set_specific("Parental Level", level);
    }
    if let Some(category) = sfo.text("CATEGORY") {
        let text = match category {
            "UG" => "UMD Game".to_owned(),
            "UV" => "UMD Video".to_owned(),
            "UA" => "UMD Audio".to_owned(),
            "EG" => "PSN Game".to_owned(),
            "ME" => "PS1 Classic".to_owned(),
            "MG" => "Memory Stick Game".to_owned(),
            other => other.to_owned(),
        };
        meta.set_specific("Category", text);
    }
    if let Some(discs) = sfo.integer("DISC_TOTAL").filter(|&n| n > 1) {
        let number = sfo.integer("DISC_NUMBER").unwrap_or(1);
        meta.set_specific("Disc", format!("{number}/{discs}"));
    }
}

/// Region from the third letter of a disc id (`ULUS10041`).
fn region(c: char) -> Option<Region> {
    Some(match c {
        'U' => Region::Usa,
        'E' => Region::Europe,
        'J' => Region::Japan,
        'K' => Region::Korea,
        'H' => Region::HongKong,
        'A' => Region::Asia,
        _ => return None,
    })
}
