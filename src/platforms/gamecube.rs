//! GameCube and Wii optical discs.

use tracing::debug;

use super::{Context, Extractor, Platform};
use crate::formats::gamecube::{self, Banner, DiscHeader, Fst, HEADER_SIZE};
use crate::formats::wii::{self, PartitionKind, PartitionReader, RegionSettings};
use crate::metadata::{Language, Source};
use crate::resource::Resource;
use crate::{Error, Result};

const BANNER_PATH: &str = "opening.bnr";
/// IMET headers end well before this.
const MAX_IMET_SIZE: u64 = 0x600;

pub struct GameCubeExtractor;

impl Extractor for GameCubeExtractor {
    fn platform(&self) -> Platform {
        Platform::GameCube
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gcm", "iso"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let header = read_header(ctx)?;
        apply_header(ctx, &header);
        if header.is_wii {
            ctx.warn(Error::malformed("GCM", "Wii disc; its file system is inside an encrypted partition"));
            return Ok(());
        }

        let japanese = header.region_char() == 'J';
        let banner = {
            let r = ctx.resource()?;
            Fst::read(r, &header).and_then(|fst| read_banner(r, &fst))
        };
        let Some(banner) = ctx.attempt(banner)?.flatten() else {
            return Ok(());
        };
        if let Some(banner) = ctx.attempt(Banner::parse(&banner, japanese))? {
            apply_banner(ctx, &banner);
        }
        Ok(())
    }
}

pub struct WiiExtractor;

impl Extractor for WiiExtractor {
    fn platform(&self) -> Platform {
        Platform::Wii
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["iso"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        let header = read_header(ctx)?;
        if !header.is_wii {
            return Err(Error::malformed("WII", "no Wii disc magic"));
        }
        apply_header(ctx, &header);

        let settings = RegionSettings::read(ctx.resource()?);
        if let Some(settings) = ctx.attempt(settings)? {
            match settings.region {
                Some(region) => {
                    ctx.meta.add_region(region);
                }
                None => ctx.meta.set_specific("Region Code", settings.raw_region),
            }
            for (board, age) in settings.ratings {
                ctx.meta.set_specific(format!("Age Rating ({board})"), age);
            }
        }

        let partitions = wii::partitions(ctx.resource()?);
        let Some(partitions) = ctx.attempt(partitions)? else {
            return Ok(());
        };
        ctx.meta.set_specific("Partitions", partitions.len() as i64);
        let Some(game) = partitions.iter().find(|p| p.kind == PartitionKind::Game) else {
            ctx.warn(Error::malformed("WII", "no game partition"));
            return Ok(());
        };

        let Some(common_key) = ctx.keys.wii_common_key() else {
            debug!(path = %ctx.path.display(), "no Wii common key; banner skipped");
            ctx.meta.set_specific("Banner", "skipped: no Wii common key");
            return Ok(());
        };
        let names = {
            let r = ctx.resource()?;
            read_imet(r, game.offset, &common_key)
        };
        if let Some(names) = ctx.attempt(names)?.flatten() {
            for (language, name) in names {
                ctx.meta.add_name(&format!("Banner Title ({language})"), name);
            }
        }
        Ok(())
    }
}

fn read_header(ctx: &mut Context<'_>) -> Result<DiscHeader> {
    let buf = ctx.resource()?.read_exact(0, HEADER_SIZE)?;
    DiscHeader::parse(&buf)
}

fn apply_header(ctx: &mut Context<'_>, header: &DiscHeader) {
    let meta = &mut *ctx.meta;
    meta.product_code.offer(header.product_code().to_owned(), Source::Header);
    meta.set_specific("Game ID", header.game_id.as_str());
    meta.set_specific("Disc Number", u32::from(header.disc_number) + 1);
    meta.set_specific("Revision", header.revision);
    if !header.title.is_empty() {
        meta.add_name("Internal Title", header.title.as_str());
    }

    let maker = header.maker_code();
    match ctx.references.nintendo_licensee(maker) {
        Some(publisher) => {
            meta.publisher.offer(publisher.to_owned(), Source::Header);
        }
        None => meta.set_specific("Maker Code", maker),
    }

    let code = header.region_char();
    match gamecube::region(code) {
        Some(region) => {
            meta.add_region(region);
        }
        None => meta.set_specific("Region Code", code.to_string()),
    }
}

/// `opening.bnr` bytes, bounded to the largest banner layout.
fn read_banner(r: &mut dyn Resource, fst: &Fst) -> Result<Option<Vec<u8>>> {
    let Some(file) = fst.find(BANNER_PATH) else {
        return Ok(None);
    };
    if file.size < Banner::MIN_SIZE as u64 {
        return Err(Error::malformed("BNR", format!("{} bytes", file.size)));
    }
    let len = file.size.min(Banner::MAX_SIZE as u64) as usize;
    r.read_exact(file.offset, len).map(Some)
}

fn apply_banner(ctx: &mut Context<'_>, banner: &Banner) {
    let meta = &mut *ctx.meta;
    for (language, text) in banner.localized() {
        let suffix = language.map(|l| format!(" ({l})")).unwrap_or_default();
        let title = if text.long_title.is_empty() { &text.short_title } else { &text.long_title };
        if !title.is_empty() {
            meta.add_name(&format!("Banner Title{suffix}"), title.as_str());
        }
        if !text.short_title.is_empty() && text.short_title != *title {
            meta.add_name(&format!("Banner Short Title{suffix}"), text.short_title.as_str());
        }
    }

    let Some((_, primary)) = banner
        .localized()
        .find(|(language, _)| language.is_none_or(|l| l == Language::English))
    else {
        return;
    };
    let maker = if primary.long_maker.is_empty() { &primary.short_maker } else { &primary.long_maker };
    if !maker.is_empty() {
        meta.publisher.offer(maker.clone(), Source::Header);
        meta.set_specific("Banner Maker", maker.as_str());
    }
    if !primary.description.is_empty() {
        meta.set_specific("Description", primary.description.as_str());
    }
}

/// Channel names from the IMET banner inside the game partition.
fn read_imet(r: &mut dyn Resource, offset: u64, common_key: &[u8; 16]) -> Result<Option<Vec<(Language, String)>>> {
    let mut partition = PartitionReader::open(r, offset, common_key)?;
    let inner = DiscHeader::parse(&partition.read_exact(0, HEADER_SIZE)?)?;
    let fst = Fst::read(&mut partition, &inner)?;
    let Some(file) = fst.find(BANNER_PATH) else {
        return Ok(None);
    };
    let buf = partition.read_exact(file.offset, file.size.min(MAX_IMET_SIZE) as usize)?;
    wii::imet_names(&buf).map(Some)
}
