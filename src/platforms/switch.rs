//! Nintendo Switch: NSP and XCI packages, NRO homebrew.
//!
//! Packages are walked as flat containers. The content meta comes from the
//! `*.cnmt.nca` (through the external decryptor) or, failing that, from a
//! `*.cnmt.xml` sidecar. The main content meta names the Control NCA,
//! whose `control.nacp` and icons supply the descriptive fields.

use tracing::debug;

use super::{Context, Extractor, Platform, extension};
use crate::decrypt::Section;
use crate::formats::cnmt::{self, ContentMeta, ContentType};
use crate::formats::nacp::{self, Nacp, StartupUserAccount, VideoCapture};
use crate::formats::nro::Nro;
use crate::formats::partition_fs::{ContainerEntry, PartitionFs};
use crate::formats::{pfs0, xci::Xci};
use crate::metadata::{Metadata, SaveType, Source};
use crate::{Error, Result};

/// XML sidecars larger than this are not read.
const MAX_SIDECAR_SIZE: u64 = 1 << 20;

pub struct SwitchExtractor;

impl Extractor for SwitchExtractor {
    fn platform(&self) -> Platform {
        Platform::Switch
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["nsp", "xci", "nro"]
    }

    fn extract(&self, ctx: &mut Context<'_>) -> Result<()> {
        match extension(ctx.path).as_str() {
            "nro" => extract_nro(ctx),
            "xci" => {
                let r = ctx.resource()?;
                let xci = Xci::parse(r)?;
                let mut parts = Vec::new();
                let mut failures = Vec::new();
                for (name, parsed) in xci.partitions(r) {
                    match parsed {
                        Ok(fs) => parts.push(fs),
                        Err(e) => failures.push((name, e)),
                    }
                }
                for (name, e) in failures {
                    debug!(partition = %name, "XCI partition treated as empty");
                    ctx.warn(e);
                }
                if let Some(capacity) = xci.rom_capacity() {
                    ctx.meta.set_specific("ROM Size", capacity);
                }
                ctx.meta.set_specific("Card Auto Boot", xci.flags.auto_boot());
                extract_package(ctx, &parts)
            }
            _ => {
                let r = ctx.resource()?;
                let size = r.size();
                let fs = pfs0::parse(r, 0, Some(size))?;
                extract_package(ctx, std::slice::from_ref(&fs))
            }
        }
    }
}

/// Every entry named with `suffix` across `parts`.
fn entries_with_suffix<'a>(parts: &'a [PartitionFs], suffix: &'a str) -> Vec<(&'a PartitionFs, &'a ContainerEntry)> {
    parts
        .iter()
        .flat_map(|fs| fs.with_suffix(suffix).map(move |e| (fs, e)))
        .collect()
}

fn find<'a>(parts: &'a [PartitionFs], name: &str) -> Option<(&'a PartitionFs, &'a ContainerEntry)> {
    parts.iter().find_map(|fs| fs.get(name).map(|e| (fs, e)))
}

fn decrypt_entry(
    ctx: &mut Context<'_>,
    fs: &PartitionFs,
    entry: &ContainerEntry,
    section: Section,
    expected: &str,
) -> Result<indexmap::IndexMap<String, Vec<u8>>> {
    let decryptor = ctx.decryptor;
    let r = ctx.resource()?;
    let mut window = fs.window(r, entry);
    decryptor.decrypt(&mut window, section, expected)
}

fn read_sidecar(ctx: &mut Context<'_>, fs: &PartitionFs, entry: &ContainerEntry) -> Result<ContentMeta> {
    if entry.size > MAX_SIDECAR_SIZE {
        return Err(Error::malformed("CNMT", format!("{} is {} bytes", entry.name, entry.size)));
    }
    let r = ctx.resource()?;
    let bytes = fs.read_entry(r, entry)?;
    ContentMeta::from_xml(&String::from_utf8_lossy(&bytes))
}

/// All content metas the package yields, preferring the decrypted binary
/// form and falling back to the XML sidecar of the same name.
fn content_metas(ctx: &mut Context<'_>, parts: &[PartitionFs]) -> Result<Vec<ContentMeta>> {
    let mut metas = Vec::new();
    let mut used_sidecars = Vec::new();

    for (fs, entry) in entries_with_suffix(parts, ".cnmt.nca") {
        let decoded = decrypt_entry(ctx, fs, entry, Section::Meta, ".cnmt").and_then(|files| {
            let bytes = files
                .iter()
                .find(|(name, _)| name.ends_with(".cnmt"))
                .map(|(_, b)| b)
                .ok_or(Error::Parse("no .cnmt in decrypted section"))?;
            ContentMeta::parse(bytes)
        });
        if let Some(meta) = ctx.attempt(decoded)? {
            metas.push(meta);
            continue;
        }
        let sidecar = entry.name.replace(".cnmt.nca", ".cnmt.xml");
        if let Some((fs, xml)) = find(parts, &sidecar) {
            debug!(sidecar, "falling back to XML content meta");
            used_sidecars.push(sidecar.clone());
            let parsed = read_sidecar(ctx, fs, xml);
            if let Some(meta) = ctx.attempt(parsed)? {
                metas.push(meta);
            }
        }
    }

    for (fs, xml) in entries_with_suffix(parts, ".cnmt.xml") {
        if used_sidecars.contains(&xml.name) || !metas.is_empty() {
            continue;
        }
        let parsed = read_sidecar(ctx, fs, xml);
        if let Some(meta) = ctx.attempt(parsed)? {
            metas.push(meta);
        }
    }
    Ok(metas)
}

fn extract_package(ctx: &mut Context<'_>, parts: &[PartitionFs]) -> Result<()> {
    let metas = content_metas(ctx, parts)?;
    let Some(main) = cnmt::choose_main(&metas) else {
        debug!(path = %ctx.path.display(), "package has no readable content meta");
        return Ok(());
    };

    let title_id = main.title_id.to_string();
    ctx.meta.product_code.offer(title_id.clone(), Source::Header);
    ctx.meta.set_specific("Title ID", title_id);
    ctx.meta.set_specific("Revision", main.version);
    ctx.meta.set_specific("Content Meta Type", main.meta_type.to_string());
    if metas.len() > 1 {
        let others: Vec<String> = metas
            .iter()
            .filter(|m| m.title_id != main.title_id)
            .map(|m| format!("{} ({})", m.title_id, m.meta_type))
            .collect();
        ctx.meta.set_specific("Other Content Metas", others);
    }

    let Some(control) = main.first_of(ContentType::Control) else {
        return Ok(());
    };
    let name = format!("{}.nca", control.content_id);
    let Some((fs, entry)) = find(parts, &name) else {
        ctx.warn(Error::malformed("NSP", format!("control content {name} not in package")));
        return Ok(());
    };

    let outputs = decrypt_entry(ctx, fs, entry, Section::Control, "control.nacp");
    let Some(outputs) = ctx.attempt(outputs)? else {
        return Ok(());
    };
    for (file, data) in &outputs {
        if file.ends_with("control.nacp") {
            if let Some(nacp) = ctx.attempt(Nacp::parse(data))? {
                apply_nacp(ctx.meta, &nacp);
            }
        } else if let Some(language) = file
            .rsplit('/')
            .next()
            .and_then(|f| f.strip_prefix("icon_"))
            .and_then(|f| f.strip_suffix(".dat"))
        {
            ctx.meta.add_image(format!("Icon ({language})"), data.clone());
        }
    }
    Ok(())
}

fn extract_nro(ctx: &mut Context<'_>) -> Result<()> {
    let r = ctx.resource()?;
    let nro = Nro::parse(r)?;
    ctx.meta.set_specific("NRO Version", nro.version);
    let Some(assets) = nro.assets else {
        debug!(path = %ctx.path.display(), "NRO has no asset section");
        return Ok(());
    };

    let r = ctx.resource()?;
    let nacp = Nro::read_asset(r, assets.nacp);
    let icon = Nro::read_asset(r, assets.icon);
    if assets.nacp.is_present()
        && let Some(bytes) = ctx.attempt(nacp)?
        && let Some(parsed) = ctx.attempt(Nacp::parse(&bytes))?
    {
        apply_nacp(ctx.meta, &parsed);
    }
    if assets.icon.is_present()
        && let Some(bytes) = ctx.attempt(icon)?
    {
        ctx.meta.add_image("Icon", bytes);
    }
    Ok(())
}

/// Copy everything romkit reports from a control property.
pub fn apply_nacp(meta: &mut Metadata, nacp: &Nacp) {
    for title in &nacp.titles {
        meta.add_name(title.language, title.name.clone());
    }
    if let Some(primary) = nacp.primary_title() {
        meta.publisher.offer(primary.publisher.clone(), Source::Header);
    }
    for language in nacp.supported_languages.iter().filter_map(|l| nacp::language(l)) {
        meta.add_language(language);
    }
    if let Some(version) = &nacp.display_version {
        meta.set_specific("Version", version.as_str());
    }
    if let Some(isbn) = &nacp.isbn {
        meta.set_specific("ISBN", isbn.as_str());
    }
    let save = if nacp.save.any() { SaveType::Internal } else { SaveType::Nothing };
    meta.save_type.offer(save, Source::Header);
    for (board, age) in &nacp.rating_ages {
        meta.set_specific(format!("Age Rating ({board})"), *age);
    }
    meta.set_specific("Demo", nacp.is_demo);
    meta.set_specific("Parental Control", nacp.parental_control);
    meta.set_specific("Screenshots Allowed", nacp.screenshots_allowed);
    meta.set_specific(
        "Video Capture",
        match nacp.video_capture {
            VideoCapture::Disabled => "Disabled".to_owned(),
            VideoCapture::Manual => "Manual".to_owned(),
            VideoCapture::Enabled => "Enabled".to_owned(),
            VideoCapture::Unknown(v) => format!("Unknown ({v})"),
        },
    );
    meta.set_specific(
        "Startup User Account",
        match nacp.startup_user_account {
            StartupUserAccount::None => "None".to_owned(),
            StartupUserAccount::Required => "Required".to_owned(),
            StartupUserAccount::RequiredWithNetworkServiceAccountAvailable => {
                "Required (network service account)".to_owned()
            }
            StartupUserAccount::Unknown(v) => format!("Unknown ({v})"),
        },
    );
}
