//! Per-platform extractors and the context they run in.
//!
//! An [`Extractor`] knows one platform. It reads the input through the
//! [`Context`], decodes headers with [`crate::formats`] and records what it
//! finds in the context's [`Metadata`]. Failures that only cost one field
//! or one sub-structure go to [`Context::warn`]; failures that make the
//! whole input unreadable are returned.
//!
//! | Module | Platforms |
//! |--------|-----------|
//! | [`switch`]      | Nintendo Switch (NSP, XCI, NRO) |
//! | [`gamecube`]    | GameCube, Wii |
//! | [`playstation`] | PlayStation |
//! | [`psp`]         | PlayStation Portable |
//! | [`saturn`]      | Sega Saturn |
//! | [`mega_drive`]  | Mega Drive / Genesis, Mega CD |
//! | [`dreamcast`]   | Dreamcast |
//! | [`game_boy`]    | Game Boy, Game Boy Color |
//! | [`gba`]         | Game Boy Advance |
//! | [`n64`]         | Nintendo 64 |

pub mod dreamcast;
pub mod filename;
pub mod game_boy;
pub mod gamecube;
pub mod gba;
pub mod mega_drive;
pub mod n64;
pub mod playstation;
pub mod psp;
pub mod registry;
pub mod saturn;
pub mod switch;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::decrypt::Decryptor;
use crate::formats::disc_sheet;
use crate::keys::KeyMaterial;
use crate::metadata::Metadata;
use crate::reference::References;
use crate::resource::sector::CookedView;
use crate::resource::{self, Resource};
use crate::{Error, Result};

pub use registry::Registry;

macro_rules! platforms {
    ($($variant:ident => $id:literal, $display:literal;)+) => {
        /// A supported platform.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Platform {
            $($variant,)+
        }

        impl Platform {
            pub const ALL: &[Platform] = &[$(Platform::$variant,)+];

            /// Stable identifier used in configuration, reference files and
            /// on the command line.
            pub fn id(self) -> &'static str {
                match self {
                    $(Platform::$variant => $id,)+
                }
            }

            /// Human-readable name.
            pub fn name(self) -> &'static str {
                match self {
                    $(Platform::$variant => $display,)+
                }
            }
        }
    };
}

platforms! {
    Switch => "switch", "Nintendo Switch";
    GameCube => "gamecube", "GameCube";
    Wii => "wii", "Wii";
    PlayStation => "playstation", "PlayStation";
    Psp => "psp", "PlayStation Portable";
    Saturn => "saturn", "Sega Saturn";
    MegaDrive => "megadrive", "Mega Drive";
    MegaCd => "megacd", "Mega CD";
    Dreamcast => "dreamcast", "Dreamcast";
    GameBoy => "gameboy", "Game Boy";
    GameBoyColor => "gameboycolor", "Game Boy Color";
    GameBoyAdvance => "gba", "Game Boy Advance";
    Nintendo64 => "n64", "Nintendo 64";
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.id() == wanted)
            .ok_or(Error::Parse("unknown platform identifier"))
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.id())
    }
}

/// One platform's metadata extractor.
pub trait Extractor: Send + Sync {
    fn platform(&self) -> Platform;

    /// Lowercase file extensions this extractor claims, without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Populate `ctx.meta` from the input.
    fn extract(&self, ctx: &mut Context<'_>) -> Result<()>;
}

/// Everything an extractor may touch while processing one file.
pub struct Context<'a> {
    pub path: &'a Path,
    pub meta: &'a mut Metadata,
    pub references: &'a References,
    pub decryptor: &'a Decryptor,
    pub keys: &'a KeyMaterial,
    /// Non-fatal decode failures, in the order they happened.
    pub warnings: Vec<Error>,
    resource: Option<Box<dyn Resource>>,
    is_disc: bool,
}

impl<'a> Context<'a> {
    pub fn new(
        path: &'a Path,
        meta: &'a mut Metadata,
        references: &'a References,
        decryptor: &'a Decryptor,
        keys: &'a KeyMaterial,
    ) -> Self {
        Self {
            path,
            meta,
            references,
            decryptor,
            keys,
            warnings: Vec::new(),
            resource: None,
            is_disc: false,
        }
    }

    /// Use an already-open resource instead of opening `path`.
    pub fn with_resource(mut self, resource: Box<dyn Resource>) -> Self {
        self.resource = Some(resource);
        self
    }

    /// The input as a plain byte source, opened on first use.
    pub fn resource(&mut self) -> Result<&mut dyn Resource> {
        if self.resource.is_none() {
            debug!(path = %self.path.display(), "opening input");
            self.resource = Some(resource::open_path(self.path)?);
        }
        match self.resource.as_deref_mut() {
            Some(r) => Ok(r),
            None => Err(Error::InvalidRange),
        }
    }

    /// The cooked data area of an optical image, opened on first use.
    ///
    /// Sheets (`.cue`, `.ccd`, `.gdi`) resolve to their data track; a
    /// missing track file is [`Error::ResourceUnavailable`]. Resources
    /// supplied through [`Context::with_resource`] have their sector
    /// geometry sniffed.
    pub fn disc(&mut self) -> Result<&mut dyn Resource> {
        if !self.is_disc {
            let opened: Box<dyn Resource> = match self.resource.take() {
                Some(mut r) => {
                    let geometry = disc_sheet::sniff_geometry(r.as_mut())?;
                    Box::new(CookedView::new(r, geometry))
                }
                None => disc_sheet::open_data_area(self.path)?,
            };
            self.resource = Some(opened);
            self.is_disc = true;
        }
        self.resource()
    }

    /// Record a non-fatal failure.
    pub fn warn(&mut self, error: Error) {
        debug!(path = %self.path.display(), %error, "decode warning");
        self.warnings.push(error);
    }

    /// Keep the value, or record the error as a warning. Resource
    /// failures are never downgraded.
    pub fn attempt<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(v) => Ok(Some(v)),
            Err(e @ Error::ResourceUnavailable { .. }) => Err(e),
            Err(e) => {
                self.warn(e);
                Ok(None)
            }
        }
    }
}

/// Lowercase extension of `path`, or an empty string.
pub(crate) fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_round_trip() {
        for &p in Platform::ALL {
            assert_eq!(p.id().parse::<Platform>().unwrap(), p);
        }
        assert_eq!("GameCube".parse::<Platform>().unwrap(), Platform::GameCube);
        assert!("atari".parse::<Platform>().is_err());
        assert_eq!(serde_json::to_string(&Platform::Switch).unwrap(), "\"switch\"");
    }
}
