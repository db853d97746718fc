//! Closed table of built-in extractors.

use std::collections::HashMap;
use std::path::Path;

use super::{Extractor, Platform, extension};
use super::{dreamcast, game_boy, gamecube, gba, mega_drive, n64, playstation, psp, saturn, switch};

/// Extensions several platforms share; these never select a platform on
/// their own.
const AMBIGUOUS: [&str; 6] = ["cue", "iso", "bin", "img", "ccd", "zip"];

/// Immutable `Platform -> Extractor` map.
pub struct Registry {
    extractors: HashMap<Platform, Box<dyn Extractor>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut platforms: Vec<_> = self.extractors.keys().collect();
        platforms.sort();
        f.debug_struct("Registry").field("platforms", &platforms).finish()
    }
}

impl Registry {
    /// Every extractor romkit ships.
    pub fn builtin() -> Self {
        let all: Vec<Box<dyn Extractor>> = vec![
            Box::new(switch::SwitchExtractor),
            Box::new(gamecube::GameCubeExtractor),
            Box::new(gamecube::WiiExtractor),
            Box::new(playstation::PlayStationExtractor),
            Box::new(psp::PspExtractor),
            Box::new(saturn::SaturnExtractor),
            Box::new(mega_drive::MegaDriveExtractor),
            Box::new(mega_drive::MegaCdExtractor),
            Box::new(dreamcast::DreamcastExtractor),
            Box::new(game_boy::GameBoyExtractor::Mono),
            Box::new(game_boy::GameBoyExtractor::Color),
            Box::new(gba::GbaExtractor),
            Box::new(n64::N64Extractor),
        ];
        Self {
            extractors: all.into_iter().map(|e| (e.platform(), e)).collect(),
        }
    }

    /// The extractor for `platform`, or `None` when there is none.
    pub fn get(&self, platform: Platform) -> Option<&dyn Extractor> {
        self.extractors.get(&platform).map(Box::as_ref)
    }

    /// Pick a platform from the file extension alone.
    ///
    /// Returns `None` for unknown extensions and for ones shared by several
    /// platforms (`.cue`, `.iso`, `.bin`, ...); the caller must name the
    /// platform for those.
    pub fn detect(&self, path: &Path) -> Option<Platform> {
        let ext = extension(path);
        if ext.is_empty() || AMBIGUOUS.contains(&ext.as_str()) {
            return None;
        }
        let mut matches = self
            .extractors
            .values()
            .filter(|e| e.extensions().contains(&ext.as_str()))
            .map(|e| e.platform());
        match (matches.next(), matches.next()) {
            (Some(p), None) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_platform_registered() {
        let registry = Registry::builtin();
        for &p in Platform::ALL {
            assert_eq!(registry.get(p).map(|e| e.platform()), Some(p));
        }
    }

    #[test]
    fn detection_by_extension() {
        let registry = Registry::builtin();
        assert_eq!(registry.detect(Path::new("Game.NSP")), Some(Platform::Switch));
        assert_eq!(registry.detect(Path::new("game.gdi")), Some(Platform::Dreamcast));
        assert_eq!(registry.detect(Path::new("roms.zip#pokemon.gbc")), Some(Platform::GameBoyColor));
        assert_eq!(registry.detect(Path::new("game.z64")), Some(Platform::Nintendo64));
        assert_eq!(registry.detect(Path::new("disc.cue")), None);
        assert_eq!(registry.detect(Path::new("disc.iso")), None);
        assert_eq!(registry.detect(Path::new("readme.txt")), None);
    }
}
