//! Track sheets for multi-file optical images: `.cue`, `.ccd` and `.gdi`.
//!
//! A sheet names the track files and their sector modes; romkit only needs
//! the first data track, opened as a cooked [`CookedView`].
//!
//! ## cue
//! ```text
//! FILE "Game (Track 1).bin" BINARY
//!   TRACK 01 MODE2/2352
//!     INDEX 01 00:00:00
//! ```
//!
//! ## ccd (CloneCD; image is `<stem>.img`, raw 2352)
//! ```text
//! [TRACK 1]
//! MODE=2
//! INDEX 1=0
//! ```
//!
//! ## gdi (Dreamcast)
//! ```text
//! 3
//! 1 0 4 2352 track01.bin 0
//! 2 756 0 2352 track02.raw 0
//! 3 45000 4 2352 "track 03.bin" 0
//! ```
//! Columns: number, start LBA, type (4 = data, 0 = audio), sector size,
//! file name, byte offset.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::resource::sector::{CookedView, SectorGeometry};
use crate::resource::{FileResource, Resource};
use crate::{Error, Result};

/// Frames (sectors) per second of CD audio time.
const FRAMES_PER_SECOND: u64 = 75;
/// First LBA of the Dreamcast high-density area.
pub const HIGH_DENSITY_LBA: u64 = 45000;

/// One track as described by a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub number: u8,
    /// Cue-style mode, e.g. `MODE2/2352` or `AUDIO`.
    pub mode: String,
    pub file: PathBuf,
    /// Disc LBA of the track start, where the sheet records one.
    pub lba: u64,
    /// Byte offset of the track's first sector inside `file`.
    pub file_offset: u64,
}

impl Track {
    pub fn is_data(&self) -> bool {
        !self.mode.eq_ignore_ascii_case("AUDIO")
    }

    pub fn geometry(&self) -> Result<SectorGeometry> {
        SectorGeometry::from_track_mode(&self.mode)
    }

    /// Open this track as a cooked view. A missing track file is
    /// [`Error::ResourceUnavailable`].
    pub fn open(&self) -> Result<CookedView<FileResource>> {
        let geometry = self.geometry()?;
        let file = FileResource::open(&self.file)?;
        debug!(file = %self.file.display(), mode = %self.mode, offset = self.file_offset, "opening track");
        Ok(CookedView::with_start(file, geometry, self.file_offset))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscSheet {
    pub tracks: Vec<Track>,
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"')
}

fn msf_frames(msf: &str) -> Option<u64> {
    let mut parts = msf.split(':').map(|p| p.parse::<u64>().ok());
    let (m, s, f) = (parts.next()??, parts.next()??, parts.next()??);
    m.checked_mul(60)?
        .checked_add(s)?
        .checked_mul(FRAMES_PER_SECOND)?
        .checked_add(f)
}

impl DiscSheet {
    /// Parse a cue sheet. Relative `FILE` names resolve against `dir`.
    pub fn parse_cue(text: &str, dir: &Path) -> Result<Self> {
        let mut tracks: Vec<Track> = Vec::new();
        let mut file: Option<PathBuf> = None;

        for line in text.lines().map(str::trim) {
            let upper = line.to_ascii_uppercase();
            if upper.starts_with("FILE ") {
                let rest = &line[5..];
                let name = match rest.trim_start().strip_prefix('"') {
                    Some(quoted) => quoted.split('"').next().unwrap_or_default(),
                    None => rest.split_whitespace().next().unwrap_or_default(),
                };
                file = Some(dir.join(name));
            } else if upper.starts_with("TRACK ") {
                let mut words = line.split_whitespace().skip(1);
                let number = words
                    .next()
                    .and_then(|n| n.parse().ok())
                    .ok_or(Error::Parse("cue TRACK without a number"))?;
                let mode = words.next().ok_or(Error::Parse("cue TRACK without a mode"))?;
                let file = file.clone().ok_or(Error::Parse("cue TRACK before FILE"))?;
                tracks.push(Track {
                    number,
                    mode: mode.to_ascii_uppercase(),
                    file,
                    lba: 0,
                    file_offset: 0,
                });
            } else if upper.starts_with("INDEX 01 ")
                && let Some(track) = tracks.last_mut()
            {
                let frames = line
                    .split_whitespace()
                    .nth(2)
                    .and_then(msf_frames)
                    .ok_or_else(|| Error::malformed("CUE", format!("bad INDEX 01 time: {line}")))?;
                let sector = track.geometry().map_or(2352, |g| u64::from(g.sector_size()));
                track.lba = frames;
                track.file_offset = frames
                    .checked_mul(sector)
                    .ok_or_else(|| Error::malformed("CUE", format!("track {} starts past any file", track.number)))?;
            }
        }

        if tracks.is_empty() {
            return Err(Error::malformed("CUE", "no tracks"));
        }
        Ok(Self { tracks })
    }

    /// Parse a CloneCD control file. The track data lives in `image`.
    pub fn parse_ccd(text: &str, image: &Path) -> Result<Self> {
        let mut tracks = Vec::new();
        let mut current: Option<(u8, u8, u64)> = None;
        let flush = |t: Option<(u8, u8, u64)>, tracks: &mut Vec<Track>| -> Result<()> {
            if let Some((number, mode, lba)) = t {
                let mode = match mode {
                    0 => "AUDIO",
                    1 => "MODE1/2352",
                    _ => "MODE2/2352",
                };
                tracks.push(Track {
                    number,
                    mode: mode.to_owned(),
                    file: image.to_path_buf(),
                    lba,
                    file_offset: lba
                        .checked_mul(2352)
                        .ok_or_else(|| Error::malformed("CCD", format!("track {number} starts past any file")))?,
                });
            }
            Ok(())
        };

        for line in text.lines().map(str::trim) {
            if let Some(section) = line.strip_prefix('[') {
                flush(current.take(), &mut tracks)?;
                if let Some(n) = section
                    .strip_suffix(']')
                    .and_then(|s| s.strip_prefix("TRACK "))
                    .and_then(|n| n.trim().parse().ok())
                {
                    current = Some((n, 0, 0));
                }
            } else if let Some((_, mode, lba)) = current.as_mut()
                && let Some((key, value)) = line.split_once('=')
            {
                match key.trim().to_ascii_uppercase().as_str() {
                    "MODE" => *mode = value.trim().parse().unwrap_or(0),
                    "INDEX 1" => *lba = value.trim().parse().unwrap_or(0),
                    _ => {}
                }
            }
        }
        flush(current.take(), &mut tracks)?;

        if tracks.is_empty() {
            return Err(Error::malformed("CCD", "no tracks"));
        }
        Ok(Self { tracks })
    }

    /// Parse a Dreamcast `.gdi` sheet.
    pub fn parse_gdi(text: &str, dir: &Path) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let count: usize = lines
            .next()
            .and_then(|l| l.parse().ok())
            .ok_or_else(|| Error::malformed("GDI", "missing track count"))?;

        let mut tracks = Vec::with_capacity(count.min(99));
        for line in lines.take(count) {
            let (head, name, tail): (Vec<&str>, &str, &str) = match line.find('"') {
                Some(open) => {
                    let close = line[open + 1..]
                        .find('"')
                        .map(|c| open + 1 + c)
                        .ok_or_else(|| Error::malformed("GDI", "unterminated file name"))?;
                    let head = line[..open].split_whitespace().collect();
                    (head, unquote(&line[open..=close]), &line[close + 1..])
                }
                None => {
                    let words: Vec<&str> = line.split_whitespace().collect();
                    if words.len() < 6 {
                        return Err(Error::malformed("GDI", format!("short track line: {line}")));
                    }
                    (words[..4].to_vec(), words[4], words[5])
                }
            };
            let fields: Vec<u64> = head.iter().filter_map(|w| w.parse().ok()).collect();
            let [number, lba, kind, sector_size] = fields[..] else {
                return Err(Error::malformed("GDI", format!("bad track line: {line}")));
            };
            let mode = match (kind, sector_size) {
                (0, _) => "AUDIO".to_owned(),
                (_, 2048) => "MODE1/2048".to_owned(),
                (_, 2336) => "MODE2/2336".to_owned(),
                (_, size) => format!("MODE1/{size}"),
            };
            tracks.push(Track {
                number: u8::try_from(number).map_err(|_| Error::malformed("GDI", "track number"))?,
                mode,
                file: dir.join(name),
                lba,
                file_offset: tail.trim().parse().unwrap_or(0),
            });
        }

        if tracks.is_empty() {
            return Err(Error::malformed("GDI", "no tracks"));
        }
        Ok(Self { tracks })
    }

    /// Read and parse the sheet at `path`, choosing the syntax by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read(path).map_err(|source| Error::ResourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&text);
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "ccd" => Self::parse_ccd(&text, &path.with_extension("img")),
            "gdi" => Self::parse_gdi(&text, dir),
            _ => Self::parse_cue(&text, dir),
        }
    }

    /// The first data track.
    pub fn first_data_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.is_data())
    }

    /// The first data track at or after `lba`, falling back to the first
    /// data track anywhere.
    pub fn data_track_from(&self, lba: u64) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| t.is_data() && t.lba >= lba)
            .or_else(|| self.first_data_track())
    }
}

/// Guess the geometry of a bare image from its first sector: a CD sync
/// pattern means 2352-byte raw sectors, with the mode byte choosing the
/// header size. Anything else is treated as cooked.
pub fn sniff_geometry(resource: &mut dyn Resource) -> Result<SectorGeometry> {
    const SYNC: [u8; 12] = [0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0];
    let head = resource.read(0, 16)?;
    if head.len() == 16 && head[..12] == SYNC {
        return Ok(match head[15] {
            2 => SectorGeometry::MODE2_FORM1_RAW,
            _ => SectorGeometry::MODE1_RAW,
        });
    }
    Ok(SectorGeometry::COOKED)
}

/// Open the data area of an optical image at `path`.
///
/// Sheets (`.cue`, `.ccd`, `.gdi`) open their first data track (for `.gdi`,
/// the first one in the high-density area); bare `.iso`/`.bin`/`.img` files
/// are sniffed with [`sniff_geometry`].
pub fn open_data_area(path: &Path) -> Result<Box<dyn Resource>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "cue" | "ccd" | "gdi" => {
            let sheet = DiscSheet::load(path)?;
            let track = if ext == "gdi" {
                sheet.data_track_from(HIGH_DENSITY_LBA)
            } else {
                sheet.first_data_track()
            };
            let track = track.ok_or_else(|| Error::malformed("CUE", "no data track"))?;
            Ok(Box::new(track.open()?))
        }
        _ => {
            let mut file = FileResource::open(path)?;
            let geometry = sniff_geometry(&mut file)?;
            Ok(Box::new(CookedView::new(file, geometry)))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn cue_tracks_and_offsets() {
        let cue = "FILE \"Game (Track 1).bin\" BINARY\n  TRACK 01 MODE2/2352\n    INDEX 01 00:00:00\n\
                   FILE Track2.bin BINARY\n  TRACK 02 AUDIO\n    INDEX 00 00:00:00\n    INDEX 01 00:02:00\n";
        let sheet = DiscSheet::parse_cue(cue, Path::new("/discs")).unwrap();
        assert_eq!(sheet.tracks.len(), 2);
        let data = sheet.first_data_track().unwrap();
        assert_eq!(data.file, Path::new("/discs/Game (Track 1).bin"));
        assert_eq!(data.geometry().unwrap(), SectorGeometry::MODE2_FORM1_RAW);
        assert!(!sheet.tracks[1].is_data());
        assert_eq!(sheet.tracks[1].file_offset, 150 * 2352);
    }

    #[test]
    fn cue_without_tracks_is_malformed() {
        assert!(matches!(
            DiscSheet::parse_cue("REM nothing\n", Path::new(".")),
            Err(Error::MalformedContainer { format: "CUE", .. })
        ));
    }

    #[test]
    fn out_of_range_track_starts_are_malformed() {
        let cue = "FILE a.bin BINARY\n TRACK 01 MODE1/2352\n  INDEX 01 99999999999999999:00:00\n";
        assert!(matches!(
            DiscSheet::parse_cue(cue, Path::new(".")),
            Err(Error::MalformedContainer { format: "CUE", .. })
        ));

        let cue = "FILE a.bin BINARY\n TRACK 01 MODE1/2352\n  INDEX 01 3000000000000000:00:00\n";
        assert!(matches!(
            DiscSheet::parse_cue(cue, Path::new(".")),
            Err(Error::MalformedContainer { format: "CUE", .. })
        ));

        let ccd = format!("[TRACK 1]\nMODE=1\nINDEX 1={}\n", u64::MAX);
        assert!(matches!(
            DiscSheet::parse_ccd(&ccd, Path::new("game.img")),
            Err(Error::MalformedContainer { format: "CCD", .. })
        ));
    }

    #[test]
    fn ccd_modes() {
        let ccd = "[CloneCD]\nVersion=3\n[TRACK 1]\nMODE=2\nINDEX 1=0\n[TRACK 2]\nMODE=0\nINDEX 1=1000\n";
        let sheet = DiscSheet::parse_ccd(ccd, Path::new("/d/game.img")).unwrap();
        assert_eq!(sheet.tracks[0].mode, "MODE2/2352");
        assert_eq!(sheet.tracks[1].mode, "AUDIO");
        assert_eq!(sheet.tracks[1].file_offset, 1000 * 2352);
    }

    #[test]
    fn gdi_picks_high_density_track() {
        let gdi = "3\n1 0 4 2352 track01.bin 0\n2 756 0 2352 track02.raw 0\n3 45000 4 2352 \"track 03.bin\" 0\n";
        let sheet = DiscSheet::parse_gdi(gdi, Path::new("/dc")).unwrap();
        let track = sheet.data_track_from(HIGH_DENSITY_LBA).unwrap();
        assert_eq!(track.number, 3);
        assert_eq!(track.file, Path::new("/dc/track 03.bin"));
        assert_eq!(track.mode, "MODE1/2352");
    }

    #[test]
    fn missing_track_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let cue = dir.path().join("game.cue");
        fs::write(&cue, "FILE \"gone.bin\" BINARY\n TRACK 01 MODE1/2352\n  INDEX 01 00:00:00\n").unwrap();
        assert!(matches!(
            open_data_area(&cue),
            Err(Error::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn sniffs_raw_sync() {
        let mut raw = vec![0u8; 2352];
        raw[1..11].fill(0xFF);
        raw[15] = 2;
        let mut r = crate::resource::MemoryResource::new("x.bin", raw);
        assert_eq!(sniff_geometry(&mut r).unwrap(), SectorGeometry::MODE2_FORM1_RAW);
        let mut r = crate::resource::MemoryResource::new("x.iso", vec![0u8; 2048]);
        assert_eq!(sniff_geometry(&mut r).unwrap(), SectorGeometry::COOKED);
    }
}
