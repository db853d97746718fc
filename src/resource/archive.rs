//! Resources backed by an entry inside a zip archive.
//!
//! Deflate streams are not seekable, so each read reopens the entry and
//! discards bytes up to the requested offset. Memory use stays bounded by the
//! requested window; the cost is time, which is acceptable for header-sized
//! reads near the start of a ROM.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use zip::ZipArchive;

use super::{Resource, clamp};
use crate::{Error, Result};

/// One file entry inside a zip archive.
pub struct ZipEntryResource {
    archive: ZipArchive<File>,
    index: usize,
    name: String,
    size: u64,
}

impl ZipEntryResource {
    /// Open `entry` in the archive at `path`, or the first non-directory
    /// entry when `entry` is `None`.
    pub fn open(path: &Path, entry: Option<&str>) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::ResourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive = ZipArchive::new(file)?;

        let index = match entry {
            Some(name) => archive
                .index_for_name(name)
                .ok_or(zip::result::ZipError::FileNotFound)?,
            None => (0..archive.len())
                .find(|&i| archive.by_index(i).is_ok_and(|f| f.is_file()))
                .ok_or(zip::result::ZipError::FileNotFound)?,
        };

        let (name, size) = {
            let f = archive.by_index(index)?;
            let name = f
                .name()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_owned();
            (name, f.size())
        };

        Ok(Self {
            archive,
            index,
            name,
            size,
        })
    }
}

impl Resource for ZipEntryResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read(&mut self, seek_to: u64, amount: usize) -> Result<Vec<u8>> {
        let amount = clamp(self.size, seek_to, amount);
        let mut buf = Vec::with_capacity(amount);
        if amount == 0 {
            return Ok(buf);
        }
        let mut entry = self.archive.by_index(self.index)?;
        io::copy(&mut (&mut entry).take(seek_to), &mut io::sink())?;
        (&mut entry).take(amount as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn write_zip(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("roms.zip");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.add_directory("sub/", SimpleFileOptions::default()).unwrap();
        zip.start_file("sub/game.gb", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(&(0u8..200).collect::<Vec<_>>()).unwrap();
        zip.start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hello").unwrap();
        zip.finish().unwrap();
        path
    }

    #[test]
    fn reads_window_of_first_file_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(dir.path());
        let mut r = ZipEntryResource::open(&path, None).unwrap();
        assert_eq!(r.name(), "game.gb");
        assert_eq!(r.size(), 200);
        assert_eq!(r.read(100, 3).unwrap(), vec![100, 101, 102]);
        assert_eq!(r.read(198, 10).unwrap(), vec![198, 199]);
    }

    #[test]
    fn named_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(dir.path());
        let mut r = ZipEntryResource::open(&path, Some("readme.txt")).unwrap();
        assert_eq!(r.read(0, 64).unwrap(), b"hello");
        assert!(ZipEntryResource::open(&path, Some("missing")).is_err());
    }
}
