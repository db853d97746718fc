//! Bounded random-access byte sources.
//!
//! Every decoder in this crate expresses its reads as explicit
//! `(offset, length)` windows over a [`Resource`]. There is no cursor and no
//! decoder ever loads a whole image: a multi-gigabyte disc is only touched in
//! header-sized pieces.
//!
//! | Type | Backing |
//! |------|---------|
//! | [`FileResource`]            | plain file on disk |
//! | [`MemoryResource`]          | owned buffer (decrypted tool output, tests) |
//! | [`Window`]                  | sub-range of another resource (container entries) |
//! | [`archive::ZipEntryResource`] | one entry inside a zip archive |
//! | [`sector::CookedView`]      | logical 2048-byte payload view of a raw CD image |

pub mod archive;
pub mod sector;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

/// A readable, sized byte source.
///
/// `read` returns up to `amount` bytes; short reads near the end are legal
/// and never an error. Use [`Resource::read_exact`] when a fixed-size
/// structure must be present in full.
pub trait Resource: Send {
    /// Human-readable identity (file name or archive entry name).
    fn name(&self) -> &str;

    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Read up to `amount` bytes starting at `seek_to`.
    fn read(&mut self, seek_to: u64, amount: usize) -> Result<Vec<u8>>;

    /// Read exactly `amount` bytes or fail with [`Error::UnexpectedEof`].
    fn read_exact(&mut self, seek_to: u64, amount: usize) -> Result<Vec<u8>> {
        let data = self.read(seek_to, amount)?;
        if data.len() < amount {
            return Err(Error::UnexpectedEof);
        }
        Ok(data)
    }
}

impl<R: Resource + ?Sized> Resource for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read(&mut self, seek_to: u64, amount: usize) -> Result<Vec<u8>> {
        (**self).read(seek_to, amount)
    }
}

impl<R: Resource + ?Sized> Resource for &mut R {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read(&mut self, seek_to: u64, amount: usize) -> Result<Vec<u8>> {
        (**self).read(seek_to, amount)
    }
}

/// Clamp `amount` so that `seek_to + amount` stays within `size`.
#[inline]
pub(crate) fn clamp(size: u64, seek_to: u64, amount: usize) -> usize {
    let remaining = size.saturating_sub(seek_to);
    usize::try_from(remaining).map_or(amount, |r| amount.min(r))
}

/// A plain file on disk.
#[derive(Debug)]
pub struct FileResource {
    file: File,
    path: PathBuf,
    name: String,
    size: u64,
}

impl FileResource {
    /// Open `path`. Missing or unreadable files are
    /// [`Error::ResourceUnavailable`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |source| Error::ResourceUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unavailable)?;
        let size = file.metadata().map_err(unavailable)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            name,
            size,
        })
    }

    /// Path this resource was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FileResource {
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
        self.file.seek(SeekFrom::Start(seek_to))?;
        (&mut self.file).take(amount as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// An owned in-memory buffer.
#[derive(Debug, Clone)]
pub struct MemoryResource {
    name: String,
    data: Vec<u8>,
}

impl MemoryResource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Borrow the whole buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Resource for MemoryResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, seek_to: u64, amount: usize) -> Result<Vec<u8>> {
        let amount = clamp(self.size(), seek_to, amount);
        if amount == 0 {
            return Ok(Vec::new());
        }
        let start = seek_to as usize;
        Ok(self.data[start..start + amount].to_vec())
    }
}

/// A bounded sub-range `[base, base + len)` of a parent resource.
///
/// Reads past `len` are clamped, so a decoder handed a container entry cannot
/// wander into its siblings.
pub struct Window<'a> {
    parent: &'a mut dyn Resource,
    name: String,
    base: u64,
    len: u64,
}

impl<'a> Window<'a> {
    /// Create a window. `len` is clamped to what the parent actually holds.
    pub fn new(parent: &'a mut dyn Resource, name: impl Into<String>, base: u64, len: u64) -> Self {
        let len = len.min(parent.size().saturating_sub(base));
        Self {
            parent,
            name: name.into(),
            base,
            len,
        }
    }
}

impl Resource for Window<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.len
    }

    fn read(&mut self, seek_to: u64, amount: usize) -> Result<Vec<u8>> {
        let amount = clamp(self.len, seek_to, amount);
        if amount == 0 {
            return Ok(Vec::new());
        }
        self.parent.read(self.base + seek_to, amount)
    }
}

/// Open a path as a resource.
///
/// `archive.zip` opens the first file entry of the archive and
/// `archive.zip#dir/game.gba` opens the named entry; anything else is a plain
/// file.
pub fn open_path(path: impl AsRef<Path>) -> Result<Box<dyn Resource>> {
    let path = path.as_ref();
    let text = path.to_string_lossy();
    if let Some((archive, entry)) = text.split_once(".zip#") {
        let archive = PathBuf::from(format!("{archive}.zip"));
        debug!(archive = %archive.display(), entry, "opening archive entry");
        return Ok(Box::new(archive::ZipEntryResource::open(&archive, Some(entry))?));
    }
    let is_zip = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
    if is_zip {
        return Ok(Box::new(archive::ZipEntryResource::open(path, None)?));
    }
    Ok(Box::new(FileResource::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_reads_near_eof_are_legal() {
        let mut r = MemoryResource::new("m", (0u8..10).collect());
        assert_eq!(r.read(8, 16).unwrap(), vec![8, 9]);
        assert!(r.read(20, 4).unwrap().is_empty());
        assert!(matches!(r.read_exact(8, 16), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn window_is_clamped_to_its_range() {
        let mut r = MemoryResource::new("m", (0u8..32).collect());
        let mut w = Window::new(&mut r, "w", 4, 8);
        assert_eq!(w.size(), 8);
        assert_eq!(w.read(6, 10).unwrap(), vec![10, 11]);
    }

    #[test]
    fn window_len_clamped_to_parent() {
        let mut r = MemoryResource::new("m", vec![0; 16]);
        let w = Window::new(&mut r, "w", 10, 100);
        assert_eq!(w.size(), 6);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = FileResource::open("/nonexistent/romkit/track01.bin").unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable { .. }));
    }

    #[test]
    fn file_resource_reads_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rom.bin");
        std::fs::write(&path, (0u8..=255).collect::<Vec<_>>()).unwrap();
        let mut r = FileResource::open(&path).unwrap();
        assert_eq!(r.name(), "rom.bin");
        assert_eq!(r.size(), 256);
        assert_eq!(r.read(250, 10).unwrap(), vec![250, 251, 252, 253, 254, 255]);
    }
}
