//! Key material loaded from `name = hex` key files.
//!
//! The only key romkit uses itself is the Wii common key, which unwraps
//! partition title keys (see [`crate::crypto::wii`]). Switch keys are never
//! interpreted here: the key file path is handed to the external decryption
//! tool through the `{keys}` placeholder.
//!
//! ## Key file format
//! One entry per line, `name = hex_value`; blank lines and lines beginning
//! with `;` are ignored. Names are matched case-insensitively.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::KeysConfig;
use crate::{Error, Result};

/// Names under which the Wii common key is accepted.
const WII_COMMON_KEY_NAMES: [&str; 2] = ["wii_common_key", "common_key"];

/// Named keys, in file order.
#[derive(Debug, Clone, Default)]
pub struct KeyMaterial {
    keys: IndexMap<String, Vec<u8>>,
    source: Option<PathBuf>,
}

impl KeyMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration. Unreadable files and malformed hex are
    /// logged and skipped; key material is always optional.
    pub fn from_config(config: &KeysConfig) -> Self {
        let mut keys = Self::new();
        if let Some(path) = &config.keys_file
            && let Err(e) = keys.load_file(path)
        {
            warn!(path = %path.display(), error = %e, "ignoring key file");
        }
        if let Some(hex) = &config.wii_common_key
            && !keys.insert_hex("wii_common_key", hex)
        {
            warn!("wii_common_key in configuration is not valid hex");
        }
        keys
    }

    /// Load a key file from disk, remembering its path.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let file = std::fs::File::open(path).map_err(|source| Error::ResourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        self.load(file)?;
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    /// Load keys from a `name = hex` reader.
    ///
    /// Entries whose value is not even-length hex are skipped so that one
    /// bad line does not discard the rest of the file.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<()> {
        for line in BufReader::new(reader).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            if !self.insert_hex(name, value) {
                debug!(name = name.trim(), "skipping key with malformed value");
            }
        }
        Ok(())
    }

    /// Insert one hex-encoded key. Returns `false` if `hex` is malformed.
    pub fn insert_hex(&mut self, name: &str, hex: &str) -> bool {
        match decode_hex(hex) {
            Ok(bytes) => {
                self.keys.insert(name.trim().to_ascii_lowercase(), bytes);
                true
            }
            Err(()) => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.keys.get(&name.to_ascii_lowercase()).map(Vec::as_slice)
    }

    /// The 16-byte Wii common key, if configured under any accepted name.
    pub fn wii_common_key(&self) -> Option<[u8; 16]> {
        WII_COMMON_KEY_NAMES
            .iter()
            .find_map(|name| self.get(name))
            .and_then(|k| <[u8; 16]>::try_from(k).ok())
    }

    /// Path of the key file these keys came from, for external tools.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn decode_hex(s: &str) -> StdResult<Vec<u8>, ()> {
    let s = s.trim();
    if s.is_empty() || s.len() % 2 != 0 {
        return Err(());
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| Ok((hex_nibble(pair[0])? << 4) | hex_nibble(pair[1])?))
        .collect()
}

fn hex_nibble(b: u8) -> StdResult<u8, ()> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(()),
    }
}
