//! Configuration file.
//!
//! ```toml
//! [engine]
//! threads = 4
//!
//! [decrypt]
//! timeout_secs = 60
//! keys_file = "~/.switch/prod.keys"
//!
//! [[decrypt.tools]]
//! name = "hactool"
//! program = "hactool"
//! args = ["--keyset={keys}", "--{section}dir={output}", "{input}"]
//!
//! [keys]
//! wii_common_key = "..."
//! keys_file = "keys.txt"
//!
//! [reference]
//! compat_db = "compat.json"
//! licensee_table = "licensees.json"
//! ```
//!
//! Every section and key is optional. Missing tools, keys or databases only
//! make the extracted metadata less rich.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::decrypt::ToolSpec;
use crate::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub decrypt: DecryptConfig,
    pub keys: KeysConfig,
    pub reference: ReferenceConfig,
}

/// Batch execution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for batch runs; 0 uses rayon's default.
    pub threads: usize,
}

/// External decryption tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptConfig {
    /// Tools to try, primary first.
    pub tools: Vec<ToolSpec>,
    pub timeout_secs: u64,
    /// Passed to tools through the `{keys}` placeholder.
    pub keys_file: Option<PathBuf>,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        Self {
            tools: ToolSpec::defaults(),
            timeout_secs: 60,
            keys_file: None,
        }
    }
}

/// Symmetric key material.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Hex-encoded Wii common key.
    pub wii_common_key: Option<String>,
    /// `name = hex` key file.
    pub keys_file: Option<PathBuf>,
}

/// Optional reference databases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// JSON: `{ platform: { product_code: entry } }`.
    pub compat_db: Option<PathBuf>,
    /// JSON: `{ "nintendo": { code: name }, "sega": { code: name } }`.
    pub licensee_table: Option<PathBuf>,
}

impl Config {
    /// Load a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::ResourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
