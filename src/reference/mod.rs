//! Read-only reference data: licensee tables and the compatibility database.
//!
//! Compiled-in tables live in [`licensee`]. Optional JSON files named in the
//! configuration extend them; those are loaded on first query through a
//! [`OnceLock`] owned by [`References`], which the engine shares by
//! reference across worker threads. A missing or unparsable file is logged
//! once and treated as empty.

pub mod licensee;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ReferenceConfig;
use crate::metadata::{Date, Language, Metadata, Region, Source};
use crate::platforms::Platform;

/// One compatibility-database record, keyed by product code.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompatEntry {
    pub name: Option<String>,
    pub publisher: Option<String>,
    pub developer: Option<String>,
    /// `YYYY-MM-DD`, `YYYYMMDD`, or any prefix of either.
    pub release_date: Option<String>,
    pub regions: Vec<String>,
    pub languages: Vec<String>,
    /// Anything else, copied verbatim into the side table.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// `platform -> product code -> entry`.
type CompatDb = IndexMap<String, IndexMap<String, CompatEntry>>;

/// Licensee overrides, layered over the compiled-in tables.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LicenseeOverlay {
    nintendo: HashMap<String, String>,
    sega: HashMap<String, String>,
}

/// Process-wide reference data, initialized lazily.
#[derive(Debug, Default)]
pub struct References {
    compat_path: Option<PathBuf>,
    licensee_path: Option<PathBuf>,
    compat: OnceLock<CompatDb>,
    licensees: OnceLock<LicenseeOverlay>,
}

impl References {
    pub fn new(config: &ReferenceConfig) -> Self {
        Self {
            compat_path: config.compat_db.clone(),
            licensee_path: config.licensee_table.clone(),
            ..Self::default()
        }
    }

    fn compat_db(&self) -> &CompatDb {
        self.compat
            .get_or_init(|| load_json(self.compat_path.as_deref(), "compatibility database"))
    }

    fn overlay(&self) -> &LicenseeOverlay {
        self.licensees
            .get_or_init(|| load_json(self.licensee_path.as_deref(), "licensee table"))
    }

    /// Database record for `product_code` on `platform`.
    pub fn compat(&self, platform: Platform, product_code: &str) -> Option<&CompatEntry> {
        self.compat_db()
            .get(platform.id())
            .and_then(|entries| entries.get(product_code))
    }

    /// Publisher for a Nintendo maker code, overrides first.
    pub fn nintendo_licensee(&self, code: &str) -> Option<&str> {
        self.overlay()
            .nintendo
            .get(code)
            .map(String::as_str)
            .or_else(|| licensee::nintendo(code))
    }

    /// Publisher for a Sega licensee code, overrides first.
    pub fn sega_licensee(&self, code: &str) -> Option<&str> {
        self.overlay()
            .sega
            .get(code)
            .map(String::as_str)
            .or_else(|| licensee::sega(code))
    }

    /// Merge the database record for the metadata's product code, if any.
    ///
    /// Returns whether a record was found.
    pub fn apply_database(&self, meta: &mut Metadata) -> bool {
        let (Some(platform), Some(code)) = (meta.platform, meta.product_code.get().cloned()) else {
            return false;
        };
        let Some(entry) = self.compat(platform, &code) else {
            return false;
        };
        debug!(%platform, product_code = %code, "compatibility database hit");

        if let Some(name) = &entry.name {
            meta.add_name("Database Name", name.clone());
        }
        if let Some(publisher) = &entry.publisher {
            meta.publisher.offer(publisher.clone(), Source::Database);
        }
        if let Some(developer) = &entry.developer {
            meta.developer.offer(developer.clone(), Source::Database);
        }
        if let Some(date) = entry
            .release_date
            .as_deref()
            .and_then(|d| Date::from_yyyymmdd(&d.replace('-', "")))
        {
            meta.release_date.offer(date, Source::Database);
        }
        for region in entry.regions.iter().filter_map(|r| Region::from_tag(r)) {
            meta.regions.offer(region, Source::Database);
        }
        for language in entry.languages.iter().filter_map(|l| Language::from_code(l)) {
            meta.languages.offer(language, Source::Database);
        }
        for (key, value) in &entry.extra {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            meta.set_specific(key.clone(), text);
        }
        true
    }
}

fn load_json<T: DeserializeOwned + Default>(path: Option<&Path>, what: &str) -> T {
    let Some(path) = path else {
        return T::default();
    };
    let parsed = fs::read_to_string(path)
        .map_err(crate::Error::from)
        .and_then(|text| serde_json::from_str(&text).map_err(crate::Error::from));
    match parsed {
        Ok(value) => {
            debug!(path = %path.display(), "loaded {what}");
            value
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable {what}");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::metadata::Value;

    fn with_files(compat: &str, licensees: &str) -> (tempfile::TempDir, References) {
        let dir = tempfile::tempdir().unwrap();
        let compat_path = dir.path().join("compat.json");
        let licensee_path = dir.path().join("licensees.json");
        fs::write(&compat_path, compat).unwrap();
        fs::write(&licensee_path, licensees).unwrap();
        let refs = References::new(&ReferenceConfig {
            compat_db: Some(compat_path),
            licensee_table: Some(licensee_path),
        });
        (dir, refs)
    }

    #[test]
    fn database_outranks_header() {
        let (_dir, refs) = with_files(
            r#"{"gamecube": {"GALE01": {
                "publisher": "Nintendo Co., Ltd.",
                "release_date": "2001-12-03",
                "regions": ["USA"],
                "status": "playable"
            }}}"#,
            "{}",
        );
        let mut meta = Metadata::new(Some(Platform::GameCube));
        meta.product_code.offer("GALE01".to_owned(), Source::Header);
        meta.publisher.offer("Nintendo".to_owned(), Source::Header);
        meta.release_date.offer(Date::year(2001), Source::Header);

        assert!(refs.apply_database(&mut meta));
        assert_eq!(meta.publisher.get().unwrap(), "Nintendo Co., Ltd.");
        assert_eq!(meta.publisher.source(), Some(Source::Database));
        assert_eq!(meta.release_date.get().unwrap().day, Some(3));
        assert_eq!(meta.specific["status"], Value::Text("playable".into()));
        assert!(meta.regions.contains(&Region::Usa));
    }

    #[test]
    fn overlay_takes_precedence() {
        let (_dir, refs) = with_files("{}", r#"{"sega": {"T-12": "Capcom Co."}, "nintendo": {"ZZ": "Zed"}}"#);
        assert_eq!(refs.sega_licensee("T-12"), Some("Capcom Co."));
        assert_eq!(refs.nintendo_licensee("ZZ"), Some("Zed"));
        assert_eq!(refs.nintendo_licensee("01"), Some("Nintendo"));
    }

    #[test]
    fn broken_file_degrades_to_builtin() {
        let (_dir, refs) = with_files("not json", "[1,2");
        assert_eq!(refs.sega_licensee("T-12"), Some("Capcom"));
        let mut meta = Metadata::new(Some(Platform::GameCube));
        meta.product_code.offer("GALE01".to_owned(), Source::Header);
        assert!(!refs.apply_database(&mut meta));
    }
}
