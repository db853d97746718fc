//! Weak guesses from bracketed file-name tags.
//!
//! `Game Title (USA, Europe) (En,Fr,De) (1995) [!].zip` yields two regions,
//! three languages and a guessed year. Everything recorded here carries
//! [`Source::Filename`], so any header or database value replaces it.

use std::path::Path;

use crate::metadata::{Date, Language, Metadata, Region, Source};

/// Tokens inside `(...)` and `[...]`, split on commas.
fn tags(stem: &str) -> impl Iterator<Item = &str> {
    stem.split(['(', '['])
        .skip(1)
        .filter_map(|s| s.split_once([')', ']']).map(|(inner, _)| inner))
}

/// Apply file-name guesses for `path` to `meta`.
pub fn apply(path: &Path, meta: &mut Metadata) {
    let name = path
        .to_string_lossy()
        .rsplit(['/', '\\', '#'])
        .next()
        .unwrap_or_default()
        .to_owned();

    for tag in tags(&name) {
        let parts: Vec<&str> = tag.split(',').map(str::trim).collect();

        if let [year] = parts[..]
            && year.len() == 4
            && let Ok(y) = year.parse::<u16>()
            && (1970..=2099).contains(&y)
        {
            meta.release_date.offer(Date::year(y).guessed(), Source::Filename);
            continue;
        }

        let regions: Vec<Region> = parts.iter().filter_map(|p| Region::from_tag(p)).collect();
        if regions.len() == parts.len() && !regions.is_empty() && parts.iter().all(|p| p.len() > 1) {
            for region in regions {
                meta.regions.offer(region, Source::Filename);
            }
            continue;
        }

        let languages: Vec<Language> = parts
            .iter()
            .filter(|p| p.len() == 2 || p.contains('-'))
            .filter_map(|p| Language::from_code(p))
            .collect();
        if languages.len() == parts.len() && !languages.is_empty() {
            for language in languages {
                meta.languages.offer(language, Source::Filename);
            }
        }
    }
}
