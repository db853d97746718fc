//! The metadata record every extractor fills in.
//!
//! Scalar fields are [`Field`]s that remember which [`Source`] set them.
//! All merging goes through [`Field::offer`], so there is exactly one
//! precedence policy in the crate:
//!
//! 1. an empty field takes any value;
//! 2. a strictly more complete value replaces the current one;
//! 3. a strictly less complete value is dropped;
//! 4. on a tie the value from the higher-ranked source wins
//!    (`Database > Header > Filename`).
//!
//! Completeness is per type (see [`Completeness`]); for most values it is
//! simply "present", which makes rule 4 the deciding one. [`Date`] is the
//! interesting case.
//!
//! Regions and languages are sets, not scalars. A [`SourcedSet`] keeps only
//! the members offered by the highest-ranked source seen so far.

mod date;
mod region;

pub use date::Date;
pub use region::{Language, Region};

use std::hash::Hash;
use std::ops::Deref;

use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};

use crate::platforms::Platform;

/// Where a value came from, lowest confidence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// A bracketed tag in the file name.
    Filename,
    /// Decoded from the image's own header bytes.
    Header,
    /// A reference database keyed by product code.
    Database,
}

/// How much of a value is actually known. Higher is more complete.
pub trait Completeness {
    fn completeness(&self) -> u32 {
        1
    }
}

impl Completeness for String {
    fn completeness(&self) -> u32 {
        u32::from(!self.trim().is_empty())
    }
}

/// A scalar metadata field and the source that set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field<T> {
    value: Option<T>,
    source: Option<Source>,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self {
            value: None,
            source: None,
        }
    }
}

impl<T: Completeness> Field<T> {
    /// Offer a value; returns whether it was taken.
    pub fn offer(&mut self, value: T, source: Source) -> bool {
        let take = match (&self.value, self.source) {
            (Some(current), Some(current_source)) => {
                let (incoming, existing) = (value.completeness(), current.completeness());
                incoming > existing || (incoming == existing && source > current_source)
            }
            _ => true,
        };
        if take {
            self.value = Some(value);
            self.source = Some(source);
        }
        take
    }
}

impl<T> Field<T> {
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn source(&self) -> Option<Source> {
        self.source
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn clear(&mut self) {
        self.value = None;
        self.source = None;
    }
}

/// An order-preserving set whose members all come from one [`Source`].
///
/// Members from a higher-ranked source replace the whole set; members from
/// the same source accumulate; members from a lower-ranked source are
/// dropped.
#[derive(Debug, Clone)]
pub struct SourcedSet<T> {
    items: IndexSet<T>,
    source: Option<Source>,
}

impl<T: Hash + Eq> PartialEq for SourcedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items && self.source == other.source
    }
}

impl<T: Hash + Eq> Eq for SourcedSet<T> {}

impl<T> Default for SourcedSet<T> {
    fn default() -> Self {
        Self {
            items: IndexSet::new(),
            source: None,
        }
    }
}

impl<T: Hash + Eq> SourcedSet<T> {
    /// Offer one member; returns whether the set changed.
    pub fn offer(&mut self, item: T, source: Source) -> bool {
        match self.source {
            Some(current) if source < current => return false,
            Some(current) if source > current => self.items.clear(),
            _ => {}
        }
        self.source = Some(source);
        self.items.insert(item)
    }

    pub fn source(&self) -> Option<Source> {
        self.source
    }
}

impl<T> Deref for SourcedSet<T> {
    type Target = IndexSet<T>;

    fn deref(&self) -> &IndexSet<T> {
        &self.items
    }
}

impl<T: Serialize + Hash + Eq> Serialize for SourcedSet<T> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(s)
    }
}

/// How a title persists progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveType {
    Nothing,
    /// Battery-backed RAM, EEPROM or flash on the cartridge.
    Cart,
    /// Console internal storage.
    Internal,
    MemoryCard,
    Floppy,
    Unknown,
}

impl Completeness for SaveType {
    fn completeness(&self) -> u32 {
        u32::from(*self != SaveType::Unknown)
    }
}

/// An input device a title uses or supports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Gamepad,
    AnalogStick,
    Keyboard,
    Mouse,
    LightGun,
    Paddle,
    SteeringWheel,
    Multitap,
    Microphone,
    MotionSensor,
    Touchscreen,
    Other(String),
}

/// The input devices a title needs, as an ordered set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputInfo {
    pub devices: IndexSet<Device>,
    /// Whether the devices were actually decoded rather than assumed.
    pub known: bool,
}

impl InputInfo {
    pub fn add(&mut self, device: Device) {
        self.devices.insert(device);
        self.known = true;
    }
}

/// A side-table value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(i64),
    Flag(bool),
    List(Vec<String>),
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(i64::from(v))
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Number(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Flag(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::List(v)
    }
}

/// Everything known about one input file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    pub platform: Option<Platform>,
    pub publisher: Field<String>,
    pub developer: Field<String>,
    pub product_code: Field<String>,
    pub release_date: Field<Date>,
    pub save_type: Field<SaveType>,
    pub regions: SourcedSet<Region>,
    pub languages: SourcedSet<Language>,
    pub names: IndexMap<String, String>,
    pub specific: IndexMap<String, Value>,
    #[serde(serialize_with = "image_sizes")]
    pub images: IndexMap<String, Vec<u8>>,
    pub input: InputInfo,
}

impl Metadata {
    pub fn new(platform: Option<Platform>) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    /// Record an alternate name.
    ///
    /// A second value under the same key turns the existing entry into
    /// `Key-1` and stores the new one as `Key-2`; later ones continue the
    /// series.
    pub fn add_name(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let first = format!("{key}-1");
        if !self.names.contains_key(key) && !self.names.contains_key(&first) {
            self.names.insert(key.to_owned(), value);
            return;
        }
        if self.names.contains_key(key) {
            self.names = std::mem::take(&mut self.names)
                .into_iter()
                .map(|(k, v)| if k == key { (first.clone(), v) } else { (k, v) })
                .collect();
        }
        let mut n = 2;
        while self.names.contains_key(&format!("{key}-{n}")) {
            n += 1;
        }
        self.names.insert(format!("{key}-{n}"), value);
    }

    /// Record a header-decoded region.
    pub fn add_region(&mut self, region: Region) -> bool {
        self.regions.offer(region, Source::Header)
    }

    /// Record a header-decoded language.
    pub fn add_language(&mut self, language: Language) -> bool {
        self.languages.offer(language, Source::Header)
    }

    /// Store a side-table value, replacing any previous one under `key`.
    pub fn set_specific(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.specific.insert(key.into(), value.into());
    }

    pub fn add_image(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.images.insert(name.into(), data);
    }
}

fn image_sizes<S: Serializer>(images: &IndexMap<String, Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(images.iter().map(|(k, v)| (k, v.len())))
}
