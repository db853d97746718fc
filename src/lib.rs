//! **romkit** - descriptive metadata extraction from game ROMs, optical disc
//! images and digital packages.
//!
//! Decoders in [`formats`] walk nested binary containers (package archives,
//! disc file systems, banners, manifests) through bounded reads over a
//! [`resource::Resource`]. Per-platform [`platforms::Extractor`]s turn what
//! they decode into one normalized [`Metadata`] record, and the [`Engine`]
//! runs them over batches of files with per-file error isolation.
//!
//! ```no_run
//! use romkit::{Config, Engine, Platform};
//!
//! let engine = Engine::new(&Config::default());
//! let report = engine.extract("Melee (USA).iso".as_ref(), Some(Platform::GameCube));
//! println!("{}", serde_json::to_string_pretty(&report).unwrap());
//! ```
//!
//! # Supported platforms
//! | Platform | Inputs |
//! |----------|--------|
//! | Nintendo Switch | `.nsp`, `.xci`, `.nro` |
//! | GameCube, Wii | `.iso`, `.gcm` |
//! | PlayStation | `.cue`, `.bin`, `.iso`, `.img`, `.ccd` |
//! | PlayStation Portable | `.iso`, `.pbp` |
//! | Sega Saturn, Mega CD | `.cue`, `.iso`, `.bin`, `.ccd` |
//! | Mega Drive | `.md`, `.gen`, `.smd`, `.bin` |
//! | Dreamcast | `.gdi`, `.cue` |
//! | Game Boy, Game Boy Color, Game Boy Advance | `.gb`, `.gbc`, `.gba` |
//! | Nintendo 64 | `.z64`, `.v64`, `.n64` |
//!
//! Any of these may also be read from inside a `.zip` archive.

pub mod config;
pub mod crypto;
pub mod decrypt;
pub mod engine;
pub mod error;
pub mod formats;
pub mod keys;
pub mod metadata;
pub mod platforms;
pub mod reference;
pub mod resource;
mod utils;

pub use config::Config;
pub use engine::{Engine, FileReport, ReportedError, RunReport, Status};
pub use error::{Error, ErrorKind, Result};
pub use metadata::Metadata;
pub use platforms::Platform;
