//! Library-wide error and result types.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout romkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// None of these are fatal to a batch; [`Error::kind`] tells the engine how
/// much of a file's metadata survives.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// Bad magic, a size-bound violation or an otherwise inconsistent table
    /// inside a container. Aborts decoding of that one container.
    #[error("malformed {format}: {detail}")]
    MalformedContainer {
        /// Short format name, e.g. `"PFS0"`.
        format: &'static str,
        /// What was wrong.
        detail: String,
    },
    /// The stream ended before all expected bytes could be read.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// A null-terminated string had no null terminator within the buffer.
    #[error("unterminated string")]
    UnterminatedName,
    /// An offset or size field would read outside the valid region.
    #[error("invalid offset or size")]
    InvalidRange,
    /// A format version is present in the data but not supported.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),
    /// A structural constraint was violated (message describes which one).
    #[error("parse error: {0}")]
    Parse(&'static str),
    /// The sector layout of an optical image is not one we can translate.
    #[error("unsupported sector geometry: {sector_size} bytes per sector")]
    UnsupportedGeometry {
        /// Declared physical sector size.
        sector_size: u32,
    },
    /// The backing file of a resource is missing or unreadable.
    #[error("resource unavailable: {}", path.display())]
    ResourceUnavailable {
        /// Path that could not be opened.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// No external decryption tool could be found. Memoized for the run.
    #[error("no external decryption tool available")]
    ExternalToolUnavailable,
    /// The tool ran but rejected this particular input (bad header, wrong keys).
    #[error("{tool} failed to decrypt: {detail}")]
    DecryptionFailed {
        /// Tool name.
        tool: String,
        /// Tool diagnostic.
        detail: String,
    },
    /// The tool ran and failed for some other reason, or timed out.
    #[error("{tool} failed: {detail}")]
    ToolFailed {
        /// Tool name.
        tool: String,
        /// Tool diagnostic.
        detail: String,
    },
    /// Text in a header could not be decoded.
    #[error("text decode error: {0}")]
    Text(&'static str),
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// XML sidecar could not be deserialized.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
    /// JSON reference data could not be deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Configuration file could not be deserialized.
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Archive-level failure while reading a zip entry.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// No platform was named or detected for a file.
    #[error("no extractor for {}", path.display())]
    NoExtractor {
        /// The file that was skipped.
        path: PathBuf,
    },
    /// An extractor panicked; the message is the panic payload.
    #[error("extractor panicked: {0}")]
    Panicked(String),
}

/// Coarse classification of an [`Error`], used for per-file reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedContainer,
    UnsupportedGeometry,
    ResourceUnavailable,
    ExternalToolUnavailable,
    DecryptionFailed,
    ToolFailed,
    Text,
    Io,
    NoExtractor,
    Internal,
}

impl Error {
    /// Shorthand for [`Error::MalformedContainer`].
    pub fn malformed(format: &'static str, detail: impl Into<String>) -> Self {
        Error::MalformedContainer {
            format,
            detail: detail.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedContainer { .. }
            | Error::UnexpectedEof
            | Error::UnterminatedName
            | Error::InvalidRange
            | Error::UnsupportedVersion(_)
            | Error::Parse(_)
            | Error::Xml(_) => ErrorKind::MalformedContainer,
            Error::UnsupportedGeometry { .. } => ErrorKind::UnsupportedGeometry,
            Error::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
            Error::ExternalToolUnavailable => ErrorKind::ExternalToolUnavailable,
            Error::DecryptionFailed { .. } => ErrorKind::DecryptionFailed,
            Error::ToolFailed { .. } => ErrorKind::ToolFailed,
            Error::Text(_) => ErrorKind::Text,
            Error::Io(_) | Error::Zip(_) => ErrorKind::Io,
            Error::NoExtractor { .. } => ErrorKind::NoExtractor,
            Error::Json(_) | Error::Toml(_) | Error::Panicked(_) => ErrorKind::Internal,
        }
    }
}
