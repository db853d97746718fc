//! Per-file extraction pipeline and the parallel batch runner.
//!
//! For each file the engine:
//!
//! 1. records file-name guesses ([`crate::platforms::filename`]);
//! 2. picks the platform, from the caller or from the extension;
//! 3. runs that platform's extractor, catching panics;
//! 4. on [`Error::ResourceUnavailable`], throws away everything except the
//!    file-name guesses;
//! 5. merges the compatibility database record, if any.
//!
//! Nothing escapes [`Engine::extract`]; every failure ends up in the
//! [`FileReport`].

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::decrypt::{Decryptor, ToolRunner};
use crate::error::{Error, ErrorKind};
use crate::keys::KeyMaterial;
use crate::metadata::Metadata;
use crate::platforms::{Context, Platform, Registry, filename};
use crate::reference::References;

/// How much of a file's metadata survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Extraction finished without any error.
    Succeeded,
    /// Some fields or sub-structures could not be decoded.
    Degraded,
    /// Only file-name guesses are available.
    Failed,
}

/// One error as it appears in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub kind: ErrorKind,
    pub message: String,
    /// Whether this error ended the extractor run, as opposed to costing
    /// one field.
    pub fatal: bool,
}

impl ReportedError {
    fn new(error: &Error, fatal: bool) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            fatal,
        }
    }
}

/// Outcome of extracting one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub platform: Option<Platform>,
    pub status: Status,
    pub metadata: Metadata,
    pub errors: Vec<ReportedError>,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    pub succeeded: usize,
    pub degraded: usize,
    pub failed: usize,
}

impl RunReport {
    fn from_files(files: Vec<FileReport>) -> Self {
        let count = |status| files.iter().filter(|f| f.status == status).count();
        Self {
            succeeded: count(Status::Succeeded),
            degraded: count(Status::Degraded),
            failed: count(Status::Failed),
            files,
        }
    }
}

/// Shared, read-only state for a run.
pub struct Engine {
    registry: Registry,
    references: References,
    keys: KeyMaterial,
    decryptor: Decryptor,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("decryptor", &self.decryptor)
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        let keys = KeyMaterial::from_config(&config.keys);
        let decryptor = Decryptor::new(&config.decrypt, &keys);
        let pool = match config.engine.threads {
            0 => None,
            n => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(threads = n, error = %e, "falling back to the global thread pool");
                    None
                }
            },
        };
        Self {
            registry: Registry::builtin(),
            references: References::new(&config.reference),
            keys,
            decryptor,
            pool,
        }
    }

    /// Replace how external decryption tools are spawned.
    pub fn with_tool_runner(mut self, runner: impl ToolRunner + 'static) -> Self {
        self.decryptor = self.decryptor.with_runner(runner);
        self
    }

    pub fn decryptor(&self) -> &Decryptor {
        &self.decryptor
    }

    /// Extract one file. `platform` overrides extension-based detection,
    /// which is required for extensions several platforms share.
    pub fn extract(&self, path: &Path, platform: Option<Platform>) -> FileReport {
        let platform = platform.or_else(|| self.registry.detect(path));
        let mut meta = filename_only(path, platform);
        let mut errors = Vec::new();

        let extractor = platform.and_then(|p| self.registry.get(p));
        let (Some(platform), Some(extractor)) = (platform, extractor) else {
            warn!(path = %path.display(), "no extractor");
            let error = Error::NoExtractor {
                path: path.to_path_buf(),
            };
            errors.push(ReportedError::new(&error, true));
            return FileReport {
                path: path.to_path_buf(),
                platform,
                status: Status::Failed,
                metadata: meta,
                errors,
            };
        };

        debug!(path = %path.display(), %platform, "extracting");
        let run = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = Context::new(path, &mut meta, &self.references, &self.decryptor, &self.keys);
            let result = extractor.extract(&mut ctx);
            (result, ctx.warnings)
        }));

        let mut status = Status::Succeeded;
        match run {
            Ok((result, warnings)) => {
                if !warnings.is_empty() {
                    status = Status::Degraded;
                }
                errors.extend(warnings.iter().map(|e| ReportedError::new(e, false)));
                match result {
                    Ok(()) => {}
                    Err(e @ Error::ResourceUnavailable { .. }) => {
                        warn!(path = %path.display(), error = %e, "input unavailable");
                        meta = filename_only(path, Some(platform));
                        status = Status::Failed;
                        errors.push(ReportedError::new(&e, true));
                    }
                    Err(e) => {
                        info!(path = %path.display(), error = %e, "extraction stopped early");
                        status = Status::Degraded;
                        errors.push(ReportedError::new(&e, true));
                    }
                }
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_owned());
                warn!(path = %path.display(), %message, "extractor panicked");
                meta = filename_only(path, Some(platform));
                status = Status::Failed;
                errors.push(ReportedError::new(&Error::Panicked(message), true));
            }
        }

        self.references.apply_database(&mut meta);
        FileReport {
            path: path.to_path_buf(),
            platform: Some(platform),
            status,
            metadata: meta,
            errors,
        }
    }

    /// Extract every file in parallel. One file's failure never affects
    /// another's report; reports keep the order of `paths`.
    pub fn run_batch<P>(&self, paths: &[P], platform: Option<Platform>) -> RunReport
    where
        P: AsRef<Path> + Sync,
    {
        let run = || {
            paths
                .par_iter()
                .map(|p| self.extract(p.as_ref(), platform))
                .collect::<Vec<_>>()
        };
        let files = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        let report = RunReport::from_files(files);
        info!(
            files = report.files.len(),
            succeeded = report.succeeded,
            degraded = report.degraded,
            failed = report.failed,
            "batch finished"
        );
        report
    }
}

fn filename_only(path: &Path, platform: Option<Platform>) -> Metadata {
    let mut meta = Metadata::new(platform);
    filename::apply(path, &mut meta);
    meta
}
