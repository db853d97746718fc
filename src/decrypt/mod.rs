//! Delegated decryption of encrypted content archives (NCA).
//!
//! romkit does not decrypt NCAs itself. A record is copied to a private
//! scratch directory and handed to an external tool; whatever the tool
//! writes to its output directory is read back into memory.
//!
//! ## Outcomes
//!
//! | Tool result | Error | Memoized |
//! |-------------|-------|----------|
//! | every tool missing (spawn `NotFound`, exit 127) | [`Error::ExternalToolUnavailable`] | yes, for the life of the [`Decryptor`] |
//! | stderr mentions an invalid header or wrong keys  | [`Error::DecryptionFailed`] | no |
//! | exit 0 but expected artifact absent               | [`Error::DecryptionFailed`] | no |
//! | any other failure, including timeout              | [`Error::ToolFailed`] | no |
//!
//! Until some tool has been seen to exist, calls probe one at a time, so
//! concurrent callers share the first verdict instead of each spawning
//! every tool. Once the unavailable flag is set no further process is
//! spawned. The scratch directory is a [`tempfile::TempDir`] and is removed on every
//! return path.

mod runner;

pub use runner::{ProcessRunner, ToolOutput, ToolRunner};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DecryptConfig;
use crate::keys::KeyMaterial;
use crate::resource::Resource;
use crate::{Error, Result};

const COPY_CHUNK: usize = 1 << 20;
const MISSING_EXIT_CODE: i32 = 127;
const KEY_ERROR_TOKENS: [&str; 3] = ["invalid header", "wrong keys", "wrong key"];

/// Which part of the archive to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Section 0 of a Meta NCA: a PFS0 holding the `.cnmt`.
    Meta,
    /// RomFS of a Control NCA: `control.nacp` and icons.
    Control,
}

impl Section {
    /// Value substituted for `{section}`.
    pub fn placeholder(self) -> &'static str {
        match self {
            Section::Meta => "section0",
            Section::Control => "romfs",
        }
    }
}

/// An external tool and its argument template.
///
/// Placeholders: `{input}`, `{output}`, `{section}`, `{keys}`. A token
/// that references a placeholder with no value (no keys file configured,
/// say) is dropped from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl ToolSpec {
    /// `hactool`, then `hactoolnet`.
    pub fn defaults() -> Vec<Self> {
        let args = |a: &[&str]| a.iter().map(|s| (*s).to_owned()).collect();
        vec![
            Self {
                name: "hactool".into(),
                program: "hactool".into(),
                args: args(&["--keyset={keys}", "--{section}dir={output}", "{input}"]),
            },
            Self {
                name: "hactoolnet".into(),
                program: "hactoolnet".into(),
                args: args(&["-t", "nca", "--{section}dir", "{output}", "{input}"]),
            },
        ]
    }

    /// Expand the argument template.
    pub fn expand(&self, values: &[(&str, &str)]) -> Vec<String> {
        self.args
            .iter()
            .filter_map(|token| {
                let mut out = token.clone();
                for (name, value) in values {
                    let placeholder = format!("{{{name}}}");
                    if out.contains(&placeholder) {
                        if value.is_empty() {
                            return None;
                        }
                        out = out.replace(&placeholder, value);
                    }
                }
                Some(out)
            })
            .collect()
    }
}

/// Runs external decryption tools, remembering when none exist.
pub struct Decryptor {
    tools: Vec<ToolSpec>,
    keys_file: Option<PathBuf>,
    timeout: Duration,
    runner: Box<dyn ToolRunner>,
    /// Held by the call probing for tools while none is known to exist.
    probe: Mutex<()>,
    tool_seen: OnceLock<()>,
    unavailable: OnceLock<()>,
}

impl std::fmt::Debug for Decryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decryptor")
            .field("tools", &self.tools)
            .field("keys_file", &self.keys_file)
            .field("timeout", &self.timeout)
            .field("unavailable", &self.is_unavailable())
            .finish_non_exhaustive()
    }
}

impl Decryptor {
    pub fn new(config: &DecryptConfig, keys: &KeyMaterial) -> Self {
        Self {
            tools: config.tools.clone(),
            keys_file: config
                .keys_file
                .clone()
                .or_else(|| keys.source().map(Path::to_path_buf)),
            timeout: Duration::from_secs(config.timeout_secs),
            runner: Box::new(ProcessRunner),
            probe: Mutex::new(()),
            tool_seen: OnceLock::new(),
            unavailable: OnceLock::new(),
        }
    }

    /// Replace the process runner.
    pub fn with_runner(mut self, runner: impl ToolRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Whether a previous call found no tool at all.
    pub fn is_unavailable(&self) -> bool {
        self.unavailable.get().is_some()
    }

    /// Decrypt `record` and return every file the tool produced, keyed by
    /// path relative to the output directory (`/`-separated).
    ///
    /// `expected` is the suffix of a file name that must be among the
    /// outputs for the run to count as a success, e.g. `.cnmt` or
    /// `control.nacp`.
    pub fn decrypt(
        &self,
        record: &mut dyn Resource,
        section: Section,
        expected: &str,
    ) -> Result<IndexMap<String, Vec<u8>>> {
        if self.is_unavailable() {
            return Err(Error::ExternalToolUnavailable);
        }
        let _probe = match self.tool_seen.get() {
            Some(()) => None,
            None => Some(self.probe.lock().unwrap_or_else(PoisonError::into_inner)),
        };
        if self.is_unavailable() {
            return Err(Error::ExternalToolUnavailable);
        }

        let scratch = tempfile::Builder::new().prefix("romkit-").tempdir()?;
        let input = scratch.path().join("input.nca");
        let output = scratch.path().join("out");
        fs::create_dir_all(&output)?;
        copy_to_file(record, &input)?;

        let keys = self
            .keys_file
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let input_str = input.to_string_lossy();
        let output_str = output.to_string_lossy();
        let values = [
            ("input", input_str.as_ref()),
            ("output", output_str.as_ref()),
            ("section", section.placeholder()),
            ("keys", keys.as_str()),
        ];

        for tool in &self.tools {
            let args = tool.expand(&values);
            let out = match self.runner.run(&tool.program, &args, self.timeout) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(tool = %tool.name, "tool not found");
                    continue;
                }
                Err(e) => {
                    return Err(Error::ToolFailed {
                        tool: tool.name.clone(),
                        detail: e.to_string(),
                    });
                }
                Ok(out) => out,
            };

            if out.code == Some(MISSING_EXIT_CODE) {
                debug!(tool = %tool.name, "tool reported command not found");
                continue;
            }
            let _ = self.tool_seen.set(());
            if out.timed_out {
                return Err(Error::ToolFailed {
                    tool: tool.name.clone(),
                    detail: format!("timed out after {:?}", self.timeout),
                });
            }
            let stderr = out.stderr.to_lowercase();
            if KEY_ERROR_TOKENS.iter().any(|t| stderr.contains(t)) {
                return Err(Error::DecryptionFailed {
                    tool: tool.name.clone(),
                    detail: out.stderr.trim().to_owned(),
                });
            }
            if out.code != Some(0) {
                return Err(Error::ToolFailed {
                    tool: tool.name.clone(),
                    detail: format!("exit status {:?}: {}", out.code, out.stderr.trim()),
                });
            }

            let files = collect_outputs(&output)?;
            if !files.keys().any(|name| name.ends_with(expected)) {
                return Err(Error::DecryptionFailed {
                    tool: tool.name.clone(),
                    detail: format!("no {expected} in output"),
                });
            }
            debug!(tool = %tool.name, count = files.len(), "decrypted");
            return Ok(files);
        }

        if self.unavailable.set(()).is_ok() {
            info!("no decryption tool found; encrypted content will be skipped for this run");
        }
        Err(Error::ExternalToolUnavailable)
    }
}

fn copy_to_file(record: &mut dyn Resource, path: &Path) -> Result<()> {
    let mut file = fs::File::create(path)?;
    let size = record.size();
    let mut offset = 0u64;
    while offset < size {
        let chunk = record.read(offset, COPY_CHUNK)?;
        if chunk.is_empty() {
            warn!(name = record.name(), offset, "record shorter than declared");
            break;
        }
        file.write_all(&chunk)?;
        offset += chunk.len() as u64;
    }
    file.flush()?;
    Ok(())
}

fn collect_outputs(root: &Path) -> Result<IndexMap<String, Vec<u8>>> {
    let mut files = IndexMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries: Vec<_> = fs::read_dir(&dir)?.collect::<io::Result<_>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
                continue;
            }
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(relative, fs::read(&path)?);
        }
    }
    Ok(files)
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted [`ToolRunner`] for tests.

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// What the mock does when invoked.
    #[derive(Clone)]
    pub enum Script {
        Missing,
        Exit { code: i32, stderr: &'static str },
        /// Write these files into the `{output}` directory and exit 0.
        Produce(Vec<(&'static str, Vec<u8>)>),
    }

    /// Expects tool templates of the form `["{input}", "{output}"]`.
    #[derive(Clone)]
    pub struct MockRunner {
        pub calls: Arc<AtomicUsize>,
        script: Script,
    }

    impl MockRunner {
        pub fn new(script: Script) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                script,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ToolRunner for MockRunner {
        fn run(&self, _program: &str, args: &[String], _timeout: Duration) -> io::Result<ToolOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Missing => Err(io::Error::new(io::ErrorKind::NotFound, "mock missing")),
                Script::Exit { code, stderr } => Ok(ToolOutput {
                    code: Some(*code),
                    stderr: (*stderr).to_owned(),
                    timed_out: false,
                }),
                Script::Produce(files) => {
                    let out = Path::new(&args[1]);
                    for (name, data) in files {
                        let path = out.join(name);
                        if let Some(parent) = path.parent() {
                            fs::create_dir_all(parent)?;
                        }
                        fs::write(path, data)?;
                    }
                    Ok(ToolOutput {
                        code: Some(0),
                        ..ToolOutput::default()
                    })
                }
            }
        }
    }

    pub fn tools(names: &[&str]) -> DecryptConfig {
        DecryptConfig {
            tools: names
                .iter()
                .map(|n| ToolSpec {
                    name: (*n).to_owned(),
                    program: (*n).to_owned(),
                    args: vec!["{input}".into(), "{output}".into()],
                })
                .collect(),
            timeout_secs: 5,
            keys_file: None,
        }
    }

    pub fn decryptor(runner: MockRunner) -> Decryptor {
        Decryptor::new(&tools(&["primary", "secondary"]), &KeyMaterial::new()).with_runner(runner)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::mock::{MockRunner, Script, decryptor};
    use super::*;
    use crate::resource::MemoryResource;

    fn record() -> MemoryResource {
        MemoryResource::new("meta.cnmt.nca", vec![0xAB; 4096])
    }

    #[test]
    fn expansion_drops_empty_placeholders() {
        let spec = &ToolSpec::defaults()[0];
        let args = spec.expand(&[
            ("input", "/t/input.nca"),
            ("output", "/t/out"),
            ("section", "romfs"),
            ("keys", ""),
        ]);
        assert_eq!(args, ["--romfsdir=/t/out", "/t/input.nca"]);
    }

    #[test]
    fn unavailable_is_memoized() {
        let runner = MockRunner::new(Script::Missing);
        let d = decryptor(runner.clone());
        for _ in 0..5 {
            let err = d.decrypt(&mut record(), Section::Meta, ".cnmt").unwrap_err();
            assert!(matches!(err, Error::ExternalToolUnavailable));
        }
        // Both tools probed once, then never again.
        assert_eq!(runner.calls(), 2);
        assert!(d.is_unavailable());
    }

    #[test]
    fn concurrent_first_calls_probe_once() {
        let runner = MockRunner::new(Script::Missing);
        let d = decryptor(runner.clone());
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let err = d.decrypt(&mut record(), Section::Meta, ".cnmt").unwrap_err();
                    assert!(matches!(err, Error::ExternalToolUnavailable));
                });
            }
        });
        assert_eq!(runner.calls(), 2);
    }

    #[test]
    fn exit_127_counts_as_missing() {
        let runner = MockRunner::new(Script::Exit { code: 127, stderr: "sh: hactool: not found" });
        let d = decryptor(runner.clone());
        assert!(matches!(
            d.decrypt(&mut record(), Section::Meta, ".cnmt"),
            Err(Error::ExternalToolUnavailable)
        ));
        assert_eq!(runner.calls(), 2);
    }

    #[test]
    fn wrong_keys_is_not_memoized() {
        let runner = MockRunner::new(Script::Exit { code: 1, stderr: "Error: NCA has Wrong Keys?" });
        let d = decryptor(runner.clone());
        for _ in 0..3 {
            assert!(matches!(
                d.decrypt(&mut record(), Section::Control, "control.nacp"),
                Err(Error::DecryptionFailed { .. })
            ));
        }
        assert_eq!(runner.calls(), 3);
        assert!(!d.is_unavailable());
    }

    #[test]
    fn other_failure_is_tool_failed() {
        let runner = MockRunner::new(Script::Exit { code: 2, stderr: "segfault" });
        let d = decryptor(runner);
        assert!(matches!(
            d.decrypt(&mut record(), Section::Meta, ".cnmt"),
            Err(Error::ToolFailed { .. })
        ));
    }

    #[test]
    fn success_without_artifact_is_decryption_failed() {
        let runner = MockRunner::new(Script::Produce(vec![("unrelated.bin", vec![1])]));
        let d = decryptor(runner);
        assert!(matches!(
            d.decrypt(&mut record(), Section::Control, "control.nacp"),
            Err(Error::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn success_reads_back_outputs() {
        let runner = MockRunner::new(Script::Produce(vec![
            ("control.nacp", vec![1, 2, 3]),
            ("icon_AmericanEnglish.dat", vec![0xFF, 0xD8]),
        ]));
        let d = decryptor(runner);
        let files = d.decrypt(&mut record(), Section::Control, "control.nacp").unwrap();
        let names: Vec<_> = files.keys().map(String::as_str).collect();
        assert_eq!(names, ["control.nacp", "icon_AmericanEnglish.dat"]);
        assert_eq!(files["control.nacp"], [1, 2, 3]);
    }
}
