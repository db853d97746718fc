//! Spawning external tools.

use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// What a finished (or abandoned) tool invocation reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stderr: String,
    /// The process outlived its timeout and was killed.
    pub timed_out: bool,
}

/// Runs one external program to completion.
///
/// An `Err` of kind [`io::ErrorKind::NotFound`] means the program does not
/// exist; any other `Err` is a spawn failure.
pub trait ToolRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String], timeout: Duration) -> io::Result<ToolOutput>;
}

/// [`ToolRunner`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

impl ToolRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String], timeout: Duration) -> io::Result<ToolOutput> {
        let resolved = which::which(program)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("{program}: {e}")))?;
        debug!(program = %resolved.display(), ?args, "spawning tool");

        let mut child = Command::new(&resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain stderr on its own thread so a chatty tool cannot block on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        let started = Instant::now();
        let (status, timed_out) = loop {
            if let Some(status) = child.try_wait()? {
                break (Some(status), false);
            }
            if started.elapsed() >= timeout {
                warn!(program, ?timeout, "tool timed out, killing");
                let _ = child.kill();
                let _ = child.wait();
                break (None, true);
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        Ok(ToolOutput {
            code: status.and_then(|s| s.code()),
            stderr,
            timed_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_not_found() {
        let err = ProcessRunner
            .run("romkit-no-such-tool-7f3a", &[], Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_code_and_stderr() {
        let args = vec!["-c".to_owned(), "echo 'Invalid header' >&2; exit 3".to_owned()];
        let out = ProcessRunner.run("sh", &args, Duration::from_secs(10)).unwrap();
        assert_eq!(out.code, Some(3));
        assert!(out.stderr.contains("Invalid header"));
        assert!(!out.timed_out);
    }

    #[cfg(unix)]
    #[test]
    fn kills_on_timeout() {
        let args = vec!["-c".to_owned(), "sleep 5".to_owned()];
        let out = ProcessRunner
            .run("sh", &args, Duration::from_millis(100))
            .unwrap();
        assert!(out.timed_out);
    }
}
