//! External breaking-change detection.
//!
//! [`ExternalDiffTool`] runs a structural diff binary (for example `oasdiff`)
//! against a baseline and the current specification and translates its JSON
//! output into [`DriftIssue`]s. The tool is a convenience: every failure mode
//! (missing binary, timeout, unexpected exit, garbage output) degrades to
//! [`Skipped`] and the primary comparison is unaffected.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use schema_drift_core::BreakingChangeDetector;
//! use schema_drift_runner::ExternalDiffTool;
//!
//! let tool = ExternalDiffTool::new("oasdiff").with_timeout(Duration::from_secs(10));
//! match tool.detect(Path::new("baseline.json"), Path::new("openapi.json")) {
//!     Ok(issues) => println!("{} breaking changes", issues.len()),
//!     Err(skipped) => println!("{skipped}"),
//! }
//! ```

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use schema_drift_core::{BreakingChangeDetector, DriftIssue, Skipped};
use schema_drift_loader::DetectorConfig;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::translate::translate_changes;

/// Pause before the single spawn retry.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Longest stderr excerpt kept in a skip reason.
const STDERR_EXCERPT_LEN: usize = 200;

/// Exit code a diff tool uses to signal that it found differences.
const DIFFERENCES_FOUND: i32 = 1;

/// A structural diff binary invoked as a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDiffTool {
    binary: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalDiffTool {
    /// Creates a tool with the default argument template and timeout.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let defaults = DetectorConfig::default();
        Self {
            binary: binary.into(),
            args: defaults.args,
            timeout: Duration::from_secs(defaults.timeout_secs),
        }
    }

    /// Builds a tool from configuration. Returns `None` when no binary is
    /// configured.
    pub fn from_config(config: &DetectorConfig) -> Option<Self> {
        let binary = config.binary.as_ref()?;
        Some(Self {
            binary: PathBuf::from(binary),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Replaces the argument template. `{baseline}` and `{current}` are
    /// substituted with the document paths.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Expands the argument template for one invocation.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use schema_drift_runner::ExternalDiffTool;
    ///
    /// let tool = ExternalDiffTool::new("oasdiff");
    /// let args = tool.command_args(Path::new("old.json"), Path::new("new.json"));
    /// assert_eq!(args, ["breaking", "old.json", "new.json", "--format", "json"]);
    /// ```
    pub fn command_args(&self, baseline: &Path, current: &Path) -> Vec<String> {
        let baseline = baseline.to_string_lossy();
        let current = current.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{baseline}", &baseline)
                    .replace("{current}", &current)
            })
            .collect()
    }

    fn spawn(&self, args: &[String]) -> std::io::Result<Child> {
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    /// Spawns the child, retrying once on a transient failure.
    fn spawn_with_retry(&self, args: &[String]) -> Result<Child, Skipped> {
        match self.spawn(args) {
            Ok(child) => Ok(child),
            Err(e) if is_transient(e.kind()) => {
                warn!(
                    binary = %self.binary.display(),
                    error = %e,
                    "transient spawn failure, retrying once"
                );
                std::thread::sleep(RETRY_DELAY);
                self.spawn(args).map_err(|e| self.spawn_skipped(&e))
            }
            Err(e) => Err(self.spawn_skipped(&e)),
        }
    }

    fn spawn_skipped(&self, error: &std::io::Error) -> Skipped {
        let binary = self.binary.display();
        let skipped = match error.kind() {
            ErrorKind::NotFound => Skipped::new(format!("binary not found: {binary}")),
            ErrorKind::PermissionDenied => {
                Skipped::new(format!("permission denied running {binary}"))
            }
            _ => Skipped::new(format!("failed to start {binary}: {error}")),
        };
        debug!(binary = %binary, error = %error, "breaking-change detector unavailable");
        skipped
    }

    fn skipped_exit(&self, status: ExitStatus, stderr: &str) -> Skipped {
        let excerpt = stderr_excerpt(stderr);
        let status = match status.code() {
            Some(code) => format!("exit code {code}"),
            None => "a signal".to_string(),
        };
        if excerpt.is_empty() {
            Skipped::new(format!("{} terminated with {status}", self.binary.display()))
        } else {
            Skipped::new(format!(
                "{} terminated with {status}: {excerpt}",
                self.binary.display()
            ))
        }
    }
}

impl BreakingChangeDetector for ExternalDiffTool {
    fn name(&self) -> &str {
        self.binary
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("external-diff")
    }

    fn detect(&self, baseline: &Path, current: &Path) -> Result<Vec<DriftIssue>, Skipped> {
        let args = self.command_args(baseline, current);
        debug!(binary = %self.binary.display(), args = ?args, "running breaking-change detector");

        let mut child = self.spawn_with_retry(&args)?;

        // Drain both pipes in the background so a chatty child cannot block
        // on a full pipe buffer before it exits.
        let stdout_thread = child.stdout.take().map(drain);
        let stderr_thread = child.stderr.take().map(drain);

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!(
                    binary = %self.binary.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "breaking-change detector timed out, killing process"
                );
                let _ = child.kill();
                let _ = child.wait();
                return Err(Skipped::new(format!(
                    "{} timed out after {:?}",
                    self.binary.display(),
                    self.timeout
                )));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Skipped::new(format!(
                    "failed to wait on {}: {e}",
                    self.binary.display()
                )));
            }
        };

        let stdout = collect(stdout_thread).map_err(|e| {
            Skipped::new(format!(
                "failed to read output of {}: {e}",
                self.binary.display()
            ))
        })?;
        // stderr only feeds diagnostics; a read failure there is not fatal.
        let stderr = collect(stderr_thread).unwrap_or_default();

        match status.code() {
            Some(0) | Some(DIFFERENCES_FOUND) => {
                let issues = translate_changes(&stdout).map_err(|reason| {
                    debug!(binary = %self.binary.display(), reason = %reason, "unusable detector output");
                    Skipped::new(reason)
                })?;
                debug!(
                    binary = %self.binary.display(),
                    exit_code = ?status.code(),
                    changes = issues.len(),
                    "breaking-change detector finished"
                );
                Ok(issues)
            }
            _ => {
                let skipped = self.skipped_exit(status, &stderr);
                warn!(binary = %self.binary.display(), reason = %skipped.reason, "breaking-change detector failed");
                Err(skipped)
            }
        }
    }
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
            | ErrorKind::ResourceBusy
            | ErrorKind::ExecutableFileBusy
    )
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(thread: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> std::io::Result<String> {
    let Some(thread) = thread else {
        return Ok(String::new());
    };
    let buf = thread
        .join()
        .map_err(|_| std::io::Error::other("pipe reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn stderr_excerpt(stderr: &str) -> String {
    let line = stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    line.chars().take(STDERR_EXCERPT_LEN).collect()
}
