//! Locating the `ai-services` binary under test.
//!
//! Resolution order:
//! 1) explicit override (`AI_SERVICES_BIN`); it must verify, there is no fall-through
//! 2) a previously built copy in the scratch directory
//! 3) a fresh build from the source tree, copied into the scratch directory
//!
//! Every candidate must answer a version probe before it is used.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::bootstrap::lock::acquire_build_lock;
use crate::errors::{HarnessError, Result};
use crate::util::fs::{copy_executable, ensure_dir};
use crate::util::{CommandRunner, Deadline, ExecRequest};

pub const BINARY_NAME: &str = "ai-services";

/// Flags tried, in order, to get a version string out of a candidate.
pub const VERSION_PROBE_ARGS: [&str; 3] = ["version", "--version", "-v"];

const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Override,
    Cached,
    Built,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::Override => "override",
            Provenance::Cached => "cached",
            Provenance::Built => "built",
        };
        f.write_str(s)
    }
}

/// A verified binary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Resolution {
    pub path: PathBuf,
    pub provenance: Provenance,
    pub version: String,
}

/// Check that `path` is a runnable binary and return its trimmed version output.
pub fn check_binary_version<R: CommandRunner>(runner: &R, path: &Path) -> Result<String> {
    let meta = fs::metadata(path).map_err(|e| {
        HarnessError::verification(path.display().to_string(), format!("binary not found: {e}"))
    })?;
    if meta.is_dir() {
        return Err(HarnessError::verification(
            path.display().to_string(),
            "path is a directory",
        ));
    }

    for flag in VERSION_PROBE_ARGS {
        let req = ExecRequest::new(path.as_os_str())
            .arg(flag)
            .deadline(Deadline::after(VERSION_PROBE_TIMEOUT));
        match runner.run(req) {
            Ok(out) if out.success() => {
                let text = out.combined();
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return Ok(trimmed.to_string());
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(path = %path.display(), flag, error = %e, "version probe failed")
            }
        }
    }
    Err(HarnessError::verification(
        path.display().to_string(),
        "no usable version output",
    ))
}

/// Produces a fresh binary inside `scratch_dir` and returns its path.
pub trait BinaryBuilder {
    fn build(&self, scratch_dir: &Path) -> Result<PathBuf>;
}

/// Builds from the Go source tree found above `start_dir`.
///
/// Tries `make build` first (when a Makefile exists), then `go build`.
/// Build output goes straight to this process's stdout/stderr.
#[derive(Debug)]
pub struct SourceBuilder<R> {
    start_dir: PathBuf,
    runner: R,
    timeout: Duration,
}

impl<R: CommandRunner> SourceBuilder<R> {
    pub fn new(start_dir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            start_dir: start_dir.into(),
            runner,
            timeout: Duration::from_secs(30 * 60),
        }
    }

    fn build_with_make(&self, root: &Path, scratch_dir: &Path) -> Result<PathBuf> {
        let req = ExecRequest::new("make")
            .arg("build")
            .cwd(root)
            .inherit_output(true)
            .deadline(Deadline::after(self.timeout));
        self.runner.run(req)?.into_success("make build")?;

        let built = root.join("bin").join(BINARY_NAME);
        if !built.is_file() {
            return Err(HarnessError::environment(format!(
                "binary not found after make build: {}",
                built.display()
            )));
        }
        let dest = scratch_dir.join(BINARY_NAME);
        copy_executable(&built, &dest)?;
        Ok(dest)
    }

    fn build_with_go(&self, root: &Path, scratch_dir: &Path) -> Result<PathBuf> {
        ensure_dir(scratch_dir)?;
        let dest = scratch_dir.join(BINARY_NAME);
        let req = ExecRequest::new("go")
            .args(["build", "-o"])
            .arg(dest.as_os_str())
            .arg("./cmd/ai-services")
            .cwd(root)
            .inherit_output(true)
            .deadline(Deadline::after(self.timeout));
        self.runner.run(req)?.into_success("go build")?;
        Ok(dest)
    }
}

impl<R: CommandRunner> BinaryBuilder for SourceBuilder<R> {
    fn build(&self, scratch_dir: &Path) -> Result<PathBuf> {
        let root = find_module_root(&self.start_dir).ok_or_else(|| {
            HarnessError::environment(format!(
                "could not find ai-services module root from {}",
                self.start_dir.display()
            ))
        })?;
        info!(root = %root.display(), "building ai-services");

        if root.join("Makefile").is_file() {
            match self.build_with_make(&root, scratch_dir) {
                Ok(p) => return Ok(p),
                Err(e) => warn!(error = %e, "make build failed; falling back to go build"),
            }
        }
        self.build_with_go(&root, scratch_dir)
    }
}

/// Walk up from `start` to the first directory whose `go.mod` mentions `ai-services`.
pub fn find_module_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|d| {
            fs::read_to_string(d.join("go.mod"))
                .map(|s| s.contains(BINARY_NAME))
                .unwrap_or(false)
        })
        .map(Path::to_path_buf)
}

/// Resolves the binary once and remembers the answer.
#[derive(Debug)]
pub struct BinaryResolver<R, B> {
    override_path: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
    runner: R,
    builder: B,
    resolved: OnceCell<Resolution>,
}

impl<R: CommandRunner, B: BinaryBuilder> BinaryResolver<R, B> {
    pub fn new(
        override_path: Option<PathBuf>,
        scratch_dir: Option<PathBuf>,
        runner: R,
        builder: B,
    ) -> Self {
        let override_path = override_path.filter(|p| !p.as_os_str().is_empty());
        Self {
            override_path,
            scratch_dir,
            runner,
            builder,
            resolved: OnceCell::new(),
        }
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    /// Resolve the binary; later calls return the first successful result.
    pub fn resolve(&self) -> Result<&Resolution> {
        self.resolved.get_or_try_init(|| self.discover())
    }

    fn discover(&self) -> Result<Resolution> {
        if let Some(path) = &self.override_path {
            info!(path = %path.display(), "validating {}", crate::config::ENV_BIN);
            let version = check_binary_version(&self.runner, path).map_err(|e| {
                HarnessError::verification(
                    format!("{}={}", crate::config::ENV_BIN, path.display()),
                    format!("failed verification: {e}"),
                )
            })?;
            return Ok(Resolution {
                path: path.clone(),
                provenance: Provenance::Override,
                version,
            });
        }

        if let Some(found) = self.cached() {
            return Ok(found);
        }

        let scratch = self.scratch_dir.as_deref().ok_or_else(|| {
            HarnessError::environment("scratch directory not configured; cannot build ai-services")
        })?;
        ensure_dir(scratch)?;
        let _lock = acquire_build_lock(scratch)?;

        // Another holder of the lock may have finished a build meanwhile.
        if let Some(found) = self.cached() {
            return Ok(found);
        }

        let built = self.builder.build(scratch)?;
        match check_binary_version(&self.runner, &built) {
            Ok(version) => {
                info!(path = %built.display(), %version, "built and verified ai-services");
                Ok(Resolution {
                    path: built,
                    provenance: Provenance::Built,
                    version,
                })
            }
            Err(e) => {
                warn!(path = %built.display(), "verification failed, removing built binary");
                let _ = fs::remove_file(&built);
                Err(HarnessError::verification(
                    "built binary",
                    format!("failed verification: {e}"),
                ))
            }
        }
    }

    fn cached(&self) -> Option<Resolution> {
        let path = self.scratch_dir.as_ref()?.join(BINARY_NAME);
        match check_binary_version(&self.runner, &path) {
            Ok(version) => {
                info!(path = %path.display(), "found verified binary in scratch dir");
                Some(Resolution {
                    path,
                    provenance: Provenance::Cached,
                    version,
                })
            }
            Err(_) => None,
        }
    }
}
