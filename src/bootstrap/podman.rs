use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::errors::{HarnessError, Result};
use crate::podman::ContainerInspector;
use crate::util::{CommandRunner, Deadline, ExecRequest};

/// What was learned about the local podman installation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PodmanStatus {
    pub path: PathBuf,
    pub version: String,
    /// None when `podman info` could not report it.
    pub rootless: Option<bool>,
}

impl PodmanStatus {
    /// Inspector bound to the executable that was checked.
    pub fn inspector<R: CommandRunner>(&self, runner: R) -> ContainerInspector<R> {
        ContainerInspector::new(self.path.clone(), runner)
    }
}

/// Locate podman on PATH.
pub fn podman_path() -> Result<PathBuf> {
    which::which("podman")
        .map_err(|e| HarnessError::environment(format!("podman not found in PATH: {e}")))
}

/// Check that podman is installed and answers `--version`; rootless mode is informational.
pub fn check_podman<R: CommandRunner>(runner: &R) -> Result<PodmanStatus> {
    let path = podman_path()?;
    info!(path = %path.display(), "podman found");
    check_podman_at(runner, path)
}

pub fn check_podman_at<R: CommandRunner>(runner: &R, path: PathBuf) -> Result<PodmanStatus> {
    let deadline = Deadline::after(Duration::from_secs(30));
    let version = runner
        .run(
            ExecRequest::new(path.as_os_str())
                .arg("--version")
                .deadline(deadline),
        )?
        .into_success("podman --version")
        .map_err(|e| HarnessError::environment(format!("failed to get podman version: {e}")))?
        .trim()
        .to_string();
    info!(%version, "podman version");

    let rootless = runner
        .run(
            ExecRequest::new(path.as_os_str())
                .args(["info", "--format", "{{.Host.Security.RootlessMode}}"])
                .deadline(deadline),
        )
        .ok()
        .filter(|o| o.success())
        .and_then(|o| parse_bool(o.combined().trim()));
    if let Some(r) = rootless {
        info!(rootless = r, "podman rootless mode");
    }

    Ok(PodmanStatus {
        path,
        version,
        rootless,
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
