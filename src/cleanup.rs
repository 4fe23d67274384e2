//! Teardown: temp tree removal and artifact collection.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::util::fs::{copy_file_with_parents, ensure_dir};

/// File extensions kept as run artifacts.
pub const ARTIFACT_EXTENSIONS: &[&str] = &["log", "txt", "json", "yaml", "yml", "env"];

/// Remove a run's temp tree. An empty path or an already-missing tree is a no-op.
pub fn cleanup_temp(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            info!(dir = %dir.display(), "removed temp directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to remove temp directory");
            Err(e)
        }
    }
}

fn is_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ARTIFACT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Copy logs and config files from `temp_dir` into `artifact_dir`, keeping relative paths.
///
/// The `bin/` scratch directory is skipped. Per-file failures are logged and do not
/// stop the walk. Returns the number of files copied.
pub fn collect_artifacts(temp_dir: &Path, artifact_dir: &Path) -> io::Result<usize> {
    if temp_dir.as_os_str().is_empty() || artifact_dir.as_os_str().is_empty() {
        return Ok(0);
    }
    ensure_dir(artifact_dir)?;

    let mut copied = 0;
    let walker = WalkDir::new(temp_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_type().is_dir() && e.file_name() == "bin"));
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable artifact entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_artifact(entry.path()) {
            continue;
        }
        let rel = match entry.path().strip_prefix(temp_dir) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let dest = artifact_dir.join(rel);
        match copy_file_with_parents(entry.path(), &dest) {
            Ok(_) => copied += 1,
            Err(e) => warn!(src = %entry.path().display(), error = %e, "failed to copy artifact"),
        }
    }
    info!(count = copied, dir = %artifact_dir.display(), "artifacts collected");
    Ok(copied)
}
