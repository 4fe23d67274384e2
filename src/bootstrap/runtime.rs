use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{HarnessError, Result};
use crate::util::fs::ensure_dir;

/// Create the per-run directory `<temp_root>/<run_id>` (mode 0755) and return it.
///
/// The directory becomes `AI_SERVICES_HOME` for every invocation of the binary.
pub fn prepare_runtime(temp_root: &Path, run_id: &str) -> Result<PathBuf> {
    if run_id.is_empty() {
        return Err(HarnessError::environment("empty run id"));
    }
    let dir = temp_root.join(run_id);
    ensure_dir(&dir).map_err(|e| {
        HarnessError::environment(format!(
            "failed to create temp directory {}: {e}",
            dir.display()
        ))
    })?;
    info!(dir = %dir.display(), "temp runtime environment created");
    Ok(dir)
}

/// Scratch directory for the binary under test inside a run directory.
pub fn bin_dir(runtime_dir: &Path) -> PathBuf {
    runtime_dir.join("bin")
}
