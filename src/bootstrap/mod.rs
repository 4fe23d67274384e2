//! Setting up a run: scratch directories, the binary under test, podman.

pub mod lock;
pub mod podman;
pub mod resolver;
pub mod runtime;

use std::path::PathBuf;

use crate::config::Config;
use crate::errors::Result;
use crate::util::id::create_run_id;

pub use podman::{check_podman, PodmanStatus};
pub use resolver::{
    check_binary_version, BinaryBuilder, BinaryResolver, Provenance, Resolution, SourceBuilder,
};
pub use runtime::prepare_runtime;

/// Per-run state created once at setup and passed to every step.
#[derive(Debug, Clone)]
pub struct HarnessContext {
    pub run_id: String,
    /// `<temp_root>/<run_id>`, exported to the binary as `AI_SERVICES_HOME`.
    pub temp_dir: PathBuf,
    /// Scratch directory holding the built or cached binary.
    pub bin_dir: PathBuf,
    pub config: Config,
}

impl HarnessContext {
    /// Allocate a run id and create its temp tree under `config.temp_root`.
    pub fn setup(config: Config) -> Result<Self> {
        let run_id = create_run_id();
        let temp_dir = prepare_runtime(&config.temp_root, &run_id)?;
        let bin_dir = runtime::bin_dir(&temp_dir);
        Ok(Self {
            run_id,
            temp_dir,
            bin_dir,
            config,
        })
    }
}
