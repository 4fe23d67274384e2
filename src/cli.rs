use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Version string with build metadata from build.rs.
pub(crate) const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("AIS_E2E_BUILD_DATE"),
    ", ",
    env!("AIS_E2E_BUILD_TARGET"),
    ")"
);

#[derive(Parser, Debug)]
#[command(
    name = "ai-services-e2e",
    version,
    long_version = LONG_VERSION,
    about = "End-to-end harness for the ai-services CLI."
)]
pub(crate) struct Cli {
    /// Log filter when AI_E2E_LOG/RUST_LOG are unset (e.g. debug, info, warn)
    #[arg(long, default_value = "info")]
    pub(crate) log_level: String,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Locate, verify or build the ai-services binary and print it
    Resolve {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse `application ps` output (from a file or stdin) into JSON rows
    ParsePs {
        /// Read from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Run `ai-services application ps [APP]` and print the output
    Ps {
        app: Option<String>,
    },
    /// Print the aggregate container restart count of a pod
    Restarts {
        pod: String,
    },
    /// Check pod health and restart counts of an application
    Verify {
        app: String,
    },
    /// Poll AI_SERVICE_URL + AI_HEALTH_PATH until it answers 200
    Health,
    /// Wait until a container's logs contain a readiness keyword
    WaitReady {
        container: String,
    },
    /// Report configuration, podman and binary status
    Doctor,
    /// Run the full lifecycle suite
    Run {
        /// Application name (default: rag-app-<run id>)
        #[arg(long)]
        app: Option<String>,
        /// Also verify containers through podman
        #[arg(long = "verify-containers")]
        verify_containers: bool,
        /// Keep the per-run temp directory
        #[arg(long = "keep-temp")]
        keep_temp: bool,
        /// Copy logs and configs from the temp directory here before cleanup
        #[arg(long)]
        artifacts: Option<PathBuf>,
        /// Emit the report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}
