//! End-to-end harness for the `ai-services` CLI.
//!
//! Locates or builds the binary under test, drives it as a subprocess, scrapes
//! its output, and inspects the pods it creates through podman.

pub mod ai_services;
pub mod bootstrap;
pub mod cleanup;
pub mod config;
pub mod errors;
pub mod logging;
pub mod podman;
pub mod retry;
pub mod suite;
pub mod table;
pub mod util;

pub use ai_services::{AiServicesCli, CreateOptions, HelpTopic};
pub use bootstrap::{
    check_binary_version, BinaryBuilder, BinaryResolver, HarnessContext, Provenance, Resolution,
    SourceBuilder,
};
pub use config::Config;
pub use errors::{HarnessError, Result};
pub use podman::{ContainerInspector, VerifyOutcome};
pub use table::{parse_output, parse_rows, UnitRow};
pub use util::{CommandRunner, Deadline, ExecOutput, ExecRequest, ExecService};
