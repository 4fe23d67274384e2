#![allow(clippy::module_name_repetitions)]
//! Small utilities: subprocess execution, filesystem helpers, run identifiers.

pub mod exec;
pub mod fs;
pub mod id;

pub use exec::{CommandRunner, Deadline, ExecOutput, ExecRequest, ExecService};

/// Split a comma separated list, trimming entries and dropping empties.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
