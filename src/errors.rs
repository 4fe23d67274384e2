//! Error taxonomy for the harness.
//!
//! Mapping guide:
//! - Environment: missing toolchain, scratch dir, or external tool. Fatal, never retried.
//! - Verification: a binary failed the version probe.
//! - Parse/Json: unrecognised output shape; the raw input is carried in the message.
//! - Validation: a required substring or unit state was absent; names the missing item.
//! - Exhausted: a retried operation ran out of attempts; carries the last cause.
use std::io;
use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("{0}")]
    Environment(String),

    #[error("{context}: {reason}")]
    Verification { context: String, reason: String },

    #[error("unparseable row: {0:?}")]
    UnparseableRow(String),

    #[error("failed to parse {what}: {source}\n{input}")]
    Json {
        what: String,
        input: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Validation(String),

    #[error("{what} failed after {attempts} attempts: {source}")]
    Exhausted {
        what: String,
        attempts: u32,
        #[source]
        source: BoxError,
    },

    #[error("{what} failed (exit code {status}):\n{output}", status = display_code(.code))]
    CommandFailed {
        what: String,
        code: Option<i32>,
        output: String,
    },

    #[error("GET {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("{what} timed out after {elapsed:?}")]
    Timeout { what: String, elapsed: Duration },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

impl HarnessError {
    pub fn environment(msg: impl Into<String>) -> Self {
        HarnessError::Environment(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        HarnessError::Validation(msg.into())
    }

    pub fn verification(context: impl Into<String>, reason: impl Into<String>) -> Self {
        HarnessError::Verification {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// Exit code for the CLI when a harness operation fails.
pub fn exit_code_for_harness_error(e: &HarnessError) -> u8 {
    match e {
        HarnessError::Io(ioe) => exit_code_for_io_error(ioe),
        HarnessError::Environment(_) => 127,
        _ => 1,
    }
}
