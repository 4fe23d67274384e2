//! Validators for captured `ai-services` output.
//!
//! Every validator is a pure predicate: it never retries and never mutates
//! state, and on failure names exactly which requirement was missing.

use std::fmt;
use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::errors::{HarnessError, Result};
use crate::table::{is_separator, parse_rows};

pub const BOOTSTRAP_CONFIGURE_REQUIRED: &[&str] = &[
    "LPAR configured successfully",
    "Bootstrap configuration completed successfully",
];

pub const BOOTSTRAP_VALIDATE_REQUIRED: &[&str] = &["All validations passed"];

/// Union of the configure and validate lists.
pub const BOOTSTRAP_FULL_REQUIRED: &[&str] = &[
    "LPAR configured successfully",
    "Bootstrap configuration completed successfully",
    "All validations passed",
];

pub const HELP_REQUIRED: &[&str] = &[
    "A CLI tool for managing AI Services infrastructure.",
    "Use \"ai-services [command] --help\" for more information about a command.",
];

pub const PS_HEADER_COLUMNS: &[&str] = &["APPLICATION NAME", "POD NAME", "STATUS"];

pub const STOP_REQUIRED: &[&str] = &["Proceeding to stop pods"];

pub const DELETE_REQUIRED: &[&str] = &[
    "Proceeding with deletion",
    "Application data cleaned up successfully",
];

/// Name fragments of pods that must be `Exited` after a stop.
pub const MAIN_POD_FRAGMENTS: &[&str] = &["vllm-server", "chat-bot"];

pub const EXITED_STATUS: &str = "Exited";
pub const NO_PODS_MARKER: &str = "No Pods found";

/// Top-level commands whose `-h` output is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelpTopic {
    Application,
    Bootstrap,
    Completion,
    Version,
}

impl HelpTopic {
    pub const ALL: [HelpTopic; 4] = [
        HelpTopic::Application,
        HelpTopic::Bootstrap,
        HelpTopic::Completion,
        HelpTopic::Version,
    ];

    pub fn command(self) -> &'static str {
        match self {
            HelpTopic::Application => "application",
            HelpTopic::Bootstrap => "bootstrap",
            HelpTopic::Completion => "completion",
            HelpTopic::Version => "version",
        }
    }

    pub fn required(self) -> &'static [&'static str] {
        match self {
            HelpTopic::Application => &[
                "The application command helps you deploy and monitor the applications",
                "ai-services application [command]",
            ],
            HelpTopic::Bootstrap => &[
                "Bootstrap and configure the infrastructure required for AI Services.",
                "ai-services bootstrap [flags]",
            ],
            HelpTopic::Completion => &[
                "Generate the autocompletion script for ai-services for the specified shell.",
                "ai-services completion [command]",
            ],
            HelpTopic::Version => &[
                "Prints CLI version with more info",
                "ai-services version [flags]",
            ],
        }
    }

    pub fn from_command(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.command() == s)
    }
}

impl fmt::Display for HelpTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Fail with `<label> validation failed: missing '<item>'` for the first absent item.
pub fn require_all<S: AsRef<str>>(label: &str, output: &str, required: &[S]) -> Result<()> {
    for r in required {
        let r = r.as_ref();
        if !output.contains(r) {
            return Err(HarnessError::validation(format!(
                "{label} validation failed: missing '{r}'"
            )));
        }
    }
    Ok(())
}

pub fn validate_bootstrap_configure_output(output: &str) -> Result<()> {
    require_all("bootstrap configure", output, BOOTSTRAP_CONFIGURE_REQUIRED)
}

pub fn validate_bootstrap_validate_output(output: &str) -> Result<()> {
    require_all("bootstrap validate", output, BOOTSTRAP_VALIDATE_REQUIRED)
}

pub fn validate_bootstrap_full_output(output: &str) -> Result<()> {
    require_all("full bootstrap", output, BOOTSTRAP_FULL_REQUIRED)
}

pub fn validate_create_app_output(output: &str, app_name: &str) -> Result<()> {
    let required = [
        format!("Creating application '{app_name}'"),
        format!("Application '{app_name}' deployed successfully"),
    ];
    require_all("create-app", output, &required)
}

pub fn validate_help_command_output(output: &str) -> Result<()> {
    require_all("help command", output, HELP_REQUIRED)
}

pub fn validate_help_topic_output(topic: HelpTopic, output: &str) -> Result<()> {
    require_all(
        &format!("help {topic} command"),
        output,
        topic.required(),
    )
}

/// `application ps` output must carry the three column titles.
pub fn validate_application_ps(output: &str) -> Result<()> {
    for col in PS_HEADER_COLUMNS {
        if !output.contains(col) {
            return Err(HarnessError::validation(format!(
                "invalid application ps output format: missing column '{col}'"
            )));
        }
    }
    Ok(())
}

pub fn validate_stop_app_output(output: &str) -> Result<()> {
    require_all("stop app", output, STOP_REQUIRED)
}

pub fn validate_delete_app_output(output: &str, _app_name: &str) -> Result<()> {
    require_all("delete app", output, DELETE_REQUIRED)
}

fn is_main_pod(pod: &str) -> bool {
    MAIN_POD_FRAGMENTS.iter().any(|m| pod.contains(m))
}

/// After `application stop`, every main pod must be `Exited`.
///
/// Auxiliary pods, the "No Pods found" marker and lines that are not table
/// rows are not checked. A main pod line whose status cannot be read fails.
pub fn validate_pods_exited_after_stop(ps_output: &str, app_name: &str) -> Result<()> {
    for line in ps_output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(NO_PODS_MARKER) {
            continue;
        }
        let rows = match parse_rows(&[line]) {
            Ok(rows) => rows,
            Err(_) if is_main_pod(trimmed) => {
                return Err(HarnessError::validation(format!(
                    "could not read status of main pod line for app {app_name}: {trimmed:?}"
                )));
            }
            Err(_) => {
                debug!(line = trimmed, "ignoring non-row line in ps output");
                continue;
            }
        };
        for row in rows {
            if is_main_pod(&row.unit) && !is_exited(&row.status) {
                return Err(HarnessError::validation(format!(
                    "main pod {} not in {EXITED_STATUS} state for app {app_name} (status={})",
                    row.unit, row.status
                )));
            }
        }
    }
    info!(app = app_name, "main pods are in Exited state");
    Ok(())
}

fn is_exited(status: &str) -> bool {
    status == EXITED_STATUS || status.starts_with("Exited ")
}

/// After `application delete`, the listing must be empty apart from header,
/// separator, and the "No Pods found" marker.
pub fn validate_no_pods_after_delete(ps_output: &str) -> Result<()> {
    for line in ps_output.lines() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with("APPLICATION")
            || is_separator(line)
            || line.starts_with(NO_PODS_MARKER)
        {
            continue;
        }
        return Err(HarnessError::validation(format!(
            "pods still exist after delete: {line:?}"
        )));
    }
    info!("no pods present after delete");
    Ok(())
}

static HOST_IP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})").expect("host ip regex")
});

/// First `http(s)://a.b.c.d` host in the output, validated as an IPv4 address.
pub fn extract_host_ip(output: &str) -> Result<Ipv4Addr> {
    let caps = HOST_IP_RE.captures(output).ok_or_else(|| {
        HarnessError::validation("unable to determine application host IP from CLI output")
    })?;
    let ip = &caps[1];
    ip.parse::<Ipv4Addr>().map_err(|_| {
        HarnessError::validation(format!(
            "invalid IP address extracted from CLI output: {ip}"
        ))
    })
}
