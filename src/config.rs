//! Harness configuration read once from the environment.
//!
//! Precedence: process environment, then a `.env` file (path from `AI_E2E_ENV_FILE`,
//! else `./.env` when present), then built-in defaults. The process environment is
//! never modified.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::util::split_list;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";
pub const DEFAULT_HEALTH_PATH: &str = "/health";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_RETRIES: u32 = 5;
pub const DEFAULT_TEMP_ROOT: &str = "/tmp/ais-e2e";
pub const DEFAULT_PROBE_WORDS: [&str; 4] = ["ready", "healthy", "started", "serving"];
pub const DEFAULT_POD_SUFFIXES: [&str; 3] = ["vllm-server", "milvus", "chat-bot"];

pub const ENV_BIN: &str = "AI_SERVICES_BIN";
pub const ENV_HOME: &str = "AI_SERVICES_HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub service_url: String,
    pub health_path: String,
    pub timeout: Duration,
    pub retries: u32,
    /// Override for the binary under test; None means resolve or build it.
    pub ai_services_bin: Option<PathBuf>,
    /// Case-insensitive keywords that mark a process as ready in its logs.
    pub log_probe_words: Vec<String>,
    /// Pod name suffixes expected for every application (`<app>--<suffix>`).
    pub expected_pod_suffixes: Vec<String>,
    pub temp_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            ai_services_bin: None,
            log_probe_words: DEFAULT_PROBE_WORDS.iter().map(|s| s.to_string()).collect(),
            expected_pod_suffixes: DEFAULT_POD_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            temp_root: PathBuf::from(DEFAULT_TEMP_ROOT),
        }
    }
}

impl Config {
    /// Load from the process environment layered over an optional `.env` file.
    pub fn load_from_env() -> Self {
        let file_vars = read_env_file();
        Self::from_lookup(|key| {
            env::var(key)
                .ok()
                .or_else(|| file_vars.get(key).cloned())
        })
    }

    /// Build a config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut cfg = Config::default();
        if let Some(v) = get("AI_SERVICE_URL") {
            cfg.service_url = v;
        }
        if let Some(v) = get("AI_HEALTH_PATH") {
            cfg.health_path = v;
        }
        if let Some(v) = get("AI_TIMEOUT_SECONDS") {
            match v.parse::<u64>() {
                Ok(n) => cfg.timeout = Duration::from_secs(n),
                Err(_) => warn!(value = %v, "ignoring invalid AI_TIMEOUT_SECONDS"),
            }
        }
        if let Some(v) = get("AI_RETRIES") {
            match v.parse::<u32>() {
                Ok(n) => cfg.retries = n,
                Err(_) => warn!(value = %v, "ignoring invalid AI_RETRIES"),
            }
        }
        cfg.ai_services_bin = get(ENV_BIN).map(PathBuf::from);
        if let Some(v) = get("AI_LOG_PROBE_WORDS") {
            let words = split_list(&v);
            if !words.is_empty() {
                cfg.log_probe_words = words;
            }
        }
        if let Some(v) = get("AI_EXPECTED_POD_SUFFIXES") {
            cfg.expected_pod_suffixes = split_list(&v);
        }
        if let Some(v) = get("AI_E2E_TEMP_ROOT") {
            cfg.temp_root = PathBuf::from(v);
        }
        cfg
    }

    /// Full health endpoint URL: service URL and health path joined by exactly one '/'.
    pub fn health_url(&self) -> String {
        let base = self.service_url.trim_end_matches('/');
        let path = self.health_path.trim_start_matches('/');
        if path.is_empty() {
            return base.to_string();
        }
        match url::Url::parse(&format!("{base}/")).and_then(|u| u.join(path)) {
            Ok(u) => u.to_string(),
            Err(_) => format!("{base}/{path}"),
        }
    }
}

fn read_env_file() -> HashMap<String, String> {
    let path = env::var("AI_E2E_ENV_FILE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".env"));
    if !path.is_file() {
        return HashMap::new();
    }
    let iter = match dotenvy::from_path_iter(&path) {
        Ok(iter) => iter,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read env file");
            return HashMap::new();
        }
    };
    let mut vars = HashMap::new();
    for item in iter {
        match item {
            Ok((k, v)) => {
                vars.insert(k, v);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed env line"),
        }
    }
    debug!(path = %path.display(), count = vars.len(), "loaded env file");
    vars
}
