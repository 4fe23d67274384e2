use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::ai_services::output::{
    extract_host_ip, validate_create_app_output, validate_delete_app_output,
    validate_no_pods_after_delete, validate_pods_exited_after_stop, validate_stop_app_output,
};
use crate::config::ENV_HOME;
use crate::errors::Result;
use crate::retry::{wait_for_endpoint_ok, Clock, HttpProbe, RetryPolicy};
use crate::util::{CommandRunner, Deadline, ExecRequest};

/// Flags for `application create`.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub skip_image_download: bool,
    pub skip_model_download: bool,
    pub skip_validation: Option<String>,
    pub verbose: bool,
    pub image_pull_policy: Option<String>,
}

/// Endpoints polled on the RAG backend after creation.
pub const RAG_BACKEND_ENDPOINTS: &[&str] = &["/health", "/v1/models", "/db-status"];

/// Readiness polling for a freshly created RAG application.
#[derive(Debug, Clone, Copy)]
pub struct RagPolling {
    pub policy: RetryPolicy,
    pub request_timeout: Duration,
}

impl Default for RagPolling {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::new(10, Duration::from_secs(15)),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Parameters of a RAG application deployment.
#[derive(Debug, Clone)]
pub struct RagApp<'a> {
    pub name: &'a str,
    pub template: &'a str,
    pub params: &'a str,
    pub backend_port: u16,
    pub ui_port: u16,
    pub options: CreateOptions,
}

/// URLs reported once a RAG application is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagEndpoints {
    pub backend_url: String,
    pub ui_url: String,
}

/// Typed driver for the `ai-services` binary under test.
///
/// `AI_SERVICES_HOME` is passed to each invocation instead of being set on
/// this process.
#[derive(Debug)]
pub struct AiServicesCli<R> {
    bin: PathBuf,
    home: Option<PathBuf>,
    runner: R,
}

impl<R: CommandRunner> AiServicesCli<R> {
    pub fn new(bin: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            bin: bin.into(),
            home: None,
            runner,
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn request<I, S>(&self, args: I, deadline: Deadline) -> ExecRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString>,
    {
        let mut req = ExecRequest::new(self.bin.as_os_str())
            .args(args)
            .deadline(deadline);
        if let Some(home) = &self.home {
            req = req.env(ENV_HOME, home.as_os_str());
        }
        req
    }

    /// Run `ai-services <args>`; non-zero exit fails with the captured output.
    pub fn run(&self, what: &str, args: &[String], deadline: Deadline) -> Result<String> {
        let req = self.request(args.iter().map(String::as_str), deadline);
        info!(command = %req.describe(), "running");
        self.runner.run(req)?.into_success(what)
    }

    pub fn help(&self, args: &[&str], deadline: Deadline) -> Result<String> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.run("help command", &args, deadline)
    }

    pub fn bootstrap(&self, deadline: Deadline) -> Result<String> {
        self.run("bootstrap", &["bootstrap".to_string()], deadline)
    }

    pub fn bootstrap_configure(&self, deadline: Deadline) -> Result<String> {
        self.run(
            "bootstrap configure",
            &["bootstrap".to_string(), "configure".to_string()],
            deadline,
        )
    }

    pub fn bootstrap_validate(&self, deadline: Deadline) -> Result<String> {
        self.run(
            "bootstrap validate",
            &["bootstrap".to_string(), "validate".to_string()],
            deadline,
        )
    }

    pub fn create_app(
        &self,
        app_name: &str,
        template: &str,
        params: &str,
        opts: &CreateOptions,
        deadline: Deadline,
    ) -> Result<String> {
        self.run("application create", &create_args(app_name, template, params, opts), deadline)
    }

    /// Create a RAG application, check the create output, then poll the backend
    /// endpoints on the host IP the CLI reported.
    pub fn create_rag_app_and_validate(
        &self,
        app: &RagApp<'_>,
        polling: RagPolling,
        probe: &dyn HttpProbe,
        clock: &dyn Clock,
        deadline: Deadline,
    ) -> Result<RagEndpoints> {
        let output = self.create_app(app.name, app.template, app.params, &app.options, deadline)?;
        validate_create_app_output(&output, app.name)?;
        let host_ip = extract_host_ip(&output)?;

        let backend_url = format!("http://{host_ip}:{}", app.backend_port);
        for ep in RAG_BACKEND_ENDPOINTS {
            let full = format!("{backend_url}{ep}");
            wait_for_endpoint_ok(
                probe,
                &full,
                polling.policy,
                polling.request_timeout,
                deadline,
                clock,
            )?;
        }
        let ui_url = format!("http://{host_ip}:{}", app.ui_port);
        info!(url = %ui_url, "chatbot UI available");
        Ok(RagEndpoints {
            backend_url,
            ui_url,
        })
    }

    pub fn application_ps(&self, app_name: Option<&str>, deadline: Deadline) -> Result<String> {
        let mut args = vec!["application".to_string(), "ps".to_string()];
        if let Some(name) = app_name.filter(|n| !n.is_empty()) {
            args.push(name.to_string());
        }
        self.run("application ps", &args, deadline)
    }

    /// Stop the application, then confirm every main pod has exited.
    pub fn stop_app(&self, app_name: &str, deadline: Deadline) -> Result<String> {
        let args = lifecycle_args("stop", app_name);
        let output = self.run("application stop", &args, deadline)?;
        validate_stop_app_output(&output)?;
        let ps = self.application_ps(Some(app_name), deadline)?;
        validate_pods_exited_after_stop(&ps, app_name)?;
        Ok(output)
    }

    /// Delete the application, then confirm no pods are left.
    pub fn delete_app(&self, app_name: &str, deadline: Deadline) -> Result<String> {
        let args = lifecycle_args("delete", app_name);
        let output = self.run("application delete", &args, deadline)?;
        validate_delete_app_output(&output, app_name)?;
        let ps = self.application_ps(Some(app_name), deadline)?;
        validate_no_pods_after_delete(&ps)?;
        Ok(output)
    }
}

fn lifecycle_args(verb: &str, app_name: &str) -> Vec<String> {
    vec![
        "application".to_string(),
        verb.to_string(),
        app_name.to_string(),
        "--yes".to_string(),
    ]
}

/// Argument vector for `application create`.
pub fn create_args(app_name: &str, template: &str, params: &str, opts: &CreateOptions) -> Vec<String> {
    let mut args = vec![
        "application".to_string(),
        "create".to_string(),
        app_name.to_string(),
        "-t".to_string(),
        template.to_string(),
    ];
    if !params.is_empty() {
        args.push("--params".to_string());
        args.push(params.to_string());
    }
    if opts.skip_image_download {
        args.push("--skip-image-download".to_string());
    }
    if opts.skip_model_download {
        args.push("--skip-model-download".to_string());
    }
    if let Some(v) = opts.skip_validation.as_deref().filter(|v| !v.is_empty()) {
        args.push("--skip-validation".to_string());
        args.push(v.to_string());
    }
    if let Some(v) = opts.image_pull_policy.as_deref().filter(|v| !v.is_empty()) {
        args.push("--image-pull-policy".to_string());
        args.push(v.to_string());
    }
    if opts.verbose {
        args.push("--verbose".to_string());
    }
    args
}
