use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::ai_services::AiServicesCli;
use crate::errors::{HarnessError, Result};
use crate::table::parse_output;
use crate::util::{CommandRunner, Deadline, ExecRequest};

/// Subset of `podman pod inspect` output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PodInspect {
    #[serde(rename = "RestartPolicy")]
    pub restart_policy: String,
    #[serde(rename = "Containers")]
    pub containers: Vec<PodMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PodMember {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Subset of `podman inspect <container>` output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerInspect {
    #[serde(rename = "State")]
    pub state: ContainerState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerState {
    #[serde(rename = "RestartCount")]
    pub restart_count: i64,
}

/// Policy value meaning the runtime never restarts members.
pub const RESTART_POLICY_NO: &str = "no";

fn parse_json<T: DeserializeOwned>(what: &str, input: &str) -> Result<T> {
    serde_json::from_str(input).map_err(|source| HarnessError::Json {
        what: what.to_string(),
        input: input.to_string(),
        source,
    })
}

/// Queries pods and containers through a podman executable.
#[derive(Debug)]
pub struct ContainerInspector<R> {
    podman: PathBuf,
    runner: R,
}

impl<R: CommandRunner> ContainerInspector<R> {
    pub fn new(podman: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            podman: podman.into(),
            runner,
        }
    }

    pub(crate) fn podman(&self, what: &str, args: Vec<OsString>, deadline: Deadline) -> Result<String> {
        let req = ExecRequest::new(self.podman.as_os_str())
            .args(args)
            .deadline(deadline);
        self.runner.run(req)?.into_success(what)
    }

    pub fn inspect_pod(&self, pod: &str, deadline: Deadline) -> Result<PodInspect> {
        let out = self.podman(
            &format!("podman pod inspect {pod}"),
            vec!["pod".into(), "inspect".into(), pod.into()],
            deadline,
        )?;
        let mut pods: Vec<PodInspect> = parse_json(&format!("pod inspect for {pod}"), &out)?;
        if pods.is_empty() {
            return Err(HarnessError::validation(format!(
                "no pod inspect data for {pod}"
            )));
        }
        Ok(pods.swap_remove(0))
    }

    /// Total restarts across a pod's members.
    ///
    /// A pod whose restart policy is `no` reports 0 without inspecting members.
    pub fn restart_count(&self, pod: &str, deadline: Deadline) -> Result<i64> {
        let data = self.inspect_pod(pod, deadline)?;
        if data.restart_policy == RESTART_POLICY_NO {
            return Ok(0);
        }
        if data.containers.is_empty() {
            return Ok(0);
        }

        let mut args: Vec<OsString> = vec!["inspect".into()];
        args.extend(data.containers.iter().map(|c| OsString::from(&c.id)));
        let out = self.podman(&format!("podman inspect (pod {pod})"), args, deadline)?;
        let members: Vec<ContainerInspect> = parse_json("container inspect", &out)?;
        Ok(members.iter().map(|c| c.state.restart_count).sum())
    }
}

/// Result of a container health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified { pods: usize },
    Skipped(String),
}

/// Check that every pod of `app` is healthy, that each `<app>--<suffix>` pod exists,
/// and that none of them has restarted.
pub fn verify_containers<A, P>(
    cli: &AiServicesCli<A>,
    inspector: &ContainerInspector<P>,
    app: &str,
    expected_suffixes: &[String],
    deadline: Deadline,
) -> Result<VerifyOutcome>
where
    A: CommandRunner,
    P: CommandRunner,
{
    info!(app, "verifying containers");
    let ps = cli.application_ps(Some(app), deadline)?;
    if ps.trim().is_empty() {
        return Ok(VerifyOutcome::Skipped(
            "no pods found; skipping pod health validation".to_string(),
        ));
    }

    let rows = parse_output(ps.trim())?;
    if let Some(bad) = rows.iter().find(|r| !r.is_healthy_or_created()) {
        return Err(HarnessError::validation(format!(
            "pod {} is not healthy (status={})",
            bad.unit, bad.status
        )));
    }

    let present: HashSet<&str> = rows.iter().map(|r| r.unit.as_str()).collect();
    for suffix in expected_suffixes {
        let pod = format!("{app}--{suffix}");
        if !present.contains(pod.as_str()) {
            return Err(HarnessError::validation(format!(
                "expected pod {pod} to exist"
            )));
        }
        let restarts = inspector.restart_count(&pod, deadline)?;
        info!(pod = %pod, restarts, "restart count");
        if restarts > 0 {
            return Err(HarnessError::validation(format!(
                "pod {pod} restarted {restarts} times"
            )));
        }
    }
    Ok(VerifyOutcome::Verified { pods: rows.len() })
}
