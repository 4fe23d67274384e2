//! Ordered end-to-end scenario runner.
//!
//! A suite is a list of groups; each group is a list of named steps with an
//! optional per-step timeout. In an ordered group the first failure skips every
//! later step of that group, naming the failed precondition. Other groups keep
//! going.

use std::fmt;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::ai_services::output::{
    validate_application_ps, validate_bootstrap_configure_output,
    validate_bootstrap_full_output, validate_bootstrap_validate_output,
    validate_help_command_output, validate_help_topic_output,
};
use crate::ai_services::{AiServicesCli, CreateOptions, HelpTopic, RagApp, RagPolling};
use crate::errors::Result;
use crate::podman::{verify_containers, ContainerInspector, VerifyOutcome};
use crate::retry::{Clock, HttpProbe};
use crate::util::id::random_index;
use crate::util::{CommandRunner, Deadline};

/// How a step that returned normally finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Done,
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "lowercase")]
pub enum StepOutcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Passed => f.write_str("PASS"),
            StepOutcome::Failed(_) => f.write_str("FAIL"),
            StepOutcome::Skipped(_) => f.write_str("SKIP"),
        }
    }
}

type StepFn<'a> = Box<dyn Fn(Deadline) -> Result<Completion> + 'a>;

pub struct Step<'a> {
    name: String,
    timeout: Option<Duration>,
    run: StepFn<'a>,
}

impl<'a> Step<'a> {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(Deadline) -> Result<Completion> + 'a,
    {
        Self {
            name: name.into(),
            timeout: None,
            run: Box::new(run),
        }
    }

    pub fn timeout(mut self, t: Duration) -> Self {
        self.timeout = Some(t);
        self
    }
}

impl fmt::Debug for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Group<'a> {
    name: String,
    ordered: bool,
    skip: Option<String>,
    steps: Vec<Step<'a>>,
}

impl<'a> Group<'a> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordered: false,
            skip: None,
            steps: Vec::new(),
        }
    }

    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    /// Report every step of the group as skipped with `reason`.
    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    pub fn step(mut self, step: Step<'a>) -> Self {
        self.steps.push(step);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub group: String,
    pub step: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub steps: Vec<StepReport>,
}

impl SuiteReport {
    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.outcome)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped(_)))
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome_of(&self, step: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.outcome)
    }

    /// Human readable summary, one line per step.
    pub fn write_summary<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "ai-services e2e summary")?;
        writeln!(w)?;
        for s in &self.steps {
            write!(w, "  [{}] {} / {}", s.outcome, s.group, s.step)?;
            match &s.outcome {
                StepOutcome::Passed => writeln!(w, " ({} ms)", s.duration_ms)?,
                StepOutcome::Failed(msg) | StepOutcome::Skipped(msg) => {
                    let first = msg.lines().next().unwrap_or_default();
                    writeln!(w, ": {first}")?
                }
            }
        }
        writeln!(w)?;
        writeln!(
            w,
            "  passed: {}  failed: {}  skipped: {}",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

#[derive(Debug, Default)]
pub struct Suite<'a> {
    groups: Vec<Group<'a>>,
}

impl<'a> Suite<'a> {
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    pub fn group(mut self, group: Group<'a>) -> Self {
        self.groups.push(group);
        self
    }

    pub fn run(&self) -> SuiteReport {
        let mut report = SuiteReport::default();
        for group in &self.groups {
            info!(group = %group.name, "running group");
            let mut failed_precondition: Option<&str> = None;
            for step in &group.steps {
                let started = Instant::now();
                let outcome = if let Some(reason) = &group.skip {
                    StepOutcome::Skipped(reason.clone())
                } else if let Some(pre) = failed_precondition {
                    StepOutcome::Skipped(format!("precondition failed: {pre}"))
                } else {
                    let deadline = step.timeout.map(Deadline::after).unwrap_or_default();
                    match (step.run)(deadline) {
                        Ok(Completion::Done) => StepOutcome::Passed,
                        Ok(Completion::Skipped(reason)) => StepOutcome::Skipped(reason),
                        Err(e) => {
                            error!(group = %group.name, step = %step.name, error = %e, "step failed");
                            if group.ordered {
                                failed_precondition = Some(step.name.as_str());
                            }
                            StepOutcome::Failed(e.to_string())
                        }
                    }
                };
                match &outcome {
                    StepOutcome::Passed => info!(step = %step.name, "passed"),
                    StepOutcome::Skipped(reason) => warn!(step = %step.name, %reason, "skipped"),
                    StepOutcome::Failed(_) => {}
                }
                report.steps.push(StepReport {
                    group: group.name.clone(),
                    step: step.name.clone(),
                    outcome,
                    duration_ms: started.elapsed().as_millis(),
                });
            }
        }
        report
    }
}

pub const CREATE_TIMEOUT: Duration = Duration::from_secs(45 * 60);
pub const PS_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const STOP_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const DELETE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const HELP_TIMEOUT: Duration = Duration::from_secs(60);

pub const RAG_TEMPLATE: &str = "rag";
pub const RAG_BACKEND_PORT: u16 = 5100;
pub const RAG_UI_PORT: u16 = 3100;

/// Knobs for the standard lifecycle suite.
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    pub app_name: String,
    pub podman_ready: bool,
    pub verify_containers: bool,
    pub expected_pod_suffixes: Vec<String>,
    pub polling: RagPolling,
}

impl LifecycleOptions {
    pub fn for_run(run_id: &str) -> Self {
        Self {
            app_name: format!("rag-app-{run_id}"),
            podman_ready: false,
            verify_containers: false,
            expected_pod_suffixes: Vec::new(),
            polling: RagPolling::default(),
        }
    }
}

/// Everything the lifecycle steps talk to.
pub struct LifecycleEnv<'a, R, P> {
    pub cli: &'a AiServicesCli<R>,
    pub inspector: &'a ContainerInspector<P>,
    pub probe: &'a dyn HttpProbe,
    pub clock: &'a dyn Clock,
    pub options: LifecycleOptions,
}

/// Help, bootstrap, application lifecycle, RAG validation and container checks.
pub fn lifecycle_suite<'a, R, P>(env: &'a LifecycleEnv<'a, R, P>) -> Suite<'a>
where
    R: CommandRunner + 'a,
    P: CommandRunner + 'a,
{
    let cli = env.cli;
    let app = env.options.app_name.as_str();
    let topic = HelpTopic::ALL[random_index(HelpTopic::ALL.len())];

    let help = Group::new("help")
        .step(
            Step::new("help", move |d| {
                validate_help_command_output(&cli.help(&["help"], d)?)?;
                Ok(Completion::Done)
            })
            .timeout(HELP_TIMEOUT),
        )
        .step(
            Step::new("-h", move |d| {
                validate_help_command_output(&cli.help(&["-h"], d)?)?;
                Ok(Completion::Done)
            })
            .timeout(HELP_TIMEOUT),
        )
        .step(
            Step::new(format!("{topic} -h"), move |d| {
                validate_help_topic_output(topic, &cli.help(&[topic.command(), "-h"], d)?)?;
                Ok(Completion::Done)
            })
            .timeout(HELP_TIMEOUT),
        );

    let bootstrap = Group::new("bootstrap")
        .step(
            Step::new("bootstrap configure", move |d| {
                validate_bootstrap_configure_output(&cli.bootstrap_configure(d)?)?;
                Ok(Completion::Done)
            })
            .timeout(BOOTSTRAP_TIMEOUT),
        )
        .step(
            Step::new("bootstrap validate", move |d| {
                validate_bootstrap_validate_output(&cli.bootstrap_validate(d)?)?;
                Ok(Completion::Done)
            })
            .timeout(BOOTSTRAP_TIMEOUT),
        )
        .step(
            Step::new("full bootstrap", move |d| {
                validate_bootstrap_full_output(&cli.bootstrap(d)?)?;
                Ok(Completion::Done)
            })
            .timeout(BOOTSTRAP_TIMEOUT),
        );

    let lifecycle = Group::new("application lifecycle")
        .ordered()
        .step(
            Step::new("create rag application", move |d| {
                let rag = RagApp {
                    name: app,
                    template: RAG_TEMPLATE,
                    params: "ui.port=3100,backend.port=5100",
                    backend_port: RAG_BACKEND_PORT,
                    ui_port: RAG_UI_PORT,
                    options: CreateOptions {
                        image_pull_policy: Some("IfNotPresent".to_string()),
                        ..CreateOptions::default()
                    },
                };
                cli.create_rag_app_and_validate(&rag, env.options.polling, env.probe, env.clock, d)?;
                Ok(Completion::Done)
            })
            .timeout(CREATE_TIMEOUT),
        )
        .step(
            Step::new("application ps", move |d| {
                validate_application_ps(&cli.application_ps(Some(app), d)?)?;
                Ok(Completion::Done)
            })
            .timeout(PS_TIMEOUT),
        )
        .step(
            Step::new("stop application", move |d| {
                cli.stop_app(app, d)?;
                Ok(Completion::Done)
            })
            .timeout(STOP_TIMEOUT),
        )
        .step(
            Step::new("delete application", move |d| {
                cli.delete_app(app, d)?;
                Ok(Completion::Done)
            })
            .timeout(DELETE_TIMEOUT),
        );

    let rag = Group::new("rag validation")
        .skip("RAG response validation against a golden dataset is not implemented")
        .step(Step::new("golden dataset", |_| Ok(Completion::Done)));

    let mut containers = Group::new("container verification").step(
        Step::new("containers healthy", move |d| {
            match verify_containers(cli, env.inspector, app, &env.options.expected_pod_suffixes, d)? {
                VerifyOutcome::Verified { .. } => Ok(Completion::Done),
                VerifyOutcome::Skipped(reason) => Ok(Completion::Skipped(reason)),
            }
        })
        .timeout(PS_TIMEOUT),
    );
    if !env.options.verify_containers {
        containers = containers.skip("container verification not requested");
    } else if !env.options.podman_ready {
        containers = containers.skip("podman not available");
    }

    Suite::new()
        .group(help)
        .group(bootstrap)
        .group(lifecycle)
        .group(rag)
        .group(containers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HarnessError;
    use std::cell::Cell;

    #[test]
    fn ordered_group_skips_after_failure_and_others_continue() {
        let ran_after = Cell::new(false);
        let suite = Suite::new()
            .group(
                Group::new("lifecycle")
                    .ordered()
                    .step(Step::new("create", |_| Err(HarnessError::validation("boom"))))
                    .step(Step::new("ps", |_| {
                        ran_after.set(true);
                        Ok(Completion::Done)
                    })),
            )
            .group(Group::new("other").step(Step::new("still runs", |_| Ok(Completion::Done))));
        let report = suite.run();

        assert!(!ran_after.get());
        assert_eq!(report.outcome_of("create"), Some(&StepOutcome::Failed("boom".to_string())));
        assert_eq!(
            report.outcome_of("ps"),
            Some(&StepOutcome::Skipped("precondition failed: create".to_string()))
        );
        assert_eq!(report.outcome_of("still runs"), Some(&StepOutcome::Passed));
        assert!(!report.success());
    }

    #[test]
    fn unordered_group_keeps_going() {
        let suite = Suite::new().group(
            Group::new("help")
                .step(Step::new("a", |_| Err(HarnessError::validation("x"))))
                .step(Step::new("b", |_| Ok(Completion::Done))),
        );
        let report = suite.run();
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn skipped_group_never_runs_steps() {
        let suite = Suite::new().group(
            Group::new("rag")
                .skip("not implemented")
                .step(Step::new("golden", |_| panic!("must not run"))),
        );
        let report = suite.run();
        assert_eq!(report.skipped(), 1);
        assert!(report.success());

        let mut buf = Vec::new();
        report.write_summary(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("[SKIP] rag / golden: not implemented"), "{text}");
    }
}
