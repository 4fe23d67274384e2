mod cli;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ai_services_e2e::bootstrap::podman::podman_path;
use ai_services_e2e::bootstrap::{check_podman, HarnessContext};
use ai_services_e2e::cleanup::{cleanup_temp, collect_artifacts};
use ai_services_e2e::config::ENV_BIN;
use ai_services_e2e::errors::exit_code_for_harness_error;
use ai_services_e2e::podman::verify_containers;
use ai_services_e2e::retry::{wait_for_endpoint_ok, ReqwestProbe, RetryPolicy, SystemClock};
use ai_services_e2e::suite::{lifecycle_suite, LifecycleEnv, LifecycleOptions};
use ai_services_e2e::{
    logging, parse_output, AiServicesCli, BinaryResolver, Config, ContainerInspector, Deadline,
    ExecService, HarnessError, Resolution, SourceBuilder, VerifyOutcome,
};

use crate::cli::{Cli, Command};

const QUERY_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const POLL_DELAY: Duration = Duration::from_secs(2);

fn poll_policy(config: &Config) -> RetryPolicy {
    RetryPolicy::new(config.retries, POLL_DELAY)
}

fn resolve_binary(config: &Config, scratch: PathBuf) -> Result<Resolution> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let resolver = BinaryResolver::new(
        config.ai_services_bin.clone(),
        Some(scratch),
        ExecService::default(),
        SourceBuilder::new(cwd, ExecService::default()),
    );
    let found = resolver.resolve().context("failed to resolve ai-services")?;
    info!(path = %found.path.display(), provenance = %found.provenance, version = %found.version, "using ai-services");
    Ok(found.clone())
}

/// Shared scratch dir for commands that run outside a suite.
fn standalone_scratch(config: &Config) -> PathBuf {
    config.temp_root.join("bin")
}

fn driver(config: &Config) -> Result<AiServicesCli<ExecService>> {
    let found = resolve_binary(config, standalone_scratch(config))?;
    Ok(AiServicesCli::new(found.path, ExecService::default()))
}

fn inspector() -> Result<ContainerInspector<ExecService>> {
    Ok(ContainerInspector::new(podman_path()?, ExecService::default()))
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(p) => fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display())),
        None => {
            let mut s = String::new();
            io::stdin()
                .read_to_string(&mut s)
                .context("failed to read stdin")?;
            Ok(s)
        }
    }
}

fn run_doctor(config: &Config) {
    eprintln!("ai-services-e2e doctor");
    eprintln!();
    eprintln!("  version:   {}", cli::LONG_VERSION);
    eprintln!("  host:      {} / {}", std::env::consts::OS, std::env::consts::ARCH);
    eprintln!("  health:    {}", config.health_url());
    eprintln!("  temp root: {}", config.temp_root.display());
    eprintln!(
        "  {}: {}",
        ENV_BIN,
        config
            .ai_services_bin
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(unset)".to_string())
    );
    eprintln!("  expected pods: {}", config.expected_pod_suffixes.join(", "));
    eprintln!();

    match check_podman(&ExecService::default()) {
        Ok(st) => {
            eprintln!("  podman:    {}", st.path.display());
            eprintln!("  podman --version: {}", st.version);
            let rootless = match st.rootless {
                Some(true) => "yes",
                Some(false) => "no",
                None => "unknown",
            };
            eprintln!("  rootless:  {rootless}");
        }
        Err(e) => eprintln!("  podman:    not available ({e})"),
    }

    match resolve_binary(config, standalone_scratch(config)) {
        Ok(found) => {
            eprintln!("  ai-services: {} ({})", found.path.display(), found.provenance);
            eprintln!("  ai-services version: {}", found.version);
        }
        Err(e) => eprintln!("  ai-services: unavailable ({e:#})"),
    }
    eprintln!();
    eprintln!("doctor: completed diagnostics.");
}

struct RunArgs {
    app: Option<String>,
    verify_containers: bool,
    keep_temp: bool,
    artifacts: Option<PathBuf>,
    json: bool,
}

fn run_suite(config: Config, args: RunArgs) -> Result<bool> {
    let ctx = HarnessContext::setup(config).context("failed to prepare runtime environment")?;
    info!(run_id = %ctx.run_id, dir = %ctx.temp_dir.display(), "run started");

    let outcome = run_suite_in(&ctx, &args);

    if let Some(dir) = &args.artifacts {
        if let Err(e) = collect_artifacts(&ctx.temp_dir, dir) {
            warn!(error = %e, "artifact collection failed");
        }
    }
    if args.keep_temp {
        info!(dir = %ctx.temp_dir.display(), "keeping temp directory");
    } else if let Err(e) = cleanup_temp(&ctx.temp_dir) {
        warn!(error = %e, "cleanup failed");
    }
    outcome
}

fn run_suite_in(ctx: &HarnessContext, args: &RunArgs) -> Result<bool> {
    let found = resolve_binary(&ctx.config, ctx.bin_dir.clone())?;
    let cli = AiServicesCli::new(found.path, ExecService::default()).with_home(&ctx.temp_dir);

    // Podman may only be installed by `bootstrap configure`; not having it yet is fine.
    let (podman_ready, inspector) = match check_podman(&ExecService::default()) {
        Ok(status) => (true, status.inspector(ExecService::default())),
        Err(e) => {
            warn!(error = %e, "podman not available");
            (false, ContainerInspector::new("podman", ExecService::default()))
        }
    };
    let probe = ReqwestProbe::new()?;

    let mut options = LifecycleOptions::for_run(&ctx.run_id);
    if let Some(app) = &args.app {
        options.app_name = app.clone();
    }
    options.podman_ready = podman_ready;
    options.verify_containers = args.verify_containers;
    options.expected_pod_suffixes = ctx.config.expected_pod_suffixes.clone();

    let env = LifecycleEnv {
        cli: &cli,
        inspector: &inspector,
        probe: &probe,
        clock: &SystemClock,
        options,
    };
    let report = lifecycle_suite(&env).run();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.write_summary(&mut io::stdout().lock())?;
    }
    Ok(report.success())
}

fn dispatch(cli: Cli, config: Config) -> Result<bool> {
    match cli.command {
        Command::Resolve { json } => {
            let found = resolve_binary(&config, standalone_scratch(&config))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                println!("{}", found.path.display());
                println!("provenance: {}", found.provenance);
                println!("version: {}", found.version);
            }
        }
        Command::ParsePs { file } => {
            let text = read_input(file.as_deref())?;
            let rows = parse_output(&text)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Ps { app } => {
            let out = driver(&config)?
                .application_ps(app.as_deref(), Deadline::after(QUERY_TIMEOUT))?;
            print!("{out}");
        }
        Command::Restarts { pod } => {
            let n = inspector()?.restart_count(&pod, Deadline::after(QUERY_TIMEOUT))?;
            println!("{n}");
        }
        Command::Verify { app } => {
            let outcome = verify_containers(
                &driver(&config)?,
                &inspector()?,
                &app,
                &config.expected_pod_suffixes,
                Deadline::after(QUERY_TIMEOUT),
            )?;
            match outcome {
                VerifyOutcome::Verified { pods } => println!("verified {pods} pods for {app}"),
                VerifyOutcome::Skipped(reason) => println!("skipped: {reason}"),
            }
        }
        Command::Health => {
            let url = config.health_url();
            wait_for_endpoint_ok(
                &ReqwestProbe::new()?,
                &url,
                poll_policy(&config),
                config.timeout,
                Deadline::after(QUERY_TIMEOUT),
                &SystemClock,
            )?;
            println!("{url}: ok");
        }
        Command::WaitReady { container } => {
            inspector()?.wait_for_log_readiness(
                &container,
                &config.log_probe_words,
                poll_policy(&config),
                &SystemClock,
                Deadline::after(QUERY_TIMEOUT),
            )?;
            println!("{container}: ready");
        }
        Command::Doctor => run_doctor(&config),
        Command::Run {
            app,
            verify_containers,
            keep_temp,
            artifacts,
            json,
        } => {
            return run_suite(
                config,
                RunArgs {
                    app,
                    verify_containers,
                    keep_temp,
                    artifacts,
                    json,
                },
            )
        }
    }
    Ok(true)
}

fn exit_code_for(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|c| c.downcast_ref::<HarnessError>())
        .map(exit_code_for_harness_error)
        .or_else(|| {
            e.chain()
                .find_map(|c| c.downcast_ref::<io::Error>())
                .map(ai_services_e2e::errors::exit_code_for_io_error)
        })
        .unwrap_or(1)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);
    let config = Config::load_from_env();

    match dispatch(cli, config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("ai-services-e2e: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
