mod support;

use ai_services_e2e::bootstrap::podman::check_podman_at;
use ai_services_e2e::podman::verify_containers;
use ai_services_e2e::{AiServicesCli, ContainerInspector, Deadline, HarnessError, VerifyOutcome};
use support::FakeRunner;

fn suffixes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_no_restart_policy_reports_zero_without_member_inspection() {
    let runtime = FakeRunner::new();
    runtime
        .on(
            &["pod", "inspect", "rag-1--milvus"],
            0,
            r#"[{"RestartPolicy":"no","Containers":[{"Id":"c1","Name":"milvus"}]}]"#,
        )
        .on(&["inspect"], 0, r#"[{"State":{"RestartCount":7}}]"#);
    let inspector = ContainerInspector::new("podman", &runtime);

    let n = inspector
        .restart_count("rag-1--milvus", Deadline::none())
        .expect("restart count");
    assert_eq!(n, 0);
    assert_eq!(
        runtime.call_lines(),
        vec!["podman pod inspect rag-1--milvus".to_string()]
    );
}

#[test]
fn test_restarts_are_summed_over_members_in_one_call() {
    let runtime = FakeRunner::new();
    runtime
        .on(
            &["pod", "inspect"],
            0,
            r#"[{"RestartPolicy":"always","Containers":[{"Id":"c1"},{"Id":"c2"}],"Extra":{}}]"#,
        )
        .on(
            &["inspect"],
            0,
            r#"[{"State":{"RestartCount":2,"Status":"running"}},{"State":{"RestartCount":1}}]"#,
        );
    let inspector = ContainerInspector::new("podman", &runtime);

    assert_eq!(inspector.restart_count("p", Deadline::none()).unwrap(), 3);
    let calls = runtime.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].args, vec!["inspect", "c1", "c2"]);
}

#[test]
fn test_inspect_errors_are_hard_failures() {
    let runtime = FakeRunner::new();
    runtime
        .on(&["pod", "inspect", "bad-json"], 0, "Error: not json")
        .on(&["pod", "inspect", "empty"], 0, "[]")
        .on(&["pod", "inspect", "gone"], 125, "Error: no such pod gone");
    let inspector = ContainerInspector::new("podman", &runtime);

    match inspector.restart_count("bad-json", Deadline::none()).unwrap_err() {
        HarnessError::Json { input, .. } => assert_eq!(input, "Error: not json"),
        other => panic!("unexpected: {other}"),
    }
    let err = inspector.restart_count("empty", Deadline::none()).unwrap_err();
    assert!(err.to_string().contains("no pod inspect data for empty"), "{err}");
    match inspector.restart_count("gone", Deadline::none()).unwrap_err() {
        HarnessError::CommandFailed { code, output, .. } => {
            assert_eq!(code, Some(125));
            assert!(output.contains("no such pod"));
        }
        other => panic!("unexpected: {other}"),
    }
}

const HEALTHY_PS: &str = "APPLICATION NAME  POD NAME  STATUS\n\
                          ──────────────\n\
                          rag-1  rag-1--vllm-server  Running (healthy)\n\
                          rag-1  rag-1--chat-bot  Created\n";

#[test]
fn test_verify_containers_checks_health_presence_and_restarts() {
    let ais = FakeRunner::new();
    ais.on(&["application", "ps", "rag-1"], 0, HEALTHY_PS);
    let runtime = FakeRunner::new();
    runtime.always(&["pod", "inspect"], 0, r#"[{"RestartPolicy":"no"}]"#);

    let cli = AiServicesCli::new("/opt/ai-services", &ais);
    let inspector = ContainerInspector::new("podman", &runtime);
    let outcome = verify_containers(
        &cli,
        &inspector,
        "rag-1",
        &suffixes(&["vllm-server", "chat-bot"]),
        Deadline::none(),
    )
    .expect("verified");
    assert_eq!(outcome, VerifyOutcome::Verified { pods: 2 });
    assert_eq!(runtime.calls().len(), 2);
}

#[test]
fn test_verify_containers_failures() {
    let ais = FakeRunner::new();
    ais.on(&["application", "ps"], 0, "   \n")
        .on(
            &["application", "ps"],
            0,
            "rag-1  rag-1--vllm-server  Running (starting)\n",
        )
        .on(&["application", "ps"], 0, HEALTHY_PS)
        .on(&["application", "ps"], 0, HEALTHY_PS);
    let runtime = FakeRunner::new();
    runtime.always(
        &["pod", "inspect"],
        0,
        r#"[{"RestartPolicy":"on-failure","Containers":[{"Id":"x"}]}]"#,
    );
    runtime.always(&["inspect"], 0, r#"[{"State":{"RestartCount":4}}]"#);
    let cli = AiServicesCli::new("ai-services", &ais);
    let inspector = ContainerInspector::new("podman", &runtime);
    let verify = |list: &[&str]| {
        verify_containers(&cli, &inspector, "rag-1", &suffixes(list), Deadline::none())
    };

    assert!(matches!(
        verify(&["vllm-server"]).unwrap(),
        VerifyOutcome::Skipped(_)
    ));

    let err = verify(&["vllm-server"]).unwrap_err();
    assert!(err.to_string().contains("rag-1--vllm-server is not healthy"), "{err}");

    let err = verify(&["milvus"]).unwrap_err();
    assert!(err.to_string().contains("expected pod rag-1--milvus to exist"), "{err}");

    let err = verify(&["chat-bot"]).unwrap_err();
    assert!(err.to_string().contains("restarted 4 times"), "{err}");
}

#[test]
fn test_log_readiness_retries_until_keyword_appears() {
    use ai_services_e2e::retry::{FakeClock, RetryPolicy};
    use std::time::Duration;

    let runtime = FakeRunner::new();
    runtime
        .on(&["logs", "rag-1--vllm-server"], 0, "loading model shards\n")
        .on(&["logs", "rag-1--vllm-server"], 0, "loading model shards\n")
        .on(&["logs", "rag-1--vllm-server"], 0, "INFO: Application startup complete. Server READY\n");
    let inspector = ContainerInspector::new("podman", &runtime);
    let clock = FakeClock::new();
    let words = suffixes(&["ready", "serving"]);

    inspector
        .wait_for_log_readiness(
            "rag-1--vllm-server",
            &words,
            RetryPolicy::new(5, Duration::from_secs(3)),
            &clock,
            Deadline::none(),
        )
        .expect("ready");
    assert_eq!(runtime.calls().len(), 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(3); 2]);
}

#[test]
fn test_checked_podman_path_is_used_for_inspection() {
    let runtime = FakeRunner::new();
    runtime
        .on(&["--version"], 0, "podman version 5.2.2\n")
        .on(&["info"], 0, "true\n")
        .on(
            &["pod", "inspect", "rag-1--milvus"],
            0,
            r#"[{"RestartPolicy":"no","Containers":[]}]"#,
        );
    let status = check_podman_at(&runtime, "/opt/podman/bin/podman".into()).expect("podman ok");
    assert_eq!(status.version, "podman version 5.2.2");
    assert_eq!(status.rootless, Some(true));

    let inspector = status.inspector(&runtime);
    assert_eq!(inspector.restart_count("rag-1--milvus", Deadline::none()).unwrap(), 0);
    let programs: Vec<String> = runtime.calls().into_iter().map(|c| c.program).collect();
    assert_eq!(programs, vec!["/opt/podman/bin/podman"; 3]);
}
