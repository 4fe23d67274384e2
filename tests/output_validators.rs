use ai_services_e2e::ai_services::output::*;

#[test]
fn test_full_bootstrap_list_is_superset_of_each_step_list() {
    for (step, list) in [
        ("configure", BOOTSTRAP_CONFIGURE_REQUIRED),
        ("validate", BOOTSTRAP_VALIDATE_REQUIRED),
    ] {
        for item in list {
            assert!(
                BOOTSTRAP_FULL_REQUIRED.contains(item),
                "full bootstrap list missing {step} item {item:?}"
            );
        }
    }
}

#[test]
fn test_output_passing_full_bootstrap_passes_each_step() {
    let out = BOOTSTRAP_FULL_REQUIRED.join("\n");
    validate_bootstrap_full_output(&out).expect("full");
    validate_bootstrap_configure_output(&out).expect("configure");
    validate_bootstrap_validate_output(&out).expect("validate");

    let err = validate_bootstrap_full_output("LPAR configured successfully\nAll validations passed\n")
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("missing 'Bootstrap configuration completed successfully'"));
}

#[test]
fn test_stop_check_accepts_empty_listing() {
    validate_pods_exited_after_stop(
        "APPLICATION NAME  POD NAME  STATUS\n──────\nNo Pods found\n",
        "rag-1",
    )
    .expect("header, separator, marker");
}

#[test]
fn test_stop_check_ignores_stray_lines_but_not_main_pods() {
    let out = "\
time=\"2025-01-01\" level=warning msg=\"cgroupv2 manager\"
APPLICATION NAME  POD NAME           STATUS
rag-1             rag-1--vllm-server  Exited (0) 2 minutes ago
                  rag-1--milvus       Running (healthy)
";
    validate_pods_exited_after_stop(out, "rag-1").expect("main pods exited");

    let err = validate_pods_exited_after_stop("rag-1--chat-bot is still draining\n", "rag-1")
        .unwrap_err();
    assert!(err.to_string().contains("could not read status of main pod line"));
}

#[test]
fn test_no_pods_marker_after_delete_succeeds() {
    validate_no_pods_after_delete("No Pods found").expect("marker only");
    validate_no_pods_after_delete("").expect("empty");
    validate_no_pods_after_delete("APPLICATION NAME  POD NAME  STATUS\n──────\nNo Pods found\n")
        .expect("header, separator, marker");
}

#[test]
fn test_leftover_pod_after_delete_fails() {
    let err = validate_no_pods_after_delete(
        "APPLICATION NAME  POD NAME  STATUS\nrag-1  rag-1--milvus  Exited\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("rag-1--milvus"), "{err}");
}

#[test]
fn test_running_main_unit_after_stop_fails_naming_it() {
    let ps = "APPLICATION NAME  POD NAME  STATUS\n\
              ────────────────\n\
              rag-app-1  rag-app-1--vllm-server  Running\n\
              rag-app-1  rag-app-1--chat-bot  Exited\n";
    let err = validate_pods_exited_after_stop(ps, "rag-app-1").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("rag-app-1--vllm-server"), "{msg}");
    assert!(msg.contains("status=Running"), "{msg}");
}

#[test]
fn test_help_topics_validate_their_own_text() {
    for topic in HelpTopic::ALL {
        let text = topic.required().join("\n");
        validate_help_topic_output(topic, &text).expect("own text passes");
    }
    let err = validate_help_topic_output(HelpTopic::Version, "Usage: nothing").unwrap_err();
    assert!(
        err.to_string().starts_with("help version command validation failed: missing"),
        "{err}"
    );
}

#[test]
fn test_ps_format_names_missing_column() {
    let err = validate_application_ps("APPLICATION NAME  STATUS").unwrap_err();
    assert!(err.to_string().contains("'POD NAME'"), "{err}");
}

#[test]
fn test_stop_and_delete_outputs() {
    validate_stop_app_output("Proceeding to stop pods...\ndone").expect("stop");
    assert!(validate_stop_app_output("nothing happened").is_err());
    validate_delete_app_output(
        "Proceeding with deletion\nApplication data cleaned up successfully\n",
        "rag-1",
    )
    .expect("delete");
    let err = validate_delete_app_output("Proceeding with deletion\n", "rag-1").unwrap_err();
    assert!(
        err.to_string().contains("Application data cleaned up successfully"),
        "{err}"
    );
}
