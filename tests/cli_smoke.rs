use std::fs;
use std::process::Command;

const PS_SAMPLE: &str = "APPLICATION NAME  POD NAME  STATUS\n\
                         ────────────────\n\
                         rag-app-1 rag-app-1--backend  Running (healthy)\n\
                                   rag-app-1--db  Created\n";

#[test]
fn test_parse_ps_prints_rows_as_json() {
    let td = tempfile::tempdir().expect("tempdir");
    let file = td.path().join("ps.txt");
    fs::write(&file, PS_SAMPLE).expect("write sample");

    let out = Command::new(env!("CARGO_BIN_EXE_ai-services-e2e"))
        .arg("parse-ps")
        .arg("--file")
        .arg(&file)
        .output()
        .expect("run ai-services-e2e parse-ps");
    assert!(
        out.status.success(),
        "parse-ps failed: {:?}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stderr)
    );
    let rows: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json stdout");
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["app"], "rag-app-1");
    assert_eq!(rows[0]["unit"], "rag-app-1--backend");
    assert_eq!(rows[0]["status"], "Running (healthy)");
    assert!(rows[1]["app"].is_null());
    assert_eq!(rows[1]["status"], "Created");
}

#[test]
fn test_parse_ps_rejects_malformed_input() {
    let td = tempfile::tempdir().expect("tempdir");
    let file = td.path().join("ps.txt");
    fs::write(&file, "APPLICATION NAME  POD NAME  STATUS\nlonely\n").expect("write sample");

    let out = Command::new(env!("CARGO_BIN_EXE_ai-services-e2e"))
        .args(["parse-ps", "--file"])
        .arg(&file)
        .output()
        .expect("run ai-services-e2e parse-ps");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unparseable row: \"lonely\""), "{stderr}");
}

#[test]
fn test_missing_input_file_fails() {
    let out = Command::new(env!("CARGO_BIN_EXE_ai-services-e2e"))
        .args(["parse-ps", "--file", "/definitely/not/here.txt"])
        .output()
        .expect("run ai-services-e2e parse-ps");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("failed to read /definitely/not/here.txt"), "{stderr}");
}
