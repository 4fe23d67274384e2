/*!
Test support helpers shared across integration tests.

- FakeRunner: scripted CommandRunner that records every request
- write_fake_binary(dir, name, body): drop an executable shell script
- which(bin): PATH lookup used to skip live tests

These helpers do not print skip messages themselves so tests can keep their
"skipping: ..." outputs verbatim.
*/

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ai_services_e2e::{CommandRunner, ExecOutput, ExecRequest, HarnessError, Result};

/// One recorded invocation: program plus arguments.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub home: Option<String>,
}

#[allow(dead_code)]
impl Call {
    pub fn line(&self) -> String {
        let mut words = vec![self.program.clone()];
        words.extend(self.args.iter().cloned());
        words.join(" ")
    }
}

/// Scripted runner: responses are matched by argument prefix, first match wins,
/// and each match is consumed unless registered with `always`.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<Call>>,
}

#[allow(dead_code)]
struct Rule {
    args_prefix: Vec<String>,
    responses: VecDeque<(i32, String)>,
    sticky: bool,
}

#[allow(dead_code)]
impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next call whose arguments start with `args_prefix`.
    pub fn on(&self, args_prefix: &[&str], code: i32, stdout: &str) -> &Self {
        self.push(args_prefix, code, stdout, false)
    }

    /// Answer every call whose arguments start with `args_prefix`.
    pub fn always(&self, args_prefix: &[&str], code: i32, stdout: &str) -> &Self {
        self.push(args_prefix, code, stdout, true)
    }

    fn push(&self, args_prefix: &[&str], code: i32, stdout: &str, sticky: bool) -> &Self {
        let prefix: Vec<String> = args_prefix.iter().map(|s| s.to_string()).collect();
        let mut rules = self.rules.borrow_mut();
        if let Some(r) = rules
            .iter_mut()
            .find(|r| r.args_prefix == prefix && r.sticky == sticky)
        {
            r.responses.push_back((code, stdout.to_string()));
        } else {
            rules.push(Rule {
                args_prefix: prefix,
                responses: VecDeque::from([(code, stdout.to_string())]),
                sticky,
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn call_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Call::line).collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, request: ExecRequest) -> Result<ExecOutput> {
        let args = request.arg_strings();
        self.calls.borrow_mut().push(Call {
            program: request.program().to_string_lossy().into_owned(),
            args: args.clone(),
            home: request
                .env_value("AI_SERVICES_HOME")
                .map(|v| v.to_string_lossy().into_owned()),
        });

        let mut rules = self.rules.borrow_mut();
        let rule = rules
            .iter_mut()
            .filter(|r| !r.responses.is_empty())
            .find(|r| args.starts_with(&r.args_prefix));
        let (code, stdout) = match rule {
            Some(r) if r.sticky => r.responses[0].clone(),
            Some(r) => r.responses.pop_front().unwrap_or_default(),
            None => {
                return Err(HarnessError::environment(format!(
                    "unexpected command: {}",
                    request.describe()
                )))
            }
        };
        Ok(ExecOutput {
            exit_code: Some(code),
            duration: Duration::from_millis(1),
            stdout,
            stderr: String::new(),
        })
    }
}

/// Write an executable `#!/bin/sh` script at `dir/name`.
#[allow(dead_code)]
#[cfg(unix)]
pub fn write_fake_binary(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(dir).expect("create script dir");
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// PATH lookup.
#[allow(dead_code)]
pub fn which(bin: &str) -> Option<PathBuf> {
    ::which::which(bin).ok()
}
