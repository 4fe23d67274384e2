use std::time::Duration;

use tracing::info;

use crate::errors::{HarnessError, Result};
use crate::podman::ContainerInspector;
use crate::retry::{retry, Clock, RetryPolicy};
use crate::util::{CommandRunner, Deadline};

/// True when any keyword occurs in `text`, ignoring case.
pub fn contains_readiness_keyword<S: AsRef<str>>(text: &str, words: &[S]) -> bool {
    let hay = text.to_lowercase();
    words
        .iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .any(|w| !w.is_empty() && hay.contains(&w))
}

impl<R: CommandRunner> ContainerInspector<R> {
    /// Combined stdout/stderr of `podman logs <container>`.
    pub fn pod_logs(&self, container: &str, deadline: Deadline) -> Result<String> {
        self.podman(
            &format!("podman logs {container}"),
            vec!["logs".into(), container.into()],
            deadline,
        )
    }

    /// Poll the container's logs until one of `words` shows up.
    pub fn wait_for_log_readiness<S: AsRef<str>>(
        &self,
        container: &str,
        words: &[S],
        policy: RetryPolicy,
        clock: &dyn Clock,
        deadline: Deadline,
    ) -> Result<()> {
        retry(&format!("log readiness of {container}"), policy, clock, |_| {
            if deadline.expired() {
                return Err(HarnessError::Timeout {
                    what: format!("log readiness of {container}"),
                    elapsed: Duration::ZERO,
                });
            }
            let logs = self.pod_logs(container, deadline)?;
            if contains_readiness_keyword(&logs, words) {
                info!(container, "readiness keyword found in logs");
                Ok(())
            } else {
                Err(HarnessError::validation(format!(
                    "no readiness keyword in logs of {container}"
                )))
            }
        })
    }
}
