//! Fixed-delay retry and HTTP readiness polling.
//!
//! The loop is an explicit state machine (`RetryState`) driven by an injectable
//! [`Clock`], so tests can run it without sleeping.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::errors::{BoxError, HarnessError, Result};
use crate::util::Deadline;

/// Time source for the retry loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Clock that advances only when slept on. Records each requested sleep.
#[derive(Debug)]
pub struct FakeClock {
    start: Instant,
    elapsed: RefCell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: RefCell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.borrow()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.borrow()
    }

    fn sleep(&self, d: Duration) {
        *self.elapsed.borrow_mut() += d;
        self.sleeps.borrow_mut().push(d);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    /// Upper bound on total time spent, measured on the policy's clock.
    pub max_elapsed: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            max_elapsed: None,
        }
    }

    pub fn with_max_elapsed(mut self, max: Duration) -> Self {
        self.max_elapsed = Some(max);
        self
    }
}

/// What the loop should do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Done,
    SleepThenRetry(Duration),
    GiveUp,
}

/// Attempt bookkeeping for one retry loop.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    started: Instant,
}

impl RetryState {
    pub fn new(policy: RetryPolicy, started: Instant) -> Self {
        Self {
            policy,
            attempt: 0,
            started,
        }
    }

    /// 1-based number of the attempt about to run.
    pub fn attempt(&self) -> u32 {
        self.attempt + 1
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempt
    }

    pub fn can_attempt(&self) -> bool {
        self.attempt < self.policy.attempts
    }

    /// Record an attempt result and decide the next transition.
    pub fn record(&mut self, succeeded: bool, now: Instant) -> Next {
        self.attempt += 1;
        if succeeded {
            return Next::Done;
        }
        if self.attempt >= self.policy.attempts {
            return Next::GiveUp;
        }
        if let Some(max) = self.policy.max_elapsed {
            let spent = now.saturating_duration_since(self.started);
            if spent + self.policy.delay > max {
                return Next::GiveUp;
            }
        }
        Next::SleepThenRetry(self.policy.delay)
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Only the final failure is surfaced, wrapped as `Exhausted` with the last cause.
/// A `Timeout` (deadline expiry) is returned at once and never retried.
/// A policy of zero attempts never calls `op`.
pub fn retry<T, F>(what: &str, policy: RetryPolicy, clock: &dyn Clock, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let mut state = RetryState::new(policy, clock.now());
    let mut last_err: Option<HarnessError> = None;

    while state.can_attempt() {
        let attempt = state.attempt();
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(e @ HarnessError::Timeout { .. }) => return Err(e),
            Err(e) => {
                warn!(
                    what,
                    attempt,
                    attempts = policy.attempts,
                    error = %e,
                    "retry attempt failed"
                );
                let next = state.record(false, clock.now());
                last_err = Some(e);
                match next {
                    Next::SleepThenRetry(d) => clock.sleep(d),
                    Next::GiveUp | Next::Done => break,
                }
            }
        }
    }

    let source: BoxError = match last_err {
        Some(e) => Box::new(e),
        None => "no attempts were made".into(),
    };
    Err(HarnessError::Exhausted {
        what: what.to_string(),
        attempts: state.attempts_made(),
        source,
    })
}

/// One HTTP GET; Ok(status) when a response arrived.
pub trait HttpProbe {
    fn get_status(&self, url: &str, timeout: Duration) -> std::result::Result<u16, BoxError>;
}

/// Blocking reqwest client used for readiness polling.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: reqwest::blocking::Client,
}

impl ReqwestProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| HarnessError::environment(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpProbe for ReqwestProbe {
    fn get_status(&self, url: &str, timeout: Duration) -> std::result::Result<u16, BoxError> {
        let resp = self.client.get(url).timeout(timeout).send()?;
        Ok(resp.status().as_u16())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unexpected HTTP status {status}")]
struct UnexpectedStatus {
    status: u16,
}

/// Poll `url` until it answers HTTP 200.
///
/// Each request is bounded by `request_timeout` and by `deadline`.
pub fn wait_for_endpoint_ok(
    probe: &dyn HttpProbe,
    url: &str,
    policy: RetryPolicy,
    request_timeout: Duration,
    deadline: Deadline,
    clock: &dyn Clock,
) -> Result<()> {
    let what = format!("endpoint {url}");
    retry(&what, policy, clock, |attempt| {
        if deadline.expired() {
            return Err(HarnessError::Timeout {
                what: format!("GET {url}"),
                elapsed: Duration::ZERO,
            });
        }
        let timeout = deadline.clamp(request_timeout);
        match probe.get_status(url, timeout) {
            Ok(200) => {
                info!(url, "GET -> 200 OK");
                Ok(())
            }
            Ok(status) => {
                info!(url, attempt, attempts = policy.attempts, status, "waiting for endpoint");
                Err(HarnessError::Http {
                    url: url.to_string(),
                    source: Box::new(UnexpectedStatus { status }),
                })
            }
            Err(e) => {
                info!(url, attempt, attempts = policy.attempts, error = %e, "waiting for endpoint");
                Err(HarnessError::Http {
                    url: url.to_string(),
                    source: e,
                })
            }
        }
    })
}
