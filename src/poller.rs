//! Fixed-interval polling until a predicate holds or a deadline passes.
//! The interval never backs off.
//!
//! Fetch errors other than "not found" are returned immediately.  Only the
//! predicate failing to hold is retried.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::predicate::Predicate;

/// How long to wait and how often to look.  Both are whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    timeout: Duration,
    interval: Duration,
}

impl PollPolicy {
    pub fn from_secs(timeout_secs: u64, interval_secs: u64) -> Result<Self> {
        if interval_secs == 0 {
            return Err(Error::config("poll interval must be at least one second"));
        }
        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            interval: Duration::from_secs(interval_secs),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Result of one poll.  `last_observed` is `None` when the final fetch
/// reported "not found".
#[derive(Clone, Debug)]
pub struct PollOutcome<S> {
    pub converged: bool,
    pub last_observed: Option<S>,
    pub elapsed: Duration,
    pub attempts: u32,
}

impl<S: Debug> PollOutcome<S> {
    /// Convert a missed deadline into [`Error::ConvergenceTimeout`].
    pub fn into_converged(self, description: impl Into<String>) -> Result<Option<S>> {
        if self.converged {
            return Ok(self.last_observed);
        }
        Err(Error::ConvergenceTimeout {
            description: description.into(),
            elapsed: self.elapsed,
            last_observed: format!("{:?}", self.last_observed),
        })
    }
}

/// Fetch with `fetch` until `predicate` holds or `policy.timeout()` elapses.
///
/// The returned elapsed time is never below the timeout on a miss and never
/// more than one interval past it: the last sleep is shortened to land on
/// the deadline.
pub async fn poll<S, F, Fut, P>(
    policy: &PollPolicy,
    fetch: F,
    predicate: &P,
) -> Result<PollOutcome<S>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<S>>>,
    P: Predicate<S> + ?Sized,
{
    let description = predicate.description();
    poll_until(policy, &description, fetch, |observed| {
        Ok(predicate.evaluate(observed))
    })
    .await
}

/// Polling loop shared with the terminal-condition detector, whose check can
/// fail hard instead of just returning false.
pub(crate) async fn poll_until<S, F, Fut, C>(
    policy: &PollPolicy,
    description: &str,
    mut fetch: F,
    mut check: C,
) -> Result<PollOutcome<S>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<S>>>,
    C: FnMut(Option<&S>) -> Result<bool>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let observed = fetch().await?;
        let held = check(observed.as_ref())?;
        let elapsed = start.elapsed();

        if held {
            info!(predicate = %description, attempts, ?elapsed, "converged");
            return Ok(PollOutcome {
                converged: true,
                last_observed: observed,
                elapsed,
                attempts,
            });
        }

        if elapsed >= policy.timeout {
            warn!(predicate = %description, attempts, ?elapsed, "deadline reached before convergence");
            return Ok(PollOutcome {
                converged: false,
                last_observed: observed,
                elapsed,
                attempts,
            });
        }

        let pause = policy.interval.min(policy.timeout - elapsed);
        debug!(predicate = %description, attempt = attempts, ?elapsed, ?pause, "not converged yet");
        tokio::time::sleep(pause).await;
    }
}
