//! Bounded poll loop: probe, and on a retryable error sleep and probe again
//! until the deadline passes.
use crate::error::FindError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Resolved,
    TimedOut,
    Failed,
}

/// How a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub state: PollState,
    pub attempts: u32,
    pub elapsed: Duration,
}

impl Default for PollReport {
    fn default() -> Self {
        Self {
            state: PollState::Idle,
            attempts: 0,
            elapsed: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Poller {
    pub timeout: Duration,
    pub interval: Duration,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(timeout: Duration, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            timeout,
            interval,
            cancel,
        }
    }

    /// Run `probe` until it succeeds, fails fatally or the deadline passes.
    ///
    /// The probe always runs at least once, even with a zero timeout. The
    /// abort token is checked before every probe. A timeout too large to add
    /// to the clock means no deadline; only success, a fatal error or the
    /// abort token ends the poll.
    pub async fn run<T, F, Fut>(&self, mut probe: F) -> (Result<T, FindError>, PollReport)
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FindError>>,
    {
        let started = Instant::now();
        let deadline = started.checked_add(self.timeout);
        let mut report = PollReport {
            state: PollState::Polling,
            ..PollReport::default()
        };

        let result = loop {
            if self.cancel.is_cancelled() {
                report.state = PollState::Failed;
                break Err(FindError::Cancelled);
            }
            report.attempts += 1;
            match probe(report.attempts).await {
                Ok(value) => {
                    report.state = PollState::Resolved;
                    break Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    report.state = PollState::Failed;
                    break Err(err);
                }
                Err(err) => {
                    let now = Instant::now();
                    if deadline.is_some_and(|deadline| now >= deadline) {
                        report.state = PollState::TimedOut;
                        debug!(
                            target: "finder.poll",
                            attempts = report.attempts,
                            error = %err,
                            "finder.poll.timeout"
                        );
                        break Err(FindError::LocatorTimeout { last: Box::new(err) });
                    }
                    trace!(
                        target: "finder.poll",
                        attempt = report.attempts,
                        error = %err,
                        "finder.poll.tick"
                    );
                    let pause = match deadline {
                        Some(deadline) => self.interval.min(deadline - now),
                        None => self.interval,
                    };
                    tokio::select! {
                        _ = sleep(pause) => {}
                        _ = self.cancel.cancelled() => {}
                    }
                }
            }
        };
        report.elapsed = started.elapsed();
        (result, report)
    }
}
