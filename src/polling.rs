/// Bounded delay-then-poll loops
///
/// Every wait in an extraction goes through a `Delay`, so tests can swap the
/// Tokio timer for `NoDelay` and run the whole routine instantly.
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

/// Source of waiting
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Real waiting on the Tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and counts how often it was asked to wait
#[derive(Debug, Default)]
pub struct NoDelay {
    waits: AtomicU32,
}

impl NoDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> u32 {
        self.waits.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Delay for NoDelay {
    async fn wait(&self, _duration: Duration) {
        self.waits.fetch_add(1, Ordering::Relaxed);
    }
}

/// How many times to probe and how long to wait before each probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval: Duration::from_millis(interval_ms),
        }
    }

    /// Upper bound on the time this poll can take
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Progress of a single poll stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Waiting { attempt: u32, max_attempts: u32 },
    Success,
    Exhausted,
}

/// One poll stage: wait, probe, repeat until the probe yields or the budget runs out
pub struct Poller<'d> {
    name: &'static str,
    policy: PollPolicy,
    delay: &'d dyn Delay,
    state: PollState,
}

impl<'d> Poller<'d> {
    pub fn new(name: &'static str, policy: PollPolicy, delay: &'d dyn Delay) -> Self {
        Self {
            name,
            policy,
            delay,
            state: PollState::Idle,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Run the stage. The probe is called once per attempt, after the delay,
    /// and re-reads whatever it needs; `Ok(None)` means "not yet".
    pub async fn run<T, F>(&mut self, mut probe: F) -> Result<Option<T>>
    where
        F: FnMut() -> Result<Option<T>>,
    {
        for attempt in 1..=self.policy.max_attempts {
            self.state = PollState::Waiting {
                attempt,
                max_attempts: self.policy.max_attempts,
            };
            self.delay.wait(self.policy.interval).await;

            if let Some(found) = probe()? {
                debug!("Poll '{}' succeeded on attempt {}/{}", self.name, attempt, self.policy.max_attempts);
                self.state = PollState::Success;
                return Ok(Some(found));
            }
        }

        debug!("Poll '{}' exhausted after {} attempts", self.name, self.policy.max_attempts);
        self.state = PollState::Exhausted;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;

    #[test]
    fn test_poller_succeeds_on_third_attempt() {
        let delay = NoDelay::new();
        let mut poller = Poller::new("test", PollPolicy::new(5, 300), &delay);
        assert_eq!(poller.state(), PollState::Idle);

        let mut calls = 0;
        let result = tokio_test::block_on(poller.run(|| {
            calls += 1;
            Ok(if calls == 3 { Some(calls) } else { None })
        }))
        .unwrap();

        assert_eq!(result, Some(3));
        assert_eq!(poller.state(), PollState::Success);
        assert_eq!(delay.waits(), 3);
    }

    #[test]
    fn test_poller_exhausts() {
        let delay = NoDelay::new();
        let mut poller = Poller::new("test", PollPolicy::new(4, 300), &delay);
        let result: Option<()> = tokio_test::block_on(poller.run(|| Ok(None))).unwrap();

        assert!(result.is_none());
        assert_eq!(poller.state(), PollState::Exhausted);
        assert_eq!(delay.waits(), 4);
    }

    #[test]
    fn test_poller_propagates_probe_errors() {
        let delay = NoDelay::new();
        let mut poller = Poller::new("test", PollPolicy::new(4, 300), &delay);
        let result: Result<Option<()>> =
            tokio_test::block_on(poller.run(|| Err(ExtractionError::dom("detached"))));
        assert!(result.is_err());
        assert_eq!(delay.waits(), 1);
    }

    #[test]
    fn test_budget() {
        assert_eq!(PollPolicy::new(15, 300).budget(), Duration::from_millis(4500));
    }
}
