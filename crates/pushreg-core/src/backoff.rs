/// Exponential backoff for failed registration attempts.
///
/// [`BackoffState`] is the pure delay arithmetic: the delay handed out for a
/// failure is the current one, and the current one then doubles (up to the
/// cap) for the next failure. Consecutive failures therefore wait
/// `base, 2*base, 4*base, …`.
///
/// [`BackoffScheduler`] adds the one-shot retry timer on top. Only one
/// timer is ever pending; scheduling a new one aborts the previous one.
/// Each timer carries a generation so a ticket that was already queued
/// when its timer got cancelled can still be recognised as stale.
use std::time::Duration;

use tokio::task::JoinHandle;

/// Delay before the first retry unless configured otherwise (60 s).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(60_000);

/// Stand-in deadline for delays too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Double `current`, clamped to `cap` when one is set.
pub fn next_delay(current: Duration, cap: Option<Duration>) -> Duration {
    let doubled = current.saturating_mul(2);
    match cap {
        Some(cap) => doubled.min(cap),
        None => doubled,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    base: Duration,
    current: Duration,
    cap: Option<Duration>,
}

impl BackoffState {
    pub fn new(base: Duration, cap: Option<Duration>) -> Self {
        Self {
            base,
            current: base,
            cap,
        }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Delay the next failure will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn cap(&self) -> Option<Duration> {
        self.cap
    }

    /// The cap, never below the base delay so the sequence cannot shrink.
    fn effective_cap(&self) -> Option<Duration> {
        self.cap.map(|cap| cap.max(self.base))
    }

    /// Successor of `current` under this state's cap.
    pub fn next_delay(&self, current: Duration) -> Duration {
        next_delay(current, self.effective_cap())
    }

    /// Delay for the failure just observed; advances for the following one.
    pub fn on_failure(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.next_delay(delay);
        delay
    }

    /// Restart the sequence at the base delay.
    pub fn reset(&mut self) -> Duration {
        self.current = self.base;
        self.base
    }

    /// Reconfigure the base delay. Also restarts the sequence.
    pub fn set_base(&mut self, base: Duration) {
        self.base = base;
        self.current = base;
    }

    pub fn set_cap(&mut self, cap: Option<Duration>) {
        self.cap = cap;
        if let Some(cap) = self.effective_cap() {
            self.current = self.current.min(cap);
        }
    }
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, None)
    }
}

/// Delivered to the `on_fire` closure when a retry timer elapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryTicket {
    pub generation: u64,
    pub sender_id: String,
}

struct PendingRetry {
    generation: u64,
    delay: Duration,
    handle: JoinHandle<()>,
}

/// Owns the backoff state and the single pending retry timer.
///
/// Timers are tokio tasks, so tests drive them with a paused clock.
pub struct BackoffScheduler {
    state: BackoffState,
    pending: Option<PendingRetry>,
    generation: u64,
}

impl BackoffScheduler {
    pub fn new(base: Duration, cap: Option<Duration>) -> Self {
        Self {
            state: BackoffState::new(base, cap),
            pending: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> &BackoffState {
        &self.state
    }

    pub fn base_delay(&self) -> Duration {
        self.state.base()
    }

    pub fn current_delay(&self) -> Duration {
        self.state.current()
    }

    pub fn next_delay(&self, current: Duration) -> Duration {
        self.state.next_delay(current)
    }

    /// Take the delay for a new failure, doubling for the next one.
    pub fn record_failure(&mut self) -> Duration {
        self.state.on_failure()
    }

    pub fn reset(&mut self) -> Duration {
        self.state.reset()
    }

    pub fn set_base_delay(&mut self, base: Duration) {
        self.state.set_base(base);
    }

    /// Arm a one-shot timer that calls `on_fire` after `delay`.
    ///
    /// Any previously pending timer is cancelled first. Must be called
    /// from within a tokio runtime. Returns the new timer's generation.
    pub fn schedule_retry<F>(&mut self, delay: Duration, sender_id: String, on_fire: F) -> u64
    where
        F: FnOnce(RetryTicket) + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        let now = tokio::time::Instant::now();
        let deadline = now.checked_add(delay).unwrap_or(now + FAR_FUTURE);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            on_fire(RetryTicket {
                generation,
                sender_id,
            });
        });

        tracing::debug!(?delay, generation, "registration retry scheduled");
        self.pending = Some(PendingRetry {
            generation,
            delay,
            handle,
        });
        generation
    }

    /// Abort the pending timer. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                tracing::debug!(generation = pending.generation, "registration retry cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Delay of the pending timer, if any.
    pub fn pending_delay(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.delay)
    }

    /// Claim a fired ticket. False when it belongs to a cancelled or
    /// superseded timer.
    pub fn accept(&mut self, ticket: &RetryTicket) -> bool {
        let current = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.generation == ticket.generation);
        if current {
            self.pending = None;
        }
        current
    }
}

impl Drop for BackoffScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
