/// RegistrationManager: the registration lifecycle state machine.
///
/// Owns the token cache, the backoff scheduler, the process-wide callback
/// and the last sender id. Every method is synchronous and runs on the
/// task that owns the manager (normally the runtime event loop, see
/// [`RegistrationRuntime`](crate::RegistrationRuntime)). The push service
/// call is the only asynchronous step: it is spawned onto the tokio runtime
/// and its result comes back as a [`ManagerEvent`], together with fired
/// retry timers.
///
/// Invariants:
/// - at most one push service call in flight;
/// - cache writes only happen here, one at a time;
/// - after `pause`, no callback is invoked until `register` supplies one.
use std::sync::Arc;
use std::time::Duration;

use pushreg_store::{KeyValueStore, StoreError};
use tokio::sync::{mpsc, watch};

use crate::availability::{CapabilityCheck, ResolutionAction};
use crate::backoff::{BackoffScheduler, RetryTicket};
use crate::cache::TokenCache;
use crate::callback::RegistrationCallback;
use crate::client::PushServiceClient;
use crate::config::RegistrationConfig;
use crate::error::{PushServiceError, RegistrationError};
use crate::types::{AppVersion, FailureReason, RegisterStatus, RegistrationState};

/// Asynchronous completions fed back into the manager.
#[derive(Debug)]
pub enum ManagerEvent {
    /// A push service call returned.
    AttemptFinished {
        attempt: u64,
        result: Result<String, PushServiceError>,
    },
    /// A backoff timer elapsed.
    RetryDue(RetryTicket),
}

/// The registration cycle a caller is waiting on. Lives from `register`
/// until success, terminal failure or `pause`, across any number of retries.
#[derive(Debug)]
struct Session {
    sender_id: String,
}

pub struct RegistrationManager {
    app_version: AppVersion,
    cache: TokenCache,
    client: Arc<dyn PushServiceClient>,
    capability: Arc<dyn CapabilityCheck>,
    backoff: BackoffScheduler,

    callback: Option<Arc<dyn RegistrationCallback>>,
    sender_id: String,
    session: Option<Session>,
    in_flight: Option<u64>,
    attempts: u64,

    /// Last token obtained in this process.
    token: Option<String>,
    /// Set when the last token could not be written to the cache.
    unsaved: bool,

    state_tx: watch::Sender<RegistrationState>,
    events_tx: mpsc::UnboundedSender<ManagerEvent>,
}

impl RegistrationManager {
    /// Build a manager. The returned receiver carries the manager's own
    /// [`ManagerEvent`]s; whoever owns the manager must feed them back
    /// through [`handle_event`](Self::handle_event).
    pub fn new(
        config: &RegistrationConfig,
        client: Arc<dyn PushServiceClient>,
        capability: Arc<dyn CapabilityCheck>,
        store: Arc<dyn KeyValueStore>,
    ) -> (Self, mpsc::UnboundedReceiver<ManagerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(RegistrationState::Idle);
        let manager = Self {
            app_version: config.app_version,
            cache: TokenCache::new(store),
            client,
            capability,
            backoff: BackoffScheduler::new(config.base_delay, config.max_delay),
            callback: None,
            sender_id: String::new(),
            session: None,
            in_flight: None,
            attempts: 0,
            token: None,
            unsaved: false,
            state_tx,
            events_tx,
        };
        (manager, events_rx)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn state(&self) -> RegistrationState {
        self.state_tx.borrow().clone()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state_tx.subscribe()
    }

    /// Sender id of the most recent `register` call.
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// Last token obtained in this process, cached or fresh.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Base backoff delay.
    pub fn delay(&self) -> Duration {
        self.backoff.base_delay()
    }

    /// Delay the next transient failure will wait.
    pub fn current_delay(&self) -> Duration {
        self.backoff.current_delay()
    }

    pub fn app_version(&self) -> AppVersion {
        self.app_version
    }

    /// Number of push service calls dispatched so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn is_attempt_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_pending_retry(&self) -> bool {
        self.backoff.is_pending()
    }

    // ── Commands ─────────────────────────────────────────────────────────

    /// Reconfigure the base backoff delay; the sequence restarts from it.
    pub fn set_delay(&mut self, delay: Duration) {
        tracing::debug!(?delay, "backoff base delay set");
        self.backoff.set_base_delay(delay);
    }

    /// Start (or confirm) registration for `sender_id`.
    ///
    /// `callback`, when given, replaces the current one. Returns
    /// synchronously: with the cached token, after dispatching a background
    /// attempt, or with `AlreadyInProgress` if an attempt is in flight.
    /// Capability failures are returned as errors and never retried.
    pub fn register(
        &mut self,
        sender_id: &str,
        callback: Option<Arc<dyn RegistrationCallback>>,
    ) -> Result<RegisterStatus, RegistrationError> {
        if let Some(callback) = callback {
            self.callback = Some(callback);
        }
        self.sender_id = sender_id.to_string();
        tracing::debug!(sender_id, "registering");

        self.check_capability()?;

        if self.in_flight.is_some() {
            if self.session.is_none() {
                // Detached by pause: the running attempt now reports to this caller.
                self.session = Some(Session {
                    sender_id: sender_id.to_string(),
                });
                self.set_state(RegistrationState::Registering);
            }
            tracing::debug!("registration already in progress");
            return Ok(RegisterStatus::AlreadyInProgress);
        }

        self.set_state(RegistrationState::CheckingCache);
        if let Some(token) = self.cached_token() {
            if self.backoff.cancel() {
                tracing::debug!("pending retry dropped, cache is valid");
            }
            self.session = None;
            self.token = Some(token.clone());
            self.set_state(RegistrationState::Registered);
            if let Some(callback) = &self.callback {
                callback.on_registration_complete(&token);
            }
            return Ok(RegisterStatus::Cached { token });
        }

        if self.backoff.cancel() {
            tracing::debug!("pending retry superseded by register");
        }
        self.session = Some(Session {
            sender_id: sender_id.to_string(),
        });
        self.start_attempt(sender_id.to_string());
        Ok(RegisterStatus::Started)
    }

    /// Detach the callback and cancel any pending retry.
    ///
    /// An attempt already in flight keeps running; its token is still
    /// cached, but nobody is told about it.
    pub fn pause(&mut self) {
        self.callback = None;
        self.session = None;
        self.backoff.cancel();
        if self.in_flight.is_some() {
            tracing::debug!("paused with an attempt in flight, its outcome will not be reported");
        }
        self.set_state(RegistrationState::Idle);
    }

    /// Forget the cached token so the next `register` goes to the network.
    pub fn invalidate(&mut self) -> Result<(), StoreError> {
        self.cache.clear()?;
        self.token = None;
        self.unsaved = false;
        if self.state() == RegistrationState::Registered {
            self.set_state(RegistrationState::Idle);
        }
        tracing::info!("cached registration cleared");
        Ok(())
    }

    /// Stop all timers and drop the callback. Used when the owner goes away.
    pub fn shutdown(&mut self) {
        self.backoff.cancel();
        self.callback = None;
        self.session = None;
    }

    /// Apply an asynchronous completion.
    pub fn handle_event(&mut self, event: ManagerEvent) {
        match event {
            ManagerEvent::AttemptFinished { attempt, result } => {
                self.on_attempt_finished(attempt, result);
            }
            ManagerEvent::RetryDue(ticket) => self.on_retry_due(ticket),
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────

    fn check_capability(&mut self) -> Result<(), RegistrationError> {
        let availability = self.capability.check();
        if availability.available {
            return Ok(());
        }

        self.backoff.cancel();
        self.session = None;
        let (reason, error) = if availability.recoverable {
            let resolution = availability
                .resolution
                .unwrap_or_else(|| ResolutionAction::Other("unspecified".into()));
            tracing::warn!(%resolution, "push service unavailable, user action required");
            (
                FailureReason::RecoverableUnavailable {
                    resolution: resolution.clone(),
                },
                RegistrationError::RecoverableUnavailable { resolution },
            )
        } else {
            tracing::error!("push service not available on this device");
            (
                FailureReason::Unavailable,
                RegistrationError::ServiceUnavailable,
            )
        };
        self.set_state(RegistrationState::Failed(reason));
        Err(error)
    }

    /// Valid token from the cache, or from memory when the last write failed.
    fn cached_token(&mut self) -> Option<String> {
        match self.cache.load(self.app_version) {
            Ok(Some(record)) => return Some(record.token),
            Ok(None) => {}
            Err(e) => tracing::warn!("token cache unreadable, treating as empty: {e}"),
        }

        if !self.unsaved {
            return None;
        }
        let token = self.token.clone()?;
        match self.cache.store(&token, self.app_version) {
            Ok(()) => {
                self.unsaved = false;
                tracing::info!("in-memory token cached");
            }
            Err(e) => tracing::warn!("token still not cached: {e}"),
        }
        Some(token)
    }

    fn start_attempt(&mut self, sender_id: String) {
        self.attempts += 1;
        let attempt = self.attempts;
        self.in_flight = Some(attempt);
        self.set_state(RegistrationState::Registering);
        if let Some(callback) = &self.callback {
            callback.on_registration_started();
        }

        tracing::info!(attempt, sender_id = %sender_id, "registering with push service");
        let client = Arc::clone(&self.client);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.register(&sender_id).await;
            let _ = events.send(ManagerEvent::AttemptFinished { attempt, result });
        });
    }

    fn on_attempt_finished(&mut self, attempt: u64, result: Result<String, PushServiceError>) {
        if self.in_flight != Some(attempt) {
            tracing::debug!(attempt, "ignoring result of unknown attempt");
            return;
        }
        self.in_flight = None;

        match result {
            Ok(token) if token.is_empty() => {
                self.on_transient_failure("push service returned an empty token".into());
            }
            Ok(token) => self.on_registered(token),
            Err(PushServiceError::Io(reason)) => self.on_transient_failure(reason),
            Err(PushServiceError::Rejected(reason)) => self.on_rejected(reason),
        }
    }

    fn on_registered(&mut self, token: String) {
        // Cached even after pause so the next start skips the network.
        match self.cache.store(&token, self.app_version) {
            Ok(()) => self.unsaved = false,
            Err(e) => {
                self.unsaved = true;
                tracing::warn!("registered, but token not durably cached: {e}");
            }
        }
        self.backoff.reset();
        self.token = Some(token.clone());

        if self.session.take().is_none() {
            tracing::debug!("registration completed while detached, not reported");
            return;
        }
        tracing::info!(app_version = self.app_version, "device registered");
        self.set_state(RegistrationState::Registered);
        if let Some(callback) = &self.callback {
            callback.on_registration_complete(&token);
        }
    }

    fn on_transient_failure(&mut self, reason: String) {
        let Some(session) = &self.session else {
            tracing::debug!("registration failed while detached, not retrying: {reason}");
            return;
        };
        let sender_id = session.sender_id.clone();

        let delay = self.backoff.record_failure();
        tracing::warn!(?delay, "registration failed, will retry: {reason}");
        let events = self.events_tx.clone();
        self.backoff.schedule_retry(delay, sender_id, move |ticket| {
            let _ = events.send(ManagerEvent::RetryDue(ticket));
        });
        self.set_state(RegistrationState::BackoffWaiting { delay });
    }

    fn on_rejected(&mut self, reason: String) {
        tracing::error!(reason = %reason, "push service rejected registration");
        if self.session.take().is_none() {
            return;
        }
        let error = RegistrationError::Rejected {
            reason: reason.clone(),
        };
        self.set_state(RegistrationState::Failed(FailureReason::Rejected { reason }));
        if let Some(callback) = &self.callback {
            callback.on_registration_failed(&error);
        }
    }

    fn on_retry_due(&mut self, ticket: RetryTicket) {
        if !self.backoff.accept(&ticket) {
            tracing::debug!(generation = ticket.generation, "ignoring stale retry");
            return;
        }
        if self.session.is_none() || self.in_flight.is_some() {
            return;
        }
        self.start_attempt(ticket.sender_id);
    }

    fn set_state(&self, next: RegistrationState) {
        let previous = self.state_tx.send_replace(next.clone());
        if previous != next {
            tracing::trace!(?previous, ?next, "registration state");
        }
    }
}
