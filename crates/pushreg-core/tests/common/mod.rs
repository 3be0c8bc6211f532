#![allow(dead_code)]

/// Test doubles for the registration collaborators.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use pushreg_core::{
    Availability, CallbackEvent, CapabilityCheck, KeyValueStore, MemoryStore, PushServiceClient,
    PushServiceError, RegistrationCallback, RegistrationError, StoreError,
};
use pushreg_store::WriteBatch;
use tokio::sync::Semaphore;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// ── ScriptedClient ──────────────────────────────────────────────────

/// Push service client that replays queued responses.
///
/// With a gate, each call blocks until the test adds a permit, which keeps
/// an attempt "in flight" for as long as the test needs.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<String, PushServiceError>>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated() -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let client = Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gate: Some(gate.clone()),
        });
        (client, gate)
    }

    pub fn push_ok(&self, token: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(token.to_string()));
    }

    pub fn push_io(&self, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(PushServiceError::Io(reason.to_string())));
    }

    pub fn push_rejected(&self, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(PushServiceError::Rejected(reason.to_string())));
    }

    /// Number of calls started so far.
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Sender ids, in call order.
    pub fn senders(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PushServiceClient for ScriptedClient {
    async fn register(&self, sender_id: &str) -> Result<String, PushServiceError> {
        self.calls.lock().unwrap().push(sender_id.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PushServiceError::Io("no scripted response".into())))
    }
}

// ── FixedCapability ─────────────────────────────────────────────────

pub struct FixedCapability {
    availability: Mutex<Availability>,
}

impl FixedCapability {
    pub fn new(availability: Availability) -> Arc<Self> {
        Arc::new(Self {
            availability: Mutex::new(availability),
        })
    }

    pub fn available() -> Arc<Self> {
        Self::new(Availability::available())
    }

    pub fn set(&self, availability: Availability) {
        *self.availability.lock().unwrap() = availability;
    }
}

impl CapabilityCheck for FixedCapability {
    fn check(&self) -> Availability {
        self.availability.lock().unwrap().clone()
    }
}

// ── RecordingCallback ───────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingCallback {
    events: Mutex<Vec<CallbackEvent>>,
}

impl RecordingCallback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<CallbackEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn completions(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CallbackEvent::Complete { token } => Some(token),
                _ => None,
            })
            .collect()
    }
}

impl RegistrationCallback for RecordingCallback {
    fn on_registration_started(&self) {
        self.events.lock().unwrap().push(CallbackEvent::Started);
    }

    fn on_registration_complete(&self, token: &str) {
        self.events.lock().unwrap().push(CallbackEvent::Complete {
            token: token.to_string(),
        });
    }

    fn on_registration_failed(&self, error: &RegistrationError) {
        self.events.lock().unwrap().push(CallbackEvent::Failed {
            error: error.to_string(),
        });
    }
}

// ── FlakyStore ──────────────────────────────────────────────────────

/// Memory store whose reads or writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read_guard(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read failure injected".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read_guard()?;
        self.inner.get_string(key)
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>, StoreError> {
        self.read_guard()?;
        self.inner.get_int(key)
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failure injected".into()));
        }
        self.inner.apply(batch)
    }
}
