use crate::events::{emit, now_ms, EventOutcome, EventSession, EventState};
use crate::service::{DeviceCapability, SimulatedCapability, SimulatedPushService};
use pushreg_core::{
    CallbackEvent, ChannelCallback, KeyValueStore, RegisterStatus, RegistrationConfig,
    RegistrationRuntime, RegistrationState,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

pub struct RegisterConfig {
    pub sender_id: String,
    pub failures: u32,
    pub latency: Duration,
    pub reject: Option<String>,
    pub capability: DeviceCapability,
    pub timeout: Duration,
}

struct Outcome {
    kind: &'static str,
    token: Option<String>,
    error: Option<String>,
}

impl Outcome {
    fn token(kind: &'static str, token: String) -> Self {
        Self {
            kind,
            token: Some(token),
            error: None,
        }
    }

    fn error(kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            kind,
            token: None,
            error: Some(error.into()),
        }
    }
}

/// Run one registration against the simulated push service and report
/// every state transition and callback as JSONL.
pub async fn run(
    store: Arc<dyn KeyValueStore>,
    registration: RegistrationConfig,
    config: RegisterConfig,
    start: Instant,
) -> anyhow::Result<()> {
    emit(&EventSession {
        event: "session",
        mode: "register",
        sender_id: config.sender_id.clone(),
        app_version: registration.get_app_version(),
        base_delay_ms: registration.get_base_delay().as_millis() as u64,
        max_delay_ms: registration.get_max_delay().map(|d| d.as_millis() as u64),
        timestamp_ms: now_ms(),
    });

    let service = Arc::new(SimulatedPushService::new(
        config.failures,
        config.latency,
        config.reject,
    ));
    let handle = RegistrationRuntime::spawn(
        registration,
        service.clone(),
        Arc::new(SimulatedCapability(config.capability)),
        store,
    );

    let (callback, mut callbacks) = ChannelCallback::new();
    let mut states = handle.subscribe();

    let outcome = match handle
        .register(config.sender_id, Some(Arc::new(callback)))
        .await
    {
        Ok(RegisterStatus::Cached { token }) => Outcome::token("cached", token),
        Ok(_) => wait_for_outcome(&mut callbacks, &mut states, config.timeout, start).await,
        Err(e) => Outcome::error("failed", e.to_string()),
    };
    if outcome.kind == "interrupted" {
        handle.pause().await;
    }
    handle.shutdown().await;

    emit(&EventOutcome {
        event: "outcome",
        outcome: outcome.kind,
        token: outcome.token.clone(),
        error: outcome.error.clone(),
        attempts: service.calls(),
        elapsed_s: start.elapsed().as_secs_f64(),
    });

    match outcome.error {
        Some(error) if outcome.kind != "interrupted" => Err(anyhow::anyhow!(error)),
        _ => Ok(()),
    }
}

async fn wait_for_outcome(
    callbacks: &mut mpsc::UnboundedReceiver<CallbackEvent>,
    states: &mut watch::Receiver<RegistrationState>,
    timeout: Duration,
    start: Instant,
) -> Outcome {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = callbacks.recv() => match event {
                Some(CallbackEvent::Complete { token }) => {
                    emit(&CallbackEvent::Complete { token: token.clone() });
                    return Outcome::token("registered", token);
                }
                Some(CallbackEvent::Failed { error }) => {
                    emit(&CallbackEvent::Failed { error: error.clone() });
                    return Outcome::error("failed", error);
                }
                Some(event) => emit(&event),
                None => return Outcome::error("failed", "registration runtime stopped"),
            },

            changed = states.changed() => {
                if changed.is_err() {
                    return Outcome::error("failed", "registration runtime stopped");
                }
                let state = states.borrow_and_update().clone();
                emit(&EventState {
                    event: "state",
                    state,
                    elapsed_s: start.elapsed().as_secs_f64(),
                });
            }

            _ = &mut deadline => {
                return Outcome::error("timeout", format!("no token after {}s", timeout.as_secs()));
            }

            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nCtrl+C received, pausing registration...");
                return Outcome::error("interrupted", "interrupted");
            }
        }
    }
}
