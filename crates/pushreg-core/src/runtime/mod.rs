/// Registration runtime: runs a [`RegistrationManager`] as an actor.
///
/// The event loop task owns the manager outright. Applications talk to it
/// through a cloneable [`RegistrationHandle`], so state transitions never
/// race: `register`, `pause`, attempt completions and retry timers are all
/// applied one after another on the loop. Callbacks therefore run on the
/// loop task.
mod r#loop;

use std::sync::Arc;
use std::time::Duration;

use pushreg_store::{KeyValueStore, StoreError};
use tokio::sync::{mpsc, oneshot, watch};

use crate::availability::CapabilityCheck;
use crate::callback::RegistrationCallback;
use crate::client::PushServiceClient;
use crate::config::RegistrationConfig;
use crate::error::RegistrationError;
use crate::manager::RegistrationManager;
use crate::types::{RegisterStatus, RegistrationState};

// ── Commands (app → runtime) ──────────────────────────────────────────

/// Commands the application sends to the runtime event loop.
pub enum RegistrationCommand {
    /// Register for a sender id, optionally replacing the callback.
    Register {
        sender_id: String,
        callback: Option<Arc<dyn RegistrationCallback>>,
        reply: oneshot::Sender<Result<RegisterStatus, RegistrationError>>,
    },
    /// Detach the callback and cancel pending retries.
    Pause { reply: oneshot::Sender<()> },
    /// Reconfigure the base backoff delay.
    SetDelay { delay: Duration },
    /// Query: base backoff delay.
    GetDelay { reply: oneshot::Sender<Duration> },
    /// Query: delay the next failure would wait.
    GetCurrentDelay { reply: oneshot::Sender<Duration> },
    /// Query: last sender id.
    GetSenderId { reply: oneshot::Sender<String> },
    /// Query: last token obtained in this process.
    GetToken {
        reply: oneshot::Sender<Option<String>>,
    },
    /// Drop the cached token.
    Invalidate {
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    /// Graceful shutdown.
    Shutdown,
}

// ── RegistrationHandle (app-facing API) ──────────────────────────────

/// Handle to communicate with a running registration runtime.
///
/// Cheap to clone. Queries return defaults once the runtime has shut down.
#[derive(Clone)]
pub struct RegistrationHandle {
    cmd_tx: mpsc::Sender<RegistrationCommand>,
    state_rx: watch::Receiver<RegistrationState>,
}

impl RegistrationHandle {
    /// Register for `sender_id`.
    ///
    /// Resolves as soon as the cache has been consulted; the network
    /// exchange, if any, continues in the background and is reported to
    /// `callback`.
    pub async fn register(
        &self,
        sender_id: impl Into<String>,
        callback: Option<Arc<dyn RegistrationCallback>>,
    ) -> Result<RegisterStatus, RegistrationError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RegistrationCommand::Register {
                sender_id: sender_id.into(),
                callback,
                reply: tx,
            })
            .await
            .map_err(|_| RegistrationError::Shutdown)?;
        rx.await.map_err(|_| RegistrationError::Shutdown)?
    }

    /// Detach the callback and cancel any pending retry.
    pub async fn pause(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(RegistrationCommand::Pause { reply: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    /// Set the base backoff delay.
    pub async fn set_delay(&self, delay: Duration) {
        let _ = self
            .cmd_tx
            .send(RegistrationCommand::SetDelay { delay })
            .await;
    }

    /// Base backoff delay.
    pub async fn delay(&self) -> Duration {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(RegistrationCommand::GetDelay { reply: tx })
            .await;
        rx.await.unwrap_or_default()
    }

    /// Delay the next transient failure would wait.
    pub async fn current_delay(&self) -> Duration {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(RegistrationCommand::GetCurrentDelay { reply: tx })
            .await;
        rx.await.unwrap_or_default()
    }

    /// Sender id of the most recent `register` call.
    pub async fn sender_id(&self) -> String {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(RegistrationCommand::GetSenderId { reply: tx })
            .await;
        rx.await.unwrap_or_default()
    }

    /// Last token obtained in this process.
    pub async fn token(&self) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .cmd_tx
            .send(RegistrationCommand::GetToken { reply: tx })
            .await;
        rx.await.unwrap_or_default()
    }

    /// Drop the cached token so the next `register` hits the network.
    pub async fn invalidate(&self) -> Result<(), RegistrationError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RegistrationCommand::Invalidate { reply: tx })
            .await
            .map_err(|_| RegistrationError::Shutdown)?;
        rx.await.map_err(|_| RegistrationError::Shutdown)??;
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistrationState {
        self.state_rx.borrow().clone()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state_rx.clone()
    }

    /// Wait until the state satisfies `predicate`.
    pub async fn wait_for_state(
        &self,
        mut predicate: impl FnMut(&RegistrationState) -> bool,
    ) -> Result<RegistrationState, RegistrationError> {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| RegistrationError::Shutdown)?;
        Ok(state.clone())
    }

    /// Graceful shutdown.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(RegistrationCommand::Shutdown).await;
    }
}

// ── RegistrationRuntime ──────────────────────────────────────────────

/// The registration runtime. Spawn it and communicate via the handle.
pub struct RegistrationRuntime;

impl RegistrationRuntime {
    /// Create the manager and spawn its event loop as a tokio task.
    pub fn spawn(
        config: RegistrationConfig,
        client: Arc<dyn PushServiceClient>,
        capability: Arc<dyn CapabilityCheck>,
        store: Arc<dyn KeyValueStore>,
    ) -> RegistrationHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RegistrationCommand>(config.command_buffer);
        let (manager, events_rx) = RegistrationManager::new(&config, client, capability, store);
        let state_rx = manager.subscribe();

        tokio::spawn(r#loop::registration_loop(manager, cmd_rx, events_rx));

        RegistrationHandle { cmd_tx, state_rx }
    }
}
