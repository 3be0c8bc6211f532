/// Simulated push service and capability check for driving the lifecycle
/// without a real platform.
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use pushreg_core::{
    Availability, CapabilityCheck, PushServiceClient, PushServiceError, ResolutionAction,
};

/// Device capability as chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceCapability {
    Available,
    Unavailable,
    NeedsInstall,
    NeedsUpdate,
    NeedsEnable,
}

impl From<DeviceCapability> for Availability {
    fn from(capability: DeviceCapability) -> Self {
        match capability {
            DeviceCapability::Available => Availability::available(),
            DeviceCapability::Unavailable => Availability::unavailable(),
            DeviceCapability::NeedsInstall => {
                Availability::recoverable(ResolutionAction::InstallService)
            }
            DeviceCapability::NeedsUpdate => {
                Availability::recoverable(ResolutionAction::UpdateService)
            }
            DeviceCapability::NeedsEnable => {
                Availability::recoverable(ResolutionAction::EnableService)
            }
        }
    }
}

pub struct SimulatedCapability(pub DeviceCapability);

impl CapabilityCheck for SimulatedCapability {
    fn check(&self) -> Availability {
        self.0.into()
    }
}

// ── SimulatedPushService ────────────────────────────────────────

/// Push service that fails the first `failures` calls with an I/O error,
/// then issues random tokens. With `reject` set, every call is refused.
pub struct SimulatedPushService {
    failures_left: AtomicU32,
    latency: Duration,
    reject: Option<String>,
    calls: AtomicU32,
}

impl SimulatedPushService {
    pub fn new(failures: u32, latency: Duration, reject: Option<String>) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            latency,
            reject,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PushServiceClient for SimulatedPushService {
    async fn register(&self, sender_id: &str) -> Result<String, PushServiceError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(call, sender_id, "simulated push service call");
        tokio::time::sleep(self.latency).await;

        if let Some(reason) = &self.reject {
            return Err(PushServiceError::Rejected(reason.clone()));
        }
        let failed = self
            .failures_left
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(PushServiceError::Io(format!(
                "simulated network failure on call {call}"
            )));
        }
        Ok(format!("{sender_id}:{}", uuid::Uuid::new_v4().simple()))
    }
}
