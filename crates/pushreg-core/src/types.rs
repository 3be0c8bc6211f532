use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::availability::ResolutionAction;

/// Application build number the registration was obtained under.
///
/// A token issued for one version is not guaranteed to work after an
/// upgrade, so the cache is keyed on it.
pub type AppVersion = u32;

/// A cached registration: the token and the app version it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub token: String,
    pub app_version: AppVersion,
}

impl RegistrationRecord {
    pub fn new(token: impl Into<String>, app_version: AppVersion) -> Self {
        Self {
            token: token.into(),
            app_version,
        }
    }

    /// Usable by an app running `current`: same version and a non-empty token.
    pub fn is_valid_for(&self, current: AppVersion) -> bool {
        self.app_version == current && !self.token.is_empty()
    }
}

/// Why the lifecycle stopped in [`RegistrationState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Push service missing or incompatible on this device.
    Unavailable,
    /// Push service present but needs user action first.
    RecoverableUnavailable { resolution: ResolutionAction },
    /// The push service refused the sender outright.
    Rejected { reason: String },
}

/// Lifecycle state of a [`RegistrationManager`](crate::RegistrationManager).
///
/// Follows: Idle → CheckingCache → (Registered | Registering),
/// Registering → (Registered | BackoffWaiting | Failed),
/// BackoffWaiting → Registering. `pause` returns to Idle from anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationState {
    Idle,
    CheckingCache,
    Registering,
    /// A retry is scheduled `delay` after the failure that caused it.
    BackoffWaiting { delay: Duration },
    Registered,
    Failed(FailureReason),
}

impl RegistrationState {
    /// Stable rest states: nothing further happens without a new command.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            RegistrationState::Idle | RegistrationState::Registered | RegistrationState::Failed(_)
        )
    }
}

/// Immediate outcome of a `register` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterStatus {
    /// A valid cached token was found; no network call was made.
    Cached { token: String },
    /// A registration attempt was dispatched in the background.
    Started,
    /// An attempt is already in flight; no second call was made.
    AlreadyInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_validity() {
        assert!(RegistrationRecord::new("tok", 3).is_valid_for(3));
        assert!(!RegistrationRecord::new("tok", 3).is_valid_for(4));
        assert!(!RegistrationRecord::new("", 3).is_valid_for(3));
    }

    #[test]
    fn test_settled_states() {
        assert!(RegistrationState::Idle.is_settled());
        assert!(RegistrationState::Registered.is_settled());
        assert!(RegistrationState::Failed(FailureReason::Unavailable).is_settled());
        assert!(!RegistrationState::Registering.is_settled());
        assert!(!RegistrationState::BackoffWaiting {
            delay: Duration::from_secs(60)
        }
        .is_settled());
    }
}
