/// Push service capability check.
///
/// The platform decides whether the push service client is installed and
/// compatible. The core only consumes the verdict: an unavailable service
/// is never retried through backoff, since waiting does not fix a missing
/// dependency.
use std::fmt;

use serde::{Deserialize, Serialize};

/// What the user has to do before a recoverable service becomes usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionAction {
    InstallService,
    UpdateService,
    EnableService,
    /// Platform-specific action, described for display.
    Other(String),
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionAction::InstallService => f.write_str("install push service"),
            ResolutionAction::UpdateService => f.write_str("update push service"),
            ResolutionAction::EnableService => f.write_str("enable push service"),
            ResolutionAction::Other(action) => f.write_str(action),
        }
    }
}

/// Result of a capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    /// Only meaningful when `available` is false.
    pub recoverable: bool,
    pub resolution: Option<ResolutionAction>,
}

impl Availability {
    pub fn available() -> Self {
        Self {
            available: true,
            recoverable: false,
            resolution: None,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            recoverable: false,
            resolution: None,
        }
    }

    pub fn recoverable(resolution: ResolutionAction) -> Self {
        Self {
            available: false,
            recoverable: true,
            resolution: Some(resolution),
        }
    }
}

/// Platform query for push service availability.
pub trait CapabilityCheck: Send + Sync {
    fn check(&self) -> Availability;
}

/// Capability check for platforms where the push client is always linked in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAvailable;

impl CapabilityCheck for AlwaysAvailable {
    fn check(&self) -> Availability {
        Availability::available()
    }
}
