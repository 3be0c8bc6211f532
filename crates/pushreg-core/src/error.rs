use pushreg_store::StoreError;

use crate::availability::ResolutionAction;

/// Errors surfaced to callers of the registration API.
///
/// Transient push service failures never appear here: they are retried
/// internally and only delay the completion callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("push service is not available on this device")]
    ServiceUnavailable,

    #[error("push service unavailable until the user acts: {resolution}")]
    RecoverableUnavailable { resolution: ResolutionAction },

    #[error("push service rejected registration: {reason}")]
    Rejected { reason: String },

    #[error("token cache error: {0}")]
    Storage(String),

    #[error("registration runtime shut down")]
    Shutdown,
}

impl From<StoreError> for RegistrationError {
    fn from(e: StoreError) -> Self {
        RegistrationError::Storage(e.to_string())
    }
}

/// Errors returned by a [`PushServiceClient`](crate::PushServiceClient).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushServiceError {
    /// Network or I/O failure; retried with backoff.
    #[error("push service i/o error: {0}")]
    Io(String),

    /// The service refused the request; never retried.
    #[error("push service rejected sender: {0}")]
    Rejected(String),
}

impl PushServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PushServiceError::Io(_))
    }
}

impl From<std::io::Error> for PushServiceError {
    fn from(e: std::io::Error) -> Self {
        PushServiceError::Io(e.to_string())
    }
}
