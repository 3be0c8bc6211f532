use crate::error::PushServiceError;

/// Network exchange of a sender identifier for a registration token.
///
/// In production: the platform push SDK or an HTTP client.
/// In tests: a scripted client that replays queued responses.
#[async_trait::async_trait]
pub trait PushServiceClient: Send + Sync {
    /// Register this device for `sender_id` and return its token.
    ///
    /// Transient failures must come back as [`PushServiceError::Io`];
    /// those are the only ones the manager retries.
    async fn register(&self, sender_id: &str) -> Result<String, PushServiceError>;
}
