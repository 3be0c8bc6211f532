/// Lifecycle observer supplied by the caller of `register`.
///
/// Callbacks run on the registration event loop task (a tokio worker
/// thread), never on the thread that called `register`. There is no hop to
/// a UI thread; implementations that need one must do it themselves and
/// must not block.
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::RegistrationError;

pub trait RegistrationCallback: Send + Sync {
    /// A network registration attempt is about to be dispatched.
    fn on_registration_started(&self) {}

    /// A token is available, either freshly issued or from the cache.
    fn on_registration_complete(&self, token: &str);

    /// The push service refused the registration. Not called for transient
    /// failures, which are retried silently.
    fn on_registration_failed(&self, _error: &RegistrationError) {}
}

/// Callback notification forwarded by [`ChannelCallback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CallbackEvent {
    Started,
    Complete { token: String },
    Failed { error: String },
}

/// Callback that forwards every notification into a channel.
///
/// Useful when the observer lives in async code and wants to `await`
/// the outcome instead of reacting inline.
#[derive(Debug, Clone)]
pub struct ChannelCallback {
    tx: mpsc::UnboundedSender<CallbackEvent>,
}

impl ChannelCallback {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CallbackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RegistrationCallback for ChannelCallback {
    fn on_registration_started(&self) {
        let _ = self.tx.send(CallbackEvent::Started);
    }

    fn on_registration_complete(&self, token: &str) {
        let _ = self.tx.send(CallbackEvent::Complete {
            token: token.to_string(),
        });
    }

    fn on_registration_failed(&self, error: &RegistrationError) {
        let _ = self.tx.send(CallbackEvent::Failed {
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_callback_forwards_in_order() {
        let (cb, mut rx) = ChannelCallback::new();
        cb.on_registration_started();
        cb.on_registration_complete("tok-1");
        cb.on_registration_failed(&RegistrationError::ServiceUnavailable);

        assert_eq!(rx.try_recv().unwrap(), CallbackEvent::Started);
        assert_eq!(
            rx.try_recv().unwrap(),
            CallbackEvent::Complete {
                token: "tok-1".into()
            }
        );
        assert!(matches!(rx.try_recv().unwrap(), CallbackEvent::Failed { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (cb, rx) = ChannelCallback::new();
        drop(rx);
        cb.on_registration_complete("tok-1");
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&CallbackEvent::Complete {
            token: "abc".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"complete","token":"abc"}"#);
    }
}
