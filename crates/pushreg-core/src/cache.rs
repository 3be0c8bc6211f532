/// TokenCache: persisted registration record.
///
/// Holds `{token, app_version}` in the key-value store. A record only
/// counts when it was issued for the running app version: after an
/// upgrade the old token is treated exactly like "never registered".
///
/// No retries here. Store failures are returned to the caller.
use std::sync::Arc;

use pushreg_store::{KeyValueStore, StoreError, WriteBatch};

use crate::types::{AppVersion, RegistrationRecord};

/// Store key for the registration token.
pub const TOKEN_KEY: &str = "registration_token";

/// Store key for the app version the token was issued under.
pub const APP_VERSION_KEY: &str = "app_version";

#[derive(Clone)]
pub struct TokenCache {
    store: Arc<dyn KeyValueStore>,
}

impl TokenCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Cached record, if present and valid for `current`.
    pub fn load(&self, current: AppVersion) -> Result<Option<RegistrationRecord>, StoreError> {
        let Some(token) = self.store.get_string(TOKEN_KEY)? else {
            tracing::debug!("registration not found in cache");
            return Ok(None);
        };
        let Some(stored_version) = self.store.get_int(APP_VERSION_KEY)? else {
            tracing::debug!("cached registration has no app version");
            return Ok(None);
        };
        let Ok(app_version) = AppVersion::try_from(stored_version) else {
            tracing::debug!(stored_version, "cached app version out of range");
            return Ok(None);
        };

        let record = RegistrationRecord { token, app_version };
        if !record.is_valid_for(current) {
            tracing::debug!(
                cached = record.app_version,
                current,
                "cached registration is stale"
            );
            return Ok(None);
        }
        tracing::debug!(app_version = current, "using cached registration");
        Ok(Some(record))
    }

    /// Overwrite the record in one atomic batch.
    pub fn store(&self, token: &str, app_version: AppVersion) -> Result<(), StoreError> {
        tracing::debug!(app_version, "saving registration token");
        self.store.apply(
            WriteBatch::new()
                .put_string(TOKEN_KEY, token)
                .put_int(APP_VERSION_KEY, i64::from(app_version)),
        )
    }

    /// Drop the record so the next `load` finds nothing.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store
            .apply(WriteBatch::new().remove(TOKEN_KEY).remove(APP_VERSION_KEY))
    }
}
