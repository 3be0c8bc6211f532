use std::time::Duration;

use crate::backoff::DEFAULT_BASE_DELAY;
use crate::types::AppVersion;

/// Environment variable overriding the base backoff delay, in milliseconds.
pub const BASE_DELAY_ENV: &str = "PUSHREG_BASE_DELAY_MS";

/// Environment variable setting the backoff cap, in milliseconds.
pub const MAX_DELAY_ENV: &str = "PUSHREG_MAX_DELAY_MS";

/// Configuration for a [`RegistrationManager`](crate::RegistrationManager).
///
/// All fields have sensible defaults. Use the builder pattern:
///
/// ```rust
/// use std::time::Duration;
/// use pushreg_core::RegistrationConfig;
///
/// let config = RegistrationConfig::new()
///     .app_version(42)
///     .base_delay(Duration::from_secs(30))
///     .max_delay(Duration::from_secs(600));
/// assert_eq!(config.get_app_version(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Version of the running application; cached tokens from other versions are stale.
    pub(crate) app_version: AppVersion,
    /// First retry delay after a transient failure.
    pub(crate) base_delay: Duration,
    /// Upper bound for the doubled delay. `None` doubles without limit.
    pub(crate) max_delay: Option<Duration>,
    /// Capacity of the command channel between handles and the event loop.
    pub(crate) command_buffer: usize,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationConfig {
    /// Create a new config with defaults.
    ///
    /// `PUSHREG_BASE_DELAY_MS` and `PUSHREG_MAX_DELAY_MS`, when set to a
    /// number of milliseconds, override the backoff defaults. Builder calls
    /// take precedence over both.
    pub fn new() -> Self {
        Self {
            app_version: 0,
            base_delay: env_millis(BASE_DELAY_ENV).unwrap_or(DEFAULT_BASE_DELAY),
            max_delay: env_millis(MAX_DELAY_ENV),
            command_buffer: 64,
        }
    }

    /// Set the running application version (default: 0).
    pub fn app_version(mut self, version: AppVersion) -> Self {
        self.app_version = version;
        self
    }

    /// Set the first retry delay (default: 60 s).
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Cap the retry delay.
    pub fn max_delay(mut self, cap: Duration) -> Self {
        self.max_delay = Some(cap);
        self
    }

    /// Remove any retry delay cap, including one from the environment.
    pub fn uncapped(mut self) -> Self {
        self.max_delay = None;
        self
    }

    /// Set the command channel capacity (default: 64).
    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity.max(1);
        self
    }

    pub fn get_app_version(&self) -> AppVersion {
        self.app_version
    }

    pub fn get_base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn get_max_delay(&self) -> Option<Duration> {
        self.max_delay
    }
}

fn env_millis(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            tracing::warn!(var, value = %raw, "ignoring invalid delay: {e}");
            None
        }
    }
}
