//! pushreg registration lifecycle.
//!
//! Registers a device with a push notification service, caches the token
//! per application version, and keeps the registration valid across
//! upgrades, transient failures and restarts.
//!
//! The platform pieces stay outside: a [`CapabilityCheck`] says whether the
//! push service is usable, a [`PushServiceClient`] performs the network
//! exchange, and a [`KeyValueStore`] persists the token.

pub mod availability;
pub mod backoff;
pub mod cache;
pub mod callback;
pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod runtime;
pub mod types;

pub use availability::{AlwaysAvailable, Availability, CapabilityCheck, ResolutionAction};
pub use backoff::{next_delay, BackoffScheduler, BackoffState, RetryTicket, DEFAULT_BASE_DELAY};
pub use cache::TokenCache;
pub use callback::{CallbackEvent, ChannelCallback, RegistrationCallback};
pub use client::PushServiceClient;
pub use config::RegistrationConfig;
pub use error::{PushServiceError, RegistrationError};
pub use manager::{ManagerEvent, RegistrationManager};
pub use pushreg_store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};
pub use runtime::{RegistrationCommand, RegistrationHandle, RegistrationRuntime};
pub use types::{AppVersion, FailureReason, RegisterStatus, RegistrationRecord, RegistrationState};
