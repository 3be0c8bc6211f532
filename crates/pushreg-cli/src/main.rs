mod events;
mod register;
mod service;

use clap::{Parser, Subcommand};
use events::{emit, EventCache, EventCleared};
use pushreg_core::cache::{APP_VERSION_KEY, TOKEN_KEY};
use pushreg_core::{RegistrationConfig, RegistrationRecord, TokenCache};
use pushreg_store::{KeyValueStore, SqliteStore};
use service::DeviceCapability;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "pushreg", about = "Drive the push registration lifecycle")]
struct Cli {
    /// SQLite file holding the token cache.
    #[arg(long, default_value = "pushreg.db")]
    db: PathBuf,

    /// Namespace inside the database.
    #[arg(long, default_value = SqliteStore::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Version of the running application.
    #[arg(long, default_value = "1")]
    app_version: u32,

    /// First retry delay in ms (overrides PUSHREG_BASE_DELAY_MS).
    #[arg(long)]
    base_delay_ms: Option<u64>,

    /// Backoff cap in ms (overrides PUSHREG_MAX_DELAY_MS).
    #[arg(long)]
    max_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register against a simulated push service, retrying per the backoff policy.
    Register {
        /// Sender id to register for.
        #[arg(long)]
        sender_id: String,
        /// Number of transient failures before the service issues a token.
        #[arg(long, default_value = "0")]
        failures: u32,
        /// Simulated network latency per call in ms.
        #[arg(long, default_value = "200")]
        latency_ms: u64,
        /// Make the service refuse the sender with this reason.
        #[arg(long)]
        reject: Option<String>,
        /// Push service availability on the simulated device.
        #[arg(long, value_enum, default_value = "available")]
        capability: DeviceCapability,
        /// Give up after this many seconds.
        #[arg(long, default_value = "600")]
        timeout_s: u64,
    },

    /// Print the cached registration record.
    Show,

    /// Delete the cached registration record.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let start = Instant::now();
    let store = Arc::new(SqliteStore::open(&cli.db, &cli.namespace)?);

    match cli.command {
        Command::Register {
            sender_id,
            failures,
            latency_ms,
            reject,
            capability,
            timeout_s,
        } => {
            let mut config = RegistrationConfig::new().app_version(cli.app_version);
            if let Some(ms) = cli.base_delay_ms {
                config = config.base_delay(Duration::from_millis(ms));
            }
            if let Some(ms) = cli.max_delay_ms {
                config = config.max_delay(Duration::from_millis(ms));
            }

            register::run(
                store,
                config,
                register::RegisterConfig {
                    sender_id,
                    failures,
                    latency: Duration::from_millis(latency_ms),
                    reject,
                    capability,
                    timeout: Duration::from_secs(timeout_s),
                },
                start,
            )
            .await?;
        }

        Command::Show => {
            let token = store.get_string(TOKEN_KEY)?;
            let version = store.get_int(APP_VERSION_KEY)?;
            let record = match (token, version) {
                (Some(token), Some(version)) => u32::try_from(version)
                    .ok()
                    .map(|version| RegistrationRecord::new(token, version)),
                _ => None,
            };
            let valid = record
                .as_ref()
                .is_some_and(|r| r.is_valid_for(cli.app_version));

            emit(&EventCache {
                event: "cache",
                namespace: cli.namespace,
                record,
                valid,
                app_version: cli.app_version,
            });
        }

        Command::Clear => {
            TokenCache::new(store).clear()?;
            emit(&EventCleared {
                event: "cleared",
                namespace: cli.namespace,
            });
        }
    }

    Ok(())
}
