use pushreg_core::{RegistrationRecord, RegistrationState};
use serde::Serialize;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// Emit a JSONL event to stdout (flushed immediately for piped output).
pub fn emit<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = writeln!(lock, "{json}");
        let _ = lock.flush();
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ── Session events ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventSession {
    pub event: &'static str,
    pub mode: &'static str,
    pub sender_id: String,
    pub app_version: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: Option<u64>,
    pub timestamp_ms: u64,
}

// ── Lifecycle events ────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventState {
    pub event: &'static str,
    pub state: RegistrationState,
    pub elapsed_s: f64,
}

#[derive(Serialize)]
pub struct EventOutcome {
    pub event: &'static str,
    /// "cached", "registered", "failed", "timeout" or "interrupted".
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
    pub elapsed_s: f64,
}

// ── Cache inspection ────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventCache {
    pub event: &'static str,
    pub namespace: String,
    pub record: Option<RegistrationRecord>,
    /// Whether `record` would be served to `app_version`.
    pub valid: bool,
    pub app_version: u32,
}

#[derive(Serialize)]
pub struct EventCleared {
    pub event: &'static str,
    pub namespace: String,
}
