/// The registration event loop.
///
/// A single task that owns the manager and multiplexes application
/// commands with attempt completions and retry timers.
use tokio::sync::mpsc;

use crate::manager::{ManagerEvent, RegistrationManager};

use super::RegistrationCommand;

/// Main event loop. Owns the registration state.
pub(super) async fn registration_loop(
    mut manager: RegistrationManager,
    mut cmd_rx: mpsc::Receiver<RegistrationCommand>,
    mut events_rx: mpsc::UnboundedReceiver<ManagerEvent>,
) {
    tracing::debug!(app_version = manager.app_version(), "registration loop started");

    loop {
        tokio::select! {
            // ── 1. Application commands ─────────────────────────
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    // Every handle dropped.
                    break;
                };
                if !handle_command(&mut manager, cmd) {
                    break;
                }
            }

            // ── 2. Attempt completions and retry timers ─────────
            Some(event) = events_rx.recv() => {
                manager.handle_event(event);
            }
        }
    }

    manager.shutdown();
    tracing::debug!("registration loop stopped");
}

/// Apply one command. Returns false on shutdown.
fn handle_command(manager: &mut RegistrationManager, cmd: RegistrationCommand) -> bool {
    match cmd {
        RegistrationCommand::Register {
            sender_id,
            callback,
            reply,
        } => {
            let _ = reply.send(manager.register(&sender_id, callback));
        }
        RegistrationCommand::Pause { reply } => {
            manager.pause();
            let _ = reply.send(());
        }
        RegistrationCommand::SetDelay { delay } => manager.set_delay(delay),
        RegistrationCommand::GetDelay { reply } => {
            let _ = reply.send(manager.delay());
        }
        RegistrationCommand::GetCurrentDelay { reply } => {
            let _ = reply.send(manager.current_delay());
        }
        RegistrationCommand::GetSenderId { reply } => {
            let _ = reply.send(manager.sender_id().to_string());
        }
        RegistrationCommand::GetToken { reply } => {
            let _ = reply.send(manager.token().map(str::to_string));
        }
        RegistrationCommand::Invalidate { reply } => {
            let _ = reply.send(manager.invalidate());
        }
        RegistrationCommand::Shutdown => return false,
    }
    true
}
