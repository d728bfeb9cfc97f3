// ── Command dispatcher ──
//
// Turns commands into outbound socket events. Holds the current socket
// handle in an `ArcSwapOption` so the controller can attach and detach
// connections while any number of callers dispatch concurrently.

use std::sync::Arc;

use adminlink_api::SocketHandle;
use arc_swap::ArcSwapOption;
use serde_json::Value;
use tracing::{debug, warn};

use crate::command::{Command, RedirectRequest};
use crate::model::Settings;

/// Fire-and-forget command sender.
///
/// Every method returns whether an event was handed to the socket. When no
/// connection is established nothing is sent and nothing is queued.
#[derive(Default)]
pub struct Dispatcher {
    socket: ArcSwapOption<SocketHandle>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route future commands through `socket`.
    pub fn attach(&self, socket: SocketHandle) {
        self.socket.store(Some(Arc::new(socket)));
    }

    /// Stop routing commands anywhere.
    pub fn detach(&self) {
        self.socket.store(None);
    }

    pub fn is_connected(&self) -> bool {
        self.socket
            .load()
            .as_ref()
            .is_some_and(|socket| socket.is_connected())
    }

    pub fn dispatch(&self, command: &Command) -> bool {
        let name = command.name();
        let guard = self.socket.load();
        let Some(socket) = guard.as_ref() else {
            debug!(command = name, "no connection, command dropped");
            return false;
        };

        let payload = match command.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(command = name, error = %e, "cannot build command payload");
                return false;
            }
        };

        let sent = socket.emit(name, payload);
        if sent {
            debug!(command = name, "command dispatched");
        } else {
            debug!(command = name, "not connected, command dropped");
        }
        sent
    }

    // ── Callers ──────────────────────────────────────────────────────

    pub fn add_caller(&self, data: Value) -> bool {
        self.dispatch(&Command::AddCaller { data })
    }

    pub fn update_caller(&self, id: &str, data: Value) -> bool {
        self.dispatch(&Command::UpdateCaller {
            id: id.to_owned(),
            data,
        })
    }

    pub fn delete_caller(&self, id: &str) -> bool {
        self.dispatch(&Command::DeleteCaller { id: id.to_owned() })
    }

    // ── Sessions ─────────────────────────────────────────────────────

    pub fn set_alias(&self, session_id: &str, alias: &str) -> bool {
        self.dispatch(&Command::SetAlias {
            session_id: session_id.to_owned(),
            alias: alias.to_owned(),
        })
    }

    pub fn remove_session(&self, session_id: &str) -> bool {
        self.dispatch(&Command::RemoveSession {
            session_id: session_id.to_owned(),
        })
    }

    pub fn redirect_user(&self, request: RedirectRequest) -> bool {
        self.dispatch(&Command::RedirectUser(request))
    }

    pub fn clear_sessions(&self) -> bool {
        self.dispatch(&Command::ClearSessions)
    }

    pub fn assign_session(&self, session_id: &str, caller_id: &str) -> bool {
        self.dispatch(&Command::AssignSession {
            session_id: session_id.to_owned(),
            caller_id: caller_id.to_owned(),
        })
    }

    pub fn unassign_session(&self, session_id: &str) -> bool {
        self.dispatch(&Command::UnassignSession {
            session_id: session_id.to_owned(),
        })
    }

    // ── Bans ─────────────────────────────────────────────────────────

    pub fn ban_ip(&self, ip: &str) -> bool {
        self.dispatch(&Command::BanIp { ip: ip.to_owned() })
    }

    pub fn unban_ip(&self, ip: &str) -> bool {
        self.dispatch(&Command::UnbanIp { ip: ip.to_owned() })
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn update_settings(&self, settings: Settings) -> bool {
        self.dispatch(&Command::UpdateSettings(settings))
    }
}
