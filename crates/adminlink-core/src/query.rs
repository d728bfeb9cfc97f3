// ── Derived queries ──
//
// Read-only projections over a mirror snapshot, computed on every call.

use crate::model::{Caller, Session};
use crate::store::Mirror;

/// Characters of the session id shown when no alias is set.
pub const ALIAS_FALLBACK_CHARS: usize = 8;

impl Mirror {
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn caller(&self, id: &str) -> Option<&Caller> {
        self.callers.iter().find(|c| c.id == id)
    }

    pub fn is_ip_banned(&self, ip: &str) -> bool {
        self.banned_ips.contains(ip)
    }

    pub fn sessions_by_liveness(&self, connected: bool) -> Vec<&Session> {
        self.sessions
            .iter()
            .filter(|s| s.connected == connected)
            .collect()
    }

    pub fn sessions_by_ip(&self, ip: &str) -> Vec<&Session> {
        self.sessions.iter().filter(|s| s.ip == ip).collect()
    }

    /// Sessions whose assignment points at `caller_id`, whether or not
    /// that caller is still mirrored.
    pub fn sessions_assigned_to(&self, caller_id: &str) -> Vec<&Session> {
        self.sessions
            .iter()
            .filter(|s| s.assigned_to.as_deref() == Some(caller_id))
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn live_session_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.connected).count()
    }

    /// Display label for a session id: the alias entry verbatim, else the
    /// first eight characters of the id.
    pub fn alias_for(&self, session_id: &str) -> String {
        match self.aliases.get(session_id) {
            Some(alias) => alias.clone(),
            None => session_id.chars().take(ALIAS_FALLBACK_CHARS).collect(),
        }
    }
}
