// ── User-facing notices ──
//
// The presentation half of event handling. The reducer never looks at
// these; the controller derives them from the same events and publishes
// them on a broadcast channel.

use std::fmt;

use crate::event::ServerEvent;

/// Something the operator should be told about.
///
/// Command rejections carry no correlation id: a notice cannot be tied
/// back to the call that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    AssignmentFailed { error: String },
    RedirectFailed { session_id: Option<String>, error: String },
    SessionRemoveFailed { session_id: Option<String>, error: String },
    /// The console ended this login. The stored credential is gone and the
    /// consumer should return to its signed-out entry point.
    ForcedLogout { reason: Option<String> },
}

impl Notice {
    pub fn from_event(event: &ServerEvent) -> Option<Self> {
        match event {
            ServerEvent::AssignmentError { error } => Some(Self::AssignmentFailed {
                error: error.clone(),
            }),
            ServerEvent::RedirectError { session_id, error } => Some(Self::RedirectFailed {
                session_id: session_id.clone(),
                error: error.clone(),
            }),
            ServerEvent::SessionRemoveError { session_id, error } => {
                Some(Self::SessionRemoveFailed {
                    session_id: session_id.clone(),
                    error: error.clone(),
                })
            }
            ServerEvent::ForceLogout { reason } => Some(Self::ForcedLogout {
                reason: reason.clone(),
            }),
            _ => None,
        }
    }

    /// Whether the connection is gone for good after this notice.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ForcedLogout { .. })
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssignmentFailed { error } => write!(f, "Assignment failed: {error}"),
            Self::RedirectFailed {
                session_id: Some(id),
                error,
            } => write!(f, "Redirect of {id} failed: {error}"),
            Self::RedirectFailed { error, .. } => write!(f, "Redirect failed: {error}"),
            Self::SessionRemoveFailed {
                session_id: Some(id),
                error,
            } => write!(f, "Removing session {id} failed: {error}"),
            Self::SessionRemoveFailed { error, .. } => write!(f, "Session removal failed: {error}"),
            Self::ForcedLogout { reason: Some(reason) } => write!(f, "Logged out by console: {reason}"),
            Self::ForcedLogout { reason: None } => f.write_str("Logged out by console"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejections_and_logout_become_notices() {
        assert_eq!(
            Notice::from_event(&ServerEvent::AssignmentError {
                error: "busy".into()
            }),
            Some(Notice::AssignmentFailed {
                error: "busy".into()
            })
        );
        assert_eq!(Notice::from_event(&ServerEvent::IpBanned("1.2.3.4".into())), None);
        assert!(
            Notice::from_event(&ServerEvent::ForceLogout { reason: None })
                .is_some_and(|n| n.is_terminal())
        );
    }

    #[test]
    fn display() {
        let notice = Notice::RedirectFailed {
            session_id: Some("abc".into()),
            error: "no such page".into(),
        };
        assert_eq!(notice.to_string(), "Redirect of abc failed: no such page");
        assert_eq!(
            Notice::ForcedLogout {
                reason: Some("revoked".into())
            }
            .to_string(),
            "Logged out by console: revoked"
        );
    }
}
