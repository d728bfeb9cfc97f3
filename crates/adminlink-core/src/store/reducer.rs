// ── Event reducer ──
//
// (mirror, event) -> next mirror. Pure: no I/O, no logging, no notices.
// Collections are copied on write, so untouched collections keep their
// `Arc` identity across an update.

use std::sync::Arc;

use super::mirror::Mirror;
use crate::event::ServerEvent;
use crate::model::Keyed;

/// Apply one event. Returns `None` when the event leaves the mirror as is.
///
/// Events naming an absent session or caller are dropped, except
/// `session_created` and `caller_added`, which always append.
pub fn reduce(mirror: &Mirror, event: &ServerEvent) -> Option<Mirror> {
    let mut next = mirror.clone();

    let changed = match event {
        ServerEvent::Init(snapshot) => {
            next = Mirror::from(snapshot.clone());
            true
        }

        // ── Sessions ─────────────────────────────────────────────────
        ServerEvent::SessionCreated(session) => {
            Arc::make_mut(&mut next.sessions).push(session.clone());
            true
        }
        ServerEvent::SessionUpdated(session) => replace_all(&mut next.sessions, session),
        ServerEvent::SessionRemoved { session_id }
        | ServerEvent::SessionRemoveSuccess { session_id } => {
            remove_all(&mut next.sessions, session_id)
        }
        ServerEvent::SessionsCleared => {
            let had_any = !next.sessions.is_empty();
            if had_any {
                next.sessions = Arc::new(Vec::new());
            }
            had_any
        }
        ServerEvent::SessionAssigned { session_id, caller } => {
            update_where(&mut next.sessions, |s| s.id == *session_id, |s| {
                s.assigned_to = Some(caller.clone());
            })
        }
        ServerEvent::SessionUnassigned { session_id } => {
            update_where(&mut next.sessions, |s| s.id == *session_id, |s| {
                s.assigned_to = None;
            })
        }
        ServerEvent::AssignmentsCleared { caller, .. } => update_where(
            &mut next.sessions,
            |s| s.assigned_to.as_deref() == Some(caller.as_str()),
            |s| s.assigned_to = None,
        ),
        ServerEvent::AliasUpdated {
            session_id,
            alias: Some(alias),
        } => {
            let entry_changed = next.aliases.get(session_id) != Some(alias);
            if entry_changed {
                Arc::make_mut(&mut next.aliases).insert(session_id.clone(), alias.clone());
            }
            let overlaid = update_where(&mut next.sessions, |s| s.id == *session_id, |s| {
                s.alias = Some(alias.clone());
            });
            entry_changed || overlaid
        }
        ServerEvent::AliasUpdated {
            session_id,
            alias: None,
        } => {
            let removed = next.aliases.contains_key(session_id)
                && Arc::make_mut(&mut next.aliases).remove(session_id).is_some();
            let cleared = update_where(
                &mut next.sessions,
                |s| s.id == *session_id && s.alias.is_some(),
                |s| s.alias = None,
            );
            removed || cleared
        }

        // ── Settings ─────────────────────────────────────────────────
        ServerEvent::SettingsUpdated(settings) => {
            next.settings = Arc::new(settings.clone());
            true
        }

        // ── Bans ─────────────────────────────────────────────────────
        ServerEvent::IpBanned(ip) => {
            !next.banned_ips.contains(ip) && Arc::make_mut(&mut next.banned_ips).insert(ip.clone())
        }
        ServerEvent::IpUnbanned(ip) => {
            next.banned_ips.contains(ip) && Arc::make_mut(&mut next.banned_ips).remove(ip)
        }

        // ── Callers ──────────────────────────────────────────────────
        ServerEvent::CallerAdded(caller) => {
            Arc::make_mut(&mut next.callers).push(caller.clone());
            true
        }
        ServerEvent::CallerUpdated(caller) => replace_all(&mut next.callers, caller),
        ServerEvent::CallerDeleted { caller_id } => remove_all(&mut next.callers, caller_id),

        // ── Presentation / lifecycle only ────────────────────────────
        ServerEvent::SessionRemoveError { .. }
        | ServerEvent::AssignmentError { .. }
        | ServerEvent::RedirectError { .. }
        | ServerEvent::ForceLogout { .. } => false,
    };

    changed.then_some(next)
}

/// Replace every record whose id matches `record`'s.
fn replace_all<T: Keyed + Clone>(list: &mut Arc<Vec<T>>, record: &T) -> bool {
    update_where(list, |r| r.key() == record.key(), |r| *r = record.clone())
}

fn remove_all<T: Keyed + Clone>(list: &mut Arc<Vec<T>>, id: &str) -> bool {
    if !list.iter().any(|r| r.key() == id) {
        return false;
    }
    Arc::make_mut(list).retain(|r| r.key() != id);
    true
}

/// Apply `update` to every matching record, copying the list only when
/// something matches.
fn update_where<T: Clone>(
    list: &mut Arc<Vec<T>>,
    matches: impl Fn(&T) -> bool,
    update: impl FnMut(&mut T),
) -> bool {
    if !list.iter().any(&matches) {
        return false;
    }
    Arc::make_mut(list)
        .iter_mut()
        .filter(|r| matches(&**r))
        .for_each(update);
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::InitSnapshot;
    use crate::model::{Caller, Session, Settings};

    fn seeded() -> Mirror {
        Mirror::from(InitSnapshot {
            sessions: vec![
                Session::new("abc12345", "1.2.3.4", true),
                Session::new("def67890", "5.6.7.8", false),
            ],
            settings: Settings::default(),
            banned_ips: vec!["9.9.9.9".into()],
            callers: Vec::new(),
            aliases: HashMap::new(),
        })
    }

    #[test]
    fn untouched_collections_keep_identity() {
        let mirror = seeded();
        let next = reduce(&mirror, &ServerEvent::IpBanned("1.2.3.4".into())).unwrap();
        assert!(Arc::ptr_eq(&mirror.sessions, &next.sessions));
        assert!(Arc::ptr_eq(&mirror.callers, &next.callers));
        assert!(!Arc::ptr_eq(&mirror.banned_ips, &next.banned_ips));
    }

    #[test]
    fn duplicate_bans_are_no_ops() {
        let mirror = seeded();
        assert!(reduce(&mirror, &ServerEvent::IpBanned("9.9.9.9".into())).is_none());
        assert!(reduce(&mirror, &ServerEvent::IpUnbanned("7.7.7.7".into())).is_none());
    }

    #[test]
    fn mutations_on_absent_ids_are_dropped() {
        let mirror = seeded();
        for event in [
            ServerEvent::SessionUpdated(Session::new("ghost", "0.0.0.0", true)),
            ServerEvent::SessionRemoved {
                session_id: "ghost".into(),
            },
            ServerEvent::SessionAssigned {
                session_id: "ghost".into(),
                caller: "c1".into(),
            },
            ServerEvent::CallerDeleted {
                caller_id: "c9".into(),
            },
        ] {
            assert!(reduce(&mirror, &event).is_none(), "{event:?} mutated the mirror");
        }
    }

    #[test]
    fn session_updated_replaces_whole_record() {
        let mirror = reduce(
            &seeded(),
            &ServerEvent::SessionAssigned {
                session_id: "abc12345".into(),
                caller: "c1".into(),
            },
        )
        .unwrap();

        let next = reduce(
            &mirror,
            &ServerEvent::SessionUpdated(Session::new("abc12345", "1.2.3.4", false)),
        )
        .unwrap();
        let session = &next.sessions[0];
        assert!(!session.connected);
        assert_eq!(session.assigned_to, None);
    }

    #[test]
    fn alias_is_created_on_demand_on_an_empty_mirror() {
        let next = reduce(
            &Mirror::default(),
            &ServerEvent::AliasUpdated {
                session_id: "abc12345".into(),
                alias: Some("front desk".into()),
            },
        )
        .unwrap();
        assert_eq!(next.aliases["abc12345"], "front desk");
        assert!(next.sessions.is_empty());
    }

    #[test]
    fn alias_overlays_present_session() {
        let next = reduce(
            &seeded(),
            &ServerEvent::AliasUpdated {
                session_id: "def67890".into(),
                alias: Some("vip".into()),
            },
        )
        .unwrap();
        assert_eq!(next.sessions[1].alias.as_deref(), Some("vip"));
    }

    #[test]
    fn null_alias_removes_entry_and_overlay() {
        let mut session = Session::new("abc12345xyz", "1.2.3.4", true);
        session.alias = Some("front desk".into());
        let mirror = Mirror::from(InitSnapshot {
            sessions: vec![session],
            aliases: HashMap::from([("abc12345xyz".to_owned(), "front desk".to_owned())]),
            ..InitSnapshot::default()
        });

        let next = reduce(
            &mirror,
            &ServerEvent::AliasUpdated {
                session_id: "abc12345xyz".into(),
                alias: None,
            },
        )
        .unwrap();
        assert!(!next.aliases.contains_key("abc12345xyz"));
        assert_eq!(next.sessions[0].alias, None);
        assert_eq!(next.alias_for("abc12345xyz"), "abc12345");

        // Already gone: nothing to do.
        assert!(
            reduce(
                &next,
                &ServerEvent::AliasUpdated {
                    session_id: "abc12345xyz".into(),
                    alias: None,
                },
            )
            .is_none()
        );
    }

    #[test]
    fn init_replaces_everything() {
        let caller: Caller = serde_json::from_value(serde_json::json!({ "id": "c1" })).unwrap();
        let mirror = reduce(&seeded(), &ServerEvent::CallerAdded(caller)).unwrap();
        assert_eq!(mirror.callers.len(), 1);

        let next = reduce(&mirror, &ServerEvent::Init(InitSnapshot::default())).unwrap();
        assert_eq!(next, Mirror::default());
    }

    #[test]
    fn notices_and_logout_do_not_mutate() {
        let mirror = seeded();
        assert!(reduce(&mirror, &ServerEvent::ForceLogout { reason: None }).is_none());
        assert!(
            reduce(
                &mirror,
                &ServerEvent::AssignmentError {
                    error: "x".into()
                }
            )
            .is_none()
        );
    }
}
