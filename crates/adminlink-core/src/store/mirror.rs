use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::event::InitSnapshot;
use crate::model::{Caller, Session, Settings};

/// Locally held copy of the console's collections.
///
/// Each collection sits behind its own `Arc`, so cloning a mirror is cheap
/// and an update only copies the collection it touches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mirror {
    pub sessions: Arc<Vec<Session>>,
    pub settings: Arc<Settings>,
    /// Banned addresses.
    pub banned_ips: Arc<HashSet<String>>,
    pub callers: Arc<Vec<Caller>>,
    /// Session id to display label.
    pub aliases: Arc<HashMap<String, String>>,
}

impl From<InitSnapshot> for Mirror {
    fn from(snapshot: InitSnapshot) -> Self {
        Self {
            sessions: Arc::new(snapshot.sessions),
            settings: Arc::new(snapshot.settings),
            banned_ips: Arc::new(snapshot.banned_ips.into_iter().collect()),
            callers: Arc::new(snapshot.callers),
            aliases: Arc::new(snapshot.aliases),
        }
    }
}
