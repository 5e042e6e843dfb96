//! Per-user form state for the HTTP surface

use crate::handler::FormState;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct Session {
    form: FormState,
    last_touched: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            form: FormState::default(),
            last_touched: Instant::now(),
        }
    }
}

/// Independent form state per session, keyed by session id.
///
/// The classifier is shared across sessions; form values never are. Every
/// read or write refreshes the session, and idle sessions are dropped by
/// [`SessionStore::cleanup_expired`].
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session with an all-unset form
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(id, Session::new());
        id
    }

    /// Copy of the session's current form
    pub fn get(&self, id: &Uuid) -> Option<FormState> {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.last_touched = Instant::now();
            entry.form.clone()
        })
    }

    /// Mutate the session's form in place, returning the updated copy
    pub fn update<F>(&self, id: &Uuid, f: F) -> Option<FormState>
    where
        F: FnOnce(&mut FormState),
    {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.last_touched = Instant::now();
            f(&mut entry.form);
            entry.form.clone()
        })
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop sessions idle for at least `ttl`, returning how many were removed
    pub fn cleanup_expired(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.last_touched.elapsed() < ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
