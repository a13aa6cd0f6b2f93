//! Session registry keyed by client-supplied identifier.

use std::collections::HashMap;

use super::Session;

/// Mapping from session identifier to [`Session`].
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<String, Session>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `session`, returning the session it replaced.
    ///
    /// The caller is responsible for closing the replaced session.
    pub fn insert(&mut self, session: Session) -> Option<Session> {
        self.sessions.insert(session.id().to_owned(), session)
    }

    /// Removes and returns the session registered as `id`.
    pub fn remove(&mut self, id: &str) -> Option<Session> {
        self.sessions.remove(id)
    }

    /// Looks up the session registered as `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Whether a session is registered as `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Iterates over registered sessions in no particular order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Removes and returns every session.
    pub fn drain(&mut self) -> Vec<Session> {
        self.sessions.drain().map(|(_, session)| session).collect()
    }

    /// Removes every session matching `predicate` and returns them.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&Session) -> bool) -> Vec<Session> {
        let doomed: Vec<String> = self
            .sessions
            .values()
            .filter(|session| predicate(session))
            .map(|session| session.id().to_owned())
            .collect();
        doomed
            .into_iter()
            .filter_map(|id| self.sessions.remove(&id))
            .collect()
    }
}
