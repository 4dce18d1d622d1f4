//! The connection identity registry.
//!
//! Maps a live connection to `(session code, host | player)`. This is the
//! only place a connection is tied to a session: players and sessions
//! refer to connections by [`ConnectionId`], and a connection never owns a
//! player. Resolving through this map is how an inbound frame finds its
//! session.
//!
//! # Concurrency note
//!
//! Plain `HashMap`, no internal locking. The server keeps one registry
//! behind a coarse mutex and only holds it for insert/remove/lookup.

use std::collections::HashMap;

use gameshow_protocol::SessionCode;
use gameshow_transport::ConnectionId;

use crate::{Identity, Role, SessionError};

/// Maps live connections to their session identity.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    bindings: HashMap<ConnectionId, Identity>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a connection to a session as host or player.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyBound`] if the connection already
    /// belongs to a session. The existing binding is left untouched.
    pub fn bind(
        &mut self,
        connection: ConnectionId,
        code: SessionCode,
        role: Role,
    ) -> Result<(), SessionError> {
        if let Some(existing) = self.bindings.get(&connection) {
            return Err(SessionError::AlreadyBound(
                connection,
                existing.code.clone(),
            ));
        }
        tracing::debug!(%connection, %code, %role, "connection bound");
        self.bindings.insert(connection, Identity { code, role });
        Ok(())
    }

    /// Looks up what a connection is bound to.
    pub fn resolve(&self, connection: ConnectionId) -> Option<&Identity> {
        self.bindings.get(&connection)
    }

    /// Like [`resolve`](Self::resolve), but as a `Result`.
    ///
    /// # Errors
    /// Returns [`SessionError::NotBound`] for an unknown connection.
    pub fn require(
        &self,
        connection: ConnectionId,
    ) -> Result<&Identity, SessionError> {
        self.resolve(connection)
            .ok_or(SessionError::NotBound(connection))
    }

    /// Removes a connection's binding, returning it if there was one.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<Identity> {
        let removed = self.bindings.remove(&connection);
        if let Some(identity) = &removed {
            tracing::debug!(%connection, code = %identity.code, "connection unbound");
        }
        removed
    }

    /// Drops every binding that points at `code`, returning the affected
    /// connections. Used when a session is removed.
    pub fn unbind_session(&mut self, code: &SessionCode) -> Vec<ConnectionId> {
        let mut removed: Vec<ConnectionId> = self
            .bindings
            .iter()
            .filter(|(_, identity)| &identity.code == code)
            .map(|(conn, _)| *conn)
            .collect();
        removed.sort();
        for conn in &removed {
            self.bindings.remove(conn);
        }
        removed
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no connection is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
