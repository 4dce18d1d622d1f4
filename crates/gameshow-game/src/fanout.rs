//! Broadcast fanout: turns `(Recipient, ServerMessage)` pairs into sends
//! on per-connection channels.
//!
//! Game logic never touches a connection. It returns an [`Outbox`] and the
//! session actor hands it to a [`Fanout`], which resolves each
//! [`Recipient`] against the session's roster at delivery time.
//!
//! Delivery is fire-and-forget: a connection whose receiver is gone is
//! skipped without retrying.

use std::collections::HashMap;

use gameshow_protocol::ServerMessage;
use gameshow_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::GameSession;

/// Channel sender feeding one connection's writer task.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// Who should receive an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connected player plus the host.
    All,
    /// Like `All`, minus one connection.
    AllExcept(ConnectionId),
    /// Connected, non-eliminated players plus the host.
    Active,
    /// Every connected player, not the host.
    Players,
    Host,
    /// A single connection (replies and acknowledgements).
    Connection(ConnectionId),
}

/// Messages produced by one handler call, in send order.
pub type Outbox = Vec<(Recipient, ServerMessage)>;

/// The outbound senders of one session's connections.
#[derive(Debug, Default)]
pub struct Fanout {
    senders: HashMap<ConnectionId, OutboundSender>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection: ConnectionId, sender: OutboundSender) {
        self.senders.insert(connection, sender);
    }

    pub fn unregister(&mut self, connection: ConnectionId) {
        self.senders.remove(&connection);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Delivers a whole outbox in order.
    pub fn deliver(&self, session: &GameSession, outbox: Outbox) {
        for (recipient, msg) in outbox {
            match recipient {
                Recipient::All => self.to_all(session, &msg, None),
                Recipient::AllExcept(excluded) => self.to_all(session, &msg, Some(excluded)),
                Recipient::Active => self.to_active(session, &msg, None),
                Recipient::Players => self.to_players(session, &msg),
                Recipient::Host => {
                    if let Some(host) = session.host_connection() {
                        self.to_one(host, msg);
                    }
                }
                Recipient::Connection(conn) => self.to_one(conn, msg),
            }
        }
    }

    /// Every connected player and the host, except `exclude`.
    pub fn to_all(&self, session: &GameSession, msg: &ServerMessage, exclude: Option<ConnectionId>) {
        let players = session.roster().iter().filter_map(|p| p.connection);
        for conn in players.chain(session.host_connection()) {
            if Some(conn) != exclude {
                self.to_one(conn, msg.clone());
            }
        }
    }

    /// Like [`to_all`](Self::to_all) but skips eliminated players.
    pub fn to_active(
        &self,
        session: &GameSession,
        msg: &ServerMessage,
        exclude: Option<ConnectionId>,
    ) {
        let players = session
            .roster()
            .iter()
            .filter(|p| !p.eliminated)
            .filter_map(|p| p.connection);
        for conn in players.chain(session.host_connection()) {
            if Some(conn) != exclude {
                self.to_one(conn, msg.clone());
            }
        }
    }

    fn to_players(&self, session: &GameSession, msg: &ServerMessage) {
        for conn in session.roster().iter().filter_map(|p| p.connection) {
            self.to_one(conn, msg.clone());
        }
    }

    /// Unicast. A no-op if the connection is unknown or closed.
    pub fn to_one(&self, connection: ConnectionId, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&connection) {
            if sender.send(msg).is_err() {
                tracing::debug!(%connection, "dropping message for closed connection");
            }
        }
    }
}
