//! What a connection resolves to: a session code and a role in it.

use std::fmt;

use gameshow_protocol::{PlayerId, SessionCode};

/// The part a connection plays in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The connection that created the session.
    Host,
    /// A joined player.
    Player(PlayerId),
}

impl Role {
    /// Returns `true` for the host.
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }

    /// Returns the player id, or `None` for the host.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Self::Host => None,
            Self::Player(id) => Some(*id),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Player(id) => write!(f, "{id}"),
        }
    }
}

/// A live connection's binding: which session, and as whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub code: SessionCode,
    pub role: Role,
}
