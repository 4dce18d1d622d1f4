//! Error types for the identity layer.

use gameshow_protocol::SessionCode;
use gameshow_transport::ConnectionId;

/// Errors from the connection identity registry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection isn't bound to any session.
    ///
    /// Handlers treat this as "nothing to do" rather than a failure.
    #[error("connection {0} is not in a session")]
    NotBound(ConnectionId),

    /// The connection already belongs to a session and can't create or
    /// join another one.
    #[error("connection {0} is already in session {1}")]
    AlreadyBound(ConnectionId, SessionCode),
}
