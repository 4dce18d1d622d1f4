//! Unified error type for the Gameshow server.

use gameshow_game::GameError;
use gameshow_protocol::ProtocolError;
use gameshow_session::SessionError;
use gameshow_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GameshowError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A connection identity error (already bound, not bound).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A game rule or session lifecycle error.
    #[error(transparent)]
    Game(#[from] GameError),
}
