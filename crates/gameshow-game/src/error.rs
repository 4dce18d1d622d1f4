//! Error types for the game layer.
//!
//! The `Display` text of a [`GameError`] is what the offending connection
//! sees in its `error` message, so keep it readable.

use gameshow_protocol::{PlayerId, SessionCode};

use crate::Phase;

/// Errors from game-session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    // -- authorization ---------------------------------------------------
    #[error("Only the host can do that")]
    NotHost,

    #[error("You are not part of the tiebreak")]
    NotParticipant,

    /// The host tried something only players do (answering, leaving, ...).
    #[error("Only players can do that")]
    NotAPlayer,

    #[error("Only the player who selected this pack can do that")]
    NotPackOwner,

    // -- domain preconditions --------------------------------------------
    #[error("Game {0} not found")]
    SessionNotFound(SessionCode),

    #[error("Player name already taken")]
    NameTaken,

    #[error("Player name cannot be empty")]
    EmptyName,

    #[error("Need at least {0} players to start")]
    NotEnoughPlayers(usize),

    #[error("Game already in progress")]
    GameInProgress,

    #[error("No questions available")]
    NoQuestions,

    #[error("Pack {0} was already selected")]
    PackAlreadySelected(String),

    #[error("Pack {0} not found")]
    PackNotFound(String),

    #[error("Another pack is still in progress")]
    PackInProgress,

    #[error("No pack is in progress")]
    NoActivePack,

    #[error("You already answered this question")]
    AlreadyAnswered,

    #[error("You have been eliminated")]
    Eliminated,

    #[error("That question is no longer open")]
    StaleQuestion,

    #[error("Question {0} does not exist in this pack")]
    InvalidQuestionIndex(usize),

    /// The request doesn't fit where the game currently is.
    #[error("Not allowed during {phase}: {reason}")]
    WrongPhase { phase: Phase, reason: &'static str },

    #[error("You are already in a game")]
    AlreadyInSession,

    // -- silent ----------------------------------------------------------
    /// The caller doesn't resolve to a roster player. Never reported.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// The session actor has stopped.
    #[error("Game {0} is no longer available")]
    Unavailable(SessionCode),
}

impl GameError {
    /// Returns `true` for errors that are dropped instead of being sent
    /// back to the client.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::UnknownPlayer(_))
    }
}
