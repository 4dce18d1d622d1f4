//! Wire protocol for Gameshow.
//!
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): a closed,
//!   tagged set of variants, one per inbound/outbound kind.
//! - **Records** ([`PlayerRef`], [`QuestionView`], ...): what those
//!   messages carry.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): text framing.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (text frames) → Protocol (ClientMessage) → Game (GameSession)
//! ```
//!
//! Nothing in here knows about connections or sessions; the engine's own
//! state never uses these types directly except as output.

mod client;
mod codec;
mod error;
mod server;
mod types;

pub use client::ClientMessage;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use server::ServerMessage;
pub use types::{
    FinalScore, OrderEntry, PackQuestionView, PackSummary, PlayerId, PlayerRef,
    QuestionView, RosterEntry, ScoreEntry, SessionCode, TextQuestionView,
    TimedResult,
};
