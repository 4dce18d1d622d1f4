//! Game-show session engine for Gameshow.
//!
//! Each session runs as an isolated Tokio task (actor model) that owns a
//! [`GameSession`]: the `Lobby → Round1 → Round2 → Finished` state machine
//! with its Round-1 elimination, tiebreak, speed-order and Round-2 turn
//! controllers.
//!
//! # Key types
//!
//! - [`GameSession`]: synchronous state machine, returns an [`Outbox`]
//! - [`SessionHandle`]: send commands to a running session actor
//! - [`SessionRegistry`]: creates/looks up/removes sessions by code
//! - [`Fanout`] / [`Recipient`]: delivery of outbound messages
//! - [`QuestionBank`]: question content and its loader
//! - [`GameConfig`] / [`Phase`]: rules and lifecycle state

mod actor;
mod config;
pub mod content;
mod error;
mod fanout;
mod player;
mod registry;
mod round1;
mod round2;
mod session;
mod speed;
mod tiebreak;

pub use actor::{SessionHandle, SessionStatus};
pub use config::{GameConfig, Phase, Round2Stage, TimingSource};
pub use content::{ContentError, ContentPack, PackQuestion, Question, QuestionBank, SpeedQuestion};
pub use error::GameError;
pub use fanout::{Fanout, Outbox, OutboundSender, Recipient};
pub use player::{Player, Roster};
pub use registry::{DEFAULT_CHANNEL_SIZE, SessionRegistry, random_code};
pub use session::{GameSession, SessionInfo};
