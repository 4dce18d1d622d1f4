//! Connection identity for Gameshow.
//!
//! Answers one question for every inbound frame: *which session is this
//! connection in, and is it the host or a player?*
//!
//! ```text
//! Game Layer (above)      ← receives frames already tagged with an Identity
//!     ↕
//! Identity Layer (this crate)  ← ConnectionId → (SessionCode, Role)
//!     ↕
//! Transport / Protocol (below) ← ConnectionId, SessionCode, PlayerId
//! ```
//!
//! There is no authentication: a player is whoever joined under a name.

mod error;
mod identity;
mod registry;

pub use error::SessionError;
pub use identity::{Identity, Role};
pub use registry::ConnectionRegistry;
