//! # Gameshow
//!
//! A live multi-player trivia game-show server.
//!
//! A host creates a session and shares its code; players join by code and
//! name. The host then drives the game through Round 1 (multiple choice,
//! one elimination, tiebreak on a shared lowest score), a speed question
//! that fixes the Round-2 turn order, and Round 2 (players pick themed
//! packs on their turn) until a winner is announced.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gameshow::prelude::*;
//!
//! # async fn run() -> Result<(), GameshowError> {
//! let server = GameshowServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .questions_dir("questions")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::GameshowError;
pub use server::{GameshowServer, GameshowServerBuilder, ServerConfig};

/// Re-exports for the common case.
pub mod prelude {
    pub use crate::{GameshowError, GameshowServer, GameshowServerBuilder, ServerConfig};
    pub use gameshow_game::{GameConfig, Phase, QuestionBank, TimingSource};
    pub use gameshow_protocol::{ClientMessage, PlayerId, ServerMessage, SessionCode};
}
