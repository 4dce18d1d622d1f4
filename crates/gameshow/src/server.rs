//! `GameshowServer` builder and server loop.
//!
//! This is the entry point for running a game-show server. It ties
//! together all the layers: transport → protocol → identity → game.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gameshow_game::{DEFAULT_CHANNEL_SIZE, GameConfig, QuestionBank, SessionRegistry};
use gameshow_protocol::{Codec, JsonCodec};
use gameshow_session::ConnectionRegistry;
use gameshow_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::GameshowError;
use crate::handler::handle_connection;

/// Network-facing settings. Game rules live in [`GameConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// A connection that sends nothing for this long is dropped.
    pub idle_timeout: Duration,
    /// Command queue size of each session actor.
    pub channel_size: usize,
    /// Where the question files live. `None` uses the built-in set.
    pub questions_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            idle_timeout: Duration::from_secs(10 * 60),
            channel_size: DEFAULT_CHANNEL_SIZE,
            questions_dir: Some(PathBuf::from("questions")),
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Both
/// registries are plain maps behind a coarse lock; neither lock is held
/// while waiting on a session actor.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionRegistry>,
    pub(crate) connections: Mutex<ConnectionRegistry>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Gameshow server.
///
/// # Example
///
/// ```rust,ignore
/// use gameshow::prelude::*;
///
/// let server = GameshowServer::builder()
///     .bind("0.0.0.0:8080")
///     .questions_dir("questions")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct GameshowServerBuilder {
    config: ServerConfig,
    game: GameConfig,
    bank: Option<QuestionBank>,
}

impl GameshowServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            game: GameConfig::default(),
            bank: None,
        }
    }

    /// Replaces all network settings at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the game rules every new session starts with.
    pub fn game_config(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn channel_size(mut self, size: usize) -> Self {
        self.config.channel_size = size;
        self
    }

    /// Loads question content from `dir` at build time.
    pub fn questions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.questions_dir = Some(dir.into());
        self
    }

    /// Uses `bank` as-is instead of loading from disk.
    pub fn question_bank(mut self, bank: QuestionBank) -> Self {
        self.bank = Some(bank);
        self
    }

    /// Loads content, binds the listener and returns the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<GameshowServer<JsonCodec>, GameshowError> {
        let bank = match (self.bank, &self.config.questions_dir) {
            (Some(bank), _) => bank,
            (None, Some(dir)) => QuestionBank::load_dir(dir),
            (None, None) => QuestionBank::builtin(),
        };
        tracing::info!(
            questions = bank.questions.len(),
            speed_questions = bank.speed_questions.len(),
            packs = bank.packs.len(),
            "question bank ready"
        );

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let sessions = SessionRegistry::new(self.game, Arc::new(bank))
            .with_channel_size(self.config.channel_size);
        let state = Arc::new(ServerState {
            sessions: Mutex::new(sessions),
            connections: Mutex::new(ConnectionRegistry::new()),
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(GameshowServer { transport, state })
    }
}

impl Default for GameshowServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Gameshow server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GameshowServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl GameshowServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> GameshowServerBuilder {
        GameshowServerBuilder::new()
    }
}

impl<C: Codec> GameshowServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), GameshowError> {
        tracing::info!(addr = ?self.local_addr().ok(), "gameshow server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
