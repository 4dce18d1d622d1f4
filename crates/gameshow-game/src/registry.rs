//! Session registry: creates, tracks, and removes game sessions by code.

use std::collections::HashMap;
use std::sync::Arc;

use gameshow_protocol::SessionCode;
use gameshow_transport::ConnectionId;
use rand::Rng;

use crate::actor::spawn_session;
use crate::fanout::OutboundSender;
use crate::{GameConfig, QuestionBank, SessionHandle};

/// Default command channel size for session actors.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// All live sessions, keyed by code.
///
/// Plain data; the server keeps it behind a mutex and clones a
/// [`SessionHandle`] out before awaiting on it.
pub struct SessionRegistry {
    sessions: HashMap<SessionCode, SessionHandle>,
    config: GameConfig,
    bank: Arc<QuestionBank>,
    channel_size: usize,
}

impl SessionRegistry {
    pub fn new(config: GameConfig, bank: Arc<QuestionBank>) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
            bank,
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Sets the command channel size for sessions created from now on.
    pub fn with_channel_size(mut self, channel_size: usize) -> Self {
        self.channel_size = channel_size.max(1);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Creates a lobby hosted by `host` under a fresh, unused code.
    ///
    /// Must be called from within a Tokio runtime (spawns the actor).
    pub fn create(&mut self, host: ConnectionId, host_sender: OutboundSender) -> SessionHandle {
        let length = self.config.code_length.max(1);
        let code = self.unused_code(|| random_code(length));
        let handle = spawn_session(
            code.clone(),
            host,
            host_sender,
            self.config.clone(),
            Arc::clone(&self.bank),
            self.channel_size,
        );
        self.sessions.insert(code.clone(), handle.clone());
        tracing::info!(%code, %host, sessions = self.sessions.len(), "session created");
        handle
    }

    /// Draws codes until one isn't in use.
    fn unused_code(&self, mut generate: impl FnMut() -> SessionCode) -> SessionCode {
        loop {
            let code = generate();
            if !self.sessions.contains_key(&code) {
                return code;
            }
            tracing::debug!(%code, "session code collision, regenerating");
        }
    }

    pub fn get(&self, code: &SessionCode) -> Option<SessionHandle> {
        self.sessions.get(code).cloned()
    }

    /// Removes a session. The actor stops on its own once closed; call
    /// [`SessionHandle::shutdown`] to force it.
    pub fn remove(&mut self, code: &SessionCode) -> Option<SessionHandle> {
        let removed = self.sessions.remove(code);
        if removed.is_some() {
            tracing::info!(%code, sessions = self.sessions.len(), "session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn codes(&self) -> Vec<SessionCode> {
        self.sessions.keys().cloned().collect()
    }

    /// Cloned handles to every session, for shutdown or diagnostics
    /// without holding the registry lock.
    pub fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.values().cloned().collect()
    }
}

/// A random code of `length` characters from `A-Z0-9`.
pub fn random_code(length: usize) -> SessionCode {
    let mut rng = rand::rng();
    let code: String = (0..length)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect();
    SessionCode::new(code)
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(GameConfig::default(), Arc::new(QuestionBank::builtin()))
    }

    #[test]
    fn test_random_code_shape() {
        for _ in 0..50 {
            let code = random_code(6);
            assert_eq!(code.as_str().len(), 6);
            assert!(
                code.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            );
        }
    }

    #[tokio::test]
    async fn test_unused_code_skips_collisions() {
        let mut reg = registry();
        let (tx, _rx) = mpsc::unbounded_channel();
        let taken = reg.create(ConnectionId::new(1), tx).code().clone();

        let mut script = vec![SessionCode::new("FRESH1"), taken.clone()];
        let code = reg.unused_code(|| script.pop().unwrap_or_else(|| SessionCode::new("NEVER")));

        assert_eq!(code, SessionCode::new("FRESH1"));
        assert_ne!(code, taken);
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let mut reg = registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = reg.create(ConnectionId::new(1), tx);
        let code = handle.code().clone();

        assert_eq!(reg.len(), 1);
        assert!(reg.get(&code).is_some());
        assert!(matches!(
            rx.recv().await,
            Some(gameshow_protocol::ServerMessage::SessionCreated { code: c }) if c == code
        ));

        assert!(reg.remove(&code).is_some());
        assert!(reg.get(&code).is_none());
        assert!(reg.remove(&code).is_none());
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn test_codes_are_unique_across_sessions() {
        let mut reg = registry();
        for i in 0..20 {
            let (tx, _rx) = mpsc::unbounded_channel();
            reg.create(ConnectionId::new(i), tx);
        }
        let mut codes = reg.codes();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 20);
    }
}
