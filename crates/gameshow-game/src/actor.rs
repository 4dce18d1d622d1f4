//! Session actor: one Tokio task per game session.
//!
//! The actor owns the [`GameSession`] and the [`Fanout`] for its
//! connections. Everything else talks to it through a [`SessionHandle`],
//! so one session's state is only ever touched by one task and commands
//! are handled strictly one after another.

use std::sync::Arc;
use std::time::Instant;

use gameshow_protocol::{ClientMessage, PlayerId, ServerMessage, SessionCode};
use gameshow_session::Role;
use gameshow_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::fanout::{Fanout, OutboundSender, Recipient};
use crate::{GameConfig, GameError, GameSession, QuestionBank, SessionInfo};

/// Whether a session is still alive after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Open,
    /// Nobody is left; the actor has stopped and the session should be
    /// removed from the registry.
    Closed,
}

/// Commands sent to a session actor.
///
/// Each carries a reply channel; callers wait for the reply before
/// reading their connection's next frame, which keeps per-connection
/// ordering.
pub(crate) enum SessionCommand {
    Join {
        connection: ConnectionId,
        name: String,
        sender: OutboundSender,
        reply: oneshot::Sender<Result<PlayerId, GameError>>,
    },

    /// A client message from an already-bound connection.
    Client {
        connection: ConnectionId,
        role: Role,
        msg: ClientMessage,
        received_at: Instant,
        reply: oneshot::Sender<Result<SessionStatus, GameError>>,
    },

    Disconnect {
        connection: ConnectionId,
        reply: oneshot::Sender<SessionStatus>,
    },

    Info {
        reply: oneshot::Sender<SessionInfo>,
    },

    Shutdown,
}

/// Handle to a running session actor.
///
/// Cheap to clone. The [`SessionRegistry`](crate::SessionRegistry) holds
/// one per session; connection handlers clone it out before awaiting.
#[derive(Clone)]
pub struct SessionHandle {
    code: SessionCode,
    sender: mpsc::Sender<SessionCommand>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Joins (or rejoins) the session under `name`.
    pub async fn join(
        &self,
        connection: ConnectionId,
        name: impl Into<String>,
        sender: OutboundSender,
    ) -> Result<PlayerId, GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Join {
            connection,
            name: name.into(),
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Hands a client message to the session and waits until it has been
    /// fully handled.
    ///
    /// The time of this call is what the session uses as the message's
    /// arrival time.
    pub async fn dispatch(
        &self,
        connection: ConnectionId,
        role: Role,
        msg: ClientMessage,
    ) -> Result<SessionStatus, GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Client {
            connection,
            role,
            msg,
            received_at: Instant::now(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Reports a closed connection.
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<SessionStatus, GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Disconnect { connection, reply })
            .await?;
        rx.await.map_err(|_| self.unavailable())
    }

    pub async fn info(&self) -> Result<SessionInfo, GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Info { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Stops the actor.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), GameError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> GameError {
        GameError::Unavailable(self.code.clone())
    }
}

struct SessionActor {
    session: GameSession,
    fanout: Fanout,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl SessionActor {
    async fn run(mut self) {
        let code = self.session.code().clone();
        tracing::info!(%code, "session actor started");

        while let Some(cmd) = self.receiver.recv().await {
            let status = match cmd {
                SessionCommand::Join {
                    connection,
                    name,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(connection, &name, sender);
                    let _ = reply.send(result);
                    SessionStatus::Open
                }
                SessionCommand::Client {
                    connection,
                    role,
                    msg,
                    received_at,
                    reply,
                } => {
                    let result = self.handle_client(connection, role, msg, received_at);
                    let status = self.status();
                    let _ = reply.send(result.map(|()| status));
                    status
                }
                SessionCommand::Disconnect { connection, reply } => {
                    let out = self.session.disconnect(connection);
                    self.fanout.unregister(connection);
                    self.fanout.deliver(&self.session, out);
                    let status = self.status();
                    let _ = reply.send(status);
                    status
                }
                SessionCommand::Info { reply } => {
                    let _ = reply.send(self.session.info());
                    SessionStatus::Open
                }
                SessionCommand::Shutdown => SessionStatus::Closed,
            };
            if status == SessionStatus::Closed {
                break;
            }
        }

        tracing::info!(%code, "session actor stopped");
    }

    fn handle_join(
        &mut self,
        connection: ConnectionId,
        name: &str,
        sender: OutboundSender,
    ) -> Result<PlayerId, GameError> {
        match self.session.join(connection, name) {
            Ok((player_id, out)) => {
                self.fanout.register(connection, sender);
                self.fanout.deliver(&self.session, out);
                Ok(player_id)
            }
            Err(e) => {
                // The connection isn't registered yet, so reply directly.
                let _ = sender.send(ServerMessage::error(e.to_string()));
                Err(e)
            }
        }
    }

    fn handle_client(
        &mut self,
        connection: ConnectionId,
        role: Role,
        msg: ClientMessage,
        received_at: Instant,
    ) -> Result<(), GameError> {
        let kind = msg.kind();
        match self.session.handle(connection, role, msg, received_at) {
            Ok(out) => {
                self.fanout.deliver(&self.session, out);
                Ok(())
            }
            Err(e) if e.is_silent() => {
                tracing::debug!(code = %self.session.code(), %connection, kind, error = %e, "ignored");
                Err(e)
            }
            Err(e) => {
                tracing::debug!(code = %self.session.code(), %connection, kind, error = %e, "rejected");
                self.fanout.deliver(
                    &self.session,
                    vec![(Recipient::Connection(connection), ServerMessage::error(e.to_string()))],
                );
                Err(e)
            }
        }
    }

    fn status(&self) -> SessionStatus {
        if self.session.is_closed() {
            SessionStatus::Closed
        } else {
            SessionStatus::Open
        }
    }
}

/// Spawns a session actor hosted by `host` and returns its handle.
///
/// The host immediately receives `session_created`. `channel_size` bounds
/// the command queue.
pub(crate) fn spawn_session(
    code: SessionCode,
    host: ConnectionId,
    host_sender: OutboundSender,
    config: GameConfig,
    bank: Arc<QuestionBank>,
    channel_size: usize,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let session = GameSession::new(code.clone(), host, config, bank);
    let mut fanout = Fanout::new();
    fanout.register(host, host_sender);
    fanout.to_one(host, ServerMessage::SessionCreated { code: code.clone() });

    let actor = SessionActor {
        session,
        fanout,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    SessionHandle { code, sender: tx }
}
