//! Per-connection handler: decode, route, and clean up.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound queue. The
//! flow is:
//!   1. Spawn the writer (outbound `ServerMessage`s → text frames)
//!   2. Loop: receive a frame → decode → route to the registry or the
//!      session actor the connection is bound to
//!   3. On close or idle timeout, report the disconnect to the session

use std::sync::Arc;

use gameshow_game::{GameError, OutboundSender, SessionHandle, SessionStatus};
use gameshow_protocol::{ClientMessage, Codec, ServerMessage, SessionCode};
use gameshow_session::Role;
use gameshow_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::GameshowError;
use crate::server::ServerState;

/// Drop guard that reports the connection's disconnect when the handler
/// exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async work.
struct ConnectionGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            disconnect(&state, conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), GameshowError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (outbound, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(conn.clone(), rx, Arc::clone(&state)));
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    loop {
        let text = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(text))) => text,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, dropping");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
                continue;
            }
        };

        route(&state, conn_id, &outbound, msg).await;
    }

    writer.abort();
    let _ = conn.close().await;
    // _guard drops here → disconnect fires.
    Ok(())
}

/// Encodes and sends everything queued for one connection.
async fn write_loop<C: Codec>(
    conn: WebSocketConnection,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    while let Some(msg) = rx.recv().await {
        let text = match state.codec.encode(&msg) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = conn.send(&text).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Routes one decoded message.
///
/// Create and join go to the session registry; everything else goes to
/// the session the connection is bound to. Messages from unbound
/// connections are ignored.
async fn route<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    outbound: &OutboundSender,
    msg: ClientMessage,
) {
    let kind = msg.kind();
    match msg {
        ClientMessage::CreateSession => create_session(state, conn_id, outbound).await,
        ClientMessage::JoinSession { code, name } => {
            join_session(state, conn_id, outbound, &code, name).await;
        }
        msg => {
            let identity = state.connections.lock().await.resolve(conn_id).cloned();
            let Some(identity) = identity else {
                tracing::debug!(%conn_id, kind, "message from unbound connection ignored");
                return;
            };
            let handle = state.sessions.lock().await.get(&identity.code);
            let Some(handle) = handle else {
                tracing::debug!(%conn_id, code = %identity.code, "session gone, unbinding");
                state.connections.lock().await.unbind(conn_id);
                return;
            };

            let leaving = matches!(msg, ClientMessage::LeaveGame);
            match handle.dispatch(conn_id, identity.role, msg).await {
                Ok(SessionStatus::Closed) | Err(GameError::Unavailable(_)) => {
                    close_session(state, &identity.code).await;
                }
                Ok(SessionStatus::Open) if leaving => {
                    state.connections.lock().await.unbind(conn_id);
                    release(state, &handle, conn_id).await;
                }
                Ok(SessionStatus::Open) => {}
                // The actor already told the client.
                Err(_) => {}
            }
        }
    }
}

async fn create_session<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    outbound: &OutboundSender,
) {
    if already_bound(state, conn_id, outbound).await {
        return;
    }
    let handle = state.sessions.lock().await.create(conn_id, outbound.clone());
    if let Err(e) = state
        .connections
        .lock()
        .await
        .bind(conn_id, handle.code().clone(), Role::Host)
    {
        tracing::warn!(%conn_id, error = %e, "host binding failed");
    }
}

async fn join_session<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    outbound: &OutboundSender,
    code: &str,
    name: String,
) {
    if already_bound(state, conn_id, outbound).await {
        return;
    }
    let code = SessionCode::normalized(code);
    let handle = state.sessions.lock().await.get(&code);
    let Some(handle) = handle else {
        tracing::debug!(%conn_id, %code, "join for unknown session");
        send_error(outbound, &GameError::SessionNotFound(code));
        return;
    };

    match handle.join(conn_id, name, outbound.clone()).await {
        Ok(player_id) => {
            if let Err(e) = state
                .connections
                .lock()
                .await
                .bind(conn_id, code, Role::Player(player_id))
            {
                tracing::warn!(%conn_id, error = %e, "player binding failed");
            }
        }
        Err(e @ GameError::Unavailable(_)) => {
            send_error(outbound, &e);
            close_session(state, &code).await;
        }
        // The actor already told the client.
        Err(e) => tracing::debug!(%conn_id, %code, error = %e, "join refused"),
    }
}

/// Refuses create/join from a connection that already belongs to a
/// session.
async fn already_bound<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    outbound: &OutboundSender,
) -> bool {
    let bound = state.connections.lock().await.resolve(conn_id).is_some();
    if bound {
        send_error(outbound, &GameError::AlreadyInSession);
    }
    bound
}

fn send_error(outbound: &OutboundSender, error: &GameError) {
    let _ = outbound.send(ServerMessage::error(error.to_string()));
}

/// Detaches a connection from its session's fanout after it left the game.
async fn release<C: Codec>(state: &ServerState<C>, handle: &SessionHandle, conn_id: ConnectionId) {
    match handle.disconnect(conn_id).await {
        Ok(SessionStatus::Open) => {}
        Ok(SessionStatus::Closed) | Err(_) => close_session(state, handle.code()).await,
    }
}

/// Reports a closed connection to the session it was bound to.
async fn disconnect<C: Codec>(state: &ServerState<C>, conn_id: ConnectionId) {
    let identity = state.connections.lock().await.unbind(conn_id);
    let Some(identity) = identity else {
        return;
    };
    tracing::info!(%conn_id, code = %identity.code, role = %identity.role, "connection closed");

    let handle = state.sessions.lock().await.get(&identity.code);
    if let Some(handle) = handle {
        release(state, &handle, conn_id).await;
    }
}

/// Forgets a session that has nobody left.
async fn close_session<C: Codec>(state: &ServerState<C>, code: &SessionCode) {
    let removed = state.sessions.lock().await.remove(code);
    let unbound = state.connections.lock().await.unbind_session(code);
    if let Some(handle) = removed {
        let _ = handle.shutdown().await;
    }
    tracing::debug!(%code, unbound = unbound.len(), "session closed");
}
