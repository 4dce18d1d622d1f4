//! Integration tests for the Gameshow server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gameshow::prelude::*;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server(game: GameConfig) -> String {
    let server = GameshowServer::builder()
        .bind("127.0.0.1:0")
        .question_bank(QuestionBank::builtin())
        .game_config(game)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

/// Reads frames until one of type `kind` arrives, skipping the rest.
async fn recv_type(ws: &mut ClientWs, kind: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let frame = tokio::time::timeout_at(deadline, ws.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {kind}"))
            .expect("stream ended")
            .expect("ws error");
        let Message::Text(text) = frame else {
            continue;
        };
        let value: Value = serde_json::from_str(text.as_str()).expect("server sent JSON");
        if value["type"] == kind {
            return value;
        }
    }
}

/// Asserts that nothing arrives for a short while.
async fn assert_silent(ws: &mut ClientWs) {
    let result = tokio::time::timeout(Duration::from_millis(150), ws.next()).await;
    assert!(result.is_err(), "expected no frame, got {result:?}");
}

/// Host connection plus its session code.
async fn create(addr: &str) -> (ClientWs, String) {
    let mut host = connect(addr).await;
    send(&mut host, json!({ "type": "create_session" })).await;
    let created = recv_type(&mut host, "session_created").await;
    let code = created["code"].as_str().expect("code").to_string();
    (host, code)
}

async fn join(addr: &str, code: &str, name: &str) -> (ClientWs, u64) {
    let mut ws = connect(addr).await;
    send(&mut ws, json!({ "type": "join_session", "code": code, "name": name })).await;
    let accepted = recv_type(&mut ws, "join_accepted").await;
    let id = accepted["playerId"].as_u64().expect("player id");
    (ws, id)
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test]
async fn test_create_and_join_by_lowercase_code() {
    let addr = start_server(GameConfig::default()).await;
    let (mut host, code) = create(&addr).await;
    assert_eq!(code.len(), 6);

    let (_alice, alice_id) = join(&addr, &code.to_lowercase(), "Alice").await;

    let roster = recv_type(&mut host, "roster_updated").await;
    let players = roster["players"].as_array().unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0]["playerId"].as_u64(), Some(alice_id));
    assert_eq!(players[0]["name"], "Alice");
    assert_eq!(players[0]["connected"], true);
}

#[tokio::test]
async fn test_join_unknown_code_reports_error() {
    let addr = start_server(GameConfig::default()).await;
    let mut ws = connect(&addr).await;
    send(&mut ws, json!({ "type": "join_session", "code": "nope99", "name": "Bob" })).await;

    let err = recv_type(&mut ws, "error").await;
    assert_eq!(err["message"], "Game NOPE99 not found");
}

#[tokio::test]
async fn test_legacy_join_aliases() {
    let addr = start_server(GameConfig::default()).await;
    let (_host, code) = create(&addr).await;
    let mut ws = connect(&addr).await;
    send(&mut ws, json!({ "type": "join_game", "gamePin": code, "playerName": "Old" })).await;
    let accepted = recv_type(&mut ws, "join_accepted").await;
    assert_eq!(accepted["name"], "Old");
}

#[tokio::test]
async fn test_taken_name_is_refused() {
    let addr = start_server(GameConfig::default()).await;
    let (_host, code) = create(&addr).await;
    let (_first, _) = join(&addr, &code, "Sam").await;

    let mut second = connect(&addr).await;
    send(&mut second, json!({ "type": "join_session", "code": code, "name": "Sam" })).await;
    let err = recv_type(&mut second, "error").await;
    assert_eq!(err["message"], "Player name already taken");
}

#[tokio::test]
async fn test_garbage_and_unbound_messages_are_dropped() {
    let addr = start_server(GameConfig::default()).await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    send(&mut ws, json!({ "type": "no_such_kind" })).await;
    send(&mut ws, json!({ "type": "start_game" })).await;
    assert_silent(&mut ws).await;

    // The connection is still usable.
    send(&mut ws, json!({ "type": "create_session" })).await;
    recv_type(&mut ws, "session_created").await;
}

#[tokio::test]
async fn test_second_create_on_same_connection_is_refused() {
    let addr = start_server(GameConfig::default()).await;
    let (mut host, _code) = create(&addr).await;
    send(&mut host, json!({ "type": "create_session" })).await;
    let err = recv_type(&mut host, "error").await;
    assert_eq!(err["message"], "You are already in a game");
}

#[tokio::test]
async fn test_non_host_cannot_start() {
    let addr = start_server(GameConfig::default()).await;
    let (_host, code) = create(&addr).await;
    let (mut alice, _) = join(&addr, &code, "Alice").await;
    let (_bob, _) = join(&addr, &code, "Bob").await;

    send(&mut alice, json!({ "type": "start_game" })).await;
    let err = recv_type(&mut alice, "error").await;
    assert_eq!(err["message"], "Only the host can do that");
}

#[tokio::test]
async fn test_start_needs_two_connected_players() {
    let addr = start_server(GameConfig::default()).await;
    let (mut host, code) = create(&addr).await;
    let (_alice, _) = join(&addr, &code, "Alice").await;

    send(&mut host, json!({ "type": "start_game" })).await;
    let err = recv_type(&mut host, "error").await;
    assert_eq!(err["message"], "Need at least 2 players to start");
}

#[tokio::test]
async fn test_closed_socket_is_reported_as_disconnect() {
    let addr = start_server(GameConfig::default()).await;
    let (mut host, code) = create(&addr).await;
    let (alice, alice_id) = join(&addr, &code, "Alice").await;
    recv_type(&mut host, "roster_updated").await;

    drop(alice);

    let gone = recv_type(&mut host, "player_disconnected").await;
    assert_eq!(gone["playerId"].as_u64(), Some(alice_id));
    let roster = recv_type(&mut host, "roster_updated").await;
    assert_eq!(roster["players"][0]["connected"], false);

    // The slot can be reclaimed under the same name.
    let (_again, again_id) = join(&addr, &code, "Alice").await;
    assert_eq!(again_id, alice_id);
}

// =========================================================================
// Game flow
// =========================================================================

#[tokio::test]
async fn test_short_game_over_the_wire() {
    let addr = start_server(GameConfig {
        questions_per_round: 1,
        ..GameConfig::default()
    })
    .await;
    let (mut host, code) = create(&addr).await;
    let (mut alice, alice_id) = join(&addr, &code, "Alice").await;
    let (mut bob, bob_id) = join(&addr, &code, "Bob").await;

    send(&mut host, json!({ "type": "start_game" })).await;
    let started = recv_type(&mut alice, "game_started").await;
    assert_eq!(started["totalRounds"], 2);
    let question = recv_type(&mut alice, "new_question").await;
    recv_type(&mut bob, "new_question").await;
    let question_id = question["question"]["id"].as_u64().unwrap();
    let options = question["question"]["options"].as_array().unwrap().len() as u64;
    assert!(question["question"].get("correctAnswer").is_none());

    // Reveal early so the test knows the right option.
    send(&mut host, json!({ "type": "show_answer" })).await;
    let revealed = recv_type(&mut host, "question_revealed").await;
    let correct = revealed["correctAnswer"].as_u64().unwrap();

    send(&mut alice, json!({ "type": "submit_answer", "questionId": question_id, "choice": correct })).await;
    let ack = recv_type(&mut alice, "answer_acknowledged").await;
    assert_eq!(ack["correct"], true);
    let wrong = (correct + 1) % options;
    send(&mut bob, json!({ "type": "submit_answer", "questionId": question_id, "choice": wrong })).await;
    let ack = recv_type(&mut bob, "answer_acknowledged").await;
    assert_eq!(ack["correct"], false);

    // Last question done: Bob has the unique lowest score.
    send(&mut host, json!({ "type": "advance_question" })).await;
    let eliminated = recv_type(&mut host, "player_eliminated").await;
    assert_eq!(eliminated["playerId"].as_u64(), Some(bob_id));
    recv_type(&mut host, "round_complete").await;

    // One player left: Round 2 ends the game straight away.
    send(&mut host, json!({ "type": "continue_to_round2" })).await;
    let over = recv_type(&mut alice, "game_over").await;
    assert_eq!(over["winners"][0]["playerId"].as_u64(), Some(alice_id));
    let finals = over["finalScores"].as_array().unwrap();
    assert_eq!(finals.len(), 2);
}

#[tokio::test]
async fn test_leave_with_two_active_ends_game() {
    let addr = start_server(GameConfig::default()).await;
    let (mut host, code) = create(&addr).await;
    let (mut alice, _) = join(&addr, &code, "Alice").await;
    let (_bob, bob_id) = join(&addr, &code, "Bob").await;

    send(&mut host, json!({ "type": "start_game" })).await;
    recv_type(&mut alice, "new_question").await;

    send(&mut alice, json!({ "type": "leave_game" })).await;
    let eliminated = recv_type(&mut host, "player_eliminated").await;
    assert_eq!(eliminated["reason"], "Left the game");
    let over = recv_type(&mut host, "game_over").await;
    assert_eq!(over["winners"][0]["playerId"].as_u64(), Some(bob_id));

    // Alice is no longer bound to the session.
    send(&mut alice, json!({ "type": "submit_answer", "questionId": 1, "choice": 0 })).await;
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_host_end_game_reaches_everyone() {
    let addr = start_server(GameConfig::default()).await;
    let (mut host, code) = create(&addr).await;
    let (mut alice, _) = join(&addr, &code, "Alice").await;

    send(&mut host, json!({ "type": "end_game" })).await;
    recv_type(&mut alice, "game_ended").await;
    recv_type(&mut host, "game_ended").await;
}
