//! Messages the server sends to clients.
//!
//! Same framing as [`ClientMessage`](crate::ClientMessage): a `type`
//! discriminator in snake_case plus camelCase fields.

use serde::{Deserialize, Serialize};

use crate::{
    FinalScore, OrderEntry, PackQuestionView, PackSummary, PlayerId, PlayerRef,
    QuestionView, RosterEntry, ScoreEntry, SessionCode, TextQuestionView,
    TimedResult,
};

/// Every outbound message kind the engine produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// To the host: your session exists, share this code.
    SessionCreated { code: SessionCode },

    /// To a joining player: you're in.
    JoinAccepted {
        player_id: PlayerId,
        name: String,
        code: SessionCode,
    },

    /// The roster changed (join, reconnect, disconnect in the lobby).
    RosterUpdated { players: Vec<RosterEntry> },

    /// A request was refused. Sent only to the offending connection.
    Error { message: String },

    GameStarted { round: u32, total_rounds: u32 },

    /// A Round-1 question. `index` is 1-based.
    NewQuestion {
        question: QuestionView,
        index: usize,
        total: usize,
        round: u32,
    },

    /// To the answering player only.
    AnswerAcknowledged { correct: bool },

    /// Correct option plus everyone's current-round score.
    QuestionRevealed {
        correct_answer: usize,
        scores: Vec<ScoreEntry>,
    },

    PlayerEliminated {
        player_id: PlayerId,
        name: String,
        reason: String,
    },

    RoundComplete { round: u32 },

    TiebreakStarted {
        tied_count: usize,
        participants: Vec<PlayerRef>,
    },

    TiebreakQuestion { question: TextQuestionView },

    /// To the answering player: a speed or tiebreak answer was stored.
    TimedAnswerReceived { elapsed_ms: u64 },

    TiebreakResults {
        results: Vec<TimedResult>,
        eliminated: PlayerRef,
    },

    /// `phase` is `"speed"` when Round 2 opens.
    Round2Started { phase: String },

    SpeedQuestion { question: TextQuestionView },

    /// Speed-order answers, correct ones first, each bucket fastest first.
    /// Nobody is eliminated by the speed question, so `eliminated` is
    /// always `None` today.
    SpeedResults {
        results: Vec<TimedResult>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        eliminated: Option<PlayerRef>,
    },

    PlayerOrder { order: Vec<OrderEntry> },

    /// The Round-2 pack catalog with per-pack "already used" flags.
    PacksAvailable {
        packs: Vec<PackSummary>,
        current_turn_index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_player: Option<PlayerRef>,
        turns_completed: usize,
        total_turns: usize,
    },

    PackSelected {
        pack_id: String,
        title: String,
        selector_name: String,
    },

    /// The active pack's questions. The host's copy carries answer keys,
    /// the players' copy doesn't.
    PackQuestions {
        title: String,
        questions: Vec<PackQuestionView>,
        current_player: PlayerRef,
        time_limit: u32,
    },

    /// Result of one pack answer. Auto-checked answers also disclose what
    /// was submitted and the key it was checked against.
    PackAnswerVerified {
        is_correct: bool,
        question_index: usize,
        running_score: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        submitted_answer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correct_answer: Option<String>,
    },

    PackComplete {
        player_id: PlayerId,
        score: u32,
        total: usize,
        round2_total: u32,
    },

    /// `winners` is empty when nobody is left, and holds more than one
    /// entry only on a perfect tie (same score, same speed time).
    GameOver {
        winners: Vec<PlayerRef>,
        final_scores: Vec<FinalScore>,
    },

    PlayerDisconnected { player_id: PlayerId, name: String },

    GameEnded,
}

impl ServerMessage {
    /// Shorthand for an [`ServerMessage::Error`].
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_created_json_format() {
        let msg = ServerMessage::SessionCreated {
            code: SessionCode::new("AB12CD"),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "session_created");
        assert_eq!(json["code"], "AB12CD");
    }

    #[test]
    fn test_round2_kinds_keep_digit_in_tag() {
        let json: serde_json::Value = serde_json::to_value(&ServerMessage::Round2Started {
            phase: "speed".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "round2_started");

        let json: serde_json::Value = serde_json::to_value(&ServerMessage::PackComplete {
            player_id: PlayerId(1),
            score: 2,
            total: 3,
            round2_total: 5,
        })
        .unwrap();
        assert_eq!(json["round2Total"], 5);
    }

    #[test]
    fn test_speed_results_omits_absent_elimination() {
        let msg = ServerMessage::SpeedResults {
            results: vec![],
            eliminated: None,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert!(json.get("eliminated").is_none());
        assert_eq!(json["results"], serde_json::json!([]));
    }

    #[test]
    fn test_manual_verification_hides_answers() {
        let msg = ServerMessage::PackAnswerVerified {
            is_correct: true,
            question_index: 1,
            running_score: 2,
            submitted_answer: None,
            correct_answer: None,
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["isCorrect"], true);
        assert!(json.get("submittedAnswer").is_none());
        assert!(json.get("correctAnswer").is_none());
    }

    #[test]
    fn test_error_helper() {
        assert_eq!(
            ServerMessage::error("Only the host can do that"),
            ServerMessage::Error {
                message: "Only the host can do that".into()
            }
        );
    }

    #[test]
    fn test_game_over_round_trip() {
        let msg = ServerMessage::GameOver {
            winners: vec![PlayerRef {
                player_id: PlayerId(3),
                name: "Cy".into(),
            }],
            final_scores: vec![FinalScore {
                player_id: PlayerId(3),
                name: "Cy".into(),
                total_score: 2,
                round2_score: 4,
                eliminated: false,
            }],
        };
        let text = serde_json::to_string(&msg).unwrap();
        let back: ServerMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back, msg);
    }
}
