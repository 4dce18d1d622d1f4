//! Messages a client sends to the server.
//!
//! Internally tagged on `type` with snake_case kinds and camelCase fields:
//!
//! ```json
//! { "type": "submit_answer", "questionId": 3, "choice": 2 }
//! ```
//!
//! Legacy kind and field names from older clients are accepted as
//! aliases (`join_game` with `gamePin`/`playerName`, `next_question`, ...).

use serde::{Deserialize, Serialize};

/// Every inbound message kind the server understands.
///
/// Anything that doesn't decode into one of these variants is a protocol
/// error and is dropped by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Open a new session; the sender becomes its host.
    #[serde(alias = "create_game")]
    CreateSession,

    /// Join an existing session under a display name.
    #[serde(alias = "join_game")]
    JoinSession {
        #[serde(alias = "gamePin")]
        code: String,
        #[serde(alias = "playerName")]
        name: String,
    },

    /// Host: leave the lobby and start Round 1.
    StartGame,

    /// Answer the in-flight multiple-choice question.
    SubmitAnswer {
        question_id: u32,
        #[serde(alias = "answer")]
        choice: usize,
    },

    /// Answer the Round-2 speed-order question.
    SubmitSpeedAnswer {
        question_id: String,
        answer: String,
        /// Client-measured latency since the question was shown.
        #[serde(default)]
        elapsed_ms: Option<u64>,
    },

    /// Answer the tiebreak question (tied players only).
    SubmitTiebreakAnswer { answer: String },

    /// Host: Round 1 is over, start Round 2 with the speed question.
    #[serde(alias = "continue_to_round2")]
    AdvanceToRound2,

    /// Host: accept the speed-order result as the Round-2 turn order.
    #[serde(alias = "continue_from_speed_order")]
    ConfirmSpeedOrder,

    /// Claim an unused content pack.
    #[serde(alias = "select_question_pack")]
    SelectPack { pack_id: String },

    /// Reveal the active pack's questions.
    StartPackQuestions,

    /// The pack owner's free-text answer, checked automatically.
    SubmitPackAnswer { answer: String, question_index: usize },

    /// Host: mark a pack answer right or wrong by hand.
    #[serde(alias = "pack_answer_verified")]
    VerifyPackAnswer { is_correct: bool, question_index: usize },

    /// Host: close the active pack before all questions are answered.
    EndPackEarly,

    /// Host: finish the current Round-2 turn.
    EndTurn,

    /// Player: leave the game for good.
    LeaveGame,

    /// Host: move to the next Round-1 question (or end the round).
    #[serde(alias = "next_question")]
    AdvanceQuestion,

    /// Host: reveal the correct answer without waiting for everyone.
    ShowAnswer,

    /// Host: legacy "next round"; same as [`ClientMessage::AdvanceToRound2`]
    /// while Round 1 is on.
    #[serde(alias = "next_round")]
    AdvanceRound,

    /// Host: end the game for everyone.
    EndGame,
}

impl ClientMessage {
    /// The wire name of this message kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateSession => "create_session",
            Self::JoinSession { .. } => "join_session",
            Self::StartGame => "start_game",
            Self::SubmitAnswer { .. } => "submit_answer",
            Self::SubmitSpeedAnswer { .. } => "submit_speed_answer",
            Self::SubmitTiebreakAnswer { .. } => "submit_tiebreak_answer",
            Self::AdvanceToRound2 => "advance_to_round2",
            Self::ConfirmSpeedOrder => "confirm_speed_order",
            Self::SelectPack { .. } => "select_pack",
            Self::StartPackQuestions => "start_pack_questions",
            Self::SubmitPackAnswer { .. } => "submit_pack_answer",
            Self::VerifyPackAnswer { .. } => "verify_pack_answer",
            Self::EndPackEarly => "end_pack_early",
            Self::EndTurn => "end_turn",
            Self::LeaveGame => "leave_game",
            Self::AdvanceQuestion => "advance_question",
            Self::ShowAnswer => "show_answer",
            Self::AdvanceRound => "advance_round",
            Self::EndGame => "end_game",
        }
    }
}
