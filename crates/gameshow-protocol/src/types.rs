//! Identifiers and the small records embedded in server messages.
//!
//! These are wire views: they carry exactly what a client may see. The
//! engine keeps its own richer entities and builds these on the way out.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A server-generated identifier for a player.
///
/// Serialized as a plain number (`42`, not `{"0":42}`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short code players type to join a session, e.g. `"K7Q2ZD"`.
///
/// Codes are case-insensitive for humans; [`SessionCode::normalized`]
/// brings whatever a client typed into the canonical upper-case form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    /// Wraps an already-canonical code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Trims and upper-cases user input.
    pub fn normalized(input: &str) -> Self {
        Self(input.trim().to_ascii_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Player views
// ---------------------------------------------------------------------------

/// A player reference: id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub player_id: PlayerId,
    pub name: String,
}

/// One row of the lobby / in-game roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub connected: bool,
    pub eliminated: bool,
}

/// A player's current-round score, sent with a question reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub score: u32,
}

// ---------------------------------------------------------------------------
// Question views
// ---------------------------------------------------------------------------

/// A multiple-choice question as players see it (no correct index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    /// Advisory only. The server never times a question out.
    pub time_limit: u32,
}

/// A free-text question (speed or tiebreak) as players see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextQuestionView {
    pub id: String,
    pub text: String,
}

/// One sub-question of a content pack.
///
/// `answer` is present only in the host's copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackQuestionView {
    pub index: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// A content pack in the Round-2 catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub question_count: usize,
    pub selected: bool,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One participant's timed free-text answer, after checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedResult {
    pub player_id: PlayerId,
    pub name: String,
    pub answer: String,
    pub elapsed_ms: u64,
    pub correct: bool,
}

/// A position in the Round-2 turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEntry {
    pub player_id: PlayerId,
    pub name: String,
    /// 1-based.
    pub position: usize,
    pub elapsed_ms: u64,
}

/// A roster player's standing when the game ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalScore {
    pub player_id: PlayerId,
    pub name: String,
    /// Cumulative Round-1 points.
    pub total_score: u32,
    pub round2_score: u32,
    pub eliminated: bool,
}
