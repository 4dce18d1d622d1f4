//! Game configuration and the session state machine's phases.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Where a speed-order answer's elapsed time comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingSource {
    /// Trust the `elapsedMs` the client sends, falling back to the
    /// server's own measurement when it's missing.
    #[default]
    ClientReported,
    /// Always measure from question issue to answer arrival on the server.
    ServerStamped,
}

/// Rules for one game session.
///
/// Shared by every session a server creates. Tiebreak answers are always
/// server-stamped; [`speed_timing`](Self::speed_timing) only affects the
/// Round-2 speed-order question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Connected players required before the host may start.
    pub min_players: usize,

    /// Multiple-choice questions in Round 1. Capped by the question bank.
    pub questions_per_round: usize,

    /// Round-2 turns each player gets. The game ends after
    /// `turns_per_player × |turn order|` end-turn calls.
    pub turns_per_player: usize,

    /// Advisory time limit sent with a pack's questions.
    pub pack_time_limit_secs: u32,

    /// Length of generated session codes.
    pub code_length: usize,

    pub speed_timing: TimingSource,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            questions_per_round: 2,
            turns_per_player: 2,
            pack_time_limit_secs: 45,
            code_length: 6,
            speed_timing: TimingSource::ClientReported,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Top-level state of a game session.
///
/// ```text
/// Lobby → Round1 → Round2 → Finished
/// ```
///
/// Round 1 can detour through a tiebreak and Round 2 has its own
/// [`Round2Stage`]; both are tracked alongside the phase, not as phases.
/// A session can jump straight to `Finished` from any running phase
/// (host ends the game, or departures leave one player or fewer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    Round1,
    Round2,
    Finished,
}

impl Phase {
    /// Returns `true` once the game has left the lobby and not yet ended.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Round1 | Self::Round2)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Round1 => write!(f, "Round1"),
            Self::Round2 => write!(f, "Round2"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// Sub-phase of Round 2.
///
/// - **Speed**: the speed-order question is out, waiting for answers.
/// - **SpeedResolved**: everyone answered, the new order is known, waiting
///   for the host to confirm it.
/// - **Turns**: the pack-selection / pack-play / end-turn loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Round2Stage {
    Speed,
    SpeedResolved,
    Turns,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_default() {
        let config = GameConfig::default();
        assert_eq!(config.min_players, 2);
        assert_eq!(config.questions_per_round, 2);
        assert_eq!(config.turns_per_player, 2);
        assert_eq!(config.pack_time_limit_secs, 45);
        assert_eq!(config.code_length, 6);
        assert_eq!(config.speed_timing, TimingSource::ClientReported);
    }

    #[test]
    fn test_game_config_partial_json_fills_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"questions_per_round": 4, "speed_timing": "server_stamped"}"#)
                .unwrap();
        assert_eq!(config.questions_per_round, 4);
        assert_eq!(config.speed_timing, TimingSource::ServerStamped);
        assert_eq!(config.min_players, 2);
    }

    #[test]
    fn test_phase_is_running() {
        assert!(!Phase::Lobby.is_running());
        assert!(Phase::Round1.is_running());
        assert!(Phase::Round2.is_running());
        assert!(!Phase::Finished.is_running());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Lobby.to_string(), "Lobby");
        assert_eq!(Phase::Round2.to_string(), "Round2");
    }
}
