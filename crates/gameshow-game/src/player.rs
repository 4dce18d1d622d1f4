//! Players and the per-session roster.
//!
//! Players are never removed: eliminated and departed players stay in the
//! roster for result reporting. A player points at its connection by
//! [`ConnectionId`] only; `None` means offline.

use gameshow_protocol::{PlayerId, PlayerRef, RosterEntry, ScoreEntry};
use gameshow_transport::ConnectionId;

/// One roster entry.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub connection: Option<ConnectionId>,
    /// Answered the in-flight Round-1 question.
    pub answered: bool,
    pub eliminated: bool,
    /// Cumulative Round-1 score. Only ever increases.
    pub score: u32,
    /// Score within the current round. Reset when a round starts.
    pub round_score: u32,
}

impl Player {
    fn new(id: PlayerId, name: String, connection: ConnectionId) -> Self {
        Self {
            id,
            name,
            connection: Some(connection),
            answered: false,
            eliminated: false,
            score: 0,
            round_score: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn to_ref(&self) -> PlayerRef {
        PlayerRef {
            player_id: self.id,
            name: self.name.clone(),
        }
    }
}

/// The ordered list of everyone who ever joined a session.
#[derive(Debug, Default)]
pub struct Roster {
    players: Vec<Player>,
    next_id: u64,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connected player and returns its new id.
    pub fn add(&mut self, name: String, connection: ConnectionId) -> PlayerId {
        self.next_id += 1;
        let id = PlayerId(self.next_id);
        self.players.push(Player::new(id, name, connection));
        id
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn by_connection(&self, connection: ConnectionId) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.connection == Some(connection))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_connected()).count()
    }

    /// Name of a player, or an empty string if the id is unknown.
    pub fn name_of(&self, id: PlayerId) -> String {
        self.get(id).map(|p| p.name.clone()).unwrap_or_default()
    }

    pub fn player_ref(&self, id: PlayerId) -> PlayerRef {
        PlayerRef {
            player_id: id,
            name: self.name_of(id),
        }
    }

    pub fn entries(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|p| RosterEntry {
                player_id: p.id,
                name: p.name.clone(),
                connected: p.is_connected(),
                eliminated: p.eliminated,
            })
            .collect()
    }

    /// Everyone's current-round score, in roster order.
    pub fn round_scores(&self) -> Vec<ScoreEntry> {
        self.players
            .iter()
            .map(|p| ScoreEntry {
                player_id: p.id,
                name: p.name.clone(),
                score: p.round_score,
            })
            .collect()
    }
}
