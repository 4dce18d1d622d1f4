//! The game session state machine.
//!
//! [`GameSession`] owns one game's roster and progression state. It is
//! plain synchronous data: every handler takes the request, mutates state,
//! and returns an [`Outbox`] of messages for the fanout. The session actor
//! makes sure only one handler runs at a time.
//!
//! Handlers are split by controller:
//!
//! - lobby, start, leave, disconnect, end: this module
//! - Round-1 questions and elimination: `round1`
//! - tiebreak sub-round: `tiebreak`
//! - speed-order question: `speed`
//! - Round-2 pack turns and the final result: `round2`
//!
//! Handlers that need a clock take `now` as an argument so timing is
//! decided by the caller (the actor stamps each command on receipt).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use gameshow_protocol::{ClientMessage, PlayerId, ServerMessage, SessionCode};
use gameshow_session::Role;
use gameshow_transport::ConnectionId;
use rand::seq::SliceRandom;

use crate::content::{ContentPack, Question, QuestionBank, SpeedQuestion};
use crate::fanout::{Outbox, Recipient};
use crate::player::Roster;
use crate::{GameConfig, GameError, Phase, Round2Stage};

/// Rounds announced in `game_started`.
pub(crate) const TOTAL_ROUNDS: u32 = 2;

/// A free-text question in flight (tiebreak or speed order).
#[derive(Debug, Clone)]
pub(crate) struct TimedQuestion {
    pub question: SpeedQuestion,
    pub issued_at: Instant,
}

/// A stored free-text answer.
#[derive(Debug, Clone)]
pub(crate) struct TimedAnswer {
    pub answer: String,
    pub elapsed_ms: u64,
}

/// The pack currently being played in Round 2.
#[derive(Debug, Clone)]
pub(crate) struct ActivePack {
    pub pack: ContentPack,
    pub owner: PlayerId,
    pub score: u32,
    /// Questions have been revealed; answers are accepted from here on.
    pub started: bool,
    /// Indices already scored.
    pub answered: BTreeSet<usize>,
    pub selected_at: Instant,
}

/// Diagnostic snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub code: SessionCode,
    pub phase: Phase,
    pub player_count: usize,
    pub connected_count: usize,
    pub active_count: usize,
    pub host_connected: bool,
}

/// One game: roster, phase, and every controller's bookkeeping.
#[derive(Debug)]
pub struct GameSession {
    pub(crate) code: SessionCode,
    pub(crate) config: GameConfig,
    pub(crate) bank: Arc<QuestionBank>,
    pub(crate) host: Option<ConnectionId>,
    pub(crate) roster: Roster,
    /// Non-eliminated players, in play order.
    pub(crate) active: Vec<PlayerId>,
    pub(crate) eliminated: Vec<PlayerId>,
    pub(crate) phase: Phase,
    /// Set once the host has ended the game.
    pub(crate) ended: bool,
    pub(crate) round: u32,

    // Round 1
    pub(crate) questions: Vec<Question>,
    pub(crate) questions_per_round: usize,
    pub(crate) question_index: usize,
    pub(crate) answers: HashMap<PlayerId, usize>,

    // Tiebreak and speed order
    pub(crate) tiebreak: Option<Vec<PlayerId>>,
    pub(crate) timed: Option<TimedQuestion>,
    pub(crate) timed_answers: HashMap<PlayerId, TimedAnswer>,
    pub(crate) timed_cursor: usize,

    // Round 2
    pub(crate) round2_stage: Option<Round2Stage>,
    pub(crate) round2_order: Vec<PlayerId>,
    pub(crate) turn_index: usize,
    pub(crate) turns_completed: usize,
    pub(crate) round2_scores: HashMap<PlayerId, u32>,
    pub(crate) speed_times: HashMap<PlayerId, u64>,
    pub(crate) used_packs: BTreeSet<String>,
    pub(crate) active_pack: Option<ActivePack>,
    pub(crate) winners: Vec<PlayerId>,
}

impl GameSession {
    /// Creates an empty lobby hosted by `host`.
    pub fn new(
        code: SessionCode,
        host: ConnectionId,
        config: GameConfig,
        bank: Arc<QuestionBank>,
    ) -> Self {
        Self {
            code,
            config,
            bank,
            host: Some(host),
            roster: Roster::new(),
            active: Vec::new(),
            eliminated: Vec::new(),
            phase: Phase::Lobby,
            ended: false,
            round: 0,
            questions: Vec::new(),
            questions_per_round: 0,
            question_index: 0,
            answers: HashMap::new(),
            tiebreak: None,
            timed: None,
            timed_answers: HashMap::new(),
            timed_cursor: 0,
            round2_stage: None,
            round2_order: Vec::new(),
            turn_index: 0,
            turns_completed: 0,
            round2_scores: HashMap::new(),
            speed_times: HashMap::new(),
            used_packs: BTreeSet::new(),
            active_pack: None,
            winners: Vec::new(),
        }
    }

    // -- accessors -------------------------------------------------------

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn host_connection(&self) -> Option<ConnectionId> {
        self.host
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub(crate) fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    /// Non-eliminated players in current play order.
    pub fn active(&self) -> &[PlayerId] {
        &self.active
    }

    /// Eliminated players in elimination order.
    pub fn eliminated(&self) -> &[PlayerId] {
        &self.eliminated
    }

    /// The in-flight Round-1 question, if any.
    pub fn current_question(&self) -> Option<&Question> {
        if self.phase != Phase::Round1
            || self.tiebreak.is_some()
            || self.question_index >= self.questions_per_round
        {
            return None;
        }
        self.questions.get(self.question_index)
    }

    /// The in-flight tiebreak or speed question, if any.
    pub fn timed_question(&self) -> Option<&SpeedQuestion> {
        self.timed.as_ref().map(|t| &t.question)
    }

    pub fn tiebreak_participants(&self) -> Option<&[PlayerId]> {
        self.tiebreak.as_deref()
    }

    pub fn round2_stage(&self) -> Option<Round2Stage> {
        self.round2_stage
    }

    /// Round-2 turn order, fixed when the host confirms the speed order.
    pub fn round2_order(&self) -> &[PlayerId] {
        &self.round2_order
    }

    pub fn round2_score(&self, player: PlayerId) -> u32 {
        self.round2_scores.get(&player).copied().unwrap_or(0)
    }

    /// Speed-order elapsed time, kept for the final tiebreak.
    pub fn speed_time(&self, player: PlayerId) -> Option<u64> {
        self.speed_times.get(&player).copied()
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    pub fn turns_completed(&self) -> usize {
        self.turns_completed
    }

    /// Whose Round-2 turn it is.
    pub fn current_turn_player(&self) -> Option<PlayerId> {
        if self.round2_stage != Some(Round2Stage::Turns) {
            return None;
        }
        self.round2_order.get(self.turn_index).copied()
    }

    pub fn active_pack_id(&self) -> Option<&str> {
        self.active_pack.as_ref().map(|a| a.pack.id.as_str())
    }

    /// Winners once the game is over (empty if nobody was left).
    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    /// Returns `true` once nobody is left to talk to: every player is gone
    /// and the host is gone too or has already ended the game.
    pub fn is_closed(&self) -> bool {
        self.roster.connected_count() == 0 && (self.host.is_none() || self.ended)
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            code: self.code.clone(),
            phase: self.phase,
            player_count: self.roster.len(),
            connected_count: self.roster.connected_count(),
            active_count: self.active.len(),
            host_connected: self.host.is_some(),
        }
    }

    // -- dispatch --------------------------------------------------------

    /// Routes one client message from `connection` (acting as `role`).
    ///
    /// # Errors
    /// Any [`GameError`]; state is untouched when an error is returned.
    /// The caller reports it to `connection` unless it
    /// [`is_silent`](GameError::is_silent).
    pub fn handle(
        &mut self,
        connection: ConnectionId,
        role: Role,
        msg: ClientMessage,
        now: Instant,
    ) -> Result<Outbox, GameError> {
        match msg {
            ClientMessage::CreateSession | ClientMessage::JoinSession { .. } => {
                Err(GameError::AlreadyInSession)
            }
            ClientMessage::StartGame => {
                require_host(role)?;
                self.start_game()
            }
            ClientMessage::SubmitAnswer {
                question_id,
                choice,
            } => {
                let player = self.require_player(role)?;
                self.submit_answer(player, connection, question_id, choice)
            }
            ClientMessage::AdvanceQuestion => {
                require_host(role)?;
                self.advance_question(now)
            }
            ClientMessage::ShowAnswer => {
                require_host(role)?;
                self.show_answer()
            }
            ClientMessage::SubmitTiebreakAnswer { answer } => {
                let player = self.require_player(role)?;
                self.submit_tiebreak_answer(player, connection, answer, now)
            }
            ClientMessage::AdvanceToRound2 => {
                require_host(role)?;
                self.begin_round2(now)
            }
            ClientMessage::AdvanceRound => {
                require_host(role)?;
                if self.phase != Phase::Round1 {
                    return Err(self.wrong_phase("there is no next round"));
                }
                self.begin_round2(now)
            }
            ClientMessage::SubmitSpeedAnswer {
                question_id,
                answer,
                elapsed_ms,
            } => {
                let player = self.require_player(role)?;
                self.submit_speed_answer(player, connection, &question_id, answer, elapsed_ms, now)
            }
            ClientMessage::ConfirmSpeedOrder => {
                require_host(role)?;
                self.confirm_speed_order()
            }
            ClientMessage::SelectPack { pack_id } => {
                let player = self.require_player(role)?;
                self.select_pack(player, &pack_id, now)
            }
            ClientMessage::StartPackQuestions => self.start_pack_questions(role),
            ClientMessage::SubmitPackAnswer {
                answer,
                question_index,
            } => {
                let player = self.require_player(role)?;
                self.submit_pack_answer(player, &answer, question_index, now)
            }
            ClientMessage::VerifyPackAnswer {
                is_correct,
                question_index,
            } => {
                require_host(role)?;
                self.verify_pack_answer(is_correct, question_index, now)
            }
            ClientMessage::EndPackEarly => {
                require_host(role)?;
                self.end_pack_early(now)
            }
            ClientMessage::EndTurn => {
                require_host(role)?;
                self.end_turn(now)
            }
            ClientMessage::LeaveGame => {
                let player = self.require_player(role)?;
                self.leave(player, now)
            }
            ClientMessage::EndGame => {
                require_host(role)?;
                Ok(self.end_game())
            }
        }
    }

    // -- lobby -----------------------------------------------------------

    /// Adds a player, or hands a disconnected player's slot back to a new
    /// connection joining under the same name.
    ///
    /// New names are only accepted in the lobby. After that, only a
    /// reclaim of a disconnected slot succeeds.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        name: &str,
    ) -> Result<(PlayerId, Outbox), GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }
        if self.host == Some(connection) || self.roster.by_connection(connection).is_some() {
            return Err(GameError::AlreadyInSession);
        }

        let existing = self
            .roster
            .by_name(name)
            .map(|p| (p.id, p.is_connected()));
        let (player_id, reclaimed) = match existing {
            Some((_, true)) => return Err(GameError::NameTaken),
            Some((id, false)) => {
                if let Some(player) = self.roster.get_mut(id) {
                    player.connection = Some(connection);
                }
                (id, true)
            }
            None if self.phase == Phase::Lobby => (self.roster.add(name.to_string(), connection), false),
            None => return Err(GameError::GameInProgress),
        };

        tracing::info!(
            code = %self.code,
            %player_id,
            %connection,
            name,
            reclaimed,
            "player joined"
        );

        let mut out = vec![
            (
                Recipient::Connection(connection),
                ServerMessage::JoinAccepted {
                    player_id,
                    name: name.to_string(),
                    code: self.code.clone(),
                },
            ),
            (
                Recipient::All,
                ServerMessage::RosterUpdated {
                    players: self.roster.entries(),
                },
            ),
        ];
        if reclaimed {
            out.extend(
                self.catch_up(player_id)
                    .into_iter()
                    .map(|msg| (Recipient::Connection(connection), msg)),
            );
        }
        Ok((player_id, out))
    }

    /// What a reconnecting player needs to see to rejoin the current step.
    fn catch_up(&self, player: PlayerId) -> Vec<ServerMessage> {
        if let Some(participants) = &self.tiebreak {
            return self.tiebreak_catch_up(participants);
        }
        let eliminated = self.roster.get(player).is_some_and(|p| p.eliminated);
        match (self.phase, self.round2_stage) {
            (Phase::Round1, _) if !eliminated => self
                .current_question()
                .map(|q| self.new_question(q))
                .into_iter()
                .collect(),
            (Phase::Round2, Some(Round2Stage::Speed))
                if self.is_active(player) && !self.timed_answers.contains_key(&player) =>
            {
                self.timed
                    .as_ref()
                    .map(|t| ServerMessage::SpeedQuestion {
                        question: t.question.view(),
                    })
                    .into_iter()
                    .collect()
            }
            (Phase::Round2, Some(Round2Stage::Turns)) => {
                let mut out = vec![self.packs_available()];
                out.extend(self.pack_catch_up());
                out
            }
            _ => Vec::new(),
        }
    }

    fn tiebreak_catch_up(&self, participants: &[PlayerId]) -> Vec<ServerMessage> {
        let Some(timed) = &self.timed else {
            return Vec::new();
        };
        vec![
            ServerMessage::TiebreakStarted {
                tied_count: participants.len(),
                participants: participants
                    .iter()
                    .map(|id| self.roster.player_ref(*id))
                    .collect(),
            },
            ServerMessage::TiebreakQuestion {
                question: timed.question.view(),
            },
        ]
    }

    /// The pack in play, as the players saw it.
    fn pack_catch_up(&self) -> Vec<ServerMessage> {
        let Some(active) = &self.active_pack else {
            return Vec::new();
        };
        let mut out = vec![ServerMessage::PackSelected {
            pack_id: active.pack.id.clone(),
            title: active.pack.title.clone(),
            selector_name: self.roster.name_of(active.owner),
        }];
        if active.started {
            out.push(ServerMessage::PackQuestions {
                title: active.pack.title.clone(),
                questions: active.pack.question_views(false),
                current_player: self.roster.player_ref(active.owner),
                time_limit: self.config.pack_time_limit_secs,
            });
        }
        out
    }

    /// Host: leave the lobby and start Round 1.
    fn start_game(&mut self) -> Result<Outbox, GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::GameInProgress);
        }
        let connected = self.roster.connected_count();
        if connected < self.config.min_players {
            return Err(GameError::NotEnoughPlayers(self.config.min_players));
        }
        if self.bank.questions.is_empty() {
            return Err(GameError::NoQuestions);
        }

        let mut questions = self.bank.questions.clone();
        questions.shuffle(&mut rand::rng());
        self.questions_per_round = self.config.questions_per_round.clamp(1, questions.len());
        self.questions = questions;
        self.question_index = 0;
        self.answers.clear();

        self.active = self.roster.ids();
        self.eliminated.clear();
        for player in self.roster.iter_mut() {
            player.answered = false;
            player.round_score = 0;
        }
        self.phase = Phase::Round1;
        self.round = 1;

        tracing::info!(
            code = %self.code,
            players = self.active.len(),
            questions = self.questions_per_round,
            "game started"
        );

        let mut out = vec![(
            Recipient::All,
            ServerMessage::GameStarted {
                round: 1,
                total_rounds: TOTAL_ROUNDS,
            },
        )];
        if let Some(question) = self.current_question() {
            out.push((Recipient::Active, self.new_question(question)));
        }
        Ok(out)
    }

    // -- departures ------------------------------------------------------

    /// A player leaves for good.
    ///
    /// Mid-game this counts as an elimination. The player's pack is
    /// committed and any quorum they were holding up is re-checked. One
    /// or zero players left ends the game.
    fn leave(&mut self, player_id: PlayerId, now: Instant) -> Result<Outbox, GameError> {
        let player = self
            .roster
            .get_mut(player_id)
            .ok_or(GameError::UnknownPlayer(player_id))?;
        player.connection = None;
        let had_answered = player.answered;
        let already_out = player.eliminated;
        let name = player.name.clone();

        tracing::info!(code = %self.code, %player_id, phase = %self.phase, "player left");

        if !self.phase.is_running() || already_out {
            return Ok(vec![
                (
                    Recipient::All,
                    ServerMessage::PlayerDisconnected { player_id, name },
                ),
                (
                    Recipient::All,
                    ServerMessage::RosterUpdated {
                        players: self.roster.entries(),
                    },
                ),
            ]);
        }

        let mut out = vec![(Recipient::All, self.eliminate(player_id, "Left the game"))];
        if self.active_pack.as_ref().is_some_and(|p| p.owner == player_id) {
            out.extend(self.complete_pack(now));
        }
        if self.active.len() <= 1 {
            out.extend(self.finish_game(now));
            return Ok(out);
        }

        match self.phase {
            Phase::Round1 => out.extend(self.round1_after_departure(player_id, had_answered)),
            Phase::Round2 => out.extend(self.round2_after_departure(player_id)),
            Phase::Lobby | Phase::Finished => {}
        }
        Ok(out)
    }

    /// The connection closed. The player keeps their slot and can reclaim
    /// it by joining again under the same name.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Outbox {
        if self.host == Some(connection) {
            self.host = None;
            tracing::info!(code = %self.code, %connection, "host disconnected");
            return Vec::new();
        }

        let Some(player) = self
            .roster
            .iter_mut()
            .find(|p| p.connection == Some(connection))
        else {
            return Vec::new();
        };
        player.connection = None;
        let player_id = player.id;
        let name = player.name.clone();

        tracing::info!(code = %self.code, %player_id, %connection, "player disconnected");

        let mut out = vec![(
            Recipient::AllExcept(connection),
            ServerMessage::PlayerDisconnected { player_id, name },
        )];
        if self.phase == Phase::Lobby {
            out.push((
                Recipient::All,
                ServerMessage::RosterUpdated {
                    players: self.roster.entries(),
                },
            ));
        }
        out
    }

    /// Host: end the game for everyone.
    fn end_game(&mut self) -> Outbox {
        self.phase = Phase::Finished;
        self.ended = true;
        self.clear_transient();
        tracing::info!(code = %self.code, "game ended by host");
        vec![(Recipient::All, ServerMessage::GameEnded)]
    }

    // -- shared helpers --------------------------------------------------

    pub(crate) fn wrong_phase(&self, reason: &'static str) -> GameError {
        GameError::WrongPhase {
            phase: self.phase,
            reason,
        }
    }

    fn require_player(&self, role: Role) -> Result<PlayerId, GameError> {
        let player = role.player_id().ok_or(GameError::NotAPlayer)?;
        if self.roster.get(player).is_none() {
            return Err(GameError::UnknownPlayer(player));
        }
        Ok(player)
    }

    pub(crate) fn is_active(&self, player: PlayerId) -> bool {
        self.active.contains(&player)
    }

    /// Moves a player from active to eliminated and returns the
    /// announcement.
    pub(crate) fn eliminate(&mut self, player_id: PlayerId, reason: &str) -> ServerMessage {
        self.active.retain(|p| *p != player_id);
        if !self.eliminated.contains(&player_id) {
            self.eliminated.push(player_id);
        }
        if let Some(player) = self.roster.get_mut(player_id) {
            player.eliminated = true;
        }
        tracing::info!(code = %self.code, %player_id, reason, "player eliminated");
        ServerMessage::PlayerEliminated {
            player_id,
            name: self.roster.name_of(player_id),
            reason: reason.to_string(),
        }
    }

    /// Takes the next free-text question from the bank.
    pub(crate) fn next_timed_question(&mut self) -> SpeedQuestion {
        let question = self.bank.timed_question(self.timed_cursor);
        self.timed_cursor += 1;
        question
    }

    pub(crate) fn new_question(&self, question: &Question) -> ServerMessage {
        ServerMessage::NewQuestion {
            question: question.view(),
            index: self.question_index + 1,
            total: self.questions_per_round,
            round: self.round,
        }
    }

    /// Drops any in-flight question, tiebreak or pack.
    pub(crate) fn clear_transient(&mut self) {
        self.tiebreak = None;
        self.timed = None;
        self.timed_answers.clear();
        self.answers.clear();
        self.active_pack = None;
        for player in self.roster.iter_mut() {
            player.answered = false;
        }
    }
}

fn require_host(role: Role) -> Result<(), GameError> {
    if role.is_host() {
        Ok(())
    } else {
        Err(GameError::NotHost)
    }
}

/// Milliseconds from `since` to `now`, zero if `now` is earlier.
pub(crate) fn elapsed_ms(since: Instant, now: Instant) -> u64 {
    u64::try_from(now.saturating_duration_since(since).as_millis()).unwrap_or(u64::MAX)
}
