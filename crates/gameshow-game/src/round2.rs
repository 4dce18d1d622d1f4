//! Round 2: turn-based packs and the final result.
//!
//! After the host confirms the speed order, the loop is:
//!
//! ```text
//! select_pack → start_pack_questions → answers / host verification
//!             → pack complete (all answered or ended early) → end_turn
//! ```
//!
//! until `turns_per_player × |turn order|` turns are done. The winner has
//! the highest Round-2 score; a tie goes to the faster speed-order time.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::time::Instant;

use gameshow_protocol::{FinalScore, PlayerId, ServerMessage};
use gameshow_session::Role;

use crate::fanout::{Outbox, Recipient};
use crate::session::{ActivePack, elapsed_ms};
use crate::{GameError, GameSession, Phase, Round2Stage};

impl GameSession {
    /// Host: accept the speed order as the turn order.
    pub(crate) fn confirm_speed_order(&mut self) -> Result<Outbox, GameError> {
        if self.round2_stage != Some(Round2Stage::SpeedResolved) {
            return Err(self.wrong_phase("the speed order isn't ready"));
        }
        self.round2_order = self.active.clone();
        self.turn_index = 0;
        self.turns_completed = 0;
        self.round2_scores = self.round2_order.iter().map(|id| (*id, 0)).collect();
        self.used_packs.clear();
        self.active_pack = None;
        self.round2_stage = Some(Round2Stage::Turns);

        tracing::info!(code = %self.code, order = ?self.round2_order, "turn order confirmed");

        Ok(vec![(Recipient::All, self.packs_available())])
    }

    pub(crate) fn select_pack(
        &mut self,
        player_id: PlayerId,
        pack_id: &str,
        now: Instant,
    ) -> Result<Outbox, GameError> {
        self.require_turns()?;
        if !self.is_active(player_id) {
            return Err(GameError::Eliminated);
        }
        if self.active_pack.is_some() {
            return Err(GameError::PackInProgress);
        }
        let pack = self
            .bank
            .pack(pack_id)
            .ok_or_else(|| GameError::PackNotFound(pack_id.to_string()))?
            .clone();
        if self.used_packs.contains(pack_id) {
            return Err(GameError::PackAlreadySelected(pack_id.to_string()));
        }

        tracing::info!(code = %self.code, %player_id, pack = pack_id, "pack selected");

        let msg = ServerMessage::PackSelected {
            pack_id: pack.id.clone(),
            title: pack.title.clone(),
            selector_name: self.roster.name_of(player_id),
        };
        self.used_packs.insert(pack.id.clone());
        self.active_pack = Some(ActivePack {
            pack,
            owner: player_id,
            score: 0,
            started: false,
            answered: BTreeSet::new(),
            selected_at: now,
        });
        Ok(vec![(Recipient::All, msg)])
    }

    /// Reveals the active pack: answer keys to the host, questions only
    /// to the players.
    pub(crate) fn start_pack_questions(&mut self, role: Role) -> Result<Outbox, GameError> {
        self.require_turns()?;
        let time_limit = self.config.pack_time_limit_secs;
        let Some(active) = self.active_pack.as_mut() else {
            return Err(GameError::NoActivePack);
        };
        if let Role::Player(id) = role {
            if id != active.owner {
                return Err(GameError::NotPackOwner);
            }
        }
        active.started = true;

        let title = active.pack.title.clone();
        let host_view = active.pack.question_views(true);
        let player_view = active.pack.question_views(false);
        let current_player = self.roster.player_ref(active.owner);

        Ok(vec![
            (
                Recipient::Host,
                ServerMessage::PackQuestions {
                    title: title.clone(),
                    questions: host_view,
                    current_player: current_player.clone(),
                    time_limit,
                },
            ),
            (
                Recipient::Players,
                ServerMessage::PackQuestions {
                    title,
                    questions: player_view,
                    current_player,
                    time_limit,
                },
            ),
        ])
    }

    /// The pack owner's answer, checked against the key.
    pub(crate) fn submit_pack_answer(
        &mut self,
        player_id: PlayerId,
        answer: &str,
        question_index: usize,
        now: Instant,
    ) -> Result<Outbox, GameError> {
        self.require_turns()?;
        let phase = self.phase;
        let active = self.active_pack.as_mut().ok_or(GameError::NoActivePack)?;
        if active.owner != player_id {
            return Err(GameError::NotPackOwner);
        }
        if !active.started {
            return Err(GameError::WrongPhase {
                phase,
                reason: "the pack's questions haven't been shown yet",
            });
        }
        let key = active
            .pack
            .questions
            .get(question_index)
            .map(|q| q.answer.clone())
            .ok_or(GameError::InvalidQuestionIndex(question_index))?;
        if !active.answered.insert(question_index) {
            return Err(GameError::AlreadyAnswered);
        }

        let is_correct = crate::content::answers_match(answer, &key);
        if is_correct {
            active.score += 1;
        }
        let msg = ServerMessage::PackAnswerVerified {
            is_correct,
            question_index,
            running_score: active.score,
            submitted_answer: Some(answer.to_string()),
            correct_answer: Some(key),
        };
        Ok(self.after_pack_answer(msg, now))
    }

    /// Host: mark an answer right or wrong by hand.
    pub(crate) fn verify_pack_answer(
        &mut self,
        is_correct: bool,
        question_index: usize,
        now: Instant,
    ) -> Result<Outbox, GameError> {
        self.require_turns()?;
        let phase = self.phase;
        let active = self.active_pack.as_mut().ok_or(GameError::NoActivePack)?;
        if !active.started {
            return Err(GameError::WrongPhase {
                phase,
                reason: "the pack's questions haven't been shown yet",
            });
        }
        if question_index >= active.pack.questions.len() {
            return Err(GameError::InvalidQuestionIndex(question_index));
        }
        if !active.answered.insert(question_index) {
            return Err(GameError::AlreadyAnswered);
        }
        if is_correct {
            active.score += 1;
        }
        let msg = ServerMessage::PackAnswerVerified {
            is_correct,
            question_index,
            running_score: active.score,
            submitted_answer: None,
            correct_answer: None,
        };
        Ok(self.after_pack_answer(msg, now))
    }

    fn after_pack_answer(&mut self, verified: ServerMessage, now: Instant) -> Outbox {
        let mut out = vec![(Recipient::All, verified)];
        let finished = self
            .active_pack
            .as_ref()
            .is_some_and(|a| a.answered.len() >= a.pack.questions.len());
        if finished {
            out.extend(self.complete_pack(now));
        }
        out
    }

    pub(crate) fn end_pack_early(&mut self, now: Instant) -> Result<Outbox, GameError> {
        self.require_turns()?;
        if self.active_pack.is_none() {
            return Err(GameError::NoActivePack);
        }
        Ok(self.complete_pack(now))
    }

    /// Commits the active pack's score to its owner.
    pub(crate) fn complete_pack(&mut self, now: Instant) -> Outbox {
        let Some(active) = self.active_pack.take() else {
            return Vec::new();
        };
        let total = self.round2_scores.entry(active.owner).or_insert(0);
        *total += active.score;
        let round2_total = *total;

        tracing::info!(
            code = %self.code,
            player_id = %active.owner,
            pack = %active.pack.id,
            score = active.score,
            round2_total,
            duration_ms = elapsed_ms(active.selected_at, now),
            "pack complete"
        );

        vec![(
            Recipient::All,
            ServerMessage::PackComplete {
                player_id: active.owner,
                score: active.score,
                total: active.pack.questions.len(),
                round2_total,
            },
        )]
    }

    /// Host: close the current turn. A pack still in play is committed
    /// first.
    pub(crate) fn end_turn(&mut self, now: Instant) -> Result<Outbox, GameError> {
        self.require_turns()?;
        let mut out = self.complete_pack(now);
        self.turns_completed += 1;

        if self.turns_completed >= self.total_turns() {
            out.extend(self.finish_game(now));
            return Ok(out);
        }
        self.advance_turn();
        out.push((Recipient::All, self.packs_available()));
        Ok(out)
    }

    /// Cleans up after an active player left during Round 2.
    pub(crate) fn round2_after_departure(&mut self, player_id: PlayerId) -> Outbox {
        match self.round2_stage {
            Some(Round2Stage::Speed) => {
                self.timed_answers.remove(&player_id);
                if self.all_speed_answers_in() {
                    return self.resolve_speed();
                }
                Vec::new()
            }
            Some(Round2Stage::Turns) if self.current_turn_player() == Some(player_id) => {
                self.advance_turn();
                vec![(Recipient::All, self.packs_available())]
            }
            _ => Vec::new(),
        }
    }

    /// Ends the game and announces the result.
    pub(crate) fn finish_game(&mut self, now: Instant) -> Outbox {
        let mut out = self.complete_pack(now);
        self.clear_transient();
        self.phase = Phase::Finished;
        self.round2_stage = None;

        let candidates: Vec<(PlayerId, u32, Option<u64>)> = self
            .active
            .iter()
            .map(|id| (*id, self.round2_score(*id), self.speed_time(*id)))
            .collect();
        self.winners = pick_winners(&candidates);

        let final_scores = self
            .roster
            .iter()
            .map(|p| FinalScore {
                player_id: p.id,
                name: p.name.clone(),
                total_score: p.score,
                round2_score: self.round2_score(p.id),
                eliminated: p.eliminated,
            })
            .collect();

        tracing::info!(code = %self.code, winners = ?self.winners, "game finished");

        out.push((
            Recipient::All,
            ServerMessage::GameOver {
                winners: self
                    .winners
                    .iter()
                    .map(|id| self.roster.player_ref(*id))
                    .collect(),
                final_scores,
            },
        ));
        out
    }

    pub(crate) fn packs_available(&self) -> ServerMessage {
        ServerMessage::PacksAvailable {
            packs: self
                .bank
                .packs
                .iter()
                .map(|p| p.summary(self.used_packs.contains(&p.id)))
                .collect(),
            current_turn_index: self.turn_index,
            current_player: self
                .current_turn_player()
                .map(|id| self.roster.player_ref(id)),
            turns_completed: self.turns_completed,
            total_turns: self.total_turns(),
        }
    }

    fn total_turns(&self) -> usize {
        self.config.turns_per_player * self.round2_order.len()
    }

    /// Moves the turn to the next player in the order who is still active.
    fn advance_turn(&mut self) {
        let n = self.round2_order.len();
        for step in 1..=n {
            let index = (self.turn_index + step) % n;
            if self.is_active(self.round2_order[index]) {
                self.turn_index = index;
                return;
            }
        }
    }

    fn require_turns(&self) -> Result<(), GameError> {
        if self.round2_stage == Some(Round2Stage::Turns) {
            Ok(())
        } else {
            Err(self.wrong_phase("packs are not being played"))
        }
    }
}

/// Highest Round-2 score wins; equal scores go to the smaller speed time.
/// A missing time counts as slowest. More than one winner only when both
/// score and time are equal.
pub(crate) fn pick_winners(candidates: &[(PlayerId, u32, Option<u64>)]) -> Vec<PlayerId> {
    let key = |score: u32, time: Option<u64>| (score, Reverse(time.unwrap_or(u64::MAX)));
    let Some(best) = candidates.iter().map(|(_, s, t)| key(*s, *t)).max() else {
        return Vec::new();
    };
    candidates
        .iter()
        .filter(|(_, s, t)| key(*s, *t) == best)
        .map(|(id, _, _)| *id)
        .collect()
}
