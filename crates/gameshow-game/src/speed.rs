//! Speed-order question: opens Round 2 and fixes its turn order.
//!
//! Every active player answers one free-text question. Correct answers go
//! first, then wrong ones, each fastest first. Nobody is eliminated here.
//! Each player's time is kept until the end of the game as the final
//! tiebreaker.

use std::time::Instant;

use gameshow_protocol::{OrderEntry, PlayerId, ServerMessage, TimedResult};
use gameshow_transport::ConnectionId;

use crate::fanout::{Outbox, Recipient};
use crate::session::{TimedAnswer, TimedQuestion, elapsed_ms};
use crate::{GameError, GameSession, Phase, Round2Stage, TimingSource};

impl GameSession {
    /// Host: close Round 1 and put out the speed question.
    pub(crate) fn begin_round2(&mut self, now: Instant) -> Result<Outbox, GameError> {
        if self.phase != Phase::Round1 {
            return Err(self.wrong_phase("Round 1 is not running"));
        }
        if self.tiebreak.is_some() {
            return Err(self.wrong_phase("a tiebreak is in progress"));
        }
        if self.question_index < self.questions_per_round {
            return Err(self.wrong_phase("Round 1 still has questions left"));
        }

        self.phase = Phase::Round2;
        self.round = 2;
        self.clear_transient();
        for player in self.roster.iter_mut() {
            player.round_score = 0;
        }

        tracing::info!(code = %self.code, players = self.active.len(), "round 2 started");

        if self.active.len() <= 1 {
            return Ok(self.finish_game(now));
        }

        let question = self.next_timed_question();
        let view = question.view();
        self.timed = Some(TimedQuestion {
            question,
            issued_at: now,
        });
        self.round2_stage = Some(Round2Stage::Speed);

        Ok(vec![
            (
                Recipient::All,
                ServerMessage::Round2Started {
                    phase: "speed".into(),
                },
            ),
            (
                Recipient::Active,
                ServerMessage::SpeedQuestion { question: view },
            ),
        ])
    }

    pub(crate) fn submit_speed_answer(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        question_id: &str,
        answer: String,
        reported_ms: Option<u64>,
        now: Instant,
    ) -> Result<Outbox, GameError> {
        if self.round2_stage != Some(Round2Stage::Speed) {
            return Err(self.wrong_phase("no speed question is open"));
        }
        if !self.is_active(player_id) {
            return Err(GameError::Eliminated);
        }
        if self.timed_answers.contains_key(&player_id) {
            return Err(GameError::AlreadyAnswered);
        }
        let Some(timed) = &self.timed else {
            return Err(self.wrong_phase("no speed question is open"));
        };
        if timed.question.id != question_id {
            return Err(GameError::StaleQuestion);
        }

        let measured = elapsed_ms(timed.issued_at, now);
        let elapsed_ms = match self.config.speed_timing {
            TimingSource::ClientReported => reported_ms.unwrap_or(measured),
            TimingSource::ServerStamped => measured,
        };

        tracing::debug!(code = %self.code, %player_id, elapsed_ms, "speed answer received");
        self.timed_answers
            .insert(player_id, TimedAnswer { answer, elapsed_ms });

        let mut out = vec![(
            Recipient::Connection(connection),
            ServerMessage::TimedAnswerReceived { elapsed_ms },
        )];
        if self.all_speed_answers_in() {
            out.extend(self.resolve_speed());
        }
        Ok(out)
    }

    pub(crate) fn all_speed_answers_in(&self) -> bool {
        self.active
            .iter()
            .all(|id| self.timed_answers.contains_key(id))
    }

    /// Reorders the active players by the speed results and records each
    /// player's time.
    pub(crate) fn resolve_speed(&mut self) -> Outbox {
        let question = self.timed.take().map(|t| t.question);
        let answers = std::mem::take(&mut self.timed_answers);

        let results: Vec<TimedResult> = self
            .active
            .iter()
            .filter_map(|id| {
                let answer = answers.get(id)?;
                Some(TimedResult {
                    player_id: *id,
                    name: self.roster.name_of(*id),
                    answer: answer.answer.clone(),
                    elapsed_ms: answer.elapsed_ms,
                    correct: question.as_ref().is_some_and(|q| q.accepts(&answer.answer)),
                })
            })
            .collect();
        let ordered = speed_order(results);

        let mut order: Vec<PlayerId> = ordered.iter().map(|r| r.player_id).collect();
        for id in &self.active {
            if !order.contains(id) {
                order.push(*id);
            }
        }
        self.active = order;
        for r in &ordered {
            self.speed_times.insert(r.player_id, r.elapsed_ms);
        }
        self.round2_stage = Some(Round2Stage::SpeedResolved);

        tracing::info!(code = %self.code, order = ?self.active, "speed order resolved");

        let entries = self.order_entries(&self.active);
        vec![
            (
                Recipient::All,
                ServerMessage::SpeedResults {
                    results: ordered,
                    eliminated: None,
                },
            ),
            (Recipient::All, ServerMessage::PlayerOrder { order: entries }),
        ]
    }

    pub(crate) fn order_entries(&self, order: &[PlayerId]) -> Vec<OrderEntry> {
        order
            .iter()
            .enumerate()
            .map(|(i, id)| OrderEntry {
                player_id: *id,
                name: self.roster.name_of(*id),
                position: i + 1,
                elapsed_ms: self.speed_time(*id).unwrap_or_default(),
            })
            .collect()
    }
}

/// Correct answers first, then incorrect, each by ascending time. The sort
/// is stable, so equal times keep their input order.
pub(crate) fn speed_order(results: Vec<TimedResult>) -> Vec<TimedResult> {
    let (mut correct, mut wrong): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.correct);
    correct.sort_by_key(|r| r.elapsed_ms);
    wrong.sort_by_key(|r| r.elapsed_ms);
    correct.extend(wrong);
    correct
}
