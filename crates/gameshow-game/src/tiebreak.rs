//! Tiebreak sub-round for a shared lowest Round-1 score.
//!
//! One free-text question goes to the whole session, but only the tied
//! players may answer. Time is measured on the server from question issue.
//! Once every participant has answered, one of them is eliminated:
//!
//! 1. the slowest *wrong* answer, if anyone was wrong;
//! 2. otherwise the slowest answer overall.

use std::time::Instant;

use gameshow_protocol::{PlayerId, ServerMessage, TimedResult};
use gameshow_transport::ConnectionId;

use crate::fanout::{Outbox, Recipient};
use crate::session::{TimedAnswer, TimedQuestion, elapsed_ms};
use crate::{GameError, GameSession};

impl GameSession {
    pub(crate) fn start_tiebreak(&mut self, participants: Vec<PlayerId>, now: Instant) -> Outbox {
        let question = self.next_timed_question();
        let view = question.view();
        let refs = participants
            .iter()
            .map(|id| self.roster.player_ref(*id))
            .collect();

        tracing::info!(
            code = %self.code,
            participants = ?participants,
            question = %question.id,
            "tiebreak started"
        );

        let tied_count = participants.len();
        self.tiebreak = Some(participants);
        self.timed = Some(TimedQuestion {
            question,
            issued_at: now,
        });
        self.timed_answers.clear();

        vec![
            (
                Recipient::All,
                ServerMessage::TiebreakStarted {
                    tied_count,
                    participants: refs,
                },
            ),
            (
                Recipient::All,
                ServerMessage::TiebreakQuestion { question: view },
            ),
        ]
    }

    pub(crate) fn submit_tiebreak_answer(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        answer: String,
        now: Instant,
    ) -> Result<Outbox, GameError> {
        let Some(participants) = &self.tiebreak else {
            return Err(self.wrong_phase("no tiebreak is in progress"));
        };
        if !participants.contains(&player_id) {
            return Err(GameError::NotParticipant);
        }
        if self.timed_answers.contains_key(&player_id) {
            return Err(GameError::AlreadyAnswered);
        }
        let issued_at = self.timed.as_ref().map_or(now, |t| t.issued_at);
        let elapsed_ms = elapsed_ms(issued_at, now);

        tracing::debug!(code = %self.code, %player_id, elapsed_ms, "tiebreak answer received");
        self.timed_answers
            .insert(player_id, TimedAnswer { answer, elapsed_ms });

        let mut out = vec![(
            Recipient::Connection(connection),
            ServerMessage::TimedAnswerReceived { elapsed_ms },
        )];
        let everyone_answered = self
            .tiebreak
            .as_ref()
            .is_some_and(|ids| ids.iter().all(|id| self.timed_answers.contains_key(id)));
        if everyone_answered {
            out.extend(self.resolve_tiebreak(None));
        }
        Ok(out)
    }

    /// Picks the loser and closes the tiebreak.
    ///
    /// `departed` is a participant who left mid-tiebreak; they have
    /// already been eliminated and become the tiebreak's loser.
    pub(crate) fn resolve_tiebreak(&mut self, departed: Option<PlayerId>) -> Outbox {
        let Some(participants) = self.tiebreak.take() else {
            return Vec::new();
        };
        let question = self.timed.take().map(|t| t.question);
        let answers = std::mem::take(&mut self.timed_answers);

        let results: Vec<TimedResult> = participants
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

        let loser = departed
            .or_else(|| tiebreak_loser(&results))
            .or_else(|| participants.last().copied());
        let Some(loser) = loser else {
            return vec![(Recipient::All, ServerMessage::RoundComplete { round: 1 })];
        };

        tracing::info!(code = %self.code, %loser, "tiebreak resolved");

        let mut out = vec![(
            Recipient::All,
            ServerMessage::TiebreakResults {
                results,
                eliminated: self.roster.player_ref(loser),
            },
        )];
        if departed.is_none() {
            out.push((Recipient::All, self.eliminate(loser, "Lost the tiebreak")));
        }
        out.push((Recipient::All, ServerMessage::RoundComplete { round: 1 }));
        out
    }
}

/// The slowest wrong answer, or the slowest answer if nobody was wrong.
/// Equal times go to the later entry.
pub(crate) fn tiebreak_loser(results: &[TimedResult]) -> Option<PlayerId> {
    slowest(results.iter().filter(|r| !r.correct)).or_else(|| slowest(results.iter()))
}

/// `max_by_key` keeps the last of equal maxima.
fn slowest<'a>(pool: impl Iterator<Item = &'a TimedResult>) -> Option<PlayerId> {
    pool.max_by_key(|r| r.elapsed_ms).map(|r| r.player_id)
}
