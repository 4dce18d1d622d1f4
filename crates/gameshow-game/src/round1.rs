//! Round 1: multiple-choice questions with one elimination at round end.
//!
//! The host drives the pace. Each correct answer is worth one point. When
//! the last question is done, the lowest round score is eliminated; a
//! shared lowest score goes to a tiebreak instead.

use gameshow_protocol::{PlayerId, ServerMessage};
use gameshow_transport::ConnectionId;

use crate::fanout::{Outbox, Recipient};
use crate::{GameError, GameSession, Phase};

impl GameSession {
    /// A player answers the in-flight question.
    pub(crate) fn submit_answer(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        question_id: u32,
        choice: usize,
    ) -> Result<Outbox, GameError> {
        let (question_key, correct_answer) = match self.current_question() {
            Some(q) => (q.id, q.correct_answer),
            None => return Err(self.wrong_phase("no question is open")),
        };
        let player = self
            .roster
            .get_mut(player_id)
            .ok_or(GameError::UnknownPlayer(player_id))?;
        if player.eliminated {
            return Err(GameError::Eliminated);
        }
        if player.answered {
            return Err(GameError::AlreadyAnswered);
        }
        if question_id != question_key {
            return Err(GameError::StaleQuestion);
        }

        let correct = choice == correct_answer;
        player.answered = true;
        if correct {
            player.round_score += 1;
            player.score += 1;
        }
        self.answers.insert(player_id, choice);

        tracing::debug!(code = %self.code, %player_id, question_id, correct, "answer received");

        let mut out = vec![(
            Recipient::Connection(connection),
            ServerMessage::AnswerAcknowledged { correct },
        )];
        if self.all_answered() {
            out.push((Recipient::All, self.reveal()));
        }
        Ok(out)
    }

    /// Host override: reveal without waiting for everyone. Scores are
    /// untouched.
    pub(crate) fn show_answer(&mut self) -> Result<Outbox, GameError> {
        if self.current_question().is_none() {
            return Err(self.wrong_phase("no question is open"));
        }
        Ok(vec![(Recipient::All, self.reveal())])
    }

    /// Host: next question, or end the round after the last one.
    pub(crate) fn advance_question(&mut self, now: std::time::Instant) -> Result<Outbox, GameError> {
        if self.phase != Phase::Round1 {
            return Err(self.wrong_phase("Round 1 is not running"));
        }
        if self.tiebreak.is_some() {
            return Err(self.wrong_phase("a tiebreak is in progress"));
        }
        if self.question_index >= self.questions_per_round {
            return Err(self.wrong_phase("the round is already over"));
        }

        for player in self.roster.iter_mut() {
            player.answered = false;
        }
        self.answers.clear();
        self.question_index += 1;

        if let Some(question) = self.current_question() {
            return Ok(vec![(Recipient::Active, self.new_question(question))]);
        }
        Ok(self.end_round1(now))
    }

    /// Eliminates the unique lowest scorer, or starts a tiebreak among
    /// everyone sharing the lowest score.
    fn end_round1(&mut self, now: std::time::Instant) -> Outbox {
        let tied = lowest_scorers(
            self.active
                .iter()
                .filter_map(|id| self.roster.get(*id))
                .map(|p| (p.id, p.round_score)),
        );

        tracing::info!(code = %self.code, tied = tied.len(), "round 1 complete");

        if tied.len() >= 2 {
            return self.start_tiebreak(tied, now);
        }
        let mut out = Vec::new();
        if let Some(loser) = tied.first() {
            out.push((Recipient::All, self.eliminate(*loser, "Lowest score in Round 1")));
        }
        out.push((Recipient::All, ServerMessage::RoundComplete { round: 1 }));
        out
    }

    /// Re-checks the reveal quorum after a player left mid-question.
    pub(crate) fn round1_after_departure(
        &mut self,
        player_id: PlayerId,
        had_answered: bool,
    ) -> Outbox {
        if self
            .tiebreak
            .as_ref()
            .is_some_and(|t| t.contains(&player_id))
        {
            return self.resolve_tiebreak(Some(player_id));
        }
        if !had_answered && self.current_question().is_some() && self.all_answered() {
            return vec![(Recipient::All, self.reveal())];
        }
        Vec::new()
    }

    /// Every active player has answered the in-flight question.
    fn all_answered(&self) -> bool {
        self.active
            .iter()
            .filter_map(|id| self.roster.get(*id))
            .all(|p| p.answered)
    }

    fn reveal(&self) -> ServerMessage {
        ServerMessage::QuestionRevealed {
            correct_answer: self
                .current_question()
                .map(|q| q.correct_answer)
                .unwrap_or_default(),
            scores: self.roster.round_scores(),
        }
    }
}

/// Everyone holding the minimum score, in input order.
fn lowest_scorers(scores: impl Iterator<Item = (PlayerId, u32)>) -> Vec<PlayerId> {
    let scores: Vec<(PlayerId, u32)> = scores.collect();
    let Some(min) = scores.iter().map(|(_, s)| *s).min() else {
        return Vec::new();
    };
    scores
        .into_iter()
        .filter(|(_, s)| *s == min)
        .map(|(id, _)| id)
        .collect()
}
