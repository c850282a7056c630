//! Scores, counters and streaks.

use serde::{Deserialize, Serialize};

use crate::evaluate::{GroupEvaluation, MatchOutcome};
use crate::round::ParticipantId;

/// Session-wide scoring state.
///
/// Scores are kept in roster order so the leaderboard breaks ties by join
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    correct: u32,
    incorrect: u32,
    streak: u32,
    best_streak: u32,
    scores: Vec<(ParticipantId, u32)>,
}

impl Scoreboard {
    /// A board with a zero score for each participant.
    pub fn new(participants: impl IntoIterator<Item = ParticipantId>) -> Self {
        Self {
            scores: participants.into_iter().map(|id| (id, 0)).collect(),
            ..Self::default()
        }
    }

    /// Rounds won.
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// Rounds lost.
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    /// Current run of consecutive matches (streak mode).
    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Longest streak this session.
    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    /// Percentage of rounds won, rounded to the nearest integer.
    pub fn match_rate(&self) -> u32 {
        let total = self.correct + self.incorrect;
        if total == 0 {
            return 0;
        }
        (f64::from(self.correct) * 100.0 / f64::from(total)).round() as u32
    }

    /// A participant's score (0 if unknown).
    pub fn score(&self, id: &ParticipantId) -> u32 {
        self.scores
            .iter()
            .find(|(p, _)| p == id)
            .map_or(0, |(_, s)| *s)
    }

    /// Scores in roster order.
    pub fn scores(&self) -> &[(ParticipantId, u32)] {
        &self.scores
    }

    /// Scores sorted descending; equal scores keep roster order.
    pub fn leaderboard(&self) -> Vec<(ParticipantId, u32)> {
        let mut board = self.scores.clone();
        board.sort_by(|a, b| b.1.cmp(&a.1));
        board
    }

    /// Track a new participant with a zero score.
    pub fn add_participant(&mut self, id: ParticipantId) {
        if !self.scores.iter().any(|(p, _)| *p == id) {
            self.scores.push((id, 0));
        }
    }

    /// Stop tracking a participant.
    pub fn remove_participant(&mut self, id: &ParticipantId) {
        self.scores.retain(|(p, _)| p != id);
    }

    /// Apply a pairwise outcome. On a match every listed participant gains a
    /// point; with `track_streak` the streak grows or resets.
    pub fn record_pair(
        &mut self,
        outcome: MatchOutcome,
        participants: &[ParticipantId],
        track_streak: bool,
    ) {
        match outcome {
            MatchOutcome::Match => {
                self.correct += 1;
                for id in participants {
                    self.award(id, 1);
                }
                if track_streak {
                    self.streak += 1;
                    self.best_streak = self.best_streak.max(self.streak);
                }
            }
            MatchOutcome::NoMatch => {
                self.incorrect += 1;
                if track_streak {
                    self.streak = 0;
                }
            }
        }
    }

    /// Apply a describe-mode guess. Both players score on a correct guess.
    pub fn record_describe(
        &mut self,
        correct: bool,
        describer: &ParticipantId,
        guesser: &ParticipantId,
    ) {
        if correct {
            self.correct += 1;
            self.award(describer, 1);
            self.award(guesser, 1);
        } else {
            self.incorrect += 1;
        }
    }

    /// Add group-round points to the running totals.
    pub fn record_group(&mut self, evaluation: &GroupEvaluation) {
        for (id, points) in &evaluation.points {
            self.award(id, *points);
        }
    }

    /// Zero the scores and counters, keeping the roster and the best streak.
    pub fn reset(&mut self) {
        self.correct = 0;
        self.incorrect = 0;
        self.streak = 0;
        for (_, score) in &mut self.scores {
            *score = 0;
        }
    }

    fn award(&mut self, id: &ParticipantId, points: u32) {
        match self.scores.iter_mut().find(|(p, _)| p == id) {
            Some((_, score)) => *score += points,
            None => self.scores.push((id.clone(), points)),
        }
    }
}
