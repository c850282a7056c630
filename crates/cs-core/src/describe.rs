//! Describe-mode rounds.
//!
//! One participant privately receives a target object and encodes it with
//! attribute selections. Once they lock, the other participant is offered a
//! shuffled multiple-choice list and picks the object they think was
//! described.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};

use crate::error::{SenseError, SenseResult};
use crate::round::{ParticipantId, RoundStatus};

/// Default number of wrong answers offered next to the target.
pub const DEFAULT_DISTRACTORS: usize = 6;

/// Where a describe round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescribePhase {
    /// The describer is choosing attributes.
    Describing,
    /// The guesser is choosing among the offered objects.
    Guessing,
    /// A guess was made.
    Resolved,
}

/// Result of a guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeResult {
    /// Who described.
    pub describer: ParticipantId,
    /// Who guessed.
    pub guesser: ParticipantId,
    /// The secret object.
    pub target: String,
    /// The object picked.
    pub guess: String,
    /// Whether the pick was right.
    pub correct: bool,
}

/// State of one describe round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeRound {
    describer: ParticipantId,
    guesser: ParticipantId,
    target: String,
    choices: Vec<String>,
    phase: DescribePhase,
}

impl DescribeRound {
    /// Start a round with a target drawn uniformly from `pool`.
    ///
    /// Fails with [`SenseError::DataNotLoaded`] on an empty pool.
    pub fn start(
        describer: ParticipantId,
        guesser: ParticipantId,
        pool: &[String],
        rng: &mut impl Rng,
    ) -> SenseResult<Self> {
        let target = pool.choose(rng).ok_or(SenseError::DataNotLoaded)?.clone();
        Ok(Self {
            describer,
            guesser,
            target,
            choices: Vec::new(),
            phase: DescribePhase::Describing,
        })
    }

    /// The describing participant.
    pub fn describer(&self) -> &ParticipantId {
        &self.describer
    }

    /// The guessing participant.
    pub fn guesser(&self) -> &ParticipantId {
        &self.guesser
    }

    /// The secret object. Front ends show it to the describer only.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Offered objects; empty until the describer locks.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Current phase.
    pub fn phase(&self) -> DescribePhase {
        self.phase
    }

    /// Move to guessing once the describer has locked.
    pub fn open_guessing(
        &mut self,
        pool: &[String],
        distractors: usize,
        rng: &mut impl Rng,
    ) -> SenseResult<&[String]> {
        if self.phase != DescribePhase::Describing {
            return Err(SenseError::InvalidRoundState {
                operation: "offer choices",
                status: RoundStatus::LockedPending,
            });
        }
        self.choices = build_choices(&self.target, pool, distractors, rng);
        self.phase = DescribePhase::Guessing;
        Ok(&self.choices)
    }

    /// Resolve the round with the guesser's pick.
    pub fn guess(&mut self, choice: &str) -> SenseResult<DescribeResult> {
        match self.phase {
            DescribePhase::Describing => {
                return Err(SenseError::InvalidRoundState {
                    operation: "guess",
                    status: RoundStatus::Open,
                });
            }
            DescribePhase::Resolved => {
                return Err(SenseError::InvalidRoundState {
                    operation: "guess",
                    status: RoundStatus::Resolved,
                });
            }
            DescribePhase::Guessing => {}
        }
        let wanted = choice.trim();
        let picked = self
            .choices
            .iter()
            .find(|c| c.as_str() == wanted)
            .or_else(|| self.choices.iter().find(|c| c.eq_ignore_ascii_case(wanted)))
            .ok_or_else(|| SenseError::InvalidChoice(choice.to_string()))?
            .clone();
        self.phase = DescribePhase::Resolved;
        Ok(DescribeResult {
            describer: self.describer.clone(),
            guesser: self.guesser.clone(),
            correct: picked == self.target,
            target: self.target.clone(),
            guess: picked,
        })
    }
}

/// The target plus up to `distractors` distinct other objects, shuffled.
///
/// Distractors are sampled uniformly without replacement. A pool with
/// fewer distinct objects contributes all of them.
pub fn build_choices(
    target: &str,
    pool: &[String],
    distractors: usize,
    rng: &mut impl Rng,
) -> Vec<String> {
    let mut others: Vec<&String> = Vec::new();
    for object in pool {
        if object != target && !others.contains(&object) {
            others.push(object);
        }
    }
    let mut choices: Vec<String> = others
        .choose_multiple(rng, distractors)
        .map(|s| (*s).clone())
        .collect();
    choices.push(target.to_string());
    choices.shuffle(rng);
    choices
}
