//! Consensus and match evaluation.
//!
//! Two evaluators share the same agreement rule: an unset value never
//! agrees with anything.
//!
//! - **Pairwise** (local modes): every relevant attribute must agree for a
//!   [`MatchOutcome::Match`].
//! - **Group** (networked mode): participants sharing a value earn one point
//!   each per attribute, and the round is classified by the share of points
//!   earned.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeSet};
use crate::error::{SenseError, SenseResult};
use crate::round::{ParticipantId, Submission};

/// Per-attribute comparison result for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Both set and equal.
    Match,
    /// Both set, different values.
    Mismatch,
    /// At least one side left the attribute unset.
    Missing,
}

/// One attribute compared across two submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeComparison {
    /// The attribute compared.
    pub attribute: Attribute,
    /// First participant's value.
    pub left: String,
    /// Second participant's value.
    pub right: String,
    /// How the values compare.
    pub verdict: Verdict,
}

/// Overall result of a pairwise round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// Every relevant attribute agreed.
    Match,
    /// Anything else.
    NoMatch,
}

impl MatchOutcome {
    /// Whether this is a match.
    pub fn is_match(self) -> bool {
        self == Self::Match
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Match => "Now that's some Common Sense!",
            Self::NoMatch => "Uh-oh, that's nonsensical!",
        })
    }
}

/// Detail and outcome of a pairwise evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairEvaluation {
    /// One entry per relevant attribute, in catalog order.
    pub comparisons: Vec<AttributeComparison>,
    /// The round outcome.
    pub outcome: MatchOutcome,
}

/// Compare two submissions over the relevant attributes.
///
/// An empty relevant set can never match.
pub fn evaluate_pair(
    relevant: &AttributeSet,
    left: &Submission,
    right: &Submission,
) -> PairEvaluation {
    let comparisons: Vec<AttributeComparison> = relevant
        .iter()
        .map(|attribute| {
            let (l, r) = (left.get(attribute), right.get(attribute));
            let verdict = if l.is_empty() || r.is_empty() {
                Verdict::Missing
            } else if l == r {
                Verdict::Match
            } else {
                Verdict::Mismatch
            };
            AttributeComparison {
                attribute,
                left: l.to_string(),
                right: r.to_string(),
                verdict,
            }
        })
        .collect();

    let outcome = if !comparisons.is_empty()
        && comparisons.iter().all(|c| c.verdict == Verdict::Match)
    {
        MatchOutcome::Match
    } else {
        MatchOutcome::NoMatch
    };
    PairEvaluation { comparisons, outcome }
}

/// Aggregate classification of a group round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consensus {
    /// No points were earned.
    Nonsensical,
    /// Some, but not all, points were earned.
    Partial,
    /// Every participant agreed on every attribute.
    Common,
}

impl fmt::Display for Consensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nonsensical => "Nonsensical!",
            Self::Partial => "Partial Sense...",
            Self::Common => "Common Sense!",
        })
    }
}

/// Value groups for one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeGroups {
    /// The attribute.
    pub attribute: Attribute,
    /// Participants per submitted value; unset values are left out.
    pub groups: BTreeMap<String, Vec<ParticipantId>>,
}

impl AttributeGroups {
    /// Participants that share their value with at least one other.
    pub fn scoring_members(&self) -> impl Iterator<Item = &ParticipantId> {
        self.groups
            .values()
            .filter(|members| members.len() >= 2)
            .flatten()
    }
}

/// Detail and outcome of a group evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEvaluation {
    /// Groups for each relevant attribute, in catalog order.
    pub attributes: Vec<AttributeGroups>,
    /// Points earned this round by each participant (zero included).
    pub points: BTreeMap<ParticipantId, u32>,
    /// Sum of all points.
    pub earned: u32,
    /// `participants × relevant attributes`.
    pub maximum: u32,
    /// The round classification.
    pub consensus: Consensus,
}

/// Score a group round.
///
/// Fails with [`SenseError::IncompleteParticipants`] when fewer than
/// `expected` submissions are provided.
pub fn evaluate_group(
    relevant: &AttributeSet,
    submissions: &[(ParticipantId, &Submission)],
    expected: usize,
) -> SenseResult<GroupEvaluation> {
    if submissions.len() < expected {
        return Err(SenseError::IncompleteParticipants {
            expected,
            actual: submissions.len(),
        });
    }

    let mut points: BTreeMap<ParticipantId, u32> =
        submissions.iter().map(|(id, _)| (id.clone(), 0)).collect();
    let mut attributes = Vec::with_capacity(relevant.len());

    for attribute in relevant.iter() {
        let mut groups: BTreeMap<String, Vec<ParticipantId>> = BTreeMap::new();
        for (id, submission) in submissions {
            let value = submission.get(attribute);
            if !value.is_empty() {
                groups.entry(value.to_string()).or_default().push(id.clone());
            }
        }
        let entry = AttributeGroups { attribute, groups };
        for member in entry.scoring_members() {
            if let Some(p) = points.get_mut(member) {
                *p += 1;
            }
        }
        attributes.push(entry);
    }

    let earned: u32 = points.values().sum();
    let maximum = (submissions.len() * relevant.len()) as u32;
    let consensus = if earned == 0 {
        Consensus::Nonsensical
    } else if earned == maximum {
        Consensus::Common
    } else {
        Consensus::Partial
    };

    Ok(GroupEvaluation {
        attributes,
        points,
        earned,
        maximum,
        consensus,
    })
}
