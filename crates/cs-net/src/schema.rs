//! Store layout and wire records for a networked game.
//!
//! ```text
//! games/{code}/status                  "waiting" | "active" | "finished"
//! games/{code}/created                 RFC 3339 timestamp
//! games/{code}/players/{id}            PlayerRecord
//! games/{code}/currentRound            RoundRecord
//! games/{code}/playerAnswers/{id}      AnswerRecord
//! games/{code}/roundResult             RoundResultRecord
//! games/{code}/scores/{id}             running total
//! gameHistory/{key}                    GameRecord
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cs_core::evaluate::GroupEvaluation;
use cs_core::{Attribute, Consensus, Round, SenseResult, Submission};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{NetError, NetResult};

/// Root of the completed-game records.
pub const HISTORY_ROOT: &str = "gameHistory";

/// Path of a game room.
pub fn game(code: &str) -> String {
    format!("games/{code}")
}

/// Path of a room's status.
pub fn status(code: &str) -> String {
    format!("games/{code}/status")
}

/// Path of a room's creation time.
pub fn created(code: &str) -> String {
    format!("games/{code}/created")
}

/// Path of a room's roster.
pub fn players(code: &str) -> String {
    format!("games/{code}/players")
}

/// Path of one player.
pub fn player(code: &str, id: &str) -> String {
    format!("games/{code}/players/{id}")
}

/// Path of the published round.
pub fn current_round(code: &str) -> String {
    format!("games/{code}/currentRound")
}

/// Path of all answers for the current round.
pub fn answers(code: &str) -> String {
    format!("games/{code}/playerAnswers")
}

/// Path of one player's answer.
pub fn answer(code: &str, id: &str) -> String {
    format!("games/{code}/playerAnswers/{id}")
}

/// Path of the last round's result.
pub fn round_result(code: &str) -> String {
    format!("games/{code}/roundResult")
}

/// Path of the running scores.
pub fn scores(code: &str) -> String {
    format!("games/{code}/scores")
}

/// Path of one completed-game record.
pub fn history_entry(key: &str) -> String {
    format!("{HISTORY_ROOT}/{key}")
}

/// Lifecycle of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Accepting players.
    Waiting,
    /// Rounds are being played.
    Active,
    /// The host closed the room.
    Finished,
}

/// A joined player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    /// Display name.
    pub name: String,
    /// When the player joined.
    pub joined_at: DateTime<Utc>,
}

/// The round players should answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number, starting at 1.
    pub number: u32,
    /// The prompt as a question.
    pub question: String,
    /// Attributes to answer.
    pub senses: Vec<Attribute>,
}

impl RoundRecord {
    /// Describe a freshly started round.
    pub fn from_round(round: &Round) -> Self {
        Self {
            number: round.number(),
            question: round
                .prompt()
                .map(|p| format!("{}?", p.text()))
                .unwrap_or_default(),
            senses: round.relevant().iter().collect(),
        }
    }
}

/// One player's answers to a round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// The round answered.
    pub round: u32,
    /// Attribute name to chosen value.
    pub values: BTreeMap<String, String>,
}

impl AnswerRecord {
    /// Encode a submission for a round.
    pub fn new(round: u32, submission: &Submission) -> Self {
        Self {
            round,
            values: submission
                .non_empty_values()
                .map(|(attr, value)| (attr.name().to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Decode into a submission, failing on unknown attributes or values.
    pub fn to_submission(&self) -> SenseResult<Submission> {
        let mut submission = Submission::new();
        for (name, value) in &self.values {
            let attribute: Attribute = name.parse()?;
            submission.set(attribute, attribute.canonical_value(value)?)?;
        }
        Ok(submission)
    }
}

/// Published outcome of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResultRecord {
    /// The round evaluated.
    pub round: u32,
    /// Aggregate classification.
    pub consensus_status: Consensus,
    /// Points per player id this round.
    pub points: BTreeMap<String, u32>,
    /// Total points earned.
    pub earned: u32,
    /// Points available.
    pub maximum: u32,
}

impl RoundResultRecord {
    /// Encode a group evaluation.
    pub fn from_evaluation(round: u32, evaluation: &GroupEvaluation) -> Self {
        Self {
            round,
            consensus_status: evaluation.consensus,
            points: evaluation
                .points
                .iter()
                .map(|(id, p)| (id.to_string(), *p))
                .collect(),
            earned: evaluation.earned,
            maximum: evaluation.maximum,
        }
    }
}

/// Serialize a record for writing.
pub fn encode<T: Serialize>(path: &str, record: &T) -> NetResult<Value> {
    serde_json::to_value(record).map_err(|e| NetError::Malformed {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Deserialize a record read from `path`.
pub fn decode<T: DeserializeOwned>(path: &str, value: Value) -> NetResult<T> {
    serde_json::from_value(value).map_err(|e| NetError::Malformed {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Decode every child of an object, skipping children that do not parse.
pub fn decode_children<T: DeserializeOwned>(path: &str, value: Option<Value>) -> Vec<(String, T)> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    map.into_iter()
        .filter_map(|(key, child)| match serde_json::from_value(child) {
            Ok(record) => Some((key, record)),
            Err(e) => {
                warn!(path, key = %key, error = %e, "ignoring malformed entry");
                None
            }
        })
        .collect()
}
