//! Error types for the Common Sense engine.

use crate::attribute::Attribute;
use crate::round::RoundStatus;

/// Errors that can occur while running a game session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SenseError {
    /// Decks have not been loaded (or failed to load), so no round can start.
    #[error("prompt decks are not loaded")]
    DataNotLoaded,

    /// A deck source could not produce playable decks.
    #[error("failed to load decks: {0}")]
    DeckLoad(String),

    /// No round has been started since the last reset.
    #[error("no round in progress")]
    NoActiveRound,

    /// The operation is not allowed in the round's current state.
    #[error("cannot {operation} while the round is {status}")]
    InvalidRoundState {
        /// The rejected operation.
        operation: &'static str,
        /// The round status at the time of the call.
        status: RoundStatus,
    },

    /// A value is not part of the attribute's domain.
    #[error("'{value}' is not a valid {attribute} value")]
    InvalidValue {
        /// The attribute being set.
        attribute: Attribute,
        /// The rejected value.
        value: String,
    },

    /// An attribute name did not match the catalog.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// A participant id is not part of the current roster.
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    /// The evaluator received fewer submissions than the mode expects.
    #[error("expected {expected} participants, got {actual}")]
    IncompleteParticipants {
        /// Participants the mode expects.
        expected: usize,
        /// Submissions actually provided.
        actual: usize,
    },

    /// A describe-mode guess that was not among the offered choices.
    #[error("invalid choice: {0}")]
    InvalidChoice(String),

    /// A participant tried to act while it is another participant's turn.
    #[error("it is not {0}'s turn")]
    NotParticipantsTurn(String),

    /// The roster does not fit the mode's turn structure.
    #[error("invalid roster: {0}")]
    InvalidRoster(String),

    /// The session reached its round limit.
    #[error("the session is over")]
    SessionOver,

    /// A mode name did not match any known mode.
    #[error("unknown mode: {0}")]
    UnknownMode(String),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience result type for engine operations.
pub type SenseResult<T> = Result<T, SenseError>;
