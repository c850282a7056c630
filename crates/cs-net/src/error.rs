//! Error types for networked play.

use cs_core::SenseError;

use crate::store::StoreError;

/// Errors from the host and player roles.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The shared store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The game engine rejected an operation.
    #[error(transparent)]
    Sense(#[from] SenseError),

    /// No game exists under the room code.
    #[error("game {0} not found")]
    GameNotFound(String),

    /// The game is no longer accepting players.
    #[error("game {0} is already in progress")]
    GameInProgress(String),

    /// A player name was empty.
    #[error("player name must not be empty")]
    InvalidName,

    /// A room code was not four letters.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    /// The host tried to start with too few players.
    #[error("at least 2 players are needed, {0} joined")]
    NotEnoughPlayers(usize),

    /// Every generated room code was taken.
    #[error("could not find a free room code")]
    NoFreeRoomCode,

    /// Stored data did not have the expected shape.
    #[error("malformed data at {path}: {message}")]
    Malformed {
        /// Where the data was read.
        path: String,
        /// What was wrong with it.
        message: String,
    },
}

/// Convenience result type for networked operations.
pub type NetResult<T> = Result<T, NetError>;
