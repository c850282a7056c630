//! Networked play for Common Sense.
//!
//! A host and any number of players share an eventually-consistent JSON
//! store ([`SharedStore`]). Players join a room by its four-letter code and
//! write their answers under their own key; the host owns the game session,
//! publishes rounds and results, and files a [`GameRecord`] when the room
//! closes. [`MemoryStore`] is an in-process store for local play and tests.

pub mod error;
pub mod host;
pub mod player;
pub mod records;
pub mod schema;
pub mod store;

pub use error::{NetError, NetResult};
pub use host::{Host, HostConfig};
pub use player::PlayerClient;
pub use records::{GameRecord, GameStatus, HistoryStats, HistoryTracker, PlayerScore, StoredGame};
pub use schema::{AnswerRecord, PlayerRecord, RoomStatus, RoundRecord, RoundResultRecord};
pub use store::{MemoryStore, SharedStore, StoreError, StoreResult, Subscription};
