//! Core engine for the Common Sense party game.
//!
//! Players see a three-part prompt and answer it along five sensory
//! attributes. A round is won when answers agree on every attribute the
//! prompt mentions. Provides the attribute catalog, weighted prompt decks,
//! the round state machine, pairwise and group evaluation, scoring with
//! streaks, the describe-and-guess variant, and a session that ties them
//! together under a selectable mode.

pub mod attribute;
pub mod config;
pub mod countdown;
pub mod deck;
pub mod describe;
pub mod error;
pub mod evaluate;
pub mod history;
pub mod mode;
pub mod prompt;
pub mod round;
pub mod scoring;
pub mod session;

pub use attribute::{Attribute, AttributeSet};
pub use config::SessionConfig;
pub use deck::{CsvDeckSource, DeckSource, Decks, StaticDeckSource};
pub use error::{SenseError, SenseResult};
pub use evaluate::{Consensus, MatchOutcome};
pub use mode::{GameMode, ModePolicy, RoundLimit};
pub use prompt::{Prompt, Relevance};
pub use round::{Participant, ParticipantId, Round, RoundStatus, Submission};
pub use scoring::Scoreboard;
pub use session::{DataState, GameSession, RoundResult};
