//! The host role.
//!
//! The host owns the authoritative [`GameSession`] for a room. It mirrors
//! the roster from the store, publishes each round, ingests answer
//! snapshots as they arrive and publishes results once everyone has
//! answered. Store writes happen against a copy of the session that is only
//! kept once every write succeeded, so a failed write leaves the host where
//! it was.

use chrono::{DateTime, Utc};
use cs_core::{
    Decks, GameMode, GameSession, Participant, ParticipantId, RoundLimit, RoundResult, RoundStatus,
    SessionConfig, Submission,
};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{NetError, NetResult};
use crate::records::{GameRecord, GameStatus, HistoryTracker, PlayerScore};
use crate::schema::{self, AnswerRecord, PlayerRecord, RoomStatus, RoundRecord, RoundResultRecord};
use crate::store::SharedStore;

const CODE_ATTEMPTS: usize = 32;

/// Configuration for hosting a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// RNG seed for room codes and prompt draws.
    pub seed: u64,
    /// When the game ends.
    pub round_limit: RoundLimit,
    /// Use this room code instead of generating one.
    pub room_code: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            round_limit: RoundLimit::Infinite,
            room_code: None,
        }
    }
}

impl HostConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the round limit.
    pub fn with_round_limit(mut self, limit: RoundLimit) -> Self {
        self.round_limit = limit;
        self
    }

    /// Fix the room code.
    pub fn with_room_code(mut self, code: impl Into<String>) -> Self {
        self.room_code = Some(code.into());
        self
    }

    /// The session configuration the host plays with.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_seed(self.seed)
            .with_players(Vec::<String>::new())
            .with_mode(GameMode::Networked)
            .with_round_limit(self.round_limit)
    }
}

/// Four random uppercase letters.
pub fn generate_room_code(rng: &mut impl Rng) -> String {
    (0..4).map(|_| char::from(rng.random_range(b'A'..=b'Z'))).collect()
}

/// Trim and uppercase a room code, rejecting anything but four letters.
pub fn normalize_room_code(input: &str) -> NetResult<String> {
    let code = input.trim().to_ascii_uppercase();
    if code.len() == 4 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(NetError::InvalidRoomCode(input.to_string()))
    }
}

/// Hosts one room.
pub struct Host<S> {
    store: S,
    code: String,
    config: HostConfig,
    session: GameSession,
    status: RoomStatus,
    started_at: Option<DateTime<Utc>>,
}

impl<S: SharedStore + Clone> Host<S> {
    /// Open a waiting room.
    pub async fn create(store: S, config: HostConfig, decks: Decks) -> NetResult<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let code = match &config.room_code {
            Some(code) => normalize_room_code(code)?,
            None => free_room_code(&store, &mut rng).await?,
        };

        let mut session = GameSession::new(config.session_config())?;
        session.install_decks(decks);

        let path = schema::game(&code);
        let room = serde_json::json!({
            "status": schema::encode(&path, &RoomStatus::Waiting)?,
            "created": schema::encode(&path, &Utc::now())?,
        });
        store.set(&path, room).await?;
        info!(code = %code, "room created");

        Ok(Self {
            store,
            code,
            config,
            session,
            status: RoomStatus::Waiting,
            started_at: None,
        })
    }

    /// The room code players join with.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The authoritative session.
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// The room status as last written.
    pub fn status(&self) -> RoomStatus {
        self.status
    }

    /// Mirror the stored roster into the session.
    ///
    /// Skipped while a round is unresolved. Returns the player count.
    pub async fn sync_players(&mut self) -> NetResult<usize> {
        if self.session.round().is_some_and(|r| r.status() != RoundStatus::Resolved) {
            return Ok(self.session.participants().len());
        }
        let path = schema::players(&self.code);
        let mut roster: Vec<(String, PlayerRecord)> =
            schema::decode_children(&path, self.store.once(&path).await?);
        roster.retain(|(key, record)| {
            let keep = !record.name.trim().is_empty();
            if !keep {
                warn!(player = %key, "ignoring player without a name");
            }
            keep
        });
        roster.sort_by(|a, b| a.1.joined_at.cmp(&b.1.joined_at).then_with(|| a.0.cmp(&b.0)));

        let gone: Vec<ParticipantId> = self
            .session
            .participants()
            .iter()
            .filter(|p| !roster.iter().any(|(key, _)| key == p.id.as_str()))
            .map(|p| p.id.clone())
            .collect();
        for id in gone {
            self.session.leave(&id)?;
        }
        for (key, record) in roster {
            let id = ParticipantId::new(key.as_str());
            if self.session.participant_name(&id).is_none() {
                self.session.join(Participant::new(key, record.name.trim()))?;
            }
        }
        Ok(self.session.participants().len())
    }

    /// Close the lobby and publish the first round.
    pub async fn start_game(&mut self) -> NetResult<RoundRecord> {
        let players = self.sync_players().await?;
        if players < 2 {
            return Err(NetError::NotEnoughPlayers(players));
        }
        self.write_status(RoomStatus::Active).await?;
        self.started_at = Some(Utc::now());
        info!(code = %self.code, players, "game started");
        self.start_round().await
    }

    /// Draw and publish the next round, clearing the previous answers.
    pub async fn start_round(&mut self) -> NetResult<RoundRecord> {
        self.sync_players().await?;
        let mut next = self.session.clone();
        let record = RoundRecord::from_round(next.start_round()?);

        self.store.remove(&schema::answers(&self.code)).await?;
        self.store.remove(&schema::round_result(&self.code)).await?;
        let path = schema::current_round(&self.code);
        self.store.set(&path, schema::encode(&path, &record)?).await?;

        self.session = next;
        info!(
            code = %self.code,
            round = record.number,
            question = %record.question,
            "round published"
        );
        Ok(record)
    }

    /// Ingest an answers snapshot, possibly partial, and publish the result
    /// if it completes the round.
    ///
    /// Answers for another round or from unknown players are ignored.
    /// Calling this again with the same or a newer snapshot is harmless.
    pub async fn observe_answers(
        &mut self,
        snapshot: Option<Value>,
    ) -> NetResult<Option<RoundResultRecord>> {
        let Some(round) = self.session.round() else {
            return Ok(None);
        };
        if !round.is_collecting() {
            return self.try_resolve().await;
        }
        let number = round.number();

        let path = schema::answers(&self.code);
        let answers: Vec<(String, AnswerRecord)> = schema::decode_children(&path, snapshot);
        let mut next = self.session.clone();
        let mut resolution = None;
        for (key, answer) in answers {
            if answer.round != number {
                debug!(player = %key, round = answer.round, "ignoring stale answer");
                continue;
            }
            let id = ParticipantId::new(key);
            let waiting = next
                .round()
                .and_then(|r| r.is_locked(&id).ok())
                .is_some_and(|locked| !locked);
            if !waiting {
                continue;
            }
            let submission = answer.to_submission().unwrap_or_else(|e| {
                warn!(
                    player = %id,
                    error = %e,
                    "answer has invalid values; treating as unanswered"
                );
                Submission::new()
            });
            next.submit_all(&id, submission)?;
            if let Some(result) = next.lock_in(&id)? {
                resolution = Some(result);
            }
        }
        if resolution.is_none() {
            resolution = next.try_resolve()?;
        }

        let published = match &resolution {
            Some(result) => Some(self.publish(&next, result).await?),
            None => None,
        };
        self.session = next;
        Ok(published)
    }

    /// Resolve and publish if every player is in. Idempotent.
    pub async fn try_resolve(&mut self) -> NetResult<Option<RoundResultRecord>> {
        let mut next = self.session.clone();
        let Some(result) = next.try_resolve()? else {
            return Ok(None);
        };
        let record = self.publish(&next, &result).await?;
        self.session = next;
        Ok(Some(record))
    }

    /// Close the room and file a completed-game record.
    ///
    /// A game that has not reached its round limit is filed as incomplete
    /// without scores.
    pub async fn finish(&mut self) -> NetResult<GameRecord> {
        let status = if self.session.is_over() {
            GameStatus::Completed
        } else {
            GameStatus::Incomplete
        };
        let scoreboard = self.session.scoreboard();
        let players = self
            .session
            .participants()
            .iter()
            .map(|p| PlayerScore {
                name: p.name.clone(),
                final_score: (status == GameStatus::Completed).then(|| scoreboard.score(&p.id)),
            })
            .collect();
        let now = Utc::now();
        let record = GameRecord {
            game_code: self.code.clone(),
            completed_at: now,
            total_rounds: self.config.round_limit,
            rounds_completed: self.session.rounds_completed(),
            players,
            status,
            duration_minutes: self.started_at.map(|start| (now - start).num_minutes()),
        };

        self.write_status(RoomStatus::Finished).await?;
        HistoryTracker::new(self.store.clone()).record(&record).await?;
        info!(code = %self.code, %status, rounds = record.rounds_completed, "game finished");
        Ok(record)
    }

    /// Drive a started game from answer notifications until the round
    /// limit is reached, then finish it.
    ///
    /// With no round limit this only returns on error or when the store
    /// stops sending notifications.
    pub async fn run(&mut self) -> NetResult<GameRecord> {
        let mut answers = self.store.subscribe(&schema::answers(&self.code)).await?;
        while let Some(snapshot) = answers.next().await {
            if self.observe_answers(snapshot).await?.is_none() {
                continue;
            }
            if self.session.is_over() {
                break;
            }
            self.start_round().await?;
        }
        self.finish().await
    }

    async fn publish(
        &self,
        session: &GameSession,
        result: &RoundResult,
    ) -> NetResult<RoundResultRecord> {
        let RoundResult::Group { round, evaluation } = result else {
            return Err(NetError::Malformed {
                path: schema::round_result(&self.code),
                message: "only group results can be published".into(),
            });
        };
        let record = RoundResultRecord::from_evaluation(*round, evaluation);
        let path = schema::round_result(&self.code);
        self.store.set(&path, schema::encode(&path, &record)?).await?;

        let scores: serde_json::Map<String, Value> = session
            .scoreboard()
            .scores()
            .iter()
            .map(|(id, score)| (id.to_string(), Value::from(*score)))
            .collect();
        self.store
            .set(&schema::scores(&self.code), Value::Object(scores))
            .await?;
        info!(
            code = %self.code,
            round = record.round,
            consensus = ?record.consensus_status,
            earned = record.earned,
            maximum = record.maximum,
            "result published"
        );
        Ok(record)
    }

    async fn write_status(&mut self, status: RoomStatus) -> NetResult<()> {
        let path = schema::status(&self.code);
        self.store.set(&path, schema::encode(&path, &status)?).await?;
        self.status = status;
        Ok(())
    }
}

async fn free_room_code<S: SharedStore>(store: &S, rng: &mut StdRng) -> NetResult<String> {
    for _ in 0..CODE_ATTEMPTS {
        let code = generate_room_code(rng);
        if store.once(&schema::game(&code)).await?.is_none() {
            return Ok(code);
        }
        debug!(code = %code, "room code taken");
    }
    Err(NetError::NoFreeRoomCode)
}
