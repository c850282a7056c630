//! The player role.

use chrono::Utc;
use cs_core::{Attribute, Submission};
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, info};

use crate::error::{NetError, NetResult};
use crate::host::normalize_room_code;
use crate::schema::{self, AnswerRecord, PlayerRecord, RoomStatus, RoundRecord, RoundResultRecord};
use crate::store::SharedStore;

/// A player joined to one room.
pub struct PlayerClient<S> {
    store: S,
    code: String,
    id: String,
    name: String,
}

impl<S: SharedStore> PlayerClient<S> {
    /// Join a waiting room.
    pub async fn join(store: S, code: &str, name: &str) -> NetResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NetError::InvalidName);
        }
        let code = normalize_room_code(code)?;

        let status_path = schema::status(&code);
        let Some(status) = store.once(&status_path).await? else {
            return Err(NetError::GameNotFound(code));
        };
        let status: RoomStatus = schema::decode(&status_path, status)?;
        if status != RoomStatus::Waiting {
            return Err(NetError::GameInProgress(code));
        }

        let id = store.push_key(&schema::players(&code)).await?;
        let path = schema::player(&code, &id);
        let record = PlayerRecord {
            name: name.to_string(),
            joined_at: Utc::now(),
        };
        store.set(&path, schema::encode(&path, &record)?).await?;
        info!(code = %code, player = %id, name, "joined room");

        Ok(Self {
            store,
            code,
            id,
            name: name.to_string(),
        })
    }

    /// The key the host knows this player by.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The room joined.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The room status, if the room still exists.
    pub async fn status(&self) -> NetResult<Option<RoomStatus>> {
        let path = schema::status(&self.code);
        self.store
            .once(&path)
            .await?
            .map(|v| schema::decode(&path, v))
            .transpose()
    }

    /// The published round, if any.
    pub async fn current_round(&self) -> NetResult<Option<RoundRecord>> {
        let path = schema::current_round(&self.code);
        self.store
            .once(&path)
            .await?
            .map(|v| schema::decode(&path, v))
            .transpose()
    }

    /// Each newly published round, starting with the current one.
    ///
    /// A round replaced under the same number shows up again when its
    /// question changed.
    pub async fn rounds(&self) -> NetResult<BoxStream<'static, RoundRecord>> {
        let subscription = self
            .store
            .subscribe(&schema::current_round(&self.code))
            .await?;
        let stream = subscription
            .filter_map(|value| {
                future::ready(value.and_then(|v| serde_json::from_value::<RoundRecord>(v).ok()))
            })
            .scan(None::<(u32, String)>, |last, round| {
                let key = (round.number, round.question.clone());
                let fresh = last.as_ref() != Some(&key);
                *last = Some(key);
                future::ready(Some(fresh.then_some(round)))
            })
            .filter_map(future::ready)
            .boxed();
        Ok(stream)
    }

    /// Answer a round.
    ///
    /// Values for attributes the round does not ask about are dropped.
    /// Resubmitting before the host collects replaces the earlier answer.
    pub async fn submit(&self, round: &RoundRecord, submission: &Submission) -> NetResult<()> {
        let mut answer = Submission::new();
        for (attribute, value) in submission.non_empty_values() {
            if round.senses.contains(&attribute) {
                answer.set(attribute, value)?;
            } else {
                debug!(%attribute, "dropping answer the round does not ask for");
            }
        }
        let path = schema::answer(&self.code, &self.id);
        let record = AnswerRecord::new(round.number, &answer);
        self.store.set(&path, schema::encode(&path, &record)?).await?;
        info!(code = %self.code, player = %self.id, round = round.number, "answer submitted");
        Ok(())
    }

    /// Answer a round from attribute and value names, as typed by a person.
    pub async fn submit_values(
        &self,
        round: &RoundRecord,
        values: &[(&str, &str)],
    ) -> NetResult<()> {
        let mut submission = Submission::new();
        for (name, value) in values {
            let attribute: Attribute = name.parse()?;
            let value = attribute.canonical_value(value)?;
            submission.set(attribute, value)?;
        }
        self.submit(round, &submission).await
    }

    /// The last published result, if any.
    pub async fn result(&self) -> NetResult<Option<RoundResultRecord>> {
        let path = schema::round_result(&self.code);
        self.store
            .once(&path)
            .await?
            .map(|v| schema::decode(&path, v))
            .transpose()
    }

    /// This player's running total.
    pub async fn score(&self) -> NetResult<u32> {
        let path = format!("{}/{}", schema::scores(&self.code), self.id);
        Ok(self
            .store
            .once(&path)
            .await?
            .and_then(|v| v.as_u64())
            .map_or(0, |s| u32::try_from(s).unwrap_or(u32::MAX)))
    }
}
