//! End-to-end tests for a host and players sharing an in-memory store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cs_core::deck::{Deck, DeckEntry};
use cs_core::{Attribute, Consensus, Decks, RoundLimit, Submission};
use cs_net::schema;
use cs_net::{
    GameStatus, HistoryTracker, Host, HostConfig, MemoryStore, NetError, PlayerClient, RoomStatus,
    RoundRecord, SharedStore, StoreError, StoreResult, Subscription,
};
use futures::StreamExt;
use serde_json::Value;

fn deck(texts: &[&str]) -> Deck {
    Deck::new(texts.iter().map(|t| DeckEntry::new(*t, 1)).collect())
}

/// Every round asks for Color and Taste.
fn red_and_sweet() -> Decks {
    Decks {
        categories: deck(&["something red and sweet"]),
        modifiers: deck(&["very"]),
        objects: deck(&["apple"]),
    }
}

fn answer(color: &str, taste: &str) -> Submission {
    Submission::new()
        .with(Attribute::Color, color)
        .unwrap()
        .with(Attribute::Taste, taste)
        .unwrap()
}

async fn host_with_players<S: SharedStore + Clone>(
    store: S,
    config: HostConfig,
    names: &[&str],
) -> (Host<S>, Vec<PlayerClient<S>>) {
    let host = Host::create(store.clone(), config, red_and_sweet()).await.unwrap();
    let mut players = Vec::new();
    for name in names {
        players.push(PlayerClient::join(store.clone(), host.code(), name).await.unwrap());
    }
    (host, players)
}

async fn answers_snapshot<S: SharedStore>(store: &S, code: &str) -> Option<Value> {
    store.once(&schema::answers(code)).await.unwrap()
}

#[tokio::test]
async fn three_players_partial_consensus() {
    let store = MemoryStore::new();
    let (mut host, players) =
        host_with_players(store.clone(), HostConfig::default(), &["Ann", "Bo", "Cy"]).await;

    let round = host.start_game().await.unwrap();
    assert_eq!(round.number, 1);
    assert_eq!(round.question, "something red and sweet very apple?");
    assert_eq!(round.senses, vec![Attribute::Color, Attribute::Taste]);
    assert_eq!(players[0].current_round().await.unwrap(), Some(round.clone()));
    assert_eq!(players[0].status().await.unwrap(), Some(RoomStatus::Active));

    players[0].submit(&round, &answer("Red", "Sweet")).await.unwrap();
    players[1].submit(&round, &answer("Red", "Sour")).await.unwrap();
    let pending = host
        .observe_answers(answers_snapshot(&store, host.code()).await)
        .await
        .unwrap();
    assert!(pending.is_none());

    players[2].submit(&round, &answer("Blue", "Bitter")).await.unwrap();
    let result = host
        .observe_answers(answers_snapshot(&store, host.code()).await)
        .await
        .unwrap()
        .expect("round resolves once everyone answered");
    assert_eq!(result.consensus_status, Consensus::Partial);
    assert_eq!(result.earned, 2);
    assert_eq!(result.maximum, 6);
    assert_eq!(result.points[players[0].id()], 1);
    assert_eq!(result.points[players[1].id()], 1);
    assert_eq!(result.points[players[2].id()], 0);

    assert_eq!(players[0].result().await.unwrap(), Some(result));
    assert_eq!(players[0].score().await.unwrap(), 1);
    assert_eq!(players[2].score().await.unwrap(), 0);
}

#[tokio::test]
async fn observing_the_same_snapshot_twice_scores_once() {
    let store = MemoryStore::new();
    let (mut host, players) =
        host_with_players(store.clone(), HostConfig::default(), &["Ann", "Bo"]).await;
    let round = host.start_game().await.unwrap();
    for player in &players {
        player.submit(&round, &answer("Red", "Sweet")).await.unwrap();
    }
    let snapshot = answers_snapshot(&store, host.code()).await;
    let first = host.observe_answers(snapshot.clone()).await.unwrap();
    assert_eq!(first.map(|r| r.consensus_status), Some(Consensus::Common));
    assert!(host.observe_answers(snapshot).await.unwrap().is_none());
    assert_eq!(host.session().rounds_completed(), 1);
    assert_eq!(players[0].score().await.unwrap(), 2);
}

#[tokio::test]
async fn stale_answers_are_ignored() {
    let store = MemoryStore::new();
    let (mut host, players) =
        host_with_players(store.clone(), HostConfig::default(), &["Ann", "Bo"]).await;
    let first = host.start_game().await.unwrap();
    for player in &players {
        player.submit(&first, &answer("Red", "Sweet")).await.unwrap();
    }
    host.observe_answers(answers_snapshot(&store, host.code()).await)
        .await
        .unwrap();

    let second = host.start_round().await.unwrap();
    assert_eq!(second.number, 2);
    // An answer to round 1 written after round 2 was published.
    players[0].submit(&first, &answer("Red", "Sweet")).await.unwrap();
    players[1].submit(&second, &answer("Red", "Sweet")).await.unwrap();
    let result = host
        .observe_answers(answers_snapshot(&store, host.code()).await)
        .await
        .unwrap();
    assert!(result.is_none());
    let round = host.session().round().unwrap();
    assert_eq!(round.locked_count(), 1);
}

#[tokio::test]
async fn join_errors() {
    let store = MemoryStore::new();
    let (mut host, _players) =
        host_with_players(store.clone(), HostConfig::default(), &["Ann"]).await;
    let code = host.code().to_string();

    assert!(matches!(
        PlayerClient::join(store.clone(), &code, "   ").await,
        Err(NetError::InvalidName)
    ));
    assert!(matches!(
        PlayerClient::join(store.clone(), "AB", "Bo").await,
        Err(NetError::InvalidRoomCode(_))
    ));
    let missing = if code == "ZZZZ" { "YYYY" } else { "ZZZZ" };
    assert!(matches!(
        PlayerClient::join(store.clone(), missing, "Bo").await,
        Err(NetError::GameNotFound(_))
    ));

    assert!(matches!(host.start_game().await, Err(NetError::NotEnoughPlayers(1))));

    // Lowercase codes are accepted.
    PlayerClient::join(store.clone(), &code.to_lowercase(), "Bo")
        .await
        .unwrap();
    host.start_game().await.unwrap();
    assert!(matches!(
        PlayerClient::join(store.clone(), &code, "Cy").await,
        Err(NetError::GameInProgress(_))
    ));
}

#[tokio::test]
async fn roster_follows_join_order() {
    let store = MemoryStore::new();
    let (mut host, players) =
        host_with_players(store.clone(), HostConfig::default(), &["Ann", "Bo", "Cy"]).await;
    assert_eq!(host.sync_players().await.unwrap(), 3);
    let names: Vec<&str> = host
        .session()
        .participants()
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["Ann", "Bo", "Cy"]);

    store
        .remove(&schema::player(host.code(), players[1].id()))
        .await
        .unwrap();
    assert_eq!(host.sync_players().await.unwrap(), 2);
}

#[tokio::test]
async fn players_see_a_round_replaced_under_the_same_number() {
    let store = MemoryStore::new();
    let (mut host, players) =
        host_with_players(store.clone(), HostConfig::default(), &["Ann", "Bo"]).await;
    let first = host.start_game().await.unwrap();
    let mut rounds = players[0].rounds().await.unwrap();
    assert_eq!(rounds.next().await, Some(first.clone()));

    let path = schema::current_round(host.code());
    // Rewriting the same round is not a new round.
    store.set(&path, schema::encode(&path, &first).unwrap()).await.unwrap();
    let replacement = RoundRecord {
        question: "something red and sour?".into(),
        ..first.clone()
    };
    store.set(&path, schema::encode(&path, &replacement).unwrap()).await.unwrap();

    let next = tokio::time::timeout(Duration::from_secs(1), rounds.next())
        .await
        .expect("replacement is delivered");
    assert_eq!(next, Some(replacement));
}

#[tokio::test]
async fn run_plays_until_the_round_limit() {
    let store = MemoryStore::new();
    let config = HostConfig::default().with_round_limit(RoundLimit::Rounds(2));
    let (mut host, players) = host_with_players(store.clone(), config, &["Ann", "Bo"]).await;
    host.start_game().await.unwrap();

    let bots: Vec<_> = players
        .into_iter()
        .map(|player| {
            tokio::spawn(async move {
                let mut rounds = player.rounds().await.unwrap();
                while let Some(round) = rounds.next().await {
                    player.submit(&round, &answer("Red", "Sweet")).await.unwrap();
                }
            })
        })
        .collect();

    let record = tokio::time::timeout(Duration::from_secs(5), host.run())
        .await
        .expect("game finishes")
        .unwrap();
    for bot in bots {
        bot.abort();
    }

    assert_eq!(record.status, GameStatus::Completed);
    assert_eq!(record.rounds_completed, 2);
    assert_eq!(record.total_rounds, RoundLimit::Rounds(2));
    assert!(record.players.iter().all(|p| p.final_score == Some(4)));
    assert_eq!(host.status(), RoomStatus::Finished);

    let history = HistoryTracker::new(store.clone()).all().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].record, record);
}

#[tokio::test]
async fn closing_early_files_an_incomplete_game() {
    let store = MemoryStore::new();
    let config = HostConfig::default().with_round_limit(RoundLimit::Rounds(5));
    let (mut host, _players) = host_with_players(store.clone(), config, &["Ann", "Bo"]).await;
    host.start_game().await.unwrap();

    let record = host.finish().await.unwrap();
    assert_eq!(record.status, GameStatus::Incomplete);
    assert_eq!(record.rounds_completed, 0);
    assert!(record.players.iter().all(|p| p.final_score.is_none()));

    let stored = store.once(&schema::status(host.code())).await.unwrap();
    assert_eq!(stored, Some(Value::from("finished")));
    let tracker = HistoryTracker::new(store);
    assert_eq!(tracker.by_status(GameStatus::Incomplete).await.unwrap().len(), 1);
}

#[tokio::test]
async fn fixed_room_codes_are_normalized() {
    let store = MemoryStore::new();
    let host = Host::create(store, HostConfig::default().with_room_code("abcd"), red_and_sweet())
        .await
        .unwrap();
    assert_eq!(host.code(), "ABCD");
    assert_eq!(host.status(), RoomStatus::Waiting);
}

/// A store whose writes under one path fail while armed.
#[derive(Clone)]
struct FlakyStore {
    inner: MemoryStore,
    failing: Arc<Mutex<Option<String>>>,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: Arc::new(Mutex::new(None)),
        }
    }

    fn fail_writes_to(&self, path: Option<String>) {
        *self.failing.lock().unwrap() = path;
    }

    fn check(&self, path: &str) -> StoreResult<()> {
        match self.failing.lock().unwrap().as_deref() {
            Some(prefix) if path.starts_with(prefix) => {
                Err(StoreError::Unavailable("offline".into()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SharedStore for FlakyStore {
    async fn set(&self, path: &str, value: Value) -> StoreResult<()> {
        self.check(path)?;
        self.inner.set(path, value).await
    }

    async fn remove(&self, path: &str) -> StoreResult<()> {
        self.check(path)?;
        self.inner.remove(path).await
    }

    async fn once(&self, path: &str) -> StoreResult<Option<Value>> {
        self.inner.once(path).await
    }

    async fn push_key(&self, path: &str) -> StoreResult<String> {
        self.inner.push_key(path).await
    }

    async fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        self.inner.subscribe(path).await
    }
}

#[tokio::test]
async fn failed_result_write_leaves_round_unscored() {
    let store = FlakyStore::new();
    let (mut host, players) =
        host_with_players(store.clone(), HostConfig::default(), &["Ann", "Bo"]).await;
    let round = host.start_game().await.unwrap();
    for player in &players {
        player.submit(&round, &answer("Red", "Sweet")).await.unwrap();
    }

    store.fail_writes_to(Some(schema::round_result(host.code())));
    let snapshot = answers_snapshot(&store, host.code()).await;
    assert!(matches!(
        host.observe_answers(snapshot.clone()).await,
        Err(NetError::Store(StoreError::Unavailable(_)))
    ));
    assert_eq!(host.session().rounds_completed(), 0);
    assert_eq!(players[0].score().await.unwrap(), 0);

    store.fail_writes_to(None);
    let result = host.observe_answers(snapshot).await.unwrap();
    assert_eq!(result.map(|r| r.earned), Some(4));
    assert_eq!(host.session().rounds_completed(), 1);
    assert_eq!(players[0].score().await.unwrap(), 2);
}

#[tokio::test]
async fn failed_round_publish_keeps_previous_round() {
    let store = FlakyStore::new();
    let (mut host, _players) =
        host_with_players(store.clone(), HostConfig::default(), &["Ann", "Bo"]).await;
    host.start_game().await.unwrap();

    store.fail_writes_to(Some(schema::current_round(host.code())));
    assert!(host.start_round().await.is_err());
    assert_eq!(host.session().round_index(), 1);
}
