//! The shared store the host and players talk through.
//!
//! The store is a JSON tree addressed by slash-separated paths. Writes are
//! single-key; there are no transactions. Setting a path to `null` removes
//! it, and objects left empty disappear with their last child.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Map, Value};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

/// Change notifications for one path. Every item is the value at the path
/// when the item was produced; the first item is the value at subscribe
/// time.
pub type Subscription = BoxStream<'static, Option<Value>>;

/// Errors reported by a store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The path contains a forbidden character.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// The backend could not complete the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// An eventually-consistent shared JSON tree.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Replace the value at `path`.
    async fn set(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Delete the value at `path`.
    async fn remove(&self, path: &str) -> StoreResult<()>;

    /// Read the value at `path` once.
    async fn once(&self, path: &str) -> StoreResult<Option<Value>>;

    /// Generate a fresh child key under `path`. Keys sort in creation order.
    async fn push_key(&self, path: &str) -> StoreResult<String>;

    /// Watch `path` for changes.
    async fn subscribe(&self, path: &str) -> StoreResult<Subscription>;
}

const CHANGE_BUFFER: usize = 256;

struct Inner {
    root: RwLock<Value>,
    changes: broadcast::Sender<Vec<String>>,
    pushes: AtomicU64,
}

impl Inner {
    async fn read(&self, segments: &[String]) -> Option<Value> {
        let root = self.root.read().await;
        read_at(&root, segments)
    }
}

/// An in-process store. Clones share the same tree.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(Inner {
                root: RwLock::new(Value::Object(Map::new())),
                changes,
                pushes: AtomicU64::new(0),
            }),
        }
    }

    /// A copy of the whole tree.
    pub async fn snapshot(&self) -> Value {
        self.inner.root.read().await.clone()
    }

    async fn write(&self, path: &str, value: Value) -> StoreResult<()> {
        let segments = parse_path(path)?;
        {
            let mut root = self.inner.root.write().await;
            write_at(&mut root, &segments, normalize(value));
        }
        debug!(path, "store write");
        // Nobody listening is fine.
        let _ = self.inner.changes.send(segments);
        Ok(())
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn set(&self, path: &str, value: Value) -> StoreResult<()> {
        self.write(path, value).await
    }

    async fn remove(&self, path: &str) -> StoreResult<()> {
        self.write(path, Value::Null).await
    }

    async fn once(&self, path: &str) -> StoreResult<Option<Value>> {
        let segments = parse_path(path)?;
        Ok(self.inner.read(&segments).await)
    }

    async fn push_key(&self, path: &str) -> StoreResult<String> {
        parse_path(path)?;
        let seq = self.inner.pushes.fetch_add(1, Ordering::Relaxed);
        let suffix = Uuid::new_v4().simple().to_string();
        Ok(format!("{seq:08}-{}", &suffix[..8]))
    }

    async fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        let segments = parse_path(path)?;
        // Subscribe before the first read so no write slips between them.
        let rx = self.inner.changes.subscribe();
        let inner = Arc::clone(&self.inner);
        let stream = stream::unfold(
            (inner, rx, segments, true),
            |(inner, mut rx, segments, first)| async move {
                if !first {
                    loop {
                        match rx.recv().await {
                            Ok(changed) if overlaps(&changed, &segments) => break,
                            Ok(_) => {}
                            Err(RecvError::Lagged(skipped)) => {
                                debug!(skipped, "subscription lagged");
                                break;
                            }
                            Err(RecvError::Closed) => return None,
                        }
                    }
                }
                let value = inner.read(&segments).await;
                Some((value, (inner, rx, segments, false)))
            },
        );
        Ok(stream.boxed())
    }
}

fn parse_path(path: &str) -> StoreResult<Vec<String>> {
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if segments
        .iter()
        .any(|s| s.contains(['.', '#', '$', '[', ']']))
    {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Whether a change at one path is visible from the other.
fn overlaps(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b).all(|(x, y)| x == y)
}

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Drop nulls and empty objects nested inside a value.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !is_vacant(v))
                .collect(),
        ),
        other => other,
    }
}

fn read_at(root: &Value, segments: &[String]) -> Option<Value> {
    let mut node = root;
    for segment in segments {
        node = node.as_object()?.get(segment)?;
    }
    (!is_vacant(node)).then(|| node.clone())
}

fn write_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        write_at(child, rest, value);
        if is_vacant(child) {
            map.remove(head);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn set_and_read_nested() {
        let store = MemoryStore::new();
        store.set("games/ABCD/status", json!("waiting")).await.unwrap();
        assert_eq!(store.once("games/ABCD/status").await.unwrap(), Some(json!("waiting")));
        assert_eq!(
            store.once("games/ABCD").await.unwrap(),
            Some(json!({"status": "waiting"}))
        );
        assert_eq!(store.once("games/WXYZ").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_prunes_empty_parents() {
        let store = MemoryStore::new();
        store.set("games/ABCD/players/p1", json!({"name": "Ann"})).await.unwrap();
        store.remove("games/ABCD/players/p1").await.unwrap();
        assert_eq!(store.once("games/ABCD/players").await.unwrap(), None);
        assert_eq!(store.snapshot().await, json!({}));
    }

    #[tokio::test]
    async fn null_and_empty_values_vanish() {
        let store = MemoryStore::new();
        store
            .set("games/ABCD", json!({"status": "waiting", "players": {}, "currentRound": null}))
            .await
            .unwrap();
        assert_eq!(store.once("games/ABCD").await.unwrap(), Some(json!({"status": "waiting"})));
        store.set("games/ABCD/status", Value::Null).await.unwrap();
        assert_eq!(store.once("games/ABCD").await.unwrap(), None);
    }

    #[tokio::test]
    async fn push_keys_are_ordered_and_unique() {
        let store = MemoryStore::new();
        let a = store.push_key("games/ABCD/players").await.unwrap();
        let b = store.push_key("games/ABCD/players").await.unwrap();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[tokio::test]
    async fn invalid_paths_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set("games/a.b", json!(1)).await,
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn subscription_sees_initial_and_changes() {
        let store = MemoryStore::new();
        store.set("games/ABCD/status", json!("waiting")).await.unwrap();
        let mut sub = store.subscribe("games/ABCD/status").await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!("waiting"))));

        store.set("games/ABCD/status", json!("active")).await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!("active"))));

        // Writing the parent is a change too.
        store.remove("games/ABCD").await.unwrap();
        assert_eq!(sub.next().await, Some(None));
    }

    #[tokio::test]
    async fn unrelated_writes_do_not_notify() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("games/ABCD/playerAnswers").await.unwrap();
        assert_eq!(sub.next().await, Some(None));
        store.set("games/ABCD/currentRound", json!({"number": 1})).await.unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(pending.is_err());

        store.set("games/ABCD/playerAnswers/p1", json!({"round": 1})).await.unwrap();
        assert_eq!(
            sub.next().await,
            Some(Some(json!({"p1": {"round": 1}})))
        );
    }
}
