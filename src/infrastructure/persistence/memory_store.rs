//! In-process storage backend with an optional recovery log.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::recovery_log::{LogEvent, RecoveryLog};
use crate::domain::entities::{BatchItem, Insertion, NewMapping, UrlMapping};
use crate::domain::repositories::{StoreError, UrlRepository};

/// Forward map, reverse index and sequence counter.
///
/// The reverse index is derived from the forward map and is updated in the
/// same call on every mutation.
#[derive(Debug)]
struct Maps {
    forward: HashMap<String, UrlMapping>,
    reverse: HashMap<(String, String), String>,
    next_sequence: u64,
}

impl Default for Maps {
    fn default() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
            next_sequence: 1,
        }
    }
}

impl Maps {
    fn apply(&mut self, mapping: UrlMapping) {
        if let Some(previous) = self.forward.get(&mapping.short_code) {
            let key = (previous.long_url.clone(), previous.owner_id.clone());
            if self.reverse.get(&key) == Some(&mapping.short_code) {
                self.reverse.remove(&key);
            }
        }

        self.next_sequence = self.next_sequence.max(mapping.sequence + 1);
        self.reverse.insert(
            (mapping.long_url.clone(), mapping.owner_id.clone()),
            mapping.short_code.clone(),
        );
        self.forward.insert(mapping.short_code.clone(), mapping);
    }

    fn active_code(&self, long_url: &str, owner_id: &str) -> Option<&String> {
        self.reverse
            .get(&(long_url.to_string(), owner_id.to_string()))
    }
}

#[derive(Debug)]
struct State {
    maps: Maps,
    journal: Option<RecoveryLog>,
}

impl State {
    /// Journals `mapping` (if a log is attached) and then applies it.
    ///
    /// Nothing is applied when the journal write fails.
    async fn record(&mut self, mapping: &NewMapping) -> Result<(), StoreError> {
        let sequence = self.maps.next_sequence;

        if let Some(journal) = self.journal.as_mut() {
            journal
                .append(&LogEvent {
                    sequence,
                    short_url: mapping.short_code.clone(),
                    original_url: mapping.long_url.clone(),
                    user_id: mapping.owner_id.clone(),
                })
                .await?;
        }

        self.maps.apply(UrlMapping::new(
            mapping.short_code.clone(),
            mapping.long_url.clone(),
            mapping.owner_id.clone(),
            sequence,
            Utc::now(),
        ));

        Ok(())
    }
}

/// Point-in-time copy of the store contents, without timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemorySnapshot {
    /// short code → (long URL, owner id, sequence)
    pub forward: BTreeMap<String, (String, String, u64)>,
    /// (long URL, owner id) → short code
    pub reverse: BTreeMap<(String, String), String>,
    pub next_sequence: u64,
}

/// Storage backend holding every mapping in process memory.
///
/// Both maps and the journal sit behind one [`RwLock`]: lookups share it,
/// every mutation takes it exclusively for the whole check, journal append
/// and map update. Soft deletion is not supported.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Creates an empty store without a recovery log.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                maps: Maps::default(),
                journal: None,
            }),
        }
    }

    /// Replays the recovery log at `path` and keeps it open for appending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Journal`] if the log cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (journal, events) = RecoveryLog::open(path).await?;

        let mut maps = Maps::default();
        let replayed = events.len();
        let now = Utc::now();
        for event in events {
            maps.apply(UrlMapping::new(
                event.short_url,
                event.original_url,
                event.user_id,
                event.sequence,
                now,
            ));
        }

        info!(
            replayed,
            mappings = maps.forward.len(),
            next_sequence = maps.next_sequence,
            "In-memory store restored"
        );

        Ok(Self {
            state: RwLock::new(State {
                maps,
                journal: Some(journal),
            }),
        })
    }

    /// Number of stored mappings.
    pub async fn len(&self) -> usize {
        self.state.read().await.maps.forward.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn snapshot(&self) -> MemorySnapshot {
        let state = self.state.read().await;

        MemorySnapshot {
            forward: state
                .maps
                .forward
                .iter()
                .map(|(code, m)| {
                    (
                        code.clone(),
                        (m.long_url.clone(), m.owner_id.clone(), m.sequence),
                    )
                })
                .collect(),
            reverse: state
                .maps
                .reverse
                .iter()
                .map(|(key, code)| (key.clone(), code.clone()))
                .collect(),
            next_sequence: state.maps.next_sequence,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlRepository for MemoryStore {
    async fn exists(&self, long_url: &str, owner_id: &str) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state.maps.active_code(long_url, owner_id).is_some())
    }

    async fn find_short_code(
        &self,
        long_url: &str,
        owner_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let state = self.state.read().await;
        Ok(state.maps.active_code(long_url, owner_id).cloned())
    }

    async fn insert(&self, mapping: &NewMapping) -> Result<Insertion, StoreError> {
        let mut state = self.state.write().await;

        if let Some(code) = state.maps.active_code(&mapping.long_url, &mapping.owner_id) {
            return Ok(Insertion::Existing(code.clone()));
        }

        if state.maps.forward.contains_key(&mapping.short_code) {
            debug!(code = %mapping.short_code, "Short code already taken");
            return Ok(Insertion::CodeTaken);
        }

        state.record(mapping).await?;

        Ok(Insertion::Inserted)
    }

    async fn get_mapping(&self, short_code: &str) -> Result<Option<UrlMapping>, StoreError> {
        let state = self.state.read().await;
        Ok(state.maps.forward.get(short_code).cloned())
    }

    async fn taken_codes(&self, short_codes: &[String]) -> Result<HashSet<String>, StoreError> {
        let state = self.state.read().await;

        Ok(short_codes
            .iter()
            .filter(|code| state.maps.forward.contains_key(*code))
            .cloned()
            .collect())
    }

    async fn insert_batch(&self, items: &[BatchItem]) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        for item in items {
            state.record(&item.mapping).await?;
        }

        Ok(())
    }

    async fn mark_deleted(
        &self,
        _owner_id: &str,
        _short_codes: &[String],
    ) -> Result<u64, StoreError> {
        Err(StoreError::Unsupported("soft delete"))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<UrlMapping>, StoreError> {
        let state = self.state.read().await;

        let mut mappings: Vec<UrlMapping> = state
            .maps
            .forward
            .values()
            .filter(|m| m.owner_id == owner_id)
            .cloned()
            .collect();
        mappings.sort_by_key(|m| m.sequence);

        Ok(mappings)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_item(correlation_id: &str, code: &str, url: &str, owner: &str) -> BatchItem {
        BatchItem {
            correlation_id: correlation_id.to_string(),
            mapping: NewMapping::new(code, url, owner),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();

        let result = store
            .insert(&NewMapping::new("abc123", "https://example.com", "user-a"))
            .await
            .unwrap();
        assert_eq!(result, Insertion::Inserted);

        let mapping = store.get_mapping("abc123").await.unwrap().unwrap();
        assert_eq!(mapping.long_url, "https://example.com");
        assert_eq!(mapping.owner_id, "user-a");
        assert_eq!(mapping.sequence, 1);
        assert!(!mapping.deleted);
    }

    #[tokio::test]
    async fn test_get_unknown_code() {
        let store = MemoryStore::new();
        assert!(store.get_mapping("nope00").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_reports_existing_mapping() {
        let store = MemoryStore::new();
        store
            .insert(&NewMapping::new("abc123", "https://example.com", "user-a"))
            .await
            .unwrap();

        let result = store
            .insert(&NewMapping::new("zzz999", "https://example.com", "user-a"))
            .await
            .unwrap();

        assert_eq!(result, Insertion::Existing("abc123".to_string()));
        assert!(store.get_mapping("zzz999").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_same_url_different_owners() {
        let store = MemoryStore::new();
        store
            .insert(&NewMapping::new("abc123", "https://example.com", "user-a"))
            .await
            .unwrap();

        let result = store
            .insert(&NewMapping::new("def456", "https://example.com", "user-b"))
            .await
            .unwrap();

        assert_eq!(result, Insertion::Inserted);
        assert!(store.exists("https://example.com", "user-b").await.unwrap());
        assert_eq!(
            store
                .find_short_code("https://example.com", "user-b")
                .await
                .unwrap(),
            Some("def456".to_string())
        );
    }

    #[tokio::test]
    async fn test_insert_refuses_taken_code() {
        let store = MemoryStore::new();
        store
            .insert(&NewMapping::new("abc123", "https://one.com", "user-a"))
            .await
            .unwrap();

        let result = store
            .insert(&NewMapping::new("abc123", "https://two.com", "user-a"))
            .await
            .unwrap();

        assert_eq!(result, Insertion::CodeTaken);
        let mapping = store.get_mapping("abc123").await.unwrap().unwrap();
        assert_eq!(mapping.long_url, "https://one.com");
    }

    #[tokio::test]
    async fn test_taken_codes() {
        let store = MemoryStore::new();
        store
            .insert(&NewMapping::new("abc123", "https://example.com", "user-a"))
            .await
            .unwrap();

        let taken = store
            .taken_codes(&["abc123".to_string(), "zzz999".to_string()])
            .await
            .unwrap();

        assert_eq!(taken, HashSet::from(["abc123".to_string()]));
    }

    #[tokio::test]
    async fn test_exists_and_find_short_code_miss() {
        let store = MemoryStore::new();

        assert!(!store.exists("https://example.com", "user-a").await.unwrap());
        assert!(
            store
                .find_short_code("https://example.com", "user-a")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_batch_overwrites_keep_reverse_index_consistent() {
        let store = MemoryStore::new();

        store
            .insert_batch(&[
                batch_item("1", "aaaaaa", "https://one.com", "user-a"),
                batch_item("2", "aaaaaa", "https://two.com", "user-a"),
            ])
            .await
            .unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.forward.len(), 1);
        assert_eq!(snapshot.reverse.len(), 1);
        assert_eq!(
            snapshot
                .reverse
                .get(&("https://two.com".to_string(), "user-a".to_string())),
            Some(&"aaaaaa".to_string())
        );
        assert!(!store.exists("https://one.com", "user-a").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_owner_in_insertion_order() {
        let store = MemoryStore::new();
        for (code, url, owner) in [
            ("aaaaaa", "https://1.com", "user-a"),
            ("bbbbbb", "https://2.com", "user-b"),
            ("cccccc", "https://3.com", "user-a"),
        ] {
            store
                .insert(&NewMapping::new(code, url, owner))
                .await
                .unwrap();
        }

        let listed = store.list_by_owner("user-a").await.unwrap();

        let codes: Vec<&str> = listed.iter().map(|m| m.short_code.as_str()).collect();
        assert_eq!(codes, vec!["aaaaaa", "cccccc"]);
        assert!(store.list_by_owner("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_deleted_is_unsupported() {
        let store = MemoryStore::new();

        let result = store
            .mark_deleted("user-a", &["abc123".to_string()])
            .await;

        assert!(matches!(result, Err(StoreError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_ping() {
        assert!(MemoryStore::new().ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_open_replays_log_and_resumes_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        {
            let store = MemoryStore::open(&path).await.unwrap();
            store
                .insert(&NewMapping::new("aaaaaa", "https://1.com", "user-a"))
                .await
                .unwrap();
            store
                .insert(&NewMapping::new("bbbbbb", "https://2.com", "user-b"))
                .await
                .unwrap();
        }

        let store = MemoryStore::open(&path).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.exists("https://2.com", "user-b").await.unwrap());
        assert_eq!(store.snapshot().await.next_sequence, 3);

        store
            .insert(&NewMapping::new("cccccc", "https://3.com", "user-a"))
            .await
            .unwrap();
        assert_eq!(
            store.get_mapping("cccccc").await.unwrap().unwrap().sequence,
            3
        );
    }

    #[tokio::test]
    async fn test_replay_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        {
            let store = MemoryStore::open(&path).await.unwrap();
            store
                .insert(&NewMapping::new("aaaaaa", "https://1.com", "user-a"))
                .await
                .unwrap();
            store
                .insert_batch(&[
                    batch_item("x", "bbbbbb", "https://2.com", "user-a"),
                    batch_item("y", "cccccc", "https://3.com", "user-b"),
                ])
                .await
                .unwrap();
        }

        let first = MemoryStore::open(&path).await.unwrap().snapshot().await;
        let second = MemoryStore::open(&path).await.unwrap().snapshot().await;

        assert_eq!(first, second);
        assert_eq!(first.forward.len(), 3);
        assert_eq!(first.reverse.len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_insert_is_not_journaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        {
            let store = MemoryStore::open(&path).await.unwrap();
            store
                .insert(&NewMapping::new("aaaaaa", "https://1.com", "user-a"))
                .await
                .unwrap();
            store
                .insert(&NewMapping::new("bbbbbb", "https://1.com", "user-a"))
                .await
                .unwrap();
        }

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
