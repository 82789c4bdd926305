//! Remote data cache
//!
//! Keyed store of server reads with:
//! - de-duplicated concurrent fetches (one in-flight request per key)
//! - invalidation by resource or by a single query parameter
//! - a two-phase optimistic update protocol (apply, then confirm or roll back)
//!
//! Entries live behind a `tokio::sync::Mutex`. Writes are not serialized
//! against each other; whichever response lands last wins.

use super::error::{ClientError, ClientResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Cards,
    CardNodes,
    Edges,
    Tags,
    Projects,
    Settings,
}

impl Resource {
    /// Path segment under `/api`
    pub fn path(self) -> &'static str {
        match self {
            Resource::Cards => "cards",
            Resource::CardNodes => "cardnodes",
            Resource::Edges => "edges",
            Resource::Tags => "tags",
            Resource::Projects => "projects",
            Resource::Settings => "settings",
        }
    }
}

/// Stable composite key: a resource plus its query parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub resource: Resource,
    pub params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            params: BTreeMap::new(),
        }
    }

    /// Key for a single record, fetched from `/api/<resource>/<id>`
    pub fn detail(resource: Resource, id: impl Into<String>) -> Self {
        Self::new(resource).with("id", id)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Pending,
    Error(String),
    Success(T),
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_result(self) -> ClientResult<T> {
        match self {
            QueryState::Success(data) => Ok(data),
            QueryState::Error(message) => Err(ClientError::Query(message)),
            QueryState::Pending => Err(ClientError::Query("Query is still pending".to_string())),
        }
    }
}

/// Source of data for cache misses
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> ClientResult<Value>;
}

/// Which cached queries a write makes stale
#[derive(Debug, Clone, PartialEq)]
pub enum Invalidation {
    /// Every key of the resource
    Resource(Resource),
    /// Only keys whose `field` parameter is one of `values`
    Field {
        resource: Resource,
        field: String,
        values: Vec<String>,
    },
}

impl Invalidation {
    pub fn field(resource: Resource, field: impl Into<String>, value: impl Into<String>) -> Self {
        Invalidation::Field {
            resource,
            field: field.into(),
            values: vec![value.into()],
        }
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Invalidation::Resource(resource) => key.resource == *resource,
            Invalidation::Field {
                resource,
                field,
                values,
            } => {
                key.resource == *resource
                    && key
                        .param(field)
                        .map_or(false, |v| values.iter().any(|candidate| candidate == v))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId(u64);

#[derive(Debug, Clone)]
struct Entry {
    state: QueryState<Value>,
    stale: bool,
}

type InFlight = watch::Receiver<Option<QueryState<Value>>>;

#[derive(Default)]
struct Inner {
    entries: HashMap<QueryKey, Entry>,
    in_flight: HashMap<QueryKey, InFlight>,
    /// Keys invalidated while their fetch was still running
    invalidated_in_flight: HashSet<QueryKey>,
    snapshots: HashMap<PatchId, (QueryKey, Option<Entry>)>,
    next_patch: u64,
}

enum Lookup {
    Hit(QueryState<Value>),
    Wait(InFlight),
    Fetch(watch::Sender<Option<QueryState<Value>>>, InFlight),
}

pub struct QueryCache<F: Fetcher> {
    fetcher: Arc<F>,
    inner: Arc<Mutex<Inner>>,
}

impl<F: Fetcher> Clone for QueryCache<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Fetcher + 'static> QueryCache<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// Fresh cached data, or the result of a (shared) fetch.
    ///
    /// The fetch runs on its own task, so a caller that stops waiting does
    /// not strand the key: the result still lands in the cache.
    pub async fn read(&self, key: &QueryKey) -> QueryState<Value> {
        loop {
            let lookup = {
                let mut guard = self.inner.lock().await;
                let inner = &mut *guard;

                let lookup = match inner.entries.get(key) {
                    Some(Entry {
                        state: QueryState::Success(data),
                        stale: false,
                    }) => Lookup::Hit(QueryState::Success(data.clone())),
                    _ => match inner.in_flight.get(key) {
                        Some(rx) => Lookup::Wait(rx.clone()),
                        None => {
                            let (tx, rx) = watch::channel(None);
                            inner.in_flight.insert(key.clone(), rx.clone());
                            Lookup::Fetch(tx, rx)
                        }
                    },
                };
                lookup
            };

            let rx = match lookup {
                Lookup::Hit(state) => return state,
                Lookup::Wait(rx) => rx,
                Lookup::Fetch(tx, rx) => {
                    self.spawn_fetch(key.clone(), tx);
                    rx
                }
            };

            if let Some(state) = wait_for(rx).await {
                return state;
            }

            // The fetch task went away without reporting; clear it and start over
            tracing::warn!("Fetch for {:?} ended without a result, retrying", key);
            let mut inner = self.inner.lock().await;
            if inner
                .in_flight
                .get(key)
                .map_or(false, |rx| rx.has_changed().is_err())
            {
                inner.in_flight.remove(key);
            }
        }
    }

    fn spawn_fetch(&self, key: QueryKey, tx: watch::Sender<Option<QueryState<Value>>>) {
        let fetcher = Arc::clone(&self.fetcher);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tracing::debug!("Fetching {:?}", key);

            let state = match fetcher.fetch(&key).await {
                Ok(data) => QueryState::Success(data),
                Err(e) => {
                    tracing::warn!("Fetch failed for {:?}: {}", key, e);
                    QueryState::Error(e.to_string())
                }
            };

            {
                let mut inner = inner.lock().await;
                inner.in_flight.remove(&key);
                let stale = inner.invalidated_in_flight.remove(&key);
                inner.entries.insert(
                    key,
                    Entry {
                        state: state.clone(),
                        stale,
                    },
                );
            }

            tx.send_replace(Some(state));
        });
    }

    /// Typed `read`
    pub async fn read_as<T: DeserializeOwned>(&self, key: &QueryKey) -> QueryState<T> {
        match self.read(key).await {
            QueryState::Success(data) => match serde_json::from_value(data) {
                Ok(typed) => QueryState::Success(typed),
                Err(e) => QueryState::Error(format!("Failed to decode {:?}: {}", key.resource, e)),
            },
            QueryState::Error(message) => QueryState::Error(message),
            QueryState::Pending => QueryState::Pending,
        }
    }

    /// Current state without fetching. Stale data is still reported as data.
    pub async fn state(&self, key: &QueryKey) -> QueryState<Value> {
        let inner = self.inner.lock().await;
        match inner.entries.get(key) {
            Some(entry) => entry.state.clone(),
            None => QueryState::Pending,
        }
    }

    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        let inner = self.inner.lock().await;
        inner.entries.get(key).map_or(false, |e| e.stale)
    }

    /// Await a write, then invalidate. Failures are returned as-is.
    pub async fn mutate<T, Fut>(&self, invalidation: Invalidation, write: Fut) -> ClientResult<T>
    where
        Fut: Future<Output = ClientResult<T>>,
    {
        let value = write.await?;
        self.invalidate(&invalidation).await;
        Ok(value)
    }

    /// Mark matching entries stale; returns how many were affected
    pub async fn invalidate(&self, invalidation: &Invalidation) -> usize {
        let mut inner = self.inner.lock().await;
        let mut count = 0;

        for (key, entry) in inner.entries.iter_mut() {
            if invalidation.matches(key) {
                entry.stale = true;
                count += 1;
            }
        }

        let running: Vec<QueryKey> = inner
            .in_flight
            .keys()
            .filter(|key| invalidation.matches(key))
            .cloned()
            .collect();
        inner.invalidated_in_flight.extend(running);

        tracing::debug!("Invalidated {} cached queries ({:?})", count, invalidation);
        count
    }

    /// Refetch every stale entry
    pub async fn refetch_stale(&self) -> Vec<(QueryKey, QueryState<Value>)> {
        let stale: Vec<QueryKey> = {
            let inner = self.inner.lock().await;
            inner
                .entries
                .iter()
                .filter(|(_, entry)| entry.stale)
                .map(|(key, _)| key.clone())
                .collect()
        };

        let mut results = Vec::with_capacity(stale.len());
        for key in stale {
            let state = self.read(&key).await;
            results.push((key, state));
        }
        results
    }

    /// Apply a local change ahead of the server, remembering what to roll back to
    pub async fn apply_optimistic(
        &self,
        key: &QueryKey,
        patch: impl FnOnce(&mut Value),
    ) -> PatchId {
        let mut inner = self.inner.lock().await;

        let snapshot = inner.entries.get(key).cloned();
        let mut data = snapshot
            .as_ref()
            .and_then(|e| e.state.data().cloned())
            .unwrap_or(Value::Null);
        patch(&mut data);

        inner.entries.insert(
            key.clone(),
            Entry {
                state: QueryState::Success(data),
                stale: snapshot.as_ref().map_or(false, |e| e.stale),
            },
        );

        inner.next_patch += 1;
        let id = PatchId(inner.next_patch);
        inner.snapshots.insert(id, (key.clone(), snapshot));
        id
    }

    /// True while any optimistic patch on `key` awaits confirmation
    pub async fn is_pending(&self, key: &QueryKey) -> bool {
        let inner = self.inner.lock().await;
        inner.snapshots.values().any(|(k, _)| k == key)
    }

    /// Replace the patched entry with the server's version
    pub async fn confirm(&self, id: PatchId, server_value: Value) {
        let mut inner = self.inner.lock().await;
        if let Some((key, _)) = inner.snapshots.remove(&id) {
            inner.entries.insert(
                key,
                Entry {
                    state: QueryState::Success(server_value),
                    stale: false,
                },
            );
        }
    }

    /// Restore the entry exactly as it was before the patch
    pub async fn rollback(&self, id: PatchId) {
        let mut inner = self.inner.lock().await;
        if let Some((key, snapshot)) = inner.snapshots.remove(&id) {
            tracing::debug!("Rolling back optimistic update on {:?}", key);
            match snapshot {
                Some(entry) => {
                    inner.entries.insert(key, entry);
                }
                None => {
                    inner.entries.remove(&key);
                }
            }
        }
    }
}

/// `None` when the sender closed without ever publishing a result
async fn wait_for(mut rx: InFlight) -> Option<QueryState<Value>> {
    loop {
        let current = rx.borrow_and_update().clone();
        if current.is_some() {
            return current;
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns `{"n": <call number>}` after a short delay, or fails when told to
    struct CountingFetcher {
        calls: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
    }

    impl CountingFetcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: std::sync::atomic::AtomicBool::new(false),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, _key: &QueryKey) -> ClientResult<Value> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::Http {
                    status: 500,
                    message: "Internal server error".to_string(),
                });
            }
            Ok(json!({ "n": n }))
        }
    }

    fn cards_in(project: &str) -> QueryKey {
        QueryKey::new(Resource::Cards).with("projectId", project)
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_fetch() {
        let fetcher = CountingFetcher::new();
        let cache = QueryCache::new(Arc::clone(&fetcher));
        let key = cards_in("p1");

        let (a, b, c) = tokio::join!(cache.read(&key), cache.read(&key), cache.read(&key));

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(a, QueryState::Success(json!({"n": 1})));
        assert_eq!(a, b);
        assert_eq!(b, c);

        // Fresh entries are served from memory
        cache.read(&key).await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_read_still_fills_the_cache() {
        let fetcher = CountingFetcher::new();
        let cache = QueryCache::new(Arc::clone(&fetcher));
        let key = cards_in("p1");

        let gave_up = tokio::time::timeout(Duration::from_millis(2), cache.read(&key)).await;
        assert!(gave_up.is_err());

        assert_eq!(cache.read(&key).await, QueryState::Success(json!({"n": 1})));
        assert_eq!(cache.read(&key).await, QueryState::Success(json!({"n": 1})));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidation_during_fetch_marks_result_stale() {
        let fetcher = CountingFetcher::new();
        let cache = QueryCache::new(Arc::clone(&fetcher));
        let key = cards_in("p1");

        let (state, touched) = tokio::join!(cache.read(&key), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            cache
                .invalidate(&Invalidation::field(Resource::Cards, "projectId", "p1"))
                .await
        });

        // Nothing was cached yet, but the running fetch was noted
        assert_eq!(touched, 0);
        assert_eq!(state, QueryState::Success(json!({"n": 1})));
        assert!(cache.is_stale(&key).await);

        assert_eq!(cache.read(&key).await, QueryState::Success(json!({"n": 2})));
        assert!(!cache.is_stale(&key).await);
    }

    #[tokio::test]
    async fn test_state_does_not_fetch() {
        let fetcher = CountingFetcher::new();
        let cache = QueryCache::new(Arc::clone(&fetcher));
        let key = cards_in("p1");

        assert_eq!(cache.state(&key).await, QueryState::Pending);
        assert_eq!(fetcher.calls(), 0);

        cache.read(&key).await;
        assert!(cache.state(&key).await.data().is_some());
    }

    #[tokio::test]
    async fn test_errors_are_reported() {
        let fetcher = CountingFetcher::new();
        fetcher.fail.store(true, Ordering::SeqCst);
        let cache = QueryCache::new(Arc::clone(&fetcher));

        let state = cache.read(&cards_in("p1")).await;
        assert!(matches!(state, QueryState::Error(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_field_invalidation_scope() {
        let fetcher = CountingFetcher::new();
        let cache = QueryCache::new(Arc::clone(&fetcher));

        let p1 = cards_in("p1");
        let p2 = cards_in("p2");
        let all = QueryKey::new(Resource::Cards);
        let edges = QueryKey::new(Resource::Edges).with("projectId", "p1");
        for key in [&p1, &p2, &all, &edges] {
            cache.read(key).await;
        }

        let touched = cache
            .invalidate(&Invalidation::field(Resource::Cards, "projectId", "p1"))
            .await;
        assert_eq!(touched, 1);
        assert!(cache.is_stale(&p1).await);
        assert!(!cache.is_stale(&all).await);
        assert!(!cache.is_stale(&p2).await);
        assert!(!cache.is_stale(&edges).await);

        let refetched = cache.refetch_stale().await;
        assert_eq!(refetched.len(), 1);
        assert!(!cache.is_stale(&p1).await);
        assert_eq!(fetcher.calls(), 5);

        let touched = cache
            .invalidate(&Invalidation::Resource(Resource::Cards))
            .await;
        assert_eq!(touched, 3);
    }

    #[tokio::test]
    async fn test_mutate_invalidates_only_on_success() {
        let fetcher = CountingFetcher::new();
        let cache = QueryCache::new(Arc::clone(&fetcher));
        let key = QueryKey::new(Resource::Tags);
        cache.read(&key).await;

        let failed: ClientResult<()> = cache
            .mutate(Invalidation::Resource(Resource::Tags), async {
                Err(ClientError::Http {
                    status: 409,
                    message: "Tag already exists".to_string(),
                })
            })
            .await;
        assert_eq!(failed.unwrap_err().status(), Some(409));
        assert!(!cache.is_stale(&key).await);

        let created = cache
            .mutate(Invalidation::Resource(Resource::Tags), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(created, 7);
        assert!(cache.is_stale(&key).await);
    }

    #[tokio::test]
    async fn test_optimistic_confirm_and_rollback() {
        let fetcher = CountingFetcher::new();
        let cache = QueryCache::new(Arc::clone(&fetcher));
        let key = cards_in("p1");
        cache.read(&key).await;

        let patch = cache
            .apply_optimistic(&key, |v| v["n"] = json!(99))
            .await;
        assert!(cache.is_pending(&key).await);
        assert_eq!(cache.state(&key).await, QueryState::Success(json!({"n": 99})));

        cache.rollback(patch).await;
        assert!(!cache.is_pending(&key).await);
        assert_eq!(cache.state(&key).await, QueryState::Success(json!({"n": 1})));

        let patch = cache
            .apply_optimistic(&key, |v| v["n"] = json!(42))
            .await;
        cache.confirm(patch, json!({"n": 43, "server": true})).await;
        assert_eq!(
            cache.state(&key).await,
            QueryState::Success(json!({"n": 43, "server": true}))
        );
    }

    #[tokio::test]
    async fn test_rollback_of_unknown_entry_removes_it() {
        let cache = QueryCache::new(CountingFetcher::new());
        let key = QueryKey::detail(Resource::Cards, "c1");

        let patch = cache
            .apply_optimistic(&key, |v| *v = json!({"title": "draft"}))
            .await;
        assert!(cache.state(&key).await.data().is_some());

        cache.rollback(patch).await;
        assert_eq!(cache.state(&key).await, QueryState::Pending);
    }

    #[tokio::test]
    async fn test_typed_read() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Counter {
            n: u32,
        }

        let cache = QueryCache::new(CountingFetcher::new());
        let state: QueryState<Counter> = cache.read_as(&cards_in("p1")).await;
        assert_eq!(state, QueryState::Success(Counter { n: 1 }));

        let wrong: QueryState<Vec<String>> = cache.read_as(&cards_in("p1")).await;
        assert!(matches!(wrong, QueryState::Error(_)));
    }
}
