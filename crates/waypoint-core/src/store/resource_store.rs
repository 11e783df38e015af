use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::api::{ApiError, FailureKind, ListParams, ResourceApi};

use super::entry::CacheEntry;
use super::mutation::Reconciliation;
use super::pending::{FetchOutcome, FetchTicket, PendingFetch};
use super::Resource;

// ============================================================================
// Constants
// ============================================================================

/// Capacity of the failure event channel.
/// A lagging subscriber only loses old events, never blocks the store.
const FAILURE_CHANNEL_CAPACITY: usize = 16;

/// An immutable view of a cached collection.
pub type Snapshot<T> = Arc<Vec<T>>;

/// Store operations, as reported in failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreOperation {
    Fetch,
    FetchItem,
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOperation::Fetch => write!(f, "fetch"),
            StoreOperation::FetchItem => write!(f, "fetch item"),
            StoreOperation::Create => write!(f, "create"),
            StoreOperation::Update => write!(f, "update"),
            StoreOperation::Delete => write!(f, "delete"),
        }
    }
}

/// The last failure a store saw. Observational only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFailure {
    pub resource: &'static str,
    pub operation: StoreOperation,
    pub kind: FailureKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl std::fmt::Display for StoreFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} failed ({}): {}",
            self.resource, self.operation, self.kind, self.message
        )
    }
}

struct StoreState<T> {
    entry: CacheEntry<T>,
    pending: Option<PendingFetch<T>>,
    /// Mutations applied while `pending` is on the wire, replayed onto its result.
    journal: Vec<Reconciliation<T>>,
    last_error: Option<StoreFailure>,
    next_fetch_id: u64,
    generation: u64,
}

impl<T> Default for StoreState<T> {
    fn default() -> Self {
        Self {
            entry: CacheEntry::default(),
            pending: None,
            journal: Vec::new(),
            last_error: None,
            next_fetch_id: 0,
            generation: 0,
        }
    }
}

struct StoreInner<T> {
    state: Mutex<StoreState<T>>,
    snapshots: watch::Sender<Snapshot<T>>,
    failures: broadcast::Sender<StoreFailure>,
    ttl: Duration,
}

impl<T: Resource> StoreInner<T> {
    /// The lock is never held across an await, so a poisoned state is still
    /// consistent and safe to keep using.
    fn lock(&self) -> MutexGuard<'_, StoreState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: Snapshot<T>) {
        self.snapshots.send_replace(snapshot);
    }

    fn record_failure(
        &self,
        state: &mut StoreState<T>,
        operation: StoreOperation,
        err: &ApiError,
    ) {
        warn!(
            resource = T::NAME,
            operation = %operation,
            kind = %err.kind(),
            error = %err,
            "Store operation failed"
        );
        let failure = StoreFailure {
            resource: T::NAME,
            operation,
            kind: err.kind(),
            message: err.to_string(),
            at: Utc::now(),
        };
        state.last_error = Some(failure.clone());
        // No subscribers is fine
        let _ = self.failures.send(failure);
    }

    /// Runs once per fetch, inside the fetch task, before any attached caller
    /// sees the outcome.
    fn complete_fetch(
        &self,
        ticket: FetchTicket,
        result: Result<Vec<T>, ApiError>,
    ) -> FetchOutcome<T> {
        let mut state = self.lock();

        if state.generation != ticket.generation {
            debug!(
                resource = T::NAME,
                fetch_id = ticket.id,
                "Store was reset during fetch, result not cached"
            );
            return result.map(Arc::new);
        }

        // Same generation: this fetch is still the pending one.
        state.pending = None;
        let journal = std::mem::take(&mut state.journal);

        match result {
            Ok(items) => {
                state.last_error = None;
                state.entry.replace(items, Utc::now());
                if !journal.is_empty() {
                    debug!(
                        resource = T::NAME,
                        fetch_id = ticket.id,
                        replayed = journal.len(),
                        "Replaying mutations made during fetch"
                    );
                    state.entry.patch(|items| {
                        journal
                            .into_iter()
                            .fold(false, |changed, edit| edit.apply(items) || changed)
                    });
                }
                let snapshot = state.entry.items();
                drop(state);

                debug!(
                    resource = T::NAME,
                    fetch_id = ticket.id,
                    count = snapshot.len(),
                    "Fetch complete"
                );
                self.publish(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(err) => {
                self.record_failure(&mut state, StoreOperation::Fetch, &err);
                Err(err)
            }
        }
    }

    /// Record the outcome of a mutation and patch the entry on success.
    fn finish_mutation<O>(
        &self,
        operation: StoreOperation,
        generation: u64,
        result: Result<O, ApiError>,
        reconcile: impl FnOnce(&O) -> Reconciliation<T>,
    ) -> Result<O, ApiError> {
        let mut state = self.lock();

        if state.generation != generation {
            debug!(
                resource = T::NAME,
                operation = %operation,
                "Store was reset during mutation, cache not patched"
            );
            return result;
        }

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                self.record_failure(&mut state, operation, &err);
                return Err(err);
            }
        };

        state.last_error = None;

        let edit = reconcile(&value);
        if state.pending.is_some() {
            state.journal.push(edit.clone());
        }
        let changed = state.entry.patch(|items| edit.apply(items));
        let snapshot = changed.then(|| state.entry.items());
        drop(state);

        if let Some(snapshot) = snapshot {
            self.publish(snapshot);
        } else {
            debug!(
                resource = T::NAME,
                operation = %operation,
                "Mutated item not in cached snapshot"
            );
        }
        Ok(value)
    }
}

/// A cached mirror of one remote collection.
///
/// Cloning is cheap and every clone shares the same cache, pending fetch and
/// channels.
pub struct ResourceStore<T, A> {
    api: Arc<A>,
    inner: Arc<StoreInner<T>>,
    params: ListParams,
}

impl<T, A> Clone for ResourceStore<T, A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            inner: Arc::clone(&self.inner),
            params: self.params.clone(),
        }
    }
}

impl<T: Resource, A: ResourceApi<T>> ResourceStore<T, A> {
    /// Create an empty store over `api`. Snapshots younger than `ttl` are
    /// served without a network call.
    pub fn new(api: Arc<A>, ttl: Duration) -> Self {
        let (snapshots, _) = watch::channel(Arc::new(Vec::new()));
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            api,
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState::default()),
                snapshots,
                failures,
                ttl,
            }),
            params: ListParams::default(),
        }
    }

    /// Query parameters sent with every collection fetch.
    pub fn with_params(mut self, params: ListParams) -> Self {
        self.params = params;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    // ===== Fetch =====

    /// Return the collection, from cache while it is fresh.
    ///
    /// With `force_refresh` a fresh cache is bypassed. If a fetch is already
    /// in flight the caller waits for that one instead of starting another,
    /// whatever `force_refresh` says.
    pub async fn fetch(&self, force_refresh: bool) -> Result<Snapshot<T>, ApiError> {
        let pending = {
            let mut state = self.inner.lock();

            if !force_refresh && state.entry.is_fresh(self.inner.ttl, Utc::now()) {
                debug!(resource = T::NAME, "Serving cached snapshot");
                return Ok(state.entry.items());
            }

            let joined = state.pending.as_ref().map(|pending| {
                debug!(
                    resource = T::NAME,
                    fetch_id = pending.ticket.id,
                    "Joining in-flight fetch"
                );
                pending.attach()
            });
            match joined {
                Some(handle) => handle,
                None => {
                    let pending = self.issue_fetch(&mut state);
                    let handle = pending.attach();
                    state.pending = Some(pending);
                    handle
                }
            }
        };

        pending.await
    }

    fn issue_fetch(&self, state: &mut StoreState<T>) -> PendingFetch<T> {
        state.next_fetch_id += 1;
        let ticket = FetchTicket {
            id: state.next_fetch_id,
            generation: state.generation,
        };
        debug!(resource = T::NAME, fetch_id = ticket.id, "Fetching collection");

        let api = Arc::clone(&self.api);
        let inner = Arc::clone(&self.inner);
        let params = self.params.clone();
        PendingFetch::spawn(ticket, async move {
            let result = api.list(&params).await;
            inner.complete_fetch(ticket, result)
        })
    }

    // ===== Mutations =====

    /// Create an item and add it to the cached collection.
    pub async fn create(&self, input: &T::Create) -> Result<T, ApiError> {
        let generation = self.generation();
        let result = self.api.create(input).await;
        self.inner
            .finish_mutation(StoreOperation::Create, generation, result, |item: &T| {
                Reconciliation::Insert(item.clone(), T::INSERT_AT)
            })
    }

    /// Update an item and replace it in the cached collection.
    pub async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, ApiError> {
        let generation = self.generation();
        let result = self.api.update(id, patch).await;
        self.inner
            .finish_mutation(StoreOperation::Update, generation, result, |item: &T| {
                Reconciliation::Replace(id.to_string(), item.clone())
            })
    }

    /// Delete an item and drop it from the cached collection.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let generation = self.generation();
        let result = self.api.delete(id).await;
        self.inner
            .finish_mutation(StoreOperation::Delete, generation, result, |_: &()| {
                Reconciliation::Remove(id.to_string())
            })
    }

    /// Re-read a single item from the server and merge it into the cache.
    pub async fn refresh_item(&self, id: &str) -> Result<T, ApiError> {
        let generation = self.generation();
        let result = self.api.get(id).await;
        self.inner
            .finish_mutation(StoreOperation::FetchItem, generation, result, |item: &T| {
                Reconciliation::Upsert(item.clone())
            })
    }

    fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    // ===== Cache access =====

    /// Look an item up in the current snapshot. Never touches the network.
    pub fn get_by_id(&self, id: &str) -> Option<T> {
        self.inner.lock().entry.get(id).cloned()
    }

    /// The current snapshot, fresh or not.
    pub fn items(&self) -> Snapshot<T> {
        self.inner.lock().entry.items()
    }

    pub fn is_fresh(&self) -> bool {
        self.inner.lock().entry.is_fresh(self.inner.ttl, Utc::now())
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().entry.fetched_at()
    }

    pub fn age_display(&self) -> String {
        self.inner.lock().entry.age_display()
    }

    // ===== Error state =====

    pub fn last_error(&self) -> Option<StoreFailure> {
        self.inner.lock().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.inner.lock().last_error = None;
    }

    // ===== Observers =====

    /// Watch the cached snapshot. The receiver sees every replacement and patch.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.inner.snapshots.subscribe()
    }

    /// Receive every failure the store records, for user-facing notifications.
    pub fn failures(&self) -> broadcast::Receiver<StoreFailure> {
        self.inner.failures.subscribe()
    }

    // ===== Invalidation =====

    /// Keep the snapshot but make the next `fetch(false)` go to the network.
    pub fn invalidate(&self) {
        self.inner.lock().entry.mark_stale();
        debug!(resource = T::NAME, "Cache invalidated");
    }

    /// Discard the cached snapshot. An in-flight fetch still lands.
    pub fn clear_cache(&self) {
        self.inner.lock().entry.clear();
        self.inner.publish(Arc::new(Vec::new()));
        debug!(resource = T::NAME, "Cache cleared");
    }

    /// Return the store to its initial state, e.g. on logout.
    ///
    /// Operations still in flight complete for their callers but no longer
    /// write to this store.
    pub fn reset(&self) {
        {
            let mut state = self.inner.lock();
            state.entry.clear();
            state.pending = None;
            state.journal.clear();
            state.last_error = None;
            state.generation += 1;
        }
        self.inner.publish(Arc::new(Vec::new()));
        info!(resource = T::NAME, "Store reset");
    }
}

// ============================================================================
// Tests
// ============================================================================
