//! Request coalescing: at most one running operation per key.
//!
//! A [`SingleFlight`] maps an operation key to the future currently doing
//! that operation. Callers either join the running future (and get the
//! same result, computed once) or are told it is already running.
//!
//! Each started operation is driven by its own Tokio task, so it always
//! runs to completion even if every caller stops waiting. Its entry is
//! removed when it finishes, optionally after a *linger* delay during
//! which late callers still receive the finished result.
//!
//! ```text
//!   join_or_start(k) ──→ [running] ──(done)──→ [lingering] ──(linger)──→ gone
//!         ↑                  │                      │
//!         └── joins ─────────┴──── joins ───────────┘
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};

/// A cloneable handle to a running operation. Every clone resolves to the
/// same output.
pub type Flight<T> = Shared<BoxFuture<'static, T>>;

struct Entry<T> {
    generation: u64,
    flight: Flight<T>,
}

struct Table<K, T> {
    entries: HashMap<K, Entry<T>>,
    next_generation: u64,
}

/// Coalesces concurrent operations by key.
///
/// `T` must be `Clone` because every joined caller gets its own copy of
/// the result.
///
/// All starting methods spawn onto the current Tokio runtime and panic
/// outside of one.
pub struct SingleFlight<K, T> {
    table: Arc<Mutex<Table<K, T>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                entries: HashMap::new(),
                next_generation: 0,
            })),
        }
    }

    /// Joins the operation running under `key`, or starts `make()` if none is.
    ///
    /// Returns the flight and `true` when an existing one was joined.
    /// `make` is only called when starting.
    pub fn join_or_start<F>(
        &self,
        key: K,
        linger: Duration,
        make: impl FnOnce() -> F,
    ) -> (Flight<T>, bool)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let mut table = self.lock();
        if let Some(entry) = table.entries.get(&key) {
            return (entry.flight.clone(), true);
        }
        (self.insert(&mut table, key, linger, make()), false)
    }

    /// Starts `fut` under `key` unless an operation is already registered
    /// there, in which case `fut` is dropped unpolled and `None` returned.
    pub fn try_start<F>(
        &self,
        key: K,
        linger: Duration,
        fut: F,
    ) -> Option<Flight<T>>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let mut table = self.lock();
        if table.entries.contains_key(&key) {
            return None;
        }
        Some(self.insert(&mut table, key, linger, fut))
    }

    /// Starts `fut` under `key`, replacing any registered operation.
    ///
    /// The replaced operation keeps running for whoever already joined it,
    /// but new callers only see the new one.
    pub fn start<F>(&self, key: K, linger: Duration, fut: F) -> Flight<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let mut table = self.lock();
        self.insert(&mut table, key, linger, fut)
    }

    /// Returns the registered operation for `key`, if any.
    pub fn get(&self, key: &K) -> Option<Flight<T>> {
        self.lock().entries.get(key).map(|e| e.flight.clone())
    }

    /// Unregisters `key`. A running operation is not cancelled.
    pub fn forget(&self, key: &K) {
        self.lock().entries.remove(key);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Number of registered operations (running or lingering).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn insert<F>(
        &self,
        table: &mut Table<K, T>,
        key: K,
        linger: Duration,
        fut: F,
    ) -> Flight<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        table.next_generation += 1;
        let generation = table.next_generation;

        let mut release = Release {
            table: Arc::downgrade(&self.table),
            key: Some(key.clone()),
            generation,
            linger,
            completed: false,
        };
        let flight = async move {
            let out = fut.await;
            release.completed = true;
            drop(release);
            out
        }
        .boxed()
        .shared();

        tokio::spawn(flight.clone());
        table.entries.insert(
            key,
            Entry {
                generation,
                flight: flight.clone(),
            },
        );
        flight
    }

    fn lock(&self) -> MutexGuard<'_, Table<K, T>> {
        lock_table(&self.table)
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock_table<K, T>(table: &Mutex<Table<K, T>>) -> MutexGuard<'_, Table<K, T>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes an operation's entry once it finishes, unless the entry was
/// replaced by a newer generation in the meantime.
///
/// Holds a `Weak` because the future owning this guard is itself stored
/// in the table.
struct Release<K, T>
where
    K: Eq + Hash + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    table: Weak<Mutex<Table<K, T>>>,
    key: Option<K>,
    generation: u64,
    linger: Duration,
    completed: bool,
}

impl<K, T> Release<K, T>
where
    K: Eq + Hash + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn remove_now(table: &Weak<Mutex<Table<K, T>>>, key: &K, generation: u64) {
        let Some(table) = table.upgrade() else {
            return;
        };
        let mut table = lock_table(&table);
        if table.entries.get(key).is_some_and(|e| e.generation == generation) {
            table.entries.remove(key);
        }
    }
}

impl<K, T> Drop for Release<K, T>
where
    K: Eq + Hash + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        if self.completed && !self.linger.is_zero() {
            // Drop is synchronous, so the delayed removal runs as its own task.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let table = self.table.clone();
                let generation = self.generation;
                let linger = self.linger;
                handle.spawn(async move {
                    tokio::time::sleep(linger).await;
                    Self::remove_now(&table, &key, generation);
                });
                return;
            }
        }
        Self::remove_now(&self.table, &key, self.generation);
    }
}
