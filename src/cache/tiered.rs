//! Two-tier cache engine.
//!
//! A lookup consults the in-flight table, then the memory tier, then races
//! the caller's load function against the remote tier. The winner is written
//! to memory and, when the origin won, mirrored to the remote tier in the
//! background.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use futures::stream::{FuturesUnordered, StreamExt};
use metrics::{counter, histogram};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::config::CacheConfig;
use super::error::CacheError;
use super::race::{Branch, BranchFuture, success_race};
use super::remote::{RemoteTier, decode, encode};
use super::store::MemoryStore;

const METRIC_MEMORY_HIT: &str = "folio_cache_memory_hit_total";
const METRIC_MEMORY_MISS: &str = "folio_cache_memory_miss_total";
const METRIC_REMOTE_HIT: &str = "folio_cache_remote_hit_total";
const METRIC_REMOTE_MISS: &str = "folio_cache_remote_miss_total";
const METRIC_COALESCED: &str = "folio_cache_coalesced_total";
const METRIC_LOAD_MS: &str = "folio_cache_load_ms";

type SharedOutcome = Arc<dyn Any + Send + Sync>;
type InFlight = Shared<BoxFuture<'static, SharedOutcome>>;
type InFlightTable = Arc<DashMap<String, InFlight>>;

/// Per-lookup options.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub key: String,
    /// Memory tier lifetime.
    pub expire: Duration,
    pub use_remote: bool,
    /// Remote tier lifetime; falls back to `expire`.
    pub remote_expire: Option<Duration>,
    /// Share one in-flight load between concurrent callers of the same key.
    pub coalesce: bool,
}

impl CacheOptions {
    pub fn new(key: impl Into<String>, expire: Duration) -> Self {
        Self {
            key: key.into(),
            expire,
            use_remote: false,
            remote_expire: None,
            coalesce: true,
        }
    }

    pub fn with_remote(mut self, remote_expire: Duration) -> Self {
        self.use_remote = true;
        self.remote_expire = Some(remote_expire);
        self
    }

    pub fn without_coalescing(mut self) -> Self {
        self.coalesce = false;
        self
    }

    fn remote_ttl(&self) -> Duration {
        self.remote_expire.unwrap_or(self.expire)
    }
}

/// Memory tier plus optional remote tier with request coalescing.
#[derive(Clone)]
pub struct TieredCache {
    config: CacheConfig,
    memory: Arc<MemoryStore>,
    remote: Option<Arc<dyn RemoteTier>>,
    in_flight: InFlightTable,
}

impl TieredCache {
    pub fn new(config: CacheConfig, remote: Option<Arc<dyn RemoteTier>>) -> Self {
        let memory = Arc::new(MemoryStore::new(&config));
        Self {
            config,
            memory,
            remote,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Number of keys with a load currently in flight.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns the cached value for `options.key`, running `load` on a miss.
    ///
    /// With the engine disabled `load` runs on every call and nothing is
    /// stored. Failures are never cached. A coalesced load runs on its own
    /// task, so it keeps its in-flight registration even when the caller that
    /// started it is dropped.
    pub async fn with_cache<T, E, F, Fut>(&self, options: CacheOptions, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        E: From<CacheError> + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if !self.config.enabled {
            return load().await;
        }

        if let Some(value) = self.memory.get::<T>(&options.key) {
            counter!(METRIC_MEMORY_HIT).increment(1);
            debug!(key = %options.key, "memory cache hit");
            return Ok(value);
        }

        if !options.coalesce {
            return resolve(Arc::clone(&self.memory), self.remote.clone(), options, load).await;
        }

        let key = options.key.clone();
        let shared = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                counter!(METRIC_COALESCED).increment(1);
                debug!(key = %key, "joining in-flight load");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let task = spawn_load::<T, E, F, Fut>(
                    Arc::clone(&self.memory),
                    self.remote.clone(),
                    Arc::clone(&self.in_flight),
                    options,
                    load,
                );
                entry.insert(task.clone());
                task
            }
        };

        let outcome = shared.await;
        match outcome.downcast_ref::<Result<T, E>>() {
            Some(result) => result.clone(),
            None => Err(CacheError::TypeMismatch { key }.into()),
        }
    }

    /// Removes `key` from memory and, when asked, from the remote tier.
    ///
    /// Remote failures are logged and swallowed.
    pub async fn purge(&self, key: &str, include_remote: bool) {
        let removed = self.memory.remove(key);
        debug!(key, removed, "purged memory entry");

        if !include_remote {
            return;
        }
        let Some(remote) = self.remote.as_ref().filter(|remote| remote.is_configured()) else {
            return;
        };
        if let Err(err) = remote.delete(key).await {
            error!(key, error = %err, "failed to purge remote cache entry");
        }
    }
}

/// In-flight table entry owned by a load task; removed when the task ends,
/// including by panic.
struct Registration {
    key: String,
    table: InFlightTable,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.table.remove(&self.key);
    }
}

/// Runs the lookup on a detached task that unregisters `options.key` when it
/// settles.
fn spawn_load<T, E, F, Fut>(
    memory: Arc<MemoryStore>,
    remote: Option<Arc<dyn RemoteTier>>,
    table: InFlightTable,
    options: CacheOptions,
    load: F,
) -> InFlight
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    E: From<CacheError> + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let key = options.key.clone();
    let handle = tokio::spawn({
        let key = key.clone();
        async move {
            let _registration = Registration { key, table };
            let outcome = resolve::<T, E, F, Fut>(memory, remote, options, load).await;
            Arc::new(outcome) as SharedOutcome
        }
    });

    handle
        .map(move |joined| match joined {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(key = %key, error = %err, "cache load task failed");
                let failure: Result<T, E> = Err(CacheError::LoadTask {
                    key,
                    message: err.to_string(),
                }
                .into());
                Arc::new(failure) as SharedOutcome
            }
        })
        .boxed()
        .shared()
}

async fn resolve<T, E, F, Fut>(
    memory: Arc<MemoryStore>,
    remote: Option<Arc<dyn RemoteTier>>,
    options: CacheOptions,
    load: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    E: From<CacheError> + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let key = options.key.clone();

    if let Some(value) = memory.get::<T>(&key) {
        counter!(METRIC_MEMORY_HIT).increment(1);
        debug!(key = %key, "memory cache hit");
        return Ok(value);
    }
    counter!(METRIC_MEMORY_MISS).increment(1);

    let remote = remote.filter(|remote| options.use_remote && remote.is_configured());
    let started = Instant::now();

    let origin = load();
    let mut branches: Vec<BranchFuture<T, E>> =
        vec![async move { (Branch::Origin, origin.await) }.boxed()];
    if let Some(remote) = remote.clone() {
        branches.push(remote_lookup::<T, E>(remote, key.clone()).boxed());
    }

    let win = success_race(branches).await?;
    histogram!(METRIC_LOAD_MS, "branch" => win.branch.as_str())
        .record(started.elapsed().as_secs_f64() * 1000.0);
    debug!(
        key = %key,
        branch = win.branch.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "cache load settled"
    );

    memory.insert(&key, win.value.clone(), options.expire);

    if win.branch != Branch::Remote
        && let Some(remote) = remote
    {
        spawn_remote_write(remote, key.clone(), &win.value, options.remote_ttl());
    }

    if !win.pending.is_empty() {
        tokio::spawn(drain_losers(key, win.pending));
    }

    Ok(win.value)
}

async fn remote_lookup<T, E>(remote: Arc<dyn RemoteTier>, key: String) -> (Branch, Result<T, E>)
where
    T: DeserializeOwned,
    E: From<CacheError>,
{
    let started = Instant::now();
    let result = match remote.get(&key).await {
        Ok(Some(raw)) => {
            counter!(METRIC_REMOTE_HIT).increment(1);
            debug!(
                key = %key,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "remote cache hit"
            );
            decode::<T>(&raw)
        }
        Ok(None) => {
            counter!(METRIC_REMOTE_MISS).increment(1);
            debug!(key = %key, "remote cache miss");
            Err(CacheError::RemoteMiss)
        }
        Err(err) => {
            warn!(key = %key, error = %err, "remote cache lookup failed");
            Err(err)
        }
    };

    (Branch::Remote, result.map_err(E::from))
}

fn spawn_remote_write<T: Serialize>(
    remote: Arc<dyn RemoteTier>,
    key: String,
    value: &T,
    ttl: Duration,
) {
    let payload = match encode(value) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(key = %key, error = %err, "skipping remote cache write");
            return;
        }
    };

    tokio::spawn(async move {
        match remote.set(&key, &payload, ttl).await {
            Ok(()) => debug!(key = %key, ttl_secs = ttl.as_secs(), "remote cache updated"),
            Err(err) => error!(key = %key, error = %err, "failed to write remote cache"),
        }
    });
}

async fn drain_losers<T, E>(key: String, mut pending: FuturesUnordered<BranchFuture<T, E>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    while let Some((branch, result)) = pending.next().await {
        match (branch, result.is_ok()) {
            (Branch::Remote, true) => {
                warn!(key = %key, "remote cache answered after the race was decided");
            }
            (branch, ok) => {
                debug!(key = %key, branch = branch.as_str(), ok, "late race branch settled");
            }
        }
    }
}
