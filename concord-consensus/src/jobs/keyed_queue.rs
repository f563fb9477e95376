use std::{
    collections::{hash_map::Entry, HashMap, VecDeque},
    fmt::Display,
    future::Future,
    hash::Hash,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};
use uuid::Uuid;

use concord_common::error::{ConcordError, Result};

type Job = BoxFuture<'static, ()>;
type Lanes<K> = HashMap<K, VecDeque<QueueEntry>>;

/// A submitted task waiting in (or running at the head of) a lane.
struct QueueEntry {
    id: Uuid,
    /// `None` once the entry has been started.
    job: Option<Job>,
}

/// Caller side of a submitted task.
pub struct TaskHandle<T, E> {
    id: Uuid,
    key: String,
    rx: oneshot::Receiver<std::result::Result<T, E>>,
}

impl<T, E> TaskHandle<T, E>
where
    E: From<ConcordError>,
{
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Resolves to the task's own outcome.
    pub async fn wait(self) -> std::result::Result<T, E> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ConcordError::TaskAborted { key: self.key }.into()),
        }
    }
}

/// Runs asynchronous tasks one at a time per key, in submission order.
///
/// Tasks on different keys run independently. A key's lane exists only
/// while it has work; the entry at its head is the one in flight.
pub struct KeyedSerialQueue<K> {
    lanes: Arc<Mutex<Lanes<K>>>,
}

impl<K> Clone for KeyedSerialQueue<K> {
    fn clone(&self) -> Self {
        Self { lanes: Arc::clone(&self.lanes) }
    }
}

impl<K> Default for KeyedSerialQueue<K> {
    fn default() -> Self {
        Self {
            lanes: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K> KeyedSerialQueue<K>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Submits `task` under `key` and resolves to its outcome.
    ///
    /// The task starts immediately if the key is idle, otherwise after every
    /// earlier task for the key has finished. A failing task only fails its
    /// own caller. If the task panics the caller gets
    /// `ConcordError::TaskAborted` and the lane moves on.
    pub async fn enqueue<F, T, E>(&self, key: K, task: F) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<ConcordError> + Send + 'static,
    {
        self.submit(key, task).wait().await
    }

    /// Registers `task` under `key` right away and returns a handle to await it.
    ///
    /// Submission order is fixed when this returns, which lets callers spawn
    /// the wait without losing per-key ordering. Must run inside a tokio
    /// runtime.
    pub fn submit<F, T, E>(&self, key: K, task: F) -> TaskHandle<T, E>
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let id = Uuid::new_v4();
        let job: Job = async move {
            let _ = tx.send(task.await);
        }
        .boxed();

        // Append-or-start is decided under the registry lock.
        let start = {
            let mut lanes = self.lanes();
            match lanes.entry(key.clone()) {
                Entry::Occupied(mut lane) => {
                    lane.get_mut().push_back(QueueEntry { id, job: Some(job) });
                    debug!("⏳ Task {} queued on [{}] (depth {})", id, key, lane.get().len());
                    None
                }
                Entry::Vacant(slot) => {
                    slot.insert(VecDeque::from([QueueEntry { id, job: None }]));
                    debug!("▶️ Task {} started on idle key [{}]", id, key);
                    Some(job)
                }
            }
        };

        if let Some(job) = start {
            self.spawn_lane(key.clone(), job);
        }

        TaskHandle {
            id,
            key: key.to_string(),
            rx,
        }
    }

    /// Number of entries (running + waiting) registered for `key`.
    pub fn pending(&self, key: &K) -> usize {
        self.lanes().get(key).map_or(0, VecDeque::len)
    }

    /// Number of keys that currently have a lane.
    pub fn active_keys(&self) -> usize {
        self.lanes().len()
    }

    fn lanes(&self) -> MutexGuard<'_, Lanes<K>> {
        // Critical sections never panic, so a poisoned map is still consistent.
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_lane(&self, key: K, first: Job) {
        let queue = self.clone();
        tokio::spawn(async move {
            let mut next = Some(first);
            while let Some(job) = next.take() {
                if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                    warn!("💥 Task on [{}] panicked; continuing with next entry", key);
                }
                next = match queue.advance(&key) {
                    Ok(job) => job,
                    Err(e) => {
                        error!("❌ Lane driver for [{}] stopped: {}", key, e);
                        None
                    }
                };
            }
        });
    }

    /// Pops the finished head of `key`'s lane and hands back the next job.
    ///
    /// Drops the lane when it runs dry. Advancing a key with no lane, or a
    /// lane whose next entry was already started, means completion
    /// bookkeeping went wrong and is reported as
    /// `ConcordError::QueueConsistency`. In the latter case the lane is
    /// discarded so its waiting callers get `TaskAborted` and the key can
    /// take new work.
    fn advance(&self, key: &K) -> Result<Option<Job>> {
        let mut lanes = self.lanes();
        let Some(lane) = lanes.get_mut(key) else {
            return Err(ConcordError::QueueConsistency { key: key.to_string() });
        };

        if let Some(done) = lane.pop_front() {
            debug!("✔️ Task {} finished on [{}]", done.id, key);
        }

        if lane.is_empty() {
            lanes.remove(key);
            return Ok(None);
        }

        match lane.front_mut().and_then(|entry| entry.job.take()) {
            Some(job) => Ok(Some(job)),
            None => {
                if let Some(stranded) = lanes.remove(key) {
                    warn!("🗑️ Discarding {} stranded entries on [{}]", stranded.len(), key);
                }
                Err(ConcordError::QueueConsistency { key: key.to_string() })
            }
        }
    }
}
