//! Pending request table
//!
//! Requests waiting on the user (access prompts, signature confirmations) are kept
//! in a table keyed by a unique id. Each entry resolves exactly once: with a reply,
//! by timing out, or by being cancelled. At most one request of a given kind can be
//! outstanding, a second one is rejected with [`RequestError::AlreadyPending`].

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio::{
    sync::{oneshot, Mutex},
    time::Instant,
};
use tracing::debug;

use crate::errors::RequestError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

struct Entry<T> {
    kind: String,
    sender: oneshot::Sender<T>,
    deadline: Instant,
}

/// Handle returned to whoever waits for the reply
#[derive(Debug)]
pub struct PendingRequest<T> {
    pub id: u64,
    pub kind: String,
    deadline: Instant,
    receiver: oneshot::Receiver<T>,
}

impl<T> PendingRequest<T> {
    /// Instant after which the request counts as timed out
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Table of requests waiting for a reply
pub struct PendingRequests<T> {
    entries: Mutex<HashMap<u64, Entry<T>>>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl<T> Default for PendingRequests<T> {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }
}

/// Drops entries past their deadline, returning their ids
fn purge_overdue<T>(entries: &mut HashMap<u64, Entry<T>>) -> Vec<u64> {
    let now = Instant::now();
    let overdue: Vec<u64> = entries.iter().filter(|(_, entry)| entry.deadline <= now).map(|(id, _)| *id).collect();
    for id in &overdue {
        if let Some(entry) = entries.remove(id) {
            debug!(id, kind = %entry.kind, "pending request timed out");
        }
    }
    overdue
}

impl<T> PendingRequests<T> {
    /// Table whose requests time out `timeout` after being registered
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), next_id: AtomicU64::new(1), timeout }
    }
}

impl<T: Send> PendingRequests<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request of `kind`
    ///
    /// Requests past their deadline no longer count as outstanding.
    ///
    /// # Errors
    /// [`RequestError::AlreadyPending`] if a request of the same kind is outstanding.
    pub async fn register(&self, kind: impl Into<String>) -> Result<PendingRequest<T>, RequestError> {
        let kind = kind.into();
        let mut entries = self.entries.lock().await;
        purge_overdue(&mut entries);
        if entries.values().any(|entry| entry.kind == kind) {
            return Err(RequestError::AlreadyPending { kind });
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.timeout;
        let (sender, receiver) = oneshot::channel();
        entries.insert(id, Entry { kind: kind.clone(), sender, deadline });
        Ok(PendingRequest { id, kind, deadline, receiver })
    }

    /// Delivers the reply of request `id`
    ///
    /// # Errors
    /// - [`RequestError::UnknownRequest`] if the request was never registered, or
    ///   already resolved, timed out or cancelled
    /// - [`RequestError::TimedOut`] if the reply arrives after the deadline
    /// - [`RequestError::Dropped`] if nobody waits for the reply anymore
    pub async fn resolve(&self, id: u64, reply: T) -> Result<(), RequestError> {
        let entry = self.entries.lock().await.remove(&id).ok_or(RequestError::UnknownRequest(id))?;
        if entry.deadline <= Instant::now() {
            debug!(id, kind = %entry.kind, "reply arrived after the deadline");
            return Err(RequestError::TimedOut(id));
        }
        entry.sender.send(reply).map_err(|_| RequestError::Dropped(id))
    }

    /// Drops request `id` without a reply, its waiter sees [`RequestError::Dropped`]
    pub async fn cancel(&self, id: u64) -> Result<(), RequestError> {
        self.entries.lock().await.remove(&id).map(|_| ()).ok_or(RequestError::UnknownRequest(id))
    }

    /// Waits for the reply to `request` until its deadline
    ///
    /// A timed out request is removed from the table.
    pub async fn wait(&self, request: PendingRequest<T>) -> Result<T, RequestError> {
        let PendingRequest { id, kind, deadline, receiver } = request;
        match tokio::time::timeout_at(deadline, receiver).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(RequestError::Dropped(id)),
            Err(_) => {
                self.entries.lock().await.remove(&id);
                debug!(id, kind = %kind, "pending request timed out");
                Err(RequestError::TimedOut(id))
            }
        }
    }

    /// Removes every request past its deadline, returning their ids
    pub async fn expire_overdue(&self) -> Vec<u64> {
        purge_overdue(&mut *self.entries.lock().await)
    }

    pub async fn is_pending(&self, kind: &str) -> bool {
        self.pending_id(kind).await.is_some()
    }

    /// Id of the outstanding request of `kind`
    pub async fn pending_id(&self, kind: &str) -> Option<u64> {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .iter()
            .find(|(_, entry)| entry.kind == kind && entry.deadline > now)
            .map(|(id, _)| *id)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
