//! Request/response correlation over a line protocol.
//!
//! IRC replies carry no request ids. A [`RequestCorrelator`] hands out one
//! slot per key at a time: a caller registers, sends its request, then
//! waits. Later callers for the same key queue in arrival order until the
//! slot is released, so a reply is never handed to the wrong waiter.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedMutexGuard, oneshot};
use warden_proto::irc_to_lower;

/// Why a wait ended without a reply.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CorrelatorError {
    #[error("no reply within {0:?}")]
    TimedOut(Duration),
    #[error("request abandoned")]
    Abandoned,
}

/// A nickname compared under IRC casemapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NickKey(String);

impl NickKey {
    pub fn new(nick: &str) -> Self {
        Self(irc_to_lower(nick))
    }
}

impl From<&str> for NickKey {
    fn from(nick: &str) -> Self {
        Self::new(nick)
    }
}

struct Inner<K: Eq + Hash, V> {
    slots: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
    waiters: Mutex<HashMap<K, (u64, oneshot::Sender<V>)>>,
    next_id: AtomicU64,
}

/// Per-key FIFO request slots with one-shot reply delivery.
pub struct RequestCorrelator<K: Eq + Hash, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K: Eq + Hash, V> Clone for RequestCorrelator<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Eq + Hash + Clone, V> Default for RequestCorrelator<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, V> RequestCorrelator<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                waiters: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Wait for the slot for `key`, then start listening for its reply.
    ///
    /// Register before sending the request; a reply delivered between the
    /// two would otherwise be lost.
    pub async fn register(&self, key: K) -> Pending<K, V> {
        let slot = {
            let mut slots = self.inner.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let guard = slot.lock_owned().await;

        let (tx, rx) = oneshot::channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.waiters.lock().insert(key.clone(), (id, tx));

        Pending {
            key,
            id,
            rx,
            guard: Some(guard),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Hand `value` to whoever holds the slot for `key`.
    ///
    /// Returns false when nobody is listening.
    pub fn deliver(&self, key: &K, value: V) -> bool {
        let Some((_, tx)) = self.inner.waiters.lock().remove(key) else {
            return false;
        };
        tx.send(value).is_ok()
    }

    pub fn is_waiting(&self, key: &K) -> bool {
        self.inner.waiters.lock().contains_key(key)
    }
}

/// A registered request. Dropping it releases the slot.
pub struct Pending<K: Eq + Hash, V> {
    key: K,
    id: u64,
    rx: oneshot::Receiver<V>,
    guard: Option<OwnedMutexGuard<()>>,
    inner: Arc<Inner<K, V>>,
}

impl<K: Eq + Hash, V> Pending<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Wait up to `timeout` for the reply.
    pub async fn wait(mut self, timeout: Duration) -> Result<V, CorrelatorError> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(CorrelatorError::Abandoned),
            Err(_) => Err(CorrelatorError::TimedOut(timeout)),
        }
    }
}

impl<K: Eq + Hash, V> Drop for Pending<K, V> {
    fn drop(&mut self) {
        {
            let mut waiters = self.inner.waiters.lock();
            if waiters.get(&self.key).is_some_and(|(id, _)| *id == self.id) {
                waiters.remove(&self.key);
            }
        }

        // Queued registrations clone the slot under this lock, so a count of
        // one means nobody else wants it.
        let mut slots = self.inner.slots.lock();
        drop(self.guard.take());
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}
