use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-thread async locks.
///
/// Entries are created on demand and removed when the last holder releases,
/// so the map only grows with concurrently active thread ids.
#[derive(Debug, Default)]
pub(crate) struct ThreadLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

type Acquire = Pin<Box<dyn Future<Output = OwnedMutexGuard<()>> + Send>>;

impl ThreadLocks {
    pub(crate) async fn acquire(&self, thread_id: &str) -> ThreadLockGuard<'_> {
        let lock = self.locks.entry(thread_id.to_string()).or_default().clone();
        let mut waiting = Waiting {
            locks: self,
            thread_id,
            acquire: None,
        };
        let guard = waiting.acquire.insert(Box::pin(lock.lock_owned())).await;
        waiting.acquire = None;
        ThreadLockGuard {
            locks: self,
            thread_id: thread_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Drop the entry once nothing but the map references it.
    fn release(&self, thread_id: &str) {
        self.locks
            .remove_if(thread_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Pending `acquire`. If the caller is cancelled while queued, dropping this
/// releases its reference to the lock and removes an unused entry.
struct Waiting<'a, 'b> {
    locks: &'a ThreadLocks,
    thread_id: &'b str,
    acquire: Option<Acquire>,
}

impl Drop for Waiting<'_, '_> {
    fn drop(&mut self) {
        if self.acquire.take().is_some() {
            self.locks.release(self.thread_id);
        }
    }
}

pub(crate) struct ThreadLockGuard<'a> {
    locks: &'a ThreadLocks,
    thread_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ThreadLockGuard<'_> {
    fn drop(&mut self) {
        // Release first so a waiter's clone is the only other reference.
        self.guard.take();
        self.locks.release(&self.thread_id);
    }
}
