//! Per-user serialization
//!
//! [`KeyedLocks`] hands out one async mutex per user. Holding the guard is
//! what makes a read-modify-write on that user's rows atomic; different users
//! never contend. The mutex can carry state (`T`) that lives exactly as long
//! as the user's serialization domain.

use dashmap::DashMap;
use mission_types::UserId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per user
#[derive(Debug)]
pub struct KeyedLocks<T = ()> {
    inner: DashMap<UserId, Arc<Mutex<T>>>,
}

impl<T: Default + Send + 'static> KeyedLocks<T> {
    /// Create empty lock table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Acquire the user's lock, creating it on first use
    pub async fn lock(&self, user: &UserId) -> OwnedMutexGuard<T> {
        // Clone the Arc out before awaiting so the DashMap shard is not held
        let mutex = self
            .inner
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(T::default())))
            .clone();
        mutex.lock_owned().await
    }

    /// Number of users with a lock slot
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no key holds a lock slot
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T: Default + Send + 'static> Default for KeyedLocks<T> {
    fn default() -> Self {
        Self::new()
    }
}
