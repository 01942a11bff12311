//! Entry table: outstanding interactive prompts per user
//!
//! Bounded (default [`MAX_ENTRIES_PER_USER`]), unique by mission, FIFO
//! eviction. Entries older than the prompt TTL are dropped whenever a user's
//! list is touched.

use crate::error::StoreError;
use crate::locks::KeyedLocks;
use crate::table::Table;
use chrono::{Duration, Utc};
use mission_types::{EntryList, EntryRecord, MissionId, PromptRef, UserId, MAX_ENTRIES_PER_USER};
use std::sync::Arc;

/// Durable map `user_id -> EntryList`
#[derive(Debug, Clone)]
pub struct EntryStore {
    table: Arc<dyn Table<EntryList>>,
    locks: Arc<KeyedLocks>,
    capacity: usize,
    ttl: Duration,
}

impl EntryStore {
    /// Table name on disk
    pub const TABLE: &'static str = "entries";

    /// Wrap a table with default capacity and a one-day TTL
    #[must_use]
    pub fn new(table: Arc<dyn Table<EntryList>>) -> Self {
        Self {
            table,
            locks: Arc::new(KeyedLocks::new()),
            capacity: MAX_ENTRIES_PER_USER,
            ttl: Duration::days(1),
        }
    }

    /// With per-user capacity
    #[inline]
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// With prompt time-to-live
    #[inline]
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Prompt time-to-live
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record an issued prompt, returning entries it displaced
    /// (same-mission replacement, FIFO eviction or expiry).
    pub async fn issue(&self, user: &UserId, entry: EntryRecord) -> Result<Vec<EntryRecord>, StoreError> {
        let _guard = self.locks.lock(user).await;
        let mut list = self.table.get(user).await?.unwrap_or_default();
        let mut displaced = list.expire(Utc::now(), self.ttl);
        displaced.extend(list.push(entry, self.capacity));
        self.table.put(user, list).await?;
        Ok(displaced)
    }

    /// Remove the entry of a resolved prompt
    pub async fn resolve(&self, user: &UserId, prompt_ref: &PromptRef) -> Result<Option<EntryRecord>, StoreError> {
        self.modify(user, |list| list.remove_prompt(prompt_ref)).await
    }

    /// Remove the entry belonging to a mission
    pub async fn remove_mission(&self, user: &UserId, mission_id: MissionId) -> Result<Option<EntryRecord>, StoreError> {
        self.modify(user, |list| list.remove_mission(mission_id)).await
    }

    /// Current entries for a user, oldest first
    pub async fn list(&self, user: &UserId) -> Result<EntryList, StoreError> {
        Ok(self.table.get(user).await?.unwrap_or_default())
    }

    /// Look up one entry
    pub async fn find(&self, user: &UserId, prompt_ref: &PromptRef) -> Result<Option<EntryRecord>, StoreError> {
        Ok(self.list(user).await?.get(prompt_ref).cloned())
    }

    /// Replace a user's list wholesale (empty lists are deleted)
    pub async fn replace(&self, user: &UserId, list: EntryList) -> Result<(), StoreError> {
        let _guard = self.locks.lock(user).await;
        if list.is_empty() {
            self.table.delete(user).await?;
        } else {
            self.table.put(user, list).await?;
        }
        Ok(())
    }

    /// Every user's list
    pub async fn all(&self) -> Result<Vec<(UserId, EntryList)>, StoreError> {
        let mut out = Vec::new();
        for user in self.table.keys().await? {
            if let Some(list) = self.table.get(&user).await? {
                out.push((user, list));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    async fn modify<R>(
        &self,
        user: &UserId,
        f: impl FnOnce(&mut EntryList) -> Option<R> + Send,
    ) -> Result<Option<R>, StoreError>
    where
        R: Send,
    {
        let _guard = self.locks.lock(user).await;
        let Some(mut list) = self.table.get(user).await? else {
            return Ok(None);
        };
        let removed = f(&mut list);
        if removed.is_some() {
            if list.is_empty() {
                self.table.delete(user).await?;
            } else {
                self.table.put(user, list).await?;
            }
        }
        Ok(removed)
    }
}
