//! Session Store: `user_id -> MissionRecord`
//!
//! At most one record per user. `put` replaces wholesale; every persisted
//! write bumps the record's `revision`, which callers use for optimistic
//! compare-and-swap when they had to release the user's lock in between
//! (for example around a backend call).

use crate::error::StoreError;
use crate::locks::KeyedLocks;
use crate::table::Table;
use mission_types::{MissionRecord, UserId};
use std::sync::Arc;

/// Durable map of current mission records
#[derive(Debug, Clone)]
pub struct SessionStore {
    table: Arc<dyn Table<MissionRecord>>,
    locks: Arc<KeyedLocks>,
}

impl SessionStore {
    /// Table name on disk
    pub const TABLE: &'static str = "sessions";

    /// Wrap a table
    #[must_use]
    pub fn new(table: Arc<dyn Table<MissionRecord>>) -> Self {
        Self {
            table,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Current record for a user
    pub async fn get(&self, user: &UserId) -> Result<Option<MissionRecord>, StoreError> {
        self.table.get(user).await
    }

    /// Replace the user's record, returning the stored revision
    pub async fn put(&self, user: &UserId, record: MissionRecord) -> Result<u64, StoreError> {
        let _guard = self.locks.lock(user).await;
        self.write(user, record).await
    }

    /// Remove the user's record
    pub async fn delete(&self, user: &UserId) -> Result<bool, StoreError> {
        let _guard = self.locks.lock(user).await;
        self.table.delete(user).await
    }

    /// Replace the record only if the stored revision still matches.
    ///
    /// # Errors
    /// - `StoreError::Conflict` if another write happened since `expected`
    pub async fn put_if_revision(
        &self,
        user: &UserId,
        record: MissionRecord,
        expected: u64,
    ) -> Result<u64, StoreError> {
        let _guard = self.locks.lock(user).await;
        self.check_revision(user, expected).await?;
        self.write(user, record).await
    }

    /// Remove the record only if the stored revision still matches
    ///
    /// # Errors
    /// - `StoreError::Conflict` if another write happened since `expected`
    pub async fn delete_if_revision(&self, user: &UserId, expected: u64) -> Result<(), StoreError> {
        let _guard = self.locks.lock(user).await;
        self.check_revision(user, expected).await?;
        self.table.delete(user).await?;
        Ok(())
    }

    /// Atomic read-modify-write of one user's record.
    ///
    /// The closure sees the current record (or `None`) and may replace, edit
    /// or clear it. A changed `Some` is persisted with a bumped revision, a
    /// `Some -> None` change deletes. The closure must not block.
    pub async fn update<R, F>(&self, user: &UserId, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Option<MissionRecord>) -> R + Send,
        R: Send,
    {
        self.update_tracked(user, f).await.map(|(result, _)| result)
    }

    /// [`update`](Self::update), also returning the stored revision afterwards
    /// (`None` when no record remains).
    pub async fn update_tracked<R, F>(&self, user: &UserId, f: F) -> Result<(R, Option<u64>), StoreError>
    where
        F: FnOnce(&mut Option<MissionRecord>) -> R + Send,
        R: Send,
    {
        let _guard = self.locks.lock(user).await;
        let before = self.table.get(user).await?;
        let mut slot = before.clone();
        let result = f(&mut slot);

        let revision = match (before, slot) {
            (Some(_), None) => {
                self.table.delete(user).await?;
                None
            }
            (before, Some(after)) if before.as_ref() != Some(&after) => Some(self.write(user, after).await?),
            (before, _) => before.map(|r| r.revision),
        };
        Ok((result, revision))
    }

    /// Users with a stored record
    pub async fn users(&self) -> Result<Vec<UserId>, StoreError> {
        self.table.keys().await
    }

    async fn check_revision(&self, user: &UserId, expected: u64) -> Result<(), StoreError> {
        let actual = self.table.get(user).await?.map(|r| r.revision);
        if actual == Some(expected) {
            Ok(())
        } else {
            Err(StoreError::Conflict {
                user: user.clone(),
                expected,
                actual,
            })
        }
    }

    /// Persist with a revision one past whatever is stored
    async fn write(&self, user: &UserId, mut record: MissionRecord) -> Result<u64, StoreError> {
        let stored = self.table.get(user).await?.map_or(0, |r| r.revision);
        record.revision = stored.max(record.revision) + 1;
        record.touch();
        let revision = record.revision;
        self.table.put(user, record).await?;
        Ok(revision)
    }
}
