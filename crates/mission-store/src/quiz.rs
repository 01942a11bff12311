//! Quiz-progress table

use crate::error::StoreError;
use crate::locks::KeyedLocks;
use crate::table::Table;
use mission_types::{MissionId, QuizProgress, UserId};
use std::sync::Arc;

/// Durable map `user_id -> QuizProgress`
#[derive(Debug, Clone)]
pub struct QuizStore {
    table: Arc<dyn Table<QuizProgress>>,
    locks: Arc<KeyedLocks>,
}

impl QuizStore {
    /// Table name on disk
    pub const TABLE: &'static str = "quiz_progress";

    /// Store over `table`
    #[must_use]
    pub fn new(table: Arc<dyn Table<QuizProgress>>) -> Self {
        Self {
            table,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Progress for a user
    pub async fn get(&self, user: &UserId) -> Result<Option<QuizProgress>, StoreError> {
        self.table.get(user).await
    }

    /// Record an answer; progress for a different mission is reset first
    pub async fn record_answer(
        &self,
        user: &UserId,
        mission_id: MissionId,
        question: usize,
        answer: &str,
        is_correct: bool,
    ) -> Result<QuizProgress, StoreError> {
        let _guard = self.locks.lock(user).await;
        let mut progress = match self.table.get(user).await? {
            Some(p) if p.mission_id == mission_id => p,
            _ => QuizProgress::new(mission_id),
        };
        progress.record_answer(question, answer, is_correct);
        self.table.put(user, progress.clone()).await?;
        Ok(progress)
    }

    /// Forget a user's progress
    pub async fn clear(&self, user: &UserId) -> Result<bool, StoreError> {
        let _guard = self.locks.lock(user).await;
        self.table.delete(user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MemoryTable;

    #[tokio::test]
    async fn switching_mission_resets_progress() {
        let store = QuizStore::new(Arc::new(MemoryTable::new(QuizStore::TABLE)));
        let user = UserId::new("U1");

        store.record_answer(&user, MissionId(1), 0, "A", true).await.unwrap();
        let progress = store.record_answer(&user, MissionId(2), 0, "B", false).await.unwrap();

        assert_eq!(progress.mission_id, MissionId(2));
        assert_eq!(progress.correct, 0);
        assert_eq!(progress.answered(), 1);
    }
}
