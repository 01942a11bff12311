//! Mission Store - durable per-user tables
//!
//! One table per concern, all keyed by user:
//! - [`SessionStore`]: the current [`MissionRecord`](mission_types::MissionRecord)
//! - [`EntryStore`]: outstanding interactive prompts (at most five)
//! - [`QuizStore`]: questionnaire progress
//!
//! Every read-modify-write runs under a per-user async lock
//! ([`KeyedLocks`]); session writes additionally carry a revision so callers
//! that released the lock can compare-and-swap.
//!
//! # Example
//!
//! ```rust,ignore
//! use mission_store::Stores;
//!
//! # async fn example() -> Result<(), mission_store::StoreError> {
//! let stores = Stores::open("/var/lib/missions").await?;
//! let record = stores.sessions.get(&"U1".into()).await?;
//! # Ok(())
//! # }
//! ```

pub mod entries;
pub mod error;
pub mod locks;
pub mod quiz;
pub mod session;
pub mod table;

pub use entries::EntryStore;
pub use error::StoreError;
pub use locks::KeyedLocks;
pub use quiz::QuizStore;
pub use session::SessionStore;
pub use table::{FileTable, MemoryTable, Table, TableValue};

use std::path::Path;
use std::sync::Arc;

/// All persisted tables
#[derive(Debug, Clone)]
pub struct Stores {
    /// Current mission records
    pub sessions: SessionStore,
    /// Outstanding interactive prompts
    pub entries: EntryStore,
    /// Questionnaire progress
    pub quizzes: QuizStore,
}

impl Stores {
    /// Ephemeral in-memory tables
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sessions: SessionStore::new(Arc::new(MemoryTable::new(SessionStore::TABLE))),
            entries: EntryStore::new(Arc::new(MemoryTable::new(EntryStore::TABLE))),
            quizzes: QuizStore::new(Arc::new(MemoryTable::new(QuizStore::TABLE))),
        }
    }

    /// File-backed tables under `root`
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let sessions = FileTable::open(root, SessionStore::TABLE).await?;
        let entries = FileTable::open(root, EntryStore::TABLE).await?;
        let quizzes = FileTable::open(root, QuizStore::TABLE).await?;
        tracing::info!(root = %root.display(), "opened mission store");

        Ok(Self {
            sessions: SessionStore::new(Arc::new(sessions)),
            entries: EntryStore::new(Arc::new(entries)),
            quizzes: QuizStore::new(Arc::new(quizzes)),
        })
    }

    /// Apply entry-table limits
    #[must_use]
    pub fn with_entry_limits(mut self, capacity: usize, ttl: chrono::Duration) -> Self {
        self.entries = self.entries.with_capacity(capacity).with_ttl(ttl);
        self
    }
}
