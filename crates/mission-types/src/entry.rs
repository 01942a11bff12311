//! Outstanding interactive prompts
//!
//! Every interactive prompt the engine sends is recorded so its buttons keep
//! working after a restart. Each user keeps at most
//! [`MAX_ENTRIES_PER_USER`] entries, unique by mission, oldest evicted first.

use crate::ids::{MissionId, PromptRef};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Upper bound of outstanding prompts per user
pub const MAX_ENTRIES_PER_USER: usize = 5;

/// Closed set of prompt kinds that can be reconstructed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Mission introduction with a "start" button
    MissionStart,
    /// "Submit / keep editing" confirmation
    ConfirmSubmission,
    /// Grid of slots to pick one for replacement
    ReplacePicker,
    /// Questionnaire question with answer options
    QuizQuestion,
    /// Cover choice for a themed book
    BookCoverPicker,
}

impl TaskType {
    /// Every task type
    pub const ALL: [TaskType; 5] = [
        TaskType::MissionStart,
        TaskType::ConfirmSubmission,
        TaskType::ReplacePicker,
        TaskType::QuizQuestion,
        TaskType::BookCoverPicker,
    ];
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::MissionStart => "mission_start",
            TaskType::ConfirmSubmission => "confirm_submission",
            TaskType::ReplacePicker => "replace_picker",
            TaskType::QuizQuestion => "quiz_question",
            TaskType::BookCoverPicker => "book_cover_picker",
        };
        f.write_str(name)
    }
}

/// One outstanding prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Transport reference of the sent prompt
    pub prompt_ref: PromptRef,
    /// Reconstructor selector
    pub task_type: TaskType,
    /// Mission the prompt belongs to
    pub mission_id: MissionId,
    /// Task-specific data needed to rebuild the handler
    #[serde(default)]
    pub payload: serde_json::Value,
    /// When the prompt was issued
    pub issued_at: DateTime<Utc>,
}

impl EntryRecord {
    /// Create entry issued now
    #[must_use]
    pub fn new(
        prompt_ref: PromptRef,
        task_type: TaskType,
        mission_id: MissionId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            prompt_ref,
            task_type,
            mission_id,
            payload,
            issued_at: Utc::now(),
        }
    }

    /// Override issue time
    #[inline]
    #[must_use]
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = at;
        self
    }

    /// Whether the prompt outlived its timeout
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.issued_at > ttl
    }
}

/// Bounded, FIFO-ordered entry list for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryList {
    entries: VecDeque<EntryRecord>,
}

impl EntryList {
    /// Create empty list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    ///
    /// An existing entry for the same mission is replaced (moved to the back);
    /// past `capacity` the oldest entries are evicted and returned.
    pub fn push(&mut self, entry: EntryRecord, capacity: usize) -> Vec<EntryRecord> {
        let mut evicted: Vec<EntryRecord> = Vec::new();
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.mission_id == entry.mission_id)
        {
            evicted.extend(self.entries.remove(pos));
        }
        self.entries.push_back(entry);
        while self.entries.len() > capacity.max(1) {
            evicted.extend(self.entries.pop_front());
        }
        evicted
    }

    /// Remove the entry for a prompt
    pub fn remove_prompt(&mut self, prompt_ref: &PromptRef) -> Option<EntryRecord> {
        let pos = self.entries.iter().position(|e| &e.prompt_ref == prompt_ref)?;
        self.entries.remove(pos)
    }

    /// Remove the entry for a mission
    pub fn remove_mission(&mut self, mission_id: MissionId) -> Option<EntryRecord> {
        let pos = self.entries.iter().position(|e| e.mission_id == mission_id)?;
        self.entries.remove(pos)
    }

    /// Drop and return entries older than `ttl`
    pub fn expire(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<EntryRecord> {
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|e| e.is_expired(now, ttl));
        self.entries = kept.into();
        expired
    }

    /// Find entry by prompt
    #[must_use]
    pub fn get(&self, prompt_ref: &PromptRef) -> Option<&EntryRecord> {
        self.entries.iter().find(|e| &e.prompt_ref == prompt_ref)
    }

    /// Iterate oldest first
    pub fn iter(&self) -> impl Iterator<Item = &EntryRecord> {
        self.entries.iter()
    }

    /// Outstanding entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is outstanding
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(prompt: &str, mission: u32) -> EntryRecord {
        EntryRecord::new(
            PromptRef::new(prompt),
            TaskType::MissionStart,
            MissionId(mission),
            serde_json::Value::Null,
        )
    }

    #[test]
    fn push_evicts_oldest_past_capacity() {
        let mut list = EntryList::new();
        for i in 0..6 {
            list.push(entry(&format!("p{i}"), i), MAX_ENTRIES_PER_USER);
        }

        assert_eq!(list.len(), 5);
        let prompts: Vec<_> = list.iter().map(|e| e.prompt_ref.as_str().to_string()).collect();
        assert_eq!(prompts, vec!["p1", "p2", "p3", "p4", "p5"]);
    }

    #[test]
    fn push_replaces_same_mission() {
        let mut list = EntryList::new();
        list.push(entry("old", 1), 5);
        list.push(entry("other", 2), 5);
        let evicted = list.push(entry("new", 1), 5);

        assert_eq!(list.len(), 2);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].prompt_ref.as_str(), "old");
        assert!(list.get(&PromptRef::new("new")).is_some());
        assert_eq!(list.iter().last().unwrap().prompt_ref.as_str(), "new");
    }

    #[test]
    fn expire_drops_old_entries() {
        let now = Utc::now();
        let mut list = EntryList::new();
        list.push(entry("stale", 1).issued_at(now - Duration::hours(30)), 5);
        list.push(entry("fresh", 2).issued_at(now), 5);

        let expired = list.expire(now, Duration::hours(24));

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].prompt_ref.as_str(), "stale");
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_prompt_and_mission() {
        let mut list = EntryList::new();
        list.push(entry("a", 1), 5);
        list.push(entry("b", 2), 5);

        assert!(list.remove_prompt(&PromptRef::new("a")).is_some());
        assert!(list.remove_mission(MissionId(2)).is_some());
        assert!(list.is_empty());
    }
}
