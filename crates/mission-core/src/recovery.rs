//! Entry Recovery Registry
//!
//! Interactive prompts outlive the process: every prompt the service sends is
//! persisted as an [`EntryRecord`] and mirrored as a [`LiveHandler`] in a TTL
//! cache. After a restart, [`PromptRegistry::recover`] rebuilds the handlers
//! from the persisted entries. Each [`TaskType`] has exactly one
//! reconstructor, selected by an exhaustive match, so adding a task type
//! without a reconstructor does not compile.

use crate::collaborators::Transport;
use crate::error::{MissionResult, RecoveryError};
use crate::messages;
use chrono::Utc;
use mission_store::EntryStore;
use mission_types::{EntryRecord, MissionId, PromptRef, TaskType, Upload, UserId};
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Payload of a mission introduction prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPayload {
    /// Mission name shown in the prompt
    #[serde(default)]
    pub name: String,
}

/// Payload of a confirmation prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPayload {
    /// Attachments shown in the summary
    #[serde(default)]
    pub attachments: usize,
}

/// Payload of a replacement picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacePayload {
    /// Number of selectable slots (1..=slots)
    pub slots: usize,
}

/// Payload of a questionnaire question with fixed options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizPayload {
    /// Zero-based question index
    pub question: usize,
    /// Question shown to the user
    #[serde(default)]
    pub text: String,
    /// Option ids, which double as answers
    pub options: Vec<String>,
    /// Option counted as correct, if the question is scored
    #[serde(default)]
    pub correct: Option<String>,
}

/// Payload of a book cover picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverPayload {
    /// Candidate covers, indexed by action id
    pub options: Vec<Upload>,
}

/// Handler bound to a live prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveHandler {
    /// Starts the mission
    MissionStart { mission_id: MissionId, payload: StartPayload },
    /// Submits or keeps editing
    ConfirmSubmission { mission_id: MissionId, payload: ConfirmPayload },
    /// Arms a replacement of the chosen item
    ReplacePicker { mission_id: MissionId, payload: ReplacePayload },
    /// Records a questionnaire answer
    QuizQuestion { mission_id: MissionId, payload: QuizPayload },
    /// Sets the book cover
    BookCoverPicker { mission_id: MissionId, payload: CoverPayload },
}

impl LiveHandler {
    /// Rebuild the handler of a persisted entry
    pub fn reconstruct(entry: &EntryRecord) -> Result<Self, RecoveryError> {
        let mission_id = entry.mission_id;
        Ok(match entry.task_type {
            TaskType::MissionStart => Self::MissionStart {
                mission_id,
                payload: decode(entry)?,
            },
            TaskType::ConfirmSubmission => Self::ConfirmSubmission {
                mission_id,
                payload: decode(entry)?,
            },
            TaskType::ReplacePicker => Self::ReplacePicker {
                mission_id,
                payload: decode(entry)?,
            },
            TaskType::QuizQuestion => Self::QuizQuestion {
                mission_id,
                payload: decode(entry)?,
            },
            TaskType::BookCoverPicker => Self::BookCoverPicker {
                mission_id,
                payload: decode(entry)?,
            },
        })
    }

    /// Persisted task type
    #[must_use]
    pub fn task_type(&self) -> TaskType {
        match self {
            Self::MissionStart { .. } => TaskType::MissionStart,
            Self::ConfirmSubmission { .. } => TaskType::ConfirmSubmission,
            Self::ReplacePicker { .. } => TaskType::ReplacePicker,
            Self::QuizQuestion { .. } => TaskType::QuizQuestion,
            Self::BookCoverPicker { .. } => TaskType::BookCoverPicker,
        }
    }

    /// Mission the prompt belongs to
    #[must_use]
    pub fn mission_id(&self) -> MissionId {
        match self {
            Self::MissionStart { mission_id, .. }
            | Self::ConfirmSubmission { mission_id, .. }
            | Self::ReplacePicker { mission_id, .. }
            | Self::QuizQuestion { mission_id, .. }
            | Self::BookCoverPicker { mission_id, .. } => *mission_id,
        }
    }

    /// Payload as persisted in the entry table
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        let encoded = match self {
            Self::MissionStart { payload, .. } => serde_json::to_value(payload),
            Self::ConfirmSubmission { payload, .. } => serde_json::to_value(payload),
            Self::ReplacePicker { payload, .. } => serde_json::to_value(payload),
            Self::QuizQuestion { payload, .. } => serde_json::to_value(payload),
            Self::BookCoverPicker { payload, .. } => serde_json::to_value(payload),
        };
        // Plain structs of strings and integers always encode
        encoded.unwrap_or(serde_json::Value::Null)
    }

    /// Entry persisted for this handler
    #[must_use]
    pub fn to_entry(&self, prompt_ref: PromptRef) -> EntryRecord {
        EntryRecord::new(prompt_ref, self.task_type(), self.mission_id(), self.payload())
    }
}

fn decode<T: DeserializeOwned>(entry: &EntryRecord) -> Result<T, RecoveryError> {
    serde_json::from_value(entry.payload.clone()).map_err(|source| RecoveryError::InvalidPayload {
        task_type: entry.task_type,
        source,
    })
}

/// A live handler together with the user it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// User the prompt was sent to
    pub user_id: UserId,
    /// What an action on the prompt does
    pub handler: LiveHandler,
}

/// Outcome of startup recovery
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Handlers rebuilt and bound
    pub restored: usize,
    /// Entries dropped because they could not be rebuilt
    pub dropped: usize,
    /// Entries past the prompt TTL
    pub expired: usize,
}

/// Persisted entries plus their live handlers
#[derive(Clone)]
pub struct PromptRegistry {
    entries: EntryStore,
    live: Cache<PromptRef, Arc<Binding>>,
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry")
            .field("live", &self.live.entry_count())
            .finish_non_exhaustive()
    }
}

impl PromptRegistry {
    /// Default bound on live handlers
    pub const DEFAULT_CAPACITY: u64 = 100_000;

    /// Create registry whose live handlers expire with the entry TTL
    #[must_use]
    pub fn new(entries: EntryStore) -> Self {
        let ttl = entries.ttl().to_std().unwrap_or(Duration::from_secs(86_400));
        Self {
            live: Cache::builder()
                .max_capacity(Self::DEFAULT_CAPACITY)
                .time_to_live(ttl)
                .build(),
            entries,
        }
    }

    /// Underlying entry table
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    /// Record a prompt that was just sent.
    ///
    /// Returns the entries it displaced: the same mission's earlier prompt,
    /// expired prompts and the oldest prompt beyond the per-user limit.
    pub async fn issue(
        &self,
        user: &UserId,
        prompt_ref: PromptRef,
        handler: LiveHandler,
    ) -> MissionResult<Vec<EntryRecord>> {
        let entry = handler.to_entry(prompt_ref.clone());
        let displaced = self.entries.issue(user, entry).await?;
        for old in &displaced {
            debug!(user = %user, prompt = %old.prompt_ref, task = %old.task_type, "prompt displaced");
            self.live.invalidate(&old.prompt_ref).await;
        }
        self.live
            .insert(
                prompt_ref,
                Arc::new(Binding {
                    user_id: user.clone(),
                    handler,
                }),
            )
            .await;
        Ok(displaced)
    }

    /// Live handler for a prompt, if it has not expired
    pub async fn lookup(&self, prompt_ref: &PromptRef) -> Option<Arc<Binding>> {
        self.live.get(prompt_ref).await
    }

    /// Prompt has been acted upon; returns its entry if it was still
    /// outstanding
    pub async fn resolve(&self, user: &UserId, prompt_ref: &PromptRef) -> MissionResult<Option<EntryRecord>> {
        let entry = self.entries.resolve(user, prompt_ref).await?;
        self.live.invalidate(prompt_ref).await;
        Ok(entry)
    }

    /// Drop the prompt a mission still has outstanding
    pub async fn forget_mission(&self, user: &UserId, mission_id: MissionId) -> MissionResult<Option<EntryRecord>> {
        let entry = self.entries.remove_mission(user, mission_id).await?;
        if let Some(entry) = &entry {
            self.live.invalidate(&entry.prompt_ref).await;
        }
        Ok(entry)
    }

    /// Rebuild live handlers from persisted entries.
    ///
    /// Unresolvable or undecodable entries are dropped with a warning; a
    /// single bad entry never fails recovery as a whole. Prompts that still
    /// exist but are expired or undecodable are edited to say so.
    pub async fn recover(&self, transport: &dyn Transport) -> MissionResult<RecoveryReport> {
        let mut report = RecoveryReport::default();
        let now = Utc::now();

        for (user, mut list) in self.entries.all().await? {
            let expired = list.expire(now, self.entries.ttl());
            report.expired += expired.len();
            for entry in &expired {
                close_prompt(transport, &entry.prompt_ref).await;
            }

            let mut kept = mission_types::EntryList::new();
            for entry in list.iter() {
                match restore(transport, entry).await {
                    Ok(handler) => {
                        self.live
                            .insert(
                                entry.prompt_ref.clone(),
                                Arc::new(Binding {
                                    user_id: user.clone(),
                                    handler,
                                }),
                            )
                            .await;
                        kept.push(entry.clone(), usize::MAX);
                        report.restored += 1;
                    }
                    Err(err) => {
                        warn!(user = %user, prompt = %entry.prompt_ref, task = %entry.task_type, error = %err, "dropping unrecoverable prompt");
                        if matches!(err, RecoveryError::InvalidPayload { .. }) {
                            close_prompt(transport, &entry.prompt_ref).await;
                        }
                        report.dropped += 1;
                    }
                }
            }
            self.entries.replace(&user, kept).await?;
        }

        info!(
            restored = report.restored,
            dropped = report.dropped,
            expired = report.expired,
            "prompt recovery complete"
        );
        Ok(report)
    }
}

/// Mark a prompt that no longer has a handler; failures are only logged
pub(crate) async fn close_prompt(transport: &dyn Transport, prompt_ref: &PromptRef) {
    if let Err(err) = transport.edit(prompt_ref, messages::PROMPT_CLOSED).await {
        warn!(prompt = %prompt_ref, error = %err, "prompt edit failed");
    }
}

async fn restore(transport: &dyn Transport, entry: &EntryRecord) -> Result<LiveHandler, RecoveryError> {
    if !transport.prompt_exists(&entry.prompt_ref).await? {
        return Err(RecoveryError::Unresolvable(entry.prompt_ref.clone()));
    }
    LiveHandler::reconstruct(entry)
}
