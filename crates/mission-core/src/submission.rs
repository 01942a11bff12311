//! Submission Orchestrator
//!
//! Works on a snapshot taken under the user's lock; the lock is released
//! before any backend call. The record is cleared afterwards only if nobody
//! wrote to it in the meantime (`delete_if_revision`).
//!
//! Books are written item by item (cover first, then pages) with no
//! rollback: items that succeeded stay committed, the committed count is
//! persisted in `book_progress`, and a resubmission starts at the first item
//! that has not been written.

use crate::collaborators::{Backend, ContentUpdate, GenerationStatus, GenerationTarget};
use crate::error::{BackendError, MissionError, MissionResult};
use mission_engine::is_countable_text;
use mission_store::SessionStore;
use mission_types::{BookId, MissionFlow, MissionRecord, MissionSpec, UserId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Aside texts joined with `|` as the backend expects; skipped answers are
/// sent as empty strings.
#[must_use]
pub fn joined_aside_text(record: &MissionRecord) -> String {
    record
        .aside_texts
        .iter()
        .flatten()
        .map(|text| if is_countable_text(Some(text.as_str())) { text.as_str() } else { "" })
        .collect::<Vec<_>>()
        .join("|")
}

/// The single write of a non-book mission
#[must_use]
pub fn single_update(record: &MissionRecord) -> ContentUpdate {
    let mut update = ContentUpdate::new(record.user_id.clone(), record.mission_id);
    if !record.attachments.is_empty() {
        update.attachments = Some(record.attachments.clone());
    }
    if record.has_any_aside_text() {
        update.aside_text = Some(joined_aside_text(record));
    }
    update.content = record.content.clone();
    update
}

/// Ordered book writes: cover at item 0, then one item per page
#[must_use]
pub fn book_items(record: &MissionRecord) -> Vec<ContentUpdate> {
    let cover = record.cover.iter().map(|cover| {
        let mut update = ContentUpdate::new(record.user_id.clone(), record.mission_id);
        update.item = Some(0);
        update.attachments = Some(vec![cover.clone()]);
        update.content = record.baby_name.clone();
        update
    });

    let pages = record.attachments.iter().enumerate().map(|(slot, page)| {
        let mut update = ContentUpdate::new(record.user_id.clone(), record.mission_id);
        update.item = Some(book_item_of_slot(slot));
        update.attachments = Some(vec![page.clone()]);
        update.aside_text = record
            .aside_text(slot)
            .filter(|text| is_countable_text(Some(*text)))
            .map(str::to_string);
        update
    });

    cover.chain(pages).collect()
}

/// Book item a page slot is written as
#[inline]
#[must_use]
pub fn book_item_of_slot(slot: usize) -> usize {
    slot + 1
}

/// Forget committed progress from `item` on, so edited items are re-sent
pub fn rewind_book_progress(record: &mut MissionRecord, item: usize) {
    record.book_progress = record.book_progress.min(item);
}

/// Backend writes for completed missions
#[derive(Clone)]
pub struct Submitter {
    sessions: SessionStore,
    backend: Arc<dyn Backend>,
    timeout: Duration,
}

impl std::fmt::Debug for Submitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submitter").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

impl Submitter {
    /// Submitter bounding every backend call by `timeout`
    #[must_use]
    pub fn new(sessions: SessionStore, backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        Self {
            sessions,
            backend,
            timeout,
        }
    }

    /// Submit a snapshot and clear the session on success.
    ///
    /// # Errors
    /// - `MissionError::Backend` for a failed single write or generation call
    /// - `MissionError::PartialSubmission` when a book item fails
    /// - `MissionError::ChangedDuringSubmission` when the record changed
    ///   underneath; it is kept and can be submitted again
    pub async fn submit(&self, spec: &MissionSpec, snapshot: &MissionRecord) -> MissionResult<()> {
        let user = &snapshot.user_id;
        let expected = match spec.flow {
            MissionFlow::Book => self.submit_book(snapshot).await?,
            MissionFlow::Paired | MissionFlow::Questionnaire => {
                self.write(&single_update(snapshot)).await.map_err(|err| {
                    error!(user = %user, mission = %spec.id, error = %err, "content write failed");
                    MissionError::Backend(err)
                })?;
                self.generate(user, GenerationTarget::Mission(spec.id)).await?;
                snapshot.revision
            }
        };

        self.sessions
            .delete_if_revision(user, expected)
            .await
            .map_err(|err| {
                if err.is_conflict() {
                    MissionError::ChangedDuringSubmission(user.clone())
                } else {
                    err.into()
                }
            })?;
        info!(user = %user, mission = %spec.id, "mission submitted");
        Ok(())
    }

    /// Write remaining book items, returning the record revision to clear.
    ///
    /// Progress only advances while the stored record is the one being
    /// written; after a concurrent edit the rewound progress is left alone and
    /// no generation is requested.
    async fn submit_book(&self, snapshot: &MissionRecord) -> MissionResult<u64> {
        let user = &snapshot.user_id;
        let mission = snapshot.mission_id;
        let items = book_items(snapshot);
        let total = items.len();
        let mut expected = snapshot.revision;

        for (item, update) in items.iter().enumerate().skip(snapshot.book_progress) {
            if let Err(source) = self.write(update).await {
                error!(user = %user, mission = %mission, item, total, error = %source, "book item failed");
                return Err(MissionError::PartialSubmission { item, total, source });
            }

            let (untouched, revision) = self
                .sessions
                .update_tracked(user, |slot| match slot {
                    Some(record) if record.mission_id == mission && record.revision == expected => {
                        record.book_progress = record.book_progress.max(item + 1);
                        true
                    }
                    _ => false,
                })
                .await?;
            match revision {
                Some(revision) if untouched => expected = revision,
                _ => {
                    info!(user = %user, mission = %mission, item, "book edited during submission");
                    return Err(MissionError::ChangedDuringSubmission(user.clone()));
                }
            }
        }

        self.generate(user, GenerationTarget::Book(BookId::from(mission))).await?;
        info!(user = %user, mission = %mission, items = total, "book items committed");
        Ok(expected)
    }

    async fn write(&self, update: &ContentUpdate) -> Result<(), BackendError> {
        if self.bounded(self.backend.update_content(update)).await? {
            Ok(())
        } else {
            Err(BackendError::Rejected {
                operation: match update.item {
                    Some(item) => format!("content item {item}"),
                    None => "content".to_string(),
                },
            })
        }
    }

    async fn generate(&self, user: &UserId, target: GenerationTarget) -> MissionResult<()> {
        match self.bounded(self.backend.submit_generation(user, target)).await {
            Ok(GenerationStatus::Accepted) => Ok(()),
            Ok(GenerationStatus::Failed) => Err(BackendError::Rejected {
                operation: "generation".to_string(),
            }
            .into()),
            Err(err) => {
                error!(user = %user, ?target, error = %err, "generation request failed");
                Err(err.into())
            }
        }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T, BackendError>>) -> Result<T, BackendError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| BackendError::Timeout {
                secs: self.timeout.as_secs(),
            })?
    }
}
