//! Media batch ingestion
//!
//! For a kind with requirement `r`, current count `c` and batch size `k`:
//! - `c < r` and `c + k > r`: the whole batch is rejected
//! - `c >= r`: the newest upload replaces the last slot (`r - 1`)
//! - otherwise every upload is appended

use crate::error::IngestError;
use crate::messages;
use mission_types::{ContentKind, MissionRecord, Upload};
use std::ops::Range;
use tracing::debug;

/// What a successful media batch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOutcome {
    /// Uploads appended at these slots
    Appended { slots: Range<usize> },
    /// The newest upload overwrote this slot
    Replaced { slot: usize },
}

/// Apply a batch of uploads of one kind.
///
/// # Errors
/// - `IngestError::Validation` for an empty batch or a kind the mission
///   does not collect
/// - `IngestError::Capacity` when the batch overflows the requirement
pub fn ingest_media(
    kind: ContentKind,
    required: usize,
    record: &mut MissionRecord,
    batch: Vec<Upload>,
) -> Result<MediaOutcome, IngestError> {
    let result = apply_batch(kind, required, record, batch);
    match &result {
        Ok(MediaOutcome::Replaced { slot }) => record.set_message(messages::replaced(kind, *slot)),
        Ok(MediaOutcome::Appended { .. }) => record.message = None,
        Err(err) => record.set_message(err.user_message()),
    }
    refresh_photo_hint(kind, required, record);
    result
}

fn apply_batch(
    kind: ContentKind,
    required: usize,
    record: &mut MissionRecord,
    batch: Vec<Upload>,
) -> Result<MediaOutcome, IngestError> {
    if required == 0 {
        return Err(IngestError::validation(messages::kind_not_needed(kind)));
    }
    let incoming = batch.len();
    if incoming == 0 {
        return Err(IngestError::validation(messages::EMPTY_BATCH));
    }

    let slots = record.slots_of(kind);
    let current = slots.len();

    if current < required && current + incoming > required {
        debug!(%kind, required, current, incoming, "rejecting media batch over capacity");
        return Err(IngestError::Capacity {
            kind,
            required,
            current,
            incoming,
        });
    }

    if current >= required {
        let slot = slots[required - 1];
        let newest = batch.into_iter().last().map(|u| u.with_kind(kind));
        if let Some(upload) = newest {
            record.replace_attachment(slot, upload);
        }
        debug!(%kind, slot, "replaced last media slot");
        return Ok(MediaOutcome::Replaced { slot });
    }

    let start = record.attachment_count();
    for upload in batch {
        record.push_attachment(upload.with_kind(kind));
    }
    Ok(MediaOutcome::Appended {
        slots: start..record.attachment_count(),
    })
}

/// Replace a specific 1-based item chosen by the user.
///
/// # Errors
/// - `IngestError::Invariant` when `target` is outside the existing slots
pub fn apply_replacement(record: &mut MissionRecord, target: usize, upload: Upload) -> Result<usize, IngestError> {
    let count = record.attachment_count();
    let slot = target.checked_sub(1).filter(|slot| *slot < count);
    let Some(slot) = slot else {
        let err = IngestError::invariant(messages::replacement_out_of_range(target, count));
        record.set_message(err.user_message());
        return Err(err);
    };

    let kind = record.attachments[slot].kind;
    record.replace_attachment(slot, upload.with_kind(kind));
    record.set_message(messages::replaced(kind, slot));
    Ok(slot)
}

fn refresh_photo_hint(kind: ContentKind, required: usize, record: &mut MissionRecord) {
    if kind != ContentKind::Photo {
        return;
    }
    let count = record.slots_of(kind).len();
    record.show_next_photo_instruction = count < required;
    record.next_photo_index = (count < required).then_some(count);
}
