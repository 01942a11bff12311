//! Step Engine: the single source of truth for "what input comes next"
//!
//! [`next_step`] is a pure function of the catalog entry and the record. It
//! never mutates anything, so calling it twice on the same inputs yields the
//! same [`Step`].
//!
//! # Flows
//!
//! - **Paired**: media and answers strictly alternate, media first
//!   (photo 1, answer 1, photo 2, answer 2, ...)
//! - **Questionnaire**: each required kind is filled independently, asked in
//!   the order photo, video, audio, answer
//! - **Book**: a cover photo first, then paired pages

use crate::gate::{is_countable_text, is_ready, valid_units};
use mission_types::{ContentKind, MissionFlow, MissionRecord, MissionRequirements, MissionSpec, Step};
use std::cmp::Ordering;

/// Next expected input for a record
#[must_use]
pub fn next_step(spec: &MissionSpec, record: &MissionRecord) -> Step {
    match spec.flow {
        MissionFlow::Paired => paired_step(&spec.requirements, record),
        MissionFlow::Questionnaire => questionnaire_step(&spec.requirements, record),
        MissionFlow::Book => book_step(&spec.requirements, record),
    }
}

/// Strict media/answer interleave.
///
/// With `P` attachments, `A` non-null answers and requirements `Rp`/`Ra`:
/// equal counts ask for media, one more photo than answers asks for the
/// missing answer, and the mission is ready once both requirements are met.
#[must_use]
pub fn paired_step(reqs: &MissionRequirements, record: &MissionRecord) -> Step {
    let Some(media) = reqs.media_kind() else {
        return questionnaire_step(reqs, record);
    };
    let required_media = reqs.media_required();
    let required_answers = reqs.aside_text;
    let media_count = record.attachment_count();
    let answered = record.answered_count();

    if required_answers == 0 {
        return if media_count >= required_media {
            Step::Ready
        } else {
            Step::awaiting(media, media_count)
        };
    }
    if media_count >= required_media && answered >= required_answers {
        return Step::Ready;
    }

    match media_count.cmp(&answered) {
        Ordering::Greater if answered < required_answers => {
            Step::AwaitAnswer(record.first_unanswered_index().unwrap_or(answered))
        }
        Ordering::Equal | Ordering::Less if media_count < required_media => Step::awaiting(media, media_count),
        _ => Step::Ready,
    }
}

/// Independent per-kind counts, first unsatisfied kind wins
#[must_use]
pub fn questionnaire_step(reqs: &MissionRequirements, record: &MissionRecord) -> Step {
    for kind in reqs.required_kinds() {
        let required = reqs.required(kind);
        if valid_units(record, kind) >= required {
            continue;
        }
        return match kind {
            ContentKind::Answer => Step::AwaitAnswer(answer_slot(record, required)),
            media => Step::awaiting(media, record.slots_of(media).len().min(required - 1)),
        };
    }
    debug_assert!(is_ready(reqs, record));
    Step::Ready
}

/// Cover first, then paired pages
#[must_use]
pub fn book_step(reqs: &MissionRequirements, record: &MissionRecord) -> Step {
    if record.cover.is_none() {
        return Step::AwaitPhoto(0);
    }
    paired_step(reqs, record)
}

/// Slot the next questionnaire answer should fill: the current question if
/// it is still empty, then the first empty slot, then the first skipped one.
fn answer_slot(record: &MissionRecord, required: usize) -> usize {
    let empty = |slot: usize| record.aside_text(slot).is_none();
    let open = |slot: usize| !is_countable_text(record.aside_text(slot));
    record
        .current_question_index
        .filter(|i| *i < required && empty(*i))
        .or_else(|| (0..required).find(|slot| empty(*slot)))
        .or_else(|| (0..required).find(|slot| open(*slot)))
        .unwrap_or(required.saturating_sub(1))
}
