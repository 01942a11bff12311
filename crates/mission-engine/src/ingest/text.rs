//! Text answer ingestion under the mission's category policy

use crate::error::IngestError;
use crate::gate::{SKIP_KEYWORD, SKIP_PLACEHOLDER};
use crate::messages;
use crate::normalize::{normalize_general, visual_lines};
use mission_types::{MissionCategory, MissionRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Limits applied to text answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPolicy {
    /// Maximum characters in a letter
    pub letter_max_chars: usize,
    /// Maximum rendered lines of a general answer
    pub general_max_lines: usize,
    /// Columns per rendered line
    pub line_width: usize,
}

impl Default for TextPolicy {
    fn default() -> Self {
        Self {
            letter_max_chars: 400,
            general_max_lines: 2,
            line_width: 36,
        }
    }
}

/// Where an accepted answer went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOutcome {
    /// Zero-based answer slot
    pub slot: usize,
    /// Text as stored
    pub stored: String,
    /// Whether an existing answer was overwritten
    pub replaced: bool,
}

/// Validate and store a text answer.
///
/// # Errors
/// - `IngestError::Validation` when the mission takes no text, the text is
///   blank, or it breaks the category's limits
pub fn ingest_text(
    category: MissionCategory,
    policy: &TextPolicy,
    required: usize,
    record: &mut MissionRecord,
    raw: &str,
) -> Result<TextOutcome, IngestError> {
    let result = accept(category, policy, required, raw).map(|stored| {
        let (slot, replaced) = target_slot(record, required);
        record.set_aside_text(slot, stored.clone());
        TextOutcome { slot, stored, replaced }
    });

    match &result {
        Ok(outcome) => {
            debug!(slot = outcome.slot, replaced = outcome.replaced, %category, "stored answer");
            record.message = None;
        }
        Err(err) => record.set_message(err.user_message()),
    }
    result
}

fn accept(category: MissionCategory, policy: &TextPolicy, required: usize, raw: &str) -> Result<String, IngestError> {
    if required == 0 {
        return Err(IngestError::validation(messages::TEXT_NOT_NEEDED));
    }
    if raw.trim().is_empty() {
        return Err(IngestError::validation(messages::EMPTY_TEXT));
    }
    if raw.trim().eq_ignore_ascii_case(SKIP_KEYWORD) {
        return Ok(SKIP_PLACEHOLDER.to_string());
    }

    match category {
        MissionCategory::Letter => {
            let chars = raw.chars().count();
            if chars > policy.letter_max_chars {
                return Err(IngestError::validation(messages::letter_too_long(
                    policy.letter_max_chars,
                    chars,
                )));
            }
            Ok(raw.to_string())
        }
        MissionCategory::RelationOrIdentity => Ok(raw.to_string()),
        MissionCategory::General => {
            let normalized = normalize_general(raw);
            if normalized.is_empty() {
                return Err(IngestError::validation(messages::EMPTY_TEXT));
            }
            if visual_lines(&normalized, policy.line_width) > policy.general_max_lines {
                return Err(IngestError::validation(messages::too_many_lines(policy.general_max_lines)));
            }
            Ok(normalized)
        }
    }
}

/// The current question while it is in range, otherwise the first empty
/// slot, otherwise the last slot (a replacement).
fn target_slot(record: &MissionRecord, required: usize) -> (usize, bool) {
    let slot = record
        .current_question_index
        .filter(|i| *i < required)
        .or_else(|| (0..required).find(|slot| record.aside_text(*slot).is_none()))
        .unwrap_or(required - 1);
    (slot, record.aside_text(slot).is_some())
}
