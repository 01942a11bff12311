//! Readiness gate and session-phase transitions
//!
//! A unit of content only counts toward readiness when it is usable: media
//! must resolve to retrievable storage, text must be non-blank and not an
//! explicit skip.

use crate::error::TransitionError;
use crate::step::next_step;
use mission_types::{ContentKind, MissionCategory, MissionRecord, MissionRequirements, MissionSpec, SessionPhase, Step};

/// Keyword a user sends to skip an answer
pub const SKIP_KEYWORD: &str = "skip";

/// Stored in place of a skipped answer
pub const SKIP_PLACEHOLDER: &str = "（略過）";

/// Whether a text slot counts toward readiness
#[must_use]
pub fn is_countable_text(text: Option<&str>) -> bool {
    match text.map(str::trim) {
        None | Some("") => false,
        Some(t) => !t.eq_ignore_ascii_case(SKIP_KEYWORD) && t != SKIP_PLACEHOLDER,
    }
}

/// Valid units of one kind held by the record
#[must_use]
pub fn valid_units(record: &MissionRecord, kind: ContentKind) -> usize {
    match kind {
        ContentKind::Answer => record
            .aside_texts
            .iter()
            .filter(|t| is_countable_text(t.as_deref()))
            .count(),
        media => record
            .attachments
            .iter()
            .filter(|a| a.kind == media && a.is_resolvable())
            .count(),
    }
}

/// True iff every required kind has at least its required count of valid
/// units. A mission that requires nothing is trivially ready.
#[must_use]
pub fn is_ready(requirements: &MissionRequirements, record: &MissionRecord) -> bool {
    requirements
        .required_kinds()
        .all(|kind| valid_units(record, kind) >= requirements.required(kind))
}

/// Whether completed content needs an explicit user confirmation
#[must_use]
pub fn should_confirm(category: MissionCategory, record: &MissionRecord) -> bool {
    match category {
        MissionCategory::RelationOrIdentity => false,
        MissionCategory::Letter => true,
        MissionCategory::General => record.has_any_aside_text(),
    }
}

/// Step with the confirmation gate applied: content-complete missions that
/// need confirmation wait in [`Step::AwaitConfirmation`] until submitted.
#[must_use]
pub fn resolve_step(spec: &MissionSpec, record: &MissionRecord) -> Step {
    let step = next_step(spec, record);
    if step.is_ready() && record.phase != SessionPhase::Submitted && should_confirm(spec.category, record) {
        Step::AwaitConfirmation
    } else {
        step
    }
}

/// Phase the record should be in given its content
#[must_use]
pub fn phase_for(spec: &MissionSpec, record: &MissionRecord) -> SessionPhase {
    match (record.phase, resolve_step(spec, record)) {
        (SessionPhase::Submitted, _) => SessionPhase::Submitted,
        (_, Step::AwaitConfirmation) => SessionPhase::AwaitingConfirmation,
        _ => SessionPhase::Collecting,
    }
}

/// Validates a phase transition.
///
/// # Errors
/// `TransitionError::IllegalTransition` when `to` is not reachable from `from`.
pub fn validate_transition(from: SessionPhase, to: SessionPhase) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition { from, to })
    }
}

/// Phases reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: SessionPhase) -> Vec<SessionPhase> {
    match from {
        // Self-loops keep repeated content events legal
        SessionPhase::Collecting => vec![
            SessionPhase::Collecting,
            SessionPhase::AwaitingConfirmation,
            SessionPhase::Submitted,
        ],
        // A replacement sends the session back to collecting
        SessionPhase::AwaitingConfirmation => vec![
            SessionPhase::AwaitingConfirmation,
            SessionPhase::Collecting,
            SessionPhase::Submitted,
        ],
        SessionPhase::Submitted => vec![],
    }
}
