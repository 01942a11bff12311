//! Next-input descriptor produced by the step engine

use crate::requirements::ContentKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a mission needs next
///
/// Indices are zero-based slots into the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "step", content = "index", rename_all = "snake_case")]
pub enum Step {
    /// Waiting for the photo at this slot
    AwaitPhoto(usize),
    /// Waiting for the video at this slot
    AwaitVideo(usize),
    /// Waiting for the audio clip at this slot
    AwaitAudio(usize),
    /// Waiting for the answer at this slot
    AwaitAnswer(usize),
    /// Content complete, waiting for the user to confirm
    AwaitConfirmation,
    /// Content complete, may be submitted
    Ready,
}

impl Step {
    /// Await-step for a content kind
    #[inline]
    #[must_use]
    pub fn awaiting(kind: ContentKind, index: usize) -> Self {
        match kind {
            ContentKind::Photo => Step::AwaitPhoto(index),
            ContentKind::Video => Step::AwaitVideo(index),
            ContentKind::Audio => Step::AwaitAudio(index),
            ContentKind::Answer => Step::AwaitAnswer(index),
        }
    }

    /// Whether the mission may be submitted
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Step::Ready)
    }

    /// Content kind being awaited, if any
    #[must_use]
    pub fn kind(&self) -> Option<ContentKind> {
        match self {
            Step::AwaitPhoto(_) => Some(ContentKind::Photo),
            Step::AwaitVideo(_) => Some(ContentKind::Video),
            Step::AwaitAudio(_) => Some(ContentKind::Audio),
            Step::AwaitAnswer(_) => Some(ContentKind::Answer),
            Step::AwaitConfirmation | Step::Ready => None,
        }
    }

    /// Slot being awaited, if any
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Step::AwaitPhoto(i) | Step::AwaitVideo(i) | Step::AwaitAudio(i) | Step::AwaitAnswer(i) => {
                Some(*i)
            }
            Step::AwaitConfirmation | Step::Ready => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::AwaitPhoto(i) => write!(f, "await_photo({i})"),
            Step::AwaitVideo(i) => write!(f, "await_video({i})"),
            Step::AwaitAudio(i) => write!(f, "await_audio({i})"),
            Step::AwaitAnswer(i) => write!(f, "await_answer({i})"),
            Step::AwaitConfirmation => f.write_str("await_confirmation"),
            Step::Ready => f.write_str("ready"),
        }
    }
}
