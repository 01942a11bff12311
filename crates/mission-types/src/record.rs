//! The per-user mission session
//!
//! A [`MissionRecord`] holds everything a user has submitted for their current
//! mission. There is at most one record per user; starting a new mission
//! replaces it wholesale.

use crate::ids::{MissionId, UserId};
use crate::requirements::ContentKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uploaded media as delivered by the transport (already stored remotely)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    /// Storage object id
    pub id: String,
    /// Original filename
    pub filename: String,
    /// Public URL
    pub url: String,
    /// Media kind reported by the transport
    #[serde(default)]
    pub kind: ContentKind,
}

impl Upload {
    /// Create photo upload descriptor
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            url: url.into(),
            kind: ContentKind::Photo,
        }
    }

    /// With media kind
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Upload known only by URL
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let filename = url.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            id: String::new(),
            filename,
            url,
            kind: ContentKind::Photo,
        }
    }
}

/// Attachment slot in a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Zero-based slot, aligned with `aside_texts`
    pub index: usize,
    /// Storage object id
    pub id: String,
    /// Original filename
    pub filename: String,
    /// Public URL
    pub url: String,
    /// Media kind
    #[serde(default)]
    pub kind: ContentKind,
}

impl Attachment {
    /// Place an upload into a slot
    #[inline]
    #[must_use]
    pub fn from_upload(index: usize, upload: Upload) -> Self {
        Self {
            index,
            id: upload.id,
            filename: upload.filename,
            url: upload.url,
            kind: upload.kind,
        }
    }

    /// Whether the attachment points at retrievable content
    #[inline]
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        !self.url.trim().is_empty() || !self.id.trim().is_empty()
    }
}

/// Confirmation lifecycle of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Still gathering content
    #[default]
    Collecting,
    /// Content complete, waiting for the user to confirm
    AwaitingConfirmation,
    /// Handed to the backend
    Submitted,
}

/// In-progress mission content for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRecord {
    /// Owner; the store key
    pub user_id: UserId,
    /// Mission being collected
    pub mission_id: MissionId,
    /// Collected media, in order
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Sparse, index-aligned with `attachments` for paired missions
    #[serde(default)]
    pub aside_texts: Vec<Option<String>>,
    /// Book cover
    #[serde(default)]
    pub cover: Option<Attachment>,
    /// Child's name extracted from an identity answer
    #[serde(default)]
    pub baby_name: Option<String>,
    /// Writer's relation to the child
    #[serde(default)]
    pub relation_or_identity: Option<String>,
    /// Free-form content sent with the write
    #[serde(default)]
    pub content: Option<String>,
    /// Every requirement is met
    #[serde(default)]
    pub is_ready: bool,
    /// Last status text shown to the user
    #[serde(default)]
    pub message: Option<String>,
    /// Answer slot the next text fills
    #[serde(default)]
    pub current_question_index: Option<usize>,
    /// Next prompt should repeat the photo instruction
    #[serde(default)]
    pub show_next_photo_instruction: bool,
    /// Slot the next photo fills, when known
    #[serde(default)]
    pub next_photo_index: Option<usize>,
    /// Lifecycle phase
    #[serde(default)]
    pub phase: SessionPhase,
    /// Bumped on every persisted write
    #[serde(default)]
    pub revision: u64,
    /// Book items already committed to the backend
    #[serde(default)]
    pub book_progress: usize,
    /// Time of the last persisted write
    pub updated_at: DateTime<Utc>,
}

impl MissionRecord {
    /// Create empty record for a freshly started mission
    #[must_use]
    pub fn new(user_id: UserId, mission_id: MissionId) -> Self {
        Self {
            user_id,
            mission_id,
            attachments: Vec::new(),
            aside_texts: Vec::new(),
            cover: None,
            baby_name: None,
            relation_or_identity: None,
            content: None,
            is_ready: false,
            message: None,
            current_question_index: None,
            show_next_photo_instruction: true,
            next_photo_index: Some(0),
            phase: SessionPhase::Collecting,
            revision: 0,
            book_progress: 0,
            updated_at: Utc::now(),
        }
    }

    /// Number of attachment slots
    #[inline]
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    /// Attachments with a resolvable reference
    #[must_use]
    pub fn valid_attachment_count(&self) -> usize {
        self.attachments.iter().filter(|a| a.is_resolvable()).count()
    }

    /// Slots holding attachments of one kind, in order
    #[must_use]
    pub fn slots_of(&self, kind: ContentKind) -> Vec<usize> {
        self.attachments
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind == kind)
            .map(|(slot, _)| slot)
            .collect()
    }

    /// Number of non-null aside texts
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.aside_texts.iter().filter(|t| t.is_some()).count()
    }

    /// Whether any aside text has been given
    #[inline]
    #[must_use]
    pub fn has_any_aside_text(&self) -> bool {
        self.aside_texts.iter().any(Option::is_some)
    }

    /// Aside text paired with a slot
    #[must_use]
    pub fn aside_text(&self, slot: usize) -> Option<&str> {
        self.aside_texts.get(slot).and_then(|t| t.as_deref())
    }

    /// First attachment slot with no paired aside text
    #[must_use]
    pub fn first_unanswered_index(&self) -> Option<usize> {
        (0..self.attachments.len()).find(|slot| self.aside_text(*slot).is_none())
    }

    /// Append an upload at the next slot, returning the slot index
    pub fn push_attachment(&mut self, upload: Upload) -> usize {
        let index = self.attachments.len();
        self.attachments.push(Attachment::from_upload(index, upload));
        index
    }

    /// Overwrite an existing slot and null out its paired text.
    ///
    /// Returns `false` when the slot does not exist.
    pub fn replace_attachment(&mut self, slot: usize, upload: Upload) -> bool {
        let Some(existing) = self.attachments.get_mut(slot) else {
            return false;
        };
        *existing = Attachment::from_upload(slot, upload);
        self.clear_aside_text(slot);
        true
    }

    /// Assign a text to a slot, padding the sparse list with nulls
    pub fn set_aside_text(&mut self, slot: usize, text: impl Into<String>) {
        if self.aside_texts.len() <= slot {
            self.aside_texts.resize(slot + 1, None);
        }
        self.aside_texts[slot] = Some(text.into());
    }

    /// Null out a slot's text (no-op past the end)
    pub fn clear_aside_text(&mut self, slot: usize) {
        if let Some(text) = self.aside_texts.get_mut(slot) {
            *text = None;
        }
    }

    /// Record a new status message
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Refresh modification time
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
