//! Catalog data: what each mission needs
//!
//! Requirements are static, read-only and resolved once per mission through
//! the catalog. The category governs text policy, the flow governs how the
//! step engine sequences inputs.

use crate::ids::MissionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content a mission collects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Still image
    #[default]
    Photo,
    /// Video clip
    Video,
    /// Audio clip
    Audio,
    /// Short text answer (aside text)
    Answer,
}

impl ContentKind {
    /// Media kinds in the order the engine asks for them
    pub const MEDIA: [ContentKind; 3] = [ContentKind::Photo, ContentKind::Video, ContentKind::Audio];

    /// Whether this kind is an uploaded attachment
    #[inline]
    #[must_use]
    pub fn is_media(self) -> bool {
        !matches!(self, ContentKind::Answer)
    }

    /// Display label used in user-facing text
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ContentKind::Photo => "照片",
            ContentKind::Video => "影片",
            ContentKind::Audio => "錄音",
            ContentKind::Answer => "回答",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentKind::Photo => "photo",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Answer => "answer",
        };
        f.write_str(name)
    }
}

/// Required counts per content kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRequirements {
    /// Required photos
    #[serde(default)]
    pub photo: usize,
    /// Required videos
    #[serde(default)]
    pub video: usize,
    /// Required audio clips
    #[serde(default)]
    pub audio: usize,
    /// Required aside texts / answers
    #[serde(default)]
    pub aside_text: usize,
}

impl MissionRequirements {
    /// Create requirements from explicit counts
    #[inline]
    #[must_use]
    pub fn new(photo: usize, video: usize, audio: usize, aside_text: usize) -> Self {
        Self {
            photo,
            video,
            audio,
            aside_text,
        }
    }

    /// Photo + answer requirements (the common paired shape)
    #[inline]
    #[must_use]
    pub fn photos(photo: usize, aside_text: usize) -> Self {
        Self::new(photo, 0, 0, aside_text)
    }

    /// Required count for a kind
    #[inline]
    #[must_use]
    pub fn required(&self, kind: ContentKind) -> usize {
        match kind {
            ContentKind::Photo => self.photo,
            ContentKind::Video => self.video,
            ContentKind::Audio => self.audio,
            ContentKind::Answer => self.aside_text,
        }
    }

    /// The media kind this mission collects attachments as.
    ///
    /// Photo wins over video, video over audio; `None` for text-only missions.
    #[must_use]
    pub fn media_kind(&self) -> Option<ContentKind> {
        ContentKind::MEDIA
            .into_iter()
            .find(|kind| self.required(*kind) > 0)
    }

    /// Required count of the primary media kind (0 for text-only missions)
    #[inline]
    #[must_use]
    pub fn media_required(&self) -> usize {
        self.media_kind().map_or(0, |kind| self.required(kind))
    }

    /// Kinds with a non-zero requirement, in asking order
    pub fn required_kinds(&self) -> impl Iterator<Item = ContentKind> + '_ {
        [
            ContentKind::Photo,
            ContentKind::Video,
            ContentKind::Audio,
            ContentKind::Answer,
        ]
        .into_iter()
        .filter(|kind| self.required(*kind) > 0)
    }
}

/// Text policy category (mutually exclusive per mission)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionCategory {
    /// Long-form letter, capped length, always confirmed
    Letter,
    /// Relationship / identity answers, stored verbatim, never confirmed
    RelationOrIdentity,
    /// Everything else: normalized, short answers
    #[default]
    General,
}

impl fmt::Display for MissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissionCategory::Letter => "letter",
            MissionCategory::RelationOrIdentity => "relation_or_identity",
            MissionCategory::General => "general",
        };
        f.write_str(name)
    }
}

/// How a mission sequences its inputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionFlow {
    /// Strict media → answer → media → answer interleave
    #[default]
    Paired,
    /// Independent counts per kind, any order
    Questionnaire,
    /// Cover followed by paired pages, submitted item by item
    Book,
}

/// Catalog entry for one mission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionSpec {
    /// Mission identifier
    pub id: MissionId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Required counts
    #[serde(flatten)]
    pub requirements: MissionRequirements,
    /// Text policy
    #[serde(default)]
    pub category: MissionCategory,
    /// Input sequencing
    #[serde(default)]
    pub flow: MissionFlow,
}

impl MissionSpec {
    /// Create a paired general mission
    #[must_use]
    pub fn new(id: MissionId, name: impl Into<String>, requirements: MissionRequirements) -> Self {
        Self {
            id,
            name: name.into(),
            requirements,
            category: MissionCategory::General,
            flow: MissionFlow::Paired,
        }
    }

    /// With text category
    #[inline]
    #[must_use]
    pub fn with_category(mut self, category: MissionCategory) -> Self {
        self.category = category;
        self
    }

    /// With sequencing flow
    #[inline]
    #[must_use]
    pub fn with_flow(mut self, flow: MissionFlow) -> Self {
        self.flow = flow;
        self
    }
}
