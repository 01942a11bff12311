//! Contracts with the outside world
//!
//! The service never talks to the chat platform, the AI model or the content
//! backend directly; it goes through these traits so each can be faked in
//! tests and swapped in production.

use crate::error::{BackendError, ExtractError, TransportError};
use async_trait::async_trait;
use mission_types::{Attachment, BookId, MissionCategory, MissionId, MissionRequirements, MissionSpec, PromptRef, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Clickable action attached to an interactive prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action identifier echoed back by the transport
    pub id: String,
    /// Button label
    pub label: String,
    /// Opaque data echoed back with the action
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Action {
    /// Action with an empty payload
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// With payload
    #[inline]
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Chat transport.
///
/// `send` and `edit` are fire-and-forget from the service's point of view:
/// failures are logged and never abort event handling.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send plain content to a user
    async fn send(&self, user: &UserId, content: &str) -> Result<(), TransportError>;

    /// Edit a previously sent prompt
    async fn edit(&self, prompt: &PromptRef, content: &str) -> Result<(), TransportError>;

    /// Send an interactive prompt, returning its reference
    async fn send_prompt(&self, user: &UserId, content: &str, actions: &[Action]) -> Result<PromptRef, TransportError>;

    /// Whether a prompt still exists on the platform
    async fn prompt_exists(&self, prompt: &PromptRef) -> Result<bool, TransportError>;
}

/// AI text extraction
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract structured JSON from free text using a named template
    async fn extract(
        &self,
        template: &str,
        text: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ExtractError>;
}

/// One content write to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentUpdate {
    /// Owner of the content
    pub user_id: UserId,
    /// Mission the content belongs to
    pub mission_id: MissionId,
    /// Book item index (0 is the cover); `None` for single-item missions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<usize>,
    /// Media of this write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Pipe-joined aside texts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aside_text: Option<String>,
    /// Free-form content field (book title, letter body)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ContentUpdate {
    /// Empty write for a mission
    #[must_use]
    pub fn new(user_id: UserId, mission_id: MissionId) -> Self {
        Self {
            user_id,
            mission_id,
            item: None,
            attachments: None,
            aside_text: None,
            content: None,
        }
    }
}

/// What generation is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum GenerationTarget {
    /// A single-item mission
    Mission(MissionId),
    /// A themed book
    Book(BookId),
}

/// Backend verdict on a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Generation was queued
    Accepted,
    /// Backend refused to generate
    Failed,
}

/// Content backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Write content; `Ok(false)` means the backend refused it
    async fn update_content(&self, update: &ContentUpdate) -> Result<bool, BackendError>;

    /// Kick off downstream generation
    async fn submit_generation(&self, user: &UserId, target: GenerationTarget) -> Result<GenerationStatus, BackendError>;
}

/// Read-only mission catalog
pub trait RequirementsCatalog: Send + Sync {
    /// Full catalog entry
    fn get(&self, mission_id: MissionId) -> Option<&MissionSpec>;

    /// Every mission, ordered by id
    fn missions(&self) -> Vec<&MissionSpec>;

    fn get_requirements(&self, mission_id: MissionId) -> Option<MissionRequirements> {
        self.get(mission_id).map(|spec| spec.requirements)
    }

    fn get_category(&self, mission_id: MissionId) -> Option<MissionCategory> {
        self.get(mission_id).map(|spec| spec.category)
    }
}

/// Catalog held in memory, built once
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    missions: BTreeMap<MissionId, MissionSpec>,
}

impl StaticCatalog {
    /// Build from catalog entries; later duplicates win
    #[must_use]
    pub fn new(missions: impl IntoIterator<Item = MissionSpec>) -> Self {
        Self {
            missions: missions.into_iter().map(|spec| (spec.id, spec)).collect(),
        }
    }

    /// Catalog declared in the engine configuration
    #[must_use]
    pub fn from_config(config: &crate::config::EngineConfig) -> Self {
        Self::new(config.missions.iter().cloned())
    }

    /// Number of missions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.missions.len()
    }

    /// Whether the catalog has no missions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }
}

impl RequirementsCatalog for StaticCatalog {
    fn get(&self, mission_id: MissionId) -> Option<&MissionSpec> {
        self.missions.get(&mission_id)
    }

    fn missions(&self) -> Vec<&MissionSpec> {
        self.missions.values().collect()
    }
}
