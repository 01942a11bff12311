//! Error types for Mission Core
//!
//! Provides error handling for:
//! - Rejected user content (validation, capacity, bad replacement targets)
//! - Backend and AI collaborator failures
//! - Startup recovery of interactive prompts
//! - Configuration loading

use mission_engine::{IngestError, TransitionError};
use mission_store::StoreError;
use mission_types::{MissionId, PromptRef, TaskType, UserId};
use std::path::PathBuf;

/// Main mission error type
#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    /// User has no mission in progress
    #[error("no active mission for user {0}")]
    NoActiveMission(UserId),

    /// Mission id missing from the catalog
    #[error("unknown mission {0}")]
    UnknownMission(MissionId),

    /// Event refers to a different mission than the active one
    #[error("mission mismatch: active {active}, event for {requested}")]
    MissionMismatch { active: MissionId, requested: MissionId },

    /// Content rejected
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Illegal phase change
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Submit requested before content is complete
    #[error("mission {0} is not ready for submission")]
    NotReady(MissionId),

    /// Persistence failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Backend call failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// One item of a multi-item submission failed; earlier items stay committed
    #[error("submission failed at item {item} of {total}: {source}")]
    PartialSubmission {
        /// Zero-based index of the failed item (0 is the cover)
        item: usize,
        total: usize,
        #[source]
        source: BackendError,
    },

    /// New content arrived while a submission was in flight
    #[error("record for {0} changed during submission")]
    ChangedDuringSubmission(UserId),

    /// Transport failed where a reply was required
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Interactive action on a prompt with no live handler
    #[error("prompt {0} has expired")]
    ExpiredPrompt(PromptRef),
}

impl MissionError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(_) | Self::PartialSubmission { .. } | Self::ChangedDuringSubmission(_) => true,
            Self::Store(err) => !err.is_conflict(),
            _ => false,
        }
    }

    /// Text shown to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        use crate::messages;
        match self {
            Self::Ingest(err) => err.user_message(),
            Self::NoActiveMission(_) => messages::NO_ACTIVE_MISSION.to_string(),
            Self::UnknownMission(_) | Self::MissionMismatch { .. } => messages::UNKNOWN_MISSION.to_string(),
            Self::NotReady(_) => messages::NOT_READY.to_string(),
            Self::PartialSubmission { item, total, .. } => messages::partial_submission(*item, *total),
            Self::ExpiredPrompt(_) => messages::EXPIRED_PROMPT.to_string(),
            Self::Backend(_) | Self::ChangedDuringSubmission(_) => messages::SUBMISSION_FAILED.to_string(),
            Self::Transition(_) | Self::Store(_) | Self::Transport(_) => messages::INTERNAL_ERROR.to_string(),
        }
    }
}

/// Backend API failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Backend answered but refused the write
    #[error("backend rejected {operation}")]
    Rejected { operation: String },

    /// No answer within the configured bound
    #[error("backend call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Backend unreachable or errored
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// AI extraction failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    /// Model answered with something that is not the requested JSON
    #[error("unparseable extraction output")]
    Unparseable { raw: String },

    /// Attempt exceeded its time bound
    #[error("extraction timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Extraction service reported a failure
    #[error("extraction service failed: {0}")]
    Service(String),
}

/// Chat transport failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Platform refused or failed the delivery
    #[error("transport send failed: {0}")]
    SendFailed(String),

    /// Prompt is not known to the platform
    #[error("unknown prompt {0}")]
    UnknownPrompt(PromptRef),
}

/// Prompt reconstruction failures (logged, entry dropped)
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// Prompt no longer exists on the transport side
    #[error("prompt {0} cannot be resolved")]
    Unresolvable(PromptRef),

    /// Stored payload does not match the task type
    #[error("invalid {task_type} payload: {source}")]
    InvalidPayload {
        task_type: TaskType,
        #[source]
        source: serde_json::Error,
    },

    /// Transport lookup failed
    #[error("prompt lookup failed: {0}")]
    Lookup(#[from] TransportError),
}

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantically invalid values
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result alias for mission operations
pub type MissionResult<T> = Result<T, MissionError>;
