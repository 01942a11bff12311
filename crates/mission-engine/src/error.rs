//! Engine error types

use mission_types::{ContentKind, SessionPhase};
use thiserror::Error;

/// Rejected content. The record is left unchanged apart from its message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Content does not satisfy the category's text policy
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// A batch would push the kind past its requirement
    #[error("capacity exceeded for {kind}: {current} + {incoming} > {required}")]
    Capacity {
        kind: ContentKind,
        required: usize,
        current: usize,
        incoming: usize,
    },

    /// The request contradicts the record (for example a replacement
    /// target that does not exist)
    #[error("invariant violation: {message}")]
    Invariant { message: String },
}

impl IngestError {
    /// Validation error with a user-facing message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Invariant violation with a user-facing message
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Text shown to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } | Self::Invariant { message } => message.clone(),
            Self::Capacity {
                kind,
                required,
                current,
                incoming,
            } => crate::messages::capacity_exceeded(*kind, *required, *current, *incoming),
        }
    }
}

/// Illegal session phase change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// `to` is not reachable from `from`
    #[error("illegal session transition: {from:?} -> {to:?}")]
    IllegalTransition { from: SessionPhase, to: SessionPhase },
}
