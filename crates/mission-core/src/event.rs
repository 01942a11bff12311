//! Inbound events and their outcomes

use mission_types::{PromptRef, Step, Upload, UserId};
use serde::{Deserialize, Serialize};

/// One event from the chat transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Sender
    pub user_id: UserId,
    /// What arrived
    #[serde(flatten)]
    pub kind: EventKind,
}

/// What the user did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// One or more uploads delivered together
    Attachments { uploads: Vec<Upload> },
    /// Free text
    Text { text: String },
    /// Click on an interactive prompt
    Action {
        prompt_ref: PromptRef,
        action: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl InboundEvent {
    /// Batch of uploads
    #[must_use]
    pub fn attachments(user_id: impl Into<UserId>, uploads: Vec<Upload>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: EventKind::Attachments { uploads },
        }
    }

    /// Free text
    #[must_use]
    pub fn text(user_id: impl Into<UserId>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: EventKind::Text { text: text.into() },
        }
    }

    /// Click on a prompt action, with an empty payload
    #[must_use]
    pub fn action(user_id: impl Into<UserId>, prompt_ref: PromptRef, action: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: EventKind::Action {
                prompt_ref,
                action: action.into(),
                payload: serde_json::Value::Null,
            },
        }
    }
}

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum EventOutcome {
    /// Mission continues with this step
    Next(Step),
    /// Waiting for the upload that replaces this 1-based item
    AwaitingReplacement(usize),
    /// Content handed to the backend, session cleared
    Submitted,
}
