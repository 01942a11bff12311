//! Mission Types - session model shared by every mission crate
//!
//! Defines the data the step engine reasons about:
//! - [`MissionRecord`]: the single in-progress session per user
//! - [`MissionRequirements`], [`MissionCategory`], [`MissionFlow`]: catalog data
//! - [`Step`]: the next input a mission needs
//! - [`EntryRecord`] / [`EntryList`]: outstanding interactive prompts
//! - [`QuizProgress`]: questionnaire scoring state
//!
//! # Example
//!
//! ```rust
//! use mission_types::{MissionId, MissionRecord, Upload, UserId};
//!
//! let mut record = MissionRecord::new(UserId::new("U1"), MissionId(3));
//! record.push_attachment(Upload::new("img-1", "a.jpg", "https://cdn/a.jpg"));
//! record.set_aside_text(0, "first bath");
//!
//! assert_eq!(record.attachment_count(), 1);
//! assert_eq!(record.answered_count(), 1);
//! ```

// Core modules
pub mod entry;
pub mod ids;
pub mod quiz;
pub mod record;
pub mod requirements;
pub mod step;

// Re-exports for convenience
pub use entry::{EntryList, EntryRecord, TaskType, MAX_ENTRIES_PER_USER};
pub use ids::{BookId, MissionId, PromptRef, UserId};
pub use quiz::QuizProgress;
pub use record::{Attachment, MissionRecord, SessionPhase, Upload};
pub use requirements::{ContentKind, MissionCategory, MissionFlow, MissionRequirements, MissionSpec};
pub use step::Step;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
