//! Mission Engine - pure mission logic
//!
//! Nothing in this crate performs I/O. Given a catalog entry and a record it
//! answers three questions:
//! - what input comes next ([`next_step`], [`resolve_step`])
//! - is this content acceptable ([`ingest_media`], [`ingest_text`])
//! - is the mission ready, and does it need confirmation ([`is_ready`],
//!   [`should_confirm`])
//!
//! ```rust
//! use mission_engine::{next_step, ingest_media};
//! use mission_types::{ContentKind, MissionId, MissionRecord, MissionRequirements, MissionSpec, Step, Upload, UserId};
//!
//! let spec = MissionSpec::new(MissionId(1), "first bath", MissionRequirements::photos(1, 1));
//! let mut record = MissionRecord::new(UserId::new("U1"), spec.id);
//! assert_eq!(next_step(&spec, &record), Step::AwaitPhoto(0));
//!
//! ingest_media(ContentKind::Photo, 1, &mut record, vec![Upload::from_url("https://cdn/a.jpg")]).unwrap();
//! assert_eq!(next_step(&spec, &record), Step::AwaitAnswer(0));
//! ```

pub mod error;
pub mod gate;
pub mod ingest;
pub mod messages;
pub mod normalize;
pub mod step;

pub use error::{IngestError, TransitionError};
pub use gate::{
    allowed_transitions, is_countable_text, is_ready, phase_for, resolve_step, should_confirm, validate_transition,
    valid_units, SKIP_KEYWORD, SKIP_PLACEHOLDER,
};
pub use ingest::{apply_replacement, ingest_media, ingest_text, MediaOutcome, TextOutcome, TextPolicy};
pub use normalize::{display_width, normalize_general, visual_lines};
pub use step::next_step;

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::IngestError;
    pub use crate::gate::{is_ready, resolve_step, should_confirm};
    pub use crate::ingest::{ingest_media, ingest_text, TextPolicy};
    pub use crate::step::next_step;
}
