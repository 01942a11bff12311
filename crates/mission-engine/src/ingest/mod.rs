//! Content Validators: media batches and text answers
//!
//! Validators mutate the record in place on success. On rejection they only
//! set the record's status message and return an [`IngestError`](crate::IngestError).

pub mod media;
pub mod text;

pub use media::{apply_replacement, ingest_media, MediaOutcome};
pub use text::{ingest_text, TextOutcome, TextPolicy};
