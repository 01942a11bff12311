//! Mission Core - the stateful mission service
//!
//! Ties the pure [`mission_engine`] to persistence ([`mission_store`]) and the
//! outside world ([`Transport`], [`Backend`], [`Extractor`]):
//!
//! - [`MissionService`]: event dispatch under per-user serialization
//! - [`Submitter`]: single and multi-item backend submission
//! - [`PromptRegistry`]: interactive prompts that survive restarts
//! - [`EngineConfig`]: TOML configuration and the mission catalog
//!
//! # Example
//!
//! ```rust,ignore
//! use mission_core::prelude::*;
//!
//! let config = EngineConfig::load("missions.toml")?;
//! let catalog = Arc::new(StaticCatalog::from_config(&config));
//! let stores = Stores::open(&config.store_dir).await?;
//! let service = MissionService::new(config, stores, catalog, transport, backend, extractor);
//!
//! service.recover().await?;
//! service.handle_event(InboundEvent::text("U1", "skip")).await?;
//! ```

pub mod collaborators;
pub mod config;
pub mod domain;
pub mod error;
pub mod event;
pub mod extract;
pub mod messages;
pub mod recovery;
pub mod service;
pub mod submission;

pub use collaborators::{
    Action, Backend, ContentUpdate, Extractor, GenerationStatus, GenerationTarget, RequirementsCatalog, StaticCatalog,
    Transport,
};
pub use config::EngineConfig;
pub use domain::{DomainGuard, DomainState, Domains, ReplacementIntent};
pub use error::{BackendError, ConfigError, ExtractError, MissionError, MissionResult, RecoveryError, TransportError};
pub use event::{EventKind, EventOutcome, InboundEvent};
pub use extract::{BoundedExtractor, RelationFields};
pub use recovery::{Binding, LiveHandler, PromptRegistry, QuizPayload, RecoveryReport};
pub use service::MissionService;
pub use submission::Submitter;

/// Prelude for common imports
pub mod prelude {
    pub use crate::collaborators::{Backend, Extractor, RequirementsCatalog, StaticCatalog, Transport};
    pub use crate::config::EngineConfig;
    pub use crate::error::{MissionError, MissionResult};
    pub use crate::event::{EventOutcome, InboundEvent};
    pub use crate::service::MissionService;
    pub use mission_store::Stores;
    pub use mission_types::{MissionId, Step, Upload, UserId};
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
