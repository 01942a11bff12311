//! Engine configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! store_dir = "/var/lib/missions"
//! backend_timeout_secs = 15
//!
//! [text]
//! general_max_lines = 2
//!
//! [[missions]]
//! id = 12
//! name = "first bath"
//! photo = 2
//! aside_text = 2
//! ```

use crate::error::ConfigError;
use mission_engine::TextPolicy;
use mission_types::{MissionSpec, MAX_ENTRIES_PER_USER};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory of the durable tables
    pub store_dir: PathBuf,
    /// Outstanding interactive prompts kept per user
    pub max_entries_per_user: usize,
    /// Interactive prompt lifetime in seconds
    pub prompt_ttl_secs: u64,
    /// Bound on every backend call
    pub backend_timeout_secs: u64,
    /// Bound on every AI extraction attempt
    pub ai_timeout_secs: u64,
    /// Extraction attempts before apologising
    pub ai_max_attempts: u32,
    /// Text answer limits
    pub text: TextPolicy,
    /// Mission catalog
    pub missions: Vec<MissionSpec>,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), missions = config.missions.len(), "loaded config");
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries_per_user == 0 {
            return Err(ConfigError::Invalid("max_entries_per_user must be at least 1".into()));
        }
        if self.ai_max_attempts == 0 {
            return Err(ConfigError::Invalid("ai_max_attempts must be at least 1".into()));
        }
        if self.text.line_width == 0 {
            return Err(ConfigError::Invalid("text.line_width must be at least 1".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.missions.iter().find(|m| !seen.insert(m.id)) {
            return Err(ConfigError::Invalid(format!("duplicate mission id {}", dup.id)));
        }
        Ok(())
    }

    /// With store directory
    #[inline]
    #[must_use]
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    /// With backend timeout
    #[inline]
    #[must_use]
    pub fn with_backend_timeout(mut self, secs: u64) -> Self {
        self.backend_timeout_secs = secs;
        self
    }

    /// With AI timeout and attempts
    #[inline]
    #[must_use]
    pub fn with_ai_limits(mut self, timeout_secs: u64, max_attempts: u32) -> Self {
        self.ai_timeout_secs = timeout_secs;
        self.ai_max_attempts = max_attempts.max(1);
        self
    }

    /// With prompt lifetime
    #[inline]
    #[must_use]
    pub fn with_prompt_ttl(mut self, secs: u64) -> Self {
        self.prompt_ttl_secs = secs;
        self
    }

    /// With text limits
    #[inline]
    #[must_use]
    pub fn with_text_policy(mut self, text: TextPolicy) -> Self {
        self.text = text;
        self
    }

    /// With mission catalog
    #[must_use]
    pub fn with_missions(mut self, missions: impl IntoIterator<Item = MissionSpec>) -> Self {
        self.missions = missions.into_iter().collect();
        self
    }

    /// Bound on each backend call
    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// Bound on each extraction attempt
    #[must_use]
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }

    /// Lifetime of an interactive prompt
    #[must_use]
    pub fn prompt_ttl(&self) -> chrono::Duration {
        let secs = i64::try_from(self.prompt_ttl_secs).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("mission-data"),
            max_entries_per_user: MAX_ENTRIES_PER_USER,
            prompt_ttl_secs: 86_400,
            backend_timeout_secs: 30,
            ai_timeout_secs: 20,
            ai_max_attempts: 2,
            text: TextPolicy::default(),
            missions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_types::{MissionCategory, MissionFlow, MissionId};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.text.general_max_lines, 2);
        assert_eq!(config.max_entries_per_user, 5);
    }

    #[test]
    fn parses_mission_catalog() {
        let config = EngineConfig::from_toml_str(
            r#"
            backend_timeout_secs = 5

            [[missions]]
            id = 12
            name = "first bath"
            photo = 2
            aside_text = 2

            [[missions]]
            id = 40
            name = "our book"
            photo = 4
            aside_text = 4
            flow = "book"

            [[missions]]
            id = 41
            name = "letter"
            aside_text = 1
            category = "letter"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend_timeout(), Duration::from_secs(5));
        assert_eq!(config.missions.len(), 3);
        assert_eq!(config.missions[0].id, MissionId(12));
        assert_eq!(config.missions[0].requirements.photo, 2);
        assert_eq!(config.missions[1].flow, MissionFlow::Book);
        assert_eq!(config.missions[2].category, MissionCategory::Letter);
    }

    #[test]
    fn rejects_duplicate_missions() {
        let err = EngineConfig::from_toml_str(
            r#"
            [[missions]]
            id = 1
            [[missions]]
            id = 1
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate mission id 1"));
    }

    #[test]
    fn rejects_zero_attempts() {
        assert!(EngineConfig::from_toml_str("ai_max_attempts = 0").is_err());
    }
}
