//! Bounded AI extraction
//!
//! Each attempt is bounded by a timeout; after the configured number of
//! attempts the last error is returned and the caller answers with a canned
//! apology.

use crate::collaborators::Extractor;
use crate::error::ExtractError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Template used for relationship / identity answers
pub const RELATION_TEMPLATE: &str = "relation_or_identity";

/// Scalar fields pulled out of a relationship / identity answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelationFields {
    /// Child's name, when mentioned
    #[serde(default)]
    pub baby_name: Option<String>,
    /// How the writer relates to the child
    #[serde(default, alias = "relation")]
    pub relation_or_identity: Option<String>,
}

/// Extractor with timeout and retry
#[derive(Clone)]
pub struct BoundedExtractor {
    inner: Arc<dyn Extractor>,
    timeout: Duration,
    max_attempts: u32,
}

impl BoundedExtractor {
    /// Wrap `inner`; at least one attempt is always made
    #[must_use]
    pub fn new(inner: Arc<dyn Extractor>, timeout: Duration, max_attempts: u32) -> Self {
        Self {
            inner,
            timeout,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run the extraction, retrying failed attempts
    ///
    /// # Errors
    /// The last attempt's error once every attempt failed or timed out.
    pub async fn extract(
        &self,
        template: &str,
        text: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ExtractError> {
        self.extract_as(template, text, context).await
    }

    /// Run the extraction and decode the answer as `T`.
    ///
    /// An answer of the wrong shape counts as a failed attempt, so it is
    /// retried like a service error.
    ///
    /// # Errors
    /// The last attempt's error; `ExtractError::Unparseable` when the final
    /// answer did not decode.
    pub async fn extract_as<T: DeserializeOwned>(
        &self,
        template: &str,
        text: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<T, ExtractError> {
        let mut last = ExtractError::Service("no attempt made".into());
        for attempt in 1..=self.max_attempts {
            let result = tokio::time::timeout(self.timeout, self.inner.extract(template, text, context)).await;
            match result {
                Ok(Ok(value)) => match T::deserialize(&value) {
                    Ok(decoded) => return Ok(decoded),
                    Err(_) => last = ExtractError::Unparseable { raw: value.to_string() },
                },
                Ok(Err(err)) => last = err,
                Err(_) => {
                    last = ExtractError::Timeout {
                        secs: self.timeout.as_secs(),
                    }
                }
            }
            warn!(template, attempt, max_attempts = self.max_attempts, error = %last, "extraction attempt failed");
        }
        Err(last)
    }

    /// Extract the scalar fields of a relationship / identity answer
    ///
    /// # Errors
    /// See [`extract_as`](Self::extract_as).
    pub async fn relation_fields(&self, text: &str) -> Result<RelationFields, ExtractError> {
        self.extract_as(RELATION_TEMPLATE, text, None).await
    }
}

impl std::fmt::Debug for BoundedExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedExtractor")
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        calls: AtomicU32,
        succeed_on: u32,
    }

    #[async_trait]
    impl Extractor for Flaky {
        async fn extract(
            &self,
            _template: &str,
            _text: &str,
            _context: Option<&serde_json::Value>,
        ) -> Result<serde_json::Value, ExtractError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.succeed_on {
                Ok(serde_json::json!({"baby_name": "小米", "relation": "媽媽"}))
            } else {
                Err(ExtractError::Unparseable { raw: "???".into() })
            }
        }
    }

    struct Hanging;

    #[async_trait]
    impl Extractor for Hanging {
        async fn extract(
            &self,
            _template: &str,
            _text: &str,
            _context: Option<&serde_json::Value>,
        ) -> Result<serde_json::Value, ExtractError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn second_attempt_can_succeed() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            succeed_on: 2,
        });
        let extractor = BoundedExtractor::new(flaky.clone(), Duration::from_secs(1), 2);

        let fields = extractor.relation_fields("我是小米的媽媽").await.unwrap();

        assert_eq!(fields.baby_name.as_deref(), Some("小米"));
        assert_eq!(fields.relation_or_identity.as_deref(), Some("媽媽"));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            succeed_on: 10,
        });
        let extractor = BoundedExtractor::new(flaky.clone(), Duration::from_secs(1), 2);

        assert!(extractor.extract("t", "x", None).await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    struct WrongShape {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Extractor for WrongShape {
        async fn extract(
            &self,
            _template: &str,
            _text: &str,
            _context: Option<&serde_json::Value>,
        ) -> Result<serde_json::Value, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({"baby_name": 5}))
        }
    }

    #[tokio::test]
    async fn wrong_shape_is_retried_then_unparseable() {
        let model = Arc::new(WrongShape { calls: AtomicU32::new(0) });
        let extractor = BoundedExtractor::new(model.clone(), Duration::from_secs(1), 2);

        let err = extractor.relation_fields("我是小米的媽媽").await.unwrap_err();

        assert!(matches!(err, ExtractError::Unparseable { .. }));
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_extractor_times_out() {
        let extractor = BoundedExtractor::new(Arc::new(Hanging), Duration::from_secs(20), 2);
        let err = extractor.extract("t", "x", None).await.unwrap_err();
        assert!(matches!(err, ExtractError::Timeout { secs: 20 }));
    }
}
