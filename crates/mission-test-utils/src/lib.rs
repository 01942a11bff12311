//! Testing utilities for the mission workspace
//!
//! Recording fakes for the service's collaborators, a fixed mission catalog
//! and a ready-wired [`Harness`].

#![allow(missing_docs)]

use async_trait::async_trait;
use mission_core::{
    Action, Backend, BackendError, ContentUpdate, EngineConfig, ExtractError, Extractor, GenerationStatus,
    GenerationTarget, MissionService, StaticCatalog, Transport, TransportError,
};
use mission_store::Stores;
use mission_types::{
    ContentKind, MissionCategory, MissionFlow, MissionId, MissionRecord, MissionRequirements, MissionSpec, PromptRef,
    Upload, UserId,
};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Fixture mission ids
pub const BATH: MissionId = MissionId(12);
pub const LETTER: MissionId = MissionId(20);
pub const RELATION: MissionId = MissionId(21);
pub const KEEPSAKE: MissionId = MissionId(22);
pub const QUIZ: MissionId = MissionId(30);
pub const BOOK: MissionId = MissionId(40);
pub const ALBUM: MissionId = MissionId(50);
pub const PHOTOS_ONLY: MissionId = MissionId(60);

/// Catalog used across the integration tests
#[must_use]
pub fn fixture_missions() -> Vec<MissionSpec> {
    vec![
        MissionSpec::new(BATH, "first bath", MissionRequirements::photos(2, 2)),
        MissionSpec::new(LETTER, "letter to baby", MissionRequirements::new(0, 0, 0, 1))
            .with_category(MissionCategory::Letter),
        MissionSpec::new(RELATION, "who am I", MissionRequirements::new(0, 0, 0, 2))
            .with_category(MissionCategory::RelationOrIdentity),
        MissionSpec::new(KEEPSAKE, "keepsake photo", MissionRequirements::photos(1, 0))
            .with_category(MissionCategory::Letter),
        MissionSpec::new(QUIZ, "getting to know you", MissionRequirements::new(1, 1, 0, 2))
            .with_flow(MissionFlow::Questionnaire),
        MissionSpec::new(BOOK, "our book", MissionRequirements::photos(2, 2)).with_flow(MissionFlow::Book),
        MissionSpec::new(ALBUM, "fifty photos", MissionRequirements::photos(50, 50)),
        MissionSpec::new(PHOTOS_ONLY, "three photos", MissionRequirements::photos(3, 0)),
    ]
}

#[must_use]
pub fn fixture_catalog() -> StaticCatalog {
    StaticCatalog::new(fixture_missions())
}

#[must_use]
pub fn fixture_spec(mission_id: MissionId) -> MissionSpec {
    fixture_missions()
        .into_iter()
        .find(|spec| spec.id == mission_id)
        .unwrap_or_else(|| panic!("no fixture mission {mission_id}"))
}

/// Photo upload with a predictable URL
#[must_use]
pub fn photo(n: usize) -> Upload {
    Upload::new(format!("img-{n}"), format!("p{n}.jpg"), format!("https://cdn.test/p{n}.jpg"))
}

/// Upload of any media kind
#[must_use]
pub fn media(kind: ContentKind, n: usize) -> Upload {
    Upload::new(format!("{kind}-{n}"), format!("{kind}{n}.bin"), format!("https://cdn.test/{kind}/{n}")).with_kind(kind)
}

/// Record with `photos` attachments and the first `answers` of them captioned
#[must_use]
pub fn record_with(user: &str, mission_id: MissionId, photos: usize, answers: usize) -> MissionRecord {
    let mut record = MissionRecord::new(UserId::new(user), mission_id);
    for n in 0..photos {
        record.push_attachment(photo(n));
    }
    for slot in 0..answers {
        record.set_aside_text(slot, format!("caption {slot}"));
    }
    record
}

/// A prompt the transport was asked to send
#[derive(Debug, Clone, PartialEq)]
pub struct SentPrompt {
    pub user: UserId,
    pub prompt_ref: PromptRef,
    pub content: String,
    pub actions: Vec<Action>,
}

/// Transport that records everything it is asked to send
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(UserId, String)>>,
    prompts: Mutex<Vec<SentPrompt>>,
    unresolvable: Mutex<HashSet<PromptRef>>,
    fail_sends: Mutex<bool>,
    next_ref: AtomicUsize,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain messages sent to a user, oldest first
    #[must_use]
    pub fn sent_to(&self, user: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| to.as_str() == user)
            .map(|(_, content)| content.clone())
            .collect()
    }

    /// Whether any message to the user contains `needle`
    #[must_use]
    pub fn said(&self, user: &str, needle: &str) -> bool {
        self.sent_to(user).iter().any(|content| content.contains(needle))
    }

    #[must_use]
    pub fn prompts(&self) -> Vec<SentPrompt> {
        self.prompts.lock().clone()
    }

    /// Most recent interactive prompt
    #[must_use]
    pub fn last_prompt(&self) -> Option<SentPrompt> {
        self.prompts.lock().last().cloned()
    }

    /// Current content of a prompt, after any edits
    #[must_use]
    pub fn prompt_content(&self, prompt: &PromptRef) -> Option<String> {
        self.prompts
            .lock()
            .iter()
            .find(|p| &p.prompt_ref == prompt)
            .map(|p| p.content.clone())
    }

    /// Make the platform report a prompt as gone
    pub fn forget_prompt(&self, prompt: &PromptRef) {
        self.unresolvable.lock().insert(prompt.clone());
    }

    /// Fail every subsequent send
    pub fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock() = fail;
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
        self.prompts.lock().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, user: &UserId, content: &str) -> Result<(), TransportError> {
        if *self.fail_sends.lock() {
            return Err(TransportError::SendFailed("scripted failure".into()));
        }
        self.sent.lock().push((user.clone(), content.to_string()));
        Ok(())
    }

    async fn edit(&self, prompt: &PromptRef, content: &str) -> Result<(), TransportError> {
        let mut prompts = self.prompts.lock();
        let sent = prompts
            .iter_mut()
            .find(|p| &p.prompt_ref == prompt)
            .ok_or_else(|| TransportError::UnknownPrompt(prompt.clone()))?;
        sent.content = content.to_string();
        Ok(())
    }

    async fn send_prompt(&self, user: &UserId, content: &str, actions: &[Action]) -> Result<PromptRef, TransportError> {
        if *self.fail_sends.lock() {
            return Err(TransportError::SendFailed("scripted failure".into()));
        }
        let n = self.next_ref.fetch_add(1, Ordering::SeqCst);
        let prompt_ref = PromptRef::new(format!("prompt-{n}"));
        self.prompts.lock().push(SentPrompt {
            user: user.clone(),
            prompt_ref: prompt_ref.clone(),
            content: content.to_string(),
            actions: actions.to_vec(),
        });
        Ok(prompt_ref)
    }

    async fn prompt_exists(&self, prompt: &PromptRef) -> Result<bool, TransportError> {
        Ok(!self.unresolvable.lock().contains(prompt))
    }
}

/// Backend with scriptable failures that records every write
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    updates: Mutex<Vec<ContentUpdate>>,
    generations: Mutex<Vec<(UserId, GenerationTarget)>>,
    calls: AtomicUsize,
    fail_call: Mutex<Option<usize>>,
    reject_generation: Mutex<bool>,
    latency: Mutex<Option<Duration>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th update call from now (1-based), once
    pub fn fail_update_call(&self, n: usize) {
        let made = self.calls.load(Ordering::SeqCst);
        *self.fail_call.lock() = Some(made + n);
    }

    pub fn reject_generation(&self, reject: bool) {
        *self.reject_generation.lock() = reject;
    }

    /// Delay every call
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Successful writes, in order
    #[must_use]
    pub fn updates(&self) -> Vec<ContentUpdate> {
        self.updates.lock().clone()
    }

    #[must_use]
    pub fn generations(&self) -> Vec<(UserId, GenerationTarget)> {
        self.generations.lock().clone()
    }

    async fn wait(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn update_content(&self, update: &ContentUpdate) -> Result<bool, BackendError> {
        self.wait().await;
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut fail_call = self.fail_call.lock();
            if *fail_call == Some(call) {
                *fail_call = None;
                return Err(BackendError::Unavailable(format!("scripted failure on call {call}")));
            }
        }
        self.updates.lock().push(update.clone());
        Ok(true)
    }

    async fn submit_generation(&self, user: &UserId, target: GenerationTarget) -> Result<GenerationStatus, BackendError> {
        self.wait().await;
        if *self.reject_generation.lock() {
            return Ok(GenerationStatus::Failed);
        }
        self.generations.lock().push((user.clone(), target));
        Ok(GenerationStatus::Accepted)
    }
}

/// Extractor answering from a queue, then from a fallback
#[derive(Debug)]
pub struct ScriptedExtractor {
    queue: Mutex<VecDeque<Result<serde_json::Value, ExtractError>>>,
    fallback: Mutex<Result<serde_json::Value, ExtractError>>,
    calls: AtomicUsize,
}

impl Default for ScriptedExtractor {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(serde_json::json!({}))),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response
    pub fn push(&self, response: Result<serde_json::Value, ExtractError>) {
        self.queue.lock().push_back(response);
    }

    /// Answer every call not covered by the queue
    pub fn always(&self, response: Result<serde_json::Value, ExtractError>) {
        *self.fallback.lock() = response;
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(
        &self,
        _template: &str,
        _text: &str,
        _context: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.queue.lock().pop_front();
        queued.unwrap_or_else(|| self.fallback.lock().clone())
    }
}

/// A service wired to recording fakes and in-memory stores
#[derive(Debug, Clone)]
pub struct Harness {
    pub service: MissionService,
    pub stores: Stores,
    pub transport: Arc<RecordingTransport>,
    pub backend: Arc<ScriptedBackend>,
    pub extractor: Arc<ScriptedExtractor>,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_stores(EngineConfig::new().with_ai_limits(1, 2), Stores::in_memory())
    }

    /// Harness over existing stores, e.g. to simulate a restart
    #[must_use]
    pub fn with_stores(config: EngineConfig, stores: Stores) -> Self {
        let transport = Arc::new(RecordingTransport::new());
        let backend = Arc::new(ScriptedBackend::new());
        let extractor = Arc::new(ScriptedExtractor::new());
        let service = MissionService::new(
            config,
            stores,
            Arc::new(fixture_catalog()),
            transport.clone(),
            backend.clone(),
            extractor.clone(),
        );
        Self {
            stores: service.stores().clone(),
            service,
            transport,
            backend,
            extractor,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
