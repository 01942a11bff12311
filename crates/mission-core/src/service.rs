//! Mission service: event dispatch
//!
//! Each handler follows the same shape:
//! 1. enter the user's domain and read-modify-write the record
//! 2. leave the domain
//! 3. talk to the outside world (transport, AI, backend)
//!
//! No lock is ever held across step 3.

use crate::collaborators::{Action, Backend, Extractor, RequirementsCatalog, Transport};
use crate::config::EngineConfig;
use crate::domain::{Domains, ReplacementIntent};
use crate::error::{MissionError, MissionResult};
use crate::event::{EventKind, EventOutcome, InboundEvent};
use crate::extract::BoundedExtractor;
use crate::messages;
use crate::recovery::{
    close_prompt, ConfirmPayload, CoverPayload, LiveHandler, PromptRegistry, QuizPayload, RecoveryReport, ReplacePayload,
    StartPayload,
};
use crate::submission::{book_item_of_slot, rewind_book_progress, Submitter};
use mission_engine::messages::step_prompt;
use mission_engine::{
    apply_replacement, ingest_media, ingest_text, next_step, phase_for, resolve_step, validate_transition, IngestError,
    MediaOutcome, TransitionError,
};
use mission_store::Stores;
use mission_types::{
    Attachment, ContentKind, MissionCategory, MissionFlow, MissionId, MissionRecord, MissionSpec, PromptRef,
    SessionPhase, Step, Upload, UserId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A committed edit
#[derive(Debug)]
struct Edited {
    spec: MissionSpec,
    step: Step,
    snapshot: MissionRecord,
}

/// The mission engine as seen by the transport layer
#[derive(Clone)]
pub struct MissionService {
    config: Arc<EngineConfig>,
    stores: Stores,
    catalog: Arc<dyn RequirementsCatalog>,
    transport: Arc<dyn Transport>,
    extractor: BoundedExtractor,
    submitter: Submitter,
    registry: PromptRegistry,
    domains: Arc<Domains>,
}

impl std::fmt::Debug for MissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionService")
            .field("stores", &self.stores)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl MissionService {
    /// Wire the service to its stores and collaborators
    #[must_use]
    pub fn new(
        config: EngineConfig,
        stores: Stores,
        catalog: Arc<dyn RequirementsCatalog>,
        transport: Arc<dyn Transport>,
        backend: Arc<dyn Backend>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let stores = stores.with_entry_limits(config.max_entries_per_user, config.prompt_ttl());
        let registry = PromptRegistry::new(stores.entries.clone());
        let submitter = Submitter::new(stores.sessions.clone(), backend, config.backend_timeout());
        let extractor = BoundedExtractor::new(extractor, config.ai_timeout(), config.ai_max_attempts);

        Self {
            config: Arc::new(config),
            stores,
            catalog,
            transport,
            extractor,
            submitter,
            registry,
            domains: Arc::new(Domains::new()),
        }
    }

    /// Durable tables
    #[inline]
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Live prompt handlers
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &PromptRegistry {
        &self.registry
    }

    /// Rebuild live prompt handlers after a restart
    pub async fn recover(&self) -> MissionResult<RecoveryReport> {
        self.registry.recover(self.transport.as_ref()).await
    }

    /// Dispatch one inbound event.
    ///
    /// Failures are reported to the user and returned; none of them is fatal
    /// to the service.
    pub async fn handle_event(&self, event: InboundEvent) -> MissionResult<EventOutcome> {
        let user = event.user_id;
        let result = match event.kind {
            EventKind::Attachments { uploads } => self.handle_attachments(&user, uploads).await,
            EventKind::Text { text } => self.handle_text(&user, &text).await,
            EventKind::Action {
                prompt_ref,
                action,
                payload,
            } => self.handle_action(&user, &prompt_ref, &action, &payload).await,
        };

        if let Err(err) = &result {
            if err.is_retryable() {
                warn!(user = %user, error = %err, "event failed");
            } else {
                debug!(user = %user, error = %err, "event rejected");
            }
            self.notify(&user, &err.user_message()).await;
        }
        result
    }

    /// Start (or restart) a mission, replacing whatever the user had
    pub async fn start_mission(&self, user: &UserId, mission_id: MissionId) -> MissionResult<EventOutcome> {
        let spec = self.spec(mission_id)?;
        let (step, snapshot) = {
            let mut domain = self.domains.enter(user).await;
            domain.clear();

            let mut record = MissionRecord::new(user.clone(), mission_id);
            if spec.flow == MissionFlow::Questionnaire {
                record.current_question_index = Some(0);
            }
            let step = refresh(&spec, &mut record)?;
            record.revision = self.stores.sessions.put(user, record.clone()).await?;
            (step, record)
        };

        if spec.flow == MissionFlow::Questionnaire {
            self.stores.quizzes.clear(user).await?;
        }
        info!(user = %user, mission = %mission_id, flow = ?spec.flow, "mission started");
        self.notify(user, &messages::mission_intro(&spec.name)).await;
        self.follow_up(user, &spec, step, snapshot).await
    }

    /// Send a mission introduction with a start button
    pub async fn announce_mission(&self, user: &UserId, mission_id: MissionId) -> MissionResult<PromptRef> {
        let spec = self.spec(mission_id)?;
        let actions = [Action::new("start", messages::LABEL_START)];
        let prompt = self
            .transport
            .send_prompt(user, &messages::mission_intro(&spec.name), &actions)
            .await?;
        self.issue(
            user,
            prompt.clone(),
            LiveHandler::MissionStart {
                mission_id,
                payload: StartPayload { name: spec.name },
            },
        )
        .await?;
        Ok(prompt)
    }

    /// Arm a one-shot replacement of a 1-based item
    pub async fn request_replacement(&self, user: &UserId, target: usize) -> MissionResult<EventOutcome> {
        {
            let mut domain = self.domains.enter(user).await;
            let record = self.active_record(user).await?;
            domain.set_replacement(ReplacementIntent {
                mission_id: record.mission_id,
                target,
            });
        }
        debug!(user = %user, target, "replacement armed");
        self.notify(user, &messages::upload_replacement(target)).await;
        Ok(EventOutcome::AwaitingReplacement(target))
    }

    /// Send a picker of existing items to replace
    pub async fn offer_replacement(&self, user: &UserId) -> MissionResult<PromptRef> {
        let record = self.active_record(user).await?;
        let slots = record.attachment_count();
        if slots == 0 {
            return Err(IngestError::invariant(mission_engine::messages::replacement_out_of_range(1, 0)).into());
        }
        let actions: Vec<Action> = (1..=slots)
            .map(|i| Action::new(i.to_string(), format!("{} {i}", messages::LABEL_REPLACE)))
            .collect();
        let prompt = self
            .transport
            .send_prompt(user, &messages::pick_replacement(slots), &actions)
            .await?;
        self.issue(
            user,
            prompt.clone(),
            LiveHandler::ReplacePicker {
                mission_id: record.mission_id,
                payload: ReplacePayload { slots },
            },
        )
        .await?;
        Ok(prompt)
    }

    /// Ask a questionnaire question with fixed options
    pub async fn ask_question(&self, user: &UserId, question: QuizPayload) -> MissionResult<PromptRef> {
        let record = self.active_record(user).await?;
        let actions: Vec<Action> = question
            .options
            .iter()
            .map(|option| Action::new(option.clone(), option.clone()))
            .collect();
        let prompt = self.transport.send_prompt(user, &question.text, &actions).await?;
        self.issue(
            user,
            prompt.clone(),
            LiveHandler::QuizQuestion {
                mission_id: record.mission_id,
                payload: question,
            },
        )
        .await?;
        Ok(prompt)
    }

    /// Offer the uploaded pages of a book as cover candidates
    pub async fn offer_cover_choice(&self, user: &UserId) -> MissionResult<PromptRef> {
        let record = self.active_record(user).await?;
        if record.attachments.is_empty() {
            return Err(IngestError::invariant(mission_engine::messages::replacement_out_of_range(1, 0)).into());
        }
        let options: Vec<Upload> = record
            .attachments
            .iter()
            .map(|a| Upload::new(a.id.clone(), a.filename.clone(), a.url.clone()).with_kind(a.kind))
            .collect();
        let actions: Vec<Action> = (0..options.len())
            .map(|i| Action::new(i.to_string(), messages::cover_option(i)))
            .collect();
        let prompt = self.transport.send_prompt(user, messages::PICK_COVER, &actions).await?;
        self.issue(
            user,
            prompt.clone(),
            LiveHandler::BookCoverPicker {
                mission_id: record.mission_id,
                payload: CoverPayload { options },
            },
        )
        .await?;
        Ok(prompt)
    }

    /// Confirm and submit the current mission
    pub async fn submit(&self, user: &UserId) -> MissionResult<EventOutcome> {
        let (spec, snapshot) = {
            let _domain = self.domains.enter(user).await;
            let record = self.active_record(user).await?;
            (self.spec(record.mission_id)?, record)
        };
        if !matches!(resolve_step(&spec, &snapshot), Step::Ready | Step::AwaitConfirmation) {
            return Err(MissionError::NotReady(spec.id));
        }
        self.submit_snapshot(user, &spec, &snapshot).await
    }

    /// Next step of the user's mission
    pub async fn current_step(&self, user: &UserId) -> MissionResult<Step> {
        let record = self.active_record(user).await?;
        let spec = self.spec(record.mission_id)?;
        Ok(resolve_step(&spec, &record))
    }

    async fn handle_attachments(&self, user: &UserId, uploads: Vec<Upload>) -> MissionResult<EventOutcome> {
        let edited = {
            let mut domain = self.domains.enter(user).await;
            let intent = domain.take_replacement();
            self.edit(user, None, move |spec, record| {
                match intent.filter(|intent| intent.mission_id == record.mission_id) {
                    Some(intent) => replace_item(spec, record, intent.target, uploads)?,
                    None => ingest_uploads(spec, record, uploads)?,
                }
                Ok(())
            })
            .await?
        };
        self.follow_up(user, &edited.spec, edited.step, edited.snapshot).await
    }

    async fn handle_text(&self, user: &UserId, text: &str) -> MissionResult<EventOutcome> {
        let policy = self.config.text;
        let edited = {
            let _domain = self.domains.enter(user).await;
            self.edit(user, None, |spec, record| {
                prepare_answer_slot(spec, record)?;
                let outcome = ingest_text(spec.category, &policy, spec.requirements.aside_text, record, text)?;
                if spec.flow == MissionFlow::Book {
                    rewind_book_progress(record, book_item_of_slot(outcome.slot));
                }
                Ok(())
            })
            .await?
        };

        let edited = if edited.spec.category == MissionCategory::RelationOrIdentity {
            self.enrich_relation(user, text, edited).await?
        } else {
            edited
        };
        self.follow_up(user, &edited.spec, edited.step, edited.snapshot).await
    }

    /// Fill the record's scalar fields from an identity answer. Extraction
    /// failure is soft: the user gets an apology and the mission continues.
    async fn enrich_relation(&self, user: &UserId, text: &str, edited: Edited) -> MissionResult<Edited> {
        let mission = edited.spec.id;
        let fields = match self.extractor.relation_fields(text).await {
            Ok(fields) => fields,
            Err(err) => {
                warn!(user = %user, mission = %mission, error = %err, "relation extraction failed");
                self.notify(user, messages::AI_APOLOGY).await;
                return Ok(edited);
            }
        };

        let _domain = self.domains.enter(user).await;
        self.edit(user, Some(mission), move |_, record| {
            if fields.baby_name.is_some() {
                record.baby_name = fields.baby_name;
            }
            if fields.relation_or_identity.is_some() {
                record.relation_or_identity = fields.relation_or_identity;
            }
            Ok(())
        })
        .await
    }

    async fn handle_action(
        &self,
        user: &UserId,
        prompt_ref: &PromptRef,
        action: &str,
        payload: &serde_json::Value,
    ) -> MissionResult<EventOutcome> {
        let binding = self
            .registry
            .lookup(prompt_ref)
            .await
            .filter(|binding| &binding.user_id == user)
            .ok_or_else(|| MissionError::ExpiredPrompt(prompt_ref.clone()))?;
        debug!(user = %user, prompt = %prompt_ref, task = %binding.handler.task_type(), action, "prompt action");

        let outcome = match &binding.handler {
            LiveHandler::MissionStart { mission_id, .. } => self.start_mission(user, *mission_id).await?,
            LiveHandler::ConfirmSubmission { mission_id, .. } => {
                self.ensure_mission(user, *mission_id).await?;
                if action == "submit" {
                    self.submit(user).await?
                } else {
                    self.notify(user, messages::KEEP_EDITING).await;
                    EventOutcome::Next(self.current_step(user).await?)
                }
            }
            LiveHandler::ReplacePicker { mission_id, payload: picker } => {
                self.ensure_mission(user, *mission_id).await?;
                let target = selected_index(action, payload)
                    .filter(|target| (1..=picker.slots).contains(target))
                    .ok_or_else(|| {
                        IngestError::invariant(mission_engine::messages::replacement_out_of_range(
                            selected_index(action, payload).unwrap_or(0),
                            picker.slots,
                        ))
                    })?;
                self.request_replacement(user, target).await?
            }
            LiveHandler::QuizQuestion { mission_id, payload: question } => {
                self.answer_question(user, *mission_id, question, action).await?
            }
            LiveHandler::BookCoverPicker { mission_id, payload: cover } => {
                let index = selected_index(action, payload);
                self.choose_cover(user, *mission_id, cover, index).await?
            }
        };

        if self.registry.resolve(user, prompt_ref).await?.is_some() {
            self.edit_prompt(prompt_ref, messages::PROMPT_HANDLED).await;
        }
        Ok(outcome)
    }

    async fn answer_question(
        &self,
        user: &UserId,
        mission_id: MissionId,
        question: &QuizPayload,
        answer: &str,
    ) -> MissionResult<EventOutcome> {
        let required = self.spec(mission_id)?.requirements.aside_text;
        if question.question >= required {
            return Err(IngestError::invariant(messages::unknown_question(question.question, required)).into());
        }

        let correct = question.correct.as_deref() == Some(answer);
        self.stores
            .quizzes
            .record_answer(user, mission_id, question.question, answer, correct)
            .await?;

        let edited = {
            let _domain = self.domains.enter(user).await;
            self.edit(user, Some(mission_id), |_, record| {
                record.set_aside_text(question.question, answer);
                Ok(())
            })
            .await?
        };

        self.notify(user, messages::quiz_answered(correct)).await;
        self.follow_up(user, &edited.spec, edited.step, edited.snapshot).await
    }

    async fn choose_cover(
        &self,
        user: &UserId,
        mission_id: MissionId,
        cover: &CoverPayload,
        index: Option<usize>,
    ) -> MissionResult<EventOutcome> {
        let chosen = index
            .and_then(|i| cover.options.get(i))
            .cloned()
            .ok_or_else(|| {
                IngestError::invariant(mission_engine::messages::replacement_out_of_range(
                    index.map_or(0, |i| i + 1),
                    cover.options.len(),
                ))
            })?;

        let edited = {
            let _domain = self.domains.enter(user).await;
            self.edit(user, Some(mission_id), move |_, record| {
                record.cover = Some(Attachment::from_upload(0, chosen));
                record.set_message(messages::COVER_SAVED);
                rewind_book_progress(record, 0);
                Ok(())
            })
            .await?
        };
        self.follow_up(user, &edited.spec, edited.step, edited.snapshot).await
    }

    /// Edit the user's record; the caller holds the user's domain.
    ///
    /// The edit runs on a draft. On success the draft is committed with
    /// refreshed flags and phase; on failure only its status message is kept.
    /// The returned snapshot carries the revision it was stored under.
    async fn edit<F>(&self, user: &UserId, mission: Option<MissionId>, f: F) -> MissionResult<Edited>
    where
        F: FnOnce(&MissionSpec, &mut MissionRecord) -> MissionResult<()> + Send,
    {
        let catalog = Arc::clone(&self.catalog);
        let (result, revision) = self
            .stores
            .sessions
            .update_tracked(user, |slot| -> MissionResult<Edited> {
                let record = match mission {
                    Some(mission_id) => active_for(slot, user, mission_id)?,
                    None => slot.as_mut().ok_or_else(|| MissionError::NoActiveMission(user.clone()))?,
                };
                let spec = lookup(catalog.as_ref(), record.mission_id)?;

                let mut draft = record.clone();
                draft.message = None;
                let step = f(&spec, &mut draft).and_then(|()| Ok(refresh(&spec, &mut draft)?));
                match step {
                    Ok(step) => {
                        *record = draft;
                        Ok(Edited {
                            spec,
                            step,
                            snapshot: record.clone(),
                        })
                    }
                    Err(err) => {
                        record.message = draft.message;
                        Err(err)
                    }
                }
            })
            .await?;

        let mut edited = result?;
        if let Some(revision) = revision {
            edited.snapshot.revision = revision;
        }
        Ok(edited)
    }

    /// Tell the user what happened and what comes next
    async fn follow_up(
        &self,
        user: &UserId,
        spec: &MissionSpec,
        step: Step,
        snapshot: MissionRecord,
    ) -> MissionResult<EventOutcome> {
        if let Some(message) = &snapshot.message {
            self.notify(user, message).await;
        }
        match step {
            Step::Ready => self.submit_snapshot(user, spec, &snapshot).await,
            Step::AwaitConfirmation => {
                self.ask_confirmation(user, spec, &snapshot).await?;
                Ok(EventOutcome::Next(step))
            }
            _ => {
                let prompt = step_prompt(spec.flow, spec.requirements.media_kind(), step);
                self.notify(user, &prompt).await;
                Ok(EventOutcome::Next(step))
            }
        }
    }

    async fn ask_confirmation(&self, user: &UserId, spec: &MissionSpec, snapshot: &MissionRecord) -> MissionResult<()> {
        let summary = messages::confirm_summary(snapshot.attachment_count(), snapshot.answered_count());
        let actions = [
            Action::new("submit", messages::LABEL_SUBMIT),
            Action::new("edit", messages::LABEL_EDIT),
        ];
        let prompt = match self.transport.send_prompt(user, &summary, &actions).await {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(user = %user, mission = %spec.id, error = %err, "confirmation prompt not delivered");
                return Ok(());
            }
        };
        self.issue(
            user,
            prompt,
            LiveHandler::ConfirmSubmission {
                mission_id: spec.id,
                payload: ConfirmPayload {
                    attachments: snapshot.attachment_count(),
                },
            },
        )
        .await
    }

    async fn submit_snapshot(
        &self,
        user: &UserId,
        spec: &MissionSpec,
        snapshot: &MissionRecord,
    ) -> MissionResult<EventOutcome> {
        validate_transition(snapshot.phase, SessionPhase::Submitted)?;
        self.submitter.submit(spec, snapshot).await?;

        self.domains.enter(user).await.clear();
        if let Some(entry) = self.registry.forget_mission(user, spec.id).await? {
            self.edit_prompt(&entry.prompt_ref, messages::PROMPT_SUBMITTED).await;
        }
        self.notify(user, messages::SUBMITTED).await;
        Ok(EventOutcome::Submitted)
    }

    /// Bind a sent prompt and close the prompts it displaced
    async fn issue(&self, user: &UserId, prompt: PromptRef, handler: LiveHandler) -> MissionResult<()> {
        for displaced in self.registry.issue(user, prompt, handler).await? {
            close_prompt(self.transport.as_ref(), &displaced.prompt_ref).await;
        }
        Ok(())
    }

    /// Fire-and-forget prompt edit
    async fn edit_prompt(&self, prompt: &PromptRef, content: &str) {
        if let Err(err) = self.transport.edit(prompt, content).await {
            warn!(prompt = %prompt, error = %err, "prompt edit failed");
        }
    }

    /// Fire-and-forget send
    async fn notify(&self, user: &UserId, content: &str) {
        if let Err(err) = self.transport.send(user, content).await {
            warn!(user = %user, error = %err, "send failed");
        }
    }

    fn spec(&self, mission_id: MissionId) -> MissionResult<MissionSpec> {
        lookup(self.catalog.as_ref(), mission_id)
    }

    async fn active_record(&self, user: &UserId) -> MissionResult<MissionRecord> {
        self.stores
            .sessions
            .get(user)
            .await?
            .ok_or_else(|| MissionError::NoActiveMission(user.clone()))
    }

    async fn ensure_mission(&self, user: &UserId, mission_id: MissionId) -> MissionResult<()> {
        let record = self.active_record(user).await?;
        if record.mission_id == mission_id {
            Ok(())
        } else {
            Err(MissionError::MissionMismatch {
                active: record.mission_id,
                requested: mission_id,
            })
        }
    }
}

fn lookup(catalog: &dyn RequirementsCatalog, mission_id: MissionId) -> MissionResult<MissionSpec> {
    catalog
        .get(mission_id)
        .cloned()
        .ok_or(MissionError::UnknownMission(mission_id))
}

fn active_for<'a>(
    slot: &'a mut Option<MissionRecord>,
    user: &UserId,
    mission_id: MissionId,
) -> MissionResult<&'a mut MissionRecord> {
    let record = slot.as_mut().ok_or_else(|| MissionError::NoActiveMission(user.clone()))?;
    if record.mission_id == mission_id {
        Ok(record)
    } else {
        Err(MissionError::MissionMismatch {
            active: record.mission_id,
            requested: mission_id,
        })
    }
}

/// Sync derived flags and phase with the record's content
fn refresh(spec: &MissionSpec, record: &mut MissionRecord) -> Result<Step, TransitionError> {
    if let Step::AwaitAnswer(slot) = next_step(spec, record) {
        record.current_question_index = Some(slot);
    }
    let step = resolve_step(spec, record);
    let phase = phase_for(spec, record);
    validate_transition(record.phase, phase)?;
    record.phase = phase;
    record.is_ready = matches!(step, Step::Ready | Step::AwaitConfirmation);
    Ok(step)
}

/// Uploads without a pending replacement
fn ingest_uploads(spec: &MissionSpec, record: &mut MissionRecord, uploads: Vec<Upload>) -> Result<(), IngestError> {
    let mut uploads = uploads.into_iter().peekable();
    let mut cover_saved = false;
    if spec.flow == MissionFlow::Book && record.cover.is_none() {
        if let Some(cover) = uploads.next() {
            record.cover = Some(Attachment::from_upload(0, cover));
            record.set_message(messages::COVER_SAVED);
            rewind_book_progress(record, 0);
            cover_saved = true;
        }
        if uploads.peek().is_none() {
            return Ok(());
        }
    }

    let mut batches: Vec<(ContentKind, Vec<Upload>)> = Vec::new();
    for upload in uploads {
        match batches.iter_mut().find(|(kind, _)| *kind == upload.kind) {
            Some((_, batch)) => batch.push(upload),
            None => batches.push((upload.kind, vec![upload])),
        }
    }
    if batches.is_empty() {
        return Err(IngestError::validation(mission_engine::messages::EMPTY_BATCH));
    }

    for (kind, batch) in batches {
        let outcome = ingest_media(kind, spec.requirements.required(kind), record, batch)?;
        if let (MissionFlow::Book, MediaOutcome::Replaced { slot }) = (spec.flow, outcome) {
            rewind_book_progress(record, book_item_of_slot(slot));
        }
    }
    if cover_saved && record.message.is_none() {
        record.set_message(messages::COVER_SAVED);
    }
    Ok(())
}

/// Upload that answers a pending replacement
fn replace_item(
    spec: &MissionSpec,
    record: &mut MissionRecord,
    target: usize,
    uploads: Vec<Upload>,
) -> Result<(), IngestError> {
    let newest = uploads
        .into_iter()
        .last()
        .ok_or_else(|| IngestError::validation(mission_engine::messages::EMPTY_BATCH))?;
    let slot = apply_replacement(record, target, newest)?;
    if spec.flow == MissionFlow::Book {
        rewind_book_progress(record, book_item_of_slot(slot));
    }
    Ok(())
}

/// Point `current_question_index` at the slot a text answer should fill
fn prepare_answer_slot(spec: &MissionSpec, record: &mut MissionRecord) -> Result<(), IngestError> {
    if let Step::AwaitAnswer(slot) = next_step(spec, record) {
        record.current_question_index = Some(slot);
        return Ok(());
    }
    match (spec.flow, spec.requirements.media_kind()) {
        (MissionFlow::Questionnaire, _) | (_, None) => Ok(()),
        (MissionFlow::Paired | MissionFlow::Book, Some(kind)) => match record.attachment_count().checked_sub(1) {
            // Text while media is expected edits the latest caption
            Some(last) => {
                record.current_question_index = Some(last);
                Ok(())
            }
            None => Err(IngestError::validation(messages::media_first(kind.label()))),
        },
    }
}

/// Numeric choice carried by an action id or its payload
fn selected_index(action: &str, payload: &serde_json::Value) -> Option<usize> {
    action.trim().parse().ok().or_else(|| {
        payload
            .get("index")
            .and_then(serde_json::Value::as_u64)
            .and_then(|i| usize::try_from(i).ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_types::MissionRequirements;

    fn record() -> MissionRecord {
        MissionRecord::new(UserId::new("U1"), MissionId(1))
    }

    #[test]
    fn text_before_any_photo_is_rejected() {
        let spec = MissionSpec::new(MissionId(1), "bath", MissionRequirements::photos(2, 2));
        let mut r = record();
        r.push_attachment(Upload::from_url("p0"));
        r.set_aside_text(0, "t0");
        assert!(prepare_answer_slot(&spec, &mut r).is_ok());
        assert_eq!(r.current_question_index, Some(0));

        let mut empty = record();
        let err = prepare_answer_slot(&spec, &mut empty).unwrap_err();
        assert!(err.user_message().contains("照片"));
    }

    #[test]
    fn book_takes_first_upload_as_cover() {
        let spec = MissionSpec::new(MissionId(1), "book", MissionRequirements::photos(2, 2)).with_flow(MissionFlow::Book);
        let mut r = record();

        ingest_uploads(&spec, &mut r, vec![Upload::from_url("cover"), Upload::from_url("p0")]).unwrap();

        assert_eq!(r.cover.as_ref().map(|c| c.url.as_str()), Some("cover"));
        assert_eq!(r.attachment_count(), 1);
    }

    #[test]
    fn selected_index_reads_action_then_payload() {
        assert_eq!(selected_index("3", &serde_json::Value::Null), Some(3));
        assert_eq!(selected_index("pick", &serde_json::json!({"index": 2})), Some(2));
        assert_eq!(selected_index("pick", &serde_json::Value::Null), None);
    }

    #[test]
    fn refresh_moves_back_to_collecting_after_replacement() {
        let spec = MissionSpec::new(MissionId(1), "bath", MissionRequirements::photos(1, 1));
        let mut r = record();
        r.push_attachment(Upload::from_url("p0"));
        r.set_aside_text(0, "t0");
        assert_eq!(refresh(&spec, &mut r).unwrap(), Step::AwaitConfirmation);
        assert_eq!(r.phase, SessionPhase::AwaitingConfirmation);

        r.replace_attachment(0, Upload::from_url("p0b"));
        assert_eq!(refresh(&spec, &mut r).unwrap(), Step::AwaitAnswer(0));
        assert_eq!(r.phase, SessionPhase::Collecting);
        assert!(!r.is_ready);
    }
}
