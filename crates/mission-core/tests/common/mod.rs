//! Helpers shared by the service integration tests

#![allow(dead_code)]

use mission_core::{EventOutcome, InboundEvent, MissionResult};
use mission_test_utils::Harness;
use mission_types::{MissionId, MissionRecord, PromptRef, Upload, UserId};

pub async fn start(h: &Harness, user: &str, mission: MissionId) -> EventOutcome {
    h.service.start_mission(&UserId::new(user), mission).await.unwrap()
}

pub async fn upload(h: &Harness, user: &str, uploads: Vec<Upload>) -> MissionResult<EventOutcome> {
    h.service.handle_event(InboundEvent::attachments(user, uploads)).await
}

pub async fn say(h: &Harness, user: &str, text: &str) -> MissionResult<EventOutcome> {
    h.service.handle_event(InboundEvent::text(user, text)).await
}

pub async fn click(h: &Harness, user: &str, prompt: &PromptRef, action: &str) -> MissionResult<EventOutcome> {
    h.service
        .handle_event(InboundEvent::action(user, prompt.clone(), action))
        .await
}

pub async fn record(h: &Harness, user: &str) -> Option<MissionRecord> {
    h.stores.sessions.get(&UserId::new(user)).await.unwrap()
}

/// Reference of the most recent interactive prompt
pub fn last_prompt(h: &Harness) -> PromptRef {
    h.transport.last_prompt().expect("a prompt was sent").prompt_ref
}
