//! End-to-end mission flows through `MissionService::handle_event`

mod common;

use common::{click, last_prompt, record, say, start, upload};
use mission_core::{messages, EventOutcome, GenerationTarget, MissionError, QuizPayload};
use mission_engine::{IngestError, SKIP_PLACEHOLDER};
use mission_test_utils::{media, photo, Harness, ALBUM, BATH, KEEPSAKE, LETTER, PHOTOS_ONLY, QUIZ, RELATION};
use mission_types::{ContentKind, SessionPhase, Step, UserId};
use pretty_assertions::assert_eq;

const U1: &str = "U1";

fn next(step: Step) -> EventOutcome {
    EventOutcome::Next(step)
}

/// Drive the two-photo mission up to its confirmation prompt
async fn fill_bath(h: &Harness) {
    start(h, U1, BATH).await;
    upload(h, U1, vec![photo(0)]).await.unwrap();
    say(h, U1, "first splash").await.unwrap();
    upload(h, U1, vec![photo(1)]).await.unwrap();
    assert_eq!(say(h, U1, "all clean").await.unwrap(), next(Step::AwaitConfirmation));
}

// ============================================================================
// Paired interleave
// ============================================================================

#[tokio::test]
async fn paired_mission_interleaves_photos_and_answers() {
    let h = Harness::new();

    assert_eq!(start(&h, U1, BATH).await, next(Step::AwaitPhoto(0)));
    assert_eq!(upload(&h, U1, vec![photo(0)]).await.unwrap(), next(Step::AwaitAnswer(0)));
    assert_eq!(say(&h, U1, "first splash").await.unwrap(), next(Step::AwaitPhoto(1)));
    assert_eq!(upload(&h, U1, vec![photo(1)]).await.unwrap(), next(Step::AwaitAnswer(1)));
    assert_eq!(say(&h, U1, "all clean").await.unwrap(), next(Step::AwaitConfirmation));

    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.phase, SessionPhase::AwaitingConfirmation);
    assert!(r.is_ready);

    let prompt = h.transport.last_prompt().unwrap();
    let actions: Vec<_> = prompt.actions.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(actions, vec!["submit", "edit"]);

    assert_eq!(click(&h, U1, &prompt.prompt_ref, "submit").await.unwrap(), EventOutcome::Submitted);
    assert!(record(&h, U1).await.is_none());

    let updates = h.backend.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].aside_text.as_deref(), Some("first splash|all clean"));
    let urls: Vec<_> = updates[0].attachments.as_ref().unwrap().iter().map(|a| a.url.clone()).collect();
    assert_eq!(urls, vec![photo(0).url, photo(1).url]);
    assert_eq!(h.backend.generations(), vec![(UserId::new(U1), GenerationTarget::Mission(BATH))]);
    assert!(h.transport.said(U1, messages::SUBMITTED));
}

#[tokio::test]
async fn batch_of_photos_is_captioned_in_order() {
    let h = Harness::new();
    start(&h, U1, BATH).await;

    assert_eq!(upload(&h, U1, vec![photo(0), photo(1)]).await.unwrap(), next(Step::AwaitAnswer(0)));
    assert_eq!(say(&h, U1, "one").await.unwrap(), next(Step::AwaitAnswer(1)));
    assert_eq!(say(&h, U1, "two").await.unwrap(), next(Step::AwaitConfirmation));

    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.aside_text(0), Some("one"));
    assert_eq!(r.aside_text(1), Some("two"));
}

#[tokio::test]
async fn text_while_awaiting_a_photo_edits_the_latest_caption() {
    let h = Harness::new();
    start(&h, U1, BATH).await;
    upload(&h, U1, vec![photo(0)]).await.unwrap();
    say(&h, U1, "draft").await.unwrap();

    assert_eq!(say(&h, U1, "final").await.unwrap(), next(Step::AwaitPhoto(1)));
    assert_eq!(record(&h, U1).await.unwrap().aside_text(0), Some("final"));
}

#[tokio::test]
async fn text_before_any_photo_is_rejected() {
    let h = Harness::new();
    start(&h, U1, BATH).await;

    let err = say(&h, U1, "hello").await.unwrap_err();

    assert!(matches!(err, MissionError::Ingest(IngestError::Validation { .. })));
    assert!(h.transport.said(U1, "請先上傳照片"));
    assert!(!record(&h, U1).await.unwrap().has_any_aside_text());
}

#[tokio::test]
async fn skipped_caption_still_advances_and_is_sent_empty() {
    let h = Harness::new();
    start(&h, U1, BATH).await;
    upload(&h, U1, vec![photo(0)]).await.unwrap();

    assert_eq!(say(&h, U1, "skip").await.unwrap(), next(Step::AwaitPhoto(1)));
    assert_eq!(record(&h, U1).await.unwrap().aside_text(0), Some(SKIP_PLACEHOLDER));

    upload(&h, U1, vec![photo(1)]).await.unwrap();
    assert_eq!(say(&h, U1, "second").await.unwrap(), next(Step::AwaitConfirmation));
    click(&h, U1, &last_prompt(&h), "submit").await.unwrap();

    assert_eq!(h.backend.updates()[0].aside_text.as_deref(), Some("|second"));
}

// ============================================================================
// Capacity and replacement
// ============================================================================

#[tokio::test]
async fn overflowing_batch_is_rejected_whole() {
    let h = Harness::new();
    start(&h, U1, PHOTOS_ONLY).await;
    assert_eq!(upload(&h, U1, vec![photo(0), photo(1)]).await.unwrap(), next(Step::AwaitPhoto(2)));

    let err = upload(&h, U1, vec![photo(2), photo(3)]).await.unwrap_err();

    assert!(matches!(
        err,
        MissionError::Ingest(IngestError::Capacity {
            required: 3,
            current: 2,
            incoming: 2,
            ..
        })
    ));
    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.attachment_count(), 2);
    assert!(r.message.as_deref().unwrap_or_default().contains("上限 3"));
    assert!(h.transport.said(U1, "上限 3"));

    // Photo-only general missions need no confirmation
    assert_eq!(upload(&h, U1, vec![photo(2)]).await.unwrap(), EventOutcome::Submitted);
    let updates = h.backend.updates();
    assert_eq!(updates[0].attachments.as_ref().map(Vec::len), Some(3));
    assert_eq!(updates[0].aside_text, None);
}

#[tokio::test]
async fn upload_past_requirement_replaces_last_slot() {
    let h = Harness::new();
    start(&h, U1, BATH).await;
    upload(&h, U1, vec![photo(0)]).await.unwrap();
    say(&h, U1, "a").await.unwrap();
    upload(&h, U1, vec![photo(1)]).await.unwrap();

    assert_eq!(upload(&h, U1, vec![photo(9)]).await.unwrap(), next(Step::AwaitAnswer(1)));

    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.attachment_count(), 2);
    assert_eq!(r.attachments[1].url, photo(9).url);
    assert!(h.transport.said(U1, "已替換第 2 張照片"));
}

#[tokio::test]
async fn requested_replacement_reopens_the_item() {
    let h = Harness::new();
    fill_bath(&h).await;
    let user = UserId::new(U1);

    assert_eq!(
        h.service.request_replacement(&user, 1).await.unwrap(),
        EventOutcome::AwaitingReplacement(1)
    );
    assert!(h.transport.said(U1, "請上傳要替換第 1 項"));

    assert_eq!(upload(&h, U1, vec![photo(7)]).await.unwrap(), next(Step::AwaitAnswer(0)));

    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.attachments[0].url, photo(7).url);
    assert_eq!(r.aside_text(0), None);
    assert_eq!(r.aside_text(1), Some("all clean"));
    assert_eq!(r.phase, SessionPhase::Collecting);
    assert!(!r.is_ready);
}

#[tokio::test]
async fn replacement_picker_arms_the_chosen_item() {
    let h = Harness::new();
    fill_bath(&h).await;

    let picker = h.service.offer_replacement(&UserId::new(U1)).await.unwrap();
    let ids: Vec<_> = h.transport.last_prompt().unwrap().actions.into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec!["1", "2"]);

    assert!(click(&h, U1, &picker, "7").await.is_err());
    assert_eq!(click(&h, U1, &picker, "2").await.unwrap(), EventOutcome::AwaitingReplacement(2));
    upload(&h, U1, vec![photo(8)]).await.unwrap();

    assert_eq!(record(&h, U1).await.unwrap().attachments[1].url, photo(8).url);
}

#[tokio::test]
async fn out_of_range_replacement_is_consumed() {
    let h = Harness::new();
    fill_bath(&h).await;
    h.service.request_replacement(&UserId::new(U1), 5).await.unwrap();

    let err = upload(&h, U1, vec![photo(5)]).await.unwrap_err();

    assert!(matches!(err, MissionError::Ingest(IngestError::Invariant { .. })));
    assert!(h.transport.said(U1, "無法替換第 5 項"));
    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.attachments[0].url, photo(0).url);
    assert_eq!(r.attachments[1].url, photo(1).url);

    // The intent is gone: the next upload follows the normal capacity rule
    assert_eq!(upload(&h, U1, vec![photo(6)]).await.unwrap(), next(Step::AwaitAnswer(1)));
    assert_eq!(record(&h, U1).await.unwrap().attachments[1].url, photo(6).url);
}

// ============================================================================
// Text policy and confirmation gate
// ============================================================================

#[tokio::test]
async fn general_answer_is_normalized_and_line_capped() {
    let h = Harness::new();
    start(&h, U1, BATH).await;
    upload(&h, U1, vec![photo(0)]).await.unwrap();

    let err = say(&h, U1, "第一行\n第二行\n第三行").await.unwrap_err();
    assert!(matches!(err, MissionError::Ingest(IngestError::Validation { .. })));
    assert!(h.transport.said(U1, "2 行以內"));
    assert_eq!(record(&h, U1).await.unwrap().aside_text(0), None);

    say(&h, U1, "  好   開心!!!  ").await.unwrap();
    assert_eq!(record(&h, U1).await.unwrap().aside_text(0), Some("好 開心!"));
}

#[tokio::test]
async fn identity_answer_is_stored_verbatim() {
    let h = Harness::new();
    assert_eq!(start(&h, U1, RELATION).await, next(Step::AwaitAnswer(0)));

    let text = "第一行\n第二行\n第三行";
    assert_eq!(say(&h, U1, text).await.unwrap(), next(Step::AwaitAnswer(1)));
    assert_eq!(record(&h, U1).await.unwrap().aside_text(0), Some(text));
}

#[tokio::test]
async fn letter_is_capped_and_always_confirmed() {
    let h = Harness::new();
    assert_eq!(start(&h, U1, LETTER).await, next(Step::AwaitAnswer(0)));

    assert!(say(&h, U1, &"字".repeat(401)).await.is_err());
    assert!(h.transport.said(U1, "上限 400 字"));

    assert_eq!(say(&h, U1, "親愛的寶貝").await.unwrap(), next(Step::AwaitConfirmation));
    assert!(h.backend.updates().is_empty());
}

#[tokio::test]
async fn letter_without_text_still_needs_confirmation() {
    let h = Harness::new();
    start(&h, U1, KEEPSAKE).await;

    assert_eq!(upload(&h, U1, vec![photo(0)]).await.unwrap(), next(Step::AwaitConfirmation));
    assert_eq!(record(&h, U1).await.unwrap().phase, SessionPhase::AwaitingConfirmation);
    assert!(h.backend.updates().is_empty());
}

#[tokio::test]
async fn keep_editing_leaves_the_mission_open() {
    let h = Harness::new();
    fill_bath(&h).await;

    let outcome = click(&h, U1, &last_prompt(&h), "edit").await.unwrap();

    assert_eq!(outcome, next(Step::AwaitConfirmation));
    assert!(h.transport.said(U1, messages::KEEP_EDITING));
    assert!(record(&h, U1).await.is_some());
}

#[tokio::test]
async fn answered_prompts_are_edited_in_place() {
    let h = Harness::new();
    fill_bath(&h).await;
    let first = last_prompt(&h);

    // A newer confirmation for the same mission closes the older one
    assert_eq!(say(&h, U1, "all clean again").await.unwrap(), next(Step::AwaitConfirmation));
    let second = last_prompt(&h);
    assert_ne!(first, second);
    assert_eq!(h.transport.prompt_content(&first).as_deref(), Some(messages::PROMPT_CLOSED));

    click(&h, U1, &second, "edit").await.unwrap();
    assert_eq!(h.transport.prompt_content(&second).as_deref(), Some(messages::PROMPT_HANDLED));

    say(&h, U1, "all clean, final").await.unwrap();
    let third = last_prompt(&h);
    assert_eq!(click(&h, U1, &third, "submit").await.unwrap(), EventOutcome::Submitted);
    assert_eq!(h.transport.prompt_content(&third).as_deref(), Some(messages::PROMPT_SUBMITTED));
}

#[tokio::test]
async fn submit_before_ready_is_refused() {
    let h = Harness::new();
    start(&h, U1, BATH).await;
    upload(&h, U1, vec![photo(0)]).await.unwrap();

    let err = h.service.submit(&UserId::new(U1)).await.unwrap_err();

    assert!(matches!(err, MissionError::NotReady(id) if id == BATH));
    assert!(h.backend.updates().is_empty());
}

// ============================================================================
// Identity extraction
// ============================================================================

#[tokio::test]
async fn identity_answer_fills_scalar_fields() {
    let h = Harness::new();
    h.extractor
        .push(Ok(serde_json::json!({"baby_name": "小米", "relation": "媽媽"})));
    start(&h, U1, RELATION).await;

    assert_eq!(say(&h, U1, "我是小米的媽媽").await.unwrap(), next(Step::AwaitAnswer(1)));
    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.baby_name.as_deref(), Some("小米"));
    assert_eq!(r.relation_or_identity.as_deref(), Some("媽媽"));

    // Identity missions submit without confirmation
    assert_eq!(say(&h, U1, "她最愛洗澡").await.unwrap(), EventOutcome::Submitted);
    assert_eq!(
        h.backend.updates()[0].aside_text.as_deref(),
        Some("我是小米的媽媽|她最愛洗澡")
    );
}

#[tokio::test]
async fn failed_extraction_apologises_and_continues() {
    let h = Harness::new();
    h.extractor
        .always(Err(mission_core::ExtractError::Service("model offline".into())));
    start(&h, U1, RELATION).await;

    assert_eq!(say(&h, U1, "我是小米的媽媽").await.unwrap(), next(Step::AwaitAnswer(1)));

    assert!(h.transport.said(U1, messages::AI_APOLOGY));
    assert_eq!(h.extractor.calls(), 2);
    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.baby_name, None);
    assert_eq!(r.aside_text(0), Some("我是小米的媽媽"));
}

#[tokio::test]
async fn malformed_extraction_is_retried_before_apologising() {
    let h = Harness::new();
    h.extractor.always(Ok(serde_json::json!({"baby_name": 5})));
    start(&h, U1, RELATION).await;

    assert_eq!(say(&h, U1, "我是小米的媽媽").await.unwrap(), next(Step::AwaitAnswer(1)));

    assert_eq!(h.extractor.calls(), 2);
    assert!(h.transport.said(U1, messages::AI_APOLOGY));
    assert_eq!(record(&h, U1).await.unwrap().baby_name, None);
}

// ============================================================================
// Questionnaire
// ============================================================================

#[tokio::test]
async fn answer_to_a_question_the_mission_lacks_is_refused() {
    let h = Harness::new();
    let user = UserId::new(U1);
    start(&h, U1, QUIZ).await;
    let prompt = h
        .service
        .ask_question(
            &user,
            QuizPayload {
                question: 1000,
                text: "不存在的題目".into(),
                options: vec!["red".into()],
                correct: None,
            },
        )
        .await
        .unwrap();

    let err = click(&h, U1, &prompt, "red").await.unwrap_err();

    assert!(matches!(err, MissionError::Ingest(IngestError::Invariant { .. })));
    assert!(h.transport.said(U1, "找不到第 1001 題（共 2 題）"));
    assert!(record(&h, U1).await.unwrap().aside_texts.is_empty());
    assert!(h.stores.quizzes.get(&user).await.unwrap().is_none());
}

#[tokio::test]
async fn questionnaire_collects_kinds_in_any_order() {
    let h = Harness::new();
    let user = UserId::new(U1);
    assert_eq!(start(&h, U1, QUIZ).await, next(Step::AwaitPhoto(0)));

    // A video before the photo is kept and counted
    assert_eq!(
        upload(&h, U1, vec![media(ContentKind::Video, 0)]).await.unwrap(),
        next(Step::AwaitPhoto(0))
    );
    assert_eq!(upload(&h, U1, vec![photo(0)]).await.unwrap(), next(Step::AwaitAnswer(0)));

    let question = h
        .service
        .ask_question(
            &user,
            QuizPayload {
                question: 0,
                text: "寶寶最喜歡的顏色？".into(),
                options: vec!["red".into(), "blue".into()],
                correct: Some("blue".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(click(&h, U1, &question, "blue").await.unwrap(), next(Step::AwaitAnswer(1)));
    assert!(h.transport.said(U1, "答對了"));

    assert_eq!(say(&h, U1, "wants a sibling").await.unwrap(), next(Step::AwaitConfirmation));

    let progress = h.stores.quizzes.get(&user).await.unwrap().unwrap();
    assert_eq!(progress.mission_id, QUIZ);
    assert_eq!(progress.answered(), 1);
    assert_eq!(progress.correct, 1);
    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.aside_text(0), Some("blue"));
    assert_eq!(r.slots_of(ContentKind::Video).len(), 1);
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn starting_a_mission_replaces_the_previous_one() {
    let h = Harness::new();
    start(&h, U1, BATH).await;
    upload(&h, U1, vec![photo(0)]).await.unwrap();

    start(&h, U1, LETTER).await;

    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.mission_id, LETTER);
    assert_eq!(r.attachment_count(), 0);
}

#[tokio::test]
async fn events_without_a_mission_are_reported() {
    let h = Harness::new();

    let err = say(&h, "nobody", "hi").await.unwrap_err();

    assert!(matches!(err, MissionError::NoActiveMission(_)));
    assert!(h.transport.said("nobody", messages::NO_ACTIVE_MISSION));
}

#[tokio::test]
async fn unknown_and_foreign_prompts_are_expired() {
    let h = Harness::new();
    let prompt = h.service.announce_mission(&UserId::new(U1), BATH).await.unwrap();

    let err = click(&h, "U2", &prompt, "start").await.unwrap_err();
    assert!(matches!(err, MissionError::ExpiredPrompt(_)));
    assert!(h.transport.said("U2", messages::EXPIRED_PROMPT));

    let err = click(&h, U1, &"no-such-prompt".into(), "start").await.unwrap_err();
    assert!(matches!(err, MissionError::ExpiredPrompt(_)));

    assert_eq!(click(&h, U1, &prompt, "start").await.unwrap(), next(Step::AwaitPhoto(0)));
}

#[tokio::test]
async fn submitted_confirmation_cannot_be_clicked_twice() {
    let h = Harness::new();
    fill_bath(&h).await;
    let prompt = last_prompt(&h);

    click(&h, U1, &prompt, "submit").await.unwrap();
    let err = click(&h, U1, &prompt, "submit").await.unwrap_err();

    assert!(matches!(err, MissionError::ExpiredPrompt(_)));
    assert_eq!(h.backend.updates().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_from_one_user_are_serialized() {
    let h = Harness::new();
    start(&h, U1, ALBUM).await;

    let tasks = (0..50).map(|n| {
        let h = h.clone();
        tokio::spawn(async move { upload(&h, U1, vec![photo(n)]).await })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.attachment_count(), 50);
    let mut urls: Vec<_> = r.attachments.iter().map(|a| a.url.clone()).collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 50);
    assert!(r.attachments.iter().enumerate().all(|(slot, a)| a.index == slot));
}
