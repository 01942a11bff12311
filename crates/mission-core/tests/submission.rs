//! Backend submission: multi-item books, partial failure and retries

mod common;

use common::{click, last_prompt, record, say, start, upload};
use mission_core::{BackendError, EventOutcome, GenerationTarget, MissionError};
use mission_test_utils::{photo, Harness, BOOK, PHOTOS_ONLY};
use mission_types::{BookId, Step, UserId};
use pretty_assertions::assert_eq;
use std::time::Duration;

const U1: &str = "U1";

/// Cover plus two captioned pages, waiting for confirmation
async fn fill_book(h: &Harness) {
    assert_eq!(start(h, U1, BOOK).await, EventOutcome::Next(Step::AwaitPhoto(0)));
    assert_eq!(
        upload(h, U1, vec![photo(100)]).await.unwrap(),
        EventOutcome::Next(Step::AwaitPhoto(0))
    );
    upload(h, U1, vec![photo(0)]).await.unwrap();
    say(h, U1, "page one").await.unwrap();
    upload(h, U1, vec![photo(1)]).await.unwrap();
    assert_eq!(
        say(h, U1, "page two").await.unwrap(),
        EventOutcome::Next(Step::AwaitConfirmation)
    );
}

fn items(h: &Harness) -> Vec<Option<usize>> {
    h.backend.updates().iter().map(|u| u.item).collect()
}

#[tokio::test]
async fn book_is_written_cover_first() {
    let h = Harness::new();
    fill_book(&h).await;
    assert!(h.transport.said(U1, "封面已設定"));

    assert_eq!(click(&h, U1, &last_prompt(&h), "submit").await.unwrap(), EventOutcome::Submitted);

    let updates = h.backend.updates();
    assert_eq!(items(&h), vec![Some(0), Some(1), Some(2)]);
    assert_eq!(updates[0].attachments.as_ref().unwrap()[0].url, photo(100).url);
    assert_eq!(updates[2].aside_text.as_deref(), Some("page two"));
    assert_eq!(
        h.backend.generations(),
        vec![(UserId::new(U1), GenerationTarget::Book(BookId::from(BOOK)))]
    );
    assert!(record(&h, U1).await.is_none());
}

#[tokio::test]
async fn failed_book_item_is_named_and_resumed() {
    let h = Harness::new();
    fill_book(&h).await;
    let confirm = last_prompt(&h);
    h.backend.fail_update_call(2);

    let err = click(&h, U1, &confirm, "submit").await.unwrap_err();

    assert!(matches!(err, MissionError::PartialSubmission { item: 1, total: 3, .. }));
    assert!(err.is_retryable());
    assert!(h.transport.said(U1, "第 2 項（共 3 項）送出失敗"));
    assert_eq!(items(&h), vec![Some(0)]);
    assert!(h.backend.generations().is_empty());
    assert_eq!(record(&h, U1).await.unwrap().book_progress, 1);

    // The confirmation prompt is still live; the retry skips the cover
    assert_eq!(click(&h, U1, &confirm, "submit").await.unwrap(), EventOutcome::Submitted);
    assert_eq!(items(&h), vec![Some(0), Some(1), Some(2)]);
    assert_eq!(h.backend.generations().len(), 1);
}

#[tokio::test]
async fn changing_the_cover_resends_every_item() {
    let h = Harness::new();
    let user = UserId::new(U1);
    fill_book(&h).await;
    h.backend.fail_update_call(3);
    assert!(h.service.submit(&user).await.is_err());
    assert_eq!(record(&h, U1).await.unwrap().book_progress, 2);

    let picker = h.service.offer_cover_choice(&user).await.unwrap();
    click(&h, U1, &picker, "1").await.unwrap();

    let r = record(&h, U1).await.unwrap();
    assert_eq!(r.book_progress, 0);
    assert_eq!(r.cover.as_ref().map(|c| c.url.clone()), Some(photo(1).url));

    assert_eq!(h.service.submit(&user).await.unwrap(), EventOutcome::Submitted);
    assert_eq!(items(&h), vec![Some(0), Some(1), Some(0), Some(1), Some(2)]);
}

#[tokio::test(start_paused = true)]
async fn page_edited_while_in_flight_is_resent_before_generation() {
    let h = Harness::new();
    let user = UserId::new(U1);
    fill_book(&h).await;
    h.backend.set_latency(Duration::from_secs(5));

    let first = {
        let h = h.clone();
        let user = user.clone();
        tokio::spawn(async move { h.service.submit(&user).await })
    };
    // Cover and page one are committed, page two is being written
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(
        say(&h, U1, "page two EDITED").await.unwrap(),
        EventOutcome::Next(Step::AwaitConfirmation)
    );
    assert_eq!(record(&h, U1).await.unwrap().book_progress, 2);

    let first = first.await.unwrap();

    assert!(matches!(first, Err(MissionError::ChangedDuringSubmission(_))));
    assert!(h.backend.generations().is_empty());
    assert_eq!(record(&h, U1).await.unwrap().book_progress, 2);

    assert_eq!(h.service.submit(&user).await.unwrap(), EventOutcome::Submitted);
    let updates = h.backend.updates();
    assert_eq!(items(&h), vec![Some(0), Some(1), Some(2), Some(2)]);
    assert_eq!(updates[3].aside_text.as_deref(), Some("page two EDITED"));
    assert_eq!(h.backend.generations().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out_and_keeps_the_record() {
    let h = Harness::new();
    h.backend.set_latency(Duration::from_secs(60));
    start(&h, U1, PHOTOS_ONLY).await;

    let err = upload(&h, U1, vec![photo(0), photo(1), photo(2)]).await.unwrap_err();

    assert!(matches!(err, MissionError::Backend(BackendError::Timeout { secs: 30 })));
    assert!(err.is_retryable());
    assert_eq!(record(&h, U1).await.unwrap().attachment_count(), 3);

    h.backend.set_latency(Duration::ZERO);
    assert_eq!(h.service.submit(&UserId::new(U1)).await.unwrap(), EventOutcome::Submitted);
}

#[tokio::test]
async fn rejected_generation_keeps_the_record() {
    let h = Harness::new();
    h.backend.reject_generation(true);
    start(&h, U1, PHOTOS_ONLY).await;

    let err = upload(&h, U1, vec![photo(0), photo(1), photo(2)]).await.unwrap_err();

    assert!(matches!(err, MissionError::Backend(BackendError::Rejected { .. })));
    assert!(record(&h, U1).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn content_arriving_mid_submission_is_not_lost() {
    let h = Harness::new();
    h.backend.set_latency(Duration::from_secs(5));
    start(&h, U1, PHOTOS_ONLY).await;

    let first = {
        let h = h.clone();
        tokio::spawn(async move { upload(&h, U1, vec![photo(0), photo(1), photo(2)]).await })
    };
    // Let the first submission reach the backend
    tokio::time::sleep(Duration::from_secs(1)).await;

    let second = upload(&h, U1, vec![photo(9)]).await.unwrap();
    let first = first.await.unwrap();

    assert!(matches!(first, Err(MissionError::ChangedDuringSubmission(_))));
    assert_eq!(second, EventOutcome::Submitted);
    let updates = h.backend.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].attachments.as_ref().unwrap()[2].url, photo(9).url);
    assert!(record(&h, U1).await.is_none());
}
