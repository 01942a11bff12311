//! Durability tests: every table survives a reopen of the store directory.

use mission_store::Stores;
use mission_types::{EntryRecord, MissionId, MissionRecord, PromptRef, TaskType, Upload, UserId};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn records_entries_and_quiz_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let user = UserId::new("U-parent");

    let written = {
        let stores = Stores::open(dir.path()).await.unwrap();

        let mut record = MissionRecord::new(user.clone(), MissionId(12));
        record.push_attachment(Upload::new("obj-1", "bath.jpg", "https://cdn/bath.jpg"));
        record.set_aside_text(0, "first bath");
        stores.sessions.put(&user, record).await.unwrap();

        stores
            .entries
            .issue(
                &user,
                EntryRecord::new(
                    PromptRef::new("msg-1"),
                    TaskType::ConfirmSubmission,
                    MissionId(12),
                    serde_json::json!({"slots": 1}),
                ),
            )
            .await
            .unwrap();

        stores
            .quizzes
            .record_answer(&user, MissionId(30), 0, "B", true)
            .await
            .unwrap();

        stores.sessions.get(&user).await.unwrap().unwrap()
    };

    let reopened = Stores::open(dir.path()).await.unwrap();

    let record = reopened.sessions.get(&user).await.unwrap().unwrap();
    assert_eq!(record, written);
    assert_eq!(record.revision, 1);

    let entries = reopened.entries.list(&user).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries.iter().next().unwrap().task_type, TaskType::ConfirmSubmission);

    let quiz = reopened.quizzes.get(&user).await.unwrap().unwrap();
    assert_eq!(quiz.correct, 1);
}

#[tokio::test]
async fn starting_over_replaces_the_single_record() {
    let dir = tempfile::tempdir().unwrap();
    let stores = Stores::open(dir.path()).await.unwrap();
    let user = UserId::new("U1");

    stores
        .sessions
        .put(&user, MissionRecord::new(user.clone(), MissionId(1)))
        .await
        .unwrap();
    stores
        .sessions
        .put(&user, MissionRecord::new(user.clone(), MissionId(2)))
        .await
        .unwrap();

    let users = stores.sessions.users().await.unwrap();
    assert_eq!(users, vec![user.clone()]);
    assert_eq!(
        stores.sessions.get(&user).await.unwrap().unwrap().mission_id,
        MissionId(2)
    );
}
