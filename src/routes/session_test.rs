use super::*;

use crate::state::test_helpers::test_state;
use crate::store::FileRef;

fn file_ref() -> FileRef {
    FileRef {
        filename: "upload_1700000000000.png".into(),
        original_name: "vase.png".into(),
        size: 2048,
        mimetype: "image/png".into(),
        url: "/uploads/upload_1700000000000.png".into(),
        uploaded_at: "2025-06-01T12:00:00Z".into(),
    }
}

#[tokio::test]
async fn unknown_session_snapshot_is_not_found() {
    let state = test_state(None, None);
    let (status, Json(body)) = snapshot_handler(State(state), Path("ghost".to_string()))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.error, "Unknown session");
}

#[tokio::test]
async fn open_creates_an_expanded_session() {
    let state = test_state(None, None);
    let Json(snapshot) = open_handler(State(state.clone()), Path("c1".to_string()))
        .await
        .unwrap();
    assert_eq!(snapshot.phase, "expanded");
    assert!(snapshot.expanded);
    assert!(!snapshot.ready_for_submit);
    assert!(snapshot.seconds_remaining.is_none());

    // Reopening is harmless.
    let Json(again) = open_handler(State(state), Path("c1".to_string())).await.unwrap();
    assert_eq!(again.phase, "expanded");
}

#[tokio::test]
async fn continue_disarms_the_countdown() {
    let state = test_state(None, None);
    let now = OffsetDateTime::now_utc();
    for event in [
        SessionEvent::SendStarted,
        SessionEvent::ReplyReceived { ready: true },
        SessionEvent::RevealFinished,
    ] {
        state.sessions.apply("c1", event, now).await.unwrap();
    }

    let Json(snapshot) = continue_handler(State(state), Path("c1".to_string()))
        .await
        .unwrap();
    assert_eq!(snapshot.phase, "submit_offered");
    assert!(snapshot.ready_for_submit);
    assert!(snapshot.seconds_remaining.is_none());
}

#[tokio::test]
async fn clear_file_discards_the_staged_upload() {
    let state = test_state(None, None);
    state
        .sessions
        .apply("c1", SessionEvent::FileStaged(file_ref()), OffsetDateTime::now_utc())
        .await
        .unwrap();

    let Json(before) = snapshot_handler(State(state.clone()), Path("c1".to_string()))
        .await
        .unwrap();
    assert!(before.staged_file.is_some());

    let Json(after) = clear_file_handler(State(state), Path("c1".to_string()))
        .await
        .unwrap();
    assert!(after.staged_file.is_none());
}
