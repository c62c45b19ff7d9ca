use super::*;

const IDLE: Duration = Duration::from_secs(120);
const COUNTDOWN: Duration = Duration::from_secs(120);
const BASE: Duration = Duration::from_millis(30);

fn registry() -> SessionRegistry {
    SessionRegistry::new(IDLE, COUNTDOWN, BASE)
}

#[tokio::test]
async fn apply_creates_session_on_first_touch() {
    let reg = registry();
    assert_eq!(reg.session_count().await, 0);
    reg.apply("c1", SessionEvent::Opened, OffsetDateTime::now_utc())
        .await
        .unwrap();
    assert_eq!(reg.session_count().await, 1);

    let snap = reg.snapshot("c1", OffsetDateTime::now_utc()).await.unwrap();
    assert_eq!(snap.phase, "expanded");
    assert!(snap.expanded);
    assert!(!snap.ready_for_submit);
    assert!(!snap.auto_submitted);
    assert_eq!(snap.seconds_remaining, None);
}

#[tokio::test]
async fn snapshot_unknown_conversation_is_none() {
    let reg = registry();
    assert!(reg.snapshot("nope", OffsetDateTime::now_utc()).await.is_none());
}

#[tokio::test]
async fn turn_in_flight_propagates() {
    let reg = registry();
    let now = OffsetDateTime::now_utc();
    reg.apply("c1", SessionEvent::SendStarted, now).await.unwrap();
    let err = reg.apply("c1", SessionEvent::SendStarted, now).await.unwrap_err();
    assert_eq!(err, SessionError::TurnInFlight);
}

#[tokio::test(start_paused = true)]
async fn reveal_completion_settles_the_session() {
    let reg = registry();
    let now = OffsetDateTime::now_utc();
    reg.apply("c1", SessionEvent::SendStarted, now).await.unwrap();
    reg.apply("c1", SessionEvent::ReplyReceived { ready: true }, now)
        .await
        .unwrap();
    reg.begin_reveal("c1", "ok!").await;

    let snap = reg.snapshot("c1", now).await.unwrap();
    assert_eq!(snap.phase, "revealing");
    assert!(!snap.ready_for_submit);

    // Let the reveal task register its first sleep, then walk the clock
    // one character at a time: each sleep only exists once the previous
    // one has fired.
    tokio::task::yield_now().await;
    for _ in 0..6 {
        tokio::time::advance(BASE).await;
        tokio::task::yield_now().await;
    }
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let snap = reg.snapshot("c1", OffsetDateTime::now_utc()).await.unwrap();
    assert_eq!(snap.phase, "auto_submit_armed");
    assert!(snap.ready_for_submit);
    assert_eq!(snap.revealed_chars, 3);
}

#[tokio::test(start_paused = true)]
async fn new_send_aborts_running_reveal() {
    let reg = registry();
    let now = OffsetDateTime::now_utc();
    reg.apply("c1", SessionEvent::SendStarted, now).await.unwrap();
    reg.apply("c1", SessionEvent::ReplyReceived { ready: true }, now)
        .await
        .unwrap();
    reg.begin_reveal("c1", "a very long reply that would keep typing for a while")
        .await;

    reg.apply("c1", SessionEvent::SendStarted, now).await.unwrap();

    // The aborted reveal must never settle the session.
    tokio::time::advance(Duration::from_secs(60)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let snap = reg.snapshot("c1", OffsetDateTime::now_utc()).await.unwrap();
    assert_eq!(snap.phase, "awaiting_reply");
}

#[tokio::test(start_paused = true)]
async fn begin_reveal_for_evicted_session_is_harmless() {
    let reg = registry();
    reg.begin_reveal("ghost", "hello").await;
    tokio::time::advance(Duration::from_secs(10)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(reg.session_count().await, 0);
}

#[tokio::test]
async fn poll_all_reports_only_active_timers() {
    let reg = registry();
    let now = OffsetDateTime::now_utc();
    // c1 armed, c2 idle.
    reg.apply("c1", SessionEvent::SendStarted, now).await.unwrap();
    reg.apply("c1", SessionEvent::ReplyReceived { ready: true }, now)
        .await
        .unwrap();
    reg.apply("c1", SessionEvent::RevealFinished, now).await.unwrap();
    reg.apply("c2", SessionEvent::Opened, now).await.unwrap();

    assert!(reg.poll_all(now + Duration::from_secs(60)).await.is_empty());

    let fired = reg.poll_all(now + IDLE).await;
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].0, "c1");
    assert!(matches!(fired[0].1[0], Effect::CountdownStarted { .. }));

    let fired = reg.poll_all(now + IDLE + COUNTDOWN).await;
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].1, vec![Effect::FireAutoSubmit]);
}

#[tokio::test]
async fn remove_tears_down() {
    let reg = registry();
    let now = OffsetDateTime::now_utc();
    reg.apply("c1", SessionEvent::Opened, now).await.unwrap();
    reg.remove("c1").await;
    assert_eq!(reg.session_count().await, 0);
    assert!(reg.snapshot("c1", now).await.is_none());

    // Removing twice is fine.
    reg.remove("c1").await;
}

#[tokio::test]
async fn staged_file_rides_through_registry() {
    let reg = registry();
    let now = OffsetDateTime::now_utc();
    let file = FileRef {
        filename: "upload_1.png".into(),
        original_name: "a.png".into(),
        size: 1,
        mimetype: "image/png".into(),
        url: "/uploads/upload_1.png".into(),
        uploaded_at: "2025-06-01T12:00:00Z".into(),
    };
    reg.apply("c1", SessionEvent::FileStaged(file), now).await.unwrap();

    let snap = reg.snapshot("c1", now).await.unwrap();
    assert!(snap.staged_file.is_some());

    assert!(reg.take_staged_file("c1").await.is_some());
    assert!(reg.take_staged_file("c1").await.is_none());
}
