#![cfg(unix)]

use mindplayer::{
    AudioBackend, HandleSpec, MediaEvent, PlaybackHandle, PlayerError, ProcessBackend,
    ProcessCommand, ProcessHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn recorder(handle: &dyn PlaybackHandle) -> mpsc::UnboundedReceiver<MediaEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    handle.add_listener(Arc::new(move |event: &MediaEvent| {
        let _ = tx.send(event.clone());
    }));
    rx
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<MediaEvent>) -> MediaEvent {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no media event within 10s")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_missing_program_fails_to_play() {
    let backend = ProcessBackend::new(ProcessCommand::new(
        "mindshift-test-no-such-player",
        ["{url}"],
    ));
    let handle = backend.create(HandleSpec::background("/sounds/bg.mp3")).unwrap();

    match handle.play().await {
        Err(PlayerError::Load { url, .. }) => assert_eq!(url, "/sounds/bg.mp3"),
        other => panic!("expected a load error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failing_player_reports_error() {
    let backend = ProcessBackend::new(ProcessCommand::new("sh", ["-c", "exit 3"]));
    let handle = backend.create(HandleSpec::background("x.mp3")).unwrap();
    let mut events = recorder(handle.as_ref());

    handle.play().await.unwrap();
    assert_eq!(next_event(&mut events).await, MediaEvent::Play);
    match next_event(&mut events).await {
        MediaEvent::Error(reason) => assert!(reason.contains("exit"), "{reason}"),
        other => panic!("expected an error event, got {other}"),
    }
}

#[tokio::test]
async fn test_finished_player_reports_pause() {
    let backend = ProcessBackend::new(ProcessCommand::new("true", Vec::<String>::new()));
    let handle = backend.create(HandleSpec::background("x.mp3")).unwrap();
    let mut events = recorder(handle.as_ref());

    handle.play().await.unwrap();
    assert_eq!(next_event(&mut events).await, MediaEvent::Play);
    assert_eq!(next_event(&mut events).await, MediaEvent::Pause);
}

#[tokio::test]
async fn test_pause_stops_the_process() {
    let handle = ProcessHandle::new(
        ProcessCommand::new("sleep", ["30"]),
        HandleSpec::background("x.mp3"),
    );
    let mut events = recorder(&handle);

    handle.play().await.unwrap();
    assert!(handle.is_running());
    assert_eq!(next_event(&mut events).await, MediaEvent::Play);

    // A second play while running is a no-op
    handle.play().await.unwrap();

    handle.pause();
    assert!(!handle.is_running());
    assert_eq!(next_event(&mut events).await, MediaEvent::Pause);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_reload_restarts_with_new_source() {
    let handle = ProcessHandle::new(
        ProcessCommand::new("sleep", ["30"]),
        HandleSpec::background("first.mp3"),
    );
    let mut events = recorder(&handle);

    handle.play().await.unwrap();
    assert_eq!(next_event(&mut events).await, MediaEvent::Play);

    handle.set_source("second.mp3");
    assert_eq!(handle.source(), "second.mp3");
    handle.reload();
    assert_eq!(next_event(&mut events).await, MediaEvent::Play);
    assert!(handle.is_running());

    handle.pause();
}
