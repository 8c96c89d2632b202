// ABOUTME: Integration tests for streaming sessions over scripted connections.
// ABOUTME: Covers delivery order, terminal callbacks, cancellation, deadlines and release.

mod support;

use bytes::Bytes;
use dockstream::stream::{
    CallbackError, CancelReason, DecodeError, Frame, FrameDecoder, Handlers, JsonDecoder,
    Outcome, SessionState, StreamError, StreamKind, StreamingSession,
};
use std::io;
use std::time::Duration;
use support::{Recorder, ScriptedSource, Step, frame_bytes};

const TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::test]
async fn delivers_frames_in_order_and_finishes_once() {
    support::init_tracing();
    let mut wire = frame_bytes(1, b"hello");
    wire.extend(frame_bytes(2, b"bye"));
    let (source, releases) = ScriptedSource::new(vec![Step::bytes(wire)]);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(recorder)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Finished);
    let record = record.lock();
    assert_eq!(
        record.items,
        vec![
            Frame::new(StreamKind::Output, Bytes::from_static(b"hello")),
            Frame::new(StreamKind::Error, Bytes::from_static(b"bye")),
        ]
    );
    assert_eq!(record.started, 1);
    assert_eq!(record.finished, 1);
    assert!(record.failures.is_empty());
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn frames_split_byte_by_byte_are_reassembled() {
    let mut wire = frame_bytes(1, b"split");
    wire.extend(frame_bytes(2, b""));
    let steps = wire.iter().map(|b| Step::bytes(vec![*b])).collect();
    let (source, releases) = ScriptedSource::new(steps);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(recorder)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Finished);
    let record = record.lock();
    assert_eq!(record.items.len(), 2);
    assert_eq!(record.items[0].payload().as_ref(), b"split");
    assert!(record.items[1].payload().is_empty());
    assert_eq!(record.items[1].kind(), StreamKind::Error);
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn truncated_payload_fails_once_after_release() {
    let mut wire = frame_bytes(1, b"ok");
    wire.extend_from_slice(b"\x01\x00\x00\x00\x00\x00\x00\x0ahel");
    let (source, releases) = ScriptedSource::new(vec![Step::bytes(wire)]);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(recorder)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Failed);
    let record = record.lock();
    assert_eq!(record.items.len(), 1);
    assert_eq!(record.finished, 0);
    assert_eq!(record.failures.len(), 1);
    assert!(record.failures[0].contains("3 of 10 payload bytes"));
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn short_header_at_end_of_stream_fails() {
    let (source, _releases) = ScriptedSource::new(vec![Step::bytes(&b"\x02\x00\x00"[..])]);

    let result = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(Handlers::new(|_: Frame| Ok(())))
        .await;

    match result {
        Err(StreamError::Decode(DecodeError::ShortHeader { received })) => {
            assert_eq!(received, 3)
        }
        other => panic!("expected short header, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_stream_kind_is_a_protocol_violation() {
    let mut wire = frame_bytes(1, b"fine");
    wire.extend_from_slice(b"\x09\x00\x00\x00\x00\x00\x00\x01x");
    let (source, releases) = ScriptedSource::new(vec![Step::bytes(wire), Step::Hang]);

    let result = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(Handlers::new(|_: Frame| Ok(())))
        .await;

    let error = result.unwrap_err();
    assert!(error.is_protocol_violation());
    assert!(matches!(
        error,
        StreamError::Decode(DecodeError::UnknownStreamKind(9))
    ));
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn connection_error_after_frames_fails_session() {
    let (source, releases) = ScriptedSource::new(vec![
        Step::bytes(frame_bytes(1, b"partial output")),
        Step::Fail(io::ErrorKind::ConnectionReset),
    ]);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(recorder)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Failed);
    let record = record.lock();
    assert_eq!(record.items.len(), 1);
    assert_eq!(record.failures.len(), 1);
    assert!(record.failures[0].starts_with("connection error"));
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn cancel_is_idempotent_and_ignored_after_finish() {
    let (source, releases) = ScriptedSource::new(vec![Step::bytes(frame_bytes(1, b"x"))]);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(recorder)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Finished);

    let handle = record.lock().handle.clone().unwrap();
    handle.cancel();
    handle.cancel();
    assert_eq!(handle.state(), SessionState::Finished);
    assert!(!handle.is_cancelled());
    assert_eq!(record.lock().terminal_callbacks(), 1);
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn cancel_during_on_starting_skips_reading() {
    let (source, releases) = ScriptedSource::new(vec![Step::bytes(frame_bytes(1, b"unseen"))]);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(recorder.cancel_on_start())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Cancelled(CancelReason::Requested));
    let record = record.lock();
    assert!(record.items.is_empty());
    assert_eq!(record.terminal_callbacks(), 0);
    assert_eq!(releases.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_before_first_frame_delivers_nothing() {
    let (source, releases) = ScriptedSource::new(vec![
        Step::Delay(Duration::from_secs(10)),
        Step::bytes(frame_bytes(1, b"too late")),
    ]);
    let (recorder, record) = Recorder::new();
    let session = StreamingSession::new(source, FrameDecoder::multiplexed(), Duration::from_secs(1));
    let handle = session.cancel_handle();

    let outcome = session.run(recorder).await.unwrap();

    assert_eq!(outcome, Outcome::Cancelled(CancelReason::DeadlineElapsed));
    assert_eq!(
        handle.state(),
        SessionState::Cancelled(CancelReason::DeadlineElapsed)
    );
    let record = record.lock();
    assert!(record.items.is_empty());
    assert_eq!(record.terminal_callbacks(), 0);
    assert_eq!(releases.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_interrupts_idle_follow_stream() {
    let (source, releases) = ScriptedSource::new(vec![
        Step::bytes(frame_bytes(1, b"line 1\n")),
        Step::Delay(Duration::from_secs(1)),
        Step::bytes(frame_bytes(1, b"line 2\n")),
        Step::Hang,
    ]);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::multiplexed(), Duration::from_secs(5))
        .run(recorder)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Cancelled(CancelReason::DeadlineElapsed));
    assert_eq!(record.lock().items.len(), 2);
    assert_eq!(record.lock().terminal_callbacks(), 0);
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn cancel_from_another_task_stops_mid_stream() {
    let (source, releases) = ScriptedSource::new(vec![
        Step::bytes(frame_bytes(1, b"first")),
        Step::Hang,
    ]);
    let (recorder, record) = Recorder::new();

    let handle = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT).spawn(recorder);
    let cancel = handle.cancel_handle();

    while record.lock().items.is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let canceller = tokio::spawn(async move { cancel.cancel() });
    canceller.await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("cancel must interrupt the blocked read")
        .unwrap();

    assert_eq!(outcome, Outcome::Cancelled(CancelReason::Requested));
    let record = record.lock();
    assert_eq!(record.items.len(), 1);
    assert_eq!(record.terminal_callbacks(), 0);
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn callback_error_stops_delivery() {
    let mut wire = Vec::new();
    for i in 0..5u8 {
        wire.extend(frame_bytes(1, &[b'0' + i]));
    }
    let (source, releases) = ScriptedSource::new(vec![Step::bytes(wire)]);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(recorder.reject_after(2))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Failed);
    let record = record.lock();
    assert_eq!(record.items.len(), 2);
    assert_eq!(record.failures.len(), 1);
    assert!(record.failures[0].contains("consumer rejected item"));
    assert_eq!(record.finished, 0);
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn raw_stream_delivers_chunks_verbatim() {
    let (source, releases) = ScriptedSource::new(vec![
        Step::bytes(vec![b'a'; 10]),
        Step::bytes(Vec::new()),
        Step::bytes(vec![b'b'; 5]),
    ]);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::raw(), TIMEOUT)
        .run(recorder)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Finished);
    let record = record.lock();
    let lengths: Vec<usize> = record.items.iter().map(|f| f.payload().len()).collect();
    assert_eq!(lengths, vec![10, 0, 5]);
    assert!(record.items.iter().all(|f| f.kind() == StreamKind::Raw));
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn system_error_frame_does_not_end_the_stream() {
    let mut wire = frame_bytes(3, b"exec failed");
    wire.extend(frame_bytes(1, b"after"));
    let (source, _releases) = ScriptedSource::new(vec![Step::bytes(wire)]);
    let (recorder, record) = Recorder::new();

    let outcome = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
        .run(recorder)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Finished);
    let record = record.lock();
    assert_eq!(record.items[0].kind(), StreamKind::SystemError);
    assert!(record.items[0].kind().is_error());
    assert_eq!(record.items[1].kind(), StreamKind::Output);
}

#[tokio::test]
async fn panicking_callback_still_releases_connection() {
    let (source, releases) = ScriptedSource::new(vec![Step::bytes(frame_bytes(1, b"boom"))]);
    let callback = Handlers::new(|_: Frame| -> Result<(), CallbackError> {
        panic!("consumer bug");
    });

    let handle = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT).spawn(callback);
    let cancel = handle.cancel_handle();
    let waiter = tokio::spawn(handle.wait());

    let joined = waiter.await;
    assert!(joined.unwrap_err().is_panic());
    assert_eq!(releases.count(), 1);
    assert_eq!(cancel.state(), SessionState::Failed);
}

#[tokio::test]
async fn terminal_listener_exits_when_the_session_finishes() {
    let (source, _releases) = ScriptedSource::new(vec![Step::bytes(frame_bytes(1, b"done"))]);
    let session = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT);
    let listener = {
        let cancel = session.cancel_handle();
        tokio::spawn(async move { cancel.terminated().await })
    };

    let outcome = session.run(Handlers::new(|_: Frame| Ok(()))).await.unwrap();

    assert_eq!(outcome, Outcome::Finished);
    let state = tokio::time::timeout(Duration::from_secs(1), listener)
        .await
        .expect("listener should exit")
        .unwrap();
    assert_eq!(state, SessionState::Finished);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_sessions_are_independent() {
    const SESSIONS: usize = 100;
    const FRAMES: usize = 1000;

    let mut handles = Vec::with_capacity(SESSIONS);
    for session in 0..SESSIONS {
        let mut wire = Vec::new();
        for frame in 0..FRAMES {
            let id = if frame % 2 == 0 { 1 } else { 2 };
            wire.extend(frame_bytes(id, format!("{session}:{frame}").as_bytes()));
        }
        let steps = wire
            .chunks(61 + session)
            .map(|chunk| Step::bytes(chunk.to_vec()))
            .collect();
        let (source, releases) = ScriptedSource::new(steps);
        let (recorder, record) = Recorder::new();
        let handle = StreamingSession::new(source, FrameDecoder::multiplexed(), TIMEOUT)
            .with_label(format!("session-{session}"))
            .spawn(recorder);
        handles.push((session, handle, record, releases));
    }

    for (session, handle, record, releases) in handles {
        assert_eq!(handle.wait().await.unwrap(), Outcome::Finished);
        let record = record.lock();
        assert_eq!(record.items.len(), FRAMES);
        assert_eq!(record.finished, 1);
        assert!(record.failures.is_empty());
        for (i, frame) in record.items.iter().enumerate() {
            let kind = if i % 2 == 0 {
                StreamKind::Output
            } else {
                StreamKind::Error
            };
            assert_eq!(frame.kind(), kind, "session {session} frame {i}");
            assert_eq!(
                frame.payload().as_ref(),
                format!("{session}:{i}").as_bytes(),
                "session {session} frame {i}"
            );
        }
        assert_eq!(releases.count(), 1);
    }
}

#[tokio::test]
async fn json_stats_samples_stream_through_a_session() {
    let (source, releases) = ScriptedSource::new(vec![
        Step::bytes(&br#"{"read":"2024-01-01T00:00:00Z","pids_stats":{"cur"#[..]),
        Step::bytes(&br#"rent":3}}"#[..]),
        Step::bytes(&b"\n{\"read\":\"2024-01-01T00:00:01Z\",\"pids_stats\":{\"current\":4}}\n"[..]),
    ]);
    let (recorder, record) = Recorder::<serde_json::Value>::new();

    let outcome = StreamingSession::new(source, JsonDecoder::new(), TIMEOUT)
        .run(recorder)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Finished);
    let record = record.lock();
    assert_eq!(record.items.len(), 2);
    assert_eq!(record.items[0]["pids_stats"]["current"], 3);
    assert_eq!(record.items[1]["pids_stats"]["current"], 4);
    assert_eq!(releases.count(), 1);
}

#[tokio::test]
async fn truncated_json_sample_fails() {
    let (source, _releases) =
        ScriptedSource::new(vec![Step::bytes(&br#"{"read":"2024-01-01T00:"#[..])]);

    let result = StreamingSession::new(source, JsonDecoder::<serde_json::Value>::new(), TIMEOUT)
        .run(Handlers::new(|_: serde_json::Value| Ok(())))
        .await;

    assert!(matches!(
        result,
        Err(StreamError::Decode(DecodeError::TruncatedJson { .. }))
    ));
}
