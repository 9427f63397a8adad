// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end tests for pull tracking against captured daemon streams.

use std::io::Cursor;

use pullwatch::{
    decode_stream, LayerId, LayerState, ProgressCounter, PullError, PullEvent, PullPhase,
    PullSession, PullStatus,
};

const NGINX_PULL: &str = include_str!("fixtures/nginx_pull.ndjson");

fn ids(names: &[&str]) -> Vec<LayerId> {
    names.iter().map(|name| LayerId::from(*name)).collect()
}

// =============================================================================
// Tracker properties
// =============================================================================

#[test]
fn test_single_layer_walkthrough() {
    let status = PullStatus::new();

    status.ingest(&PullEvent::new("", "Waiting"));
    status.ingest(&PullEvent::new("img1", "Waiting"));
    status.ingest(&PullEvent::new("L1", "Waiting"));

    status.ingest(&PullEvent::new("L1", "Downloading").with_progress(50, 100));
    assert_eq!(
        status.current("L1").download_progress,
        ProgressCounter { current: 50, total: 100, completed: false }
    );

    status.ingest(&PullEvent::new("L1", "Download complete"));
    assert_eq!(
        status.current("L1").download_progress,
        ProgressCounter { current: 100, total: 100, completed: true }
    );

    status.ingest(&PullEvent::new("L1", "Pull complete"));
    assert!(status.current("L1").phase_progress.is_completed());

    assert_eq!(status.layers(), ids(&["L1"]));
}

#[test]
fn test_terminal_phases_complete_counters() {
    let labels = [
        ("Download complete", false),
        ("Extracting", false),
        ("Verifying Checksum", false),
        ("Already exists", true),
        ("Pull complete", true),
    ];

    for (label, phase_done) in labels {
        let status = PullStatus::new();
        status.ingest(&PullEvent::new("img", "Pulling from library/x"));
        status.ingest(&PullEvent::new("L1", "Downloading").with_progress(7, 70));
        status.ingest(&PullEvent::new("L1", label).with_progress(3, 9));

        let state = status.current("L1");
        assert_eq!(state.phase, PullPhase::classify(label));
        assert!(state.download_progress.is_completed(), "{label}");
        assert_eq!(state.download_progress.current, 70, "{label}");
        assert_eq!(state.download_progress.total, 70, "{label}");
        assert_eq!(state.phase_progress.is_completed(), phase_done, "{label}");
    }
}

#[test]
fn test_first_id_is_never_a_layer() {
    let status = PullStatus::new();
    for event in [
        PullEvent::new("img1", "Waiting"),
        PullEvent::new("L1", "Waiting"),
        PullEvent::new("L2", "Waiting"),
        PullEvent::new("img1", "Pulling fs layer"),
        PullEvent::new("img1", "Pull complete"),
    ] {
        status.ingest(&event);
    }

    assert_eq!(status.layers(), ids(&["L1", "L2"]));
    assert_eq!(status.current("img1"), LayerState::default());
    assert_eq!(status.image_id(), Some(LayerId::from("img1")));
}

#[test]
fn test_interleaved_layers_are_independent() {
    let status = PullStatus::new();
    status.ingest(&PullEvent::new("img", "Pulling from library/x"));
    status.ingest(&PullEvent::new("L1", "Downloading").with_progress(1, 10));
    status.ingest(&PullEvent::new("L2", "Downloading").with_progress(2, 20));
    status.ingest(&PullEvent::new("L1", "Download complete"));

    assert_eq!(status.layers(), ids(&["L1", "L2"]));
    assert_eq!(status.current("L1").phase, PullPhase::DownloadComplete);
    assert_eq!(
        status.current("L1").download_progress,
        ProgressCounter { current: 10, total: 10, completed: true }
    );
    assert_eq!(status.current("L2").phase, PullPhase::Downloading);
    assert_eq!(
        status.current("L2").download_progress,
        ProgressCounter { current: 2, total: 20, completed: false }
    );
}

#[test]
fn test_unknown_query_before_any_event() {
    let status = PullStatus::new();
    let state = status.current("anything");
    assert_eq!(state.phase, PullPhase::Unknown);
    assert_eq!(state.phase_progress, ProgressCounter::default());
    assert_eq!(state.download_progress, ProgressCounter::default());
    assert!(status.layers().is_empty());
    assert!(!status.complete());
}

#[test]
fn test_repeated_events_do_not_accumulate() {
    let once = PullStatus::new();
    let twice = PullStatus::new();
    let events = [
        PullEvent::new("img", "Pulling from library/x"),
        PullEvent::new("L1", "Pulling fs layer"),
        PullEvent::new("L1", "Downloading").with_progress(40, 80),
        PullEvent::new("L1", "Extracting").with_progress(10, 80),
    ];

    for event in &events {
        once.ingest(event);
        twice.ingest(event);
        twice.ingest(event);
        assert_eq!(once.snapshot(), twice.snapshot());
        assert_eq!(once.layers(), twice.layers());
    }
}

#[test]
fn test_layers_match_queryable_states() {
    let mut session = PullSession::new("nginx:1.27");
    let status = session.status();
    session.consume_reader(Cursor::new(NGINX_PULL)).unwrap();

    let snapshot = status.snapshot();
    let snapshot_ids: Vec<LayerId> = snapshot.iter().map(|(id, _)| id.clone()).collect();
    assert_eq!(status.layers(), snapshot_ids);

    for (id, state) in snapshot {
        assert_eq!(status.current(id.as_str()), state);
        assert_ne!(state, LayerState::default());
    }
}

// =============================================================================
// Session replay
// =============================================================================

#[test]
fn test_replay_captured_nginx_pull() {
    let mut session = PullSession::new("nginx:1.27");
    let status = session.status();

    session.consume_reader(Cursor::new(NGINX_PULL)).unwrap();

    assert!(status.complete());
    assert_eq!(status.image_id(), Some(LayerId::from("1.27")));
    assert_eq!(status.layers(), ids(&["2d429b9e73a6", "9b1039c85176", "9ad567d3b8a2"]));

    let cached = status.current("2d429b9e73a6");
    assert_eq!(cached.phase, PullPhase::AlreadyExists);
    assert!(cached.phase_progress.is_completed());
    assert!(cached.download_progress.is_completed());
    assert_eq!(cached.download_progress.total, 0);

    let big = status.current("9b1039c85176");
    assert_eq!(big.phase, PullPhase::PullComplete);
    assert_eq!(
        big.download_progress,
        ProgressCounter { current: 29126484, total: 29126484, completed: true }
    );

    let summary = status.summary();
    assert_eq!(summary.layers, 3);
    assert_eq!(summary.layers_done, 3);
    assert_eq!(summary.bytes_total, 29126484 + 628);
    assert!(summary.complete);
}

#[tokio::test]
async fn test_async_replay_matches_blocking_replay() {
    let mut blocking = PullSession::new("nginx:1.27");
    blocking.consume_reader(Cursor::new(NGINX_PULL)).unwrap();

    let mut streamed = PullSession::new("nginx:1.27");
    streamed
        .consume_stream(decode_stream(NGINX_PULL.as_bytes()))
        .await
        .unwrap();

    assert_eq!(blocking.status().snapshot(), streamed.status().snapshot());
    assert!(streamed.status().complete());
}

#[test]
fn test_truncated_stream_with_error_is_not_complete() {
    let mut lines: Vec<&str> = NGINX_PULL.lines().take(8).collect();
    lines.push(r#"{"errorDetail":{"message":"read tcp 10.0.0.2:51234->104.16.0.1:443: read: connection reset by peer"},"error":"read tcp 10.0.0.2:51234->104.16.0.1:443: read: connection reset by peer"}"#);
    let stream = lines.join("\n");

    let mut session = PullSession::new("nginx:1.27");
    let status = session.status();
    let err = session.consume_reader(Cursor::new(stream)).unwrap_err();

    assert!(matches!(err, PullError::Daemon { .. }));
    assert!(!status.complete());
    assert_eq!(status.current("9b1039c85176").phase, PullPhase::Downloading);
    assert_eq!(status.summary().layers_done, 1);
}
