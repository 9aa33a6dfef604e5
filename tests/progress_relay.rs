use std::sync::Arc;

use media_downloader::auth::SessionStore;
use media_downloader::downloader::progress::{ProgressError, ProgressStatus, condense};
use media_downloader::downloader::{PROGRESS_SLOT, ProgressEvent, ProgressRecord, ProgressRelay, ProgressSink};

const MB: u64 = 1024 * 1024;

fn relay() -> (Arc<SessionStore>, ProgressRelay) {
    let sessions = Arc::new(SessionStore::default());
    let id = sessions.create();
    let relay = ProgressRelay::new(Arc::clone(&sessions), id);
    (sessions, relay)
}

#[test]
fn test_quarter_downloaded_at_two_mb_per_second() {
    let (sessions, relay) = relay();
    relay.on_progress(&ProgressEvent::downloading(
        50 * MB,
        Some(200 * MB),
        Some(2_097_152.0),
        Some(75),
    ));

    let record = ProgressRecord::load(&sessions, &relay.session_id());
    assert_eq!(
        record,
        ProgressRecord {
            progress: 25.0,
            speed: 2.0,
            eta: 75
        }
    );
    assert!(sessions.is_modified(&relay.session_id()));
}

#[test]
fn test_percent_rounded_to_one_decimal_within_bounds() {
    let cases = [(1u64, 3u64), (2, 3), (0, 10), (999, 1000), (1000, 1000), (123_456, 7_654_321)];
    for (downloaded, total) in cases {
        let event = ProgressEvent::downloading(downloaded, Some(total), Some(1024.0), None);
        let record = condense(&event).unwrap().expect("应写入进度");
        let expected = ((downloaded as f64 / total as f64 * 100.0) * 10.0).round() / 10.0;
        assert_eq!(record.progress, expected, "{}/{}", downloaded, total);
        assert!((0.0..=100.0).contains(&record.progress));
    }
}

#[test]
fn test_estimate_used_when_exact_total_missing() {
    let event = ProgressEvent {
        status: ProgressStatus::Downloading,
        downloaded_bytes: Some(10.0),
        total_bytes: Some(0.0),
        total_bytes_estimate: Some(40.0),
        speed: Some(MB as f64),
        eta: Some(3.0),
    };
    let record = condense(&event).unwrap().unwrap();
    assert_eq!(record.progress, 25.0);
    assert_eq!(record.speed, 1.0);
    assert_eq!(record.eta, 3);
}

#[test]
fn test_overshooting_estimate_is_clamped() {
    let event = ProgressEvent {
        status: ProgressStatus::Downloading,
        downloaded_bytes: Some(150.0),
        total_bytes: None,
        total_bytes_estimate: Some(100.0),
        speed: Some(10.0),
        eta: None,
    };
    let record = condense(&event).unwrap().unwrap();
    assert_eq!(record.progress, 100.0);
    assert_eq!(record.eta, 0);
}

#[test]
fn test_unknown_total_keeps_previous_record() {
    let (sessions, relay) = relay();
    relay.on_progress(&ProgressEvent::downloading(MB, Some(4 * MB), Some(MB as f64), Some(3)));
    let before = ProgressRecord::load(&sessions, &relay.session_id());
    assert_eq!(before.progress, 25.0);

    relay.on_progress(&ProgressEvent::downloading(2 * MB, None, Some(MB as f64), Some(2)));
    relay.on_progress(&ProgressEvent::downloading(2 * MB, Some(0), Some(MB as f64), Some(2)));
    assert_eq!(ProgressRecord::load(&sessions, &relay.session_id()), before);
}

#[test]
fn test_zero_or_missing_speed_skips_write() {
    let (sessions, relay) = relay();
    relay.on_progress(&ProgressEvent::downloading(MB, Some(2 * MB), Some(0.0), Some(1)));
    relay.on_progress(&ProgressEvent::downloading(MB, Some(2 * MB), None, Some(1)));

    let stored: Option<ProgressRecord> = sessions
        .get_slot(&relay.session_id(), PROGRESS_SLOT)
        .unwrap();
    assert!(stored.is_none());
}

#[test]
fn test_other_status_ignored() {
    let event = ProgressEvent {
        status: ProgressStatus::Finished,
        downloaded_bytes: Some(100.0),
        total_bytes: Some(100.0),
        total_bytes_estimate: None,
        speed: Some(5.0),
        eta: None,
    };
    assert_eq!(condense(&event), Ok(None));
}

#[test]
fn test_invalid_numbers_are_swallowed() {
    let event = ProgressEvent {
        status: ProgressStatus::Downloading,
        downloaded_bytes: Some(f64::INFINITY),
        total_bytes: Some(100.0),
        total_bytes_estimate: None,
        speed: Some(5.0),
        eta: None,
    };
    assert!(matches!(condense(&event), Err(ProgressError::InvalidRatio { .. })));

    let bad_speed = ProgressEvent {
        downloaded_bytes: Some(10.0),
        speed: Some(f64::NAN),
        ..event.clone()
    };
    assert!(matches!(condense(&bad_speed), Err(ProgressError::InvalidSpeed(_))));

    // 通过 relay 调用时不会 panic，也不写入
    let (sessions, relay) = relay();
    relay.on_progress(&event);
    relay.on_progress(&bad_speed);
    assert_eq!(
        ProgressRecord::load(&sessions, &relay.session_id()),
        ProgressRecord::default()
    );
}

#[test]
fn test_clear_removes_record() {
    let (sessions, relay) = relay();
    relay.on_progress(&ProgressEvent::downloading(1, Some(2), Some(1.0), None));
    assert!(
        sessions
            .get_slot::<ProgressRecord>(&relay.session_id(), PROGRESS_SLOT)
            .unwrap()
            .is_some()
    );

    relay.clear();
    assert!(
        sessions
            .get_slot::<ProgressRecord>(&relay.session_id(), PROGRESS_SLOT)
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_closure_sink() {
    let seen = std::sync::Mutex::new(Vec::new());
    let sink = |event: &ProgressEvent| seen.lock().unwrap().push(event.downloaded_bytes);
    sink.on_progress(&ProgressEvent::downloading(7, None, None, None));
    assert_eq!(*seen.lock().unwrap(), vec![Some(7.0)]);
}
