#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use media_downloader::downloader::{
    ExtractError, ExtractionPlan, MediaExtractor, ProgressEvent, StreamSelection, TargetFormat, VideoQuality,
    YtDlpExtractor,
};
use url::Url;
use uuid::Uuid;

// 写脚本和执行脚本不能与其他用例交错，否则可能 ETXTBSY
static SCRIPT_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

fn work_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mediadl-ytdlp-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// 生成一个模拟 yt-dlp 的 shell 脚本
fn fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("yt-dlp");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn plan(dir: &Path) -> ExtractionPlan {
    ExtractionPlan::new(dir, StreamSelection::for_request(TargetFormat::Mp4, VideoQuality::Highest))
}

fn url() -> Url {
    Url::parse("https://www.youtube.com/watch?v=abc").unwrap()
}

#[tokio::test]
async fn test_non_utf8_output_does_not_fail_download() {
    let _guard = SCRIPT_LOCK.lock().await;
    let dir = work_dir();
    let media = dir.join("Cafe.mp4");
    std::fs::write(&media, b"media").unwrap();

    let script = fake_ytdlp(
        &dir,
        &format!(
            "printf 'WARNING: caf\\351 title\\n' >&2\n\
             printf '[mediadl:progress]downloading 50 100 NA 2048.0 3\\n'\n\
             printf '[mediadl:title]Caf\\351\\n'\n\
             printf '[mediadl:filepath]{}\\n'\n\
             exit 0",
            media.display()
        ),
    );

    let events = AtomicUsize::new(0);
    let sink = |_: &ProgressEvent| {
        events.fetch_add(1, Ordering::SeqCst);
    };

    let outcome = YtDlpExtractor::new(&script)
        .extract(&url(), &plan(&dir), &sink)
        .await
        .expect("非 UTF-8 字节不应导致失败");

    assert_eq!(outcome.filepath, Some(media));
    assert_eq!(outcome.title.as_deref(), Some("Caf\u{FFFD}"));
    assert_eq!(events.load(Ordering::SeqCst), 1);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_failed_run_reports_last_error_line() {
    let _guard = SCRIPT_LOCK.lock().await;
    let dir = work_dir();
    let script = fake_ytdlp(
        &dir,
        "printf 'ERROR: first\\n' >&2\n\
         printf 'ERROR: [youtube] abc: Video unavailable\\n' >&2\n\
         exit 1",
    );

    let sink = |_: &ProgressEvent| {};
    let err = YtDlpExtractor::new(&script)
        .extract(&url(), &plan(&dir), &sink)
        .await
        .unwrap_err();

    match err {
        ExtractError::Reported(message) => assert_eq!(message, "[youtube] abc: Video unavailable"),
        other => panic!("unexpected: {:?}", other),
    }

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn test_missing_binary_is_spawn_error() {
    let sink = |_: &ProgressEvent| {};
    let err = YtDlpExtractor::new("/nonexistent/yt-dlp")
        .extract(&url(), &plan(Path::new("/tmp")), &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::Spawn { .. }));
}
