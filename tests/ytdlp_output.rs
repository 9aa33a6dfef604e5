use std::path::PathBuf;

use media_downloader::downloader::progress::ProgressStatus;
use media_downloader::downloader::ytdlp::{ExtractorLine, parse_line};
use media_downloader::downloader::{ExtractionPlan, StreamSelection, TargetFormat, VideoQuality, YtDlpExtractor};
use url::Url;

#[test]
fn test_parse_progress_line() {
    let line = "[mediadl:progress]downloading 52428800 209715200 NA 2097152.0 75";
    match parse_line(line) {
        ExtractorLine::Progress(event) => {
            assert_eq!(event.status, ProgressStatus::Downloading);
            assert_eq!(event.downloaded_bytes, Some(52_428_800.0));
            assert_eq!(event.total_bytes, Some(209_715_200.0));
            assert_eq!(event.total_bytes_estimate, None);
            assert_eq!(event.speed, Some(2_097_152.0));
            assert_eq!(event.eta, Some(75.0));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_parse_progress_line_with_missing_fields() {
    match parse_line("[mediadl:progress]downloading 1024 NA 4096.5 NA NA\r") {
        ExtractorLine::Progress(event) => {
            assert_eq!(event.total_bytes, None);
            assert_eq!(event.total_bytes_estimate, Some(4096.5));
            assert_eq!(event.speed, None);
            assert_eq!(event.known_total(), Some(4096.5));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_parse_print_and_diagnostic_lines() {
    assert_eq!(
        parse_line("[mediadl:title]Some Video: Part 1"),
        ExtractorLine::Title("Some Video: Part 1".to_string())
    );
    assert_eq!(
        parse_line("[mediadl:filepath]/srv/media/downloads/Some Video.mp4"),
        ExtractorLine::FilePath(PathBuf::from("/srv/media/downloads/Some Video.mp4"))
    );
    assert_eq!(
        parse_line("ERROR: [youtube] abc: Video unavailable"),
        ExtractorLine::Error("[youtube] abc: Video unavailable".to_string())
    );
    assert!(matches!(parse_line("WARNING: something odd"), ExtractorLine::Warning(_)));
    assert_eq!(parse_line("[youtube] Extracting URL"), ExtractorLine::Other);
}

#[test]
fn test_video_args() {
    let url = Url::parse("https://www.youtube.com/watch?v=abc").unwrap();
    let plan = ExtractionPlan::new(
        "/srv/media/downloads",
        StreamSelection::for_request(TargetFormat::Mp4, VideoQuality::AtMost(720)),
    );
    let args = YtDlpExtractor::build_args(&url, &plan);

    let pos = |flag: &str| args.iter().position(|a| a == flag).expect(flag);
    assert!(args[pos("-f") + 1].starts_with("bestvideo[height<=720][ext=mp4]"));
    assert_eq!(args[pos("--merge-output-format") + 1], "mp4");
    assert_eq!(args[pos("-o") + 1], "/srv/media/downloads/%(title)s.%(ext)s");
    assert!(args.contains(&"--no-simulate".to_string()));
    assert!(!args.contains(&"--extract-audio".to_string()));
    assert_eq!(args.last().map(String::as_str), Some(url.as_str()));
}

#[test]
fn test_audio_args() {
    let url = Url::parse("https://soundcloud.com/artist/track").unwrap();
    let plan = ExtractionPlan::new(
        "/tmp/out",
        StreamSelection::for_request(TargetFormat::Mp3, VideoQuality::Highest),
    );
    let args = YtDlpExtractor::build_args(&url, &plan);

    let pos = |flag: &str| args.iter().position(|a| a == flag).expect(flag);
    assert_eq!(args[pos("-f") + 1], "bestaudio/best");
    assert_eq!(args[pos("--audio-format") + 1], "mp3");
    assert_eq!(args[pos("--audio-quality") + 1], "192K");
    assert!(!args.contains(&"--merge-output-format".to_string()));
}
