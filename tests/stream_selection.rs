use media_downloader::downloader::stream_selector::{AvailableStream, ResolvedStreams, StreamSelection};
use media_downloader::downloader::{TargetFormat, VideoQuality};

fn stream(id: &str, ext: &str, height: Option<u32>, video: bool, audio: bool, bitrate: f64) -> AvailableStream {
    AvailableStream {
        id: id.to_string(),
        ext: ext.to_string(),
        height,
        has_video: video,
        has_audio: audio,
        bitrate,
    }
}

fn youtube_like() -> Vec<AvailableStream> {
    vec![
        stream("18", "mp4", Some(360), true, true, 500.0),
        stream("22", "mp4", Some(720), true, true, 1500.0),
        stream("137", "mp4", Some(1080), true, false, 4000.0),
        stream("136", "mp4", Some(720), true, false, 2500.0),
        stream("313", "webm", Some(2160), true, false, 16000.0),
        stream("140", "m4a", None, false, true, 128.0),
        stream("251", "webm", None, false, true, 160.0),
    ]
}

#[test]
fn test_highest_mp4_expression() {
    let selection = StreamSelection::for_request(TargetFormat::Mp4, VideoQuality::Highest);
    assert_eq!(
        selection.format_expression(),
        "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best"
    );
    assert_eq!(selection.merge_container, Some("mp4"));
    assert!(selection.audio_conversion.is_none());
}

#[test]
fn test_capped_mp4_expression() {
    let selection = StreamSelection::for_request(TargetFormat::Mp4, VideoQuality::AtMost(720));
    assert_eq!(
        selection.format_expression(),
        "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/bestvideo[height<=720]+bestaudio/best[height<=720]/best"
    );
}

#[test]
fn test_audio_only_selection() {
    let selection = StreamSelection::for_request(TargetFormat::Mp3, VideoQuality::AtMost(480));
    assert_eq!(selection.format_expression(), "bestaudio/best");
    let conversion = selection.audio_conversion.expect("需要转码");
    assert_eq!(conversion.codec, "mp3");
    assert_eq!(conversion.bitrate_kbps, 192);
    assert!(selection.merge_container.is_none());

    let streams = youtube_like();
    match selection.resolve(&streams) {
        Some(ResolvedStreams::Single(s)) => assert_eq!(s.id, "251"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_highest_never_restricts_resolution() {
    // 只有纯视频+纯音频时，选到最高的 mp4 视频
    let streams = vec![
        stream("137", "mp4", Some(1080), true, false, 4000.0),
        stream("136", "mp4", Some(720), true, false, 2500.0),
        stream("140", "m4a", None, false, true, 128.0),
    ];
    let selection = StreamSelection::for_request(TargetFormat::Mp4, VideoQuality::Highest);
    let resolved = selection.resolve(&streams).unwrap();
    assert_eq!(resolved.height(), Some(1080));
}

#[test]
fn test_height_cap_respected_when_compliant_stream_exists() {
    let streams = youtube_like();
    for cap in [1080u32, 720, 480, 360] {
        let selection = StreamSelection::for_request(TargetFormat::Mp4, VideoQuality::AtMost(cap));
        let resolved = selection.resolve(&streams).expect("应有可选流");
        let height = resolved.height().unwrap();
        assert!(height <= cap, "cap {} selected {}", cap, height);
    }

    let selection = StreamSelection::for_request(TargetFormat::Mp4, VideoQuality::AtMost(720));
    match selection.resolve(&streams).unwrap() {
        ResolvedStreams::Merged { video, audio } => {
            assert_eq!(video.id, "136");
            assert_eq!(audio.id, "140");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_cap_falls_back_to_best_when_nothing_compliant() {
    let streams = vec![stream("22", "mp4", Some(720), true, true, 1500.0)];
    let selection = StreamSelection::for_request(TargetFormat::Mp4, VideoQuality::AtMost(360));
    match selection.resolve(&streams) {
        Some(ResolvedStreams::Single(s)) => assert_eq!(s.id, "22"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_quality_parsing() {
    assert_eq!("highest".parse::<VideoQuality>(), Ok(VideoQuality::Highest));
    assert_eq!("720p".parse::<VideoQuality>(), Ok(VideoQuality::AtMost(720)));
    assert_eq!("1080P".parse::<VideoQuality>(), Ok(VideoQuality::AtMost(1080)));
    assert!("0p".parse::<VideoQuality>().is_err());
    assert!("hd".parse::<VideoQuality>().is_err());
    assert_eq!(VideoQuality::AtMost(480).to_string(), "480p");
}
