use media_downloader::downloader::{TargetFormat, VideoQuality};
use media_downloader::web::forms::{DownloadForm, LoginForm, RegisterForm, safe_next};

fn download_form(url: &str, format: Option<&str>, quality: Option<&str>) -> DownloadForm {
    DownloadForm {
        url: url.to_string(),
        format: format.map(str::to_string),
        quality: quality.map(str::to_string),
    }
}

#[test]
fn test_download_form_defaults() {
    let request = download_form("https://www.youtube.com/watch?v=dQw4w9WgXcQ", None, None)
        .validate()
        .expect("表单应当有效");
    assert_eq!(request.format, TargetFormat::Mp4);
    assert_eq!(request.quality, VideoQuality::Highest);
    assert_eq!(request.url.host_str(), Some("www.youtube.com"));
}

#[test]
fn test_download_form_audio_with_quality() {
    let request = download_form("https://youtu.be/abc", Some("mp3"), Some("720p"))
        .validate()
        .unwrap();
    assert_eq!(request.format, TargetFormat::Mp3);
    assert_eq!(request.quality, VideoQuality::AtMost(720));
}

#[test]
fn test_download_form_rejects_bad_input() {
    let errors = download_form("", None, None).validate().unwrap_err();
    assert_eq!(errors.for_field("url").collect::<Vec<_>>(), vec!["This field is required."]);

    let errors = download_form("ftp://example.com/file", None, None).validate().unwrap_err();
    assert_eq!(errors.for_field("url").collect::<Vec<_>>(), vec!["Enter a valid URL."]);

    let errors = download_form("not a url", Some("avi"), Some("999p")).validate().unwrap_err();
    assert_eq!(errors.for_field("url").count(), 1);
    assert_eq!(errors.for_field("format").count(), 1);
    assert_eq!(errors.for_field("quality").count(), 1);
}

#[test]
fn test_register_form_rules() {
    let ok = RegisterForm {
        username: "alice".into(),
        password1: "correct-horse".into(),
        password2: "correct-horse".into(),
    };
    assert!(ok.validate().is_ok());

    let mismatch = RegisterForm {
        password2: "correct-horsf".into(),
        ..ok.clone()
    };
    let errors = mismatch.validate().unwrap_err();
    assert_eq!(
        errors.for_field("password2").collect::<Vec<_>>(),
        vec!["The two password fields didn't match."]
    );

    let weak = RegisterForm {
        username: "bob smith".into(),
        password1: "1234".into(),
        password2: "1234".into(),
    };
    let errors = weak.validate().unwrap_err();
    assert_eq!(errors.for_field("username").count(), 1);
    assert_eq!(errors.for_field("password2").count(), 2);
}

#[test]
fn test_login_form_requires_fields() {
    let errors = LoginForm::default().validate().unwrap_err();
    assert_eq!(errors.for_field("username").count(), 1);
    assert_eq!(errors.for_field("password").count(), 1);
}

#[test]
fn test_safe_next_only_allows_local_paths() {
    assert_eq!(safe_next(Some("/profile/")), Some("/profile/"));
    assert_eq!(safe_next(Some("//evil.example")), None);
    assert_eq!(safe_next(Some("https://evil.example")), None);
    assert_eq!(safe_next(None), None);
}
