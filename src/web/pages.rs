use axum::response::Html;

use crate::auth::{FlashMessage, UserRecord};
use crate::downloader::{TargetFormat, VideoQuality};

use super::forms::{DownloadForm, FormErrors};

const PROGRESS_SCRIPT: &str = r#"<script>
document.getElementById('download-form').addEventListener('submit', function () {
  var box = document.getElementById('progress');
  box.hidden = false;
  setInterval(function () {
    fetch('/get-progress/', { credentials: 'same-origin' })
      .then(function (r) { return r.json(); })
      .then(function (p) {
        box.textContent = p.progress.toFixed(1) + '% | ' + p.speed.toFixed(2) + ' MB/s | ETA ' + p.eta + 's';
      });
  }, 1000);
});
</script>"#;

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, user: Option<&str>, flashes: &[FlashMessage], body: &str) -> Html<String> {
    let nav = match user {
        Some(user) => format!(
            r#"<span>{}</span> <a href="/profile/">Profile</a> <form method="post" action="/logout/" style="display:inline"><button type="submit">Logout</button></form>"#,
            escape(user)
        ),
        None => r#"<a href="/login/">Login</a> <a href="/register/">Register</a>"#.to_string(),
    };

    let messages: String = flashes
        .iter()
        .map(|m| {
            format!(
                r#"<li class="alert alert-{}">{}</li>"#,
                m.level.as_str(),
                escape(&m.text)
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<nav><a href="/">Home</a> {nav}</nav>
<ul class="messages">{messages}</ul>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}

fn field_errors(errors: &FormErrors, field: &str) -> String {
    errors
        .for_field(field)
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .collect()
}

fn options(choices: &[&str], selected: &str) -> String {
    choices
        .iter()
        .map(|choice| {
            let mark = if choice.eq_ignore_ascii_case(selected) { " selected" } else { "" };
            format!(
                r#"<option value="{v}"{mark}>{v}</option>"#,
                v = escape(choice)
            )
        })
        .collect()
}

pub fn home(
    user: &str,
    flashes: &[FlashMessage],
    form: &DownloadForm,
    transcoder_available: bool,
) -> Html<String> {
    let format = form.format.clone().unwrap_or_else(|| TargetFormat::default().to_string());
    let quality = form
        .quality
        .clone()
        .unwrap_or_else(|| VideoQuality::default().to_string());
    let disabled = if transcoder_available { "" } else { " disabled" };

    let body = format!(
        r#"<form id="download-form" method="post" action="/">
<input type="url" name="url" class="form-control" placeholder="Paste YouTube URL here..." value="{url}" required>
<select name="format">{formats}</select>
<select name="quality">{qualities}</select>
<button type="submit"{disabled}>Download</button>
</form>
<div id="progress" hidden>0.0% | 0.00 MB/s | ETA 0s</div>
{script}"#,
        url = escape(&form.url),
        formats = options(&TargetFormat::CHOICES, &format),
        qualities = options(&VideoQuality::CHOICES, &quality),
        script = PROGRESS_SCRIPT,
    );
    layout("Video Downloader", Some(user), flashes, &body)
}

pub fn login(flashes: &[FlashMessage], errors: &FormErrors, username: &str, next: Option<&str>) -> Html<String> {
    let next = next
        .map(|n| format!(r#"<input type="hidden" name="next" value="{}">"#, escape(n)))
        .unwrap_or_default();

    let body = format!(
        r#"<form method="post" action="/login/">
{next}
{general}
<label>Username <input type="text" name="username" value="{username}"></label>
{username_errors}
<label>Password <input type="password" name="password"></label>
{password_errors}
<button type="submit">Login</button>
</form>
<p>No account? <a href="/register/">Register</a></p>"#,
        general = field_errors(errors, "__all__"),
        username = escape(username),
        username_errors = field_errors(errors, "username"),
        password_errors = field_errors(errors, "password"),
    );
    layout("Login", None, flashes, &body)
}

pub fn register(flashes: &[FlashMessage], errors: &FormErrors, username: &str) -> Html<String> {
    let body = format!(
        r#"<form method="post" action="/register/">
<label>Username <input type="text" name="username" value="{username}"></label>
{username_errors}
<label>Password1 <input type="password" name="password1"></label>
{password1_errors}
<label>Password2 <input type="password" name="password2"></label>
{password2_errors}
<button type="submit">Register</button>
</form>
<p>Already registered? <a href="/login/">Login</a></p>"#,
        username = escape(username),
        username_errors = field_errors(errors, "username"),
        password1_errors = field_errors(errors, "password1"),
        password2_errors = field_errors(errors, "password2"),
    );
    layout("Register", None, flashes, &body)
}

pub fn profile(user: &UserRecord, flashes: &[FlashMessage]) -> Html<String> {
    let body = format!(
        r#"<dl><dt>Username</dt><dd>{}</dd><dt>Joined</dt><dd>{}</dd></dl>"#,
        escape(&user.username),
        user.date_joined.format("%Y-%m-%d %H:%M UTC"),
    );
    layout("Profile", Some(&user.username), flashes, &body)
}
