use serde::Deserialize;
use url::Url;

use crate::auth::{password_problems, username_problems};
use crate::downloader::{DownloadRequest, TargetFormat, VideoQuality};

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// 表单校验错误，按字段收集
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<FieldError>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn for_field(&self, field: &str) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadForm {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

impl DownloadForm {
    pub fn validate(&self) -> Result<DownloadRequest, FormErrors> {
        let mut errors = FormErrors::default();

        let url = match self.url.trim() {
            "" => {
                errors.add("url", REQUIRED);
                None
            }
            raw => match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
                    Some(url)
                }
                _ => {
                    errors.add("url", "Enter a valid URL.");
                    None
                }
            },
        };

        let format = match non_blank(&self.format) {
            Some(raw) => raw
                .parse::<TargetFormat>()
                .map_err(|e| errors.add("format", e))
                .ok(),
            None => Some(TargetFormat::default()),
        };

        let quality = match non_blank(&self.quality) {
            Some(raw) if !VideoQuality::CHOICES.contains(&raw.to_ascii_lowercase().as_str()) => {
                errors.add(
                    "quality",
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        raw
                    ),
                );
                None
            }
            Some(raw) => raw
                .parse::<VideoQuality>()
                .map_err(|e| errors.add("quality", e))
                .ok(),
            None => Some(VideoQuality::default()),
        };

        match (url, format, quality) {
            (Some(url), Some(format), Some(quality)) if errors.is_empty() => {
                Ok(DownloadRequest::new(url, format, quality))
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();

        for problem in username_problems(username) {
            errors.add("username", problem);
        }
        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        } else {
            for problem in password_problems(username, &self.password2) {
                errors.add("password2", problem);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 只允许站内相对路径跳转
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.map(str::trim)
        .filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}
