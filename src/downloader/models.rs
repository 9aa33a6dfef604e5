use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// 用户请求的目标格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// 视频 (mp4 容器)
    #[default]
    Mp4,
    /// 仅音频 (转码为 mp3)
    Mp3,
}

impl TargetFormat {
    pub const CHOICES: [&'static str; 2] = ["mp4", "mp3"];

    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Mp4 => "mp4",
            TargetFormat::Mp3 => "mp3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TargetFormat::Mp4 => "MP4",
            TargetFormat::Mp3 => "MP3",
        }
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(TargetFormat::Mp4),
            "mp3" => Ok(TargetFormat::Mp3),
            other => Err(format!(
                "Select a valid choice. {} is not one of the available choices.",
                other
            )),
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// 视频清晰度选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoQuality {
    /// 不限制分辨率
    #[default]
    Highest,
    /// 不超过给定高度 (如 720p)
    AtMost(u32),
}

impl VideoQuality {
    /// 表单中提供的选项
    pub const CHOICES: [&'static str; 5] = ["highest", "1080p", "720p", "480p", "360p"];

    pub fn max_height(&self) -> Option<u32> {
        match self {
            VideoQuality::Highest => None,
            VideoQuality::AtMost(height) => Some(*height),
        }
    }
}

impl FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        if value == "highest" {
            return Ok(VideoQuality::Highest);
        }

        value
            .strip_suffix('p')
            .and_then(|height| height.parse::<u32>().ok())
            .filter(|height| *height > 0)
            .map(VideoQuality::AtMost)
            .ok_or_else(|| {
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    s.trim()
                )
            })
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoQuality::Highest => f.write_str("highest"),
            VideoQuality::AtMost(height) => write!(f, "{}p", height),
        }
    }
}

/// 一次下载请求，校验通过后才会构造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: Url,
    pub format: TargetFormat,
    pub quality: VideoQuality,
}

impl DownloadRequest {
    pub fn new(url: Url, format: TargetFormat, quality: VideoQuality) -> Self {
        Self {
            url,
            format,
            quality,
        }
    }
}
