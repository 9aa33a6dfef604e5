use std::fmt;

use super::models::{TargetFormat, VideoQuality};

pub const MERGE_CONTAINER: &str = "mp4";
pub const AUDIO_CODEC: &str = "mp3";
pub const AUDIO_BITRATE_KBPS: u32 = 192;

/// 流过滤条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamFilter {
    pub max_height: Option<u32>,
    pub ext: Option<&'static str>,
}

impl StreamFilter {
    pub const ANY: StreamFilter = StreamFilter {
        max_height: None,
        ext: None,
    };

    pub fn new(max_height: Option<u32>, ext: Option<&'static str>) -> Self {
        Self { max_height, ext }
    }

    pub fn matches(&self, stream: &AvailableStream) -> bool {
        let height_ok = match self.max_height {
            Some(max) => stream.height.is_some_and(|h| h <= max),
            None => true,
        };
        let ext_ok = self.ext.is_none_or(|ext| stream.ext == ext);
        height_ok && ext_ok
    }
}

impl fmt::Display for StreamFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(height) = self.max_height {
            write!(f, "[height<={}]", height)?;
        }
        if let Some(ext) = self.ext {
            write!(f, "[ext={}]", ext)?;
        }
        Ok(())
    }
}

/// 备选链中的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamChoice {
    /// 已包含音视频的单一流
    Best(StreamFilter),
    /// 纯视频流 + 纯音频流，下载后合并
    Merge {
        video: StreamFilter,
        audio: StreamFilter,
    },
    /// 纯音频流
    BestAudio(StreamFilter),
}

impl fmt::Display for StreamChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamChoice::Best(filter) => write!(f, "best{}", filter),
            StreamChoice::Merge { video, audio } => {
                write!(f, "bestvideo{}+bestaudio{}", video, audio)
            }
            StreamChoice::BestAudio(filter) => write!(f, "bestaudio{}", filter),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConversion {
    pub codec: &'static str,
    pub bitrate_kbps: u32,
}

/// 从格式/清晰度得到的流选择描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSelection {
    /// 依次尝试，第一个可满足的生效
    pub alternatives: Vec<StreamChoice>,
    pub merge_container: Option<&'static str>,
    pub audio_conversion: Option<AudioConversion>,
}

impl StreamSelection {
    pub fn for_request(format: TargetFormat, quality: VideoQuality) -> Self {
        match format {
            TargetFormat::Mp4 => Self {
                alternatives: video_alternatives(quality),
                merge_container: Some(MERGE_CONTAINER),
                audio_conversion: None,
            },
            TargetFormat::Mp3 => Self {
                alternatives: vec![
                    StreamChoice::BestAudio(StreamFilter::ANY),
                    StreamChoice::Best(StreamFilter::ANY),
                ],
                merge_container: None,
                audio_conversion: Some(AudioConversion {
                    codec: AUDIO_CODEC,
                    bitrate_kbps: AUDIO_BITRATE_KBPS,
                }),
            },
        }
    }

    /// yt-dlp `-f` 表达式
    pub fn format_expression(&self) -> String {
        self.alternatives
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// 在给定的可用流中按备选链挑选
    ///
    /// 与 yt-dlp 对 `format_expression()` 的求值规则一致: 依次尝试每个备选，
    /// 同类流中取高度最高、码率最高者。不调用 yt-dlp，用于离线校验选择结果
    pub fn resolve<'a>(&self, streams: &'a [AvailableStream]) -> Option<ResolvedStreams<'a>> {
        self.alternatives
            .iter()
            .find_map(|choice| resolve_choice(choice, streams))
    }
}

fn video_alternatives(quality: VideoQuality) -> Vec<StreamChoice> {
    let mp4 = Some("mp4");
    let m4a = Some("m4a");

    match quality.max_height() {
        None => vec![
            StreamChoice::Best(StreamFilter::new(None, mp4)),
            StreamChoice::Merge {
                video: StreamFilter::new(None, mp4),
                audio: StreamFilter::new(None, m4a),
            },
            StreamChoice::Best(StreamFilter::ANY),
        ],
        // 先找不超过目标高度的流，都没有时才退回到最佳
        Some(height) => vec![
            StreamChoice::Merge {
                video: StreamFilter::new(Some(height), mp4),
                audio: StreamFilter::new(None, m4a),
            },
            StreamChoice::Best(StreamFilter::new(Some(height), mp4)),
            StreamChoice::Merge {
                video: StreamFilter::new(Some(height), None),
                audio: StreamFilter::ANY,
            },
            StreamChoice::Best(StreamFilter::new(Some(height), None)),
            StreamChoice::Best(StreamFilter::ANY),
        ],
    }
}

/// 站点提供的一条可下载流，对应 yt-dlp `formats` 列表中的一项
///
/// 仅作为 [`StreamSelection::resolve`] 的输入
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableStream {
    pub id: String,
    pub ext: String,
    pub height: Option<u32>,
    pub has_video: bool,
    pub has_audio: bool,
    /// 码率 (kbit/s)，同高度时用于排序
    pub bitrate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedStreams<'a> {
    Single(&'a AvailableStream),
    Merged {
        video: &'a AvailableStream,
        audio: &'a AvailableStream,
    },
}

impl ResolvedStreams<'_> {
    pub fn height(&self) -> Option<u32> {
        match self {
            ResolvedStreams::Single(stream) => stream.height,
            ResolvedStreams::Merged { video, .. } => video.height,
        }
    }
}

fn resolve_choice<'a>(
    choice: &StreamChoice,
    streams: &'a [AvailableStream],
) -> Option<ResolvedStreams<'a>> {
    match choice {
        StreamChoice::Best(filter) => best_of(streams, |s| s.has_video && s.has_audio, filter)
            .map(ResolvedStreams::Single),
        StreamChoice::Merge { video, audio } => {
            let video = best_of(streams, |s| s.has_video && !s.has_audio, video)?;
            let audio = best_of(streams, |s| s.has_audio && !s.has_video, audio)?;
            Some(ResolvedStreams::Merged { video, audio })
        }
        StreamChoice::BestAudio(filter) => best_of(streams, |s| s.has_audio && !s.has_video, filter)
            .map(ResolvedStreams::Single),
    }
}

fn best_of<'a>(
    streams: &'a [AvailableStream],
    kind: impl Fn(&AvailableStream) -> bool,
    filter: &StreamFilter,
) -> Option<&'a AvailableStream> {
    streams
        .iter()
        .filter(|s| kind(s) && filter.matches(s))
        .max_by(|a, b| {
            a.height
                .unwrap_or(0)
                .cmp(&b.height.unwrap_or(0))
                .then(a.bitrate.total_cmp(&b.bitrate))
        })
}
