use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use super::error::ExtractError;
use super::progress::{ProgressEvent, ProgressSink, ProgressStatus};
use super::stream_selector::StreamSelection;

pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

const PROGRESS_MARKER: &str = "[mediadl:progress]";
const TITLE_MARKER: &str = "[mediadl:title]";
const FILEPATH_MARKER: &str = "[mediadl:filepath]";

/// 一次提取调用的全部参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    pub output_dir: PathBuf,
    pub output_template: String,
    pub selection: StreamSelection,
}

impl ExtractionPlan {
    pub fn new(output_dir: impl Into<PathBuf>, selection: StreamSelection) -> Self {
        Self {
            output_dir: output_dir.into(),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            selection,
        }
    }

    pub fn output_path_template(&self) -> PathBuf {
        self.output_dir.join(&self.output_template)
    }
}

/// 提取器实际写出的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub title: Option<String>,
    pub filepath: Option<PathBuf>,
}

#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn extract(
        &self,
        url: &Url,
        plan: &ExtractionPlan,
        sink: &dyn ProgressSink,
    ) -> Result<ExtractionOutcome, ExtractError>;
}

/// yt-dlp 输出中我们关心的行
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorLine {
    Progress(ProgressEvent),
    Title(String),
    FilePath(PathBuf),
    Error(String),
    Warning(String),
    Other,
}

pub fn parse_line(line: &str) -> ExtractorLine {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = after_marker(line, PROGRESS_MARKER) {
        return parse_progress_fields(rest)
            .map(ExtractorLine::Progress)
            .unwrap_or(ExtractorLine::Other);
    }
    if let Some(rest) = after_marker(line, TITLE_MARKER) {
        return ExtractorLine::Title(rest.to_string());
    }
    if let Some(rest) = after_marker(line, FILEPATH_MARKER) {
        return ExtractorLine::FilePath(PathBuf::from(rest));
    }
    if let Some(rest) = line.strip_prefix("ERROR:") {
        return ExtractorLine::Error(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("WARNING:") {
        return ExtractorLine::Warning(rest.trim().to_string());
    }
    ExtractorLine::Other
}

fn after_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|idx| &line[idx + marker.len()..])
}

// status downloaded total total_estimate speed eta，缺失字段为 NA
fn parse_progress_fields(fields: &str) -> Option<ProgressEvent> {
    let mut parts = fields.split_whitespace();
    let status = ProgressStatus::parse(parts.next()?);
    let mut number = || {
        parts
            .next()
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| !value.is_nan())
    };

    Some(ProgressEvent {
        status,
        downloaded_bytes: number(),
        total_bytes: number(),
        total_bytes_estimate: number(),
        speed: number(),
        eta: number(),
    })
}

#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    program: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// 构造 yt-dlp 命令行参数
    pub fn build_args(url: &Url, plan: &ExtractionPlan) -> Vec<String> {
        let selection = &plan.selection;
        let mut args = vec!["-f".to_string(), selection.format_expression()];

        if let Some(container) = selection.merge_container {
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }
        if let Some(conversion) = selection.audio_conversion {
            args.extend([
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                conversion.codec.to_string(),
                "--audio-quality".to_string(),
                format!("{}K", conversion.bitrate_kbps),
            ]);
        }

        // --print 默认只模拟不下载，需要显式关闭
        args.extend([
            "--no-playlist".to_string(),
            "--no-simulate".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{}%(progress.status)s %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s %(progress.speed)s %(progress.eta)s",
                PROGRESS_MARKER
            ),
            "--print".to_string(),
            format!("after_move:{}%(title)s", TITLE_MARKER),
            "--print".to_string(),
            format!("after_move:{}%(filepath)s", FILEPATH_MARKER),
            "-o".to_string(),
            plan.output_path_template().to_string_lossy().to_string(),
            "--".to_string(),
            url.to_string(),
        ]);
        args
    }

    fn handle_line(
        line: &str,
        sink: &dyn ProgressSink,
        outcome: &mut ExtractionOutcome,
        errors: &mut Vec<String>,
    ) {
        match parse_line(line) {
            ExtractorLine::Progress(event) => {
                debug!("下载进度: {:?}", event);
                sink.on_progress(&event);
            }
            ExtractorLine::Title(title) => outcome.title = Some(title),
            ExtractorLine::FilePath(path) => {
                debug!("输出文件: {:?}", path);
                outcome.filepath = Some(path);
            }
            ExtractorLine::Error(message) => {
                warn!("yt-dlp 错误: {}", message);
                errors.push(message);
            }
            ExtractorLine::Warning(message) => warn!("yt-dlp 警告: {}", message),
            ExtractorLine::Other => {
                if !line.trim().is_empty() {
                    debug!("yt-dlp: {}", line);
                }
            }
        }
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract(
        &self,
        url: &Url,
        plan: &ExtractionPlan,
        sink: &dyn ProgressSink,
    ) -> Result<ExtractionOutcome, ExtractError> {
        let args = Self::build_args(url, plan);
        info!("开始调用 yt-dlp: {}", url);
        debug!("yt-dlp 参数: {:?}", args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::Reported("missing stdout pipe".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractError::Reported("missing stderr pipe".to_string()))?;

        // 安静模式下进度行会写到 stderr，两路都要读
        // 按字节切行，标题等内容可能不是合法 UTF-8
        let mut out_lines = BufReader::new(stdout).split(b'\n');
        let mut err_lines = BufReader::new(stderr).split(b'\n');
        let (mut out_done, mut err_done) = (false, false);
        let mut outcome = ExtractionOutcome::default();
        let mut errors = Vec::new();

        while !(out_done && err_done) {
            let (segment, from_stderr) = tokio::select! {
                read = out_lines.next_segment(), if !out_done => (read?, false),
                read = err_lines.next_segment(), if !err_done => (read?, true),
            };

            match segment {
                Some(bytes) => {
                    let line = String::from_utf8_lossy(&bytes);
                    Self::handle_line(&line, sink, &mut outcome, &mut errors);
                }
                None if from_stderr => err_done = true,
                None => out_done = true,
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(match errors.pop() {
                Some(message) => ExtractError::Reported(message),
                None => ExtractError::Exit(status),
            });
        }

        info!("yt-dlp 完成: {:?}", outcome.filepath);
        Ok(outcome)
    }
}
