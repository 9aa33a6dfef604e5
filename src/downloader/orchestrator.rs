use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::auth::{SessionId, SessionStore};

use super::dependency::DependencyProbe;
use super::error::DownloadError;
use super::models::{DownloadRequest, TargetFormat};
use super::progress::ProgressRelay;
use super::stream_selector::StreamSelection;
use super::ytdlp::{ExtractionPlan, MediaExtractor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDownload {
    pub title: String,
    pub path: PathBuf,
    pub format: TargetFormat,
}

impl CompletedDownload {
    pub fn success_message(&self) -> String {
        format!(
            "Successfully downloaded: {} ({})",
            self.title,
            self.format.label()
        )
    }
}

/// 协调一次下载: 依赖检查、目录准备、调用提取器、校验输出
pub struct DownloadOrchestrator {
    sessions: Arc<SessionStore>,
    extractor: Arc<dyn MediaExtractor>,
    transcoder: Arc<dyn DependencyProbe>,
    download_dir: PathBuf,
}

impl DownloadOrchestrator {
    pub fn new(
        sessions: Arc<SessionStore>,
        extractor: Arc<dyn MediaExtractor>,
        transcoder: Arc<dyn DependencyProbe>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sessions,
            extractor,
            transcoder,
            download_dir: download_dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub async fn transcoder_available(&self) -> bool {
        self.transcoder.is_available().await
    }

    pub fn transcoder_name(&self) -> &str {
        self.transcoder.name()
    }

    /// 无论成功失败，结束时都会清除会话中的进度记录
    pub async fn download(
        &self,
        session_id: SessionId,
        request: &DownloadRequest,
    ) -> Result<CompletedDownload, DownloadError> {
        info!(
            "下载请求 - URL: {}, 格式: {}, 清晰度: {}",
            request.url, request.format, request.quality
        );

        let relay = ProgressRelay::new(Arc::clone(&self.sessions), session_id);
        let result = self.attempt(&relay, request).await;
        relay.clear();

        match &result {
            Ok(done) => info!("下载完成: {} -> {:?}", done.title, done.path),
            Err(e) => error!("下载失败 ({:?}): {}", e.category(), e),
        }
        result
    }

    async fn attempt(
        &self,
        relay: &ProgressRelay,
        request: &DownloadRequest,
    ) -> Result<CompletedDownload, DownloadError> {
        if !self.transcoder.is_available().await {
            warn!("{} 未安装，放弃下载", self.transcoder.name());
            return Err(DownloadError::MissingDependency {
                binary: self.transcoder.name().to_string(),
            });
        }

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let download_dir = tokio::fs::canonicalize(&self.download_dir).await?;
        debug!("下载目录: {:?}", download_dir);

        let selection = StreamSelection::for_request(request.format, request.quality);
        let plan = ExtractionPlan::new(download_dir, selection);
        debug!("格式表达式: {}", plan.selection.format_expression());

        let outcome = self.extractor.extract(&request.url, &plan, relay).await?;

        // 以提取器报告的实际路径为准
        let path = outcome.filepath.ok_or(DownloadError::OutputUnreported)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(DownloadError::OutputMissing(path));
        }

        let title = outcome
            .title
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "Unknown Title".to_string());

        Ok(CompletedDownload {
            title,
            path,
            format: request.format,
        })
    }
}
