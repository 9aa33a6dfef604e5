use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::{SessionId, SessionStore};

/// 会话中保存进度记录的槽位名
pub const PROGRESS_SLOT: &str = "download_progress";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// 轮询接口返回的进度快照
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ProgressRecord {
    /// 完成百分比，保留一位小数
    pub progress: f64,
    /// MB/s，保留两位小数
    pub speed: f64,
    /// 剩余秒数
    pub eta: u64,
}

impl ProgressRecord {
    /// 读取会话中的进度，不存在时返回全零
    pub fn load(sessions: &SessionStore, session_id: &SessionId) -> Self {
        match sessions.get_slot::<ProgressRecord>(session_id, PROGRESS_SLOT) {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!("读取下载进度失败: {}", e);
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressStatus {
    Downloading,
    Finished,
    Error,
    #[default]
    Other,
}

impl ProgressStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "downloading" => ProgressStatus::Downloading,
            "finished" => ProgressStatus::Finished,
            "error" => ProgressStatus::Error,
            _ => ProgressStatus::Other,
        }
    }
}

/// 提取器上报的原始传输状态
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub total_bytes_estimate: Option<f64>,
    /// 字节/秒
    pub speed: Option<f64>,
    pub eta: Option<f64>,
}

impl ProgressEvent {
    pub fn downloading(
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
        speed: Option<f64>,
        eta: Option<u64>,
    ) -> Self {
        Self {
            status: ProgressStatus::Downloading,
            downloaded_bytes: Some(downloaded_bytes as f64),
            total_bytes: total_bytes.map(|t| t as f64),
            total_bytes_estimate: None,
            speed,
            eta: eta.map(|e| e as f64),
        }
    }

    /// 优先使用精确大小，其次使用估计大小
    pub fn known_total(&self) -> Option<f64> {
        let usable = |total: &f64| total.is_finite() && *total > 0.0;
        self.total_bytes
            .filter(usable)
            .or_else(|| self.total_bytes_estimate.filter(usable))
    }
}

/// 传输进度事件的消费者
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ProgressError {
    #[error("无效的下载比例: {downloaded}/{total}")]
    InvalidRatio { downloaded: f64, total: f64 },

    #[error("无效的下载速度: {0}")]
    InvalidSpeed(f64),
}

/// 将一次回调压缩为进度记录；返回 None 表示本次不写入
pub fn condense(event: &ProgressEvent) -> Result<Option<ProgressRecord>, ProgressError> {
    if event.status != ProgressStatus::Downloading {
        return Ok(None);
    }
    let Some(total) = event.known_total() else {
        return Ok(None);
    };

    let downloaded = event.downloaded_bytes.unwrap_or(0.0);
    let ratio = downloaded / total;
    if !ratio.is_finite() || ratio < 0.0 {
        return Err(ProgressError::InvalidRatio { downloaded, total });
    }

    let Some(speed) = event.speed.filter(|s| *s != 0.0) else {
        return Ok(None);
    };
    if !speed.is_finite() || speed < 0.0 {
        return Err(ProgressError::InvalidSpeed(speed));
    }

    let eta = event
        .eta
        .filter(|e| e.is_finite() && *e >= 0.0)
        .map(|e| e.round() as u64)
        .unwrap_or(0);

    Ok(Some(ProgressRecord {
        progress: round_to(ratio * 100.0, 1).min(100.0),
        speed: round_to(speed / BYTES_PER_MB, 2),
        eta,
    }))
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// 每次下载创建一个，绑定到发起请求的会话
#[derive(Debug, Clone)]
pub struct ProgressRelay {
    sessions: Arc<SessionStore>,
    session_id: SessionId,
}

impl ProgressRelay {
    pub fn new(sessions: Arc<SessionStore>, session_id: SessionId) -> Self {
        Self {
            sessions,
            session_id,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn clear(&self) {
        if self.sessions.remove_slot(&self.session_id, PROGRESS_SLOT) {
            debug!("已清除会话进度: {}", self.session_id);
        }
    }
}

impl ProgressSink for ProgressRelay {
    fn on_progress(&self, event: &ProgressEvent) {
        match condense(event) {
            Ok(Some(record)) => {
                if let Err(e) = self
                    .sessions
                    .set_slot(&self.session_id, PROGRESS_SLOT, &record)
                {
                    warn!("写入下载进度失败: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("进度计算错误: {}", e),
        }
    }
}
