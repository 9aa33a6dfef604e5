use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// 提取器 (yt-dlp) 调用失败
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Reported(String),

    #[error("extractor exited with {0}")]
    Exit(ExitStatus),

    #[error("failed to read extractor output: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    MissingDependency,
    Extraction,
    Integrity,
    Setup,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{binary} is not installed. Please install {binary} to download videos.")]
    MissingDependency { binary: String },

    #[error("Download Error: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Download Process Error: Downloaded file not found ({})", .0.display())]
    OutputMissing(PathBuf),

    #[error("Download Process Error: the extractor did not report an output file")]
    OutputUnreported,

    #[error("Setup Error: {0}")]
    Setup(#[from] std::io::Error),
}

impl DownloadError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DownloadError::MissingDependency { .. } => ErrorCategory::MissingDependency,
            DownloadError::Extraction(_) => ErrorCategory::Extraction,
            DownloadError::OutputMissing(_) | DownloadError::OutputUnreported => {
                ErrorCategory::Integrity
            }
            DownloadError::Setup(_) => ErrorCategory::Setup,
        }
    }

    /// 展示给用户的提示
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
