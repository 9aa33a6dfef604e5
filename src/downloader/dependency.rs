use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// 外部可执行文件的可用性探测
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn is_available(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct BinaryProbe {
    name: String,
    program: PathBuf,
    version_arg: &'static str,
}

impl BinaryProbe {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, version_arg: &'static str) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            version_arg,
        }
    }

    pub fn ffmpeg(program: impl Into<PathBuf>) -> Self {
        Self::new("FFmpeg", program, "-version")
    }
}

#[async_trait]
impl DependencyProbe for BinaryProbe {
    fn name(&self) -> &str {
        &self.name
    }

    // 能启动即视为已安装，不关心退出码
    async fn is_available(&self) -> bool {
        match Command::new(&self.program)
            .arg(self.version_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) => {
                debug!("{} 探测结果: {}", self.name, status);
                true
            }
            Err(e) => {
                debug!("{} 不可用 ({:?}): {}", self.name, self.program, e);
                false
            }
        }
    }
}
