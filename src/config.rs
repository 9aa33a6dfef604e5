use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;

use crate::cli::Cli;

pub const DOWNLOADS_SUBDIR: &str = "downloads";

/// 运行时配置，由命令行参数转换而来
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub media_root: PathBuf,
    pub ytdlp_bin: PathBuf,
    pub ffmpeg_bin: PathBuf,
    pub users_file: Option<PathBuf>,
    pub session_ttl: Duration,
}

impl AppConfig {
    pub fn download_dir(&self) -> PathBuf {
        self.media_root.join(DOWNLOADS_SUBDIR)
    }
}

impl From<&Cli> for AppConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            bind: cli.bind,
            media_root: cli.media_root.clone(),
            ytdlp_bin: cli.ytdlp_bin.clone(),
            ffmpeg_bin: cli.ffmpeg_bin.clone(),
            users_file: cli.users_file.clone(),
            session_ttl: Duration::minutes(i64::from(cli.session_ttl_minutes)),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            media_root: PathBuf::from("./media"),
            ytdlp_bin: PathBuf::from("yt-dlp"),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            users_file: None,
            session_ttl: Duration::minutes(120),
        }
    }
}
