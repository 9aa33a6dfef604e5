use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// 在线视频下载网站
#[derive(Parser, Debug)]
#[command(name = "mediadl")]
#[command(version = "1.0")]
#[command(author = "rpeng252@gmail.com")]
#[command(about = "需要登录的在线视频/音频下载服务", long_about = None)]
pub struct Cli {
    /// 监听地址
    #[arg(long, value_name = "ADDR", env = "MEDIADL_BIND")]
    #[arg(default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// 媒体根目录，下载文件保存在其中的 downloads 子目录
    #[arg(long, value_name = "DIR", env = "MEDIADL_MEDIA_ROOT")]
    #[arg(default_value = "./media")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub media_root: PathBuf,

    /// yt-dlp 可执行文件
    #[arg(long, value_name = "PATH", env = "MEDIADL_YTDLP")]
    #[arg(default_value = "yt-dlp")]
    pub ytdlp_bin: PathBuf,

    /// FFmpeg 可执行文件
    #[arg(long, value_name = "PATH", env = "MEDIADL_FFMPEG")]
    #[arg(default_value = "ffmpeg")]
    pub ffmpeg_bin: PathBuf,

    /// 用户数据文件 (不指定则账号只保存在内存中)
    #[arg(long, value_name = "FILE", env = "MEDIADL_USERS_FILE")]
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub users_file: Option<PathBuf>,

    /// 会话空闲过期时间 (分钟)
    #[arg(long, value_name = "MINUTES", env = "MEDIADL_SESSION_TTL")]
    #[arg(default_value_t = 120)]
    pub session_ttl_minutes: u32,

    /// 输出调试日志
    #[arg(short, long)]
    pub verbose: bool,
}
