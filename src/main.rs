use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};

use media_downloader::cli::Cli;
use media_downloader::common::logger::{PrettyLogger, init_tracing};
use media_downloader::config::AppConfig;
use media_downloader::web::{self, AppState};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 解析命令行参数
    let args = Cli::parse();

    // 初始化日志
    init_tracing(args.verbose);

    let config = AppConfig::from(&args);
    PrettyLogger::title("mediadl");
    PrettyLogger::file_info("下载目录", config.download_dir().display().to_string());
    if let Some(users_file) = &config.users_file {
        PrettyLogger::file_info("用户文件", users_file.display().to_string());
    } else {
        PrettyLogger::warning("未指定用户文件，账号仅保存在内存中");
    }

    let state = AppState::from_config(config).await?;

    if !state.orchestrator.transcoder_available().await {
        warn!(
            "{} 未安装，下载功能将不可用",
            state.orchestrator.transcoder_name()
        );
    }

    let sweeper = state.sessions.spawn_sweeper(SESSION_SWEEP_INTERVAL);
    PrettyLogger::info(format!("监听地址: http://{}", state.config.bind));

    let result = web::serve(state).await;
    sweeper.abort();

    info!("服务已停止");
    PrettyLogger::success("再见!");
    result
}
