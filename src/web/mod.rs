pub mod forms;
pub mod handlers;
pub mod pages;
pub mod session_layer;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{AuthManager, SessionStore};
use crate::config::AppConfig;
use crate::downloader::{BinaryProbe, DownloadOrchestrator, YtDlpExtractor};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionStore>,
    pub auth: Arc<AuthManager>,
    pub orchestrator: Arc<DownloadOrchestrator>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sessions: Arc<SessionStore>,
        auth: Arc<AuthManager>,
        orchestrator: Arc<DownloadOrchestrator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            auth,
            orchestrator,
        }
    }

    /// 按配置组装真实的 yt-dlp / FFmpeg 依赖
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let sessions = Arc::new(SessionStore::new(config.session_ttl));

        let auth = match &config.users_file {
            Some(path) => AuthManager::with_users_file(path)
                .await
                .with_context(|| format!("加载用户文件失败: {:?}", path))?,
            None => AuthManager::new(),
        };

        let orchestrator = DownloadOrchestrator::new(
            Arc::clone(&sessions),
            Arc::new(YtDlpExtractor::new(config.ytdlp_bin.clone())),
            Arc::new(BinaryProbe::ffmpeg(config.ffmpeg_bin.clone())),
            config.download_dir(),
        );

        Ok(Self::new(config, sessions, Arc::new(auth), Arc::new(orchestrator)))
    }
}

pub fn router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(handlers::home_page).post(handlers::home_submit))
        .route(
            "/register/",
            get(handlers::register_page).post(handlers::register_submit),
        )
        .route(
            "/login/",
            get(handlers::login_page).post(handlers::login_submit),
        )
        .route("/logout/", get(handlers::logout).post(handlers::logout))
        .route("/profile/", get(handlers::profile))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_layer::session_layer,
        ));

    Router::new()
        .merge(pages)
        .route("/get-progress/", get(handlers::get_progress))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    info!("服务已启动: http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听 Ctrl+C: {}", e);
    }
    info!("收到退出信号，正在关闭服务");
}
