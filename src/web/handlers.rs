use std::sync::Arc;

use axum::Form;
use axum::Json;
use axum::extract::rejection::FormRejection;
use axum::extract::{Extension, OriginalUri, Query, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthError, FlashLevel, SessionId};
use crate::downloader::{PROGRESS_SLOT, ProgressRecord};

use super::AppState;
use super::forms::{DownloadForm, FormErrors, LoginForm, RegisterForm, safe_next};
use super::pages;
use super::session_layer::{CurrentSession, expired_session_cookie, session_cookie, session_id_from_headers};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// 未登录时跳转到登录页并带上 next
fn require_user(state: &AppState, session: SessionId, uri: &OriginalUri) -> Result<String, Response> {
    match state.sessions.user(&session) {
        Some(user) => Ok(user),
        None => {
            let query = serde_urlencoded::to_string(&[("next", uri.0.path())]).unwrap_or_default();
            Err(Redirect::to(&format!("/login/?{}", query)).into_response())
        }
    }
}

pub async fn home_page(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    uri: OriginalUri,
) -> Response {
    let user = match require_user(&state, session, &uri) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let transcoder_available = state.orchestrator.transcoder_available().await;
    if !transcoder_available {
        warn!("{} 未安装!", state.orchestrator.transcoder_name());
        state.sessions.push_flash(
            &session,
            FlashLevel::Warning,
            format!(
                "{} is not installed. Some features may not work properly.",
                state.orchestrator.transcoder_name()
            ),
        );
    }

    let flashes = state.sessions.take_flashes(&session);
    pages::home(&user, &flashes, &DownloadForm::default(), transcoder_available).into_response()
}

pub async fn home_submit(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    uri: OriginalUri,
    form: Result<Form<DownloadForm>, FormRejection>,
) -> Response {
    // 先检查登录，再处理表单解析错误
    let user = match require_user(&state, session, &uri) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            debug!("下载表单解析失败: {}", rejection);
            return rejection.into_response();
        }
    };

    let request = match form.validate() {
        Ok(request) => request,
        Err(errors) => {
            debug!("下载表单校验失败: {:?}", errors);
            for e in errors.iter() {
                state
                    .sessions
                    .push_flash(&session, FlashLevel::Error, format!("{}: {}", e.field, e.message));
            }
            let transcoder_available = state.orchestrator.transcoder_available().await;
            let flashes = state.sessions.take_flashes(&session);
            return pages::home(&user, &flashes, &form, transcoder_available).into_response();
        }
    };

    info!("用户 {} 提交下载: {}", user, request.url);

    // 放到独立任务中执行，客户端断开也会跑完
    let orchestrator = Arc::clone(&state.orchestrator);
    let handle = tokio::spawn(async move { orchestrator.download(session, &request).await });

    match handle.await {
        Ok(Ok(done)) => {
            state
                .sessions
                .push_flash(&session, FlashLevel::Success, done.success_message());
        }
        Ok(Err(e)) => {
            state
                .sessions
                .push_flash(&session, FlashLevel::Error, e.user_message());
        }
        Err(e) => {
            error!("下载任务异常退出: {}", e);
            state.sessions.remove_slot(&session, PROGRESS_SLOT);
            state.sessions.push_flash(
                &session,
                FlashLevel::Error,
                format!("Download Process Error: {}", e),
            );
        }
    }

    Redirect::to("/").into_response()
}

/// 轮询接口：只读取，不创建会话
pub async fn get_progress(State(state): State<AppState>, headers: HeaderMap) -> Json<ProgressRecord> {
    let record = session_id_from_headers(&headers)
        .map(|id| ProgressRecord::load(&state.sessions, &id))
        .unwrap_or_default();
    Json(record)
}

pub async fn register_page(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Response {
    let flashes = state.sessions.take_flashes(&session);
    pages::register(&flashes, &FormErrors::default(), "").into_response()
}

pub async fn register_submit(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let mut errors = match form.validate() {
        Ok(()) => FormErrors::default(),
        Err(errors) => errors,
    };

    if errors.is_empty() {
        match state.auth.register(&form.username, &form.password1).await {
            Ok(record) => {
                state.sessions.push_flash(
                    &session,
                    FlashLevel::Success,
                    format!("Account created for {}! You can now log in", record.username),
                );
                return Redirect::to("/login/").into_response();
            }
            Err(e @ AuthError::UsernameTaken) | Err(e @ AuthError::InvalidUsername(_)) => {
                errors.add("username", e.to_string());
            }
            Err(e @ AuthError::WeakPassword(_)) => errors.add("password2", e.to_string()),
            Err(e) => {
                error!("注册失败: {}", e);
                errors.add("username", "Registration failed, please try again later.");
            }
        }
    }

    let flashes = state.sessions.take_flashes(&session);
    pages::register(&flashes, &errors, form.username.trim()).into_response()
}

pub async fn login_page(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Query(query): Query<NextQuery>,
) -> Response {
    if state.sessions.user(&session).is_some() {
        return Redirect::to("/").into_response();
    }
    let flashes = state.sessions.take_flashes(&session);
    pages::login(&flashes, &FormErrors::default(), "", safe_next(query.next.as_deref()))
        .into_response()
}

pub async fn login_submit(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());

    let mut errors = match form.validate() {
        Ok(()) => FormErrors::default(),
        Err(errors) => errors,
    };

    if errors.is_empty() {
        match state.auth.authenticate(&form.username, &form.password) {
            Ok(record) => {
                let new_session = state.sessions.rotate(&session);
                if let Err(e) = state.sessions.set_user(&new_session, Some(record.username.clone())) {
                    error!("登录写入会话失败: {}", e);
                }
                info!("用户登录: {}", record.username);

                let mut response = Redirect::to(next.unwrap_or("/")).into_response();
                if let Some(cookie) = session_cookie(new_session) {
                    response.headers_mut().insert(SET_COOKIE, cookie);
                }
                return response;
            }
            Err(e) => errors.add("__all__", e.to_string()),
        }
    }

    let flashes = state.sessions.take_flashes(&session);
    pages::login(&flashes, &errors, form.username.trim(), next).into_response()
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Response {
    if let Some(user) = state.sessions.user(&session) {
        info!("用户登出: {}", user);
    }
    state.sessions.destroy(&session);

    let mut response = Redirect::to("/").into_response();
    if let Some(cookie) = expired_session_cookie() {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    uri: OriginalUri,
) -> Response {
    let username = match require_user(&state, session, &uri) {
        Ok(user) => user,
        Err(redirect) => return redirect,
    };

    let Some(record) = state.auth.get_user(&username) else {
        // 账号已不存在，按未登录处理
        state.sessions.destroy(&session);
        return Redirect::to("/login/").into_response();
    };

    let flashes = state.sessions.take_flashes(&session);
    pages::profile(&record, &flashes).into_response()
}
