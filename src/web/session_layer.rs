use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use cookie::{Cookie, SameSite};
use tracing::warn;
use uuid::Uuid;

use crate::auth::SessionId;

use super::AppState;

pub const SESSION_COOKIE: &str = "sessionid";

/// 当前请求绑定的会话
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentSession(pub SessionId);

pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

pub fn session_cookie(id: SessionId) -> Option<HeaderValue> {
    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    to_header(&cookie)
}

pub fn expired_session_cookie() -> Option<HeaderValue> {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build();
    to_header(&cookie)
}

fn to_header(cookie: &Cookie<'_>) -> Option<HeaderValue> {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Cookie 头构造失败: {}", e);
            None
        }
    }
}

/// 为每个页面请求加载或创建会话；处理函数自行设置 Cookie 时不覆盖
pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = session_id_from_headers(request.headers());
    let (id, created) = state.sessions.load_or_create(presented);
    request.extensions_mut().insert(CurrentSession(id));

    let mut response = next.run(request).await;
    if created && !response.headers().contains_key(SET_COOKIE) {
        if let Some(value) = session_cookie(id) {
            response.headers_mut().insert(SET_COOKIE, value);
        }
    }
    response
}
