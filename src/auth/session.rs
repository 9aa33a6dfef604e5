use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::SessionError;

pub type SessionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "error",
        }
    }
}

/// 一次性提示消息，下一次渲染页面时被取走
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user: Option<String>,
    slots: HashMap<String, Value>,
    flashes: Vec<FlashMessage>,
    /// 自上次读取后是否被写过
    pub modified: bool,
    last_seen: DateTime<Utc>,
}

impl SessionData {
    fn new() -> Self {
        Self {
            user: None,
            slots: HashMap::new(),
            flashes: Vec::new(),
            modified: false,
            last_seen: Utc::now(),
        }
    }
}

/// 服务端会话存储: 会话ID -> 会话数据
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionData>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn create(&self) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions.insert(id, SessionData::new());
        debug!("创建会话: {}", id);
        id
    }

    /// 返回 (会话ID, 是否新建)
    pub fn load_or_create(&self, presented: Option<SessionId>) -> (SessionId, bool) {
        match presented {
            Some(id) if self.with_session(&id, |_| ()).is_some() => (id, false),
            _ => (self.create(), true),
        }
    }

    pub fn exists(&self, id: &SessionId) -> bool {
        self.with_session(id, |_| ()).is_some()
    }

    pub fn destroy(&self, id: &SessionId) {
        if self.sessions.remove(id).is_some() {
            debug!("销毁会话: {}", id);
        }
    }

    /// 登录时更换会话ID，保留原有数据
    pub fn rotate(&self, id: &SessionId) -> SessionId {
        let new_id = Uuid::new_v4();
        let data = match self.sessions.remove(id) {
            Some((_, data)) if !self.is_expired(&data) => data,
            _ => SessionData::new(),
        };
        self.sessions.insert(new_id, data);
        debug!("会话ID轮换: {} -> {}", id, new_id);
        new_id
    }

    pub fn user(&self, id: &SessionId) -> Option<String> {
        self.with_session(id, |data| data.user.clone()).flatten()
    }

    pub fn set_user(&self, id: &SessionId, user: Option<String>) -> Result<(), SessionError> {
        self.with_session(id, |data| {
            data.user = user;
            data.modified = true;
        })
        .ok_or(SessionError::NotFound(*id))
    }

    pub fn set_slot<T: Serialize>(
        &self,
        id: &SessionId,
        key: &str,
        value: &T,
    ) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        self.with_session(id, |data| {
            data.slots.insert(key.to_string(), value);
            data.modified = true;
        })
        .ok_or(SessionError::NotFound(*id))
    }

    pub fn get_slot<T: DeserializeOwned>(
        &self,
        id: &SessionId,
        key: &str,
    ) -> Result<Option<T>, SessionError> {
        let value = self
            .with_session(id, |data| data.slots.get(key).cloned())
            .flatten();

        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// 删除槽位，返回删除前是否存在
    pub fn remove_slot(&self, id: &SessionId, key: &str) -> bool {
        self.with_session(id, |data| {
            let removed = data.slots.remove(key).is_some();
            data.modified |= removed;
            removed
        })
        .unwrap_or(false)
    }

    pub fn push_flash(&self, id: &SessionId, level: FlashLevel, text: impl Into<String>) {
        let text = text.into();
        self.with_session(id, |data| {
            data.flashes.push(FlashMessage { level, text });
            data.modified = true;
        });
    }

    pub fn take_flashes(&self, id: &SessionId) -> Vec<FlashMessage> {
        self.with_session(id, |data| std::mem::take(&mut data.flashes))
            .unwrap_or_default()
    }

    pub fn is_modified(&self, id: &SessionId) -> bool {
        self.sessions
            .get(id)
            .map(|data| data.modified)
            .unwrap_or(false)
    }

    /// 清理过期会话，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Utc::now();
        self.sessions
            .retain(|_, data| now.signed_duration_since(data.last_seen) < self.ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 启动后台任务定期清理过期会话
    pub fn spawn_sweeper(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    info!("已清理过期会话: {}", purged);
                }
            }
        })
    }

    fn is_expired(&self, data: &SessionData) -> bool {
        Utc::now().signed_duration_since(data.last_seen) >= self.ttl
    }

    // 访问未过期的会话并刷新活跃时间；过期会话在此处被移除
    fn with_session<R>(&self, id: &SessionId, f: impl FnOnce(&mut SessionData) -> R) -> Option<R> {
        let expired = match self.sessions.get_mut(id) {
            Some(mut entry) => {
                if self.is_expired(entry.value()) {
                    true
                } else {
                    let data = entry.value_mut();
                    data.last_seen = Utc::now();
                    return Some(f(data));
                }
            }
            None => return None,
        };

        if expired {
            self.sessions.remove(id);
            debug!("会话已过期: {}", id);
        }
        None
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::minutes(120))
    }
}
