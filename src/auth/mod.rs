pub mod errors;
pub mod password;
pub mod session;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use errors::{AuthError, Result, SessionError};
pub use password::PasswordHash;
pub use session::{FlashLevel, FlashMessage, SessionId, SessionStore};

const USERNAME_MAX_LEN: usize = 150;
const PASSWORD_MIN_LEN: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password: PasswordHash,
    pub date_joined: DateTime<Utc>,
}

// 账号管理核心组件
#[derive(Debug)]
pub struct AuthManager {
    // 小写用户名 -> 用户
    users: DashMap<String, UserRecord>,
    users_file: Option<PathBuf>,
    // 串行化写文件，避免旧快照覆盖新快照
    save_lock: Mutex<()>,
}

impl AuthManager {
    /// 仅内存存储
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            users_file: None,
            save_lock: Mutex::new(()),
        }
    }

    /// 从用户文件加载账号，文件不存在时视为空
    pub async fn with_users_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let users = DashMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<UserRecord> = serde_json::from_slice(&bytes)?;
                for record in records {
                    users.insert(record.username.to_lowercase(), record);
                }
                info!("已加载用户: {} 个 ({:?})", users.len(), path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("用户文件不存在，将在首次注册时创建: {:?}", path);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            users,
            users_file: Some(path),
            save_lock: Mutex::new(()),
        })
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<UserRecord> {
        let username = username.trim();
        if let Some(problem) = username_problems(username).into_iter().next() {
            return Err(AuthError::InvalidUsername(problem));
        }
        if let Some(problem) = password_problems(username, password).into_iter().next() {
            return Err(AuthError::WeakPassword(problem));
        }

        let record = UserRecord {
            username: username.to_string(),
            password: PasswordHash::new(password)?,
            date_joined: Utc::now(),
        };

        let key = username.to_lowercase();
        match self.users.entry(key.clone()) {
            Entry::Occupied(_) => return Err(AuthError::UsernameTaken),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
            }
        }

        // 落盘失败则回滚，账号不能只注册一半
        if let Err(e) = self.save().await {
            self.users.remove(&key);
            warn!("用户文件保存失败，已撤销注册 {}: {}", record.username, e);
            return Err(e);
        }

        info!("新用户注册: {}", record.username);
        Ok(record)
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserRecord> {
        let record = self
            .users
            .get(&username.trim().to_lowercase())
            .map(|entry| entry.value().clone());

        match record {
            Some(record) if record.password.verify(password) => {
                debug!("用户认证成功: {}", record.username);
                Ok(record)
            }
            _ => {
                warn!("用户认证失败: {}", username);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub fn get_user(&self, username: &str) -> Option<UserRecord> {
        self.users
            .get(&username.to_lowercase())
            .map(|entry| entry.value().clone())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    async fn save(&self) -> Result<()> {
        let Some(path) = &self.users_file else {
            return Ok(());
        };

        let _guard = self.save_lock.lock().await;

        // 持锁后再取快照
        let mut records: Vec<UserRecord> = self.users.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.date_joined.cmp(&b.date_joined));

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // 先写临时文件再改名
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&records)?).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!("用户文件已保存: {:?}", path);
        Ok(())
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 用户名规则: 1-150 个字符，仅限字母、数字和 @/./+/-/_
pub fn username_problems(username: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if username.is_empty() {
        problems.push("This field is required.".to_string());
    } else if username.chars().count() > USERNAME_MAX_LEN {
        problems.push(format!(
            "Ensure this value has at most {} characters.",
            USERNAME_MAX_LEN
        ));
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        problems.push(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    problems
}

pub fn password_problems(username: &str, password: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < PASSWORD_MIN_LEN {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            PASSWORD_MIN_LEN
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        problems.push("The password is too similar to the username.".to_string());
    }
    problems
}
