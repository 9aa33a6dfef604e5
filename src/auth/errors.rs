use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("IO操作失败: {0}")]
    IoError(#[from] std::io::Error),

    #[error("用户数据解析失败: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("A user with that username already exists.")]
    UsernameTaken,

    #[error("{0}")]
    InvalidUsername(String),

    #[error("{0}")]
    WeakPassword(String),

    #[error("Please enter a correct username and password. Note that both fields may be case-sensitive.")]
    InvalidCredentials,

    #[error("密码哈希失败")]
    Hash,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("会话不存在: {0}")]
    NotFound(Uuid),

    #[error("会话数据序列化失败: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AuthError>;
