use thiserror::Error;

use crate::auth::JwtError;
use crate::auth::permissions::GrantParseError;
use crate::db::StoreError;

/// Startup and serving errors (request errors use `AppError`)
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("认证配置错误: {0}")]
    Jwt(#[from] JwtError),

    #[error("权限配置错误: {0}")]
    Grants(#[from] GrantParseError),

    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
