//! 认证授权模块
//!
//! - [`JwtService`] - JWT 令牌验证
//! - [`CurrentUser`] - 当前员工上下文 (axum extractor)
//! - [`CapabilityPolicy`] - 角色能力表

pub mod extractor;
pub mod jwt;
pub mod permissions;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use permissions::{CapabilityPolicy, ListScope};
