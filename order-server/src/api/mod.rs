//! API 路由模块
//!
//! - [`health`] - 健康检查 (公共)
//! - [`orders`] - 订单创建、查询、状态流转、状态历史
//! - [`invoices`] - 账单查询

pub mod health;
pub mod invoices;
pub mod orders;

pub use crate::utils::{AppError, AppResult};
