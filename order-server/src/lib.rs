//! Order Server - 餐厅订单生命周期服务
//!
//! # 架构概述
//!
//! - **定价** (`pricing`): 服务端解析菜品当前名称与价格
//! - **订单** (`orders`): 下单快照、两阶段持久化、状态机、账单、状态历史
//! - **存储** (`db`): 记录存储接口 (内存 / PostgREST)
//! - **认证** (`auth`): JWT 校验与角色能力表
//! - **HTTP API** (`api`): RESTful 接口
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── auth/          # JWT、角色能力
//! ├── db/            # RecordStore + repositories
//! ├── pricing/       # 价格解析
//! ├── orders/        # 订单生命周期
//! ├── api/           # HTTP 处理器
//! ├── routes/        # 路由与中间件
//! └── utils/         # 日志、错误 re-export
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod orders;
pub mod pricing;
pub mod routes;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::{OrderError, OrderService};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::init_logger;

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Load `.env` if present. Call before reading configuration.
pub fn setup_environment() {
    match dotenv::dotenv() {
        Ok(path) => eprintln!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("Failed to load .env: {}", e),
    }
}
