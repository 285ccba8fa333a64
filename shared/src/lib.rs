//! Shared types for the order lifecycle service
//!
//! Domain models exchanged between the server and its staff clients,
//! plus the unified error/response system.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
