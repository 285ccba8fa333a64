//! Unified error system
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized numeric error codes
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified API response format
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Billing errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::OrderNotFound);
//!
//! let err = AppError::with_message(ErrorCode::InvalidStatusTransition, "COOKING -> SERVED")
//!     .with_detail("from", "COOKING")
//!     .with_detail("to", "SERVED");
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, Some(4005));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult, RETRY_LATER_MESSAGE};
