//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Billing errors
//! - 9xxx: System errors
//!
//! Clients branch on these values (e.g. disabling a status control after
//! `InvalidStatusTransition`), so existing values never change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// The caller has no recognised staff role
    RoleRequired = 2002,
    /// The caller's role may not move an order into the requested status
    TransitionForbidden = 2003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no items
    OrderEmpty = 4002,
    /// Cart references a menu item that does not exist
    MenuItemNotFound = 4003,
    /// Cart quantity out of range
    InvalidQuantity = 4004,
    /// Requested status is not reachable from the current status
    InvalidStatusTransition = 4005,

    // ==================== 5xxx: Billing ====================
    /// Invoice not found
    InvoiceNotFound = 5001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database / record store error
    DatabaseError = 9002,
    /// A compensating write failed; data needs manual reconciliation
    ConsistencyFault = 9003,
    /// Configuration error
    ConfigError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "User has no assigned role",
            ErrorCode::TransitionForbidden => "Role may not perform this status change",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order must contain items",
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::InvalidQuantity => "Invalid item quantity",
            ErrorCode::InvalidStatusTransition => "Invalid status transition",

            // Billing
            ErrorCode::InvoiceNotFound => "Invoice not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConsistencyFault => "Data consistency fault",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::TransitionForbidden),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderEmpty),
            4003 => Ok(ErrorCode::MenuItemNotFound),
            4004 => Ok(ErrorCode::InvalidQuantity),
            4005 => Ok(ErrorCode::InvalidStatusTransition),

            // Billing
            5001 => Ok(ErrorCode::InvoiceNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConsistencyFault),
            9004 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::TransitionForbidden.code(), 2003);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::InvalidStatusTransition.code(), 4005);
        assert_eq!(ErrorCode::InvoiceNotFound.code(), 5001);
        assert_eq!(ErrorCode::ConsistencyFault.code(), 9003);
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(4003), Ok(ErrorCode::MenuItemNotFound));
        assert_eq!(ErrorCode::try_from(9002), Ok(ErrorCode::DatabaseError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderEmpty).unwrap();
        assert_eq!(json, "4002");
    }

    #[test]
    fn test_deserialize() {
        let code: ErrorCode = serde_json::from_str("2003").unwrap();
        assert_eq!(code, ErrorCode::TransitionForbidden);
        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_roundtrip_all_codes() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::Unknown,
            ErrorCode::ValidationFailed,
            ErrorCode::NotFound,
            ErrorCode::AlreadyExists,
            ErrorCode::InvalidRequest,
            ErrorCode::NotAuthenticated,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::PermissionDenied,
            ErrorCode::RoleRequired,
            ErrorCode::TransitionForbidden,
            ErrorCode::OrderNotFound,
            ErrorCode::OrderEmpty,
            ErrorCode::MenuItemNotFound,
            ErrorCode::InvalidQuantity,
            ErrorCode::InvalidStatusTransition,
            ErrorCode::InvoiceNotFound,
            ErrorCode::InternalError,
            ErrorCode::DatabaseError,
            ErrorCode::ConsistencyFault,
            ErrorCode::ConfigError,
        ];
        for code in codes {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::OrderNotFound.to_string(), "4001");
    }
}
