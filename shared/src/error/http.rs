//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound | Self::OrderNotFound | Self::InvoiceNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied | Self::RoleRequired | Self::TransitionForbidden => {
                StatusCode::FORBIDDEN
            }

            // 500 Internal Server Error
            Self::Unknown
            | Self::InternalError
            | Self::DatabaseError
            | Self::ConsistencyFault
            | Self::ConfigError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (validation / business rule errors)
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::OrderEmpty
            | Self::MenuItemNotFound
            | Self::InvalidQuantity
            | Self::InvalidStatusTransition => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InvoiceNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_order_validation_is_bad_request() {
        assert_eq!(ErrorCode::OrderEmpty.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::MenuItemNotFound.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::InvalidStatusTransition.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_forbidden_status() {
        assert_eq!(
            ErrorCode::TransitionForbidden.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ErrorCode::RoleRequired.http_status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_unauthorized_status() {
        assert_eq!(ErrorCode::TokenExpired.http_status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_system_errors_are_internal() {
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::ConsistencyFault.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
