//! Moderation error taxonomy.
//!
//! Every fallible operation in the service layer returns `ModerationError`,
//! which maps onto an HTTP status in one place. A failed precondition on an
//! already-resolved item is always `Conflict`, never a silent success.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use serde::Serialize;

#[derive(Debug, Display)]
pub enum ModerationError {
    /// Missing or malformed input, rejected before any state change.
    #[display(fmt = "{}", _0)]
    Validation(String),
    /// Target is already in a terminal state; retry after refreshing.
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),
    /// No credential, or the credential did not resolve to a user.
    #[display(fmt = "Login required")]
    Unauthenticated,
    /// Authenticated but lacking the role or ownership for the action.
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "Too many requests. Try again in {} seconds", retry_after_seconds)]
    RateLimited { retry_after_seconds: u64 },
    /// Risk scorer failure. The gate fails open to pending, so this only
    /// surfaces when the scorer is consulted outside a submission.
    #[display(fmt = "Risk scorer unavailable: {}", _0)]
    Scorer(String),
    #[display(fmt = "Database error")]
    Database(sea_orm::DbErr),
}

impl From<sea_orm::DbErr> for ModerationError {
    fn from(err: sea_orm::DbErr) -> Self {
        ModerationError::Database(err)
    }
}

impl From<crate::rate_limit::RateLimitError> for ModerationError {
    fn from(err: crate::rate_limit::RateLimitError) -> Self {
        ModerationError::RateLimited {
            retry_after_seconds: err.retry_after_seconds,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl ResponseError for ModerationError {
    fn status_code(&self) -> StatusCode {
        match self {
            ModerationError::Validation(_) => StatusCode::BAD_REQUEST,
            ModerationError::Conflict(_) => StatusCode::CONFLICT,
            ModerationError::NotFound(_) => StatusCode::NOT_FOUND,
            ModerationError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ModerationError::Forbidden(_) => StatusCode::FORBIDDEN,
            ModerationError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ModerationError::Scorer(_) => StatusCode::BAD_GATEWAY,
            ModerationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ModerationError::Database(err) = self {
            log::error!("Database error: {}", err);
        }

        let mut builder = HttpResponse::build(self.status_code());

        if let ModerationError::RateLimited {
            retry_after_seconds,
        } = self
        {
            builder.insert_header((header::RETRY_AFTER, retry_after_seconds.to_string()));
        }

        builder.json(ErrorBody {
            success: false,
            message: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ModerationError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ModerationError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ModerationError::NotFound("report").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ModerationError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ModerationError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ModerationError::RateLimited {
                retry_after_seconds: 3
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_messages_name_the_problem() {
        let err = ModerationError::Validation("Ban reason is required".into());
        assert!(err.to_string().contains("reason"));

        let err = ModerationError::RateLimited {
            retry_after_seconds: 30,
        };
        assert!(err.to_string().contains("30"));
    }
}
