use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    /// State-machine conflicts (request not pending, pet already adopted,
    /// duplicate request). Mapped to 409 rather than the upstream app's
    /// 200-with-failure bodies.
    #[error("{0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("upstream AI request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The AI endpoint answered, but with something the caller cannot use
    /// (no choices, no parseable JSON). Same 502 surface as a failed call.
    #[error("unusable AI reply: {0}")]
    BadUpstreamReply(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) | AppError::BadUpstreamReply(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Infrastructure details go to the log, not the client.
        let message = match self {
            AppError::Database(e) => {
                error!("database error: {e}");
                "internal error".to_string()
            }
            AppError::Internal(e) => {
                error!("internal error: {e}");
                "internal error".to_string()
            }
            AppError::Upstream(e) => {
                error!("upstream AI request failed: {e}");
                "AI service unavailable".to_string()
            }
            AppError::BadUpstreamReply(e) => {
                error!("unusable AI reply: {e}");
                "AI service returned an unusable reply".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::Validation("missing field".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound("Pet").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Forbidden("not your pet".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict("Request is not pending".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::BadUpstreamReply("no JSON in reply".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn unusable_ai_reply_hides_detail() {
        let resp = AppError::BadUpstreamReply("raw model output".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_errors_hide_detail() {
        let resp = AppError::Internal("password hash corrupt".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
