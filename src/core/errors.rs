use std::fmt;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;

/// Error taxonomy for every API operation.
///
/// `Conflict` (duplicate unique field) renders 400 like any other rejected
/// input; `Internal` renders a generic 500 and never leaks the cause.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden,
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden => write!(f, "Forbidden"),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::Conflict(msg) => msg.as_str(),
            ApiError::Unauthorized(msg) => msg.as_str(),
            ApiError::Forbidden => "Forbidden",
            ApiError::NotFound(msg) => msg.as_str(),
            // Internals are logged at the operation boundary, not echoed.
            ApiError::Internal(_) => "Internal Server Error",
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "message": message }))
    }
}

impl ApiError {
    /// Wrap an unexpected failure, logging it with the operation name.
    pub fn internal(operation: &str, err: anyhow::Error) -> Self {
        tracing::error!("Error in {}: {:#}", operation, err);
        ApiError::Internal(err.to_string())
    }
}

/// Operation-boundary adapter for `map_err`: any store or serialization
/// failure inside `operation` becomes a logged 500.
pub fn internal_error(operation: &'static str) -> impl Fn(anyhow::Error) -> ApiError {
    move |err| ApiError::internal(operation, err)
}
