//! # Error Handling
//!
//! Error taxonomy for the intelligence pipeline. Each engine owns a narrow
//! error enum describing how it can fail locally; per §7 of the design, only
//! cancellation is meant to propagate out of a public pipeline operation —
//! every other kind is handled by the engine that raised it (retry, fallback,
//! quarantine, or graceful degradation) before the caller ever sees it.
//!
//! [`ApiError`]/[`AppError`] remain as the problem+json envelope for the thin
//! demo host, following the same shape the connectors API used.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

/// Cooperative-cancellation marker. This is the only error kind permitted to
/// propagate out of a public pipeline operation; no partial state is exposed
/// when it is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Errors a platform client (C1) can hit while fetching signals.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The source is misconfigured or permanently rejecting requests; the
    /// registry should quarantine it until a warm start.
    #[error("source '{platform}' is unusable: {reason}")]
    UnusableSource { platform: String, reason: String },

    /// A fetch failed but may succeed on retry. Carries the number of
    /// attempts already made so the caller can decide whether to keep
    /// retrying or surface a `PartialFetch` marker.
    #[error("transient fetch failure for '{platform}' after {attempts} attempt(s): {source}")]
    TransientFetch {
        platform: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// A fetch was cut short by cancellation; some pages may have been
    /// fetched already and are reported separately from this error.
    #[error("fetch for '{platform}' only partially completed: {fetched} page(s) before stopping")]
    PartialFetch { platform: String, fetched: usize },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Errors the embedding/model layer (C4) can hit.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model provider unavailable: {reason}")]
    Unavailable { reason: String },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Errors the conversational LLM layer (C9) can hit.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm provider unavailable: {reason}")]
    Unavailable { reason: String },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Errors the persistence layer (C10) can hit.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Raised by the quality gate (C2) when a signal is rejected. This is an
/// ordinary rejection outcome, not a fault — callers record the reason and
/// move on; nothing downstream should treat it as a fault to recover from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("signal rejected: {reason}")]
pub struct InvalidSignal {
    pub reason: String,
}

impl InvalidSignal {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[source] sea_orm::DbErr),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl RepositoryError {
    pub fn database_error(err: sea_orm::DbErr) -> Self {
        RepositoryError::Database(err)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        RepositoryError::Validation(message.into())
    }

    pub fn serialization_error(err: serde_json::Error) -> Self {
        RepositoryError::Validation(format!("serialization failed: {err}"))
    }
}

impl From<sea_orm::DbErr> for RepositoryError {
    fn from(err: sea_orm::DbErr) -> Self {
        RepositoryError::Database(err)
    }
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(source) => StoreError::Database(source),
            RepositoryError::Validation(message) => StoreError::Database(sea_orm::DbErr::Custom(message)),
            RepositoryError::NotFound(message) => StoreError::Database(sea_orm::DbErr::RecordNotFound(message)),
        }
    }
}

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggested retry delay in seconds (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(
        status: StatusCode,
        code: S,
        message: S,
        headers: Option<&HeaderMap>,
    ) -> Self {
        let trace_id = headers
            .and_then(|h| h.get("x-request-id"))
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
            retry_after: None,
            trace_id,
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set retry after delay
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }
}

/// Standard error types with predefined status codes
#[derive(Debug, Error)]
pub enum ErrorType {
    #[error("Bad Request")]
    BadRequest,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found")]
    NotFound,
    #[error("Conflict")]
    Conflict,
    #[error("Too Many Requests")]
    TooManyRequests,
    #[error("Internal Server Error")]
    InternalServerError,
    #[error("Bad Gateway")]
    BadGateway,
    #[error("Service Unavailable")]
    ServiceUnavailable,
}

impl ErrorType {
    /// Get the appropriate HTTP status code for this error type
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorType::Forbidden => StatusCode::FORBIDDEN,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorType::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "VALIDATION_FAILED",
            ErrorType::Unauthorized => "UNAUTHORIZED",
            ErrorType::Forbidden => "FORBIDDEN",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::Conflict => "CONFLICT",
            ErrorType::TooManyRequests => "RATE_LIMITED",
            ErrorType::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorType::BadGateway => "PROVIDER_ERROR",
            ErrorType::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl From<ErrorType> for ApiError {
    fn from(error_type: ErrorType) -> Self {
        ApiError::new(
            error_type.status_code(),
            error_type.error_code().to_string(),
            error_type.to_string(),
            None,
        )
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(_error: anyhow::Error) -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR".to_string(),
            "An internal error occurred".to_string(),
            None,
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        match &error {
            sea_orm::DbErr::RecordNotFound(what) => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND".to_string(),
                what.clone(),
                None,
            ),
            other => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR".to_string(),
                other.to_string(),
                None,
            ),
        }
    }
}

/// Upstream provider error information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderError {
    /// Provider identifier (e.g., "github", "reddit")
    pub provider: String,
    /// HTTP status code from upstream
    pub status: u16,
    /// Response body snippet from upstream (truncated for safety)
    pub body_snippet: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after {
            if let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string()) {
                headers.insert("retry-after", header_value);
            }
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            AppError::Api(err) => {
                return err.into_response();
            }
            AppError::Anyhow(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                err.to_string(),
            ),
            AppError::Json(err) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", err.to_string()),
            AppError::Db(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                err.to_string(),
            ),
            AppError::Llm(err) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                err.to_string(),
            ),
        };

        let api_error = ApiError::new(status, error_code, &message, None);
        (api_error.status, axum::Json(api_error)).into_response()
    }
}

/// Errors the demo host's HTTP handlers can return.
pub enum AppError {
    Api(ApiError),
    Anyhow(anyhow::Error),
    Json(JsonRejection),
    Db(sea_orm::DbErr),
    Llm(LlmError),
}

impl From<ApiError> for AppError {
    fn from(error: ApiError) -> Self {
        AppError::Api(error)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Anyhow(error)
    }
}

impl From<JsonRejection> for AppError {
    fn from(error: JsonRejection) -> Self {
        AppError::Json(error)
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(error: sea_orm::DbErr) -> Self {
        AppError::Db(error)
    }
}

impl From<LlmError> for AppError {
    fn from(error: LlmError) -> Self {
        AppError::Llm(error)
    }
}

/// Builds a provider upstream error. Every upstream HTTP status, success or
/// failure, maps to 502 PROVIDER_ERROR here — a 2xx body that fails to parse
/// is exactly as actionable to a caller as a 500, so both get the same
/// "upstream misbehaved" code with the real status tucked into `details`.
pub fn provider_error(
    provider: String,
    status: u16,
    body: Option<String>,
    headers: Option<&HeaderMap>,
) -> ApiError {
    let provider_error = ProviderError {
        provider: provider.clone(),
        status,
        body_snippet: body.map(|b| {
            if b.len() > 200 {
                format!("{}...", &b[..200])
            } else {
                b
            }
        }),
    };

    ApiError::new(
        StatusCode::BAD_GATEWAY,
        "PROVIDER_ERROR",
        &format!("Provider {} returned error status {}", provider, status),
        headers,
    )
    .with_details(json!(provider_error))
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>, headers: Option<&HeaderMap>) -> AppError {
    let msg = message.unwrap_or("Authentication required");
    AppError::Api(ApiError::new(
        StatusCode::UNAUTHORIZED,
        "UNAUTHORIZED",
        msg,
        headers,
    ))
}

/// Create a forbidden error (403)
pub fn forbidden(message: Option<&str>, headers: Option<&HeaderMap>) -> AppError {
    let msg = message.unwrap_or("Insufficient permissions");
    AppError::Api(ApiError::new(
        StatusCode::FORBIDDEN,
        "FORBIDDEN",
        msg,
        headers,
    ))
}

/// Create a validation error with field details
pub fn validation_error(
    message: &str,
    field_errors: serde_json::Value,
    headers: Option<&HeaderMap>,
) -> AppError {
    AppError::Api(
        ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message, headers)
            .with_details(field_errors),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn api_error_basic() {
        let error = ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Test error message",
            None,
        );

        assert_eq!(error.code, "VALIDATION_FAILED");
        assert_eq!(error.message, "Test error message");
        assert_eq!(error.details, None);
        assert_eq!(error.retry_after, None);
    }

    #[test]
    fn api_error_with_details() {
        let error =
            ApiError::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", "Test error message", None)
                .with_details(json!({"field": "value"}));

        assert_eq!(error.details, Some(json!({"field": "value"})));
    }

    #[test]
    fn api_error_with_retry_after() {
        let error = ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "TOO_MANY_REQUESTS",
            "Rate limit exceeded",
            None,
        )
        .with_retry_after(60);

        assert_eq!(error.retry_after, Some(60));
    }

    #[test]
    fn error_type_mapping() {
        let not_found_error: ApiError = ErrorType::NotFound.into();
        assert_eq!(not_found_error.code, "NOT_FOUND");
        assert_eq!(not_found_error.message, "Not Found");
    }

    #[test]
    fn from_anyhow() {
        let anyhow_error = anyhow::anyhow!("Something went wrong");
        let api_error: ApiError = anyhow_error.into();

        assert_eq!(api_error.code, "INTERNAL_SERVER_ERROR");
        assert_eq!(api_error.message, "An internal error occurred");
    }

    #[test]
    fn provider_error_status_mapping() {
        // Every upstream status, 2xx through 5xx, collapses to 502.
        for (provider, status) in [
            ("github", 200u16),
            ("slack", 401),
            ("google", 429),
            ("jira", 503),
        ] {
            let error = provider_error(provider.to_string(), status, Some("body".into()), None);
            assert_eq!(error.status, StatusCode::BAD_GATEWAY);
            assert_eq!(error.code, "PROVIDER_ERROR");

            let details = error.details.as_ref().unwrap().as_object().unwrap();
            assert_eq!(details.get("provider").unwrap(), provider);
            assert_eq!(details.get("status").unwrap(), status);
        }
    }

    #[test]
    fn content_type_header() {
        let error = ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Test error",
            None,
        );

        let response = error.into_response();

        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn retry_after_header() {
        let error = ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Rate limit exceeded",
            None,
        )
        .with_retry_after(60);

        let response = error.into_response();

        assert_eq!(response.headers().get("retry-after").unwrap(), "60");
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn trace_id_extracted_from_request_id_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "test-trace-id".parse().unwrap());
        let error = ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Test error",
            Some(&headers),
        );

        assert_eq!(error.trace_id, Some("test-trace-id".to_string()));
    }

    #[test]
    fn auth_error_helpers() {
        let auth_error = unauthorized(None, None);
        if let AppError::Api(inner) = auth_error {
            assert_eq!(inner.status, StatusCode::UNAUTHORIZED);
            assert_eq!(inner.code, "UNAUTHORIZED");
        } else {
            panic!("expected AppError::Api");
        }

        let forbidden_error = forbidden(Some("Admin access required"), None);
        if let AppError::Api(inner) = forbidden_error {
            assert_eq!(inner.status, StatusCode::FORBIDDEN);
            assert_eq!(inner.message, "Admin access required");
        } else {
            panic!("expected AppError::Api");
        }
    }

    #[test]
    fn validation_error_carries_field_details() {
        let field_errors = json!({"title": "title and body cannot both be empty"});
        let err = validation_error("invalid signal", field_errors.clone(), None);

        if let AppError::Api(inner) = err {
            assert_eq!(inner.status, StatusCode::BAD_REQUEST);
            assert_eq!(inner.code, "VALIDATION_FAILED");
            assert_eq!(inner.details, Some(field_errors));
        } else {
            panic!("expected AppError::Api");
        }
    }

    #[test]
    fn invalid_signal_is_a_rejection_not_a_fault() {
        let err = InvalidSignal::new("both title and body are empty");
        assert_eq!(err.reason, "both title and body are empty");
    }

    #[test]
    fn cancelled_propagates_through_every_engine_error() {
        let client: ClientError = Cancelled.into();
        assert!(matches!(client, ClientError::Cancelled(_)));

        let model: ModelError = Cancelled.into();
        assert!(matches!(model, ModelError::Cancelled(_)));

        let llm: LlmError = Cancelled.into();
        assert!(matches!(llm, LlmError::Cancelled(_)));

        let store: StoreError = Cancelled.into();
        assert!(matches!(store, StoreError::Cancelled(_)));
    }
}
