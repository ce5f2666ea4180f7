//! JSON response envelope.
//!
//! Every API response is `{ "success": bool, ... }`: successes carry `data`
//! or `message`, failures carry `message`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use picshare_core::post::PostError;
use picshare_shared::AppError;
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// Successful response carrying a payload.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Always `true`.
    pub success: bool,
    /// Response payload.
    pub data: T,
}

/// `status` with `{ success: true, data }`.
pub fn data<T: Serialize>(status: StatusCode, data: T) -> Response {
    (
        status,
        Json(Envelope {
            success: true,
            data,
        }),
    )
        .into_response()
}

/// 200 with `{ success: true, message }`.
pub fn message(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": message
        })),
    )
        .into_response()
}

/// Error rendered as `{ success: false, message }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Error with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Prefix the message of server errors, leaving client errors as is.
    #[must_use]
    pub fn with_server_context(mut self, prefix: &str) -> Self {
        if self.status.is_server_error() {
            self.message = format!("{prefix}{}", self.message);
        }
        self
    }

    /// HTTP status of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Message sent to the client.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.message())
    }
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        AppError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, message = %self.message, "Request failed");
        }

        (
            self.status,
            Json(json!({
                "success": false,
                "message": self.message
            })),
        )
            .into_response()
    }
}
