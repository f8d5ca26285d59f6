//! Request-level errors and their HTTP mapping.
//!
//! Handlers return [`ApiError`] and rely on its [`IntoResponse`] impl to pick
//! the status code, the same way a gRPC service converts its error enum into
//! a `Status`. Bodies are short plain-text reasons.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub type Result<T> = core::result::Result<T, ApiError>;

#[derive(Clone, Debug, thiserror::Error)]
pub enum ApiError {
    /// A numeric path segment or the request body does not fit its integer
    /// type.
    #[error("{reason}")]
    BadRequest { reason: &'static str },

    /// A path id is not made of digits, so no route matches.
    #[error("Not Found")]
    NotFound,

    /// The `sessionkey` is missing, malformed, unknown or expired.
    #[error("Unauthorized")]
    Unauthorized,

    /// A request arrived while the worker pool was shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,

    /// Internal channel failure between the accepting task and a worker.
    #[error("Channel error: {context}")]
    Channel { context: String },
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Channel { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[cfg(feature = "tracing")]
        if let Self::Channel { context } = &self {
            tracing::error!("Request failed: {context}");
        }

        (self.status(), self.to_string()).into_response()
    }
}
