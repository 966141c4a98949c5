//! Handler errors and how the timers see them.
//!
//! Handlers return `Result<_, HandlerError>`; the error renders as a
//! response and leaves an `ErrorInfo` in the response extensions. Both
//! server timers read that marker to fill the `exception` tag.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::tags::{simple_type_name, ServerStatus};

/// Error details attached to a response produced from a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Simple type name of the underlying error.
    pub exception: String,
    /// Status the error was rendered with.
    pub status: StatusCode,
}

impl ErrorInfo {
    pub fn new(exception: impl Into<String>, status: StatusCode) -> Self {
        Self {
            exception: exception.into(),
            status,
        }
    }

    /// Marker for a panic unwinding through the pipeline.
    pub fn panic() -> Self {
        Self::new("Panic", StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Status tag classification: the error was raised, not answered.
    pub fn classify(&self) -> ServerStatus {
        if self.status.is_client_error() {
            ServerStatus::ClientError
        } else {
            ServerStatus::ServerError
        }
    }
}

/// Error returned from request handlers.
///
/// Any `std::error::Error` converts into it with `?`, keeping the error's
/// type name for the `exception` tag.
#[derive(Debug)]
pub struct HandlerError {
    status: StatusCode,
    exception: &'static str,
    message: String,
}

impl HandlerError {
    /// Wrap an error as a 500.
    pub fn new<E: std::error::Error + 'static>(error: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            exception: simple_type_name::<E>(),
            message: error.to_string(),
        }
    }

    /// Override the rendered status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn exception(&self) -> &str {
        self.exception
    }
}

impl<E: std::error::Error + 'static> From<E> for HandlerError {
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        tracing::debug!(
            exception = self.exception,
            status = %self.status,
            message = %self.message,
            "Handler failed"
        );
        let mut response = (self.status, self.message).into_response();
        response
            .extensions_mut()
            .insert(ErrorInfo::new(self.exception, self.status));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("order already shipped")]
    struct IllegalStateException;

    #[test]
    fn test_into_response_carries_error_info() {
        let response = HandlerError::from(IllegalStateException).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let info = response.extensions().get::<ErrorInfo>().unwrap();
        assert_eq!(info.exception, "IllegalStateException");
        assert_eq!(info.classify(), ServerStatus::ServerError);
    }

    #[test]
    fn test_client_error_classification() {
        let err = HandlerError::new(IllegalStateException).with_status(StatusCode::CONFLICT);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let response = err.into_response();
        let info = response.extensions().get::<ErrorInfo>().unwrap();
        assert_eq!(info.classify(), ServerStatus::ClientError);
    }
}
