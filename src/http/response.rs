//! Error responses.
//!
//! # Responsibilities
//! - Map domain errors to HTTP status codes
//! - Render the error text as the response body
//!
//! # Design Decisions
//! - Duplicate → 409; absent user and storage failure → 500, so a failed
//!   lookup is always a server error to the caller
//! - Absent users are still told apart in logs (debug, not error)
//! - Body is the error's message as plain text (internal service)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::UserError;

/// Error returned by user handlers.
#[derive(Debug)]
pub struct ApiError(UserError);

impl ApiError {
    /// Status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match self.0 {
            UserError::NotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UserError::AlreadyExists(_) => StatusCode::CONFLICT,
            UserError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.0 {
            UserError::Persistence(_) => tracing::error!(error = %self.0, "Request failed"),
            _ => tracing::debug!(error = %self.0, status = %status, "Request rejected"),
        }
        (status, self.0.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(UserError::NotFound("u2".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(UserError::AlreadyExists("u1".into())).status(),
            StatusCode::CONFLICT
        );
        let broken = UserError::persistence(io::Error::new(io::ErrorKind::Other, "connection reset"));
        assert_eq!(ApiError::from(broken).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
