use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skyhold_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, malformed or expired bearer token
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Core(err) => match err {
                CoreError::Unauthorized(_) => StatusCode::FORBIDDEN,
                CoreError::FlightNotFound(_) | CoreError::BookingNotFound(_) | CoreError::PaymentNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                CoreError::InsufficientSeats { .. }
                | CoreError::AlreadyCancelled(_)
                | CoreError::NotPending { .. }
                | CoreError::CapacityBelowSold { .. }
                | CoreError::DuplicateFlightNumber(_)
                | CoreError::FlightHasBookings(_) => StatusCode::CONFLICT,
                CoreError::InvalidCount { .. }
                | CoreError::UnknownSeatClass(_)
                | CoreError::InactiveSeatClass(_)
                | CoreError::NoActiveSeatClass
                | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::ConsistencyViolation(_) | CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Core(err) if err.is_fatal() => {
                tracing::error!("Internal Server Error: {}", err);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Unauthenticated("no token".into()), StatusCode::UNAUTHORIZED),
            (CoreError::Unauthorized("x".into()).into(), StatusCode::FORBIDDEN),
            (CoreError::BookingNotFound(Uuid::nil()).into(), StatusCode::NOT_FOUND),
            (CoreError::InsufficientSeats { requested: 2, available: 1 }.into(), StatusCode::CONFLICT),
            (CoreError::InvalidCount { requested: 0, max: 10 }.into(), StatusCode::BAD_REQUEST),
            (CoreError::ConsistencyViolation("x".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected);
        }
    }
}
