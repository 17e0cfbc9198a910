use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use skyhold_core::Actor;
use skyhold_order::{BookingFilter, BookingRequest, BookingView};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(list_bookings).post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

/// POST /v1/bookings
/// Reserve seats and open a Pending booking with its Pending payment
async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let view = state.bookings.create(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /v1/bookings?flight_number=..&booking_id=..&status=..
async fn list_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    Ok(Json(state.bookings.list(&actor, &filter).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    Ok(Json(state.bookings.get(&actor, booking_id).await?))
}

/// POST /v1/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    Ok(Json(state.bookings.cancel(&actor, booking_id).await?))
}
