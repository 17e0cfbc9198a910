use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use skyhold_core::Actor;
use skyhold_order::{PaymentFilter, PaymentView};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments", get(list_payments))
        .route("/v1/payments/{id}", get(get_payment))
        .route("/v1/payments/{id}/confirm", post(confirm_payment))
        .route("/v1/payments/{id}/cancel", post(cancel_payment))
}

async fn list_payments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(filter): Query<PaymentFilter>,
) -> Result<Json<Vec<PaymentView>>, AppError> {
    Ok(Json(state.payments.list(&actor, &filter).await?))
}

async fn get_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentView>, AppError> {
    Ok(Json(state.payments.get(&actor, payment_id).await?))
}

/// POST /v1/payments/{id}/confirm
async fn confirm_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentView>, AppError> {
    Ok(Json(state.payments.confirm(&actor, payment_id).await?))
}

/// POST /v1/payments/{id}/cancel
async fn cancel_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentView>, AppError> {
    Ok(Json(state.payments.cancel(&actor, payment_id).await?))
}
