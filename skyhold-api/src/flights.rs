use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use skyhold_catalog::{FlightChanges, FlightDraft, FlightView};
use skyhold_core::search::FlightSearchQuery;
use skyhold_core::{Actor, SeatClass};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CapacityRequest {
    pub capacity: u32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights", get(list_flights).post(create_flight))
        .route("/v1/flights/search", get(search_flights))
        .route("/v1/flights/{id}", get(get_flight).put(update_flight).delete(delete_flight))
        .route("/v1/flights/{id}/capacity", put(set_capacity))
        .route("/v1/flights/{id}/offers/{class}", delete(remove_offer))
}

/// GET /v1/flights
async fn list_flights(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<FlightView>>, AppError> {
    let flights = state.catalog.list_flights(&actor).await?;
    Ok(Json(flights.into_iter().map(FlightView::from).collect()))
}

/// POST /v1/flights
async fn create_flight(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(draft): Json<FlightDraft>,
) -> Result<(StatusCode, Json<FlightView>), AppError> {
    let flight = state.catalog.create_flight(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(flight.into())))
}

/// GET /v1/flights/search?origin=..&destination=..&date=YYYY-MM-DD&sort=asc|desc
async fn search_flights(
    State(state): State<AppState>,
    Query(query): Query<FlightSearchQuery>,
) -> Result<Json<Vec<FlightView>>, AppError> {
    let flights = state.catalog.search(&query, Utc::now()).await?;
    Ok(Json(flights.into_iter().map(FlightView::from).collect()))
}

async fn get_flight(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<FlightView>, AppError> {
    let flight = state.catalog.get_flight(&actor, flight_id).await?;
    Ok(Json(flight.into()))
}

async fn update_flight(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(flight_id): Path<Uuid>,
    Json(changes): Json<FlightChanges>,
) -> Result<Json<FlightView>, AppError> {
    let flight = state.catalog.update_flight(&actor, flight_id, changes).await?;
    Ok(Json(flight.into()))
}

async fn delete_flight(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(flight_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_flight(&actor, flight_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/flights/{id}/capacity
async fn set_capacity(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(flight_id): Path<Uuid>,
    Json(req): Json<CapacityRequest>,
) -> Result<Json<FlightView>, AppError> {
    let flight = state.inventory.set_capacity(&actor, flight_id, req.capacity).await?;
    Ok(Json(flight.into()))
}

/// DELETE /v1/flights/{id}/offers/{class}
async fn remove_offer(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((flight_id, class)): Path<(Uuid, String)>,
) -> Result<Json<FlightView>, AppError> {
    let class = SeatClass::parse(&class).ok_or_else(|| AppError::BadRequest(format!("unknown seat class: {}", class)))?;
    let flight = state.catalog.remove_offer(&actor, flight_id, class).await?;
    Ok(Json(flight.into()))
}
