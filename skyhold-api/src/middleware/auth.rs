use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use skyhold_core::{Actor, Role};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    /// Set for airline accounts
    #[serde(default)]
    pub airline_id: Option<Uuid>,
    pub exp: usize,
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Actor {
            id: claims.sub,
            role: claims.role,
            airline_id: claims.airline_id,
        }
    }
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// Resolve the bearer token into an `Actor` for the handlers. Capability
/// checks happen in the services, not here.
pub async fn require_actor(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    // 1. Extract token from Authorization header
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthenticated("missing bearer token".to_string()))?;

    // 2. Decode and validate JWT
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.expose().as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthenticated(format!("invalid token: {}", e)))?;

    // 3. Inject the actor into request extensions
    let actor = Actor::from(token_data.claims);
    tracing::debug!("Request by {:?} {}", actor.role, actor.id);
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}
