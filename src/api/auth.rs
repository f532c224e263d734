//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Patron, Role},
    services::access::authenticate,
    AppState,
};

use super::{commit, AuthenticatedUser, Claims};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub patron: Patron,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
}

/// Current patron with loan counters
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub role: Role,
    pub active_loans: usize,
    pub overdue_loans: usize,
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    request.validate()?;

    let library = state.library.lock().await;
    let patron = authenticate(&library.patrons, &request.username, &request.password)?.clone();
    drop(library);

    let hours = state.config.auth.jwt_expiration_hours;
    let token = Claims::new(&patron.username, patron.role, hours)
        .create_token(&state.config.auth.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

    tracing::info!(username = %patron.username, "Login");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: hours * 3600,
        patron,
    }))
}

/// Self-service registration; always creates a regular patron
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Patron>)> {
    request.validate()?;

    let patron = commit(&state, |library| {
        library.register(&request.username, &request.password, Role::Regular)?;
        Ok(library.patrons.get(request.username.trim())?.clone())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(patron)))
}

pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MeResponse>> {
    let library = state.library.lock().await;
    let patron = library.patrons.get(&claims.sub)?;
    Ok(Json(MeResponse {
        username: patron.username.clone(),
        role: patron.role,
        active_loans: library.circulation.active_count(&patron.username),
        overdue_loans: library.circulation.overdue_count(&patron.username, Utc::now()),
    }))
}
