//! Patron administration endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Patron, Role},
    AppState,
};

use super::{books::parse_order, commit, AuthenticatedUser};

#[derive(Debug, Default, Deserialize)]
pub struct PatronQuery {
    pub q: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePatronRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    /// `regular` or `administrator` (default: regular)
    pub role: Option<String>,
}

pub async fn list_patrons(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PatronQuery>,
) -> AppResult<Json<Vec<Patron>>> {
    claims.require_admin()?;
    let order = parse_order(query.order.as_deref())?;

    let library = state.library.lock().await;
    Ok(Json(
        library
            .patrons
            .search_sorted(query.q.as_deref().unwrap_or(""), order),
    ))
}

pub async fn create_patron(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreatePatronRequest>,
) -> AppResult<(StatusCode, Json<Patron>)> {
    claims.require_admin()?;
    request.validate()?;
    let role: Role = match request.role.as_deref() {
        Some(role) => role.parse().map_err(AppError::Validation)?,
        None => Role::Regular,
    };

    let patron = commit(&state, |library| {
        library.register(&request.username, &request.password, role)?;
        Ok(library.patrons.get(request.username.trim())?.clone())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(patron)))
}

/// Remove a patron; refused while they hold active loans
pub async fn delete_patron(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(username): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    if claims.sub == username {
        return Err(AppError::Conflict(
            "Administrators cannot remove their own account here".to_string(),
        ));
    }

    commit(&state, |library| library.remove_patron(&username)).await?;
    Ok(StatusCode::NO_CONTENT)
}
