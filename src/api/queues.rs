//! Reservation queue endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    AppState,
};

use super::{commit, AuthenticatedUser};

/// Queue summary; only administrators see who is waiting
#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub isbn: String,
    pub length: usize,
    /// Caller's own 1-based position, if waiting
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patrons: Option<Vec<String>>,
}

pub async fn get_queue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<QueueResponse>> {
    let library = state.library.lock().await;
    library.catalog.get(&isbn)?;

    let queue = library.circulation.queue(&isbn);
    Ok(Json(QueueResponse {
        length: queue.map_or(0, |q| q.len()),
        position: queue.and_then(|q| q.position(&claims.sub)),
        patrons: claims
            .is_admin()
            .then(|| queue.map(|q| q.iter().map(str::to_string).collect()).unwrap_or_default()),
        isbn,
    }))
}

/// Withdraw the caller's own reservation
pub async fn cancel_reservation(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<StatusCode> {
    commit(&state, |library| {
        if library.circulation.cancel_reservation(&isbn, &claims.sub) {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "{} is not waiting for {}",
                claims.sub, isbn
            )))
        }
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
