//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub books: usize,
    pub patrons: usize,
    pub loans: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let library = state.library.lock().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        books: library.catalog.len(),
        patrons: library.patrons.len(),
        loans: library.circulation.len(),
    })
}
