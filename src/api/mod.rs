//! API handlers for the circulation desk REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod patrons;
pub mod queues;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    models::Role,
    services::Library,
    AppState,
};

/// JWT claims carried by every authenticated request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(username: &str, role: Role, lifetime_hours: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: username.to_string(),
            role,
            exp: now + (lifetime_hours as i64) * 3600,
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Administrator role required".to_string(),
            ))
        }
    }

    /// Administrators act for anyone; patrons only for themselves
    pub fn require_self_or_admin(&self, username: &str) -> AppResult<()> {
        if self.is_admin() || self.sub == username {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Not allowed to act for {}",
                username
            )))
        }
    }
}

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = Claims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Run `change` against a copy of the library and save the copy.
///
/// The shared library is replaced only once the save succeeds, so a failed
/// mutation or a failed write leaves it untouched.
pub(crate) async fn commit<T, F>(state: &AppState, change: F) -> AppResult<T>
where
    F: FnOnce(&mut Library) -> AppResult<T>,
{
    let mut library = state.library.lock().await;
    let mut draft = library.clone();
    let value = change(&mut draft)?;

    let repository = state.repository.clone();
    let draft = tokio::task::spawn_blocking(move || repository.save_library(&draft).map(|_| draft))
        .await
        .map_err(|e| AppError::Internal(format!("Save task failed: {}", e)))??;

    *library = draft;
    Ok(value)
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/years", get(books::books_by_years))
        .route("/books/import", post(books::import_books))
        .route("/books/export", get(books::export_books))
        .route(
            "/books/:isbn",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Patrons
        .route("/patrons", get(patrons::list_patrons).post(patrons::create_patron))
        .route("/patrons/:username", axum::routing::delete(patrons::delete_patron))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/loans/overdue", get(loans::overdue_loans))
        .route("/loans/:id/return", post(loans::return_loan))
        .route("/loans/:id/renew", post(loans::renew_loan))
        // Wait queues
        .route(
            "/queues/:isbn",
            get(queues::get_queue).delete(queues::cancel_reservation),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let claims = Claims::new("alice", Role::Regular, 1);
        let token = claims.create_token("secret").unwrap();
        let parsed = Claims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.sub, "alice");
        assert_eq!(parsed.role, Role::Regular);
        assert!(Claims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_role_checks() {
        let patron = Claims::new("alice", Role::Regular, 1);
        assert!(patron.require_admin().is_err());
        assert!(patron.require_self_or_admin("alice").is_ok());
        assert!(patron.require_self_or_admin("bob").is_err());
        let admin = Claims::new("root", Role::Administrator, 1);
        assert!(admin.require_self_or_admin("bob").is_ok());
    }
}
