//! Circulation Desk
//!
//! In-memory catalog, patron and loan management for a small library,
//! persisted to flat JSON files and exposed through a REST JSON API.

use std::sync::Arc;

use tokio::sync::Mutex;

pub mod api;
pub mod collections;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::Repository;
pub use services::Library;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Every request works on the library under this lock
    pub library: Arc<Mutex<Library>>,
    pub repository: Repository,
}

impl AppState {
    pub fn new(config: AppConfig, library: Library) -> Self {
        let repository = Repository::new(config.storage.clone());
        Self {
            config: Arc::new(config),
            library: Arc::new(Mutex::new(library)),
            repository,
        }
    }
}
