//! Repository layer for file-backed persistence

pub mod books;
pub mod legacy;
pub mod loans;
pub mod patrons;
pub mod queues;

use std::path::Path;

use crate::{
    config::{LibraryConfig, StorageConfig},
    error::AppResult,
    services::Library,
};

/// Loads and saves the whole library state under the configured data directory
#[derive(Debug, Clone)]
pub struct Repository {
    storage: StorageConfig,
}

impl Repository {
    pub fn new(storage: StorageConfig) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Load every file; missing files start empty
    pub fn load_library(&self, config: LibraryConfig) -> AppResult<Library> {
        let books = books::load(&self.storage.books_path())?;
        let patrons = patrons::load(&self.storage.patrons_path())?;
        let loans = loans::load(&self.storage.loans_path())?;
        let queues = queues::load(&self.storage.queues_path())?;
        tracing::info!(
            books = books.len(),
            patrons = patrons.len(),
            loans = loans.len(),
            queues = queues.len(),
            "Library loaded from {}",
            self.storage.data_dir.display()
        );
        Ok(Library::restore(config, books, patrons, loans, queues))
    }

    pub fn save_library(&self, library: &Library) -> AppResult<()> {
        std::fs::create_dir_all(&self.storage.data_dir)?;
        books::save(&self.storage.books_path(), library.catalog.books())?;
        patrons::save(&self.storage.patrons_path(), library.patrons.all())?;
        loans::save(&self.storage.loans_path(), library.circulation.records())?;
        queues::save(&self.storage.queues_path(), library.circulation.queues())?;
        tracing::debug!("Library saved to {}", self.storage.data_dir.display());
        Ok(())
    }
}

/// File contents, or `None` when the file does not exist
fn read_optional(path: &Path) -> AppResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_file(path: &Path, content: &str) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
