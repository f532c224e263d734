//! Integration tests for the circulation desk

mod api_tests;
mod library_tests;
mod repository_tests;

use chrono::{DateTime, TimeZone, Utc};
use circulation_desk::{
    config::{AppConfig, StorageConfig},
    models::{Book, Role},
    Library,
};

pub fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, 10, 0, 0).unwrap()
}

/// Small library with three books and three patrons
pub fn sample_library() -> Library {
    let mut library = Library::default();
    for book in [
        Book::new("978-1", "Dune", "Frank Herbert", "Chilton", 1965),
        Book::new("978-2", "Emma", "Jane Austen", "John Murray", 1815),
        Book::new("978-3", "Solaris", "Stanislaw Lem", "MON", 1961),
    ] {
        library.catalog.add(book).unwrap();
    }
    library.register("admin", "admin-pw", Role::Administrator).unwrap();
    library.register("alice", "alice-pw", Role::Regular).unwrap();
    library.register("bob", "bob-pw", Role::Regular).unwrap();
    library
}

pub fn config_in(dir: &std::path::Path) -> AppConfig {
    AppConfig {
        storage: StorageConfig {
            data_dir: dir.to_path_buf(),
            ..StorageConfig::default()
        },
        ..AppConfig::default()
    }
}
