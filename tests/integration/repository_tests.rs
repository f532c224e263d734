//! Persistence round trips through a temporary data directory

use circulation_desk::{config::LibraryConfig, services::LoanLocator, Repository};

use crate::{at, config_in, sample_library};

#[test]
fn test_save_and_reload_library() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let repository = Repository::new(config.storage.clone());

    let mut library = sample_library();
    library.borrow("978-1", "alice", at(2, 1)).unwrap();
    library.borrow("978-1", "bob", at(2, 2)).unwrap();
    library.borrow("978-2", "bob", at(2, 3)).unwrap();
    library.return_loan(&LoanLocator::Id(2), at(2, 4)).unwrap();
    repository.save_library(&library).unwrap();

    let reloaded = repository.load_library(LibraryConfig::default()).unwrap();
    assert_eq!(reloaded.catalog.len(), 3);
    assert_eq!(reloaded.patrons.len(), 3);
    assert_eq!(reloaded.circulation.len(), 2);

    // Availability is rebuilt from active loans
    assert!(!reloaded.catalog.get("978-1").unwrap().is_available());
    assert!(reloaded.catalog.get("978-2").unwrap().is_available());

    // Queue order and the id sequence survive
    assert_eq!(
        reloaded.circulation.queue("978-1").and_then(|q| q.front()),
        Some("bob")
    );
    assert_eq!(reloaded.circulation.next_id(), 3);

    // Hashed credentials still verify
    let mut reloaded = reloaded;
    reloaded.login("alice", "alice-pw").unwrap();
}

#[test]
fn test_empty_directory_loads_empty_library() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Repository::new(config_in(dir.path()).storage);
    let library = repository.load_library(LibraryConfig::default()).unwrap();
    assert!(library.catalog.is_empty());
    assert!(library.patrons.is_empty());
    assert!(library.circulation.is_empty());
}

#[test]
fn test_corrupt_book_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::write(config.storage.books_path(), "{ not json").unwrap();
    let repository = Repository::new(config.storage);
    assert!(repository.load_library(LibraryConfig::default()).is_err());
}
