//! End-to-end circulation scenarios through the library facade

use chrono::Duration;
use circulation_desk::{
    error::AppError,
    models::{BookField, LoanStatus},
    services::{BorrowOutcome, LoanLocator},
};

use crate::{at, sample_library};

#[test]
fn test_alice_bob_contention_on_single_copy() {
    let mut library = sample_library();

    let first = library.borrow("978-1", "alice", at(3, 1)).unwrap();
    assert!(matches!(first, BorrowOutcome::Borrowed { record_id: 1, .. }));

    let second = library.borrow("978-1", "bob", at(3, 2)).unwrap();
    assert_eq!(second, BorrowOutcome::Queued { position: 1 });

    let returned = library
        .return_loan(&LoanLocator::pair("978-1", "alice"), at(3, 10))
        .unwrap();
    let promoted = returned.promoted.expect("bob takes over the loan");
    assert_eq!(promoted.username, "bob");
    assert_eq!(promoted.due_date, at(3, 10) + Duration::days(30));

    assert!(!library.catalog.get("978-1").unwrap().is_available());
    assert!(library.circulation.queue("978-1").is_none());
    assert_eq!(library.circulation.active_count("bob"), 1);
    assert_eq!(library.circulation.active_count("alice"), 0);

    // Every record stays in history
    assert_eq!(library.circulation.by_book("978-1").len(), 2);
}

#[test]
fn test_return_twice_and_renew_returned() {
    let mut library = sample_library();
    library.borrow("978-2", "alice", at(4, 1)).unwrap();
    library.return_loan(&LoanLocator::Id(1), at(4, 2)).unwrap();

    assert!(matches!(
        library.return_loan(&LoanLocator::Id(1), at(4, 3)),
        Err(AppError::AlreadyReturned(1))
    ));
    assert!(matches!(
        library.renew(&LoanLocator::pair("978-2", "alice"), at(4, 3)),
        Err(AppError::AlreadyReturned(1))
    ));
    assert!(library.catalog.get("978-2").unwrap().is_available());
}

#[test]
fn test_overdue_then_renewed() {
    let mut library = sample_library();
    library.borrow("978-3", "bob", at(1, 1)).unwrap();

    let later = at(3, 1);
    assert_eq!(library.circulation.overdue(later).len(), 1);
    assert_eq!(
        library.circulation.find(1).unwrap().status(later),
        LoanStatus::Overdue
    );

    library.renew(&LoanLocator::Id(1), later).unwrap();
    assert!(library.circulation.overdue(later).is_empty());
    assert_eq!(library.circulation.overdue_count("bob", later), 0);
}

#[test]
fn test_year_update_out_of_range_rejected() {
    let mut library = sample_library();
    let err = library
        .catalog
        .update_field("978-1", BookField::Year, "2999")
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(library.catalog.get("978-1").unwrap().publish_year, 1965);
}

#[test]
fn test_remove_unknown_isbn_keeps_size() {
    let mut library = sample_library();
    assert!(matches!(
        library.remove_book("000-0"),
        Err(AppError::BookNotFound(_))
    ));
    assert_eq!(library.catalog.len(), 3);
}

#[test]
fn test_patron_removal_rules() {
    let mut library = sample_library();
    library.borrow("978-1", "alice", at(5, 1)).unwrap();
    library.borrow("978-1", "bob", at(5, 1)).unwrap();

    assert!(matches!(
        library.remove_patron("alice"),
        Err(AppError::PatronHasActiveLoans(_))
    ));

    library.remove_patron("bob").unwrap();
    assert!(library.circulation.queue("978-1").is_none());

    // Nobody left to promote: the book goes back on the shelf
    let outcome = library.return_loan(&LoanLocator::Id(1), at(5, 2)).unwrap();
    assert!(outcome.promoted.is_none());
    assert!(library.catalog.get("978-1").unwrap().is_available());
}

#[test]
fn test_session_gate() {
    let mut library = sample_library();
    assert!(library.login("alice", "wrong").is_err());
    library.login("alice", "alice-pw").unwrap();
    assert_eq!(
        library.access.current_user(&library.patrons).map(|p| p.username.as_str()),
        Some("alice")
    );
    assert!(library
        .access
        .require(&library.patrons, circulation_desk::models::Role::Administrator)
        .is_err());
}
