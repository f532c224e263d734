//! Business logic services

pub mod access;
pub mod catalog;
pub mod circulation;
pub mod patrons;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::{
    collections::WaitQueue,
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{Availability, Book, ImportReport, LoanRecord, Patron, Role},
    repository::legacy::LegacyBatch,
};

pub use access::AccessController;
pub use catalog::CatalogManager;
pub use circulation::{BorrowOutcome, CirculationManager, LoanLocator, Promotion, ReturnOutcome};
pub use patrons::PatronManager;

/// The whole desk: catalog, patrons, loans and the session gate, wired
/// together so cross-manager rules hold.
#[derive(Debug, Clone)]
pub struct Library {
    pub catalog: CatalogManager,
    pub patrons: PatronManager,
    pub circulation: CirculationManager,
    pub access: AccessController,
    config: LibraryConfig,
}

impl Default for Library {
    fn default() -> Self {
        Self::new(LibraryConfig::default())
    }
}

impl Library {
    pub fn new(config: LibraryConfig) -> Self {
        Self {
            catalog: CatalogManager::new(config.into()),
            patrons: PatronManager::new(),
            circulation: CirculationManager::new(config.loan_period_days),
            access: AccessController::new(),
            config,
        }
    }

    pub fn config(&self) -> LibraryConfig {
        self.config
    }

    /// Rebuild a library from persisted parts. Book availability is derived
    /// from the active loans, not taken from the input.
    pub fn restore(
        config: LibraryConfig,
        books: Vec<Book>,
        patrons: Vec<Patron>,
        loans: Vec<LoanRecord>,
        queues: IndexMap<String, WaitQueue>,
    ) -> Self {
        let mut library = Self::new(config);
        let report = library.catalog.import_books(books);
        if report.skipped() > 0 {
            tracing::warn!("Skipped {} stored books while loading", report.skipped());
        }
        library.patrons.restore(patrons);
        library.circulation.restore(loans, queues);
        library.reconcile_availability();
        library
    }

    /// Set every book's availability from the loan history
    pub fn reconcile_availability(&mut self) {
        let isbns: Vec<String> = self.catalog.books().iter().map(|b| b.isbn.clone()).collect();
        for isbn in isbns {
            let availability = if self.circulation.is_on_loan(&isbn) {
                Availability::OnLoan
            } else {
                Availability::Available
            };
            if let Err(e) = self.catalog.set_availability(&isbn, availability) {
                tracing::warn!(isbn = %isbn, "Could not reconcile availability: {}", e);
            }
        }
    }

    pub fn borrow(&mut self, isbn: &str, username: &str, now: DateTime<Utc>) -> AppResult<BorrowOutcome> {
        self.circulation
            .borrow(&mut self.catalog, &self.patrons, isbn, username, now)
    }

    pub fn return_loan(&mut self, locator: &LoanLocator, now: DateTime<Utc>) -> AppResult<ReturnOutcome> {
        self.circulation
            .return_loan(&mut self.catalog, &self.patrons, locator, now)
    }

    pub fn renew(&mut self, locator: &LoanLocator, now: DateTime<Utc>) -> AppResult<LoanRecord> {
        self.circulation.renew(locator, now)
    }

    /// Remove a book that is not on loan, dropping its wait queue
    pub fn remove_book(&mut self, isbn: &str) -> AppResult<Book> {
        if self.circulation.is_on_loan(isbn) {
            return Err(AppError::Conflict(format!("{} is currently on loan", isbn)));
        }
        let removed = self.catalog.remove(isbn)?;
        let waiting: Vec<String> = self
            .circulation
            .queue(isbn)
            .map(|q| q.iter().map(str::to_string).collect())
            .unwrap_or_default();
        for username in waiting {
            self.circulation.cancel_reservation(isbn, &username);
        }
        Ok(removed)
    }

    /// Remove a patron with no active loans and withdraw their reservations
    pub fn remove_patron(&mut self, username: &str) -> AppResult<Patron> {
        self.ensure_no_active_loans(username)?;
        let removed = self.patrons.remove(username)?;
        let withdrawn = self.circulation.withdraw_from_queues(username);
        if withdrawn > 0 {
            tracing::info!(username = %username, withdrawn, "Reservations withdrawn");
        }
        Ok(removed)
    }

    pub fn register(&mut self, username: &str, password: &str, role: Role) -> AppResult<()> {
        self.access.register(&mut self.patrons, username, password, role)
    }

    pub fn login(&mut self, username: &str, password: &str) -> AppResult<Patron> {
        self.access.login(&self.patrons, username, password)
    }

    pub fn logout(&mut self) -> Option<String> {
        self.access.logout()
    }

    /// Close the logged-in patron's account, under the same rules as
    /// [`Library::remove_patron`].
    pub fn delete_current_user(&mut self) -> AppResult<Patron> {
        let username = self
            .access
            .current_username()
            .map(str::to_string)
            .ok_or_else(|| AppError::Authentication("No active session".to_string()))?;
        self.ensure_no_active_loans(&username)?;
        let removed = self.access.delete_current_user(&mut self.patrons)?;
        self.circulation.withdraw_from_queues(&username);
        Ok(removed)
    }

    /// Bulk import parsed legacy lines; unparseable lines count as skipped
    pub fn import_legacy(&mut self, batch: LegacyBatch) -> ImportReport {
        let mut report = self.catalog.import_books(batch.books);
        for reason in batch.rejected {
            report.malformed(reason);
        }
        report
    }

    fn ensure_no_active_loans(&self, username: &str) -> AppResult<()> {
        if self.circulation.active_count(username) > 0 {
            return Err(AppError::PatronHasActiveLoans(username.to_string()));
        }
        Ok(())
    }
}
