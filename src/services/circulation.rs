//! Loan desk: borrow, return, renew and reservation queues

use chrono::{DateTime, Duration, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;

use crate::{
    collections::{binary_search_sorted, quick_sort, sort_by, IndexedCollection, SortOrder, WaitQueue},
    error::{AppError, AppResult},
    models::{
        loan::{date_key, format_record_id},
        Availability, LoanField, LoanRecord, LoanStatus,
    },
};

/// Book lookups the loan desk needs, plus the single availability signal
/// it sends back to the catalog.
#[cfg_attr(test, mockall::automock)]
pub trait BookDirectory {
    /// `None` when the ISBN is not catalogued
    fn availability(&self, isbn: &str) -> Option<Availability>;
    fn set_availability(&mut self, isbn: &str, availability: Availability) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait PatronDirectory {
    fn contains(&self, username: &str) -> bool;
}

/// Result of a borrow request that did not fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BorrowOutcome {
    Borrowed {
        record_id: u64,
        due_date: DateTime<Utc>,
    },
    /// The book was on loan; the patron joined its wait queue at `position` (1-based)
    Queued { position: usize },
}

/// Loan opened automatically for the head of a wait queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Promotion {
    pub username: String,
    pub record_id: u64,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnOutcome {
    pub record_id: u64,
    pub promoted: Option<Promotion>,
}

/// How a caller identifies the loan to return or renew
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanLocator {
    Id(u64),
    Pair { isbn: String, username: String },
}

impl LoanLocator {
    pub fn pair(isbn: impl Into<String>, username: impl Into<String>) -> Self {
        LoanLocator::Pair {
            isbn: isbn.into(),
            username: username.into(),
        }
    }
}

impl std::fmt::Display for LoanLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanLocator::Id(id) => write!(f, "{}", format_record_id(*id)),
            LoanLocator::Pair { isbn, username } => write!(f, "{} / {}", isbn, username),
        }
    }
}

/// Owns loan history, per-book wait queues and the loan id sequence
#[derive(Debug, Clone)]
pub struct CirculationManager {
    loans: IndexedCollection<LoanRecord>,
    queues: IndexMap<String, WaitQueue>,
    next_id: u64,
    loan_period: Duration,
}

impl Default for CirculationManager {
    fn default() -> Self {
        Self::new(30)
    }
}

impl CirculationManager {
    pub fn new(loan_period_days: i64) -> Self {
        Self {
            loans: IndexedCollection::new(),
            queues: IndexMap::new(),
            next_id: 1,
            loan_period: Duration::days(loan_period_days),
        }
    }

    pub fn loan_period(&self) -> Duration {
        self.loan_period
    }

    /// Borrow a book, or join its wait queue when it is already on loan.
    pub fn borrow<B, P>(
        &mut self,
        books: &mut B,
        patrons: &P,
        isbn: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> AppResult<BorrowOutcome>
    where
        B: BookDirectory + ?Sized,
        P: PatronDirectory + ?Sized,
    {
        let availability = self.check_borrower(books, patrons, isbn, username)?;

        if availability == Availability::OnLoan {
            let queue = self.queues.entry(isbn.to_string()).or_default();
            return match queue.enqueue(username) {
                Some(position) => {
                    tracing::info!(isbn = %isbn, username = %username, position, "Patron queued");
                    Ok(BorrowOutcome::Queued { position })
                }
                None => Err(AppError::AlreadyQueued {
                    isbn: isbn.to_string(),
                    username: username.to_string(),
                }),
            };
        }

        let (record_id, due_date) = self.open_loan(books, isbn, username, now)?;
        Ok(BorrowOutcome::Borrowed { record_id, due_date })
    }

    /// Close an active loan. If patrons are waiting for the book, the head of
    /// the queue gets one borrow attempt; its failure does not fail the return.
    pub fn return_loan<B, P>(
        &mut self,
        books: &mut B,
        patrons: &P,
        locator: &LoanLocator,
        now: DateTime<Utc>,
    ) -> AppResult<ReturnOutcome>
    where
        B: BookDirectory + ?Sized,
        P: PatronDirectory + ?Sized,
    {
        let position = self.locate_active(locator)?;
        self.loans
            .update_at(position, |record| record.mark_returned(now))??;

        let (record_id, isbn) = match self.loans.get(position) {
            Some(record) => (record.id, record.isbn.clone()),
            None => return Err(AppError::Internal("returned record vanished".to_string())),
        };
        tracing::info!(record = %format_record_id(record_id), isbn = %isbn, "Loan returned");

        if let Err(e) = books.set_availability(&isbn, Availability::Available) {
            tracing::warn!(isbn = %isbn, "Returned book is no longer catalogued: {}", e);
        }

        let promoted = self.promote_next(books, patrons, &isbn, now);
        Ok(ReturnOutcome { record_id, promoted })
    }

    /// Push the due date of an active loan to `now` plus one loan period.
    /// Waiting patrons do not block a renewal.
    pub fn renew(&mut self, locator: &LoanLocator, now: DateTime<Utc>) -> AppResult<LoanRecord> {
        let position = self.locate_active(locator)?;
        let due_date = now + self.loan_period;
        self.loans
            .update_at(position, |record| record.set_due_date(due_date))??;
        let record = self
            .loans
            .get(position)
            .cloned()
            .ok_or_else(|| AppError::Internal("renewed record vanished".to_string()))?;
        tracing::info!(record = %record.record_id(), due = %due_date, "Loan renewed");
        Ok(record)
    }

    fn check_borrower<B, P>(
        &self,
        books: &B,
        patrons: &P,
        isbn: &str,
        username: &str,
    ) -> AppResult<Availability>
    where
        B: BookDirectory + ?Sized,
        P: PatronDirectory + ?Sized,
    {
        if !patrons.contains(username) {
            return Err(AppError::PatronNotFound(username.to_string()));
        }
        let availability = books
            .availability(isbn)
            .ok_or_else(|| AppError::BookNotFound(isbn.to_string()))?;
        if self.active_loan(isbn, username).is_some() {
            return Err(AppError::DuplicateActiveLoan {
                isbn: isbn.to_string(),
                username: username.to_string(),
            });
        }
        Ok(availability)
    }

    fn open_loan<B>(
        &mut self,
        books: &mut B,
        isbn: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> AppResult<(u64, DateTime<Utc>)>
    where
        B: BookDirectory + ?Sized,
    {
        let record = LoanRecord::new(self.next_id, isbn, username, now, now + self.loan_period)?;
        books.set_availability(isbn, Availability::OnLoan)?;

        let (record_id, due_date) = (record.id, record.due_date);
        self.next_id += 1;
        self.loans.insert(record);
        self.leave_queue(isbn, username);

        tracing::info!(
            record = %format_record_id(record_id),
            isbn = %isbn,
            username = %username,
            "Loan opened"
        );
        Ok((record_id, due_date))
    }

    fn promote_next<B, P>(
        &mut self,
        books: &mut B,
        patrons: &P,
        isbn: &str,
        now: DateTime<Utc>,
    ) -> Option<Promotion>
    where
        B: BookDirectory + ?Sized,
        P: PatronDirectory + ?Sized,
    {
        let queue = self.queues.get_mut(isbn)?;
        let next = queue.dequeue();
        if queue.is_empty() {
            self.queues.shift_remove(isbn);
        }
        let username = next?;

        let attempt = self
            .check_borrower(books, patrons, isbn, &username)
            .and_then(|availability| match availability {
                Availability::Available => self.open_loan(books, isbn, &username, now),
                Availability::OnLoan => Err(AppError::Conflict(format!(
                    "{} is still on loan",
                    isbn
                ))),
            });

        match attempt {
            Ok((record_id, due_date)) => {
                tracing::info!(isbn = %isbn, username = %username, "Queue head promoted");
                Some(Promotion {
                    username,
                    record_id,
                    due_date,
                })
            }
            Err(e) => {
                tracing::warn!(isbn = %isbn, username = %username, "Automatic borrow failed: {}", e);
                None
            }
        }
    }

    fn locate_active(&self, locator: &LoanLocator) -> AppResult<usize> {
        match locator {
            LoanLocator::Id(id) => {
                let position = self
                    .loans
                    .hash_lookup(id)
                    .ok_or_else(|| AppError::LoanNotFound(format_record_id(*id)))?;
                match self.loans.get(position) {
                    Some(record) if record.returned => Err(AppError::AlreadyReturned(*id)),
                    Some(_) => Ok(position),
                    None => Err(AppError::LoanNotFound(format_record_id(*id))),
                }
            }
            LoanLocator::Pair { isbn, username } => {
                let matches = |r: &LoanRecord| &r.isbn == isbn && &r.username == username;
                if let Some(position) = self.loans.iter().position(|r| matches(r) && !r.returned) {
                    return Ok(position);
                }
                match self.loans.iter().filter(|&r| matches(r)).last() {
                    Some(returned) => Err(AppError::AlreadyReturned(returned.id)),
                    None => Err(AppError::LoanNotFound(locator.to_string())),
                }
            }
        }
    }

    fn leave_queue(&mut self, isbn: &str, username: &str) {
        if let Some(queue) = self.queues.get_mut(isbn) {
            queue.remove(username);
            if queue.is_empty() {
                self.queues.shift_remove(isbn);
            }
        }
    }

    /// Withdraw a reservation. Returns false if the patron was not waiting.
    pub fn cancel_reservation(&mut self, isbn: &str, username: &str) -> bool {
        let waiting = self
            .queues
            .get(isbn)
            .map_or(false, |queue| queue.contains(username));
        if waiting {
            self.leave_queue(isbn, username);
            tracing::info!(isbn = %isbn, username = %username, "Reservation cancelled");
        }
        waiting
    }

    /// Remove a patron from every wait queue; returns how many they left
    pub fn withdraw_from_queues(&mut self, username: &str) -> usize {
        let mut withdrawn = 0;
        self.queues.retain(|_, queue| {
            if queue.remove(username) {
                withdrawn += 1;
            }
            !queue.is_empty()
        });
        withdrawn
    }

    /// Replace state with persisted loans and queues. The id sequence resumes
    /// after the largest id seen.
    pub fn restore(&mut self, loans: Vec<LoanRecord>, queues: IndexMap<String, WaitQueue>) {
        self.loans.clear();
        for record in loans {
            if self.loans.contains_key(&record.id) {
                tracing::warn!(record = %record.record_id(), "Skipping repeated loan id");
                continue;
            }
            self.loans.insert_deferred(record);
        }
        self.loans.rebuild_index();

        self.next_id = self.loans.iter().map(|r| r.id).max().map_or(1, |max| max + 1);
        self.queues = queues.into_iter().filter(|(_, q)| !q.is_empty()).collect();
    }

    pub fn find(&self, id: u64) -> Option<&LoanRecord> {
        self.loans.find(&id)
    }

    pub fn records(&self) -> &[LoanRecord] {
        self.loans.as_slice()
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn active_loan(&self, isbn: &str, username: &str) -> Option<&LoanRecord> {
        self.loans
            .iter()
            .find(|r| !r.returned && r.isbn == isbn && r.username == username)
    }

    pub fn is_on_loan(&self, isbn: &str) -> bool {
        self.loans.iter().any(|r| !r.returned && r.isbn == isbn)
    }

    pub fn by_book(&self, isbn: &str) -> Vec<LoanRecord> {
        self.filter(|r| r.isbn == isbn)
    }

    pub fn by_patron(&self, username: &str) -> Vec<LoanRecord> {
        self.filter(|r| r.username == username)
    }

    pub fn by_status(&self, status: LoanStatus, now: DateTime<Utc>) -> Vec<LoanRecord> {
        self.filter(|r| r.status(now) == status)
    }

    pub fn by_borrow_date(&self, date: NaiveDate) -> Vec<LoanRecord> {
        self.by_date_key(date, |r| r.borrow_date)
    }

    pub fn by_due_date(&self, date: NaiveDate) -> Vec<LoanRecord> {
        self.by_date_key(date, |r| r.due_date)
    }

    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<LoanRecord> {
        self.filter(|r| r.is_overdue(now))
    }

    pub fn active_count(&self, username: &str) -> usize {
        self.loans
            .iter()
            .filter(|r| r.is_active() && r.username == username)
            .count()
    }

    pub fn overdue_count(&self, username: &str, now: DateTime<Utc>) -> usize {
        self.loans
            .iter()
            .filter(|r| r.is_overdue(now) && r.username == username)
            .count()
    }

    pub fn queue(&self, isbn: &str) -> Option<&WaitQueue> {
        self.queues.get(isbn)
    }

    pub fn queues(&self) -> &IndexMap<String, WaitQueue> {
        &self.queues
    }

    fn filter(&self, keep: impl Fn(&LoanRecord) -> bool) -> Vec<LoanRecord> {
        self.loans.iter().filter(|r| keep(r)).cloned().collect()
    }

    /// Records whose projected date falls on `date`, found by binary search
    /// over a projection sorted by `YYYY-MM-DD` key.
    fn by_date_key(&self, date: NaiveDate, project: impl Fn(&LoanRecord) -> DateTime<Utc>) -> Vec<LoanRecord> {
        let target = date.format("%Y-%m-%d").to_string();
        let mut keyed: Vec<(String, &LoanRecord)> = self
            .loans
            .iter()
            .map(|r| (date_key(project(r)), r))
            .collect();
        quick_sort(&mut keyed, |a, b| a.0 < b.0);

        match binary_search_sorted(&keyed, target.as_str(), |e| e.0.as_str(), |a, b| a < b) {
            Some(first) => keyed[first..]
                .iter()
                .take_while(|(key, _)| *key == target)
                .map(|(_, r)| (*r).clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

fn compare_records(a: &LoanRecord, b: &LoanRecord, field: LoanField, now: DateTime<Utc>) -> Ordering {
    match field {
        LoanField::Id => a.id.cmp(&b.id),
        LoanField::Isbn => a.isbn.cmp(&b.isbn),
        LoanField::Username => a.username.cmp(&b.username),
        LoanField::BorrowDate => a.borrow_date.cmp(&b.borrow_date),
        LoanField::DueDate => a.due_date.cmp(&b.due_date),
        LoanField::ReturnDate => a.return_date.cmp(&b.return_date),
        LoanField::Status => a.status(now).as_str().cmp(b.status(now).as_str()),
    }
}

/// Sort loan records in place by one column
pub fn sort_records(records: &mut [LoanRecord], field: LoanField, order: SortOrder, now: DateTime<Utc>) {
    sort_by(records, |a, b| order.apply(compare_records(a, b, field, now)));
}
