//! Catalog management service

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::{
    collections::{binary_search_sorted, sort_by, IndexedCollection, SortOrder},
    error::{AppError, AppResult},
    models::{
        book::require_text,
        Availability, Book, BookField, ImportReport, YearBounds,
    },
};

use super::circulation::BookDirectory;

/// Owns the book collection, keyed by ISBN
#[derive(Debug, Clone, Default)]
pub struct CatalogManager {
    books: IndexedCollection<Book>,
    years: YearBounds,
}

impl CatalogManager {
    pub fn new(years: YearBounds) -> Self {
        Self {
            books: IndexedCollection::new(),
            years,
        }
    }

    pub fn years(&self) -> YearBounds {
        self.years
    }

    /// Add a validated book. ISBNs are unique within the catalog.
    pub fn add(&mut self, book: Book) -> AppResult<()> {
        book.validate(self.years)?;
        if self.books.contains_key(&book.isbn) {
            return Err(AppError::Conflict(format!(
                "A book with ISBN {} already exists",
                book.isbn
            )));
        }
        tracing::info!(isbn = %book.isbn, "Catalog add");
        self.books.insert(book);
        Ok(())
    }

    /// Bulk insert. Invalid and duplicate records are skipped and reported;
    /// the index is rebuilt once at the end.
    pub fn import_books(&mut self, books: impl IntoIterator<Item = Book>) -> ImportReport {
        let mut report = ImportReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for mut book in books {
            report.total += 1;
            if let Err(e) = book.validate(self.years) {
                report.skip(format!("{}: {}", book.isbn, e));
                continue;
            }
            if self.books.contains_key(&book.isbn) || !seen.insert(book.isbn.clone()) {
                report.skip(format!("{}: duplicate ISBN", book.isbn));
                continue;
            }
            book.availability = Availability::Available;
            self.books.insert_deferred(book);
            report.imported += 1;
        }

        self.books.rebuild_index();
        tracing::info!(
            "Catalog import finished: {}/{} records",
            report.imported,
            report.total
        );
        report
    }

    pub fn remove(&mut self, isbn: &str) -> AppResult<Book> {
        let position = self.position(isbn)?;
        let removed = self.books.remove_at(position)?;
        tracing::info!(isbn = %isbn, "Catalog remove");
        Ok(removed)
    }

    /// Edit one field. The value is validated before anything changes.
    pub fn update_field(&mut self, isbn: &str, field: BookField, value: &str) -> AppResult<()> {
        let position = self.position(isbn)?;

        match field {
            BookField::Isbn => Err(AppError::Validation(
                "ISBN cannot be edited; remove the book and add it again".to_string(),
            )),
            BookField::Title | BookField::Author | BookField::Publisher => {
                require_text(field, value)?;
                let value = value.to_string();
                self.books.update_at(position, |book| match field {
                    BookField::Title => book.title = value,
                    BookField::Author => book.author = value,
                    _ => book.publisher = value,
                })
            }
            BookField::Year => {
                let year: i32 = value
                    .trim()
                    .parse()
                    .map_err(|_| AppError::Validation(format!("Invalid year: {}", value)))?;
                self.years.check(year)?;
                self.books.update_at(position, |book| book.publish_year = year)
            }
        }
    }

    /// Replace a whole record. The ISBN must stay the same; availability is
    /// owned by circulation and is carried over.
    pub fn update(&mut self, isbn: &str, mut updated: Book) -> AppResult<()> {
        if updated.isbn != isbn {
            return Err(AppError::Validation(
                "Updated book must keep its ISBN".to_string(),
            ));
        }
        updated.validate(self.years)?;
        let position = self.position(isbn)?;
        self.books.update_at(position, |book| {
            updated.availability = book.availability;
            *book = updated;
        })
    }

    pub fn set_availability(&mut self, isbn: &str, availability: Availability) -> AppResult<()> {
        let position = self.position(isbn)?;
        self.books
            .update_at(position, |book| book.availability = availability)
    }

    pub fn find(&self, isbn: &str) -> Option<&Book> {
        self.books.find(isbn)
    }

    pub fn get(&self, isbn: &str) -> AppResult<&Book> {
        self.find(isbn)
            .ok_or_else(|| AppError::BookNotFound(isbn.to_string()))
    }

    pub fn books(&self) -> &[Book] {
        self.books.as_slice()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Search one field. Text fields match by substring, ISBN by exact key,
    /// year by exact value. An empty keyword returns the whole catalog.
    pub fn search(&self, field: BookField, keyword: &str) -> AppResult<Vec<Book>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(self.books.as_slice().to_vec());
        }

        let results = match field {
            BookField::Isbn => self.find(keyword).cloned().into_iter().collect(),
            BookField::Title => self.scan(|b| b.title.contains(keyword)),
            BookField::Author => self.scan(|b| b.author.contains(keyword)),
            BookField::Publisher => self.scan(|b| b.publisher.contains(keyword)),
            BookField::Year => {
                let year: i32 = keyword
                    .parse()
                    .map_err(|_| AppError::Validation(format!("Invalid year: {}", keyword)))?;
                self.find_by_year(year)
            }
        };
        Ok(results)
    }

    /// Exact year match via a year-sorted projection
    pub fn find_by_year(&self, year: i32) -> Vec<Book> {
        let sorted = self.by_year();
        match binary_search_sorted(&sorted, &year, |b| &b.publish_year, |a, b| a < b) {
            Some(first) => sorted[first..]
                .iter()
                .take_while(|b| b.publish_year == year)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Books published in `start..=end`.
    ///
    /// Starts from the first exact match of `start` when there is one,
    /// otherwise scans the sorted projection from its beginning.
    pub fn find_by_year_range(&self, start: i32, end: i32) -> Vec<Book> {
        if start > end {
            return Vec::new();
        }
        let sorted = self.by_year();
        let first = binary_search_sorted(&sorted, &start, |b| &b.publish_year, |a, b| a < b)
            .unwrap_or(0);
        sorted[first..]
            .iter()
            .take_while(|b| b.publish_year <= end)
            .filter(|b| b.publish_year >= start)
            .cloned()
            .collect()
    }

    /// Whole catalog sorted by `field`
    pub fn sorted(&self, field: BookField, order: SortOrder) -> Vec<Book> {
        self.books
            .sorted_view(|a, b| order.apply(compare_books(a, b, field)) == Ordering::Less)
    }

    /// Sort an arbitrary result set
    pub fn sort_results(&self, mut results: Vec<Book>, field: BookField, order: SortOrder) -> Vec<Book> {
        sort_books(&mut results, field, order);
        results
    }

    fn by_year(&self) -> Vec<Book> {
        self.books.sorted_view(|a, b| a.publish_year < b.publish_year)
    }

    fn scan(&self, matches: impl Fn(&Book) -> bool) -> Vec<Book> {
        self.books.iter().filter(|b| matches(b)).cloned().collect()
    }

    fn position(&self, isbn: &str) -> AppResult<usize> {
        self.books
            .hash_lookup(isbn)
            .ok_or_else(|| AppError::BookNotFound(isbn.to_string()))
    }
}

impl BookDirectory for CatalogManager {
    fn availability(&self, isbn: &str) -> Option<Availability> {
        self.find(isbn).map(|book| book.availability)
    }

    fn set_availability(&mut self, isbn: &str, availability: Availability) -> AppResult<()> {
        CatalogManager::set_availability(self, isbn, availability)
    }
}

fn compare_books(a: &Book, b: &Book, field: BookField) -> Ordering {
    match field {
        BookField::Isbn => a.isbn.cmp(&b.isbn),
        BookField::Title => a.title.cmp(&b.title),
        BookField::Author => a.author.cmp(&b.author),
        BookField::Publisher => a.publisher.cmp(&b.publisher),
        BookField::Year => a.publish_year.cmp(&b.publish_year),
    }
}

pub fn sort_books(books: &mut [Book], field: BookField, order: SortOrder) {
    sort_by(books, |a, b| order.apply(compare_books(a, b, field)));
}
