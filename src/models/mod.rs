//! Data models for the circulation desk

pub mod book;
pub mod import_report;
pub mod loan;
pub mod patron;

// Re-export commonly used types
pub use book::{Availability, Book, BookField, YearBounds};
pub use import_report::ImportReport;
pub use loan::{LoanField, LoanRecord, LoanStatus, LoanView};
pub use patron::{Patron, Role};
