//! Loan record model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    collections::Keyed,
    error::{AppError, AppResult},
};

/// Derived loan status; never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "overdue" => Ok(LoanStatus::Overdue),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(AppError::Validation(format!("Unknown loan status: {}", s))),
        }
    }
}

/// One borrow of one book by one patron. History is never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: u64,
    pub isbn: String,
    pub username: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub returned: bool,
}

impl LoanRecord {
    pub fn new(
        id: u64,
        isbn: impl Into<String>,
        username: impl Into<String>,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Self> {
        if due_date < borrow_date {
            return Err(AppError::Validation(
                "Due date cannot precede the borrow date".to_string(),
            ));
        }
        Ok(Self {
            id,
            isbn: isbn.into(),
            username: username.into(),
            borrow_date,
            due_date,
            return_date: None,
            returned: false,
        })
    }

    pub fn is_active(&self) -> bool {
        !self.returned
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.returned && self.due_date < now
    }

    pub fn status(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.returned {
            LoanStatus::Returned
        } else if self.due_date < now {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }

    pub fn set_due_date(&mut self, due_date: DateTime<Utc>) -> AppResult<()> {
        if due_date < self.borrow_date {
            return Err(AppError::Validation(
                "Due date cannot precede the borrow date".to_string(),
            ));
        }
        self.due_date = due_date;
        Ok(())
    }

    pub fn mark_returned(&mut self, at: DateTime<Utc>) -> AppResult<()> {
        if self.returned {
            return Err(AppError::AlreadyReturned(self.id));
        }
        if at < self.borrow_date {
            return Err(AppError::Validation(
                "Return date cannot precede the borrow date".to_string(),
            ));
        }
        self.return_date = Some(at);
        self.returned = true;
        Ok(())
    }

    /// Display identifier, e.g. `REC000042`
    pub fn record_id(&self) -> String {
        format_record_id(self.id)
    }

    pub fn view(&self, now: DateTime<Utc>) -> LoanView {
        LoanView {
            id: self.id,
            record_id: self.record_id(),
            isbn: self.isbn.clone(),
            username: self.username.clone(),
            borrow_date: self.borrow_date,
            due_date: self.due_date,
            return_date: self.return_date,
            status: self.status(now),
        }
    }
}

impl Keyed for LoanRecord {
    type Key = u64;

    fn key(&self) -> &u64 {
        &self.id
    }

    fn hash_key(key: &u64) -> u64 {
        *key
    }
}

/// Loan with its derived status, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanView {
    pub id: u64,
    pub record_id: String,
    pub isbn: String,
    pub username: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

/// Sortable loan columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanField {
    Id,
    Isbn,
    Username,
    BorrowDate,
    DueDate,
    ReturnDate,
    Status,
}

impl std::str::FromStr for LoanField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" | "record_id" => Ok(LoanField::Id),
            "isbn" => Ok(LoanField::Isbn),
            "username" => Ok(LoanField::Username),
            "borrow_date" => Ok(LoanField::BorrowDate),
            "due_date" => Ok(LoanField::DueDate),
            "return_date" => Ok(LoanField::ReturnDate),
            "status" => Ok(LoanField::Status),
            _ => Err(AppError::Validation(format!("Unknown loan field: {}", s))),
        }
    }
}

pub fn format_record_id(id: u64) -> String {
    format!("REC{:06}", id)
}

/// Accepts `REC000042`, `rec42` or `42`
pub fn parse_record_id(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    let digits = trimmed
        .get(..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("rec"))
        .map(|_| &trimmed[3..])
        .unwrap_or(trimmed);
    digits.parse().ok()
}

/// Calendar-day key used by date lookups (`YYYY-MM-DD`)
pub fn date_key(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}
