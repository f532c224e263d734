//! Loan history file: `{ "records": [...], "count": n }` with epoch-second
//! timestamps and `returnDate = 0` for open loans

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{error::AppResult, models::LoanRecord};

use super::{read_optional, write_file};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLoan {
    id: u64,
    book_isbn: String,
    username: String,
    borrow_date: i64,
    due_date: i64,
    #[serde(default)]
    return_date: i64,
    #[serde(default)]
    is_returned: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct LoanFile {
    records: Vec<StoredLoan>,
    #[serde(default)]
    count: usize,
}

impl From<&LoanRecord> for StoredLoan {
    fn from(record: &LoanRecord) -> Self {
        Self {
            id: record.id,
            book_isbn: record.isbn.clone(),
            username: record.username.clone(),
            borrow_date: record.borrow_date.timestamp(),
            due_date: record.due_date.timestamp(),
            return_date: record.return_date.map_or(0, |at| at.timestamp()),
            is_returned: record.returned,
        }
    }
}

impl StoredLoan {
    fn into_record(self) -> Option<LoanRecord> {
        let borrow_date = from_epoch(self.borrow_date)?;
        let due_date = from_epoch(self.due_date)?;
        let mut record = LoanRecord::new(self.id, self.book_isbn, self.username, borrow_date, due_date).ok()?;
        if self.is_returned {
            // Older files may lack the stamp; fall back to the due date
            let at = match self.return_date {
                0 => due_date,
                secs => from_epoch(secs)?,
            };
            record.return_date = Some(at);
            record.returned = true;
        }
        Some(record)
    }
}

fn from_epoch(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Load the loan history, skipping records with impossible dates
pub fn load(path: &Path) -> AppResult<Vec<LoanRecord>> {
    let Some(content) = read_optional(path)? else {
        return Ok(Vec::new());
    };
    let file: LoanFile = serde_json::from_str(&content)?;
    let mut records = Vec::with_capacity(file.records.len());
    for stored in file.records {
        let id = stored.id;
        match stored.into_record() {
            Some(record) => records.push(record),
            None => tracing::warn!(id, "Skipping loan record with invalid dates"),
        }
    }
    Ok(records)
}

pub fn save(path: &Path, records: &[LoanRecord]) -> AppResult<()> {
    let file = LoanFile {
        records: records.iter().map(StoredLoan::from).collect(),
        count: records.len(),
    };
    write_file(path, &serde_json::to_string_pretty(&file)?)
}
