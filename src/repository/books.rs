//! Catalog file: `{ "books": [...], "count": n }`

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{error::AppResult, models::Book};

use super::{read_optional, write_file};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBook {
    isbn: String,
    title: String,
    author: String,
    publisher: String,
    publish_year: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct BookFile {
    books: Vec<StoredBook>,
    #[serde(default)]
    count: usize,
}

impl From<&Book> for StoredBook {
    fn from(book: &Book) -> Self {
        Self {
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            publisher: book.publisher.clone(),
            publish_year: book.publish_year,
        }
    }
}

impl From<StoredBook> for Book {
    fn from(stored: StoredBook) -> Self {
        Book::new(
            stored.isbn,
            stored.title,
            stored.author,
            stored.publisher,
            stored.publish_year,
        )
    }
}

/// Load the catalog; a missing file is an empty catalog
pub fn load(path: &Path) -> AppResult<Vec<Book>> {
    let Some(content) = read_optional(path)? else {
        return Ok(Vec::new());
    };
    let file: BookFile = serde_json::from_str(&content)?;
    if file.count != file.books.len() {
        tracing::warn!(
            "Book file declares {} records but holds {}",
            file.count,
            file.books.len()
        );
    }
    Ok(file.books.into_iter().map(Book::from).collect())
}

pub fn save(path: &Path, books: &[Book]) -> AppResult<()> {
    let file = BookFile {
        books: books.iter().map(StoredBook::from).collect(),
        count: books.len(),
    };
    write_file(path, &serde_json::to_string_pretty(&file)?)
}
