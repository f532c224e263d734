//! Book model and related types

use serde::{Deserialize, Serialize};

use crate::{
    collections::{djb2, Keyed},
    config::LibraryConfig,
    error::{AppError, AppResult},
};

/// Whether the single copy of a book is on the shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Available,
    OnLoan,
}

/// Inclusive range of accepted publish years
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearBounds {
    pub min: i32,
    pub max: i32,
}

impl YearBounds {
    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }

    pub fn check(&self, year: i32) -> AppResult<i32> {
        if self.contains(year) {
            Ok(year)
        } else {
            Err(AppError::Validation(format!(
                "Publish year {} outside {}..={}",
                year, self.min, self.max
            )))
        }
    }
}

impl Default for YearBounds {
    fn default() -> Self {
        LibraryConfig::default().into()
    }
}

impl From<LibraryConfig> for YearBounds {
    fn from(config: LibraryConfig) -> Self {
        Self {
            min: config.min_publish_year,
            max: config.max_publish_year,
        }
    }
}

/// Catalog entry keyed by ISBN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub publish_year: i32,
    #[serde(default)]
    pub availability: Availability,
}

impl Book {
    pub fn new(
        isbn: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        publisher: impl Into<String>,
        publish_year: i32,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            title: title.into(),
            author: author.into(),
            publisher: publisher.into(),
            publish_year,
            availability: Availability::Available,
        }
    }

    /// Check every field against catalog rules
    pub fn validate(&self, years: YearBounds) -> AppResult<()> {
        require_text(BookField::Isbn, &self.isbn)?;
        require_text(BookField::Title, &self.title)?;
        require_text(BookField::Author, &self.author)?;
        require_text(BookField::Publisher, &self.publisher)?;
        years.check(self.publish_year)?;
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    /// Text value of a field, as shown in listings
    pub fn field_text(&self, field: BookField) -> String {
        match field {
            BookField::Isbn => self.isbn.clone(),
            BookField::Title => self.title.clone(),
            BookField::Author => self.author.clone(),
            BookField::Publisher => self.publisher.clone(),
            BookField::Year => self.publish_year.to_string(),
        }
    }
}

impl Keyed for Book {
    type Key = str;

    fn key(&self) -> &str {
        &self.isbn
    }

    fn hash_key(key: &str) -> u64 {
        djb2(key)
    }
}

/// Addressable book fields for search, sort and update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookField {
    Isbn,
    Title,
    Author,
    Publisher,
    Year,
}

impl BookField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookField::Isbn => "isbn",
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::Publisher => "publisher",
            BookField::Year => "year",
        }
    }
}

impl std::fmt::Display for BookField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "isbn" => Ok(BookField::Isbn),
            "title" => Ok(BookField::Title),
            "author" => Ok(BookField::Author),
            "publisher" => Ok(BookField::Publisher),
            "year" | "publish_year" | "publishyear" => Ok(BookField::Year),
            _ => Err(AppError::Validation(format!("Unknown book field: {}", s))),
        }
    }
}

pub(crate) fn require_text(field: BookField, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}
