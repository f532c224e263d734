//! Legacy flat-text catalog: one `{'key': 'value', ..., 'year': 2001}` line
//! per book

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::{borrow::Cow, collections::HashMap};

use crate::models::Book;

/// `'key': 'quoted value'` or `'key': 1234`; quotes and backslashes inside
/// a value are escaped with `\`
static PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'([^']+)'\s*:\s*(?:'((?:\\.|[^'\\])*)'|(-?\d+))").expect("legacy pair pattern is valid")
});

/// Key spelling used when exporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyKeys {
    /// `书名`, `作者`, `出版社`, `ISBN`, `出版年限`, readable by the old desk
    #[default]
    Chinese,
    English,
}

/// Parsed legacy input: candidate books plus a reason for each line that
/// could not be read at all
#[derive(Debug, Clone, Default)]
pub struct LegacyBatch {
    pub books: Vec<Book>,
    pub rejected: Vec<String>,
}

fn canonical_key(key: &str) -> Option<&'static str> {
    match key.trim() {
        "书名" => Some("title"),
        "作者" => Some("author"),
        "出版社" => Some("publisher"),
        "出版年限" => Some("year"),
        other => match other.to_ascii_lowercase().as_str() {
            "isbn" => Some("isbn"),
            "title" => Some("title"),
            "author" => Some("author"),
            "publisher" => Some("publisher"),
            "year" | "publish_year" | "publishyear" => Some("year"),
            _ => None,
        },
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn unescape(value: &str) -> Cow<'_, str> {
    if !value.contains('\\') {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn parse_line(line: &str) -> Result<Book, String> {
    if !(line.starts_with('{') && line.ends_with('}')) {
        return Err("not a {...} record".to_string());
    }

    let mut fields: HashMap<&'static str, Cow<'_, str>> = HashMap::new();
    let mut end = 1;
    for captures in PAIR.captures_iter(line) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        // Only separators may sit between pairs
        if !line[end..whole.start()].trim_matches(|c: char| c == ',' || c.is_whitespace()).is_empty() {
            return Err(format!("unexpected text at column {}", end + 1));
        }
        end = whole.end();

        let Some(key) = captures.get(1).and_then(|m| canonical_key(m.as_str())) else {
            continue;
        };
        if let Some(value) = captures.get(2) {
            fields.entry(key).or_insert_with(|| unescape(value.as_str()));
        } else if let Some(value) = captures.get(3) {
            fields.entry(key).or_insert(Cow::Borrowed(value.as_str()));
        }
    }
    let tail = end.min(line.len() - 1);
    if !line[tail..line.len() - 1].trim_matches(|c: char| c == ',' || c.is_whitespace()).is_empty() {
        return Err(format!("unexpected text at column {}", tail + 1));
    }

    let field = |name: &str| -> Result<String, String> {
        fields
            .get(name)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| format!("missing {}", name))
    };
    let year_text = field("year")?;
    let year: i32 = year_text
        .parse()
        .map_err(|_| format!("invalid year {:?}", year_text))?;

    Ok(Book::new(
        field("isbn")?,
        field("title")?,
        field("author")?,
        field("publisher")?,
        year,
    ))
}

/// Parse every non-blank line. Field validation is left to the catalog.
pub fn parse(text: &str) -> LegacyBatch {
    let mut batch = LegacyBatch::default();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(book) => batch.books.push(book),
            Err(reason) => batch.rejected.push(format!("line {}: {}", number + 1, reason)),
        }
    }
    batch
}

/// Render books in the flat-text layout, one line each
pub fn export(books: &[Book], keys: LegacyKeys) -> String {
    let mut out = String::new();
    for book in books {
        let line = match keys {
            LegacyKeys::Chinese => format!(
                "{{'书名': '{}', '作者': '{}', '出版社': '{}', 'ISBN': '{}', '出版年限': {}}}\n",
                escape(&book.title),
                escape(&book.author),
                escape(&book.publisher),
                escape(&book.isbn),
                book.publish_year
            ),
            LegacyKeys::English => format!(
                "{{'isbn': '{}', 'title': '{}', 'author': '{}', 'publisher': '{}', 'year': {}}}\n",
                escape(&book.isbn),
                escape(&book.title),
                escape(&book.author),
                escape(&book.publisher),
                book.publish_year
            ),
        };
        out.push_str(&line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_keys() {
        let batch = parse(
            "{'书名': '三体', '作者': '刘慈欣', '出版社': '重庆出版社', 'ISBN': '978-7-5366-9293-0', '出版年限': 2008}\n",
        );
        assert!(batch.rejected.is_empty());
        let book = &batch.books[0];
        assert_eq!(book.isbn, "978-7-5366-9293-0");
        assert_eq!(book.title, "三体");
        assert_eq!(book.publish_year, 2008);
    }

    #[test]
    fn test_parse_english_keys_and_quoted_year() {
        let batch = parse("{'isbn': '1', 'title': 'T', 'author': 'A', 'publisher': 'P', 'year': '1999'}");
        assert_eq!(batch.books[0].publish_year, 1999);
    }

    #[test]
    fn test_malformed_lines_rejected_with_line_numbers() {
        let batch = parse(
            "garbage\n\n{'isbn': '1', 'title': 'T', 'author': 'A', 'publisher': 'P'}\n\
             {'isbn': '2', 'title': 'T', 'author': 'A', 'publisher': 'P', 'year': 'soon'}\n",
        );
        assert!(batch.books.is_empty());
        assert_eq!(batch.rejected.len(), 3);
        assert!(batch.rejected[0].starts_with("line 1"));
        assert_eq!(batch.rejected[1], "line 3: missing year");
        assert!(batch.rejected[2].starts_with("line 4"));
    }

    #[test]
    fn test_export_reparses() {
        let books = vec![Book::new("978-1", "Dune", "Herbert", "Chilton", 1965)];
        let text = export(&books, LegacyKeys::English);
        assert_eq!(
            text,
            "{'isbn': '978-1', 'title': 'Dune', 'author': 'Herbert', 'publisher': 'Chilton', 'year': 1965}\n"
        );
        assert_eq!(parse(&text).books, books);
    }

    #[test]
    fn test_export_uses_old_desk_keys_by_default() {
        let books = vec![Book::new("978-7", "三体", "刘慈欣", "重庆出版社", 2008)];
        let text = export(&books, LegacyKeys::default());
        assert_eq!(
            text,
            "{'书名': '三体', '作者': '刘慈欣', '出版社': '重庆出版社', 'ISBN': '978-7', '出版年限': 2008}\n"
        );
        assert_eq!(parse(&text).books, books);
    }

    #[test]
    fn test_apostrophes_survive_export_and_import() {
        let books = vec![
            Book::new("978-9", "Ender's Game", "Orson Scott Card", "Tor", 1985),
            Book::new("978-8", "C:\\Users", "O'Brien", "Back\\slash'", 2001),
        ];
        for keys in [LegacyKeys::Chinese, LegacyKeys::English] {
            let batch = parse(&export(&books, keys));
            assert!(batch.rejected.is_empty(), "{:?}", batch.rejected);
            assert_eq!(batch.books, books);
        }
    }

    #[test]
    fn test_unescaped_apostrophe_rejects_the_line() {
        let batch = parse(
            "{'isbn': '978-9', 'title': 'Ender's Game', 'author': 'Card', 'publisher': 'Tor', 'year': 1985}",
        );
        assert!(batch.books.is_empty());
        assert_eq!(batch.rejected.len(), 1);
        assert!(batch.rejected[0].contains("unexpected text"));
    }
}
