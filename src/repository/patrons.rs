//! Patron file: one compact JSON object per line

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    error::AppResult,
    models::{Patron, Role},
};

use super::{read_optional, write_file};

#[derive(Debug, Serialize, Deserialize)]
struct StoredPatron {
    username: String,
    password: String,
    role: Role,
}

/// Load patrons, skipping blank and malformed lines
pub fn load(path: &Path) -> AppResult<Vec<Patron>> {
    let Some(content) = read_optional(path)? else {
        return Ok(Vec::new());
    };
    let mut patrons = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StoredPatron>(line) {
            Ok(stored) => patrons.push(Patron::new(stored.username, stored.password, stored.role)),
            Err(e) => tracing::warn!(line = number + 1, "Skipping malformed patron line: {}", e),
        }
    }
    Ok(patrons)
}

pub fn save(path: &Path, patrons: &[Patron]) -> AppResult<()> {
    let mut content = String::new();
    for patron in patrons {
        let stored = StoredPatron {
            username: patron.username.clone(),
            password: patron.password.clone(),
            role: patron.role,
        };
        content.push_str(&serde_json::to_string(&stored)?);
        content.push('\n');
    }
    write_file(path, &content)
}
