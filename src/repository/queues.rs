//! Wait queue file: `{ "<isbn>": ["user", ...] }`

use indexmap::IndexMap;
use std::path::Path;

use crate::{collections::WaitQueue, error::AppResult};

use super::{read_optional, write_file};

pub fn load(path: &Path) -> AppResult<IndexMap<String, WaitQueue>> {
    match read_optional(path)? {
        Some(content) => Ok(serde_json::from_str(&content)?),
        None => Ok(IndexMap::new()),
    }
}

pub fn save(path: &Path, queues: &IndexMap<String, WaitQueue>) -> AppResult<()> {
    write_file(path, &serde_json::to_string_pretty(queues)?)
}
