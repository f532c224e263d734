//! Bulk import report

use serde::{Deserialize, Serialize};

/// Outcome of a bulk catalog import: how many records arrived and how many
/// made it into the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub total: usize,
    pub imported: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ImportReport {
    pub fn skipped(&self) -> usize {
        self.total - self.imported
    }

    pub fn is_success(&self) -> bool {
        self.imported > 0
    }

    pub(crate) fn skip(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Import skipped a record: {}", reason);
        self.warnings.push(reason);
    }

    /// Count an input line that never parsed into a record
    pub(crate) fn malformed(&mut self, reason: impl Into<String>) {
        self.total += 1;
        self.skip(reason);
    }
}
