//! Query history types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::HistoryId;

/// One past query stored by the agent service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry id
    pub id: HistoryId,
    /// Question asked
    #[serde(default)]
    pub question: String,
    /// SQL the agent produced
    #[serde(default, alias = "final_sql", alias = "finalSql")]
    pub sql: Option<String>,
    /// Final status of the run (e.g. "completed")
    #[serde(default)]
    pub status: Option<String>,
    /// Number of rows returned, if executed
    #[serde(default, alias = "rowCount")]
    pub row_count: Option<u64>,
    /// When the query ran
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    /// Case-insensitive match of a search needle against question or SQL
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.question.to_lowercase().contains(needle)
            || self
                .sql
                .as_deref()
                .is_some_and(|sql| sql.to_lowercase().contains(needle))
    }
}

/// One page of history from the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Entries on this page
    #[serde(default, alias = "history", alias = "entries")]
    pub items: Vec<HistoryEntry>,
    /// Total entries across all pages
    #[serde(default)]
    pub total: usize,
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: usize,
    /// Page size used by the server
    #[serde(default, alias = "pageSize")]
    pub page_size: usize,
}

const fn default_page() -> usize {
    1
}

impl HistoryPage {
    /// Whether pages after this one exist
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.page_size > 0 && self.page.saturating_mul(self.page_size) < self.total
    }
}
