//! Query history list
//!
//! A thin client-side view over the server's paginated history: pages are
//! appended as they are fetched, searched locally, and kept in sync with
//! delete and clear calls.

use futures::Stream;

use crate::client::AgentClient;
use crate::error::Result;
use crate::transport::Transport;
use crate::types::history::HistoryEntry;
use crate::types::identifiers::HistoryId;

/// Default page size for history fetches
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Filter entries by a case-insensitive search on question or SQL text
///
/// An empty or whitespace-only query returns every entry.
#[must_use]
pub fn filter_entries<'a>(entries: &'a [HistoryEntry], query: &str) -> Vec<&'a HistoryEntry> {
    let needle = query.trim().to_lowercase();
    entries.iter().filter(|e| e.matches(&needle)).collect()
}

/// Stream every history entry, fetching pages lazily
///
/// Stops after the last page the server reports, or at the first short page.
pub fn stream_all<T: Transport>(
    client: &AgentClient<T>,
    page_size: usize,
) -> impl Stream<Item = Result<HistoryEntry>> + '_ {
    let page_size = page_size.max(1);
    async_stream::try_stream! {
        let mut page = 1;
        loop {
            let batch = client.list_history(page, page_size).await?;
            let more = batch.has_more() && batch.items.len() == batch.page_size;
            for entry in batch.items {
                yield entry;
            }
            if !more {
                break;
            }
            page += 1;
        }
    }
}

/// Locally cached history, loaded page by page
#[derive(Debug, Clone)]
pub struct HistoryList {
    entries: Vec<HistoryEntry>,
    page_size: usize,
    next_page: usize,
    total: Option<usize>,
}

impl HistoryList {
    /// Create an empty list fetching `page_size` entries per page
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            page_size: page_size.max(1),
            next_page: 1,
            total: None,
        }
    }

    /// Entries loaded so far, newest first as served
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Total reported by the server, once a page has been loaded
    #[must_use]
    pub const fn total(&self) -> Option<usize> {
        self.total
    }

    /// Whether the server has entries not loaded yet
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.total.is_none_or(|total| self.entries.len() < total)
    }

    /// Fetch and append the next page
    ///
    /// Returns the number of entries added.
    ///
    /// # Errors
    /// Returns the client error; the list is left unchanged
    pub async fn load_next<T: Transport>(&mut self, client: &AgentClient<T>) -> Result<usize> {
        if !self.has_more() {
            return Ok(0);
        }
        let page = client.list_history(self.next_page, self.page_size).await?;
        let added = page.items.len();
        log::debug!(
            "Loaded history page {} ({added} entries, total {})",
            self.next_page,
            page.total
        );

        self.entries.extend(page.items);
        self.total = Some(page.total.max(self.entries.len()));
        self.next_page += 1;
        if added == 0 {
            // Server ran out before its reported total
            self.total = Some(self.entries.len());
        }
        Ok(added)
    }

    /// Drop cached entries and fetch the first page again
    ///
    /// # Errors
    /// Returns the client error
    pub async fn refresh<T: Transport>(&mut self, client: &AgentClient<T>) -> Result<usize> {
        *self = Self::new(self.page_size);
        self.load_next(client).await
    }

    /// Search loaded entries
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&HistoryEntry> {
        filter_entries(&self.entries, query)
    }

    /// Delete one entry on the server and locally
    ///
    /// # Errors
    /// Returns the client error; the entry stays cached
    pub async fn delete<T: Transport>(
        &mut self,
        client: &AgentClient<T>,
        id: &HistoryId,
    ) -> Result<()> {
        client.delete_history(id).await?;
        let before = self.entries.len();
        self.entries.retain(|e| &e.id != id);
        if before != self.entries.len()
            && let Some(total) = self.total.as_mut()
        {
            *total = total.saturating_sub(1);
        }
        Ok(())
    }

    /// Delete all history on the server and locally
    ///
    /// # Errors
    /// Returns the client error; the cache is left unchanged
    pub async fn clear<T: Transport>(&mut self, client: &AgentClient<T>) -> Result<()> {
        client.clear_history().await?;
        self.entries.clear();
        self.total = Some(0);
        self.next_page = 1;
        Ok(())
    }
}

impl Default for HistoryList {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
