//! Offset/limit pagination over list endpoints.

use std::collections::HashSet;

use reqwest::Method;
use serde_json::Value;

use crate::Result;
use crate::normalize::{extract_data_items, total_results};
use crate::transport::Requester;
use crate::types::Identified;

/// Walks `offset`/`limit` pages of one list endpoint.
///
/// Records are de-duplicated by identity across pages; order is whatever the
/// upstream returned, so callers sort. A full page that adds no new record
/// ends the walk, which keeps an upstream that ignores `offset` from being
/// paged forever.
pub struct PaginatedFetcher<'req, R: ?Sized> {
    requester: &'req R,
    page_size: usize,
}

impl<'req, R: Requester + ?Sized> PaginatedFetcher<'req, R> {
    #[must_use]
    pub fn new(requester: &'req R, page_size: usize) -> Self {
        Self {
            requester,
            page_size: page_size.max(1),
        }
    }

    /// Fetches every page of `path`, parsing rows found by the standard
    /// envelope extraction.
    pub async fn fetch_all<T, P>(&self, path: &str, parse: P) -> Result<Vec<T>>
    where
        T: Identified,
        P: Fn(&Value) -> Option<T>,
    {
        self.fetch_all_with(path, extract_data_items, parse).await
    }

    /// Like [`Self::fetch_all`] with a custom row extractor.
    pub async fn fetch_all_with<T, E, P>(&self, path: &str, extract: E, parse: P) -> Result<Vec<T>>
    where
        T: Identified,
        E: for<'payload> Fn(&'payload Value) -> Vec<&'payload Value>,
        P: Fn(&Value) -> Option<T>,
    {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut offset = 0_usize;

        loop {
            let target = format!(
                "{path}{separator}offset={offset}&limit={limit}",
                limit = self.page_size
            );
            let payload = self.requester.request_json(Method::GET, &target, None).await?;
            let rows = extract(&payload);
            let fetched = rows.len();
            let known = records.len();

            for record in rows.into_iter().filter_map(&parse) {
                if seen.insert(record.identity()) {
                    records.push(record);
                }
            }

            let total = total_results(&payload);
            #[cfg(feature = "tracing")]
            tracing::trace!(path, offset, fetched, total, "fetched page");

            if fetched < self.page_size || (total > 0 && offset + self.page_size >= total) {
                break;
            }
            if records.len() == known {
                #[cfg(feature = "tracing")]
                tracing::debug!(path, offset, "full page added no new records, stopping");
                break;
            }
            offset += self.page_size;
        }

        Ok(records)
    }
}
