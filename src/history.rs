//! Complete message history of one conversation over a time window.
//!
//! `conversations.history` only answers "messages older than T", newest
//! first, a page at a time. The fetcher walks a cursor backwards from the
//! end of the window: after each page that reports `has_more`, the cursor
//! moves to the oldest timestamp of that page. Requests exclude the cursor
//! itself (`inclusive=false`), so the boundary message is never delivered
//! twice.

use crate::client::{Params, RemoteHistoryClient, call};
use crate::model::{HistoryPage, Message, TimeWindow, Timestamp};
use crate::{AppError, Result};

pub const MAX_ITERATIONS: usize = 100;
pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub page_size: usize,
    pub max_iterations: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            max_iterations: MAX_ITERATIONS,
        }
    }
}

pub struct HistoryFetcher<'c, C> {
    client: &'c C,
    limits: FetchLimits,
}

impl<'c, C: RemoteHistoryClient> HistoryFetcher<'c, C> {
    pub fn new(client: &'c C) -> Self {
        Self::with_limits(client, FetchLimits::default())
    }

    pub fn with_limits(client: &'c C, limits: FetchLimits) -> Self {
        Self { client, limits }
    }

    /// All messages of `conversation_id` inside `window`, oldest first.
    ///
    /// Fails without a partial result on the first failed call, and once
    /// more than `max_iterations` pages have been requested.
    pub async fn fetch(&self, conversation_id: &str, window: &TimeWindow) -> Result<Vec<Message>> {
        let mut cursor = window.till();
        let mut collected: Vec<Message> = Vec::new();
        let mut iterations = 0;

        loop {
            if iterations > self.limits.max_iterations {
                return Err(AppError::PaginationLimitExceeded {
                    conversation: conversation_id.to_string(),
                    calls: iterations,
                });
            }

            let params = self.page_params(conversation_id, window.since(), cursor);
            let page: HistoryPage = call(self.client, "conversations.history", &params).await?;
            iterations += 1;

            tracing::debug!(
                conversation = conversation_id,
                latest = %cursor,
                count = page.messages.len(),
                has_more = page.has_more,
                "fetched history page"
            );

            // pages are newest first, so the last message is the oldest one
            let oldest_in_page = page.messages.last().map(|m| m.ts);
            collected.extend(page.messages);

            if !page.has_more {
                break;
            }
            if let Some(oldest) = oldest_in_page {
                cursor = oldest;
            }
        }

        collected.reverse();
        Ok(collected)
    }

    fn page_params(&self, conversation_id: &str, oldest: Timestamp, latest: Timestamp) -> Params {
        [
            ("channel", conversation_id.to_string()),
            ("count", self.limits.page_size.to_string()),
            ("oldest", oldest.to_string()),
            ("latest", latest.to_string()),
            ("inclusive", "false".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}
