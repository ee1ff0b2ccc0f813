//! Continuation-token driven paging over unbounded backend collections.
//!
//! The engine is generic over the item type and parameterized by a
//! page-fetch capability, so message batches and queue listings share one
//! implementation. Iteration is forward-only and driven purely by opaque
//! continuation tokens; no other engine state influences the results, which
//! is what makes resuming from an externally stored token equivalent to
//! uninterrupted iteration.

use crate::error::QueueError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Opaque cursor returned by a paged listing call.
///
/// Only equality and presence are observable; the internal structure belongs
/// to the backend and is never parsed or compared against unrelated strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wrap a token value returned by the backend
    pub fn new(token: String) -> Self {
        Self(token)
    }

    /// Get token as string for transport calls
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An ordered, finite batch of items plus the cursor for the next page.
///
/// Pages are immutable once produced; `continuation_token = None` signals
/// that no further pages exist. A page may legitimately be empty while still
/// carrying a token.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub continuation_token: Option<ContinuationToken>,
}

impl<T> Page<T> {
    /// Create a page with a continuation token
    pub fn new(items: Vec<T>, continuation_token: Option<ContinuationToken>) -> Self {
        Self {
            items,
            continuation_token,
        }
    }

    /// Create a terminal page with no further pages behind it
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            continuation_token: None,
        }
    }
}

/// Capability that fetches one page given the current cursor.
///
/// `page_size` is an advisory cap, not a guarantee; the backend may return
/// fewer items per page and short pages must not be padded or batched.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch(
        &self,
        token: Option<&ContinuationToken>,
        page_size: Option<u32>,
    ) -> Result<Page<T>, QueueError>;
}

enum Cursor {
    Start,
    At(ContinuationToken),
    Exhausted,
}

/// Lazy, resumable sequence over a paged backend collection.
///
/// Advancement takes `&mut self`; concurrent traversals must each hold their
/// own instance (and cursor). Iteration is not restartable mid-stream —
/// restarting means constructing a fresh instance from token `None`.
pub struct Paged<T> {
    fetcher: Box<dyn PageFetcher<T>>,
    page_size: Option<u32>,
    cursor: Cursor,
    buffer: VecDeque<T>,
}

impl<T> Paged<T> {
    /// Start iterating from the beginning of the collection
    pub fn new(fetcher: impl PageFetcher<T> + 'static, page_size: Option<u32>) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            page_size,
            cursor: Cursor::Start,
            buffer: VecDeque::new(),
        }
    }

    /// Resume iteration from an externally stored continuation token.
    ///
    /// Yields exactly the remaining sequence uninterrupted iteration would
    /// have produced from that point.
    pub fn resume_from(
        fetcher: impl PageFetcher<T> + 'static,
        page_size: Option<u32>,
        token: ContinuationToken,
    ) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            page_size,
            cursor: Cursor::At(token),
            buffer: VecDeque::new(),
        }
    }

    /// Fetch the next page; one network-equivalent call per pull.
    ///
    /// Empty pages carrying a token are returned as-is — at the page level
    /// the caller sees hollow pages, and only a `None` token ends iteration.
    pub async fn next_page(&mut self) -> Result<Option<Page<T>>, QueueError> {
        let token = match &self.cursor {
            Cursor::Start => None,
            Cursor::At(token) => Some(token.clone()),
            Cursor::Exhausted => return Ok(None),
        };

        let page = self.fetcher.fetch(token.as_ref(), self.page_size).await?;

        self.cursor = match &page.continuation_token {
            Some(next) => Cursor::At(next.clone()),
            None => Cursor::Exhausted,
        };

        Ok(Some(page))
    }

    /// Pull the next item, flattening page boundaries.
    ///
    /// Hollow intermediate pages are skipped by continuing with their token;
    /// iteration only ends once a terminal page has been drained.
    pub async fn next_item(&mut self) -> Result<Option<T>, QueueError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }

            match self.next_page().await? {
                Some(page) => self.buffer.extend(page.items),
                None => return Ok(None),
            }
        }
    }

    /// The cursor to resume from after the pages fetched so far.
    ///
    /// `None` either before the first fetch or once the sequence is
    /// exhausted. Items still buffered from the last fetched page are not
    /// covered by this token; capture it at a page boundary.
    pub fn continuation_token(&self) -> Option<&ContinuationToken> {
        match &self.cursor {
            Cursor::At(token) => Some(token),
            _ => None,
        }
    }

    /// Drain the remaining items into a vector
    pub async fn collect_items(&mut self) -> Result<Vec<T>, QueueError> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }
}

#[cfg(test)]
#[path = "paging_tests.rs"]
mod tests;
