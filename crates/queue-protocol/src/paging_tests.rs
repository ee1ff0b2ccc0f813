//! Tests for the continuation-token paging engine.

use super::*;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Fetcher serving a fixed script of pages. Tokens name the index of the
/// next page, so the fetcher itself is stateless between calls.
#[derive(Clone)]
struct ScriptedFetcher {
    pages: Vec<Page<u32>>,
    fetches: Arc<AtomicUsize>,
    last_page_size: Arc<AtomicU32>,
}

impl ScriptedFetcher {
    /// Build a script where each inner vec is one page; every page except
    /// the last carries a token pointing at its successor.
    fn new(script: Vec<Vec<u32>>) -> Self {
        let count = script.len();
        let pages = script
            .into_iter()
            .enumerate()
            .map(|(i, items)| {
                let token = if i + 1 < count {
                    Some(ContinuationToken::new((i + 1).to_string()))
                } else {
                    None
                };
                Page::new(items, token)
            })
            .collect();

        Self {
            pages,
            fetches: Arc::new(AtomicUsize::new(0)),
            last_page_size: Arc::new(AtomicU32::new(0)),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher<u32> for ScriptedFetcher {
    async fn fetch(
        &self,
        token: Option<&ContinuationToken>,
        page_size: Option<u32>,
    ) -> Result<Page<u32>, QueueError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.last_page_size
            .store(page_size.unwrap_or(0), Ordering::SeqCst);

        let index: usize = match token {
            None => 0,
            Some(token) => token.as_str().parse().unwrap(),
        };
        Ok(self.pages[index].clone())
    }
}

/// Verify item iteration yields the exact concatenation of all pages, in
/// order, with no repeats and no omissions.
#[tokio::test]
async fn test_exhaustive_iteration_without_duplication() {
    let fetcher = ScriptedFetcher::new(vec![vec![1, 2], vec![3, 4], vec![5]]);
    let mut paged = Paged::new(fetcher.clone(), None);

    let items = paged.collect_items().await.unwrap();

    assert_eq!(items, vec![1, 2, 3, 4, 5]);
    assert_eq!(fetcher.fetch_count(), 3);
}

/// Verify a page with zero items but a continuation token does not end
/// iteration; the next fetch uses that token.
#[tokio::test]
async fn test_hollow_intermediate_page_continues() {
    let fetcher = ScriptedFetcher::new(vec![vec![1, 2], vec![], vec![3]]);
    let mut paged = Paged::new(fetcher.clone(), None);

    let items = paged.collect_items().await.unwrap();

    assert_eq!(items, vec![1, 2, 3]);
    assert_eq!(fetcher.fetch_count(), 3);
}

/// Verify the page-level view surfaces hollow pages as-is instead of
/// skipping or merging them.
#[tokio::test]
async fn test_page_level_view_shows_hollow_pages() {
    let fetcher = ScriptedFetcher::new(vec![vec![1], vec![], vec![2]]);
    let mut paged = Paged::new(fetcher, None);

    let first = paged.next_page().await.unwrap().unwrap();
    assert_eq!(first.items, vec![1]);

    let hollow = paged.next_page().await.unwrap().unwrap();
    assert!(hollow.items.is_empty());
    assert!(hollow.continuation_token.is_some());

    let last = paged.next_page().await.unwrap().unwrap();
    assert_eq!(last.items, vec![2]);
    assert!(last.continuation_token.is_none());

    assert!(paged.next_page().await.unwrap().is_none());
}

/// Verify an immediately terminal empty page produces an empty sequence.
#[tokio::test]
async fn test_empty_collection() {
    let fetcher = ScriptedFetcher::new(vec![vec![]]);
    let mut paged = Paged::new(fetcher.clone(), None);

    assert!(paged.collect_items().await.unwrap().is_empty());
    // Exhaustion is remembered; no further fetches are issued
    assert!(paged.next_item().await.unwrap().is_none());
    assert_eq!(fetcher.fetch_count(), 1);
}

/// Verify resuming from a captured token yields the identical remaining
/// sequence uninterrupted iteration would have produced.
#[tokio::test]
async fn test_resume_from_token_matches_uninterrupted() {
    let script = vec![vec![1, 2], vec![3, 4], vec![5, 6]];

    // Uninterrupted reference run
    let mut reference = Paged::new(ScriptedFetcher::new(script.clone()), None);
    let all = reference.collect_items().await.unwrap();

    // Interrupted run: pull one page, capture the token, discard the engine
    let mut interrupted = Paged::new(ScriptedFetcher::new(script.clone()), None);
    let first = interrupted.next_page().await.unwrap().unwrap();
    let token = interrupted.continuation_token().unwrap().clone();
    drop(interrupted);

    // Fresh engine resumed from the stored token
    let mut resumed = Paged::resume_from(ScriptedFetcher::new(script), None, token);
    let rest = resumed.collect_items().await.unwrap();

    let mut stitched = first.items;
    stitched.extend(rest);
    assert_eq!(stitched, all);
}

/// Verify the advisory page size reaches the fetcher and short pages are
/// passed through without padding or batching.
#[tokio::test]
async fn test_page_size_is_advisory() {
    let fetcher = ScriptedFetcher::new(vec![vec![1], vec![2, 3]]);
    let mut paged = Paged::new(fetcher.clone(), Some(10));

    let first = paged.next_page().await.unwrap().unwrap();
    assert_eq!(fetcher.last_page_size.load(Ordering::SeqCst), 10);
    // Fewer items than requested is a valid page, not something to pad
    assert_eq!(first.items.len(), 1);
}

/// Verify the cursor accessor tracks the page boundary.
#[tokio::test]
async fn test_continuation_token_visibility() {
    let fetcher = ScriptedFetcher::new(vec![vec![1], vec![2]]);
    let mut paged = Paged::new(fetcher, None);

    // No token before the first fetch
    assert!(paged.continuation_token().is_none());

    paged.next_page().await.unwrap();
    assert!(paged.continuation_token().is_some());

    paged.next_page().await.unwrap();
    // Exhausted; nothing left to resume from
    assert!(paged.continuation_token().is_none());
}
