use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use birdwatch_common::RetrievalBounds;
use twitterapi_client::{SearchMode, Tweet, TwitterApiError};

use crate::traits::SearchApi;

/// Why a pagination loop stopped. Every variant is terminal.
#[derive(Debug)]
pub enum StopReason {
    /// The accepted-item cap was reached.
    MaxReached,
    /// An item crossed the `since` bound; with newest-to-oldest pages,
    /// everything after it can only be older.
    SinceBoundary,
    /// The endpoint returned an empty page or no continuation cursor.
    NoMorePages,
    /// A fetch failed. Items accepted before the failure are preserved.
    Failed(TwitterApiError),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::Failed(_))
    }
}

/// Everything a finished pagination run produced. Partial results survive
/// every stop reason, including failures.
#[derive(Debug)]
pub struct PaginationOutcome {
    pub tweets: Vec<Tweet>,
    pub stop: StopReason,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub pages_fetched: u32,
}

/// Cursor-driven walk over the search endpoint, applying date bounds, the
/// accepted-item cap, and root-id dedup page by page.
///
/// Driven one page at a time via [`SearchPaginator::step`] so the caller
/// can checkpoint between pages. An inter-page delay paces requests; it is
/// configurable down to zero for tests.
pub struct SearchPaginator<'a> {
    api: &'a dyn SearchApi,
    query: String,
    mode: SearchMode,
    bounds: RetrievalBounds,
    page_delay: Duration,
    cursor: Option<String>,
    seen_ids: HashSet<String>,
    accepted: Vec<Tweet>,
    oldest: Option<DateTime<Utc>>,
    newest: Option<DateTime<Utc>>,
    pages_fetched: u32,
    stop: Option<StopReason>,
}

impl<'a> SearchPaginator<'a> {
    pub fn new(
        api: &'a dyn SearchApi,
        query: &str,
        mode: SearchMode,
        bounds: RetrievalBounds,
        page_delay: Duration,
    ) -> Self {
        Self {
            api,
            query: query.to_string(),
            mode,
            bounds,
            page_delay,
            cursor: None,
            seen_ids: HashSet::new(),
            accepted: Vec::new(),
            oldest: None,
            newest: None,
            pages_fetched: 0,
            stop: None,
        }
    }

    /// Items accepted so far, in server order.
    pub fn accepted(&self) -> &[Tweet] {
        &self.accepted
    }

    /// Fetch and consume one page. Returns `true` while another page should
    /// be fetched; once it returns `false` the paginator is terminal.
    pub async fn step(&mut self) -> bool {
        if self.stop.is_some() {
            return false;
        }

        if self.pages_fetched > 0 && !self.page_delay.is_zero() {
            tokio::time::sleep(self.page_delay).await;
        }

        let page = match self
            .api
            .search_page(&self.query, self.mode, self.cursor.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!(query = self.query.as_str(), error = %e, "Search fetch failed, keeping partial results");
                self.stop = Some(StopReason::Failed(e));
                return false;
            }
        };
        self.pages_fetched += 1;

        if page.tweets.is_empty() {
            debug!(query = self.query.as_str(), "Empty page, no more tweets");
            self.stop = Some(StopReason::NoMorePages);
            return false;
        }

        let mut page_accepted = 0usize;
        for tweet in page.tweets {
            if let Some(ts) = tweet.created_at() {
                self.oldest = Some(self.oldest.map_or(ts, |o| o.min(ts)));
                self.newest = Some(self.newest.map_or(ts, |n| n.max(ts)));
            }

            if self.bounds.crosses_since(&tweet) {
                // The rest of this page and all later pages can only be older.
                info!(query = self.query.as_str(), "Lower date bound reached, stopping pagination");
                self.stop = Some(StopReason::SinceBoundary);
                break;
            }
            if self.bounds.exceeds_until(&tweet) {
                continue;
            }
            if let Some(id) = &tweet.id {
                if !self.seen_ids.insert(id.clone()) {
                    debug!(id = id.as_str(), "Duplicate root id, skipping");
                    continue;
                }
            }
            self.accepted.push(tweet);
            page_accepted += 1;
        }

        info!(
            page = self.pages_fetched,
            accepted = page_accepted,
            total = self.accepted.len(),
            oldest = ?self.oldest,
            "Page consumed"
        );

        if matches!(self.stop, Some(StopReason::SinceBoundary)) {
            return false;
        }

        if let Some(max) = self.bounds.max_tweets {
            if self.accepted.len() >= max {
                self.accepted.truncate(max);
                info!(max, "Tweet cap reached, stopping pagination");
                self.stop = Some(StopReason::MaxReached);
                return false;
            }
        }

        match page.cursor {
            Some(cursor) => {
                self.cursor = Some(cursor);
                true
            }
            None => {
                debug!("No continuation cursor, pagination exhausted");
                self.stop = Some(StopReason::NoMorePages);
                false
            }
        }
    }

    pub fn finish(self) -> PaginationOutcome {
        PaginationOutcome {
            tweets: self.accepted,
            stop: self.stop.unwrap_or(StopReason::NoMorePages),
            oldest: self.oldest,
            newest: self.newest,
            pages_fetched: self.pages_fetched,
        }
    }
}
