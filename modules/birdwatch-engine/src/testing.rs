// Test mocks for the retrieval engine.
//
// Two mocks matching the two trait boundaries:
// - MockSearchApi (SearchApi) — scripted page sequences per endpoint
// - MemorySink (CheckpointSink) — records every snapshot written
//
// Plus helpers for building tweets and pages.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use birdwatch_common::Conversation;
use twitterapi_client::{Result as ApiResult, SearchMode, Tweet, TweetPage, TwitterApiError};

use crate::traits::{CheckpointSink, SearchApi};

/// Arbitrary base so test timestamps are realistic. Day `n` is `n` days
/// after it.
const EPOCH_BASE: i64 = 1_700_000_000;

/// Unix seconds for test day `n`.
pub fn day(n: i64) -> i64 {
    EPOCH_BASE + n * 86_400
}

pub fn make_tweet(id: &str, timestamp: i64) -> Tweet {
    Tweet {
        id: Some(id.to_string()),
        text: format!("tweet {id}"),
        username: format!("user_{id}"),
        name: format!("User {id}"),
        timestamp,
        permanent_url: format!("https://x.com/user_{id}/status/{id}"),
        ..Tweet::default()
    }
}

pub fn page(tweets: Vec<Tweet>, cursor: Option<&str>) -> TweetPage {
    TweetPage {
        tweets,
        cursor: cursor.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// MockSearchApi
// ---------------------------------------------------------------------------

/// Scripted search API. Search pages are consumed in order across all
/// calls; reply pages are scripted per tweet id. An exhausted script
/// returns empty pages, which the engine reads as end-of-data.
/// Builder pattern: `.on_search()`, `.on_replies()`, and the `_failure`
/// variants.
pub struct MockSearchApi {
    search: Mutex<VecDeque<ApiResult<TweetPage>>>,
    replies: Mutex<HashMap<String, VecDeque<ApiResult<TweetPage>>>>,
    search_calls: AtomicUsize,
    reply_calls: AtomicUsize,
}

impl MockSearchApi {
    pub fn new() -> Self {
        Self {
            search: Mutex::new(VecDeque::new()),
            replies: Mutex::new(HashMap::new()),
            search_calls: AtomicUsize::new(0),
            reply_calls: AtomicUsize::new(0),
        }
    }

    pub fn on_search(self, page: TweetPage) -> Self {
        self.search.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn on_search_failure(self, error: TwitterApiError) -> Self {
        self.search.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn on_replies(self, tweet_id: &str, page: TweetPage) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(tweet_id.to_string())
            .or_default()
            .push_back(Ok(page));
        self
    }

    pub fn on_replies_failure(self, tweet_id: &str, error: TwitterApiError) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(tweet_id.to_string())
            .or_default()
            .push_back(Err(error));
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn reply_calls(&self) -> usize {
        self.reply_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSearchApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchApi for MockSearchApi {
    async fn search_page(
        &self,
        _query: &str,
        _mode: SearchMode,
        _cursor: Option<&str>,
    ) -> ApiResult<TweetPage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TweetPage::default()))
    }

    async fn replies_page(&self, tweet_id: &str, _cursor: Option<&str>) -> ApiResult<TweetPage> {
        self.reply_calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .get_mut(tweet_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(TweetPage::default()))
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Checkpoint sink that records every write. Snapshots are cloned, so each
/// recorded write is the document as it stood at write time.
pub struct MemorySink {
    writes: Mutex<Vec<(String, Conversation)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> Vec<(String, Conversation)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointSink for MemorySink {
    async fn put(&self, name: &str, conversation: &Conversation) -> anyhow::Result<PathBuf> {
        self.writes
            .lock()
            .unwrap()
            .push((name.to_string(), conversation.clone()));
        Ok(PathBuf::from(format!("memory://{name}.json")))
    }
}
