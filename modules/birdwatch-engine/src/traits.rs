use std::path::PathBuf;

use async_trait::async_trait;

use birdwatch_archive::CheckpointStore;
use birdwatch_common::Conversation;
use twitterapi_client::{Result as ApiResult, SearchMode, TweetPage, TwitterApiClient};

/// Paged access to the search and reply endpoints. The engine drives this
/// one bounded request at a time; implementations must not retry or
/// paginate internally.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search_page(
        &self,
        query: &str,
        mode: SearchMode,
        cursor: Option<&str>,
    ) -> ApiResult<TweetPage>;

    async fn replies_page(&self, tweet_id: &str, cursor: Option<&str>) -> ApiResult<TweetPage>;
}

#[async_trait]
impl SearchApi for TwitterApiClient {
    async fn search_page(
        &self,
        query: &str,
        mode: SearchMode,
        cursor: Option<&str>,
    ) -> ApiResult<TweetPage> {
        TwitterApiClient::search_page(self, query, mode, cursor).await
    }

    async fn replies_page(&self, tweet_id: &str, cursor: Option<&str>) -> ApiResult<TweetPage> {
        TwitterApiClient::replies_page(self, tweet_id, cursor).await
    }
}

/// Durable checkpoint storage as the engine sees it: a named slot that
/// every write fully replaces.
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    async fn put(&self, name: &str, conversation: &Conversation) -> anyhow::Result<PathBuf>;
}

#[async_trait]
impl CheckpointSink for CheckpointStore {
    async fn put(&self, name: &str, conversation: &Conversation) -> anyhow::Result<PathBuf> {
        Ok(self.write(name, conversation).await?)
    }
}
