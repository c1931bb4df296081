pub mod error;
pub mod types;

pub use error::{Result, TwitterApiError};
pub use types::{SearchMode, Tweet, TweetPage};

use types::PageEnvelope;

/// REST client for the RapidAPI-hosted X/Twitter search API.
///
/// Each call issues exactly one bounded request; pagination is the caller's
/// concern. A 2xx body with an unexpected shape is degraded to an empty
/// page rather than an error, so a single garbled response does not abort
/// a retrieval.
pub struct TwitterApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_host: String,
}

impl TwitterApiClient {
    pub fn new(api_key: String, api_host: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://{api_host}/v1"),
            api_key,
            api_host,
        }
    }

    /// One page of search results for `query`. Pass the cursor from the
    /// previous page to continue; `None` starts from the top.
    pub async fn search_page(
        &self,
        query: &str,
        mode: SearchMode,
        cursor: Option<&str>,
    ) -> Result<TweetPage> {
        let url = format!("{}/search/tweets", self.base_url);
        let mut params = vec![("query", query), ("mode", mode.as_str())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }
        self.get_page(&url, &params).await
    }

    /// One page of replies to the given tweet.
    pub async fn replies_page(&self, tweet_id: &str, cursor: Option<&str>) -> Result<TweetPage> {
        let url = format!("{}/tweets/{}/replies", self.base_url, tweet_id);
        let mut params = Vec::new();
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }
        self.get_page(&url, &params).await
    }

    async fn get_page(&self, url: &str, params: &[(&str, &str)]) -> Result<TweetPage> {
        let resp = self
            .client
            .get(url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.api_host)
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = resp.text().await.unwrap_or_default();
            return Err(TwitterApiError::Unauthorized {
                status: status.as_u16(),
                message: body,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TwitterApiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        match serde_json::from_str::<PageEnvelope>(&body) {
            Ok(envelope) => Ok(envelope.into_page()),
            Err(e) => {
                tracing::warn!(url, error = %e, "Unexpected response shape, treating as empty page");
                Ok(TweetPage::default())
            }
        }
    }
}
