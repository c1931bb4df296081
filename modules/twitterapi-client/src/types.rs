use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Search result ordering requested from the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Latest,
    Top,
    Photos,
    Videos,
}

impl SearchMode {
    /// Query-parameter value for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Latest => "latest",
            SearchMode::Top => "top",
            SearchMode::Photos => "photos",
            SearchMode::Videos => "videos",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single tweet from the search API, either a root post or a reply.
///
/// Every field is optional on the wire. Defaults are applied here, at the
/// client boundary: missing numerics are 0, missing bools false, missing
/// lists empty, missing strings empty. Downstream code never re-derives
/// what a missing field means.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tweet {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub username: String,
    /// Display name, as opposed to the @-handle in `username`.
    #[serde(default)]
    pub name: String,
    /// Unix seconds. 0 when the API omits it.
    #[serde(default)]
    pub timestamp: i64,
    /// ISO-8601 rendering of `timestamp` as sent by the API.
    #[serde(default)]
    pub time_parsed: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub retweets: i64,
    /// Reply count reported by the API, not the number actually retrieved.
    #[serde(default)]
    pub replies: i64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_blue_verified: bool,
    #[serde(default)]
    pub permanent_url: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl Tweet {
    /// Posting time, when the API sent one. The 0 default is treated as
    /// absent here so oldest/newest tracking is not polluted by it.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        if self.timestamp == 0 {
            return None;
        }
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// Legacy-verified or Blue-verified.
    pub fn verified(&self) -> bool {
        self.is_verified || self.is_blue_verified
    }
}

/// One page of tweets plus the continuation cursor. An absent cursor is the
/// endpoint's only end-of-data signal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetPage {
    #[serde(default)]
    pub tweets: Vec<Tweet>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Response envelope. The API returns either `{data: {tweets, cursor}}` or
/// the flat `{tweets, cursor}` shape depending on the endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct PageEnvelope {
    #[serde(default)]
    data: Option<TweetPage>,
    #[serde(default)]
    tweets: Vec<Tweet>,
    #[serde(default)]
    cursor: Option<String>,
}

impl PageEnvelope {
    pub(crate) fn into_page(self) -> TweetPage {
        match self.data {
            Some(page) => page,
            None => TweetPage {
                tweets: self.tweets,
                cursor: self.cursor,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweet_defaults_for_missing_fields() {
        let tweet: Tweet = serde_json::from_str(r#"{"id": "1", "text": "hola"}"#).unwrap();
        assert_eq!(tweet.id.as_deref(), Some("1"));
        assert_eq!(tweet.text, "hola");
        assert_eq!(tweet.likes, 0);
        assert_eq!(tweet.timestamp, 0);
        assert!(!tweet.verified());
        assert!(tweet.hashtags.is_empty());
        assert!(tweet.created_at().is_none());
    }

    #[test]
    fn blue_verification_counts_as_verified() {
        let tweet: Tweet =
            serde_json::from_str(r#"{"id": "1", "is_blue_verified": true}"#).unwrap();
        assert!(tweet.verified());
    }

    #[test]
    fn envelope_unwraps_nested_data() {
        let body = r#"{"data": {"tweets": [{"id": "1"}], "cursor": "abc"}}"#;
        let page = serde_json::from_str::<PageEnvelope>(body).unwrap().into_page();
        assert_eq!(page.tweets.len(), 1);
        assert_eq!(page.cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn envelope_accepts_flat_shape() {
        let body = r#"{"tweets": [{"id": "1"}, {"id": "2"}]}"#;
        let page = serde_json::from_str::<PageEnvelope>(body).unwrap().into_page();
        assert_eq!(page.tweets.len(), 2);
        assert!(page.cursor.is_none());
    }
}
