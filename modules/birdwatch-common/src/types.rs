use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use twitterapi_client::{SearchMode, Tweet};

// --- Search identity ---

/// Whether the query is a hashtag or free text. Hashtag queries get a `#`
/// prefixed before hitting the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Hashtag,
    Text,
}

impl SearchKind {
    pub fn normalize_query(&self, raw: &str) -> String {
        match self {
            SearchKind::Hashtag if !raw.starts_with('#') => format!("#{raw}"),
            _ => raw.to_string(),
        }
    }
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchKind::Hashtag => write!(f, "hashtag"),
            SearchKind::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStatus {
    InProgress,
    Completed,
}

// --- Retrieval bounds ---

/// Date-range and count constraints for one retrieval. Immutable for the
/// duration of the call.
///
/// `since` is exclusive-below: crossing it stops pagination. `until` is
/// inclusive-skip: newer items are dropped but pagination continues, since
/// a page may mix items on both sides of the bound. Both day-granularity
/// constructors resolve to local midnight of the named day, so the `until`
/// day's own hours fall outside the window.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrievalBounds {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub max_tweets: Option<usize>,
}

impl RetrievalBounds {
    pub fn from_days(
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
        max_tweets: Option<usize>,
    ) -> Self {
        Self {
            since: since.map(day_start_utc),
            until: until.map(day_start_utc),
            max_tweets,
        }
    }

    /// True when the tweet is older than the `since` bound. A missing
    /// timestamp (0) always crosses a set bound; the unix epoch predates
    /// any plausible window.
    pub fn crosses_since(&self, tweet: &Tweet) -> bool {
        self.since
            .is_some_and(|since| tweet.timestamp < since.timestamp())
    }

    /// True when the tweet is newer than the `until` bound.
    pub fn exceeds_until(&self, tweet: &Tweet) -> bool {
        self.until
            .is_some_and(|until| tweet.timestamp > until.timestamp())
    }
}

/// Local midnight of the given day, in UTC.
fn day_start_utc(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_hms_opt(0, 0, 0).expect("midnight is valid");
    match Local.from_local_datetime(&midnight) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.with_timezone(&Utc)
        }
        // DST gap at midnight: fall back to the UTC reading of the same wall time
        chrono::LocalResult::None => Utc.from_utc_datetime(&midnight),
    }
}

// --- Conversation ---

/// One root tweet plus every reply retrieved for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub tweet: Tweet,
    #[serde(default)]
    pub replies: Vec<Tweet>,
}

impl ConversationEntry {
    pub fn root(tweet: Tweet) -> Self {
        Self {
            tweet,
            replies: Vec::new(),
        }
    }
}

/// The aggregate result of one retrieval: every root tweet matched by the
/// query, each paired with its replies. This is also the checkpoint
/// document: snapshots written to durable storage are serializations of
/// this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub query: String,
    pub search_type: SearchKind,
    pub mode: SearchMode,
    pub downloaded_at: DateTime<Utc>,
    pub status: RetrievalStatus,
    #[serde(default)]
    pub total_main_tweets: usize,
    #[serde(default)]
    pub total_replies: usize,
    #[serde(default)]
    pub total_items: usize,
    #[serde(default)]
    pub tweets: Vec<ConversationEntry>,
    /// Checkpoint identity this conversation is written under. One identity
    /// exists per retrieval; every snapshot supersedes the previous one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_name: Option<String>,
}

impl Conversation {
    pub fn new(query: &str, search_type: SearchKind, mode: SearchMode) -> Self {
        Self {
            query: query.to_string(),
            search_type,
            mode,
            downloaded_at: Utc::now(),
            status: RetrievalStatus::InProgress,
            total_main_tweets: 0,
            total_replies: 0,
            total_items: 0,
            tweets: Vec::new(),
            checkpoint_name: None,
        }
    }

    /// Recompute the derived totals from the current entries. Totals are
    /// never incremented in place, only recomputed before a snapshot is
    /// written, so they cannot drift from the entries.
    pub fn recompute_totals(&mut self) {
        self.total_main_tweets = self.tweets.len();
        self.total_replies = self.tweets.iter().map(|e| e.replies.len()).sum();
        self.total_items = self.total_main_tweets + self.total_replies;
    }

    /// Ids of the root tweets, skipping any the API sent without one.
    pub fn root_ids(&self) -> impl Iterator<Item = &str> {
        self.tweets.iter().filter_map(|e| e.tweet.id.as_deref())
    }
}

/// Checkpoint identity for a retrieval: the cleaned query plus the start
/// time to the second. `#` is stripped and spaces become underscores so the
/// name is filesystem-safe.
pub fn checkpoint_name(query: &str, started: DateTime<Utc>) -> String {
    let clean = query.replace('#', "").replace(' ', "_");
    format!("{}_{}", clean, started.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet_with_replies(id: &str, reply_count: usize) -> ConversationEntry {
        ConversationEntry {
            tweet: Tweet {
                id: Some(id.to_string()),
                ..Tweet::default()
            },
            replies: (0..reply_count)
                .map(|i| Tweet {
                    id: Some(format!("{id}-r{i}")),
                    ..Tweet::default()
                })
                .collect(),
        }
    }

    #[test]
    fn hashtag_queries_get_prefixed_once() {
        assert_eq!(SearchKind::Hashtag.normalize_query("rustlang"), "#rustlang");
        assert_eq!(SearchKind::Hashtag.normalize_query("#rustlang"), "#rustlang");
        assert_eq!(SearchKind::Text.normalize_query("rustlang"), "rustlang");
    }

    #[test]
    fn totals_equal_sum_over_entries() {
        let mut conversation = Conversation::new("x", SearchKind::Hashtag, SearchMode::Latest);
        conversation.tweets = vec![tweet_with_replies("1", 2), tweet_with_replies("2", 0)];
        conversation.recompute_totals();
        assert_eq!(conversation.total_main_tweets, 2);
        assert_eq!(conversation.total_replies, 2);
        assert_eq!(
            conversation.total_items,
            conversation.total_main_tweets + conversation.total_replies
        );
    }

    #[test]
    fn checkpoint_name_is_filesystem_safe() {
        let started = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(
            checkpoint_name("#Elon Musk", started),
            "Elon_Musk_20240301_123005"
        );
    }

    #[test]
    fn since_bound_treats_missing_timestamp_as_epoch() {
        let bounds = RetrievalBounds {
            since: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ..RetrievalBounds::default()
        };
        let no_timestamp = Tweet::default();
        assert!(bounds.crosses_since(&no_timestamp));
    }

    #[test]
    fn until_bound_flags_newer_tweets_only() {
        let until = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let bounds = RetrievalBounds {
            until: Some(until),
            ..RetrievalBounds::default()
        };
        let newer = Tweet {
            timestamp: until.timestamp() + 1,
            ..Tweet::default()
        };
        let at_bound = Tweet {
            timestamp: until.timestamp(),
            ..Tweet::default()
        };
        assert!(bounds.exceeds_until(&newer));
        assert!(!bounds.exceeds_until(&at_bound));
    }

    #[test]
    fn checkpoint_document_field_names() {
        let mut conversation = Conversation::new("rust", SearchKind::Text, SearchMode::Top);
        conversation.tweets = vec![tweet_with_replies("1", 1)];
        conversation.recompute_totals();
        let doc = serde_json::to_value(&conversation).unwrap();
        assert_eq!(doc["search_type"], "text");
        assert_eq!(doc["mode"], "top");
        assert_eq!(doc["status"], "in_progress");
        assert_eq!(doc["total_items"], 2);
        assert!(doc["tweets"][0]["tweet"].is_object());
        assert!(doc["tweets"][0]["replies"].is_array());
    }
}
