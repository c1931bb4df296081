use std::time::Duration;

use tracing::{debug, warn};

use twitterapi_client::Tweet;

use crate::traits::SearchApi;

/// Fetch every reply page for one root tweet, in its own cursor space.
///
/// No date or count bounds apply; the walk ends when the endpoint runs dry.
/// Failures are contained here: whatever was gathered before the failure is
/// returned, and the caller moves on to the next root.
pub async fn collect_replies(api: &dyn SearchApi, tweet_id: &str, page_delay: Duration) -> Vec<Tweet> {
    let mut replies = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = match api.replies_page(tweet_id, cursor.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(tweet_id, error = %e, gathered = replies.len(), "Reply fetch failed, keeping partial replies");
                break;
            }
        };

        if page.tweets.is_empty() {
            break;
        }
        replies.extend(page.tweets);

        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }

        if !page_delay.is_zero() {
            tokio::time::sleep(page_delay).await;
        }
    }

    debug!(tweet_id, count = replies.len(), "Replies collected");
    replies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{day, make_tweet, page, MockSearchApi};
    use twitterapi_client::TwitterApiError;

    #[tokio::test]
    async fn follows_the_cursor_across_pages() {
        let api = MockSearchApi::new()
            .on_replies("root", page(vec![make_tweet("r1", day(1))], Some("next")))
            .on_replies("root", page(vec![make_tweet("r2", day(1)), make_tweet("r3", day(1))], None));

        let replies = collect_replies(&api, "root", Duration::ZERO).await;
        let ids: Vec<_> = replies.iter().filter_map(|t| t.id.as_deref()).collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn failure_returns_replies_gathered_so_far() {
        let api = MockSearchApi::new()
            .on_replies(
                "root",
                page(
                    vec![
                        make_tweet("r1", day(1)),
                        make_tweet("r2", day(1)),
                        make_tweet("r3", day(1)),
                    ],
                    Some("next"),
                ),
            )
            .on_replies_failure("root", TwitterApiError::Network("timeout".to_string()));

        let replies = collect_replies(&api, "root", Duration::ZERO).await;
        assert_eq!(replies.len(), 3);
    }

    #[tokio::test]
    async fn no_replies_is_not_an_error() {
        let api = MockSearchApi::new();
        let replies = collect_replies(&api, "root", Duration::ZERO).await;
        assert!(replies.is_empty());
    }
}
