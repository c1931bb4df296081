use std::collections::HashMap;

use birdwatch_common::Conversation;

/// Aggregate statistics over a retrieved conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationStats {
    pub total_main_tweets: usize,
    pub total_replies: usize,
    pub unique_repliers: usize,
    pub avg_reply_length: f64,
    /// Handle and reply count of the most frequent replier, if any replies
    /// carried a handle.
    pub most_active_replier: Option<(String, usize)>,
}

/// Compute reply statistics for a conversation. Replies without a handle
/// count toward totals but not toward replier rankings.
pub fn analyze(conversation: &Conversation) -> ConversationStats {
    let mut replier_counts: HashMap<&str, usize> = HashMap::new();
    let mut reply_count = 0usize;
    let mut reply_chars = 0usize;

    for entry in &conversation.tweets {
        for reply in &entry.replies {
            reply_count += 1;
            reply_chars += reply.text.chars().count();
            if !reply.username.is_empty() {
                *replier_counts.entry(reply.username.as_str()).or_default() += 1;
            }
        }
    }

    let most_active_replier = replier_counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(handle, count)| (handle.to_string(), *count));

    ConversationStats {
        total_main_tweets: conversation.tweets.len(),
        total_replies: reply_count,
        unique_repliers: replier_counts.len(),
        avg_reply_length: if reply_count > 0 {
            reply_chars as f64 / reply_count as f64
        } else {
            0.0
        },
        most_active_replier,
    }
}

impl std::fmt::Display for ConversationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tweets, {} replies ({} unique repliers, avg {:.1} chars)",
            self.total_main_tweets, self.total_replies, self.unique_repliers, self.avg_reply_length
        )?;
        if let Some((handle, count)) = &self.most_active_replier {
            write!(f, ", most active @{handle} ({count})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use birdwatch_common::{ConversationEntry, SearchKind};
    use twitterapi_client::{SearchMode, Tweet};

    fn reply(handle: &str, text: &str) -> Tweet {
        Tweet {
            id: Some(format!("r-{handle}-{}", text.len())),
            username: handle.to_string(),
            text: text.to_string(),
            ..Tweet::default()
        }
    }

    #[test]
    fn counts_unique_and_most_active_repliers() {
        let mut conversation = Conversation::new("x", SearchKind::Hashtag, SearchMode::Latest);
        conversation.tweets = vec![ConversationEntry {
            tweet: Tweet {
                id: Some("1".to_string()),
                ..Tweet::default()
            },
            replies: vec![
                reply("ana", "hola"),
                reply("ana", "otra vez"),
                reply("bob", "hi"),
            ],
        }];
        conversation.recompute_totals();

        let stats = analyze(&conversation);
        assert_eq!(stats.total_replies, 3);
        assert_eq!(stats.unique_repliers, 2);
        assert_eq!(stats.most_active_replier, Some(("ana".to_string(), 2)));
    }

    #[test]
    fn empty_conversation_yields_zeroed_stats() {
        let conversation = Conversation::new("x", SearchKind::Text, SearchMode::Latest);
        let stats = analyze(&conversation);
        assert_eq!(stats.total_replies, 0);
        assert_eq!(stats.avg_reply_length, 0.0);
        assert!(stats.most_active_replier.is_none());
    }
}
