use tracing::info;

use birdwatch_common::Conversation;

/// Post-retrieval narrowing criteria. Filtering is a view over a completed
/// conversation; it never touches checkpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOptions {
    pub min_likes: Option<i64>,
    pub verified_only: bool,
}

impl FilterOptions {
    pub fn is_active(&self) -> bool {
        self.min_likes.is_some() || self.verified_only
    }
}

/// Keep only the root tweets that pass the filters, with their full reply
/// sets. Replies themselves are never filtered. Totals are recomputed for
/// the narrowed set.
pub fn apply_filters(conversation: &Conversation, options: FilterOptions) -> Conversation {
    let before = conversation.tweets.len();

    let mut filtered = conversation.clone();
    filtered.tweets.retain(|entry| {
        let tweet = &entry.tweet;
        if let Some(min) = options.min_likes {
            if tweet.likes < min {
                return false;
            }
        }
        if options.verified_only && !tweet.verified() {
            return false;
        }
        true
    });
    filtered.recompute_totals();

    info!(before, after = filtered.tweets.len(), "Filters applied");
    filtered
}
