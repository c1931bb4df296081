use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tracing::{debug, info, warn};

use birdwatch_common::{
    checkpoint_name, Conversation, ConversationEntry, RetrievalBounds, RetrievalStatus, SearchKind,
};
use twitterapi_client::SearchMode;

use crate::paginator::{SearchPaginator, StopReason};
use crate::replies::collect_replies;
use crate::traits::{CheckpointSink, SearchApi};

/// When to write an in-progress checkpoint. Injectable so tests can
/// checkpoint at every step without changing engine behavior.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointPolicy {
    /// Write after every search page that accepted at least one tweet.
    pub after_each_page: bool,
    /// Write after every Nth root once reply fan-out starts. 0 disables
    /// per-root writes; the final completion write always happens.
    pub roots_interval: usize,
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self {
            after_each_page: true,
            roots_interval: 5,
        }
    }
}

impl CheckpointPolicy {
    fn after_page(&self, page_accepted: usize) -> bool {
        self.after_each_page && page_accepted > 0
    }

    fn after_root(&self, index: usize) -> bool {
        self.roots_interval > 0 && (index + 1) % self.roots_interval == 0
    }
}

/// Inputs for one retrieval. Immutable for the duration of the call.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub query: String,
    pub kind: SearchKind,
    pub mode: SearchMode,
    pub bounds: RetrievalBounds,
    pub include_replies: bool,
    pub policy: CheckpointPolicy,
    pub page_delay: Duration,
    pub reply_delay: Duration,
}

impl AssemblerConfig {
    pub fn new(query: &str, kind: SearchKind, mode: SearchMode) -> Self {
        Self {
            query: query.to_string(),
            kind,
            mode,
            bounds: RetrievalBounds::default(),
            include_replies: true,
            policy: CheckpointPolicy::default(),
            page_delay: Duration::from_secs(1),
            reply_delay: Duration::from_millis(500),
        }
    }
}

/// A finished retrieval: the conversation, why root pagination stopped, and
/// where the final checkpoint landed.
#[derive(Debug)]
pub struct AssemblyOutcome {
    pub conversation: Conversation,
    pub stop: StopReason,
    pub checkpoint: PathBuf,
}

/// Orchestrates one retrieval: bounded root pagination, per-root reply
/// fan-out, and checkpointing at the cadence the policy dictates.
///
/// The checkpoint identity is fixed when the run starts, so every snapshot
/// of this retrieval supersedes the previous one. Mid-run checkpoint
/// failures are logged and skipped (losing a snapshot must not lose the
/// retrieval); the final completion write propagates its error.
pub struct ConversationAssembler<'a> {
    api: &'a dyn SearchApi,
    sink: &'a dyn CheckpointSink,
    config: AssemblerConfig,
}

impl<'a> ConversationAssembler<'a> {
    pub fn new(api: &'a dyn SearchApi, sink: &'a dyn CheckpointSink, config: AssemblerConfig) -> Self {
        Self { api, sink, config }
    }

    pub async fn run(&self) -> anyhow::Result<AssemblyOutcome> {
        let started = Utc::now();
        let cfg = &self.config;
        let search_query = cfg.kind.normalize_query(&cfg.query);
        let name = checkpoint_name(&cfg.query, started);

        info!(
            query = search_query.as_str(),
            mode = %cfg.mode,
            include_replies = cfg.include_replies,
            "Starting retrieval"
        );

        let mut conversation = Conversation::new(&cfg.query, cfg.kind, cfg.mode);
        conversation.downloaded_at = started;
        conversation.checkpoint_name = Some(name.clone());

        let mut paginator =
            SearchPaginator::new(self.api, &search_query, cfg.mode, cfg.bounds, cfg.page_delay);
        loop {
            let before = paginator.accepted().len();
            let more = paginator.step().await;
            let page_accepted = paginator.accepted().len().saturating_sub(before);

            if cfg.policy.after_page(page_accepted) {
                conversation.tweets = paginator
                    .accepted()
                    .iter()
                    .cloned()
                    .map(ConversationEntry::root)
                    .collect();
                conversation.recompute_totals();
                self.try_checkpoint(&name, &conversation).await;
            }
            if !more {
                break;
            }
        }
        let outcome = paginator.finish();
        info!(
            roots = outcome.tweets.len(),
            pages = outcome.pages_fetched,
            reason = ?outcome.stop,
            "Root pagination finished"
        );

        conversation.tweets = outcome
            .tweets
            .into_iter()
            .map(ConversationEntry::root)
            .collect();

        if cfg.include_replies {
            let total = conversation.tweets.len();
            for i in 0..total {
                let Some(id) = conversation.tweets[i].tweet.id.clone() else {
                    continue;
                };
                info!(tweet = i + 1, total, id = id.as_str(), "Fetching replies");
                conversation.tweets[i].replies =
                    collect_replies(self.api, &id, cfg.reply_delay).await;

                if cfg.policy.after_root(i) {
                    conversation.recompute_totals();
                    self.try_checkpoint(&name, &conversation).await;
                }
            }
        }

        conversation.recompute_totals();
        conversation.status = RetrievalStatus::Completed;
        let path = self
            .sink
            .put(&name, &conversation)
            .await
            .context("writing final checkpoint")?;

        info!(
            roots = conversation.total_main_tweets,
            replies = conversation.total_replies,
            path = %path.display(),
            "Retrieval complete"
        );

        Ok(AssemblyOutcome {
            conversation,
            stop: outcome.stop,
            checkpoint: path,
        })
    }

    async fn try_checkpoint(&self, name: &str, conversation: &Conversation) {
        match self.sink.put(name, conversation).await {
            Ok(path) => debug!(
                path = %path.display(),
                items = conversation.total_items,
                "Progress checkpoint written"
            ),
            Err(e) => warn!(error = %e, "Checkpoint write failed, continuing"),
        }
    }
}
