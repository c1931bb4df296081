use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::assembler::{AssemblerConfig, ConversationAssembler};
use crate::cancel::CancelToken;
use crate::filter::{apply_filters, FilterOptions};
use crate::paginator::StopReason;
use crate::traits::{CheckpointSink, SearchApi};

/// Settings for continuous monitoring of one query.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause between iterations.
    pub interval: Duration,
    /// Total monitoring window; `None` runs until cancelled.
    pub duration: Option<Duration>,
    /// Sleep granularity. Cancellation and the deadline are observed once
    /// per slice, so a smaller slice means a faster reaction.
    pub sleep_slice: Duration,
    pub filters: FilterOptions,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            duration: None,
            sleep_slice: Duration::from_secs(1),
            filters: FilterOptions::default(),
        }
    }
}

/// What a finished monitoring session saw.
#[derive(Debug)]
pub struct MonitorReport {
    pub iterations: u32,
    /// Distinct root ids across all iterations.
    pub unique_roots: usize,
    /// Roots first seen in each iteration, in order.
    pub new_per_iteration: Vec<usize>,
}

/// Re-runs a full retrieval on a timer, tracking which root ids are new
/// across iterations. The id set only counts novelty: every iteration
/// re-fetches and re-stores under its own checkpoint identity.
///
/// Terminates when the optional duration elapses or the token is
/// cancelled, both checked at iteration boundaries and at every sleep
/// slice.
pub struct Monitor {
    api: Arc<dyn SearchApi>,
    sink: Arc<dyn CheckpointSink>,
    assembler: AssemblerConfig,
    config: MonitorConfig,
    token: CancelToken,
}

impl Monitor {
    pub fn new(
        api: Arc<dyn SearchApi>,
        sink: Arc<dyn CheckpointSink>,
        assembler: AssemblerConfig,
        config: MonitorConfig,
        token: CancelToken,
    ) -> Self {
        Self {
            api,
            sink,
            assembler,
            config,
            token,
        }
    }

    pub async fn run(&self) -> MonitorReport {
        let started = Instant::now();
        let deadline = self.config.duration.map(|d| started + d);
        let mut seen: HashSet<String> = HashSet::new();
        let mut new_per_iteration = Vec::new();
        let mut iterations = 0u32;

        info!(
            interval_secs = self.config.interval.as_secs(),
            bounded = deadline.is_some(),
            "Monitoring started"
        );

        loop {
            if self.token.is_cancelled() {
                info!("Cancellation requested, stopping monitor");
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                info!("Monitoring window elapsed");
                break;
            }

            iterations += 1;
            info!(iteration = iterations, "Monitor iteration starting");

            let assembler = ConversationAssembler::new(
                self.api.as_ref(),
                self.sink.as_ref(),
                self.assembler.clone(),
            );
            let conversation = match assembler.run().await {
                Ok(outcome) => {
                    if let StopReason::Failed(e) = &outcome.stop {
                        warn!(error = %e, "Iteration ended on a fetch failure");
                    }
                    outcome.conversation
                }
                Err(e) => {
                    warn!(error = %e, "Iteration failed, retrying next interval");
                    self.sleep_between_iterations(deadline).await;
                    continue;
                }
            };

            let conversation = if self.config.filters.is_active() {
                apply_filters(&conversation, self.config.filters)
            } else {
                conversation
            };

            let mut new_roots = 0usize;
            for id in conversation.root_ids() {
                if seen.insert(id.to_string()) {
                    new_roots += 1;
                }
            }
            new_per_iteration.push(new_roots);
            info!(
                iteration = iterations,
                new_roots,
                unique = seen.len(),
                "Monitor iteration complete"
            );

            self.sleep_between_iterations(deadline).await;
        }

        info!(iterations, unique = seen.len(), "Monitoring finished");
        MonitorReport {
            iterations,
            unique_roots: seen.len(),
            new_per_iteration,
        }
    }

    /// Sleep for the configured interval in slices, returning early when
    /// cancelled or past the deadline.
    async fn sleep_between_iterations(&self, deadline: Option<Instant>) {
        let end = Instant::now() + self.config.interval;
        while Instant::now() < end {
            if self.token.is_cancelled() {
                return;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return;
            }
            let remaining = end.saturating_duration_since(Instant::now());
            tokio::time::sleep(remaining.min(self.config.sleep_slice)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{day, make_tweet, page, MemorySink, MockSearchApi};
    use birdwatch_common::SearchKind;
    use twitterapi_client::SearchMode;

    fn assembler_config() -> AssemblerConfig {
        let mut cfg = AssemblerConfig::new("rust", SearchKind::Hashtag, SearchMode::Latest);
        cfg.page_delay = Duration::ZERO;
        cfg.reply_delay = Duration::ZERO;
        cfg.include_replies = false;
        cfg
    }

    #[tokio::test]
    async fn overlapping_iterations_count_only_new_roots() {
        let api: Arc<MockSearchApi> = Arc::new(
            MockSearchApi::new()
                .on_search(page(vec![make_tweet("A", day(2)), make_tweet("B", day(2))], None))
                .on_search(page(vec![make_tweet("B", day(2)), make_tweet("C", day(2))], None)),
        );
        let sink = Arc::new(MemorySink::new());

        let config = MonitorConfig {
            interval: Duration::from_secs(60),
            duration: None,
            sleep_slice: Duration::from_millis(1),
            filters: FilterOptions::default(),
        };
        let token = CancelToken::new();
        let monitor = Monitor::new(
            api.clone(),
            sink.clone(),
            assembler_config(),
            config,
            token.clone(),
        );

        let handle = tokio::spawn(async move { monitor.run().await });

        // Each iteration writes one page checkpoint and one final snapshot.
        while sink.write_count() < 4 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        token.cancel();
        let report = handle.await.unwrap();

        assert_eq!(report.iterations, 2);
        assert_eq!(report.new_per_iteration, vec![2, 1]);
        assert_eq!(report.unique_roots, 3);
    }

    #[tokio::test]
    async fn pre_cancelled_token_runs_no_iterations() {
        let api: Arc<MockSearchApi> = Arc::new(MockSearchApi::new());
        let sink = Arc::new(MemorySink::new());
        let token = CancelToken::new();
        token.cancel();

        let monitor = Monitor::new(
            api.clone(),
            sink,
            assembler_config(),
            MonitorConfig::default(),
            token,
        );
        let report = monitor.run().await;

        assert_eq!(report.iterations, 0);
        assert_eq!(api.search_calls(), 0);
    }

    #[tokio::test]
    async fn elapsed_duration_stops_at_the_boundary() {
        let api: Arc<MockSearchApi> = Arc::new(MockSearchApi::new());
        let sink = Arc::new(MemorySink::new());

        let config = MonitorConfig {
            duration: Some(Duration::ZERO),
            ..MonitorConfig::default()
        };
        let monitor = Monitor::new(
            api.clone(),
            sink,
            assembler_config(),
            config,
            CancelToken::new(),
        );
        let report = monitor.run().await;

        assert_eq!(report.iterations, 0);
        assert_eq!(api.search_calls(), 0);
    }

    #[tokio::test]
    async fn filters_shape_what_gets_counted() {
        let mut liked = make_tweet("liked", day(2));
        liked.likes = 100;
        let api: Arc<MockSearchApi> = Arc::new(
            MockSearchApi::new()
                .on_search(page(vec![liked, make_tweet("ignored", day(2))], None)),
        );
        let sink = Arc::new(MemorySink::new());

        let config = MonitorConfig {
            interval: Duration::from_secs(60),
            duration: None,
            sleep_slice: Duration::from_millis(1),
            filters: FilterOptions {
                min_likes: Some(50),
                verified_only: false,
            },
        };
        let token = CancelToken::new();
        let monitor = Monitor::new(
            api.clone(),
            sink.clone(),
            assembler_config(),
            config,
            token.clone(),
        );

        let handle = tokio::spawn(async move { monitor.run().await });
        while sink.write_count() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        token.cancel();
        let report = handle.await.unwrap();

        assert_eq!(report.new_per_iteration, vec![1]);
        assert_eq!(report.unique_roots, 1);
    }
}
