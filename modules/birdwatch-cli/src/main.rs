use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use birdwatch_archive::{analyze, export_csv, CheckpointStore};
use birdwatch_common::{Config, RetrievalBounds, SearchKind};
use birdwatch_engine::{
    apply_filters, AssemblerConfig, AssemblyOutcome, CancelToken, ConversationAssembler,
    FilterOptions, Monitor, MonitorConfig, StopReason,
};
use twitterapi_client::{SearchMode, TwitterApiClient, TwitterApiError};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Newest tweets first.
    Latest,
    /// Highest-engagement tweets.
    Top,
    /// Tweets with images only.
    Photos,
    /// Tweets with videos only.
    Videos,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Latest => SearchMode::Latest,
            ModeArg::Top => SearchMode::Top,
            ModeArg::Photos => SearchMode::Photos,
            ModeArg::Videos => SearchMode::Videos,
        }
    }
}

/// Download X/Twitter conversations (root tweets plus replies) for one or
/// more search terms, with durable incremental snapshots.
#[derive(Debug, Parser)]
#[command(name = "birdwatch", version)]
struct Cli {
    /// Search terms; several run sequentially.
    #[arg(required = true)]
    queries: Vec<String>,

    /// Treat queries as free text instead of hashtags.
    #[arg(long)]
    text: bool,

    /// Search result ordering.
    #[arg(long, value_enum, default_value_t = ModeArg::Latest)]
    mode: ModeArg,

    /// Cap on root tweets per query.
    #[arg(long)]
    max_tweets: Option<usize>,

    /// Oldest day to accept (YYYY-MM-DD); pagination stops once crossed.
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Newest day to accept (YYYY-MM-DD); newer tweets are skipped.
    #[arg(long)]
    until: Option<NaiveDate>,

    /// Skip reply retrieval.
    #[arg(long)]
    no_replies: bool,

    /// Also export a CSV next to the JSON snapshot.
    #[arg(long)]
    csv: bool,

    /// Keep only roots with at least this many likes.
    #[arg(long)]
    min_likes: Option<i64>,

    /// Keep only roots from verified accounts.
    #[arg(long)]
    verified_only: bool,

    /// Re-run the search on an interval instead of once.
    #[arg(long)]
    monitor: bool,

    /// Minutes between monitor iterations.
    #[arg(long, default_value_t = 5)]
    interval_minutes: u64,

    /// Stop monitoring after this many hours; omit to run until Ctrl-C.
    #[arg(long)]
    hours: Option<f64>,

    /// Snapshot directory (overrides BIRDWATCH_DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// More log output.
    #[arg(short, long)]
    verbose: bool,

    /// Errors only.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn filters(&self) -> FilterOptions {
        FilterOptions {
            min_likes: self.min_likes,
            verified_only: self.verified_only,
        }
    }

    fn assembler_config(&self, query: &str, config: &Config) -> AssemblerConfig {
        let kind = if self.text {
            SearchKind::Text
        } else {
            SearchKind::Hashtag
        };
        let mut cfg = AssemblerConfig::new(query, kind, self.mode.into());
        cfg.bounds = RetrievalBounds::from_days(self.since, self.until, self.max_tweets);
        cfg.include_replies = !self.no_replies;
        cfg.page_delay = Duration::from_millis(config.page_delay_ms);
        cfg.reply_delay = Duration::from_millis(config.reply_delay_ms);
        cfg
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    let config = Config::from_env();
    config.log_redacted();

    let client = TwitterApiClient::new(config.api_key.clone(), config.api_host.clone());
    let store = CheckpointStore::new(
        cli.data_dir
            .clone()
            .unwrap_or_else(|| config.data_dir.clone()),
    );

    if cli.monitor {
        if cli.queries.len() > 1 {
            bail!("monitor mode supports a single query");
        }
        run_monitor(&cli, &config, client, store).await
    } else {
        run_once(&cli, &config, &client, &store).await
    }
}

async fn run_monitor(
    cli: &Cli,
    config: &Config,
    client: TwitterApiClient,
    store: CheckpointStore,
) -> Result<()> {
    let token = CancelToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current iteration");
            signal_token.cancel();
        }
    });

    let monitor_config = MonitorConfig {
        interval: Duration::from_secs(cli.interval_minutes * 60),
        duration: cli.hours.map(|h| Duration::from_secs_f64(h * 3600.0)),
        filters: cli.filters(),
        ..MonitorConfig::default()
    };
    let monitor = Monitor::new(
        Arc::new(client),
        Arc::new(store),
        cli.assembler_config(&cli.queries[0], config),
        monitor_config,
        token,
    );

    let report = monitor.run().await;
    println!(
        "Monitoring finished: {} iterations, {} unique tweets",
        report.iterations, report.unique_roots
    );
    Ok(())
}

async fn run_once(
    cli: &Cli,
    config: &Config,
    client: &TwitterApiClient,
    store: &CheckpointStore,
) -> Result<()> {
    let mut results = Vec::new();

    for query in &cli.queries {
        let assembler =
            ConversationAssembler::new(client, store, cli.assembler_config(query, config));
        let outcome = assembler.run().await?;
        report_auth_failure(&outcome);

        let AssemblyOutcome {
            conversation,
            checkpoint,
            ..
        } = outcome;
        let view = if cli.filters().is_active() {
            apply_filters(&conversation, cli.filters())
        } else {
            conversation
        };

        let path = store.persist(&view).await?;
        if cli.csv {
            export_csv(&view, &checkpoint.with_extension("csv")).await?;
        }

        println!();
        println!("Search: {} ({})", view.query, view.search_type);
        println!("Main tweets: {}", view.total_main_tweets);
        println!("Replies: {}", view.total_replies);
        println!("Total items: {}", view.total_items);
        println!("Summary: {}", analyze(&view));
        println!("Saved to: {}", path.display());

        results.push((query.clone(), view.total_main_tweets, view.total_replies));
    }

    if results.len() > 1 {
        let tweets: usize = results.iter().map(|r| r.1).sum();
        let replies: usize = results.iter().map(|r| r.2).sum();
        println!();
        println!(
            "Overall: {} tweets, {} replies across {} searches",
            tweets,
            replies,
            results.len()
        );
    }
    Ok(())
}

/// Credential problems get remediation steps instead of a bare error line.
fn report_auth_failure(outcome: &AssemblyOutcome) {
    if let StopReason::Failed(TwitterApiError::Unauthorized { status, .. }) = &outcome.stop {
        eprintln!("The API rejected your credentials (HTTP {status}).");
        eprintln!("  1. Check that your key is subscribed to the search API on RapidAPI");
        eprintln!("  2. Make sure RAPIDAPI_KEY and RAPIDAPI_HOST match that subscription");
        eprintln!("Partial results up to the failure were kept.");
    }
}
