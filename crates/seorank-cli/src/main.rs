use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use seorank_core::{
    DEFAULT_PAGE_SIZE, FsKvStore, MeasureConfig, Measurer, RankingStore, Strategy,
};

mod render;

const APP_NAME: &str = "seorank";

#[derive(Parser)]
#[command(
    name = APP_NAME,
    version,
    about = "seorank — SEO readiness audits and a site leaderboard",
    after_help = "Developed by Pon Datalab"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Audit one URL and record root pages in the leaderboard
    Measure(MeasureArgs),
    /// Show one page of the leaderboard
    Ranking(RankingArgs),
}

#[derive(Args)]
struct MeasureArgs {
    /// Page to audit; `https://` is assumed when no scheme is given
    url: String,

    #[arg(long, value_enum, default_value_t = StrategyArg::Mobile)]
    strategy: StrategyArg,

    /// Print the raw report as JSON
    #[arg(long)]
    json: bool,

    /// Do not record the result in the leaderboard
    #[arg(long)]
    no_rank: bool,

    /// PageSpeed Insights API key
    #[arg(long, env = "PAGESPEED_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the PageSpeed Insights endpoint
    #[arg(long, env = "SEORANK_PAGESPEED_ENDPOINT")]
    endpoint: Option<String>,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args)]
struct RankingArgs {
    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Print the page as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args)]
struct StoreArgs {
    /// Directory holding the leaderboard
    #[arg(long = "store", env = "SEORANK_STORE", default_value = ".seorank")]
    path: PathBuf,
}

impl StoreArgs {
    async fn open(&self) -> Result<RankingStore> {
        let kv = FsKvStore::new(&self.path)
            .await
            .with_context(|| format!("failed to open store at {}", self.path.display()))?;
        Ok(RankingStore::new(Arc::new(kv)))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Mobile,
    Desktop,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Mobile => Strategy::Mobile,
            StrategyArg::Desktop => Strategy::Desktop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seorank=info,seorank_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Measure(args) => run_measure(args).await,
        Command::Ranking(args) => run_ranking(args).await,
    }
}

async fn run_measure(args: MeasureArgs) -> Result<()> {
    let mut config = MeasureConfig::default().with_api_key(args.api_key.clone());
    if let Some(endpoint) = args.endpoint.as_deref() {
        config = config.with_endpoint(endpoint);
    }

    let measurer = Measurer::new(config).context("failed to build HTTP client")?;
    let report = measurer
        .measure(&args.url, args.strategy.into())
        .await
        .with_context(|| format!("failed to measure {}", args.url))?;

    let ranked = if args.no_rank {
        None
    } else {
        let store = args.store.open().await?;
        store
            .calculate_and_update_ranking(&report)
            .await
            .context("failed to update ranking")?
            .map(|entry| (store, entry))
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print!("{}", render::render_report(&report));

    if let Some((store, entry)) = ranked {
        let ranking = store.get_ranking().await;
        let position = ranking
            .entries
            .iter()
            .position(|ranked| ranked.root_url == entry.root_url)
            .map(|idx| idx + 1);
        print!(
            "{}",
            render::render_rank_position(&entry, position, ranking.entries.len())
        );
    } else if !args.no_rank {
        tracing::info!("only root URLs are ranked; page audit not recorded");
    }

    Ok(())
}

async fn run_ranking(args: RankingArgs) -> Result<()> {
    let store = args.store.open().await?;
    let data = store.get_paginated_ranking(args.page, args.page_size).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        print!("{}", render::render_ranking(&data));
    }

    Ok(())
}
